use std::fmt::Write as _;

use anyhow::Result;
use serde_json::{json, Map, Value};

use crate::column::{DiffColumn, InspectorColumn, Side};
use crate::context::Canceller;
use crate::inspector::Inspection;
use crate::path::InspectionPath;
use crate::tooling::logging::LogScope;

#[derive(Clone, Debug, Default)]
pub struct DumpOptions {
    /// Levels below the starting path to descend. `None` walks everything.
    pub max_depth: Option<usize>,
}

/// Walks `path` and everything below it into a JSON report. Each node carries
/// `name`, `path`, `children` and, where an inspector resolves, `value` and
/// `source`; two-context paths add `valueB` and `different`.
pub fn dump_tree(path: &InspectionPath, canceller: &Canceller, options: &DumpOptions) -> Result<Value> {
    let _log_scope = LogScope::enter(json!({
        "dump": path.to_string(),
        "contextA": path.context(Side::A).fingerprint(),
    }));
    dump_node(path, canceller, options, 0)
}

fn dump_node(
    path: &InspectionPath,
    canceller: &Canceller,
    options: &DumpOptions,
    depth: usize,
) -> Result<Value> {
    canceller.ensure_not_cancelled()?;
    let mut node = Map::new();
    let name = path
        .name()
        .map(|name| name.to_string())
        .unwrap_or_else(|| "/".to_string());
    node.insert("name".to_string(), json!(name));
    node.insert("path".to_string(), json!(path.to_string()));

    if let Some(inspector) = path.resolve(canceller)? {
        if path.is_diff() {
            let comparison = DiffColumn::new(Side::A).compare_with(&inspector, path, canceller)?;
            insert_inspection(&mut node, comparison.this);
            node.insert("different".to_string(), json!(comparison.different));
            node.insert(
                "valueB".to_string(),
                comparison
                    .other
                    .map(|inspection| inspection.value)
                    .unwrap_or(Value::Null),
            );
        } else {
            let inspection = InspectorColumn::new(Side::A).inspect_with(&inspector, path, canceller)?;
            insert_inspection(&mut node, inspection);
        }
    }

    let mut children = Vec::new();
    if options.max_depth.map(|max| depth < max).unwrap_or(true) {
        for child in path.children(canceller)? {
            children.push(dump_node(&child, canceller, options, depth + 1)?);
        }
    }
    node.insert("children".to_string(), Value::Array(children));
    Ok(Value::Object(node))
}

fn insert_inspection(node: &mut Map<String, Value>, inspection: Option<Inspection>) {
    if let Some(inspection) = inspection {
        node.insert("value".to_string(), inspection.value);
        node.insert("source".to_string(), json!(inspection.source));
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Indented listing of a `dump_tree` report.
pub fn render_text(report: &Value) -> String {
    let mut out = String::new();
    render_node(report, 0, &mut out);
    out
}

fn render_node(node: &Value, indent: usize, out: &mut String) {
    let name = node.get("name").and_then(Value::as_str).unwrap_or("?");
    let _ = write!(out, "{:width$}{}", "", name, width = indent * 2);
    match (node.get("value"), node.get("valueB")) {
        (value, Some(value_b)) => {
            let a = value.map(format_value).unwrap_or_else(|| "-".to_string());
            let b = if value_b.is_null() {
                "-".to_string()
            } else {
                format_value(value_b)
            };
            let marker = if node.get("different").and_then(Value::as_bool) == Some(true) {
                " *"
            } else {
                ""
            };
            let _ = write!(out, " : A={a} B={b}{marker}");
        }
        (Some(value), None) => {
            let _ = write!(out, " : {}", format_value(value));
        }
        (None, None) => {}
    }
    out.push('\n');
    if let Some(children) = node.get("children").and_then(Value::as_array) {
        for child in children {
            render_node(child, indent + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_values_and_differences() {
        let report = json!({
            "name": "Globals",
            "children": [
                { "name": "Options", "children": [
                    { "name": "render:camera", "value": "/cam", "valueB": "/cam2", "different": true, "children": [] }
                ] },
                { "name": "Outputs", "value": 3, "children": [] }
            ]
        });
        assert_eq!(
            render_text(&report),
            "Globals\n  Options\n    render:camera : A=/cam B=/cam2 *\n  Outputs : 3\n"
        );
    }
}
