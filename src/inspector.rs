use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use crate::context::Scope;
use crate::name::names_to_string;
use crate::scene::SceneHandle;

/// Where an edit to an inspected value would be made. Passed through to
/// inspectors untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EditTarget(Option<Arc<str>>);

impl EditTarget {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn named(name: &str) -> Self {
        Self(Some(Arc::from(name)))
    }

    pub fn name(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Editability {
    Editable { target: String },
    NotEditable { reason: String },
}

impl Editability {
    pub fn for_target(edit_target: &EditTarget) -> Self {
        match edit_target.name() {
            Some(name) => Editability::Editable {
                target: name.to_string(),
            },
            None => Editability::NotEditable {
                reason: "No edit target specified".to_string(),
            },
        }
    }
}

/// The outcome of one inspector evaluation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Inspection {
    pub value: Value,
    /// The location (`/a/b`) or `globals` the value came from.
    pub source: Option<String>,
    pub editability: Editability,
}

pub trait Inspector: Send + Sync {
    /// Evaluates under the scope's context. `Ok(None)` means there is nothing
    /// to show, which is not an error.
    fn inspect(&self, scope: &Scope) -> Result<Option<Inspection>>;
}

pub type InspectorHandle = Arc<dyn Inspector>;

impl fmt::Debug for dyn Inspector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Inspector")
    }
}

/// The scene value a `BasicInspector` reads. Determines the reported source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Plug {
    Bound,
    Transform,
    Attributes,
    Object,
    Globals,
}

impl Plug {
    fn is_per_location(&self) -> bool {
        !matches!(self, Plug::Globals)
    }
}

type ValueFn = dyn Fn(&SceneHandle, &Scope) -> Result<Option<Value>> + Send + Sync;

/// Inspector backed by a closure over the scene.
pub struct BasicInspector {
    scene: SceneHandle,
    edit_target: EditTarget,
    plug: Plug,
    value_fn: Box<ValueFn>,
}

impl BasicInspector {
    pub fn new<F>(scene: SceneHandle, edit_target: EditTarget, plug: Plug, value_fn: F) -> Self
    where
        F: Fn(&SceneHandle, &Scope) -> Result<Option<Value>> + Send + Sync + 'static,
    {
        Self {
            scene,
            edit_target,
            plug,
            value_fn: Box::new(value_fn),
        }
    }

    pub fn handle<F>(scene: &SceneHandle, edit_target: &EditTarget, plug: Plug, value_fn: F) -> InspectorHandle
    where
        F: Fn(&SceneHandle, &Scope) -> Result<Option<Value>> + Send + Sync + 'static,
    {
        Arc::new(Self::new(scene.clone(), edit_target.clone(), plug, value_fn))
    }

    pub fn plug(&self) -> Plug {
        self.plug
    }
}

impl Inspector for BasicInspector {
    fn inspect(&self, scope: &Scope) -> Result<Option<Inspection>> {
        scope.ensure_not_cancelled()?;
        let source = if self.plug.is_per_location() {
            if !self.scene.exists(scope)? {
                return Ok(None);
            }
            scope.location().map(|location| names_to_string(&location))
        } else {
            Some("globals".to_string())
        };
        let Some(value) = (self.value_fn)(&self.scene, scope)? else {
            return Ok(None);
        };
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(Inspection {
            value,
            source,
            editability: Editability::for_target(&self.edit_target),
        }))
    }
}

/// Inspects an inherited attribute, reporting the nearest location that
/// authors it as the source.
pub struct AttributeInspector {
    scene: SceneHandle,
    edit_target: EditTarget,
    attribute: String,
}

impl AttributeInspector {
    pub fn new(scene: SceneHandle, edit_target: EditTarget, attribute: impl Into<String>) -> Self {
        Self {
            scene,
            edit_target,
            attribute: attribute.into(),
        }
    }
}

impl Inspector for AttributeInspector {
    fn inspect(&self, scope: &Scope) -> Result<Option<Inspection>> {
        scope.ensure_not_cancelled()?;
        if !self.scene.exists(scope)? {
            return Ok(None);
        }
        let location = scope.require_location()?;
        for depth in (0..=location.len()).rev() {
            scope.ensure_not_cancelled()?;
            let ancestor = scope.with_location(&location[..depth]);
            if let Some(value) = self.scene.attributes(&ancestor)?.remove(&self.attribute) {
                return Ok(Some(Inspection {
                    value,
                    source: Some(names_to_string(&location[..depth])),
                    editability: Editability::for_target(&self.edit_target),
                }));
            }
        }
        Ok(None)
    }
}

/// Inspects the render option `option:<name>` in the globals.
pub struct OptionInspector {
    scene: SceneHandle,
    edit_target: EditTarget,
    option: String,
}

impl OptionInspector {
    pub const PREFIX: &'static str = "option:";

    pub fn new(scene: SceneHandle, edit_target: EditTarget, option: impl Into<String>) -> Self {
        Self {
            scene,
            edit_target,
            option: option.into(),
        }
    }
}

impl Inspector for OptionInspector {
    fn inspect(&self, scope: &Scope) -> Result<Option<Inspection>> {
        scope.ensure_not_cancelled()?;
        let key = format!("{}{}", Self::PREFIX, self.option);
        let Some(value) = self.scene.globals(scope)?.remove(&key) else {
            return Ok(None);
        };
        Ok(Some(Inspection {
            value,
            source: Some("globals".to_string()),
            editability: Editability::for_target(&self.edit_target),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Canceller, Context};
    use crate::name::AsNames;
    use crate::scene::MemoryScene;
    use serde_json::json;

    fn scene() -> SceneHandle {
        Arc::new(
            MemoryScene::from_json(json!({
                "globals": { "option:render:camera": "/cam" },
                "root": {
                    "attributes": { "gl:visualiser:scale": 2 },
                    "children": { "a": { "children": { "b": {} } } }
                }
            }))
            .unwrap(),
        )
    }

    #[test]
    fn attribute_source_is_authoring_ancestor() -> Result<()> {
        let scene = scene();
        let inspector = AttributeInspector::new(scene, EditTarget::named("edits"), "gl:visualiser:scale");
        let canceller = Canceller::new();
        let context = Context::new().with_scene_path(&"/a/b".as_names());
        let inspection = inspector.inspect(&Scope::new(&context, &canceller))?.unwrap();
        assert_eq!(inspection.value, json!(2));
        assert_eq!(inspection.source.as_deref(), Some("/"));
        assert_eq!(
            inspection.editability,
            Editability::Editable {
                target: "edits".to_string()
            }
        );
        Ok(())
    }

    #[test]
    fn basic_inspector_is_absent_for_missing_location() -> Result<()> {
        let scene = scene();
        let inspector = BasicInspector::new(scene, EditTarget::none(), Plug::Object, |scene, scope| {
            Ok(Some(json!(scene.object(scope)?.type_name())))
        });
        let canceller = Canceller::new();
        let missing = Context::new().with_scene_path(&"/nope".as_names());
        assert!(inspector.inspect(&Scope::new(&missing, &canceller))?.is_none());
        let present = Context::new().with_scene_path(&"/a".as_names());
        let inspection = inspector.inspect(&Scope::new(&present, &canceller))?.unwrap();
        assert_eq!(inspection.value, json!("NullObject"));
        assert_eq!(inspection.source.as_deref(), Some("/a"));
        Ok(())
    }

    #[test]
    fn option_inspector_reads_prefixed_global() -> Result<()> {
        let inspector = OptionInspector::new(scene(), EditTarget::none(), "render:camera");
        let canceller = Canceller::new();
        let context = Context::new();
        let inspection = inspector.inspect(&Scope::new(&context, &canceller))?.unwrap();
        assert_eq!(inspection.value, json!("/cam"));
        assert!(matches!(inspection.editability, Editability::NotEditable { .. }));
        Ok(())
    }
}
