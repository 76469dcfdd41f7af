use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Map, Value};

use crate::categories::Categories;
use crate::context::Scope;
use crate::inspector::{BasicInspector, EditTarget, InspectorHandle, OptionInspector, Plug};
use crate::name::{string_to_names, Name};
use crate::registry::Inspections;
use crate::scene::{Output, SceneHandle};

pub const ATTRIBUTE_PREFIX: &str = "attribute:";
pub const OUTPUT_PREFIX: &str = "output:";

fn globals_inspector<F>(scene: &SceneHandle, edit_target: &EditTarget, read: F) -> InspectorHandle
where
    F: Fn(&Map<String, Value>) -> Option<Value> + Send + Sync + 'static,
{
    BasicInspector::handle(scene, edit_target, Plug::Globals, move |scene, scope| {
        Ok(read(&scene.globals(scope)?))
    })
}

/// Globals `attribute:<name>`, filed as `<category>/<name>`.
pub fn attributes(
    scene: &SceneHandle,
    edit_target: &EditTarget,
    scope: &Scope,
    categories: &Categories,
) -> Result<Inspections> {
    let mut result = Inspections::new();
    for key in scene.globals(scope)?.keys() {
        let Some(name) = key.strip_prefix(ATTRIBUTE_PREFIX) else {
            continue;
        };
        let global = key.clone();
        result.insert(
            vec![Name::new(categories.classify(name)), Name::new(name)],
            globals_inspector(scene, edit_target, move |globals| globals.get(&global).cloned()),
        );
    }
    Ok(result)
}

/// Globals `option:<name>`, filed as `<category>/<name>`.
pub fn options(
    scene: &SceneHandle,
    edit_target: &EditTarget,
    scope: &Scope,
    categories: &Categories,
) -> Result<Inspections> {
    let mut result = Inspections::new();
    for key in scene.globals(scope)?.keys() {
        let Some(name) = key.strip_prefix(OptionInspector::PREFIX) else {
            continue;
        };
        result.insert(
            vec![Name::new(categories.classify(name)), Name::new(name)],
            Arc::new(OptionInspector::new(scene.clone(), edit_target.clone(), name)),
        );
    }
    Ok(result)
}

fn output(globals: &Map<String, Value>, key: &str) -> Option<Output> {
    serde_json::from_value(globals.get(key)?.clone()).ok()
}

/// Globals `output:<path>` holding a render output. The output name may
/// contain `/`, which nests it.
pub fn outputs(
    scene: &SceneHandle,
    edit_target: &EditTarget,
    scope: &Scope,
) -> Result<Inspections> {
    let mut result = Inspections::new();
    let globals = scene.globals(scope)?;
    for key in globals.keys() {
        let Some(name) = key.strip_prefix(OUTPUT_PREFIX) else {
            continue;
        };
        let Some(declared) = output(&globals, key) else {
            continue;
        };
        let entry = |field: &str| {
            let mut path = string_to_names(name);
            path.push(Name::new(field));
            path
        };

        let global = key.clone();
        result.insert(
            entry("File Name"),
            globals_inspector(scene, edit_target, move |globals| {
                output(globals, &global).map(|output| json!(output.name))
            }),
        );
        let global = key.clone();
        result.insert(
            entry("Type"),
            globals_inspector(scene, edit_target, move |globals| {
                output(globals, &global).map(|output| json!(output.output_type))
            }),
        );
        let global = key.clone();
        result.insert(
            entry("Data"),
            globals_inspector(scene, edit_target, move |globals| {
                output(globals, &global).map(|output| json!(output.data))
            }),
        );
        for parameter in declared.parameters.keys() {
            let mut path = entry("Parameters");
            path.push(Name::new(parameter));
            let global = key.clone();
            let parameter = parameter.clone();
            result.insert(
                path,
                globals_inspector(scene, edit_target, move |globals| {
                    output(globals, &global)?.parameters.remove(&parameter)
                }),
            );
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::{default_option_categories, OTHER_CATEGORY};
    use crate::context::{Canceller, Context};
    use crate::name::{names_to_string, AsNames};
    use crate::scene::MemoryScene;

    fn scene() -> SceneHandle {
        Arc::new(
            MemoryScene::from_json(json!({
                "globals": {
                    "option:render:camera": "/cameras/main",
                    "option:ai:AA_samples": 3,
                    "option:studio:shot": "sh010",
                    "attribute:user:department": "lighting",
                    "output:beauty/diffuse": {
                        "name": "beauty.exr",
                        "type": "exr",
                        "data": "rgba",
                        "parameters": { "quantize": [0, 0, 0, 0] }
                    },
                    "output:broken": 12
                }
            }))
            .unwrap(),
        )
    }

    #[test]
    fn options_are_categorised() -> Result<()> {
        let scene = scene();
        let canceller = Canceller::new();
        let context = Context::new();
        let scope = Scope::new(&context, &canceller);
        let categories = Categories::new(&default_option_categories(), OTHER_CATEGORY);

        let options = options(&scene, &EditTarget::none(), &scope, &categories)?;
        let keys: Vec<String> = options.keys().map(|key| names_to_string(key)).collect();
        assert_eq!(
            keys,
            vec!["/Arnold/ai:AA_samples", "/Other/studio:shot", "/Standard/render:camera"]
        );
        let inspection = options[&"Arnold/ai:AA_samples".as_names()]
            .inspect(&scope)?
            .unwrap();
        assert_eq!(inspection.value, json!(3));
        Ok(())
    }

    #[test]
    fn outputs_nest_by_name_and_skip_malformed() -> Result<()> {
        let scene = scene();
        let canceller = Canceller::new();
        let context = Context::new();
        let scope = Scope::new(&context, &canceller);

        let outputs = outputs(&scene, &EditTarget::none(), &scope)?;
        let keys: Vec<String> = outputs.keys().map(|key| names_to_string(key)).collect();
        assert_eq!(
            keys,
            vec![
                "/beauty/diffuse/Data",
                "/beauty/diffuse/File Name",
                "/beauty/diffuse/Parameters/quantize",
                "/beauty/diffuse/Type",
            ]
        );
        let inspection = outputs[&"beauty/diffuse/File Name".as_names()]
            .inspect(&scope)?
            .unwrap();
        assert_eq!(inspection.value, json!("beauty.exr"));
        assert_eq!(inspection.source.as_deref(), Some("globals"));
        Ok(())
    }
}
