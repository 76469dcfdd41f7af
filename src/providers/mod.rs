//! Built-in inspection providers.
//!
//! `Selection/...` providers describe the location held in the context's
//! `scene:path`; `Globals/...` providers describe the scene globals.

pub mod globals;
pub mod selection;

use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;

use crate::categories::Categories;
use crate::config::InspectorConfig;
use crate::context::Scope;
use crate::inspector::{BasicInspector, EditTarget, InspectorHandle, Plug};
use crate::registry::{Inspections, Provider, Registry};
use crate::scene::{Object, SceneHandle};

type CategorisedFn = fn(&SceneHandle, &EditTarget, &Scope, &Categories) -> Result<Inspections>;

/// A provider that files dynamically named facts under category labels.
struct Categorised {
    categories: Arc<Categories>,
    provide: CategorisedFn,
}

impl Provider for Categorised {
    fn provide(
        &self,
        scene: &SceneHandle,
        edit_target: &EditTarget,
        scope: &Scope,
    ) -> Result<Inspections> {
        (self.provide)(scene, edit_target, scope, &self.categories)
    }
}

pub fn register_builtin(registry: &Registry, config: &InspectorConfig) {
    let attribute_categories = Arc::new(config.attribute_categories());
    let option_categories = Arc::new(config.option_categories());

    registry.register("Selection/Bound", selection::bound);
    registry.register("Selection/Transform", selection::transform);
    registry.register(
        "Selection/Attributes",
        Categorised {
            categories: attribute_categories.clone(),
            provide: selection::attributes,
        },
    );
    registry.register("Selection/Object", selection::object_type);
    registry.register("Selection/Object/Topology", selection::primitive_topology);
    registry.register("Selection/Object/Mesh Topology", selection::mesh_topology);
    registry.register("Selection/Object/Curves Topology", selection::curves_topology);
    registry.register("Selection/Object/Parameters", selection::object_parameters);
    registry.register(
        "Selection/Object/Primitive Variables",
        selection::primitive_variables,
    );
    registry.register("Selection/Object/Subdivision", selection::subdivision);

    registry.register(
        "Globals/Attributes",
        Categorised {
            categories: attribute_categories,
            provide: globals::attributes,
        },
    );
    registry.register(
        "Globals/Options",
        Categorised {
            categories: option_categories,
            provide: globals::options,
        },
    );
    registry.register("Globals/Outputs", globals::outputs);
}

/// Inspector over the location's object. `read` returning `None` means the
/// object has nothing to show under the current context.
pub(crate) fn object_inspector<F>(
    scene: &SceneHandle,
    edit_target: &EditTarget,
    read: F,
) -> InspectorHandle
where
    F: Fn(&Object) -> Option<Value> + Send + Sync + 'static,
{
    BasicInspector::handle(scene, edit_target, Plug::Object, move |scene, scope| {
        Ok(read(&scene.object(scope)?))
    })
}
