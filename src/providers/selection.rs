use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};

use super::object_inspector;
use crate::categories::Categories;
use crate::context::Scope;
use crate::inspector::{AttributeInspector, BasicInspector, EditTarget, Plug};
use crate::name::{AsNames, Name};
use crate::registry::Inspections;
use crate::scene::{data_type_name, Interpolation, Matrix, Object, SceneHandle};

pub fn bound(scene: &SceneHandle, edit_target: &EditTarget, _scope: &Scope) -> Result<Inspections> {
    let mut result = Inspections::new();
    result.insert(
        ["Local"].as_names(),
        BasicInspector::handle(scene, edit_target, Plug::Bound, |scene, scope| {
            Ok(Some(serde_json::to_value(scene.bound(scope)?)?))
        }),
    );
    result.insert(
        ["World"].as_names(),
        BasicInspector::handle(scene, edit_target, Plug::Bound, |scene, scope| {
            let bound = scene.full_transform(scope)?.transform_bound(&scene.bound(scope)?);
            Ok(Some(serde_json::to_value(bound)?))
        }),
    );
    Ok(result)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TransformComponent {
    Matrix,
    Translate,
    Rotate,
    Scale,
    Shear,
}

impl TransformComponent {
    const ALL: [TransformComponent; 5] = [
        TransformComponent::Matrix,
        TransformComponent::Translate,
        TransformComponent::Rotate,
        TransformComponent::Scale,
        TransformComponent::Shear,
    ];

    fn label(&self) -> &'static str {
        match self {
            TransformComponent::Matrix => "Matrix",
            TransformComponent::Translate => "Translate",
            TransformComponent::Rotate => "Rotate",
            TransformComponent::Scale => "Scale",
            TransformComponent::Shear => "Shear",
        }
    }

    fn read(&self, matrix: &Matrix) -> Result<Option<Value>> {
        if *self == TransformComponent::Matrix {
            return Ok(Some(serde_json::to_value(matrix)?));
        }
        let Some(shrt) = matrix.extract_shrt() else {
            return Ok(None);
        };
        let component = match self {
            TransformComponent::Translate => shrt.translate,
            TransformComponent::Rotate => shrt.rotate,
            TransformComponent::Scale => shrt.scale,
            _ => shrt.shear,
        };
        Ok(Some(json!(component)))
    }
}

/// Local and world matrices plus their decomposition. Rotation is XYZ euler
/// in radians.
pub fn transform(
    scene: &SceneHandle,
    edit_target: &EditTarget,
    _scope: &Scope,
) -> Result<Inspections> {
    let mut result = Inspections::new();
    for (space, full) in [("Local", false), ("World", true)] {
        for component in TransformComponent::ALL {
            result.insert(
                [space, component.label()].as_names(),
                BasicInspector::handle(scene, edit_target, Plug::Transform, move |scene, scope| {
                    let matrix = if full {
                        scene.full_transform(scope)?
                    } else {
                        scene.transform(scope)?
                    };
                    component.read(&matrix)
                }),
            );
        }
    }
    Ok(result)
}

/// One entry per inherited attribute, filed under its category.
pub fn attributes(
    scene: &SceneHandle,
    edit_target: &EditTarget,
    scope: &Scope,
    categories: &Categories,
) -> Result<Inspections> {
    let mut result = Inspections::new();
    for name in scene.full_attributes(scope)?.keys() {
        let category = categories.classify(name);
        result.insert(
            vec![Name::new(category), Name::new(name)],
            Arc::new(AttributeInspector::new(
                scene.clone(),
                edit_target.clone(),
                name.as_str(),
            )),
        );
    }
    Ok(result)
}

pub fn object_type(
    scene: &SceneHandle,
    edit_target: &EditTarget,
    scope: &Scope,
) -> Result<Inspections> {
    let mut result = Inspections::new();
    if !scene.object(scope)?.is_null() {
        result.insert(
            ["Type"].as_names(),
            object_inspector(scene, edit_target, |object| {
                (!object.is_null()).then(|| json!(object.type_name()))
            }),
        );
    }
    Ok(result)
}

/// Number of values a primitive variable needs for each interpolation.
pub fn primitive_topology(
    scene: &SceneHandle,
    edit_target: &EditTarget,
    scope: &Scope,
) -> Result<Inspections> {
    let mut result = Inspections::new();
    if !scene.object(scope)?.is_primitive() {
        return Ok(result);
    }
    for interpolation in Interpolation::SIZED {
        result.insert(
            [interpolation.as_str()].as_names(),
            object_inspector(scene, edit_target, move |object| {
                object.variable_size(interpolation).map(|size| json!(size))
            }),
        );
    }
    Ok(result)
}

pub fn mesh_topology(
    scene: &SceneHandle,
    edit_target: &EditTarget,
    scope: &Scope,
) -> Result<Inspections> {
    let mut result = Inspections::new();
    if scene.object(scope)?.as_mesh().is_none() {
        return Ok(result);
    }
    result.insert(
        ["Vertices"].as_names(),
        object_inspector(scene, edit_target, |object| {
            object
                .as_mesh()
                .map(|mesh| json!(mesh.variable_size(Interpolation::Vertex)))
        }),
    );
    result.insert(
        ["Faces"].as_names(),
        object_inspector(scene, edit_target, |object| {
            object.as_mesh().map(|mesh| json!(mesh.num_faces()))
        }),
    );
    result.insert(
        ["Vertices Per Face"].as_names(),
        object_inspector(scene, edit_target, |object| {
            object.as_mesh().map(|mesh| json!(mesh.vertices_per_face))
        }),
    );
    result.insert(
        ["Vertex Ids"].as_names(),
        object_inspector(scene, edit_target, |object| {
            object.as_mesh().map(|mesh| json!(mesh.vertex_ids))
        }),
    );
    Ok(result)
}

pub fn curves_topology(
    scene: &SceneHandle,
    edit_target: &EditTarget,
    scope: &Scope,
) -> Result<Inspections> {
    let mut result = Inspections::new();
    if scene.object(scope)?.as_curves().is_none() {
        return Ok(result);
    }
    result.insert(
        ["Vertices"].as_names(),
        object_inspector(scene, edit_target, |object| {
            object
                .as_curves()
                .map(|curves| json!(curves.variable_size(Interpolation::Vertex)))
        }),
    );
    result.insert(
        ["Curves"].as_names(),
        object_inspector(scene, edit_target, |object| {
            object.as_curves().map(|curves| json!(curves.num_curves()))
        }),
    );
    result.insert(
        ["Vertices Per Curve"].as_names(),
        object_inspector(scene, edit_target, |object| {
            object.as_curves().map(|curves| json!(curves.vertices_per_curve))
        }),
    );
    result.insert(
        ["Periodic"].as_names(),
        object_inspector(scene, edit_target, |object| {
            object.as_curves().map(|curves| json!(curves.periodic))
        }),
    );
    result.insert(
        ["Basis"].as_names(),
        object_inspector(scene, edit_target, |object| {
            object.as_curves().map(|curves| json!(curves.basis.as_str()))
        }),
    );
    Ok(result)
}

/// Camera and external procedural parameters.
pub fn object_parameters(
    scene: &SceneHandle,
    edit_target: &EditTarget,
    scope: &Scope,
) -> Result<Inspections> {
    let mut result = Inspections::new();
    let object = scene.object(scope)?;
    let Some(parameters) = object.parameters() else {
        return Ok(result);
    };
    for name in parameters.keys() {
        let parameter = name.clone();
        result.insert(
            vec![Name::new(name)],
            object_inspector(scene, edit_target, move |object| {
                object.parameters()?.get(&parameter).cloned()
            }),
        );
    }
    Ok(result)
}

pub fn primitive_variables(
    scene: &SceneHandle,
    edit_target: &EditTarget,
    scope: &Scope,
) -> Result<Inspections> {
    let mut result = Inspections::new();
    let object = scene.object(scope)?;
    let Some(variables) = object.variables() else {
        return Ok(result);
    };
    for name in variables.keys() {
        let entry = |field: &str| vec![Name::new(name), Name::new(field)];
        let variable = name.clone();
        result.insert(
            entry("Interpolation"),
            object_inspector(scene, edit_target, move |object| {
                object
                    .variable(&variable)
                    .map(|variable| json!(variable.interpolation.as_str()))
            }),
        );
        let variable = name.clone();
        result.insert(
            entry("Type"),
            object_inspector(scene, edit_target, move |object| {
                data_type_name(&object.variable(&variable)?.data).map(Value::String)
            }),
        );
        let variable = name.clone();
        result.insert(
            entry("Data"),
            object_inspector(scene, edit_target, move |object| {
                object.variable(&variable).map(|variable| variable.data.clone())
            }),
        );
        let variable = name.clone();
        result.insert(
            entry("Indices"),
            object_inspector(scene, edit_target, move |object| {
                let indices = object.variable(&variable)?.indices.as_ref()?;
                Some(json!(indices))
            }),
        );
    }
    Ok(result)
}

/// Subdivision settings of meshes.
pub fn subdivision(
    scene: &SceneHandle,
    edit_target: &EditTarget,
    scope: &Scope,
) -> Result<Inspections> {
    let mut result = Inspections::new();
    if scene.object(scope)?.as_mesh().is_none() {
        return Ok(result);
    }

    let mut mesh_field = |path: &[&str], read: fn(&crate::scene::Mesh) -> Value| {
        result.insert(
            path.as_names(),
            object_inspector(scene, edit_target, move |object: &Object| {
                object.as_mesh().map(read)
            }),
        );
    };

    mesh_field(&["Interpolation"], |mesh| json!(mesh.interpolation));
    mesh_field(&["Corners"], |mesh| json!(mesh.corner_ids.len()));
    mesh_field(&["Corners", "Indices"], |mesh| json!(mesh.corner_ids));
    mesh_field(&["Corners", "Sharpnesses"], |mesh| {
        json!(mesh.corner_sharpnesses)
    });
    mesh_field(&["Creases"], |mesh| json!(mesh.crease_lengths.len()));
    mesh_field(&["Creases", "Lengths"], |mesh| json!(mesh.crease_lengths));
    mesh_field(&["Creases", "Ids"], |mesh| json!(mesh.crease_ids));
    mesh_field(&["Creases", "Sharpnesses"], |mesh| {
        json!(mesh.crease_sharpnesses)
    });
    mesh_field(&["Interpolate Boundary"], |mesh| {
        json!(mesh.interpolate_boundary)
    });
    mesh_field(&["FaceVarying Linear Interpolation"], |mesh| {
        json!(mesh.face_varying_linear_interpolation)
    });
    mesh_field(&["Triangle Subdivision Rule"], |mesh| {
        json!(mesh.triangle_subdivision_rule)
    });

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Canceller, Context};
    use crate::name::names_to_string;
    use crate::scene::MemoryScene;

    fn scene() -> SceneHandle {
        Arc::new(
            MemoryScene::from_json(json!({
                "root": {
                    "children": {
                        "plane": {
                            "transform": { "translate": [0, 1, 0] },
                            "object": {
                                "type": "MeshPrimitive",
                                "verticesPerFace": [4],
                                "vertexIds": [0, 1, 3, 2],
                                "cornerIds": [0],
                                "cornerSharpnesses": [2.5],
                                "variables": {
                                    "P": {
                                        "interpolation": "Vertex",
                                        "data": [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 1.0]]
                                    },
                                    "uv": {
                                        "interpolation": "FaceVarying",
                                        "data": [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
                                        "indices": [0, 1, 2, 3]
                                    }
                                }
                            }
                        }
                    }
                }
            }))
            .unwrap(),
        )
    }

    fn keys(inspections: &Inspections) -> Vec<String> {
        inspections.keys().map(|key| names_to_string(key)).collect()
    }

    fn value(inspections: &Inspections, path: &str, scope: &Scope) -> Result<Option<Value>> {
        let inspector = inspections
            .get(&path.as_names())
            .unwrap_or_else(|| panic!("no inspector at {path}"));
        Ok(inspector.inspect(scope)?.map(|inspection| inspection.value))
    }

    #[test]
    fn subdivision_and_topology_for_meshes() -> Result<()> {
        let scene = scene();
        let canceller = Canceller::new();
        let context = Context::new().with_scene_path(&"/plane".as_names());
        let scope = Scope::new(&context, &canceller);
        let edit_target = EditTarget::none();

        let subdivision = subdivision(&scene, &edit_target, &scope)?;
        assert_eq!(subdivision.len(), 11);
        assert_eq!(value(&subdivision, "/Corners", &scope)?, Some(json!(1)));
        assert_eq!(
            value(&subdivision, "/Corners/Sharpnesses", &scope)?,
            Some(json!([2.5]))
        );

        let topology = primitive_topology(&scene, &edit_target, &scope)?;
        assert_eq!(
            keys(&topology),
            vec!["/Constant", "/FaceVarying", "/Uniform", "/Varying", "/Vertex"]
        );
        assert_eq!(value(&topology, "/Vertex", &scope)?, Some(json!(4)));
        assert!(curves_topology(&scene, &edit_target, &scope)?.is_empty());
        Ok(())
    }

    #[test]
    fn primitive_variables_expose_four_fields() -> Result<()> {
        let scene = scene();
        let canceller = Canceller::new();
        let context = Context::new().with_scene_path(&"/plane".as_names());
        let scope = Scope::new(&context, &canceller);

        let variables = primitive_variables(&scene, &EditTarget::none(), &scope)?;
        assert_eq!(variables.len(), 8);
        assert_eq!(
            value(&variables, "/uv/Interpolation", &scope)?,
            Some(json!("FaceVarying"))
        );
        assert_eq!(
            value(&variables, "/P/Type", &scope)?,
            Some(json!("V3fVectorData"))
        );
        assert_eq!(value(&variables, "/P/Indices", &scope)?, None);
        assert_eq!(
            value(&variables, "/uv/Indices", &scope)?,
            Some(json!([0, 1, 2, 3]))
        );
        Ok(())
    }

    #[test]
    fn transform_components() -> Result<()> {
        let scene = scene();
        let canceller = Canceller::new();
        let context = Context::new().with_scene_path(&"/plane".as_names());
        let scope = Scope::new(&context, &canceller);

        let transforms = transform(&scene, &EditTarget::none(), &scope)?;
        assert_eq!(transforms.len(), 10);
        assert_eq!(
            value(&transforms, "/World/Translate", &scope)?,
            Some(json!([0.0, 1.0, 0.0]))
        );
        assert_eq!(
            value(&transforms, "/Local/Scale", &scope)?,
            Some(json!([1.0, 1.0, 1.0]))
        );
        Ok(())
    }

    #[test]
    fn world_bound_is_transformed() -> Result<()> {
        let scene = scene();
        let canceller = Canceller::new();
        let context = Context::new().with_scene_path(&"/plane".as_names());
        let scope = Scope::new(&context, &canceller);

        let bounds = bound(&scene, &EditTarget::none(), &scope)?;
        assert_eq!(
            value(&bounds, "/World", &scope)?,
            Some(json!({ "min": [0.0, 1.0, 0.0], "max": [1.0, 1.0, 1.0] }))
        );
        Ok(())
    }
}
