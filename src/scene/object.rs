use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::math::Bound;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Interpolation {
    Invalid,
    Constant,
    Uniform,
    Vertex,
    Varying,
    FaceVarying,
}

impl Interpolation {
    /// The interpolations a primitive reports sizes for, in display order.
    pub const SIZED: [Interpolation; 5] = [
        Interpolation::Constant,
        Interpolation::Uniform,
        Interpolation::Vertex,
        Interpolation::Varying,
        Interpolation::FaceVarying,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Interpolation::Invalid => "Invalid",
            Interpolation::Constant => "Constant",
            Interpolation::Uniform => "Uniform",
            Interpolation::Vertex => "Vertex",
            Interpolation::Varying => "Varying",
            Interpolation::FaceVarying => "FaceVarying",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveVariable {
    pub interpolation: Interpolation,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<Vec<i64>>,
}

/// Type name of a primitive variable's data, in the `<Type>Data` /
/// `<Type>VectorData` style used for display.
pub fn data_type_name(value: &Value) -> Option<String> {
    fn scalar(value: &Value) -> Option<&'static str> {
        match value {
            Value::Bool(_) => Some("Bool"),
            Value::Number(n) if n.is_f64() => Some("Float"),
            Value::Number(_) => Some("Int"),
            Value::String(_) => Some("String"),
            Value::Array(items) => {
                let all_numbers = items.iter().all(Value::is_number);
                let all_ints = items.iter().all(|v| v.is_i64() || v.is_u64());
                match (items.len(), all_numbers, all_ints) {
                    (2, true, true) => Some("V2i"),
                    (2, true, false) => Some("V2f"),
                    (3, true, true) => Some("V3i"),
                    (3, true, false) => Some("V3f"),
                    (4, true, _) => Some("Color4f"),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    match value {
        Value::Null => None,
        Value::Object(_) => Some("CompoundData".to_string()),
        Value::Array(items) => {
            if let Some(name) = scalar(value) {
                if !items.iter().any(Value::is_array) {
                    return Some(format!("{name}Data"));
                }
            }
            let first = items.first()?;
            let element = scalar(first)?;
            if items.iter().all(|item| scalar(item) == Some(element)) {
                Some(format!("{element}VectorData"))
            } else {
                None
            }
        }
        other => scalar(other).map(|name| format!("{name}Data")),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CubicBasis {
    #[default]
    Linear,
    Bezier,
    BSpline,
    CatmullRom,
    Constant,
}

impl CubicBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            CubicBasis::Linear => "Linear",
            CubicBasis::Bezier => "Bezier",
            CubicBasis::BSpline => "BSpline",
            CubicBasis::CatmullRom => "CatmullRom",
            CubicBasis::Constant => "Constant",
        }
    }

    fn step(&self) -> usize {
        match self {
            CubicBasis::Bezier => 3,
            _ => 1,
        }
    }

    fn is_cubic(&self) -> bool {
        !matches!(self, CubicBasis::Linear | CubicBasis::Constant)
    }
}

fn default_mesh_interpolation() -> String {
    "linear".to_string()
}

fn default_interpolate_boundary() -> String {
    "edgeAndCorner".to_string()
}

fn default_face_varying_linear_interpolation() -> String {
    "cornersPlus1".to_string()
}

fn default_triangle_subdivision_rule() -> String {
    "catmullClark".to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mesh {
    pub vertices_per_face: Vec<i64>,
    pub vertex_ids: Vec<i64>,
    #[serde(default = "default_mesh_interpolation")]
    pub interpolation: String,
    #[serde(default)]
    pub corner_ids: Vec<i64>,
    #[serde(default)]
    pub corner_sharpnesses: Vec<f64>,
    #[serde(default)]
    pub crease_lengths: Vec<i64>,
    #[serde(default)]
    pub crease_ids: Vec<i64>,
    #[serde(default)]
    pub crease_sharpnesses: Vec<f64>,
    #[serde(default = "default_interpolate_boundary")]
    pub interpolate_boundary: String,
    #[serde(default = "default_face_varying_linear_interpolation")]
    pub face_varying_linear_interpolation: String,
    #[serde(default = "default_triangle_subdivision_rule")]
    pub triangle_subdivision_rule: String,
    #[serde(default)]
    pub variables: BTreeMap<String, PrimitiveVariable>,
}

impl Mesh {
    pub fn num_faces(&self) -> usize {
        self.vertices_per_face.len()
    }

    pub fn num_points(&self) -> usize {
        self.vertex_ids
            .iter()
            .max()
            .map(|max| (*max + 1).max(0) as usize)
            .unwrap_or(0)
    }

    pub fn variable_size(&self, interpolation: Interpolation) -> usize {
        match interpolation {
            Interpolation::Constant => 1,
            Interpolation::Uniform => self.num_faces(),
            Interpolation::Vertex | Interpolation::Varying => self.num_points(),
            Interpolation::FaceVarying => self.vertex_ids.len(),
            Interpolation::Invalid => 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Curves {
    pub vertices_per_curve: Vec<i64>,
    #[serde(default)]
    pub basis: CubicBasis,
    #[serde(default)]
    pub periodic: bool,
    #[serde(default)]
    pub variables: BTreeMap<String, PrimitiveVariable>,
}

impl Curves {
    pub fn num_curves(&self) -> usize {
        self.vertices_per_curve.len()
    }

    fn num_segments(&self, vertices: usize) -> usize {
        if self.basis.is_cubic() {
            let step = self.basis.step();
            if self.periodic {
                vertices / step
            } else {
                vertices.saturating_sub(4) / step + 1
            }
        } else if self.periodic {
            vertices
        } else {
            vertices.saturating_sub(1)
        }
    }

    pub fn variable_size(&self, interpolation: Interpolation) -> usize {
        let counts = self
            .vertices_per_curve
            .iter()
            .map(|count| (*count).max(0) as usize);
        match interpolation {
            Interpolation::Constant => 1,
            Interpolation::Uniform => self.num_curves(),
            Interpolation::Vertex => counts.sum(),
            Interpolation::Varying | Interpolation::FaceVarying => counts
                .map(|count| self.num_segments(count) + usize::from(!self.periodic))
                .sum(),
            Interpolation::Invalid => 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Points {
    pub num_points: usize,
    #[serde(default)]
    pub variables: BTreeMap<String, PrimitiveVariable>,
}

impl Points {
    pub fn variable_size(&self, interpolation: Interpolation) -> usize {
        match interpolation {
            Interpolation::Constant | Interpolation::Uniform => 1,
            Interpolation::Invalid => 0,
            _ => self.num_points,
        }
    }
}

/// The object at a scene location.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type")]
pub enum Object {
    #[default]
    NullObject,
    MeshPrimitive(Mesh),
    CurvesPrimitive(Curves),
    PointsPrimitive(Points),
    Camera {
        #[serde(default)]
        parameters: Map<String, Value>,
    },
    ExternalProcedural {
        #[serde(default, rename = "fileName")]
        file_name: String,
        #[serde(default)]
        parameters: Map<String, Value>,
    },
}

impl Object {
    pub fn is_null(&self) -> bool {
        matches!(self, Object::NullObject)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Object::NullObject => "NullObject",
            Object::MeshPrimitive(_) => "MeshPrimitive",
            Object::CurvesPrimitive(_) => "CurvesPrimitive",
            Object::PointsPrimitive(_) => "PointsPrimitive",
            Object::Camera { .. } => "Camera",
            Object::ExternalProcedural { .. } => "ExternalProcedural",
        }
    }

    pub fn is_primitive(&self) -> bool {
        self.variables().is_some()
    }

    pub fn variables(&self) -> Option<&BTreeMap<String, PrimitiveVariable>> {
        match self {
            Object::MeshPrimitive(mesh) => Some(&mesh.variables),
            Object::CurvesPrimitive(curves) => Some(&curves.variables),
            Object::PointsPrimitive(points) => Some(&points.variables),
            _ => None,
        }
    }

    pub fn variable(&self, name: &str) -> Option<&PrimitiveVariable> {
        self.variables()?.get(name)
    }

    pub fn variable_size(&self, interpolation: Interpolation) -> Option<usize> {
        match self {
            Object::MeshPrimitive(mesh) => Some(mesh.variable_size(interpolation)),
            Object::CurvesPrimitive(curves) => Some(curves.variable_size(interpolation)),
            Object::PointsPrimitive(points) => Some(points.variable_size(interpolation)),
            _ => None,
        }
    }

    /// Parameters of cameras and external procedurals.
    pub fn parameters(&self) -> Option<&Map<String, Value>> {
        match self {
            Object::Camera { parameters } => Some(parameters),
            Object::ExternalProcedural { parameters, .. } => Some(parameters),
            _ => None,
        }
    }

    pub fn as_mesh(&self) -> Option<&Mesh> {
        match self {
            Object::MeshPrimitive(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn as_curves(&self) -> Option<&Curves> {
        match self {
            Object::CurvesPrimitive(curves) => Some(curves),
            _ => None,
        }
    }

    /// Bound of the `P` primitive variable, when present.
    pub fn bound(&self) -> Bound {
        let mut bound = Bound::empty();
        let Some(Value::Array(points)) = self.variable("P").map(|variable| &variable.data) else {
            return bound;
        };
        for point in points {
            if let Some(coords) = point.as_array() {
                let axis = |i: usize| coords.get(i).and_then(Value::as_f64).unwrap_or(0.0);
                bound.extend_by_point([axis(0), axis(1), axis(2)]);
            }
        }
        bound
    }
}

/// A render output declared in the globals under `output:<name>`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub name: String,
    #[serde(rename = "type")]
    pub output_type: String,
    pub data: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mesh_sizes_follow_topology() {
        let object: Object = serde_json::from_value(json!({
            "type": "MeshPrimitive",
            "verticesPerFace": [4, 4],
            "vertexIds": [0, 1, 4, 3, 1, 2, 5, 4]
        }))
        .unwrap();
        assert_eq!(object.variable_size(Interpolation::Uniform), Some(2));
        assert_eq!(object.variable_size(Interpolation::Vertex), Some(6));
        assert_eq!(object.variable_size(Interpolation::FaceVarying), Some(8));
        let mesh = object.as_mesh().unwrap();
        assert_eq!(mesh.interpolate_boundary, "edgeAndCorner");
    }

    #[test]
    fn curves_varying_size_depends_on_basis() {
        let linear = Curves {
            vertices_per_curve: vec![4, 3],
            basis: CubicBasis::Linear,
            periodic: false,
            variables: BTreeMap::new(),
        };
        assert_eq!(linear.variable_size(Interpolation::Vertex), 7);
        assert_eq!(linear.variable_size(Interpolation::Varying), 7);

        let bspline = Curves {
            basis: CubicBasis::BSpline,
            ..linear.clone()
        };
        assert_eq!(bspline.variable_size(Interpolation::Varying), 2 + 2);
    }

    #[test]
    fn data_type_names() {
        assert_eq!(data_type_name(&json!(1.5)).as_deref(), Some("FloatData"));
        assert_eq!(data_type_name(&json!([1, 2, 3])).as_deref(), Some("V3iData"));
        assert_eq!(
            data_type_name(&json!([[0.0, 1.0, 2.5], [1.0, 1.0, 1.5]])).as_deref(),
            Some("V3fVectorData")
        );
        assert_eq!(
            data_type_name(&json!(["a", "b"])).as_deref(),
            Some("StringVectorData")
        );
        assert_eq!(data_type_name(&Value::Null), None);
    }
}
