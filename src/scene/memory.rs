use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::RwLock;

use anyhow::{anyhow, Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::math::{Bound, Matrix, V3};
use super::object::Object;
use super::Scene;
use crate::context::Scope;
use crate::name::{names_to_string, Name};
use crate::signal::Signal;

/// Either an explicit matrix or scale/rotate/translate components. Rotation
/// components are XYZ euler angles in degrees.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransformDescription {
    Matrix(Matrix),
    Components {
        #[serde(default)]
        translate: Option<V3>,
        #[serde(default)]
        rotate: Option<V3>,
        #[serde(default)]
        scale: Option<V3>,
    },
}

impl TransformDescription {
    pub fn matrix(&self) -> Matrix {
        match self {
            TransformDescription::Matrix(matrix) => *matrix,
            TransformDescription::Components {
                translate,
                rotate,
                scale,
            } => {
                let scale = Matrix::from_scale(scale.unwrap_or([1.0; 3]));
                let rotate = rotate
                    .map(|r| Matrix::from_euler_xyz(r.map(f64::to_radians)))
                    .unwrap_or_default();
                let translate = Matrix::from_translation(translate.unwrap_or([0.0; 3]));
                scale.multiply(&rotate).multiply(&translate)
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound: Option<Bound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformDescription>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub object: Object,
    #[serde(default)]
    pub children: BTreeMap<String, Location>,
}

impl Location {
    fn find(&self, path: &[Name]) -> Option<&Location> {
        let mut current = self;
        for name in path {
            current = current.children.get(name.as_str())?;
        }
        Some(current)
    }

    fn find_mut(&mut self, path: &[Name]) -> Option<&mut Location> {
        let mut current = self;
        for name in path {
            current = current.children.get_mut(name.as_str())?;
        }
        Some(current)
    }

    fn matrix(&self) -> Matrix {
        self.transform
            .as_ref()
            .map(TransformDescription::matrix)
            .unwrap_or_default()
    }

    /// Explicit bound, or the union of the object's bound and the children's
    /// transformed bounds.
    fn computed_bound(&self) -> Bound {
        if let Some(bound) = self.bound {
            return bound;
        }
        let mut bound = self.object.bound();
        for child in self.children.values() {
            bound.extend_by(&child.matrix().transform_bound(&child.computed_bound()));
        }
        bound
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    #[serde(default)]
    pub globals: Map<String, Value>,
    #[serde(default)]
    pub root: Location,
}

/// A scene held entirely in memory, editable in place. Every edit emits the
/// change signal.
#[derive(Default)]
pub struct MemoryScene {
    state: RwLock<SceneDescription>,
    changed: Signal,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_description(description: SceneDescription) -> Self {
        Self {
            state: RwLock::new(description),
            changed: Signal::new(),
        }
    }

    pub fn from_json(value: Value) -> Result<Self> {
        let description: SceneDescription = serde_json::from_value(value)?;
        Ok(Self::from_description(description))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let description: SceneDescription = serde_yaml::from_str(text)?;
        Ok(Self::from_description(description))
    }

    /// Loads a `.json` file with serde_json and anything else as YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("unable to read scene file: {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let description: SceneDescription = if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("invalid JSON scene: {}", path.display()))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("invalid YAML scene: {}", path.display()))?
        };
        Ok(Self::from_description(description))
    }

    pub fn description(&self) -> SceneDescription {
        self.state.read().expect("scene poisoned").clone()
    }

    fn read_location<T>(&self, path: &[Name], f: impl FnOnce(&Location) -> T) -> Result<T> {
        let state = self.state.read().expect("scene poisoned");
        let location = state
            .root
            .find(path)
            .ok_or_else(|| anyhow!("location {} does not exist", names_to_string(path)))?;
        Ok(f(location))
    }

    fn edit_location<T>(&self, path: &[Name], f: impl FnOnce(&mut Location) -> T) -> Result<T> {
        let result = {
            let mut state = self.state.write().expect("scene poisoned");
            let location = state
                .root
                .find_mut(path)
                .ok_or_else(|| anyhow!("location {} does not exist", names_to_string(path)))?;
            f(location)
        };
        self.changed.emit();
        Ok(result)
    }

    pub fn add_location(&self, path: &[Name], location: Location) -> Result<()> {
        let (name, parent) = path
            .split_last()
            .ok_or_else(|| anyhow!("cannot replace the root location"))?;
        self.edit_location(parent, |parent| {
            parent.children.insert(name.as_str().to_string(), location);
        })
    }

    pub fn remove_location(&self, path: &[Name]) -> Result<Option<Location>> {
        let (name, parent) = path
            .split_last()
            .ok_or_else(|| anyhow!("cannot remove the root location"))?;
        self.edit_location(parent, |parent| parent.children.remove(name.as_str()))
    }

    pub fn set_attribute(&self, path: &[Name], name: &str, value: Value) -> Result<()> {
        self.edit_location(path, |location| {
            location.attributes.insert(name.to_string(), value);
        })
    }

    pub fn remove_attribute(&self, path: &[Name], name: &str) -> Result<Option<Value>> {
        self.edit_location(path, |location| location.attributes.remove(name))
    }

    pub fn set_transform(&self, path: &[Name], matrix: Matrix) -> Result<()> {
        self.edit_location(path, |location| {
            location.transform = Some(TransformDescription::Matrix(matrix));
        })
    }

    pub fn set_bound(&self, path: &[Name], bound: Option<Bound>) -> Result<()> {
        self.edit_location(path, |location| location.bound = bound)
    }

    pub fn set_object(&self, path: &[Name], object: Object) -> Result<()> {
        self.edit_location(path, |location| location.object = object)
    }

    pub fn set_global(&self, name: &str, value: Value) {
        {
            let mut state = self.state.write().expect("scene poisoned");
            state.globals.insert(name.to_string(), value);
        }
        self.changed.emit();
    }

    pub fn remove_global(&self, name: &str) -> Option<Value> {
        let removed = {
            let mut state = self.state.write().expect("scene poisoned");
            state.globals.remove(name)
        };
        self.changed.emit();
        removed
    }
}

impl Scene for MemoryScene {
    fn exists(&self, scope: &Scope) -> Result<bool> {
        let Some(location) = scope.location() else {
            return Ok(false);
        };
        let state = self.state.read().expect("scene poisoned");
        Ok(state.root.find(&location).is_some())
    }

    fn bound(&self, scope: &Scope) -> Result<Bound> {
        self.read_location(&scope.require_location()?, Location::computed_bound)
    }

    fn transform(&self, scope: &Scope) -> Result<Matrix> {
        let location = scope.require_location()?;
        if location.is_empty() {
            return Ok(Matrix::identity());
        }
        self.read_location(&location, Location::matrix)
    }

    fn attributes(&self, scope: &Scope) -> Result<Map<String, Value>> {
        self.read_location(&scope.require_location()?, |location| {
            location.attributes.clone()
        })
    }

    fn object(&self, scope: &Scope) -> Result<Object> {
        self.read_location(&scope.require_location()?, |location| {
            location.object.clone()
        })
    }

    fn child_names(&self, scope: &Scope) -> Result<Vec<Name>> {
        self.read_location(&scope.require_location()?, |location| {
            location.children.keys().map(Name::from).collect()
        })
    }

    fn globals(&self, _scope: &Scope) -> Result<Map<String, Value>> {
        Ok(self.state.read().expect("scene poisoned").globals.clone())
    }

    fn changed_signal(&self) -> &Signal {
        &self.changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Canceller, Context};
    use crate::name::AsNames;
    use serde_json::json;

    const SCENE: &str = r#"
globals:
  option:render:camera: /cam
root:
  attributes:
    user:root: 1
  children:
    group:
      transform: { translate: [1, 0, 0] }
      attributes:
        doubleSided: false
      children:
        sphere:
          transform: { translate: [0, 2, 0] }
          bound: { min: [-1, -1, -1], max: [1, 1, 1] }
          attributes:
            doubleSided: true
"#;

    fn scope_at<'a>(context: &'a mut Context, canceller: &'a Canceller, path: &str) -> Scope<'a> {
        context.set_scene_path(&path.as_names());
        Scope::new(context, canceller)
    }

    #[test]
    fn full_transform_and_attributes_accumulate() -> Result<()> {
        let scene = MemoryScene::from_yaml_str(SCENE)?;
        let canceller = Canceller::new();
        let mut context = Context::new();
        let scope = scope_at(&mut context, &canceller, "/group/sphere");

        let full = scene.full_transform(&scope)?;
        assert_eq!(full.transform_point([0.0, 0.0, 0.0]), [1.0, 2.0, 0.0]);

        let attributes = scene.full_attributes(&scope)?;
        assert_eq!(attributes.get("doubleSided"), Some(&json!(true)));
        assert_eq!(attributes.get("user:root"), Some(&json!(1)));
        Ok(())
    }

    #[test]
    fn computed_bound_includes_children() -> Result<()> {
        let scene = MemoryScene::from_yaml_str(SCENE)?;
        let canceller = Canceller::new();
        let mut context = Context::new();
        let scope = scope_at(&mut context, &canceller, "/group");
        let bound = scene.bound(&scope)?;
        assert_eq!(bound, Bound::new([-1.0, 1.0, -1.0], [1.0, 3.0, 1.0]));
        Ok(())
    }

    #[test]
    fn edits_emit_change_signal() -> Result<()> {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let scene = MemoryScene::from_yaml_str(SCENE)?;
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let _connection = scene.changed_signal().connect(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        scene.set_attribute(&"/group".as_names(), "user:foo", json!("bar"))?;
        scene.set_global("option:user:x", json!(1));
        assert!(scene.set_attribute(&"/missing".as_names(), "a", json!(1)).is_err());
        assert_eq!(count.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[test]
    fn missing_location_does_not_exist() -> Result<()> {
        let scene = MemoryScene::from_yaml_str(SCENE)?;
        let canceller = Canceller::new();
        let context = Context::new();
        assert!(!scene.exists(&Scope::new(&context, &canceller))?);
        let mut context = Context::new();
        let scope = scope_at(&mut context, &canceller, "/group/cube");
        assert!(!scene.exists(&scope)?);
        assert!(scene.object(&scope).is_err());
        Ok(())
    }
}
