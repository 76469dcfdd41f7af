//! Read-only access to the scene graph being inspected.
//!
//! Everything location-dependent reads the current location from the scope's
//! `scene:path` variable, so the same handle answers differently under
//! different evaluation contexts.

pub mod math;
pub mod memory;
pub mod object;
pub mod switch;

use std::sync::Arc;

use anyhow::Result;
use serde_json::{Map, Value};

use crate::context::Scope;
use crate::name::Name;
use crate::signal::Signal;

pub use math::{Bound, Matrix, Shrt, V3};
pub use memory::MemoryScene;
pub use object::{
    data_type_name, CubicBasis, Curves, Interpolation, Mesh, Object, Output, Points,
    PrimitiveVariable,
};
pub use switch::{SwitchScene, INPUT_INDEX_VARIABLE};

pub type SceneHandle = Arc<dyn Scene>;

pub trait Scene: Send + Sync {
    /// Whether the scope's location exists. A scope without a location never
    /// refers to an existing location.
    fn exists(&self, scope: &Scope) -> Result<bool>;

    fn bound(&self, scope: &Scope) -> Result<Bound>;

    fn transform(&self, scope: &Scope) -> Result<Matrix>;

    fn attributes(&self, scope: &Scope) -> Result<Map<String, Value>>;

    fn object(&self, scope: &Scope) -> Result<Object>;

    fn child_names(&self, scope: &Scope) -> Result<Vec<Name>>;

    fn globals(&self, scope: &Scope) -> Result<Map<String, Value>>;

    /// Emitted after any structural or value edit.
    fn changed_signal(&self) -> &Signal;

    /// Local-to-world transform of the scope's location.
    fn full_transform(&self, scope: &Scope) -> Result<Matrix> {
        let location = scope.require_location()?;
        let mut result = Matrix::identity();
        for depth in (1..=location.len()).rev() {
            scope.ensure_not_cancelled()?;
            let ancestor = scope.with_location(&location[..depth]);
            result = result.multiply(&self.transform(&ancestor)?);
        }
        Ok(result)
    }

    /// Attributes inherited from every ancestor, nearer locations winning.
    fn full_attributes(&self, scope: &Scope) -> Result<Map<String, Value>> {
        let location = scope.require_location()?;
        let mut result = Map::new();
        for depth in 0..=location.len() {
            scope.ensure_not_cancelled()?;
            let ancestor = scope.with_location(&location[..depth]);
            for (name, value) in self.attributes(&ancestor)? {
                result.insert(name, value);
            }
        }
        Ok(result)
    }
}
