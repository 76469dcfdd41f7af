use anyhow::{anyhow, Result};
use serde_json::{Map, Value};

use super::{Bound, Matrix, Object, Scene, SceneHandle};
use crate::context::Scope;
use crate::name::Name;
use crate::signal::{Connection, Signal};

pub const INPUT_INDEX_VARIABLE: &str = "sceneInspector:inputIndex";

/// Routes every query to one of several inputs, chosen by the integer context
/// variable `sceneInspector:inputIndex` (0 when unset). Lets two different
/// scenes be compared through a single handle under contexts A and B.
pub struct SwitchScene {
    inputs: Vec<SceneHandle>,
    changed: Signal,
    _connections: Vec<Connection>,
}

impl SwitchScene {
    pub fn new(inputs: Vec<SceneHandle>) -> Self {
        let changed = Signal::new();
        let connections = inputs
            .iter()
            .map(|input| {
                let forward = changed.clone();
                input.changed_signal().connect(move || forward.emit())
            })
            .collect();
        Self {
            inputs,
            changed,
            _connections: connections,
        }
    }

    pub fn inputs(&self) -> &[SceneHandle] {
        &self.inputs
    }

    fn active(&self, scope: &Scope) -> Result<&SceneHandle> {
        let index = scope
            .context()
            .get(INPUT_INDEX_VARIABLE)
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;
        self.inputs
            .get(index)
            .ok_or_else(|| anyhow!("switch has no input {index}"))
    }
}

impl Scene for SwitchScene {
    fn exists(&self, scope: &Scope) -> Result<bool> {
        self.active(scope)?.exists(scope)
    }

    fn bound(&self, scope: &Scope) -> Result<Bound> {
        self.active(scope)?.bound(scope)
    }

    fn transform(&self, scope: &Scope) -> Result<Matrix> {
        self.active(scope)?.transform(scope)
    }

    fn attributes(&self, scope: &Scope) -> Result<Map<String, Value>> {
        self.active(scope)?.attributes(scope)
    }

    fn object(&self, scope: &Scope) -> Result<Object> {
        self.active(scope)?.object(scope)
    }

    fn child_names(&self, scope: &Scope) -> Result<Vec<Name>> {
        self.active(scope)?.child_names(scope)
    }

    fn globals(&self, scope: &Scope) -> Result<Map<String, Value>> {
        self.active(scope)?.globals(scope)
    }

    fn changed_signal(&self) -> &Signal {
        &self.changed
    }

    fn full_transform(&self, scope: &Scope) -> Result<Matrix> {
        self.active(scope)?.full_transform(scope)
    }

    fn full_attributes(&self, scope: &Scope) -> Result<Map<String, Value>> {
        self.active(scope)?.full_attributes(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Canceller, Context};
    use crate::scene::MemoryScene;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn selects_input_from_context_and_forwards_changes() -> Result<()> {
        let a = Arc::new(MemoryScene::from_json(json!({ "globals": { "option:x": 1 } }))?);
        let b = Arc::new(MemoryScene::from_json(json!({ "globals": { "option:x": 2 } }))?);
        let switch = SwitchScene::new(vec![a.clone() as SceneHandle, b.clone() as SceneHandle]);

        let canceller = Canceller::new();
        let context_a = Context::new();
        let context_b = Context::new().with(INPUT_INDEX_VARIABLE, 1);
        let globals_a = switch.globals(&Scope::new(&context_a, &canceller))?;
        let globals_b = switch.globals(&Scope::new(&context_b, &canceller))?;
        assert_eq!(globals_a.get("option:x"), Some(&json!(1)));
        assert_eq!(globals_b.get("option:x"), Some(&json!(2)));

        let bad = Context::new().with(INPUT_INDEX_VARIABLE, 5);
        assert!(switch.globals(&Scope::new(&bad, &canceller)).is_err());

        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let _connection = switch.changed_signal().connect(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        b.set_global("option:y", json!(true));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        Ok(())
    }
}
