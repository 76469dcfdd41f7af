use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::config::InspectorConfig;
use crate::context::Scope;
use crate::inspector::{EditTarget, InspectorHandle};
use crate::name::{names_to_string, AsNames, Name, Names};
use crate::providers::register_builtin;
use crate::scene::SceneHandle;

// Ordered, so paths sharing a prefix are contiguous.
pub type Inspections = BTreeMap<Names, InspectorHandle>;

pub trait Provider: Send + Sync {
    fn provide(
        &self,
        scene: &SceneHandle,
        edit_target: &EditTarget,
        scope: &Scope,
    ) -> Result<Inspections>;
}

impl<F> Provider for F
where
    F: Fn(&SceneHandle, &EditTarget, &Scope) -> Result<Inspections> + Send + Sync + 'static,
{
    fn provide(
        &self,
        scene: &SceneHandle,
        edit_target: &EditTarget,
        scope: &Scope,
    ) -> Result<Inspections> {
        (self)(scene, edit_target, scope)
    }
}

/// What to do when the same full path is contributed twice, by two providers
/// or by the two bound contexts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CollisionPolicy {
    #[default]
    LastWriterWins,
    FirstWriterWins,
}

#[derive(Clone)]
pub struct ProviderEntry {
    pub root: Names,
    pub provider: Arc<dyn Provider>,
}

impl fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("root", &names_to_string(&self.root))
            .finish()
    }
}

struct RegistryInner {
    // Sorted by root; equal roots keep registration order.
    entries: Vec<ProviderEntry>,
    per_location: BTreeSet<Name>,
    collision_policy: CollisionPolicy,
}

impl RegistryInner {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            per_location: BTreeSet::new(),
            collision_policy: CollisionPolicy::default(),
        }
    }
}

#[derive(Clone)]
pub struct Registry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryInner::new())),
        }
    }

    pub fn with_builtin(config: &InspectorConfig) -> Self {
        let registry = Self::new();
        registry.configure(config);
        register_builtin(&registry, config);
        registry
    }

    pub fn configure(&self, config: &InspectorConfig) {
        let mut inner = self.inner.lock().expect("registry poisoned");
        inner.per_location = config
            .per_location_namespaces
            .iter()
            .map(|namespace| Name::new(namespace))
            .collect();
        inner.collision_policy = config.collision_policy;
    }

    pub fn register<R, P>(&self, root: R, provider: P)
    where
        R: AsNames,
        P: Provider + 'static,
    {
        self.register_arc(root.as_names(), Arc::new(provider));
    }

    pub fn register_arc(&self, root: Names, provider: Arc<dyn Provider>) {
        let mut inner = self.inner.lock().expect("registry poisoned");
        let position = inner.entries.partition_point(|entry| entry.root <= root);
        inner.entries.insert(position, ProviderEntry { root, provider });
    }

    /// Entries whose root shares `path`'s first segment, plus entries registered
    /// at the root itself. An empty `path` matches everything.
    pub fn providers_matching(&self, path: &[Name]) -> Vec<ProviderEntry> {
        let inner = self.inner.lock().expect("registry poisoned");
        match path.first() {
            None => inner.entries.clone(),
            Some(first) => inner
                .entries
                .iter()
                .filter(|entry| entry.root.first().map_or(true, |root| root == first))
                .cloned()
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("registry poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn roots(&self) -> Vec<Names> {
        let inner = self.inner.lock().expect("registry poisoned");
        inner.entries.iter().map(|entry| entry.root.clone()).collect()
    }

    pub fn add_per_location_namespace(&self, namespace: &str) {
        let mut inner = self.inner.lock().expect("registry poisoned");
        inner.per_location.insert(Name::new(namespace));
    }

    pub fn is_per_location(&self, root: &[Name]) -> bool {
        let inner = self.inner.lock().expect("registry poisoned");
        root.first()
            .map(|first| inner.per_location.contains(first))
            .unwrap_or(false)
    }

    pub fn collision_policy(&self) -> CollisionPolicy {
        self.inner.lock().expect("registry poisoned").collision_policy
    }

    pub fn set_collision_policy(&self, policy: CollisionPolicy) {
        self.inner.lock().expect("registry poisoned").collision_policy = policy;
    }
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

pub fn global() -> &'static Registry {
    GLOBAL.get_or_init(|| Registry::with_builtin(&InspectorConfig::default()))
}

pub fn init_global(config: &InspectorConfig) -> Result<&'static Registry> {
    let mut initialised = false;
    let registry = GLOBAL.get_or_init(|| {
        initialised = true;
        Registry::with_builtin(config)
    });
    if initialised {
        Ok(registry)
    } else {
        Err(anyhow!("the global inspection registry is already initialised"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &SceneHandle, _: &EditTarget, _: &Scope) -> Result<Inspections> {
        Ok(Inspections::new())
    }

    #[test]
    fn entries_are_ordered_by_root_then_registration() {
        let registry = Registry::new();
        registry.register("Selection/Object/Topology", noop);
        registry.register("Globals/Options", noop);
        registry.register("Selection/Object", noop);
        registry.register("Selection/Object", noop);
        let roots: Vec<String> = registry.roots().iter().map(|r| names_to_string(r)).collect();
        assert_eq!(
            roots,
            vec![
                "/Globals/Options",
                "/Selection/Object",
                "/Selection/Object",
                "/Selection/Object/Topology"
            ]
        );
    }

    #[test]
    fn matching_filters_on_first_segment() {
        let registry = Registry::new();
        registry.register("Selection/Bound", noop);
        registry.register("Selection/Object/Topology", noop);
        registry.register("Globals/Options", noop);

        assert_eq!(registry.providers_matching(&[]).len(), 3);
        assert_eq!(registry.providers_matching(&"Selection".as_names()).len(), 2);
        assert_eq!(
            registry
                .providers_matching(&"Selection/Object/Topology/Vertex".as_names())
                .len(),
            2
        );
        assert_eq!(registry.providers_matching(&"Globals".as_names()).len(), 1);
        assert!(registry.providers_matching(&"Nothing".as_names()).is_empty());

        registry.register("/", noop);
        assert_eq!(registry.providers_matching(&"Globals".as_names()).len(), 2);
        assert_eq!(registry.providers_matching(&"Nothing".as_names()).len(), 1);
    }

    #[test]
    fn per_location_namespaces_come_from_config() {
        let registry = Registry::new();
        registry.configure(&InspectorConfig::default());
        assert!(registry.is_per_location(&"Selection/Bound".as_names()));
        assert!(!registry.is_per_location(&"Globals/Options".as_names()));
        assert!(!registry.is_per_location(&[]));
    }
}
