use std::collections::btree_map::Entry;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use serde_json::json;

use crate::column::Side;
use crate::context::{CancelledError, Canceller, Context, Scope};
use crate::inspector::{EditTarget, InspectorHandle};
use crate::name::{names_to_string, AsNames, Name, Names};
use crate::registry::{self, CollisionPolicy, Inspections, ProviderEntry, Registry};
use crate::scene::SceneHandle;
use crate::signal::{Connection, Signal};
use crate::tooling::logging::{log_debug, log_trace, log_warn, LogScope};

/// The evaluation contexts a path is bound to: one for browsing, two for an
/// A/B comparison.
#[derive(Clone, Debug, PartialEq)]
pub struct Contexts {
    a: Arc<Context>,
    b: Option<Arc<Context>>,
}

impl Contexts {
    pub fn single(context: Context) -> Self {
        Self {
            a: Arc::new(context),
            b: None,
        }
    }

    pub fn pair(a: Context, b: Context) -> Self {
        Self {
            a: Arc::new(a),
            b: Some(Arc::new(b)),
        }
    }

    // Without a B context both sides read A.
    pub fn get(&self, side: Side) -> &Context {
        match (side, &self.b) {
            (Side::B, Some(b)) => b,
            _ => &self.a,
        }
    }

    pub fn is_diff(&self) -> bool {
        self.b.as_ref().map(|b| b != &self.a).unwrap_or(false)
    }

    fn distinct(&self) -> impl Iterator<Item = &Context> {
        let b = self.b.as_deref().filter(|b| *b != self.a.as_ref());
        std::iter::once(self.a.as_ref()).chain(b)
    }
}

/// A node in the merged inspection hierarchy. Nothing is cached; scene edits
/// raise `changed_signal` so observers know to query again.
pub struct InspectionPath {
    scene: SceneHandle,
    contexts: Contexts,
    edit_target: EditTarget,
    names: Names,
    registry: Registry,
    changed: Signal,
    _connection: Connection,
}

impl InspectionPath {
    pub fn new(
        scene: SceneHandle,
        contexts: Contexts,
        edit_target: EditTarget,
        names: impl AsNames,
    ) -> Self {
        Self::with_registry(registry::global().clone(), scene, contexts, edit_target, names)
    }

    pub fn with_registry(
        registry: Registry,
        scene: SceneHandle,
        contexts: Contexts,
        edit_target: EditTarget,
        names: impl AsNames,
    ) -> Self {
        let changed = Signal::new();
        let forward = changed.clone();
        let connection = scene.changed_signal().connect(move || forward.emit());
        Self {
            scene,
            contexts,
            edit_target,
            names: names.as_names(),
            registry,
            changed,
            _connection: connection,
        }
    }

    fn derive(&self, names: Names) -> Self {
        Self::with_registry(
            self.registry.clone(),
            self.scene.clone(),
            self.contexts.clone(),
            self.edit_target.clone(),
            names,
        )
    }

    pub fn names(&self) -> &[Name] {
        &self.names
    }

    pub fn name(&self) -> Option<&Name> {
        self.names.last()
    }

    pub fn is_root(&self) -> bool {
        self.names.is_empty()
    }

    pub fn child(&self, name: impl Into<Name>) -> Self {
        let mut names = self.names.clone();
        names.push(name.into());
        self.derive(names)
    }

    pub fn descendant(&self, relative: impl AsNames) -> Self {
        let mut names = self.names.clone();
        names.extend(relative.as_names());
        self.derive(names)
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, parent) = self.names.split_last()?;
        Some(self.derive(parent.to_vec()))
    }

    pub fn scene(&self) -> &SceneHandle {
        &self.scene
    }

    pub fn contexts(&self) -> &Contexts {
        &self.contexts
    }

    pub fn context(&self, side: Side) -> &Context {
        self.contexts.get(side)
    }

    pub fn is_diff(&self) -> bool {
        self.contexts.is_diff()
    }

    pub fn edit_target(&self) -> &EditTarget {
        &self.edit_target
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn changed_signal(&self) -> &Signal {
        &self.changed
    }

    pub fn is_valid(&self) -> bool {
        true
    }

    pub fn is_leaf(&self, canceller: &Canceller) -> Result<bool> {
        Ok(self.resolve(canceller)?.is_some() && self.children(canceller)?.is_empty())
    }

    pub fn children(&self, canceller: &Canceller) -> Result<Vec<InspectionPath>> {
        let providers = self.registry.providers_matching(&self.names);
        let inspections = self.merge(&providers, canceller)?;

        let depth = self.names.len();
        let mut children = Vec::new();
        let mut last: Option<&Name> = None;
        for path in inspections.range(self.names.clone()..).map(|(path, _)| path) {
            if !path.starts_with(&self.names) {
                break;
            }
            let Some(next) = path.get(depth) else {
                continue;
            };
            if last == Some(next) {
                continue;
            }
            last = Some(next);
            children.push(self.child(next.clone()));
        }
        Ok(children)
    }

    /// Branch nodes resolve to `None`.
    pub fn resolve(&self, canceller: &Canceller) -> Result<Option<InspectorHandle>> {
        let providers = self.registry.providers_matching(&[]);
        let mut inspections = self.merge(&providers, canceller)?;
        Ok(inspections.remove(&self.names))
    }

    fn merge(&self, providers: &[ProviderEntry], canceller: &Canceller) -> Result<Inspections> {
        canceller.ensure_not_cancelled()?;
        let _log_scope = LogScope::enter(json!({ "inspectionPath": names_to_string(&self.names) }));
        let policy = self.registry.collision_policy();
        let mut result = Inspections::new();
        for context in self.contexts.distinct() {
            let scope = Scope::new(context, canceller);
            for (path, inspector) in self.merge_context(providers, &scope, policy)? {
                match policy {
                    CollisionPolicy::LastWriterWins => {
                        result.insert(path, inspector);
                    }
                    CollisionPolicy::FirstWriterWins => {
                        result.entry(path).or_insert(inspector);
                    }
                }
            }
        }
        Ok(result)
    }

    fn merge_context(
        &self,
        providers: &[ProviderEntry],
        scope: &Scope,
        policy: CollisionPolicy,
    ) -> Result<Inspections> {
        let mut result = Inspections::new();
        let mut location_exists = None;
        for entry in providers {
            scope.ensure_not_cancelled()?;
            // Root entries are gated per contributed path below.
            if !entry.root.is_empty()
                && self.registry.is_per_location(&entry.root)
                && !self.gate(scope, &mut location_exists)?
            {
                log_trace(
                    "skipped per-location provider",
                    Some(json!({ "root": names_to_string(&entry.root) })),
                    None,
                );
                continue;
            }

            let provided = match entry.provider.provide(&self.scene, &self.edit_target, scope) {
                Ok(provided) => provided,
                Err(err) if err.is::<CancelledError>() => return Err(err),
                Err(err) => {
                    log_warn(
                        "inspection provider failed",
                        Some(json!({
                            "root": names_to_string(&entry.root),
                            "error": format!("{err:#}"),
                            "context": scope.context().fingerprint(),
                        })),
                        None,
                    );
                    continue;
                }
            };

            for (sub_path, inspector) in provided {
                let mut path = entry.root.clone();
                path.extend(sub_path);
                if entry.root.is_empty()
                    && self.registry.is_per_location(&path)
                    && !self.gate(scope, &mut location_exists)?
                {
                    log_trace(
                        "skipped per-location inspection",
                        Some(json!({ "path": names_to_string(&path) })),
                        None,
                    );
                    continue;
                }
                match result.entry(path) {
                    Entry::Vacant(vacant) => {
                        vacant.insert(inspector);
                    }
                    Entry::Occupied(mut occupied) => {
                        log_debug(
                            "inspection path collision",
                            Some(json!({
                                "path": names_to_string(occupied.key()),
                                "policy": policy,
                            })),
                            None,
                        );
                        if policy == CollisionPolicy::LastWriterWins {
                            occupied.insert(inspector);
                        }
                    }
                }
            }
        }
        Ok(result)
    }

    fn gate(&self, scope: &Scope, cached: &mut Option<bool>) -> Result<bool> {
        if let Some(exists) = *cached {
            return Ok(exists);
        }
        let exists = self.location_exists(scope)?;
        *cached = Some(exists);
        Ok(exists)
    }

    fn location_exists(&self, scope: &Scope) -> Result<bool> {
        match self.scene.exists(scope) {
            Ok(exists) => Ok(exists),
            Err(err) if err.is::<CancelledError>() => Err(err),
            Err(err) => {
                log_warn(
                    "unable to determine whether the location exists",
                    Some(json!({ "error": format!("{err:#}") })),
                    None,
                );
                Ok(false)
            }
        }
    }
}

impl Clone for InspectionPath {
    fn clone(&self) -> Self {
        self.derive(self.names.clone())
    }
}

impl fmt::Display for InspectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&names_to_string(&self.names))
    }
}

impl fmt::Debug for InspectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InspectionPath")
            .field("names", &names_to_string(&self.names))
            .field("diff", &self.is_diff())
            .field("edit_target", &self.edit_target)
            .finish()
    }
}
