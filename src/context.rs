use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::name::{string_to_names, Name, Names};

pub const SCENE_PATH_VARIABLE: &str = "scene:path";

#[derive(Debug)]
pub struct CancelledError;

impl fmt::Display for CancelledError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "evaluation cancelled")
    }
}

impl std::error::Error for CancelledError {}

/// Cooperative cancellation token shared between a consumer and the
/// evaluations it starts.
#[derive(Clone, Default)]
pub struct Canceller {
    token: Arc<AtomicBool>,
}

impl Canceller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_token(token: Arc<AtomicBool>) -> Self {
        Self { token }
    }

    pub fn token(&self) -> Arc<AtomicBool> {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.load(Ordering::SeqCst)
    }

    pub fn ensure_not_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(CancelledError.into())
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for Canceller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canceller")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Evaluation context: the variables inspectors and providers observe.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    variables: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.variables.remove(name)
    }

    pub fn variables(&self) -> &BTreeMap<String, Value> {
        &self.variables
    }

    /// The current scene location, accepting either an array of names or a
    /// slash separated string.
    pub fn scene_path(&self) -> Option<Names> {
        match self.variables.get(SCENE_PATH_VARIABLE)? {
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(Name::new)
                    .collect(),
            ),
            Value::String(text) => Some(string_to_names(text)),
            _ => None,
        }
    }

    pub fn set_scene_path(&mut self, path: &[Name]) {
        let items = path
            .iter()
            .map(|name| Value::String(name.as_str().to_string()))
            .collect();
        self.variables
            .insert(SCENE_PATH_VARIABLE.to_string(), Value::Array(items));
    }

    pub fn with_scene_path(mut self, path: &[Name]) -> Self {
        self.set_scene_path(path);
        self
    }

    /// Hex SHA-256 of the canonical JSON form. Variables are kept in a
    /// `BTreeMap`, so equal contexts always fingerprint identically.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_string(&self.variables).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// One evaluation: a context plus the canceller that may abort it. Derived
/// scopes borrow their parent's canceller and own a modified copy of the
/// context, so the parent's binding is untouched once they go out of scope.
pub struct Scope<'a> {
    context: Cow<'a, Context>,
    canceller: &'a Canceller,
}

impl<'a> Scope<'a> {
    pub fn new(context: &'a Context, canceller: &'a Canceller) -> Self {
        Self {
            context: Cow::Borrowed(context),
            canceller,
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn canceller(&self) -> &Canceller {
        self.canceller
    }

    pub fn ensure_not_cancelled(&self) -> Result<()> {
        self.canceller.ensure_not_cancelled()
    }

    pub fn location(&self) -> Option<Names> {
        self.context.scene_path()
    }

    pub fn require_location(&self) -> Result<Names> {
        self.location()
            .ok_or_else(|| anyhow!("context has no `{SCENE_PATH_VARIABLE}` variable"))
    }

    pub fn with_location(&self, path: &[Name]) -> Scope<'_> {
        let mut context = self.context.as_ref().clone();
        context.set_scene_path(path);
        Scope {
            context: Cow::Owned(context),
            canceller: self.canceller,
        }
    }

    pub fn with_variable(&self, name: impl Into<String>, value: impl Into<Value>) -> Scope<'_> {
        let mut context = self.context.as_ref().clone();
        context.set(name, value);
        Scope {
            context: Cow::Owned(context),
            canceller: self.canceller,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::AsNames;
    use serde_json::json;

    #[test]
    fn derived_scope_leaves_parent_untouched() {
        let context = Context::new().with_scene_path(&"/a/b".as_names());
        let canceller = Canceller::new();
        let scope = Scope::new(&context, &canceller);
        {
            let nested = scope.with_location(&"/a".as_names());
            assert_eq!(nested.location(), Some("/a".as_names()));
        }
        assert_eq!(scope.location(), Some("/a/b".as_names()));
    }

    #[test]
    fn scene_path_accepts_strings() {
        let context = Context::new().with(SCENE_PATH_VARIABLE, json!("/x/y"));
        assert_eq!(context.scene_path(), Some("x/y".as_names()));
    }

    #[test]
    fn fingerprint_tracks_variables() {
        let a = Context::new().with("frame", 1);
        let b = Context::new().with("frame", 1);
        let c = Context::new().with("frame", 2);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn cancelled_token_reports_cancelled_error() {
        let canceller = Canceller::new();
        assert!(canceller.ensure_not_cancelled().is_ok());
        canceller.cancel();
        let err = canceller.ensure_not_cancelled().unwrap_err();
        assert!(err.is::<CancelledError>());
    }
}
