use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, OnceLock};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Interned path segment. Equal strings share one allocation, so cloning and
/// comparing names is cheap.
#[derive(Clone)]
pub struct Name(Arc<str>);

/// A full path in the inspection hierarchy. The root is the empty sequence.
pub type Names = Vec<Name>;

fn interner() -> &'static Mutex<HashSet<Arc<str>>> {
    static INTERNER: OnceLock<Mutex<HashSet<Arc<str>>>> = OnceLock::new();
    INTERNER.get_or_init(|| Mutex::new(HashSet::new()))
}

impl Name {
    pub fn new(text: &str) -> Self {
        let mut strings = interner().lock().expect("interner poisoned");
        if let Some(existing) = strings.get(text) {
            return Name(existing.clone());
        }
        let interned: Arc<str> = Arc::from(text);
        strings.insert(interned.clone());
        Name(interned)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Name {
    fn default() -> Self {
        Name::new("")
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || *self.0 == *other.0
    }
}

impl Eq for Name {}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Name {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl From<&str> for Name {
    fn from(text: &str) -> Self {
        Name::new(text)
    }
}

impl From<String> for Name {
    fn from(text: String) -> Self {
        Name::new(&text)
    }
}

impl From<&String> for Name {
    fn from(text: &String) -> Self {
        Name::new(text)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Name::new(&text))
    }
}

/// Splits a slash separated string into names, dropping empty segments, so
/// `"/a//b/"` and `"a/b"` both yield `["a", "b"]`.
pub fn string_to_names(path: &str) -> Names {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(Name::new)
        .collect()
}

pub fn names_to_string(names: &[Name]) -> String {
    if names.is_empty() {
        return "/".to_string();
    }
    let mut out = String::new();
    for name in names {
        out.push('/');
        out.push_str(name.as_str());
    }
    out
}

/// Anything that can spell a path: `"Selection/Object"`, `["Selection", "Object"]`,
/// or an existing `Names`.
pub trait AsNames {
    fn as_names(&self) -> Names;
}

impl AsNames for str {
    fn as_names(&self) -> Names {
        string_to_names(self)
    }
}

impl AsNames for &str {
    fn as_names(&self) -> Names {
        string_to_names(self)
    }
}

impl AsNames for String {
    fn as_names(&self) -> Names {
        string_to_names(self)
    }
}

impl AsNames for [Name] {
    fn as_names(&self) -> Names {
        self.to_vec()
    }
}

impl AsNames for Names {
    fn as_names(&self) -> Names {
        self.clone()
    }
}

impl AsNames for &[Name] {
    fn as_names(&self) -> Names {
        self.to_vec()
    }
}

impl AsNames for &[&str] {
    fn as_names(&self) -> Names {
        self.iter().map(|segment| Name::new(segment)).collect()
    }
}

impl<const N: usize> AsNames for [&str; N] {
    fn as_names(&self) -> Names {
        self.iter().map(|segment| Name::new(segment)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interned_names_share_storage() {
        let a = Name::new("Selection");
        let b = Name::from(String::from("Selection"));
        assert!(Arc::ptr_eq(&a.0, &b.0));
        assert_eq!(a, b);
        assert_eq!(a, "Selection");
    }

    #[test]
    fn names_order_lexicographically() {
        let mut paths: Vec<Names> = vec![
            string_to_names("/b"),
            string_to_names("/a/c"),
            string_to_names("/a"),
            string_to_names("/a/b/z"),
        ];
        paths.sort();
        let rendered: Vec<String> = paths.iter().map(|p| names_to_string(p)).collect();
        assert_eq!(rendered, vec!["/a", "/a/b/z", "/a/c", "/b"]);
    }

    #[test]
    fn string_round_trip_drops_empty_segments() {
        assert_eq!(string_to_names("//a///b/"), ["a", "b"].as_names());
        assert_eq!(names_to_string(&[]), "/");
        assert_eq!(names_to_string(&string_to_names("a/b")), "/a/b");
    }
}
