//! Rust path identities
//!
//! Every callable the analyzer knows about is identified by the namespace it is
//! declared in plus its own name, e.g. `crate::tests` + `parallel_counter`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Path separator used for module and function paths
pub const PATH_SEP: &str = "::";

/// Fully qualified identity of a function
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FnPath {
    /// Namespace the function is declared in (`crate::tests`, `crate::Type`)
    pub namespace: String,
    /// Function name
    pub name: String,
}

impl FnPath {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse `a::b::f` into (`a::b`, `f`)
    ///
    /// Returns `None` when the path has no namespace part.
    pub fn parse(path: &str) -> Option<Self> {
        let (namespace, name) = path.trim().rsplit_once(PATH_SEP)?;
        if namespace.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(namespace, name))
    }

    /// Full `namespace::name` form
    pub fn qualified(&self) -> String {
        join_path(&self.namespace, &self.name)
    }
}

impl fmt::Display for FnPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.namespace, PATH_SEP, self.name)
    }
}

/// Join two path fragments with `::`, tolerating an empty prefix
pub fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else if name.is_empty() {
        prefix.to_string()
    } else {
        format!("{}{}{}", prefix, PATH_SEP, name)
    }
}

/// Split a path into its segments
pub fn split_path(path: &str) -> Vec<&str> {
    path.split(PATH_SEP).filter(|s| !s.is_empty()).collect()
}

/// All proper ancestors of a module path, nearest first
///
/// `a::b::c` yields `a::b`, `a`.
pub fn ancestor_modules(module: &str) -> Vec<&str> {
    let mut parents = Vec::new();
    let mut current = module;
    while let Some((parent, _)) = current.rsplit_once(PATH_SEP) {
        parents.push(parent);
        current = parent;
    }
    parents
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_last_segment() {
        let path = FnPath::parse("std::env::set_var").unwrap();
        assert_eq!(path.namespace, "std::env");
        assert_eq!(path.name, "set_var");
        assert_eq!(path.to_string(), "std::env::set_var");
    }

    #[test]
    fn parse_rejects_bare_names() {
        assert!(FnPath::parse("set_var").is_none());
        assert!(FnPath::parse("::set_var").is_none());
        assert!(FnPath::parse("std::").is_none());
    }

    #[test]
    fn ancestors_nearest_first() {
        assert_eq!(ancestor_modules("a::b::c"), vec!["a::b", "a"]);
        assert!(ancestor_modules("a").is_empty());
    }

    #[test]
    fn join_handles_empty_parts() {
        assert_eq!(join_path("", "f"), "f");
        assert_eq!(join_path("m", ""), "m");
        assert_eq!(join_path("m", "f"), "m::f");
    }
}
