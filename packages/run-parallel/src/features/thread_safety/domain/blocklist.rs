//! Blocklist registry
//!
//! Curated `(module, function)` identities known to mutate process-wide
//! state without synchronization. A `*` function matches every function in
//! the module and in all of its submodules.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::config::{ConfigError, ConfigResult};
use crate::shared::models::{ancestor_modules, split_path, FnPath, PATH_SEP};

/// Function wildcard
pub const WILDCARD: &str = "*";

/// One blocklisted identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlocklistEntry {
    pub module: String,
    pub function: String,
}

impl BlocklistEntry {
    pub fn new(module: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            function: function.into(),
        }
    }

    /// Whole-module entry
    pub fn module(module: impl Into<String>) -> Self {
        Self::new(module, WILDCARD)
    }

    pub fn is_wildcard(&self) -> bool {
        self.function == WILDCARD
    }

    /// Parse `a::b::f` / `a::b::*`
    pub fn parse(qualified: &str) -> Option<Self> {
        FnPath::parse(qualified).map(|path| Self::new(path.namespace, path.name))
    }
}

impl fmt::Display for BlocklistEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.module, PATH_SEP, self.function)
    }
}

/// Default thread-unsafe APIs
pub static DEFAULT_BLOCKLIST: Lazy<BTreeSet<BlocklistEntry>> = Lazy::new(|| {
    [
        ("std::env", "set_var"),
        ("std::env", "remove_var"),
        ("std::env", "set_current_dir"),
        ("std::panic", "set_hook"),
        ("std::panic", "take_hook"),
        ("std::io", "set_output_capture"),
        ("std::alloc", "set_alloc_error_hook"),
        ("libc", WILDCARD),
        ("nix::unistd", WILDCARD),
        ("mockall", WILDCARD),
        ("serial_test", WILDCARD),
    ]
    .into_iter()
    .map(|(module, function)| BlocklistEntry::new(module, function))
    .collect()
});

/// Caller-supplied entries unioned into the default blocklist
///
/// Value-hashable so it can be part of the analysis cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SkipSet(BTreeSet<BlocklistEntry>);

impl SkipSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse fully qualified names (`my_crate::globals::reset`)
    pub fn from_qualified<S: AsRef<str>>(names: &[S]) -> ConfigResult<Self> {
        names
            .iter()
            .map(|name| {
                BlocklistEntry::parse(name.as_ref())
                    .ok_or_else(|| ConfigError::FunctionPath(name.as_ref().to_string()))
            })
            .collect::<ConfigResult<BTreeSet<_>>>()
            .map(SkipSet)
    }

    pub fn insert(&mut self, entry: BlocklistEntry) -> bool {
        self.0.insert(entry)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlocklistEntry> {
        self.0.iter()
    }
}

impl FromIterator<BlocklistEntry> for SkipSet {
    fn from_iter<I: IntoIterator<Item = BlocklistEntry>>(iter: I) -> Self {
        SkipSet(iter.into_iter().collect())
    }
}

/// Effective blocklist: defaults ∪ skip set, split for fast lookups
#[derive(Debug, Clone)]
pub struct Blocklist {
    module_wildcards: HashSet<String>,
    functions: HashSet<(String, String)>,
    /// Every blocklisted module plus each module's root crate
    modules: HashSet<String>,
}

impl Blocklist {
    pub fn new(skip_set: &SkipSet) -> Self {
        Self::from_entries(DEFAULT_BLOCKLIST.iter().chain(skip_set.iter()))
    }

    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a BlocklistEntry>) -> Self {
        let mut module_wildcards = HashSet::new();
        let mut functions = HashSet::new();
        let mut modules = HashSet::new();

        for entry in entries {
            if entry.is_wildcard() {
                module_wildcards.insert(entry.module.clone());
            } else {
                functions.insert((entry.module.clone(), entry.function.clone()));
            }
            if let Some(root) = split_path(&entry.module).first() {
                modules.insert(root.to_string());
            }
            modules.insert(entry.module.clone());
        }

        Self {
            module_wildcards,
            functions,
            modules,
        }
    }

    /// Module universe the resolver classifies imports against
    pub fn modules(&self) -> &HashSet<String> {
        &self.modules
    }

    pub fn is_known_module(&self, module: &str) -> bool {
        self.modules.contains(module)
    }

    /// Wildcarded module, or a submodule of one
    pub fn is_module_blocklisted(&self, module: &str) -> bool {
        if self.module_wildcards.contains(module) {
            return true;
        }
        ancestor_modules(module)
            .into_iter()
            .any(|parent| self.module_wildcards.contains(parent))
    }

    pub fn is_function_blocklisted(&self, module: &str, function: &str) -> bool {
        if self.is_module_blocklisted(module) {
            return true;
        }
        self.is_exact_function(module, function)
    }

    /// Explicit `module::function` entry, ignoring module wildcards
    pub fn is_exact_function(&self, module: &str, function: &str) -> bool {
        self.functions
            .contains(&(module.to_string(), function.to_string()))
    }
}

impl Default for Blocklist {
    fn default() -> Self {
        Self::new(&SkipSet::new())
    }
}
