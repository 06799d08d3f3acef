//! Call-Graph Resolver
//!
//! Maps the names visible in a function's namespace to the identities they
//! actually refer to, so call sites written through arbitrary import aliases
//! still match the blocklist by identity rather than by spelling.
//!
//! Built once per (namespace, blocklist) and read-only afterwards. Imports
//! that cannot be classified are simply absent from the alias tables.

use std::collections::{BTreeSet, HashMap};

use super::source_registry::{absolutize, Namespace, SourceRegistry};
use crate::features::thread_safety::domain::Blocklist;
use crate::shared::models::{ancestor_modules, join_path, PATH_SEP};

/// Resolved names of one namespace
#[derive(Debug, Clone, Default)]
pub struct AliasMap {
    namespace: String,
    owner: Option<String>,
    /// local name → blocklist-universe module
    module_aliases: HashMap<String, String>,
    /// local name → (blocklist-universe module, function)
    function_aliases: HashMap<String, (String, String)>,
    /// local name → absolute path, for every import
    bindings: HashMap<String, String>,
    globs: Vec<String>,
    local_functions: BTreeSet<String>,
}

impl AliasMap {
    /// Classify every import of `namespace` against the blocklist's module universe
    ///
    /// `namespace` is `None` for detached sources whose scope is not registered.
    pub fn build(
        namespace_path: &str,
        namespace: Option<&Namespace>,
        owner: Option<&str>,
        blocklist: &Blocklist,
    ) -> Self {
        let mut map = Self {
            namespace: namespace_path.to_string(),
            owner: owner.map(str::to_string),
            ..Default::default()
        };
        let Some(namespace) = namespace else {
            return map;
        };

        for binding in &namespace.uses {
            let local = binding.local.clone();
            let path = binding.path.clone();
            map.bindings.insert(local.clone(), path.clone());

            if blocklist.is_known_module(&path) {
                map.module_aliases.insert(local, path);
                continue;
            }

            let Some((parent, function)) = path.rsplit_once(PATH_SEP) else {
                continue;
            };
            let module = if blocklist.is_known_module(parent) {
                Some(parent)
            } else {
                ancestor_modules(parent)
                    .into_iter()
                    .find(|ancestor| blocklist.is_known_module(ancestor))
            };
            if let Some(module) = module {
                map.function_aliases
                    .insert(local, (module.to_string(), function.to_string()));
            }
        }

        map.globs = namespace.globs.clone();
        map.local_functions = namespace.functions.clone();
        map
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn module_alias(&self, name: &str) -> Option<&str> {
        self.module_aliases.get(name).map(String::as_str)
    }

    pub fn function_alias(&self, name: &str) -> Option<(&str, &str)> {
        self.function_aliases
            .get(name)
            .map(|(module, function)| (module.as_str(), function.as_str()))
    }

    pub fn binding(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).map(String::as_str)
    }

    pub fn globs(&self) -> &[String] {
        &self.globs
    }

    pub fn is_local_function(&self, name: &str) -> bool {
        self.local_functions.contains(name)
    }

    /// Absolute path of a `a::b::c` call target
    ///
    /// The head segment goes through the module aliases, the plain import
    /// bindings, then the glob imports; `crate`/`self`/`super`/`Self` are
    /// made absolute.
    pub fn resolve_chain(&self, segments: &[&str], registry: &SourceRegistry, blocklist: &Blocklist) -> String {
        let Some((head, rest)) = segments.split_first() else {
            return String::new();
        };
        let rest = rest.join(PATH_SEP);

        match *head {
            "crate" | "self" | "super" => absolutize(&segments.join(PATH_SEP), &self.namespace),
            "Self" => match &self.owner {
                Some(owner) => join_path(owner, &rest),
                None => rest,
            },
            _ => {
                if let Some(module) = self.module_alias(head) {
                    join_path(module, &rest)
                } else if let Some(path) = self.binding(head) {
                    join_path(path, &rest)
                } else if let Some(path) = self.glob_head(head, registry, blocklist) {
                    join_path(&path, &rest)
                } else {
                    segments.join(PATH_SEP)
                }
            }
        }
    }

    /// Module or type a glob import brings into scope as `head`
    ///
    /// Only heads the glob provably defines count: a re-export, a known
    /// blocklist module, a registered module or a type with methods.
    fn glob_head(&self, head: &str, registry: &SourceRegistry, blocklist: &Blocklist) -> Option<String> {
        if self.is_local_function(head) {
            return None;
        }
        self.globs.iter().find_map(|glob| {
            let joined = join_path(glob, head);
            let canonical = registry.canonicalize(&joined);
            let defined = canonical != joined
                || blocklist.is_known_module(&canonical)
                || registry.namespace(&canonical).is_some()
                || registry.has_methods(&canonical);
            defined.then_some(canonical)
        })
    }

    /// Candidate absolute paths a bare call name may refer to
    ///
    /// An import or a function of the namespace shadows glob imports; only
    /// when neither exists are the globs offered, in declaration order.
    pub fn name_candidates(&self, name: &str) -> Vec<String> {
        if let Some(path) = self.binding(name) {
            return vec![path.to_string()];
        }
        if self.is_local_function(name) {
            return vec![join_path(&self.namespace, name)];
        }
        self.globs.iter().map(|glob| join_path(glob, name)).collect()
    }
}
