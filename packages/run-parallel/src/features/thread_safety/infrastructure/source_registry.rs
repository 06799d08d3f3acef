//! Source Registry
//!
//! The analysis substrate: Rust module sources registered under their module
//! path, parsed once with tree-sitter and indexed into namespaces.
//!
//! A namespace is a module body (file or inline `mod { .. }`). For each one
//! the registry records the `use` bindings, glob imports and the functions
//! declared directly in it. Methods of inherent and trait impls are recorded
//! as `namespace::Type::method`.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tree_sitter::Node;

use crate::errors::Result;
use crate::shared::models::{join_path, split_path, FnPath, PATH_SEP};
use crate::shared::utils::{
    attribute_path, field_text, named_children, node_text, parse_rust, preceding_attributes,
    start_line,
};

/// Maximum `pub use` hops followed when canonicalizing a path
const MAX_REEXPORT_HOPS: usize = 8;

/// Attributes that mark a function as a test
const TEST_ATTRIBUTES: &[&str] = &[
    "test",
    "tokio::test",
    "async_std::test",
    "rstest",
    "rstest::rstest",
    "test_case",
    "proptest",
    "test_strategy::proptest",
    "quickcheck",
    "quickcheck_macros::quickcheck",
];

/// One name bound by a `use` declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseBinding {
    /// Name visible in the namespace
    pub local: String,
    /// Absolute path it refers to
    pub path: String,
}

/// Items visible in one module body
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    pub path: String,
    pub uses: Vec<UseBinding>,
    /// Absolute module paths imported with `::*`
    pub globs: Vec<String>,
    /// Functions declared directly in this namespace
    pub functions: BTreeSet<String>,
}

impl Namespace {
    fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Absolute path bound to `local`, last binding wins
    pub fn binding(&self, local: &str) -> Option<&str> {
        self.uses
            .iter()
            .rev()
            .find(|b| b.local == local)
            .map(|b| b.path.as_str())
    }
}

/// A registered function and the syntax needed to analyze it
#[derive(Debug, Clone)]
pub struct FnItem {
    pub path: FnPath,
    /// Namespace whose imports the body resolves names against
    pub scope: String,
    /// `Self` type for methods (`namespace::Type`)
    pub owner: Option<String>,
    /// Function text, attributes included
    pub source: String,
    /// Attribute paths (`test`, `tokio::test`)
    pub attributes: Vec<String>,
    /// Parameter patterns, `self` excluded
    pub parameters: Vec<String>,
    pub line: usize,
}

impl FnItem {
    /// Build from ad-hoc source containing one function item
    ///
    /// Returns `None` when the source has no function item.
    pub fn from_source(scope: &str, name: &str, source: &str) -> Option<Self> {
        let tree = parse_rust(source).ok()?;
        let root = tree.root_node();
        let node = first_function(&root)?;
        let path = FnPath::new(scope, name);
        Some(fn_item_from_node(&node, source, path, scope, None))
    }

    pub fn has_attribute(&self, path: &str) -> bool {
        self.attributes.iter().any(|a| a == path)
    }

    pub fn is_test(&self) -> bool {
        self.attributes
            .iter()
            .any(|attr| TEST_ATTRIBUTES.contains(&attr.as_str()) || attr.ends_with("::test"))
    }
}

/// Registry of parsed module sources
#[derive(Debug, Default)]
pub struct SourceRegistry {
    namespaces: HashMap<String, Arc<Namespace>>,
    functions: HashMap<FnPath, Arc<FnItem>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration
    pub fn with_module(mut self, module_path: &str, source: &str) -> Result<Self> {
        self.register_module(module_path, source)?;
        Ok(self)
    }

    /// Parse and index a module body
    ///
    /// Re-registering a module replaces every namespace and function under it.
    /// Returns the number of functions indexed.
    pub fn register_module(&mut self, module_path: &str, source: &str) -> Result<usize> {
        let tree = parse_rust(source)?;
        let module_path = clean_path(module_path);

        let prefix = format!("{}{}", module_path, PATH_SEP);
        self.namespaces
            .retain(|path, _| path != &module_path && !path.starts_with(&prefix));
        self.functions.retain(|path, _| {
            path.namespace != module_path && !path.namespace.starts_with(&prefix)
        });

        let mut indexed = HashMap::new();
        let mut functions = Vec::new();
        index_items(&tree.root_node(), &module_path, source, &mut indexed, &mut functions);

        let count = functions.len();
        for (path, namespace) in indexed {
            self.namespaces.insert(path, Arc::new(namespace));
        }
        for item in functions {
            self.functions.insert(item.path.clone(), Arc::new(item));
        }

        tracing::debug!("Registered module {} ({} functions)", module_path, count);
        Ok(count)
    }

    pub fn namespace(&self, path: &str) -> Option<&Arc<Namespace>> {
        self.namespaces.get(path)
    }

    pub fn function(&self, path: &FnPath) -> Option<&Arc<FnItem>> {
        self.functions.get(path)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Follow `use` re-exports until the path names something that is not an
    /// import (or leaves the registry)
    pub fn canonicalize(&self, path: &str) -> String {
        let mut current = clean_path(path);
        for _ in 0..MAX_REEXPORT_HOPS {
            let Some((module, name)) = current.rsplit_once(PATH_SEP) else {
                break;
            };
            let Some(namespace) = self.namespaces.get(module) else {
                break;
            };
            if namespace.functions.contains(name) {
                break;
            }
            match namespace.binding(name) {
                Some(target) if target != current => current = target.to_string(),
                _ => break,
            }
        }
        current
    }

    /// Whether `owner` is a type with registered methods
    pub fn has_methods(&self, owner: &str) -> bool {
        self.functions
            .values()
            .any(|item| item.owner.as_deref() == Some(owner))
    }

    /// Registered function a path refers to, following re-exports
    pub fn resolve_function(&self, path: &str) -> Option<Arc<FnItem>> {
        let canonical = self.canonicalize(path);
        FnPath::parse(&canonical).and_then(|p| self.functions.get(&p).cloned())
    }

    /// Test functions in deterministic order
    pub fn test_functions(&self) -> Vec<Arc<FnItem>> {
        let mut tests: Vec<_> = self
            .functions
            .values()
            .filter(|item| item.is_test())
            .cloned()
            .collect();
        tests.sort_by(|a, b| a.path.cmp(&b.path));
        tests
    }
}

/// Make a `crate::`/`self::`/`super::` path absolute relative to `namespace`
///
/// `crate` maps to the namespace's root segment. Other paths are returned
/// unchanged apart from whitespace cleanup.
pub fn absolutize(path: &str, namespace: &str) -> String {
    let path = clean_path(path);
    let segments = split_path(&path);
    let Some(first) = segments.first() else {
        return path;
    };

    match *first {
        "crate" => {
            let root = split_path(namespace).first().copied().unwrap_or("crate");
            join_path(root, &segments[1..].join(PATH_SEP))
        }
        "self" => join_path(namespace, &segments[1..].join(PATH_SEP)),
        "super" => {
            let supers = segments.iter().take_while(|s| **s == "super").count();
            let base = split_path(namespace);
            let keep = base.len().saturating_sub(supers).max(1);
            join_path(&base[..keep].join(PATH_SEP), &segments[supers..].join(PATH_SEP))
        }
        _ => segments.join(PATH_SEP),
    }
}

fn clean_path(path: &str) -> String {
    let compact: String = path.split_whitespace().collect();
    compact.trim_start_matches(PATH_SEP).to_string()
}

fn first_function<'a>(node: &Node<'a>) -> Option<Node<'a>> {
    if node.kind() == "function_item" {
        return Some(*node);
    }
    named_children(node).iter().find_map(first_function)
}

fn index_items(
    container: &Node,
    namespace_path: &str,
    source: &str,
    namespaces: &mut HashMap<String, Namespace>,
    functions: &mut Vec<FnItem>,
) {
    let mut namespace = namespaces
        .remove(namespace_path)
        .unwrap_or_else(|| Namespace::new(namespace_path));

    for child in named_children(container) {
        match child.kind() {
            "function_item" => {
                if let Some(name) = field_text(&child, "name", source) {
                    namespace.functions.insert(name.to_string());
                    let path = FnPath::new(namespace_path, name);
                    functions.push(fn_item_from_node(&child, source, path, namespace_path, None));
                }
            }
            "use_declaration" => {
                if let Some(argument) = child.child_by_field_name("argument") {
                    collect_use(&argument, "", source, &mut namespace);
                }
            }
            "extern_crate_declaration" => {
                if let Some(name) = field_text(&child, "name", source) {
                    let local = field_text(&child, "alias", source).unwrap_or(name);
                    namespace.uses.push(UseBinding {
                        local: local.to_string(),
                        path: name.to_string(),
                    });
                }
            }
            "mod_item" => {
                if let (Some(name), Some(body)) =
                    (field_text(&child, "name", source), child.child_by_field_name("body"))
                {
                    let child_path = join_path(namespace_path, name);
                    index_items(&body, &child_path, source, namespaces, functions);
                }
            }
            "impl_item" => index_impl(&child, namespace_path, source, functions),
            _ => {}
        }
    }

    namespaces.insert(namespace_path.to_string(), namespace);
}

fn index_impl(impl_node: &Node, namespace_path: &str, source: &str, functions: &mut Vec<FnItem>) {
    let (Some(ty), Some(body)) = (
        field_text(impl_node, "type", source),
        impl_node.child_by_field_name("body"),
    ) else {
        return;
    };
    let type_name = clean_path(ty.split('<').next().unwrap_or(ty));
    let owner = join_path(namespace_path, &type_name);

    for child in named_children(&body) {
        if child.kind() != "function_item" {
            continue;
        }
        if let Some(name) = field_text(&child, "name", source) {
            let path = FnPath::new(owner.clone(), name);
            functions.push(fn_item_from_node(
                &child,
                source,
                path,
                namespace_path,
                Some(owner.clone()),
            ));
        }
    }
}

fn fn_item_from_node(
    node: &Node,
    source: &str,
    path: FnPath,
    scope: &str,
    owner: Option<String>,
) -> FnItem {
    let attrs = preceding_attributes(node);
    let start = attrs.first().map_or(node.start_byte(), |a| a.start_byte());
    let attributes = attrs
        .iter()
        .filter_map(|a| attribute_path(a, source))
        .collect();

    let parameters = node
        .child_by_field_name("parameters")
        .map(|params| {
            named_children(&params)
                .iter()
                .filter(|p| p.kind() == "parameter")
                .filter_map(|p| field_text(p, "pattern", source))
                .map(|pattern| pattern.trim_start_matches("mut ").trim().to_string())
                .collect()
        })
        .unwrap_or_default();

    FnItem {
        path,
        scope: scope.to_string(),
        owner,
        source: source[start..node.end_byte()].to_string(),
        attributes,
        parameters,
        line: start_line(node),
    }
}

/// Expand one `use` tree into bindings and globs
fn collect_use(node: &Node, prefix: &str, source: &str, namespace: &mut Namespace) {
    match node.kind() {
        "identifier" | "scoped_identifier" | "self" | "crate" | "super" => {
            let text = clean_path(node_text(node, source));
            let (local, full) = if text == "self" {
                match split_path(prefix).last() {
                    Some(last) => (last.to_string(), prefix.to_string()),
                    None => return,
                }
            } else {
                let full = join_path(prefix, &text);
                match split_path(&full).last() {
                    Some(last) => (last.to_string(), full.clone()),
                    None => return,
                }
            };
            if matches!(local.as_str(), "crate" | "super" | "self") {
                return;
            }
            let path = absolutize(&full, &namespace.path);
            namespace.uses.push(UseBinding { local, path });
        }
        "use_as_clause" => {
            let (Some(path), Some(alias)) = (
                field_text(node, "path", source),
                field_text(node, "alias", source),
            ) else {
                return;
            };
            if alias == "_" {
                return;
            }
            let path = clean_path(path);
            let full = if path == "self" {
                prefix.to_string()
            } else {
                join_path(prefix, &path)
            };
            let path = absolutize(&full, &namespace.path);
            namespace.uses.push(UseBinding {
                local: alias.to_string(),
                path,
            });
        }
        "scoped_use_list" => {
            let nested = match field_text(node, "path", source) {
                Some(path) => join_path(prefix, &clean_path(path)),
                None => prefix.to_string(),
            };
            if let Some(list) = node.child_by_field_name("list") {
                collect_use(&list, &nested, source, namespace);
            }
        }
        "use_list" => {
            for child in named_children(node) {
                collect_use(&child, prefix, source, namespace);
            }
        }
        "use_wildcard" => {
            let text = clean_path(node_text(node, source));
            let module = text.trim_end_matches('*').trim_end_matches(PATH_SEP);
            let full = join_path(prefix, module);
            if !full.is_empty() {
                let glob = absolutize(&full, &namespace.path);
                namespace.globs.push(glob);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MODULE: &str = r#"
use std::env;
use std::env::set_var as put_env;
use std::panic::{self, set_hook};
use crate::helpers::{reset, nested::deep as deep_helper};
use super::shared::*;

fn helper() {}

#[test]
fn parallel_counter(fixture: u32, mut other: String) {
    helper();
}

struct Counter;

impl Counter {
    fn bump(&self) {}
}

mod inner {
    use libc::memcpy;

    #[tokio::test]
    async fn inner_test() {}
}
"#;

    fn registry() -> SourceRegistry {
        SourceRegistry::new()
            .with_module("my_crate::tests", MODULE)
            .unwrap()
    }

    #[test]
    fn expands_use_trees() {
        let registry = registry();
        let ns = registry.namespace("my_crate::tests").unwrap();
        assert_eq!(ns.binding("env"), Some("std::env"));
        assert_eq!(ns.binding("put_env"), Some("std::env::set_var"));
        assert_eq!(ns.binding("panic"), Some("std::panic"));
        assert_eq!(ns.binding("set_hook"), Some("std::panic::set_hook"));
        assert_eq!(ns.binding("reset"), Some("my_crate::helpers::reset"));
        assert_eq!(ns.binding("deep_helper"), Some("my_crate::helpers::nested::deep"));
        assert_eq!(ns.globs, vec!["my_crate::shared".to_string()]);
    }

    #[test]
    fn indexes_functions_methods_and_inline_modules() {
        let registry = registry();
        assert!(registry
            .function(&FnPath::new("my_crate::tests", "helper"))
            .is_some());

        let method = registry
            .function(&FnPath::new("my_crate::tests::Counter", "bump"))
            .unwrap();
        assert_eq!(method.scope, "my_crate::tests");
        assert_eq!(method.owner.as_deref(), Some("my_crate::tests::Counter"));

        let inner = registry.namespace("my_crate::tests::inner").unwrap();
        assert_eq!(inner.binding("memcpy"), Some("libc::memcpy"));
        assert!(registry
            .function(&FnPath::new("my_crate::tests::inner", "inner_test"))
            .is_some());
    }

    #[test]
    fn captures_attributes_and_parameters() {
        let registry = registry();
        let test = registry
            .function(&FnPath::new("my_crate::tests", "parallel_counter"))
            .unwrap();
        assert!(test.is_test());
        assert!(test.source.starts_with("#[test]"));
        assert_eq!(test.parameters, vec!["fixture".to_string(), "other".to_string()]);

        let names: Vec<_> = registry
            .test_functions()
            .iter()
            .map(|f| f.path.to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "my_crate::tests::parallel_counter".to_string(),
                "my_crate::tests::inner::inner_test".to_string(),
            ]
        );
    }

    #[test]
    fn canonicalize_follows_reexports() {
        let registry = SourceRegistry::new()
            .with_module("app::util", "pub use std::env::set_var as configure;\npub fn own() {}\n")
            .unwrap()
            .with_module("app::facade", "pub use crate::util::configure;\npub use crate::util::own;\n")
            .unwrap();
        assert_eq!(registry.canonicalize("app::facade::configure"), "std::env::set_var");
        assert_eq!(registry.canonicalize("app::facade::own"), "app::util::own");
        assert!(registry.resolve_function("app::facade::own").is_some());
        assert_eq!(registry.canonicalize("serde::Serialize"), "serde::Serialize");
    }

    #[test]
    fn reregistering_replaces_module() {
        let mut registry = SourceRegistry::new();
        registry.register_module("app", "fn a() {}\nmod m { fn b() {} }").unwrap();
        assert_eq!(registry.len(), 2);
        registry.register_module("app", "fn c() {}").unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.function(&FnPath::new("app", "c")).is_some());
        assert!(registry.namespace("app::m").is_none());
    }

    #[test]
    fn absolutize_relative_paths() {
        assert_eq!(absolutize("crate::a::f", "app::tests"), "app::a::f");
        assert_eq!(absolutize("self::f", "app::tests"), "app::tests::f");
        assert_eq!(absolutize("super::f", "app::tests"), "app::f");
        assert_eq!(absolutize("super::super::f", "app::a::b"), "app::f");
        assert_eq!(absolutize("std :: env", "app"), "std::env");
    }

    #[test]
    fn detached_source_builds_item() {
        let item = FnItem::from_source("app", "check_run", "#[test]\nfn check_run() { run(); }").unwrap();
        assert_eq!(item.path, FnPath::new("app", "check_run"));
        assert!(item.is_test());
        assert!(FnItem::from_source("app", "x", "struct X;").is_none());
    }
}
