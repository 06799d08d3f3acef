//! Thread-unsafe call visitor
//!
//! Structural walk of one function's syntax tree. The walk is pre-order and
//! stops at the first unsafe finding, so the reason is always the first cause
//! in source order.

use tree_sitter::Node;

use super::alias_resolver::AliasMap;
use super::source_registry::{FnItem, SourceRegistry};
use crate::features::thread_safety::domain::{AnalysisResult, Blocklist, UNSAFE_CALL_PREFIX};
use crate::shared::models::{join_path, FnPath, PATH_SEP};
use crate::shared::utils::{field_text, find_child_by_kind, node_text, parse_rust};

/// Callees are followed while the caller's level is below this bound
///
/// Level 0 is the tested function.
pub const MAX_RECURSION_LEVEL: u8 = 2;

/// `const THREAD_SAFE: bool = false;` inside a body declares it unsafe
pub const THREAD_SAFE_SENTINEL: &str = "THREAD_SAFE";

/// Callback analyzing a callee at the given level
pub type RecurseFn<'a> = dyn Fn(&FnPath, u8) -> AnalysisResult + 'a;

pub struct ThreadUnsafeVisitor<'a> {
    item: &'a FnItem,
    aliases: &'a AliasMap,
    blocklist: &'a Blocklist,
    registry: &'a SourceRegistry,
    level: u8,
    recurse: &'a RecurseFn<'a>,
    result: AnalysisResult,
}

impl<'a> ThreadUnsafeVisitor<'a> {
    pub fn new(
        item: &'a FnItem,
        aliases: &'a AliasMap,
        blocklist: &'a Blocklist,
        registry: &'a SourceRegistry,
        level: u8,
        recurse: &'a RecurseFn<'a>,
    ) -> Self {
        Self {
            item,
            aliases,
            blocklist,
            registry,
            level,
            recurse,
            result: AnalysisResult::safe(),
        }
    }

    /// Walk the function and return the verdict
    ///
    /// Unparsable source is treated as safe.
    pub fn analyze(mut self) -> AnalysisResult {
        let Ok(tree) = parse_rust(&self.item.source) else {
            return AnalysisResult::safe();
        };
        let root = tree.root_node();
        if root.has_error() {
            tracing::debug!("Unparsable source for {}, assuming safe", self.item.path);
            return AnalysisResult::safe();
        }
        let Some(function) = find_child_by_kind(&root, "function_item") else {
            return AnalysisResult::safe();
        };

        self.visit(&function);
        self.result
    }

    fn source(&self) -> &'a str {
        let item: &'a FnItem = self.item;
        &item.source
    }

    fn found(&self) -> bool {
        self.result.is_thread_unsafe
    }

    fn visit(&mut self, node: &Node) {
        if self.found() {
            return;
        }
        match node.kind() {
            "call_expression" => {
                if let Some(function) = node.child_by_field_name("function") {
                    self.visit_call_target(&function);
                }
                self.visit_children(node);
            }
            "macro_invocation" => {
                if let Some(tokens) = find_child_by_kind(node, "token_tree") {
                    self.visit_token_tree(&tokens);
                }
            }
            "const_item" => {
                self.visit_const(node);
                self.visit_children(node);
            }
            _ => self.visit_children(node),
        }
    }

    fn visit_children(&mut self, node: &Node) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if self.found() {
                return;
            }
            self.visit(&child);
        }
    }

    fn visit_call_target(&mut self, target: &Node) {
        match target.kind() {
            "identifier" => {
                let name = node_text(target, self.source());
                self.visit_name_call(name);
            }
            "scoped_identifier" => {
                let text = node_text(target, self.source());
                let segments = path_segments(text);
                let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
                self.visit_path_call(&segments);
            }
            "generic_function" => {
                if let Some(function) = target.child_by_field_name("function") {
                    self.visit_call_target(&function);
                }
            }
            // Method calls on values and computed callees cannot be resolved
            _ => {}
        }
    }

    fn visit_name_call(&mut self, name: &str) {
        if let Some((module, function)) = self.aliases.function_alias(name) {
            if self.blocklist.is_function_blocklisted(module, function) {
                self.result = AnalysisResult::unsafe_call(module, function);
                return;
            }
        }

        let candidates = self.aliases.name_candidates(name);
        let from_glob = self.aliases.binding(name).is_none() && !self.aliases.is_local_function(name);
        if from_glob {
            self.check_glob_name(name, &candidates);
        } else {
            for candidate in &candidates {
                let canonical = self.registry.canonicalize(candidate);
                if let Some((module, function)) = canonical.rsplit_once(PATH_SEP) {
                    if self.blocklist.is_function_blocklisted(module, function) {
                        self.result = AnalysisResult::unsafe_call(module, function);
                        return;
                    }
                }
            }
        }
        if self.found() {
            return;
        }

        if self.level < MAX_RECURSION_LEVEL {
            if let Some(callee) = candidates
                .iter()
                .find_map(|c| self.registry.resolve_function(c))
            {
                self.recurse_into(&callee.path);
            }
        }
    }

    /// A glob-imported name belongs to the first glob that provably defines
    /// it. Failing that it may come from any glob of a wildcarded module.
    fn check_glob_name(&mut self, name: &str, candidates: &[String]) {
        let defined = candidates.iter().find_map(|candidate| {
            let canonical = self.registry.canonicalize(candidate);
            let is_defined =
                canonical != *candidate || self.registry.resolve_function(candidate).is_some();
            is_defined.then_some(canonical)
        });
        if let Some(canonical) = defined {
            if let Some((module, function)) = canonical.rsplit_once(PATH_SEP) {
                if self.blocklist.is_function_blocklisted(module, function) {
                    self.result = AnalysisResult::unsafe_call(module, function);
                }
            }
            return;
        }

        for candidate in candidates {
            let Some((module, function)) = candidate.rsplit_once(PATH_SEP) else {
                continue;
            };
            let blocked = self.blocklist.is_exact_function(module, function)
                || (is_plain_function_name(name) && self.blocklist.is_module_blocklisted(module));
            if blocked {
                self.result = AnalysisResult::unsafe_call(module, function);
                return;
            }
        }
    }

    fn visit_path_call(&mut self, segments: &[&str]) {
        if segments.is_empty() {
            return;
        }
        let resolved = self.aliases.resolve_chain(segments, self.registry, self.blocklist);
        let canonical = self.registry.canonicalize(&resolved);
        if let Some((module, function)) = canonical.rsplit_once(PATH_SEP) {
            if self.blocklist.is_function_blocklisted(module, function) {
                self.result = AnalysisResult::unsafe_call(module, function);
                return;
            }
        }

        if self.level < MAX_RECURSION_LEVEL {
            let callee = self.registry.resolve_function(&resolved).or_else(|| {
                // Paths relative to the current module (`helpers::f`, `Type::f`)
                let relative = join_path(self.aliases.namespace(), &resolved);
                self.registry.resolve_function(&relative)
            });
            if let Some(callee) = callee {
                self.recurse_into(&callee.path);
            }
        }
    }

    fn recurse_into(&mut self, callee: &FnPath) {
        tracing::trace!(
            "Following {} -> {} (level {})",
            self.item.path,
            callee,
            self.level + 1
        );
        let verdict = (self.recurse)(callee, self.level + 1);
        if verdict.is_thread_unsafe {
            self.result = verdict;
        }
    }

    fn visit_const(&mut self, node: &Node) {
        let source = self.source();
        if field_text(node, "name", source) != Some(THREAD_SAFE_SENTINEL) {
            return;
        }
        let Some(value) = node.child_by_field_name("value") else {
            return;
        };
        if value.kind() == "boolean_literal" && node_text(&value, source) == "false" {
            self.result = AnalysisResult::thread_unsafe(format!(
                "{}{} (inferred via explicit override)",
                UNSAFE_CALL_PREFIX, self.item.path.name
            ));
        }
    }

    /// Scan macro arguments for call-shaped token runs: `a::b(..)`, `f(..)`
    fn visit_token_tree(&mut self, tokens: &Node) {
        let source = self.source();
        let mut chain: Vec<&str> = Vec::new();
        let mut after_separator = false;
        let mut is_method = false;
        let mut previous_was_dot = false;

        let mut cursor = tokens.walk();
        let children: Vec<Node> = tokens.children(&mut cursor).collect();
        for child in children {
            if self.found() {
                return;
            }
            let text = node_text(&child, source);
            match child.kind() {
                "identifier" | "self" | "super" | "crate" => {
                    if !chain.is_empty() && after_separator {
                        chain.push(text);
                    } else {
                        chain = vec![text];
                        is_method = previous_was_dot;
                    }
                    after_separator = false;
                }
                "token_tree" => {
                    if !chain.is_empty() && !after_separator && !is_method && text.starts_with('(') {
                        let call = std::mem::take(&mut chain);
                        if call.len() == 1 {
                            self.visit_name_call(call[0]);
                        } else {
                            self.visit_path_call(&call);
                        }
                    }
                    self.visit_token_tree(&child);
                    chain.clear();
                    after_separator = false;
                    is_method = false;
                }
                _ => {
                    if text == PATH_SEP && !chain.is_empty() && !after_separator {
                        after_separator = true;
                    } else {
                        chain.clear();
                        after_separator = false;
                        is_method = false;
                    }
                }
            }
            previous_was_dot = text == ".";
        }
    }
}

/// Prelude functions a glob of a wildcarded module does not shadow
const PRELUDE_FUNCTIONS: &[&str] = &["drop"];

/// Lowercase call names that are not prelude functions
///
/// Uppercase names are tuple-struct or variant constructors (`Some`, `Ok`).
fn is_plain_function_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_lowercase() || c == '_') && !PRELUDE_FUNCTIONS.contains(&name)
}

/// Segments of a scoped path, turbofish arguments dropped
fn path_segments(text: &str) -> Vec<String> {
    let compact: String = text.split_whitespace().collect();
    compact
        .split(PATH_SEP)
        .filter(|segment| !segment.is_empty() && !segment.starts_with('<'))
        .map(|segment| segment.split('<').next().unwrap_or(segment).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_segments_drop_turbofish() {
        assert_eq!(path_segments("Vec::<u8>::new"), vec!["Vec", "new"]);
        assert_eq!(path_segments("std :: env :: set_var"), vec!["std", "env", "set_var"]);
    }

    #[test]
    fn constructors_and_prelude_are_not_plain_functions() {
        assert!(is_plain_function_name("getpid"));
        assert!(is_plain_function_name("_exit"));
        assert!(!is_plain_function_name("Some"));
        assert!(!is_plain_function_name("drop"));
    }
}
