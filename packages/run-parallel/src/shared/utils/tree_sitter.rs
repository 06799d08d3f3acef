//! Tree-sitter Utility Functions
//!
//! Common helpers for walking `tree-sitter-rust` syntax trees.

use tree_sitter::{Node, Parser, Tree};

use crate::errors::{Result, RunParallelError};

// ═══════════════════════════════════════════════════════════════════════════
// Parsing
// ═══════════════════════════════════════════════════════════════════════════

/// Parse Rust source into a syntax tree
///
/// tree-sitter recovers from syntax errors, so a returned tree may still
/// contain `ERROR` nodes; callers decide whether that is acceptable.
pub fn parse_rust(source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_rust::language())
        .map_err(|e| RunParallelError::parse_error(format!("Failed to set language: {}", e)))?;

    parser
        .parse(source, None)
        .ok_or_else(|| RunParallelError::parse_error("Failed to parse content"))
}

// ═══════════════════════════════════════════════════════════════════════════
// Node Traversal Utilities
// ═══════════════════════════════════════════════════════════════════════════

/// Find a direct child node by kind
#[inline]
pub fn find_child_by_kind<'a>(node: &Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|child| child.kind() == kind);
    found
}

/// Find all descendants by kind (pre-order)
pub fn find_descendants_by_kind<'a>(node: &Node<'a>, kind: &str) -> Vec<Node<'a>> {
    let mut result = Vec::new();
    let mut stack = vec![*node];
    while let Some(current) = stack.pop() {
        if current.kind() == kind {
            result.push(current);
        }
        for i in (0..current.child_count()).rev() {
            if let Some(child) = current.child(i) {
                stack.push(child);
            }
        }
    }
    result
}

/// Named children of a node, in source order
pub fn named_children<'a>(node: &Node<'a>) -> Vec<Node<'a>> {
    let mut cursor = node.walk();
    let children = node.named_children(&mut cursor).collect();
    children
}

// ═══════════════════════════════════════════════════════════════════════════
// Text Extraction Utilities
// ═══════════════════════════════════════════════════════════════════════════

/// Extract text content from a node
#[inline]
pub fn node_text<'s>(node: &Node, source: &'s str) -> &'s str {
    &source[node.start_byte()..node.end_byte()]
}

/// Text of a named field, if present
pub fn field_text<'s>(node: &Node, field: &str, source: &'s str) -> Option<&'s str> {
    node.child_by_field_name(field).map(|n| node_text(&n, source))
}

/// `attribute_item` siblings directly preceding `node`
///
/// Rust attributes are siblings of the item they annotate, not children.
/// Doc comments between attributes are skipped.
pub fn preceding_attributes<'a>(node: &Node<'a>) -> Vec<Node<'a>> {
    let mut attrs = Vec::new();
    let mut current = node.prev_sibling();
    while let Some(sibling) = current {
        match sibling.kind() {
            "attribute_item" => attrs.push(sibling),
            "line_comment" | "block_comment" => {}
            _ => break,
        }
        current = sibling.prev_sibling();
    }
    attrs.reverse();
    attrs
}

/// Path of an attribute without arguments: `#[tokio::test(flavor = ..)]` → `tokio::test`
pub fn attribute_path(attr_item: &Node, source: &str) -> Option<String> {
    let attribute = find_child_by_kind(attr_item, "attribute")?;
    let path = attribute
        .named_child(0)
        .map(|n| node_text(&n, source).to_string())?;
    Some(path.split_whitespace().collect())
}

/// 1-indexed start line of a node
#[inline]
pub fn start_line(node: &Node) -> usize {
    node.start_position().row + 1
}
