//! In-scope namespace bindings.
//!
//! Each prefix maps to a stack of URIs so inner declarations shadow outer
//! ones; each element frame records which prefixes it declared so its end
//! pops exactly those. `""` (no namespace) and `xml` are bound from the start.

use std::rc::Rc;

use crate::qname::{NamespaceDecl, XML_NAMESPACE, XML_PREFIX};
use crate::FastHashMap;

/// Prefix → URI bindings with element scoping.
#[derive(Debug, Clone)]
pub struct NamespaceContext {
    bindings: FastHashMap<Rc<str>, Vec<Rc<str>>>,
    /// Pro Element-Frame: die dort deklarierten Prefixe.
    frames: Vec<Vec<Rc<str>>>,
}

impl Default for NamespaceContext {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceContext {
    /// Context with only the built-in bindings.
    pub fn new() -> Self {
        let mut bindings = FastHashMap::default();
        bindings.insert(Rc::from(""), vec![Rc::from("")]);
        bindings.insert(Rc::from(XML_PREFIX), vec![Rc::from(XML_NAMESPACE)]);
        Self { bindings, frames: Vec::new() }
    }

    /// Opens the scope of a new element.
    pub fn push_scope(&mut self) {
        self.frames.push(Vec::new());
    }

    /// Binds `decl.prefix` in the innermost scope. An empty URI on the default
    /// prefix undeclares the default namespace.
    pub fn declare(&mut self, decl: &NamespaceDecl) {
        self.bindings
            .entry(Rc::clone(&decl.prefix))
            .or_default()
            .push(Rc::clone(&decl.uri));
        if let Some(frame) = self.frames.last_mut() {
            frame.push(Rc::clone(&decl.prefix));
        }
    }

    /// Closes the innermost scope and returns the prefixes it had declared.
    pub fn pop_scope(&mut self) -> Vec<Rc<str>> {
        let declared = self.frames.pop().unwrap_or_default();
        for prefix in &declared {
            if let Some(stack) = self.bindings.get_mut(prefix) {
                stack.pop();
            }
        }
        declared
    }

    /// URI currently bound to `prefix`.
    pub fn resolve(&self, prefix: &str) -> Option<&Rc<str>> {
        self.bindings.get(prefix).and_then(|stack| stack.last())
    }

    /// A non-empty prefix currently bound to `uri`.
    pub fn prefix_for(&self, uri: &str) -> Option<&Rc<str>> {
        self.bindings
            .iter()
            .find(|(prefix, stack)| !prefix.is_empty() && stack.last().is_some_and(|u| &**u == uri))
            .map(|(prefix, _)| prefix)
    }

    /// Number of open element scopes.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Drops every scope, keeping only the built-in bindings.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_bindings() {
        let ctx = NamespaceContext::new();
        assert_eq!(ctx.resolve("").map(|u| &**u), Some(""));
        assert_eq!(ctx.resolve("xml").map(|u| &**u), Some(XML_NAMESPACE));
        assert!(ctx.resolve("p").is_none());
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn prefix_lookup_sees_only_current_bindings() {
        let mut ctx = NamespaceContext::new();
        ctx.push_scope();
        ctx.declare(&NamespaceDecl::new("p", "urn:a"));
        assert_eq!(ctx.prefix_for("urn:a").map(|p| &**p), Some("p"));
        ctx.push_scope();
        ctx.declare(&NamespaceDecl::new("p", "urn:b"));
        assert!(ctx.prefix_for("urn:a").is_none());
        ctx.pop_scope();
        assert_eq!(ctx.prefix_for("urn:a").map(|p| &**p), Some("p"));
        assert_eq!(ctx.prefix_for(XML_NAMESPACE).map(|p| &**p), Some("xml"));
    }

    #[test]
    fn shadowing_reverts_on_pop() {
        let mut ctx = NamespaceContext::new();
        ctx.push_scope();
        ctx.declare(&NamespaceDecl::new("p", "urn:outer"));
        ctx.push_scope();
        ctx.declare(&NamespaceDecl::new("p", "urn:inner"));
        assert_eq!(ctx.resolve("p").map(|u| &**u), Some("urn:inner"));
        assert_eq!(ctx.pop_scope(), vec![Rc::from("p")]);
        assert_eq!(ctx.resolve("p").map(|u| &**u), Some("urn:outer"));
        ctx.pop_scope();
        assert!(ctx.resolve("p").is_none());
    }

    #[test]
    fn default_namespace_undeclaration() {
        let mut ctx = NamespaceContext::new();
        ctx.push_scope();
        ctx.declare(&NamespaceDecl::new("", "urn:d"));
        ctx.push_scope();
        ctx.declare(&NamespaceDecl::new("", ""));
        assert_eq!(ctx.resolve("").map(|u| &**u), Some(""));
        ctx.pop_scope();
        assert_eq!(ctx.resolve("").map(|u| &**u), Some("urn:d"));
        ctx.reset();
        assert_eq!(ctx.resolve("").map(|u| &**u), Some(""));
        assert_eq!(ctx.depth(), 0);
    }
}
