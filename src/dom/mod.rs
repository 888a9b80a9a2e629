//! In-memory document tree with a mutation-notification primitive.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]; removed nodes stay
//! in the arena, detached. A single observer can be registered with
//! [`Document::observe`]. Writes that leave a value unchanged are not
//! recorded, so a pass that rewrites already-translated content produces no
//! further records.

mod observer;

pub use observer::{MutationRecord, ObserverOptions};

use serde::{Deserialize, Serialize};

use crate::types::{Error, Result};
use observer::Registration;

/// Arena index of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Node payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// A document tree.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    ready: bool,
    observer: Option<Registration>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Document)],
            ready: false,
            observer: None,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn mark_ready(&mut self) {
        self.ready = true;
    }

    // =========================================================================
    // Construction
    // =========================================================================

    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.push(NodeKind::Element {
            tag: tag.into(),
            attributes: Vec::new(),
        })
    }

    pub fn create_text(&mut self, data: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(data.into()))
    }

    pub fn create_comment(&mut self, data: impl Into<String>) -> NodeId {
        self.push(NodeKind::Comment(data.into()))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node::new(kind));
        NodeId(self.nodes.len() - 1)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| Error::not_found(format!("node {}", id.0)))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.0)
            .ok_or_else(|| Error::not_found(format!("node {}", id.0)))
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|n| &n.kind)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Element { .. }))
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Element { tag, .. }) => Some(tag),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Whether the node is reachable from the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains(self.root(), id)
    }

    /// Pre-order list of `root` and all its descendants.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if self.nodes.get(id.0).is_none() {
                continue;
            }
            out.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        out
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Element { attributes, .. }) => attributes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// First attached element whose `id` attribute equals `element_id`.
    pub fn element_by_id(&self, element_id: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|&n| self.attribute(n, "id") == Some(element_id))
    }

    /// Concatenated text of the node and its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        match self.kind(id) {
            Some(NodeKind::Text(data)) | Some(NodeKind::Comment(data)) => data.clone(),
            Some(_) => self
                .descendants(id)
                .into_iter()
                .filter_map(|n| match self.kind(n) {
                    Some(NodeKind::Text(data)) => Some(data.as_str()),
                    _ => None,
                })
                .collect(),
            None => String::new(),
        }
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Append `child` under `parent`, detaching it from its old parent first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        match self.node(parent)?.kind {
            NodeKind::Document | NodeKind::Element { .. } => {}
            _ => {
                return Err(Error::validation(format!(
                    "node {} cannot have children",
                    parent.0
                )))
            }
        }
        if matches!(self.node(child)?.kind, NodeKind::Document) {
            return Err(Error::validation("the document node cannot be appended"));
        }
        if self.contains(child, parent) {
            return Err(Error::validation(format!(
                "appending node {} under node {} would create a cycle",
                child.0, parent.0
            )));
        }

        if let Some(old_parent) = self.parent(child) {
            self.detach(old_parent, child)?;
        }
        self.node_mut(child)?.parent = Some(parent);
        self.node_mut(parent)?.children.push(child);
        self.record(MutationRecord::ChildList {
            target: parent,
            added: vec![child],
            removed: Vec::new(),
        });
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.parent(child) != Some(parent) {
            return Err(Error::not_found(format!(
                "node {} is not a child of node {}",
                child.0, parent.0
            )));
        }
        self.detach(parent, child)
    }

    fn detach(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.node_mut(parent)?.children.retain(|&c| c != child);
        self.node_mut(child)?.parent = None;
        self.record(MutationRecord::ChildList {
            target: parent,
            added: Vec::new(),
            removed: vec![child],
        });
        Ok(())
    }

    /// Set an attribute. Returns `false` (and records nothing) when unchanged.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<bool> {
        let old_value = {
            let NodeKind::Element { attributes, .. } = &mut self.node_mut(id)?.kind else {
                return Err(Error::validation(format!("node {} is not an element", id.0)));
            };
            match attributes.iter_mut().find(|(n, _)| n == name) {
                Some((_, v)) if v == value => return Ok(false),
                Some((_, v)) => Some(std::mem::replace(v, value.to_string())),
                None => {
                    attributes.push((name.to_string(), value.to_string()));
                    None
                }
            }
        };
        self.record(MutationRecord::Attributes {
            target: id,
            name: name.to_string(),
            old_value,
        });
        Ok(true)
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<bool> {
        let old_value = {
            let NodeKind::Element { attributes, .. } = &mut self.node_mut(id)?.kind else {
                return Err(Error::validation(format!("node {} is not an element", id.0)));
            };
            let Some(pos) = attributes.iter().position(|(n, _)| n == name) else {
                return Ok(false);
            };
            attributes.remove(pos).1
        };
        self.record(MutationRecord::Attributes {
            target: id,
            name: name.to_string(),
            old_value: Some(old_value),
        });
        Ok(true)
    }

    /// Replace the text of a node.
    ///
    /// For text and comment nodes the data is updated in place (character data
    /// changes are not observed). For elements all children are replaced by a
    /// single text node. Returns `false` when the content already matches.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> Result<bool> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Text(data) | NodeKind::Comment(data) => {
                if data == text {
                    return Ok(false);
                }
                *data = text.to_string();
                return Ok(true);
            }
            NodeKind::Document => {
                return Err(Error::validation("cannot set text content of the document"))
            }
            NodeKind::Element { .. } => {}
        }

        if self.has_exact_text(id, text) {
            return Ok(false);
        }

        let removed = std::mem::take(&mut self.node_mut(id)?.children);
        for &child in &removed {
            self.node_mut(child)?.parent = None;
        }
        let mut added = Vec::new();
        if !text.is_empty() {
            let text_node = self.create_text(text);
            self.node_mut(text_node)?.parent = Some(id);
            self.node_mut(id)?.children.push(text_node);
            added.push(text_node);
        }
        self.record(MutationRecord::ChildList {
            target: id,
            added,
            removed,
        });
        Ok(true)
    }

    fn has_exact_text(&self, id: NodeId, text: &str) -> bool {
        match self.children(id) {
            [] => text.is_empty(),
            [only] => matches!(self.kind(*only), Some(NodeKind::Text(data)) if data == text),
            _ => false,
        }
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Start recording mutations under `target`, replacing any earlier
    /// registration.
    pub fn observe(&mut self, target: NodeId, options: ObserverOptions) {
        self.observer = Some(Registration {
            target,
            options,
            records: Vec::new(),
        });
    }

    pub fn disconnect(&mut self) {
        self.observer = None;
    }

    pub fn is_observed(&self) -> bool {
        self.observer.is_some()
    }

    pub fn has_pending_records(&self) -> bool {
        self.observer
            .as_ref()
            .is_some_and(|o| !o.records.is_empty())
    }

    /// Drain the records collected since the last call (one batch).
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        self.observer
            .as_mut()
            .map(|o| std::mem::take(&mut o.records))
            .unwrap_or_default()
    }

    fn record(&mut self, record: MutationRecord) {
        let Some(registration) = &self.observer else {
            return;
        };
        if !registration.wants(&record) {
            return;
        }
        let observed = registration.target;
        let in_scope = if registration.options.subtree {
            self.contains(observed, record.target())
        } else {
            record.target() == observed
        };
        if !in_scope {
            return;
        }
        if let Some(registration) = &mut self.observer {
            registration.records.push(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn document_with_body() -> (Document, NodeId) {
        let mut doc = Document::new();
        let body = doc.create_element("body");
        doc.append_child(doc.root(), body).unwrap();
        (doc, body)
    }

    #[test]
    fn test_append_and_text_content() {
        let (mut doc, body) = document_with_body();
        let p = doc.create_element("p");
        let text = doc.create_text("hello ");
        let em = doc.create_element("em");
        let inner = doc.create_text("world");
        doc.append_child(body, p).unwrap();
        doc.append_child(p, text).unwrap();
        doc.append_child(p, em).unwrap();
        doc.append_child(em, inner).unwrap();

        assert_eq!(doc.text_content(body), "hello world");
        assert_eq!(doc.descendants(p), vec![p, text, em, inner]);
        assert!(doc.is_attached(inner));
    }

    #[test]
    fn test_append_rejects_cycles_and_text_parents() {
        let (mut doc, body) = document_with_body();
        let div = doc.create_element("div");
        doc.append_child(body, div).unwrap();

        assert!(matches!(
            doc.append_child(div, body),
            Err(Error::Validation(_))
        ));

        let text = doc.create_text("x");
        let span = doc.create_element("span");
        assert!(doc.append_child(text, span).is_err());
    }

    #[test]
    fn test_append_moves_node() {
        let (mut doc, body) = document_with_body();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        let child = doc.create_element("span");
        doc.append_child(body, a).unwrap();
        doc.append_child(body, b).unwrap();
        doc.append_child(a, child).unwrap();
        doc.append_child(b, child).unwrap();

        assert!(doc.children(a).is_empty());
        assert_eq!(doc.children(b), &[child]);
        assert_eq!(doc.parent(child), Some(b));
    }

    #[test]
    fn test_records_only_after_observe() {
        let (mut doc, body) = document_with_body();
        let early = doc.create_element("div");
        doc.append_child(body, early).unwrap();
        assert!(doc.take_records().is_empty());

        doc.observe(doc.root(), ObserverOptions::all());
        let late = doc.create_element("div");
        doc.append_child(body, late).unwrap();

        assert_eq!(
            doc.take_records(),
            vec![MutationRecord::ChildList {
                target: body,
                added: vec![late],
                removed: vec![],
            }]
        );
        assert!(!doc.has_pending_records());
    }

    #[test]
    fn test_unchanged_writes_are_not_recorded() {
        let (mut doc, body) = document_with_body();
        doc.observe(doc.root(), ObserverOptions::all());

        assert!(doc.set_attribute(body, "title", "a").unwrap());
        assert!(!doc.set_attribute(body, "title", "a").unwrap());
        assert!(doc.set_text_content(body, "hi").unwrap());
        assert!(!doc.set_text_content(body, "hi").unwrap());

        assert_eq!(doc.take_records().len(), 2);
    }

    #[test]
    fn test_attribute_record_keeps_old_value() {
        let (mut doc, body) = document_with_body();
        doc.set_attribute(body, "i18n-content", "old").unwrap();
        doc.observe(doc.root(), ObserverOptions::all());

        doc.set_attribute(body, "i18n-content", "new").unwrap();

        assert_eq!(
            doc.take_records(),
            vec![MutationRecord::Attributes {
                target: body,
                name: "i18n-content".to_string(),
                old_value: Some("old".to_string()),
            }]
        );
    }

    #[test]
    fn test_detached_subtrees_are_not_observed() {
        let (mut doc, _body) = document_with_body();
        doc.observe(doc.root(), ObserverOptions::all());

        let detached = doc.create_element("div");
        doc.set_attribute(detached, "title", "x").unwrap();

        assert!(doc.take_records().is_empty());
    }

    #[test]
    fn test_non_subtree_observer_sees_target_only() {
        let (mut doc, body) = document_with_body();
        doc.observe(
            body,
            ObserverOptions {
                child_list: true,
                attributes: false,
                subtree: false,
            },
        );

        let div = doc.create_element("div");
        doc.append_child(body, div).unwrap();
        doc.set_attribute(body, "title", "ignored").unwrap();
        let deep = doc.create_element("span");
        doc.append_child(div, deep).unwrap();

        let records = doc.take_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target(), body);
    }

    #[test]
    fn test_element_by_id() {
        let (mut doc, body) = document_with_body();
        let div = doc.create_element("div");
        doc.set_attribute(div, "id", "general").unwrap();
        doc.append_child(body, div).unwrap();

        assert_eq!(doc.element_by_id("general"), Some(div));
        assert_eq!(doc.element_by_id("missing"), None);
    }
}
