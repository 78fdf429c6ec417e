//! Document node arena.
//!
//! # Responsibility
//! - Own the node tree of one document (game root or placement cell).
//! - Keep child lists ordered by insertion.
//! - Hold the non-owning target handles of reference nodes.
//!
//! # Invariants
//! - Every node except the root has exactly one parent inside the document.
//! - Removing a node removes its whole subtree and any target it held.
//! - Target handles are `DocumentId`s only; they never own a document.

use crate::model::record::NodeRecord;
use crate::model::schema::{NodeTypeId, Schema};
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable node identifier.
pub type NodeId = Uuid;

/// Stable identifier of an open document.
pub type DocumentId = Uuid;

/// Address of a node across documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub document: DocumentId,
    pub node: NodeId,
}

impl NodeRef {
    pub fn new(document: DocumentId, node: NodeId) -> Self {
        Self { document, node }
    }
}

/// Errors from document tree operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// Node id is not part of this document.
    NodeNotFound(NodeId),
    /// Persisted type name is not declared in the schema.
    UnknownType(String),
    /// Persisted tree uses one node id twice.
    DuplicateNodeId(NodeId),
    /// The root node cannot be detached.
    CannotRemoveRoot(NodeId),
}

impl Display for DocumentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NodeNotFound(id) => write!(f, "node not found in document: {id}"),
            Self::UnknownType(name) => write!(f, "unknown node type `{name}`"),
            Self::DuplicateNodeId(id) => write!(f, "node id appears more than once: {id}"),
            Self::CannotRemoveRoot(id) => write!(f, "document root cannot be removed: {id}"),
        }
    }
}

impl Error for DocumentError {}

/// One typed tree element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomNode {
    pub id: NodeId,
    pub node_type: NodeTypeId,
    pub parent: Option<NodeId>,
    pub attributes: BTreeMap<String, String>,
    pub children: BTreeMap<String, Vec<NodeId>>,
}

impl DomNode {
    fn new(id: NodeId, node_type: NodeTypeId, parent: Option<NodeId>) -> Self {
        Self {
            id,
            node_type,
            parent,
            attributes: BTreeMap::new(),
            children: BTreeMap::new(),
        }
    }
}

/// Node tree of one document plus its location.
#[derive(Debug, Clone)]
pub struct Document {
    id: DocumentId,
    uri: String,
    root: NodeId,
    nodes: BTreeMap<NodeId, DomNode>,
    targets: BTreeMap<NodeId, DocumentId>,
    dirty: bool,
}

impl Document {
    /// Creates an empty document with a fresh root of `root_type`.
    pub fn new(uri: impl Into<String>, root_type: NodeTypeId) -> Self {
        let root = Uuid::new_v4();
        let mut nodes = BTreeMap::new();
        nodes.insert(root, DomNode::new(root, root_type, None));
        Self {
            id: Uuid::new_v4(),
            uri: uri.into(),
            root,
            nodes,
            targets: BTreeMap::new(),
            dirty: true,
        }
    }

    /// Rebuilds a document from its persisted form.
    ///
    /// # Errors
    /// - `UnknownType` when a record names a type the schema lacks.
    /// - `DuplicateNodeId` when the record tree reuses an id.
    pub fn from_record(
        uri: impl Into<String>,
        record: &NodeRecord,
        schema: &Schema,
    ) -> Result<Self, DocumentError> {
        let mut nodes = BTreeMap::new();
        insert_record(&mut nodes, record, None, schema)?;
        Ok(Self {
            id: Uuid::new_v4(),
            uri: uri.into(),
            root: record.id,
            nodes,
            targets: BTreeMap::new(),
            dirty: false,
        })
    }

    /// Produces the persisted form of the whole tree.
    pub fn to_record(&self, schema: &Schema) -> NodeRecord {
        self.record_for(self.root, schema)
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_type(&self) -> NodeTypeId {
        self.nodes[&self.root].node_type
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&DomNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Ordered children of `parent` under `child_name`; empty when absent.
    pub fn children(&self, parent: NodeId, child_name: &str) -> &[NodeId] {
        self.nodes
            .get(&parent)
            .and_then(|node| node.children.get(child_name))
            .map_or(&[][..], Vec::as_slice)
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes
            .get(&node)
            .and_then(|node| node.attributes.get(name))
            .map(String::as_str)
    }

    pub fn set_attribute(
        &mut self,
        node: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), DocumentError> {
        let entry = self
            .nodes
            .get_mut(&node)
            .ok_or(DocumentError::NodeNotFound(node))?;
        entry.attributes.insert(name.into(), value.into());
        self.dirty = true;
        Ok(())
    }

    /// Appends a new node of `node_type` to the `child_name` list of `parent`.
    pub fn append_child(
        &mut self,
        parent: NodeId,
        child_name: &str,
        node_type: NodeTypeId,
    ) -> Result<NodeId, DocumentError> {
        let child = Uuid::new_v4();
        let parent_node = self
            .nodes
            .get_mut(&parent)
            .ok_or(DocumentError::NodeNotFound(parent))?;
        parent_node
            .children
            .entry(child_name.to_string())
            .or_default()
            .push(child);
        self.nodes
            .insert(child, DomNode::new(child, node_type, Some(parent)));
        self.dirty = true;
        Ok(child)
    }

    /// Detaches `child` from the `child_name` list of `parent` and drops its
    /// subtree. Returns `false` when `child` is not in that list.
    pub fn remove_child(&mut self, parent: NodeId, child_name: &str, child: NodeId) -> bool {
        let Some(list) = self
            .nodes
            .get_mut(&parent)
            .and_then(|node| node.children.get_mut(child_name))
        else {
            return false;
        };
        let Some(index) = list.iter().position(|id| *id == child) else {
            return false;
        };
        list.remove(index);
        self.drop_subtree(child);
        self.dirty = true;
        true
    }

    /// Detaches `node` from wherever it lives in the tree.
    pub fn remove_node(&mut self, node: NodeId) -> Result<(), DocumentError> {
        if node == self.root {
            return Err(DocumentError::CannotRemoveRoot(node));
        }
        let parent = self
            .nodes
            .get(&node)
            .ok_or(DocumentError::NodeNotFound(node))?
            .parent;
        if let Some(parent) = parent.and_then(|id| self.nodes.get_mut(&id)) {
            for list in parent.children.values_mut() {
                list.retain(|id| *id != node);
            }
        }
        self.drop_subtree(node);
        self.dirty = true;
        Ok(())
    }

    /// Mutable access to one ordered child list, for collection editors.
    pub(crate) fn child_list_mut(
        &mut self,
        parent: NodeId,
        child_name: &str,
    ) -> Option<&mut Vec<NodeId>> {
        self.nodes
            .get_mut(&parent)
            .and_then(|node| node.children.get_mut(child_name))
    }

    /// Target handle held by a reference node, if any.
    pub fn target(&self, node: NodeId) -> Option<DocumentId> {
        self.targets.get(&node).copied()
    }

    pub(crate) fn set_target(
        &mut self,
        node: NodeId,
        target: DocumentId,
    ) -> Result<(), DocumentError> {
        if !self.nodes.contains_key(&node) {
            return Err(DocumentError::NodeNotFound(node));
        }
        self.targets.insert(node, target);
        Ok(())
    }

    fn drop_subtree(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            self.targets.remove(&current);
            if let Some(removed) = self.nodes.remove(&current) {
                for list in removed.children.into_values() {
                    stack.extend(list);
                }
            }
        }
    }

    fn record_for(&self, id: NodeId, schema: &Schema) -> NodeRecord {
        let node = &self.nodes[&id];
        let children = node
            .children
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(name, list)| {
                let records = list
                    .iter()
                    .map(|child| self.record_for(*child, schema))
                    .collect();
                (name.clone(), records)
            })
            .collect();
        NodeRecord {
            id,
            type_name: schema.type_name(node.node_type).to_string(),
            attributes: node.attributes.clone(),
            children,
        }
    }
}

fn insert_record(
    nodes: &mut BTreeMap<NodeId, DomNode>,
    record: &NodeRecord,
    parent: Option<NodeId>,
    schema: &Schema,
) -> Result<(), DocumentError> {
    let mut seen = HashSet::new();
    let mut stack = vec![(record, parent)];
    while let Some((current, parent)) = stack.pop() {
        if !seen.insert(current.id) {
            return Err(DocumentError::DuplicateNodeId(current.id));
        }
        let node_type = schema
            .type_id(&current.type_name)
            .ok_or_else(|| DocumentError::UnknownType(current.type_name.clone()))?;

        let mut node = DomNode::new(current.id, node_type, parent);
        node.attributes = current.attributes.clone();
        for (name, list) in &current.children {
            node.children
                .insert(name.clone(), list.iter().map(|child| child.id).collect());
            for child in list {
                stack.push((child, Some(current.id)));
            }
        }
        nodes.insert(current.id, node);
    }
    Ok(())
}
