//! Persisted form of a document node tree.
//!
//! Reference targets are runtime state and never appear here.

use crate::model::node::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Serializable node subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    /// Serialized as `type` to match schema naming.
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Child lists keyed by child slot name, each in insertion order.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, Vec<NodeRecord>>,
}

impl NodeRecord {
    /// Counts this node and every descendant.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .values()
            .flatten()
            .map(NodeRecord::node_count)
            .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::NodeRecord;
    use uuid::Uuid;

    #[test]
    fn serializes_type_field_and_omits_empty_maps() {
        let id = Uuid::parse_str("11111111-2222-4333-8444-555555555555").unwrap();
        let record = NodeRecord {
            id,
            type_name: "placementsDocumentType".to_string(),
            attributes: Default::default(),
            children: Default::default(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "placementsDocumentType");
        assert_eq!(json["id"], id.to_string());
        assert!(json.get("attributes").is_none());
        assert!(json.get("children").is_none());
        assert_eq!(record.node_count(), 1);
    }
}
