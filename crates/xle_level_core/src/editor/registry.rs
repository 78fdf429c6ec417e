//! Property editor registry for collection-valued child slots.

use crate::editor::collection::CollectionEditor;
use crate::model::schema::{NodeTypeId, Schema};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Lookup key: child slot `child_name` of `owner_type`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PropertyKey {
    pub owner_type: NodeTypeId,
    pub child_name: String,
}

/// Property grid entry for one child slot.
#[derive(Debug, Clone)]
pub struct ChildPropertyDescriptor {
    pub display_name: String,
    pub child_name: String,
    pub category: Option<String>,
    pub description: String,
    pub read_only: bool,
    pub editor: Option<Arc<CollectionEditor>>,
}

impl ChildPropertyDescriptor {
    pub fn new(
        display_name: impl Into<String>,
        child_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            child_name: child_name.into(),
            category: None,
            description: description.into(),
            read_only: false,
            editor: None,
        }
    }

    pub fn with_editor(mut self, editor: CollectionEditor) -> Self {
        self.editor = Some(Arc::new(editor));
        self
    }
}

/// Registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyEditorError {
    /// Owner type does not declare the child slot (directly or by inheritance).
    UnknownChild { owner: String, child: String },
    /// A descriptor is already registered for this slot.
    DuplicateProperty { owner: String, child: String },
}

impl Display for PropertyEditorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownChild { owner, child } => {
                write!(f, "type `{owner}` has no child slot `{child}`")
            }
            Self::DuplicateProperty { owner, child } => {
                write!(f, "property already registered: {owner}.{child}")
            }
        }
    }
}

impl Error for PropertyEditorError {}

/// Descriptors registered once at schema-load time.
#[derive(Debug, Default)]
pub struct PropertyEditorRegistry {
    entries: BTreeMap<PropertyKey, ChildPropertyDescriptor>,
}

impl PropertyEditorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `descriptor` for its child slot on `owner_type`.
    pub fn register(
        &mut self,
        schema: &Schema,
        owner_type: NodeTypeId,
        descriptor: ChildPropertyDescriptor,
    ) -> Result<(), PropertyEditorError> {
        let owner = schema.type_name(owner_type).to_string();
        if schema
            .child_info(owner_type, &descriptor.child_name)
            .is_none()
        {
            return Err(PropertyEditorError::UnknownChild {
                owner,
                child: descriptor.child_name,
            });
        }

        let key = PropertyKey {
            owner_type,
            child_name: descriptor.child_name.clone(),
        };
        if self.entries.contains_key(&key) {
            return Err(PropertyEditorError::DuplicateProperty {
                owner,
                child: key.child_name,
            });
        }
        self.entries.insert(key, descriptor);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact lookup on the declaring type.
    pub fn get(&self, owner_type: NodeTypeId, child_name: &str) -> Option<&ChildPropertyDescriptor> {
        self.entries.get(&PropertyKey {
            owner_type,
            child_name: child_name.to_string(),
        })
    }

    /// Lookup that also consults the base types of `node_type`.
    pub fn descriptor_for(
        &self,
        schema: &Schema,
        node_type: NodeTypeId,
        child_name: &str,
    ) -> Option<&ChildPropertyDescriptor> {
        let mut cursor = Some(node_type);
        while let Some(current) = cursor {
            if let Some(descriptor) = self.get(current, child_name) {
                return Some(descriptor);
            }
            cursor = schema.type_def(current).and_then(|def| def.base);
        }
        None
    }

    /// Descriptors declared on exactly `owner_type`, ordered by child name.
    pub fn descriptors_for_type(&self, owner_type: NodeTypeId) -> Vec<&ChildPropertyDescriptor> {
        self.entries
            .iter()
            .filter(|(key, _)| key.owner_type == owner_type)
            .map(|(_, descriptor)| descriptor)
            .collect()
    }
}
