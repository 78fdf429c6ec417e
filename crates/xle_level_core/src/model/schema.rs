//! Schema type registry for the level document model.
//!
//! # Responsibility
//! - Turn an externally parsed type collection into an indexed `Schema`.
//! - Answer type-hierarchy questions (`is_assignable_from`).
//! - Expose the named type tags the placement and terrain code relies on.
//!
//! # Invariants
//! - Base chains are acyclic; initialization rejects cycles.
//! - Every named tag in `SchemaTags` resolves to a declared type.
//! - `NodeTypeId` values are only meaningful for the schema that issued them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Child and attribute names shared by schema declarations and views.
pub mod names {
    pub const GAME_TYPE: &str = "gameType";
    pub const PLACEMENTS_FOLDER_TYPE: &str = "placementsFolderType";
    pub const PLACEMENTS_CELL_REFERENCE_TYPE: &str = "placementsCellReferenceType";
    pub const PLACEMENTS_DOCUMENT_TYPE: &str = "placementsDocumentType";
    pub const PLACEMENT_OBJECT_TYPE: &str = "placementObjectType";
    pub const TERRAIN_TYPE: &str = "terrainType";
    pub const TERRAIN_BASE_TEXTURE_TYPE: &str = "terrainBaseTextureType";
    pub const TERRAIN_BASE_TEXTURE_STRATA_TYPE: &str = "terrainBaseTextureStrataType";

    pub const PLACEMENTS_FOLDER_CHILD: &str = "placementsFolder";
    pub const CELL_CHILD: &str = "cell";
    pub const PLACEMENT_CHILD: &str = "placement";
    pub const TERRAIN_CHILD: &str = "terrain";
    pub const BASE_TEXTURE_CHILD: &str = "baseTexture";
    pub const STRATA_CHILD: &str = "strata";

    pub const NAME_ATTR: &str = "name";
    pub const URI_ATTR: &str = "uri";
}

/// Index of one type inside a `Schema`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeTypeId(u32);

impl NodeTypeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Declared child slot of a type, as delivered by the schema loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildDecl {
    pub name: String,
    pub type_name: String,
    #[serde(default)]
    pub is_list: bool,
}

/// Declared type, as delivered by the schema loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub children: Vec<ChildDecl>,
}

impl TypeDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attributes.push(attribute.into());
        self
    }

    pub fn with_child(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.children.push(ChildDecl {
            name: name.into(),
            type_name: type_name.into(),
            is_list: false,
        });
        self
    }

    pub fn with_child_list(
        mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        self.children.push(ChildDecl {
            name: name.into(),
            type_name: type_name.into(),
            is_list: true,
        });
        self
    }
}

/// One parsed schema namespace worth of type declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCollection {
    pub target_namespace: String,
    pub types: Vec<TypeDecl>,
}

impl TypeCollection {
    /// Built-in declarations matching the packaged `xleroot.xsd`.
    pub fn xle_baseline() -> Self {
        use names::*;

        Self {
            target_namespace: "gap".to_string(),
            types: vec![
                TypeDecl::new(GAME_TYPE)
                    .with_attribute(NAME_ATTR)
                    .with_child(PLACEMENTS_FOLDER_CHILD, PLACEMENTS_FOLDER_TYPE)
                    .with_child(TERRAIN_CHILD, TERRAIN_TYPE),
                TypeDecl::new(PLACEMENTS_FOLDER_TYPE)
                    .with_attribute(NAME_ATTR)
                    .with_child_list(CELL_CHILD, PLACEMENTS_CELL_REFERENCE_TYPE),
                TypeDecl::new(PLACEMENTS_CELL_REFERENCE_TYPE)
                    .with_attribute(NAME_ATTR)
                    .with_attribute(URI_ATTR),
                TypeDecl::new(PLACEMENTS_DOCUMENT_TYPE)
                    .with_child_list(PLACEMENT_CHILD, PLACEMENT_OBJECT_TYPE),
                TypeDecl::new(PLACEMENT_OBJECT_TYPE)
                    .with_attribute(NAME_ATTR)
                    .with_attribute("model")
                    .with_attribute("material")
                    .with_attribute("transform"),
                TypeDecl::new(TERRAIN_TYPE)
                    .with_attribute("cellsDirectory")
                    .with_child(BASE_TEXTURE_CHILD, TERRAIN_BASE_TEXTURE_TYPE),
                TypeDecl::new(TERRAIN_BASE_TEXTURE_TYPE)
                    .with_attribute("diffuseDims")
                    .with_child_list(STRATA_CHILD, TERRAIN_BASE_TEXTURE_STRATA_TYPE),
                TypeDecl::new(TERRAIN_BASE_TEXTURE_STRATA_TYPE)
                    .with_attribute("texture0")
                    .with_attribute("texture1")
                    .with_attribute("slope")
                    .with_attribute("endHeight")
                    .with_attribute("mappingConstant0")
                    .with_attribute("mappingConstant1")
                    .with_attribute("mappingConstantSlope"),
            ],
        }
    }
}

/// Resolved child slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildInfo {
    pub name: String,
    pub child_type: NodeTypeId,
    pub is_list: bool,
}

/// Resolved type definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    pub name: String,
    pub base: Option<NodeTypeId>,
    pub attributes: Vec<String>,
    pub children: Vec<ChildInfo>,
}

/// Named type tags used by the placement and terrain layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaTags {
    pub game: NodeTypeId,
    pub placements_folder: NodeTypeId,
    pub placements_cell_reference: NodeTypeId,
    pub placements_document: NodeTypeId,
    pub terrain_base_texture: NodeTypeId,
    pub terrain_base_texture_strata: NodeTypeId,
}

/// Errors raised while indexing a type collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Two declarations share one name.
    DuplicateType(String),
    /// A declaration names a base type that is not declared.
    UnknownBaseType { type_name: String, base: String },
    /// A child slot names a type that is not declared.
    UnknownChildType {
        type_name: String,
        child: String,
        child_type: String,
    },
    /// Base chain loops back on itself.
    CyclicBaseType(String),
    /// A required named type is absent from the collection.
    MissingType(&'static str),
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateType(name) => write!(f, "type declared more than once: {name}"),
            Self::UnknownBaseType { type_name, base } => {
                write!(f, "type `{type_name}` derives from unknown type `{base}`")
            }
            Self::UnknownChildType {
                type_name,
                child,
                child_type,
            } => write!(
                f,
                "child `{child}` of type `{type_name}` uses unknown type `{child_type}`"
            ),
            Self::CyclicBaseType(name) => write!(f, "base chain of type `{name}` is cyclic"),
            Self::MissingType(name) => write!(f, "schema is missing required type `{name}`"),
        }
    }
}

impl Error for SchemaError {}

/// Indexed schema built once per editor session.
#[derive(Debug, Clone)]
pub struct Schema {
    target_namespace: String,
    types: Vec<TypeDef>,
    by_name: BTreeMap<String, NodeTypeId>,
    tags: SchemaTags,
}

impl Schema {
    /// Indexes one type collection and resolves the named tags.
    ///
    /// # Errors
    /// - Returns `DuplicateType`, `UnknownBaseType`, `UnknownChildType` for
    ///   malformed declarations.
    /// - Returns `CyclicBaseType` when a base chain loops.
    /// - Returns `MissingType` when a required named type is absent.
    pub fn initialize(collection: &TypeCollection) -> Result<Self, SchemaError> {
        let mut by_name = BTreeMap::new();
        for (index, decl) in collection.types.iter().enumerate() {
            if by_name
                .insert(decl.name.clone(), NodeTypeId(index as u32))
                .is_some()
            {
                return Err(SchemaError::DuplicateType(decl.name.clone()));
            }
        }

        let mut types = Vec::with_capacity(collection.types.len());
        for decl in &collection.types {
            let base = match decl.base.as_deref() {
                None => None,
                Some(base) => Some(by_name.get(base).copied().ok_or_else(|| {
                    SchemaError::UnknownBaseType {
                        type_name: decl.name.clone(),
                        base: base.to_string(),
                    }
                })?),
            };

            let mut children = Vec::with_capacity(decl.children.len());
            for child in &decl.children {
                let child_type = by_name.get(child.type_name.as_str()).copied().ok_or_else(|| {
                    SchemaError::UnknownChildType {
                        type_name: decl.name.clone(),
                        child: child.name.clone(),
                        child_type: child.type_name.clone(),
                    }
                })?;
                children.push(ChildInfo {
                    name: child.name.clone(),
                    child_type,
                    is_list: child.is_list,
                });
            }

            types.push(TypeDef {
                name: decl.name.clone(),
                base,
                attributes: decl.attributes.clone(),
                children,
            });
        }

        ensure_acyclic(&types)?;

        let lookup = |name: &'static str| {
            by_name
                .get(name)
                .copied()
                .ok_or(SchemaError::MissingType(name))
        };
        let tags = SchemaTags {
            game: lookup(names::GAME_TYPE)?,
            placements_folder: lookup(names::PLACEMENTS_FOLDER_TYPE)?,
            placements_cell_reference: lookup(names::PLACEMENTS_CELL_REFERENCE_TYPE)?,
            placements_document: lookup(names::PLACEMENTS_DOCUMENT_TYPE)?,
            terrain_base_texture: lookup(names::TERRAIN_BASE_TEXTURE_TYPE)?,
            terrain_base_texture_strata: lookup(names::TERRAIN_BASE_TEXTURE_STRATA_TYPE)?,
        };

        Ok(Self {
            target_namespace: collection.target_namespace.clone(),
            types,
            by_name,
            tags,
        })
    }

    pub fn target_namespace(&self) -> &str {
        &self.target_namespace
    }

    pub fn tags(&self) -> &SchemaTags {
        &self.tags
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn type_id(&self, name: &str) -> Option<NodeTypeId> {
        self.by_name.get(name).copied()
    }

    pub fn type_def(&self, id: NodeTypeId) -> Option<&TypeDef> {
        self.types.get(id.index())
    }

    /// Returns the declared name, or `"<unknown>"` for a foreign id.
    pub fn type_name(&self, id: NodeTypeId) -> &str {
        self.type_def(id).map_or("<unknown>", |def| def.name.as_str())
    }

    /// Returns whether `derived` is `base` or inherits from it.
    ///
    /// Walks the base chain of `derived`; cost is the chain depth.
    pub fn is_assignable_from(&self, base: NodeTypeId, derived: NodeTypeId) -> bool {
        let mut cursor = Some(derived);
        while let Some(current) = cursor {
            if current == base {
                return true;
            }
            cursor = self.type_def(current).and_then(|def| def.base);
        }
        false
    }

    /// Finds a child slot on `owner` or any of its base types.
    pub fn child_info(&self, owner: NodeTypeId, child_name: &str) -> Option<&ChildInfo> {
        let mut cursor = Some(owner);
        while let Some(current) = cursor {
            let def = self.type_def(current)?;
            if let Some(info) = def.children.iter().find(|info| info.name == child_name) {
                return Some(info);
            }
            cursor = def.base;
        }
        None
    }
}

fn ensure_acyclic(types: &[TypeDef]) -> Result<(), SchemaError> {
    for def in types {
        let mut steps = 0usize;
        let mut cursor = def.base;
        while let Some(current) = cursor {
            steps += 1;
            if steps > types.len() {
                return Err(SchemaError::CyclicBaseType(def.name.clone()));
            }
            cursor = types[current.index()].base;
        }
    }
    Ok(())
}
