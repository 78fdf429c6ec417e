//! Embedded collection editor hooks.
//!
//! # Responsibility
//! - Bundle the insert/remove/move hooks a property grid calls for one
//!   collection-valued child slot.
//! - Provide the standard hooks for collections of a single node type.
//!
//! # Invariants
//! - Hooks never fail loudly: a missing owner, missing item or out-of-range
//!   move is a no-op reported as `None`/`false`.
//! - A move that would leave `[0, count)` does not touch the collection.

use crate::model::node::{Document, NodeId};
use crate::model::schema::NodeTypeId;
use std::fmt::{Debug, Formatter};

/// Collection being edited: one child slot of one owner node.
pub struct CollectionContext<'a> {
    pub document: &'a mut Document,
    pub owner: NodeId,
    pub child_name: &'a str,
}

impl<'a> CollectionContext<'a> {
    pub fn new(document: &'a mut Document, owner: NodeId, child_name: &'a str) -> Self {
        Self {
            document,
            owner,
            child_name,
        }
    }

    /// Current items in collection order.
    pub fn items(&self) -> &[NodeId] {
        self.document.children(self.owner, self.child_name)
    }
}

pub type InsertHook = Box<dyn Fn(&mut CollectionContext<'_>) -> Option<NodeId> + Send + Sync>;
pub type RemoveHook = Box<dyn Fn(&mut CollectionContext<'_>, NodeId) -> bool + Send + Sync>;
pub type MoveHook = Box<dyn Fn(&mut CollectionContext<'_>, NodeId, isize) -> bool + Send + Sync>;

/// Insert/remove/move hooks for one editable collection.
pub struct CollectionEditor {
    item_label: String,
    insert_item: InsertHook,
    remove_item: RemoveHook,
    move_item: MoveHook,
}

impl Debug for CollectionEditor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionEditor")
            .field("item_label", &self.item_label)
            .finish_non_exhaustive()
    }
}

impl CollectionEditor {
    pub fn new(
        item_label: impl Into<String>,
        insert_item: InsertHook,
        remove_item: RemoveHook,
        move_item: MoveHook,
    ) -> Self {
        Self {
            item_label: item_label.into(),
            insert_item,
            remove_item,
            move_item,
        }
    }

    /// Standard hooks for a collection holding nodes of `item_type`.
    pub fn embedded(item_label: impl Into<String>, item_type: NodeTypeId) -> Self {
        Self::new(
            item_label,
            Box::new(move |ctx: &mut CollectionContext<'_>| {
                ctx.document
                    .append_child(ctx.owner, ctx.child_name, item_type)
                    .ok()
            }),
            Box::new(|ctx: &mut CollectionContext<'_>, item: NodeId| {
                ctx.document.remove_child(ctx.owner, ctx.child_name, item)
            }),
            Box::new(|ctx: &mut CollectionContext<'_>, item: NodeId, delta: isize| {
                let moved = ctx
                    .document
                    .child_list_mut(ctx.owner, ctx.child_name)
                    .is_some_and(|list| move_by_offset(list, &item, delta));
                if moved {
                    ctx.document.mark_dirty();
                }
                moved
            }),
        )
    }

    /// Label shown on the insert action.
    pub fn item_label(&self) -> &str {
        &self.item_label
    }

    /// Creates and appends a new item. `None` when the owner is gone.
    pub fn insert(&self, ctx: &mut CollectionContext<'_>) -> Option<NodeId> {
        (self.insert_item)(ctx)
    }

    /// Removes `item` by identity. `false` when it is not in the collection.
    pub fn remove(&self, ctx: &mut CollectionContext<'_>, item: NodeId) -> bool {
        (self.remove_item)(ctx, item)
    }

    /// Moves `item` by `delta` positions. `false` when nothing moved.
    pub fn move_item(&self, ctx: &mut CollectionContext<'_>, item: NodeId, delta: isize) -> bool {
        (self.move_item)(ctx, item, delta)
    }
}

/// Moves `item` by `delta` positions within `list`.
///
/// Returns `false` and leaves `list` untouched when `item` is absent, `delta`
/// is zero, or the destination falls outside `[0, list.len())`.
pub fn move_by_offset<T: PartialEq>(list: &mut Vec<T>, item: &T, delta: isize) -> bool {
    let Some(index) = list.iter().position(|current| current == item) else {
        return false;
    };
    let Some(destination) = index.checked_add_signed(delta) else {
        return false;
    };
    if destination >= list.len() || destination == index {
        return false;
    }
    let value = list.remove(index);
    list.insert(destination, value);
    true
}

#[cfg(test)]
mod tests {
    use super::move_by_offset;

    #[test]
    fn moves_within_bounds() {
        let mut list = vec!['a', 'b', 'c', 'd'];
        assert!(move_by_offset(&mut list, &'a', 2));
        assert_eq!(list, vec!['b', 'c', 'a', 'd']);
        assert!(move_by_offset(&mut list, &'d', -3));
        assert_eq!(list, vec!['d', 'b', 'c', 'a']);
    }

    #[test]
    fn out_of_range_or_absent_is_noop() {
        let mut list = vec![1, 2, 3];
        assert!(!move_by_offset(&mut list, &1, -1));
        assert!(!move_by_offset(&mut list, &3, 1));
        assert!(!move_by_offset(&mut list, &2, 5));
        assert!(!move_by_offset(&mut list, &9, 1));
        assert!(!move_by_offset(&mut list, &2, 0));
        assert_eq!(list, vec![1, 2, 3]);
    }
}
