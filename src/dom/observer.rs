//! Mutation observation records.

use super::NodeId;

/// Which mutations an observer wants, mirroring the platform primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObserverOptions {
    pub child_list: bool,
    pub attributes: bool,
    pub subtree: bool,
}

impl ObserverOptions {
    /// Child-list and attribute changes across the whole subtree.
    pub fn all() -> Self {
        Self {
            child_list: true,
            attributes: true,
            subtree: true,
        }
    }
}

/// One detected change to the tree. Consumed immediately by the observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    ChildList {
        target: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    Attributes {
        target: NodeId,
        name: String,
        old_value: Option<String>,
    },
}

impl MutationRecord {
    pub fn target(&self) -> NodeId {
        match self {
            MutationRecord::ChildList { target, .. }
            | MutationRecord::Attributes { target, .. } => {
                *target
            }
        }
    }
}

/// Active registration on a document.
#[derive(Debug)]
pub(super) struct Registration {
    pub(super) target: NodeId,
    pub(super) options: ObserverOptions,
    pub(super) records: Vec<MutationRecord>,
}

impl Registration {
    pub(super) fn wants(&self, record: &MutationRecord) -> bool {
        match record {
            MutationRecord::ChildList { .. } => self.options.child_list,
            MutationRecord::Attributes { .. } => self.options.attributes,
        }
    }
}
