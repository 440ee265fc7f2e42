//! Folder permissions consumed by the search core
//!
//! Permissions are owned by the caller; the core only reads them. They decide
//! which folders a principal may read completely, which only for their own
//! records, and which not at all.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{ContextId, FolderId, UserId};

/// The authenticated user/context pair issuing a search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Tenant context
    pub context_id: ContextId,
    /// Requesting user
    pub user_id: UserId,
    /// The context administrator, if known
    #[serde(default)]
    pub context_admin: Option<UserId>,
}

impl Principal {
    /// Creates a principal without administrator information
    pub fn new(context_id: ContextId, user_id: UserId) -> Self {
        Self {
            context_id,
            user_id,
            context_admin: None,
        }
    }

    /// Records the context administrator's user id
    pub fn with_context_admin(mut self, admin: UserId) -> Self {
        self.context_admin = Some(admin);
        self
    }
}

/// How much of a folder a principal may read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadScope {
    /// Every record in the folder
    All,
    /// Only records the principal created
    Own,
    /// Nothing
    None,
}

/// Per-folder effective permission of the requesting principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePermission {
    pub folder_id: FolderId,
    pub can_read_all: bool,
    pub can_read_own: bool,
    pub owner_id: UserId,
}

impl EffectivePermission {
    /// Full read access
    pub fn read_all(folder_id: FolderId, owner_id: UserId) -> Self {
        Self {
            folder_id,
            can_read_all: true,
            can_read_own: true,
            owner_id,
        }
    }

    /// Read access restricted to own records
    pub fn read_own(folder_id: FolderId, owner_id: UserId) -> Self {
        Self {
            folder_id,
            can_read_all: false,
            can_read_own: true,
            owner_id,
        }
    }

    /// No read access
    pub fn no_access(folder_id: FolderId, owner_id: UserId) -> Self {
        Self {
            folder_id,
            can_read_all: false,
            can_read_own: false,
            owner_id,
        }
    }

    /// Returns the read scope this permission grants
    pub fn read_scope(&self) -> ReadScope {
        if self.can_read_all {
            ReadScope::All
        } else if self.can_read_own {
            ReadScope::Own
        } else {
            ReadScope::None
        }
    }
}

/// Permission lookup supplied by the caller
pub trait PermissionLookup: Send + Sync {
    /// Permission for one folder, or None if the principal has no entry
    fn permission(&self, folder: FolderId) -> Option<EffectivePermission>;

    /// Every folder the principal can read at least partially, ascending
    fn visible_folders(&self) -> Vec<FolderId>;
}

/// Map-backed permission set with deterministic iteration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderPermissions {
    entries: BTreeMap<FolderId, EffectivePermission>,
}

impl FolderPermissions {
    /// Creates an empty permission set
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a folder's permission
    pub fn insert(&mut self, permission: EffectivePermission) {
        self.entries.insert(permission.folder_id, permission);
    }

    /// Builder-style insert
    pub fn with(mut self, permission: EffectivePermission) -> Self {
        self.insert(permission);
        self
    }

    /// Number of folders with an entry
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no folder has an entry
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<EffectivePermission> for FolderPermissions {
    fn from_iter<T: IntoIterator<Item = EffectivePermission>>(iter: T) -> Self {
        let mut permissions = Self::new();
        for permission in iter {
            permissions.insert(permission);
        }
        permissions
    }
}

impl PermissionLookup for FolderPermissions {
    fn permission(&self, folder: FolderId) -> Option<EffectivePermission> {
        self.entries.get(&folder).copied()
    }

    fn visible_folders(&self) -> Vec<FolderId> {
        self.entries
            .values()
            .filter(|p| p.read_scope() != ReadScope::None)
            .map(|p| p.folder_id)
            .collect()
    }
}

/// Folders split by read scope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderPartition {
    /// Folders readable completely
    pub all: BTreeSet<FolderId>,
    /// Folders readable for own records only
    pub own: BTreeSet<FolderId>,
}

impl FolderPartition {
    /// Partitions `folders` by the principal's permissions.
    ///
    /// Folders without an entry or without read access land in neither set.
    pub fn compute(
        folders: impl IntoIterator<Item = FolderId>,
        permissions: &dyn PermissionLookup,
    ) -> Self {
        let mut partition = Self::default();
        for folder in folders {
            match permissions.permission(folder).map(|p| p.read_scope()) {
                Some(ReadScope::All) => {
                    partition.all.insert(folder);
                }
                Some(ReadScope::Own) => {
                    partition.own.insert(folder);
                }
                Some(ReadScope::None) | None => {}
            }
        }
        partition
    }

    /// True if no folder is readable
    pub fn is_empty(&self) -> bool {
        self.all.is_empty() && self.own.is_empty()
    }

    /// Total number of readable folders
    pub fn len(&self) -> usize {
        self.all.len() + self.own.len()
    }
}
