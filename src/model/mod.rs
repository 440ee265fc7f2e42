//! Domain model for contact search
//!
//! - `SearchCriteria`: immutable query specification, built via `CriteriaBuilder`
//! - `ContactRecord`: one hydrated contact as produced by providers
//! - `EffectivePermission` / `PermissionLookup`: consumed folder permissions

mod contact;
mod criteria;
mod permission;

pub use contact::ContactRecord;
pub use criteria::{is_wildcard, CriteriaBuilder, RangeBounds, SearchCriteria};
pub use permission::{
    EffectivePermission, FolderPartition, FolderPermissions, PermissionLookup, Principal,
    ReadScope,
};

/// Folder identifier
pub type FolderId = u32;
/// User identifier (principal or record creator)
pub type UserId = u32;
/// Context (tenant) identifier
pub type ContextId = u32;
/// Contact record identifier
pub type RecordId = u32;
