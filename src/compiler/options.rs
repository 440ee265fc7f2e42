//! Compiler options

use serde::Deserialize;

use crate::catalog::FieldId;

/// What to do when no folder in scope is readable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyScopePolicy {
    /// Compile a predicate that matches no rows
    #[default]
    EmptyResult,
    /// Fail with `CompilationError::EmptyScope`
    Reject,
}

/// Options controlling predicate compilation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompilerOptions {
    /// Field matched by a plain pattern
    #[serde(default = "default_display_field")]
    pub display_field: FieldId,

    /// Field bucketed by first-letter searches
    #[serde(default = "default_letter_field")]
    pub letter_field: FieldId,

    /// Text filters match anywhere (`%v%`) instead of as prefix (`v%`)
    #[serde(default = "default_substring_search")]
    pub substring_search: bool,

    /// Hide the context administrator's own contact
    #[serde(default)]
    pub exclude_context_admin: bool,

    /// Behaviour for scopes without readable folders
    #[serde(default)]
    pub empty_scope_policy: EmptyScopePolicy,
}

fn default_display_field() -> FieldId {
    FieldId::DISPLAY_NAME
}

fn default_letter_field() -> FieldId {
    FieldId::SUR_NAME
}

fn default_substring_search() -> bool {
    true
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            display_field: default_display_field(),
            letter_field: default_letter_field(),
            substring_search: default_substring_search(),
            exclude_context_admin: false,
            empty_scope_policy: EmptyScopePolicy::default(),
        }
    }
}

impl CompilerOptions {
    /// Enables the administrator exclusion policy
    pub fn excluding_context_admin(mut self) -> Self {
        self.exclude_context_admin = true;
        self
    }

    /// Sets the empty scope policy
    pub fn with_empty_scope_policy(mut self, policy: EmptyScopePolicy) -> Self {
        self.empty_scope_policy = policy;
        self
    }
}
