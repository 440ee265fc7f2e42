//! Abstract contact field identifiers
//!
//! Identifiers are stable numeric ids shared with the upstream query layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Abstract identifier of a contact field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(pub u32);

impl FieldId {
    /// Tenant column; never settable through filters
    pub const CONTEXT_ID: FieldId = FieldId(0);
    pub const OBJECT_ID: FieldId = FieldId(1);
    pub const CREATED_BY: FieldId = FieldId(2);
    pub const MODIFIED_BY: FieldId = FieldId(3);
    pub const CREATION_DATE: FieldId = FieldId(4);
    pub const LAST_MODIFIED: FieldId = FieldId(5);
    pub const FOLDER_ID: FieldId = FieldId(20);
    pub const CATEGORIES: FieldId = FieldId(100);
    pub const PRIVATE_FLAG: FieldId = FieldId(101);
    pub const DISPLAY_NAME: FieldId = FieldId(500);
    pub const GIVEN_NAME: FieldId = FieldId(501);
    pub const SUR_NAME: FieldId = FieldId(502);
    pub const MIDDLE_NAME: FieldId = FieldId(503);
    pub const SUFFIX: FieldId = FieldId(504);
    pub const TITLE: FieldId = FieldId(505);
    pub const STREET_HOME: FieldId = FieldId(506);
    pub const POSTAL_CODE_HOME: FieldId = FieldId(507);
    pub const CITY_HOME: FieldId = FieldId(508);
    pub const COUNTRY_HOME: FieldId = FieldId(510);
    pub const BIRTHDAY: FieldId = FieldId(511);
    pub const NICKNAME: FieldId = FieldId(515);
    pub const ANNIVERSARY: FieldId = FieldId(517);
    pub const DEPARTMENT: FieldId = FieldId(519);
    pub const POSITION: FieldId = FieldId(520);
    pub const INTERNAL_USERID: FieldId = FieldId(524);
    pub const TELEPHONE_BUSINESS1: FieldId = FieldId(542);
    pub const CELLULAR_TELEPHONE1: FieldId = FieldId(551);
    pub const EMAIL1: FieldId = FieldId(555);
    pub const EMAIL2: FieldId = FieldId(556);
    pub const EMAIL3: FieldId = FieldId(557);
    pub const COMPANY: FieldId = FieldId(569);
    pub const NUMBER_OF_DISTRIBUTION_LIST: FieldId = FieldId(594);
    pub const MARK_AS_DISTRIBUTION_LIST: FieldId = FieldId(602);

    /// Returns the raw numeric id
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FieldId {
    fn from(id: u32) -> Self {
        FieldId(id)
    }
}
