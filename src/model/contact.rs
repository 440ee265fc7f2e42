//! Contact records as produced by search providers

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::catalog::{CatalogError, CatalogResult, FieldId, FieldValue};

use super::{ContextId, FolderId, RecordId, UserId};

/// A contact record.
///
/// Core attributes used for access control are typed fields; everything else
/// lives in the `fields` map keyed by catalog id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContactRecord {
    /// Record id (unique within a context)
    pub id: RecordId,
    /// Owning context
    pub context_id: ContextId,
    /// Containing folder
    pub folder_id: FolderId,
    /// Creator of the record
    pub created_by: UserId,
    /// Private flag: visible to the creator only
    pub private: bool,
    /// Remaining field values
    pub fields: BTreeMap<FieldId, FieldValue>,
}

impl ContactRecord {
    /// Creates a record in context 0 with no fields
    pub fn new(id: RecordId, folder_id: FolderId, created_by: UserId) -> Self {
        Self {
            id,
            context_id: 0,
            folder_id,
            created_by,
            private: false,
            fields: BTreeMap::new(),
        }
    }

    /// Sets the context id
    pub fn in_context(mut self, context_id: ContextId) -> Self {
        self.context_id = context_id;
        self
    }

    /// Marks the record private
    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    /// Sets a field value. Core fields are routed to their typed attribute.
    pub fn with_field(mut self, field: FieldId, value: FieldValue) -> CatalogResult<Self> {
        self.set(field, value)?;
        Ok(self)
    }

    /// Sets a plain text field
    pub fn with_text(mut self, field: FieldId, value: impl Into<String>) -> Self {
        self.fields.insert(field, FieldValue::Text(value.into()));
        self
    }

    /// Sets a field value in place.
    ///
    /// Core attributes only accept values of their own type and range.
    pub fn set(&mut self, field: FieldId, value: FieldValue) -> CatalogResult<()> {
        match field {
            FieldId::OBJECT_ID => self.id = core_id(field, &value)?,
            FieldId::CONTEXT_ID => self.context_id = core_id(field, &value)?,
            FieldId::FOLDER_ID => self.folder_id = core_id(field, &value)?,
            FieldId::CREATED_BY => self.created_by = core_id(field, &value)?,
            FieldId::PRIVATE_FLAG => match value {
                FieldValue::Bool(b) => self.private = b,
                other => return Err(invalid(field, "boolean", &other)),
            },
            _ => {
                self.fields.insert(field, value);
            }
        }
        Ok(())
    }

    /// Returns the value of a field, including the core attributes
    pub fn value(&self, field: FieldId) -> Option<Cow<'_, FieldValue>> {
        let core = match field {
            FieldId::OBJECT_ID => FieldValue::Integer(i64::from(self.id)),
            FieldId::CONTEXT_ID => FieldValue::Integer(i64::from(self.context_id)),
            FieldId::FOLDER_ID => FieldValue::Integer(i64::from(self.folder_id)),
            FieldId::CREATED_BY => FieldValue::Integer(i64::from(self.created_by)),
            FieldId::PRIVATE_FLAG => FieldValue::Bool(self.private),
            _ => return self.fields.get(&field).map(Cow::Borrowed),
        };
        Some(Cow::Owned(core))
    }

    /// Returns a text field value
    pub fn text(&self, field: FieldId) -> Option<&str> {
        self.fields.get(&field).and_then(FieldValue::as_text)
    }
}

fn core_id(field: FieldId, value: &FieldValue) -> CatalogResult<u32> {
    match value {
        FieldValue::Integer(i) => u32::try_from(*i).map_err(|_| invalid(field, "integer", value)),
        other => Err(invalid(field, "integer", other)),
    }
}

fn invalid(field: FieldId, codec: &'static str, value: &FieldValue) -> CatalogError {
    CatalogError::InvalidValue {
        field,
        codec,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_fields_are_typed() {
        let record = ContactRecord::new(7, 10, 3)
            .in_context(1)
            .with_field(FieldId::PRIVATE_FLAG, FieldValue::Bool(true))
            .unwrap();

        assert!(record.private);
        assert!(record.fields.is_empty());
        assert_eq!(
            record.value(FieldId::FOLDER_ID).as_deref(),
            Some(&FieldValue::Integer(10))
        );
        assert_eq!(
            record.value(FieldId::CONTEXT_ID).as_deref(),
            Some(&FieldValue::Integer(1))
        );
    }

    #[test]
    fn test_plain_fields_stored_in_map() {
        let record = ContactRecord::new(1, 10, 3).with_text(FieldId::SUR_NAME, "Doe");
        assert_eq!(record.text(FieldId::SUR_NAME), Some("Doe"));
        assert!(record.value(FieldId::GIVEN_NAME).is_none());
    }

    #[test]
    fn test_out_of_range_core_ids_rejected() {
        let mut record = ContactRecord::new(1, 10, 3).in_context(1);

        let err = record
            .set(FieldId::FOLDER_ID, FieldValue::Integer(4_294_967_306))
            .unwrap_err();
        assert_eq!(err.code(), "CONTACT_INVALID_VALUE");
        assert!(record
            .set(FieldId::CONTEXT_ID, FieldValue::Integer(-4_294_967_295))
            .is_err());
        assert!(record
            .set(FieldId::OBJECT_ID, FieldValue::text("7"))
            .is_err());
        assert!(record
            .set(FieldId::PRIVATE_FLAG, FieldValue::Integer(1))
            .is_err());

        assert_eq!(record.folder_id, 10);
        assert_eq!(record.context_id, 1);
        assert_eq!(record.id, 1);
        assert!(record.fields.is_empty());

        record
            .set(FieldId::CREATED_BY, FieldValue::Integer(i64::from(u32::MAX)))
            .unwrap();
        assert_eq!(record.created_by, u32::MAX);
    }
}
