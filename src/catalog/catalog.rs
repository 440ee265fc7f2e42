//! Static field catalog
//!
//! Data-driven table: one `FieldMapping` row per field, no per-field code.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use super::codec::{FieldValue, ValueCodec};
use super::errors::{CatalogError, CatalogResult};
use super::field::FieldId;

/// One catalog row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    /// Abstract field id
    pub id: FieldId,
    /// Stable symbolic name (used by fixtures and the CLI)
    pub name: &'static str,
    /// Physical column in the contact table
    pub column: &'static str,
    /// Value codec
    pub codec: ValueCodec,
    /// Whether callers may filter on this field
    pub filterable: bool,
}

impl FieldMapping {
    const fn new(id: FieldId, name: &'static str, column: &'static str, codec: ValueCodec) -> Self {
        Self {
            id,
            name,
            column,
            codec,
            filterable: true,
        }
    }

    const fn system(id: FieldId, name: &'static str, column: &'static str, codec: ValueCodec) -> Self {
        Self {
            id,
            name,
            column,
            codec,
            filterable: false,
        }
    }

    /// Encodes raw search input with this field's codec
    pub fn encode(&self, raw: &str) -> CatalogResult<FieldValue> {
        self.codec
            .encode(raw)
            .ok_or_else(|| CatalogError::InvalidValue {
                field: self.id,
                codec: self.codec.name(),
                value: raw.to_string(),
            })
    }

    /// Decodes a stored JSON value with this field's codec
    pub fn decode_json(&self, value: &serde_json::Value) -> CatalogResult<Option<FieldValue>> {
        self.codec
            .decode_json(value)
            .ok_or_else(|| CatalogError::InvalidValue {
                field: self.id,
                codec: self.codec.name(),
                value: value.to_string(),
            })
    }
}

const STANDARD_FIELDS: &[FieldMapping] = &[
    FieldMapping::system(FieldId::CONTEXT_ID, "context_id", "cid", ValueCodec::Integer),
    FieldMapping::new(FieldId::OBJECT_ID, "object_id", "intfield01", ValueCodec::Integer),
    FieldMapping::new(FieldId::CREATED_BY, "created_by", "created_from", ValueCodec::Integer),
    FieldMapping::new(FieldId::MODIFIED_BY, "modified_by", "changed_from", ValueCodec::Integer),
    FieldMapping::new(FieldId::CREATION_DATE, "creation_date", "creating_date", ValueCodec::Timestamp),
    FieldMapping::new(FieldId::LAST_MODIFIED, "last_modified", "changing_date", ValueCodec::Timestamp),
    FieldMapping::new(FieldId::FOLDER_ID, "folder_id", "fid", ValueCodec::Integer),
    FieldMapping::new(FieldId::CATEGORIES, "categories", "field100", ValueCodec::List),
    FieldMapping::new(FieldId::PRIVATE_FLAG, "private_flag", "pflag", ValueCodec::Boolean),
    FieldMapping::new(FieldId::DISPLAY_NAME, "display_name", "field01", ValueCodec::Text),
    FieldMapping::new(FieldId::SUR_NAME, "sur_name", "field02", ValueCodec::Text),
    FieldMapping::new(FieldId::GIVEN_NAME, "given_name", "field03", ValueCodec::Text),
    FieldMapping::new(FieldId::MIDDLE_NAME, "middle_name", "field04", ValueCodec::Text),
    FieldMapping::new(FieldId::SUFFIX, "suffix", "field05", ValueCodec::Text),
    FieldMapping::new(FieldId::TITLE, "title", "field06", ValueCodec::Text),
    FieldMapping::new(FieldId::STREET_HOME, "street_home", "field07", ValueCodec::Text),
    FieldMapping::new(FieldId::POSTAL_CODE_HOME, "postal_code_home", "field08", ValueCodec::Text),
    FieldMapping::new(FieldId::CITY_HOME, "city_home", "field09", ValueCodec::Text),
    FieldMapping::new(FieldId::COUNTRY_HOME, "country_home", "field11", ValueCodec::Text),
    FieldMapping::new(FieldId::BIRTHDAY, "birthday", "timestampfield01", ValueCodec::Timestamp),
    FieldMapping::new(FieldId::NICKNAME, "nickname", "field16", ValueCodec::Text),
    FieldMapping::new(FieldId::ANNIVERSARY, "anniversary", "timestampfield02", ValueCodec::Timestamp),
    FieldMapping::new(FieldId::DEPARTMENT, "department", "field19", ValueCodec::Text),
    FieldMapping::new(FieldId::POSITION, "position", "field20", ValueCodec::Text),
    FieldMapping::new(FieldId::COMPANY, "company", "field23", ValueCodec::Text),
    FieldMapping::new(FieldId::INTERNAL_USERID, "internal_userid", "userid", ValueCodec::Integer),
    FieldMapping::new(FieldId::TELEPHONE_BUSINESS1, "telephone_business1", "field33", ValueCodec::Text),
    FieldMapping::new(FieldId::CELLULAR_TELEPHONE1, "cellular_telephone1", "field42", ValueCodec::Text),
    FieldMapping::new(FieldId::EMAIL1, "email1", "field65", ValueCodec::Text),
    FieldMapping::new(FieldId::EMAIL2, "email2", "field66", ValueCodec::Text),
    FieldMapping::new(FieldId::EMAIL3, "email3", "field67", ValueCodec::Text),
    FieldMapping::new(
        FieldId::NUMBER_OF_DISTRIBUTION_LIST,
        "number_of_distribution_list",
        "intfield02",
        ValueCodec::Integer,
    ),
    FieldMapping::new(
        FieldId::MARK_AS_DISTRIBUTION_LIST,
        "mark_as_distribution_list",
        "intfield03",
        ValueCodec::Boolean,
    ),
];

static STANDARD: Lazy<FieldCatalog> = Lazy::new(|| FieldCatalog::from_mappings(STANDARD_FIELDS));

/// Registry mapping field ids to columns and codecs
#[derive(Debug, Clone)]
pub struct FieldCatalog {
    by_id: BTreeMap<FieldId, FieldMapping>,
    by_name: BTreeMap<&'static str, FieldId>,
}

impl FieldCatalog {
    /// The process-wide standard contact catalog
    pub fn standard() -> &'static FieldCatalog {
        &STANDARD
    }

    /// Builds a catalog from explicit rows. Later rows win on duplicate ids.
    pub fn from_mappings(mappings: &[FieldMapping]) -> Self {
        let mut by_id = BTreeMap::new();
        let mut by_name = BTreeMap::new();
        for mapping in mappings {
            by_name.insert(mapping.name, mapping.id);
            by_id.insert(mapping.id, mapping.clone());
        }
        Self { by_id, by_name }
    }

    /// Resolves a field id to its mapping
    pub fn resolve(&self, id: FieldId) -> CatalogResult<&FieldMapping> {
        self.by_id.get(&id).ok_or(CatalogError::UnknownField(id))
    }

    /// Resolves a symbolic name or a numeric id given as text
    pub fn resolve_name(&self, name: &str) -> CatalogResult<&FieldMapping> {
        if let Some(id) = self.by_name.get(name) {
            return self.resolve(*id);
        }
        match name.parse::<u32>() {
            Ok(raw) => self.resolve(FieldId(raw)),
            Err(_) => Err(CatalogError::UnknownFieldName(name.to_string())),
        }
    }

    /// Returns the column for a field id
    pub fn column(&self, id: FieldId) -> CatalogResult<&'static str> {
        self.resolve(id).map(|m| m.column)
    }

    /// Iterates mappings in field id order
    pub fn iter(&self) -> impl Iterator<Item = &FieldMapping> {
        self.by_id.values()
    }

    /// Number of registered fields
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// True if no fields are registered
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_field() {
        let catalog = FieldCatalog::standard();
        let mapping = catalog.resolve(FieldId::SUR_NAME).unwrap();
        assert_eq!(mapping.column, "field02");
        assert_eq!(mapping.codec, ValueCodec::Text);
    }

    #[test]
    fn test_resolve_unknown_field() {
        let catalog = FieldCatalog::standard();
        let err = catalog.resolve(FieldId(31337)).unwrap_err();
        assert_eq!(err, CatalogError::UnknownField(FieldId(31337)));
    }

    #[test]
    fn test_resolve_by_name_or_number() {
        let catalog = FieldCatalog::standard();
        assert_eq!(catalog.resolve_name("categories").unwrap().id, FieldId::CATEGORIES);
        assert_eq!(catalog.resolve_name("502").unwrap().id, FieldId::SUR_NAME);
        assert!(matches!(
            catalog.resolve_name("shoe_size"),
            Err(CatalogError::UnknownFieldName(_))
        ));
    }

    #[test]
    fn test_context_column_not_filterable() {
        let catalog = FieldCatalog::standard();
        assert!(!catalog.resolve(FieldId::CONTEXT_ID).unwrap().filterable);
        assert!(catalog.resolve(FieldId::EMAIL1).unwrap().filterable);
    }

    #[test]
    fn test_columns_unique() {
        let catalog = FieldCatalog::standard();
        let mut columns: Vec<_> = catalog.iter().map(|m| m.column).collect();
        let total = columns.len();
        columns.sort_unstable();
        columns.dedup();
        assert_eq!(columns.len(), total);
    }

    #[test]
    fn test_encode_reports_field() {
        let catalog = FieldCatalog::standard();
        let err = catalog
            .resolve(FieldId::OBJECT_ID)
            .unwrap()
            .encode("nope")
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidValue { field, .. } if field == FieldId::OBJECT_ID));
    }
}
