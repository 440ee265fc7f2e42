//! Fixture loading and JSON output for the CLI
//!
//! A fixture directory holds:
//!
//! ```text
//! permissions.json   {"context_admin": 2, "folders": [{"folder": 10, "owner": 1, "read": "all"}]}
//! providers.json     {"default": "db", "specialized": [{"id": "gal", "folders": [10]}]}
//! contacts/<id>.json [{"id": 1, "folder": 10, "created_by": 1, "fields": {"sur_name": "Doe"}}]
//! ```
//!
//! Contact fields are keyed by catalog name or numeric field id. A provider
//! without a contacts file starts empty.
//!
//! Output is one JSON object per line on stdout.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::catalog::FieldCatalog;
use crate::model::{
    ContactRecord, ContextId, EffectivePermission, FolderId, FolderPermissions, RecordId, UserId,
};

use super::errors::{CliError, CliResult};

#[derive(Debug, Deserialize)]
struct PermissionsFile {
    #[serde(default)]
    context_admin: Option<UserId>,
    #[serde(default)]
    folders: Vec<FolderEntry>,
}

#[derive(Debug, Deserialize)]
struct FolderEntry {
    folder: FolderId,
    #[serde(default)]
    owner: UserId,
    read: ReadLevel,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ReadLevel {
    All,
    Own,
    None,
}

#[derive(Debug, Deserialize)]
struct ProvidersFile {
    default: String,
    #[serde(default)]
    specialized: Vec<SpecializedEntry>,
}

#[derive(Debug, Deserialize)]
struct SpecializedEntry {
    id: String,
    folders: Vec<FolderId>,
}

#[derive(Debug, Deserialize)]
struct ContactEntry {
    id: RecordId,
    folder: FolderId,
    created_by: UserId,
    #[serde(default = "default_context")]
    context: ContextId,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    fields: Map<String, Value>,
}

fn default_context() -> ContextId {
    1
}

/// Contacts served by one provider
#[derive(Debug, Clone)]
pub struct ProviderFixture {
    pub id: String,
    /// Folders owned exclusively; empty for the default provider
    pub folders: Vec<FolderId>,
    pub contacts: Vec<ContactRecord>,
}

/// A loaded fixture directory
#[derive(Debug, Clone)]
pub struct Fixture {
    pub permissions: FolderPermissions,
    pub context_admin: Option<UserId>,
    pub default_provider: ProviderFixture,
    pub specialized: Vec<ProviderFixture>,
}

impl Fixture {
    /// Loads a fixture directory
    pub fn load(dir: &Path) -> CliResult<Self> {
        if !dir.is_dir() {
            return Err(CliError::fixture_error(format!(
                "Fixture directory not found: {}",
                dir.display()
            )));
        }

        let permissions_file: PermissionsFile = read_json(&dir.join("permissions.json"))?;
        let providers_file: ProvidersFile = read_json(&dir.join("providers.json"))?;

        let permissions = permissions_file
            .folders
            .iter()
            .map(|entry| match entry.read {
                ReadLevel::All => EffectivePermission::read_all(entry.folder, entry.owner),
                ReadLevel::Own => EffectivePermission::read_own(entry.folder, entry.owner),
                ReadLevel::None => EffectivePermission::no_access(entry.folder, entry.owner),
            })
            .collect();

        let catalog = FieldCatalog::standard();
        let default_provider = ProviderFixture {
            contacts: load_contacts(dir, &providers_file.default, catalog)?,
            id: providers_file.default,
            folders: Vec::new(),
        };
        let specialized = providers_file
            .specialized
            .into_iter()
            .map(|entry| -> CliResult<ProviderFixture> {
                Ok(ProviderFixture {
                    contacts: load_contacts(dir, &entry.id, catalog)?,
                    id: entry.id,
                    folders: entry.folders,
                })
            })
            .collect::<CliResult<Vec<_>>>()?;

        Ok(Self {
            permissions,
            context_admin: permissions_file.context_admin,
            default_provider,
            specialized,
        })
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let content = fs::read_to_string(path).map_err(|e| {
        CliError::fixture_error(format!("Failed to read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content)
        .map_err(|e| CliError::fixture_error(format!("Invalid JSON in {}: {}", path.display(), e)))
}

fn load_contacts(
    dir: &Path,
    provider: &str,
    catalog: &FieldCatalog,
) -> CliResult<Vec<ContactRecord>> {
    let path = dir.join("contacts").join(format!("{}.json", provider));
    if !path.exists() {
        return Ok(Vec::new());
    }

    let entries: Vec<ContactEntry> = read_json(&path)?;
    entries
        .into_iter()
        .map(|entry| contact_from_entry(entry, catalog))
        .collect::<CliResult<Vec<_>>>()
        .map_err(|e| {
            CliError::fixture_error(format!("{}: {}", path.display(), e.message()))
        })
}

fn contact_from_entry(entry: ContactEntry, catalog: &FieldCatalog) -> CliResult<ContactRecord> {
    let mut record = ContactRecord::new(entry.id, entry.folder, entry.created_by)
        .in_context(entry.context);
    if entry.private {
        record = record.private();
    }
    for (key, raw) in &entry.fields {
        let mapping = catalog.resolve_name(key)?;
        if let Some(value) = mapping.decode_json(raw)? {
            record.set(mapping.id, value)?;
        }
    }
    Ok(record)
}

/// JSON view of a record with fields keyed by catalog name
pub fn record_json(record: &ContactRecord, catalog: &FieldCatalog) -> Value {
    let mut fields = Map::new();
    for (id, value) in &record.fields {
        let key = catalog
            .resolve(*id)
            .map(|m| m.name.to_string())
            .unwrap_or_else(|_| id.to_string());
        fields.insert(key, serde_json::to_value(value).unwrap_or(Value::Null));
    }
    serde_json::json!({
        "id": record.id,
        "context": record.context_id,
        "folder": record.folder_id,
        "created_by": record.created_by,
        "private": record.private,
        "fields": fields,
    })
}

/// Writes one JSON value as a line
pub fn write_line(out: &mut impl Write, value: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Writes one JSON value as a line to stdout
pub fn write_stdout(value: &Value) -> CliResult<()> {
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    write_line(&mut lock, value)?;
    lock.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldId, FieldValue};
    use crate::model::PermissionLookup;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn fixture_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "permissions.json",
            r#"{"context_admin": 2, "folders": [
                {"folder": 10, "owner": 1, "read": "all"},
                {"folder": 12, "owner": 1, "read": "own"},
                {"folder": 13, "read": "none"}]}"#,
        );
        write(
            dir.path(),
            "providers.json",
            r#"{"default": "db", "specialized": [{"id": "gal", "folders": [10]}]}"#,
        );
        write(
            dir.path(),
            "contacts/gal.json",
            r#"[{"id": 1, "folder": 10, "created_by": 1,
                 "fields": {"sur_name": "Doe", "555": "doe@example.com", "birthday": "1980-02-01"}}]"#,
        );
        dir
    }

    #[test]
    fn test_load_fixture() {
        let dir = fixture_dir();
        let fixture = Fixture::load(dir.path()).unwrap();

        assert_eq!(fixture.context_admin, Some(2));
        assert_eq!(fixture.permissions.visible_folders(), vec![10, 12]);
        assert_eq!(fixture.default_provider.id, "db");
        assert!(fixture.default_provider.contacts.is_empty());

        let gal = &fixture.specialized[0];
        assert_eq!(gal.folders, vec![10]);
        let record = &gal.contacts[0];
        assert_eq!(record.context_id, 1);
        assert_eq!(record.text(FieldId::SUR_NAME), Some("Doe"));
        assert_eq!(record.text(FieldId::EMAIL1), Some("doe@example.com"));
        assert!(matches!(
            record.fields.get(&FieldId::BIRTHDAY),
            Some(FieldValue::Timestamp(_))
        ));
    }

    #[test]
    fn test_unknown_field_name_rejected() {
        let dir = fixture_dir();
        write(
            dir.path(),
            "contacts/db.json",
            r#"[{"id": 2, "folder": 12, "created_by": 1, "fields": {"shoe_size": "44"}}]"#,
        );
        let err = Fixture::load(dir.path()).unwrap_err();
        assert!(err.message().contains("shoe_size"));
        assert!(err.message().contains("db.json"));
    }

    #[test]
    fn test_out_of_range_folder_id_rejected() {
        let dir = fixture_dir();
        write(
            dir.path(),
            "contacts/db.json",
            r#"[{"id": 2, "folder": 12, "created_by": 1, "fields": {"folder_id": 4294967306}}]"#,
        );
        let err = Fixture::load(dir.path()).unwrap_err();
        assert_eq!(err.code_str(), "CONTACT_CLI_FIXTURE_ERROR");
        assert!(err.message().contains("4294967306"));

        write(
            dir.path(),
            "contacts/db.json",
            r#"[{"id": 2, "folder": 12, "created_by": 1, "fields": {"context_id": -4294967295}}]"#,
        );
        assert!(Fixture::load(dir.path()).is_err());
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = Fixture::load(&dir.path().join("nope")).unwrap_err();
        assert_eq!(err.code_str(), "CONTACT_CLI_FIXTURE_ERROR");
    }

    #[test]
    fn test_record_json_uses_field_names() {
        let record = ContactRecord::new(5, 10, 1)
            .in_context(1)
            .with_text(FieldId::GIVEN_NAME, "Ann");
        let value = record_json(&record, FieldCatalog::standard());
        assert_eq!(value["id"], 5);
        assert_eq!(value["fields"]["given_name"], "Ann");

        let mut out = Vec::new();
        write_line(&mut out, &value).unwrap();
        assert!(out.ends_with(b"\n"));
    }
}
