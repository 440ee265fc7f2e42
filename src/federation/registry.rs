//! Provider registry
//!
//! One default provider plus any number of specialized providers, each
//! owning zero or more folders. Folder ownership is exclusive.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::model::FolderId;

use super::errors::{FederationError, FederationResult};
use super::provider::{ProviderId, SearchProvider};

pub struct ProviderRegistry {
    default: Arc<dyn SearchProvider>,
    specialized: Vec<Arc<dyn SearchProvider>>,
    folder_owners: BTreeMap<FolderId, usize>,
}

impl ProviderRegistry {
    /// Creates a registry around the default provider
    pub fn new(default: Arc<dyn SearchProvider>) -> Self {
        Self {
            default,
            specialized: Vec::new(),
            folder_owners: BTreeMap::new(),
        }
    }

    /// Registers a specialized provider owning `folders`.
    ///
    /// Fails without changing the registry if the provider id is taken or a
    /// folder already has an owner.
    pub fn register(
        &mut self,
        provider: Arc<dyn SearchProvider>,
        folders: impl IntoIterator<Item = FolderId>,
    ) -> FederationResult<()> {
        let id = provider.id().clone();
        if self.contains(&id) {
            return Err(FederationError::Registry(format!(
                "provider '{}' is already registered",
                id
            )));
        }

        let folders: Vec<FolderId> = folders.into_iter().collect();
        for folder in &folders {
            if let Some(owner) = self.folder_owners.get(folder) {
                return Err(FederationError::Registry(format!(
                    "folder {} is already owned by provider '{}'",
                    folder,
                    self.specialized[*owner].id()
                )));
            }
        }

        let index = self.specialized.len();
        self.specialized.push(provider);
        for folder in folders {
            self.folder_owners.insert(folder, index);
        }
        Ok(())
    }

    /// Builder-style `register`
    pub fn with_provider(
        mut self,
        provider: Arc<dyn SearchProvider>,
        folders: impl IntoIterator<Item = FolderId>,
    ) -> FederationResult<Self> {
        self.register(provider, folders)?;
        Ok(self)
    }

    /// The provider covering folders nobody else owns
    pub fn default_provider(&self) -> &Arc<dyn SearchProvider> {
        &self.default
    }

    /// Specialized providers in registration order
    pub fn specialized(&self) -> &[Arc<dyn SearchProvider>] {
        &self.specialized
    }

    /// The specialized owner of a folder, if any
    pub fn owner_of(&self, folder: FolderId) -> Option<&Arc<dyn SearchProvider>> {
        self.folder_owners
            .get(&folder)
            .map(|index| &self.specialized[*index])
    }

    /// Looks up any registered provider by id
    pub fn provider(&self, id: &ProviderId) -> Option<&Arc<dyn SearchProvider>> {
        std::iter::once(&self.default)
            .chain(self.specialized.iter())
            .find(|p| p.id() == id)
    }

    fn contains(&self, id: &ProviderId) -> bool {
        self.provider(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::federation::InMemoryProvider;

    fn provider(id: &str) -> Arc<dyn SearchProvider> {
        Arc::new(InMemoryProvider::new(id))
    }

    #[test]
    fn test_folder_ownership() {
        let registry = ProviderRegistry::new(provider("db"))
            .with_provider(provider("gal"), [10])
            .unwrap()
            .with_provider(provider("ldap"), [11, 13])
            .unwrap();

        assert_eq!(registry.owner_of(10).unwrap().id().as_str(), "gal");
        assert_eq!(registry.owner_of(13).unwrap().id().as_str(), "ldap");
        assert!(registry.owner_of(12).is_none());
        assert_eq!(registry.specialized().len(), 2);
    }

    #[test]
    fn test_duplicate_folder_owner_rejected() {
        let mut registry = ProviderRegistry::new(provider("db"));
        registry.register(provider("gal"), [10]).unwrap();
        let err = registry.register(provider("ldap"), [11, 10]).unwrap_err();
        assert!(matches!(err, FederationError::Registry(_)));
        assert!(registry.owner_of(11).is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut registry = ProviderRegistry::new(provider("db"));
        assert!(registry.register(provider("db"), [10]).is_err());
    }
}
