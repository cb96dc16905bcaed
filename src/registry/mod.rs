//! Model Registry
//!
//! Maps public model names to the provider that serves them. Built once at
//! startup from the adapters' declared models, read-only afterwards.

use std::collections::BTreeMap;

use crate::error::StartupError;
use crate::types::{ModelMapping, ProviderBinding};

/// Immutable name -> binding table
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    by_name: BTreeMap<String, ProviderBinding>,
    providers: Vec<String>,
    created: i64,
}

impl ModelRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Binding for a public model name
    pub fn resolve(&self, model: &str) -> Option<&ProviderBinding> {
        self.by_name.get(model)
    }

    /// `(name, binding)` pairs in name order
    pub fn models(&self) -> impl Iterator<Item = (&str, &ProviderBinding)> {
        self.by_name.iter().map(|(name, b)| (name.as_str(), b))
    }

    /// Provider ids in registration order
    pub fn providers(&self) -> &[String] {
        &self.providers
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Unix timestamp captured when the registry was built
    pub fn created(&self) -> i64 {
        self.created
    }
}

/// Collects provider registrations and rejects conflicts
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    by_name: BTreeMap<String, ProviderBinding>,
    providers: Vec<String>,
}

impl RegistryBuilder {
    /// Register every mapping of one provider.
    ///
    /// Fails if the provider id was already registered or if any public name
    /// is already claimed, including twice within `mappings`.
    pub fn register(
        mut self,
        provider_id: &str,
        mappings: impl IntoIterator<Item = ModelMapping>,
    ) -> Result<Self, StartupError> {
        if self.providers.iter().any(|p| p == provider_id) {
            return Err(StartupError::DuplicateProvider(provider_id.to_string()));
        }
        for mapping in mappings {
            if let Some(existing) = self.by_name.get(&mapping.public_name) {
                return Err(StartupError::DuplicateModel {
                    model: mapping.public_name,
                    first: existing.provider_id.clone(),
                    second: provider_id.to_string(),
                });
            }
            self.by_name.insert(
                mapping.public_name,
                ProviderBinding::new(provider_id, mapping.upstream_name),
            );
        }
        self.providers.push(provider_id.to_string());
        Ok(self)
    }

    pub fn build(self) -> ModelRegistry {
        ModelRegistry {
            by_name: self.by_name,
            providers: self.providers,
            created: chrono::Utc::now().timestamp(),
        }
    }
}
