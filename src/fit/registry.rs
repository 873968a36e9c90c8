use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::models::builtin_models;
use super::{FitConfig, FitModel, FitResult, UnknownModelError};
use crate::scan::ScanDataset;

/// Named fit models, shared read-only across processing workers.
///
/// Registering a name that already exists replaces the earlier model.
#[derive(Clone, Default)]
pub struct FitModelRegistry {
    models: BTreeMap<String, Arc<dyn FitModel>>,
}

impl FitModelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in model
    pub fn with_builtin_models() -> Self {
        let mut registry = Self::new();
        for model in builtin_models() {
            registry.register_shared(Arc::from(model));
        }
        registry
    }

    /// Register a model under its own name, returning the model it replaced
    pub fn register<M: FitModel + 'static>(&mut self, model: M) -> Option<Arc<dyn FitModel>> {
        self.register_shared(Arc::new(model))
    }

    /// Register an already shared model
    pub fn register_shared(&mut self, model: Arc<dyn FitModel>) -> Option<Arc<dyn FitModel>> {
        self.models.insert(model.name().to_string(), model)
    }

    /// Look up a model by name
    pub fn get(&self, name: &str) -> Result<Arc<dyn FitModel>, UnknownModelError> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| self.unknown(name))
    }

    /// Whether a model is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }

    /// Registered models, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn FitModel>> {
        self.models.values()
    }

    /// Number of registered models
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether no model is registered
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Fit the named model to one scan
    pub fn fit(
        &self,
        name: &str,
        scan: &ScanDataset,
        config: &FitConfig,
    ) -> Result<FitResult, UnknownModelError> {
        Ok(self.get(name)?.fit(scan, config))
    }

    pub(crate) fn unknown(&self, name: &str) -> UnknownModelError {
        UnknownModelError {
            name: name.to_string(),
            available: self.models.keys().cloned().collect(),
        }
    }
}

impl fmt::Debug for FitModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FitModelRegistry")
            .field("models", &self.names())
            .finish()
    }
}
