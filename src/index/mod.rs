//! Index maintenance.
//!
//! [`IndexWorker`] owns everything needed to keep the physical stores of an
//! index in step with the catalog: the connection cache, worker
//! configuration, the language list, extensions and interpreters.
//!
//! - [`schema`] synthesizes mappings and (re)creates stores.
//! - [`writer`] fans one entity out into the primary, localized, view and
//!   relation stores.
//! - [`outcome`] collects best-effort failures.

pub mod naming;
pub mod outcome;
pub mod schema;
pub mod writer;

pub use naming::StoreNames;
pub use outcome::Outcome;
pub use schema::render_field_type;

use crate::backend::{SearchBackend, StoreSettings};
use crate::cache::ConnectionCache;
use crate::config::{LanguageProvider, WorkerConfig};
use crate::error::Result;
use crate::model::{Extension, IndexColumn, IndexDefinition, InterpreterRegistry, SourceType};
use crate::query::{Listing, QueryPlan};
use std::sync::Arc;

pub struct IndexWorker {
    cache: Arc<ConnectionCache>,
    config: WorkerConfig,
    names: StoreNames,
    languages: Arc<dyn LanguageProvider>,
    extensions: Vec<Arc<dyn Extension>>,
    interpreters: InterpreterRegistry,
}

impl IndexWorker {
    /// A worker whose languages come from `config`.
    pub fn new(cache: Arc<ConnectionCache>, config: WorkerConfig) -> Self {
        let languages: Arc<dyn LanguageProvider> = Arc::new(config.clone());
        IndexWorker {
            cache,
            names: StoreNames::new(config.prefix.clone()),
            config,
            languages,
            extensions: Vec::new(),
            interpreters: InterpreterRegistry::new(),
        }
    }

    pub fn with_languages(mut self, languages: Arc<dyn LanguageProvider>) -> Self {
        self.languages = languages;
        self
    }

    pub fn with_extension(mut self, extension: Arc<dyn Extension>) -> Self {
        self.extensions.push(extension);
        self
    }

    pub fn with_interpreters(mut self, interpreters: InterpreterRegistry) -> Self {
        self.interpreters = interpreters;
        self
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn names(&self) -> &StoreNames {
        &self.names
    }

    pub fn languages(&self) -> Vec<String> {
        self.languages.valid_languages()
    }

    /// The cached client for the definition's hosts.
    pub fn backend(&self, index: &IndexDefinition) -> Result<Arc<dyn SearchBackend>> {
        self.cache.client(&index.configuration)
    }

    /// A listing over `index` driven by `plan`.
    pub fn listing(&self, index: &IndexDefinition, plan: QueryPlan) -> Result<Listing> {
        Ok(Listing::new(
            self.backend(index)?,
            index.clone(),
            self.names.clone(),
            plan,
        ))
    }

    /// Extensions that apply to `index`.
    pub(crate) fn extensions_for<'a>(
        &'a self,
        index: &'a IndexDefinition,
    ) -> impl Iterator<Item = &'a Arc<dyn Extension>> + 'a {
        self.extensions.iter().filter(move |e| e.supports(index))
    }

    /// Whether a column holds one value per language.
    pub fn is_localized_column(&self, column: &IndexColumn) -> bool {
        column.source_type == SourceType::LocalizedFields || self.interpreters.is_localized(column)
    }

    pub(crate) fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            number_of_shards: self.config.number_of_shards,
            number_of_replicas: self.config.number_of_replicas,
        }
    }
}
