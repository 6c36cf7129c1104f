//! Technology → operation table.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dvbench_types::Technology;

use crate::config::TechnologiesConfig;
use crate::errors::EngineError;
use crate::operations::{CommandOperation, MergeOperation, Operation};

/// A registered operation and the mirror directory its step file is
/// copied into first.
pub struct RegisteredTechnology {
    pub operation: Box<dyn Operation>,
    pub mirror: Option<PathBuf>,
}

impl RegisteredTechnology {
    #[must_use]
    pub fn mirror(&self) -> Option<&Path> {
        self.mirror.as_deref()
    }
}

/// Explicit lookup table keyed by [`Technology`].
#[derive(Default)]
pub struct TechnologyRegistry {
    entries: BTreeMap<Technology, RegisteredTechnology>,
}

impl TechnologyRegistry {
    /// An empty registry. See [`Self::from_config`] for the usual setup.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `operation` under its own technology, replacing any
    /// previous entry.
    pub fn register(&mut self, operation: impl Operation + 'static, mirror: Option<PathBuf>) {
        self.register_boxed(Box::new(operation), mirror);
    }

    pub fn register_boxed(&mut self, operation: Box<dyn Operation>, mirror: Option<PathBuf>) {
        let technology = operation.technology();
        self.entries
            .insert(technology, RegisteredTechnology { operation, mirror });
    }

    /// Command-backed operations for every configured technology, plus the
    /// built-in merge.
    #[must_use]
    pub fn from_config(config: &TechnologiesConfig) -> Self {
        let mut registry = Self::new();
        for (tech, spec) in &config.technologies {
            let mut operation = CommandOperation::new(*tech, spec.commands.clone());
            if let Some(destination) = &spec.destination {
                operation = operation.with_destination(destination.clone());
            }
            registry.register(operation, spec.mirror.clone());
        }
        registry.register(MergeOperation, None);
        registry
    }

    /// # Errors
    ///
    /// Returns [`EngineError::UnknownTechnology`] if nothing is registered
    /// for `technology`.
    pub fn get(&self, technology: Technology) -> Result<&RegisteredTechnology, EngineError> {
        self.entries
            .get(&technology)
            .ok_or(EngineError::UnknownTechnology(technology))
    }

    #[must_use]
    pub fn contains(&self, technology: Technology) -> bool {
        self.entries.contains_key(&technology)
    }

    pub fn technologies(&self) -> impl Iterator<Item = Technology> + '_ {
        self.entries.keys().copied()
    }
}
