// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Mapper stages and the registry that names them
//!
//! A stage is looked up by name through a [`MapperFactory`]. The registry
//! is an ordinary value built by the caller; nothing is registered behind
//! its back.

use std::fmt;
use std::sync::Arc;

use settings::Settings;
use tablefs::TableSet;

use crate::error::*;
use crate::spec::MapperSpec;
use crate::stages;

/// One transformation step.
///
/// `apply` receives one table set per input (several only when the stage
/// starts a reduce) and returns the combined result. Parameters are read
/// from `settings` during `apply`, so a prepared stage can be shared across
/// inputs without affecting their output.
pub trait Mapper: Send + Sync {
    fn name(&self) -> &str;

    fn apply(
        &self,
        inputs: Vec<TableSet>,
        settings: &mut Settings,
    ) -> std::result::Result<TableSet, StageFailure>;
}

impl fmt::Debug for dyn Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mapper({})", self.name())
    }
}

/// A registered stage
#[derive(Clone, Copy)]
pub struct MapperFactory {
    /// Stage name used in mapper lists
    pub name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Build a ready-to-run stage
    pub prepare: fn() -> std::result::Result<Arc<dyn Mapper>, StageFailure>,
}

impl fmt::Debug for MapperFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapperFactory")
            .field("name", &self.name)
            .finish()
    }
}

impl MapperFactory {
    pub fn prepare(&self) -> Result<Arc<dyn Mapper>> {
        (self.prepare)().map_err(|e| e.into_error(self.name, "<prepare>"))
    }
}

/// Prepare every factory, in order
pub fn prepare_all(factories: &[MapperFactory]) -> Result<Vec<Arc<dyn Mapper>>> {
    factories.iter().map(MapperFactory::prepare).collect()
}

/// Name to factory lookup
#[derive(Debug, Clone, Default)]
pub struct MapperRegistry {
    factories: Vec<MapperFactory>,
}

impl MapperRegistry {
    /// An empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in stages
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for factory in stages::builtin() {
            registry.register(factory);
        }
        registry
    }

    /// Add a factory, replacing any earlier one of the same name
    pub fn register(&mut self, factory: MapperFactory) {
        match self.factories.iter_mut().find(|f| f.name == factory.name) {
            Some(slot) => *slot = factory,
            None => self.factories.push(factory),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MapperFactory> {
        self.factories.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn list(&self) -> &[MapperFactory] {
        &self.factories
    }

    /// Look up every stage of `spec`, failing on the first unknown name
    pub fn resolve(&self, spec: &MapperSpec) -> Result<Vec<MapperFactory>> {
        spec.stages()
            .iter()
            .map(|name| {
                self.get(name)
                    .copied()
                    .ok_or_else(|| Error::MapperNotFound(name.clone()))
            })
            .collect()
    }
}
