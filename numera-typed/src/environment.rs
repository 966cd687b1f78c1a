//! Per-instance environment tying the dispatch core together.
//!
//! A `TypedEnvironment` owns the frozen type registry and conversion graph of
//! one library instance. It is created once during initialization (either
//! from a hand-built registry/graph pair or from the standard model) and
//! shared read-only afterwards; every dispatch table built through it holds
//! `Arc` clones of the same registry and graph, so there is no hidden global
//! state coupling instances together.

use crate::conversion::ConversionGraph;
use crate::error::DefineError;
use crate::registry::TypeRegistry;
use crate::standard;
use crate::table::TableOptions;
use crate::typed::{Callable, DependencyBindings, TypedFunction, TypedFunctionBuilder};
use indexmap::IndexMap;
use std::sync::Arc;

/// The assembled dispatch environment of one library instance
#[derive(Clone)]
pub struct TypedEnvironment {
    registry: Arc<TypeRegistry>,
    conversions: Arc<ConversionGraph>,
    options: TableOptions,
}

impl TypedEnvironment {
    /// Freeze a registry and conversion graph into a shareable environment
    pub fn new(registry: TypeRegistry, conversions: ConversionGraph) -> Self {
        Self::with_options(registry, conversions, TableOptions::default())
    }

    pub fn with_options(
        registry: TypeRegistry,
        conversions: ConversionGraph,
        options: TableOptions,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            conversions: Arc::new(conversions),
            options,
        }
    }

    /// Environment with the standard numeric types and conversions installed
    pub fn standard() -> Self {
        let registry = standard::standard_registry();
        let conversions = standard::standard_conversions(&registry);
        Self::new(registry, conversions)
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn conversions(&self) -> &ConversionGraph {
        &self.conversions
    }

    pub(crate) fn registry_arc(&self) -> Arc<TypeRegistry> {
        self.registry.clone()
    }

    pub(crate) fn conversions_arc(&self) -> Arc<ConversionGraph> {
        self.conversions.clone()
    }

    pub fn options(&self) -> TableOptions {
        self.options
    }

    /// Define a typed function from an ordered signature map — the inbound
    /// contract consumers use to register operations
    pub fn define_typed(
        &self,
        name: &str,
        signatures: IndexMap<String, Callable>,
    ) -> Result<Arc<TypedFunction>, DefineError> {
        let mut builder = TypedFunctionBuilder::new(name);
        for (source, callable) in signatures {
            builder.signature(&source, callable);
        }
        builder.build(self, &DependencyBindings::default())
    }
}
