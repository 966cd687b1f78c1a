//! Typed multiple-dispatch core for the Numera numeric library.
//!
//! A single named operation ("add", "multiply", ...) is defined as a table of
//! signature-to-implementation mappings; each call selects the most specific
//! implementation from the runtime types of the actual arguments, inserting
//! automatic conversions where a registered conversion path exists.
//!
//! ## Architecture
//!
//! - **Type registry**: ordered catalog of named runtime types with
//!   predicates and specificity ranks
//! - **Conversion graph**: directed, cost-weighted edges between types,
//!   consulted when no signature matches exactly
//! - **Signature parser**: textual and structured forms of per-parameter
//!   type constraints, with union, optional and rest markers
//! - **Dispatch table**: union-expanded branches validated for ambiguity and
//!   indexed by arity and per-position type tries
//! - **Resolver**: exact-match phase, then cheapest-conversion phase, with a
//!   classification-keyed memo cache
//! - **Composition**: extension with override semantics, self-referring and
//!   sibling-referring implementations, late-bound dependencies
//!
//! Everything is immutable once built and shared through `Arc`, so concurrent
//! resolution is safe without external synchronization; the only interior
//! mutability is the resolver's memo cache behind an `RwLock`.

pub mod conversion;
pub mod environment;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod signature;
pub mod standard;
pub mod table;
pub mod typed;

#[cfg(test)]
mod tests;

// Re-export public API
pub use conversion::{ConversionEdge, ConversionFn, ConversionGraph, ConversionPath};
pub use environment::TypedEnvironment;
pub use error::{
    BuildError, CallError, ConversionError, DefineError, RegistryError, SignatureError,
};
pub use registry::{TypeDescriptor, TypeId, TypePredicate, TypeRegistry};
pub use resolver::Resolution;
pub use signature::{ParameterSpec, Signature};
pub use table::{DispatchStats, DispatchTable, TableOptions};
pub use typed::{
    implementation, refer_to, refer_to_self, Callable, DependencyBindings, DependencyHandle,
    DependencySpec, FunctionAttributes, Implementation, ParameterDetails, SelfHandle,
    SignatureDetails, TypedFunction, TypedFunctionBuilder,
};
