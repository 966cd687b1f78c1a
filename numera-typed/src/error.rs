//! Error types for the typed dispatch core.
//!
//! Construction-time failures (registry, conversion graph, signature parsing,
//! dispatch table building) are fatal for the function being defined and are
//! aggregated under `DefineError`. Call-time failures surface synchronously
//! from `call`/`invoke` as `CallError`. All variants carry miette diagnostics.

use miette::Diagnostic;
use numera_values::ValueError;
use thiserror::Error;

/// Errors raised by the type registry
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("type '{name}' is already registered")]
    #[diagnostic(
        code(numera::typed::registry::duplicate_type),
        help("each type name may be registered once per registry instance")
    )]
    DuplicateType { name: String },

    #[error("unknown type '{name}'")]
    #[diagnostic(
        code(numera::typed::registry::unknown_type),
        help("register the type before referencing it")
    )]
    UnknownType { name: String },
}

/// Errors raised while registering conversion edges
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error("conversion from '{name}' to itself is not allowed")]
    #[diagnostic(
        code(numera::typed::conversion::self_conversion),
        help("a type never needs converting to itself")
    )]
    SelfConversion { name: String },

    #[error("conversion from '{from}' to '{to}' must have a cost of at least 1")]
    #[diagnostic(
        code(numera::typed::conversion::invalid_cost),
        help("zero-cost edges would make conversions indistinguishable from exact matches")
    )]
    InvalidCost { from: String, to: String },

    #[error(
        "conversion from '{from}' to '{to}' is already registered with cost {existing}, requested {requested}"
    )]
    #[diagnostic(
        code(numera::typed::conversion::conflicting_edge),
        help("re-registering a conversion is only allowed with an identical cost")
    )]
    ConflictingEdge {
        from: String,
        to: String,
        existing: u32,
        requested: u32,
    },
}

/// Errors raised while parsing a signature source
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum SignatureError {
    #[error("signature '{signature}' has an empty parameter at position {index}")]
    #[diagnostic(
        code(numera::typed::signature::empty_parameter),
        help("separate parameters with single commas, e.g. \"number, string\"")
    )]
    EmptyParameter { signature: String, index: usize },

    #[error("signature '{signature}' has a malformed type union in '{parameter}'")]
    #[diagnostic(
        code(numera::typed::signature::malformed_union),
        help("separate union members with single pipes, e.g. \"Array|Matrix\"")
    )]
    MalformedUnion { signature: String, parameter: String },

    #[error("signature '{signature}' references unknown type '{name}'")]
    #[diagnostic(
        code(numera::typed::signature::unknown_type),
        help("type names are case-sensitive and must match the registry exactly")
    )]
    UnknownType { signature: String, name: String },

    #[error("signature '{signature}' has a rest parameter before the final position")]
    #[diagnostic(
        code(numera::typed::signature::rest_not_last),
        help("a '...' parameter may only appear last")
    )]
    RestNotLast { signature: String },

    #[error("signature '{signature}' has required parameter '{parameter}' after an optional one")]
    #[diagnostic(
        code(numera::typed::signature::required_after_optional),
        help("optional parameters must form the tail of the signature")
    )]
    RequiredAfterOptional { signature: String, parameter: String },

    #[error("signature '{signature}' marks rest parameter '{parameter}' as optional")]
    #[diagnostic(
        code(numera::typed::signature::optional_rest),
        help("a rest parameter already covers a range of arities and cannot be optional")
    )]
    OptionalRest { signature: String, parameter: String },
}

/// Errors raised while building a dispatch table
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("function '{function}' declares signature '{signature}' more than once")]
    #[diagnostic(
        code(numera::typed::build::duplicate_signature),
        help("two signatures with the same arity and type tuple can never both be reached")
    )]
    DuplicateSignature { function: String, signature: String },

    #[error(
        "function '{function}' has ambiguous signatures '{first}' and '{second}' at arity {arity}"
    )]
    #[diagnostic(
        code(numera::typed::build::ambiguous_signatures),
        help("overlapping signatures need distinct specificity; split the overlapping union out")
    )]
    AmbiguousSignatures {
        function: String,
        first: String,
        second: String,
        arity: usize,
    },

    #[error("function '{function}' requires dependency '{dependency}' which is not bound")]
    #[diagnostic(
        code(numera::typed::build::missing_dependency),
        help("bind the dependency before building, or mark it optional with a leading '?'")
    )]
    MissingDependency { function: String, dependency: String },

    #[error("function '{function}' refers to signature '{reference}' which cannot be resolved")]
    #[diagnostic(
        code(numera::typed::build::unresolved_reference),
        help("references must name a declared plain or self-referring signature of the same function")
    )]
    UnresolvedReference { function: String, reference: String },
}

/// Call-time errors raised by resolution and invocation
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum CallError {
    #[error("no matching signature for {function}({provided}); declared signatures: {expected}")]
    #[diagnostic(
        code(numera::typed::call::no_match),
        help("check the argument types against the declared signatures")
    )]
    NoMatch {
        function: String,
        provided: String,
        expected: String,
    },

    #[error("ambiguous call {function}({provided}); equally specific candidates: {candidates}")]
    #[diagnostic(
        code(numera::typed::call::ambiguous),
        help("the argument types satisfy several signatures equally well")
    )]
    AmbiguousCall {
        function: String,
        provided: String,
        candidates: String,
    },

    #[error("function '{function}' called through its self-reference before construction finished")]
    #[diagnostic(
        code(numera::typed::call::unbound_self),
        help("self-references only become callable once the typed function is fully built")
    )]
    UnboundSelfReference { function: String },

    #[error("dependency '{name}' was invoked but is not bound")]
    #[diagnostic(
        code(numera::typed::call::unbound_dependency),
        help("optional dependencies may be absent; check with get() before calling")
    )]
    UnboundDependency { name: String },

    #[error("conversion from '{from}' to '{to}' failed: {reason}")]
    #[diagnostic(
        code(numera::typed::call::conversion_failed),
        help("the value is outside the domain the conversion supports")
    )]
    ConversionFailed {
        from: String,
        to: String,
        reason: String,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Value(#[from] ValueError),

    #[error("evaluation of '{function}' failed: {message}")]
    #[diagnostic(code(numera::typed::call::evaluation))]
    Evaluation { function: String, message: String },
}

impl CallError {
    /// Create a no-match error from argument type names and signature sources
    pub fn no_match(function: &str, provided: &[&str], expected: &[&str]) -> Self {
        Self::NoMatch {
            function: function.to_string(),
            provided: provided.join(", "),
            expected: expected.join("; "),
        }
    }

    /// Create an ambiguous-call error from argument type names and candidate sources
    pub fn ambiguous_call(function: &str, provided: &[&str], candidates: &[&str]) -> Self {
        Self::AmbiguousCall {
            function: function.to_string(),
            provided: provided.join(", "),
            candidates: candidates.join("; "),
        }
    }

    /// Create a conversion failure carrying the root cause
    pub fn conversion_failed(from: &str, to: &str, reason: impl Into<String>) -> Self {
        Self::ConversionFailed {
            from: from.to_string(),
            to: to.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an evaluation error for an implementation body
    pub fn evaluation(function: &str, message: impl Into<String>) -> Self {
        Self::Evaluation {
            function: function.to_string(),
            message: message.into(),
        }
    }
}

/// Construction-time error aggregating every way defining a typed function can fail
#[derive(Error, Diagnostic, Debug)]
pub enum DefineError {
    #[error("type registration failed")]
    #[diagnostic(code(numera::typed::define::registry))]
    Registry(#[from] RegistryError),

    #[error("conversion registration failed")]
    #[diagnostic(code(numera::typed::define::conversion))]
    Conversion(#[from] ConversionError),

    #[error("signature parsing failed")]
    #[diagnostic(code(numera::typed::define::signature))]
    Signature(#[from] SignatureError),

    #[error("dispatch table construction failed")]
    #[diagnostic(code(numera::typed::define::build))]
    Build(#[from] BuildError),
}
