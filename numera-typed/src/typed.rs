//! Typed functions and the composition layer.
//!
//! A `TypedFunction` is an immutable, shareable bundle of one dispatch table
//! plus its declared dependencies and opaque attribute flags. Construction is
//! two-phase: the builder (the "building" typestate) collects signatures and
//! dependency declarations, then `build` materializes implementation bodies,
//! validates the table, wraps everything in an `Arc`, and binds the
//! self-reference handle. Calling through the handle before binding completes
//! fails rather than dispatching into a half-built function.

use crate::environment::TypedEnvironment;
use crate::error::{BuildError, CallError, DefineError};
use crate::registry::TypeRegistry;
use crate::resolver::Resolution;
use crate::signature::Signature;
use crate::table::{DispatchStats, DispatchTable, TableEntry};
use indexmap::IndexMap;
use numera_values::Value;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, Weak};

/// Implementation body: pure function over the converted argument list
pub type ImplementationFn = dyn Fn(&[Value]) -> Result<Value, CallError> + Send + Sync;
pub type Implementation = Arc<ImplementationFn>;

type SelfFactory = dyn Fn(SelfHandle) -> Implementation + Send + Sync;
type ReferenceFactory = dyn Fn(&[Implementation]) -> Implementation + Send + Sync;

/// Declared implementation form for one signature
#[derive(Clone)]
pub enum Callable {
    /// A plain body
    Plain(Implementation),
    /// A factory receiving a handle to the eventual fully-built function,
    /// for recursive/elementwise implementations
    SelfReferring(Arc<SelfFactory>),
    /// A factory receiving the resolved bodies of named sibling signatures
    Referring {
        references: Vec<String>,
        factory: Arc<ReferenceFactory>,
    },
}

/// Wrap a plain implementation body
pub fn implementation<F>(body: F) -> Callable
where
    F: Fn(&[Value]) -> Result<Value, CallError> + Send + Sync + 'static,
{
    Callable::Plain(Arc::new(body))
}

/// Wrap a factory that needs a handle to the eventual typed function
pub fn refer_to_self<F>(factory: F) -> Callable
where
    F: Fn(SelfHandle) -> Implementation + Send + Sync + 'static,
{
    Callable::SelfReferring(Arc::new(factory))
}

/// Wrap a factory that needs the bodies of named sibling signatures
pub fn refer_to<F>(references: &[&str], factory: F) -> Callable
where
    F: Fn(&[Implementation]) -> Implementation + Send + Sync + 'static,
{
    Callable::Referring {
        references: references.iter().map(|r| r.to_string()).collect(),
        factory: Arc::new(factory),
    }
}

/// Handle to the eventual fully-built typed function. Implementations close
/// over a clone; the handle becomes callable once `build` binds it.
#[derive(Clone)]
pub struct SelfHandle {
    function: Arc<str>,
    slot: Arc<OnceLock<Weak<TypedFunction>>>,
}

impl SelfHandle {
    fn new(function: &str) -> Self {
        Self {
            function: Arc::from(function),
            slot: Arc::new(OnceLock::new()),
        }
    }

    /// Dispatch through the bound function; fails while construction is
    /// still in progress
    pub fn call(&self, args: &[Value]) -> Result<Value, CallError> {
        let function = self.get().ok_or_else(|| CallError::UnboundSelfReference {
            function: self.function.to_string(),
        })?;
        function.call(args)
    }

    /// The bound function, if binding has completed and it is still alive
    pub fn get(&self) -> Option<Arc<TypedFunction>> {
        self.slot.get().and_then(|weak| weak.upgrade())
    }

    fn bind(&self, function: &Arc<TypedFunction>) {
        let _ = self.slot.set(Arc::downgrade(function));
    }
}

/// A declared dependency on another named capability
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    declared: String,
    name: String,
    optional: bool,
}

impl DependencySpec {
    /// Parse the declared form; a leading `?` marks the dependency optional
    fn parse(declared: &str) -> Self {
        let trimmed = declared.trim();
        match trimmed.strip_prefix('?') {
            Some(name) => Self {
                declared: trimmed.to_string(),
                name: name.trim().to_string(),
                optional: true,
            },
            None => Self {
                declared: trimmed.to_string(),
                name: trimmed.to_string(),
                optional: false,
            },
        }
    }

    /// The declared form, `?` marker included
    pub fn declared(&self) -> &str {
        &self.declared
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

/// Late-bound handle to a declared dependency
#[derive(Clone)]
pub struct DependencyHandle {
    name: String,
    slot: Arc<OnceLock<Option<Arc<TypedFunction>>>>,
}

impl DependencyHandle {
    /// The bound function; `None` for an absent optional dependency or
    /// before binding
    pub fn get(&self) -> Option<Arc<TypedFunction>> {
        self.slot.get().cloned().flatten()
    }

    /// Dispatch through the bound dependency
    pub fn call(&self, args: &[Value]) -> Result<Value, CallError> {
        let function = self.get().ok_or_else(|| CallError::UnboundDependency {
            name: self.name.clone(),
        })?;
        function.call(args)
    }
}

/// Named capabilities available to `build` for dependency injection
#[derive(Default, Clone)]
pub struct DependencyBindings {
    entries: HashMap<String, Arc<TypedFunction>>,
}

impl DependencyBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, function: Arc<TypedFunction>) {
        self.entries.insert(name.to_string(), function);
    }

    pub fn with(mut self, name: &str, function: Arc<TypedFunction>) -> Self {
        self.insert(name, function);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<TypedFunction>> {
        self.entries.get(name)
    }
}

/// Opaque metadata flags carried on a typed function for downstream
/// consumers; the dispatch core stores them without interpreting them
#[derive(Debug, Default, Clone)]
pub struct FunctionAttributes {
    flags: IndexMap<String, bool>,
}

impl FunctionAttributes {
    pub fn set(&mut self, key: &str, value: bool) {
        self.flags.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<bool> {
        self.flags.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.flags.iter().map(|(key, &value)| (key.as_str(), value))
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

/// A declared signature kept in its original form so derived functions can
/// re-materialize bodies
#[derive(Clone)]
pub(crate) struct DeclaredSignature {
    pub source: String,
    pub callable: Callable,
}

/// Per-position accepted type names plus arity bounds, for static call-site
/// diagnostics in an expression compiler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureDetails {
    pub source: String,
    pub parameters: Vec<ParameterDetails>,
    pub min_arity: usize,
    pub max_arity: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDetails {
    pub type_names: Vec<String>,
    pub variadic: bool,
    pub optional: bool,
}

/// An immutable typed function: one dispatch table plus composition metadata
pub struct TypedFunction {
    name: String,
    table: DispatchTable,
    declared: Vec<DeclaredSignature>,
    dependencies: Vec<DependencySpec>,
    attributes: FunctionAttributes,
    /// Derived functions keep a lookup-only reference to their base
    base: Option<Weak<TypedFunction>>,
}

impl TypedFunction {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Select and run the most specific implementation for the arguments
    pub fn call(&self, args: &[Value]) -> Result<Value, CallError> {
        self.resolve(args)?.invoke()
    }

    /// Plain entry point, equivalent to calling directly
    pub fn invoke(&self, args: &[Value]) -> Result<Value, CallError> {
        self.call(args)
    }

    /// Select the implementation and converted argument list without running it
    pub fn resolve(&self, args: &[Value]) -> Result<Resolution, CallError> {
        self.table.resolve(args)
    }

    /// Declared signatures in declaration order
    pub fn signatures(&self) -> Vec<&Signature> {
        self.table.signatures().collect()
    }

    /// Signature metadata with type names spelled out per position
    pub fn signature_details(&self) -> Vec<SignatureDetails> {
        let registry = &self.table.registry;
        self.table
            .signatures()
            .map(|signature| SignatureDetails {
                source: signature.source().to_string(),
                parameters: signature
                    .params()
                    .iter()
                    .map(|param| ParameterDetails {
                        type_names: param
                            .accepted()
                            .iter()
                            .map(|&id| registry.name_of(id).to_string())
                            .collect(),
                        variadic: param.is_variadic(),
                        optional: param.is_optional(),
                    })
                    .collect(),
                min_arity: signature.min_arity(),
                max_arity: signature.max_arity(),
            })
            .collect()
    }

    /// Smallest and largest accepted argument counts (`None` = unbounded)
    pub fn arity_bounds(&self) -> (usize, Option<usize>) {
        self.table.arity_bounds()
    }

    /// Static pre-check: could a call with these argument type names ever
    /// match, honouring direct conversions? Runtime resolution remains
    /// authoritative.
    pub fn could_match(&self, type_names: &[&str]) -> bool {
        let registry = &self.table.registry;
        let ids: Option<Vec<_>> = type_names
            .iter()
            .map(|name| registry.id_of(name).ok())
            .collect();
        let Some(ids) = ids else {
            return false;
        };
        let any = registry.any_id();

        self.table.signatures().any(|signature| {
            signature.covers_arity(ids.len())
                && ids.iter().enumerate().all(|(position, &id)| {
                    let accepted = signature
                        .accepted_at(position)
                        .expect("arity was checked against the signature");
                    accepted.contains(&id)
                        || accepted.contains(&any)
                        || accepted.iter().any(|&target| {
                            self.table.conversions.find_conversion(id, target).is_some()
                        })
                })
        })
    }

    /// Declared dependencies, `?` optional-marker convention included
    pub fn dependencies(&self) -> &[DependencySpec] {
        &self.dependencies
    }

    /// Opaque attribute flags supplied at definition time
    pub fn attributes(&self) -> &FunctionAttributes {
        &self.attributes
    }

    /// The base function this one extends, if it is still alive
    pub fn base(&self) -> Option<Arc<TypedFunction>> {
        self.base.as_ref().and_then(|weak| weak.upgrade())
    }

    pub fn stats(&self) -> DispatchStats {
        self.table.stats()
    }

    /// Derive a new typed function from `base` plus additional signatures.
    /// An addition whose parameter pattern is identical to a base signature
    /// overrides it; everything else goes through full ambiguity validation
    /// over the union. Self-referring bodies are re-materialized against the
    /// derived function.
    pub fn extend(
        base: &Arc<TypedFunction>,
        env: &TypedEnvironment,
        additions: IndexMap<String, Callable>,
    ) -> Result<Arc<TypedFunction>, DefineError> {
        let registry = env.registry();
        let mut declared = base.declared.clone();
        for (source, callable) in additions {
            let addition = Signature::parse(registry, &source)?;
            let existing = declared.iter_mut().find(|d| {
                Signature::parse(registry, &d.source)
                    .map(|parsed| parsed.pattern() == addition.pattern())
                    .unwrap_or(false)
            });
            match existing {
                Some(slot) => {
                    slot.source = source;
                    slot.callable = callable;
                }
                None => declared.push(DeclaredSignature { source, callable }),
            }
        }

        let (entries, self_handle) = materialize(&base.name, &declared, registry)?;
        let table = DispatchTable::build(
            base.name.clone(),
            env.registry_arc(),
            env.conversions_arc(),
            env.options(),
            entries,
        )?;
        let function = Arc::new(TypedFunction {
            name: base.name.clone(),
            table,
            declared,
            dependencies: base.dependencies.clone(),
            attributes: base.attributes.clone(),
            base: Some(Arc::downgrade(base)),
        });
        self_handle.bind(&function);
        Ok(function)
    }
}

/// Builder for a typed function — the "building" typestate. Signatures and
/// dependencies accumulate here; nothing is callable until `build` completes.
pub struct TypedFunctionBuilder {
    name: String,
    declared: Vec<DeclaredSignature>,
    dependencies: Vec<DependencySpec>,
    handles: Vec<DependencyHandle>,
    attributes: FunctionAttributes,
}

impl TypedFunctionBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            declared: Vec::new(),
            dependencies: Vec::new(),
            handles: Vec::new(),
            attributes: FunctionAttributes::default(),
        }
    }

    /// Declare a signature with its implementation form
    pub fn signature(&mut self, source: &str, callable: Callable) -> &mut Self {
        self.declared.push(DeclaredSignature {
            source: source.to_string(),
            callable,
        });
        self
    }

    /// Declare an already-constructed signature (the structured form); its
    /// canonical text is kept for diagnostics and overrides
    pub fn signature_spec(&mut self, signature: &Signature, callable: Callable) -> &mut Self {
        self.declared.push(DeclaredSignature {
            source: signature.source().to_string(),
            callable,
        });
        self
    }

    /// Declare a named dependency (`?name` marks it optional) and get the
    /// late-bound handle implementation bodies may close over
    pub fn dependency(&mut self, declared: &str) -> DependencyHandle {
        let spec = DependencySpec::parse(declared);
        let handle = DependencyHandle {
            name: spec.name.clone(),
            slot: Arc::new(OnceLock::new()),
        };
        self.dependencies.push(spec);
        self.handles.push(handle.clone());
        handle
    }

    /// Attach an opaque attribute flag, preserved uninterpreted
    pub fn attribute(&mut self, key: &str, value: bool) -> &mut Self {
        self.attributes.set(key, value);
        self
    }

    /// Finish construction: bind dependencies, materialize bodies, validate
    /// the dispatch table, and bind the self-reference handle
    pub fn build(
        self,
        env: &TypedEnvironment,
        bindings: &DependencyBindings,
    ) -> Result<Arc<TypedFunction>, DefineError> {
        for (spec, handle) in self.dependencies.iter().zip(&self.handles) {
            match bindings.get(spec.name()) {
                Some(function) => {
                    let _ = handle.slot.set(Some(function.clone()));
                }
                None if spec.is_optional() => {
                    let _ = handle.slot.set(None);
                }
                None => {
                    return Err(BuildError::MissingDependency {
                        function: self.name.clone(),
                        dependency: spec.name().to_string(),
                    }
                    .into());
                }
            }
        }

        let (entries, self_handle) = materialize(&self.name, &self.declared, env.registry())?;
        let table = DispatchTable::build(
            self.name.clone(),
            env.registry_arc(),
            env.conversions_arc(),
            env.options(),
            entries,
        )?;
        let function = Arc::new(TypedFunction {
            name: self.name,
            table,
            declared: self.declared,
            dependencies: self.dependencies,
            attributes: self.attributes,
            base: None,
        });
        self_handle.bind(&function);
        Ok(function)
    }
}

/// Parse every declared signature and materialize its body. Plain and
/// self-referring bodies materialize directly; referring bodies resolve
/// against the already-materialized siblings afterwards.
fn materialize(
    name: &str,
    declared: &[DeclaredSignature],
    registry: &TypeRegistry,
) -> Result<(Vec<TableEntry>, SelfHandle), DefineError> {
    let self_handle = SelfHandle::new(name);

    let mut signatures = Vec::with_capacity(declared.len());
    for decl in declared {
        signatures.push(Signature::parse(registry, &decl.source)?);
    }

    let mut bodies: Vec<Option<Implementation>> = declared
        .iter()
        .map(|decl| match &decl.callable {
            Callable::Plain(body) => Some(body.clone()),
            Callable::SelfReferring(factory) => Some((factory.as_ref())(self_handle.clone())),
            Callable::Referring { .. } => None,
        })
        .collect();

    for (index, decl) in declared.iter().enumerate() {
        let Callable::Referring {
            references,
            factory,
        } = &decl.callable
        else {
            continue;
        };
        let mut resolved = Vec::with_capacity(references.len());
        for reference in references {
            let wanted = Signature::parse(registry, reference).map_err(|_| {
                BuildError::UnresolvedReference {
                    function: name.to_string(),
                    reference: reference.clone(),
                }
            })?;
            let target = signatures
                .iter()
                .position(|candidate| candidate.pattern() == wanted.pattern())
                .and_then(|position| bodies[position].clone())
                .ok_or_else(|| BuildError::UnresolvedReference {
                    function: name.to_string(),
                    reference: reference.clone(),
                })?;
            resolved.push(target);
        }
        bodies[index] = Some((factory.as_ref())(&resolved));
    }

    let entries = signatures
        .into_iter()
        .zip(bodies)
        .map(|(signature, body)| TableEntry {
            signature,
            implementation: body.expect("every body is materialized by now"),
        })
        .collect();
    Ok((entries, self_handle))
}
