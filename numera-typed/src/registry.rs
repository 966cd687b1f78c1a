//! Ordered catalog of named runtime types.
//!
//! The registry owns one descriptor per type name: a predicate over runtime
//! values plus a specificity rank (lower = more specific). Classification of
//! a value returns every matching descriptor ordered by rank, ties broken by
//! registration order. The catch-all `any` type is registered up front so
//! classification can never come back empty.
//!
//! One registry exists per library instance; it is populated during the
//! initialization phase and frozen into an `Arc` afterwards, so concurrent
//! resolution shares it read-only.

use crate::error::RegistryError;
use numera_values::Value;
use std::collections::HashMap;

/// Predicate deciding whether a value belongs to a type
pub type TypePredicate = fn(&Value) -> bool;

/// Identifier of a registered type, stable for the registry's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

/// A registered runtime type
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub name: String,
    pub id: TypeId,
    pub rank: u32,
    pub test: TypePredicate,
}

/// Registry of runtime types for one library instance
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    descriptors: Vec<TypeDescriptor>,
    by_name: HashMap<String, TypeId>,
    /// Descriptor ids sorted by (rank, registration order) for classification
    by_specificity: Vec<TypeId>,
}

fn any_value(_: &Value) -> bool {
    true
}

impl TypeRegistry {
    /// Name of the built-in catch-all type
    pub const ANY: &'static str = "any";

    /// Create a registry containing only the catch-all `any` type
    pub fn new() -> Self {
        let mut registry = Self {
            descriptors: Vec::new(),
            by_name: HashMap::new(),
            by_specificity: Vec::new(),
        };
        registry
            .register(Self::ANY, any_value, u32::MAX)
            .expect("empty registry accepts the catch-all type");
        registry
    }

    /// Register a new type; fails if the name is already taken
    pub fn register(
        &mut self,
        name: &str,
        test: TypePredicate,
        rank: u32,
    ) -> Result<TypeId, RegistryError> {
        if self.by_name.contains_key(name) {
            return Err(RegistryError::DuplicateType {
                name: name.to_string(),
            });
        }
        let id = TypeId(self.descriptors.len() as u32);
        self.descriptors.push(TypeDescriptor {
            name: name.to_string(),
            id,
            rank,
            test,
        });
        self.by_name.insert(name.to_string(), id);
        self.by_specificity.push(id);
        // Stable sort keeps registration order among equal ranks.
        let descriptors = &self.descriptors;
        self.by_specificity
            .sort_by_key(|id| descriptors[id.0 as usize].rank);
        Ok(id)
    }

    /// Classify a value: every matching descriptor, most specific first.
    /// Never empty, because `any` matches everything.
    pub fn classify(&self, value: &Value) -> Vec<&TypeDescriptor> {
        self.by_specificity
            .iter()
            .map(|id| &self.descriptors[id.0 as usize])
            .filter(|descriptor| (descriptor.test)(value))
            .collect()
    }

    /// Classify a value into type ids, most specific first
    pub fn classify_ids(&self, value: &Value) -> Vec<TypeId> {
        self.classify(value)
            .into_iter()
            .map(|descriptor| descriptor.id)
            .collect()
    }

    /// Rank of a type by name
    pub fn rank(&self, name: &str) -> Result<u32, RegistryError> {
        self.id_of(name)
            .map(|id| self.descriptors[id.0 as usize].rank)
    }

    /// Id of a type by name
    pub fn id_of(&self, name: &str) -> Result<TypeId, RegistryError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::UnknownType {
                name: name.to_string(),
            })
    }

    /// Descriptor of a registered type id
    pub fn descriptor(&self, id: TypeId) -> &TypeDescriptor {
        &self.descriptors[id.0 as usize]
    }

    /// Name of a registered type id
    pub fn name_of(&self, id: TypeId) -> &str {
        &self.descriptors[id.0 as usize].name
    }

    /// Rank of a registered type id
    pub fn rank_of(&self, id: TypeId) -> u32 {
        self.descriptors[id.0 as usize].rank
    }

    /// Id of the catch-all `any` type
    pub fn any_id(&self) -> TypeId {
        TypeId(0)
    }

    /// Check whether a type name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Number of registered types (including `any`)
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Iterate registered descriptors in registration order
    pub fn descriptors(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.descriptors.iter()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
