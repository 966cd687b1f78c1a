//! Signature model and parser.
//!
//! A signature is an ordered list of per-parameter accepted-type constraints.
//! The textual form separates parameters with commas and union members with
//! pipes; a trailing `?` marks a parameter optional and a leading `...` marks
//! the final parameter as a rest parameter consuming one or more trailing
//! arguments. Whitespace is insignificant, type names are case-sensitive.

use crate::error::SignatureError;
use crate::registry::{TypeId, TypeRegistry};

/// Constraint for a single parameter position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    accepted: Vec<TypeId>,
    variadic: bool,
    optional: bool,
}

impl ParameterSpec {
    /// A required parameter accepting the given types
    pub fn required(accepted: Vec<TypeId>) -> Self {
        Self {
            accepted,
            variadic: false,
            optional: false,
        }
    }

    /// An optional parameter accepting the given types
    pub fn optional(accepted: Vec<TypeId>) -> Self {
        Self {
            accepted,
            variadic: false,
            optional: true,
        }
    }

    /// A rest parameter accepting the given types for each consumed argument
    pub fn rest(accepted: Vec<TypeId>) -> Self {
        Self {
            accepted,
            variadic: true,
            optional: false,
        }
    }

    pub fn accepted(&self) -> &[TypeId] {
        &self.accepted
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

/// A parsed signature: ordered parameter constraints plus its canonical text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    params: Vec<ParameterSpec>,
    source: String,
}

impl Signature {
    /// Parse a textual signature against the registry
    pub fn parse(registry: &TypeRegistry, source: &str) -> Result<Self, SignatureError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Ok(Self {
                params: Vec::new(),
                source: String::new(),
            });
        }

        let mut params = Vec::new();
        for (index, raw) in trimmed.split(',').enumerate() {
            let mut text = raw.trim();
            if text.is_empty() {
                return Err(SignatureError::EmptyParameter {
                    signature: trimmed.to_string(),
                    index,
                });
            }

            let mut variadic = false;
            let mut optional = false;
            if let Some(stripped) = text.strip_prefix("...") {
                variadic = true;
                text = stripped.trim();
            }
            if let Some(stripped) = text.strip_suffix('?') {
                optional = true;
                text = stripped.trim();
            }
            if text.is_empty() {
                return Err(SignatureError::EmptyParameter {
                    signature: trimmed.to_string(),
                    index,
                });
            }
            if variadic && optional {
                return Err(SignatureError::OptionalRest {
                    signature: trimmed.to_string(),
                    parameter: raw.trim().to_string(),
                });
            }

            let mut accepted = Vec::new();
            for member in text.split('|') {
                let name = member.trim();
                if name.is_empty() {
                    return Err(SignatureError::MalformedUnion {
                        signature: trimmed.to_string(),
                        parameter: raw.trim().to_string(),
                    });
                }
                let id = registry
                    .id_of(name)
                    .map_err(|_| SignatureError::UnknownType {
                        signature: trimmed.to_string(),
                        name: name.to_string(),
                    })?;
                if !accepted.contains(&id) {
                    accepted.push(id);
                }
            }

            params.push(ParameterSpec {
                accepted,
                variadic,
                optional,
            });
        }

        Self::from_specs(registry, params)
    }

    /// Build a signature from structured parameter specs, applying the same
    /// structural validation as the textual parser
    pub fn from_specs(
        registry: &TypeRegistry,
        params: Vec<ParameterSpec>,
    ) -> Result<Self, SignatureError> {
        let source = render_source(registry, &params);

        let mut seen_optional = false;
        for (index, param) in params.iter().enumerate() {
            if param.accepted.is_empty() {
                return Err(SignatureError::EmptyParameter {
                    signature: source.clone(),
                    index,
                });
            }
            if param.variadic && param.optional {
                return Err(SignatureError::OptionalRest {
                    signature: source.clone(),
                    parameter: render_param(registry, param),
                });
            }
            if param.variadic && index + 1 != params.len() {
                return Err(SignatureError::RestNotLast {
                    signature: source.clone(),
                });
            }
            if seen_optional && !param.optional {
                return Err(SignatureError::RequiredAfterOptional {
                    signature: source.clone(),
                    parameter: render_param(registry, param),
                });
            }
            seen_optional |= param.optional;
        }

        Ok(Self { params, source })
    }

    pub fn params(&self) -> &[ParameterSpec] {
        &self.params
    }

    /// Canonical text of this signature
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Smallest argument count this signature accepts; a rest parameter
    /// consumes at least one argument
    pub fn min_arity(&self) -> usize {
        let required = self
            .params
            .iter()
            .filter(|p| !p.optional && !p.variadic)
            .count();
        if self.is_variadic() {
            required + 1
        } else {
            required
        }
    }

    /// Largest argument count this signature accepts; `None` = unbounded
    pub fn max_arity(&self) -> Option<usize> {
        if self.is_variadic() {
            None
        } else {
            Some(self.params.len())
        }
    }

    pub fn is_variadic(&self) -> bool {
        self.params.last().is_some_and(|p| p.variadic)
    }

    pub fn covers_arity(&self, count: usize) -> bool {
        count >= self.min_arity() && self.max_arity().map_or(true, |max| count <= max)
    }

    /// Accepted types at a positional argument for a call with enough
    /// arguments; rest positions all share the rest parameter's set
    pub fn accepted_at(&self, position: usize) -> Option<&[TypeId]> {
        if self.is_variadic() && position + 1 >= self.params.len() {
            return self.params.last().map(|p| p.accepted.as_slice());
        }
        self.params.get(position).map(|p| p.accepted.as_slice())
    }

    /// Normalized structural pattern used for duplicate/override detection:
    /// per-parameter sorted accepted sets plus the variadic/optional flags
    pub(crate) fn pattern(&self) -> Vec<(Vec<TypeId>, bool, bool)> {
        self.params
            .iter()
            .map(|p| {
                let mut accepted = p.accepted.clone();
                accepted.sort();
                (accepted, p.variadic, p.optional)
            })
            .collect()
    }
}

fn render_param(registry: &TypeRegistry, param: &ParameterSpec) -> String {
    let union = param
        .accepted
        .iter()
        .map(|&id| registry.name_of(id))
        .collect::<Vec<_>>()
        .join("|");
    match (param.variadic, param.optional) {
        (true, _) => format!("...{union}"),
        (false, true) => format!("{union}?"),
        (false, false) => union,
    }
}

fn render_source(registry: &TypeRegistry, params: &[ParameterSpec]) -> String {
    params
        .iter()
        .map(|p| render_param(registry, p))
        .collect::<Vec<_>>()
        .join(", ")
}
