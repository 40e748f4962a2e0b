//! Engine error taxonomy.
//!
//! Construction of an actor or one of its components fails with an
//! [`EngineError`]. The factory logs the failure and reports it to its caller;
//! sibling actors are never affected.
//!
//! - [`EngineError::MissingField`] / [`EngineError::MalformedField`]: the
//!   definition tree lacks a mandatory value or holds one that does not parse.
//! - [`EngineError::UnknownComponent`] / [`EngineError::DuplicateComponent`]:
//!   the actor shape itself is wrong.
//! - [`EngineError::ResourceMissing`]: an asset lookup failed and no fallback
//!   exists for it.
//! - [`EngineError::InvariantViolation`]: the definition is well-formed but
//!   describes something the engine cannot run (zero checkpoint spawn, unmapped
//!   plane name, ...).

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    MissingField {
        component: String,
        field: String,
    },
    MalformedField {
        component: String,
        field: String,
        value: String,
    },
    UnknownComponent(String),
    DuplicateComponent(String),
    ResourceMissing(String),
    InvariantViolation(String),
}

impl EngineError {
    pub fn missing(component: &str, field: &str) -> Self {
        EngineError::MissingField {
            component: component.to_string(),
            field: field.to_string(),
        }
    }

    pub fn malformed(component: &str, field: &str, value: &str) -> Self {
        EngineError::MalformedField {
            component: component.to_string(),
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        EngineError::InvariantViolation(msg.into())
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::MissingField { component, field } => {
                write!(f, "{}: missing mandatory field '{}'", component, field)
            }
            EngineError::MalformedField {
                component,
                field,
                value,
            } => write!(
                f,
                "{}: malformed value '{}' for field '{}'",
                component, value, field
            ),
            EngineError::UnknownComponent(name) => write!(f, "unknown component '{}'", name),
            EngineError::DuplicateComponent(name) => {
                write!(f, "component '{}' already attached to actor", name)
            }
            EngineError::ResourceMissing(what) => write!(f, "resource missing: {}", what),
            EngineError::InvariantViolation(msg) => write!(f, "invariant violated: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_component_and_field() {
        let err = EngineError::missing("HealthComponent", "Health");
        assert_eq!(
            err.to_string(),
            "HealthComponent: missing mandatory field 'Health'"
        );
        let err = EngineError::malformed("PositionComponent", "x", "abc");
        assert!(err.to_string().contains("'abc'"));
    }
}
