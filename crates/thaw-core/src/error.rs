//! Error types for the Thaw field engine.
//!
//! Subsystems return their own narrow error enums ([`EvalError`] from
//! evaluators, [`ConfigError`] from construction, plus the store, mesh and
//! graph errors defined in their crates). All of them convert into
//! [`ThawError`], whose variants are the engine-wide taxonomy and whose
//! [`class`](ThawError::class) tells the caller how to react.

use std::error::Error;
use std::fmt;

use crate::id::FieldKey;

/// How a caller is expected to react to a [`ThawError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Invalid physics configuration. Abort simulation setup.
    Structural,
    /// Numerical trouble in the current state. Report to the nonlinear
    /// solver, which may cut the step or change strategy.
    Numerical,
    /// Operations called in the wrong order or on unknown keys.
    /// A programming error; fail fast.
    Sequencing,
}

/// Errors detected while reading a configuration record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A required parameter is absent.
    MissingParameter {
        /// Evaluator or component being configured.
        context: String,
        /// The missing key.
        key: String,
    },
    /// A parameter has the wrong type.
    WrongType {
        /// Evaluator or component being configured.
        context: String,
        /// The offending key.
        key: String,
        /// Expected type name.
        expected: &'static str,
        /// Type actually found.
        found: &'static str,
    },
    /// A parameter was supplied that nothing reads.
    UnknownParameter {
        /// Evaluator or component being configured.
        context: String,
        /// The unread key.
        key: String,
    },
    /// A parameter value is outside its valid range.
    InvalidValue {
        /// Evaluator or component being configured.
        context: String,
        /// The offending key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
    /// No constructor is registered under the requested type name.
    UnknownEvaluatorType {
        /// The requested type name.
        name: String,
    },
    /// The configuration document could not be parsed.
    Parse {
        /// Parser diagnostic.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingParameter { context, key } => {
                write!(f, "{context}: missing required parameter '{key}'")
            }
            Self::WrongType {
                context,
                key,
                expected,
                found,
            } => write!(f, "{context}: parameter '{key}' must be {expected}, found {found}"),
            Self::UnknownParameter { context, key } => {
                write!(f, "{context}: unknown parameter '{key}'")
            }
            Self::InvalidValue {
                context,
                key,
                reason,
            } => write!(f, "{context}: invalid value for '{key}': {reason}"),
            Self::UnknownEvaluatorType { name } => {
                write!(f, "no evaluator type registered as '{name}'")
            }
            Self::Parse { reason } => write!(f, "configuration parse error: {reason}"),
        }
    }
}

impl Error for ConfigError {}

/// Errors returned by a single evaluator's computation.
///
/// The engine attaches the evaluator's identity when it converts these
/// into a [`ThawError`].
#[derive(Clone, Debug, PartialEq)]
pub enum EvalError {
    /// An input value lies outside the closure relation's valid domain.
    Domain {
        /// Local entity index of the first offending value, if known.
        entity: Option<usize>,
        /// Human-readable description.
        reason: String,
    },
    /// The evaluator cannot differentiate with respect to `wrt`.
    DerivativeNotImplemented {
        /// The requested with-respect-to key.
        wrt: FieldKey,
    },
    /// A declared input was not readable through the evaluation context.
    MissingInput {
        /// The unreadable key.
        key: FieldKey,
    },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain { entity, reason } => {
                write!(f, "domain error: {reason}")?;
                if let Some(e) = entity {
                    write!(f, " (entity {e})")?;
                }
                Ok(())
            }
            Self::DerivativeNotImplemented { wrt } => {
                write!(f, "derivative with respect to '{wrt}' not implemented")
            }
            Self::MissingInput { key } => write!(f, "input '{key}' not readable"),
        }
    }
}

impl Error for EvalError {}

/// Engine-wide error taxonomy.
#[derive(Clone, Debug, PartialEq)]
pub enum ThawError {
    /// Bad or missing configuration, detected at construction.
    Config(ConfigError),
    /// Unknown field, mesh or evaluator key.
    NotFound {
        /// Description of what was looked up.
        key: String,
    },
    /// Inconsistent mesh or partition association.
    ShapeMismatch {
        /// The field whose shape disagreed.
        key: String,
        /// Shape already on record (or required by the operation).
        expected: String,
        /// Shape that was offered.
        found: String,
    },
    /// The evaluator dependency graph contains a cycle.
    CyclicDependency {
        /// Keys along the cycle; the first key is repeated at the end.
        cycle: Vec<FieldKey>,
    },
    /// Input values outside a closure relation's valid domain.
    Domain {
        /// Evaluator that rejected its inputs.
        evaluator: FieldKey,
        /// Local entity index of the first offending value, if known.
        entity: Option<usize>,
        /// Human-readable description.
        reason: String,
    },
    /// Differentiation requested from an evaluator that does not support it.
    DerivativeNotImplemented {
        /// Evaluator that cannot differentiate.
        evaluator: FieldKey,
        /// Requested with-respect-to key.
        wrt: FieldKey,
    },
    /// Two writers claim the same output key.
    DuplicateOwner {
        /// The contested key.
        key: FieldKey,
        /// Owner already on record.
        first: String,
        /// Second claimant.
        second: String,
    },
    /// Operation requested before the setup it depends on.
    NotReady {
        /// What is not ready.
        what: String,
    },
    /// The coupled operator could not be factored.
    SingularOperator {
        /// Where the singularity was detected.
        reason: String,
    },
}

impl ThawError {
    /// Attach an evaluator's identity to an [`EvalError`].
    pub fn from_eval(evaluator: &FieldKey, err: EvalError) -> Self {
        match err {
            EvalError::Domain { entity, reason } => Self::Domain {
                evaluator: evaluator.clone(),
                entity,
                reason,
            },
            EvalError::DerivativeNotImplemented { wrt } => Self::DerivativeNotImplemented {
                evaluator: evaluator.clone(),
                wrt,
            },
            EvalError::MissingInput { key } => Self::NotFound {
                key: key.to_string(),
            },
        }
    }

    /// Propagation class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Config(_)
            | Self::CyclicDependency { .. }
            | Self::DuplicateOwner { .. }
            | Self::ShapeMismatch { .. }
            | Self::DerivativeNotImplemented { .. } => ErrorClass::Structural,
            Self::Domain { .. } | Self::SingularOperator { .. } => ErrorClass::Numerical,
            Self::NotFound { .. } | Self::NotReady { .. } => ErrorClass::Sequencing,
        }
    }

    /// Whether the nonlinear solver may recover by retrying.
    pub fn is_recoverable(&self) -> bool {
        self.class() == ErrorClass::Numerical
    }
}

impl fmt::Display for ThawError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration error: {e}"),
            Self::NotFound { key } => write!(f, "not found: {key}"),
            Self::ShapeMismatch {
                key,
                expected,
                found,
            } => write!(f, "shape mismatch for '{key}': expected {expected}, found {found}"),
            Self::CyclicDependency { cycle } => {
                write!(f, "cyclic dependency: ")?;
                for (i, k) in cycle.iter().enumerate() {
                    if i > 0 {
                        write!(f, " -> ")?;
                    }
                    write!(f, "{k}")?;
                }
                Ok(())
            }
            Self::Domain {
                evaluator,
                entity,
                reason,
            } => {
                write!(f, "evaluator '{evaluator}': {reason}")?;
                if let Some(e) = entity {
                    write!(f, " (entity {e})")?;
                }
                Ok(())
            }
            Self::DerivativeNotImplemented { evaluator, wrt } => write!(
                f,
                "evaluator '{evaluator}' does not implement the derivative with respect to '{wrt}'"
            ),
            Self::DuplicateOwner { key, first, second } => write!(
                f,
                "field '{key}' claimed by both '{first}' and '{second}'"
            ),
            Self::NotReady { what } => write!(f, "not ready: {what}"),
            Self::SingularOperator { reason } => write!(f, "singular operator: {reason}"),
        }
    }
}

impl Error for ThawError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for ThawError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_follow_propagation_policy() {
        let structural = ThawError::CyclicDependency {
            cycle: vec![FieldKey::new("a"), FieldKey::new("b"), FieldKey::new("a")],
        };
        assert_eq!(structural.class(), ErrorClass::Structural);
        assert!(!structural.is_recoverable());

        let numerical = ThawError::SingularOperator {
            reason: "cell 3".into(),
        };
        assert!(numerical.is_recoverable());

        let sequencing = ThawError::NotReady {
            what: "preconditioner".into(),
        };
        assert_eq!(sequencing.class(), ErrorClass::Sequencing);
    }

    #[test]
    fn from_eval_attaches_evaluator() {
        let key = FieldKey::new("thermal_conductivity");
        let err = ThawError::from_eval(
            &key,
            EvalError::Domain {
                entity: Some(2),
                reason: "saturation 1.3 outside [0, 1]".into(),
            },
        );
        assert_eq!(
            err.to_string(),
            "evaluator 'thermal_conductivity': saturation 1.3 outside [0, 1] (entity 2)"
        );
    }

    #[test]
    fn cycle_display_joins_with_arrows() {
        let err = ThawError::CyclicDependency {
            cycle: vec![FieldKey::new("a"), FieldKey::new("b"), FieldKey::new("a")],
        };
        assert_eq!(err.to_string(), "cyclic dependency: a -> b -> a");
    }

    #[test]
    fn config_error_is_source() {
        let err: ThawError = ConfigError::UnknownEvaluatorType {
            name: "bogus".into(),
        }
        .into();
        assert!(err.source().is_some());
    }
}
