use std::fmt;

/// Category of an elementary symbol, used in error messages and by the numbering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolCategory {
    FreeBeta,
    FixedBeta,
    RandomVariable,
    Draws,
    Variable,
}

impl fmt::Display for SymbolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SymbolCategory::FreeBeta => "free parameter",
            SymbolCategory::FixedBeta => "fixed parameter",
            SymbolCategory::RandomVariable => "random variable",
            SymbolCategory::Draws => "draws",
            SymbolCategory::Variable => "variable",
        };
        write!(f, "{}", label)
    }
}

/// Errors raised while building, numbering, auditing or evaluating expressions
#[derive(Debug, Clone, PartialEq)]
pub enum ExprError {
    // Construction errors
    InvalidName {
        name: String,
    },
    InvalidValue {
        name: String,
        value: f64,
    },
    InvalidLinearTerm(String),

    // Numbering errors
    DuplicateSymbols {
        names: Vec<String>,
    },
    UnknownSymbol {
        name: String,
        category: Option<SymbolCategory>,
    },

    // Evaluation errors
    MissingIndex {
        name: String,
    },
    MissingDataset(String),
    UnboundVariable {
        name: String,
    },
    NotEvaluable(String),
    KeyNotFound {
        key: i64,
        available: Vec<i64>,
    },
    InvalidKey {
        value: f64,
        available: Vec<i64>,
    },
    AuditFailed {
        errors: Vec<String>,
    },
    InconsistentDerivatives,
    DimensionMismatch {
        expected: usize,
        got: usize,
    },

    // Dataset errors
    UnknownColumn {
        name: String,
    },
    DuplicateColumn {
        name: String,
    },
    ShapeMismatch(String),
    UnknownDrawType {
        name: String,
        draw_type: String,
    },

    /// Failure reported by the evaluation engine
    Engine(String),
}

impl ExprError {
    /// Create an `UnknownSymbol` for a name absent from every category
    pub fn unknown_symbol(name: impl Into<String>) -> Self {
        ExprError::UnknownSymbol {
            name: name.into(),
            category: None,
        }
    }

    /// Create a `MissingDataset` error
    pub fn missing_dataset(msg: impl Into<String>) -> Self {
        ExprError::MissingDataset(msg.into())
    }

    /// Create an `Engine` error
    pub fn engine(msg: impl Into<String>) -> Self {
        ExprError::Engine(msg.into())
    }

    /// Check whether this error aborts at construction time
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            ExprError::InvalidName { .. }
                | ExprError::InvalidValue { .. }
                | ExprError::InvalidLinearTerm(_)
        )
    }
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprError::InvalidName { name } => {
                write!(
                    f,
                    "Invalid name '{}': names must be non-empty and must not contain '\"'",
                    name
                )
            }
            ExprError::InvalidValue { name, value } => {
                write!(
                    f,
                    "The initial value of parameter {} must be a finite number, not {}",
                    name, value
                )
            }
            ExprError::InvalidLinearTerm(msg) => write!(f, "{}", msg),
            ExprError::DuplicateSymbols { names } => {
                write!(
                    f,
                    "The following elementary expressions are defined more than once: {}.",
                    names.join(", ")
                )
            }
            ExprError::UnknownSymbol { name, category } => match category {
                Some(cat) => write!(f, "No index is available for {} {}.", cat, name),
                None => write!(f, "No index is available for elementary expression {}.", name),
            },
            ExprError::MissingIndex { name } => {
                write!(
                    f,
                    "No id has been defined for elementary expression {}.",
                    name
                )
            }
            ExprError::MissingDataset(msg) => write!(f, "{}", msg),
            ExprError::UnboundVariable { name } => {
                write!(
                    f,
                    "Evaluating Variable {} requires a database. Use the dataset-driven evaluation instead.",
                    name
                )
            }
            ExprError::NotEvaluable(what) => {
                write!(
                    f,
                    "Expression {} can only be evaluated by the evaluation engine",
                    what
                )
            }
            ExprError::KeyNotFound { key, available } => {
                let keys: Vec<String> = available.iter().map(|k| k.to_string()).collect();
                write!(
                    f,
                    "Key {} is not present in the dictionary. Available keys: {}",
                    key,
                    keys.join(", ")
                )
            }
            ExprError::InvalidKey { value, available } => {
                let keys: Vec<String> = available.iter().map(|k| k.to_string()).collect();
                write!(
                    f,
                    "Value {} cannot select an entry of the dictionary. Available keys: {}",
                    value,
                    keys.join(", ")
                )
            }
            ExprError::AuditFailed { errors } => write!(f, "{}", errors.join("\n")),
            ExprError::InconsistentDerivatives => {
                write!(
                    f,
                    "If the hessian or the BHHH matrix is calculated, so is the gradient. \
                     The provided parameters are inconsistent."
                )
            }
            ExprError::DimensionMismatch { expected, got } => {
                write!(
                    f,
                    "Function is expecting an array of length {}, not {}",
                    expected, got
                )
            }
            ExprError::UnknownColumn { name } => {
                write!(f, "Variable {} not found in the database.", name)
            }
            ExprError::DuplicateColumn { name } => {
                write!(f, "Variable {} already exists in the database.", name)
            }
            ExprError::ShapeMismatch(msg) => write!(f, "Inconsistent data: {}", msg),
            ExprError::UnknownDrawType { name, draw_type } => {
                write!(f, "Unknown type of draws '{}' for {}", draw_type, name)
            }
            ExprError::Engine(msg) => write!(f, "Evaluation engine failure: {}", msg),
        }
    }
}

impl std::error::Error for ExprError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_message_lists_names() {
        let err = ExprError::DuplicateSymbols {
            names: vec!["ASC_CAR".to_string(), "TIME".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("ASC_CAR, TIME"));
    }

    #[test]
    fn test_audit_failure_joins_errors() {
        let err = ExprError::AuditFailed {
            errors: vec!["first".to_string(), "second".to_string()],
        };
        assert_eq!(err.to_string(), "first\nsecond");
    }

    #[test]
    fn test_construction_error_classification() {
        assert!(ExprError::InvalidName {
            name: String::new()
        }
        .is_construction_error());
        assert!(!ExprError::InconsistentDerivatives.is_construction_error());
    }
}
