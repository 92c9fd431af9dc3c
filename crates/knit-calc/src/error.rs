//! Error types for the calc language

use knit_exec::EvalFault;

/// Errors raised while parsing or evaluating a fragment
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalcError {
    /// Fragment text does not parse
    #[error("syntax error on line {line}: {message}")]
    Syntax {
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },

    /// Variable read before assignment
    #[error("name '{0}' is not defined")]
    UnknownName(String),

    /// Call to a function that does not exist
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// Wrong number of call arguments
    #[error("{name}() takes {expected} argument(s), got {actual}")]
    Arity {
        /// Function name
        name: String,
        /// Expected argument count
        expected: usize,
        /// Supplied argument count
        actual: usize,
    },

    /// Operation applied to unsupported operand types
    #[error("type error: {0}")]
    Type(String),

    /// Division or remainder by zero
    #[error("division by zero")]
    DivisionByZero,

    /// Integer arithmetic overflowed
    #[error("integer overflow")]
    Overflow,

    /// Float arithmetic produced an infinity or NaN
    #[error("float result out of range")]
    FloatRange,

    /// Raised by `fail(...)`
    #[error("{0}")]
    Raised(String),
}

impl CalcError {
    /// Create syntax error
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }
}

impl From<CalcError> for EvalFault {
    fn from(error: CalcError) -> Self {
        EvalFault::failed(error)
    }
}
