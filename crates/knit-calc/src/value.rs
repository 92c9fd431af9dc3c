//! Runtime values

use knit_exec::{Produced, RichValue};
use std::fmt::{self, Display, Formatter};

/// A calc runtime value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absence of a value; never becomes a fragment result
    None,
    /// Boolean
    Bool(bool),
    /// 64-bit integer
    Int(i64),
    /// 64-bit float, always finite
    Float(f64),
    /// String
    Str(String),
    /// Richly renderable payload
    Rich(RichValue),
}

impl Value {
    /// Name of the value's type, for error messages
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Rich(_) => "rich",
        }
    }

    /// Numeric value as float, if numeric
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Convert into a fragment result; `None` produces nothing
    #[must_use]
    pub fn into_produced(self) -> Option<Produced> {
        match self {
            Self::None => None,
            Self::Bool(b) => Some(Produced::Value(b.into())),
            Self::Int(i) => Some(Produced::Value(i.into())),
            Self::Float(f) => Some(Produced::Value(f.into())),
            Self::Str(s) => Some(Produced::Value(s.into())),
            Self::Rich(rich) => Some(Produced::Rich(rich)),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
            Self::Rich(rich) => f.write_str(&rich.data),
        }
    }
}
