//! Knit Calc Backend
//!
//! A deliberately tiny, stateful expression language that plugs into
//! [`knit_exec::EvaluationBackend`], so documents can be rendered end to end
//! without an external interpreter.
//!
//! ```text
//! x = 20 + 1          # assignment, no result
//! print("x is", x)    # captured output: "x is 21"
//! x * 2               # result: 42
//! ```
//!
//! Built-ins: `print`, `random`, `len`, `str`, `html`, `svg`, `markdown`,
//! `fail`.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod backend;
pub mod error;
mod lexer;
mod parser;
pub mod value;

pub use backend::{CalcBackend, CalcContext, CancelFlag};
pub use error::CalcError;
pub use value::Value;
