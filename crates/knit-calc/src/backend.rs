//! Calc evaluation backend
//!
//! Each group gets a [`CalcContext`]: its variables plus its own random
//! number generator. A fragment is parsed as a whole before any statement
//! runs; statements then run in order, and the value of a trailing
//! expression statement becomes the fragment's result.

use crate::error::CalcError;
use crate::lexer::BinOp;
use crate::parser::{parse, Expr, Stmt};
use crate::value::Value;
use knit_exec::{EvalFault, EvaluationBackend, GroupId, Produced, RichValue};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation switch
///
/// Raising the flag makes every evaluation stop at its next statement
/// boundary with a cancellation.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Request cancellation
    #[inline]
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Withdraw a cancellation request
    #[inline]
    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Check if cancellation was requested
    #[inline]
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-group calc state
#[derive(Debug)]
pub struct CalcContext {
    vars: HashMap<String, Value>,
    rng: StdRng,
}

impl CalcContext {
    /// Look up a variable
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Number of defined variables
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Check if no variables are defined
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Calc language backend
#[derive(Debug, Clone, Default)]
pub struct CalcBackend {
    cancel: CancelFlag,
    seed: Option<u64>,
}

impl CalcBackend {
    /// Create backend with OS-seeded randomness
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With deterministic randomness derived from a seed and the group id
    #[inline]
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// With a shared cancellation flag
    #[inline]
    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle to this backend's cancellation flag
    #[inline]
    #[must_use]
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }
}

impl EvaluationBackend for CalcBackend {
    type Context = CalcContext;

    fn create_context(&self, group: &GroupId) -> CalcContext {
        let rng = match self.seed {
            Some(seed) => {
                let mut hasher = DefaultHasher::new();
                group.hash(&mut hasher);
                StdRng::seed_from_u64(seed ^ hasher.finish())
            }
            None => StdRng::from_os_rng(),
        };
        tracing::trace!(group = %group, seeded = self.seed.is_some(), "created calc context");
        CalcContext {
            vars: HashMap::new(),
            rng,
        }
    }

    fn evaluate(
        &self,
        context: &mut CalcContext,
        source: &str,
        output: &mut String,
    ) -> Result<Option<Produced>, EvalFault> {
        let program = parse(source)?;

        let mut last = Value::None;
        for statement in program {
            if self.cancel.is_raised() {
                return Err(EvalFault::Cancelled);
            }
            last = match statement {
                Stmt::Assign(name, expr) => {
                    let value = eval(context, &expr, output)?;
                    context.vars.insert(name, value);
                    Value::None
                }
                Stmt::Expr(expr) => eval(context, &expr, output)?,
            };
        }
        Ok(last.into_produced())
    }
}

fn eval(ctx: &mut CalcContext, expr: &Expr, output: &mut String) -> Result<Value, CalcError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Name(name) => ctx
            .vars
            .get(name)
            .cloned()
            .ok_or_else(|| CalcError::UnknownName(name.clone())),
        Expr::Neg(inner) => match eval(ctx, inner, output)? {
            Value::Int(i) => i.checked_neg().map(Value::Int).ok_or(CalcError::Overflow),
            Value::Float(f) => finite(-f),
            other => Err(CalcError::Type(format!(
                "bad operand type for unary -: '{}'",
                other.type_name()
            ))),
        },
        Expr::Binary(op, left, right) => {
            let left = eval(ctx, left, output)?;
            let right = eval(ctx, right, output)?;
            binary(*op, left, right)
        }
        Expr::Call(name, args) => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval(ctx, arg, output)?);
            }
            call(ctx, name, values, output)
        }
    }
}

fn binary(op: BinOp, left: Value, right: Value) -> Result<Value, CalcError> {
    use Value::{Bool, Int, Str};

    let mismatch = |left: &Value, right: &Value| {
        CalcError::Type(format!(
            "unsupported operand types for {}: '{}' and '{}'",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ))
    };

    match op {
        BinOp::Add => match (&left, &right) {
            (Int(a), Int(b)) => a.checked_add(*b).map(Int).ok_or(CalcError::Overflow),
            (Str(a), Str(b)) => Ok(Str(format!("{a}{b}"))),
            _ => float_op(&left, &right, |a, b| a + b)
                .unwrap_or_else(|| Err(mismatch(&left, &right))),
        },
        BinOp::Sub => match (&left, &right) {
            (Int(a), Int(b)) => a.checked_sub(*b).map(Int).ok_or(CalcError::Overflow),
            _ => float_op(&left, &right, |a, b| a - b)
                .unwrap_or_else(|| Err(mismatch(&left, &right))),
        },
        BinOp::Mul => match (&left, &right) {
            (Int(a), Int(b)) => a.checked_mul(*b).map(Int).ok_or(CalcError::Overflow),
            _ => float_op(&left, &right, |a, b| a * b)
                .unwrap_or_else(|| Err(mismatch(&left, &right))),
        },
        BinOp::Div => {
            let (a, b) = (left.as_f64(), right.as_f64());
            match (a, b) {
                (Some(_), Some(b)) if b == 0.0 => Err(CalcError::DivisionByZero),
                (Some(a), Some(b)) => finite(a / b),
                _ => Err(mismatch(&left, &right)),
            }
        }
        BinOp::Rem => match (&left, &right) {
            (Int(_), Int(0)) => Err(CalcError::DivisionByZero),
            (Int(a), Int(b)) => a.checked_rem_euclid(*b).map(Int).ok_or(CalcError::Overflow),
            _ => match (left.as_f64(), right.as_f64()) {
                (Some(_), Some(b)) if b == 0.0 => Err(CalcError::DivisionByZero),
                (Some(a), Some(b)) => finite(a.rem_euclid(b)),
                _ => Err(mismatch(&left, &right)),
            },
        },
        BinOp::Eq => Ok(Bool(equals(&left, &right))),
        BinOp::Ne => Ok(Bool(!equals(&left, &right))),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ordering = match (&left, &right) {
                (Int(a), Int(b)) => Some(a.cmp(b)),
                (Str(a), Str(b)) => Some(a.cmp(b)),
                _ => match (left.as_f64(), right.as_f64()) {
                    (Some(a), Some(b)) => a.partial_cmp(&b),
                    _ => return Err(mismatch(&left, &right)),
                },
            };
            let result = ordering.is_some_and(|o| match op {
                BinOp::Lt => o.is_lt(),
                BinOp::Le => o.is_le(),
                BinOp::Gt => o.is_gt(),
                _ => o.is_ge(),
            });
            Ok(Bool(result))
        }
    }
}

fn float_op(
    left: &Value,
    right: &Value,
    f: impl Fn(f64, f64) -> f64,
) -> Option<Result<Value, CalcError>> {
    Some(finite(f(left.as_f64()?, right.as_f64()?)))
}

/// Floats never leave the finite range
fn finite(x: f64) -> Result<Value, CalcError> {
    if x.is_finite() {
        Ok(Value::Float(x))
    } else {
        Err(CalcError::FloatRange)
    }
}

fn equals(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => left == right,
    }
}

fn call(
    ctx: &mut CalcContext,
    name: &str,
    args: Vec<Value>,
    output: &mut String,
) -> Result<Value, CalcError> {
    let arity = |expected: usize| {
        if args.len() == expected {
            Ok(())
        } else {
            Err(CalcError::Arity {
                name: name.to_string(),
                expected,
                actual: args.len(),
            })
        }
    };

    match name {
        "print" => {
            let line: Vec<String> = args.iter().map(ToString::to_string).collect();
            output.push_str(&line.join(" "));
            output.push('\n');
            Ok(Value::None)
        }
        "random" => {
            arity(0)?;
            Ok(Value::Float(ctx.rng.random::<f64>()))
        }
        "len" => {
            arity(1)?;
            match &args[0] {
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                other => Err(CalcError::Type(format!(
                    "object of type '{}' has no len()",
                    other.type_name()
                ))),
            }
        }
        "str" => {
            arity(1)?;
            Ok(Value::Str(args[0].to_string()))
        }
        "html" | "svg" | "markdown" => {
            arity(1)?;
            let Value::Str(markup) = &args[0] else {
                return Err(CalcError::Type(format!(
                    "{name}() expects a string, got '{}'",
                    args[0].type_name()
                )));
            };
            let rich = match name {
                "html" => RichValue::html(markup.clone()),
                "svg" => RichValue::svg(markup.clone()),
                _ => RichValue::markdown(markup.clone()),
            };
            Ok(Value::Rich(rich))
        }
        "fail" => {
            let message: Vec<String> = args.iter().map(ToString::to_string).collect();
            Err(CalcError::Raised(message.join(" ")))
        }
        _ => Err(CalcError::UnknownFunction(name.to_string())),
    }
}
