//! Operator semantics over runtime values.

use std::cmp::Ordering;

use super::{
    error::{RuntimeError, RuntimeResult},
    value::Value,
};
use crate::{
    ast::{BinaryOp, LogicalOp},
    common::Position,
};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(number) => number as f64,
            Number::Float(number) => number,
        }
    }
}

/// Ints and floats. With `bools`, `true`/`false` count as 1/0.
fn number(value: &Value, bools: bool) -> Option<Number> {
    match value {
        Value::Int(number) => Some(Number::Int(*number)),
        Value::Float(number) => Some(Number::Float(*number)),
        Value::Bool(value) if bools => Some(Number::Int(i64::from(*value))),
        _ => None,
    }
}

fn unsupported(op: BinaryOp, left: &Value, right: &Value, position: Position) -> RuntimeError {
    RuntimeError::UnsupportedOperandTypes {
        op: op.symbol(),
        left: left.kind_name(),
        right: right.kind_name(),
        position,
    }
}

fn stringify(number: Number) -> String {
    match number {
        Number::Int(number) => number.to_string(),
        Number::Float(number) => super::value::format_float(number),
    }
}

fn arithmetic(
    left: Number,
    right: Number,
    int: fn(i64, i64) -> Option<i64>,
    float: fn(f64, f64) -> f64,
    position: Position,
) -> RuntimeResult<Value> {
    match (left, right) {
        (Number::Int(left), Number::Int(right)) => int(left, right)
            .map(Value::Int)
            .ok_or(RuntimeError::IntegerOverflow { position }),
        (left, right) => Ok(Value::Float(float(left.as_f64(), right.as_f64()))),
    }
}

/// Fails once a computed string would exceed `max` bytes.
fn bounded(text: String, max: usize, position: Position) -> RuntimeResult<Value> {
    if text.len() > max {
        return Err(RuntimeError::StringTooLong { max, position });
    }
    Ok(Value::String(text))
}

fn repeat(text: &str, count: i64, max: usize, position: Position) -> RuntimeResult<Value> {
    let count = usize::try_from(count).unwrap_or(0);
    match text.len().checked_mul(count) {
        Some(length) if length <= max => Ok(Value::String(text.repeat(count))),
        _ => Err(RuntimeError::StringTooLong { max, position }),
    }
}

/// Applies `op`. Strings built by `+` and `*` are capped at
/// `max_string_length` bytes.
pub fn binary(
    op: BinaryOp,
    left: Value,
    right: Value,
    max_string_length: usize,
    position: Position,
) -> RuntimeResult<Value> {
    match op {
        BinaryOp::Sum => sum(left, right, max_string_length, position),
        BinaryOp::Sub => match (number(&left, true), number(&right, true)) {
            (Some(l), Some(r)) => arithmetic(l, r, i64::checked_sub, |l, r| l - r, position),
            _ => Err(unsupported(op, &left, &right, position)),
        },
        BinaryOp::Mul => match (&left, &right) {
            (Value::Int(count), Value::String(text)) | (Value::String(text), Value::Int(count)) => {
                repeat(text, *count, max_string_length, position)
            }
            _ => match (number(&left, true), number(&right, true)) {
                (Some(l), Some(r)) => arithmetic(l, r, i64::checked_mul, |l, r| l * r, position),
                _ => Err(unsupported(op, &left, &right, position)),
            },
        },
        BinaryOp::Div => divide(left, right, position),
        BinaryOp::Equal => Ok(Value::Bool(left == right)),
        BinaryOp::NotEqual => Ok(Value::Bool(left != right)),
        BinaryOp::Lesser | BinaryOp::LesserEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
            let ordering = compare(&left, &right)
                .ok_or_else(|| unsupported(op, &left, &right, position))?;
            Ok(Value::Bool(match (op, ordering) {
                (_, None) => false,
                (BinaryOp::Lesser, Some(ordering)) => ordering == Ordering::Less,
                (BinaryOp::LesserEqual, Some(ordering)) => ordering != Ordering::Greater,
                (BinaryOp::Greater, Some(ordering)) => ordering == Ordering::Greater,
                (_, Some(ordering)) => ordering != Ordering::Less,
            }))
        }
    }
}

fn sum(left: Value, right: Value, max: usize, position: Position) -> RuntimeResult<Value> {
    if let (Some(l), Some(r)) = (number(&left, false), number(&right, false)) {
        return arithmetic(l, r, i64::checked_add, |l, r| l + r, position);
    }

    match (&left, &right) {
        (Value::String(l), Value::String(r)) => bounded(format!("{}{}", l, r), max, position),
        (Value::String(text), other) => match number(other, false) {
            Some(number) => bounded(format!("{}{}", text, stringify(number)), max, position),
            None => Err(unsupported(BinaryOp::Sum, &left, &right, position)),
        },
        (other, Value::String(text)) => match number(other, false) {
            Some(number) => bounded(format!("{}{}", stringify(number), text), max, position),
            None => Err(unsupported(BinaryOp::Sum, &left, &right, position)),
        },
        (Value::List(l), Value::List(r)) => {
            let mut joined = l.borrow().clone();
            joined.extend(r.borrow().iter().cloned());
            Ok(Value::list(joined))
        }
        _ => Err(unsupported(BinaryOp::Sum, &left, &right, position)),
    }
}

fn divide(left: Value, right: Value, position: Position) -> RuntimeResult<Value> {
    // a zero divisor wins over mismatched operand types
    if matches!(right, Value::Int(0) | Value::Bool(false))
        || matches!(right, Value::Float(divisor) if divisor == 0.0)
    {
        return Err(RuntimeError::DivisionByZero { position });
    }

    match (number(&left, true), number(&right, true)) {
        (Some(l), Some(r)) => Ok(Value::Float(l.as_f64() / r.as_f64())),
        _ => Err(unsupported(BinaryOp::Div, &left, &right, position)),
    }
}

/// `None` when the kinds have no ordering, `Some(None)` when they do but the
/// values are unordered (NaN).
fn compare(left: &Value, right: &Value) -> Option<Option<Ordering>> {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => Some(Some(l.cmp(r))),
        (Value::String(l), Value::String(r)) => Some(Some(l.cmp(r))),
        (Value::Bool(l), Value::Bool(r)) => Some(Some(l.cmp(r))),
        _ => match (number(left, false), number(right, false)) {
            (Some(l), Some(r)) => Some(l.as_f64().partial_cmp(&r.as_f64())),
            _ => None,
        },
    }
}

/// Orders two numeric values; used by `sort`.
pub fn compare_numbers(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => Some(l.cmp(r)),
        _ => {
            let l = number(left, false)?.as_f64();
            let r = number(right, false)?.as_f64();
            l.partial_cmp(&r)
        }
    }
}

pub fn negate(value: Value, position: Position) -> RuntimeResult<Value> {
    match value {
        Value::Int(number) => number
            .checked_neg()
            .map(Value::Int)
            .ok_or(RuntimeError::IntegerOverflow { position }),
        Value::Float(number) => Ok(Value::Float(-number)),
        other => Err(RuntimeError::InvalidNegation {
            kind: other.kind_name(),
            position,
        }),
    }
}

/// One operand of an `and`/`or` chain, reduced to truth values.
#[derive(Debug, Clone, PartialEq)]
pub enum Truth {
    Bool(bool),
    /// A number's truthiness; cannot be broadcast over a mask.
    Number(bool),
    Mask(Vec<bool>),
}

impl Truth {
    pub fn from_value(value: &Value, op: LogicalOp, position: Position) -> RuntimeResult<Self> {
        let invalid = |kind| RuntimeError::InvalidLogicalOperand {
            op: op.symbol(),
            kind,
            position,
        };

        match value {
            Value::Bool(value) => Ok(Truth::Bool(*value)),
            Value::Int(_) | Value::Float(_) => Ok(Truth::Number(value.is_truthy())),
            Value::List(list) => list
                .borrow()
                .iter()
                .map(|element| match element {
                    Value::Bool(value) => Ok(*value),
                    other => Err(invalid(other.kind_name())),
                })
                .collect::<RuntimeResult<Vec<_>>>()
                .map(Truth::Mask),
            other => Err(invalid(other.kind_name())),
        }
    }

    /// Whether no further operand can change the chain's result.
    pub fn is_settled(&self, op: LogicalOp) -> bool {
        let target = op == LogicalOp::Or;
        match self {
            Truth::Bool(value) | Truth::Number(value) => *value == target,
            Truth::Mask(mask) => mask.iter().all(|value| *value == target),
        }
    }

    pub fn combine(self, other: Truth, op: LogicalOp, position: Position) -> RuntimeResult<Truth> {
        let apply = |l: bool, r: bool| match op {
            LogicalOp::And => l && r,
            LogicalOp::Or => l || r,
        };

        match (self, other) {
            (Truth::Mask(left), Truth::Mask(right)) => {
                if left.len() != right.len() {
                    return Err(RuntimeError::MaskLengthMismatch {
                        op: op.symbol(),
                        left: left.len(),
                        right: right.len(),
                        position,
                    });
                }
                Ok(Truth::Mask(
                    left.iter().zip(&right).map(|(l, r)| apply(*l, *r)).collect(),
                ))
            }
            (Truth::Mask(mask), Truth::Bool(scalar)) | (Truth::Bool(scalar), Truth::Mask(mask)) => {
                Ok(Truth::Mask(mask.iter().map(|value| apply(*value, scalar)).collect()))
            }
            (Truth::Mask(_), Truth::Number(_)) | (Truth::Number(_), Truth::Mask(_)) => {
                Err(RuntimeError::InvalidLogicalOperand {
                    op: op.symbol(),
                    kind: "number mixed with a boolean list",
                    position,
                })
            }
            (Truth::Bool(l) | Truth::Number(l), Truth::Bool(r) | Truth::Number(r)) => {
                Ok(Truth::Bool(apply(l, r)))
            }
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Truth::Bool(value) | Truth::Number(value) => Value::Bool(value),
            Truth::Mask(mask) => Value::list(mask.into_iter().map(Value::Bool).collect()),
        }
    }
}
