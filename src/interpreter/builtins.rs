use std::{
    cmp::Ordering,
    fmt,
    io::{BufRead, Write},
};

use unicode_segmentation::UnicodeSegmentation;

use super::{
    error::{RuntimeError, RuntimeResult},
    eval::Evaluator,
    ops,
    value::{ListRef, Value},
};
use crate::{ast::LambdaExpression, common::Position};

type EagerFn = fn(&mut Evaluator<'_>, Vec<Value>, Position) -> RuntimeResult<Value>;
type IterationFn = fn(&mut Evaluator<'_>, Vec<Value>, &LambdaExpression) -> RuntimeResult<Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtMost(usize),
    Any,
}

impl Arity {
    fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exactly(n) => count == n,
            Arity::AtMost(n) => count <= n,
            Arity::Any => true,
        }
    }

    fn bound(self) -> usize {
        match self {
            Arity::Exactly(n) | Arity::AtMost(n) => n,
            Arity::Any => 0,
        }
    }
}

#[derive(Clone, Copy)]
pub enum Convention {
    /// Receives its evaluated arguments.
    Eager(Arity, EagerFn),
    /// Receives the elements of the receiver list and a lambda to run per element.
    Iteration(IterationFn),
}

#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub convention: Convention,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("call", &"<function pointer>".to_string())
            .finish()
    }
}

impl Builtin {
    pub fn check_arity(&self, count: usize, position: Position) -> RuntimeResult<()> {
        match self.convention {
            Convention::Eager(arity, _) if !arity.accepts(count) => {
                Err(RuntimeError::ArityMismatch {
                    name: self.name.to_string(),
                    expected: arity.bound(),
                    found: count,
                    position,
                })
            }
            _ => Ok(()),
        }
    }
}

const BUILTINS: &[Builtin] = &[
    // print(values...): void
    Builtin {
        name: "print",
        convention: Convention::Eager(Arity::Any, print),
    },
    // scan(prompt?): string
    Builtin {
        name: "scan",
        convention: Convention::Eager(Arity::AtMost(1), scan),
    },
    Builtin {
        name: "to_bool",
        convention: Convention::Eager(Arity::Exactly(1), to_bool),
    },
    Builtin {
        name: "to_int",
        convention: Convention::Eager(Arity::Exactly(1), to_int),
    },
    Builtin {
        name: "to_float",
        convention: Convention::Eager(Arity::Exactly(1), to_float),
    },
    // append(list, value): void
    Builtin {
        name: "append",
        convention: Convention::Eager(Arity::Exactly(2), append),
    },
    // remove(list, index): void
    Builtin {
        name: "remove",
        convention: Convention::Eager(Arity::Exactly(2), remove),
    },
    // sort(list): void
    Builtin {
        name: "sort",
        convention: Convention::Eager(Arity::Exactly(1), sort),
    },
    // get(list, index): value
    Builtin {
        name: "get",
        convention: Convention::Eager(Arity::Exactly(2), get),
    },
    // len(list | string): int
    Builtin {
        name: "len",
        convention: Convention::Eager(Arity::Exactly(1), len),
    },
    Builtin {
        name: "where",
        convention: Convention::Iteration(where_),
    },
    Builtin {
        name: "foreach",
        convention: Convention::Iteration(foreach),
    },
];

pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|builtin| builtin.name == name)
}

pub fn count() -> usize {
    BUILTINS.len()
}

fn invalid(function: &'static str, reason: impl Into<String>, position: Position) -> RuntimeError {
    RuntimeError::InvalidArgument {
        function,
        reason: reason.into(),
        position,
    }
}

fn expect_list(function: &'static str, value: &Value, position: Position) -> RuntimeResult<ListRef> {
    match value {
        Value::List(list) => Ok(list.clone()),
        other => Err(invalid(
            function,
            format!("expected a list but got {}", other.kind_name()),
            position,
        )),
    }
}

fn expect_index(
    function: &'static str,
    value: &Value,
    len: usize,
    position: Position,
) -> RuntimeResult<usize> {
    let index = match value {
        Value::Int(index) => *index,
        other => {
            return Err(invalid(
                function,
                format!("index must be an int, not {}", other.kind_name()),
                position,
            ))
        }
    };

    usize::try_from(index)
        .ok()
        .filter(|index| *index < len)
        .ok_or(RuntimeError::IndexOutOfRange {
            index,
            len,
            position,
        })
}

fn io_error(err: std::io::Error, position: Position) -> RuntimeError {
    RuntimeError::Io {
        message: err.to_string(),
        position,
    }
}

fn print(evaluator: &mut Evaluator<'_>, args: Vec<Value>, position: Position) -> RuntimeResult<Value> {
    let line = args
        .iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(evaluator.output, "{}", line).map_err(|err| io_error(err, position))?;
    Ok(Value::Unit)
}

fn scan(evaluator: &mut Evaluator<'_>, args: Vec<Value>, position: Position) -> RuntimeResult<Value> {
    if let Some(prompt) = args.first() {
        writeln!(evaluator.output, "{}", prompt).map_err(|err| io_error(err, position))?;
        evaluator
            .output
            .flush()
            .map_err(|err| io_error(err, position))?;
    }

    let mut line = String::new();
    evaluator
        .input
        .read_line(&mut line)
        .map_err(|err| io_error(err, position))?;
    let trimmed = line.trim_end_matches(|c| c == '\n' || c == '\r').len();
    line.truncate(trimmed);
    Ok(Value::String(line))
}

/// Applies `convert` to a scalar, or to every element of a list.
fn element_wise(
    value: &Value,
    convert: &dyn Fn(&Value) -> RuntimeResult<Value>,
) -> RuntimeResult<Value> {
    match value {
        Value::List(list) => {
            let converted = list
                .borrow()
                .iter()
                .map(convert)
                .collect::<RuntimeResult<Vec<_>>>()?;
            Ok(Value::list(converted))
        }
        other => convert(other),
    }
}

fn to_bool(_: &mut Evaluator<'_>, args: Vec<Value>, _: Position) -> RuntimeResult<Value> {
    element_wise(&args[0], &|value: &Value| Ok(Value::Bool(value.is_truthy())))
}

fn to_int(_: &mut Evaluator<'_>, args: Vec<Value>, position: Position) -> RuntimeResult<Value> {
    element_wise(&args[0], &|value: &Value| match value {
        Value::Int(number) => Ok(Value::Int(*number)),
        Value::Bool(value) => Ok(Value::Int(i64::from(*value))),
        Value::Float(number) => {
            let truncated = number.trunc();
            if truncated.is_finite() && truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
                Ok(Value::Int(truncated as i64))
            } else {
                Err(invalid("to_int", format!("{} does not fit an int", number), position))
            }
        }
        Value::String(text) => text.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            invalid("to_int", format!("\"{}\" is not an integer", text), position)
        }),
        other => Err(invalid(
            "to_int",
            format!("cannot convert {} to int", other.kind_name()),
            position,
        )),
    })
}

fn to_float(_: &mut Evaluator<'_>, args: Vec<Value>, position: Position) -> RuntimeResult<Value> {
    element_wise(&args[0], &|value: &Value| match value {
        Value::Int(number) => Ok(Value::Float(*number as f64)),
        Value::Float(number) => Ok(Value::Float(*number)),
        Value::Bool(value) => Ok(Value::Float(if *value { 1.0 } else { 0.0 })),
        Value::String(text) => text.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            invalid("to_float", format!("\"{}\" is not a number", text), position)
        }),
        other => Err(invalid(
            "to_float",
            format!("cannot convert {} to float", other.kind_name()),
            position,
        )),
    })
}

fn append(_: &mut Evaluator<'_>, mut args: Vec<Value>, position: Position) -> RuntimeResult<Value> {
    let list = expect_list("append", &args[0], position)?;
    let value = args.remove(1);
    list.borrow_mut().push(value);
    Ok(Value::Unit)
}

fn remove(_: &mut Evaluator<'_>, args: Vec<Value>, position: Position) -> RuntimeResult<Value> {
    let list = expect_list("remove", &args[0], position)?;
    let len = list.borrow().len();
    let index = expect_index("remove", &args[1], len, position)?;
    list.borrow_mut().remove(index);
    Ok(Value::Unit)
}

fn sort(_: &mut Evaluator<'_>, args: Vec<Value>, position: Position) -> RuntimeResult<Value> {
    let list = expect_list("sort", &args[0], position)?;
    let mut elements = list.borrow_mut();
    if let Some(other) = elements
        .iter()
        .find(|value| !matches!(value, Value::Int(_) | Value::Float(_)))
    {
        return Err(invalid(
            "sort",
            format!("list contains a non-numeric {}", other.kind_name()),
            position,
        ));
    }
    elements.sort_by(|l, r| ops::compare_numbers(l, r).unwrap_or(Ordering::Equal));
    Ok(Value::Unit)
}

fn get(_: &mut Evaluator<'_>, args: Vec<Value>, position: Position) -> RuntimeResult<Value> {
    let list = expect_list("get", &args[0], position)?;
    let elements = list.borrow();
    let index = expect_index("get", &args[1], elements.len(), position)?;
    Ok(elements[index].clone())
}

fn len(_: &mut Evaluator<'_>, args: Vec<Value>, position: Position) -> RuntimeResult<Value> {
    let len = match &args[0] {
        Value::List(list) => list.borrow().len(),
        Value::String(text) => text.graphemes(true).count(),
        other => {
            return Err(invalid(
                "len",
                format!("{} has no length", other.kind_name()),
                position,
            ))
        }
    };
    Ok(Value::Int(len as i64))
}

/// Elements for which the lambda returns a truthy value.
fn where_(
    evaluator: &mut Evaluator<'_>,
    items: Vec<Value>,
    lambda: &LambdaExpression,
) -> RuntimeResult<Value> {
    let mut kept = Vec::new();
    for item in items {
        let (returned, _) = evaluator.run_lambda(lambda, item.clone())?;
        if returned.map_or(false, |value| value.is_truthy()) {
            kept.push(item);
        }
    }
    Ok(Value::list(kept))
}

/// The value of the lambda's variable after its body ran, per element.
fn foreach(
    evaluator: &mut Evaluator<'_>,
    items: Vec<Value>,
    lambda: &LambdaExpression,
) -> RuntimeResult<Value> {
    let mut mapped = Vec::with_capacity(items.len());
    for item in items {
        let (_, bound) = evaluator.run_lambda(lambda, item)?;
        mapped.push(bound);
    }
    Ok(Value::list(mapped))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name() {
        assert_eq!(lookup("append").map(|builtin| builtin.name), Some("append"));
        assert!(matches!(
            lookup("where").map(|builtin| builtin.convention),
            Some(Convention::Iteration(_))
        ));
        assert!(lookup("main").is_none());
        assert_eq!(count(), 12);
    }

    #[test]
    fn arity_checks() {
        let position = Position::default();
        let scan = lookup("scan").unwrap();
        assert!(scan.check_arity(0, position).is_ok());
        assert!(scan.check_arity(1, position).is_ok());
        assert!(matches!(
            scan.check_arity(2, position),
            Err(RuntimeError::ArityMismatch { expected: 1, found: 2, .. })
        ));
        assert!(lookup("print").unwrap().check_arity(7, position).is_ok());
    }

    #[test]
    fn indexes_are_bounds_checked() {
        let position = Position::default();
        assert_eq!(expect_index("get", &Value::Int(2), 3, position), Ok(2));
        assert!(matches!(
            expect_index("get", &Value::Int(3), 3, position),
            Err(RuntimeError::IndexOutOfRange { index: 3, len: 3, .. })
        ));
        assert!(matches!(
            expect_index("get", &Value::Int(-1), 3, position),
            Err(RuntimeError::IndexOutOfRange { index: -1, .. })
        ));
        assert!(matches!(
            expect_index("get", &Value::from("0"), 3, position),
            Err(RuntimeError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn conversions_apply_to_each_element() {
        let list = Value::list(vec![Value::Int(0), Value::from("x")]);
        let converted = element_wise(&list, &|value: &Value| Ok(Value::Bool(value.is_truthy()))).unwrap();
        assert_eq!(
            converted,
            Value::list(vec![Value::Bool(false), Value::Bool(true)])
        );
    }
}
