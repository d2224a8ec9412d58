use std::{cell::RefCell, fmt, rc::Rc};

use crate::host::HostObject;

/// A list shared by every binding that holds it.
pub type ListRef = Rc<RefCell<Vec<Value>>>;

/// An opaque object owned by a host module.
pub type HostRef = Rc<RefCell<dyn HostObject>>;

#[derive(Debug, Clone)]
pub enum Value {
    /// Result of a call that returns nothing.
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(ListRef),
    Host(HostRef),
}

impl Value {
    pub fn list(values: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(values)))
    }

    pub fn host(object: impl HostObject + 'static) -> Self {
        Value::Host(Rc::new(RefCell::new(object)))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Unit => "void",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Host(_) => "object",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Unit => false,
            Value::Bool(value) => *value,
            Value::Int(number) => *number != 0,
            Value::Float(number) => *number != 0.0,
            Value::String(string) => !string.is_empty(),
            Value::List(list) => !list.borrow().is_empty(),
            Value::Host(_) => true,
        }
    }

    /// A copy of the list's current elements.
    pub fn snapshot(&self) -> Option<Vec<Value>> {
        match self {
            Value::List(list) => Some(list.borrow().clone()),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(left), Value::Bool(right)) => left == right,
            (Value::Int(left), Value::Int(right)) => left == right,
            (Value::Float(left), Value::Float(right)) => left == right,
            (Value::Int(left), Value::Float(right)) | (Value::Float(right), Value::Int(left)) => {
                *left as f64 == *right
            }
            (Value::String(left), Value::String(right)) => left == right,
            // a list already being compared is inside itself; such lists
            // are equal only by identity
            (Value::List(left), Value::List(right)) => {
                Rc::ptr_eq(left, right)
                    || match (left.try_borrow_mut(), right.try_borrow_mut()) {
                        (Ok(left), Ok(right)) => *left == *right,
                        _ => false,
                    }
            }
            (Value::Host(left), Value::Host(right)) => Rc::ptr_eq(left, right),
            _ => false, // values of different kinds are never equal
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

pub(crate) fn format_float(number: f64) -> String {
    if number.is_finite() && number.fract() == 0.0 {
        format!("{:.1}", number)
    } else {
        format!("{}", number)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "void"),
            Value::Bool(value) => write!(f, "{}", value),
            Value::Int(number) => write!(f, "{}", number),
            Value::Float(number) => write!(f, "{}", format_float(*number)),
            Value::String(string) => write!(f, "{}", string),
            // an exclusive borrow marks the value as being rendered, so a
            // value that contains itself renders the inner reference as a
            // placeholder
            Value::List(list) => {
                let elements = match list.try_borrow_mut() {
                    Ok(elements) => elements,
                    Err(_) => return write!(f, "[...]"),
                };
                write!(f, "[")?;
                for (i, value) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match value {
                        Value::String(string) => write!(f, "\"{}\"", string)?,
                        other => write!(f, "{}", other)?,
                    }
                }
                write!(f, "]")
            }
            Value::Host(object) => match object.try_borrow_mut() {
                Ok(object) => write!(f, "{}", object.render()),
                Err(_) => write!(f, "<object>"),
            },
        }
    }
}
