//! The boundary between scripts and objects provided by the embedding program.
//!
//! A script reaches host code only through `from <module> import <name>;`.
//! Each imported name resolves to a [`HostSymbol`]: either a class, which
//! scripts call to construct objects, or a plain value. Objects are opaque to
//! the interpreter, which reads, writes and invokes their members by name.

use std::{collections::HashMap, fmt, rc::Rc};

use dyn_clone::DynClone;

use crate::interpreter::Value;

pub mod school;

pub trait HostObject: fmt::Debug {
    fn type_name(&self) -> &str;

    /// Reads the attribute `name`, `None` if there is no such attribute.
    fn get(&self, name: &str) -> Option<Value>;

    /// Writes the attribute `name`, returning `false` if it cannot be set.
    fn set(&mut self, name: &str, value: Value) -> bool;

    /// Invokes the method `name`. `None` means there is no such method, an
    /// inner `Err` carries the method's own failure message.
    fn call(&mut self, name: &str, args: Vec<Value>) -> Option<Result<Value, String>>;

    fn render(&self) -> String {
        format!("<{} object>", self.type_name())
    }
}

pub trait HostClass: DynClone + fmt::Debug {
    fn name(&self) -> &str;

    fn construct(&self, args: Vec<Value>) -> Result<Value, String>;
}

dyn_clone::clone_trait_object!(HostClass);

#[derive(Debug, Clone)]
pub enum HostSymbol {
    Class(Box<dyn HostClass>),
    Value(Value),
}

pub trait HostModule: fmt::Debug {
    fn name(&self) -> &str;

    fn resolve(&self, symbol: &str) -> Option<HostSymbol>;
}

/// Host modules available to `from ... import`, by name.
#[derive(Debug, Clone, Default)]
pub struct HostRegistry {
    modules: HashMap<String, Rc<dyn HostModule>>,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `module`, replacing any module registered under the same name.
    pub fn register(&mut self, module: impl HostModule + 'static) {
        self.modules
            .insert(module.name().to_string(), Rc::new(module));
    }

    pub fn module(&self, name: &str) -> Option<&dyn HostModule> {
        self.modules.get(name).map(|module| &**module)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Checks the argument count of a host constructor or method.
pub fn expect_args(name: &str, args: &[Value], count: usize) -> Result<(), String> {
    if args.len() == count {
        Ok(())
    } else {
        Err(format!(
            "{} expects {} argument(s) but got {}",
            name,
            count,
            args.len()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::{school::School, *};

    #[test]
    fn registry_resolves_by_module_name() {
        let mut registry = HostRegistry::new();
        assert!(registry.is_empty());
        registry.register(School::new());

        let module = registry.module("school").unwrap();
        assert!(matches!(module.resolve("Student"), Some(HostSymbol::Class(_))));
        assert!(module.resolve("Teacher").is_none());
        assert!(registry.module("library").is_none());
    }

    #[test]
    fn classes_clone_through_the_trait_object() {
        let module = School::new();
        let class = match module.resolve("Student") {
            Some(HostSymbol::Class(class)) => class,
            other => panic!("expected a class, got {:?}", other),
        };
        let copy = class.clone();
        assert_eq!(copy.name(), "Student");
        assert!(copy
            .construct(vec![Value::from("Ada"), Value::Int(36)])
            .is_ok());
    }

    #[test]
    fn argument_count_is_reported() {
        assert!(expect_args("greet", &[], 0).is_ok());
        assert_eq!(
            expect_args("Student", &[Value::Int(1)], 2),
            Err("Student expects 2 argument(s) but got 1".to_string())
        );
    }
}
