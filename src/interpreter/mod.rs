//! Tree-walking evaluation of a parsed [`Program`].
//!
//! An [`Interpreter`] owns everything that outlives a single run: its limits,
//! the registered host modules, the console it talks to and the recursion
//! depth counter. [`Interpreter::run`] resolves the program's includes, then
//! executes `main` with a fresh call stack.
//!
//! Name lookup at a call site tries user functions first, then built-ins,
//! then imported host symbols. Lists are shared between bindings; a callee
//! that rebinds a list parameter to a different list has the new list written
//! back to the caller's variable when it returns.

use std::{
    collections::HashMap,
    io::{self, BufRead, BufReader, Write},
};

use tracing::debug;

use crate::{
    ast::Program,
    config::Limits,
    host::{HostModule, HostRegistry, HostSymbol},
};

mod builtins;
mod error;
mod eval;
mod ops;
mod scope;
mod value;

pub use error::{RuntimeError, RuntimeResult};
pub use eval::Flow;
pub use value::{HostRef, ListRef, Value};

use eval::Evaluator;
use scope::DepthCounter;

pub struct Interpreter {
    limits: Limits,
    registry: HostRegistry,
    depth: DepthCounter,
    output: Box<dyn Write>,
    input: Box<dyn BufRead>,
}

impl Interpreter {
    /// An interpreter on the process's stdin and stdout, with no host modules.
    pub fn new(limits: Limits) -> Self {
        Interpreter {
            limits,
            registry: HostRegistry::new(),
            depth: DepthCounter::default(),
            output: Box::new(io::stdout()),
            input: Box::new(BufReader::new(io::stdin())),
        }
    }

    pub fn with_module(mut self, module: impl HostModule + 'static) -> Self {
        self.registry.register(module);
        self
    }

    /// Sends `print` output to `output` and serves `scan` from `input`.
    pub fn with_io(mut self, input: impl BufRead + 'static, output: impl Write + 'static) -> Self {
        self.input = Box::new(input);
        self.output = Box::new(output);
        self
    }

    /// User-function activations currently in progress; zero between runs.
    pub fn depth(&self) -> usize {
        self.depth.current()
    }

    /// Runs `program`'s `main`, producing its return value. A `main` that
    /// returns nothing yields `0`.
    pub fn run(&mut self, program: &Program) -> RuntimeResult<Value> {
        let main = program
            .functions
            .get("main")
            .filter(|main| main.parameters.is_empty())
            .ok_or(RuntimeError::MainFunctionRequired)?;
        let hosts = self.resolve_includes(program)?;

        debug!(
            functions = program.functions.len(),
            builtins = builtins::count(),
            hosts = hosts.len(),
            "program loaded"
        );

        let result = {
            let mut evaluator = Evaluator::new(
                program,
                hosts,
                self.limits,
                self.depth.clone(),
                &mut *self.output,
                &mut *self.input,
            );
            evaluator.run_main(main)
        };
        // output printed before a failure is still delivered
        let flushed = self.output.flush().map_err(|err| RuntimeError::Io {
            message: err.to_string(),
            position: main.position,
        });
        let value = result?;
        flushed?;

        Ok(match value {
            Value::Unit => Value::Int(0),
            value => value,
        })
    }

    fn resolve_includes(&self, program: &Program) -> RuntimeResult<HashMap<String, HostSymbol>> {
        let mut hosts = HashMap::new();

        for include in &program.includes {
            let module = self.registry.module(&include.module).ok_or_else(|| {
                RuntimeError::UnknownModule {
                    module: include.module.clone(),
                    position: include.position,
                }
            })?;

            for name in &include.names {
                let symbol = module
                    .resolve(name)
                    .ok_or_else(|| RuntimeError::MissingHostMember {
                        owner: format!("module '{}'", include.module),
                        name: name.clone(),
                        position: include.position,
                    })?;
                debug!(module = %include.module, %name, "imported host symbol");
                hosts.insert(name.clone(), symbol);
            }
        }

        Ok(hosts)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new(Limits::default())
    }
}
