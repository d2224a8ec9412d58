use std::{
    collections::HashMap,
    io::{BufRead, Write},
    rc::Rc,
};

use tracing::trace;

use super::{
    builtins::{self, Builtin, Convention},
    error::{RuntimeError, RuntimeResult},
    ops::{self, Truth},
    scope::{DepthCounter, Frame, ScopeStack},
    value::Value,
};
use crate::{
    ast::{
        Assignment, CallArguments, Expression, ExpressionKind, FunctionCall, FunctionDefinition,
        Identifier, LambdaExpression, Literal, LogicalExpr, LogicalOp, NegationKind, Program, Statement,
        StatementKind, Statements, WhileStatement,
    },
    common::Position,
    config::Limits,
    host::HostSymbol,
    stack::ensure_sufficient_stack,
};

fn object_in_use(position: Position) -> RuntimeError {
    RuntimeError::HostFailure {
        message: "object is already in use".to_string(),
        position,
    }
}

/// What a statement asks of the block executing it.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Continue,
    Return(Value),
    Break,
}

/// Walks one program, from `main` down.
pub struct Evaluator<'a> {
    program: &'a Program,
    hosts: HashMap<String, HostSymbol>,
    scopes: ScopeStack,
    depth: DepthCounter,
    limits: Limits,
    pub(super) output: &'a mut dyn Write,
    pub(super) input: &'a mut dyn BufRead,
}

impl<'a> Evaluator<'a> {
    pub(super) fn new(
        program: &'a Program,
        hosts: HashMap<String, HostSymbol>,
        limits: Limits,
        depth: DepthCounter,
        output: &'a mut dyn Write,
        input: &'a mut dyn BufRead,
    ) -> Self {
        Evaluator {
            program,
            hosts,
            scopes: ScopeStack::new(),
            depth,
            limits,
            output,
            input,
        }
    }

    /// Runs `main`, returning what it returned (`Unit` if nothing).
    pub(super) fn run_main(&mut self, main: &'a FunctionDefinition) -> RuntimeResult<Value> {
        let _guard = self
            .depth
            .enter(self.limits.max_recursion_depth, main.position)?;

        self.scopes.nest(Frame::new());
        let flow = self.execute_block(&main.body);
        self.scopes.unnest();

        match flow? {
            Flow::Return(value) => Ok(value),
            Flow::Continue | Flow::Break => Ok(Value::Unit),
        }
    }

    fn execute_block(&mut self, block: &Statements) -> RuntimeResult<Flow> {
        for statement in &block.statements {
            match ensure_sufficient_stack(|| self.execute(statement))? {
                Flow::Continue => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Continue)
    }

    fn execute(&mut self, statement: &Statement) -> RuntimeResult<Flow> {
        match &statement.kind {
            StatementKind::If(if_statement) => {
                if self.evaluate(&if_statement.condition)?.is_truthy() {
                    self.execute_block(&if_statement.then_block)
                } else if let Some(else_block) = &if_statement.else_block {
                    self.execute_block(else_block)
                } else {
                    Ok(Flow::Continue)
                }
            }
            StatementKind::While(while_statement) => {
                self.scopes.enter_loop();
                let flow = self.execute_while(while_statement);
                self.scopes.exit_loop();
                flow
            }
            StatementKind::Break => {
                if self.scopes.in_loop() {
                    Ok(Flow::Break)
                } else {
                    Err(RuntimeError::BreakOutsideLoop {
                        position: statement.position,
                    })
                }
            }
            StatementKind::Return(return_statement) => {
                let value = match &return_statement.value {
                    Some(expression) => self.evaluate(expression)?,
                    None => Value::Unit,
                };
                Ok(Flow::Return(value))
            }
            StatementKind::Assignment(assignment) => {
                self.assign(assignment, statement.position)?;
                Ok(Flow::Continue)
            }
            StatementKind::Call(call) => {
                self.call(call)?;
                Ok(Flow::Continue)
            }
        }
    }

    fn execute_while(&mut self, while_statement: &WhileStatement) -> RuntimeResult<Flow> {
        while self.evaluate(&while_statement.condition)?.is_truthy() {
            match self.execute_block(&while_statement.block)? {
                Flow::Continue => {}
                Flow::Break => break,
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        Ok(Flow::Continue)
    }

    fn assign(&mut self, assignment: &Assignment, position: Position) -> RuntimeResult<()> {
        let target = &assignment.target;
        let owner = match &target.parent {
            Some(parent) => Some(self.evaluate(parent)?),
            None => None,
        };
        let value = self.evaluate(&assignment.value)?;

        match owner {
            None => {
                self.scopes.insert(target.name.clone(), value);
                Ok(())
            }
            Some(Value::Host(object)) => {
                let mut object = object
                    .try_borrow_mut()
                    .map_err(|_| object_in_use(position))?;
                if object.set(&target.name, value) {
                    Ok(())
                } else {
                    Err(RuntimeError::MissingHostMember {
                        owner: object.type_name().to_string(),
                        name: target.name.clone(),
                        position,
                    })
                }
            }
            Some(other) => Err(RuntimeError::NotAnObject {
                name: target.name.clone(),
                kind: other.kind_name(),
                position,
            }),
        }
    }

    fn evaluate(&mut self, expression: &Expression) -> RuntimeResult<Value> {
        ensure_sufficient_stack(|| self.evaluate_kind(&expression.kind, expression.position))
    }

    fn evaluate_kind(&mut self, kind: &ExpressionKind, position: Position) -> RuntimeResult<Value> {
        match kind {
            ExpressionKind::Logical(logical) => self.evaluate_logical(logical, position),
            ExpressionKind::Binary(binary) => {
                let left = self.evaluate(&binary.left)?;
                let right = self.evaluate(&binary.right)?;
                ops::binary(
                    binary.op,
                    left,
                    right,
                    self.limits.max_string_length,
                    position,
                )
            }
            ExpressionKind::Negation(negation) => {
                let operand = self.evaluate(&negation.operand)?;
                match negation.kind {
                    NegationKind::Logical => Ok(Value::Bool(!operand.is_truthy())),
                    NegationKind::Arithmetic => ops::negate(operand, position),
                }
            }
            ExpressionKind::Literal(literal) => Ok(match literal {
                Literal::Bool(value) => Value::Bool(*value),
                Literal::Int(value) => Value::Int(*value),
                Literal::Float(value) => Value::Float(*value),
                Literal::String(value) => Value::String(value.clone()),
            }),
            ExpressionKind::Array(array) => {
                let elements = array
                    .elements
                    .iter()
                    .map(|element| self.evaluate(element))
                    .collect::<RuntimeResult<Vec<_>>>()?;
                Ok(Value::list(elements))
            }
            ExpressionKind::Identifier(identifier) => self.read(identifier, position),
            ExpressionKind::Call(call) => self.call(call),
        }
    }

    fn evaluate_logical(&mut self, logical: &LogicalExpr, position: Position) -> RuntimeResult<Value> {
        let op = logical.op;
        let mut operands = logical.operands.iter();

        let mut truth = match operands.next() {
            Some(first) => Truth::from_value(&self.evaluate(first)?, op, position)?,
            None => return Ok(Value::Bool(op == LogicalOp::And)),
        };
        for operand in operands {
            if truth.is_settled(op) {
                break;
            }
            let next = Truth::from_value(&self.evaluate(operand)?, op, operand.position)?;
            truth = truth.combine(next, op, position)?;
        }

        Ok(truth.into_value())
    }

    fn read(&mut self, identifier: &Identifier, position: Position) -> RuntimeResult<Value> {
        if let Some(parent) = &identifier.parent {
            return match self.evaluate(parent)? {
                Value::Host(object) => {
                    let object = object.try_borrow().map_err(|_| object_in_use(position))?;
                    object
                        .get(&identifier.name)
                        .ok_or_else(|| RuntimeError::MissingHostMember {
                            owner: object.type_name().to_string(),
                            name: identifier.name.clone(),
                            position,
                        })
                }
                other => Err(RuntimeError::NotAnObject {
                    name: identifier.name.clone(),
                    kind: other.kind_name(),
                    position,
                }),
            };
        }

        if let Some(value) = self.scopes.get(&identifier.name) {
            return Ok(value.clone());
        }
        match self.hosts.get(&identifier.name) {
            Some(HostSymbol::Value(value)) => Ok(value.clone()),
            _ => Err(RuntimeError::UndefinedVariable {
                name: identifier.name.clone(),
                position,
            }),
        }
    }

    fn argument_expressions<'c>(&self, call: &'c FunctionCall) -> RuntimeResult<&'c [Expression]> {
        match &call.arguments {
            CallArguments::Values(values) => Ok(values.as_slice()),
            CallArguments::Lambda(_) => Err(RuntimeError::UnexpectedLambda {
                name: call.name.clone(),
                position: call.position,
            }),
        }
    }

    fn evaluate_arguments(&mut self, call: &FunctionCall) -> RuntimeResult<Vec<Value>> {
        self.argument_expressions(call)?
            .iter()
            .map(|argument| self.evaluate(argument))
            .collect()
    }

    fn call(&mut self, call: &FunctionCall) -> RuntimeResult<Value> {
        if let Some(parent) = &call.parent {
            let receiver = self.evaluate(parent)?;
            return self.call_method(receiver, call);
        }

        let program = self.program;
        if let Some(function) = program.functions.get(&call.name) {
            return self.call_function(function, call);
        }
        if let Some(builtin) = builtins::lookup(&call.name) {
            return self.call_builtin(builtin, None, call);
        }

        match self.hosts.get(&call.name).cloned() {
            Some(HostSymbol::Class(class)) => {
                let args = self.evaluate_arguments(call)?;
                class
                    .construct(args)
                    .map_err(|message| RuntimeError::HostFailure {
                        message,
                        position: call.position,
                    })
            }
            _ => Err(RuntimeError::FunctionDoesNotExist {
                name: call.name.clone(),
                position: call.position,
            }),
        }
    }

    /// `receiver.name(...)`: a host method, or a built-in taking the receiver first.
    fn call_method(&mut self, receiver: Value, call: &FunctionCall) -> RuntimeResult<Value> {
        let object = match receiver {
            Value::Host(object) => object,
            other => {
                return match builtins::lookup(&call.name) {
                    Some(builtin) => self.call_builtin(builtin, Some(other), call),
                    None => Err(RuntimeError::FunctionDoesNotExist {
                        name: call.name.clone(),
                        position: call.position,
                    }),
                }
            }
        };

        let args = self.evaluate_arguments(call)?;
        let mut target = object
            .try_borrow_mut()
            .map_err(|_| object_in_use(call.position))?;
        let result = target.call(&call.name, args);
        match result {
            Some(result) => result.map_err(|message| RuntimeError::HostFailure {
                message,
                position: call.position,
            }),
            None => Err(RuntimeError::MissingHostMember {
                owner: target.type_name().to_string(),
                name: call.name.clone(),
                position: call.position,
            }),
        }
    }

    fn call_builtin(
        &mut self,
        builtin: &Builtin,
        receiver: Option<Value>,
        call: &FunctionCall,
    ) -> RuntimeResult<Value> {
        match builtin.convention {
            Convention::Eager(_, function) => {
                let mut args = receiver.into_iter().collect::<Vec<_>>();
                args.extend(self.evaluate_arguments(call)?);
                builtin.check_arity(args.len(), call.position)?;
                function(self, args, call.position)
            }
            Convention::Iteration(function) => {
                let lambda = match &call.arguments {
                    CallArguments::Lambda(lambda) => lambda,
                    CallArguments::Values(_) => {
                        return Err(RuntimeError::ExpectedLambda {
                            name: call.name.clone(),
                            position: call.position,
                        })
                    }
                };
                let items = match receiver.as_ref().and_then(Value::snapshot) {
                    Some(items) => items,
                    None => {
                        return Err(RuntimeError::InvalidArgument {
                            function: builtin.name,
                            reason: "must be called on a list".to_string(),
                            position: call.position,
                        })
                    }
                };
                function(self, items, lambda)
            }
        }
    }

    fn call_function(
        &mut self,
        function: &'a FunctionDefinition,
        call: &FunctionCall,
    ) -> RuntimeResult<Value> {
        let expressions = self.argument_expressions(call)?;
        let args = self.evaluate_arguments(call)?;
        if args.len() != function.parameters.len() {
            return Err(RuntimeError::ArityMismatch {
                name: function.name.clone(),
                expected: function.parameters.len(),
                found: args.len(),
                position: call.position,
            });
        }

        let _guard = self
            .depth
            .enter(self.limits.max_recursion_depth, call.position)
            .map_err(|err| {
                trace!(name = %function.name, "recursion limit reached");
                err
            })?;
        trace!(name = %function.name, depth = self.depth.current(), "call");

        let mut frame = Frame::new();
        for (parameter, value) in function.parameters.iter().zip(&args) {
            frame.insert(parameter.clone(), value.clone());
        }

        self.scopes.nest(frame);
        let flow = ensure_sufficient_stack(|| self.execute_block(&function.body));
        let frame = self.scopes.unnest();
        let flow = flow?;

        // a list parameter rebound to a different list is written back to the
        // caller's variable
        for ((parameter, value), expression) in function.parameters.iter().zip(&args).zip(expressions) {
            let (original, variable) = match (value, expression.as_variable()) {
                (Value::List(original), Some(variable)) => (original, variable),
                _ => continue,
            };
            if let Some(Value::List(rebound)) = frame.get(parameter) {
                if !Rc::ptr_eq(original, rebound) {
                    self.scopes
                        .insert(variable.to_string(), Value::List(rebound.clone()));
                }
            }
        }

        Ok(match flow {
            Flow::Return(value) => value,
            Flow::Continue | Flow::Break => Value::Unit,
        })
    }

    /// Runs a lambda body for one element in a private copy of the current
    /// frame. Returns what the body returned, if anything, and the final value
    /// of the lambda's variable.
    pub(super) fn run_lambda(
        &mut self,
        lambda: &LambdaExpression,
        item: Value,
    ) -> RuntimeResult<(Option<Value>, Value)> {
        let mut frame = self.scopes.fork();
        frame.insert(lambda.parameter.clone(), item);

        self.scopes.nest(frame);
        let flow = ensure_sufficient_stack(|| self.execute_block(&lambda.body));
        let frame = self.scopes.unnest();

        let returned = match flow? {
            Flow::Return(value) => Some(value),
            Flow::Continue | Flow::Break => None,
        };
        let bound = frame.get(&lambda.parameter).cloned().unwrap_or(Value::Unit);
        Ok((returned, bound))
    }
}
