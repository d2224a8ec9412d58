use std::{cell::Cell, collections::HashMap, rc::Rc};

use super::{
    error::{RuntimeError, RuntimeResult},
    value::Value,
};
use crate::common::Position;

/// Variables of one function activation (or lambda body).
#[derive(Debug, Clone, Default)]
pub struct Frame {
    variables: HashMap<String, Value>,
    /// Number of `while` loops currently executing in this frame.
    loop_depth: usize,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: String, value: Value) {
        self.variables.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }
}

/// The call stack. Only the innermost frame is visible to a running body.
#[derive(Debug, Clone, Default)]
pub struct ScopeStack {
    stack: Vec<Frame>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    pub fn nest(&mut self, frame: Frame) {
        self.stack.push(frame);
    }

    pub fn unnest(&mut self) -> Frame {
        self.stack.pop().unwrap_or_default()
    }

    /// A copy of the innermost frame's variables, outside of any loop.
    pub fn fork(&self) -> Frame {
        Frame {
            variables: self
                .stack
                .last()
                .map(|frame| frame.variables.clone())
                .unwrap_or_default(),
            loop_depth: 0,
        }
    }

    pub fn insert(&mut self, name: String, value: Value) {
        if let Some(frame) = self.stack.last_mut() {
            frame.insert(name, value);
        } else {
            let mut frame = Frame::new();
            frame.insert(name, value);
            self.stack.push(frame);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.stack.last().and_then(|frame| frame.get(name))
    }

    pub fn enter_loop(&mut self) {
        if let Some(frame) = self.stack.last_mut() {
            frame.loop_depth += 1;
        }
    }

    pub fn exit_loop(&mut self) {
        if let Some(frame) = self.stack.last_mut() {
            frame.loop_depth = frame.loop_depth.saturating_sub(1);
        }
    }

    pub fn in_loop(&self) -> bool {
        self.stack
            .last()
            .map_or(false, |frame| frame.loop_depth > 0)
    }
}

/// Number of user-function activations in progress, shared between an
/// interpreter and every evaluation it starts.
#[derive(Debug, Clone, Default)]
pub struct DepthCounter(Rc<Cell<usize>>);

impl DepthCounter {
    pub fn current(&self) -> usize {
        self.0.get()
    }

    /// Claims one level of depth, released when the guard drops.
    pub fn enter(&self, limit: usize, position: Position) -> RuntimeResult<DepthGuard> {
        let depth = self.0.get();
        if depth >= limit {
            return Err(RuntimeError::RecursionLimitExceeded { limit, position });
        }
        self.0.set(depth + 1);
        Ok(DepthGuard(self.0.clone()))
    }
}

#[must_use]
#[derive(Debug)]
pub struct DepthGuard(Rc<Cell<usize>>);

impl Drop for DepthGuard {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}
