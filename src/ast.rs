use std::collections::HashMap;

use derive_more::{From, TryInto};

use crate::common::Position;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub functions: HashMap<String, FunctionDefinition>,
    pub includes: Vec<IncludeStatement>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub parameters: Vec<String>,
    pub body: Statements,
    pub position: Position,
}

/// `from <module> import <name>, ...;`
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeStatement {
    pub module: String,
    pub names: Vec<String>,
    pub position: Position,
}

/// A non-empty `{ ... }` block.
#[derive(Debug, Clone, PartialEq)]
pub struct Statements {
    pub statements: Vec<Statement>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub condition: Expression,
    pub then_block: Statements,
    pub else_block: Option<Statements>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    pub condition: Expression,
    pub block: Statements,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    pub value: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: Identifier,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    If(IfStatement),
    While(WhileStatement),
    Break,
    Return(ReturnStatement),
    Assignment(Assignment),
    Call(FunctionCall),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Sum,
    Sub,
    Mul,
    Div,
    Equal,
    NotEqual,
    Lesser,
    LesserEqual,
    Greater,
    GreaterEqual,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Sum => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Lesser => "<",
            BinaryOp::LesserEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
        }
    }
}

/// An `a and b and c` / `a or b or c` chain; always at least two operands.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalExpr {
    pub op: LogicalOp,
    pub operands: Vec<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegationKind {
    /// `!x`
    Logical,
    /// `-x`
    Arithmetic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Negation {
    pub kind: NegationKind,
    pub operand: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayLiteral {
    pub elements: Vec<Expression>,
}

/// A name, optionally read off the value of `parent` (`parent.name`).
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub parent: Option<Box<Expression>>,
}

/// `$name => { ... }`, only ever an argument of a call.
#[derive(Debug, Clone, PartialEq)]
pub struct LambdaExpression {
    pub parameter: String,
    pub body: Statements,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallArguments {
    Values(Vec<Expression>),
    Lambda(LambdaExpression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: CallArguments,
    pub parent: Option<Box<Expression>>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, From, TryInto)]
pub enum ExpressionKind {
    Logical(LogicalExpr),
    Binary(BinaryExpr),
    Negation(Negation),
    Literal(Literal),
    Array(ArrayLiteral),
    Identifier(Identifier),
    Call(FunctionCall),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub position: Position,
}

impl Expression {
    pub fn new(kind: impl Into<ExpressionKind>, position: Position) -> Self {
        Expression {
            kind: kind.into(),
            position,
        }
    }

    /// The variable name when this is a bare, parentless identifier.
    pub fn as_variable(&self) -> Option<&str> {
        match &self.kind {
            ExpressionKind::Identifier(Identifier { name, parent: None }) => Some(name),
            _ => None,
        }
    }
}
