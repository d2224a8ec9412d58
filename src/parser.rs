use std::collections::HashMap;

use derive_more::Display;
use tracing::debug;

use crate::{
    ast::{
        ArrayLiteral, Assignment, BinaryExpr, BinaryOp, CallArguments, Expression,
        ExpressionKind, FunctionCall, FunctionDefinition, Identifier, IfStatement,
        IncludeStatement, LambdaExpression, Literal, LogicalExpr, LogicalOp, Negation,
        NegationKind, Program, ReturnStatement, Statement, StatementKind, Statements,
        WhileStatement,
    },
    common::Position,
    lexer::{LexError, Lexer},
    stack::ensure_sufficient_stack,
    token::{Expected, Token, TokenKind, TokenValue},
};

#[derive(Debug, Display, Clone, PartialEq)]
pub enum ParseError {
    #[display(fmt = "{}", _0)]
    Lex(LexError),
    #[display(fmt = "{}: expected {} but found {}", position, expected, found)]
    ExpectedToken {
        expected: Expected,
        found: TokenKind,
        position: Position,
    },
    #[display(fmt = "{}: expected an expression but found {}", position, found)]
    ExpectedExpression { found: TokenKind, position: Position },
    #[display(fmt = "{}: block must contain at least one statement", position)]
    EmptyBlock { position: Position },
    #[display(fmt = "{}: function '{}' is already defined", position, name)]
    DuplicateFunction { name: String, position: Position },
    #[display(fmt = "{}: parameter '{}' is declared twice", position, name)]
    DuplicateParameter { name: String, position: Position },
    #[display(fmt = "{}: expected an operand after 'or'", position)]
    InvalidOrExpression { position: Position },
    #[display(fmt = "{}: expected an operand after 'and'", position)]
    InvalidAndExpression { position: Position },
    #[display(fmt = "{}: expected an operand after the comparison", position)]
    InvalidLogicExpression { position: Position },
    #[display(fmt = "{}: comparisons cannot be chained", position)]
    ChainedComparison { position: Position },
    #[display(fmt = "{}: expected a term after '+' or '-'", position)]
    InvalidArithExpression { position: Position },
    #[display(fmt = "{}: expected a factor after '*' or '/'", position)]
    InvalidTerm { position: Position },
    #[display(fmt = "{}: expected an operand after the unary operator", position)]
    InvalidFactor { position: Position },
    #[display(fmt = "{}: '{}' requires a condition", position, construct)]
    MissingCondition {
        construct: &'static str,
        position: Position,
    },
    #[display(fmt = "{}: expected a name after '.' but found {}", position, found)]
    InvalidChain { found: TokenKind, position: Position },
    #[display(fmt = "{}: only a name can be assigned to", position)]
    InvalidAssignmentTarget { position: Position },
    #[display(fmt = "{}: nesting exceeds the limit of {} levels", position, max)]
    NestingTooDeep { max: usize, position: Position },
}

impl ParseError {
    pub fn position(&self) -> Position {
        match self {
            ParseError::Lex(err) => match err {
                LexError::NoViableToken { position, .. }
                | LexError::IdentifierTooLong { position, .. }
                | LexError::IntegerTooLarge { position, .. }
                | LexError::FloatTooLong { position, .. }
                | LexError::FloatMalformed { position }
                | LexError::UnterminatedString { position }
                | LexError::StringTooLong { position, .. } => *position,
            },
            ParseError::ExpectedToken { position, .. }
            | ParseError::ExpectedExpression { position, .. }
            | ParseError::EmptyBlock { position }
            | ParseError::DuplicateFunction { position, .. }
            | ParseError::DuplicateParameter { position, .. }
            | ParseError::InvalidOrExpression { position }
            | ParseError::InvalidAndExpression { position }
            | ParseError::InvalidLogicExpression { position }
            | ParseError::ChainedComparison { position }
            | ParseError::InvalidArithExpression { position }
            | ParseError::InvalidTerm { position }
            | ParseError::InvalidFactor { position }
            | ParseError::MissingCondition { position, .. }
            | ParseError::InvalidChain { position, .. }
            | ParseError::InvalidAssignmentTarget { position }
            | ParseError::NestingTooDeep { position, .. } => *position,
        }
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError::Lex(err)
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Lex(err) => Some(err),
            _ => None,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

fn binary_op(kind: TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Plus => Some(BinaryOp::Sum),
        TokenKind::Minus => Some(BinaryOp::Sub),
        TokenKind::Star => Some(BinaryOp::Mul),
        TokenKind::Slash => Some(BinaryOp::Div),
        TokenKind::EqualEqual => Some(BinaryOp::Equal),
        TokenKind::BangEqual => Some(BinaryOp::NotEqual),
        TokenKind::Lesser => Some(BinaryOp::Lesser),
        TokenKind::LesserEqual => Some(BinaryOp::LesserEqual),
        TokenKind::Greater => Some(BinaryOp::Greater),
        TokenKind::GreaterEqual => Some(BinaryOp::GreaterEqual),
        _ => None,
    }
}

/// Recursive-descent parser holding a single token of lookahead.
///
/// Every `parse_*` production returns `Ok(None)` when the lookahead cannot
/// start it, and an error once it has committed to the production and the
/// input stops matching.
#[derive(Debug, Clone)]
pub struct Parser {
    lexer: Lexer,
    current: Token,
    /// Blocks, parenthesized expressions and prefix operators currently open.
    depth: usize,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> ParseResult<Self> {
        let current = Self::next_significant(&mut lexer)?;
        Ok(Parser {
            lexer,
            current,
            depth: 0,
        })
    }

    /// Runs a production that may recurse into itself, bounded by the
    /// nesting limit and on a stack that grows as needed.
    fn nested<T>(&mut self, production: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        let max = self.lexer.limits().max_nesting_depth;
        if self.depth >= max {
            return Err(ParseError::NestingTooDeep {
                max,
                position: self.current.position,
            });
        }

        self.depth += 1;
        let result = ensure_sufficient_stack(|| production(self));
        self.depth -= 1;
        result
    }

    fn next_significant(lexer: &mut Lexer) -> ParseResult<Token> {
        loop {
            let token = lexer.next_token()?;
            if token.kind != TokenKind::Comment {
                return Ok(token);
            }
        }
    }

    /// Consumes the lookahead, returning it.
    fn advance(&mut self) -> ParseResult<Token> {
        let next = Self::next_significant(&mut self.lexer)?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn try_consume(&mut self, kind: TokenKind) -> ParseResult<Option<Token>> {
        if self.check(kind) {
            Ok(Some(self.advance()?))
        } else {
            Ok(None)
        }
    }

    fn must_be(&mut self, kind: TokenKind) -> ParseResult<Token> {
        self.must_be_one_of(&[kind])
    }

    fn must_be_one_of(&mut self, kinds: &[TokenKind]) -> ParseResult<Token> {
        if kinds.contains(&self.current.kind) {
            self.advance()
        } else {
            Err(self.unexpected(kinds))
        }
    }

    fn unexpected(&self, kinds: &[TokenKind]) -> ParseError {
        ParseError::ExpectedToken {
            expected: Expected(kinds.to_vec()),
            found: self.current.kind,
            position: self.current.position,
        }
    }

    fn expected_expression(&self) -> ParseError {
        ParseError::ExpectedExpression {
            found: self.current.kind,
            position: self.current.position,
        }
    }

    pub fn parse_program(&mut self) -> ParseResult<Program> {
        let position = self.current.position;
        let mut functions = HashMap::new();
        let mut includes = Vec::new();

        loop {
            if let Some(function) = self.parse_function_definition()? {
                if functions.contains_key(&function.name) {
                    return Err(ParseError::DuplicateFunction {
                        name: function.name,
                        position: function.position,
                    });
                }
                functions.insert(function.name.clone(), function);
            } else if let Some(include) = self.parse_include_statement()? {
                includes.push(include);
            } else {
                break;
            }
        }
        self.must_be_one_of(&[TokenKind::Def, TokenKind::From, TokenKind::Eof])?;

        debug!(
            functions = functions.len(),
            includes = includes.len(),
            "parsed program"
        );

        Ok(Program {
            functions,
            includes,
            position,
        })
    }

    fn parse_function_definition(&mut self) -> ParseResult<Option<FunctionDefinition>> {
        let def_token = match self.try_consume(TokenKind::Def)? {
            Some(token) => token,
            None => return Ok(None),
        };

        let name = self.must_be(TokenKind::Ident)?.into_text();
        self.must_be(TokenKind::LeftParen)?;
        let parameters = self.parse_parameters()?;
        self.must_be(TokenKind::RightParen)?;
        let body = self.parse_block()?;

        Ok(Some(FunctionDefinition {
            name,
            parameters,
            body,
            position: def_token.position,
        }))
    }

    fn parse_parameters(&mut self) -> ParseResult<Vec<String>> {
        let mut parameters = Vec::new();

        let first = match self.try_consume(TokenKind::Ident)? {
            Some(token) => token,
            None => return Ok(parameters),
        };
        parameters.push(first.into_text());

        while self.try_consume(TokenKind::Comma)?.is_some() {
            let token = self.must_be(TokenKind::Ident)?;
            let position = token.position;
            let name = token.into_text();
            if parameters.contains(&name) {
                return Err(ParseError::DuplicateParameter { name, position });
            }
            parameters.push(name);
        }

        Ok(parameters)
    }

    fn parse_include_statement(&mut self) -> ParseResult<Option<IncludeStatement>> {
        let from_token = match self.try_consume(TokenKind::From)? {
            Some(token) => token,
            None => return Ok(None),
        };

        let module = self.must_be(TokenKind::Ident)?.into_text();
        self.must_be(TokenKind::Import)?;

        let mut names = vec![self.must_be(TokenKind::Ident)?.into_text()];
        while self.try_consume(TokenKind::Comma)?.is_some() {
            names.push(self.must_be(TokenKind::Ident)?.into_text());
        }
        self.must_be(TokenKind::Semicolon)?;

        Ok(Some(IncludeStatement {
            module,
            names,
            position: from_token.position,
        }))
    }

    fn parse_block(&mut self) -> ParseResult<Statements> {
        self.nested(Self::parse_block_body)
    }

    fn parse_block_body(&mut self) -> ParseResult<Statements> {
        let open = self.must_be(TokenKind::LeftBrace)?;

        if self.check(TokenKind::RightBrace) {
            return Err(ParseError::EmptyBlock {
                position: open.position,
            });
        }

        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) {
            statements.push(self.parse_statement()?);
        }
        self.must_be(TokenKind::RightBrace)?;

        Ok(Statements {
            statements,
            position: open.position,
        })
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        let position = self.current.position;

        let kind = match self.current.kind {
            TokenKind::Return => self.parse_return_statement()?,
            TokenKind::If => StatementKind::If(self.parse_if_statement()?),
            TokenKind::While => self.parse_while_statement()?,
            TokenKind::Break => {
                self.advance()?;
                self.must_be(TokenKind::Semicolon)?;
                StatementKind::Break
            }
            TokenKind::Ident => self.parse_call_or_assignment()?,
            _ => {
                return Err(self.unexpected(&[
                    TokenKind::Return,
                    TokenKind::If,
                    TokenKind::While,
                    TokenKind::Break,
                    TokenKind::Ident,
                    TokenKind::RightBrace,
                ]))
            }
        };

        Ok(Statement { kind, position })
    }

    fn parse_return_statement(&mut self) -> ParseResult<StatementKind> {
        self.must_be(TokenKind::Return)?;

        let value = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.must_be(TokenKind::Semicolon)?;

        Ok(StatementKind::Return(ReturnStatement { value }))
    }

    fn parse_condition(&mut self, construct: &'static str) -> ParseResult<Expression> {
        self.must_be(TokenKind::LeftParen)?;
        if self.check(TokenKind::RightParen) {
            return Err(ParseError::MissingCondition {
                construct,
                position: self.current.position,
            });
        }
        let condition = self.parse_expression()?;
        self.must_be(TokenKind::RightParen)?;
        Ok(condition)
    }

    fn parse_if_statement(&mut self) -> ParseResult<IfStatement> {
        self.must_be(TokenKind::If)?;
        let condition = self.parse_condition("if")?;
        let then_block = self.parse_block()?;

        let else_block = if self.try_consume(TokenKind::Else)?.is_some() {
            if self.check(TokenKind::If) {
                // `else if` is an else block holding a single if statement
                let position = self.current.position;
                let nested = self.parse_if_statement()?;
                Some(Statements {
                    statements: vec![Statement {
                        kind: StatementKind::If(nested),
                        position,
                    }],
                    position,
                })
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };

        Ok(IfStatement {
            condition,
            then_block,
            else_block,
        })
    }

    fn parse_while_statement(&mut self) -> ParseResult<StatementKind> {
        self.must_be(TokenKind::While)?;
        let condition = self.parse_condition("while")?;
        let block = self.parse_block()?;
        Ok(StatementKind::While(WhileStatement { condition, block }))
    }

    fn parse_call_or_assignment(&mut self) -> ParseResult<StatementKind> {
        let chain = match self.parse_chained_expression()? {
            Some(chain) => chain,
            None => return Err(self.unexpected(&[TokenKind::Ident])),
        };

        if self.try_consume(TokenKind::Equal)?.is_some() {
            let position = chain.position;
            let target: Identifier = chain
                .kind
                .try_into()
                .map_err(|_| ParseError::InvalidAssignmentTarget { position })?;
            let value = self.parse_expression()?;
            self.must_be(TokenKind::Semicolon)?;
            return Ok(StatementKind::Assignment(Assignment { target, value }));
        }

        match chain.kind {
            ExpressionKind::Call(call) => {
                self.must_be(TokenKind::Semicolon)?;
                Ok(StatementKind::Call(call))
            }
            _ => Err(self.unexpected(&[TokenKind::Equal, TokenKind::LeftParen])),
        }
    }

    /// A required expression.
    fn parse_expression(&mut self) -> ParseResult<Expression> {
        match self.parse_or_expression()? {
            Some(expression) => Ok(expression),
            None => Err(self.expected_expression()),
        }
    }

    pub fn parse_or_expression(&mut self) -> ParseResult<Option<Expression>> {
        self.nested(|parser| {
            parser.parse_logical_chain(LogicalOp::Or, TokenKind::Or, Self::parse_and_expression)
        })
    }

    fn parse_and_expression(&mut self) -> ParseResult<Option<Expression>> {
        self.parse_logical_chain(LogicalOp::And, TokenKind::And, Self::parse_logic_expression)
    }

    fn parse_logical_chain(
        &mut self,
        op: LogicalOp,
        separator: TokenKind,
        operand: fn(&mut Self) -> ParseResult<Option<Expression>>,
    ) -> ParseResult<Option<Expression>> {
        let first = match operand(self)? {
            Some(first) => first,
            None => return Ok(None),
        };
        let position = first.position;

        let mut operands = vec![first];
        while self.try_consume(separator)?.is_some() {
            match operand(self)? {
                Some(next) => operands.push(next),
                None => {
                    let position = self.current.position;
                    return Err(match op {
                        LogicalOp::Or => ParseError::InvalidOrExpression { position },
                        LogicalOp::And => ParseError::InvalidAndExpression { position },
                    });
                }
            }
        }

        if operands.len() == 1 {
            return Ok(operands.pop());
        }
        Ok(Some(Expression::new(LogicalExpr { op, operands }, position)))
    }

    fn parse_logic_expression(&mut self) -> ParseResult<Option<Expression>> {
        let left = match self.parse_arith_expression()? {
            Some(left) => left,
            None => return Ok(None),
        };

        let op = match binary_op(self.current.kind) {
            Some(op) if self.current.kind.is_comparitive_op() => op,
            _ => return Ok(Some(left)),
        };
        self.advance()?;

        let right = match self.parse_arith_expression()? {
            Some(right) => right,
            None => {
                return Err(ParseError::InvalidLogicExpression {
                    position: self.current.position,
                })
            }
        };

        if self.current.kind.is_comparitive_op() {
            return Err(ParseError::ChainedComparison {
                position: self.current.position,
            });
        }

        let position = left.position;
        Ok(Some(Expression::new(
            BinaryExpr {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            position,
        )))
    }

    fn parse_arith_expression(&mut self) -> ParseResult<Option<Expression>> {
        self.parse_binary_chain(
            &[TokenKind::Plus, TokenKind::Minus],
            Self::parse_term,
            |position| ParseError::InvalidArithExpression { position },
        )
    }

    fn parse_term(&mut self) -> ParseResult<Option<Expression>> {
        self.parse_binary_chain(
            &[TokenKind::Star, TokenKind::Slash],
            Self::parse_factor,
            |position| ParseError::InvalidTerm { position },
        )
    }

    /// Left-associative `operand (op operand)*`.
    fn parse_binary_chain(
        &mut self,
        operators: &[TokenKind],
        operand: fn(&mut Self) -> ParseResult<Option<Expression>>,
        missing: fn(Position) -> ParseError,
    ) -> ParseResult<Option<Expression>> {
        let mut left = match operand(self)? {
            Some(left) => left,
            None => return Ok(None),
        };

        while operators.contains(&self.current.kind) {
            let op_token = self.advance()?;
            let op = match binary_op(op_token.kind) {
                Some(op) => op,
                None => return Err(missing(op_token.position)),
            };
            let right = match operand(self)? {
                Some(right) => right,
                None => return Err(missing(self.current.position)),
            };

            let position = left.position;
            left = Expression::new(
                BinaryExpr {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                position,
            );
        }

        Ok(Some(left))
    }

    fn parse_factor(&mut self) -> ParseResult<Option<Expression>> {
        let position = self.current.position;

        if self.current.kind.is_prefix_op() {
            let kind = match self.advance()?.kind {
                TokenKind::Bang => NegationKind::Logical,
                _ => NegationKind::Arithmetic,
            };
            let operand = match self.nested(Self::parse_factor)? {
                Some(operand) => operand,
                None => {
                    return Err(ParseError::InvalidFactor {
                        position: self.current.position,
                    })
                }
            };
            return Ok(Some(Expression::new(
                Negation {
                    kind,
                    operand: Box::new(operand),
                },
                position,
            )));
        }

        match self.current.kind {
            TokenKind::Int | TokenKind::Float | TokenKind::String | TokenKind::True | TokenKind::False => {
                let token = self.advance()?;
                let literal = match (token.kind, token.value) {
                    (TokenKind::True, _) => Literal::Bool(true),
                    (TokenKind::False, _) => Literal::Bool(false),
                    (_, TokenValue::Int(value)) => Literal::Int(value),
                    (_, TokenValue::Float(value)) => Literal::Float(value),
                    (_, TokenValue::Text(text)) => Literal::String(text),
                    (_, TokenValue::None) => Literal::String(String::new()),
                };
                Ok(Some(Expression::new(literal, position)))
            }
            TokenKind::LeftParen => {
                self.advance()?;
                let inner = self.parse_expression()?;
                self.must_be(TokenKind::RightParen)?;
                Ok(Some(inner))
            }
            TokenKind::LeftBracket => {
                self.advance()?;
                let mut elements = Vec::new();
                if !self.check(TokenKind::RightBracket) {
                    elements.push(self.parse_expression()?);
                    while self.try_consume(TokenKind::Comma)?.is_some() {
                        elements.push(self.parse_expression()?);
                    }
                }
                self.must_be(TokenKind::RightBracket)?;
                Ok(Some(Expression::new(ArrayLiteral { elements }, position)))
            }
            TokenKind::Ident => self.parse_chained_expression(),
            _ => Ok(None),
        }
    }

    /// `a.b(c).d` becomes an `Identifier` named `d` whose parent is a call of
    /// `b` whose parent is the identifier `a`.
    fn parse_chained_expression(&mut self) -> ParseResult<Option<Expression>> {
        if !self.check(TokenKind::Ident) {
            return Ok(None);
        }

        let start = self.current.position;
        let mut parent: Option<Box<Expression>> = None;

        loop {
            let segment = self.must_be(TokenKind::Ident)?;
            let position = segment.position;
            let name = segment.into_text();

            let node = if self.try_consume(TokenKind::LeftParen)?.is_some() {
                let arguments = self.parse_arguments()?;
                self.must_be(TokenKind::RightParen)?;
                Expression::new(
                    FunctionCall {
                        name,
                        arguments,
                        parent,
                        position,
                    },
                    start,
                )
            } else {
                Expression::new(Identifier { name, parent }, start)
            };

            if self.try_consume(TokenKind::Dot)?.is_none() {
                return Ok(Some(node));
            }
            if !self.check(TokenKind::Ident) {
                return Err(ParseError::InvalidChain {
                    found: self.current.kind,
                    position: self.current.position,
                });
            }
            parent = Some(Box::new(node));
        }
    }

    fn parse_arguments(&mut self) -> ParseResult<CallArguments> {
        if self.check(TokenKind::Dollar) {
            return Ok(CallArguments::Lambda(self.parse_lambda_expression()?));
        }

        let mut values = Vec::new();
        if let Some(first) = self.parse_or_expression()? {
            values.push(first);
            while self.try_consume(TokenKind::Comma)?.is_some() {
                values.push(self.parse_expression()?);
            }
        }

        Ok(CallArguments::Values(values))
    }

    fn parse_lambda_expression(&mut self) -> ParseResult<LambdaExpression> {
        let dollar = self.must_be(TokenKind::Dollar)?;
        let parameter = self.must_be(TokenKind::Ident)?.into_text();
        self.must_be(TokenKind::FatArrow)?;
        let body = self.parse_block()?;

        Ok(LambdaExpression {
            parameter,
            body,
            position: dollar.position,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{config::LexerLimits, source::Source};

    fn parser(source: &str) -> Parser {
        Parser::new(Lexer::from_str(source)).unwrap()
    }

    fn program(source: &str) -> ParseResult<Program> {
        parser(source).parse_program()
    }

    fn expression(source: &str) -> Expression {
        parser(source).parse_or_expression().unwrap().unwrap()
    }

    fn statement(source: &str) -> ParseResult<Statement> {
        parser(source).parse_statement()
    }

    fn int(value: i64, column: usize) -> Expression {
        Expression::new(Literal::Int(value), Position::new(1, column))
    }

    fn binary(op: BinaryOp, left: Expression, right: Expression) -> Expression {
        let position = left.position;
        Expression::new(
            BinaryExpr {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            position,
        )
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(
            expression("1 + 2 * 3"),
            binary(
                BinaryOp::Sum,
                int(1, 1),
                binary(BinaryOp::Mul, int(2, 5), int(3, 9))
            )
        );
    }

    #[test]
    fn subtraction_is_left_associative() {
        assert_eq!(
            expression("7 - 2 - 1"),
            binary(
                BinaryOp::Sub,
                binary(BinaryOp::Sub, int(7, 1), int(2, 5)),
                int(1, 9)
            )
        );
    }

    #[test]
    fn parentheses_override_precedence() {
        assert_eq!(
            expression("(1 + 2) * 3"),
            binary(
                BinaryOp::Mul,
                binary(BinaryOp::Sum, int(1, 2), int(2, 6)),
                int(3, 11)
            )
        );
    }

    #[test]
    fn logical_chains_are_n_ary() {
        let parsed = expression("a or b or c and d");
        let chain: LogicalExpr = parsed.kind.try_into().unwrap();
        assert_eq!(chain.op, LogicalOp::Or);
        assert_eq!(chain.operands.len(), 3);

        let last: LogicalExpr = chain.operands[2].kind.clone().try_into().unwrap();
        assert_eq!(last.op, LogicalOp::And);
        assert_eq!(last.operands.len(), 2);
    }

    #[test]
    fn single_operand_is_not_wrapped() {
        assert!(matches!(expression("x").kind, ExpressionKind::Identifier(_)));
    }

    #[test]
    fn comparison_sits_below_arithmetic() {
        let parsed = expression("x + 1 <= 2 * y");
        let comparison: BinaryExpr = parsed.kind.try_into().unwrap();
        assert_eq!(comparison.op, BinaryOp::LesserEqual);
        assert!(matches!(comparison.left.kind, ExpressionKind::Binary(_)));
    }

    #[test]
    fn comparisons_do_not_chain() {
        assert_eq!(
            parser("a < b < c").parse_or_expression(),
            Err(ParseError::ChainedComparison {
                position: Position::new(1, 7)
            })
        );
    }

    #[test]
    fn missing_operands() {
        assert!(matches!(
            parser("a or ;").parse_or_expression(),
            Err(ParseError::InvalidOrExpression { .. })
        ));
        assert!(matches!(
            parser("a and )").parse_or_expression(),
            Err(ParseError::InvalidAndExpression { .. })
        ));
        assert!(matches!(
            parser("a == ;").parse_or_expression(),
            Err(ParseError::InvalidLogicExpression { .. })
        ));
        assert!(matches!(
            parser("a + ;").parse_or_expression(),
            Err(ParseError::InvalidArithExpression { .. })
        ));
        assert!(matches!(
            parser("a * ;").parse_or_expression(),
            Err(ParseError::InvalidTerm { .. })
        ));
        assert!(matches!(
            parser("- ;").parse_or_expression(),
            Err(ParseError::InvalidFactor { .. })
        ));
        assert!(matches!(
            parser("(42 + )").parse_or_expression(),
            Err(ParseError::InvalidArithExpression { .. })
        ));
    }

    #[test]
    fn repeated_negations_nest() {
        let parsed = expression("---42");
        let mut depth = 0;
        let mut node = parsed;
        while let ExpressionKind::Negation(negation) = node.kind {
            assert_eq!(negation.kind, NegationKind::Arithmetic);
            depth += 1;
            node = *negation.operand;
        }
        assert_eq!(depth, 3);
        assert_eq!(node.kind, ExpressionKind::Literal(Literal::Int(42)));
    }

    #[test]
    fn logical_not() {
        let negation: Negation = expression("!done").kind.try_into().unwrap();
        assert_eq!(negation.kind, NegationKind::Logical);
    }

    #[test]
    fn array_literal() {
        let array: ArrayLiteral = expression("[1, \"two\", [3.5]]").kind.try_into().unwrap();
        assert_eq!(array.elements.len(), 3);
        assert!(matches!(array.elements[2].kind, ExpressionKind::Array(_)));

        let empty: ArrayLiteral = expression("[]").kind.try_into().unwrap();
        assert!(empty.elements.is_empty());
    }

    #[test]
    fn dotted_chain_ending_in_a_name() {
        let identifier: Identifier = expression("myObject.property").kind.try_into().unwrap();
        assert_eq!(identifier.name, "property");
        let parent = identifier.parent.unwrap();
        assert_eq!(parent.as_variable(), Some("myObject"));
    }

    #[test]
    fn dotted_chain_ending_in_a_call() {
        let call: FunctionCall = expression("a.b(1).c(2, 3)").kind.try_into().unwrap();
        assert_eq!(call.name, "c");
        assert!(matches!(&call.arguments, CallArguments::Values(values) if values.len() == 2));

        let inner: FunctionCall = call.parent.unwrap().kind.try_into().unwrap();
        assert_eq!(inner.name, "b");
        assert_eq!(inner.parent.unwrap().as_variable(), Some("a"));
    }

    #[test]
    fn dot_must_be_followed_by_a_name() {
        assert!(matches!(
            parser("a.1").parse_or_expression(),
            Err(ParseError::InvalidChain {
                found: TokenKind::Int,
                ..
            })
        ));
    }

    #[test]
    fn lambda_argument() {
        let call: FunctionCall = expression("xs.where($x => { return x > 1; })")
            .kind
            .try_into()
            .unwrap();
        match call.arguments {
            CallArguments::Lambda(lambda) => {
                assert_eq!(lambda.parameter, "x");
                assert_eq!(lambda.body.statements.len(), 1);
            }
            other => panic!("expected a lambda, got {:?}", other),
        }
    }

    #[test]
    fn comments_are_skipped() {
        let parsed = expression("1 # one\n + 2");
        assert!(matches!(parsed.kind, ExpressionKind::Binary(_)));
    }

    #[test]
    fn assignment_statement() {
        let parsed = statement("x = sum(a, b);").unwrap();
        match parsed.kind {
            StatementKind::Assignment(assignment) => {
                assert_eq!(assignment.target.name, "x");
                assert!(matches!(assignment.value.kind, ExpressionKind::Call(_)));
            }
            other => panic!("expected an assignment, got {:?}", other),
        }
    }

    #[test]
    fn attribute_assignment_keeps_parent() {
        let parsed = statement("s.age = 21;").unwrap();
        match parsed.kind {
            StatementKind::Assignment(assignment) => {
                assert_eq!(assignment.target.name, "age");
                assert!(assignment.target.parent.is_some());
            }
            other => panic!("expected an assignment, got {:?}", other),
        }
    }

    #[test]
    fn call_cannot_be_assigned_to() {
        assert!(matches!(
            statement("f() = 1;"),
            Err(ParseError::InvalidAssignmentTarget { .. })
        ));
    }

    #[test]
    fn bare_name_is_not_a_statement() {
        assert!(matches!(
            statement("x;"),
            Err(ParseError::ExpectedToken {
                found: TokenKind::Semicolon,
                ..
            })
        ));
    }

    #[test]
    fn call_statement() {
        let parsed = statement("xs.append(4);").unwrap();
        assert!(matches!(parsed.kind, StatementKind::Call(_)));
    }

    #[test]
    fn return_statements() {
        assert!(statement("return (x + 1);").is_ok());
        assert!(statement("return;").is_ok());
        assert!(matches!(
            statement("return x + 1);"),
            Err(ParseError::ExpectedToken { .. })
        ));
        assert!(matches!(
            statement("return (x + 1)"),
            Err(ParseError::ExpectedToken {
                found: TokenKind::Eof,
                ..
            })
        ));
    }

    #[test]
    fn break_requires_semicolon() {
        assert!(statement("break;").is_ok());
        assert!(matches!(
            statement("break"),
            Err(ParseError::ExpectedToken { .. })
        ));
    }

    #[test]
    fn if_with_else() {
        let parsed = statement("if (x > 1) { x = x + 1; } else { x = x - 1; }").unwrap();
        match parsed.kind {
            StatementKind::If(if_statement) => {
                assert_eq!(if_statement.then_block.statements.len(), 1);
                assert_eq!(if_statement.else_block.unwrap().statements.len(), 1);
            }
            other => panic!("expected an if statement, got {:?}", other),
        }
    }

    #[test]
    fn else_if_nests() {
        let parsed = statement("if (a) { x = 1; } else if (b) { x = 2; } else { x = 3; }").unwrap();
        match parsed.kind {
            StatementKind::If(if_statement) => {
                let else_block = if_statement.else_block.unwrap();
                assert!(matches!(else_block.statements[0].kind, StatementKind::If(_)));
            }
            other => panic!("expected an if statement, got {:?}", other),
        }
    }

    #[test]
    fn conditions_are_required() {
        assert!(matches!(
            statement("if () { x = 1; }"),
            Err(ParseError::MissingCondition {
                construct: "if",
                ..
            })
        ));
        assert!(matches!(
            statement("while () { x = 1; }"),
            Err(ParseError::MissingCondition {
                construct: "while",
                ..
            })
        ));
        assert!(matches!(
            statement("while x < 5) { x = 1; }"),
            Err(ParseError::ExpectedToken { .. })
        ));
        assert!(matches!(
            statement("if (x > 1 { x = 1; }"),
            Err(ParseError::ExpectedToken { .. })
        ));
    }

    #[test]
    fn empty_blocks_are_rejected() {
        for source in [
            "while (x < 5) {}",
            "if (x > 1) {}",
            "if (x > 1) { x = 1; } else {}",
        ] {
            assert!(
                matches!(statement(source), Err(ParseError::EmptyBlock { .. })),
                "{}",
                source
            );
        }
        assert!(matches!(
            program("def main() {}"),
            Err(ParseError::EmptyBlock { .. })
        ));
        assert!(matches!(
            statement("xs.where($x => {});"),
            Err(ParseError::EmptyBlock { .. })
        ));
    }

    #[test]
    fn program_with_functions_and_includes() {
        let parsed = program(
            "from school import Student, Class;\n\
             def first() { return 1; }\n\
             def second(x, y) { return first() + x + y; }",
        )
        .unwrap();
        assert_eq!(parsed.functions.len(), 2);
        assert_eq!(parsed.functions["second"].parameters, vec!["x", "y"]);
        assert_eq!(parsed.includes.len(), 1);
        assert_eq!(parsed.includes[0].module, "school");
        assert_eq!(parsed.includes[0].names, vec!["Student", "Class"]);
    }

    #[test]
    fn empty_program_parses() {
        let parsed = program("# nothing here\n").unwrap();
        assert!(parsed.functions.is_empty());
    }

    #[test]
    fn duplicate_function() {
        assert_eq!(
            program("def f() { return 1; } def f() { return 2; }"),
            Err(ParseError::DuplicateFunction {
                name: "f".to_string(),
                position: Position::new(1, 23)
            })
        );
    }

    #[test]
    fn duplicate_parameter() {
        assert!(matches!(
            program("def f(a, b, a) { return a; }"),
            Err(ParseError::DuplicateParameter { name, .. }) if name == "a"
        ));
    }

    #[test]
    fn trailing_tokens_after_program() {
        assert!(matches!(
            program("def f(x, y) { return x; } y"),
            Err(ParseError::ExpectedToken {
                found: TokenKind::Ident,
                ..
            })
        ));
    }

    #[test]
    fn missing_parameter_after_comma() {
        assert!(matches!(
            program("def f(x, ) { return x; }"),
            Err(ParseError::ExpectedToken { .. })
        ));
    }

    #[test]
    fn lexer_errors_surface_through_the_parser() {
        let err = program("def main() { return \"open; }").unwrap_err();
        assert!(matches!(
            err,
            ParseError::Lex(LexError::UnterminatedString { .. })
        ));
        assert_eq!(err.position(), Position::new(1, 21));
    }

    fn shallow(source: &str, max_nesting_depth: usize) -> Parser {
        let limits = LexerLimits {
            max_nesting_depth,
            ..LexerLimits::default()
        };
        Parser::new(Lexer::new(Source::from_str(source), limits)).unwrap()
    }

    #[test]
    fn prefix_and_parenthesis_nesting_is_bounded() {
        let negations = |count: usize| format!("{}1", "-".repeat(count));

        assert!(shallow(&negations(5), 10).parse_or_expression().is_ok());
        assert!(matches!(
            shallow(&negations(20), 10).parse_or_expression(),
            Err(ParseError::NestingTooDeep { max: 10, .. })
        ));
        assert!(shallow("((1))", 10).parse_or_expression().is_ok());
        assert!(matches!(
            shallow("((((((((((((1))))))))))))", 10).parse_or_expression(),
            Err(ParseError::NestingTooDeep { max: 10, .. })
        ));
    }

    #[test]
    fn block_nesting_is_bounded() {
        assert!(shallow("def f() { return 1; }", 3).parse_program().is_ok());
        assert!(matches!(
            shallow("def f() { if (true) { if (true) { return 1; } } }", 3).parse_program(),
            Err(ParseError::NestingTooDeep { max: 3, .. })
        ));
    }
}
