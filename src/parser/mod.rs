//! Script parser
//!
//! This module implements a recursive descent parser for the script subset.
//! It produces an AST from a stream of tokens.

use crate::ast::*;
use crate::error::{Error, Result, SourceLocation};
use crate::lexer::{Keyword, Lexer, Token, TokenKind};

/// A recursive descent parser for the script subset
pub struct Parser<'src> {
    /// Source code (kept for error messages)
    source: &'src str,
    /// Tokens to parse
    tokens: Vec<Token<'src>>,
    /// Current position in tokens
    pos: usize,
}

impl<'src> Parser<'src> {
    /// Create a new parser from source code
    pub fn new(source: &'src str) -> Result<Self> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;
        Ok(Self {
            source,
            tokens,
            pos: 0,
        })
    }

    /// Parse the source as a complete program
    pub fn parse_program(&mut self) -> Result<Program> {
        let start = self.location();
        let mut body = Vec::new();

        while !self.is_eof() {
            body.push(self.parse_statement()?);
        }

        let end = self.location();
        Ok(Program {
            body,
            span: Span::new(start, end),
        })
    }

    /// Parse a single expression
    pub fn parse_expression(&mut self) -> Result<Expression> {
        self.parse_assignment_expression()
    }

    // ========== Token Access ==========

    fn current(&self) -> &Token<'src> {
        &self.tokens[self.pos]
    }

    fn peek(&self) -> TokenKind {
        self.tokens[self.pos].kind
    }

    fn peek_at(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn is_eof(&self) -> bool {
        self.peek() == TokenKind::Eof
    }

    fn location(&self) -> SourceLocation {
        self.current().location
    }

    /// Create a parse error with source context
    fn error(&self, message: impl Into<String>, location: SourceLocation) -> Error {
        Error::parse_error_with_context(message, location, self.source)
    }

    fn advance(&mut self) -> &Token<'src> {
        let token = &self.tokens[self.pos];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&Token<'src>> {
        if self.peek() == kind {
            Ok(self.advance())
        } else {
            let loc = self.location();
            Err(self.error(
                format!("Expected {:?}, found {:?}", kind, self.peek()),
                loc,
            ))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<&Token<'src>> {
        if self.peek() == TokenKind::Keyword(keyword) {
            Ok(self.advance())
        } else {
            let loc = self.location();
            Err(self.error(
                format!("Expected '{}', found {:?}", keyword, self.peek()),
                loc,
            ))
        }
    }

    fn consume(&mut self, kind: TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume_semicolon(&mut self) -> Result<()> {
        // Automatic semicolon insertion
        if self.consume(TokenKind::Semicolon) {
            return Ok(());
        }

        // ASI: }, or EOF
        if self.peek() == TokenKind::RightBrace || self.peek() == TokenKind::Eof {
            return Ok(());
        }

        // Newline between tokens ends the statement
        if self.pos > 0 {
            let prev = &self.tokens[self.pos - 1];
            let curr = self.current();
            if prev.location.line < curr.location.line {
                return Ok(());
            }
        }

        let loc = self.location();
        Err(self.error(format!("Expected ';', found {:?}", self.peek()), loc))
    }

    fn parse_identifier(&mut self) -> Result<Identifier> {
        let loc = self.location();
        if self.peek() != TokenKind::Identifier {
            return Err(self.error(
                format!("Expected identifier, found {:?}", self.peek()),
                loc,
            ));
        }
        let token = self.advance();
        let span = Span::new(token.location, token.location);
        Ok(Identifier::new(token.text, span))
    }

    // ========== Statements ==========

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.peek() {
            TokenKind::LeftBrace => self.parse_block_statement().map(Statement::Block),
            TokenKind::Semicolon => {
                let span = Span::new(self.location(), self.location());
                self.advance();
                Ok(Statement::Empty(span))
            }
            TokenKind::Keyword(Keyword::Var) => self.parse_variable_declaration(VariableKind::Var),
            TokenKind::Keyword(Keyword::Let) => self.parse_variable_declaration(VariableKind::Let),
            TokenKind::Keyword(Keyword::Const) => {
                self.parse_variable_declaration(VariableKind::Const)
            }
            TokenKind::Keyword(Keyword::Function) => self.parse_function_declaration(),
            TokenKind::Keyword(Keyword::If) => self.parse_if_statement(),
            TokenKind::Keyword(Keyword::While) => self.parse_while_statement(),
            TokenKind::Keyword(Keyword::For) => self.parse_for_statement(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return_statement(),
            TokenKind::Keyword(Keyword::Throw) => self.parse_throw_statement(),
            TokenKind::Keyword(Keyword::Try) => self.parse_try_statement(),
            TokenKind::Keyword(Keyword::Break) => {
                let span = Span::new(self.location(), self.location());
                self.advance();
                self.consume_semicolon()?;
                Ok(Statement::Break(span))
            }
            TokenKind::Keyword(Keyword::Continue) => {
                let span = Span::new(self.location(), self.location());
                self.advance();
                self.consume_semicolon()?;
                Ok(Statement::Continue(span))
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_block_statement(&mut self) -> Result<BlockStatement> {
        let start = self.location();
        self.expect(TokenKind::LeftBrace)?;

        let mut body = Vec::new();
        while self.peek() != TokenKind::RightBrace && !self.is_eof() {
            body.push(self.parse_statement()?);
        }

        self.expect(TokenKind::RightBrace)?;
        let end = self.location();
        Ok(BlockStatement {
            body,
            span: Span::new(start, end),
        })
    }

    fn parse_variable_declaration(&mut self, kind: VariableKind) -> Result<Statement> {
        let start = self.location();
        self.advance(); // var/let/const

        let mut declarations = Vec::new();
        loop {
            let id = self.parse_identifier()?;
            let init = if self.consume(TokenKind::Equals) {
                Some(Box::new(self.parse_assignment_expression()?))
            } else {
                None
            };
            let span = Span::new(id.span.start, self.location());
            declarations.push(VariableDeclarator { id, init, span });

            if !self.consume(TokenKind::Comma) {
                break;
            }
        }

        self.consume_semicolon()?;
        let end = self.location();
        Ok(Statement::VariableDeclaration(VariableDeclaration {
            kind,
            declarations,
            span: Span::new(start, end),
        }))
    }

    fn parse_function_declaration(&mut self) -> Result<Statement> {
        let start = self.location();
        self.expect_keyword(Keyword::Function)?;
        let name = self.parse_identifier()?;
        let params = self.parse_parameters()?;
        let body = self.parse_block_statement()?;
        let end = self.location();

        Ok(Statement::FunctionDeclaration(Box::new(Function {
            name,
            params,
            body: body.body,
            span: Span::new(start, end),
        })))
    }

    fn parse_parameters(&mut self) -> Result<Vec<Pattern>> {
        self.expect(TokenKind::LeftParen)?;
        let mut params = Vec::new();

        while !self.consume(TokenKind::RightParen) {
            if self.consume(TokenKind::DotDotDot) {
                let id = self.parse_identifier()?;
                params.push(Pattern::Rest(id));
                let loc = self.location();
                if !self.consume(TokenKind::RightParen) {
                    return Err(self.error("Rest parameter must be last", loc));
                }
                break;
            }

            let id = self.parse_identifier()?;
            params.push(Pattern::Identifier(id));

            if !self.consume(TokenKind::Comma) {
                self.expect(TokenKind::RightParen)?;
                break;
            }
        }

        Ok(params)
    }

    fn parse_if_statement(&mut self) -> Result<Statement> {
        let start = self.location();
        self.expect_keyword(Keyword::If)?;
        self.expect(TokenKind::LeftParen)?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RightParen)?;

        let consequent = self.parse_statement()?;
        let alternate = if self.consume(TokenKind::Keyword(Keyword::Else)) {
            Some(self.parse_statement()?)
        } else {
            None
        };

        let end = self.location();
        Ok(Statement::If(Box::new(IfStatement {
            condition,
            consequent,
            alternate,
            span: Span::new(start, end),
        })))
    }

    fn parse_while_statement(&mut self) -> Result<Statement> {
        let start = self.location();
        self.expect_keyword(Keyword::While)?;
        self.expect(TokenKind::LeftParen)?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RightParen)?;
        let body = self.parse_statement()?;
        let end = self.location();

        Ok(Statement::While(Box::new(WhileStatement {
            condition,
            body,
            span: Span::new(start, end),
        })))
    }

    fn parse_for_statement(&mut self) -> Result<Statement> {
        let start = self.location();
        self.expect_keyword(Keyword::For)?;
        self.expect(TokenKind::LeftParen)?;

        let kind = match self.peek() {
            TokenKind::Keyword(Keyword::Var) => {
                self.advance();
                Some(VariableKind::Var)
            }
            TokenKind::Keyword(Keyword::Let) => {
                self.advance();
                Some(VariableKind::Let)
            }
            TokenKind::Keyword(Keyword::Const) => {
                self.advance();
                Some(VariableKind::Const)
            }
            _ => None,
        };

        let pattern = if self.peek() == TokenKind::LeftBracket {
            self.advance();
            let mut ids = Vec::new();
            while !self.consume(TokenKind::RightBracket) {
                ids.push(self.parse_identifier()?);
                if !self.consume(TokenKind::Comma) {
                    self.expect(TokenKind::RightBracket)?;
                    break;
                }
            }
            Pattern::Array(ids)
        } else {
            Pattern::Identifier(self.parse_identifier()?)
        };

        let binding = ForBinding { kind, pattern };

        match self.peek() {
            TokenKind::Keyword(Keyword::In) => {
                self.advance();
                let object = self.parse_expression()?;
                self.expect(TokenKind::RightParen)?;
                let body = self.parse_statement()?;
                let end = self.location();
                Ok(Statement::ForIn(Box::new(ForInStatement {
                    binding,
                    object,
                    body,
                    span: Span::new(start, end),
                })))
            }
            TokenKind::Keyword(Keyword::Of) => {
                self.advance();
                let iterable = self.parse_expression()?;
                self.expect(TokenKind::RightParen)?;
                let body = self.parse_statement()?;
                let end = self.location();
                Ok(Statement::ForOf(Box::new(ForOfStatement {
                    binding,
                    iterable,
                    body,
                    span: Span::new(start, end),
                })))
            }
            _ => {
                let loc = self.location();
                Err(self.error("Expected 'in' or 'of' in for statement", loc))
            }
        }
    }

    fn parse_return_statement(&mut self) -> Result<Statement> {
        let start = self.location();
        self.expect_keyword(Keyword::Return)?;

        // `return` on its own line returns undefined
        let argument = if self.peek() == TokenKind::Semicolon
            || self.peek() == TokenKind::RightBrace
            || self.is_eof()
            || self.current().location.line > start.line
        {
            None
        } else {
            Some(self.parse_expression()?)
        };

        self.consume_semicolon()?;
        let end = self.location();
        Ok(Statement::Return(ReturnStatement {
            argument,
            span: Span::new(start, end),
        }))
    }

    fn parse_throw_statement(&mut self) -> Result<Statement> {
        let start = self.location();
        self.expect_keyword(Keyword::Throw)?;
        let argument = self.parse_expression()?;
        self.consume_semicolon()?;
        let end = self.location();
        Ok(Statement::Throw(Box::new(ThrowStatement {
            argument,
            span: Span::new(start, end),
        })))
    }

    fn parse_try_statement(&mut self) -> Result<Statement> {
        let start = self.location();
        self.expect_keyword(Keyword::Try)?;
        let block = self.parse_block_statement()?;

        let handler = if self.consume(TokenKind::Keyword(Keyword::Catch)) {
            let catch_start = self.location();
            let param = if self.consume(TokenKind::LeftParen) {
                let id = self.parse_identifier()?;
                self.expect(TokenKind::RightParen)?;
                Some(id)
            } else {
                None
            };
            let body = self.parse_block_statement()?;
            let catch_end = self.location();
            Some(CatchClause {
                param,
                body,
                span: Span::new(catch_start, catch_end),
            })
        } else {
            None
        };

        let finalizer = if self.consume(TokenKind::Keyword(Keyword::Finally)) {
            Some(self.parse_block_statement()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            let loc = self.location();
            return Err(self.error("Missing catch or finally after try", loc));
        }

        let end = self.location();
        Ok(Statement::Try(Box::new(TryStatement {
            block,
            handler,
            finalizer,
            span: Span::new(start, end),
        })))
    }

    fn parse_expression_statement(&mut self) -> Result<Statement> {
        let start = self.location();
        let expression = self.parse_expression()?;
        self.consume_semicolon()?;
        let end = self.location();
        Ok(Statement::Expression(ExpressionStatement {
            expression,
            span: Span::new(start, end),
        }))
    }

    // ========== Expressions ==========

    fn parse_assignment_expression(&mut self) -> Result<Expression> {
        let start = self.location();
        let left = self.parse_conditional_expression()?;

        let operator = match self.peek() {
            TokenKind::Equals => AssignmentOperator::Assign,
            TokenKind::PlusEquals => AssignmentOperator::AddAssign,
            TokenKind::MinusEquals => AssignmentOperator::SubtractAssign,
            _ => return Ok(left),
        };

        if !left.is_valid_assignment_target() {
            let loc = self.location();
            return Err(self.error("Invalid left-hand side in assignment", loc));
        }

        self.advance();
        let value = self.parse_assignment_expression()?;
        let end = self.location();

        Ok(Expression::Assignment(Box::new(AssignmentExpression {
            operator,
            target: left,
            value,
            span: Span::new(start, end),
        })))
    }

    fn parse_conditional_expression(&mut self) -> Result<Expression> {
        let start = self.location();
        let condition = self.parse_logical_or()?;

        if !self.consume(TokenKind::Question) {
            return Ok(condition);
        }

        let consequent = self.parse_assignment_expression()?;
        self.expect(TokenKind::Colon)?;
        let alternate = self.parse_assignment_expression()?;
        let end = self.location();

        Ok(Expression::Conditional(Box::new(ConditionalExpression {
            condition,
            consequent,
            alternate,
            span: Span::new(start, end),
        })))
    }

    fn parse_logical_or(&mut self) -> Result<Expression> {
        let start = self.location();
        let mut left = self.parse_logical_and()?;

        while self.consume(TokenKind::PipePipe) {
            let right = self.parse_logical_and()?;
            let end = self.location();
            left = Expression::Logical(Box::new(LogicalExpression {
                operator: LogicalOperator::Or,
                left,
                right,
                span: Span::new(start, end),
            }));
        }

        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expression> {
        let start = self.location();
        let mut left = self.parse_equality()?;

        while self.consume(TokenKind::AmpersandAmpersand) {
            let right = self.parse_equality()?;
            let end = self.location();
            left = Expression::Logical(Box::new(LogicalExpression {
                operator: LogicalOperator::And,
                left,
                right,
                span: Span::new(start, end),
            }));
        }

        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression> {
        let start = self.location();
        let mut left = self.parse_relational()?;

        loop {
            let operator = match self.peek() {
                TokenKind::EqualsEquals => BinaryOperator::Equals,
                TokenKind::BangEquals => BinaryOperator::NotEquals,
                TokenKind::EqualsEqualsEquals => BinaryOperator::StrictEquals,
                TokenKind::BangEqualsEquals => BinaryOperator::StrictNotEquals,
                TokenKind::Keyword(Keyword::Is) => BinaryOperator::Is,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            let end = self.location();
            left = Expression::Binary(Box::new(BinaryExpression {
                operator,
                left,
                right,
                span: Span::new(start, end),
            }));
        }

        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expression> {
        let start = self.location();
        let mut left = self.parse_additive()?;

        loop {
            let operator = match self.peek() {
                TokenKind::Less => BinaryOperator::Less,
                TokenKind::Greater => BinaryOperator::Greater,
                TokenKind::LessEquals => BinaryOperator::LessEquals,
                TokenKind::GreaterEquals => BinaryOperator::GreaterEquals,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            let end = self.location();
            left = Expression::Binary(Box::new(BinaryExpression {
                operator,
                left,
                right,
                span: Span::new(start, end),
            }));
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression> {
        let start = self.location();
        let mut left = self.parse_multiplicative()?;

        loop {
            let operator = match self.peek() {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            let end = self.location();
            left = Expression::Binary(Box::new(BinaryExpression {
                operator,
                left,
                right,
                span: Span::new(start, end),
            }));
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression> {
        let start = self.location();
        let mut left = self.parse_unary()?;

        loop {
            let operator = match self.peek() {
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Slash => BinaryOperator::Divide,
                TokenKind::Percent => BinaryOperator::Remainder,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            let end = self.location();
            left = Expression::Binary(Box::new(BinaryExpression {
                operator,
                left,
                right,
                span: Span::new(start, end),
            }));
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        let start = self.location();
        let operator = match self.peek() {
            TokenKind::Bang => UnaryOperator::Not,
            TokenKind::Minus => UnaryOperator::Negate,
            TokenKind::Plus => UnaryOperator::Plus,
            _ => return self.parse_postfix(),
        };

        self.advance();
        let operand = self.parse_unary()?;
        let end = self.location();
        Ok(Expression::Unary(Box::new(UnaryExpression {
            operator,
            operand,
            span: Span::new(start, end),
        })))
    }

    /// Parse member access and calls, left to right
    fn parse_postfix(&mut self) -> Result<Expression> {
        let start = self.location();
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    let loc = self.location();
                    // Member names may collide with keywords (`x.in` is not
                    // supported; identifiers only)
                    if self.peek() != TokenKind::Identifier {
                        return Err(
                            self.error(format!("Expected member name, found {:?}", self.peek()), loc)
                        );
                    }
                    let name = self.advance().text.to_string();
                    let end = self.location();
                    expr = Expression::Member(Box::new(MemberExpression {
                        object: expr,
                        member: MemberKey::Named(name),
                        span: Span::new(start, end),
                    }));
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let key = self.parse_expression()?;
                    self.expect(TokenKind::RightBracket)?;
                    let end = self.location();
                    expr = Expression::Member(Box::new(MemberExpression {
                        object: expr,
                        member: MemberKey::Computed(key),
                        span: Span::new(start, end),
                    }));
                }
                TokenKind::LeftParen => {
                    let arguments = self.parse_arguments()?;
                    let end = self.location();
                    expr = Expression::Call(Box::new(CallExpression {
                        callee: expr,
                        arguments,
                        span: Span::new(start, end),
                    }));
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>> {
        self.expect(TokenKind::LeftParen)?;
        let mut args = Vec::new();

        while !self.consume(TokenKind::RightParen) {
            args.push(self.parse_assignment_expression()?);
            if !self.consume(TokenKind::Comma) {
                self.expect(TokenKind::RightParen)?;
                break;
            }
        }

        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        let loc = self.location();

        match self.peek() {
            TokenKind::NumberLiteral => {
                let token = self.advance();
                let raw = token.text.replace('_', "");
                let span = Span::new(token.location, token.location);
                let value = raw.parse::<f64>().map_err(|_| {
                    Error::parse_error(format!("Invalid number literal '{}'", token.text), loc)
                })?;
                Ok(Expression::Literal(Literal {
                    value: LiteralValue::Number(value),
                    span,
                }))
            }
            TokenKind::StringLiteral => {
                let token = self.advance();
                let span = Span::new(token.location, token.location);
                let inner = &token.text[1..token.text.len() - 1];
                Ok(Expression::Literal(Literal {
                    value: LiteralValue::String(cook_string(inner)),
                    span,
                }))
            }
            TokenKind::TemplateLiteral | TokenKind::TemplateHead => self.parse_template_literal(),
            TokenKind::Keyword(Keyword::True) => {
                let token = self.advance();
                let span = Span::new(token.location, token.location);
                Ok(Expression::Literal(Literal {
                    value: LiteralValue::Boolean(true),
                    span,
                }))
            }
            TokenKind::Keyword(Keyword::False) => {
                let token = self.advance();
                let span = Span::new(token.location, token.location);
                Ok(Expression::Literal(Literal {
                    value: LiteralValue::Boolean(false),
                    span,
                }))
            }
            TokenKind::Keyword(Keyword::Null) => {
                let token = self.advance();
                let span = Span::new(token.location, token.location);
                Ok(Expression::Literal(Literal {
                    value: LiteralValue::Null,
                    span,
                }))
            }
            TokenKind::Keyword(Keyword::Undefined) => {
                let token = self.advance();
                let span = Span::new(token.location, token.location);
                Ok(Expression::Literal(Literal {
                    value: LiteralValue::Undefined,
                    span,
                }))
            }
            TokenKind::Keyword(Keyword::New) => {
                self.advance();
                let callee = self.parse_identifier()?;
                let arguments = if self.peek() == TokenKind::LeftParen {
                    self.parse_arguments()?
                } else {
                    Vec::new()
                };
                let end = self.location();
                Ok(Expression::New(Box::new(NewExpression {
                    callee,
                    arguments,
                    span: Span::new(loc, end),
                })))
            }
            TokenKind::Identifier => {
                let id = self.parse_identifier()?;
                Ok(Expression::Identifier(id))
            }
            TokenKind::LeftBracket => self.parse_array_literal(),
            TokenKind::LeftBrace => self.parse_object_literal(),
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RightParen)?;
                Ok(expr)
            }
            other => Err(self.error(format!("Unexpected token {:?}", other), loc)),
        }
    }

    fn parse_array_literal(&mut self) -> Result<Expression> {
        let start = self.location();
        self.expect(TokenKind::LeftBracket)?;

        let mut elements = Vec::new();
        while !self.consume(TokenKind::RightBracket) {
            elements.push(self.parse_assignment_expression()?);
            if !self.consume(TokenKind::Comma) {
                self.expect(TokenKind::RightBracket)?;
                break;
            }
        }

        let end = self.location();
        Ok(Expression::Array(ArrayExpression {
            elements,
            span: Span::new(start, end),
        }))
    }

    fn parse_object_literal(&mut self) -> Result<Expression> {
        let start = self.location();
        self.expect(TokenKind::LeftBrace)?;

        let mut properties = Vec::new();
        while !self.consume(TokenKind::RightBrace) {
            let loc = self.location();
            let key = match self.peek() {
                TokenKind::Identifier | TokenKind::Keyword(_) => self.advance().text.to_string(),
                TokenKind::StringLiteral => {
                    let text = self.advance().text;
                    cook_string(&text[1..text.len() - 1])
                }
                other => {
                    return Err(self.error(format!("Expected property key, found {:?}", other), loc))
                }
            };
            self.expect(TokenKind::Colon)?;
            let value = self.parse_assignment_expression()?;
            properties.push((key, value));

            if !self.consume(TokenKind::Comma) {
                self.expect(TokenKind::RightBrace)?;
                break;
            }
        }

        let end = self.location();
        Ok(Expression::Object(ObjectExpression {
            properties,
            span: Span::new(start, end),
        }))
    }

    fn parse_template_literal(&mut self) -> Result<Expression> {
        let start = self.location();
        let mut quasis = Vec::new();
        let mut expressions = Vec::new();

        // Complete template literal with no substitutions
        if self.peek() == TokenKind::TemplateLiteral {
            let text = self.advance().text;
            // Strip `...`
            quasis.push(cook_string(&text[1..text.len() - 1]));
            let end = self.location();
            return Ok(Expression::TemplateLiteral(TemplateLiteral {
                quasis,
                expressions,
                span: Span::new(start, end),
            }));
        }

        // Token sequence: TemplateHead, expr, RightBrace,
        // (TemplateMiddle, expr, RightBrace)*, TemplateTail
        loop {
            match self.peek() {
                TokenKind::TemplateHead | TokenKind::TemplateMiddle => {
                    let text = self.advance().text;
                    // Strip leading ` or } and trailing ${
                    quasis.push(cook_string(&text[1..text.len() - 2]));
                }
                TokenKind::TemplateTail => {
                    let text = self.advance().text;
                    // Strip leading } and trailing `
                    quasis.push(cook_string(&text[1..text.len() - 1]));
                    break;
                }
                _ => {
                    expressions.push(self.parse_expression()?);
                    self.expect(TokenKind::RightBrace)?;
                }
            }
        }

        let end = self.location();
        Ok(Expression::TemplateLiteral(TemplateLiteral {
            quasis,
            expressions,
            span: Span::new(start, end),
        }))
    }
}

/// Process escape sequences in a string or template chunk
fn cook_string(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('0') => result.push('\0'),
            Some('\\') => result.push('\\'),
            Some('\'') => result.push('\''),
            Some('"') => result.push('"'),
            Some('`') => result.push('`'),
            Some('$') => result.push('$'),
            Some(other) => result.push(other),
            None => break,
        }
    }

    result
}

/// Convenience entry point: parse source into a program
pub fn parse(source: &str) -> Result<Program> {
    Parser::new(source)?.parse_program()
}
