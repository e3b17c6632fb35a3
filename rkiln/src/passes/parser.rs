// This is the parser. yay.

use crate::{
    ast::*,
    span::Span,
    token::{Token, TokenType},
};

#[derive(Debug, PartialEq)]
pub enum ParseError {
    // Expected, got
    Expected(Vec<TokenType>, Token),
    /// got something that can't start an expression
    ExpectedExpression(Token),
    /// what we were parsing, and the last token seen before the end
    EOF(String, Span),
}
fn describe(kind: &TokenType) -> String {
    match kind {
        TokenType::Identifier(_) | TokenType::IntLit(_) => kind.to_string(),
        _ => format!("`{}`", kind),
    }
}
impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use ParseError::*;
        match self {
            Expected(expected, got) => {
                let expected_strings: Vec<String> = expected.iter().map(describe).collect();
                let expected_str = expected_strings.join(" or ");
                write!(f, "[ERROR] expected {}, got {} at {}", expected_str, got, got.span)
            }
            ExpectedExpression(got) => {
                write!(f, "[ERROR] expected expression, got {} at {}", got, got.span)
            }
            EOF(parsing, after) => {
                write!(f, "[ERROR] unexpected EOF parsing {} after {}", parsing, after)
            }
        }
    }
}
// All relevant details in Display and Debug
impl std::error::Error for ParseError {}

type Result<T> = std::result::Result<T, ParseError>;

/// the tokens a statement can begin with
fn statement_starts() -> Vec<TokenType> {
    vec![
        TokenType::Exit,
        TokenType::Let,
        TokenType::Identifier(String::new()),
        TokenType::LCurly,
        TokenType::If,
    ]
}

struct Parser {
    tokens: Vec<Token>,
    index: usize,
    nodes: Nodes,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, index: 0, nodes: Nodes::default() }
    }

    fn peek(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.index + offset)
    }

    fn peek_is(&self, offset: usize, kind: &TokenType) -> bool {
        self.peek(offset).map_or(false, |t| t.is(kind))
    }

    /// Only call once a peek has shown there's a token to take
    fn consume(&mut self) -> Token {
        let token = self.tokens[self.index].clone();
        self.index += 1;
        token
    }

    fn try_consume(&mut self, kind: &TokenType) -> Option<Token> {
        if self.peek_is(0, kind) {
            Some(self.consume())
        } else {
            None
        }
    }

    /// span of the token just consumed, for errors at EOF
    fn last_span(&self) -> Span {
        match self.index.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(token) => token.span,
            None => Span::new(),
        }
    }

    /// Only consumes if the next token is the expected kind (payload is
    /// ignored), then returns that token
    fn expect(&mut self, kind: TokenType, during: &str) -> Result<Token> {
        if let Some(token) = self.try_consume(&kind) {
            return Ok(token);
        }
        match self.peek(0) {
            Some(got) => Err(ParseError::Expected(vec![kind], got.clone())),
            None => Err(ParseError::EOF(during.to_string(), self.last_span())),
        }
    }

    /// The error for a spot where a statement should be but isn't. An
    /// identifier there is an assignment missing its `=`, so point at that
    fn no_statement(&self, during: &str) -> ParseError {
        match (self.peek(0), self.peek(1)) {
            (Some(Token { kind: TokenType::Identifier(_), .. }), Some(after)) => {
                ParseError::Expected(vec![TokenType::Assignment], after.clone())
            }
            (Some(Token { kind: TokenType::Identifier(_), span }), None) => {
                ParseError::EOF(during.to_string(), *span)
            }
            (Some(got), _) => ParseError::Expected(statement_starts(), got.clone()),
            (None, _) => ParseError::EOF(during.to_string(), self.last_span()),
        }
    }

    fn parse_term(&mut self) -> Result<Option<ExprId>> {
        let kind = self.peek(0).map(|t| t.kind.clone());
        let term = match kind {
            Some(TokenType::IntLit(_)) => Term::IntLit(self.consume()),
            Some(TokenType::Identifier(_)) => Term::Identifier(self.consume()),
            // In order to give binary operator precedence to parenthesis
            Some(TokenType::LParen) => {
                self.consume();
                let inner = self.expect_expression(0)?;
                self.expect(TokenType::RParen, "parenthesized expression")?;
                Term::Paren(inner)
            }
            _ => return Ok(None),
        };
        Ok(Some(self.nodes.exprs.alloc(Expression::Term(term))))
    }

    /// Precedence climbing. Operators binding looser than `min_prec` are
    /// left for a caller further up to fold in
    fn parse_expression(&mut self, min_prec: u8) -> Result<Option<ExprId>> {
        // First we parse the left side of a binary expression which COULD be the whole expression
        let mut left = match self.parse_term()? {
            Some(term) => term,
            None => return Ok(None),
        };
        loop {
            let next = self.peek(0).and_then(|t| {
                let op = BinaryOp::from_token(&t.kind)?;
                let prec = t.kind.binary_precedence()?;
                Some((op, prec))
            });
            let (op, prec) = match next {
                Some((op, prec)) if prec >= min_prec => (op, prec),
                _ => break,
            };
            self.consume();
            let right = self.expect_expression(prec + 1)?;
            left = self.nodes.exprs.alloc(Expression::Binary(BinaryExpr { op, left, right }));
        }
        Ok(Some(left))
    }

    fn expect_expression(&mut self, min_prec: u8) -> Result<ExprId> {
        if let Some(expr) = self.parse_expression(min_prec)? {
            return Ok(expr);
        }
        match self.peek(0) {
            Some(got) => Err(ParseError::ExpectedExpression(got.clone())),
            None => Err(ParseError::EOF("expression".to_string(), self.last_span())),
        }
    }

    fn parse_scope(&mut self) -> Result<Option<ScopeId>> {
        if self.try_consume(&TokenType::LCurly).is_none() {
            return Ok(None);
        }
        let mut statements = vec![];
        while let Some(statement) = self.parse_statement()? {
            statements.push(statement);
        }
        if self.peek_is(0, &TokenType::Identifier(String::new())) {
            return Err(self.no_statement("scope"));
        }
        self.expect(TokenType::RCurly, "scope")?;
        Ok(Some(self.nodes.scopes.alloc(Scope { statements })))
    }

    fn expect_scope(&mut self, during: &str) -> Result<ScopeId> {
        if let Some(scope) = self.parse_scope()? {
            return Ok(scope);
        }
        match self.peek(0) {
            Some(got) => Err(ParseError::Expected(vec![TokenType::LCurly], got.clone())),
            None => Err(ParseError::EOF(during.to_string(), self.last_span())),
        }
    }

    /// the elif / else chain hanging off an if
    fn parse_predicate(&mut self) -> Result<Option<PredId>> {
        let predicate = if self.try_consume(&TokenType::Elif).is_some() {
            self.expect(TokenType::LParen, "elif condition")?;
            let condition = self.expect_expression(0)?;
            self.expect(TokenType::RParen, "elif condition")?;
            let scope = self.expect_scope("elif")?;
            let next = self.parse_predicate()?;
            Predicate::ElseIf { condition, scope, next }
        } else if self.try_consume(&TokenType::Else).is_some() {
            Predicate::Else(self.expect_scope("else")?)
        } else {
            return Ok(None);
        };
        Ok(Some(self.nodes.preds.alloc(predicate)))
    }

    fn parse_if(&mut self) -> Result<If> {
        self.expect(TokenType::If, "if statement")?;
        self.expect(TokenType::LParen, "if condition")?;
        let condition = self.expect_expression(0)?;
        self.expect(TokenType::RParen, "if condition")?;
        let scope = self.expect_scope("if statement")?;
        let predicate = self.parse_predicate()?;
        Ok(If { condition, scope, predicate })
    }

    fn parse_exit(&mut self) -> Result<Statement> {
        self.expect(TokenType::Exit, "exit statement")?;
        self.expect(TokenType::LParen, "exit statement")?;
        let code = self.expect_expression(0)?;
        self.expect(TokenType::RParen, "exit statement")?;
        self.expect(TokenType::Semi, "exit statement")?;
        Ok(Statement::Exit(code))
    }

    /// Declaration is just an assignment starting with let
    fn parse_let(&mut self) -> Result<Statement> {
        self.expect(TokenType::Let, "let statement")?;
        let (ident, value) = self.parse_assignment("let statement")?;
        Ok(Statement::Let { ident, value })
    }

    /// `ident = expr ;`, giving back the identifier token and the value
    fn parse_assignment(&mut self, during: &str) -> Result<(Token, ExprId)> {
        let ident = self.expect(TokenType::Identifier(String::new()), during)?;
        self.expect(TokenType::Assignment, during)?;
        let value = self.expect_expression(0)?;
        self.expect(TokenType::Semi, during)?;
        Ok((ident, value))
    }

    /// Ok(None) means nothing here starts a statement; the caller decides
    /// whether that's the end of a block or an error
    fn parse_statement(&mut self) -> Result<Option<StmtId>> {
        let kind = match self.peek(0) {
            Some(token) => token.kind.clone(),
            None => return Ok(None),
        };
        let statement = match kind {
            TokenType::Exit => self.parse_exit()?,
            TokenType::Let => self.parse_let()?,
            // only disambiguating is assignment vs nothing at all. LL(2) for that
            TokenType::Identifier(_) if self.peek_is(1, &TokenType::Assignment) => {
                let (ident, value) = self.parse_assignment("assignment")?;
                Statement::Assign { ident, value }
            }
            TokenType::LCurly => Statement::Scope(self.expect_scope("scope")?),
            TokenType::If => Statement::If(self.parse_if()?),
            _ => return Ok(None),
        };
        Ok(Some(self.nodes.stmts.alloc(statement)))
    }
}

pub fn parse(tokens: Vec<Token>) -> Result<Program> {
    let mut parser = Parser::new(tokens);
    let mut statements = vec![];
    // Every token
    while parser.peek(0).is_some() {
        match parser.parse_statement()? {
            Some(statement) => statements.push(statement),
            None => return Err(parser.no_statement("statement")),
        }
    }
    let program = Program { nodes: parser.nodes, statements };
    debug!(
        "parsed {} statements, {} expression nodes",
        program.nodes.stmts.len(),
        program.nodes.exprs.len()
    );
    trace!("\n{}", program);
    Ok(program)
}
