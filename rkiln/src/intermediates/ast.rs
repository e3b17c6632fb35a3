//! the Abstract Syntax Tree is the result of parsing, and contains
//! all the data in your program in actual logical chunks, most closely
//! resembling the frontend syntax.
//!
//! the root is [Program]. it owns [Nodes], the region every expression,
//! statement, scope and predicate lives in; the nodes point at each other
//! through [Handle]s into that region instead of boxes. The tree is built
//! once by the parser, only read by the generator, and dropped in one go
//! along with the Program.

use super::arena::{Arena, Handle};
use super::token::{Token, TokenType};

pub type ExprId = Handle<Expression>;
pub type StmtId = Handle<Statement>;
pub type ScopeId = Handle<Scope>;
pub type PredId = Handle<Predicate>;

/// The region that owns every node of one program
#[derive(Debug, Default)]
pub struct Nodes {
    pub exprs: Arena<Expression>,
    pub stmts: Arena<Statement>,
    pub scopes: Arena<Scope>,
    pub preds: Arena<Predicate>,
}

#[derive(Debug)]
pub struct Program {
    pub nodes: Nodes,
    pub statements: Vec<StmtId>,
}

#[derive(PartialEq, Clone, Debug)]
pub enum Term {
    /// the token is always a [TokenType::IntLit]
    IntLit(Token),
    /// the token is always a [TokenType::Identifier]
    Identifier(Token),
    Paren(ExprId),
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}
impl BinaryOp {
    pub fn from_token(kind: &TokenType) -> Option<Self> {
        match kind {
            TokenType::Plus => Some(BinaryOp::Add),
            TokenType::Minus => Some(BinaryOp::Subtract),
            TokenType::Times => Some(BinaryOp::Multiply),
            TokenType::Divide => Some(BinaryOp::Divide),
            _ => None,
        }
    }
}
impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
        };
        write!(f, "{}", s)
    }
}

#[derive(PartialEq, Clone, Debug)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub left: ExprId,
    pub right: ExprId,
}

#[derive(PartialEq, Clone, Debug)]
pub enum Expression {
    Term(Term),
    Binary(BinaryExpr),
}

#[derive(PartialEq, Clone, Debug)]
pub enum Statement {
    Exit(ExprId),
    /// `ident` is always an identifier token, kept whole for its span
    Let { ident: Token, value: ExprId },
    Assign { ident: Token, value: ExprId },
    Scope(ScopeId),
    If(If),
}

/// a braced block
#[derive(PartialEq, Clone, Debug)]
pub struct Scope {
    pub statements: Vec<StmtId>,
}

#[derive(PartialEq, Clone, Debug)]
pub struct If {
    pub condition: ExprId,
    pub scope: ScopeId,
    pub predicate: Option<PredId>,
}

/// What may follow an if's scope. ElseIf can chain on to another
/// predicate, Else is always the last link
#[derive(PartialEq, Clone, Debug)]
pub enum Predicate {
    ElseIf { condition: ExprId, scope: ScopeId, next: Option<PredId> },
    Else(ScopeId),
}

impl Program {
    pub fn expr(&self, id: ExprId) -> &Expression {
        &self.nodes.exprs[id]
    }
    pub fn stmt(&self, id: StmtId) -> &Statement {
        &self.nodes.stmts[id]
    }
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.nodes.scopes[id]
    }
    pub fn pred(&self, id: PredId) -> &Predicate {
        &self.nodes.preds[id]
    }

    /// The whole expression fully parenthesized, so `1 + 2 * 3` comes out as
    /// `(1 + (2 * 3))`. Source parentheses don't add any of their own
    pub fn render_expr(&self, id: ExprId) -> String {
        match self.expr(id) {
            Expression::Term(Term::IntLit(token)) | Expression::Term(Term::Identifier(token)) => {
                token.kind.text()
            }
            Expression::Term(Term::Paren(inner)) => self.render_expr(*inner),
            Expression::Binary(binary) => format!(
                "({} {} {})",
                self.render_expr(binary.left),
                binary.op,
                self.render_expr(binary.right)
            ),
        }
    }

    fn fmt_stmt(&self, f: &mut std::fmt::Formatter, id: StmtId, depth: usize) -> std::fmt::Result {
        let indent = "    ".repeat(depth);
        match self.stmt(id) {
            Statement::Exit(expr) => writeln!(f, "{}exit {}", indent, self.render_expr(*expr)),
            Statement::Let { ident, value } => {
                writeln!(f, "{}let {} = {}", indent, ident.kind.text(), self.render_expr(*value))
            }
            Statement::Assign { ident, value } => {
                writeln!(f, "{}{} = {}", indent, ident.kind.text(), self.render_expr(*value))
            }
            Statement::Scope(scope) => self.fmt_scope(f, *scope, depth),
            Statement::If(stmt) => {
                writeln!(f, "{}if {}", indent, self.render_expr(stmt.condition))?;
                self.fmt_scope(f, stmt.scope, depth)?;
                let mut next = stmt.predicate;
                while let Some(pred) = next {
                    match self.pred(pred) {
                        Predicate::ElseIf { condition, scope, next: after } => {
                            writeln!(f, "{}elif {}", indent, self.render_expr(*condition))?;
                            self.fmt_scope(f, *scope, depth)?;
                            next = *after;
                        }
                        Predicate::Else(scope) => {
                            writeln!(f, "{}else", indent)?;
                            self.fmt_scope(f, *scope, depth)?;
                            next = None;
                        }
                    }
                }
                Ok(())
            }
        }
    }

    fn fmt_scope(&self, f: &mut std::fmt::Formatter, id: ScopeId, depth: usize) -> std::fmt::Result {
        let indent = "    ".repeat(depth);
        writeln!(f, "{}{{", indent)?;
        for stmt in &self.scope(id).statements {
            self.fmt_stmt(f, *stmt, depth + 1)?;
        }
        writeln!(f, "{}}}", indent)
    }
}

impl std::fmt::Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for stmt in &self.statements {
            self.fmt_stmt(f, *stmt, 0)?;
        }
        Ok(())
    }
}
