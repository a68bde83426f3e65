//! The parser.
//!
//! A hand-written recursive-descent parser over C-minus's standard grammar
//! (declaration list of globals/arrays/functions; compound statements with a
//! leading local-declaration list; the usual arithmetic/relational
//! precedence).

use std::fmt::Debug;

use derive_more::Display;

use crate::common::{Id, NodeId};

use super::ast::{ExprType, OpKind, Tree};
use super::lex::{Lexer, Token, TokenKind};

#[derive(Display)]
#[display("Syntax error at line {line}: {message}")]
pub struct ParseError {
    pub line: u32,
    pub message: String,
}

impl Debug for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

pub fn parse(input: &str) -> Result<Tree, ParseError> {
    let tokens = Lexer::new(input).tokenize().map_err(|e| ParseError { line: e.line, message: e.to_string() })?;
    Parser { tokens, pos: 0, tree: Tree::new() }.parse_program()
}

struct Parser<'src> {
    tokens: Vec<Token<'src>>,
    pos: usize,
    tree: Tree,
}

impl<'src> Parser<'src> {
    fn peek(&self) -> Token<'src> {
        self.tokens[self.pos]
    }

    fn kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn advance(&mut self) -> Token<'src> {
        let tok = self.peek();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token<'src>, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError {
                line: self.peek().line,
                message: format!("expected {kind}, found {}", self.peek().kind),
            })
        }
    }

    fn intern(text: &str) -> Id {
        internment::Intern::new(text.to_string())
    }

    fn op_kind(kind: TokenKind) -> OpKind {
        use TokenKind::*;
        match kind {
            Plus => OpKind::Add,
            Minus => OpKind::Sub,
            Times => OpKind::Mul,
            Over => OpKind::Div,
            Mod => OpKind::Mod,
            Eq => OpKind::Eq,
            Ne => OpKind::Ne,
            Lt => OpKind::Lt,
            Le => OpKind::Le,
            Gt => OpKind::Gt,
            Ge => OpKind::Ge,
            other => unreachable!("not an operator token: {other}"),
        }
    }

    fn is_relop(kind: TokenKind) -> bool {
        use TokenKind::*;
        matches!(kind, Eq | Ne | Lt | Le | Gt | Ge)
    }

    fn is_addop(kind: TokenKind) -> bool {
        matches!(kind, TokenKind::Plus | TokenKind::Minus)
    }

    fn is_mulop(kind: TokenKind) -> bool {
        matches!(kind, TokenKind::Times | TokenKind::Over | TokenKind::Mod)
    }

    // program -> decl_list
    fn parse_program(mut self) -> Result<Tree, ParseError> {
        let decls = self.decl_list()?;
        self.tree.root = decls.first().copied();
        for pair in decls.windows(2) {
            self.tree.link_sibling(pair[0], pair[1]);
        }
        self.expect(TokenKind::Eof)?;
        Ok(self.tree)
    }

    fn decl_list(&mut self) -> Result<Vec<NodeId>, ParseError> {
        let mut decls = Vec::new();
        while !self.check(TokenKind::Eof) {
            decls.push(self.decl()?);
        }
        Ok(decls)
    }

    // decl -> var_decl | arr_decl | func_decl, disambiguated by lookahead
    // past `TYPE ID`.
    fn decl(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek().line;
        let ty = self.type_spec()?;
        let name_tok = self.expect(TokenKind::Id)?;
        let name = Self::intern(name_tok.text);

        if self.check(TokenKind::LParen) {
            self.func_decl(line, ty, name)
        } else if self.check(TokenKind::LBracket) {
            self.advance();
            let len_tok = self.expect(TokenKind::Num)?;
            let len: i64 = len_tok.text.parse().unwrap();
            self.expect(TokenKind::RBracket)?;
            self.expect(TokenKind::Semi)?;
            let len_node = self.tree.new_const(len_tok.line, len);
            Ok(self.tree.new_arr_decl(line, name, len_node))
        } else {
            self.expect(TokenKind::Semi)?;
            Ok(self.tree.new_var_decl(line, name))
        }
    }

    fn type_spec(&mut self) -> Result<ExprType, ParseError> {
        if self.check(TokenKind::Int) {
            self.advance();
            Ok(ExprType::Integer)
        } else if self.check(TokenKind::Void) {
            self.advance();
            Ok(ExprType::Void)
        } else {
            Err(ParseError { line: self.peek().line, message: "expected 'int' or 'void'".into() })
        }
    }

    fn func_decl(&mut self, line: u32, ret_ty: ExprType, name: Id) -> Result<NodeId, ParseError> {
        self.expect(TokenKind::LParen)?;
        let params = self.params()?;
        self.expect(TokenKind::RParen)?;
        let body = self.compound_stmt()?;
        Ok(self.tree.new_func_decl(line, name, ret_ty, params.first().copied(), body))
    }

    fn params(&mut self) -> Result<Vec<NodeId>, ParseError> {
        if self.check(TokenKind::Void) {
            self.advance();
            return Ok(Vec::new());
        }
        let mut params = vec![self.param()?];
        while self.check(TokenKind::Comma) {
            self.advance();
            params.push(self.param()?);
        }
        for pair in params.windows(2) {
            self.tree.link_sibling(pair[0], pair[1]);
        }
        Ok(params)
    }

    fn param(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek().line;
        self.type_spec()?;
        let name_tok = self.expect(TokenKind::Id)?;
        let name = Self::intern(name_tok.text);
        if self.check(TokenKind::LBracket) {
            self.advance();
            self.expect(TokenKind::RBracket)?;
            Ok(self.tree.new_param_arr(line, name))
        } else {
            Ok(self.tree.new_param_var(line, name))
        }
    }

    // compound_stmt -> '{' local_decls stmt_list '}'
    fn compound_stmt(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek().line;
        self.expect(TokenKind::LBrace)?;
        let decls = self.local_decls()?;
        let stmts = self.stmt_list()?;
        self.expect(TokenKind::RBrace)?;
        Ok(self.tree.new_compound(line, decls.first().copied(), stmts.first().copied()))
    }

    fn local_decls(&mut self) -> Result<Vec<NodeId>, ParseError> {
        let mut decls = Vec::new();
        while self.check(TokenKind::Int) || self.check(TokenKind::Void) {
            decls.push(self.local_decl()?);
        }
        for pair in decls.windows(2) {
            self.tree.link_sibling(pair[0], pair[1]);
        }
        Ok(decls)
    }

    fn local_decl(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek().line;
        self.type_spec()?;
        let name_tok = self.expect(TokenKind::Id)?;
        let name = Self::intern(name_tok.text);
        if self.check(TokenKind::LBracket) {
            self.advance();
            let len_tok = self.expect(TokenKind::Num)?;
            let len: i64 = len_tok.text.parse().unwrap();
            self.expect(TokenKind::RBracket)?;
            self.expect(TokenKind::Semi)?;
            let len_node = self.tree.new_const(len_tok.line, len);
            Ok(self.tree.new_arr_decl(line, name, len_node))
        } else {
            self.expect(TokenKind::Semi)?;
            Ok(self.tree.new_var_decl(line, name))
        }
    }

    fn stmt_list(&mut self) -> Result<Vec<NodeId>, ParseError> {
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            stmts.push(self.stmt()?);
        }
        for pair in stmts.windows(2) {
            self.tree.link_sibling(pair[0], pair[1]);
        }
        Ok(stmts)
    }

    fn stmt(&mut self) -> Result<NodeId, ParseError> {
        match self.kind() {
            TokenKind::LBrace => self.compound_stmt(),
            TokenKind::If => self.if_stmt(),
            TokenKind::While => self.while_stmt(),
            TokenKind::Return => self.return_stmt(),
            TokenKind::Read => self.read_stmt(),
            TokenKind::Write => self.write_stmt(),
            _ => self.expr_stmt(),
        }
    }

    fn if_stmt(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek().line;
        self.advance();
        self.expect(TokenKind::LParen)?;
        let cond = self.condition()?;
        self.expect(TokenKind::RParen)?;
        let then_body = self.stmt()?;
        let else_body = if self.check(TokenKind::Else) {
            self.advance();
            Some(self.stmt()?)
        } else {
            None
        };
        Ok(self.tree.new_if(line, cond, then_body, else_body))
    }

    fn while_stmt(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek().line;
        self.advance();
        self.expect(TokenKind::LParen)?;
        let cond = self.condition()?;
        self.expect(TokenKind::RParen)?;
        let body = self.stmt()?;
        Ok(self.tree.new_while(line, cond, body))
    }

    fn return_stmt(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek().line;
        self.advance();
        let value = if self.check(TokenKind::Semi) { None } else { Some(self.expr()?) };
        self.expect(TokenKind::Semi)?;
        Ok(self.tree.new_return(line, value))
    }

    fn read_stmt(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek().line;
        self.advance();
        let lvalue = self.var()?;
        self.expect(TokenKind::Semi)?;
        Ok(self.tree.new_read(line, lvalue))
    }

    fn write_stmt(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek().line;
        self.advance();
        let value = self.expr()?;
        self.expect(TokenKind::Semi)?;
        Ok(self.tree.new_write(line, value))
    }

    fn expr_stmt(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek().line;
        let lvalue = self.var()?;
        self.expect(TokenKind::Assign)?;
        let rvalue = self.expr()?;
        self.expect(TokenKind::Semi)?;
        Ok(self.tree.new_assign(line, lvalue, rvalue))
    }

    /// A bare relational comparison, as required in `If`/`While` conditions.
    fn condition(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek().line;
        let lhs = self.additive_expr()?;
        if !Self::is_relop(self.kind()) {
            return Err(ParseError { line, message: "expected a relational comparison".into() });
        }
        let op = Self::op_kind(self.advance().kind);
        let rhs = self.additive_expr()?;
        Ok(self.tree.new_op(line, op, lhs, rhs))
    }

    fn expr(&mut self) -> Result<NodeId, ParseError> {
        let line = self.peek().line;
        let lhs = self.additive_expr()?;
        if Self::is_relop(self.kind()) {
            let op = Self::op_kind(self.advance().kind);
            let rhs = self.additive_expr()?;
            Ok(self.tree.new_op(line, op, lhs, rhs))
        } else {
            Ok(lhs)
        }
    }

    fn additive_expr(&mut self) -> Result<NodeId, ParseError> {
        let mut lhs = self.term()?;
        while Self::is_addop(self.kind()) {
            let line = self.peek().line;
            let op = Self::op_kind(self.advance().kind);
            let rhs = self.term()?;
            lhs = self.tree.new_op(line, op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<NodeId, ParseError> {
        let mut lhs = self.factor()?;
        while Self::is_mulop(self.kind()) {
            let line = self.peek().line;
            let op = Self::op_kind(self.advance().kind);
            let rhs = self.factor()?;
            lhs = self.tree.new_op(line, op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn factor(&mut self) -> Result<NodeId, ParseError> {
        match self.kind() {
            TokenKind::LParen => {
                self.advance();
                let e = self.expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(e)
            }
            TokenKind::Num => {
                let tok = self.advance();
                let val: i64 = tok.text.parse().unwrap();
                Ok(self.tree.new_const(tok.line, val))
            }
            TokenKind::Minus => {
                // unary minus, desugared as `0 - expr`
                let line = self.advance().line;
                let zero = self.tree.new_const(line, 0);
                let rhs = self.factor()?;
                Ok(self.tree.new_op(line, OpKind::Sub, zero, rhs))
            }
            TokenKind::Id => self.var_or_call(),
            _ => Err(ParseError { line: self.peek().line, message: format!("unexpected token {}", self.kind()) }),
        }
    }

    fn var_or_call(&mut self) -> Result<NodeId, ParseError> {
        let name_tok = self.expect(TokenKind::Id)?;
        let name = Self::intern(name_tok.text);
        if self.check(TokenKind::LParen) {
            self.advance();
            let args = self.args()?;
            self.expect(TokenKind::RParen)?;
            Ok(self.tree.new_func_call(name_tok.line, name, args.first().copied()))
        } else if self.check(TokenKind::LBracket) {
            self.advance();
            let index = self.expr()?;
            self.expect(TokenKind::RBracket)?;
            Ok(self.tree.new_arr(name_tok.line, name, Some(index)))
        } else {
            Ok(self.tree.new_var(name_tok.line, name))
        }
    }

    /// A bare `var` lvalue, used by `read` and assignment.
    fn var(&mut self) -> Result<NodeId, ParseError> {
        let name_tok = self.expect(TokenKind::Id)?;
        let name = Self::intern(name_tok.text);
        if self.check(TokenKind::LBracket) {
            self.advance();
            let index = self.expr()?;
            self.expect(TokenKind::RBracket)?;
            Ok(self.tree.new_arr(name_tok.line, name, Some(index)))
        } else {
            Ok(self.tree.new_var(name_tok.line, name))
        }
    }

    fn args(&mut self) -> Result<Vec<NodeId>, ParseError> {
        if self.check(TokenKind::RParen) {
            return Ok(Vec::new());
        }
        let mut args = vec![self.expr()?];
        while self.check(TokenKind::Comma) {
            self.advance();
            args.push(self.expr()?);
        }
        for pair in args.windows(2) {
            self.tree.link_sibling(pair[0], pair[1]);
        }
        Ok(args)
    }
}
