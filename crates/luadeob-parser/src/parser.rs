//! Lua/Luau parser.
//!
//! Recursive descent for statements, precedence climbing for binary
//! operators (same binding powers as the reference Lua implementation).
//!
//! Luau type syntax is accepted and thrown away here: annotations on locals,
//! loop variables, parameters and returns, generic parameter lists, `::`
//! casts and `type`/`export type` declarations never reach the AST.

use crate::ast::*;
use crate::lexer::Lexer;
use crate::span::Span;
use crate::token::{Token, TokenKind, UNARY_PRECEDENCE};

/// Parse error.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}..{}",
            self.message, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for ParseError {}

/// Deepest nesting of blocks, expressions and types the parser accepts.
/// Everything downstream walks the tree recursively, so this also bounds
/// the renamer and the printer.
pub const MAX_DEPTH: u32 = 200;

/// The parser.
pub struct Parser<'a> {
    /// The lexer.
    lexer: Lexer<'a>,
    /// Current token.
    current: Token,
    /// End offset of the previously consumed token.
    prev_end: u32,
    /// Source code (for creating AST).
    source: &'a str,
    /// Current nesting level, see [`MAX_DEPTH`].
    depth: u32,
}

impl<'a> Parser<'a> {
    /// Create a new parser.
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            prev_end: 0,
            source,
            depth: 0,
        }
    }

    /// Parse the entire source into an AST.
    pub fn parse(mut self) -> Result<Ast, ParseError> {
        let block = self.parse_block()?;
        if !self.is_eof() {
            return Err(self.unexpected("end of input"));
        }
        Ok(Ast::new(block, self.source.to_string()))
    }

    // =========================================================================
    // Token Handling
    // =========================================================================

    fn peek(&self) -> &TokenKind {
        &self.current.kind
    }

    fn advance(&mut self) -> Token {
        self.prev_end = self.current.span.end;
        std::mem::replace(&mut self.current, self.lexer.next_token())
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(kind)
    }

    fn is_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&describe(kind)))
        }
    }

    /// Expect the closing token of a construct opened at `open`.
    fn expect_closing(&mut self, kind: &TokenKind, opener: &str, open: Span) -> Result<(), ParseError> {
        if self.eat(kind) {
            return Ok(());
        }
        let mut err = self.unexpected(&describe(kind));
        err.message.push_str(&format!(" (to close {opener} at offset {})", open.start));
        Err(err)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let message = match self.peek() {
            TokenKind::Invalid => "unexpected character".to_string(),
            TokenKind::UnterminatedString => "unterminated string".to_string(),
            TokenKind::UnterminatedComment => "unterminated comment".to_string(),
            found => format!("expected {expected}, found {}", describe(found)),
        };
        ParseError::new(message, self.current.span)
    }

    /// Go one level deeper, failing past [`MAX_DEPTH`].
    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::new(
                format!("too many nested levels (limit is {MAX_DEPTH})"),
                self.current.span,
            ));
        }
        Ok(())
    }

    fn leave(&mut self, levels: u32) {
        self.depth -= levels;
    }

    fn expect_name(&mut self) -> Result<Name, ParseError> {
        if let TokenKind::Identifier(text) = self.peek() {
            let name = Name::new(text.clone(), self.current.span);
            self.advance();
            Ok(name)
        } else {
            Err(self.unexpected("name"))
        }
    }

    // =========================================================================
    // Blocks and Statements
    // =========================================================================

    fn parse_block(&mut self) -> Result<Block, ParseError> {
        self.enter()?;
        let start = self.current.span.start;
        let mut stmts = Vec::new();
        loop {
            if self.eat(&TokenKind::Semicolon) {
                continue;
            }
            if self.peek().ends_block() {
                break;
            }
            if self.check(&TokenKind::Return) {
                stmts.push(self.parse_return()?);
                if !self.peek().ends_block() {
                    return Err(self.unexpected("end of block after 'return'"));
                }
                break;
            }
            if let Some(stmt) = self.parse_stmt()? {
                stmts.push(stmt);
            }
        }
        let end = self.prev_end.max(start);
        self.leave(1);
        Ok(Block::new(stmts, Span::new(start, end)))
    }

    /// Parse a statement. Returns `None` for statements that only carry type
    /// information and are dropped.
    fn parse_stmt(&mut self) -> Result<Option<Stmt>, ParseError> {
        let start = self.current.span.start;
        if let TokenKind::Identifier(word) = self.peek().clone() {
            if let Some(kind) = self.parse_contextual_stmt(&word)? {
                return Ok(kind.map(|kind| Stmt::new(kind, Span::new(start, self.prev_end))));
            }
        }
        let kind = match self.peek() {
            TokenKind::Local => self.parse_local()?,
            TokenKind::Function => self.parse_function_stmt()?,
            TokenKind::If => self.parse_if()?,
            TokenKind::While => self.parse_while()?,
            TokenKind::Do => {
                let open = self.advance().span;
                let body = self.parse_block()?;
                self.expect_closing(&TokenKind::End, "'do'", open)?;
                StmtKind::Do(body)
            }
            TokenKind::For => self.parse_for()?,
            TokenKind::Repeat => self.parse_repeat()?,
            TokenKind::Break => {
                self.advance();
                StmtKind::Break
            }
            TokenKind::Goto => {
                self.advance();
                StmtKind::Goto(self.expect_name()?.text)
            }
            TokenKind::ColonColon => {
                self.advance();
                let label = self.expect_name()?.text;
                self.expect(&TokenKind::ColonColon)?;
                StmtKind::Label(label)
            }
            _ => self.parse_expr_stmt()?,
        };
        Ok(Some(Stmt::new(kind, Span::new(start, self.prev_end))))
    }

    /// Luau statements introduced by a contextual keyword (`continue`,
    /// `type`, `export type`). Returns `None` when `word` is an ordinary name
    /// here, `Some(None)` for a dropped type declaration.
    fn parse_contextual_stmt(&mut self, word: &str) -> Result<Option<Option<StmtKind>>, ParseError> {
        let next = self.lexer.peek().kind;
        match word {
            "continue" if is_statement_boundary(&next) => {
                self.advance();
                Ok(Some(Some(StmtKind::Continue)))
            }
            "type" if matches!(next, TokenKind::Identifier(_)) => {
                self.skip_type_declaration()?;
                Ok(Some(None))
            }
            "export" if matches!(&next, TokenKind::Identifier(t) if t == "type") => {
                self.advance();
                self.skip_type_declaration()?;
                Ok(Some(None))
            }
            _ => Ok(None),
        }
    }

    fn parse_local(&mut self) -> Result<StmtKind, ParseError> {
        self.expect(&TokenKind::Local)?;
        if self.eat(&TokenKind::Function) {
            let name = self.expect_name()?;
            let func = self.parse_function_body(name.span.start)?;
            return Ok(StmtKind::LocalFunction { name, func });
        }

        let mut names = vec![self.parse_typed_name()?];
        while self.eat(&TokenKind::Comma) {
            names.push(self.parse_typed_name()?);
        }
        let values = if self.eat(&TokenKind::Eq) {
            self.parse_expr_list()?
        } else {
            Vec::new()
        };
        Ok(StmtKind::LocalAssign { names, values })
    }

    /// A name optionally followed by a discarded `: Type` annotation.
    fn parse_typed_name(&mut self) -> Result<Name, ParseError> {
        let name = self.expect_name()?;
        if self.eat(&TokenKind::Colon) {
            self.skip_type()?;
        }
        Ok(name)
    }

    fn parse_function_stmt(&mut self) -> Result<StmtKind, ParseError> {
        let start = self.expect(&TokenKind::Function)?.span.start;
        let base = self.expect_name()?;
        let mut name = FunctionName::simple(base);
        while self.eat(&TokenKind::Dot) {
            name.fields.push(self.expect_name()?.text);
        }
        if self.eat(&TokenKind::Colon) {
            name.method = Some(self.expect_name()?.text);
        }
        let func = self.parse_function_body(start)?;
        Ok(StmtKind::Function { name, func })
    }

    /// Parse `<generics>? (params) (: ReturnType)? block end`.
    fn parse_function_body(&mut self, start: u32) -> Result<Function, ParseError> {
        if self.check(&TokenKind::Lt) {
            self.skip_angle_brackets()?;
        }
        let open = self.expect(&TokenKind::LParen)?.span;
        let mut params = Vec::new();
        let mut is_vararg = false;
        if !self.check(&TokenKind::RParen) {
            loop {
                if self.eat(&TokenKind::Ellipsis) {
                    if self.eat(&TokenKind::Colon) {
                        self.skip_type()?;
                    }
                    is_vararg = true;
                    break;
                }
                params.push(self.parse_typed_name()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect_closing(&TokenKind::RParen, "'('", open)?;
        if self.eat(&TokenKind::Colon) {
            self.skip_type()?;
        }
        let body = self.parse_block()?;
        self.expect_closing(&TokenKind::End, "'function'", Span::empty(start))?;
        Ok(Function {
            params,
            is_vararg,
            body,
            span: Span::new(start, self.prev_end),
        })
    }

    fn parse_if(&mut self) -> Result<StmtKind, ParseError> {
        let open = self.expect(&TokenKind::If)?.span;
        let mut branches = vec![self.parse_if_branch(open.start)?];
        let mut else_block = None;
        loop {
            if self.check(&TokenKind::Elseif) {
                let branch_start = self.advance().span.start;
                branches.push(self.parse_if_branch(branch_start)?);
            } else if self.eat(&TokenKind::Else) {
                else_block = Some(self.parse_block()?);
                break;
            } else {
                break;
            }
        }
        self.expect_closing(&TokenKind::End, "'if'", open)?;
        Ok(StmtKind::If { branches, else_block })
    }

    fn parse_if_branch(&mut self, start: u32) -> Result<IfBranch, ParseError> {
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::Then)?;
        let body = self.parse_block()?;
        Ok(IfBranch {
            cond,
            body,
            span: Span::new(start, self.prev_end),
        })
    }

    fn parse_while(&mut self) -> Result<StmtKind, ParseError> {
        let open = self.expect(&TokenKind::While)?.span;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::Do)?;
        let body = self.parse_block()?;
        self.expect_closing(&TokenKind::End, "'while'", open)?;
        Ok(StmtKind::While { cond, body })
    }

    fn parse_repeat(&mut self) -> Result<StmtKind, ParseError> {
        let open = self.expect(&TokenKind::Repeat)?.span;
        let body = self.parse_block()?;
        self.expect_closing(&TokenKind::Until, "'repeat'", open)?;
        let cond = self.parse_expr()?;
        Ok(StmtKind::Repeat { body, cond })
    }

    fn parse_for(&mut self) -> Result<StmtKind, ParseError> {
        let open = self.expect(&TokenKind::For)?.span;
        let first = self.parse_typed_name()?;

        if self.eat(&TokenKind::Eq) {
            let start = self.parse_expr()?;
            self.expect(&TokenKind::Comma)?;
            let limit = self.parse_expr()?;
            let step = if self.eat(&TokenKind::Comma) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            self.expect(&TokenKind::Do)?;
            let body = self.parse_block()?;
            self.expect_closing(&TokenKind::End, "'for'", open)?;
            return Ok(StmtKind::For { var: first, start, limit, step, body });
        }

        let mut vars = vec![first];
        while self.eat(&TokenKind::Comma) {
            vars.push(self.parse_typed_name()?);
        }
        if !self.eat(&TokenKind::In) {
            return Err(self.unexpected("'=' or 'in'"));
        }
        let iter = self.parse_expr_list()?;
        self.expect(&TokenKind::Do)?;
        let body = self.parse_block()?;
        self.expect_closing(&TokenKind::End, "'for'", open)?;
        Ok(StmtKind::ForIn { vars, iter, body })
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        let start = self.expect(&TokenKind::Return)?.span.start;
        let values = if self.peek().ends_block() || self.check(&TokenKind::Semicolon) {
            Vec::new()
        } else {
            self.parse_expr_list()?
        };
        self.eat(&TokenKind::Semicolon);
        Ok(Stmt::new(StmtKind::Return(values), Span::new(start, self.prev_end)))
    }

    /// Assignment, compound assignment or call statement.
    fn parse_expr_stmt(&mut self) -> Result<StmtKind, ParseError> {
        let first = self.parse_suffixed_expr()?;

        if self.check(&TokenKind::Eq) || self.check(&TokenKind::Comma) {
            let mut targets = vec![first];
            while self.eat(&TokenKind::Comma) {
                targets.push(self.parse_suffixed_expr()?);
            }
            if let Some(bad) = targets.iter().find(|t| !t.is_assignable()) {
                return Err(ParseError::new("cannot assign to this expression", bad.span));
            }
            self.expect(&TokenKind::Eq)?;
            let values = self.parse_expr_list()?;
            return Ok(StmtKind::Assign { targets, values });
        }

        if let Some(op) = compound_op(self.peek()) {
            if !first.is_assignable() {
                return Err(ParseError::new("cannot assign to this expression", first.span));
            }
            self.advance();
            let value = self.parse_expr()?;
            return Ok(StmtKind::CompoundAssign { op, target: first, value });
        }

        if matches!(first.kind, ExprKind::Call { .. } | ExprKind::MethodCall { .. }) {
            Ok(StmtKind::Call(first))
        } else {
            Err(ParseError::new("syntax error: expected assignment or function call", first.span))
        }
    }

    // =========================================================================
    // Expression Parsing (precedence climbing)
    // =========================================================================

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_sub_expr(0)
    }

    fn parse_expr_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut exprs = vec![self.parse_expr()?];
        while self.eat(&TokenKind::Comma) {
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }

    /// Parse a binary expression whose operators bind tighter than `limit`.
    ///
    /// Each operator folded into `left` makes the tree one level deeper, so
    /// it counts against the depth limit until this call returns.
    fn parse_sub_expr(&mut self, limit: u8) -> Result<Expr, ParseError> {
        self.enter()?;
        let mut levels = 1;
        let start = self.current.span.start;
        let mut left = match unary_op(self.peek()) {
            Some(op) => {
                self.advance();
                let arg = self.parse_sub_expr(UNARY_PRECEDENCE)?;
                Expr::new(
                    ExprKind::Unary { op, arg: Box::new(arg) },
                    Span::new(start, self.prev_end),
                )
            }
            None => self.parse_simple_expr()?,
        };

        while let Some(op) = binary_op(self.peek()) {
            let (left_prec, right_prec) = op.precedence();
            if left_prec <= limit {
                break;
            }
            self.advance();
            let right = self.parse_sub_expr(right_prec)?;
            self.enter()?;
            levels += 1;
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                Span::new(start, self.prev_end),
            );
        }

        self.leave(levels);
        Ok(left)
    }

    fn parse_simple_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.current.span.start;
        let kind = match self.peek().clone() {
            TokenKind::Number(raw) => {
                self.advance();
                ExprKind::Number(raw)
            }
            TokenKind::String(raw) => {
                self.advance();
                ExprKind::String(raw)
            }
            TokenKind::Nil => {
                self.advance();
                ExprKind::Nil
            }
            TokenKind::True => {
                self.advance();
                ExprKind::Bool(true)
            }
            TokenKind::False => {
                self.advance();
                ExprKind::Bool(false)
            }
            TokenKind::Ellipsis => {
                self.advance();
                ExprKind::Vararg
            }
            TokenKind::LBrace => ExprKind::Table(self.parse_table()?),
            TokenKind::Function => {
                self.advance();
                ExprKind::Function(Box::new(self.parse_function_body(start)?))
            }
            TokenKind::InterpNoSub(_) | TokenKind::InterpBegin(_) => self.parse_interp_string()?,
            TokenKind::If => self.parse_if_expr()?,
            _ => {
                let expr = self.parse_suffixed_expr()?;
                return self.parse_cast(expr);
            }
        };
        let expr = Expr::new(kind, Span::new(start, self.prev_end));
        self.parse_cast(expr)
    }

    /// Discard any Luau `:: Type` casts following `expr`. A `::name::` that
    /// follows is a label, not a cast.
    fn parse_cast(&mut self, expr: Expr) -> Result<Expr, ParseError> {
        while self.check(&TokenKind::ColonColon) && !self.at_label() {
            self.advance();
            self.skip_type()?;
        }
        Ok(expr)
    }

    fn at_label(&mut self) -> bool {
        matches!(self.lexer.peek().kind, TokenKind::Identifier(_))
            && matches!(self.lexer.peek_nth(1).kind, TokenKind::ColonColon)
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.current.span.start;
        match self.peek() {
            TokenKind::Identifier(_) => Ok(Expr::name(self.expect_name()?)),
            TokenKind::LParen => {
                let open = self.advance().span;
                let inner = self.parse_expr()?;
                self.expect_closing(&TokenKind::RParen, "'('", open)?;
                Ok(Expr::new(
                    ExprKind::Paren(Box::new(inner)),
                    Span::new(start, self.prev_end),
                ))
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// Primary expression followed by any number of `.name`, `[key]`,
    /// `:method(args)` and call suffixes.
    fn parse_suffixed_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.current.span.start;
        let mut expr = self.parse_primary_expr()?;
        let mut levels = 0;
        loop {
            let kind = match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect_name()?.text;
                    ExprKind::Member { object: Box::new(expr), name }
                }
                TokenKind::LBracket => {
                    let open = self.advance().span;
                    let key = self.parse_expr()?;
                    self.expect_closing(&TokenKind::RBracket, "'['", open)?;
                    ExprKind::Index { object: Box::new(expr), key: Box::new(key) }
                }
                TokenKind::Colon => {
                    self.advance();
                    let method = self.expect_name()?.text;
                    let args = self.parse_call_args()?;
                    ExprKind::MethodCall { object: Box::new(expr), method, args }
                }
                TokenKind::LParen | TokenKind::String(_) | TokenKind::LBrace => {
                    let args = self.parse_call_args()?;
                    ExprKind::Call { callee: Box::new(expr), args }
                }
                _ => break,
            };
            self.enter()?;
            levels += 1;
            expr = Expr::new(kind, Span::new(start, self.prev_end));
        }
        self.leave(levels);
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> Result<CallArgs, ParseError> {
        match self.peek().clone() {
            TokenKind::String(raw) => {
                self.advance();
                Ok(CallArgs::String(raw))
            }
            TokenKind::LBrace => Ok(CallArgs::Table(self.parse_table()?)),
            TokenKind::LParen => {
                let open = self.advance().span;
                let args = if self.check(&TokenKind::RParen) {
                    Vec::new()
                } else {
                    self.parse_expr_list()?
                };
                self.expect_closing(&TokenKind::RParen, "'('", open)?;
                Ok(CallArgs::Parens(args))
            }
            _ => Err(self.unexpected("function arguments")),
        }
    }

    fn parse_table(&mut self) -> Result<Vec<Field>, ParseError> {
        let open = self.expect(&TokenKind::LBrace)?.span;
        let mut fields = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let named = matches!(self.peek(), TokenKind::Identifier(_))
                && matches!(self.lexer.peek().kind, TokenKind::Eq);
            let field = match self.peek() {
                TokenKind::LBracket => {
                    let bracket = self.advance().span;
                    let key = self.parse_expr()?;
                    self.expect_closing(&TokenKind::RBracket, "'['", bracket)?;
                    self.expect(&TokenKind::Eq)?;
                    let value = self.parse_expr()?;
                    Field::Keyed { key, value }
                }
                TokenKind::Identifier(_) if named => {
                    let name = self.expect_name()?.text;
                    self.advance(); // '='
                    let value = self.parse_expr()?;
                    Field::Named { name, value }
                }
                _ => Field::Positional(self.parse_expr()?),
            };
            fields.push(field);
            if !self.eat(&TokenKind::Comma) && !self.eat(&TokenKind::Semicolon) {
                break;
            }
        }
        self.expect_closing(&TokenKind::RBrace, "'{'", open)?;
        Ok(fields)
    }

    fn parse_interp_string(&mut self) -> Result<ExprKind, ParseError> {
        let mut parts = Vec::new();
        let mut exprs = Vec::new();
        match self.advance().kind {
            TokenKind::InterpNoSub(text) => {
                parts.push(text);
                return Ok(ExprKind::InterpString { parts, exprs });
            }
            TokenKind::InterpBegin(text) => parts.push(text),
            _ => unreachable!("caller checked for an interpolated string token"),
        }
        loop {
            exprs.push(self.parse_expr()?);
            match self.peek().clone() {
                TokenKind::InterpMid(text) => {
                    self.advance();
                    parts.push(text);
                }
                TokenKind::InterpEnd(text) => {
                    self.advance();
                    parts.push(text);
                    return Ok(ExprKind::InterpString { parts, exprs });
                }
                _ => return Err(self.unexpected("'}' closing the interpolation")),
            }
        }
    }

    fn parse_if_expr(&mut self) -> Result<ExprKind, ParseError> {
        self.expect(&TokenKind::If)?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::Then)?;
        let then = self.parse_expr()?;
        let mut elseifs = Vec::new();
        while self.eat(&TokenKind::Elseif) {
            let c = self.parse_expr()?;
            self.expect(&TokenKind::Then)?;
            elseifs.push((c, self.parse_expr()?));
        }
        self.expect(&TokenKind::Else)?;
        let else_ = self.parse_expr()?;
        Ok(ExprKind::IfElse {
            cond: Box::new(cond),
            then: Box::new(then),
            elseifs,
            else_: Box::new(else_),
        })
    }

    // =========================================================================
    // Luau type syntax (consumed, never stored)
    // =========================================================================

    /// `type Name<Generics> = Type`, cursor on `type`.
    fn skip_type_declaration(&mut self) -> Result<(), ParseError> {
        self.advance(); // `type`
        self.expect_name()?;
        if self.check(&TokenKind::Lt) {
            self.skip_angle_brackets()?;
        }
        self.expect(&TokenKind::Eq)?;
        self.skip_type()
    }

    fn skip_type(&mut self) -> Result<(), ParseError> {
        self.enter()?;
        // A leading `|` or `&` is allowed before the first member.
        let _ = self.eat(&TokenKind::Pipe) || self.eat(&TokenKind::Amp);
        loop {
            self.skip_simple_type()?;
            while self.eat(&TokenKind::Question) {}
            if !(self.eat(&TokenKind::Pipe) || self.eat(&TokenKind::Amp)) {
                break;
            }
        }
        self.leave(1);
        Ok(())
    }

    fn skip_simple_type(&mut self) -> Result<(), ParseError> {
        let is_typeof = matches!(self.peek(), TokenKind::Identifier(name) if name == "typeof");
        match self.peek() {
            TokenKind::Nil | TokenKind::True | TokenKind::False | TokenKind::String(_) => {
                self.advance();
            }
            TokenKind::Identifier(_) if is_typeof => {
                self.advance();
                self.skip_balanced(&TokenKind::LParen, &TokenKind::RParen)?;
            }
            TokenKind::Identifier(_) => {
                self.advance();
                while self.eat(&TokenKind::Dot) {
                    self.expect_name()?;
                }
                if self.check(&TokenKind::Lt) {
                    self.skip_angle_brackets()?;
                }
            }
            TokenKind::Ellipsis => {
                self.advance();
                self.skip_type()?;
            }
            TokenKind::LBrace => {
                self.skip_balanced(&TokenKind::LBrace, &TokenKind::RBrace)?;
            }
            TokenKind::Lt | TokenKind::LParen => {
                // Function type, possibly generic: `<T>(T) -> T`, or a
                // parenthesized type / type pack.
                if self.check(&TokenKind::Lt) {
                    self.skip_angle_brackets()?;
                }
                self.skip_balanced(&TokenKind::LParen, &TokenKind::RParen)?;
                if self.eat(&TokenKind::Arrow) {
                    self.skip_type()?;
                }
            }
            _ => return Err(self.unexpected("type")),
        }
        Ok(())
    }

    /// Skip a balanced `open ... close` group, cursor on `open`.
    fn skip_balanced(&mut self, open: &TokenKind, close: &TokenKind) -> Result<(), ParseError> {
        let opener = self.expect(open)?.span;
        let mut depth = 1u32;
        while depth > 0 {
            match self.peek() {
                TokenKind::Eof
                | TokenKind::Invalid
                | TokenKind::UnterminatedString
                | TokenKind::UnterminatedComment => {
                    let mut err = self.unexpected(&describe(close));
                    err.message.push_str(&format!(" (to close type at offset {})", opener.start));
                    return Err(err);
                }
                kind if std::mem::discriminant(kind) == std::mem::discriminant(open) => depth += 1,
                kind if std::mem::discriminant(kind) == std::mem::discriminant(close) => depth -= 1,
                _ => {}
            }
            self.advance();
        }
        Ok(())
    }

    /// Skip a generic list `<...>`. `>>` closes two levels; a `>=` that closes
    /// the list leaves an `=` behind (`local x: Map<K, V>= {}`).
    fn skip_angle_brackets(&mut self) -> Result<(), ParseError> {
        let opener = self.expect(&TokenKind::Lt)?.span;
        let mut depth = 1u32;
        loop {
            match self.peek() {
                TokenKind::Lt => depth += 1,
                TokenKind::Gt => depth -= 1,
                TokenKind::GtGt => depth = depth.saturating_sub(2),
                TokenKind::GtEq if depth == 1 => {
                    let span = self.current.span;
                    self.prev_end = span.start + 1;
                    self.current = Token::new(TokenKind::Eq, Span::new(span.start + 1, span.end));
                    return Ok(());
                }
                TokenKind::Eof
                | TokenKind::Invalid
                | TokenKind::UnterminatedString
                | TokenKind::UnterminatedComment => {
                    let mut err = self.unexpected("'>'");
                    err.message.push_str(&format!(" (to close '<' at offset {})", opener.start));
                    return Err(err);
                }
                _ => {}
            }
            self.advance();
            if depth == 0 {
                return Ok(());
            }
        }
    }
}

/// `continue` is a keyword only when what follows cannot continue an
/// expression statement starting with a name.
fn is_statement_boundary(next: &TokenKind) -> bool {
    !matches!(
        next,
        TokenKind::LParen
            | TokenKind::Dot
            | TokenKind::LBracket
            | TokenKind::Colon
            | TokenKind::Eq
            | TokenKind::Comma
            | TokenKind::String(_)
            | TokenKind::LBrace
            | TokenKind::InterpNoSub(_)
            | TokenKind::InterpBegin(_)
    ) && !next.is_compound_assignment()
}

fn unary_op(kind: &TokenKind) -> Option<UnaryOp> {
    match kind {
        TokenKind::Not => Some(UnaryOp::Not),
        TokenKind::Minus => Some(UnaryOp::Neg),
        TokenKind::Hash => Some(UnaryOp::Len),
        TokenKind::Tilde => Some(UnaryOp::BitNot),
        _ => None,
    }
}

fn binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Plus => Some(BinaryOp::Add),
        TokenKind::Minus => Some(BinaryOp::Sub),
        TokenKind::Star => Some(BinaryOp::Mul),
        TokenKind::Slash => Some(BinaryOp::Div),
        TokenKind::SlashSlash => Some(BinaryOp::FloorDiv),
        TokenKind::Percent => Some(BinaryOp::Mod),
        TokenKind::Caret => Some(BinaryOp::Pow),
        TokenKind::DotDot => Some(BinaryOp::Concat),
        TokenKind::EqEq => Some(BinaryOp::Eq),
        TokenKind::TildeEq => Some(BinaryOp::NotEq),
        TokenKind::Lt => Some(BinaryOp::Lt),
        TokenKind::LtEq => Some(BinaryOp::LtEq),
        TokenKind::Gt => Some(BinaryOp::Gt),
        TokenKind::GtEq => Some(BinaryOp::GtEq),
        TokenKind::And => Some(BinaryOp::And),
        TokenKind::Or => Some(BinaryOp::Or),
        TokenKind::Amp => Some(BinaryOp::BitAnd),
        TokenKind::Pipe => Some(BinaryOp::BitOr),
        TokenKind::Tilde => Some(BinaryOp::BitXor),
        TokenKind::LtLt => Some(BinaryOp::Shl),
        TokenKind::GtGt => Some(BinaryOp::Shr),
        _ => None,
    }
}

fn compound_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::PlusEq => Some(BinaryOp::Add),
        TokenKind::MinusEq => Some(BinaryOp::Sub),
        TokenKind::StarEq => Some(BinaryOp::Mul),
        TokenKind::SlashEq => Some(BinaryOp::Div),
        TokenKind::SlashSlashEq => Some(BinaryOp::FloorDiv),
        TokenKind::PercentEq => Some(BinaryOp::Mod),
        TokenKind::CaretEq => Some(BinaryOp::Pow),
        TokenKind::DotDotEq => Some(BinaryOp::Concat),
        _ => None,
    }
}

/// Human-readable token description for error messages.
fn describe(kind: &TokenKind) -> String {
    let fixed = match kind {
        TokenKind::Identifier(name) => return format!("'{name}'"),
        TokenKind::Number(raw) | TokenKind::String(raw) => return format!("'{raw}'"),
        TokenKind::InterpNoSub(_)
        | TokenKind::InterpBegin(_)
        | TokenKind::InterpMid(_)
        | TokenKind::InterpEnd(_) => "interpolated string",
        TokenKind::And => "'and'",
        TokenKind::Break => "'break'",
        TokenKind::Do => "'do'",
        TokenKind::Else => "'else'",
        TokenKind::Elseif => "'elseif'",
        TokenKind::End => "'end'",
        TokenKind::False => "'false'",
        TokenKind::For => "'for'",
        TokenKind::Function => "'function'",
        TokenKind::Goto => "'goto'",
        TokenKind::If => "'if'",
        TokenKind::In => "'in'",
        TokenKind::Local => "'local'",
        TokenKind::Nil => "'nil'",
        TokenKind::Not => "'not'",
        TokenKind::Or => "'or'",
        TokenKind::Repeat => "'repeat'",
        TokenKind::Return => "'return'",
        TokenKind::Then => "'then'",
        TokenKind::True => "'true'",
        TokenKind::Until => "'until'",
        TokenKind::While => "'while'",
        TokenKind::LParen => "'('",
        TokenKind::RParen => "')'",
        TokenKind::LBrace => "'{'",
        TokenKind::RBrace => "'}'",
        TokenKind::LBracket => "'['",
        TokenKind::RBracket => "']'",
        TokenKind::Semicolon => "';'",
        TokenKind::Comma => "','",
        TokenKind::Colon => "':'",
        TokenKind::ColonColon => "'::'",
        TokenKind::Dot => "'.'",
        TokenKind::DotDot => "'..'",
        TokenKind::Ellipsis => "'...'",
        TokenKind::Arrow => "'->'",
        TokenKind::Question => "'?'",
        TokenKind::Eq => "'='",
        TokenKind::EqEq => "'=='",
        TokenKind::TildeEq => "'~='",
        TokenKind::Lt => "'<'",
        TokenKind::LtEq => "'<='",
        TokenKind::Gt => "'>'",
        TokenKind::GtEq => "'>='",
        TokenKind::Plus => "'+'",
        TokenKind::Minus => "'-'",
        TokenKind::Star => "'*'",
        TokenKind::Slash => "'/'",
        TokenKind::SlashSlash => "'//'",
        TokenKind::Percent => "'%'",
        TokenKind::Caret => "'^'",
        TokenKind::Hash => "'#'",
        TokenKind::Amp => "'&'",
        TokenKind::Tilde => "'~'",
        TokenKind::Pipe => "'|'",
        TokenKind::LtLt => "'<<'",
        TokenKind::GtGt => "'>>'",
        TokenKind::PlusEq => "'+='",
        TokenKind::MinusEq => "'-='",
        TokenKind::StarEq => "'*='",
        TokenKind::SlashEq => "'/='",
        TokenKind::SlashSlashEq => "'//='",
        TokenKind::PercentEq => "'%='",
        TokenKind::CaretEq => "'^='",
        TokenKind::DotDotEq => "'..='",
        TokenKind::Eof => "end of input",
        TokenKind::Invalid => "invalid character",
        TokenKind::UnterminatedString => "unterminated string",
        TokenKind::UnterminatedComment => "unterminated comment",
    };
    fixed.to_string()
}
