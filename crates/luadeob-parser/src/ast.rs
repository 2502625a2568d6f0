//! AST node types for Lua and Luau.
//!
//! Every node owns its children; there are no back-references. The only
//! text the rename pass ever mutates is [`Name::text`]. Literals keep their
//! raw source spelling so printing never alters a literal value.

use crate::span::Span;

/// The root AST for a parsed chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    /// Top-level block of the chunk.
    pub block: Block,
    /// Source code (for error messages and name collection).
    pub source: String,
}

impl Ast {
    /// Create a new AST.
    pub fn new(block: Block, source: String) -> Self {
        Self { block, source }
    }
}

/// An identifier occurrence: a declaration or a use of a name.
#[derive(Debug, Clone, PartialEq)]
pub struct Name {
    pub text: String,
    pub span: Span,
}

impl Name {
    pub fn new(text: impl Into<String>, span: Span) -> Self {
        Self { text: text.into(), span }
    }
}

/// An ordered sequence of statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>, span: Span) -> Self {
        Self { stmts, span }
    }
}

// =============================================================================
// Statements
// =============================================================================

/// A statement node.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Statement kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    // === Declarations ===
    /// `local a, b = x, y`
    LocalAssign { names: Vec<Name>, values: Vec<Expr> },
    /// `local function f(...) end`
    LocalFunction { name: Name, func: Function },
    /// `function a.b:c(...) end` (an assignment to `a.b.c`, not a declaration)
    Function { name: FunctionName, func: Function },

    // === Assignment and calls ===
    /// `a, t.x = 1, 2`
    Assign { targets: Vec<Expr>, values: Vec<Expr> },
    /// Luau `a += 1`
    CompoundAssign { op: BinaryOp, target: Expr, value: Expr },
    /// Function or method call used as a statement
    Call(Expr),

    // === Control Flow ===
    /// `do ... end`
    Do(Block),
    /// `while cond do ... end`
    While { cond: Expr, body: Block },
    /// `repeat ... until cond`
    Repeat { body: Block, cond: Expr },
    /// `if c then ... elseif d then ... else ... end`
    If {
        branches: Vec<IfBranch>,
        else_block: Option<Block>,
    },
    /// `for i = start, limit, step do ... end`
    For {
        var: Name,
        start: Expr,
        limit: Expr,
        step: Option<Expr>,
        body: Block,
    },
    /// `for k, v in iter do ... end`
    ForIn {
        vars: Vec<Name>,
        iter: Vec<Expr>,
        body: Block,
    },
    /// `return a, b`
    Return(Vec<Expr>),
    /// `break`
    Break,
    /// Luau `continue`
    Continue,
    /// `goto label`
    Goto(String),
    /// `::label::`
    Label(String),
}

/// One `if`/`elseif` arm.
#[derive(Debug, Clone, PartialEq)]
pub struct IfBranch {
    pub cond: Expr,
    pub body: Block,
    pub span: Span,
}

/// The name path of a function statement: `base.fields[0].fields[1]:method`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionName {
    pub base: Name,
    pub fields: Vec<String>,
    pub method: Option<String>,
}

impl FunctionName {
    /// A bare `function name() end`.
    pub fn simple(base: Name) -> Self {
        Self { base, fields: Vec::new(), method: None }
    }
}

/// A function body: parameters plus block.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub params: Vec<Name>,
    /// Whether the parameter list ends with `...`.
    pub is_vararg: bool,
    pub body: Block,
    pub span: Span,
}

// =============================================================================
// Expressions
// =============================================================================

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// A name expression.
    pub fn name(name: Name) -> Self {
        let span = name.span;
        Self::new(ExprKind::Name(name), span)
    }

    /// Check if this expression may be the target of an assignment.
    pub fn is_assignable(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Name(_) | ExprKind::Member { .. } | ExprKind::Index { .. }
        )
    }
}

/// Expression kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    // === Literals ===
    Nil,
    Bool(bool),
    /// `...`
    Vararg,
    /// Number literal (raw source text)
    Number(String),
    /// String literal (raw source text, delimiters included)
    String(String),
    /// Luau interpolated string. `parts.len() == exprs.len() + 1`; parts are
    /// raw text between the holes.
    InterpString { parts: Vec<String>, exprs: Vec<Expr> },

    // === Names and access ===
    Name(Name),
    /// `object.name`
    Member { object: Box<Expr>, name: String },
    /// `object[key]`
    Index { object: Box<Expr>, key: Box<Expr> },

    // === Calls ===
    /// `callee(args)`
    Call { callee: Box<Expr>, args: CallArgs },
    /// `object:method(args)`
    MethodCall {
        object: Box<Expr>,
        method: String,
        args: CallArgs,
    },

    // === Compound ===
    /// `function(...) end`
    Function(Box<Function>),
    /// `{ ... }`
    Table(Vec<Field>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary { op: UnaryOp, arg: Box<Expr> },
    /// `(expr)`; kept because parentheses truncate multiple results
    Paren(Box<Expr>),
    /// Luau `if c then a elseif d then b else e`
    IfElse {
        cond: Box<Expr>,
        then: Box<Expr>,
        elseifs: Vec<(Expr, Expr)>,
        else_: Box<Expr>,
    },
}

/// Call argument forms.
#[derive(Debug, Clone, PartialEq)]
pub enum CallArgs {
    /// `f(a, b)`
    Parens(Vec<Expr>),
    /// `f{...}`
    Table(Vec<Field>),
    /// `f"str"` (raw source text)
    String(String),
}

/// A table constructor field.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// `name = value`; the name is a string key, never a binding
    Named { name: String, value: Expr },
    /// `[key] = value`
    Keyed { key: Expr, value: Expr },
    /// `value`
    Positional(Expr),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    Concat,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinaryOp {
    /// Source spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^",
            BinaryOp::Concat => "..",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "~=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "~",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
        }
    }

    /// `(left, right)` binding power, matching the reference Lua parser.
    pub fn precedence(self) -> (u8, u8) {
        match self {
            BinaryOp::Or => (1, 1),
            BinaryOp::And => (2, 2),
            BinaryOp::Eq
            | BinaryOp::NotEq
            | BinaryOp::Lt
            | BinaryOp::LtEq
            | BinaryOp::Gt
            | BinaryOp::GtEq => (3, 3),
            BinaryOp::BitOr => (4, 4),
            BinaryOp::BitXor => (5, 5),
            BinaryOp::BitAnd => (6, 6),
            BinaryOp::Shl | BinaryOp::Shr => (7, 7),
            BinaryOp::Concat => (9, 8),
            BinaryOp::Add | BinaryOp::Sub => (10, 10),
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod => (11, 11),
            BinaryOp::Pow => (14, 13),
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `not x`
    Not,
    /// `#x`
    Len,
    /// `~x`
    BitNot,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "not ",
            UnaryOp::Len => "#",
            UnaryOp::BitNot => "~",
        }
    }
}
