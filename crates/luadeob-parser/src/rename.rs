//! Scope-tracking identifier renaming.
//!
//! Rewrites every local declaration to a fresh `<prefix><n>` name and every
//! use that resolves to it, in a single pre-order walk:
//! 1. Scopes are pushed and popped exactly where Lua's binding rules open and
//!    close them
//! 2. Declarations take the next name from a run-local counter
//! 3. Uses are looked up innermost to outermost; misses are globals and stay
//!    as they are
//!
//! Field names, method names, table keys and labels are never touched.

use crate::ast::*;
use crate::lexer::Lexer;
use crate::span::Span;
use crate::token::{is_valid_identifier, TokenKind};
use rustc_hash::{FxHashMap, FxHashSet};

/// Options for renaming.
#[derive(Debug, Clone)]
pub struct RenameOptions {
    /// Prefix of generated names (letters and underscores only).
    pub prefix: String,
    /// User-specified names the generator must never produce.
    pub reserved: FxHashSet<String>,
    /// Also reserve every identifier spelled in the source, so a generated
    /// name can never capture a global of the same spelling.
    pub avoid_existing: bool,
}

impl Default for RenameOptions {
    fn default() -> Self {
        Self {
            prefix: "v".to_string(),
            reserved: FxHashSet::default(),
            avoid_existing: true,
        }
    }
}

/// Counters reported after a successful run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenameStats {
    /// Local declarations that received a fresh name.
    pub declarations: usize,
    /// Uses rewritten to a fresh name.
    pub renamed_uses: usize,
    /// Uses with no enclosing declaration, left unchanged as globals.
    pub unresolved: usize,
}

/// A malformed tree shape. The tree may be partially renamed when this is
/// returned and must be discarded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenameError {
    #[error("invalid identifier `{name}` at {}..{}", .span.start, .span.end)]
    InvalidIdentifier { name: String, span: Span },

    #[error("{construct} without targets at {}..{}", .span.start, .span.end)]
    NoTargets { construct: &'static str, span: Span },

    #[error("cannot assign to expression at {}..{}", .span.start, .span.end)]
    InvalidAssignTarget { span: Span },

    #[error("fresh name space exhausted at {}..{}", .span.start, .span.end)]
    GeneratorExhausted { span: Span },

    #[error("invalid name prefix `{prefix}`: expected letters or underscores")]
    InvalidPrefix { prefix: String },
}

impl RenameError {
    /// Span of the offending node, if the error concerns one.
    pub fn span(&self) -> Option<Span> {
        match self {
            RenameError::InvalidIdentifier { span, .. }
            | RenameError::NoTargets { span, .. }
            | RenameError::InvalidAssignTarget { span }
            | RenameError::GeneratorExhausted { span } => Some(*span),
            RenameError::InvalidPrefix { .. } => None,
        }
    }
}

/// Rename all locals in an AST in-place.
///
/// Convenience wrapper for `Renamer::new(options.clone()).rename(ast)`.
pub fn rename(ast: &mut Ast, options: &RenameOptions) -> Result<RenameStats, RenameError> {
    Renamer::new(options.clone()).rename(ast)
}

/// Collect every identifier spelled in `source`.
pub fn collect_identifiers(source: &str) -> FxHashSet<String> {
    let mut names = FxHashSet::default();
    let mut lexer = Lexer::new(source);
    loop {
        match lexer.next_token().kind {
            TokenKind::Identifier(name) => {
                names.insert(name);
            }
            TokenKind::Eof => break,
            _ => {}
        }
    }
    names
}

// =============================================================================
// Name Generator
// =============================================================================

/// Monotonic `<prefix><n>` generator, `n` starting at 1.
#[derive(Debug)]
pub struct NameGenerator {
    prefix: String,
    /// Last number handed out (0 before the first call).
    counter: u64,
    reserved: FxHashSet<String>,
}

impl NameGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: 0,
            reserved: FxHashSet::default(),
        }
    }

    /// Never produce any of `names`.
    pub fn reserve(&mut self, names: impl IntoIterator<Item = String>) {
        self.reserved.extend(names);
    }

    /// The next unused name, or `None` once the counter overflows.
    pub fn next_name(&mut self) -> Option<String> {
        loop {
            self.counter = self.counter.checked_add(1)?;
            let candidate = format!("{}{}", self.prefix, self.counter);
            if !self.reserved.contains(&candidate) {
                return Some(candidate);
            }
        }
    }
}

/// Check that `prefix` followed by digits is always a plain identifier.
pub fn is_valid_prefix(prefix: &str) -> bool {
    !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_alphabetic() || b == b'_')
}

// =============================================================================
// Scope Stack
// =============================================================================

/// Outcome of looking a name up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Bound by an enclosing declaration to this text.
    Bound(String),
    /// No enclosing declaration: a global.
    Unbound,
}

/// Stack of lexical scopes mapping original names to their replacements.
#[derive(Debug)]
pub struct ScopeStack {
    scopes: Vec<FxHashMap<String, String>>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    /// A stack holding only the (never populated) root scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![FxHashMap::default()],
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    pub fn pop(&mut self) {
        debug_assert!(self.scopes.len() > 1, "popped the root scope");
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Number of open scopes, root included.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Bind `name` to `text` in the innermost scope.
    pub fn bind(&mut self, name: &str, text: String) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), text);
        }
    }

    /// Bind `name` to a fresh name from `names` in the innermost scope.
    pub fn declare(&mut self, name: &str, names: &mut NameGenerator) -> Option<String> {
        let fresh = names.next_name()?;
        self.bind(name, fresh.clone());
        Some(fresh)
    }

    /// Search innermost to outermost.
    pub fn resolve(&self, name: &str) -> Resolution {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .map_or(Resolution::Unbound, |text| Resolution::Bound(text.clone()))
    }
}

// =============================================================================
// Renamer
// =============================================================================

/// One renaming run. Consumed by [`Renamer::rename`], so scope and counter
/// state never outlive the tree they were built for.
pub struct Renamer {
    options: RenameOptions,
    scopes: ScopeStack,
    names: NameGenerator,
    stats: RenameStats,
}

impl Renamer {
    pub fn new(options: RenameOptions) -> Self {
        let mut names = NameGenerator::new(options.prefix.clone());
        names.reserve(options.reserved.iter().cloned());
        Self {
            options,
            scopes: ScopeStack::new(),
            names,
            stats: RenameStats::default(),
        }
    }

    /// Rename `ast` in place.
    pub fn rename(mut self, ast: &mut Ast) -> Result<RenameStats, RenameError> {
        if !is_valid_prefix(&self.options.prefix) {
            return Err(RenameError::InvalidPrefix {
                prefix: self.options.prefix.clone(),
            });
        }
        if self.options.avoid_existing {
            self.names.reserve(collect_identifiers(&ast.source));
        }
        self.rename_block(&mut ast.block)?;
        debug_assert_eq!(self.scopes.depth(), 1);
        Ok(self.stats)
    }

    // =========================================================================
    // Identifiers
    // =========================================================================

    fn check_identifier(name: &Name) -> Result<(), RenameError> {
        if is_valid_identifier(&name.text) {
            Ok(())
        } else {
            Err(RenameError::InvalidIdentifier {
                name: name.text.clone(),
                span: name.span,
            })
        }
    }

    fn declare(&mut self, name: &mut Name) -> Result<(), RenameError> {
        Self::check_identifier(name)?;
        let fresh = self
            .scopes
            .declare(&name.text, &mut self.names)
            .ok_or(RenameError::GeneratorExhausted { span: name.span })?;
        name.text = fresh;
        self.stats.declarations += 1;
        Ok(())
    }

    fn use_name(&mut self, name: &mut Name) -> Result<(), RenameError> {
        Self::check_identifier(name)?;
        match self.scopes.resolve(&name.text) {
            Resolution::Bound(text) => {
                if text != name.text {
                    name.text = text;
                    self.stats.renamed_uses += 1;
                }
            }
            Resolution::Unbound => self.stats.unresolved += 1,
        }
        Ok(())
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn rename_block(&mut self, block: &mut Block) -> Result<(), RenameError> {
        self.scopes.push();
        self.rename_stmts(&mut block.stmts)?;
        self.scopes.pop();
        Ok(())
    }

    fn rename_stmts(&mut self, stmts: &mut [Stmt]) -> Result<(), RenameError> {
        for stmt in stmts.iter_mut() {
            self.rename_stmt(stmt)?;
        }
        Ok(())
    }

    fn rename_stmt(&mut self, stmt: &mut Stmt) -> Result<(), RenameError> {
        let span = stmt.span;
        match &mut stmt.kind {
            StmtKind::LocalAssign { names, values } => {
                if names.is_empty() {
                    return Err(RenameError::NoTargets { construct: "local declaration", span });
                }
                // `local x = x` reads the outer `x`
                self.rename_exprs(values)?;
                for name in names {
                    self.declare(name)?;
                }
            }
            StmtKind::LocalFunction { name, func } => {
                // Visible inside its own body for recursion
                self.declare(name)?;
                self.rename_function(func, false)?;
            }
            StmtKind::Function { name, func } => {
                // An assignment to `name`, not a declaration
                self.use_name(&mut name.base)?;
                self.rename_function(func, name.method.is_some())?;
            }
            StmtKind::Assign { targets, values } => {
                if targets.is_empty() {
                    return Err(RenameError::NoTargets { construct: "assignment", span });
                }
                if let Some(bad) = targets.iter().find(|t| !t.is_assignable()) {
                    return Err(RenameError::InvalidAssignTarget { span: bad.span });
                }
                self.rename_exprs(values)?;
                self.rename_exprs(targets)?;
            }
            StmtKind::CompoundAssign { target, value, .. } => {
                if !target.is_assignable() {
                    return Err(RenameError::InvalidAssignTarget { span: target.span });
                }
                self.rename_expr(value)?;
                self.rename_expr(target)?;
            }
            StmtKind::Call(expr) => self.rename_expr(expr)?,
            StmtKind::Do(body) => self.rename_block(body)?,
            StmtKind::While { cond, body } => {
                self.rename_expr(cond)?;
                self.rename_block(body)?;
            }
            StmtKind::Repeat { body, cond } => {
                // The condition sees locals declared in the body
                self.scopes.push();
                self.rename_stmts(&mut body.stmts)?;
                self.rename_expr(cond)?;
                self.scopes.pop();
            }
            StmtKind::If { branches, else_block } => {
                for branch in branches {
                    self.rename_expr(&mut branch.cond)?;
                    self.rename_block(&mut branch.body)?;
                }
                if let Some(else_block) = else_block {
                    self.rename_block(else_block)?;
                }
            }
            StmtKind::For { var, start, limit, step, body } => {
                self.rename_expr(start)?;
                self.rename_expr(limit)?;
                if let Some(step) = step {
                    self.rename_expr(step)?;
                }
                self.scopes.push();
                self.declare(var)?;
                self.rename_stmts(&mut body.stmts)?;
                self.scopes.pop();
            }
            StmtKind::ForIn { vars, iter, body } => {
                if vars.is_empty() {
                    return Err(RenameError::NoTargets { construct: "generic for", span });
                }
                self.rename_exprs(iter)?;
                self.scopes.push();
                for var in vars {
                    self.declare(var)?;
                }
                self.rename_stmts(&mut body.stmts)?;
                self.scopes.pop();
            }
            StmtKind::Return(values) => self.rename_exprs(values)?,
            StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Goto(_)
            | StmtKind::Label(_) => {}
        }
        Ok(())
    }

    /// Parameters and body share one new scope. Methods also see an implicit
    /// `self` that keeps its name.
    fn rename_function(&mut self, func: &mut Function, is_method: bool) -> Result<(), RenameError> {
        self.scopes.push();
        if is_method {
            self.scopes.bind("self", "self".to_string());
        }
        for param in &mut func.params {
            self.declare(param)?;
        }
        self.rename_stmts(&mut func.body.stmts)?;
        self.scopes.pop();
        Ok(())
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn rename_exprs(&mut self, exprs: &mut [Expr]) -> Result<(), RenameError> {
        for expr in exprs.iter_mut() {
            self.rename_expr(expr)?;
        }
        Ok(())
    }

    fn rename_expr(&mut self, expr: &mut Expr) -> Result<(), RenameError> {
        match &mut expr.kind {
            ExprKind::Nil
            | ExprKind::Bool(_)
            | ExprKind::Vararg
            | ExprKind::Number(_)
            | ExprKind::String(_) => {}
            ExprKind::InterpString { exprs, .. } => self.rename_exprs(exprs)?,
            ExprKind::Name(name) => self.use_name(name)?,
            ExprKind::Member { object, .. } => self.rename_expr(object)?,
            ExprKind::Index { object, key } => {
                self.rename_expr(object)?;
                self.rename_expr(key)?;
            }
            ExprKind::Call { callee, args } => {
                self.rename_expr(callee)?;
                self.rename_call_args(args)?;
            }
            ExprKind::MethodCall { object, args, .. } => {
                self.rename_expr(object)?;
                self.rename_call_args(args)?;
            }
            ExprKind::Function(func) => self.rename_function(func, false)?,
            ExprKind::Table(fields) => self.rename_fields(fields)?,
            ExprKind::Binary { left, right, .. } => {
                self.rename_expr(left)?;
                self.rename_expr(right)?;
            }
            ExprKind::Unary { arg, .. } => self.rename_expr(arg)?,
            ExprKind::Paren(inner) => self.rename_expr(inner)?,
            ExprKind::IfElse { cond, then, elseifs, else_ } => {
                self.rename_expr(cond)?;
                self.rename_expr(then)?;
                for (c, value) in elseifs {
                    self.rename_expr(c)?;
                    self.rename_expr(value)?;
                }
                self.rename_expr(else_)?;
            }
        }
        Ok(())
    }

    fn rename_call_args(&mut self, args: &mut CallArgs) -> Result<(), RenameError> {
        match args {
            CallArgs::Parens(exprs) => self.rename_exprs(exprs),
            CallArgs::Table(fields) => self.rename_fields(fields),
            CallArgs::String(_) => Ok(()),
        }
    }

    fn rename_fields(&mut self, fields: &mut [Field]) -> Result<(), RenameError> {
        for field in fields {
            match field {
                Field::Named { value, .. } => self.rename_expr(value)?,
                Field::Keyed { key, value } => {
                    self.rename_expr(key)?;
                    self.rename_expr(value)?;
                }
                Field::Positional(value) => self.rename_expr(value)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Codegen, CodegenOptions, Parser};

    fn parse_and_rename_with(source: &str, opts: &RenameOptions) -> (String, RenameStats) {
        let mut ast = Parser::new(source).parse().unwrap();
        let stats = rename(&mut ast, opts).unwrap();
        (Codegen::new(&ast, CodegenOptions::default()).generate(), stats)
    }

    fn parse_and_rename(source: &str) -> String {
        parse_and_rename_with(source, &RenameOptions::default()).0
    }

    /// Debug dump of a tree with identifier text blanked out.
    fn shape(ast: &Ast) -> String {
        let dump = format!("{:?}", ast.block);
        let mut out = String::with_capacity(dump.len());
        let mut rest = dump.as_str();
        while let Some(pos) = rest.find("text: \"") {
            out.push_str(&rest[..pos + 7]);
            rest = &rest[pos + 7..];
            let close = rest.find('"').unwrap();
            rest = &rest[close..];
        }
        out.push_str(rest);
        out
    }

    #[test]
    fn test_end_to_end_add() {
        let result = parse_and_rename("local function add(a, b) return a + b end return add(1, 2)");
        assert_eq!(result, "local function v1(v2, v3)\n    return v2 + v3\nend\nreturn v1(1, 2)\n");
    }

    #[test]
    fn test_shadowing_reads_outer_binding() {
        let result = parse_and_rename("local x = 1; do local x = x + 1 end");
        assert_eq!(result, "local v1 = 1\ndo\n    local v2 = v1 + 1\nend\n");
    }

    #[test]
    fn test_local_self_reference_is_outer() {
        let (result, stats) =
            parse_and_rename_with("local x = x", &RenameOptions::default());
        assert_eq!(result, "local v1 = x\n");
        assert_eq!(stats.unresolved, 1);
    }

    #[test]
    fn test_loop_variable_isolation() {
        let (result, stats) = parse_and_rename_with(
            "for i = 1, 2 do print(i) end for i = 1, 2 do print(i) end",
            &RenameOptions::default(),
        );
        assert_eq!(
            result,
            "for v1 = 1, 2 do\n    print(v1)\nend\nfor v2 = 1, 2 do\n    print(v2)\nend\n"
        );
        assert_eq!(stats, RenameStats { declarations: 2, renamed_uses: 2, unresolved: 2 });
    }

    #[test]
    fn test_numeric_for_bounds_resolve_outside() {
        let result = parse_and_rename("local i = 10 for i = 1, i do print(i) end");
        assert_eq!(result, "local v1 = 10\nfor v2 = 1, v1 do\n    print(v2)\nend\n");
    }

    #[test]
    fn test_generic_for() {
        let result = parse_and_rename("for k, v in pairs(t) do print(k, v) end print(k)");
        assert_eq!(result, "for v1, v2 in pairs(t) do\n    print(v1, v2)\nend\nprint(k)\n");
    }

    #[test]
    fn test_repeat_until_sees_body_locals() {
        let result = parse_and_rename("repeat local done = check() until done");
        assert_eq!(result, "repeat\n    local v1 = check()\nuntil v1\n");
    }

    #[test]
    fn test_while_body_scope_closes() {
        let result = parse_and_rename("while cond() do local x = 1 end return x");
        assert_eq!(result, "while cond() do\n    local v1 = 1\nend\nreturn x\n");
    }

    #[test]
    fn test_if_branches_have_independent_scopes() {
        let result = parse_and_rename(
            "local a = 1 if a then local b = a elseif b then local c = b else return c end",
        );
        assert_eq!(
            result,
            "local v1 = 1\nif v1 then\n    local v2 = v1\nelseif b then\n    local v3 = b\nelse\n    return c\nend\n"
        );
    }

    #[test]
    fn test_local_function_is_recursive() {
        let result = parse_and_rename(
            "local function fact(n) if n <= 1 then return 1 end return n * fact(n - 1) end",
        );
        assert!(result.contains("local function v1(v2)"));
        assert!(result.contains("return v2 * v1(v2 - 1)"));
        assert!(!result.contains("fact"));
    }

    #[test]
    fn test_local_assigned_function_does_not_see_itself() {
        let result = parse_and_rename("local f = function() return f end");
        assert_eq!(result, "local v1 = function()\n    return f\nend\n");
    }

    #[test]
    fn test_function_statement_name_is_a_use() {
        assert_eq!(
            parse_and_rename("local f function f() return f end"),
            "local v1\nfunction v1()\n    return v1\nend\n"
        );
        // Global function names stay
        assert_eq!(parse_and_rename("function g(a) return a end"), "function g(v1)\n    return v1\nend\n");
    }

    #[test]
    fn test_fields_and_methods_preserved() {
        let result = parse_and_rename("local t = {} t.x = 1 function t:m() return self.x end t:m()");
        assert_eq!(result, "local v1 = {}\nv1.x = 1\nfunction v1:m()\n    return self.x\nend\nv1:m()\n");
    }

    #[test]
    fn test_method_self_is_not_outer_local() {
        let result = parse_and_rename("local self = 1 local t = {} function t:m() return self end");
        assert!(result.contains("local v1 = 1"));
        assert!(result.contains("return self"));
        // Outside a method `self` is an ordinary name
        let result = parse_and_rename("local self = 1 function f() return self end");
        assert!(result.contains("return v1"));
    }

    #[test]
    fn test_table_keys_not_renamed() {
        let result = parse_and_rename("local k = 'a' local t = { k = k, [k] = 1 }");
        assert!(result.contains("{k = v1, [v1] = 1}"), "{result}");
    }

    #[test]
    fn test_global_pass_through() {
        let (result, stats) =
            parse_and_rename_with("print(math.floor(x)) y = x", &RenameOptions::default());
        assert_eq!(result, "print(math.floor(x))\ny = x\n");
        assert_eq!(stats.declarations, 0);
        assert_eq!(stats.unresolved, 5);
    }

    #[test]
    fn test_generated_names_avoid_existing_globals() {
        let result = parse_and_rename("local a = v1 return a");
        assert_eq!(result, "local v2 = v1\nreturn v2\n");
    }

    #[test]
    fn test_avoid_existing_disabled() {
        let opts = RenameOptions { avoid_existing: false, ..Default::default() };
        let (result, _) = parse_and_rename_with("local a = v1 return a", &opts);
        assert_eq!(result, "local v1 = v1\nreturn v1\n");
    }

    #[test]
    fn test_custom_prefix_and_reserved() {
        let opts = RenameOptions {
            prefix: "var_".to_string(),
            reserved: ["var_1".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let (result, _) = parse_and_rename_with("local a, b = 1, 2", &opts);
        assert_eq!(result, "local var_2, var_3 = 1, 2\n");
    }

    #[test]
    fn test_labels_and_goto_untouched() {
        let result = parse_and_rename("local i = 0 ::top:: i = i + 1 if i < 3 then goto top end");
        assert!(result.contains("::top::"));
        assert!(result.contains("goto top"));
        assert!(result.contains("v1 = v1 + 1"));
    }

    #[test]
    fn test_luau_constructs() {
        let result = parse_and_rename(
            "local n: number = 1\nlocal s = `n = {n}`\nn += 1\nlocal m = if n > 1 then n else -n",
        );
        assert!(result.contains("local v1 = 1"));
        assert!(result.contains("`n = {v1}`"));
        assert!(result.contains("v1 += 1"));
        assert!(result.contains("if v1 > 1 then v1 else -v1"));
    }

    #[test]
    fn test_structural_round_trip() {
        let source = "local a, b = 1, 2\n\
                      local function f(x, ...) return x + a, ... end\n\
                      for i = a, b do if i then local c = f(i) else break end end\n\
                      repeat local d = g(b) until d\n\
                      t = { [a] = b, k = function(self) return self end }";
        let original = Parser::new(source).parse().unwrap();
        let mut renamed = original.clone();
        rename(&mut renamed, &RenameOptions::default()).unwrap();
        assert_ne!(original, renamed);
        assert_eq!(shape(&original), shape(&renamed));
    }

    #[test]
    fn test_rename_is_stable_on_reparse() {
        let source = "local function add(a, b) return a + b end return add(1, 2)";
        let once = parse_and_rename(source);
        let opts = RenameOptions { avoid_existing: false, ..Default::default() };
        let (twice, _) = parse_and_rename_with(&once, &opts);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_name_generator_sequence() {
        let mut gen = NameGenerator::new("v");
        gen.reserve(["v2".to_string()]);
        assert_eq!(gen.next_name().as_deref(), Some("v1"));
        assert_eq!(gen.next_name().as_deref(), Some("v3"));
        assert_eq!(gen.next_name().as_deref(), Some("v4"));
    }

    #[test]
    fn test_name_generator_exhaustion() {
        let mut gen = NameGenerator::new("v");
        gen.counter = u64::MAX;
        assert_eq!(gen.next_name(), None);
    }

    #[test]
    fn test_scope_stack() {
        let mut names = NameGenerator::new("v");
        let mut scopes = ScopeStack::new();
        scopes.push();
        assert_eq!(scopes.declare("x", &mut names).as_deref(), Some("v1"));
        scopes.push();
        assert_eq!(scopes.resolve("x"), Resolution::Bound("v1".into()));
        scopes.declare("x", &mut names);
        assert_eq!(scopes.resolve("x"), Resolution::Bound("v2".into()));
        scopes.pop();
        assert_eq!(scopes.resolve("x"), Resolution::Bound("v1".into()));
        scopes.pop();
        assert_eq!(scopes.resolve("x"), Resolution::Unbound);
        assert_eq!(scopes.depth(), 1);
    }

    #[test]
    fn test_invalid_prefix() {
        let mut ast = Parser::new("local a = 1").parse().unwrap();
        let opts = RenameOptions { prefix: "1x".to_string(), ..Default::default() };
        let err = rename(&mut ast, &opts).unwrap_err();
        assert_eq!(err, RenameError::InvalidPrefix { prefix: "1x".into() });
        assert_eq!(err.span(), None);
    }

    #[test]
    fn test_generator_exhausted_error() {
        let mut ast = Parser::new("local a = 1").parse().unwrap();
        let mut renamer = Renamer::new(RenameOptions::default());
        renamer.names.counter = u64::MAX;
        let err = renamer.rename(&mut ast).unwrap_err();
        assert!(matches!(err, RenameError::GeneratorExhausted { .. }));
        assert_eq!(err.span(), Some(Span::new(6, 7)));
    }

    #[test]
    fn test_structural_errors() {
        let span = Span::new(0, 1);
        let block = |stmts| Ast::new(Block::new(stmts, span), String::new());

        let mut ast = block(vec![Stmt::new(
            StmtKind::LocalAssign { names: Vec::new(), values: Vec::new() },
            span,
        )]);
        assert!(matches!(
            rename(&mut ast, &RenameOptions::default()),
            Err(RenameError::NoTargets { .. })
        ));

        let mut ast = block(vec![Stmt::new(
            StmtKind::LocalAssign { names: vec![Name::new("", span)], values: Vec::new() },
            span,
        )]);
        let err = rename(&mut ast, &RenameOptions::default()).unwrap_err();
        assert_eq!(err, RenameError::InvalidIdentifier { name: String::new(), span });

        let call = Expr::new(
            ExprKind::Call {
                callee: Box::new(Expr::name(Name::new("f", span))),
                args: CallArgs::Parens(Vec::new()),
            },
            span,
        );
        let mut ast = block(vec![Stmt::new(
            StmtKind::Assign { targets: vec![call], values: vec![Expr::new(ExprKind::Nil, span)] },
            span,
        )]);
        assert!(matches!(
            rename(&mut ast, &RenameOptions::default()),
            Err(RenameError::InvalidAssignTarget { .. })
        ));
    }

    #[test]
    fn test_error_messages() {
        let err = RenameError::InvalidAssignTarget { span: Span::new(3, 8) };
        assert_eq!(err.to_string(), "cannot assign to expression at 3..8");
        let err = RenameError::NoTargets { construct: "generic for", span: Span::new(0, 4) };
        assert_eq!(err.to_string(), "generic for without targets at 0..4");
    }
}
