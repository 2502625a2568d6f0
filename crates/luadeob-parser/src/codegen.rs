//! Lua code generator.
//!
//! Converts an AST back to Lua source code. Literals are printed with their
//! original spelling; parentheses are inserted wherever operator binding
//! requires them, so printing any tree yields source that parses back to the
//! same structure.

use crate::ast::*;
use crate::token::UNARY_PRECEDENCE;

/// Code generation options.
#[derive(Debug, Clone, Default)]
pub struct CodegenOptions {
    /// Minify output (no indentation, no optional whitespace).
    pub minify: bool,
    /// Indent string (default: four spaces).
    pub indent: Option<String>,
}

/// Precedence of atoms and suffixed expressions.
const ATOM_PRECEDENCE: u8 = 100;

/// The code generator.
pub struct Codegen<'a> {
    /// The AST to generate code from.
    ast: &'a Ast,
    /// Code generation options.
    options: CodegenOptions,
    /// Output buffer.
    output: String,
    /// Current indentation level.
    indent_level: usize,
    /// Indent string.
    indent_str: String,
}

impl<'a> Codegen<'a> {
    /// Create a new code generator.
    pub fn new(ast: &'a Ast, options: CodegenOptions) -> Self {
        let indent_str = options.indent.clone().unwrap_or_else(|| "    ".to_string());
        Self {
            ast,
            options,
            output: String::new(),
            indent_level: 0,
            indent_str,
        }
    }

    /// Generate Lua source code.
    pub fn generate(mut self) -> String {
        let ast = self.ast;
        let stmts = &ast.block.stmts;
        for (i, stmt) in stmts.iter().enumerate() {
            if i > 0 {
                self.emit_separator();
            }
            self.emit_stmt(stmt);
        }
        if !self.options.minify && !stmts.is_empty() {
            self.output.push('\n');
        }
        self.output
    }

    // =========================================================================
    // Output Helpers
    // =========================================================================

    /// Append a token, inserting a space only where the two neighbouring
    /// characters would otherwise lex as one token (`local x`, `- -1`,
    /// `a.. ...`, `t[ [[s]] ]`).
    fn emit(&mut self, s: &str) {
        if let (Some(last), Some(first)) = (self.output.chars().last(), s.chars().next()) {
            if needs_space(last, first) {
                self.output.push(' ');
            }
        }
        self.output.push_str(s);
    }

    fn emit_space(&mut self) {
        if !self.options.minify {
            self.output.push(' ');
        }
    }

    fn emit_newline(&mut self) {
        if !self.options.minify {
            self.output.push('\n');
            for _ in 0..self.indent_level {
                self.output.push_str(&self.indent_str);
            }
        }
    }

    /// Separate two statements of the same block.
    fn emit_separator(&mut self) {
        if self.options.minify {
            self.output.push(' ');
        } else {
            self.emit_newline();
        }
    }

    fn indent(&mut self) {
        self.indent_level += 1;
    }

    fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    // =========================================================================
    // Statement Emission
    // =========================================================================

    fn emit_stmt(&mut self, stmt: &Stmt) {
        if starts_with_paren(stmt) {
            // Keeps `a = b\n(f)()` from being read as `a = b(f)()`.
            self.emit(";");
        }
        match &stmt.kind {
            StmtKind::LocalAssign { names, values } => {
                self.emit("local");
                self.emit(" ");
                self.emit_names(names);
                if !values.is_empty() {
                    self.emit_space();
                    self.emit("=");
                    self.emit_space();
                    self.emit_expr_list(values);
                }
            }
            StmtKind::LocalFunction { name, func } => {
                self.emit("local function");
                self.emit(" ");
                self.emit(&name.text);
                self.emit_function_body(func);
            }
            StmtKind::Function { name, func } => {
                self.emit("function");
                self.emit(" ");
                self.emit(&name.base.text);
                for field in &name.fields {
                    self.emit(".");
                    self.emit(field);
                }
                if let Some(method) = &name.method {
                    self.emit(":");
                    self.emit(method);
                }
                self.emit_function_body(func);
            }
            StmtKind::Assign { targets, values } => {
                self.emit_expr_list(targets);
                self.emit_space();
                self.emit("=");
                self.emit_space();
                self.emit_expr_list(values);
            }
            StmtKind::CompoundAssign { op, target, value } => {
                self.emit_expr(target);
                self.emit_space();
                self.emit(op.as_str());
                self.emit("=");
                self.emit_space();
                self.emit_expr(value);
            }
            StmtKind::Call(expr) => self.emit_expr(expr),
            StmtKind::Do(body) => {
                self.emit("do");
                self.emit_block(body);
                self.emit("end");
            }
            StmtKind::While { cond, body } => {
                self.emit("while");
                self.emit(" ");
                self.emit_expr(cond);
                self.emit(" ");
                self.emit("do");
                self.emit_block(body);
                self.emit("end");
            }
            StmtKind::Repeat { body, cond } => {
                self.emit("repeat");
                self.emit_block(body);
                self.emit("until");
                self.emit(" ");
                self.emit_expr(cond);
            }
            StmtKind::If { branches, else_block } => {
                for (i, branch) in branches.iter().enumerate() {
                    self.emit(if i == 0 { "if" } else { "elseif" });
                    self.emit(" ");
                    self.emit_expr(&branch.cond);
                    self.emit(" ");
                    self.emit("then");
                    self.emit_block(&branch.body);
                }
                if let Some(else_block) = else_block {
                    self.emit("else");
                    self.emit_block(else_block);
                }
                self.emit("end");
            }
            StmtKind::For { var, start, limit, step, body } => {
                self.emit("for");
                self.emit(" ");
                self.emit(&var.text);
                self.emit_space();
                self.emit("=");
                self.emit_space();
                self.emit_expr(start);
                self.emit(",");
                self.emit_space();
                self.emit_expr(limit);
                if let Some(step) = step {
                    self.emit(",");
                    self.emit_space();
                    self.emit_expr(step);
                }
                self.emit(" ");
                self.emit("do");
                self.emit_block(body);
                self.emit("end");
            }
            StmtKind::ForIn { vars, iter, body } => {
                self.emit("for");
                self.emit(" ");
                self.emit_names(vars);
                self.emit(" ");
                self.emit("in");
                self.emit(" ");
                self.emit_expr_list(iter);
                self.emit(" ");
                self.emit("do");
                self.emit_block(body);
                self.emit("end");
            }
            StmtKind::Return(values) => {
                self.emit("return");
                if !values.is_empty() {
                    self.emit(" ");
                    self.emit_expr_list(values);
                }
            }
            StmtKind::Break => self.emit("break"),
            StmtKind::Continue => self.emit("continue"),
            StmtKind::Goto(label) => {
                self.emit("goto");
                self.emit(" ");
                self.emit(label);
            }
            StmtKind::Label(label) => {
                self.emit("::");
                self.emit(label);
                self.emit("::");
            }
        }
    }

    /// Emit an indented block followed by a newline at the outer level. The
    /// caller emits the closing keyword.
    fn emit_block(&mut self, block: &Block) {
        self.indent();
        for stmt in &block.stmts {
            self.emit_separator();
            self.emit_stmt(stmt);
        }
        self.dedent();
        self.emit_separator();
    }

    fn emit_names(&mut self, names: &[Name]) {
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                self.emit(",");
                self.emit_space();
            }
            self.emit(&name.text);
        }
    }

    fn emit_function_body(&mut self, func: &Function) {
        self.emit("(");
        self.emit_names(&func.params);
        if func.is_vararg {
            if !func.params.is_empty() {
                self.emit(",");
                self.emit_space();
            }
            self.emit("...");
        }
        self.emit(")");
        self.emit_block(&func.body);
        self.emit("end");
    }

    // =========================================================================
    // Expression Emission
    // =========================================================================

    fn emit_expr_list(&mut self, exprs: &[Expr]) {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.emit(",");
                self.emit_space();
            }
            self.emit_expr(expr);
        }
    }

    fn emit_expr(&mut self, expr: &Expr) {
        self.emit_expr_with_prec(expr, 0);
    }

    fn emit_expr_with_prec(&mut self, expr: &Expr, min_prec: u8) {
        match &expr.kind {
            ExprKind::Nil => self.emit("nil"),
            ExprKind::Bool(b) => self.emit(if *b { "true" } else { "false" }),
            ExprKind::Vararg => self.emit("..."),
            ExprKind::Number(raw) | ExprKind::String(raw) => self.emit(raw),
            ExprKind::InterpString { parts, exprs } => {
                self.emit("`");
                for (i, part) in parts.iter().enumerate() {
                    self.output.push_str(part);
                    if let Some(expr) = exprs.get(i) {
                        self.output.push('{');
                        if matches!(expr.kind, ExprKind::Table(_)) {
                            // `{{` is rejected inside interpolations
                            self.output.push(' ');
                        }
                        self.emit_expr(expr);
                        self.output.push('}');
                    }
                }
                self.output.push('`');
            }
            ExprKind::Name(name) => self.emit(&name.text),
            ExprKind::Member { object, name } => {
                self.emit_prefix(object);
                self.emit(".");
                self.emit(name);
            }
            ExprKind::Index { object, key } => {
                self.emit_prefix(object);
                self.emit("[");
                self.emit_expr(key);
                self.emit("]");
            }
            ExprKind::Call { callee, args } => {
                self.emit_prefix(callee);
                self.emit_call_args(args);
            }
            ExprKind::MethodCall { object, method, args } => {
                self.emit_prefix(object);
                self.emit(":");
                self.emit(method);
                self.emit_call_args(args);
            }
            ExprKind::Function(func) => {
                self.emit("function");
                self.emit_function_body(func);
            }
            ExprKind::Table(fields) => self.emit_table(fields),
            ExprKind::Binary { op, left, right } => {
                let (prec, _) = op.precedence();
                let needs_parens = prec < min_prec;
                if needs_parens {
                    self.emit("(");
                }
                let right_assoc = is_right_associative(*op);
                self.emit_expr_with_prec(left, if right_assoc { prec + 1 } else { prec });
                if self.options.minify
                    && *op == BinaryOp::Concat
                    && self.output.ends_with(|c: char| c.is_ascii_digit())
                {
                    // `1..x` would lex as a malformed number
                    self.output.push(' ');
                }
                if is_word_op(*op) {
                    self.emit(" ");
                    self.emit(op.as_str());
                    self.emit(" ");
                } else {
                    self.emit_space();
                    self.emit(op.as_str());
                    self.emit_space();
                }
                // A unary operator may open any right operand (`2 ^ -x`).
                let right_prec = match right.kind {
                    ExprKind::Unary { .. } => 0,
                    _ if right_assoc => prec,
                    _ => prec + 1,
                };
                self.emit_expr_with_prec(right, right_prec);
                if needs_parens {
                    self.emit(")");
                }
            }
            ExprKind::Unary { op, arg } => {
                let needs_parens = UNARY_PRECEDENCE < min_prec;
                if needs_parens {
                    self.emit("(");
                }
                self.emit(op.as_str());
                self.emit_expr_with_prec(arg, UNARY_PRECEDENCE);
                if needs_parens {
                    self.emit(")");
                }
            }
            ExprKind::Paren(inner) => {
                self.emit("(");
                self.emit_expr(inner);
                self.emit(")");
            }
            ExprKind::IfElse { cond, then, elseifs, else_ } => {
                // The else arm extends as far right as possible.
                let needs_parens = min_prec > 0;
                if needs_parens {
                    self.emit("(");
                }
                self.emit("if");
                self.emit(" ");
                self.emit_expr(cond);
                self.emit(" ");
                self.emit("then");
                self.emit(" ");
                self.emit_expr(then);
                for (c, value) in elseifs {
                    self.emit(" ");
                    self.emit("elseif");
                    self.emit(" ");
                    self.emit_expr(c);
                    self.emit(" ");
                    self.emit("then");
                    self.emit(" ");
                    self.emit_expr(value);
                }
                self.emit(" ");
                self.emit("else");
                self.emit(" ");
                self.emit_expr(else_);
                if needs_parens {
                    self.emit(")");
                }
            }
        }
    }

    /// Emit the object of a call, member access or index, parenthesizing
    /// anything that is not already a prefix expression.
    fn emit_prefix(&mut self, expr: &Expr) {
        if is_prefix_expr(expr) {
            self.emit_expr_with_prec(expr, ATOM_PRECEDENCE);
        } else {
            self.emit("(");
            self.emit_expr(expr);
            self.emit(")");
        }
    }

    fn emit_call_args(&mut self, args: &CallArgs) {
        match args {
            CallArgs::Parens(exprs) => {
                self.emit("(");
                self.emit_expr_list(exprs);
                self.emit(")");
            }
            CallArgs::Table(fields) => self.emit_table(fields),
            CallArgs::String(raw) => self.emit(raw),
        }
    }

    fn emit_table(&mut self, fields: &[Field]) {
        self.emit("{");
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                self.emit(",");
                self.emit_space();
            }
            match field {
                Field::Named { name, value } => {
                    self.emit(name);
                    self.emit_space();
                    self.emit("=");
                    self.emit_space();
                    self.emit_expr(value);
                }
                Field::Keyed { key, value } => {
                    self.emit("[");
                    self.emit_expr(key);
                    self.emit("]");
                    self.emit_space();
                    self.emit("=");
                    self.emit_space();
                    self.emit_expr(value);
                }
                Field::Positional(value) => self.emit_expr(value),
            }
        }
        self.emit("}");
    }
}

fn is_right_associative(op: BinaryOp) -> bool {
    matches!(op, BinaryOp::Concat | BinaryOp::Pow)
}

fn is_word_op(op: BinaryOp) -> bool {
    matches!(op, BinaryOp::And | BinaryOp::Or)
}

fn is_prefix_expr(expr: &Expr) -> bool {
    matches!(
        expr.kind,
        ExprKind::Name(_)
            | ExprKind::Paren(_)
            | ExprKind::Member { .. }
            | ExprKind::Index { .. }
            | ExprKind::Call { .. }
            | ExprKind::MethodCall { .. }
    )
}

/// Check whether a statement's printed form begins with `(`.
fn starts_with_paren(stmt: &Stmt) -> bool {
    fn leftmost_is_paren(expr: &Expr) -> bool {
        match &expr.kind {
            ExprKind::Paren(_) => true,
            ExprKind::Member { object, .. }
            | ExprKind::Index { object, .. }
            | ExprKind::MethodCall { object, .. } => leftmost_is_paren(object) || !is_prefix_expr(object),
            ExprKind::Call { callee, .. } => leftmost_is_paren(callee) || !is_prefix_expr(callee),
            _ => false,
        }
    }
    match &stmt.kind {
        StmtKind::Call(expr) => leftmost_is_paren(expr),
        StmtKind::Assign { targets, .. } => targets.first().is_some_and(leftmost_is_paren),
        StmtKind::CompoundAssign { target, .. } => leftmost_is_paren(target),
        _ => false,
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn needs_space(last: char, first: char) -> bool {
    (is_word_char(last) && is_word_char(first))
        || (last == '-' && first == '-')
        || (last == '.' && first == '.')
        || (last == '[' && first == '[')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::span::Span;

    fn roundtrip(source: &str) -> String {
        let ast = Parser::new(source).parse().unwrap();
        Codegen::new(&ast, CodegenOptions::default()).generate()
    }

    fn minify(source: &str) -> String {
        let ast = Parser::new(source).parse().unwrap();
        Codegen::new(&ast, CodegenOptions { minify: true, ..Default::default() }).generate()
    }

    #[test]
    fn test_local_assign() {
        assert_eq!(roundtrip("local a,b=1,'x'"), "local a, b = 1, 'x'\n");
    }

    #[test]
    fn test_function_layout() {
        let output = roundtrip("local function add(a, b) return a + b end");
        assert_eq!(output, "local function add(a, b)\n    return a + b\nend\n");
    }

    #[test]
    fn test_nested_indentation() {
        let output = roundtrip("for i = 1, 3 do if i > 1 then print(i) else break end end");
        assert_eq!(
            output,
            "for i = 1, 3 do\n    if i > 1 then\n        print(i)\n    else\n        break\n    end\nend\n"
        );
    }

    #[test]
    fn test_literals_keep_spelling() {
        let output = roundtrip("local s, n, h = [==[raw]==], 0x1F, 1e-3");
        assert!(output.contains("[==[raw]==]"));
        assert!(output.contains("0x1F"));
        assert!(output.contains("1e-3"));
    }

    #[test]
    fn test_parens_are_preserved() {
        assert_eq!(roundtrip("return (f())"), "return (f())\n");
        assert_eq!(roundtrip("return (a + b) * c"), "return (a + b) * c\n");
    }

    #[test]
    fn test_precedence_parens_for_built_trees() {
        let num = |s: &str| Expr::new(ExprKind::Number(s.into()), Span::default());
        let sum = Expr::new(
            ExprKind::Binary { op: BinaryOp::Add, left: Box::new(num("1")), right: Box::new(num("2")) },
            Span::default(),
        );
        let product = Expr::new(
            ExprKind::Binary { op: BinaryOp::Mul, left: Box::new(sum), right: Box::new(num("3")) },
            Span::default(),
        );
        let stmt = Stmt::new(StmtKind::Return(vec![product]), Span::default());
        let ast = Ast::new(Block::new(vec![stmt], Span::default()), String::new());
        assert_eq!(Codegen::new(&ast, CodegenOptions::default()).generate(), "return (1 + 2) * 3\n");
    }

    #[test]
    fn test_right_associative_ops() {
        assert_eq!(roundtrip("return a .. b .. c"), "return a .. b .. c\n");
        assert_eq!(roundtrip("return 2 ^ 3 ^ 2"), "return 2 ^ 3 ^ 2\n");
        assert_eq!(roundtrip("return (2 ^ 3) ^ 2"), "return (2 ^ 3) ^ 2\n");
        assert_eq!(roundtrip("return 2 ^ -x ^ 3"), "return 2 ^ -x ^ 3\n");
        assert_eq!(roundtrip("return 1 .. x"), "return 1 .. x\n");
    }

    #[test]
    fn test_leading_semicolon_for_paren_statement() {
        let output = roundtrip("local a = b;\n(f)()");
        assert!(output.contains("\n;(f)()"), "{output}");
    }

    #[test]
    fn test_method_and_string_calls() {
        assert_eq!(roundtrip("obj:m(1) print'hi' f{1}"), "obj:m(1)\nprint'hi'\nf{1}\n");
    }

    #[test]
    fn test_minify() {
        let output = minify("local x = 1\nlocal y = - -x\nreturn x .. y");
        assert!(!output.contains('\n'));
        assert_eq!(output, "local x=1 local y=- -x return x..y");
    }

    #[test]
    fn test_minify_number_concat() {
        assert_eq!(minify("return 1 .. 2"), "return 1 ..2");
    }

    #[test]
    fn test_interpolated_string() {
        assert_eq!(roundtrip("print(`a {x} b {y+1}`)"), "print(`a {x} b {y + 1}`)\n");
    }

    #[test]
    fn test_idempotent_output() {
        let source = "local t = {a = 1, [k] = function(...) return ... end; 3}\n\
                      while not done do repeat x += 1 until x > 10 end\n\
                      goto skip ::skip::";
        let once = roundtrip(source);
        assert_eq!(roundtrip(&once), once);
    }
}
