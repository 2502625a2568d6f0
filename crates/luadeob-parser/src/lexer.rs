//! Lexer (tokenizer) for Lua and Luau.
//!
//! The lexer converts source text into a stream of tokens. It's called
//! on-demand by the parser, not upfront. Comments (and a leading `#!` line)
//! never reach the parser; this is where comment stripping happens.
//!
//! Luau interpolated strings (`` `a {x} b` ``) are handled with a stack of
//! brace depths: a `}` that closes an interpolation hole resumes scanning
//! the string instead of producing `RBrace`.

use crate::span::Span;
use crate::token::{keyword_from_str, Token, TokenKind};

/// The lexer state.
#[derive(Clone)]
pub struct Lexer<'a> {
    /// Source code as bytes (for fast indexing).
    source: &'a [u8],
    /// Current byte position.
    pos: usize,
    /// Start position of the current token.
    token_start: usize,
    /// Open `{` count per active interpolation hole, innermost last.
    interp_depths: Vec<u32>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source code.
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Self {
            source: source.as_bytes(),
            pos: 0,
            token_start: 0,
            interp_depths: Vec::new(),
        };
        lexer.skip_shebang();
        lexer
    }

    /// Get the current byte position.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Token {
        if let Err(kind) = self.skip_whitespace_and_comments() {
            return self.make_token(kind);
        }
        self.token_start = self.pos;

        if self.is_eof() {
            return self.make_token(TokenKind::Eof);
        }

        let ch = self.current();
        let kind = match ch {
            // Names and keywords
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.scan_identifier(),

            // Numbers
            b'0'..=b'9' => self.scan_number(),
            b'.' if self.peek_char().is_ascii_digit() => self.scan_number(),

            // Strings
            b'"' | b'\'' => self.scan_string(ch),
            b'[' if matches!(self.peek_char(), b'[' | b'=') => self.scan_long_string_or_bracket(),
            b'`' => {
                self.advance();
                self.scan_interp_segment(true)
            }

            // Punctuation and operators
            b'(' => { self.advance(); TokenKind::LParen }
            b')' => { self.advance(); TokenKind::RParen }
            b'{' => {
                self.advance();
                if let Some(depth) = self.interp_depths.last_mut() {
                    *depth += 1;
                }
                TokenKind::LBrace
            }
            b'}' => {
                self.advance();
                match self.interp_depths.last().copied() {
                    Some(0) => {
                        self.interp_depths.pop();
                        self.scan_interp_segment(false)
                    }
                    Some(depth) => {
                        if let Some(last) = self.interp_depths.last_mut() {
                            *last = depth - 1;
                        }
                        TokenKind::RBrace
                    }
                    None => TokenKind::RBrace,
                }
            }
            b'[' => { self.advance(); TokenKind::LBracket }
            b']' => { self.advance(); TokenKind::RBracket }
            b';' => { self.advance(); TokenKind::Semicolon }
            b',' => { self.advance(); TokenKind::Comma }
            b'#' => { self.advance(); TokenKind::Hash }
            b'&' => { self.advance(); TokenKind::Amp }
            b'|' => { self.advance(); TokenKind::Pipe }
            b'?' => { self.advance(); TokenKind::Question }

            b':' => self.scan_pair(b':', TokenKind::ColonColon, TokenKind::Colon),
            b'.' => self.scan_dot(),
            b'+' => self.scan_pair(b'=', TokenKind::PlusEq, TokenKind::Plus),
            b'-' => self.scan_minus(),
            b'*' => self.scan_pair(b'=', TokenKind::StarEq, TokenKind::Star),
            b'/' => self.scan_slash(),
            b'%' => self.scan_pair(b'=', TokenKind::PercentEq, TokenKind::Percent),
            b'^' => self.scan_pair(b'=', TokenKind::CaretEq, TokenKind::Caret),
            b'=' => self.scan_pair(b'=', TokenKind::EqEq, TokenKind::Eq),
            b'~' => self.scan_pair(b'=', TokenKind::TildeEq, TokenKind::Tilde),
            b'<' => self.scan_less_than(),
            b'>' => self.scan_greater_than(),

            // Invalid character
            _ => {
                self.advance_char();
                TokenKind::Invalid
            }
        };

        self.make_token(kind)
    }

    /// Peek at the next token without consuming it.
    pub fn peek(&mut self) -> Token {
        let saved = self.clone();
        let token = self.next_token();
        *self = saved;
        token
    }

    /// Peek `n + 1` tokens ahead without consuming anything.
    pub fn peek_nth(&mut self, n: usize) -> Token {
        let saved = self.clone();
        let mut token = self.next_token();
        for _ in 0..n {
            token = self.next_token();
        }
        *self = saved;
        token
    }

    // === Helper methods ===

    fn is_eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn current(&self) -> u8 {
        self.source.get(self.pos).copied().unwrap_or(0)
    }

    fn peek_char(&self) -> u8 {
        self.source.get(self.pos + 1).copied().unwrap_or(0)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn advance_n(&mut self, n: usize) {
        self.pos += n;
    }

    /// Advance over one UTF-8 encoded character.
    fn advance_char(&mut self) {
        self.advance();
        while !self.is_eof() && (self.current() & 0xC0) == 0x80 {
            self.advance();
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, Span::new(self.token_start as u32, self.pos as u32))
    }

    fn token_slice(&self) -> String {
        String::from_utf8_lossy(&self.source[self.token_start..self.pos]).into_owned()
    }

    fn scan_pair(&mut self, second: u8, pair: TokenKind, single: TokenKind) -> TokenKind {
        self.advance();
        if self.current() == second {
            self.advance();
            pair
        } else {
            single
        }
    }

    // === Whitespace and comments ===

    fn skip_shebang(&mut self) {
        if self.source.starts_with(b"#!") {
            while !self.is_eof() && self.current() != b'\n' {
                self.advance();
            }
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), TokenKind> {
        loop {
            match self.current() {
                b' ' | b'\t' | b'\r' | b'\n' | 0x0B | 0x0C => self.advance(),
                b'-' if self.peek_char() == b'-' => {
                    self.token_start = self.pos;
                    self.advance_n(2);
                    if let Some(level) = self.long_bracket_level() {
                        if !self.skip_long_bracket(level) {
                            return Err(TokenKind::UnterminatedComment);
                        }
                    } else {
                        while !self.is_eof() && self.current() != b'\n' {
                            self.advance();
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// If the cursor sits on `[`, `[=`, `[==`… followed by `[`, return the
    /// number of `=` signs without consuming anything.
    fn long_bracket_level(&self) -> Option<usize> {
        if self.current() != b'[' {
            return None;
        }
        let mut i = self.pos + 1;
        while self.source.get(i) == Some(&b'=') {
            i += 1;
        }
        (self.source.get(i) == Some(&b'[')).then(|| i - self.pos - 1)
    }

    /// Skip `[==[ ... ]==]`. Returns false when the closing bracket is missing.
    fn skip_long_bracket(&mut self, level: usize) -> bool {
        self.advance_n(level + 2);
        while !self.is_eof() {
            if self.current() == b']' {
                let mut i = self.pos + 1;
                while self.source.get(i) == Some(&b'=') {
                    i += 1;
                }
                if i - self.pos - 1 == level && self.source.get(i) == Some(&b']') {
                    self.pos = i + 1;
                    return true;
                }
            }
            self.advance();
        }
        false
    }

    // === Token scanning ===

    fn scan_identifier(&mut self) -> TokenKind {
        while !self.is_eof() {
            match self.current() {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' => self.advance(),
                _ => break,
            }
        }

        let ident = self.token_slice();
        keyword_from_str(&ident).unwrap_or(TokenKind::Identifier(ident))
    }

    fn scan_number(&mut self) -> TokenKind {
        let is_prefixed = self.current() == b'0'
            && matches!(self.peek_char(), b'x' | b'X' | b'b' | b'B');
        if is_prefixed {
            let hex = matches!(self.peek_char(), b'x' | b'X');
            self.advance_n(2);
            loop {
                let c = self.current();
                let is_digit = if hex { c.is_ascii_hexdigit() } else { matches!(c, b'0' | b'1') };
                if is_digit || c == b'_' || (hex && c == b'.') {
                    self.advance();
                } else if hex && matches!(c, b'p' | b'P') {
                    self.advance();
                    if matches!(self.current(), b'+' | b'-') {
                        self.advance();
                    }
                } else {
                    break;
                }
            }
        } else {
            while self.current().is_ascii_digit() || self.current() == b'_' {
                self.advance();
            }
            if self.current() == b'.' && self.peek_char() != b'.' {
                self.advance();
                while self.current().is_ascii_digit() || self.current() == b'_' {
                    self.advance();
                }
            }
            if matches!(self.current(), b'e' | b'E') {
                self.advance();
                if matches!(self.current(), b'+' | b'-') {
                    self.advance();
                }
                while self.current().is_ascii_digit() {
                    self.advance();
                }
            }
        }
        // A number running straight into a name (`3x`) is malformed.
        if self.current().is_ascii_alphabetic() || self.current() == b'_' {
            while self.current().is_ascii_alphanumeric() || self.current() == b'_' {
                self.advance();
            }
            return TokenKind::Invalid;
        }
        TokenKind::Number(self.token_slice())
    }

    fn scan_string(&mut self, quote: u8) -> TokenKind {
        self.advance(); // Skip opening quote
        loop {
            match self.current() {
                _ if self.is_eof() => return TokenKind::UnterminatedString,
                b'\n' => return TokenKind::UnterminatedString,
                b'\\' => {
                    self.advance();
                    if self.is_eof() {
                        return TokenKind::UnterminatedString;
                    }
                    // `\z` skips following whitespace, including newlines
                    if self.current() == b'z' {
                        self.advance();
                        while self.current().is_ascii_whitespace() {
                            self.advance();
                        }
                    } else {
                        self.advance_char();
                    }
                }
                c if c == quote => {
                    self.advance();
                    return TokenKind::String(self.token_slice());
                }
                _ => self.advance_char(),
            }
        }
    }

    fn scan_long_string_or_bracket(&mut self) -> TokenKind {
        match self.long_bracket_level() {
            Some(level) => {
                if self.skip_long_bracket(level) {
                    TokenKind::String(self.token_slice())
                } else {
                    TokenKind::UnterminatedString
                }
            }
            None => {
                // `[=` not followed by a bracket: plain `[`, then `=`
                self.advance();
                TokenKind::LBracket
            }
        }
    }

    /// Scan the text of an interpolated string up to the next `{` or the
    /// closing backtick. `head` is true right after the opening backtick.
    fn scan_interp_segment(&mut self, head: bool) -> TokenKind {
        let text_start = self.pos;
        loop {
            match self.current() {
                _ if self.is_eof() => return TokenKind::UnterminatedString,
                b'\n' => return TokenKind::UnterminatedString,
                b'\\' => {
                    self.advance();
                    if self.is_eof() {
                        return TokenKind::UnterminatedString;
                    }
                    self.advance_char();
                }
                b'`' => {
                    let text = self.slice_from(text_start);
                    self.advance();
                    return if head { TokenKind::InterpNoSub(text) } else { TokenKind::InterpEnd(text) };
                }
                b'{' => {
                    let text = self.slice_from(text_start);
                    self.advance();
                    self.interp_depths.push(0);
                    return if head { TokenKind::InterpBegin(text) } else { TokenKind::InterpMid(text) };
                }
                _ => self.advance_char(),
            }
        }
    }

    fn slice_from(&self, start: usize) -> String {
        String::from_utf8_lossy(&self.source[start..self.pos]).into_owned()
    }

    fn scan_dot(&mut self) -> TokenKind {
        self.advance();
        if self.current() != b'.' {
            return TokenKind::Dot;
        }
        self.advance();
        match self.current() {
            b'.' => { self.advance(); TokenKind::Ellipsis }
            b'=' => { self.advance(); TokenKind::DotDotEq }
            _ => TokenKind::DotDot,
        }
    }

    fn scan_minus(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'=' => { self.advance(); TokenKind::MinusEq }
            b'>' => { self.advance(); TokenKind::Arrow }
            _ => TokenKind::Minus,
        }
    }

    fn scan_slash(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'/' => {
                self.advance();
                if self.current() == b'=' {
                    self.advance();
                    TokenKind::SlashSlashEq
                } else {
                    TokenKind::SlashSlash
                }
            }
            b'=' => { self.advance(); TokenKind::SlashEq }
            _ => TokenKind::Slash,
        }
    }

    fn scan_less_than(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'<' => { self.advance(); TokenKind::LtLt }
            b'=' => { self.advance(); TokenKind::LtEq }
            _ => TokenKind::Lt,
        }
    }

    fn scan_greater_than(&mut self) -> TokenKind {
        self.advance();
        match self.current() {
            b'>' => { self.advance(); TokenKind::GtGt }
            b'=' => { self.advance(); TokenKind::GtEq }
            _ => TokenKind::Gt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            if matches!(token.kind, TokenKind::Eof) {
                break;
            }
            tokens.push(token.kind);
        }
        tokens
    }

    fn ident(name: &str) -> TokenKind {
        TokenKind::Identifier(name.into())
    }

    #[test]
    fn test_identifiers_and_keywords() {
        assert_eq!(
            tokenize("local foo = _bar"),
            vec![TokenKind::Local, ident("foo"), TokenKind::Eq, ident("_bar")]
        );
    }

    #[test]
    fn test_numbers_keep_raw_text() {
        assert_eq!(
            tokenize("42 3.14 0xff 0x1p4 1e-3 .5 0b101 1_000"),
            vec![
                TokenKind::Number("42".into()),
                TokenKind::Number("3.14".into()),
                TokenKind::Number("0xff".into()),
                TokenKind::Number("0x1p4".into()),
                TokenKind::Number("1e-3".into()),
                TokenKind::Number(".5".into()),
                TokenKind::Number("0b101".into()),
                TokenKind::Number("1_000".into()),
            ]
        );
    }

    #[test]
    fn test_number_followed_by_concat() {
        assert_eq!(
            tokenize("1..x"),
            vec![TokenKind::Number("1".into()), TokenKind::DotDot, ident("x")]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            tokenize(r#""he said \"hi\"" 'a\'b' [[long
string]] [==[with ]] inside]==]"#),
            vec![
                TokenKind::String(r#""he said \"hi\"""#.into()),
                TokenKind::String(r"'a\'b'".into()),
                TokenKind::String("[[long\nstring]]".into()),
                TokenKind::String("[==[with ]] inside]==]".into()),
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(tokenize("\"abc"), vec![TokenKind::UnterminatedString]);
    }

    #[test]
    fn test_comments_are_dropped() {
        assert_eq!(
            tokenize("a -- line comment\nb --[[ block\ncomment ]] c --[==[ x ]==] d"),
            vec![ident("a"), ident("b"), ident("c"), ident("d")]
        );
    }

    #[test]
    fn test_unterminated_comment() {
        assert_eq!(tokenize("a --[[ never closed"), vec![ident("a"), TokenKind::UnterminatedComment]);
    }

    #[test]
    fn test_shebang_skipped() {
        assert_eq!(tokenize("#!/usr/bin/lua\nx"), vec![ident("x")]);
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            tokenize("== ~= <= >= << >> // .. ... :: -> += ..= //="),
            vec![
                TokenKind::EqEq,
                TokenKind::TildeEq,
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::LtLt,
                TokenKind::GtGt,
                TokenKind::SlashSlash,
                TokenKind::DotDot,
                TokenKind::Ellipsis,
                TokenKind::ColonColon,
                TokenKind::Arrow,
                TokenKind::PlusEq,
                TokenKind::DotDotEq,
                TokenKind::SlashSlashEq,
            ]
        );
    }

    #[test]
    fn test_interpolated_string() {
        assert_eq!(
            tokenize("`a {x} b {t[{1}]} c`"),
            vec![
                TokenKind::InterpBegin("a ".into()),
                ident("x"),
                TokenKind::InterpMid(" b ".into()),
                ident("t"),
                TokenKind::LBracket,
                TokenKind::LBrace,
                TokenKind::Number("1".into()),
                TokenKind::RBrace,
                TokenKind::RBracket,
                TokenKind::InterpEnd(" c".into()),
            ]
        );
        assert_eq!(tokenize("`plain`"), vec![TokenKind::InterpNoSub("plain".into())]);
    }

    #[test]
    fn test_index_bracket_is_not_long_string() {
        assert_eq!(
            tokenize("t[1]"),
            vec![ident("t"), TokenKind::LBracket, TokenKind::Number("1".into()), TokenKind::RBracket]
        );
    }
}
