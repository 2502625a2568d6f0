//! Token types for Lua 5.1–5.3 and Luau.

use crate::span::Span;

/// A token with its kind and source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    /// Create a new token.
    #[inline]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// The kind of token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // === Literals ===
    /// Name: `foo`, `_bar`, `self`
    Identifier(String),
    /// Number literal, raw source text: `42`, `0x1p4`, `1_000`
    Number(String),
    /// String literal, raw source text including delimiters: `"a"`, `[[b]]`
    String(String),
    /// Interpolated string without substitutions: `` `hello` ``
    InterpNoSub(String),
    /// Interpolation head: `` `hello {``
    InterpBegin(String),
    /// Interpolation middle: `` } and {``
    InterpMid(String),
    /// Interpolation tail: `` } end` ``
    InterpEnd(String),

    // === Keywords ===
    And,
    Break,
    Do,
    Else,
    Elseif,
    End,
    False,
    For,
    Function,
    Goto,
    If,
    In,
    Local,
    Nil,
    Not,
    Or,
    Repeat,
    Return,
    Then,
    True,
    Until,
    While,

    // === Punctuation ===
    LParen,      // (
    RParen,      // )
    LBrace,      // {
    RBrace,      // }
    LBracket,    // [
    RBracket,    // ]
    Semicolon,   // ;
    Comma,       // ,
    Colon,       // :
    ColonColon,  // ::
    Dot,         // .
    DotDot,      // ..
    Ellipsis,    // ...
    Arrow,       // -> (Luau function types)
    Question,    // ? (Luau optional types)

    // === Operators ===
    Eq,          // =
    EqEq,        // ==
    TildeEq,     // ~=
    Lt,          // <
    LtEq,        // <=
    Gt,          // >
    GtEq,        // >=
    Plus,        // +
    Minus,       // -
    Star,        // *
    Slash,       // /
    SlashSlash,  // //
    Percent,     // %
    Caret,       // ^
    Hash,        // #
    Amp,         // &
    Tilde,       // ~
    Pipe,        // |
    LtLt,        // <<
    GtGt,        // >>

    // Luau compound assignment
    PlusEq,       // +=
    MinusEq,      // -=
    StarEq,       // *=
    SlashEq,      // /=
    SlashSlashEq, // //=
    PercentEq,    // %=
    CaretEq,      // ^=
    DotDotEq,     // ..=

    // === Special ===
    /// End of file
    Eof,
    /// Character that cannot start any token
    Invalid,
    /// String or interpolated string missing its closing delimiter
    UnterminatedString,
    /// Long comment missing its closing bracket
    UnterminatedComment,
}

impl TokenKind {
    /// Check if this is a keyword.
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::And
                | TokenKind::Break
                | TokenKind::Do
                | TokenKind::Else
                | TokenKind::Elseif
                | TokenKind::End
                | TokenKind::False
                | TokenKind::For
                | TokenKind::Function
                | TokenKind::Goto
                | TokenKind::If
                | TokenKind::In
                | TokenKind::Local
                | TokenKind::Nil
                | TokenKind::Not
                | TokenKind::Or
                | TokenKind::Repeat
                | TokenKind::Return
                | TokenKind::Then
                | TokenKind::True
                | TokenKind::Until
                | TokenKind::While
        )
    }

    /// Check if this token closes a block.
    pub fn ends_block(&self) -> bool {
        matches!(
            self,
            TokenKind::End | TokenKind::Else | TokenKind::Elseif | TokenKind::Until | TokenKind::Eof
        )
    }

    /// Check if this is a compound assignment operator.
    pub fn is_compound_assignment(&self) -> bool {
        matches!(
            self,
            TokenKind::PlusEq
                | TokenKind::MinusEq
                | TokenKind::StarEq
                | TokenKind::SlashEq
                | TokenKind::SlashSlashEq
                | TokenKind::PercentEq
                | TokenKind::CaretEq
                | TokenKind::DotDotEq
        )
    }
}

/// Binding power of unary operators; sits between multiplicative and `^`.
pub const UNARY_PRECEDENCE: u8 = 12;

/// Look up a keyword from an identifier string.
pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
    match s {
        "and" => Some(TokenKind::And),
        "break" => Some(TokenKind::Break),
        "do" => Some(TokenKind::Do),
        "else" => Some(TokenKind::Else),
        "elseif" => Some(TokenKind::Elseif),
        "end" => Some(TokenKind::End),
        "false" => Some(TokenKind::False),
        "for" => Some(TokenKind::For),
        "function" => Some(TokenKind::Function),
        "goto" => Some(TokenKind::Goto),
        "if" => Some(TokenKind::If),
        "in" => Some(TokenKind::In),
        "local" => Some(TokenKind::Local),
        "nil" => Some(TokenKind::Nil),
        "not" => Some(TokenKind::Not),
        "or" => Some(TokenKind::Or),
        "repeat" => Some(TokenKind::Repeat),
        "return" => Some(TokenKind::Return),
        "then" => Some(TokenKind::Then),
        "true" => Some(TokenKind::True),
        "until" => Some(TokenKind::Until),
        "while" => Some(TokenKind::While),
        _ => None,
    }
}

/// Check whether a string is a reserved word of the grammar.
pub fn is_reserved_word(s: &str) -> bool {
    keyword_from_str(s).is_some()
}

/// Check whether a string is a syntactically valid, non-reserved name.
pub fn is_valid_identifier(s: &str) -> bool {
    let mut bytes = s.bytes();
    match bytes.next() {
        Some(b'a'..=b'z' | b'A'..=b'Z' | b'_') => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_') && !is_reserved_word(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_round_trip() {
        assert_eq!(keyword_from_str("local"), Some(TokenKind::Local));
        assert_eq!(keyword_from_str("until"), Some(TokenKind::Until));
        assert_eq!(keyword_from_str("continue"), None);
        assert!(TokenKind::Repeat.is_keyword());
        assert!(!TokenKind::Identifier("x".into()).is_keyword());
    }

    #[test]
    fn test_valid_identifier() {
        assert!(is_valid_identifier("v1"));
        assert!(is_valid_identifier("_ENV"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("1v"));
        assert!(!is_valid_identifier("end"));
        assert!(!is_valid_identifier("a-b"));
    }
}
