//! Token vocabulary for the Pascal lexer and parser.
//!
//! This module defines the atomic syntactic units produced by [`crate::lexer`]
//! and consumed by the recursive-descent parser in `pascalc-codegen`. A token
//! carries its [`Span`] and, for identifiers, the interned [`Symbol`] the
//! parser will later resolve against the symbol table — resolution itself is
//! not done here (see the `TokenStream` in `pascalc-codegen`), because
//! whether an identifier is looked up with or without shadowing depends on
//! the parser's current declaration context, not on anything the lexer knows.
//!
//! ## Token Categories
//!
//! | Category | Examples |
//! |----------|----------|
//! | **Keywords** | `program`, `begin`, `if`, `var`, `case` |
//! | **Identifiers** | `x`, `total`, `NodePtr` |
//! | **Literals** | `42`, `3.14`, `'hello'`, `'A'` |
//! | **Punctuation** | `:=`, `<>`, `..`, `(`, `]` |
//! | **End** | the sentinel past the last token |

use logos::Logos;
use pascalc_base::{Span, Symbol};

/// Reserved words. Every identifier-shaped lexeme that matches one of these
/// spellings (case-insensitively, per standard Pascal) lexes as a keyword,
/// never as an identifier — there is no escaping mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Program,
    Unit,
    Interface,
    Implementation,
    Uses,
    Label,
    Const,
    Type,
    Var,
    Procedure,
    Function,
    Begin,
    End,
    If,
    Then,
    Else,
    Case,
    Of,
    While,
    Do,
    Repeat,
    Until,
    For,
    To,
    Downto,
    With,
    Goto,
    Array,
    Record,
    Set,
    File,
    Packed,
    Nil,
    Not,
    And,
    Or,
    Xor,
    Div,
    Mod,
    Shl,
    Shr,
    In,
    Forward,
    External,
}

impl Keyword {
    /// Looks up a case-folded identifier spelling as a keyword.
    ///
    /// Pascal keywords are case-insensitive; the lexer always calls this with
    /// an already-lowercased spelling.
    pub fn lookup(lowercase: &str) -> Option<Keyword> {
        use Keyword::*;
        Some(match lowercase {
            "program" => Program,
            "unit" => Unit,
            "interface" => Interface,
            "implementation" => Implementation,
            "uses" => Uses,
            "label" => Label,
            "const" => Const,
            "type" => Type,
            "var" => Var,
            "procedure" => Procedure,
            "function" => Function,
            "begin" => Begin,
            "end" => End,
            "if" => If,
            "then" => Then,
            "else" => Else,
            "case" => Case,
            "of" => Of,
            "while" => While,
            "do" => Do,
            "repeat" => Repeat,
            "until" => Until,
            "for" => For,
            "to" => To,
            "downto" => Downto,
            "with" => With,
            "goto" => Goto,
            "array" => Array,
            "record" => Record,
            "set" => Set,
            "file" => File,
            "packed" => Packed,
            "nil" => Nil,
            "not" => Not,
            "and" => And,
            "or" => Or,
            "xor" => Xor,
            "div" => Div,
            "mod" => Mod,
            "shl" => Shl,
            "shr" => Shr,
            "in" => In,
            "forward" => Forward,
            "external" => External,
            _ => return None,
        })
    }
}

/// Punctuation and operator symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Punct {
    Plus,
    Minus,
    Star,
    Slash,
    Assign, // :=
    Colon,
    Semicolon,
    Comma,
    Dot,
    DotDot, // ..
    LParen,
    RParen,
    LBracket,
    RBracket,
    Caret, // ^
    At,    // @
    Eq,    // =
    NotEq, // <>
    Lt,
    LtEq,
    Gt,
    GtEq,
    SymDiff, // ><
    Amp,     // &
}

/// The kind of a lexeme, independent of its source position.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Keyword(Keyword),
    Punct(Punct),
    /// An identifier, not yet resolved against any scope.
    Ident(Symbol),
    IntLiteral(i64),
    RealLiteral(f64),
    /// A single-quoted character literal, e.g. `'A'`.
    CharLiteral(u8),
    /// A single-quoted string literal with `''` already unescaped to `'`.
    StringLiteral(String),
    /// The sentinel past the last real token; `advance` past it is a no-op.
    Eof,
}

/// A lexeme together with the source range it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    pub fn is_keyword(&self, kw: Keyword) -> bool {
        matches!(&self.kind, TokenKind::Keyword(k) if *k == kw)
    }

    pub fn is_punct(&self, p: Punct) -> bool {
        matches!(&self.kind, TokenKind::Punct(k) if *k == p)
    }

    pub fn ident(&self) -> Option<Symbol> {
        match &self.kind {
            TokenKind::Ident(s) => Some(*s),
            _ => None,
        }
    }
}

/// `logos`-driven raw lexical classification, used by [`crate::lexer`] to
/// split source text into spans before keyword/identifier disambiguation and
/// symbol-table interning happen. Kept separate from [`TokenKind`] because
/// the `logos::Logos` derive wants one variant per raw pattern, while
/// `TokenKind` wants keywords and identifiers merged into a resolved shape.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum RawLexeme {
    #[regex(r"\{[^}]*\}")]
    #[regex(r"\(\*([^*]|\*[^)])*\*\)")]
    Comment,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Word,

    #[regex(r"[0-9]+")]
    IntDigits,

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?")]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+")]
    RealDigits,

    #[regex(r"'([^']|'')*'")]
    QuotedLiteral,

    #[token(":=")]
    Assign,
    #[token("..")]
    DotDot,
    #[token("<>")]
    NotEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("><")]
    SymDiff,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("^")]
    Caret,
    #[token("@")]
    At,
    #[token("=")]
    Eq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("&")]
    Amp,
}
