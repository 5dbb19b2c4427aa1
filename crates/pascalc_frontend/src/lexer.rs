//! Tokenizer character classification.
//!
//! The front end's semantic core — the subject of this crate — is the
//! symbol table and type system the parser consults; this module is the
//! "surrounding concern" that feeds it a [`Token`] stream. [`lex`] runs once,
//! eagerly, over the whole source text, producing a flat `Vec<Token>` the
//! parser indexes with one-token lookahead.
//!
//! Keyword/identifier disambiguation and symbol interning happen here
//! because they are lexical facts (case-insensitive spelling, a name pool
//! shared by the whole file) — not because the lexer knows anything about
//! scopes. Deciding *which* scope an identifier resolves against is the
//! parser's job (see the `TokenStream` in `pascalc-codegen`).

use logos::Logos;
use pascalc_base::{Diagnostics, ErrorCategory, Interner, Span};

use crate::token::{Keyword, RawLexeme, Token, TokenKind};

/// Lexes `source` into a flat token vector, always ending in exactly one
/// [`TokenKind::Eof`].
///
/// Unterminated strings and malformed numeric literals are reported to
/// `diagnostics` as [`ErrorCategory::Lexical`] and replaced with a harmless
/// placeholder token so the scan can continue to the next lexeme.
pub fn lex(source: &str, interner: &mut Interner, diagnostics: &mut Diagnostics) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut lexer = RawLexeme::lexer(source);

    while let Some(result) = lexer.next() {
        let span = Span::new(lexer.span().start, lexer.span().end);
        let text = lexer.slice();
        let raw = match result {
            Ok(raw) => raw,
            Err(_) => {
                diagnostics.error(
                    ErrorCategory::Lexical,
                    format!("unrecognized character(s) '{}'", text),
                    span,
                );
                continue;
            }
        };

        match raw {
            RawLexeme::Comment => continue,
            RawLexeme::Word => {
                let lower = text.to_ascii_lowercase();
                let kind = match Keyword::lookup(&lower) {
                    Some(kw) => TokenKind::Keyword(kw),
                    None => TokenKind::Ident(interner.intern(text)),
                };
                tokens.push(Token::new(kind, span));
            }
            RawLexeme::IntDigits => match text.parse::<i64>() {
                Ok(value) => tokens.push(Token::new(TokenKind::IntLiteral(value), span)),
                Err(_) => {
                    diagnostics.error(
                        ErrorCategory::Lexical,
                        format!("integer literal '{}' out of range", text),
                        span,
                    );
                    tokens.push(Token::new(TokenKind::IntLiteral(0), span));
                }
            },
            RawLexeme::RealDigits => match text.parse::<f64>() {
                Ok(value) => tokens.push(Token::new(TokenKind::RealLiteral(value), span)),
                Err(_) => {
                    diagnostics.error(
                        ErrorCategory::Lexical,
                        format!("malformed real literal '{}'", text),
                        span,
                    );
                    tokens.push(Token::new(TokenKind::RealLiteral(0.0), span));
                }
            },
            RawLexeme::QuotedLiteral => {
                let inner = &text[1..text.len() - 1];
                let unescaped = inner.replace("''", "'");
                let kind = if unescaped.len() == 1 {
                    TokenKind::CharLiteral(unescaped.as_bytes()[0])
                } else {
                    TokenKind::StringLiteral(unescaped)
                };
                tokens.push(Token::new(kind, span));
            }
            RawLexeme::Assign => push_punct(&mut tokens, crate::token::Punct::Assign, span),
            RawLexeme::DotDot => push_punct(&mut tokens, crate::token::Punct::DotDot, span),
            RawLexeme::NotEq => push_punct(&mut tokens, crate::token::Punct::NotEq, span),
            RawLexeme::LtEq => push_punct(&mut tokens, crate::token::Punct::LtEq, span),
            RawLexeme::GtEq => push_punct(&mut tokens, crate::token::Punct::GtEq, span),
            RawLexeme::SymDiff => push_punct(&mut tokens, crate::token::Punct::SymDiff, span),
            RawLexeme::Plus => push_punct(&mut tokens, crate::token::Punct::Plus, span),
            RawLexeme::Minus => push_punct(&mut tokens, crate::token::Punct::Minus, span),
            RawLexeme::Star => push_punct(&mut tokens, crate::token::Punct::Star, span),
            RawLexeme::Slash => push_punct(&mut tokens, crate::token::Punct::Slash, span),
            RawLexeme::Colon => push_punct(&mut tokens, crate::token::Punct::Colon, span),
            RawLexeme::Semicolon => push_punct(&mut tokens, crate::token::Punct::Semicolon, span),
            RawLexeme::Comma => push_punct(&mut tokens, crate::token::Punct::Comma, span),
            RawLexeme::Dot => push_punct(&mut tokens, crate::token::Punct::Dot, span),
            RawLexeme::LParen => push_punct(&mut tokens, crate::token::Punct::LParen, span),
            RawLexeme::RParen => push_punct(&mut tokens, crate::token::Punct::RParen, span),
            RawLexeme::LBracket => push_punct(&mut tokens, crate::token::Punct::LBracket, span),
            RawLexeme::RBracket => push_punct(&mut tokens, crate::token::Punct::RBracket, span),
            RawLexeme::Caret => push_punct(&mut tokens, crate::token::Punct::Caret, span),
            RawLexeme::At => push_punct(&mut tokens, crate::token::Punct::At, span),
            RawLexeme::Eq => push_punct(&mut tokens, crate::token::Punct::Eq, span),
            RawLexeme::Lt => push_punct(&mut tokens, crate::token::Punct::Lt, span),
            RawLexeme::Gt => push_punct(&mut tokens, crate::token::Punct::Gt, span),
            RawLexeme::Amp => push_punct(&mut tokens, crate::token::Punct::Amp, span),
        }
    }

    let eof_at = source.len();
    tokens.push(Token::new(TokenKind::Eof, Span::new(eof_at, eof_at)));
    tokens
}

fn push_punct(tokens: &mut Vec<Token>, p: crate::token::Punct, span: Span) {
    tokens.push(Token::new(TokenKind::Punct(p), span));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_ok(source: &str) -> Vec<Token> {
        let mut interner = Interner::new();
        let mut diags = Diagnostics::new();
        let tokens = lex(source, &mut interner, &mut diags);
        assert!(!diags.has_errors(), "unexpected lexical errors: {:?}", diags.iter().collect::<Vec<_>>());
        tokens
    }

    #[test]
    fn lexes_keywords_case_insensitively() {
        let tokens = lex_ok("Program BEGIN end");
        assert!(tokens[0].is_keyword(Keyword::Program));
        assert!(tokens[1].is_keyword(Keyword::Begin));
        assert!(tokens[2].is_keyword(Keyword::End));
    }

    #[test]
    fn lexes_identifier_and_interns_it() {
        let mut interner = Interner::new();
        let mut diags = Diagnostics::new();
        let tokens = lex("total", &mut interner, &mut diags);
        let sym = tokens[0].ident().expect("identifier token");
        assert_eq!(interner.resolve(sym), "total");
    }

    #[test]
    fn lexes_integer_and_real_literals() {
        let tokens = lex_ok("42 3.14 2e10");
        assert_eq!(tokens[0].kind, TokenKind::IntLiteral(42));
        assert_eq!(tokens[1].kind, TokenKind::RealLiteral(3.14));
        assert_eq!(tokens[2].kind, TokenKind::RealLiteral(2e10));
    }

    #[test]
    fn single_char_quoted_literal_is_a_char() {
        let tokens = lex_ok("'A'");
        assert_eq!(tokens[0].kind, TokenKind::CharLiteral(b'A'));
    }

    #[test]
    fn multi_char_quoted_literal_is_a_string() {
        let tokens = lex_ok("'hello'");
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral("hello".to_string()));
    }

    #[test]
    fn doubled_quote_unescapes_to_single_quote() {
        let tokens = lex_ok("'it''s'");
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral("it's".to_string()));
    }

    #[test]
    fn skips_brace_and_paren_star_comments() {
        let tokens = lex_ok("{ a comment } begin (* another *) end");
        assert!(tokens[0].is_keyword(Keyword::Begin));
        assert!(tokens[1].is_keyword(Keyword::End));
    }

    #[test]
    fn distinguishes_assign_from_colon() {
        let tokens = lex_ok(": :=");
        assert!(tokens[0].is_punct(crate::token::Punct::Colon));
        assert!(tokens[1].is_punct(crate::token::Punct::Assign));
    }

    #[test]
    fn ends_with_eof() {
        let tokens = lex_ok("begin end");
        assert!(tokens.last().unwrap().is_eof());
    }

    #[test]
    fn reports_lexical_error_for_unterminated_string() {
        let mut interner = Interner::new();
        let mut diags = Diagnostics::new();
        let _ = lex("'oops", &mut interner, &mut diags);
        assert!(diags.has_errors());
    }
}
