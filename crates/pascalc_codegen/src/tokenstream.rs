//! One-token-lookahead cursor over a lexed Pascal source file.
//!
//! The parser never needs more than one token of lookahead (Pascal's
//! grammar was designed for exactly that), so this is a thin index into the
//! `Vec<Token>` the frontend's lexer produced, not a general-purpose stream
//! abstraction. Resolving an [`Ident`](pascalc_frontend::TokenKind::Ident)
//! token's [`Symbol`] into a [`SymbolRef`] is deliberately *not* done here:
//! whether a name should be looked up as a fresh declaration, a reference in
//! an existing scope, or (inside a `with`) a record field first, depends on
//! where the parser currently is in the grammar — knowledge this cursor
//! doesn't have and shouldn't need.

use pascalc_base::{Diagnostics, ErrorCategory, Span, Symbol};
use pascalc_frontend::{Keyword, Punct, Token, TokenKind};

pub struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// The token under the cursor, without consuming it.
    pub fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    /// The token `offset` positions past the cursor, without consuming
    /// anything; `peek_at(0)` is the same token [`Self::peek`] returns. Used
    /// only where the grammar is genuinely ambiguous on one token, such as
    /// telling a statement label (`99: ...`) apart from an integer constant
    /// starting an expression.
    pub fn peek_at(&self, offset: usize) -> &Token {
        &self.tokens[(self.pos + offset).min(self.tokens.len() - 1)]
    }

    pub fn span(&self) -> Span {
        self.peek().span
    }

    /// Consumes and returns the current token.
    pub fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !token.is_eof() {
            self.pos += 1;
        }
        token
    }

    pub fn at_eof(&self) -> bool {
        self.peek().is_eof()
    }

    pub fn at_keyword(&self, kw: Keyword) -> bool {
        self.peek().is_keyword(kw)
    }

    pub fn at_punct(&self, p: Punct) -> bool {
        self.peek().is_punct(p)
    }

    /// Consumes the current token if it is `kw`, reporting a syntax error
    /// and leaving the cursor in place otherwise.
    pub fn expect_keyword(&mut self, kw: Keyword, diagnostics: &mut Diagnostics) -> bool {
        if self.at_keyword(kw) {
            self.advance();
            true
        } else {
            diagnostics.error(
                ErrorCategory::Syntactic,
                format!("expected '{:?}'", kw),
                self.span(),
            );
            false
        }
    }

    pub fn expect_punct(&mut self, p: Punct, diagnostics: &mut Diagnostics) -> bool {
        if self.at_punct(p) {
            self.advance();
            true
        } else {
            diagnostics.error(
                ErrorCategory::Syntactic,
                format!("expected '{:?}'", p),
                self.span(),
            );
            false
        }
    }

    /// Consumes and returns the current token's identifier symbol, or
    /// reports a syntax error and returns `None`.
    pub fn expect_ident(&mut self, diagnostics: &mut Diagnostics) -> Option<Symbol> {
        if let Some(sym) = self.peek().ident() {
            self.advance();
            Some(sym)
        } else {
            diagnostics.error(ErrorCategory::Syntactic, "expected an identifier", self.span());
            None
        }
    }

    /// Skips tokens until the next semicolon or end-of-file, the panic-mode
    /// recovery point a malformed declaration or statement resyncs to so
    /// that one error doesn't cascade into dozens.
    pub fn resync_to_semicolon(&mut self) {
        while !self.at_eof() && !self.at_punct(Punct::Semicolon) {
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pascalc_base::Interner;

    fn stream(source: &str) -> TokenStream {
        let mut interner = Interner::new();
        let mut diags = Diagnostics::new();
        TokenStream::new(pascalc_frontend::lex(source, &mut interner, &mut diags))
    }

    #[test]
    fn peek_does_not_consume() {
        let s = stream("begin end");
        assert!(s.at_keyword(Keyword::Begin));
        assert!(s.at_keyword(Keyword::Begin));
    }

    #[test]
    fn advance_moves_to_next_token() {
        let mut s = stream("begin end");
        s.advance();
        assert!(s.at_keyword(Keyword::End));
    }

    #[test]
    fn advance_past_eof_stays_at_eof() {
        let mut s = stream("");
        assert!(s.at_eof());
        s.advance();
        assert!(s.at_eof());
    }

    #[test]
    fn expect_keyword_reports_error_when_mismatched() {
        let mut s = stream("end");
        let mut diags = Diagnostics::new();
        let ok = s.expect_keyword(Keyword::Begin, &mut diags);
        assert!(!ok);
        assert!(diags.has_errors());
    }

    #[test]
    fn resync_to_semicolon_stops_before_consuming_it() {
        let mut s = stream("foo bar ; baz");
        s.resync_to_semicolon();
        assert!(s.at_punct(Punct::Semicolon));
    }
}
