//! Compile-time constant expression evaluation.
//!
//! A `const` declaration's right-hand side is a small expression grammar —
//! sums, products, parenthesized sub-expressions, references to earlier
//! constants, set constructors — evaluated entirely at compile time rather
//! than emitted as p-code. This module mirrors the precedence climbing in
//! [`crate::expr`] but produces a [`ConstValue`] instead of instructions, so
//! the two should be read side by side: any operator [`crate::expr`] emits
//! code for, this module computes directly.

use pascalc_base::{Diagnostics, ErrorCategory, Span};
use pascalc_frontend::{Punct, SymbolKind, SymbolTable};

use crate::tokenstream::TokenStream;

/// The value of a fully-evaluated constant expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Integer(i64),
    Real(f64),
    Char(u8),
    Bool(bool),
    Str(String),
    /// A set constant, stored as the sorted list of member ordinals.
    Set(Vec<i64>),
}

impl ConstValue {
    /// Converts to the value shape stored on a `const` symbol
    /// ([`pascalc_frontend::ConstantValue`]), so a folded value can be
    /// parked on its symbol for later reference by name.
    pub fn to_frontend(&self) -> pascalc_frontend::ConstantValue {
        use pascalc_frontend::ConstantValue as CV;
        match self {
            ConstValue::Integer(i) => CV::Integer(*i),
            ConstValue::Real(r) => CV::Real(*r),
            ConstValue::Char(c) => CV::Char(*c),
            ConstValue::Bool(b) => CV::Bool(*b),
            ConstValue::Str(s) => CV::Str(s.clone()),
            ConstValue::Set(members) => CV::Set(members.clone()),
        }
    }

    /// The inverse of [`Self::to_frontend`], used when a name resolves to
    /// an earlier `const` symbol — either inside another constant
    /// expression or inside ordinary code.
    pub fn from_frontend(value: &pascalc_frontend::ConstantValue) -> ConstValue {
        use pascalc_frontend::ConstantValue as CV;
        match value {
            CV::Integer(i) => ConstValue::Integer(*i),
            CV::Real(r) => ConstValue::Real(*r),
            CV::Char(c) => ConstValue::Char(*c),
            CV::Bool(b) => ConstValue::Bool(*b),
            CV::Str(s) => ConstValue::Str(s.clone()),
            CV::Set(members) => ConstValue::Set(members.clone()),
        }
    }

    fn as_real(&self) -> Option<f64> {
        match self {
            ConstValue::Integer(i) => Some(*i as f64),
            ConstValue::Real(r) => Some(*r),
            _ => None,
        }
    }

    fn is_real(&self) -> bool {
        matches!(self, ConstValue::Real(_))
    }
}

/// Parses and evaluates a constant expression, reporting a
/// [`ErrorCategory::Declaration`] diagnostic and returning `None` on
/// anything that isn't actually constant (an undeclared name, a reference
/// to a variable rather than a constant).
pub fn fold_const_expr(
    stream: &mut TokenStream,
    symbols: &SymbolTable,
    diagnostics: &mut Diagnostics,
) -> Option<ConstValue> {
    fold_simple(stream, symbols, diagnostics)
}

/// `simple-constant ::= term { ('+' | '-' | 'or') term }`
fn fold_simple(
    stream: &mut TokenStream,
    symbols: &SymbolTable,
    diagnostics: &mut Diagnostics,
) -> Option<ConstValue> {
    let negate = if stream.at_punct(Punct::Minus) {
        stream.advance();
        true
    } else {
        if stream.at_punct(Punct::Plus) {
            stream.advance();
        }
        false
    };

    let mut acc = fold_term(stream, symbols, diagnostics)?;
    if negate {
        acc = apply_unary_minus(acc, stream.span(), diagnostics)?;
    }

    loop {
        if stream.at_punct(Punct::Plus) {
            stream.advance();
            let rhs = fold_term(stream, symbols, diagnostics)?;
            acc = apply_add(acc, rhs, stream.span(), diagnostics)?;
        } else if stream.at_punct(Punct::Minus) {
            stream.advance();
            let rhs = fold_term(stream, symbols, diagnostics)?;
            acc = apply_sub(acc, rhs, stream.span(), diagnostics)?;
        } else if stream.at_keyword(pascalc_frontend::Keyword::Or) {
            stream.advance();
            let rhs = fold_term(stream, symbols, diagnostics)?;
            acc = apply_bool_op(acc, rhs, |a, b| a || b, stream.span(), diagnostics)?;
        } else {
            break;
        }
    }
    Some(acc)
}

/// `term ::= factor { ('*' | 'div' | 'mod' | 'and') factor }`
fn fold_term(
    stream: &mut TokenStream,
    symbols: &SymbolTable,
    diagnostics: &mut Diagnostics,
) -> Option<ConstValue> {
    let mut acc = fold_factor(stream, symbols, diagnostics)?;
    loop {
        if stream.at_punct(Punct::Star) {
            stream.advance();
            let rhs = fold_factor(stream, symbols, diagnostics)?;
            acc = apply_mul(acc, rhs, stream.span(), diagnostics)?;
        } else if stream.at_keyword(pascalc_frontend::Keyword::Div) {
            stream.advance();
            let rhs = fold_factor(stream, symbols, diagnostics)?;
            acc = apply_int_div(acc, rhs, stream.span(), diagnostics, IntOp::Div)?;
        } else if stream.at_keyword(pascalc_frontend::Keyword::Mod) {
            stream.advance();
            let rhs = fold_factor(stream, symbols, diagnostics)?;
            acc = apply_int_div(acc, rhs, stream.span(), diagnostics, IntOp::Mod)?;
        } else if stream.at_keyword(pascalc_frontend::Keyword::And) {
            stream.advance();
            let rhs = fold_factor(stream, symbols, diagnostics)?;
            acc = apply_bool_op(acc, rhs, |a, b| a && b, stream.span(), diagnostics)?;
        } else {
            break;
        }
    }
    Some(acc)
}

fn fold_factor(
    stream: &mut TokenStream,
    symbols: &SymbolTable,
    diagnostics: &mut Diagnostics,
) -> Option<ConstValue> {
    use pascalc_frontend::TokenKind::*;
    let span = stream.span();
    match stream.peek_kind().clone() {
        IntLiteral(v) => {
            stream.advance();
            Some(ConstValue::Integer(v))
        }
        RealLiteral(v) => {
            stream.advance();
            Some(ConstValue::Real(v))
        }
        CharLiteral(c) => {
            stream.advance();
            Some(ConstValue::Char(c))
        }
        StringLiteral(s) => {
            stream.advance();
            Some(ConstValue::Str(s))
        }
        Keyword(pascalc_frontend::Keyword::Not) => {
            stream.advance();
            let inner = fold_factor(stream, symbols, diagnostics)?;
            match inner {
                ConstValue::Bool(b) => Some(ConstValue::Bool(!b)),
                _ => {
                    diagnostics.error(ErrorCategory::Type, "'not' requires a boolean constant", span);
                    None
                }
            }
        }
        Ident(name) => {
            stream.advance();
            match symbols.lookup(name) {
                Some(r) => match &symbols.get(r).kind {
                    SymbolKind::ScalarObject { ordinal, .. } => Some(ConstValue::Integer(*ordinal)),
                    SymbolKind::Constant { value, .. } => Some(ConstValue::from_frontend(value)),
                    _ => {
                        diagnostics.error(ErrorCategory::Declaration, "not a constant", span);
                        None
                    }
                },
                None => {
                    diagnostics.error(ErrorCategory::Declaration, "undeclared identifier", span);
                    None
                }
            }
        }
        Punct(Punct::LParen) => {
            stream.advance();
            let inner = fold_simple(stream, symbols, diagnostics)?;
            stream.expect_punct(Punct::RParen, diagnostics);
            Some(inner)
        }
        Punct(Punct::LBracket) => fold_set_constructor(stream, symbols, diagnostics),
        _ => {
            diagnostics.error(ErrorCategory::Syntactic, "expected a constant", span);
            None
        }
    }
}

/// An ordinal member's value, used both for a singleton element and for
/// either bound of a `lo..hi` range member.
fn ordinal_member(value: &ConstValue, diagnostics: &mut Diagnostics, span: Span) -> Option<i64> {
    match value {
        ConstValue::Integer(i) => Some(*i),
        ConstValue::Char(c) => Some(*c as i64),
        _ => {
            diagnostics.error(ErrorCategory::Type, "set elements must be ordinal", span);
            None
        }
    }
}

fn fold_set_constructor(
    stream: &mut TokenStream,
    symbols: &SymbolTable,
    diagnostics: &mut Diagnostics,
) -> Option<ConstValue> {
    stream.expect_punct(Punct::LBracket, diagnostics);
    let mut members = Vec::new();
    if !stream.at_punct(Punct::RBracket) {
        loop {
            let span = stream.span();
            let elem = fold_simple(stream, symbols, diagnostics)?;
            let low = ordinal_member(&elem, diagnostics, span)?;
            if stream.at_punct(Punct::DotDot) {
                stream.advance();
                let high_span = stream.span();
                let high_elem = fold_simple(stream, symbols, diagnostics)?;
                let high = ordinal_member(&high_elem, diagnostics, high_span)?;
                if low > high {
                    diagnostics.error(ErrorCategory::Declaration, "set range low bound exceeds high bound", high_span);
                } else {
                    members.extend(low..=high);
                }
            } else {
                members.push(low);
            }
            if stream.at_punct(Punct::Comma) {
                stream.advance();
                continue;
            }
            break;
        }
    }
    stream.expect_punct(Punct::RBracket, diagnostics);
    members.sort_unstable();
    members.dedup();
    Some(ConstValue::Set(members))
}

enum IntOp {
    Div,
    Mod,
}

fn apply_unary_minus(v: ConstValue, span: Span, diagnostics: &mut Diagnostics) -> Option<ConstValue> {
    match v {
        ConstValue::Integer(i) => Some(ConstValue::Integer(-i)),
        ConstValue::Real(r) => Some(ConstValue::Real(-r)),
        _ => {
            diagnostics.error(ErrorCategory::Type, "unary '-' requires a numeric constant", span);
            None
        }
    }
}

fn apply_add(a: ConstValue, b: ConstValue, span: Span, diagnostics: &mut Diagnostics) -> Option<ConstValue> {
    match (&a, &b) {
        (ConstValue::Str(x), ConstValue::Str(y)) => Some(ConstValue::Str(format!("{x}{y}"))),
        _ => arith(a, b, span, diagnostics, |x, y| x + y, |x, y| x + y),
    }
}

fn apply_sub(a: ConstValue, b: ConstValue, span: Span, diagnostics: &mut Diagnostics) -> Option<ConstValue> {
    arith(a, b, span, diagnostics, |x, y| x - y, |x, y| x - y)
}

fn apply_mul(a: ConstValue, b: ConstValue, span: Span, diagnostics: &mut Diagnostics) -> Option<ConstValue> {
    arith(a, b, span, diagnostics, |x, y| x * y, |x, y| x * y)
}

fn arith(
    a: ConstValue,
    b: ConstValue,
    span: Span,
    diagnostics: &mut Diagnostics,
    int_op: impl Fn(i64, i64) -> i64,
    real_op: impl Fn(f64, f64) -> f64,
) -> Option<ConstValue> {
    match (&a, &b) {
        (ConstValue::Integer(x), ConstValue::Integer(y)) => Some(ConstValue::Integer(int_op(*x, *y))),
        _ => match (a.as_real(), b.as_real()) {
            (Some(x), Some(y)) if a.is_real() || b.is_real() => Some(ConstValue::Real(real_op(x, y))),
            _ => {
                diagnostics.error(ErrorCategory::Type, "arithmetic requires numeric constants", span);
                None
            }
        },
    }
}

fn apply_int_div(
    a: ConstValue,
    b: ConstValue,
    span: Span,
    diagnostics: &mut Diagnostics,
    op: IntOp,
) -> Option<ConstValue> {
    match (a, b) {
        (ConstValue::Integer(x), ConstValue::Integer(0)) => {
            let _ = x;
            diagnostics.error(ErrorCategory::Declaration, "division by zero in constant expression", span);
            None
        }
        (ConstValue::Integer(x), ConstValue::Integer(y)) => Some(ConstValue::Integer(match op {
            IntOp::Div => x / y,
            IntOp::Mod => x % y,
        })),
        _ => {
            diagnostics.error(ErrorCategory::Type, "'div'/'mod' require integer constants", span);
            None
        }
    }
}

fn apply_bool_op(
    a: ConstValue,
    b: ConstValue,
    op: impl Fn(bool, bool) -> bool,
    span: Span,
    diagnostics: &mut Diagnostics,
) -> Option<ConstValue> {
    match (a, b) {
        (ConstValue::Bool(x), ConstValue::Bool(y)) => Some(ConstValue::Bool(op(x, y))),
        _ => {
            diagnostics.error(ErrorCategory::Type, "'and'/'or' require boolean constants", span);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pascalc_base::Interner;

    fn fold(source: &str) -> (Option<ConstValue>, bool) {
        let mut interner = Interner::new();
        let mut diags = Diagnostics::new();
        let tokens = pascalc_frontend::lex(source, &mut interner, &mut diags);
        let mut stream = TokenStream::new(tokens);
        let symbols = SymbolTable::new();
        let value = fold_const_expr(&mut stream, &symbols, &mut diags);
        (value, diags.has_errors())
    }

    #[test]
    fn folds_integer_arithmetic_with_precedence() {
        let (value, errored) = fold("1 + 2 * 3");
        assert!(!errored);
        assert_eq!(value, Some(ConstValue::Integer(7)));
    }

    #[test]
    fn folds_parenthesized_expression_first() {
        let (value, _) = fold("(1 + 2) * 3");
        assert_eq!(value, Some(ConstValue::Integer(9)));
    }

    #[test]
    fn mixed_int_real_widens_to_real() {
        let (value, _) = fold("1 + 2.5");
        assert_eq!(value, Some(ConstValue::Real(3.5)));
    }

    #[test]
    fn folds_set_constructor() {
        let (value, errored) = fold("[3, 1, 2, 1]");
        assert!(!errored);
        assert_eq!(value, Some(ConstValue::Set(vec![1, 2, 3])));
    }

    #[test]
    fn folds_set_constructor_with_a_char_range() {
        let (value, errored) = fold("['A', 'C'..'E']");
        assert!(!errored);
        assert_eq!(value, Some(ConstValue::Set(vec![b'A' as i64, b'C' as i64, b'D' as i64, b'E' as i64])));
    }

    #[test]
    fn set_range_with_low_exceeding_high_is_a_declaration_error() {
        let (value, errored) = fold("[5..1]");
        assert!(errored);
        assert_eq!(value, Some(ConstValue::Set(vec![])));
    }

    #[test]
    fn unary_minus_negates() {
        let (value, _) = fold("-5");
        assert_eq!(value, Some(ConstValue::Integer(-5)));
    }

    #[test]
    fn division_by_zero_is_a_declaration_error() {
        let (value, errored) = fold("1 div 0");
        assert!(value.is_none());
        assert!(errored);
    }

    #[test]
    fn string_concatenation_folds() {
        let (value, _) = fold("'foo' + 'bar'");
        assert_eq!(value, Some(ConstValue::Str("foobar".to_string())));
    }

    #[test]
    fn undeclared_identifier_is_a_declaration_error() {
        let (value, errored) = fold("notdeclared");
        assert!(value.is_none());
        assert!(errored);
    }
}
