//! Parameter token parser.
//!
//! Finds `$name`, `$name(min,max)` and `$name(min,max).initial` in a stage
//! block, rewrites each to `_name` and yields one [`Declaration`] per token.
//! The whole block fails on the first malformed token; nothing is applied.

use crate::error::{TokenError, TokenErrorKind};
use crate::params::types::{uniform_name, Bounds, Declaration};

/// A stage block with every token rewritten, plus what the tokens declared.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStage {
    pub source: String,
    pub declarations: Vec<Declaration>,
}

impl ParsedStage {
    /// Distinct parameter names this stage refers to, first-seen order.
    pub fn referenced(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for d in &self.declarations {
            if !names.contains(&d.name) {
                names.push(d.name.clone());
            }
        }
        names
    }
}

pub fn parse_tokens(src: &str) -> Result<ParsedStage, TokenError> {
    let mut out = String::with_capacity(src.len());
    let mut declarations = Vec::new();
    let mut copied = 0;
    let mut search_from = 0;

    while let Some(rel) = src[search_from..].find('$') {
        let start = search_from + rel;
        out.push_str(&src[copied..start]);

        let mut cursor = Cursor::new(src, start + 1);
        let decl = cursor.declaration(start)?;
        out.push_str(&uniform_name(&decl.name));
        declarations.push(decl);

        search_from = cursor.pos;
        copied = cursor.pos;
    }
    out.push_str(&src[copied..]);

    Ok(ParsedStage {
        source: out,
        declarations,
    })
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str, pos: usize) -> Self {
        Self { src, pos }
    }

    fn peek(&self) -> Option<u8> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + offset).copied()
    }

    fn error(&self, at: usize, kind: TokenErrorKind) -> TokenError {
        let before = &self.src[..at];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        TokenError {
            line,
            column: at - line_start + 1,
            kind,
        }
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn skip_ws(&mut self) {
        self.take_while(|c| c.is_ascii_whitespace());
    }

    fn expect(&mut self, c: u8, kind: TokenErrorKind) -> Result<(), TokenError> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(self.pos, kind))
        }
    }

    /// `$` has already been consumed; `dollar` is its offset.
    fn declaration(&mut self, dollar: usize) -> Result<Declaration, TokenError> {
        let name = self.take_while(|c| c.is_ascii_alphanumeric() || c == b'_');
        if name.is_empty() {
            return Err(self.error(dollar, TokenErrorKind::EmptyName));
        }
        let mut decl = Declaration {
            name: name.to_string(),
            bounds: None,
            initial: None,
        };

        if self.peek() != Some(b'(') {
            return Ok(decl);
        }
        self.pos += 1;

        self.skip_ws();
        let min_at = self.pos;
        let min = self.number()?;
        self.skip_ws();
        self.expect(b',', TokenErrorKind::ExpectedComma)?;
        self.skip_ws();
        let max = self.number()?;
        self.skip_ws();
        self.expect(b')', TokenErrorKind::UnterminatedBounds)?;
        if min > max {
            return Err(self.error(min_at, TokenErrorKind::InvertedBounds { min, max }));
        }
        decl.bounds = Some(Bounds { min, max });

        let starts_number = |c: Option<u8>| {
            c.is_some_and(|c| c.is_ascii_digit() || matches!(c, b'+' | b'-' | b'.'))
        };
        if self.peek() == Some(b'.') && starts_number(self.peek_at(1)) {
            self.pos += 1;
            decl.initial = Some(self.number()?);
        }

        Ok(decl)
    }

    /// `[+-]? (digits ['.' digits?] | '.' digits)`
    fn number(&mut self) -> Result<f32, TokenError> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.pos += 1;
        }
        let int_digits = self.take_while(|c| c.is_ascii_digit()).len();
        let mut frac_digits = 0;
        if self.peek() == Some(b'.') && (int_digits > 0 || self.peek_at(1).is_some_and(|c| c.is_ascii_digit())) {
            self.pos += 1;
            frac_digits = self.take_while(|c| c.is_ascii_digit()).len();
        }

        let literal = &self.src[start..self.pos];
        if int_digits + frac_digits == 0 {
            let end = self.src[start..]
                .find(|c: char| c.is_ascii_whitespace() || c == ',' || c == ')')
                .map_or(self.src.len(), |i| start + i);
            return Err(self.error(
                start,
                TokenErrorKind::InvalidNumber(self.src[start..end].to_string()),
            ));
        }
        // Literals past the f32 range parse to infinity.
        literal
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| self.error(start, TokenErrorKind::InvalidNumber(literal.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    fn single(src: &str) -> Declaration {
        let parsed = parse_tokens(src).unwrap();
        assert_eq!(parsed.declarations.len(), 1);
        parsed.declarations[0].clone()
    }

    #[test]
    fn bounds_yield_midpoint() {
        let d = single("$a(0,10)");
        assert_eq!(d.name, "a");
        assert_eq!(d.bounds, Some(Bounds { min: 0.0, max: 10.0 }));
        assert!(approx_eq(d.start_value(), 5.0, 1e-6));
    }

    #[test]
    fn initial_literal_sets_value() {
        let d = single("$a(0,10).3");
        assert_eq!(d.initial, Some(3.0));
        assert!(approx_eq(d.start_value(), 3.0, 1e-6));
    }

    #[test]
    fn bare_token_uses_defaults() {
        let d = single("$a");
        assert_eq!(d.bounds, None);
        let p = d.to_parameter();
        assert_eq!((p.min, p.max), (0.0, 1.0));
        assert!(approx_eq(p.value, 0.5, 1e-6));
    }

    #[test]
    fn rewrites_tokens_in_place() {
        let parsed = parse_tokens("float t = iTime * $speed + $offset(0, 10).2.5;").unwrap();
        assert_eq!(parsed.source, "float t = iTime * _speed + _offset;");
        assert_eq!(parsed.declarations[1].initial, Some(2.5));
    }

    #[test]
    fn whitespace_and_signs_inside_bounds() {
        let d = single("$k( -1.5 ,\n +2 )");
        assert_eq!(d.bounds, Some(Bounds { min: -1.5, max: 2.0 }));
    }

    #[test]
    fn leading_dot_numbers() {
        let d = single("$k(.25,1.)");
        assert_eq!(d.bounds, Some(Bounds { min: 0.25, max: 1.0 }));
    }

    #[test]
    fn negative_initial() {
        let d = single("$k(-1,1).-0.5");
        assert_eq!(d.initial, Some(-0.5));
    }

    #[test]
    fn initial_outside_bounds_is_clamped() {
        let d = single("$k(0,1).4");
        assert!(approx_eq(d.start_value(), 1.0, 1e-6));
    }

    #[test]
    fn dot_after_bounds_without_number_passes_through() {
        let parsed = parse_tokens("vec2 v = vec2($x(0,1).x);").unwrap();
        assert_eq!(parsed.source, "vec2 v = vec2(_x.x);");
        assert_eq!(parsed.declarations[0].initial, None);
    }

    #[test]
    fn identifier_ends_at_non_word_char() {
        let parsed = parse_tokens("$a_1+$b").unwrap();
        assert_eq!(parsed.source, "_a_1+_b");
        assert_eq!(parsed.referenced(), vec!["a_1", "b"]);
    }

    #[test]
    fn unmatched_text_passes_through() {
        let src = "void main() {\n    fragColor = vec4(1.0);\n}\n";
        let parsed = parse_tokens(src).unwrap();
        assert_eq!(parsed.source, src);
        assert!(parsed.declarations.is_empty());
    }

    #[test]
    fn referenced_deduplicates() {
        let parsed = parse_tokens("$a + $a(0,2) + $b").unwrap();
        assert_eq!(parsed.declarations.len(), 3);
        assert_eq!(parsed.referenced(), vec!["a", "b"]);
    }

    #[test]
    fn empty_name_fails() {
        let err = parse_tokens("x = $ + 1;").unwrap_err();
        assert_eq!(err.kind, TokenErrorKind::EmptyName);
        assert_eq!((err.line, err.column), (1, 5));
    }

    #[test]
    fn non_numeric_bound_fails() {
        let err = parse_tokens("$a(zero,1)").unwrap_err();
        assert_eq!(err.kind, TokenErrorKind::InvalidNumber("zero".into()));
    }

    #[test]
    fn out_of_range_literal_fails() {
        let huge = format!("1{}", "0".repeat(39));
        let err = parse_tokens(&format!("$a(0,{huge})")).unwrap_err();
        assert_eq!(err.kind, TokenErrorKind::InvalidNumber(huge.clone()));
        assert_eq!(err.column, 6);

        let err = parse_tokens(&format!("$a(-{huge},1)")).unwrap_err();
        assert_eq!(err.kind, TokenErrorKind::InvalidNumber(format!("-{huge}")));
    }

    #[test]
    fn large_finite_bounds_start_inside() {
        let d = single("$a(300000000000000000000000000000000000000,340000000000000000000000000000000000000)");
        let p = d.to_parameter();
        assert!(p.value.is_finite());
        assert!(p.value >= p.min && p.value <= p.max);
    }

    #[test]
    fn missing_comma_fails() {
        let err = parse_tokens("$a(0 1)").unwrap_err();
        assert_eq!(err.kind, TokenErrorKind::ExpectedComma);
    }

    #[test]
    fn unterminated_bounds_fail() {
        let err = parse_tokens("float f = $a(0,1;\n").unwrap_err();
        assert_eq!(err.kind, TokenErrorKind::UnterminatedBounds);
        let err = parse_tokens("$a(0,1").unwrap_err();
        assert_eq!(err.kind, TokenErrorKind::UnterminatedBounds);
    }

    #[test]
    fn inverted_bounds_fail() {
        let err = parse_tokens("$a(5,1)").unwrap_err();
        assert_eq!(err.kind, TokenErrorKind::InvertedBounds { min: 5.0, max: 1.0 });
    }

    #[test]
    fn error_position_is_line_relative() {
        let err = parse_tokens("ok $a\nfloat y = $b(1,,2);").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 16);
    }
}
