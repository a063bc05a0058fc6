//! Formula parser
//!
//! A recursive descent parser for sanitized formulas with proper operator
//! precedence. Column names have already been rewritten to plain identifiers,
//! so the grammar only knows about identifiers, literals and operators.

use std::fmt;

use crate::ast::{BinaryOperator, Constant, FormulaExpr, Keyword, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};

/// Deepest syntax tree the parser builds
///
/// Every parenthesis, unary prefix, binary operator and postfix step adds a
/// level, so `a + b + c` is three levels deep.
pub const MAX_DEPTH: usize = 128;

/// Words with grammatical meaning; never usable as safe column identifiers
pub(crate) const KEYWORDS: &[&str] = &[
    "lambda", "for", "in", "not", "if", "else", "and", "or", "is", "None",
];

/// Parse a sanitized formula string into an AST
///
/// A single leading `=` is accepted and ignored, so spreadsheet-style
/// `=SUM(x)` parses the same as `SUM(x)`.
///
/// # Example
/// ```rust
/// use duke_frame_formula::parse_formula;
///
/// let ast = parse_formula("1 + 2").unwrap();
/// let ast = parse_formula("SUM(Sales, Tax)").unwrap();
/// let ast = parse_formula("ROUND(Price * 1.2, digits=2)").unwrap();
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<FormulaExpr> {
    let mut parser = FormulaParser::new(formula)?;
    if parser.current == Token::Equal {
        parser.advance_token()?;
    }
    if parser.current == Token::Eof {
        return Err(FormulaError::syntax("empty expression", parser.current_start));
    }

    let expr = parser.parse_expression()?;

    // Make sure we consumed all input
    match &parser.current {
        Token::Eof => Ok(expr),
        Token::Equal => parser.error("assignment is not allowed"),
        Token::Semicolon => parser.error("multiple statements are not allowed"),
        Token::RightParen | Token::RightBracket | Token::RightBrace => {
            parser.error(format!("unbalanced {}", parser.current))
        }
        other => parser.error(format!("unexpected {} after expression", other)),
    }
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
enum Token {
    // Literals
    Int(i64),
    Float(f64),
    String(String),
    Identifier(String),

    // Operators
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    Ampersand,
    Pipe,
    Caret,
    Tilde,
    EqualEqual,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Equal,

    // Punctuation
    Comma,
    Colon,
    Dot,
    Semicolon,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,

    // End of input
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Token::Int(n) => return write!(f, "number {}", n),
            Token::Float(n) => return write!(f, "number {}", n),
            Token::String(s) => return write!(f, "string {:?}", s),
            Token::Identifier(name) => return write!(f, "'{}'", name),
            Token::Eof => return f.write_str("end of expression"),
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::DoubleStar => "**",
            Token::Slash => "/",
            Token::DoubleSlash => "//",
            Token::Percent => "%",
            Token::Ampersand => "&",
            Token::Pipe => "|",
            Token::Caret => "^",
            Token::Tilde => "~",
            Token::EqualEqual => "==",
            Token::NotEqual => "!=",
            Token::LessThan => "<",
            Token::LessEqual => "<=",
            Token::GreaterThan => ">",
            Token::GreaterEqual => ">=",
            Token::Equal => "=",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::Dot => ".",
            Token::Semicolon => ";",
            Token::LeftParen => "(",
            Token::RightParen => ")",
            Token::LeftBracket => "[",
            Token::RightBracket => "]",
            Token::LeftBrace => "{",
            Token::RightBrace => "}",
        };
        write!(f, "'{}'", symbol)
    }
}

/// Formula parser
#[derive(Clone)]
struct FormulaParser<'a> {
    input: &'a str,
    pos: usize,
    current: Token,
    current_start: usize,
    depth: usize,
}

impl<'a> FormulaParser<'a> {
    fn new(input: &'a str) -> FormulaResult<Self> {
        let mut parser = Self {
            input,
            pos: 0,
            current: Token::Eof,
            current_start: 0,
            depth: 0,
        };
        parser.advance_token()?;
        Ok(parser)
    }

    // === Token scanning ===

    fn advance_token(&mut self) -> FormulaResult<()> {
        self.skip_whitespace();
        self.current_start = self.pos;
        self.current = self.scan_token()?;
        Ok(())
    }

    fn scan_token(&mut self) -> FormulaResult<Token> {
        let Some(c) = self.peek_char() else {
            return Ok(Token::Eof);
        };

        // Operators that may be doubled or followed by '='
        let token = match c {
            '*' => self.one_or_two('*', Token::Star, Token::DoubleStar),
            '/' => self.one_or_two('/', Token::Slash, Token::DoubleSlash),
            '=' => self.one_or_two('=', Token::Equal, Token::EqualEqual),
            '>' => self.one_or_two('=', Token::GreaterThan, Token::GreaterEqual),
            '<' => {
                self.advance();
                match self.peek_char() {
                    Some('=') => {
                        self.advance();
                        Token::LessEqual
                    }
                    Some('>') => {
                        self.advance();
                        Token::NotEqual
                    }
                    _ => Token::LessThan,
                }
            }
            '!' => {
                self.advance();
                if self.peek_char() != Some('=') {
                    return self.error_here("invalid character '!'", self.current_start);
                }
                self.advance();
                Token::NotEqual
            }
            '+' | '-' | '%' | '&' | '|' | '^' | '~' | ',' | ':' | ';' | '(' | ')' | '['
            | ']' | '{' | '}' => {
                self.advance();
                match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '%' => Token::Percent,
                    '&' => Token::Ampersand,
                    '|' => Token::Pipe,
                    '^' => Token::Caret,
                    '~' => Token::Tilde,
                    ',' => Token::Comma,
                    ':' => Token::Colon,
                    ';' => Token::Semicolon,
                    '(' => Token::LeftParen,
                    ')' => Token::RightParen,
                    '[' => Token::LeftBracket,
                    ']' => Token::RightBracket,
                    '{' => Token::LeftBrace,
                    _ => Token::RightBrace,
                }
            }
            '"' | '\'' => return self.scan_string(c),
            '.' if self.peek_char_at(1).map_or(false, |d| d.is_ascii_digit()) => {
                return self.scan_number()
            }
            '.' => {
                self.advance();
                Token::Dot
            }
            c if c.is_ascii_digit() => return self.scan_number(),
            c if c.is_alphabetic() || c == '_' => return Ok(self.scan_identifier()),
            other => {
                return self.error_here(format!("invalid character '{}'", other), self.pos)
            }
        };
        Ok(token)
    }

    fn one_or_two(&mut self, second: char, single: Token, double: Token) -> Token {
        self.advance();
        if self.peek_char() == Some(second) {
            self.advance();
            double
        } else {
            single
        }
    }

    fn scan_string(&mut self, quote: char) -> FormulaResult<Token> {
        let start = self.pos;
        self.advance(); // Skip opening quote

        let mut s = String::new();
        while let Some(c) = self.peek_char() {
            self.advance();
            if c == quote {
                return Ok(Token::String(s));
            }
            if c != '\\' {
                s.push(c);
                continue;
            }
            match self.peek_char() {
                Some(escaped) => {
                    self.advance();
                    match escaped {
                        'n' => s.push('\n'),
                        't' => s.push('\t'),
                        'r' => s.push('\r'),
                        '\\' | '\'' | '"' => s.push(escaped),
                        other => {
                            s.push('\\');
                            s.push(other);
                        }
                    }
                }
                None => break,
            }
        }

        self.error_here("unterminated string literal", start)
    }

    fn scan_number(&mut self) -> FormulaResult<Token> {
        let start = self.pos;
        let mut is_float = false;

        // Integer part
        self.skip_digits();

        // Decimal part
        if self.peek_char() == Some('.') {
            is_float = true;
            self.advance();
            self.skip_digits();
        }

        // Exponent part, only when digits follow
        if matches!(self.peek_char(), Some('e' | 'E')) {
            let digits_at = match self.peek_char_at(1) {
                Some('+' | '-') => 2,
                _ => 1,
            };
            if self.peek_char_at(digits_at).map_or(false, |c| c.is_ascii_digit()) {
                is_float = true;
                for _ in 0..digits_at {
                    self.advance();
                }
                self.skip_digits();
            }
        }

        let text = &self.input[start..self.pos];
        if !is_float {
            if let Ok(n) = text.parse::<i64>() {
                return Ok(Token::Int(n));
            }
        }
        match text.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Token::Float(n)),
            _ => self.error_here(format!("invalid number '{}'", text), start),
        }
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek_char()
            .map_or(false, |c| c.is_alphanumeric() || c == '_')
        {
            self.advance();
        }
        Token::Identifier(self.input[start..self.pos].to_string())
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_digits(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, char::is_whitespace) {
            self.advance();
        }
    }

    fn consume(&mut self) -> FormulaResult<Token> {
        let token = std::mem::replace(&mut self.current, Token::Eof);
        self.advance_token()?;
        Ok(token)
    }

    /// Token after the current one, without moving
    fn peek_token(&self) -> FormulaResult<Token> {
        let mut ahead = self.clone();
        ahead.advance_token()?;
        Ok(ahead.current)
    }

    fn expect(&mut self, expected: Token, context: &str) -> FormulaResult<()> {
        if self.current == expected {
            self.consume()?;
            Ok(())
        } else {
            self.error(format!(
                "expected {} {}, found {}",
                expected, context, self.current
            ))
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(&self.current, Token::Identifier(name) if name == keyword)
    }

    fn error<T, S: Into<String>>(&self, message: S) -> FormulaResult<T> {
        Err(FormulaError::syntax(message, self.current_start))
    }

    fn error_here<T, S: Into<String>>(&self, message: S, offset: usize) -> FormulaResult<T> {
        Err(FormulaError::syntax(message, offset))
    }

    fn enter(&mut self) -> FormulaResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return self.error(format!(
                "expression is nested more than {} levels deep",
                MAX_DEPTH
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn leave_levels(&mut self, levels: usize) {
        self.depth -= levels;
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Lambda: lambda params: body
    // 2. Comparison: ==, !=, <, <=, >, >=
    // 3. Bitwise: |, ^, &
    // 4. Addition/Subtraction: +, -
    // 5. Multiplication/Division: *, /, //, %
    // 6. Unary: +, -, ~, not
    // 7. Exponentiation: ** (right-associative)
    // 8. Postfix: call, .attr, [index]
    // 9. Primary: literals, names, parentheses, lists, mappings

    fn parse_expression(&mut self) -> FormulaResult<FormulaExpr> {
        self.enter()?;
        let expr = if self.at_keyword("lambda") {
            self.parse_lambda()?
        } else {
            self.parse_comparison()?
        };
        self.leave();
        Ok(expr)
    }

    fn parse_lambda(&mut self) -> FormulaResult<FormulaExpr> {
        self.consume()?; // lambda

        let mut params = Vec::new();
        while let Token::Identifier(name) = &self.current {
            params.push(name.clone());
            self.consume()?;
            if self.current != Token::Comma {
                break;
            }
            self.consume()?;
        }
        self.expect(Token::Colon, "after lambda parameters")?;

        let body = self.parse_expression()?;
        Ok(FormulaExpr::Lambda {
            params,
            body: Box::new(body),
        })
    }

    fn parse_comparison(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_bitwise()?;
        let mut levels = 0;

        loop {
            let op = match self.current {
                Token::EqualEqual => BinaryOperator::Equal,
                Token::NotEqual => BinaryOperator::NotEqual,
                Token::LessThan => BinaryOperator::LessThan,
                Token::LessEqual => BinaryOperator::LessEqual,
                Token::GreaterThan => BinaryOperator::GreaterThan,
                Token::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => break,
            };

            self.consume()?;
            self.enter()?;
            levels += 1;
            let right = self.parse_bitwise()?;
            left = binary(op, left, right);
        }

        self.leave_levels(levels);
        Ok(left)
    }

    fn parse_bitwise(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_additive()?;
        let mut levels = 0;

        loop {
            let op = match self.current {
                Token::Pipe => BinaryOperator::BitOr,
                Token::Caret => BinaryOperator::BitXor,
                Token::Ampersand => BinaryOperator::BitAnd,
                _ => break,
            };

            self.consume()?;
            self.enter()?;
            levels += 1;
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }

        self.leave_levels(levels);
        Ok(left)
    }

    fn parse_additive(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_multiplicative()?;
        let mut levels = 0;

        loop {
            let op = match self.current {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };

            self.consume()?;
            self.enter()?;
            levels += 1;
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }

        self.leave_levels(levels);
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_unary()?;
        let mut levels = 0;

        loop {
            let op = match self.current {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                Token::DoubleSlash => BinaryOperator::FloorDivide,
                Token::Percent => BinaryOperator::Modulo,
                _ => break,
            };

            self.consume()?;
            self.enter()?;
            levels += 1;
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }

        self.leave_levels(levels);
        Ok(left)
    }

    fn parse_unary(&mut self) -> FormulaResult<FormulaExpr> {
        let op = match &self.current {
            Token::Minus => UnaryOperator::Negate,
            Token::Plus => UnaryOperator::Plus,
            Token::Tilde => UnaryOperator::Invert,
            Token::Identifier(name) if name == "not" => UnaryOperator::Not,
            _ => return self.parse_power(),
        };

        self.consume()?;
        self.enter()?;
        let operand = self.parse_unary()?;
        self.leave();
        Ok(FormulaExpr::UnaryOp {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_power(&mut self) -> FormulaResult<FormulaExpr> {
        let base = self.parse_postfix()?;

        if self.current != Token::DoubleStar {
            return Ok(base);
        }
        self.consume()?;

        // Right-associative, and binds looser than a unary minus on its right
        self.enter()?;
        let exponent = self.parse_unary()?;
        self.leave();
        Ok(binary(BinaryOperator::Power, base, exponent))
    }

    fn parse_postfix(&mut self) -> FormulaResult<FormulaExpr> {
        let mut expr = self.parse_primary()?;
        let mut levels = 0;

        loop {
            if matches!(
                self.current,
                Token::LeftParen | Token::Dot | Token::LeftBracket
            ) {
                self.enter()?;
                levels += 1;
            }
            match self.current {
                Token::LeftParen => expr = self.parse_call(expr)?,
                Token::Dot => {
                    self.consume()?;
                    let Token::Identifier(attr) = &self.current else {
                        return self.error(format!(
                            "expected attribute name after '.', found {}",
                            self.current
                        ));
                    };
                    let attr = attr.clone();
                    self.consume()?;
                    expr = FormulaExpr::Attribute {
                        value: Box::new(expr),
                        attr,
                    };
                }
                Token::LeftBracket => {
                    self.consume()?;
                    let index = self.parse_expression()?;
                    self.expect(Token::RightBracket, "to close subscript")?;
                    expr = FormulaExpr::Subscript {
                        value: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => break,
            }
        }

        self.leave_levels(levels);
        Ok(expr)
    }

    fn parse_call(&mut self, func: FormulaExpr) -> FormulaResult<FormulaExpr> {
        self.expect(Token::LeftParen, "to open argument list")?;

        let mut args = Vec::new();
        let mut keywords: Vec<Keyword> = Vec::new();

        while self.current != Token::RightParen {
            let keyword_name = match &self.current {
                Token::Identifier(name) if self.peek_token()? == Token::Equal => Some(name.clone()),
                _ => None,
            };

            if let Some(name) = keyword_name {
                if keywords.iter().any(|k| k.name == name) {
                    return self.error(format!("keyword argument '{}' repeated", name));
                }
                self.consume()?; // name
                self.consume()?; // '='
                let value = self.parse_expression()?;
                keywords.push(Keyword { name, value });
            } else {
                if !keywords.is_empty() {
                    return self.error("positional argument follows keyword argument");
                }
                args.push(self.parse_expression()?);
            }

            if self.current != Token::Comma {
                break;
            }
            self.consume()?;
        }

        self.expect(Token::RightParen, "to close argument list")?;
        Ok(FormulaExpr::Call {
            func: Box::new(func),
            args,
            keywords,
        })
    }

    fn parse_primary(&mut self) -> FormulaResult<FormulaExpr> {
        let start = self.current_start;

        match self.consume()? {
            Token::Int(n) => Ok(FormulaExpr::int(n)),
            Token::Float(n) => Ok(FormulaExpr::float(n)),
            Token::String(s) => Ok(FormulaExpr::string(s)),
            Token::Identifier(name) => {
                if name.eq_ignore_ascii_case("TRUE") {
                    Ok(FormulaExpr::Constant(Constant::Boolean(true)))
                } else if name.eq_ignore_ascii_case("FALSE") {
                    Ok(FormulaExpr::Constant(Constant::Boolean(false)))
                } else {
                    Ok(FormulaExpr::Name(name))
                }
            }
            Token::LeftParen => {
                let expr = self.parse_expression()?;
                self.expect(Token::RightParen, "to close '('")?;
                Ok(expr)
            }
            Token::LeftBracket => self.parse_list(),
            Token::LeftBrace => self.parse_mapping(),
            Token::Eof => self.error_here("unexpected end of expression", start),
            other => self.error_here(format!("unexpected {}", other), start),
        }
    }

    /// List literal or comprehension; the '[' is already consumed
    fn parse_list(&mut self) -> FormulaResult<FormulaExpr> {
        let mut items = Vec::new();
        if self.current == Token::RightBracket {
            self.consume()?;
            return Ok(FormulaExpr::Sequence(items));
        }

        let first = self.parse_expression()?;
        if self.at_keyword("for") {
            self.consume()?;
            let target = self.parse_postfix()?;
            if !self.at_keyword("in") {
                return self.error(format!("expected 'in' in comprehension, found {}", self.current));
            }
            self.consume()?;
            let iter = self.parse_expression()?;
            self.expect(Token::RightBracket, "to close comprehension")?;
            return Ok(FormulaExpr::Comprehension {
                element: Box::new(first),
                target: Box::new(target),
                iter: Box::new(iter),
            });
        }

        items.push(first);
        while self.current == Token::Comma {
            self.consume()?;
            if self.current == Token::RightBracket {
                break;
            }
            items.push(self.parse_expression()?);
        }
        self.expect(Token::RightBracket, "to close list")?;
        Ok(FormulaExpr::Sequence(items))
    }

    /// Mapping literal; the '{' is already consumed
    fn parse_mapping(&mut self) -> FormulaResult<FormulaExpr> {
        let mut entries = Vec::new();

        while self.current != Token::RightBrace {
            let key = self.parse_expression()?;
            self.expect(Token::Colon, "after mapping key")?;
            let value = self.parse_expression()?;
            entries.push((key, value));

            if self.current != Token::Comma {
                break;
            }
            self.consume()?;
        }

        self.expect(Token::RightBrace, "to close mapping")?;
        Ok(FormulaExpr::Mapping(entries))
    }
}

fn binary(op: BinaryOperator, left: FormulaExpr, right: FormulaExpr) -> FormulaExpr {
    FormulaExpr::BinaryOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn syntax_offset(formula: &str) -> usize {
        match parse_formula(formula) {
            Err(FormulaError::Syntax { offset, .. }) => offset,
            other => panic!("expected syntax error for {:?}, got {:?}", formula, other),
        }
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_formula("42").unwrap(), FormulaExpr::int(42));
        assert_eq!(parse_formula("3.14").unwrap(), FormulaExpr::float(3.14));
        assert_eq!(parse_formula(".5").unwrap(), FormulaExpr::float(0.5));
        assert_eq!(parse_formula("1e3").unwrap(), FormulaExpr::float(1000.0));
        assert_eq!(
            parse_formula("99999999999999999999").unwrap(),
            FormulaExpr::float(1e20)
        );
    }

    #[test]
    fn test_parse_string() {
        assert_eq!(parse_formula("'Hello'").unwrap(), FormulaExpr::string("Hello"));
        assert_eq!(
            parse_formula(r#""say \"hi\"""#).unwrap(),
            FormulaExpr::string("say \"hi\"")
        );
        assert_eq!(parse_formula(r"'a\nb'").unwrap(), FormulaExpr::string("a\nb"));
    }

    #[test]
    fn test_parse_boolean() {
        assert_eq!(
            parse_formula("TRUE").unwrap(),
            FormulaExpr::Constant(Constant::Boolean(true))
        );
        assert_eq!(
            parse_formula("false").unwrap(),
            FormulaExpr::Constant(Constant::Boolean(false))
        );
    }

    #[test]
    fn test_parse_arithmetic_precedence() {
        assert_eq!(
            parse_formula("1 + 2 * 3").unwrap(),
            binary(
                BinaryOperator::Add,
                FormulaExpr::int(1),
                binary(BinaryOperator::Multiply, FormulaExpr::int(2), FormulaExpr::int(3)),
            )
        );
        assert_eq!(
            parse_formula("(1 + 2) * 3").unwrap(),
            binary(
                BinaryOperator::Multiply,
                binary(BinaryOperator::Add, FormulaExpr::int(1), FormulaExpr::int(2)),
                FormulaExpr::int(3),
            )
        );
    }

    #[test]
    fn test_parse_power_is_right_associative() {
        assert_eq!(
            parse_formula("2 ** 3 ** 2").unwrap(),
            binary(
                BinaryOperator::Power,
                FormulaExpr::int(2),
                binary(BinaryOperator::Power, FormulaExpr::int(3), FormulaExpr::int(2)),
            )
        );
    }

    #[test]
    fn test_parse_unary_binds_looser_than_power() {
        assert_eq!(
            parse_formula("-x ** 2").unwrap(),
            FormulaExpr::UnaryOp {
                op: UnaryOperator::Negate,
                operand: Box::new(binary(
                    BinaryOperator::Power,
                    FormulaExpr::name("x"),
                    FormulaExpr::int(2),
                )),
            }
        );
    }

    #[test]
    fn test_parse_call_with_keywords() {
        assert_eq!(
            parse_formula("ROUND(x, digits=2)").unwrap(),
            FormulaExpr::Call {
                func: Box::new(FormulaExpr::name("ROUND")),
                args: vec![FormulaExpr::name("x")],
                keywords: vec![Keyword {
                    name: "digits".into(),
                    value: FormulaExpr::int(2),
                }],
            }
        );
    }

    #[test]
    fn test_parse_empty_call_and_trailing_comma() {
        assert!(matches!(
            parse_formula("F()").unwrap(),
            FormulaExpr::Call { args, .. } if args.is_empty()
        ));
        assert!(matches!(
            parse_formula("F(1, 2,)").unwrap(),
            FormulaExpr::Call { args, .. } if args.len() == 2
        ));
    }

    #[test]
    fn test_parse_collections() {
        assert_eq!(
            parse_formula("[1, 2.5]").unwrap(),
            FormulaExpr::Sequence(vec![FormulaExpr::int(1), FormulaExpr::float(2.5)])
        );
        assert_eq!(
            parse_formula("{'a': 1, 'b': 2}").unwrap(),
            FormulaExpr::Mapping(vec![
                (FormulaExpr::string("a"), FormulaExpr::int(1)),
                (FormulaExpr::string("b"), FormulaExpr::int(2)),
            ])
        );
        assert_eq!(parse_formula("{}").unwrap(), FormulaExpr::Mapping(vec![]));
    }

    #[test]
    fn test_parse_rejected_shapes() {
        assert!(matches!(
            parse_formula("os.system('ls')").unwrap(),
            FormulaExpr::Call { func, .. } if matches!(*func, FormulaExpr::Attribute { .. })
        ));
        assert!(matches!(
            parse_formula("x[0]").unwrap(),
            FormulaExpr::Subscript { .. }
        ));
        assert!(matches!(
            parse_formula("lambda a, b: a + b").unwrap(),
            FormulaExpr::Lambda { params, .. } if params == vec!["a", "b"]
        ));
        assert!(matches!(
            parse_formula("[v for v in x]").unwrap(),
            FormulaExpr::Comprehension { .. }
        ));
        assert!(matches!(
            parse_formula("a < b").unwrap(),
            FormulaExpr::BinaryOp { op: BinaryOperator::LessThan, .. }
        ));
    }

    #[test]
    fn test_leading_equals_is_ignored() {
        assert_eq!(parse_formula("=1").unwrap(), FormulaExpr::int(1));
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(syntax_offset(""), 0);
        assert_eq!(syntax_offset("   "), 3);
        assert_eq!(syntax_offset("1 +"), 3);
        assert_eq!(syntax_offset("(1 + 2"), 6);
        assert_eq!(syntax_offset("1 + 2)"), 5);
        assert_eq!(syntax_offset("x = 1"), 2);
        assert_eq!(syntax_offset("1; 2"), 1);
        assert_eq!(syntax_offset("'abc"), 0);
        assert_eq!(syntax_offset("1 $ 2"), 2);
        assert_eq!(syntax_offset("1 2"), 2);
        assert_eq!(syntax_offset("F(a=1, 2)"), 7);
        assert_eq!(syntax_offset("F(a=1, a=2)"), 7);
        assert_eq!(syntax_offset("x!"), 1);
    }

    #[test]
    fn test_depth_limit() {
        let shallow = format!("{}1{}", "(".repeat(MAX_DEPTH - 1), ")".repeat(MAX_DEPTH - 1));
        assert!(parse_formula(&shallow).is_ok());

        let deep = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert!(parse_formula(&deep).unwrap_err().is_syntax());

        let negations = format!("{}1", "-".repeat(MAX_DEPTH + 1));
        assert!(parse_formula(&negations).unwrap_err().is_syntax());
    }

    #[test]
    fn test_operator_chains_count_toward_depth() {
        let short = format!("A{}", " + 1".repeat(MAX_DEPTH / 2));
        assert!(parse_formula(&short).is_ok());

        for long in [
            format!("A{}", "+1".repeat(100_000)),
            format!("A{}", "*2".repeat(MAX_DEPTH)),
            format!("A{}", " == 1".repeat(MAX_DEPTH)),
        ] {
            assert!(parse_formula(&long).unwrap_err().is_syntax());
        }
    }

    #[test]
    fn test_postfix_chains_count_toward_depth() {
        for long in [
            format!("f{}", "()".repeat(10_000)),
            format!("a{}", ".b".repeat(10_000)),
            format!("a{}", "[0]".repeat(10_000)),
        ] {
            assert!(parse_formula(&long).unwrap_err().is_syntax());
        }
        assert!(parse_formula("os.path.join(a)(b)[0]").is_ok());
    }
}
