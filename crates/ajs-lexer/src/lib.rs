// AJS lexer -- converts source text into a lazy stream of tokens.
//
// The parser drives the lexer one token at a time; nothing is buffered
// here beyond the previous token kind, which is used to decide whether
// a `/` opens a regular expression literal or is a division operator
// (a `/` right after something that can end an expression is a
// division, anything else starts a regular expression).

mod cursor;

use std::cell::RefCell;
use std::rc::Rc;

use ajs_common::message::{self, ErrCode};
use ajs_common::options::{CompilerOption, Options};
use ajs_common::position::Position;
use ajs_common::token::{keyword_from_str, Token, TokenKind, Value};
use cursor::Cursor;

/// The AJS tokenizer.
///
/// Options are shared with the parser because pragmas encountered while
/// parsing (e.g. `use octal;`) change how the rest of the file is lexed.
pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    options: Rc<RefCell<Options>>,
    /// Kind of the last significant token, for regex disambiguation.
    previous: TokenKind,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str, filename: &str, options: Rc<RefCell<Options>>) -> Self {
        Self {
            cursor: Cursor::new(source, filename),
            options,
            previous: TokenKind::Unknown,
        }
    }

    /// Position of the character about to be read; used by the parser
    /// for diagnostics and when synthesizing nodes.
    pub fn position(&self) -> Position {
        self.cursor.position().clone()
    }

    /// Read the next token. At end of input this keeps returning `Eof`.
    pub fn next_token(&mut self) -> Token {
        let token = self.scan();
        match token.kind {
            TokenKind::Eof | TokenKind::Unknown => {}
            kind => self.previous = kind,
        }
        token
    }

    /// Convenience for tests and tools: tokenize a whole source at once.
    pub fn tokenize(source: &str, filename: &str) -> Vec<Token> {
        let options = Rc::new(RefCell::new(Options::new()));
        let mut lexer = Lexer::new(source, filename, options);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    fn option_set(&self, option: CompilerOption) -> bool {
        self.options.borrow().is_set(option)
    }

    /// Whether a `/` in the current context is a division operator.
    fn divide_expected(&self) -> bool {
        matches!(
            self.previous,
            TokenKind::Identifier
                | TokenKind::Integer
                | TokenKind::FloatingPoint
                | TokenKind::String
                | TokenKind::RegularExpression
                | TokenKind::CloseParenthesis
                | TokenKind::CloseSquareBracket
                | TokenKind::Increment
                | TokenKind::Decrement
                | TokenKind::This
                | TokenKind::Super
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
                | TokenKind::Undefined
        )
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.cursor.peek() {
                Some(c) if c.is_whitespace() => {
                    self.cursor.advance();
                }
                Some('/') if self.cursor.peek_next() == Some('/') => {
                    self.cursor.eat_while(|c| c != '\n');
                }
                Some('/') if self.cursor.peek_next() == Some('*') => {
                    let start = self.position();
                    self.cursor.advance(); // /
                    self.cursor.advance(); // *
                    loop {
                        match self.cursor.advance() {
                            None => {
                                message::error(
                                    ErrCode::UnexpectedEof,
                                    &start,
                                    "end of file found before the end of this comment.",
                                );
                                return;
                            }
                            Some('*') if self.cursor.peek() == Some('/') => {
                                self.cursor.advance();
                                break;
                            }
                            _ => {}
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn scan(&mut self) -> Token {
        self.skip_whitespace_and_comments();
        let position = self.position();
        let c = match self.cursor.advance() {
            None => return Token::new(TokenKind::Eof, Value::None, position),
            Some(c) => c,
        };

        use TokenKind::*;
        let kind = match c {
            '(' => OpenParenthesis,
            ')' => CloseParenthesis,
            '[' => OpenSquareBracket,
            ']' => CloseSquareBracket,
            '{' => OpenCurvlyBracket,
            '}' => CloseCurvlyBracket,
            ';' => Semicolon,
            ',' => Comma,
            '?' => Conditional,

            ':' => {
                if self.cursor.eat(':') {
                    Scope
                } else {
                    Colon
                }
            }

            '.' => {
                if let Some(d) = self.cursor.peek() {
                    if d.is_ascii_digit() {
                        return self.scan_number('.', position);
                    }
                }
                if self.cursor.eat('.') {
                    if self.cursor.eat('.') {
                        Rest
                    } else {
                        Range
                    }
                } else {
                    Member
                }
            }

            '+' => {
                if self.cursor.eat('+') {
                    Increment
                } else if self.cursor.eat('=') {
                    AssignmentAdd
                } else {
                    Add
                }
            }
            '-' => {
                if self.cursor.eat('-') {
                    Decrement
                } else if self.cursor.eat('=') {
                    AssignmentSubtract
                } else {
                    Subtract
                }
            }
            '*' => {
                if self.cursor.eat('*') {
                    if self.cursor.eat('=') {
                        AssignmentPower
                    } else {
                        Power
                    }
                } else if self.cursor.eat('=') {
                    AssignmentMultiply
                } else {
                    Multiply
                }
            }
            '/' => {
                if !self.divide_expected() {
                    return self.scan_regular_expression(position);
                }
                if self.cursor.eat('=') {
                    AssignmentDivide
                } else {
                    Divide
                }
            }
            '%' => {
                if self.cursor.eat('=') {
                    AssignmentModulo
                } else {
                    Modulo
                }
            }

            '&' => {
                if self.cursor.eat('&') {
                    if self.cursor.eat('=') {
                        AssignmentLogicalAnd
                    } else {
                        LogicalAnd
                    }
                } else if self.cursor.eat('=') {
                    AssignmentBitwiseAnd
                } else {
                    BitwiseAnd
                }
            }
            '|' => {
                if self.cursor.eat('|') {
                    if self.cursor.eat('=') {
                        AssignmentLogicalOr
                    } else {
                        LogicalOr
                    }
                } else if self.cursor.eat('=') {
                    AssignmentBitwiseOr
                } else {
                    BitwiseOr
                }
            }
            '^' => {
                if self.cursor.eat('^') {
                    if self.cursor.eat('=') {
                        AssignmentLogicalXor
                    } else {
                        LogicalXor
                    }
                } else if self.cursor.eat('=') {
                    AssignmentBitwiseXor
                } else {
                    BitwiseXor
                }
            }
            '~' => {
                if self.cursor.eat('~') {
                    SmartMatch
                } else if self.cursor.eat('=') {
                    Match
                } else {
                    BitwiseNot
                }
            }
            '!' => {
                if self.cursor.eat('=') {
                    if self.cursor.eat('=') {
                        StrictlyNotEqual
                    } else {
                        NotEqual
                    }
                } else if self.cursor.eat('~') {
                    NotMatch
                } else {
                    LogicalNot
                }
            }
            '=' => {
                if self.cursor.eat('=') {
                    if self.cursor.eat('=') {
                        StrictlyEqual
                    } else {
                        Equal
                    }
                } else {
                    Assignment
                }
            }

            '<' => {
                if self.cursor.eat('<') {
                    if self.cursor.eat('=') {
                        AssignmentShiftLeft
                    } else {
                        ShiftLeft
                    }
                } else if self.cursor.eat('=') {
                    if self.cursor.eat('>') {
                        Compare
                    } else {
                        LessEqual
                    }
                } else if self.cursor.eat('?') {
                    if self.cursor.eat('=') {
                        AssignmentMinimum
                    } else {
                        Minimum
                    }
                } else if self.cursor.eat('%') {
                    if self.cursor.eat('=') {
                        AssignmentRotateLeft
                    } else {
                        RotateLeft
                    }
                } else {
                    Less
                }
            }
            '>' => {
                if self.cursor.eat('>') {
                    if self.cursor.eat('>') {
                        if self.cursor.eat('=') {
                            AssignmentShiftRightUnsigned
                        } else {
                            ShiftRightUnsigned
                        }
                    } else if self.cursor.eat('=') {
                        AssignmentShiftRight
                    } else {
                        ShiftRight
                    }
                } else if self.cursor.eat('=') {
                    GreaterEqual
                } else if self.cursor.eat('?') {
                    if self.cursor.eat('=') {
                        AssignmentMaximum
                    } else {
                        Maximum
                    }
                } else if self.cursor.eat('%') {
                    if self.cursor.eat('=') {
                        AssignmentRotateRight
                    } else {
                        RotateRight
                    }
                } else {
                    Greater
                }
            }

            '"' | '\'' => return self.scan_string(c, position),

            c if c.is_ascii_digit() => return self.scan_number(c, position),

            c if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
                return self.scan_identifier(c, position)
            }

            c => {
                message::error(
                    ErrCode::UnexpectedPunctuation,
                    &position,
                    format!("unexpected character '{c}' in input."),
                );
                Unknown
            }
        };

        Token::new(kind, Value::None, position)
    }

    fn scan_identifier(&mut self, first: char, position: Position) -> Token {
        let mut name = String::new();
        name.push(first);
        name.push_str(&self.cursor.eat_while(|c| {
            c.is_ascii_alphanumeric() || c == '_' || c == '$'
        }));
        match keyword_from_str(&name) {
            Some(kind) => Token::new(kind, Value::None, position),
            None => Token::new(TokenKind::Identifier, Value::String(name), position),
        }
    }

    fn scan_number(&mut self, first: char, position: Position) -> Token {
        let mut text = String::new();
        let mut float = first == '.';
        text.push(first);

        if first == '0' && (self.cursor.peek() == Some('x') || self.cursor.peek() == Some('X')) {
            self.cursor.advance();
            let digits = self.cursor.eat_while(|c| c.is_ascii_hexdigit());
            if digits.is_empty() {
                message::error(
                    ErrCode::InvalidNumber,
                    &position,
                    "invalid hexadecimal number, at least one digit is required.",
                );
                return Token::new(TokenKind::Integer, Value::Integer(0), position);
            }
            let value = i64::from_str_radix(&digits, 16).unwrap_or(0);
            return Token::new(TokenKind::Integer, Value::Integer(value), position);
        }

        text.push_str(&self.cursor.eat_while(|c| c.is_ascii_digit()));
        if !float && self.cursor.peek() == Some('.') {
            // do not swallow `..` (range) nor a member access
            if matches!(self.cursor.peek_next(), Some(d) if d.is_ascii_digit()) {
                float = true;
                text.push('.');
                self.cursor.advance();
                text.push_str(&self.cursor.eat_while(|c| c.is_ascii_digit()));
            }
        }
        if matches!(self.cursor.peek(), Some('e') | Some('E')) {
            let mut iter_is_exponent = false;
            match self.cursor.peek_next() {
                Some(d) if d.is_ascii_digit() => iter_is_exponent = true,
                Some('+') | Some('-') => iter_is_exponent = true,
                _ => {}
            }
            if iter_is_exponent {
                float = true;
                text.push('e');
                self.cursor.advance();
                if self.cursor.peek() == Some('+') || self.cursor.peek() == Some('-') {
                    text.push(self.cursor.advance().unwrap());
                }
                text.push_str(&self.cursor.eat_while(|c| c.is_ascii_digit()));
            }
        }

        if float {
            let value = text.parse::<f64>().unwrap_or_else(|_| {
                message::error(
                    ErrCode::InvalidNumber,
                    &position,
                    format!("invalid floating point number \"{text}\"."),
                );
                0.0
            });
            return Token::new(TokenKind::FloatingPoint, Value::Floating(value), position);
        }

        // a leading 0 introduces an octal number when the option is on
        let value = if text.len() > 1
            && text.starts_with('0')
            && self.option_set(CompilerOption::Octal)
        {
            i64::from_str_radix(&text[1..], 8).unwrap_or_else(|_| {
                message::error(
                    ErrCode::InvalidNumber,
                    &position,
                    format!("invalid octal number \"{text}\"."),
                );
                0
            })
        } else {
            text.parse::<i64>().unwrap_or_else(|_| {
                message::error(
                    ErrCode::InvalidNumber,
                    &position,
                    format!("invalid number \"{text}\"."),
                );
                0
            })
        };
        Token::new(TokenKind::Integer, Value::Integer(value), position)
    }

    fn scan_string(&mut self, quote: char, position: Position) -> Token {
        let mut text = String::new();
        loop {
            let c = match self.cursor.peek() {
                None => {
                    message::error(
                        ErrCode::UnterminatedString,
                        &position,
                        "the last string was not closed before the end of the input was reached.",
                    );
                    break;
                }
                Some('\n') => {
                    message::error(
                        ErrCode::UnterminatedString,
                        &position,
                        "a string cannot include a newline character.",
                    );
                    break;
                }
                Some(c) => c,
            };
            self.cursor.advance();
            if c == quote {
                break;
            }
            if c != '\\' {
                text.push(c);
                continue;
            }
            match self.cursor.advance() {
                None => {
                    message::error(
                        ErrCode::UnterminatedString,
                        &position,
                        "the last string was not closed before the end of the input was reached.",
                    );
                    break;
                }
                Some('b') => text.push('\u{8}'),
                Some('f') => text.push('\u{c}'),
                Some('n') => text.push('\n'),
                Some('r') => text.push('\r'),
                Some('t') => text.push('\t'),
                Some('v') => text.push('\u{b}'),
                Some('0') => text.push('\0'),
                Some('\'') => text.push('\''),
                Some('"') => text.push('"'),
                Some('\\') => text.push('\\'),
                Some('\n') => {} // line continuation
                Some('x') | Some('X') => {
                    text.push(self.scan_hex_escape(2, &position));
                }
                Some('u') => {
                    text.push(self.scan_hex_escape(4, &position));
                }
                Some('e') if self.option_set(CompilerOption::ExtendedEscapeSequences) => {
                    text.push('\u{1b}');
                }
                Some(c) => {
                    message::error(
                        ErrCode::UnknownEscapeSequence,
                        &position,
                        format!("unknown escape letter '{c}'."),
                    );
                    text.push(c);
                }
            }
        }
        Token::new(TokenKind::String, Value::String(text), position)
    }

    fn scan_hex_escape(&mut self, digits: usize, position: &Position) -> char {
        let mut value = 0u32;
        for _ in 0..digits {
            match self.cursor.peek() {
                Some(c) if c.is_ascii_hexdigit() => {
                    value = value * 16 + c.to_digit(16).unwrap();
                    self.cursor.advance();
                }
                _ => {
                    message::error(
                        ErrCode::InvalidUnicodeEscapeSequence,
                        position,
                        format!("this escape expects exactly {digits} hexadecimal digits."),
                    );
                    return '\u{fffd}';
                }
            }
        }
        char::from_u32(value).unwrap_or('\u{fffd}')
    }

    fn scan_regular_expression(&mut self, position: Position) -> Token {
        // the '/' was already consumed
        let mut text = String::from("/");
        let mut in_class = false;
        loop {
            let c = match self.cursor.peek() {
                None | Some('\n') => {
                    message::error(
                        ErrCode::UnterminatedString,
                        &position,
                        "regular expression not terminated before the end of the line.",
                    );
                    return Token::new(
                        TokenKind::RegularExpression,
                        Value::String(text),
                        position,
                    );
                }
                Some(c) => c,
            };
            self.cursor.advance();
            text.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = self.cursor.advance() {
                        text.push(escaped);
                    }
                }
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => break,
                _ => {}
            }
        }
        // flags
        text.push_str(&self.cursor.eat_while(|c| c.is_ascii_alphabetic()));
        Token::new(TokenKind::RegularExpression, Value::String(text), position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source, "test.ajs")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn empty_input_is_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(kinds("   \n\t "), vec![TokenKind::Eof]);
    }

    #[test]
    fn keywords_and_identifiers() {
        let tokens = Lexer::tokenize("class Foo extends bar_2", "t.ajs");
        assert_eq!(tokens[0].kind, TokenKind::Class);
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].value.as_string(), "Foo");
        assert_eq!(tokens[2].kind, TokenKind::Extends);
        assert_eq!(tokens[3].value.as_string(), "bar_2");
    }

    #[test]
    fn extended_operators_lex() {
        assert_eq!(
            kinds("** <? >? <% >% <=> ~~ !~ :: ^^ **= <?= >%="),
            vec![
                TokenKind::Power,
                TokenKind::Minimum,
                TokenKind::Maximum,
                TokenKind::RotateLeft,
                TokenKind::RotateRight,
                TokenKind::Compare,
                TokenKind::SmartMatch,
                TokenKind::NotMatch,
                TokenKind::Scope,
                TokenKind::LogicalXor,
                TokenKind::AssignmentPower,
                TokenKind::AssignmentMinimum,
                TokenKind::AssignmentRotateRight,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn shift_and_comparison_operators() {
        assert_eq!(
            kinds("<< >> >>> <<= >>= >>>= < <= > >= == != === !=="),
            vec![
                TokenKind::ShiftLeft,
                TokenKind::ShiftRight,
                TokenKind::ShiftRightUnsigned,
                TokenKind::AssignmentShiftLeft,
                TokenKind::AssignmentShiftRight,
                TokenKind::AssignmentShiftRightUnsigned,
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::Equal,
                TokenKind::NotEqual,
                TokenKind::StrictlyEqual,
                TokenKind::StrictlyNotEqual,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn member_range_rest() {
        assert_eq!(
            kinds("a.b 1 .. 2 ..."),
            vec![
                TokenKind::Identifier,
                TokenKind::Member,
                TokenKind::Identifier,
                TokenKind::Integer,
                TokenKind::Range,
                TokenKind::Integer,
                TokenKind::Rest,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn numbers() {
        let tokens = Lexer::tokenize("123 0x1F 3.25 1e3 .5", "t.ajs");
        assert_eq!(tokens[0].value, Value::Integer(123));
        assert_eq!(tokens[1].value, Value::Integer(31));
        assert_eq!(tokens[2].value, Value::Floating(3.25));
        assert_eq!(tokens[3].value, Value::Floating(1000.0));
        assert_eq!(tokens[4].value, Value::Floating(0.5));
    }

    #[test]
    fn octal_numbers_require_option() {
        // without the option a leading zero stays decimal
        let tokens = Lexer::tokenize("017", "t.ajs");
        assert_eq!(tokens[0].value, Value::Integer(17));

        let options = Rc::new(RefCell::new(Options::new()));
        options
            .borrow_mut()
            .set_option(CompilerOption::Octal, 1);
        let mut lexer = Lexer::new("017", "t.ajs", options);
        let token = lexer.next_token();
        assert_eq!(token.value, Value::Integer(0o17));
    }

    #[test]
    fn strings_and_escapes() {
        let tokens = Lexer::tokenize(r#""a\tb" 'c\x41d' "A""#, "t.ajs");
        assert_eq!(tokens[0].value, Value::String("a\tb".to_string()));
        assert_eq!(tokens[1].value, Value::String("cAd".to_string()));
        assert_eq!(tokens[2].value, Value::String("A".to_string()));
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("a // comment\n/* block\ncomment */ b"),
            vec![TokenKind::Identifier, TokenKind::Identifier, TokenKind::Eof]
        );
    }

    #[test]
    fn regex_vs_divide() {
        // after an identifier, '/' is a division
        assert_eq!(
            kinds("a / b"),
            vec![
                TokenKind::Identifier,
                TokenKind::Divide,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
        // after '=', '/' opens a regular expression
        let tokens = Lexer::tokenize("x = /ab[/]c/g;", "t.ajs");
        assert_eq!(tokens[2].kind, TokenKind::RegularExpression);
        assert_eq!(tokens[2].value.as_string(), "/ab[/]c/g");
        assert_eq!(tokens[3].kind, TokenKind::Semicolon);
    }

    #[test]
    fn positions_are_tracked() {
        let tokens = Lexer::tokenize("a\n  b", "t.ajs");
        assert_eq!(tokens[0].position.line(), 1);
        assert_eq!(tokens[0].position.column(), 1);
        assert_eq!(tokens[1].position.line(), 2);
        assert_eq!(tokens[1].position.column(), 3);
    }
}
