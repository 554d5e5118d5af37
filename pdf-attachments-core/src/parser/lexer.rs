//! PDF Lexer
//!
//! Tokenizes PDF syntax according to ISO 32000-1 Section 7.2. The lexer
//! works directly on the in-memory file buffer so that the parser can jump
//! to any cross-reference offset.

use super::{ParseError, ParseResult};

/// PDF Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Boolean: true or false
    Boolean(bool),

    /// Integer number
    Integer(i64),

    /// Real number
    Real(f64),

    /// String (literal or hexadecimal), already unescaped
    String(Vec<u8>),

    /// Name object without the slash, `#xx` escapes decoded
    Name(String),

    /// Left square bracket [
    ArrayStart,

    /// Right square bracket ]
    ArrayEnd,

    /// Dictionary start <<
    DictStart,

    /// Dictionary end >>
    DictEnd,

    Stream,
    EndStream,
    Obj,
    EndObj,
    StartXRef,

    /// The `R` of an indirect reference
    R,

    Null,

    /// Any other bare keyword (`xref`, `trailer`, `n`, `f`, ...)
    Keyword(String),

    /// End of file
    Eof,
}

impl Token {
    pub(crate) fn describe(&self) -> String {
        match self {
            Token::Keyword(k) => format!("keyword '{k}'"),
            Token::Name(n) => format!("name /{n}"),
            Token::Integer(i) => format!("integer {i}"),
            other => format!("{other:?}"),
        }
    }
}

pub(crate) fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0C' | b'\0')
}

pub(crate) fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

pub(crate) fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

/// PDF Lexer over a byte buffer
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Lexer positioned at `offset`
    pub fn at(data: &'a [u8], offset: usize) -> Self {
        Self {
            data,
            position: offset.min(data.len()),
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn seek(&mut self, position: usize) {
        self.position = position.min(self.data.len());
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.position..]
    }

    pub fn is_eof(&self) -> bool {
        self.position >= self.data.len()
    }

    fn peek_byte(&self) -> Option<u8> {
        self.data.get(self.position).copied()
    }

    fn next_byte(&mut self) -> Option<u8> {
        let b = self.peek_byte()?;
        self.position += 1;
        Some(b)
    }

    /// Skip whitespace and comments
    pub fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek_byte() {
            if is_whitespace(b) {
                self.position += 1;
            } else if b == b'%' {
                while let Some(c) = self.peek_byte() {
                    if c == b'\n' || c == b'\r' {
                        break;
                    }
                    self.position += 1;
                }
            } else {
                break;
            }
        }
    }

    /// Skip the end-of-line marker that follows the `stream` keyword.
    pub fn skip_stream_eol(&mut self) {
        match self.peek_byte() {
            Some(b'\r') => {
                self.position += 1;
                if self.peek_byte() == Some(b'\n') {
                    self.position += 1;
                }
            }
            Some(b'\n') => self.position += 1,
            _ => {}
        }
    }

    /// Peek at the next token without consuming it
    pub fn peek_token(&mut self) -> ParseResult<Token> {
        let saved = self.position;
        let token = self.next_token();
        self.position = saved;
        token
    }

    /// Get the next token
    pub fn next_token(&mut self) -> ParseResult<Token> {
        self.skip_whitespace();

        let ch = match self.peek_byte() {
            Some(ch) => ch,
            None => return Ok(Token::Eof),
        };

        match ch {
            b'/' => self.read_name(),
            b'(' => self.read_literal_string(),
            b'<' => {
                if self.data.get(self.position + 1) == Some(&b'<') {
                    self.position += 2;
                    Ok(Token::DictStart)
                } else {
                    self.read_hex_string()
                }
            }
            b'>' => {
                if self.data.get(self.position + 1) == Some(&b'>') {
                    self.position += 2;
                    Ok(Token::DictEnd)
                } else {
                    Err(ParseError::syntax(self.position, "expected '>' after '>'"))
                }
            }
            b'[' => {
                self.position += 1;
                Ok(Token::ArrayStart)
            }
            b']' => {
                self.position += 1;
                Ok(Token::ArrayEnd)
            }
            b'{' | b'}' => {
                self.position += 1;
                Ok(Token::Keyword((ch as char).to_string()))
            }
            b')' => Err(ParseError::syntax(self.position, "unbalanced ')'")),
            b'+' | b'-' | b'.' | b'0'..=b'9' => Ok(self.read_number()),
            _ => Ok(self.read_keyword()),
        }
    }

    fn read_regular_run(&mut self) -> &'a [u8] {
        let start = self.position;
        while self.peek_byte().is_some_and(is_regular) {
            self.position += 1;
        }
        &self.data[start..self.position]
    }

    fn read_name(&mut self) -> ParseResult<Token> {
        self.position += 1; // '/'
        let raw = self.read_regular_run();
        let mut name = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            if raw[i] == b'#' {
                if let Some(value) = raw
                    .get(i + 1..i + 3)
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                {
                    name.push(value);
                    i += 3;
                    continue;
                }
            }
            name.push(raw[i]);
            i += 1;
        }
        Ok(Token::Name(String::from_utf8_lossy(&name).into_owned()))
    }

    fn read_literal_string(&mut self) -> ParseResult<Token> {
        let start = self.position;
        self.position += 1; // '('
        let mut depth = 1usize;
        let mut result = Vec::new();

        loop {
            let b = self
                .next_byte()
                .ok_or_else(|| ParseError::syntax(start, "unterminated literal string"))?;
            match b {
                b'(' => {
                    depth += 1;
                    result.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    result.push(b);
                }
                b'\\' => self.read_escape(&mut result),
                b'\r' => {
                    // Bare end-of-line markers read as a single LF.
                    if self.peek_byte() == Some(b'\n') {
                        self.position += 1;
                    }
                    result.push(b'\n');
                }
                _ => result.push(b),
            }
        }

        Ok(Token::String(result))
    }

    fn read_escape(&mut self, out: &mut Vec<u8>) {
        let Some(b) = self.next_byte() else {
            return;
        };
        match b {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'0'..=b'7' => {
                let mut value = u32::from(b - b'0');
                for _ in 0..2 {
                    match self.peek_byte() {
                        Some(d @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(d - b'0');
                            self.position += 1;
                        }
                        _ => break,
                    }
                }
                out.push((value & 0xFF) as u8);
            }
            // Line continuation
            b'\r' => {
                if self.peek_byte() == Some(b'\n') {
                    self.position += 1;
                }
            }
            b'\n' => {}
            // \( \) \\ and unknown escapes yield the character itself
            other => out.push(other),
        }
    }

    fn read_hex_string(&mut self) -> ParseResult<Token> {
        let start = self.position;
        self.position += 1; // '<'
        let mut digits = Vec::new();

        loop {
            let b = self
                .next_byte()
                .ok_or_else(|| ParseError::syntax(start, "unterminated hex string"))?;
            match b {
                b'>' => break,
                b'0'..=b'9' => digits.push(b - b'0'),
                b'a'..=b'f' => digits.push(b - b'a' + 10),
                b'A'..=b'F' => digits.push(b - b'A' + 10),
                _ if is_whitespace(b) => {}
                _ => {
                    return Err(ParseError::syntax(
                        self.position - 1,
                        format!("invalid hex digit {:?}", b as char),
                    ))
                }
            }
        }

        if digits.len() % 2 == 1 {
            digits.push(0);
        }
        let bytes = digits.chunks(2).map(|pair| (pair[0] << 4) | pair[1]).collect();
        Ok(Token::String(bytes))
    }

    fn read_number(&mut self) -> Token {
        let raw = self.read_regular_run();
        let text = String::from_utf8_lossy(raw);

        if let Ok(value) = text.parse::<i64>() {
            return Token::Integer(value);
        }
        if let Ok(value) = text.parse::<f64>() {
            return Token::Real(value);
        }

        // Malformed numbers such as "--1" or "1.2.3": keep the leading
        // numeric part, falling back to zero.
        let mut end = 0;
        let mut seen_dot = false;
        for (i, c) in text.char_indices() {
            match c {
                '+' | '-' if i == 0 => {}
                '0'..='9' => {}
                '.' if !seen_dot => seen_dot = true,
                _ => break,
            }
            end = i + 1;
        }
        let prefix = &text[..end];
        if seen_dot {
            Token::Real(prefix.parse().unwrap_or(0.0))
        } else {
            Token::Integer(prefix.parse().unwrap_or(0))
        }
    }

    fn read_keyword(&mut self) -> Token {
        let raw = self.read_regular_run();
        match raw {
            b"true" => Token::Boolean(true),
            b"false" => Token::Boolean(false),
            b"null" => Token::Null,
            b"obj" => Token::Obj,
            b"endobj" => Token::EndObj,
            b"stream" => Token::Stream,
            b"endstream" => Token::EndStream,
            b"startxref" => Token::StartXRef,
            b"R" => Token::R,
            _ => Token::Keyword(String::from_utf8_lossy(raw).into_owned()),
        }
    }

    /// Consume the next token, failing unless it is the given keyword.
    pub fn expect_keyword(&mut self, keyword: &str) -> ParseResult<()> {
        let position = self.position;
        match self.next_token()? {
            Token::Keyword(ref k) if k == keyword => Ok(()),
            other => Err(ParseError::UnexpectedToken {
                expected: format!("keyword '{keyword}' at offset {position}"),
                found: other.describe(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &[u8]) -> Vec<Token> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            match lexer.next_token().unwrap() {
                Token::Eof => break,
                token => out.push(token),
            }
        }
        out
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            tokens(b"<< /Type /Catalog /Pages 2 0 R >>"),
            vec![
                Token::DictStart,
                Token::Name("Type".to_string()),
                Token::Name("Catalog".to_string()),
                Token::Name("Pages".to_string()),
                Token::Integer(2),
                Token::Integer(0),
                Token::R,
                Token::DictEnd,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens(b"42 -17 +3 2.5 -.5 4."),
            vec![
                Token::Integer(42),
                Token::Integer(-17),
                Token::Integer(3),
                Token::Real(2.5),
                Token::Real(-0.5),
                Token::Real(4.0),
            ]
        );
    }

    #[test]
    fn test_malformed_number_keeps_prefix() {
        assert_eq!(tokens(b"1.2.3"), vec![Token::Real(1.2)]);
        assert_eq!(tokens(b"--"), vec![Token::Integer(0)]);
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            tokens(b"true false null obj endobj stream endstream startxref xref trailer"),
            vec![
                Token::Boolean(true),
                Token::Boolean(false),
                Token::Null,
                Token::Obj,
                Token::EndObj,
                Token::Stream,
                Token::EndStream,
                Token::StartXRef,
                Token::Keyword("xref".to_string()),
                Token::Keyword("trailer".to_string()),
            ]
        );
    }

    #[test]
    fn test_literal_string_escapes() {
        assert_eq!(
            tokens(br"(a\(b\)c\\ \n\101\0537 (nested))"),
            vec![Token::String(b"a(b)c\\ \nA+7 (nested)".to_vec())]
        );
        assert_eq!(
            tokens(b"(line\\\r\ncontinued\r\nnext)"),
            vec![Token::String(b"linecontinued\nnext".to_vec())]
        );
    }

    #[test]
    fn test_hex_string() {
        assert_eq!(
            tokens(b"<48 65 6C6C6F> <7>"),
            vec![Token::String(b"Hello".to_vec()), Token::String(vec![0x70])]
        );
        assert!(Lexer::new(b"<4G>").next_token().is_err());
    }

    #[test]
    fn test_name_escapes() {
        assert_eq!(
            tokens(b"/A#20B /notes.txt /#"),
            vec![
                Token::Name("A B".to_string()),
                Token::Name("notes.txt".to_string()),
                Token::Name("#".to_string()),
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            tokens(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n1 % trailing\n2"),
            vec![Token::Integer(1), Token::Integer(2)]
        );
    }

    #[test]
    fn test_peek_and_seek() {
        let mut lexer = Lexer::new(b"1 0 obj");
        assert_eq!(lexer.peek_token().unwrap(), Token::Integer(1));
        assert_eq!(lexer.next_token().unwrap(), Token::Integer(1));
        let saved = lexer.position();
        assert_eq!(lexer.next_token().unwrap(), Token::Integer(0));
        lexer.seek(saved);
        assert_eq!(lexer.next_token().unwrap(), Token::Integer(0));
        assert_eq!(lexer.next_token().unwrap(), Token::Obj);
        assert!(lexer.is_eof());
    }

    #[test]
    fn test_unterminated_string_is_error() {
        assert!(Lexer::new(b"(never closed").next_token().is_err());
        assert!(Lexer::new(b">").next_token().is_err());
    }
}
