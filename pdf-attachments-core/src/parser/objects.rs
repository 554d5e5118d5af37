//! PDF object syntax
//!
//! Builds [`PdfObject`] values from lexer tokens: direct objects, indirect
//! object definitions (`N G obj ... endobj`) and stream bodies.

use super::lexer::{Lexer, Token};
use super::{ParseError, ParseOptions, ParseResult};
use crate::objects::{ObjectId, PdfArray, PdfDictionary, PdfName, PdfObject, PdfStream, PdfString};
use std::ops::Range;

/// Looks up the value of an indirect `/Length`. `Ok(None)` means the
/// referenced object does not exist or is not an integer.
pub type LengthResolver<'r> = &'r dyn Fn(ObjectId) -> ParseResult<Option<i64>>;

/// An indirect object definition together with its location in the file.
#[derive(Debug, Clone)]
pub struct IndirectObject {
    pub id: ObjectId,
    pub object: PdfObject,
    /// Bytes from the object number through `endobj`.
    pub span: Range<usize>,
}

pub struct ObjectParser<'a, 'r> {
    lexer: Lexer<'a>,
    options: &'r ParseOptions,
    resolve_length: Option<LengthResolver<'r>>,
}

impl<'a, 'r> ObjectParser<'a, 'r> {
    pub fn new(data: &'a [u8], offset: usize, options: &'r ParseOptions) -> Self {
        Self {
            lexer: Lexer::at(data, offset),
            options,
            resolve_length: None,
        }
    }

    pub fn with_length_resolver(mut self, resolver: LengthResolver<'r>) -> Self {
        self.resolve_length = Some(resolver);
        self
    }

    pub fn position(&self) -> usize {
        self.lexer.position()
    }

    pub fn lexer(&mut self) -> &mut Lexer<'a> {
        &mut self.lexer
    }

    /// Parse one direct object. Streams are only valid inside an indirect
    /// object definition and are not recognised here.
    pub fn parse_object(&mut self) -> ParseResult<PdfObject> {
        let token = self.lexer.next_token()?;
        self.parse_value(token, 0)
    }

    /// Parse `N G obj <value> endobj` starting at the current position.
    pub fn parse_indirect_object(&mut self) -> ParseResult<IndirectObject> {
        self.lexer.skip_whitespace();
        let start = self.lexer.position();

        let number = self.expect_integer("object number")?;
        let generation = self.expect_integer("generation number")?;
        let id = match (u32::try_from(number), u16::try_from(generation)) {
            (Ok(n), Ok(g)) => ObjectId::new(n, g),
            _ => {
                return Err(ParseError::syntax(
                    start,
                    format!("object header {number} {generation} out of range"),
                ))
            }
        };
        match self.lexer.next_token()? {
            Token::Obj => {}
            other => {
                return Err(ParseError::UnexpectedToken {
                    expected: format!("'obj' after {id}"),
                    found: other.describe(),
                })
            }
        }

        let object = match self.lexer.next_token()? {
            // `N G obj endobj` defines the null object.
            Token::EndObj => {
                return Ok(IndirectObject {
                    id,
                    object: PdfObject::Null,
                    span: start..self.lexer.position(),
                })
            }
            Token::DictStart => {
                let dict = self.parse_dictionary(1)?;
                if self.lexer.peek_token()? == Token::Stream {
                    self.lexer.next_token()?;
                    let data = self.parse_stream_data(&dict, id)?;
                    PdfObject::Stream(PdfStream::from_parts(dict, data))
                } else {
                    PdfObject::Dictionary(dict)
                }
            }
            token => self.parse_value(token, 0)?,
        };

        let before_end = self.lexer.position();
        match self.lexer.next_token()? {
            Token::EndObj => {}
            other if self.options.lenient => {
                tracing::warn!("object {} is missing 'endobj' (found {})", id, other.describe());
                self.lexer.seek(before_end);
            }
            other => {
                return Err(ParseError::UnexpectedToken {
                    expected: format!("'endobj' for {id}"),
                    found: other.describe(),
                })
            }
        }

        Ok(IndirectObject {
            id,
            object,
            span: start..self.lexer.position(),
        })
    }

    fn expect_integer(&mut self, what: &str) -> ParseResult<i64> {
        match self.lexer.next_token()? {
            Token::Integer(value) => Ok(value),
            other => Err(ParseError::UnexpectedToken {
                expected: what.to_string(),
                found: other.describe(),
            }),
        }
    }

    fn parse_value(&mut self, token: Token, depth: usize) -> ParseResult<PdfObject> {
        match token {
            Token::Null => Ok(PdfObject::Null),
            Token::Boolean(b) => Ok(PdfObject::Boolean(b)),
            Token::Integer(number) => Ok(self.parse_integer_or_reference(number)),
            Token::Real(r) => Ok(PdfObject::Real(r)),
            Token::String(bytes) => Ok(PdfObject::String(PdfString::new(bytes))),
            Token::Name(name) => Ok(PdfObject::Name(PdfName::new(name))),
            Token::ArrayStart => self.parse_array(depth + 1),
            Token::DictStart => self.parse_dictionary(depth + 1).map(PdfObject::Dictionary),
            Token::Eof => Err(ParseError::syntax(
                self.lexer.position(),
                "unexpected end of file",
            )),
            other => Err(ParseError::UnexpectedToken {
                expected: "object".to_string(),
                found: other.describe(),
            }),
        }
    }

    /// `N G R` is a reference; anything else leaves the integer alone.
    fn parse_integer_or_reference(&mut self, number: i64) -> PdfObject {
        let saved = self.lexer.position();
        if let (Ok(Token::Integer(generation)), Ok(Token::R)) =
            (self.lexer.next_token(), self.lexer.next_token())
        {
            if let (Ok(n), Ok(g)) = (u32::try_from(number), u16::try_from(generation)) {
                return PdfObject::Reference(ObjectId::new(n, g));
            }
        }
        self.lexer.seek(saved);
        PdfObject::Integer(number)
    }

    fn check_depth(&self, depth: usize) -> ParseResult<()> {
        if depth > self.options.max_depth {
            Err(ParseError::MaxDepthExceeded(self.options.max_depth))
        } else {
            Ok(())
        }
    }

    fn parse_array(&mut self, depth: usize) -> ParseResult<PdfObject> {
        self.check_depth(depth)?;
        let mut array = PdfArray::new();
        loop {
            match self.lexer.next_token()? {
                Token::ArrayEnd => break,
                token => array.push(self.parse_value(token, depth)?),
            }
        }
        Ok(PdfObject::Array(array))
    }

    fn parse_dictionary(&mut self, depth: usize) -> ParseResult<PdfDictionary> {
        self.check_depth(depth)?;
        let mut dict = PdfDictionary::new();
        loop {
            let position = self.lexer.position();
            match self.lexer.next_token()? {
                Token::DictEnd => break,
                Token::Name(key) => {
                    let token = self.lexer.next_token()?;
                    if token == Token::DictEnd && self.options.lenient {
                        // `<< /Key >>`: the value is missing.
                        dict.set(key, PdfObject::Null);
                        break;
                    }
                    let value = self.parse_value(token, depth)?;
                    dict.set(key, value);
                }
                Token::Eof => {
                    return Err(ParseError::syntax(position, "unterminated dictionary"));
                }
                other if self.options.lenient => {
                    tracing::warn!(
                        "skipping {} where a dictionary key was expected at offset {}",
                        other.describe(),
                        position
                    );
                }
                other => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "dictionary key".to_string(),
                        found: other.describe(),
                    })
                }
            }
        }
        Ok(dict)
    }

    fn declared_length(&self, dict: &PdfDictionary) -> ParseResult<Option<usize>> {
        let length = match dict.get("Length") {
            Some(PdfObject::Integer(length)) => Some(*length),
            Some(PdfObject::Reference(id)) => match self.resolve_length {
                Some(resolve) => resolve(*id)?,
                None => None,
            },
            _ => None,
        };
        Ok(length.and_then(|l| usize::try_from(l).ok()))
    }

    /// Read the bytes between `stream` and `endstream`.
    fn parse_stream_data(&mut self, dict: &PdfDictionary, id: ObjectId) -> ParseResult<Vec<u8>> {
        self.lexer.skip_stream_eol();
        let data = self.lexer.data();
        let start = self.lexer.position();

        if let Some(length) = self.declared_length(dict)? {
            if let Some(end) = start.checked_add(length).filter(|end| *end <= data.len()) {
                let mut after = Lexer::at(data, end);
                if matches!(after.next_token(), Ok(Token::EndStream)) {
                    self.lexer.seek(after.position());
                    return Ok(data[start..end].to_vec());
                }
            }
        }

        if !self.options.lenient {
            return Err(ParseError::syntax(
                start,
                format!("stream {id}: /Length does not end at 'endstream'"),
            ));
        }

        let keyword = find(&data[start..], b"endstream").ok_or_else(|| {
            ParseError::syntax(start, format!("stream {id} has no 'endstream'"))
        })?;
        let mut end = start + keyword;
        if data[..end].ends_with(b"\r\n") {
            end -= 2;
        } else if data[..end].ends_with(b"\n") || data[..end].ends_with(b"\r") {
            end -= 1;
        }
        let end = end.max(start);
        tracing::warn!(
            "stream {} has a wrong /Length; using {} bytes up to 'endstream'",
            id,
            end - start
        );
        self.lexer.seek(start + keyword + b"endstream".len());
        Ok(data[start..end].to_vec())
    }
}

/// Position of the first occurrence of `needle` in `haystack`.
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Position of the last occurrence of `needle` in `haystack`.
pub(crate) fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}
