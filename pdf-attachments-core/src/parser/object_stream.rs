//! PDF Object Stream Parser
//!
//! Handles compressed objects stored in object streams (PDF 1.5+)

use super::lexer::{Lexer, Token};
use super::objects::ObjectParser;
use super::{ParseError, ParseOptions, ParseResult};
use crate::objects::{PdfObject, PdfStream};
use std::collections::HashMap;

/// Decoded `/Type /ObjStm` stream with all of its objects parsed.
#[derive(Debug)]
pub struct ObjectStream {
    /// Objects in stream order.
    objects: Vec<(u32, PdfObject)>,
    by_number: HashMap<u32, usize>,
}

impl ObjectStream {
    /// Parse an object stream from its stream object and decoded contents.
    pub fn parse(stream: &PdfStream, decoded: &[u8], options: &ParseOptions) -> ParseResult<Self> {
        let dict = &stream.dict;
        if dict.get_type().is_some_and(|t| t != "ObjStm") {
            return Err(ParseError::syntax(0, "object stream is not /Type /ObjStm"));
        }
        let n = dict
            .get("N")
            .ok_or_else(|| ParseError::MissingKey("N".to_string()))?
            .expect_integer("object stream /N")?;
        let first = dict
            .get("First")
            .ok_or_else(|| ParseError::MissingKey("First".to_string()))?
            .expect_integer("object stream /First")?;
        let first = usize::try_from(first)
            .map_err(|_| ParseError::syntax(0, format!("invalid object stream /First {first}")))?;

        // Header: N pairs of "object-number offset".
        let mut lexer = Lexer::new(decoded);
        let mut offsets = Vec::new();
        for _ in 0..n.max(0) {
            let number = match lexer.next_token()? {
                Token::Integer(v) => u32::try_from(v).ok(),
                _ => None,
            };
            let offset = match lexer.next_token()? {
                Token::Integer(v) => usize::try_from(v).ok(),
                _ => None,
            };
            match (number, offset) {
                (Some(number), Some(offset)) => offsets.push((number, offset)),
                _ => {
                    return Err(ParseError::syntax(
                        lexer.position(),
                        "malformed object stream header",
                    ))
                }
            }
        }

        let mut objects = Vec::with_capacity(offsets.len());
        let mut by_number = HashMap::with_capacity(offsets.len());
        for (number, offset) in offsets {
            let position = first.saturating_add(offset);
            let object = match ObjectParser::new(decoded, position, options).parse_object() {
                Ok(object) => object,
                Err(e) if options.lenient => {
                    tracing::warn!("skipping object {} in object stream: {}", number, e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            by_number.entry(number).or_insert(objects.len());
            objects.push((number, object));
        }

        Ok(Self { objects, by_number })
    }

    /// Object stored at `index`, if it is object `number`.
    ///
    /// The cross-reference index is trusted first; when it disagrees the
    /// object is looked up by number.
    pub fn get(&self, number: u32, index: usize) -> Option<&PdfObject> {
        match self.objects.get(index) {
            Some((n, object)) if *n == number => Some(object),
            _ => self
                .by_number
                .get(&number)
                .map(|&i| &self.objects[i].1),
        }
    }

    pub fn object_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.objects.iter().map(|(n, _)| *n)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
