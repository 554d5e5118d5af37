//! PDF Trailer
//!
//! Typed view of the merged trailer dictionary (ISO 32000-1 Section 7.5.5)

use super::{ParseError, ParseResult};
use crate::objects::{ObjectId, PdfDictionary, PdfObject};

/// PDF Trailer information
#[derive(Debug, Clone)]
pub struct PdfTrailer {
    /// The trailer dictionary
    pub dict: PdfDictionary,
}

impl PdfTrailer {
    pub fn from_dict(dict: PdfDictionary) -> Self {
        Self { dict }
    }

    /// Get the size (number of entries in xref table)
    pub fn size(&self) -> Option<u32> {
        self.dict
            .get_integer("Size")
            .and_then(|size| u32::try_from(size).ok())
    }

    /// Get the root object reference (document catalog)
    pub fn root(&self) -> ParseResult<ObjectId> {
        match self.dict.get("Root") {
            Some(PdfObject::Reference(id)) => Ok(*id),
            Some(other) => Err(ParseError::TypeMismatch {
                context: "trailer /Root".to_string(),
                expected: "reference",
                found: other.type_name(),
            }),
            None => Err(ParseError::MissingKey("Root".to_string())),
        }
    }

    pub fn info(&self) -> Option<ObjectId> {
        self.dict.get_reference("Info")
    }

    /// File identifier array, carried over verbatim when writing.
    pub fn id(&self) -> Option<&PdfObject> {
        self.dict.get("ID")
    }

    pub fn is_encrypted(&self) -> bool {
        self.dict
            .get("Encrypt")
            .is_some_and(|encrypt| !encrypt.is_null())
    }

    /// Check the entries every readable document needs.
    pub fn validate(&self) -> ParseResult<()> {
        self.root()?;
        if self.is_encrypted() {
            return Err(ParseError::EncryptionNotSupported);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{PdfArray, PdfString};

    fn trailer(entries: Vec<(&str, PdfObject)>) -> PdfTrailer {
        let mut dict = PdfDictionary::new();
        for (key, value) in entries {
            dict.set(key, value);
        }
        PdfTrailer::from_dict(dict)
    }

    #[test]
    fn test_trailer_basic() {
        let t = trailer(vec![
            ("Size", PdfObject::Integer(12)),
            ("Root", PdfObject::Reference(ObjectId::new(1, 0))),
            ("Info", PdfObject::Reference(ObjectId::new(9, 0))),
        ]);
        assert_eq!(t.size(), Some(12));
        assert_eq!(t.root().unwrap(), ObjectId::new(1, 0));
        assert_eq!(t.info(), Some(ObjectId::new(9, 0)));
        assert!(t.id().is_none());
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_trailer_root_missing() {
        let t = trailer(vec![("Size", PdfObject::Integer(1))]);
        assert!(matches!(t.root(), Err(ParseError::MissingKey(ref k)) if k == "Root"));
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_trailer_invalid_root_type() {
        let t = trailer(vec![("Root", PdfObject::Integer(1))]);
        assert!(matches!(
            t.root(),
            Err(ParseError::TypeMismatch { found: "integer", .. })
        ));
    }

    #[test]
    fn test_encrypted_trailer_is_rejected() {
        let t = trailer(vec![
            ("Root", PdfObject::Reference(ObjectId::new(1, 0))),
            ("Encrypt", PdfObject::Reference(ObjectId::new(5, 0))),
        ]);
        assert!(t.is_encrypted());
        assert!(matches!(t.validate(), Err(ParseError::EncryptionNotSupported)));
    }

    #[test]
    fn test_trailer_with_id() {
        let id: PdfArray = vec![
            PdfObject::String(PdfString::new(vec![1, 2, 3])),
            PdfObject::String(PdfString::new(vec![4, 5, 6])),
        ]
        .into();
        let t = trailer(vec![
            ("Root", PdfObject::Reference(ObjectId::new(1, 0))),
            ("ID", PdfObject::Array(id.clone())),
        ]);
        assert_eq!(t.id(), Some(&PdfObject::Array(id)));
    }
}
