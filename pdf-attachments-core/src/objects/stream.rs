use crate::objects::{PdfDictionary, PdfObject};
use crate::parser::filters::{self, CorruptStreamError};

/// Stream object: dictionary plus the raw (still encoded) bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfStream {
    pub dict: PdfDictionary,
    pub data: Vec<u8>,
}

impl PdfStream {
    /// Build a stream; `/Length` is set from the data.
    pub fn new(dict: PdfDictionary, data: Vec<u8>) -> Self {
        let mut dict = dict;
        dict.set("Length", data.len());
        Self { dict, data }
    }

    /// Stream exactly as parsed, without touching `/Length`.
    pub fn from_parts(dict: PdfDictionary, data: Vec<u8>) -> Self {
        Self { dict, data }
    }

    pub fn raw_data(&self) -> &[u8] {
        &self.data
    }

    /// Decode with the filters named in the dictionary. Filter parameters
    /// must already be direct values; [`PdfDocument::decode_stream`]
    /// resolves indirect ones first.
    ///
    /// [`PdfDocument::decode_stream`]: crate::parser::PdfDocument::decode_stream
    pub fn decode(&self) -> Result<Vec<u8>, CorruptStreamError> {
        filters::decode_stream(&self.data, &self.dict)
    }

    /// Replace the data with its Flate encoding and record the filter.
    #[cfg(feature = "compression")]
    pub fn compress_flate(&mut self) -> std::io::Result<()> {
        self.data = crate::compression::compress(&self.data)?;
        self.dict.set("Length", self.data.len());
        self.dict
            .set("Filter", crate::objects::PdfName::new("FlateDecode"));
        Ok(())
    }

    pub fn filter_names(&self) -> Vec<&str> {
        match self.dict.get("Filter") {
            Some(PdfObject::Name(name)) => vec![name.as_str()],
            Some(PdfObject::Array(array)) => array.iter().filter_map(|o| o.as_name()).collect(),
            _ => Vec::new(),
        }
    }
}
