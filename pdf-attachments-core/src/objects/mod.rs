//! PDF object model shared by the parser and the writer.

mod array;
mod dictionary;
mod primitive;
mod stream;
mod string;

pub use array::PdfArray;
pub use dictionary::PdfDictionary;
pub use primitive::{ObjectId, PdfObject};
pub use stream::PdfStream;
pub use string::{PdfName, PdfString};
