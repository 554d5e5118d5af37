use crate::objects::PdfObject;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PdfArray(pub Vec<PdfObject>);

impl PdfArray {
    pub fn new() -> Self {
        PdfArray(Vec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        PdfArray(Vec::with_capacity(capacity))
    }

    pub fn push(&mut self, object: impl Into<PdfObject>) {
        self.0.push(object.into());
    }

    pub fn get(&self, index: usize) -> Option<&PdfObject> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PdfObject> {
        self.0.iter()
    }
}

impl From<Vec<PdfObject>> for PdfArray {
    fn from(elements: Vec<PdfObject>) -> Self {
        PdfArray(elements)
    }
}

impl FromIterator<PdfObject> for PdfArray {
    fn from_iter<T: IntoIterator<Item = PdfObject>>(iter: T) -> Self {
        PdfArray(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a PdfArray {
    type Item = &'a PdfObject;
    type IntoIter = std::slice::Iter<'a, PdfObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
