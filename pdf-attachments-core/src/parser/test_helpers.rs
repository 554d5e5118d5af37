//! Helper functions for creating valid test PDFs with correct offsets

/// Assembles a PDF from object bodies, computing every offset.
#[derive(Debug, Clone)]
pub(crate) struct PdfBuilder {
    version: &'static str,
    objects: Vec<(u32, Vec<u8>)>,
    /// (object number, object stream number, index in stream)
    compressed: Vec<(u32, u32, usize)>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self {
            version: "1.7",
            objects: Vec::new(),
            compressed: Vec::new(),
        }
    }

    pub fn version(mut self, version: &'static str) -> Self {
        self.version = version;
        self
    }

    /// Plain object; `body` is the object's value.
    pub fn object(mut self, number: u32, body: &str) -> Self {
        self.replace(number, body.as_bytes().to_vec());
        self
    }

    /// Stream object; `dict` holds the dictionary entries except `/Length`.
    pub fn stream(mut self, number: u32, dict: &str, data: &[u8]) -> Self {
        let mut body = format!("<< {dict} /Length {} >>\nstream\n", data.len()).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.replace(number, body);
        self
    }

    /// A later definition of a number replaces the earlier one in place.
    fn replace(&mut self, number: u32, body: Vec<u8>) {
        match self.objects.iter_mut().find(|(n, _)| *n == number) {
            Some(slot) => slot.1 = body,
            None => self.objects.push((number, body)),
        }
    }

    /// Uncompressed object stream holding `members`.
    pub fn object_stream(mut self, number: u32, members: &[(u32, &str)]) -> Self {
        let mut header = String::new();
        let mut bodies = String::new();
        for (index, (member, body)) in members.iter().enumerate() {
            header.push_str(&format!("{member} {} ", bodies.len()));
            bodies.push_str(body);
            bodies.push('\n');
            self.compressed.push((*member, number, index));
        }
        let dict = format!(
            "/Type /ObjStm /N {} /First {}",
            members.len(),
            header.len()
        );
        let data = format!("{header}{bodies}");
        self.stream(number, &dict, data.as_bytes())
    }

    fn max_number(&self) -> u32 {
        self.objects
            .iter()
            .map(|(n, _)| *n)
            .chain(self.compressed.iter().map(|(n, _, _)| *n))
            .max()
            .unwrap_or(0)
    }

    fn write_objects(&self) -> (Vec<u8>, Vec<(u32, usize)>) {
        let mut out = format!("%PDF-{}\n%\u{e2}\u{e3}\n", self.version).into_bytes();
        let mut offsets = Vec::new();
        for (number, body) in &self.objects {
            offsets.push((*number, out.len()));
            out.extend_from_slice(format!("{number} 0 obj\n").as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }
        (out, offsets)
    }

    /// Classic xref table; `trailer_extra` is appended to the trailer
    /// dictionary after `/Size` and `/Root 1 0 R`.
    pub fn build(&self, trailer_extra: &str) -> Vec<u8> {
        let (mut out, offsets) = self.write_objects();
        let size = self.max_number() + 1;
        let xref_offset = out.len();

        out.extend_from_slice(format!("xref\n0 {size}\n0000000000 65535 f \n").as_bytes());
        for number in 1..size {
            match offsets.iter().find(|(n, _)| *n == number) {
                Some((_, offset)) => {
                    out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes())
                }
                None => out.extend_from_slice(b"0000000000 00000 f \n"),
            }
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {size} /Root 1 0 R {trailer_extra} >>\nstartxref\n{xref_offset}\n%%EOF\n"
            )
            .as_bytes(),
        );
        out
    }

    /// Cross-reference stream with `/W [1 4 2]`, stored uncompressed.
    pub fn build_with_xref_stream(&self) -> Vec<u8> {
        let (mut out, offsets) = self.write_objects();
        let xref_number = self.max_number() + 1;
        let xref_offset = out.len();

        let mut rows = Vec::new();
        for number in 0..=xref_number {
            let (kind, field2, field3): (u8, u32, u16) = if number == xref_number {
                (1, xref_offset as u32, 0)
            } else if let Some((_, offset)) = offsets.iter().find(|(n, _)| *n == number) {
                (1, *offset as u32, 0)
            } else if let Some((_, stream, index)) =
                self.compressed.iter().find(|(n, _, _)| *n == number)
            {
                (2, *stream, *index as u16)
            } else {
                (0, 0, if number == 0 { 65535 } else { 0 })
            };
            rows.push(kind);
            rows.extend_from_slice(&field2.to_be_bytes());
            rows.extend_from_slice(&field3.to_be_bytes());
        }

        out.extend_from_slice(
            format!(
                "{xref_number} 0 obj\n<< /Type /XRef /Size {} /W [1 4 2] /Root 1 0 R /Length {} >>\nstream\n",
                xref_number + 1,
                rows.len()
            )
            .as_bytes(),
        );
        out.extend_from_slice(&rows);
        out.extend_from_slice(
            format!("\nendstream\nendobj\nstartxref\n{xref_offset}\n%%EOF\n").as_bytes(),
        );
        out
    }
}

/// Catalog, page tree and one empty page.
pub(crate) fn minimal_pdf() -> Vec<u8> {
    one_page().build("")
}

pub(crate) fn one_page() -> PdfBuilder {
    PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(
            3,
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>",
        )
}

/// Same document with the page packed in an object stream and an xref
/// stream instead of a table.
pub(crate) fn xref_stream_pdf() -> Vec<u8> {
    PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object_stream(
            4,
            &[(3, "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>")],
        )
        .build_with_xref_stream()
}
