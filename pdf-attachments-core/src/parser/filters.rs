//! PDF Stream Filters
//!
//! Decodes stream data according to the `/Filter` chain of its dictionary
//! (ISO 32000-1 Section 7.4). Only the lossless general-purpose filters are
//! implemented; image codecs are reported as unsupported.

use crate::objects::{PdfDictionary, PdfObject};
use weezl::{decode::Decoder as LzwDecoder, BitOrder, LzwStatus};

/// A stream whose bytes could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{filter}: {message}")]
pub struct CorruptStreamError {
    /// Filter that failed, as named in the stream dictionary.
    pub filter: String,
    pub message: String,
}

impl CorruptStreamError {
    pub fn new(filter: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            message: message.into(),
        }
    }
}

type FilterResult<T> = Result<T, CorruptStreamError>;

/// Supported PDF filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    ASCIIHexDecode,
    ASCII85Decode,
    LZWDecode,
    FlateDecode,
    RunLengthDecode,
    Crypt,
}

impl Filter {
    /// Parse a filter name, including the inline-image abbreviations.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ASCIIHexDecode" | "AHx" => Some(Filter::ASCIIHexDecode),
            "ASCII85Decode" | "A85" => Some(Filter::ASCII85Decode),
            "LZWDecode" | "LZW" => Some(Filter::LZWDecode),
            "FlateDecode" | "Fl" => Some(Filter::FlateDecode),
            "RunLengthDecode" | "RL" => Some(Filter::RunLengthDecode),
            "Crypt" => Some(Filter::Crypt),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Filter::ASCIIHexDecode => "ASCIIHexDecode",
            Filter::ASCII85Decode => "ASCII85Decode",
            Filter::LZWDecode => "LZWDecode",
            Filter::FlateDecode => "FlateDecode",
            Filter::RunLengthDecode => "RunLengthDecode",
            Filter::Crypt => "Crypt",
        }
    }
}

/// Decode stream data according to the filters named in `dict`.
///
/// `/Filter` and `/DecodeParms` (or `/DP`) may each be a single value or an
/// array; parameters are matched to filters by position.
pub fn decode_stream(data: &[u8], dict: &PdfDictionary) -> FilterResult<Vec<u8>> {
    let filters: Vec<&str> = match dict.get("Filter") {
        None | Some(PdfObject::Null) => return Ok(data.to_vec()),
        Some(PdfObject::Name(name)) => vec![name.as_str()],
        Some(PdfObject::Array(array)) => array
            .iter()
            .map(|obj| {
                obj.as_name().ok_or_else(|| {
                    CorruptStreamError::new(
                        "Filter",
                        format!("invalid entry of type {}", obj.type_name()),
                    )
                })
            })
            .collect::<FilterResult<_>>()?,
        Some(other) => {
            return Err(CorruptStreamError::new(
                "Filter",
                format!("invalid /Filter of type {}", other.type_name()),
            ))
        }
    };

    let params = dict.get("DecodeParms").or_else(|| dict.get("DP"));

    let mut result = data.to_vec();
    for (index, name) in filters.into_iter().enumerate() {
        let filter = Filter::from_name(name)
            .ok_or_else(|| CorruptStreamError::new(name, "unsupported filter"))?;
        result = apply_filter(&result, filter, param_at(params, index))?;
    }
    Ok(result)
}

fn param_at(params: Option<&PdfObject>, index: usize) -> Option<&PdfDictionary> {
    match params {
        Some(PdfObject::Dictionary(d)) if index == 0 => Some(d),
        Some(PdfObject::Array(array)) => array.get(index).and_then(|p| p.as_dict()),
        _ => None,
    }
}

/// Apply a single filter to data
pub fn apply_filter(
    data: &[u8],
    filter: Filter,
    params: Option<&PdfDictionary>,
) -> FilterResult<Vec<u8>> {
    let decoded = match filter {
        Filter::FlateDecode => decode_flate(data)?,
        Filter::LZWDecode => decode_lzw(data, params)?,
        Filter::ASCIIHexDecode => return decode_ascii_hex(data),
        Filter::ASCII85Decode => return decode_ascii85(data),
        Filter::RunLengthDecode => return decode_run_length(data),
        Filter::Crypt => return decode_crypt(data, params),
    };

    match params {
        Some(params) => apply_predictor(decoded, params, filter.name()),
        None => Ok(decoded),
    }
}

#[cfg(feature = "compression")]
fn decode_flate(data: &[u8]) -> FilterResult<Vec<u8>> {
    crate::compression::decompress(data)
        .map_err(|e| CorruptStreamError::new("FlateDecode", e.to_string()))
}

#[cfg(not(feature = "compression"))]
fn decode_flate(_data: &[u8]) -> FilterResult<Vec<u8>> {
    Err(CorruptStreamError::new(
        "FlateDecode",
        "requires the 'compression' feature",
    ))
}

fn decode_lzw(data: &[u8], params: Option<&PdfDictionary>) -> FilterResult<Vec<u8>> {
    let early_change = params
        .and_then(|p| p.get_integer("EarlyChange"))
        .unwrap_or(1);
    // PDF's default EarlyChange=1 is the TIFF flavour of code size switching.
    let mut decoder = if early_change == 0 {
        LzwDecoder::new(BitOrder::Msb, 8)
    } else {
        LzwDecoder::with_tiff_size_switch(BitOrder::Msb, 8)
    };

    let mut output = Vec::new();
    let result = decoder.into_vec(&mut output).decode(data);
    match result.status {
        Ok(LzwStatus::Ok | LzwStatus::Done | LzwStatus::NoProgress) => Ok(output),
        Err(e) => Err(CorruptStreamError::new("LZWDecode", e.to_string())),
    }
}

/// Decode ASCIIHexDecode data
fn decode_ascii_hex(data: &[u8]) -> FilterResult<Vec<u8>> {
    let mut result = Vec::with_capacity(data.len() / 2);
    let mut chars = data.iter().copied().filter(|b| !is_pdf_whitespace(*b));

    loop {
        let high = match chars.next() {
            Some(b'>') | None => break,
            Some(ch) => ch,
        };
        // An odd final digit is padded with 0.
        let low = match chars.next() {
            Some(b'>') | None => {
                result.push(hex_value(high)? << 4);
                break;
            }
            Some(ch) => ch,
        };
        result.push((hex_value(high)? << 4) | hex_value(low)?);
    }

    Ok(result)
}

fn hex_value(ch: u8) -> FilterResult<u8> {
    match ch {
        b'0'..=b'9' => Ok(ch - b'0'),
        b'A'..=b'F' => Ok(ch - b'A' + 10),
        b'a'..=b'f' => Ok(ch - b'a' + 10),
        _ => Err(CorruptStreamError::new(
            "ASCIIHexDecode",
            format!("invalid hex digit {:?}", ch as char),
        )),
    }
}

/// Decode ASCII85Decode data
fn decode_ascii85(data: &[u8]) -> FilterResult<Vec<u8>> {
    let mut body = data;
    if let Some(rest) = body.strip_prefix(b"<~") {
        body = rest;
    }

    let mut result = Vec::with_capacity(data.len() * 4 / 5);
    let mut group = [0u8; 5];
    let mut filled = 0;
    let mut chars = body.iter().copied().filter(|b| !is_pdf_whitespace(*b));

    while let Some(c) = chars.next() {
        match c {
            b'~' => {
                if chars.next() != Some(b'>') {
                    return Err(CorruptStreamError::new(
                        "ASCII85Decode",
                        "invalid end marker",
                    ));
                }
                break;
            }
            b'z' if filled == 0 => result.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group[filled] = c;
                filled += 1;
                if filled == 5 {
                    result.extend_from_slice(&ascii85_group(&group)?);
                    filled = 0;
                }
            }
            _ => {
                return Err(CorruptStreamError::new(
                    "ASCII85Decode",
                    format!("invalid character {:?}", c as char),
                ))
            }
        }
    }

    match filled {
        0 => {}
        1 => {
            return Err(CorruptStreamError::new(
                "ASCII85Decode",
                "final group has a single character",
            ))
        }
        n => {
            for slot in group.iter_mut().skip(n) {
                *slot = b'u';
            }
            let bytes = ascii85_group(&group)?;
            result.extend_from_slice(&bytes[..n - 1]);
        }
    }

    Ok(result)
}

fn ascii85_group(group: &[u8; 5]) -> FilterResult<[u8; 4]> {
    let value = group
        .iter()
        .fold(0u64, |acc, &ch| acc * 85 + u64::from(ch - b'!'));
    u32::try_from(value)
        .map(u32::to_be_bytes)
        .map_err(|_| CorruptStreamError::new("ASCII85Decode", "group value out of range"))
}

/// Decode RunLengthDecode data
fn decode_run_length(data: &[u8]) -> FilterResult<Vec<u8>> {
    let mut result = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let length = data[i] as usize;
        i += 1;
        match length {
            128 => break,
            0..=127 => {
                let end = i + length + 1;
                let literal = data.get(i..end).ok_or_else(|| {
                    CorruptStreamError::new("RunLengthDecode", "truncated literal run")
                })?;
                result.extend_from_slice(literal);
                i = end;
            }
            _ => {
                let byte = *data.get(i).ok_or_else(|| {
                    CorruptStreamError::new("RunLengthDecode", "truncated repeat run")
                })?;
                result.extend(std::iter::repeat(byte).take(257 - length));
                i += 1;
            }
        }
    }

    Ok(result)
}

fn decode_crypt(data: &[u8], params: Option<&PdfDictionary>) -> FilterResult<Vec<u8>> {
    match params.and_then(|p| p.get_name("Name")).unwrap_or("Identity") {
        "Identity" => Ok(data.to_vec()),
        other => Err(CorruptStreamError::new(
            "Crypt",
            format!("crypt filter /{other} is not supported"),
        )),
    }
}

/// Undo a PNG or TIFF predictor described by `/DecodeParms`.
fn apply_predictor(
    data: Vec<u8>,
    params: &PdfDictionary,
    filter: &str,
) -> FilterResult<Vec<u8>> {
    let predictor = params.get_integer("Predictor").unwrap_or(1);
    if predictor <= 1 || data.is_empty() {
        return Ok(data);
    }

    let param = |key: &str, default: i64| {
        usize::try_from(params.get_integer(key).unwrap_or(default).max(1)).map_err(|_| {
            CorruptStreamError::new(filter, format!("predictor /{key} is out of range"))
        })
    };
    let colors = param("Colors", 1)?;
    let bits = param("BitsPerComponent", 8)?;
    let columns = param("Columns", 1)?;

    let pixel_bits = colors
        .checked_mul(bits)
        .ok_or_else(|| CorruptStreamError::new(filter, "predictor pixel width overflows"))?;
    let row_bits = pixel_bits
        .checked_mul(columns)
        .ok_or_else(|| CorruptStreamError::new(filter, "predictor row width overflows"))?;
    let bytes_per_pixel = pixel_bits.div_ceil(8).max(1);
    let row_len = row_bits.div_ceil(8);
    // A row can never be longer than the data it is decoded from.
    if row_len > data.len() {
        return Err(CorruptStreamError::new(
            filter,
            format!(
                "predictor row of {row_len} bytes exceeds the {} bytes of data",
                data.len()
            ),
        ));
    }

    match predictor {
        2 => tiff_predictor(data, bits, colors, row_len, filter),
        10..=15 => png_predictor(&data, bytes_per_pixel, row_len, filter),
        other => Err(CorruptStreamError::new(
            filter,
            format!("unsupported predictor {other}"),
        )),
    }
}

fn tiff_predictor(
    mut data: Vec<u8>,
    bits: usize,
    colors: usize,
    row_len: usize,
    filter: &str,
) -> FilterResult<Vec<u8>> {
    if bits != 8 {
        return Err(CorruptStreamError::new(
            filter,
            format!("TIFF predictor with {bits} bits per component is not supported"),
        ));
    }
    for row in data.chunks_mut(row_len) {
        for i in colors..row.len() {
            row[i] = row[i].wrapping_add(row[i - colors]);
        }
    }
    Ok(data)
}

fn png_predictor(
    data: &[u8],
    bytes_per_pixel: usize,
    row_len: usize,
    filter: &str,
) -> FilterResult<Vec<u8>> {
    let mut result = Vec::with_capacity(data.len());
    let mut previous = vec![0u8; row_len];

    for chunk in data.chunks(row_len + 1) {
        let (&tag, encoded) = match chunk.split_first() {
            Some(split) => split,
            None => break,
        };
        let mut row = encoded.to_vec();
        // A short final row is decoded as far as it goes.
        row.resize(row_len, 0);

        for i in 0..row_len {
            let left = if i >= bytes_per_pixel {
                row[i - bytes_per_pixel]
            } else {
                0
            };
            let up = previous[i];
            let upper_left = if i >= bytes_per_pixel {
                previous[i - bytes_per_pixel]
            } else {
                0
            };
            row[i] = match tag {
                0 => row[i],
                1 => row[i].wrapping_add(left),
                2 => row[i].wrapping_add(up),
                3 => row[i].wrapping_add(((left as u16 + up as u16) / 2) as u8),
                4 => row[i].wrapping_add(paeth(left, up, upper_left)),
                other => {
                    return Err(CorruptStreamError::new(
                        filter,
                        format!("invalid PNG row filter {other}"),
                    ))
                }
            };
        }

        result.extend_from_slice(&row[..encoded.len().min(row_len)]);
        previous = row;
    }

    Ok(result)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

fn is_pdf_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0C' | b'\0')
}
