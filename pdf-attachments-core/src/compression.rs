//! Flate helpers for embedded-file streams

#![cfg(feature = "compression")]

use flate2::read::{DeflateDecoder, ZlibDecoder};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{self, Read, Write};

/// Compress data using Flate/Zlib compression
pub fn compress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Decompress zlib data. Some producers omit the zlib header and write a
/// bare deflate stream, so that is tried when the zlib header is rejected.
pub fn decompress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut decompressed = Vec::new();
    match ZlibDecoder::new(data).read_to_end(&mut decompressed) {
        Ok(_) => Ok(decompressed),
        Err(zlib_err) => {
            let mut raw = Vec::new();
            DeflateDecoder::new(data)
                .read_to_end(&mut raw)
                .map(|_| raw)
                .map_err(|_| zlib_err)
        }
    }
}
