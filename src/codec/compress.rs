//! Compression Codecs
//!
//! One-shot compression and decompression of whole byte values using flate2,
//! bzip2 and weezl.
//!
//! # Supported Formats
//!
//! - **flate** - raw deflate stream, no header
//! - **gzip** - RFC 1952 framing
//! - **zlib** - RFC 1950 framing
//! - **bzip2** - block-sorting streams; concatenated streams decode as one
//! - **lzw** - variable-width codes with clear and end codes, as used by GIF
//!   (LSB first) and PDF (MSB first)

use std::io::{Read, Write};

use bzip2::read::MultiBzDecoder;
use bzip2::write::BzEncoder;
use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
use flate2::Compression;
use weezl::BitOrder;

use crate::status::{codes, FatResult, Failure};

/// Framing used around the deflate stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Flate,
    Gzip,
    Zlib,
    Bzip2,
}

impl Format {
    /// Error code attached to failures of this format.
    pub fn error_code(self) -> i32 {
        match self {
            Format::Flate => codes::FLATE,
            Format::Gzip => codes::GZIP,
            Format::Zlib => codes::ZLIB,
            Format::Bzip2 => codes::BZIP2,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Format::Flate => "flate",
            Format::Gzip => "gzip",
            Format::Zlib => "zlib",
            Format::Bzip2 => "bzip2",
        }
    }
}

/// Compress with the default level. Failures are `Other`.
pub fn compress(format: Format, input: &[u8]) -> FatResult<Vec<u8>> {
    let level = Compression::default();
    let result = match format {
        Format::Flate => {
            let mut encoder = DeflateEncoder::new(Vec::new(), level);
            encoder.write_all(input).and_then(|_| encoder.finish())
        }
        Format::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), level);
            encoder.write_all(input).and_then(|_| encoder.finish())
        }
        Format::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), level);
            encoder.write_all(input).and_then(|_| encoder.finish())
        }
        Format::Bzip2 => {
            let mut encoder = BzEncoder::new(Vec::new(), bzip2::Compression::default());
            encoder.write_all(input).and_then(|_| encoder.finish())
        }
    };
    result.map_err(|e| {
        Failure::other(
            format.error_code(),
            format!("{} compress: {}", format.name(), e),
        )
    })
}

/// Decompress a complete stream. Corrupt or truncated input is `Syntax`.
pub fn decompress(format: Format, input: &[u8]) -> FatResult<Vec<u8>> {
    let mut output = Vec::new();
    let result = match format {
        Format::Flate => DeflateDecoder::new(input).read_to_end(&mut output),
        Format::Gzip => GzDecoder::new(input).read_to_end(&mut output),
        Format::Zlib => ZlibDecoder::new(input).read_to_end(&mut output),
        Format::Bzip2 => MultiBzDecoder::new(input).read_to_end(&mut output),
    };
    match result {
        Ok(_) => Ok(output),
        Err(e) => Err(Failure::syntax(
            format.error_code(),
            format!("{} decompress: {}", format.name(), e),
        )),
    }
}

// =============================================================================
// LZW
// =============================================================================

/// Bit packing order of LZW codes; wire values 0 and 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LzwOrder {
    Lsb,
    Msb,
}

impl LzwOrder {
    pub fn from_index(order: i32) -> Option<LzwOrder> {
        match order {
            0 => Some(LzwOrder::Lsb),
            1 => Some(LzwOrder::Msb),
            _ => None,
        }
    }

    fn bit_order(self) -> BitOrder {
        match self {
            LzwOrder::Lsb => BitOrder::Lsb,
            LzwOrder::Msb => BitOrder::Msb,
        }
    }
}

/// Check the order and literal width (2 to 8 bits). Bad values are `Range`.
fn lzw_params(order: i32, lit_width: u8) -> FatResult<(BitOrder, u8)> {
    let order = LzwOrder::from_index(order)
        .ok_or_else(|| Failure::range(codes::LZW, format!("lzw: unknown order {}", order)))?;
    if !(2..=8).contains(&lit_width) {
        return Err(Failure::range(
            codes::LZW,
            format!("lzw: litWidth {} out of range", lit_width),
        ));
    }
    Ok((order.bit_order(), lit_width))
}

/// Compress with LZW. Input bytes must fit in `lit_width` bits; other
/// failures are `Other`.
pub fn lzw_compress(input: &[u8], order: i32, lit_width: u8) -> FatResult<Vec<u8>> {
    let (order, width) = lzw_params(order, lit_width)?;
    if let Some(&b) = input.iter().find(|&&b| u32::from(b) >> width != 0) {
        return Err(Failure::other(
            codes::LZW,
            format!("lzw: input byte {:#04x} too large for the litWidth", b),
        ));
    }
    weezl::encode::Encoder::new(order, width)
        .encode(input)
        .map_err(|e| Failure::other(codes::LZW, format!("lzw compress: {}", e)))
}

/// Decompress an LZW stream. Invalid codes are `Syntax`.
pub fn lzw_decompress(input: &[u8], order: i32, lit_width: u8) -> FatResult<Vec<u8>> {
    let (order, width) = lzw_params(order, lit_width)?;
    weezl::decode::Decoder::new(order, width)
        .decode(input)
        .map_err(|e| Failure::syntax(codes::LZW, format!("lzw decompress: {}", e)))
}
