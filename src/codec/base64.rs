//! Base64
//!
//! Configurable encodings (alphabet, padding, strictness) built on the
//! `base64` crate's general purpose engine, plus a streaming encoder that
//! appends to a bytes buffer.

use base64::alphabet::{self, Alphabet};
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use parking_lot::Mutex;

use crate::bytes::BytesBuffer;
use crate::contract::{misuse, violate, ContractViolation};
use crate::handles::{Handle, HandleRegistry, Kind};
use crate::status::{codes, FatResult, Failure};

/// The standard padding character.
pub const STD_PADDING: u8 = b'=';

/// Padding rune value meaning "no padding".
pub const NO_PADDING: i32 = -1;

/// Built-in encodings selectable by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardVariant {
    Std = 0,
    Url = 1,
    RawStd = 2,
    RawUrl = 3,
}

impl StandardVariant {
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Self::Std),
            1 => Some(Self::Url),
            2 => Some(Self::RawStd),
            3 => Some(Self::RawUrl),
            _ => None,
        }
    }
}

/// An immutable base64 encoding.
///
/// The engine never pads; the padding byte, when there is one, is appended
/// on encode and checked and stripped on decode so any byte outside the
/// alphabet can serve as padding.
#[derive(Debug, Clone)]
pub struct Base64Encoding {
    alphabet: Alphabet,
    padding: Option<u8>,
    strict: bool,
    engine: GeneralPurpose,
}

fn config_failure(message: impl Into<String>) -> Failure {
    Failure::range(codes::BASE64_CONFIG, message)
}

fn corrupt(message: impl std::fmt::Display) -> Failure {
    Failure::syntax(codes::BASE64_CORRUPT, format!("illegal base64 data: {}", message))
}

impl Base64Encoding {
    /// Padded encoding over a custom 64-character alphabet.
    pub fn new(alphabet: &str) -> FatResult<Self> {
        let alphabet = Alphabet::new(alphabet)
            .map_err(|e| config_failure(format!("invalid base64 alphabet: {}", e)))?;
        Ok(Self::build(alphabet, Some(STD_PADDING), false))
    }

    pub fn standard(variant: StandardVariant) -> Self {
        match variant {
            StandardVariant::Std => Self::build(alphabet::STANDARD, Some(STD_PADDING), false),
            StandardVariant::Url => Self::build(alphabet::URL_SAFE, Some(STD_PADDING), false),
            StandardVariant::RawStd => Self::build(alphabet::STANDARD, None, false),
            StandardVariant::RawUrl => Self::build(alphabet::URL_SAFE, None, false),
        }
    }

    fn build(alphabet: Alphabet, padding: Option<u8>, strict: bool) -> Self {
        let config = GeneralPurposeConfig::new()
            .with_encode_padding(false)
            .with_decode_padding_mode(DecodePaddingMode::RequireNone)
            .with_decode_allow_trailing_bits(!strict);
        let engine = GeneralPurpose::new(&alphabet, config);
        Self {
            alphabet,
            padding,
            strict,
            engine,
        }
    }

    /// Same encoding, rejecting non-zero trailing bits on decode.
    pub fn strict(&self) -> Self {
        Self::build(self.alphabet.clone(), self.padding, true)
    }

    /// Same encoding with a different padding rune, or none for
    /// [`NO_PADDING`]. The rune must fit in a byte, must not be CR or LF and
    /// must not occur in the alphabet; anything else is a `Range` failure.
    pub fn with_padding(&self, rune: i32) -> FatResult<Self> {
        if rune == NO_PADDING {
            return Ok(Self::build(self.alphabet.clone(), None, self.strict));
        }
        if !(0..=char::MAX as i32).contains(&rune) {
            return Err(config_failure(format!("invalid padding rune {}", rune)));
        }
        let pad = match u8::try_from(rune) {
            Ok(b'\r') | Ok(b'\n') | Err(_) => {
                return Err(config_failure(format!("invalid padding rune {}", rune)))
            }
            Ok(pad) => pad,
        };
        if self.alphabet.as_str().as_bytes().contains(&pad) {
            return Err(config_failure(format!(
                "padding rune {} is contained in the alphabet",
                rune
            )));
        }
        Ok(Self::build(self.alphabet.clone(), Some(pad), self.strict))
    }

    pub fn padding(&self) -> Option<u8> {
        self.padding
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Length of the encoding of `n` source bytes.
    pub fn encoded_len(&self, n: usize) -> usize {
        match self.padding {
            Some(_) => n.div_ceil(3) * 4,
            None => n / 3 * 4 + (n % 3 * 8).div_ceil(6),
        }
    }

    /// Upper bound on the decoding of `n` encoded bytes.
    pub fn decoded_len(&self, n: usize) -> usize {
        match self.padding {
            Some(_) => n / 4 * 3,
            None => n / 4 * 3 + n % 4 * 6 / 8,
        }
    }

    pub fn encode(&self, src: &[u8]) -> Vec<u8> {
        let mut out = self.engine.encode(src).into_bytes();
        if let Some(pad) = self.padding {
            while out.len() % 4 != 0 {
                out.push(pad);
            }
        }
        out
    }

    /// Encode as text. A padding byte above 0x7F is not valid UTF-8 on its
    /// own and comes back as U+FFFD.
    pub fn encode_to_string(&self, src: &[u8]) -> String {
        String::from_utf8_lossy(&self.encode(src)).into_owned()
    }

    /// Decode, ignoring embedded CR and LF. Corrupt input is `Syntax`.
    pub fn decode(&self, src: &[u8]) -> FatResult<Vec<u8>> {
        let mut cleaned: Vec<u8> = src
            .iter()
            .copied()
            .filter(|b| *b != b'\r' && *b != b'\n')
            .collect();
        if let Some(pad) = self.padding {
            if cleaned.len() % 4 != 0 {
                return Err(corrupt(format!("length {} is not a multiple of 4", cleaned.len())));
            }
            let pads = cleaned.iter().rev().take_while(|b| **b == pad).count();
            if pads > 2 {
                return Err(corrupt(format!("{} padding bytes", pads)));
            }
            cleaned.truncate(cleaned.len() - pads);
        }
        self.engine.decode(&cleaned).map_err(corrupt)
    }
}

/// Streaming encoder appending to a bytes buffer held by handle.
///
/// Complete 3-byte groups are encoded as they arrive; the tail and padding
/// are written on close. The pending state is `None` once closed.
#[derive(Debug)]
pub struct Base64Encoder {
    encoding: Base64Encoding,
    dst: Handle,
    pending: Mutex<Option<Vec<u8>>>,
}

impl Base64Encoder {
    pub fn new(encoding: Base64Encoding, dst: Handle) -> Self {
        Self {
            encoding,
            dst,
            pending: Mutex::new(Some(Vec::new())),
        }
    }

    /// Destination buffer handle.
    pub fn destination(&self) -> Handle {
        self.dst
    }

    /// Buffer `data`, flushing every complete group to the destination.
    pub fn write(&self, registry: &HandleRegistry, data: &[u8]) -> FatResult<usize> {
        let encoded = {
            let mut guard = self.pending.lock();
            let pending = match guard.as_mut() {
                Some(pending) => pending,
                None => violate(ContractViolation::Closed {
                    op: "base64 encoder write",
                    kind: Kind::Base64Encoder,
                }),
            };
            pending.extend_from_slice(data);
            let whole = pending.len() / 3 * 3;
            let encoded = self.encoding.encode(&pending[..whole]);
            pending.drain(..whole);
            encoded
        };
        if !encoded.is_empty() {
            registry
                .resolve::<BytesBuffer>(self.dst)
                .write(&encoded);
        }
        Ok(data.len())
    }

    /// Flush the remaining bytes with padding. Closing twice is misuse.
    pub fn close(&self, registry: &HandleRegistry) -> FatResult<()> {
        let tail = match self.pending.lock().take() {
            Some(tail) => tail,
            None => misuse("base64 encoder close", "encoder already closed"),
        };
        if !tail.is_empty() {
            registry
                .resolve::<BytesBuffer>(self.dst)
                .write(&self.encoding.encode(&tail));
        }
        Ok(())
    }
}
