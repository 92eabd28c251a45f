//! Codecs
//!
//! Base64, compression (deflate family, bzip2, LZW), CSV, JSON, numeric text
//! conversion and quoted literals.

pub mod base64;
pub mod compress;
pub mod conv;
pub mod csv;
pub mod json;
pub mod quote;
