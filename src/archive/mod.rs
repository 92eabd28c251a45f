//! Archives
//!
//! Tar and zip readers over in-memory or on-disk archives, and writers that
//! emit into a bytes buffer held by handle.

pub mod tar;
pub mod zip;
