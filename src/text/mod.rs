//! Text
//!
//! Immutable strings (`String` in the registry), string arrays, the
//! append-only [`StringBuilder`] and the seekable [`StringReader`].

mod builder;
mod reader;
pub mod strings;

pub use builder::StringBuilder;
pub use reader::StringReader;
