//! FatStd - Handle-Based C ABI Standard Library
//!
//! Exposes strings, byte buffers, streaming readers and writers, codecs,
//! archives, sockets and an HTTP test double to callers that cannot hold
//! references into the Rust heap. Every object crossing the boundary lives
//! in a [`HandleRegistry`] and is referred to only by its integer handle.
//!
//! # Features
//!
//! - **Opaque handles**: non-zero, process-unique, never reused
//! - **Typed resolution**: one closed [`BoxedValue`] enum, fatal on wrong kind
//! - **Two-channel results**: a [`Status`] plus an optional error handle
//! - **Fail-fast contracts**: bad handles, NULL pointers and oversize lengths
//!   are [`ContractViolation`]s, never statuses
//! - **HTTP test double**: captures requests into a bounded drop-oldest queue
//!
//! # Example
//!
//! ```rust
//! use fatstd::HandleRegistry;
//!
//! let registry = HandleRegistry::new();
//! let h = registry.register(String::from("hello"));
//! assert_eq!(registry.resolve::<String>(h).as_str(), "hello");
//! assert_eq!(registry.release::<String>(h).as_str(), "hello");
//! assert!(registry.get(h).is_none());
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Foreign caller │  handles, ptr/len, out-params
//! └────────┬────────┘
//!          │ fat_*
//!          ▼
//! ┌─────────────────┐
//! │   ffi exports   │  validate, resolve, reply
//! └────────┬────────┘
//!     ┌────┴──────────┐
//!     ▼               ▼
//! ┌──────────┐  ┌──────────────────────────────┐
//! │ Registry │  │ text, bytes, codec, archive, │
//! └──────────┘  │ net (sockets, http)          │
//!               └──────────────────────────────┘
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]
// Every export validates its raw pointers before dereferencing them.
#![allow(clippy::missing_safety_doc)]

pub mod archive;
pub mod bytes;
pub mod codec;
pub mod config;
pub mod contract;
pub mod ffi;
pub mod handles;
pub mod logging;
pub mod net;
pub mod status;
pub mod text;

pub use config::{ConfigError, FatConfig};
pub use contract::{ContractViolation, MAX_LEN};
pub use handles::{Boxed, BoxedValue, Handle, HandleRegistry, Kind, NULL_HANDLE};
pub use net::http::{HttpClient, HttpRequest, HttpResponse, HttpServer, RequestQueue, Wait};
pub use status::{FatError, FatResult, Failure, Reply, Status};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
