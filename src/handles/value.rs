//! Boxed Values
//!
//! The closed set of object kinds that can live behind a handle. The kind
//! table below is the single place a new kind is declared; the macro derives
//! the `BoxedValue` enum, the `Kind` discriminant and the `Boxed` impls from it.

use std::fmt;
use std::sync::Arc;

use crate::archive::tar::{TarHeader, TarReader, TarWriter};
use crate::archive::zip::{ZipFile, ZipFileReader, ZipReader, ZipWriter};
use crate::bytes::{BytesBuffer, BytesReader};
use crate::codec::base64::{Base64Encoder, Base64Encoding};
use crate::codec::csv::{CsvReader, CsvWriter};
use crate::net::http::{HttpClient, HttpRequest, HttpResponse, HttpServer};
use crate::net::socket::{TcpConn, TcpListener, UdpConn};
use crate::status::FatError;
use crate::text::{StringBuilder, StringReader};

/// A value type that can be stored in the handle registry.
///
/// Implemented only by the kind table; the registry uses it to wrap values on
/// the way in and to downcast them on the way out.
pub trait Boxed: Sized + Send + Sync + 'static {
    /// Kind tag of this type.
    const KIND: Kind;

    /// Wrap a shared value into its enum variant.
    fn wrap(value: Arc<Self>) -> BoxedValue;

    /// Unwrap the enum variant, handing the value back on kind mismatch.
    fn unwrap(value: BoxedValue) -> Result<Arc<Self>, BoxedValue>;
}

macro_rules! boxed_kinds {
    ($( $variant:ident => $ty:ty, $label:literal; )*) => {
        /// A registry entry. Payloads are reference counted so a caller can
        /// keep using a borrowed object after the registry lock is released.
        #[derive(Clone)]
        pub enum BoxedValue {
            $( $variant(Arc<$ty>), )*
        }

        /// Discriminant of a [`BoxedValue`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Kind {
            $( $variant, )*
        }

        impl Kind {
            /// Every kind, in declaration order.
            pub const ALL: &'static [Kind] = &[ $( Kind::$variant, )* ];

            /// Human readable label used in diagnostics.
            pub fn label(self) -> &'static str {
                match self {
                    $( Kind::$variant => $label, )*
                }
            }
        }

        impl BoxedValue {
            /// Kind of the stored payload.
            pub fn kind(&self) -> Kind {
                match self {
                    $( BoxedValue::$variant(_) => Kind::$variant, )*
                }
            }
        }

        $(
            impl Boxed for $ty {
                const KIND: Kind = Kind::$variant;

                fn wrap(value: Arc<Self>) -> BoxedValue {
                    BoxedValue::$variant(value)
                }

                fn unwrap(value: BoxedValue) -> Result<Arc<Self>, BoxedValue> {
                    match value {
                        BoxedValue::$variant(inner) => Ok(inner),
                        other => Err(other),
                    }
                }
            }
        )*
    };
}

boxed_kinds! {
    String => String, "string";
    StringArray => Vec<String>, "string array";
    StringBuilder => StringBuilder, "string builder";
    StringReader => StringReader, "string reader";
    Bytes => Vec<u8>, "bytes";
    BytesArray => Vec<Vec<u8>>, "bytes array";
    BytesBuffer => BytesBuffer, "bytes buffer";
    BytesReader => BytesReader, "bytes reader";
    Error => FatError, "error";
    Base64Encoding => Base64Encoding, "base64 encoding";
    Base64Encoder => Base64Encoder, "base64 encoder";
    JsonValue => serde_json::Value, "json value";
    CsvReader => CsvReader, "csv reader";
    CsvWriter => CsvWriter, "csv writer";
    TarReader => TarReader, "tar reader";
    TarHeader => TarHeader, "tar header";
    TarWriter => TarWriter, "tar writer";
    ZipReader => ZipReader, "zip reader";
    ZipFile => ZipFile, "zip file";
    ZipFileReader => ZipFileReader, "zip file reader";
    ZipWriter => ZipWriter, "zip writer";
    TcpConn => TcpConn, "tcp conn";
    TcpListener => TcpListener, "tcp listener";
    UdpConn => UdpConn, "udp conn";
    HttpClient => HttpClient, "http client";
    HttpResponse => HttpResponse, "http response";
    HttpServer => HttpServer, "http server";
    HttpRequest => HttpRequest, "http request";
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Debug for BoxedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoxedValue({})", self.kind())
    }
}
