//! Core of the **[Apache Avro](https://avro.apache.org/)** data format: the
//! binary codec for every schema shape, the object-container-file framing
//! that wraps it, schema resolution between writer and reader schemas, and
//! schema fingerprinting.
//!
//! Values are represented dynamically with the generic [`Value`](types::Value)
//! type, driven by a parsed [`Schema`]:
//!
//! ```
//! use avro_core::{Reader, Schema, Writer, types::Record};
//!
//! let schema = Schema::parse_str(r#"
//!     {
//!         "type": "record",
//!         "name": "test",
//!         "fields": [
//!             {"name": "a", "type": "long", "default": 42},
//!             {"name": "b", "type": "string"}
//!         ]
//!     }
//! "#).unwrap();
//!
//! let mut writer = Writer::new(&schema, Vec::new());
//! let mut record = Record::new(&schema).unwrap();
//! record.put("a", 27i64);
//! record.put("b", "foo");
//! writer.append(record).unwrap();
//! let encoded = writer.into_inner().unwrap();
//!
//! let reader = Reader::new(&encoded[..]).unwrap();
//! for value in reader {
//!     println!("{:?}", value.unwrap());
//! }
//! ```
//!
//! Lower-level entry points are available for raw datums
//! ([`to_avro_datum`] / [`from_avro_datum`]), single-object payloads
//! ([`write_single_object`] / [`SchemaStore`]), and pre-compiled schema
//! resolution ([`ResolutionPlan`]).

mod codec;
mod decimal;
mod decode;
mod duration;
mod encode;
mod reader;
mod resolve;
mod single_object;
mod writer;

pub mod error;
pub mod rabin;
pub mod schema;
pub mod types;
pub mod util;

pub use codec::{Bzip2Settings, Codec, DeflateSettings};
pub use decimal::Decimal;
pub use decode::decode;
pub use duration::{Days, Duration, Millis, Months};
pub use encode::{encode, encode_to_vec};
pub use error::Error;
pub use reader::{Reader, from_avro_datum};
pub use resolve::ResolutionPlan;
pub use schema::Schema;
pub use single_object::{SchemaStore, schema_fingerprint, write_single_object};
pub use types::Value;
pub use uuid::Uuid;
pub use writer::{Writer, WriterBuilder, to_avro_datum};

/// A convenience alias for `Result`s with this crate's [`Error`].
pub type AvroResult<T> = Result<T, Error>;
