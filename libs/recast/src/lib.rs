//! Field-by-field mapping between independently defined record types.
//!
//! Fields are matched by name (or a `#[convert(tag = "...")]` rename),
//! descending into nested records, embedded records, pointers (`Option`,
//! `Box`) and sequences (`Vec`).
//!
//! ```ignore
//! use recast::Reflect;
//!
//! #[derive(Reflect, Clone, Default)]
//! pub struct Counter {
//!     pub name: String,
//!     pub hits: i32,
//! }
//!
//! #[derive(Reflect, Clone, Default)]
//! pub struct CounterRow {
//!     pub name: String,
//!     pub hits: i64,
//! }
//!
//! let mut row = CounterRow::default();
//! recast::convert(&Counter { name: "home".into(), hits: 3 }, &mut row)?;
//! ```

// The derive emits `recast::` paths; let them resolve inside this crate too.
extern crate self as recast;

pub mod cache;
pub mod config;
pub mod converter;
pub mod error;
pub mod reflect;
pub mod registry;
pub mod scalar;
pub mod schema;

pub use recast_derive::Reflect;

pub use cache::SchemaCache;
pub use config::{ConvertOptions, NilElementPolicy};
pub use converter::{convert, Converter, ConverterBuilder};
pub use error::{BoxError, ConvertError, ErrorKind, RegistrationError, SchemaError};
pub use reflect::{
    AsReflect, FieldDesc, Record, Reflect, ReflectMut, ReflectRef, Sequence, Shape, TypeDesc,
};
pub use registry::{
    register_global_conversion_function, ConversionFn, FunctionRegistry, SharedRegistry,
};
pub use scalar::{Scalar, ScalarKind, ScalarSlot, ScalarValue};
pub use schema::{FieldEntry, FieldTag, RecordSchema};
