//! `rust-dataframe-extract` converts an in-memory table into a columnar extract.
//!
//! A conversion has two stages:
//!
//! - **type inference**: every column gets a dynamic kind (from its declared dtype when the
//!   values agree with it, otherwise by inspecting its non-null values) and the kind is mapped through a fixed table to one of the
//!   extract's static types (see [`inference`]). A column can be forced to the spatial type.
//! - **row coercion**: every cell is converted according to its column's static type. A cell
//!   that is missing, or that fails to convert, is written as null; nothing else in the row is
//!   affected (see [`coercion`]).
//!
//! The primary entrypoint is [`session::ConversionSession`]. Writing to an extract that already
//! holds a table of the same name appends rows to it.
//!
//! ## Quick example
//!
//! ```no_run
//! use rust_dataframe_extract::ingestion::{load_from_path, LoadOptions};
//! use rust_dataframe_extract::session::{ConversionSession, WriteOptions};
//! use rust_dataframe_extract::types::{DataType, Field, Schema};
//!
//! # fn main() -> Result<(), rust_dataframe_extract::ExtractError> {
//! let schema = Schema::new(vec![
//!     Field::new("id", DataType::Int64),
//!     Field::new("visited", DataType::Date),
//!     Field::new("area", DataType::Object),
//! ]);
//! let ds = load_from_path("visits.csv", &schema, &LoadOptions::default())?;
//!
//! let mut session = ConversionSession::new(ds)?;
//! session.set_spatial("area", true)?;
//!
//! // Run twice: the second write appends.
//! session.write("visits.extract.json", &WriteOptions::default())?;
//! let stats = session.write("visits.extract.json", &WriteOptions::default())?;
//! assert!(!stats.table_created);
//! # Ok(())
//! # }
//! ```
//!
//! ## Static types
//!
//! | dynamic kind | static type |
//! |---|---|
//! | string, unicode, mixed, complex | `UNICODE_STRING` |
//! | bytes, boolean | `BOOLEAN` |
//! | floating, mixed-integer, mixed-integer-float, decimal | `DOUBLE` |
//! | integer | `INTEGER` |
//! | categorical | `CHAR_STRING` |
//! | datetime64, datetime, timedelta64, timedelta, time | `DATETIME` |
//! | date | `DATE` |
//! | period | `DURATION` |
//!
//! Any other kind (an untyped column with no non-null values) is a fatal
//! [`ExtractError::UnrecognizedType`].
//!
//! ## Modules
//!
//! - [`types`]: table data model ([`types::DataSet`], [`types::Value`])
//! - [`source`]: the [`source::TableSource`] trait a session reads from
//! - [`inference`]: dynamic kinds, static types and the mapping between them
//! - [`columns`]: per-column descriptors and the spatial override
//! - [`coercion`]: per-cell conversion into [`coercion::CellValue`] write instructions
//! - [`sink`]: extract sinks (in-memory, JSON document file)
//! - [`session`]: the conversion session and write options
//! - [`observability`]: export observers
//! - [`ingestion`]: CSV / JSON / Parquet loaders
//! - `dataframe`: polars `DataFrame` adapter (Cargo feature `polars`, on by default)
//! - [`error`]: error types

pub mod coercion;
pub mod columns;
#[cfg(feature = "polars")]
pub mod dataframe;
pub mod error;
pub mod inference;
pub mod ingestion;
pub mod observability;
pub mod session;
pub mod sink;
pub mod source;
pub mod types;

pub use error::{ExtractError, ExtractResult};
pub use inference::{DynamicKind, StaticType};
pub use session::{ConversionSession, ExportStats, WriteOptions};
