//! Storage abstraction for the source and target backends.
//!
//! The migration jobs only need a handful of operations from each side:
//!
//! - [`SourceStore`] - "select all rows from table" on the relational source
//! - [`DocumentStore`] - list / get / upsert / update-fields on the document target
//!
//! Backends live in [`backends`]; each one validates the wire shape it
//! receives and hands the jobs plain [`Document`] values.
//!
//! # Usage
//!
//! ```ignore
//! use folio_migrate::store::{DocumentStore, Document};
//!
//! let docs = store.list_documents("skills").await?;
//! for doc in docs {
//!     if doc.get_str("user_id") == Some("old-1") {
//!         store.update_fields("skills", &doc.id, fields).await?;
//!     }
//! }
//! ```

mod dates;
mod traits;
mod value;

pub mod backends;

pub use dates::{parse_date_str, to_timestamp};
pub use traits::{DocumentStore, SourceStore};
pub use value::{fields_from_json, fields_to_json, Document, FieldValue, Fields};
