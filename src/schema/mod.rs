//! Schema module
//!
//! JSON schema types plus the two ways a stream obtains its schema:
//!
//! - **Field lists**: built-in streams derive nested object schemas from the
//!   GAQL fields they select
//! - **Schema files**: custom reports point at a JSON schema file that is
//!   read lazily when the stream runs

mod builder;
mod types;

pub use builder::{load_schema_file, schema_from_fields, to_camel_case};
pub use types::{JsonSchema, JsonType, JsonTypeOrArray, SchemaProperty};
