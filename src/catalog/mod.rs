//! Stream catalog
//!
//! The catalog is the single list of streams a run works with:
//!
//! - **Built-in streams**: a fixed set of Google Ads resources and reports
//! - **Custom reports**: user-defined GAQL queries from the config
//!
//! [`resolve`] validates the custom reports, rejects name collisions and
//! returns an ordered [`Catalog`] of [`ResolvedStream`]s.

mod builtin;
mod keys;
mod resolver;
mod stream;

pub use builtin::{BuiltinStream, Endpoint, StreamDescriptor, DATE_FILTER, SYNTHETIC_PRIMARY_KEY};
pub use keys::derive_primary_key;
pub use resolver::{resolve, Catalog};
pub use stream::{CustomReport, ResolvedStream, StreamKind};

#[cfg(test)]
mod tests;
