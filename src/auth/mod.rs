//! Authentication module
//!
//! Google Ads requests carry an OAuth2 access token obtained with the
//! refresh token flow, plus the `developer-token` and `login-customer-id`
//! headers. The `Authenticator` caches the access token until shortly
//! before it expires.

mod authenticator;
mod types;

pub use authenticator::{Authenticator, DEVELOPER_TOKEN_HEADER, LOGIN_CUSTOMER_ID_HEADER};
pub use types::{AuthConfig, CachedToken};
