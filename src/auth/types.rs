//! Auth configuration types

use crate::config::TapConfig;
use chrono::{DateTime, Utc};

/// Authentication configuration
#[derive(Debug, Clone, Default)]
pub enum AuthConfig {
    /// No authentication required
    #[default]
    None,

    /// Static bearer token
    Bearer {
        /// The bearer token
        token: String,
    },

    /// Google Ads: OAuth2 refresh token flow plus the API's account headers
    GoogleAds {
        /// Token endpoint URL
        token_url: String,
        /// OAuth2 client ID
        client_id: String,
        /// OAuth2 client secret
        client_secret: String,
        /// OAuth2 refresh token
        refresh_token: String,
        /// Sent as the `developer-token` header
        developer_token: String,
        /// Sent as the `login-customer-id` header, digits only
        login_customer_id: String,
    },
}

impl AuthConfig {
    /// Build the Google Ads auth config from the tap config
    pub fn google_ads(config: &TapConfig) -> Self {
        AuthConfig::GoogleAds {
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            refresh_token: config.refresh_token.clone(),
            developer_token: config.developer_token.clone(),
            login_customer_id: config.login_customer_id_digits(),
        }
    }
}

/// Cached token with expiration
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The access token
    pub token: String,
    /// When the token expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// Create a new cached token
    pub fn new(token: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { token, expires_at }
    }

    /// Create a token that expires in N seconds from now
    pub fn expires_in(token: String, seconds: i64) -> Self {
        let expires_at = Utc::now() + chrono::Duration::seconds(seconds);
        Self {
            token,
            expires_at: Some(expires_at),
        }
    }

    /// Check if the token is expired (with 30 second buffer)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let buffer = chrono::Duration::seconds(30);
                Utc::now() + buffer >= expires_at
            }
            None => false,
        }
    }
}
