//! Google OAuth and Search Console API clients.

pub mod client;
pub mod error;
pub mod oauth;
pub mod types;

pub use client::SearchConsoleClient;
pub use error::GscError;
pub use oauth::{GoogleOAuthClient, OAuthConfig, OAuthEndpoints, TokenSet, GOOGLE_SCOPES};
pub use types::{Dimension, IndexStatus, SearchAnalyticsRow, SiteEntry, UrlInspection};
