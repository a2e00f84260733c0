//! Data models for the ThaID OIDC exchange.
//!
//! Provider payloads use `#[serde(default)]` for fields the provider may omit.

mod claims;
mod provider;
mod token;

pub use claims::{Claims, decode_id_token};
pub use provider::ProviderMetadata;
pub use token::TokenResponse;
