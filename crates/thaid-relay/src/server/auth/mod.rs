//! OIDC authorization-code relay for ThaID.
//!
//! Login flow per browser session:
//! `Unauthenticated → StatePending (login) → Authenticated (callback/exchange) → Unauthenticated (logout)`.
//!
//! The provider's ID token signature is not verified; claims are read from the
//! payload as delivered by the token endpoint.

pub mod csrf;
pub mod handlers;

pub use csrf::generate_state;
