//! Token-aware client for the ConoHa APIs.
//!
//! [`ConohaClient::connect`] performs the password grant, resolves the
//! account, compute and database-hosting endpoints from the service catalog
//! and from then on renews the token transparently before every request.
//! The typed fetchers live in the per-service modules as inherent methods on
//! [`ConohaClient`].

#[macro_use]
extern crate tracing;

pub mod auth;
pub mod billing;
mod client;
pub mod compute;
pub mod database;
pub mod error;
pub mod object_storage;
pub mod usage;

pub use auth::{
    Credential,
    PasswordCredentials,
    TokenManager,
};
pub use client::{
    ClientOptions,
    ConohaClient,
    Service,
    ServiceEndpoints,
    AUTH_TOKEN_HEADER,
    DEFAULT_RENEWAL_MARGIN,
    DEFAULT_USAGE_ROW_OFFSET,
};
pub use error::{
    ClientError,
    Result,
};
