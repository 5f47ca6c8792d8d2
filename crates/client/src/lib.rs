//! HTTP access to an Infrahub server
//!
//! Sends raw GraphQL queries, downloads the branch schema over REST and
//! fetches generated artifacts. Transport failures are reported as
//! [`FetchError`](infrahub_core::FetchError) kinds so callers can treat them
//! like any other graph source failure.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

mod client;
pub mod error;
pub mod queries;

pub use client::{InfrahubClient, TOKEN_HEADER};
pub use error::{ClientError, Result};
