//! Protocol clients for the deploy service.
//!
//! The facades share one call sequence (see [`base::BaseClient`]): the REST
//! configuration API ([`rest`]), the long-running-process API ([`slpp`]), the
//! operations API ([`mta`]) and its namespace-aware MTA lookup ([`mta_v2`]).
//! Each is available plain or wrapped in [`Retryable`], and [`factory`] hands
//! out the wrapped variants.

pub mod base;
pub mod factory;
pub mod models;
pub mod mta;
pub mod mta_v2;
pub mod rest;
mod retryable;
pub mod slpp;

pub use factory::{ClientFactory, DefaultClientFactory};
pub use retryable::Retryable;
