//! HTTP request handlers.
//!
//! Each handler is responsible for request validation and deserialization,
//! invoking the conversion pipeline, and response serialization.
//!
//! - [`convert`]: the upload-validate-convert-respond endpoint
//! - [`config`]: frontend metadata retrieval
//! - [`static_assets`]: embedded upload page serving
//!
//! Handlers return [`crate::errors::Error`] which converts to a JSON
//! `{ "error": ... }` body with the appropriate HTTP status code.

pub mod config;
pub mod convert;
pub mod static_assets;
