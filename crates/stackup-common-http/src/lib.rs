//! HTTP client utilities for stackup.

pub mod client;
pub mod response;

pub use client::{build_client, HttpClient, HttpConfig, HttpError};
pub use response::{stream_response, ByteStream};
