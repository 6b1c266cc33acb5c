//! rest-chain: immutable, chainable REST requests
//!
//! Request configuration (base URL, path segments, headers, query
//! parameters, cookies, media types) accumulates through side-effect-free
//! calls that each return a new snapshot. A terminal verb then sends one
//! request and decodes the response into caller-supplied containers.
//!
//! # Architecture
//!
//! - `RestClient`: the immutable snapshot and its GET/PUT/POST/DELETE verbs
//! - `MediaType`: wire name plus codec, drives `Accept` and response decoding
//! - `Transport`: the seam to the HTTP stack, backed by `reqwest`
//! - `TransportConfig`: timeouts, pooling and redirects for the transport

pub mod client;
pub mod config;
pub mod cookie;
pub mod error;
pub mod media_type;
pub mod transport;

pub use client::RestClient;
pub use config::TransportConfig;
pub use cookie::Cookie;
pub use error::{BoxError, RestError, RestErrorCategory, RestResult};
pub use media_type::{Entity, MediaType, MediaTypeError};
pub use transport::{ReqwestTransport, SharedTransport, Transport};
