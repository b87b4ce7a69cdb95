//! AWS Signature Version 4 request signing for ChatGate.
//!
//! This crate computes the `Authorization` header for requests to the signed
//! inference backend. It is the client-side mirror of SigV4 verification:
//! given the method, URL, body bytes, region, service and a set of AWS
//! credentials, it produces the headers that make the request authentic.
//!
//! # Usage
//!
//! ```rust
//! use chatgate_auth::{SigningContext, SigningCredentials, sign_request};
//!
//! let credentials = SigningCredentials::new("AKIDEXAMPLE", "secret", None);
//! let body = br#"{"messages":[]}"#;
//! let ctx = SigningContext::new(
//!     "POST",
//!     "https://bedrock-runtime.us-east-1.amazonaws.com/model/m/invoke",
//!     body,
//!     "us-east-1",
//!     "bedrock",
//! );
//! let signed = sign_request(&ctx, &credentials).unwrap();
//! for (name, value) in signed.header_pairs() {
//!     // attach to the outgoing request
//!     let _ = (name, value);
//! }
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - Canonical request construction for SigV4
//! - [`error`] - Signing error types
//! - [`sigv4`] - Signing key derivation and `Authorization` header assembly

pub mod canonical;
pub mod error;
pub mod sigv4;

pub use canonical::{CanonicalRequest, RequestTarget, hash_payload};
pub use error::AuthError;
pub use sigv4::{SignedHeaders, SigningContext, SigningCredentials, sign_request};
