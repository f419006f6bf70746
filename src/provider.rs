//! Remote-service descriptors (data) and token-error strategies (behavior).
//!
//! `descriptor` exposes validated endpoint metadata ([`DriveEndpoints`]): the token endpoint
//! the service-account assertion is exchanged at and the Drive v3 API base, both HTTPS-only.
//! `strategy` defines [`TokenErrorStrategy`], an HTTP-client-agnostic hook that maps token
//! endpoint failures onto the credential error taxonomy.

pub mod descriptor;
pub mod strategy;

pub use descriptor::*;
pub use strategy::*;
