//! Credential-domain models: scope sets, issued tokens, and service-account keys.

pub mod scope;
pub mod service_account;
pub mod token;

pub use scope::*;
pub use service_account::*;
pub use token::{record::*, secret::*};
