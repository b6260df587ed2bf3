//! Transaction module - value types, signing, and construction

mod builder;
pub mod signer;
mod types;

pub use builder::*;
pub use signer::SignError;
pub use types::*;
