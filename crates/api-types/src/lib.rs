//! # shadow-tag-api-types
//!
//! Records exchanged with the game backend: table rows, identifiers, and the
//! argument shapes of its remote procedures. Everything here is plain data;
//! the backend owns every rule.

pub mod avatars;
pub mod identifiers;
pub mod models;
pub mod rpc;

pub mod prelude {
    pub use crate::avatars::{AVATARS, Avatar};
    pub use crate::identifiers::*;
    pub use crate::models::*;
    pub use crate::rpc::*;
}

pub use prelude::*;
