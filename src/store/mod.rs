//! Storage module for session credentials.
//!
//! Provides the credential store interface plus file and in-memory
//! implementations.

mod traits;
mod file;
mod memory;

pub use traits::*;
pub use file::*;
pub use memory::*;
