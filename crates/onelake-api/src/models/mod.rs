//! Request and response types for the OneLake DFS API.

mod account;
mod envelope;
mod paths;

pub use account::{AccountListing, FileSystem};
pub use envelope::{ApiResponse, ErrorEnvelope};
pub use paths::PathEntry;
