//! API Response types and error codes

pub mod response;

pub use response::{ApiResponse, error_codes};
