//! Request handler module
//!
//! Bridges hyper requests to the application's route table.

pub mod router;

// Re-export main entry point
pub use router::handle_request;
