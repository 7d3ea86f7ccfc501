//! HTTP protocol layer module
//!
//! Response construction shared by the dispatcher, kept apart from routing
//! and view logic.

pub mod response;

// Re-export commonly used builders
pub use response::{
    build_404_response, build_405_response, build_413_response, build_500_response,
    build_options_response, build_text_response, with_server_header,
};
