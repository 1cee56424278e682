//! # Middleware
//!
//! Axum middleware for request stamping, request logging and error-body mapping.
//!
//! ## Modules
//!
//! - **[`mw_req_stamp`]**: Request ID and timestamp stamping
//! - **[`mw_logging`]**: Request/response log lines
//! - **[`mw_res_map`]**: JSON bodies for framework rejections

// region: --- Modules
pub mod mw_req_stamp;
pub mod mw_res_map;
pub mod mw_logging;
// endregion: --- Modules

// region: --- Re-exports
pub use mw_req_stamp::{stamp_req, RequestStamp, REQUEST_ID_HEADER};
pub use mw_res_map::map_res;
pub use mw_logging::log_requests;
// endregion: --- Re-exports
