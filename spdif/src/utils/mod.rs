//! Supporting infrastructure.
//!
//! - **Error Handling** ([`utils::errors`](errors)): anomaly types and the
//!   `log_or_err!` fail-level machinery.

pub mod errors;
