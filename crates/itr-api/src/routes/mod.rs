//! # API Route Modules
//!
//! - `filings`: filing lifecycle, intake, computation and form switching
//! - `callbacks`: e-verification and processing outcomes from the gateway

pub mod callbacks;
pub mod filings;
