//! # Starfall Development Tools
//!
//! Command-line tools for development:
//! - Data validators
//! - Headless simulation runs

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod simulate;
pub mod validate;
