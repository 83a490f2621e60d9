//! Command-line client for the Autolab grading service.
//!
//! Authenticates with the OAuth2 Device Authorization Grant, refreshes the
//! stored credential on every call, and sends all API traffic through an
//! instrumented transport that fans out observer hooks with a bounded wait.
//!
//! # Quick Start
//!
//! ```no_run
//! use decanter::config::DecanterConfig;
//! use decanter::session::Session;
//!
//! # async fn example() -> decanter::error::Result<()> {
//! let session = Session::connect(DecanterConfig::load()?, false)?;
//! for course in session.grader.courses().await? {
//!     println!("{} ({})", course.display_name, course.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod poller;
pub mod session;
pub mod telemetry;
pub mod transport;

#[cfg(feature = "cli")]
pub mod cli;
