//! wp-check - Audit on-disk WordPress installations
//!
//! Recursively scans a directory tree for WordPress installations, extracts
//! the installed core and plugin versions, and compares them against the
//! latest versions published on WordPress.org.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use wp_check::{Auditor, WpOrg};
//!
//! fn main() -> wp_check::Result<()> {
//!     let mut wporg = WpOrg::new()?;
//!     let stdout = std::io::stdout();
//!     let mut auditor = Auditor::new(&mut wporg, stdout.lock());
//!     auditor.run(Path::new("/var/www"))
//! }
//! ```

pub mod audit;
pub mod error;
pub mod scanner;
pub mod version;
pub mod wporg;

pub use audit::Auditor;
pub use error::{Error, Result};
pub use scanner::PluginHeader;
pub use version::PackageVersion;
pub use wporg::{PluginStatus, WpOrg};
