//! # package-scanner
//!
//! Lists the fully-qualified names of every class under a Java package by
//! searching each directory and jar on a classpath that provides it.
//!
//! ## Architecture
//!
//! - **scan**: package-to-fragment mapping and the [`Scanner`] that dispatches each location
//! - **resolve**: the [`Resolver`] seam and the classpath-backed implementation
//! - **location**: archive/directory locations and percent-decoding of their URLs
//! - **archive**: flat jar index walk
//! - **directory**: depth-first class directory walk
//! - **deadline**: optional wall-clock budget for a scan
//! - **cli** / **config** / **logging**: the command-line front end

pub mod archive;
pub mod cli;
pub mod config;
pub mod deadline;
pub mod directory;
pub mod error;
pub mod location;
pub mod logging;
pub mod resolve;
pub mod scan;

pub use error::{Result, ScanError};
pub use location::{Location, LocationKind};
pub use resolve::{ClasspathResolver, Resolver};
pub use scan::{ErrorPolicy, ScanOptions, ScanReport, Scanner};
