use rayon::prelude::*;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::archive::{self, ArchiveReader, ZipArchiveReader};
use crate::deadline::Deadline;
use crate::directory::{self, DirectoryReader, FsDirectoryReader};
use crate::error::{Result, ScanError};
use crate::location::{Location, LocationKind, native_path};
use crate::resolve::Resolver;

/// What to do when one location cannot be decoded or opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Fail the whole scan.
    #[default]
    Abort,
    /// Log a warning, record the location in [`ScanReport::skipped`] and go on.
    Skip,
}

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub error_policy: ErrorPolicy,
    /// Sort the final class list instead of keeping discovery order.
    pub sort: bool,
    /// Walk locations on the rayon pool. Output order is unchanged.
    pub parallel: bool,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct SkippedLocation {
    pub location: Location,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub classes: Vec<String>,
    pub locations: Vec<Location>,
    pub skipped: Vec<SkippedLocation>,
}

/// `com.acme` -> `com/acme/`
pub fn to_path_fragment(package: &str) -> Result<String> {
    let invalid = |reason| ScanError::InvalidPrefix {
        prefix: package.to_string(),
        reason,
    };
    if package.is_empty() {
        return Err(invalid("empty"));
    }
    if package.contains(['/', '\\']) {
        return Err(invalid("contains a path separator"));
    }
    if package.split('.').any(str::is_empty) {
        return Err(invalid("empty segment"));
    }
    Ok(format!("{}/", package.replace('.', "/")))
}

/// Lists the classes of a package across every location a [`Resolver`]
/// reports for it.
pub struct Scanner<R, A = ZipArchiveReader, D = FsDirectoryReader> {
    resolver: R,
    archives: A,
    directories: D,
    options: ScanOptions,
}

impl<R> Scanner<R> {
    pub fn new(resolver: R) -> Self {
        Self::with_readers(resolver, ZipArchiveReader, FsDirectoryReader)
    }
}

impl<R, A, D> Scanner<R, A, D> {
    pub fn with_readers(resolver: R, archives: A, directories: D) -> Self {
        Self {
            resolver,
            archives,
            directories,
            options: ScanOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }
}

impl<R, A, D> Scanner<R, A, D>
where
    R: Resolver + Sync,
    A: ArchiveReader + Sync,
    D: DirectoryReader + Sync,
{
    /// Fully-qualified names of every class under `package`. A class provided
    /// by several locations is listed once per location.
    pub fn discover(&self, package: &str) -> Result<Vec<String>> {
        Ok(self.scan(package)?.classes)
    }

    pub fn locate(&self, package: &str) -> Result<Vec<Location>> {
        let fragment = to_path_fragment(package)?;
        self.resolver.resolve(&fragment)
    }

    pub fn scan(&self, package: &str) -> Result<ScanReport> {
        let fragment = to_path_fragment(package)?;
        let locations = self.resolver.resolve(&fragment)?;
        debug!(package, locations = locations.len(), "scanning");

        let deadline = self.options.timeout.map(Deadline::after);
        let deadline = deadline.as_ref();
        let mut report = ScanReport::default();

        if self.options.parallel {
            let outcomes: Vec<Result<Vec<String>>> = locations
                .par_iter()
                .map(|location| self.walk_location(location, package, &fragment, deadline))
                .collect();
            for (location, outcome) in locations.iter().zip(outcomes) {
                self.absorb(&mut report, location, outcome)?;
            }
        } else {
            for location in &locations {
                let outcome = self.walk_location(location, package, &fragment, deadline);
                self.absorb(&mut report, location, outcome)?;
            }
        }

        if self.options.sort {
            report.classes.sort();
        }
        report.locations = locations;
        Ok(report)
    }

    fn walk_location(
        &self,
        location: &Location,
        package: &str,
        fragment: &str,
        deadline: Option<&Deadline>,
    ) -> Result<Vec<String>> {
        let decoded = location.decoded_path()?;
        debug!(%location, %decoded, "walking location");
        match location.kind() {
            LocationKind::Archive => {
                archive::walk_archive(&self.archives, &decoded, fragment, deadline)
            }
            LocationKind::Directory => directory::walk_directory(
                &self.directories,
                Path::new(native_path(&decoded)),
                package,
                deadline,
            ),
        }
    }

    fn absorb(
        &self,
        report: &mut ScanReport,
        location: &Location,
        outcome: Result<Vec<String>>,
    ) -> Result<()> {
        match outcome {
            Ok(classes) => report.classes.extend(classes),
            Err(e) if self.options.error_policy == ErrorPolicy::Skip && e.is_per_location() => {
                warn!(%location, error = %e, "location skipped");
                report.skipped.push(SkippedLocation {
                    location: location.clone(),
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }
}
