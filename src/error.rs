use std::path::PathBuf;
use std::time::Duration;

/// Failures surfaced by a package scan.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("invalid package prefix {prefix:?}: {reason}")]
    InvalidPrefix { prefix: String, reason: &'static str },

    #[error("failed to resolve locations for {fragment}: {message}")]
    Resolution { fragment: String, message: String },

    #[error("cannot decode location {location}: {message}")]
    Decode { location: String, message: String },

    #[error("cannot open archive {}: {source}", .path.display())]
    ArchiveOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("scan exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),
}

impl ScanError {
    pub(crate) fn resolution(fragment: &str, message: impl ToString) -> Self {
        Self::Resolution {
            fragment: fragment.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn decode(location: &str, message: impl ToString) -> Self {
        Self::Decode {
            location: location.to_string(),
            message: message.to_string(),
        }
    }

    /// Whether the error is tied to one location and may be skipped under
    /// [`ErrorPolicy::Skip`](crate::scan::ErrorPolicy::Skip).
    pub fn is_per_location(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::ArchiveOpen { .. })
    }
}

pub type Result<T, E = ScanError> = std::result::Result<T, E>;
