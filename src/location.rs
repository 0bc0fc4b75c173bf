use percent_encoding::percent_decode_str;
use std::fmt;
use std::path::Path;
use url::Url;

use crate::error::{Result, ScanError};

/// File-name suffix identifying a compiled class.
pub const CLASS_SUFFIX: &str = ".class";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationKind {
    Archive,
    Directory,
}

impl LocationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LocationKind::Archive => "archive",
            LocationKind::Directory => "directory",
        }
    }
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One place on the classpath that provides a package.
///
/// Archive locations use the `jar:file:/lib.jar!/a/b/` form, directories a
/// plain `file:` URL. The URL keeps its percent escapes until
/// [`Location::decoded_path`] is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    kind: LocationKind,
    url: Url,
}

impl Location {
    /// Classifies a location URL by scheme: `jar` is an archive, `file` a
    /// directory.
    pub fn from_url(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).map_err(|e| ScanError::decode(raw, e))?;
        let kind = match url.scheme() {
            "jar" => LocationKind::Archive,
            "file" => LocationKind::Directory,
            other => {
                return Err(ScanError::decode(
                    raw,
                    format!("unsupported scheme `{other}`"),
                ));
            }
        };
        Ok(Self { kind, url })
    }

    pub fn directory(dir: &Path) -> Option<Self> {
        let url = Url::from_directory_path(dir).ok()?;
        Some(Self {
            kind: LocationKind::Directory,
            url,
        })
    }

    /// `jar:<file url of archive>!/<fragment>`
    pub fn archive(archive: &Path, fragment: &str) -> Option<Self> {
        let file_url = Url::from_file_path(archive).ok()?;
        let url = Url::parse(&format!("jar:{file_url}!/{fragment}")).ok()?;
        Some(Self {
            kind: LocationKind::Archive,
            url,
        })
    }

    pub fn kind(&self) -> LocationKind {
        self.kind
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Path component of the URL, escapes intact. For archives this still
    /// carries the inner `file:` scheme and the `!/` entry separator.
    pub fn raw_path(&self) -> &str {
        self.url.path()
    }

    pub fn decoded_path(&self) -> Result<String> {
        percent_decode_str(self.raw_path())
            .decode_utf8()
            .map(|s| s.into_owned())
            .map_err(|e| ScanError::decode(self.url.as_str(), e))
    }
}

/// Turns a decoded URL path into a native one. Windows URL paths carry a
/// leading slash before the drive letter (`/C:/classes`).
pub(crate) fn native_path(path: &str) -> &str {
    let bytes = path.as_bytes();
    if cfg!(windows)
        && bytes.len() >= 3
        && bytes[0] == b'/'
        && bytes[1].is_ascii_alphabetic()
        && bytes[2] == b':'
    {
        return &path[1..];
    }
    path
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.url)
    }
}
