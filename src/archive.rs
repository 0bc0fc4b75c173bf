//! Class discovery inside jar/zip archives.
//!
//! An archive's index is flat, so package nesting is rebuilt purely from the
//! `/`-separated entry names.

use memmap2::Mmap;
use std::fs::File;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use zip::ZipArchive;

use crate::deadline::{self, Deadline};
use crate::error::{Result, ScanError};
use crate::location::{CLASS_SUFFIX, native_path};

/// Entries must be longer than the fragment by more than this many bytes.
const ENTRY_LENGTH_MARGIN: usize = CLASS_SUFFIX.len() - 1;

/// Opens an archive and lists its entry names in index order.
pub trait ArchiveReader {
    fn entry_names(&self, archive: &Path) -> Result<Vec<String>>;
}

/// Reads zip central directories through a read-only memory map.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipArchiveReader;

impl ArchiveReader for ZipArchiveReader {
    fn entry_names(&self, archive: &Path) -> Result<Vec<String>> {
        let open_err = |source: io::Error| ScanError::ArchiveOpen {
            path: archive.to_path_buf(),
            source,
        };
        let invalid =
            |e: zip::result::ZipError| open_err(io::Error::new(io::ErrorKind::InvalidData, e));

        let file = File::open(archive).map_err(open_err)?;
        // SAFETY: The file is opened read-only and outlives the map, which is
        // dropped at the end of this function.
        let mmap = unsafe { Mmap::map(&file) }.map_err(open_err)?;
        let mut zip = ZipArchive::new(Cursor::new(&mmap[..])).map_err(invalid)?;

        // Raw access skips decryption and decompressor setup, so entries
        // using an unsupported method or encryption still list their names.
        let mut names = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let entry = zip.by_index_raw(i).map_err(invalid)?;
            names.push(entry.name().to_string());
        }
        Ok(names)
    }
}

/// Extracts the archive's own filesystem path from a decoded location path
/// such as `file:/opt/lib/app.jar!/com/acme/`.
pub fn archive_file_path(decoded_path: &str) -> PathBuf {
    let rest = decoded_path.strip_prefix("file:").unwrap_or(decoded_path);
    // `file:///x` carries an empty authority; `file:/x` does not.
    let rest = match rest.strip_prefix("//") {
        Some(r) if r.starts_with('/') => r,
        _ => rest,
    };
    let end = rest.find('!').unwrap_or(rest.len());
    PathBuf::from(native_path(&rest[..end]))
}

/// Maps one entry name to a fully-qualified class name when it is a class
/// file below `fragment`.
pub fn class_name_for_entry(entry: &str, fragment: &str) -> Option<String> {
    if entry.starts_with(fragment)
        && entry.len() > fragment.len() + ENTRY_LENGTH_MARGIN
        && entry.ends_with(CLASS_SUFFIX)
    {
        let stem = &entry[..entry.len() - CLASS_SUFFIX.len()];
        return Some(stem.replace('/', "."));
    }
    None
}

/// Lists every class under `fragment` in the archive named by
/// `decoded_path`. The index is read once.
pub fn walk_archive<A: ArchiveReader + ?Sized>(
    reader: &A,
    decoded_path: &str,
    fragment: &str,
    deadline: Option<&Deadline>,
) -> Result<Vec<String>> {
    let archive = archive_file_path(decoded_path);
    debug!(archive = %archive.display(), fragment, "walking archive");

    let entries = reader.entry_names(&archive)?;
    let mut classes = Vec::new();
    for entry in &entries {
        deadline::check(deadline)?;
        if let Some(class_name) = class_name_for_entry(entry, fragment) {
            trace!(%class_name, "archive class");
            classes.push(class_name);
        }
    }

    debug!(archive = %archive.display(), found = classes.len(), "archive done");
    Ok(classes)
}
