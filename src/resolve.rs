use std::path::PathBuf;
use tracing::{debug, warn};

use crate::archive::{ArchiveReader, ZipArchiveReader};
use crate::error::{Result, ScanError};
use crate::location::Location;

/// Finds every location that currently provides a resource path fragment
/// such as `com/acme/`.
pub trait Resolver {
    fn resolve(&self, fragment: &str) -> Result<Vec<Location>>;
}

impl<F> Resolver for F
where
    F: Fn(&str) -> Result<Vec<Location>>,
{
    fn resolve(&self, fragment: &str) -> Result<Vec<Location>> {
        self(fragment)
    }
}

/// Resolves fragments against an ordered list of classpath entries, each a
/// class directory or an archive.
#[derive(Debug, Clone)]
pub struct ClasspathResolver<A = ZipArchiveReader> {
    entries: Vec<PathBuf>,
    archives: A,
}

impl ClasspathResolver {
    pub fn new(entries: impl IntoIterator<Item = PathBuf>) -> Self {
        Self::with_archive_reader(entries, ZipArchiveReader)
    }
}

impl<A> ClasspathResolver<A> {
    pub fn with_archive_reader(entries: impl IntoIterator<Item = PathBuf>, archives: A) -> Self {
        Self {
            entries: entries.into_iter().collect(),
            archives,
        }
    }
}

impl<A: ArchiveReader> Resolver for ClasspathResolver<A> {
    fn resolve(&self, fragment: &str) -> Result<Vec<Location>> {
        let mut locations = Vec::new();

        for entry in &self.entries {
            let entry = std::path::absolute(entry).map_err(|e| {
                ScanError::resolution(fragment, format!("{}: {e}", entry.display()))
            })?;
            let Ok(meta) = std::fs::metadata(&entry) else {
                debug!(entry = %entry.display(), "classpath entry missing, skipped");
                continue;
            };

            if meta.is_dir() {
                let dir = entry.join(fragment);
                if !dir.is_dir() {
                    continue;
                }
                let location = Location::directory(&dir).ok_or_else(|| {
                    ScanError::resolution(fragment, format!("not a file url: {}", dir.display()))
                })?;
                locations.push(location);
                continue;
            }

            // Only a prefix match is needed here, but the central directory
            // has no prefix lookup, so the full index is read. The walk reads
            // it again; a scan therefore reads each matching archive twice.
            match self.archives.entry_names(&entry) {
                Ok(names) => {
                    if !names.iter().any(|n| n.starts_with(fragment)) {
                        continue;
                    }
                    let location = Location::archive(&entry, fragment).ok_or_else(|| {
                        ScanError::resolution(
                            fragment,
                            format!("not a jar url: {}", entry.display()),
                        )
                    })?;
                    locations.push(location);
                }
                Err(e) => {
                    warn!(entry = %entry.display(), error = %e, "unreadable classpath archive, skipped");
                }
            }
        }

        debug!(fragment, found = locations.len(), "resolved");
        Ok(locations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::LocationKind;
    use std::fs::{self, File};
    use std::io::Write;
    use std::path::Path;
    use std::time::{SystemTime, UNIX_EPOCH};
    use zip::write::FileOptions;

    fn temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("{prefix}-{}-{nanos}", std::process::id()))
    }

    fn write_jar(path: &Path, names: &[&str]) -> anyhow::Result<()> {
        let file = File::create(path)?;
        let mut zip = zip::ZipWriter::new(file);
        for name in names {
            zip.start_file(*name, FileOptions::default())?;
            zip.write_all(b"")?;
        }
        zip.finish()?;
        Ok(())
    }

    #[test]
    fn resolves_directories_and_archives_in_classpath_order() -> anyhow::Result<()> {
        let base = temp_dir("package-scanner-resolve");
        let classes = base.join("classes");
        fs::create_dir_all(classes.join("com/acme"))?;
        let jar = base.join("lib.jar");
        write_jar(&jar, &["com/acme/", "com/acme/Api.class"])?;
        let unrelated = base.join("other.jar");
        write_jar(&unrelated, &["org/other/X.class"])?;

        let resolver = ClasspathResolver::new([
            jar.clone(),
            base.join("missing"),
            unrelated,
            classes.clone(),
        ]);
        let locations = resolver.resolve("com/acme/")?;

        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].kind(), LocationKind::Archive);
        assert!(locations[0].url().starts_with("jar:file:"));
        assert!(locations[0].url().ends_with("lib.jar!/com/acme/"));
        assert_eq!(locations[1].kind(), LocationKind::Directory);
        assert!(locations[1].url().ends_with("/classes/com/acme/"));

        fs::remove_dir_all(base)?;
        Ok(())
    }

    #[test]
    fn unmatched_fragment_resolves_to_nothing() -> anyhow::Result<()> {
        let base = temp_dir("package-scanner-resolve-empty");
        fs::create_dir_all(&base)?;
        let resolver = ClasspathResolver::new([base.clone()]);
        assert!(resolver.resolve("com/acme/")?.is_empty());
        fs::remove_dir_all(base)?;
        Ok(())
    }

    #[test]
    fn broken_archives_are_skipped() -> anyhow::Result<()> {
        let base = temp_dir("package-scanner-resolve-broken");
        fs::create_dir_all(&base)?;
        let broken = base.join("broken.jar");
        fs::write(&broken, b"garbage")?;
        let resolver = ClasspathResolver::new([broken]);
        assert!(resolver.resolve("com/acme/")?.is_empty());
        fs::remove_dir_all(base)?;
        Ok(())
    }

    #[test]
    fn closures_are_resolvers() {
        let resolver = |fragment: &str| -> Result<Vec<Location>> {
            Ok(vec![Location::from_url(&format!("file:///cp/{fragment}"))?])
        };
        let found = resolver.resolve("a/b/").unwrap();
        assert_eq!(found[0].raw_path(), "/cp/a/b/");
    }
}
