//! Class discovery in exploded class directories.

use ignore::WalkBuilder;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

use crate::deadline::{self, Deadline};
use crate::error::Result;
use crate::location::CLASS_SUFFIX;

/// One immediate child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Lists the immediate children of a directory.
pub trait DirectoryReader {
    fn list(&self, dir: &Path) -> io::Result<Vec<FsEntry>>;

    /// Stable identity of a directory, used to cut symlink cycles. Readers
    /// returning `None` get no cycle detection.
    fn identity(&self, _dir: &Path) -> Option<PathBuf> {
        None
    }
}

/// Lists directories on disk. Hidden entries are included and ignore files
/// are not consulted; symlinks count as directories when their target is one.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsDirectoryReader;

impl DirectoryReader for FsDirectoryReader {
    fn list(&self, dir: &Path) -> io::Result<Vec<FsEntry>> {
        if !std::fs::metadata(dir)?.is_dir() {
            return Err(io::Error::other(format!(
                "not a directory: {}",
                dir.display()
            )));
        }

        let walker = WalkBuilder::new(dir)
            .max_depth(Some(1))
            .hidden(false)
            .ignore(false)
            .parents(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .follow_links(false)
            .build();

        let mut entries = Vec::new();
        for result in walker {
            let entry = result.map_err(|e| {
                let message = e.to_string();
                e.into_io_error().unwrap_or_else(|| io::Error::other(message))
            })?;
            if entry.depth() == 0 {
                continue;
            }
            let path = entry.path().to_path_buf();
            let is_dir = match entry.file_type() {
                Some(ft) if ft.is_symlink() => {
                    std::fs::metadata(&path).is_ok_and(|m| m.is_dir())
                }
                Some(ft) => ft.is_dir(),
                None => false,
            };
            entries.push(FsEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path,
                is_dir,
            });
        }
        Ok(entries)
    }

    fn identity(&self, dir: &Path) -> Option<PathBuf> {
        std::fs::canonicalize(dir).ok()
    }
}

struct Frame {
    package: String,
    identity: Option<PathBuf>,
    pending: std::vec::IntoIter<FsEntry>,
}

fn list_or_empty<D: DirectoryReader + ?Sized>(reader: &D, dir: &Path) -> Vec<FsEntry> {
    match reader.list(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "cannot list directory, treating as empty");
            Vec::new()
        }
    }
}

/// Lists every class under `folder`, whose package is `package`.
///
/// Children whose names contain no `.` are sub-packages and are descended
/// into depth-first; `.class` files are emitted; anything else is skipped.
/// Output follows the reader's listing order exactly as a recursive walk
/// would, but the descent uses an explicit stack so nesting depth is bounded
/// only by memory. Unreadable directories contribute nothing. A directory
/// whose identity matches one already on the descent path (a symlink back to
/// an ancestor) is skipped; other symlinked directories are followed.
pub fn walk_directory<D: DirectoryReader + ?Sized>(
    reader: &D,
    folder: &Path,
    package: &str,
    deadline: Option<&Deadline>,
) -> Result<Vec<String>> {
    debug!(dir = %folder.display(), package, "walking directory");

    let mut classes = Vec::new();
    let mut stack = vec![Frame {
        package: package.to_string(),
        identity: reader.identity(folder),
        pending: list_or_empty(reader, folder).into_iter(),
    }];

    while let Some(frame) = stack.last_mut() {
        let Some(entry) = frame.pending.next() else {
            stack.pop();
            continue;
        };
        deadline::check(deadline)?;

        if entry.is_dir && !entry.name.contains('.') {
            let child = format!("{}.{}", frame.package, entry.name);
            let identity = reader.identity(&entry.path);
            if identity.is_some() && stack.iter().any(|f| f.identity == identity) {
                debug!(dir = %entry.path.display(), "directory cycle, skipped");
                continue;
            }
            trace!(package = %child, "descending");
            let pending = list_or_empty(reader, &entry.path).into_iter();
            stack.push(Frame {
                package: child,
                identity,
                pending,
            });
        } else if let Some(stem) = entry.name.strip_suffix(CLASS_SUFFIX) {
            let class_name = format!("{}.{stem}", frame.package);
            trace!(%class_name, "directory class");
            classes.push(class_name);
        }
    }

    debug!(dir = %folder.display(), found = classes.len(), "directory done");
    Ok(classes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    #[derive(Default)]
    struct MemoryTree(HashMap<PathBuf, Vec<FsEntry>>);

    impl MemoryTree {
        fn dir(mut self, path: &str, children: &[(&str, bool)]) -> Self {
            let base = PathBuf::from(path);
            let entries = children
                .iter()
                .map(|(name, is_dir)| FsEntry {
                    name: name.to_string(),
                    path: base.join(name),
                    is_dir: *is_dir,
                })
                .collect();
            self.0.insert(base, entries);
            self
        }
    }

    impl DirectoryReader for MemoryTree {
        fn list(&self, dir: &Path) -> io::Result<Vec<FsEntry>> {
            self.0
                .get(dir)
                .cloned()
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
        }
    }

    fn temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("{prefix}-{}-{nanos}", std::process::id()))
    }

    #[test]
    fn sub_package_classes_get_the_child_prefix() {
        let tree = MemoryTree::default()
            .dir("/cp/a/b", &[("c", true)])
            .dir("/cp/a/b/c", &[("D.class", false)]);
        let classes = walk_directory(&tree, Path::new("/cp/a/b"), "a.b", None).unwrap();
        assert_eq!(classes, vec!["a.b.c.D"]);
    }

    #[test]
    fn dotted_directories_are_not_descended() {
        let tree = MemoryTree::default()
            .dir("/cp/a/b", &[("v1.2", true), ("c", true), ("Top.class", false)])
            .dir("/cp/a/b/v1.2", &[("Hidden.class", false)])
            .dir("/cp/a/b/c", &[("D.class", false)]);
        let classes = walk_directory(&tree, Path::new("/cp/a/b"), "a.b", None).unwrap();
        assert_eq!(classes, vec!["a.b.c.D", "a.b.Top"]);
    }

    #[test]
    fn order_matches_a_recursive_walk() {
        let tree = MemoryTree::default()
            .dir("/r", &[("A.class", false), ("x", true), ("B.class", false), ("y", true)])
            .dir("/r/x", &[("X1.class", false), ("deep", true), ("X2.class", false)])
            .dir("/r/x/deep", &[("D.class", false)])
            .dir("/r/y", &[("Y.class", false)]);
        let classes = walk_directory(&tree, Path::new("/r"), "p", None).unwrap();
        assert_eq!(
            classes,
            vec!["p.A", "p.x.X1", "p.x.deep.D", "p.x.X2", "p.B", "p.y.Y"]
        );
    }

    #[test]
    fn class_suffixed_directories_are_emitted_not_descended() {
        let tree = MemoryTree::default()
            .dir("/r", &[("Odd.class", true)])
            .dir("/r/Odd.class", &[("Inner.class", false)]);
        let classes = walk_directory(&tree, Path::new("/r"), "p", None).unwrap();
        assert_eq!(classes, vec!["p.Odd"]);
    }

    #[test]
    fn non_class_files_are_ignored() {
        let tree = MemoryTree::default().dir(
            "/r",
            &[("notes.txt", false), ("Foo.java", false), ("Bar.class", false)],
        );
        let classes = walk_directory(&tree, Path::new("/r"), "p", None).unwrap();
        assert_eq!(classes, vec!["p.Bar"]);
    }

    #[test]
    fn unreadable_directories_contribute_nothing() {
        let tree = MemoryTree::default().dir("/r", &[("gone", true), ("A.class", false)]);
        let classes = walk_directory(&tree, Path::new("/r"), "p", None).unwrap();
        assert_eq!(classes, vec!["p.A"]);

        let missing = walk_directory(&tree, Path::new("/nowhere"), "p", None).unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn deep_nesting_does_not_recurse() {
        let mut tree = MemoryTree::default();
        let mut path = String::from("/r");
        let mut package = String::from("p");
        for depth in 0..2_000 {
            let child = format!("d{depth}");
            tree = tree.dir(&path, &[(child.as_str(), true)]);
            path = format!("{path}/{child}");
            package = format!("{package}.{child}");
        }
        tree = tree.dir(&path, &[("Leaf.class", false)]);

        let classes = walk_directory(&tree, Path::new("/r"), "p", None).unwrap();
        assert_eq!(classes, vec![format!("{package}.Leaf")]);
    }

    #[test]
    fn expired_deadline_stops_the_walk() {
        let tree = MemoryTree::default().dir("/r", &[("A.class", false)]);
        let deadline = Deadline::after(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(2));
        assert!(walk_directory(&tree, Path::new("/r"), "p", Some(&deadline)).is_err());
    }

    #[test]
    fn fs_reader_walks_real_directories() -> anyhow::Result<()> {
        let root = temp_dir("package-scanner-dir");
        let pkg = root.join("a/b");
        fs::create_dir_all(pkg.join("c"))?;
        fs::create_dir_all(pkg.join("v1.2"))?;
        fs::write(pkg.join("c/D.class"), b"")?;
        fs::write(pkg.join("v1.2/E.class"), b"")?;
        fs::write(pkg.join("README"), b"")?;

        let mut classes = walk_directory(&FsDirectoryReader, &pkg, "a.b", None)?;
        classes.sort();
        assert_eq!(classes, vec!["a.b.c.D"]);

        fs::remove_dir_all(root)?;
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn symlink_back_to_an_ancestor_is_not_followed() -> anyhow::Result<()> {
        let root = temp_dir("package-scanner-loop");
        let pkg = root.join("p");
        fs::create_dir_all(pkg.join("real"))?;
        fs::write(pkg.join("A.class"), b"")?;
        fs::write(pkg.join("real/R.class"), b"")?;
        std::os::unix::fs::symlink(&pkg, pkg.join("loop"))?;
        std::os::unix::fs::symlink(&pkg, pkg.join("real/up"))?;
        std::os::unix::fs::symlink(pkg.join("real"), pkg.join("alias"))?;

        let mut classes = walk_directory(&FsDirectoryReader, &pkg, "p", None)?;
        classes.sort();
        assert_eq!(classes, vec!["p.A", "p.alias.R", "p.real.R"]);

        fs::remove_dir_all(root)?;
        Ok(())
    }

    #[test]
    fn fs_reader_lists_hidden_entries_and_rejects_files() -> anyhow::Result<()> {
        let root = temp_dir("package-scanner-list");
        fs::create_dir_all(&root)?;
        fs::write(root.join(".Hidden.class"), b"")?;
        fs::write(root.join("plain.txt"), b"")?;

        let mut names: Vec<String> = FsDirectoryReader
            .list(&root)?
            .into_iter()
            .map(|e| e.name)
            .collect();
        names.sort();
        assert_eq!(names, vec![".Hidden.class", "plain.txt"]);
        assert!(FsDirectoryReader.list(&root.join("plain.txt")).is_err());

        fs::remove_dir_all(root)?;
        Ok(())
    }
}
