//! Local clone path
//!
//! When the source repository lives on this machine, its object store is
//! borrowed (`--shared`) or mirrored in place of a network fetch. Mirroring
//! hardlinks object files where possible and falls back to
//! timestamp-preserving copies.

use std::fs;
use std::path::{Component, Path, PathBuf};

use filetime::FileTime;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{CloneError, Result};
use crate::repo;

#[derive(Debug, Clone, Copy)]
pub struct LocalCloneOptions {
    pub shared: bool,
    pub no_hardlinks: bool,
    /// `--local` was given explicitly; a failed hardlink is then fatal
    /// instead of degrading to copies.
    pub local_explicit: bool,
    pub quiet: bool,
}

/// Resolve `.` and `..` lexically; alternates entries may name directories
/// that do not exist yet.
fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Rewrite the source's `info/alternates` into the destination.
///
/// Entries are appended (so a `--shared` entry survives) and relative paths
/// become absolute, resolved against the source's object directory.
fn copy_alternates(src_file: &Path, src_repo: &Path, dest_git_dir: &Path) -> Result<()> {
    let content = fs::read_to_string(src_file)?;
    for line in content.lines() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let entry = Path::new(line);
        let absolute = if entry.is_absolute() {
            normalize_path(entry)
        } else {
            normalize_path(&src_repo.join("objects").join(entry))
        };
        repo::add_to_alternates_file(dest_git_dir, &absolute)?;
    }
    Ok(())
}

fn copy_file_with_time(src: &Path, dest: &Path) -> Result<()> {
    fs::copy(src, dest).map_err(|err| CloneError::LocalCopyFailed {
        path: dest.display().to_string(),
        reason: err.to_string(),
    })?;
    let metadata = fs::metadata(src)?;
    let mtime = FileTime::from_last_modification_time(&metadata);
    filetime::set_file_mtime(dest, mtime).map_err(|err| CloneError::LocalCopyFailed {
        path: dest.display().to_string(),
        reason: err.to_string(),
    })?;
    Ok(())
}

fn mirror_object_store(
    src_repo: &Path,
    dest_git_dir: &Path,
    opts: &LocalCloneOptions,
) -> Result<()> {
    let src_objects = src_repo.join("objects");
    let dest_objects = dest_git_dir.join("objects");
    let mut use_hardlinks = !opts.no_hardlinks;

    let walker = WalkDir::new(&src_objects).into_iter().filter_entry(|entry| {
        // hidden directories (tmp object dirs and the like) are not mirrored
        !(entry.depth() > 0
            && entry.file_type().is_dir()
            && entry.file_name().to_string_lossy().starts_with('.'))
    });

    for entry in walker {
        let entry = entry.map_err(|err| CloneError::LocalCopyFailed {
            path: src_objects.display().to_string(),
            reason: err.to_string(),
        })?;
        let rel = entry
            .path()
            .strip_prefix(&src_objects)
            .expect("walkdir yields children of the root");
        let dest = dest_objects.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)?;
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }

        if rel == Path::new("info/alternates") {
            copy_alternates(entry.path(), src_repo, dest_git_dir)?;
            continue;
        }

        if dest.exists() {
            fs::remove_file(&dest)?;
        }
        if use_hardlinks {
            match fs::hard_link(entry.path(), &dest) {
                Ok(()) => continue,
                Err(_) if !opts.local_explicit => {
                    debug!(path = %dest.display(), "hardlink failed, copying instead");
                    use_hardlinks = false;
                }
                Err(_) => {
                    return Err(CloneError::LocalLinkFailed {
                        path: dest.display().to_string(),
                    });
                }
            }
        }
        copy_file_with_time(entry.path(), &dest)?;
    }

    Ok(())
}

/// Materialize the object graph from a local source repository.
pub fn clone_local(src_repo: &Path, dest_git_dir: &Path, opts: &LocalCloneOptions) -> Result<()> {
    if opts.shared {
        repo::add_to_alternates_file(dest_git_dir, &src_repo.join("objects"))?;
    } else {
        mirror_object_store(src_repo, dest_git_dir, opts)?;
    }
    if !opts.quiet {
        eprintln!("done.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn default_opts() -> LocalCloneOptions {
        LocalCloneOptions {
            shared: false,
            no_hardlinks: false,
            local_explicit: false,
            quiet: true,
        }
    }

    /// Source git dir with one committed blob in its loose object store.
    fn source_repo(temp: &TempDir) -> PathBuf {
        let work = temp.path().join("src");
        let repo = git2::Repository::init(&work).unwrap();
        fs::write(work.join("file.txt"), b"contents").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("file.txt")).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = git2::Signature::now("Test", "test@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();
        work.join(".git")
    }

    fn dest_git_dir(temp: &TempDir) -> PathBuf {
        let dest = temp.path().join("dest.git");
        git2::Repository::init_bare(&dest).unwrap();
        dest
    }

    fn loose_objects(objects: &Path) -> Vec<PathBuf> {
        WalkDir::new(objects)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().to_path_buf())
            .filter(|p| {
                let rel = p.strip_prefix(objects).unwrap();
                !rel.starts_with("info") && !rel.starts_with("pack")
            })
            .collect()
    }

    #[test]
    fn test_shared_adds_single_alternates_entry() {
        let temp = TempDir::new().unwrap();
        let src = source_repo(&temp);
        let dest = dest_git_dir(&temp);

        let opts = LocalCloneOptions {
            shared: true,
            ..default_opts()
        };
        clone_local(&src, &dest, &opts).unwrap();

        let alternates =
            fs::read_to_string(dest.join("objects").join("info").join("alternates")).unwrap();
        let entries: Vec<&str> = alternates.lines().collect();
        assert_eq!(entries, vec![src.join("objects").to_str().unwrap()]);
        assert!(
            loose_objects(&dest.join("objects")).is_empty(),
            "shared clone must not copy objects"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_mirror_hardlinks_objects() {
        use std::os::unix::fs::MetadataExt;

        let temp = TempDir::new().unwrap();
        let src = source_repo(&temp);
        let dest = dest_git_dir(&temp);

        clone_local(&src, &dest, &default_opts()).unwrap();

        let src_loose = loose_objects(&src.join("objects"));
        assert!(!src_loose.is_empty());
        for src_file in src_loose {
            let rel = src_file.strip_prefix(src.join("objects")).unwrap();
            let dest_file = dest.join("objects").join(rel);
            assert!(dest_file.exists(), "missing {}", dest_file.display());
            assert_eq!(
                fs::metadata(&src_file).unwrap().ino(),
                fs::metadata(&dest_file).unwrap().ino(),
                "expected a hardlink for {}",
                rel.display()
            );
        }
    }

    #[test]
    fn test_mirror_copies_without_hardlinks() {
        let temp = TempDir::new().unwrap();
        let src = source_repo(&temp);
        let dest = dest_git_dir(&temp);

        let opts = LocalCloneOptions {
            no_hardlinks: true,
            ..default_opts()
        };
        clone_local(&src, &dest, &opts).unwrap();

        for src_file in loose_objects(&src.join("objects")) {
            let rel = src_file.strip_prefix(src.join("objects")).unwrap();
            let dest_file = dest.join("objects").join(rel);
            assert_eq!(
                fs::read(&src_file).unwrap(),
                fs::read(&dest_file).unwrap(),
                "copy differs for {}",
                rel.display()
            );
            let src_mtime =
                FileTime::from_last_modification_time(&fs::metadata(&src_file).unwrap());
            let dest_mtime =
                FileTime::from_last_modification_time(&fs::metadata(&dest_file).unwrap());
            assert_eq!(src_mtime.unix_seconds(), dest_mtime.unix_seconds());
        }
    }

    #[test]
    fn test_hidden_directories_skipped() {
        let temp = TempDir::new().unwrap();
        let src = source_repo(&temp);
        let dest = dest_git_dir(&temp);

        let hidden = src.join("objects").join(".tmp-staging");
        fs::create_dir_all(&hidden).unwrap();
        fs::write(hidden.join("leftover"), b"junk").unwrap();

        clone_local(&src, &dest, &default_opts()).unwrap();
        assert!(!dest.join("objects").join(".tmp-staging").exists());
    }

    #[test]
    fn test_alternates_rewritten_not_copied() {
        let temp = TempDir::new().unwrap();
        let src = source_repo(&temp);
        let dest = dest_git_dir(&temp);

        let info = src.join("objects").join("info");
        fs::create_dir_all(&info).unwrap();
        fs::write(
            info.join("alternates"),
            "# comment\n\n../../../elsewhere/objects\n/abs/objects\n",
        )
        .unwrap();

        // a pre-existing entry (e.g. from --shared) must survive the append
        repo::add_to_alternates_file(&dest, Path::new("/pre/existing/objects")).unwrap();

        clone_local(&src, &dest, &default_opts()).unwrap();

        let alternates =
            fs::read_to_string(dest.join("objects").join("info").join("alternates")).unwrap();
        let entries: Vec<&str> = alternates.lines().collect();
        let expected_rel = normalize_path(&src.join("objects").join("../../../elsewhere/objects"));
        assert_eq!(
            entries,
            vec![
                "/pre/existing/objects",
                expected_rel.to_str().unwrap(),
                "/abs/objects",
            ]
        );
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/a/b/../c/./d")),
            PathBuf::from("/a/c/d")
        );
        assert_eq!(normalize_path(Path::new("a/../../b")), PathBuf::from("b"));
    }
}
