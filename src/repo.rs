//! Destination repository plumbing
//!
//! This module handles:
//! - Initializing the destination repository (bare, templated, separate
//!   git dir)
//! - The alternates file
//! - Validating and attaching `--reference` repositories

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use git2::{Repository, RepositoryInitOptions};
use tracing::debug;

use crate::error::{CloneError, Result};
use crate::plan::{read_gitfile, DestinationLayout};

/// Initialize the destination repository described by `layout`.
pub fn init_destination(layout: &DestinationLayout, template: Option<&Path>) -> Result<Repository> {
    let mut opts = RepositoryInitOptions::new();
    opts.bare(layout.bare);
    opts.mkdir(true);
    opts.mkpath(true);
    if let Some(template) = template {
        opts.external_template(true);
        opts.template_path(template);
    }
    if !layout.bare {
        if let Some(work_tree) = &layout.work_tree {
            // the work tree exists by now; an absolute path keeps libgit2
            // from resolving it against the git dir
            let work_tree = fs::canonicalize(work_tree)?;
            opts.workdir_path(&work_tree);
        }
    }
    let repo = Repository::init_opts(&layout.git_dir, &opts)?;
    debug!(
        git_dir = %layout.git_dir.display(),
        bare = layout.bare,
        separate = layout.separate_git_dir.is_some(),
        "initialized destination"
    );
    Ok(repo)
}

/// Append one entry to `objects/info/alternates`, keeping existing entries.
pub fn add_to_alternates_file(git_dir: &Path, objects_path: &Path) -> Result<()> {
    let info_dir = git_dir.join("objects").join("info");
    fs::create_dir_all(&info_dir)?;
    let alternates = info_dir.join("alternates");

    let entry = objects_path.display().to_string();
    if let Ok(existing) = fs::read_to_string(&alternates) {
        if existing.lines().any(|line| line == entry) {
            return Ok(());
        }
    }

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&alternates)?;
    writeln!(file, "{entry}")?;
    Ok(())
}

pub fn alternates_path(git_dir: &Path) -> PathBuf {
    git_dir.join("objects").join("info").join("alternates")
}

/// Validate one `--reference` repository and resolve its object directory.
///
/// Follows a `gitdir:` pointer, rejects linked checkouts, and refuses
/// shallow or grafted references outright.
pub fn validate_reference(reference: &str) -> Result<PathBuf> {
    let not_local = || CloneError::ReferenceNotLocal {
        path: reference.to_string(),
    };

    let real = fs::canonicalize(reference).map_err(|_| not_local())?;

    let mut ref_git = real.clone();
    if let Some(target) = read_gitfile(&real).or_else(|| read_gitfile(&real.join(".git"))) {
        ref_git = target;
    } else if real.join(".git").join("objects").is_dir() {
        ref_git = real.join(".git");
    } else if !real.join("objects").is_dir() {
        if real.join("commondir").exists() || real.join(".git").join("commondir").exists() {
            return Err(CloneError::ReferenceLinkedCheckout {
                path: reference.to_string(),
            });
        }
        return Err(not_local());
    }

    if ref_git.join("commondir").exists() {
        return Err(CloneError::ReferenceLinkedCheckout {
            path: reference.to_string(),
        });
    }
    if ref_git.join("shallow").exists() {
        return Err(CloneError::ReferenceShallow {
            path: reference.to_string(),
        });
    }
    if ref_git.join("info").join("grafts").exists() {
        return Err(CloneError::ReferenceGrafted {
            path: reference.to_string(),
        });
    }

    Ok(ref_git.join("objects"))
}

/// Validate every reference repository up front; nothing on disk has been
/// created when this runs.
pub fn validate_references(references: &[String]) -> Result<Vec<PathBuf>> {
    references.iter().map(|r| validate_reference(r)).collect()
}

/// Attach validated reference object directories to the destination.
pub fn setup_references(git_dir: &Path, object_dirs: &[PathBuf]) -> Result<()> {
    for dir in object_dirs {
        add_to_alternates_file(git_dir, dir)?;
    }
    Ok(())
}

/// `--dissociate`: repack everything borrowed, then drop the alternates.
pub fn dissociate_from_references(git_dir: &Path) -> Result<()> {
    let alternates = alternates_path(git_dir);
    if !alternates.exists() {
        return Ok(());
    }
    let status = Command::new("git")
        .args(["repack", "-a", "-d"])
        .current_dir(git_dir)
        .stdin(Stdio::null())
        .status();
    match status {
        Ok(status) if status.success() => {}
        _ => return Err(CloneError::RepackFailed),
    }
    fs::remove_file(&alternates)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_alternates_appends_and_dedups() {
        let temp = TempDir::new().unwrap();
        let git_dir = temp.path().join("dest.git");
        git2::Repository::init_bare(&git_dir).unwrap();

        add_to_alternates_file(&git_dir, Path::new("/a/objects")).unwrap();
        add_to_alternates_file(&git_dir, Path::new("/b/objects")).unwrap();
        add_to_alternates_file(&git_dir, Path::new("/a/objects")).unwrap();

        let content = fs::read_to_string(alternates_path(&git_dir)).unwrap();
        assert_eq!(content, "/a/objects\n/b/objects\n");
    }

    #[test]
    fn test_validate_reference_work_tree() {
        let temp = TempDir::new().unwrap();
        let reference = temp.path().join("ref");
        git2::Repository::init(&reference).unwrap();

        let objects = validate_reference(reference.to_str().unwrap()).unwrap();
        assert!(objects.ends_with(".git/objects"));
        assert!(objects.is_dir());
    }

    #[test]
    fn test_validate_reference_bare() {
        let temp = TempDir::new().unwrap();
        let reference = temp.path().join("ref.git");
        git2::Repository::init_bare(&reference).unwrap();

        let objects = validate_reference(reference.to_str().unwrap()).unwrap();
        assert_eq!(objects, fs::canonicalize(&reference).unwrap().join("objects"));
    }

    #[test]
    fn test_validate_reference_missing() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("gone");
        let err = validate_reference(missing.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, CloneError::ReferenceNotLocal { .. }));
    }

    #[test]
    fn test_validate_reference_shallow_rejected() {
        let temp = TempDir::new().unwrap();
        let reference = temp.path().join("ref");
        git2::Repository::init(&reference).unwrap();
        fs::write(reference.join(".git").join("shallow"), b"deadbeef\n").unwrap();

        let err = validate_reference(reference.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, CloneError::ReferenceShallow { .. }));
    }

    #[test]
    fn test_validate_reference_grafted_rejected() {
        let temp = TempDir::new().unwrap();
        let reference = temp.path().join("ref");
        git2::Repository::init(&reference).unwrap();
        let grafts = reference.join(".git").join("info");
        fs::create_dir_all(&grafts).unwrap();
        fs::write(grafts.join("grafts"), b"\n").unwrap();

        let err = validate_reference(reference.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, CloneError::ReferenceGrafted { .. }));
    }

    #[test]
    fn test_validate_reference_linked_checkout_rejected() {
        let temp = TempDir::new().unwrap();
        // shape of a worktree-private git dir: a gitdir pointer next to a
        // commondir file
        let link_dir = temp.path().join("wt");
        fs::create_dir_all(&link_dir).unwrap();
        fs::write(link_dir.join("commondir"), b"../..\n").unwrap();

        let err = validate_reference(link_dir.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, CloneError::ReferenceLinkedCheckout { .. }));
    }

    #[test]
    fn test_init_destination_bare() {
        let temp = TempDir::new().unwrap();
        let layout = DestinationLayout {
            dir: "x.git".to_string(),
            git_dir: temp.path().join("x.git"),
            work_tree: None,
            bare: true,
            separate_git_dir: None,
            is_resume: false,
            dest_exists: false,
        };
        let repo = init_destination(&layout, None).unwrap();
        assert!(repo.is_bare());
        let config = repo.config().unwrap();
        assert!(config.get_bool("core.bare").unwrap());
    }

    #[test]
    fn test_init_destination_separate_git_dir() {
        let temp = TempDir::new().unwrap();
        let work_tree = temp.path().join("tree");
        fs::create_dir_all(&work_tree).unwrap();
        let layout = DestinationLayout {
            dir: "tree".to_string(),
            git_dir: temp.path().join("meta"),
            work_tree: Some(work_tree.clone()),
            bare: false,
            separate_git_dir: Some(temp.path().join("meta")),
            is_resume: false,
            dest_exists: true,
        };
        let repo = init_destination(&layout, None).unwrap();
        assert!(!repo.is_bare());
        // the work tree carries a gitdir pointer at .git
        let dot_git = work_tree.join(".git");
        assert!(dot_git.is_file());
        let content = fs::read_to_string(dot_git).unwrap();
        assert!(content.starts_with("gitdir: "));
    }
}
