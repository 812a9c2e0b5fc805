//! Destination planning
//!
//! Turns a source identifier plus the clone options into a
//! `DestinationLayout`: where metadata lives, where the work tree lives, and
//! whether the invocation resumes an earlier clone.

pub mod guess;
pub mod source;

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::RemoteConfig;
use crate::error::{CloneError, Result};
use crate::junk;

pub use guess::{guess_dir_name, strip_trailing_slashes};
pub use source::{get_repo_path, is_git_directory, read_gitfile, SourceSpec};

/// Where the new repository's pieces land. Frozen after planning; the
/// orchestrator only hands its paths to the junk tracker.
#[derive(Debug, Clone)]
pub struct DestinationLayout {
    /// Destination as shown to the user (the `<dir>` argument or the guess).
    pub dir: String,
    /// Where repository metadata lives.
    pub git_dir: PathBuf,
    /// Work tree, absent for bare repositories.
    pub work_tree: Option<PathBuf>,
    pub bare: bool,
    /// Set when `--separate-git-dir` redirected the metadata.
    pub separate_git_dir: Option<PathBuf>,
    pub is_resume: bool,
    /// The destination directory already existed (as an empty directory).
    pub dest_exists: bool,
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

/// Resolve the source identifier; local probing happens before any transport
/// is involved. A `:`-free identifier that matches nothing locally is fatal.
pub fn resolve_source(repo_name: &str) -> Result<SourceSpec> {
    if let Some((path, is_bundle)) = get_repo_path(repo_name) {
        let url = fs::canonicalize(repo_name)
            .unwrap_or_else(|_| PathBuf::from(repo_name))
            .display()
            .to_string();
        return Ok(SourceSpec {
            url,
            local_path: Some(path),
            is_bundle,
        });
    }
    if !repo_name.contains(':') {
        return Err(CloneError::SourceMissing {
            repo: repo_name.to_string(),
        });
    }
    Ok(SourceSpec {
        url: repo_name.to_string(),
        local_path: None,
        is_bundle: false,
    })
}

/// Plan a fresh (non-resume) destination.
pub fn plan_new(
    repo_name: &str,
    dir_arg: Option<&str>,
    is_bundle: bool,
    bare: bool,
    separate_git_dir: Option<&Path>,
) -> Result<DestinationLayout> {
    let dir = match dir_arg {
        Some(d) => strip_trailing_slashes(d),
        None => strip_trailing_slashes(&guess_dir_name(repo_name, is_bundle, bare)?),
    };

    let dest = Path::new(&dir);
    let dest_exists = dest.exists();
    if dest_exists && !is_empty_dir(dest) {
        return Err(CloneError::DestinationNotEmpty { path: dir });
    }

    let env_work_tree = if bare {
        None
    } else {
        std::env::var_os("GIT_WORK_TREE").map(PathBuf::from)
    };
    if let Some(wt) = &env_work_tree {
        if wt.exists() {
            return Err(CloneError::WorkTreeExists {
                path: wt.display().to_string(),
            });
        }
    }

    let (git_dir, work_tree) = if bare {
        (PathBuf::from(&dir), None)
    } else if let Some(wt) = env_work_tree {
        (PathBuf::from(&dir), Some(wt))
    } else {
        (dest.join(".git"), Some(PathBuf::from(&dir)))
    };

    let (git_dir, separate) = match separate_git_dir {
        Some(real) => (real.to_path_buf(), Some(real.to_path_buf())),
        None => (git_dir, None),
    };

    Ok(DestinationLayout {
        dir,
        git_dir,
        work_tree,
        bare,
        separate_git_dir: separate,
        is_resume: false,
        dest_exists,
    })
}

/// Create the destination directories and register them as junk, before any
/// further side effect touches the disk.
pub fn create_destination(layout: &DestinationLayout) -> Result<()> {
    if let Some(work_tree) = &layout.work_tree {
        if let Some(parent) = work_tree.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        if !layout.dest_exists {
            fs::create_dir(work_tree)?;
        }
        junk::set_work_tree(work_tree);
    }

    if let Some(parent) = layout.git_dir.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    junk::set_git_dir(&layout.git_dir);

    Ok(())
}

/// Recover the layout of an interrupted clone for `--resume`.
///
/// The recorded remote configuration is trusted verbatim: name, fetch
/// pattern, mirror and bare flags come from the destination's config, not
/// from current defaults.
pub fn recover_existing(dir_arg: &str) -> Result<(DestinationLayout, RemoteConfig)> {
    let dir = strip_trailing_slashes(dir_arg);
    let dest = Path::new(&dir);
    if !dest.exists() {
        return Err(CloneError::ResumeTargetMissing { path: dir });
    }
    let canonical = fs::canonicalize(dest)?;

    let (git_dir, mut work_tree) = if is_git_directory(&canonical) {
        (canonical.clone(), None)
    } else if canonical.join(".git").exists() {
        let dot_git = canonical.join(".git");
        let git_dir = if dot_git.is_dir() && is_git_directory(&dot_git) {
            fs::canonicalize(&dot_git)?
        } else if let Some(target) = read_gitfile(&dot_git) {
            target
        } else {
            return Err(CloneError::NotARepository { path: dir });
        };
        (git_dir, Some(canonical.clone()))
    } else {
        return Err(CloneError::NotARepository { path: dir });
    };

    let remote_config = RemoteConfig::read(&git_dir)?;

    if work_tree.is_none() {
        if let Some(configured) = &remote_config.worktree {
            work_tree = Some(configured.clone());
        } else if !remote_config.bare {
            let candidate = git_dir
                .file_name()
                .filter(|name| name.to_str() == Some(".git"))
                .and_then(|_| git_dir.parent())
                .filter(|parent| parent.is_dir())
                .map(Path::to_path_buf);
            match candidate {
                Some(parent) => work_tree = Some(parent),
                None => return Err(CloneError::WorkTreeCandidateMissing { path: dir }),
            }
        }
    }

    Ok((
        DestinationLayout {
            dir,
            git_dir,
            work_tree,
            bare: remote_config.bare,
            separate_git_dir: None,
            is_resume: true,
            dest_exists: true,
        },
        remote_config,
    ))
}
