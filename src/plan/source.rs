//! Source probing
//!
//! Resolves a source identifier to a local repository directory, a gitfile
//! indirection target, or a bundle file, before any transport is involved.

use std::fs;
use std::path::{Path, PathBuf};

/// Resolved source of a clone.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    /// URL (or absolute path) handed to the transport.
    pub url: String,
    /// Local repository or bundle path, when the source is on this machine.
    pub local_path: Option<PathBuf>,
    /// True when `local_path` names a bundle file rather than a repository.
    pub is_bundle: bool,
}

/// Minimal repository-directory test: HEAD plus objects/ and refs/.
pub fn is_git_directory(path: &Path) -> bool {
    path.join("HEAD").exists() && path.join("objects").is_dir() && path.join("refs").is_dir()
}

/// Follow a `gitdir: <path>` pointer file. Relative targets resolve against
/// the file's directory. Returns the target only if it is a repository.
pub fn read_gitfile(path: &Path) -> Option<PathBuf> {
    let content = fs::read_to_string(path).ok()?;
    let target = content.strip_prefix("gitdir: ")?.trim_end();
    let target = Path::new(target);
    let resolved = if target.is_absolute() {
        target.to_path_buf()
    } else {
        path.parent()?.join(target)
    };
    let resolved = fs::canonicalize(&resolved).ok()?;
    if is_git_directory(&resolved) {
        Some(resolved)
    } else {
        None
    }
}

fn probe_one(candidate: &str) -> Option<PathBuf> {
    let path = Path::new(candidate);
    let meta = fs::metadata(path).ok()?;
    if meta.is_dir() {
        if is_git_directory(path) {
            return fs::canonicalize(path).ok();
        }
        return None;
    }
    if meta.is_file() && meta.len() > 8 {
        let mut sig = [0u8; 8];
        use std::io::Read;
        let mut f = fs::File::open(path).ok()?;
        f.read_exact(&mut sig).ok()?;
        if &sig == b"gitdir: " {
            return read_gitfile(path);
        }
    }
    None
}

/// Probe `repo` for a local repository or bundle.
///
/// Repository suffixes are tried first (`/.git`, nothing, `.git/.git`,
/// `.git`), then bundle suffixes (`.bundle`, nothing). Returns the canonical
/// path and whether it is a bundle.
pub fn get_repo_path(repo: &str) -> Option<(PathBuf, bool)> {
    for suffix in ["/.git", "", ".git/.git", ".git"] {
        if let Some(found) = probe_one(&format!("{repo}{suffix}")) {
            return Some((found, false));
        }
    }

    for suffix in [".bundle", ""] {
        let candidate = format!("{repo}{suffix}");
        let path = Path::new(&candidate);
        if path.is_file() {
            if let Ok(canon) = fs::canonicalize(path) {
                return Some((canon, true));
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn init_repo(path: &Path) {
        git2::Repository::init(path).unwrap();
    }

    #[test]
    fn test_probe_work_tree_finds_dot_git() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("src");
        init_repo(&repo);

        let (found, is_bundle) = get_repo_path(repo.to_str().unwrap()).unwrap();
        assert!(!is_bundle);
        assert!(found.ends_with(".git"), "found {}", found.display());
        assert!(is_git_directory(&found));
    }

    #[test]
    fn test_probe_bare_directory() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("bare.git");
        git2::Repository::init_bare(&repo).unwrap();

        let (found, is_bundle) = get_repo_path(repo.to_str().unwrap()).unwrap();
        assert!(!is_bundle);
        assert_eq!(found, fs::canonicalize(&repo).unwrap());
    }

    #[test]
    fn test_probe_bundle_suffix() {
        let temp = TempDir::new().unwrap();
        let bundle = temp.path().join("snapshot.bundle");
        fs::write(&bundle, b"not really a bundle").unwrap();

        let base = temp.path().join("snapshot");
        let (found, is_bundle) = get_repo_path(base.to_str().unwrap()).unwrap();
        assert!(is_bundle);
        assert_eq!(found, fs::canonicalize(&bundle).unwrap());
    }

    #[test]
    fn test_probe_missing_source() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        assert!(get_repo_path(missing.to_str().unwrap()).is_none());
    }

    #[test]
    fn test_gitfile_indirection() {
        let temp = TempDir::new().unwrap();
        let real = temp.path().join("real-git");
        init_repo(&real);
        let real_git = fs::canonicalize(real.join(".git")).unwrap();

        let tree = temp.path().join("tree");
        fs::create_dir(&tree).unwrap();
        fs::write(
            tree.join(".git"),
            format!("gitdir: {}\n", real_git.display()),
        )
        .unwrap();

        let (found, is_bundle) = get_repo_path(tree.to_str().unwrap()).unwrap();
        assert!(!is_bundle);
        assert_eq!(found, real_git);
    }

    #[test]
    fn test_gitfile_with_bogus_target() {
        let temp = TempDir::new().unwrap();
        let tree = temp.path().join("tree");
        fs::create_dir(&tree).unwrap();
        fs::write(tree.join(".git"), "gitdir: /does/not/exist\n").unwrap();

        assert!(get_repo_path(tree.to_str().unwrap()).is_none());
    }
}
