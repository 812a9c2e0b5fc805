//! Common test utilities for primeclone integration tests

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

pub struct CloneFixture {
    #[allow(dead_code)]
    pub temp: TempDir,
    pub path: PathBuf,
}

impl CloneFixture {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = temp.path().to_path_buf();
        Self { temp, path }
    }

    /// A `primeclone` command running inside the fixture directory.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("primeclone").unwrap();
        cmd.current_dir(&self.path);
        cmd
    }

    /// Create a source repository with one commit, a `dev` branch and a
    /// `v1` tag. Returns its work-tree path.
    pub fn create_source_repo(&self, name: &str) -> PathBuf {
        let work = self.path.join(name);
        let repo = git2::Repository::init(&work).expect("Failed to init source repo");

        std::fs::write(work.join("file.txt"), b"contents\n").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("file.txt")).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = git2::Signature::now("Test", "test@example.com").unwrap();
        let commit_id = repo
            .commit(Some("HEAD"), &sig, &sig, "initial commit", &tree, &[])
            .unwrap();

        let commit = repo.find_commit(commit_id).unwrap();
        repo.branch("dev", &commit, false).unwrap();
        repo.reference("refs/tags/v1", commit_id, false, "tag v1")
            .unwrap();

        work
    }

    /// Name of the default branch a fixture repo was created with.
    #[allow(dead_code)]
    pub fn default_branch(&self, work: &Path) -> String {
        let repo = git2::Repository::open(work).unwrap();
        let head = repo.head().unwrap();
        head.shorthand().unwrap().to_string()
    }

    /// Head commit id of a fixture repo.
    #[allow(dead_code)]
    pub fn head_oid(&self, work: &Path) -> git2::Oid {
        let repo = git2::Repository::open(work).unwrap();
        let oid = repo.head().unwrap().target().unwrap();
        oid
    }

    /// Read a config value out of a cloned repository.
    #[allow(dead_code)]
    pub fn config_value(&self, repo_path: &Path, key: &str) -> Option<String> {
        let repo = git2::Repository::open(repo_path).ok()?;
        let config = repo.config().ok()?.snapshot().ok()?;
        config.get_string(key).ok()
    }
}
