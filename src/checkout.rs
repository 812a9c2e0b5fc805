//! Working-tree population
//!
//! This module handles:
//! - Checking out the resolved HEAD into the new work tree
//! - Dispatching the nested submodule update

use std::path::Path;
use std::process::Command;

use git2::build::CheckoutBuilder;
use git2::Repository;
use tracing::debug;

use crate::error::{CloneError, Result};
use crate::ui;

#[derive(Debug, Clone, Copy)]
pub struct CheckoutOptions {
    pub no_checkout: bool,
    pub recursive: bool,
    pub verbosity: i32,
}

fn checkout_err(err: git2::Error) -> CloneError {
    CloneError::CheckoutFailed {
        message: err.message().to_string(),
    }
}

/// Populate the work tree from HEAD. A failure here leaves the repository
/// itself intact and usable.
pub fn checkout(work_tree: &Path, opts: &CheckoutOptions) -> Result<()> {
    if opts.no_checkout {
        return Ok(());
    }

    let repo = Repository::open(work_tree).map_err(checkout_err)?;
    let head = match repo.head() {
        Ok(head) => head,
        Err(_) => {
            ui::warning("remote HEAD refers to nonexistent ref, unable to checkout");
            return Ok(());
        }
    };

    if repo.head_detached().map_err(checkout_err)? {
        if opts.verbosity >= 0 {
            if let Some(oid) = head.target() {
                ui::note(&format!("Note: checking out '{oid}' as a detached HEAD."));
            }
        }
    } else if !head
        .name()
        .map(|name| name.starts_with("refs/heads/"))
        .unwrap_or(false)
    {
        return Err(CloneError::CheckoutFailed {
            message: "HEAD not found below refs/heads".to_string(),
        });
    }

    let mut builder = CheckoutBuilder::new();
    builder.force();
    repo.checkout_head(Some(&mut builder)).map_err(checkout_err)?;
    debug!(work_tree = %work_tree.display(), "checked out work tree");

    if opts.recursive {
        let status = Command::new("git")
            .args(["submodule", "update", "--init", "--recursive"])
            .current_dir(work_tree)
            .status();
        match status {
            Ok(status) if status.success() => {}
            Ok(status) => {
                return Err(CloneError::CheckoutFailed {
                    message: format!("submodule update exited with {status}"),
                });
            }
            Err(err) => {
                return Err(CloneError::CheckoutFailed {
                    message: format!("could not run submodule update: {err}"),
                });
            }
        }
    }

    Ok(())
}
