//! Config writing and recovery
//!
//! This module handles:
//! - Writing the remote block (url, fetch refspec, mirror flag)
//! - `-c key=value` passthrough into the new repository
//! - Branch tracking configuration
//! - Recovering `RemoteConfig` from an existing destination during resume

use std::path::{Path, PathBuf};

use git2::Config;
use tracing::debug;

use crate::error::{CloneError, Result};
use crate::refs::Ref;

/// Remote definition recovered from an existing destination.
#[derive(Debug, Default, Clone)]
pub struct RemoteConfig {
    pub name: Option<String>,
    pub url: Option<String>,
    pub fetch_pattern: Option<String>,
    pub worktree: Option<PathBuf>,
    pub bare: bool,
    pub mirror: bool,
}

impl RemoteConfig {
    /// Read the remote block plus `core.bare`/`core.worktree` from the
    /// destination's config. The first remote name wins; its recorded fetch
    /// pattern is trusted verbatim.
    pub fn read(git_dir: &Path) -> Result<Self> {
        let config = Config::open(&git_dir.join("config"))?.snapshot()?;
        let mut out = RemoteConfig::default();

        let mut entries = config.entries(None)?;
        while let Some(entry) = entries.next() {
            let entry = entry?;
            let (Some(name), Some(value)) = (entry.name(), entry.value()) else {
                continue;
            };
            if let Some(rest) = name.strip_prefix("remote.") {
                let Some((remote_name, key)) = rest.split_once('.') else {
                    continue;
                };
                if out.name.is_none() {
                    out.name = Some(remote_name.to_string());
                }
                if out.name.as_deref() != Some(remote_name) {
                    continue;
                }
                match key {
                    "url" => out.url = Some(value.to_string()),
                    "fetch" => out.fetch_pattern = Some(value.to_string()),
                    "mirror" => out.mirror = value == "true",
                    _ => {}
                }
            } else if name == "core.bare" {
                out.bare = value == "true";
            } else if name == "core.worktree" {
                let worktree = Path::new(value);
                out.worktree = Some(if worktree.is_absolute() {
                    worktree.to_path_buf()
                } else {
                    git_dir.join(worktree)
                });
            }
        }

        debug!(
            name = out.name.as_deref(),
            fetch = out.fetch_pattern.as_deref(),
            bare = out.bare,
            mirror = out.mirror,
            "recovered remote config"
        );
        Ok(out)
    }
}

fn config_err(err: git2::Error) -> CloneError {
    CloneError::ConfigWriteFailed {
        message: err.message().to_string(),
    }
}

pub fn set_remote_url(config: &mut Config, origin: &str, url: &str) -> Result<()> {
    config
        .set_str(&format!("remote.{origin}.url"), url)
        .map_err(config_err)
}

/// Write `-c key=value` parameters; a bare key means `true`, and repeated
/// keys append as multivars.
pub fn write_config_parameters(config: &mut Config, parameters: &[String]) -> Result<()> {
    for parameter in parameters {
        let (key, value) = match parameter.split_once('=') {
            Some((key, value)) => (key, value),
            None => (parameter.as_str(), "true"),
        };
        let valid = key.contains('.')
            && !key.starts_with('.')
            && !key.ends_with('.')
            && !key.is_empty();
        if !valid {
            return Err(CloneError::BadConfigParameter {
                parameter: parameter.clone(),
            });
        }
        config
            .set_multivar(key, "^$", value)
            .map_err(|_| CloneError::BadConfigParameter {
                parameter: parameter.clone(),
            })?;
    }
    Ok(())
}

/// Install upstream tracking for a local branch.
pub fn install_branch_config(
    config: &mut Config,
    branch: &str,
    origin: &str,
    remote_ref: &str,
) -> Result<()> {
    config
        .set_str(&format!("branch.{branch}.remote"), origin)
        .and_then(|()| config.set_str(&format!("branch.{branch}.merge"), remote_ref))
        .map_err(config_err)
}

/// Persist the remote's fetch refspec and mirror flag.
///
/// In single-branch mode the pattern collapses to one literal mapping; a
/// plain `--bare` clone records no pattern at all, so later fetches update
/// nothing by default.
#[allow(clippy::too_many_arguments)]
pub fn write_refspec_config(
    config: &mut Config,
    origin: &str,
    mirror: bool,
    bare: bool,
    single_branch: bool,
    branch: Option<&str>,
    our_head_points_at: Option<&Ref>,
    remote_head_points_at: Option<&Ref>,
    branch_top: &str,
    src_ref_prefix: &str,
) -> Result<()> {
    if !mirror && bare {
        return Ok(());
    }

    let value = if single_branch && !mirror {
        if let (Some(branch), Some(our)) = (branch, our_head_points_at) {
            if our.name.starts_with("refs/tags/") {
                Some(format!("+{0}:{0}", our.name))
            } else {
                Some(format!("+{}:{}{}", our.name, branch_top, branch))
            }
        } else if let Some(remote_head) = remote_head_points_at {
            let head = remote_head
                .name
                .strip_prefix("refs/heads/")
                .ok_or_else(|| CloneError::ConfigWriteFailed {
                    message: format!("remote HEAD points at non-head '{}'", remote_head.name),
                })?;
            Some(format!("+{}:{}{}", remote_head.name, branch_top, head))
        } else {
            // the next fetch will simply fetch from HEAD without updating
            // any remote-tracking branch
            None
        }
    } else {
        Some(format!("+{src_ref_prefix}*:{branch_top}*"))
    };

    if let Some(value) = value {
        config
            .set_multivar(&format!("remote.{origin}.fetch"), "^$", &value)
            .map_err(config_err)?;
        if mirror {
            config
                .set_bool(&format!("remote.{origin}.mirror"), true)
                .map_err(config_err)?;
        }
    }

    Ok(())
}
