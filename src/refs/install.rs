//! Reference installation
//!
//! Installs the mapped ref set atomically, writes follow-tags, the remote
//! HEAD tracking symref, and the local HEAD.

use git2::{ObjectType, Oid, Repository};
use tracing::debug;

use super::{Ref, RefSet};
use crate::config;
use crate::error::{CloneError, Result};

fn transaction_err(err: git2::Error) -> CloneError {
    CloneError::RefTransactionFailed {
        message: err.message().to_string(),
    }
}

/// Install the mapped refs in one transaction: a reader sees either all of
/// them or none.
pub fn install_refs(repo: &Repository, mapped: &[Ref], reflog_msg: &str) -> Result<()> {
    let mut tx = repo.transaction().map_err(transaction_err)?;
    let mut created = 0usize;
    for r in mapped {
        let Some(peer) = &r.peer_name else {
            continue;
        };
        if repo.find_reference(peer).is_ok() {
            continue;
        }
        tx.lock_ref(peer)
            .and_then(|()| tx.set_target(peer, r.oid, None, reflog_msg))
            .map_err(transaction_err)?;
        created += 1;
    }
    tx.commit().map_err(transaction_err)?;
    debug!(created, "installed mapped refs");
    Ok(())
}

/// Write `refs/tags/*` for advertised tags whose object made it into the
/// local store (single-branch clones fetch history-reachable tags only).
pub fn write_followtags(repo: &Repository, advertised: &RefSet, reflog_msg: &str) -> Result<()> {
    let odb = repo.odb()?;
    for r in advertised.iter() {
        if !r.name.starts_with("refs/tags/") || r.name.ends_with("^{}") {
            continue;
        }
        if !odb.exists(r.oid) {
            continue;
        }
        repo.reference(&r.name, r.oid, true, reflog_msg)
            .map_err(|err| CloneError::RefUpdateFailed {
                name: r.name.clone(),
                message: err.message().to_string(),
            })?;
    }
    Ok(())
}

/// Create `<branch_top>HEAD` as a symref to the tracking branch the remote
/// HEAD resolves to.
pub fn create_tracking_head_symref(
    repo: &Repository,
    branch_top: &str,
    peer_name: &str,
    reflog_msg: &str,
) -> Result<()> {
    let name = format!("{branch_top}HEAD");
    repo.reference_symbolic(&name, peer_name, true, reflog_msg)
        .map_err(|err| CloneError::RefUpdateFailed {
            name,
            message: err.message().to_string(),
        })?;
    Ok(())
}

fn peel_to_commit(repo: &Repository, oid: Oid) -> Result<Oid> {
    let object = repo.find_object(oid, None)?;
    Ok(object.peel(ObjectType::Commit)?.id())
}

fn head_err(err: git2::Error) -> CloneError {
    CloneError::RefUpdateFailed {
        name: "HEAD".to_string(),
        message: err.message().to_string(),
    }
}

/// Point the local HEAD at the chosen ref: a symref plus tracking config for
/// a branch, a detached HEAD for a tag or an unresolvable remote HEAD.
pub fn update_head(
    repo: &Repository,
    our: Option<&Ref>,
    remote: Option<&Ref>,
    origin: &str,
    bare: bool,
    reflog_msg: &str,
) -> Result<()> {
    if let Some(our) = our {
        if let Some(head) = our.name.strip_prefix("refs/heads/") {
            repo.reference_symbolic("HEAD", &our.name, true, reflog_msg)
                .map_err(head_err)?;
            if !bare {
                repo.reference(&our.name, our.oid, true, reflog_msg)
                    .map_err(|err| CloneError::RefUpdateFailed {
                        name: our.name.clone(),
                        message: err.message().to_string(),
                    })?;
                let mut cfg = repo.config()?;
                config::install_branch_config(&mut cfg, head, origin, &our.name)?;
            }
        } else {
            // --branch named a non-branch (a tag); detach
            let commit = peel_to_commit(repo, our.oid)?;
            repo.set_head_detached(commit).map_err(head_err)?;
        }
    } else if let Some(remote) = remote {
        // remote HEAD points at a non-branch or an unknown branch; detach
        let commit = peel_to_commit(repo, remote.oid)?;
        repo.set_head_detached(commit).map_err(head_err)?;
    }
    Ok(())
}
