//! Reference planning
//!
//! Computes, from the advertised ref set plus a refspec and options, the
//! local ref set to install, the resolved remote HEAD, and the ref our own
//! HEAD should end up on.

use tracing::debug;

use super::{Ref, RefSet, Refspec};
use crate::error::{CloneError, Result};

#[derive(Debug, Clone, Copy)]
pub struct PlanOptions<'a> {
    pub single_branch: bool,
    pub branch: Option<&'a str>,
    pub mirror: bool,
    pub origin: &'a str,
}

/// Outcome of reference planning.
#[derive(Debug, Default)]
pub struct RefPlan {
    /// The local ref set: advertised refs with `peer_name` populated. The
    /// advertised HEAD rides along peer-less so its object is wanted.
    pub mapped: Vec<Ref>,
    /// The advertised HEAD, verbatim.
    pub remote_head: Option<Ref>,
    /// The mapped branch the remote HEAD resolves to.
    pub remote_head_points_at: Option<Ref>,
    /// The ref our HEAD should point at (user branch, else remote HEAD).
    pub our_head_points_at: Option<Ref>,
}

/// Search for `refs/heads/<branch>`, then `refs/tags/<branch>`.
fn find_branch<'a>(refs: &'a [Ref], branch: &str) -> Option<&'a Ref> {
    let head_name = format!("refs/heads/{branch}");
    let tag_name = format!("refs/tags/{branch}");
    refs.iter()
        .find(|r| r.name == head_name)
        .or_else(|| refs.iter().find(|r| r.name == tag_name))
}

/// Resolve which advertised branch the remote HEAD points at: the symref
/// hint when present, else `refs/heads/master` on an oid match, else the
/// first branch sharing HEAD's oid.
fn guess_remote_head<'a>(head: Option<&Ref>, candidates: &'a [Ref]) -> Option<&'a Ref> {
    let head = head?;
    if let Some(target) = &head.symref_target {
        return candidates.iter().find(|r| &r.name == target);
    }
    candidates
        .iter()
        .find(|r| r.name == "refs/heads/master" && r.oid == head.oid)
        .or_else(|| {
            candidates
                .iter()
                .find(|r| r.name.starts_with("refs/heads/") && r.oid == head.oid)
        })
}

fn map_through(r: &Ref, refspec: &Refspec, out: &mut Vec<Ref>) {
    if let Some(peer) = refspec.map_name(&r.name) {
        let mut mapped = r.clone();
        mapped.peer_name = Some(peer);
        out.push(mapped);
    }
}

/// Compute the local ref set for the advertised refs under the given rule.
pub fn plan_refs(refs: &RefSet, refspec: &Refspec, opts: PlanOptions<'_>) -> Result<RefPlan> {
    let tag_refspec = Refspec::tags();
    let head = refs.head().cloned();
    let mut mapped: Vec<Ref> = Vec::new();

    if opts.single_branch {
        if let Some(branch) = opts.branch {
            let chosen = find_branch(refs.as_slice(), branch).ok_or_else(|| {
                CloneError::RemoteBranchNotFound {
                    branch: branch.to_string(),
                    origin: opts.origin.to_string(),
                }
            })?;
            map_through(chosen, refspec, &mut mapped);
            // an explicit tag request is materialized through the tag rule
            map_through(chosen, &tag_refspec, &mut mapped);
        } else {
            if let Some(head) = &head {
                mapped.push(head.clone());
            }
            if let Some(remote_head) = guess_remote_head(head.as_ref(), refs.as_slice()) {
                map_through(remote_head, refspec, &mut mapped);
                map_through(remote_head, &tag_refspec, &mut mapped);
            }
        }
    } else {
        if let Some(head) = &head {
            mapped.push(head.clone());
        }
        for r in refs.iter() {
            map_through(r, refspec, &mut mapped);
        }
    }

    if !opts.mirror && !opts.single_branch {
        for r in refs.iter() {
            map_through(r, &tag_refspec, &mut mapped);
        }
    }

    let remote_head_points_at = guess_remote_head(head.as_ref(), &mapped).cloned();

    let our_head_points_at = match opts.branch {
        Some(branch) => Some(
            find_branch(&mapped, branch)
                .cloned()
                .ok_or_else(|| CloneError::RemoteBranchNotFound {
                    branch: branch.to_string(),
                    origin: opts.origin.to_string(),
                })?,
        ),
        None => remote_head_points_at.clone(),
    };

    debug!(
        mapped = mapped.len(),
        remote_head = remote_head_points_at.as_ref().map(|r| r.name.as_str()),
        our_head = our_head_points_at.as_ref().map(|r| r.name.as_str()),
        "planned local ref set"
    );

    Ok(RefPlan {
        mapped,
        remote_head: head,
        remote_head_points_at,
        our_head_points_at,
    })
}
