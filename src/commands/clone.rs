//! Clone orchestration
//!
//! Sequences the whole operation: destination planning, junk registration,
//! repository initialization, primer adoption, object transfer (local copy
//! or fetch), atomic ref install, HEAD update, and checkout. Cleanup policy
//! on every exit path is owned by the junk tracker.

use std::path::PathBuf;

use git2::{Oid, Repository};
use tracing::debug;

use crate::checkout::{self, CheckoutOptions};
use crate::cli::CloneOptions;
use crate::config;
use crate::error::{CloneError, Result};
use crate::junk::{self, JunkMode};
use crate::local_clone::{self, LocalCloneOptions};
use crate::plan::{self, DestinationLayout};
use crate::primer;
use crate::refs::{self, install, PlanOptions, RefPlan, Refspec};
use crate::repo;
use crate::transport::{git::check_connected, AltResource, GitTransport, Transport, TransportOption};
use crate::ui;

/// Everything the planning stage decides before the transport is touched.
struct ClonePlan {
    layout: DestinationLayout,
    source_url: String,
    local_probe: Option<(PathBuf, bool)>,
    refspec: Refspec,
    src_ref_prefix: &'static str,
    branch_top: String,
    alt_res: Option<AltResource>,
    reflog_msg: String,
}

fn plan_resume(opts: &mut CloneOptions) -> Result<ClonePlan> {
    let (layout, past) = plan::recover_existing(&opts.repo)?;

    // the recorded remote definition is trusted over current defaults
    if let Some(name) = past.name.clone() {
        opts.origin = name;
    }
    opts.mirror = past.mirror;
    opts.bare = past.bare;
    if layout.work_tree.is_none() {
        opts.no_checkout = true;
    }

    let source_url = past.url.clone().ok_or_else(|| CloneError::Git {
        message: format!("remote.{}.url is not configured in '{}'", opts.origin, layout.dir),
    })?;

    let src_ref_prefix: &'static str = if opts.mirror { "refs/" } else { "refs/heads/" };
    let branch_top = if opts.bare {
        src_ref_prefix.to_string()
    } else {
        format!("refs/remotes/{}/", opts.origin)
    };
    let pattern = past
        .fetch_pattern
        .clone()
        .unwrap_or_else(|| format!("+{src_ref_prefix}*:{branch_top}*"));
    let refspec = Refspec::parse(&pattern)?;

    let alt_res =
        primer::load_resume_record(&layout.git_dir).ok_or_else(|| CloneError::NotResumable {
            path: layout.dir.clone(),
        })?;

    junk::set_git_dir(&layout.git_dir);
    if let Some(work_tree) = &layout.work_tree {
        junk::set_work_tree(work_tree);
    }
    // re-entering primer adoption; an interruption stays resumable
    junk::set_resumable(&alt_res);

    Ok(ClonePlan {
        reflog_msg: format!("clone: from {source_url}"),
        source_url,
        local_probe: None,
        refspec,
        src_ref_prefix,
        branch_top,
        alt_res: Some(alt_res),
        layout,
    })
}

fn plan_fresh(opts: &CloneOptions) -> Result<ClonePlan> {
    let source = plan::resolve_source(&opts.repo)?;

    // reference repositories are validated before anything lands on disk
    let reference_objects = repo::validate_references(&opts.reference)?;

    let layout = plan::plan_new(
        &opts.repo,
        opts.dir.as_deref(),
        source.is_bundle,
        opts.bare,
        opts.separate_git_dir.as_deref(),
    )?;
    plan::create_destination(&layout)?;

    if opts.verbosity >= 0 {
        if layout.bare {
            eprintln!("Cloning into bare repository '{}'...", layout.dir);
        } else {
            eprintln!("Cloning into '{}'...", layout.dir);
        }
    }

    let destination = repo::init_destination(&layout, opts.template.as_deref())?;
    let mut cfg = destination.config()?;
    config::write_config_parameters(&mut cfg, &opts.config)?;

    let src_ref_prefix: &'static str = if opts.bare && opts.mirror {
        "refs/"
    } else {
        "refs/heads/"
    };
    let branch_top = if opts.bare {
        src_ref_prefix.to_string()
    } else {
        format!("refs/remotes/{}/", opts.origin)
    };

    config::set_remote_url(&mut cfg, &opts.origin, &source.url)?;
    repo::setup_references(&layout.git_dir, &reference_objects)?;

    let refspec = Refspec::parse(&format!("+{src_ref_prefix}*:{branch_top}*"))?;

    Ok(ClonePlan {
        reflog_msg: format!("clone: from {}", source.url),
        local_probe: source.local_path.clone().map(|p| (p, source.is_bundle)),
        source_url: source.url,
        refspec,
        src_ref_prefix,
        branch_top,
        alt_res: None,
        layout,
    })
}

/// Run the clone. The returned error, if any, has already had its cleanup
/// policy applied by the junk guard by the time the caller sees it.
pub fn run(mut opts: CloneOptions) -> Result<()> {
    let _junk_guard = junk::arm();

    let mut plan = if opts.resume {
        plan_resume(&mut opts)?
    } else {
        plan_fresh(&opts)?
    };

    // local-clone eligibility; resume re-probes the recorded url
    if plan.local_probe.is_none() {
        plan.local_probe = plan::get_repo_path(&plan.source_url);
    }
    let local_path = plan.local_probe.as_ref().map(|(path, _)| path.clone());
    let is_bundle = plan.local_probe.as_ref().is_some_and(|(_, b)| *b);
    if is_bundle {
        return Err(CloneError::TransportUnsupported {
            url: plan.source_url.clone(),
        });
    }

    let mut is_local = opts.local != Some(false) && local_path.is_some();
    if let Some(path) = &local_path {
        if is_local {
            if opts.depth.is_some() {
                ui::warning("--depth is ignored in local clones; use file:// instead.");
            }
            if path.join("shallow").exists() {
                if opts.local == Some(true) {
                    ui::warning("source repository is shallow, ignoring --local");
                }
                is_local = false;
            }
        }
    }
    if opts.local == Some(true) && !is_local {
        ui::warning("--local is ignored");
    }
    debug!(
        is_local,
        url = %plan.source_url,
        refspec = %plan.refspec.to_config_string(),
        "resolved transfer strategy"
    );

    let show_progress =
        opts.progress || (opts.verbosity >= 0 && console::user_attended_stderr());
    let mut transport: Box<dyn Transport> = Box::new(GitTransport::new(
        &plan.source_url,
        &plan.layout.git_dir,
        show_progress,
        opts.family,
    ));
    transport.set_option(TransportOption::Keep, "yes");
    if let Some(depth) = &opts.depth {
        transport.set_option(TransportOption::Depth, depth);
    }
    if opts.single_branch {
        transport.set_option(TransportOption::FollowTags, "1");
    }
    transport.set_option(TransportOption::PrimeClone, &opts.prime_clone);
    transport.set_option(TransportOption::UploadPack, &opts.upload_pack);

    // opportunistic primer discovery; references and local copies skip it
    if !is_local && opts.reference.is_empty() && plan.alt_res.is_none() {
        plan.alt_res = transport.prime_clone()?;
    }

    let refs = transport.get_refs_list()?;

    let mut no_checkout = opts.no_checkout;
    let mut ref_plan: Option<RefPlan> = None;
    let mut complete_refs_before_fetch = true;
    if refs.is_empty() {
        if let Some(branch) = &opts.branch {
            return Err(CloneError::RemoteBranchNotFound {
                branch: branch.clone(),
                origin: opts.origin.clone(),
            });
        }
        ui::warning("You appear to have cloned an empty repository.");
        no_checkout = true;
        if !opts.bare {
            let destination = Repository::open(&plan.layout.git_dir)?;
            let mut cfg = destination.config()?;
            config::install_branch_config(&mut cfg, "master", &opts.origin, "refs/heads/master")?;
        }
    } else {
        let planned = refs::plan_refs(
            &refs,
            &plan.refspec,
            PlanOptions {
                single_branch: opts.single_branch,
                branch: opts.branch.as_deref(),
                mirror: opts.mirror,
                origin: &opts.origin,
            },
        )?;
        // a null advertised oid means remote HEAD can only be resolved
        // after the objects arrive
        complete_refs_before_fetch = !refs.has_null_oid();
        if !is_local && !complete_refs_before_fetch {
            transport.fetch(&planned.mapped)?;
        }
        ref_plan = Some(planned);
    }

    if !plan.layout.is_resume {
        let destination = Repository::open(&plan.layout.git_dir)?;
        let mut cfg = destination.config()?;
        config::write_refspec_config(
            &mut cfg,
            &opts.origin,
            opts.mirror,
            opts.bare,
            opts.single_branch,
            opts.branch.as_deref(),
            ref_plan.as_ref().and_then(|p| p.our_head_points_at.as_ref()),
            ref_plan.as_ref().and_then(|p| p.remote_head_points_at.as_ref()),
            &plan.branch_top,
            plan.src_ref_prefix,
        )?;
    }

    let mut adoption = None;
    if let Some(resource) = &plan.alt_res {
        junk::set_resumable(resource);
        adoption = primer::adopt(
            transport.as_mut(),
            resource,
            &plan.layout.git_dir,
            &opts.origin,
            opts.resume,
        )?;
    }

    if is_local {
        let path = local_path.as_ref().expect("local clone has a source path");
        local_clone::clone_local(
            path,
            &plan.layout.git_dir,
            &LocalCloneOptions {
                shared: opts.shared,
                no_hardlinks: opts.no_hardlinks,
                local_explicit: opts.local == Some(true),
                quiet: opts.verbosity < 0,
            },
        )?;
    } else if let Some(planned) = &ref_plan {
        if complete_refs_before_fetch {
            transport.fetch(&planned.mapped)?;
        }
    }

    let destination = Repository::open(&plan.layout.git_dir)?;
    if let Some(planned) = &ref_plan {
        if !is_local {
            if opts.verbosity >= 0 {
                eprint!("Checking connectivity... ");
            }
            let wanted: Vec<Oid> = planned
                .mapped
                .iter()
                .filter(|r| r.peer_name.is_some() && !r.oid.is_zero())
                .map(|r| r.oid)
                .collect();
            check_connected(&plan.layout.git_dir, &wanted)?;
            if opts.verbosity >= 0 {
                eprintln!("done.");
            }
        }

        install::install_refs(&destination, &planned.mapped, &plan.reflog_msg)?;
        if opts.single_branch {
            install::write_followtags(&destination, &refs, &plan.reflog_msg)?;
        }
        if !opts.bare {
            if let Some(peer) = planned
                .remote_head_points_at
                .as_ref()
                .and_then(|r| r.peer_name.as_deref())
            {
                install::create_tracking_head_symref(
                    &destination,
                    &plan.branch_top,
                    peer,
                    &plan.reflog_msg,
                )?;
            }
        }
        install::update_head(
            &destination,
            planned.our_head_points_at.as_ref(),
            planned.remote_head.as_ref(),
            &opts.origin,
            opts.bare,
            &plan.reflog_msg,
        )?;
    }

    transport.disconnect()?;

    if opts.dissociate {
        repo::dissociate_from_references(&plan.layout.git_dir)?;
    }

    if let Some(adoption) = &adoption {
        primer::finish(&plan.layout.git_dir, adoption)?;
    }

    // from here on only checkout can fail, and the repository stays usable
    junk::set_mode(JunkMode::LeaveRepo);
    let checkout_result = match &plan.layout.work_tree {
        Some(work_tree) => checkout::checkout(
            work_tree,
            &CheckoutOptions {
                no_checkout,
                recursive: opts.recursive,
                verbosity: opts.verbosity,
            },
        ),
        None => Ok(()),
    };

    if checkout_result.is_ok() {
        primer::remove_resume_record(&plan.layout.git_dir);
        junk::set_mode(JunkMode::LeaveAll);
    }
    checkout_result
}
