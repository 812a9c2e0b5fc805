//! Primer adoption
//!
//! This module handles:
//! - Downloading the advertised primer resource into the object store
//! - Indexing the primer pack and reading its bundle header
//! - Pinning the primed history with temporary refs
//! - Persisting and loading the resume record
//!
//! Adoption is all-or-nothing. A failure mid-way abandons the primer (which
//! cleans its artifacts and falls back to a full clone) unless the clone is
//! resuming, in which case abandonment is fatal.

pub mod bundle;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use git2::Repository;
use tracing::debug;

use crate::error::{CloneError, Result};
use crate::junk;
use crate::transport::{AltResource, Transport};
use crate::ui;

pub use bundle::{read_bundle_tips, BundleTip};

/// Well-known resume-record file name inside the git dir.
const RESUME_RECORD_FILE: &str = "resumable";

/// Adoption phases. `Done` is reached only after the main fetch succeeds,
/// via [`finish`].
enum Phase {
    Fetching,
    Indexing { pack: PathBuf },
    Installing { pack: PathBuf, bundle: PathBuf },
}

/// A successfully adopted primer, carried until the main fetch completes.
#[derive(Debug)]
pub struct PrimerAdoption {
    pub pack: PathBuf,
    pub bundle: PathBuf,
    pub tips: Vec<BundleTip>,
    origin: String,
}

pub fn resume_record_path(git_dir: &Path) -> PathBuf {
    git_dir.join(RESUME_RECORD_FILE)
}

/// Load the persisted resume record, if the destination is mid-adoption.
pub fn load_resume_record(git_dir: &Path) -> Option<AltResource> {
    let content = fs::read_to_string(resume_record_path(git_dir)).ok()?;
    let mut lines = content.lines();
    let url = lines.next()?.to_string();
    let filetype = lines.next()?.to_string();
    Some(AltResource { url, filetype })
}

/// Persist the resume record: two lines, url then filetype.
pub fn write_resume_record(git_dir: &Path, resource: &AltResource) -> std::io::Result<()> {
    let mut file = fs::File::create(resume_record_path(git_dir))?;
    writeln!(file, "{}", resource.url)?;
    writeln!(file, "{}", resource.filetype)?;
    Ok(())
}

pub fn remove_resume_record(git_dir: &Path) {
    let path = resume_record_path(git_dir);
    if path.exists() {
        let _ = fs::remove_file(path);
    }
}

fn temp_ref_name(origin: &str, oid: &git2::Oid) -> String {
    format!("refs/temp/{origin}/resume/temp-{oid}")
}

fn run_index_pack(git_dir: &Path, pack: &Path, idx: &Path) -> bool {
    let status = Command::new("git")
        .args(["index-pack", "--clone-bundle", "-v", "--check-self-contained-and-connected", "-o"])
        .arg(idx)
        .arg(pack)
        .current_dir(git_dir)
        .stdout(Stdio::null())
        .status();
    matches!(status, Ok(status) if status.success())
}

/// Pin the bundle tips with temporary refs in a single transaction. The refs
/// make the negotiation advertise the primed history as "have".
fn install_bundle_refs(git_dir: &Path, bundle: &Path, origin: &str) -> Result<Vec<BundleTip>> {
    let tips = read_bundle_tips(bundle)?;
    debug!(tips = ?tips.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(), "bundle tips");
    let repo = Repository::open(git_dir)?;
    let mut tx = repo
        .transaction()
        .map_err(|err| CloneError::RefTransactionFailed {
            message: err.message().to_string(),
        })?;
    for tip in &tips {
        let name = temp_ref_name(origin, &tip.oid);
        if repo.find_reference(&name).is_ok() {
            continue;
        }
        tx.lock_ref(&name)
            .and_then(|()| tx.set_target(&name, tip.oid, None, "clone: primer tip"))
            .map_err(|err| CloneError::RefTransactionFailed {
                message: err.message().to_string(),
            })?;
    }
    tx.commit().map_err(|err| CloneError::RefTransactionFailed {
        message: err.message().to_string(),
    })?;
    Ok(tips)
}

/// Delete the pack's on-disk artifacts after an abandonment.
fn clean_pack_artifacts(pack: &Path) {
    let mut temp = pack.as_os_str().to_os_string();
    temp.push(".temp");
    for path in [
        pack.to_path_buf(),
        PathBuf::from(temp),
        pack.with_extension("idx"),
        pack.with_extension("bndl"),
    ] {
        if path.exists() {
            let _ = fs::remove_file(path);
        }
    }
}

fn abandon(pack: Option<&Path>, reason: &str, resume: bool) -> Result<Option<PrimerAdoption>> {
    if resume {
        return Err(CloneError::PrimerUnavailable);
    }
    ui::warning(&format!("{reason}, falling back to full clone"));
    if let Some(pack) = pack {
        clean_pack_artifacts(pack);
    }
    junk::clear_resumable();
    Ok(None)
}

/// Run the primer through Fetching, Indexing and Installing.
///
/// The caller has already entered `LeaveResumable` junk mode with this
/// resource, so an interruption persists the resume record and leaves the
/// partial download in place.
pub fn adopt(
    transport: &mut dyn Transport,
    resource: &AltResource,
    git_dir: &Path,
    origin: &str,
    resume: bool,
) -> Result<Option<PrimerAdoption>> {
    let mut phase = Phase::Fetching;
    loop {
        phase = match phase {
            Phase::Fetching => {
                if resource.filetype != "pack" {
                    return abandon(
                        None,
                        &format!("unsupported primer filetype '{}'", resource.filetype),
                        resume,
                    );
                }
                let pack_dir = git_dir.join("objects").join("pack");
                eprintln!("Downloading primer: {}...", resource.url);
                match transport.download_primer(resource, &pack_dir) {
                    Ok(pack) => Phase::Indexing { pack },
                    Err(err) => {
                        return abandon(None, &format!("could not download primer: {err}"), resume)
                    }
                }
            }
            Phase::Indexing { pack } => {
                if pack.extension().and_then(|e| e.to_str()) != Some("pack") {
                    let reason = format!("invalid pack filename '{}'", pack.display());
                    return abandon(Some(&pack), &reason, resume);
                }
                let bundle = pack.with_extension("bndl");
                if bundle.exists() {
                    debug!(bundle = %bundle.display(), "primer already indexed");
                    Phase::Installing { pack, bundle }
                } else if run_index_pack(git_dir, &pack, &pack.with_extension("idx")) {
                    Phase::Installing { pack, bundle }
                } else {
                    return abandon(Some(&pack), "could not index primer pack", resume);
                }
            }
            Phase::Installing { pack, bundle } => {
                match install_bundle_refs(git_dir, &bundle, origin) {
                    Ok(tips) => {
                        debug!(tips = tips.len(), pack = %pack.display(), "primer adopted");
                        return Ok(Some(PrimerAdoption {
                            pack,
                            bundle,
                            tips,
                            origin: origin.to_string(),
                        }));
                    }
                    Err(err) => {
                        let reason = format!("could not install primer refs: {err}");
                        return abandon(Some(&pack), &reason, resume);
                    }
                }
            }
        };
    }
}

/// Complete adoption after the main fetch succeeded: drop the temporary refs
/// and the bundle header, keep the pack and its index.
pub fn finish(git_dir: &Path, adoption: &PrimerAdoption) -> Result<()> {
    let repo = Repository::open(git_dir)?;
    for tip in &adoption.tips {
        let name = temp_ref_name(&adoption.origin, &tip.oid);
        if let Ok(mut reference) = repo.find_reference(&name) {
            reference.delete()?;
        }
    }
    if adoption.bundle.exists() {
        fs::remove_file(&adoption.bundle)?;
    }
    debug!(pack = %adoption.pack.display(), "primer pack retained in object store");
    Ok(())
}
