//! Junk tracking and cleanup
//!
//! Process-wide record of which on-disk artifacts the running clone owns and
//! what should happen to them on exit. Cleanup runs exactly once, either from
//! the orchestrator's scope guard or from the signal thread, whichever fires
//! first; the signal path re-raises with the default disposition afterwards
//! so the exit status reflects the signal.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, Once};

use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::debug;

use crate::primer;
use crate::transport::AltResource;
use crate::ui;

/// Cleanup policy on process exit, monotonic in how much survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JunkMode {
    /// Remove everything the clone created.
    None,
    /// Keep the destination and persist the resume record.
    LeaveResumable,
    /// Refs and HEAD are installed; only checkout failed. Keep the repo.
    LeaveRepo,
    /// Full success; nothing to do.
    LeaveAll,
}

struct JunkState {
    git_dir: Option<PathBuf>,
    work_tree: Option<PathBuf>,
    mode: JunkMode,
    resource: Option<AltResource>,
}

impl JunkState {
    const fn new() -> Self {
        Self {
            git_dir: None,
            work_tree: None,
            mode: JunkMode::None,
            resource: None,
        }
    }
}

static STATE: Mutex<JunkState> = Mutex::new(JunkState::new());

/// Serializes tests that observe or mutate the process-wide junk state.
#[cfg(test)]
pub(crate) static TEST_MUTEX: Mutex<()> = Mutex::new(());

static CLEANED: AtomicBool = AtomicBool::new(false);
static SIGNALS_INSTALLED: Once = Once::new();

const LEAVE_REPO_MSG: &str = "Clone succeeded, but checkout failed.\n\
     You can inspect what was checked out with 'git status'\n\
     and retry the checkout with 'git checkout -f HEAD'";

const LEAVE_RESUMABLE_MSG: &str = "Clone interrupted while copying resumable resource.\n\
     Try using 'primeclone --resume <new_directory>',\n\
     where <new_directory> is either the new working\n\
     directory or git directory.\n\
     \n\
     If this does not succeed, it could be because the\n\
     resource has been moved, corrupted, or changed.\n\
     If this is the case, you should remove <new_directory>\n\
     and run the original command.";

/// Register the destination's git dir. Deleted on exit while the mode is
/// still `None`.
pub fn set_git_dir(path: &Path) {
    let mut state = STATE.lock().unwrap();
    state.git_dir = Some(path.to_path_buf());
}

/// Register the destination's work tree. Deleted on exit while the mode is
/// still `None`.
pub fn set_work_tree(path: &Path) {
    let mut state = STATE.lock().unwrap();
    state.work_tree = Some(path.to_path_buf());
}

pub fn set_mode(mode: JunkMode) {
    let mut state = STATE.lock().unwrap();
    debug!(from = ?state.mode, to = ?mode, "junk mode transition");
    state.mode = mode;
}

#[allow(dead_code)]
pub fn mode() -> JunkMode {
    STATE.lock().unwrap().mode
}

/// Enter primer adoption: record the resource so an interruption persists it.
pub fn set_resumable(resource: &AltResource) {
    let mut state = STATE.lock().unwrap();
    state.resource = Some(resource.clone());
    state.mode = JunkMode::LeaveResumable;
}

/// Primer abandoned before anything worth resuming was persisted.
pub fn clear_resumable() {
    let mut state = STATE.lock().unwrap();
    state.resource = None;
    state.mode = JunkMode::None;
}

fn remove_recursively(path: &Path) {
    if path.exists() {
        if let Err(err) = fs::remove_dir_all(path) {
            ui::warning(&format!("failed to remove '{}': {}", path.display(), err));
        }
    }
}

/// Execute the cleanup policy. Safe to call more than once; only the first
/// call acts.
pub fn cleanup() {
    if CLEANED.swap(true, Ordering::SeqCst) {
        return;
    }
    let state = STATE.lock().unwrap();
    match state.mode {
        JunkMode::LeaveAll => {}
        JunkMode::LeaveRepo => {
            ui::warning(LEAVE_REPO_MSG);
        }
        JunkMode::LeaveResumable => {
            if let (Some(git_dir), Some(resource)) = (&state.git_dir, &state.resource) {
                if let Err(err) = primer::write_resume_record(git_dir, resource) {
                    ui::warning(&format!("could not write resume record: {err}"));
                }
            }
            ui::warning(LEAVE_RESUMABLE_MSG);
        }
        JunkMode::None => {
            if let Some(git_dir) = &state.git_dir {
                remove_recursively(git_dir);
            }
            if let Some(work_tree) = &state.work_tree {
                remove_recursively(work_tree);
            }
        }
    }
}

/// Scope guard; its destructor runs the cleanup policy on every exit path of
/// the orchestrator.
pub struct JunkGuard {
    _private: (),
}

impl Drop for JunkGuard {
    fn drop(&mut self) {
        cleanup();
    }
}

/// Arm the junk tracker: spawn the signal watcher (once per process) and
/// return the orchestrator's scope guard.
pub fn arm() -> JunkGuard {
    SIGNALS_INSTALLED.call_once(|| {
        match Signals::new([SIGINT, SIGTERM, SIGHUP]) {
            Ok(mut signals) => {
                std::thread::spawn(move || {
                    if let Some(signal) = signals.forever().next() {
                        cleanup();
                        let _ = signal_hook::low_level::emulate_default_handler(signal);
                    }
                });
            }
            Err(err) => ui::warning(&format!("could not install signal handlers: {err}")),
        }
    });
    JunkGuard { _private: () }
}
