//! Error types and handling for primeclone
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for clone operations
#[derive(Error, Diagnostic, Debug)]
pub enum CloneError {
    // Option validation errors
    #[error("{message}")]
    #[diagnostic(code(primeclone::options::conflict))]
    OptionConflict { message: String },

    #[error("depth '{value}' is not a positive number")]
    #[diagnostic(code(primeclone::options::invalid_depth))]
    InvalidDepth { value: String },

    #[error("no directory name could be guessed from '{repo}'")]
    #[diagnostic(
        code(primeclone::options::no_dir_name),
        help("Specify a directory on the command line")
    )]
    NoDirName { repo: String },

    #[error("bad config parameter: '{parameter}'")]
    #[diagnostic(code(primeclone::options::bad_config))]
    BadConfigParameter { parameter: String },

    // Environment errors
    #[error("repository '{repo}' does not exist")]
    #[diagnostic(code(primeclone::env::source_missing))]
    SourceMissing { repo: String },

    #[error("destination path '{path}' already exists and is not an empty directory")]
    #[diagnostic(code(primeclone::env::destination_not_empty))]
    DestinationNotEmpty { path: String },

    #[error("working tree '{path}' already exists")]
    #[diagnostic(code(primeclone::env::work_tree_exists))]
    WorkTreeExists { path: String },

    #[error("directory '{path}' does not exist")]
    #[diagnostic(code(primeclone::env::resume_target_missing))]
    ResumeTargetMissing { path: String },

    #[error("'{path}' does not appear to be a repository")]
    #[diagnostic(code(primeclone::env::not_a_repository))]
    NotARepository { path: String },

    #[error("'{path}' is configured for a work tree, but no candidate exists")]
    #[diagnostic(code(primeclone::env::work_tree_candidate))]
    WorkTreeCandidateMissing { path: String },

    #[error("reference repository '{path}' is not a local repository")]
    #[diagnostic(code(primeclone::env::reference_not_local))]
    ReferenceNotLocal { path: String },

    #[error("reference repository '{path}' as a linked checkout is not supported")]
    #[diagnostic(code(primeclone::env::reference_linked_checkout))]
    ReferenceLinkedCheckout { path: String },

    #[error("reference repository '{path}' is shallow")]
    #[diagnostic(code(primeclone::env::reference_shallow))]
    ReferenceShallow { path: String },

    #[error("reference repository '{path}' is grafted")]
    #[diagnostic(code(primeclone::env::reference_grafted))]
    ReferenceGrafted { path: String },

    // Transport errors
    #[error("don't know how to clone '{url}'")]
    #[diagnostic(code(primeclone::transport::unsupported))]
    TransportUnsupported { url: String },

    #[error("transport failed: {message}")]
    #[diagnostic(code(primeclone::transport::failed))]
    TransportFailed { message: String },

    #[error("remote branch {branch} not found in upstream {origin}")]
    #[diagnostic(code(primeclone::transport::branch_not_found))]
    RemoteBranchNotFound { branch: String, origin: String },

    // Connectivity errors
    #[error("remote did not send all necessary objects")]
    #[diagnostic(code(primeclone::transport::incomplete))]
    IncompleteFetch,

    // Ref-store errors
    #[error("ref transaction failed: {message}")]
    #[diagnostic(code(primeclone::refs::transaction_failed))]
    RefTransactionFailed { message: String },

    #[error("unable to update {name}: {message}")]
    #[diagnostic(code(primeclone::refs::update_failed))]
    RefUpdateFailed { name: String, message: String },

    // Primer errors
    #[error("--resume option used, but '{path}' is not resumable")]
    #[diagnostic(
        code(primeclone::primer::not_resumable),
        help("A resumable clone leaves a 'resumable' file in its git directory")
    )]
    NotResumable { path: String },

    #[error("resumable resource is no longer available or usable")]
    #[diagnostic(
        code(primeclone::primer::unavailable),
        help(
            "The resource may have been moved, corrupted, or changed. \
             Remove the directory and run the original clone command."
        )
    )]
    PrimerUnavailable,

    #[error("failed to download primer from '{url}': {reason}")]
    #[diagnostic(code(primeclone::primer::download_failed))]
    PrimerDownloadFailed { url: String, reason: String },

    // Checkout errors
    #[error("unable to checkout working tree: {message}")]
    #[diagnostic(
        code(primeclone::checkout::failed),
        help("The repository is intact; retry the checkout by hand")
    )]
    CheckoutFailed { message: String },

    // Config-store errors
    #[error("could not write config: {message}")]
    #[diagnostic(code(primeclone::config::write_failed))]
    ConfigWriteFailed { message: String },

    // Local-clone errors
    #[error("failed to copy object store entry '{path}': {reason}")]
    #[diagnostic(code(primeclone::local::copy_failed))]
    LocalCopyFailed { path: String, reason: String },

    #[error("failed to create link '{path}'")]
    #[diagnostic(code(primeclone::local::link_failed))]
    LocalLinkFailed { path: String },

    #[error("cannot repack to clean up")]
    #[diagnostic(code(primeclone::local::repack_failed))]
    RepackFailed,

    // Wrapped lower-level failures
    #[error("IO error: {message}")]
    #[diagnostic(code(primeclone::fs::io_error))]
    Io { message: String },

    #[error("git operation failed: {message}")]
    #[diagnostic(code(primeclone::git::operation_failed))]
    Git { message: String },
}

impl From<std::io::Error> for CloneError {
    fn from(err: std::io::Error) -> Self {
        CloneError::Io {
            message: err.to_string(),
        }
    }
}

impl From<git2::Error> for CloneError {
    fn from(err: git2::Error) -> Self {
        CloneError::Git {
            message: err.message().to_string(),
        }
    }
}

/// Result type alias for clone operations
pub type Result<T> = std::result::Result<T, CloneError>;
