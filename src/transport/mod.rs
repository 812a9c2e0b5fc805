//! Transport seam
//!
//! The clone core consumes this interface; the wire details live behind it.

mod auth;
pub mod git;

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::refs::{Ref, RefSet};

pub use git::GitTransport;

/// Out-of-band primer resource advertised by the remote. Retrieving it seeds
/// most of the object graph so the main fetch negotiates a small delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AltResource {
    pub url: String,
    pub filetype: String,
}

/// Option keys the orchestrator pushes down to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportOption {
    /// Preserve the downloaded pack instead of exploding it.
    Keep,
    /// Shallow-clone depth.
    Depth,
    /// Fetch tags pointing into the fetched history.
    FollowTags,
    /// Path of the upload-pack program on the remote.
    UploadPack,
    /// Path of the prime-clone program on the remote.
    PrimeClone,
}

/// Object and ref exchange with the source repository.
pub trait Transport {
    /// List the remote's advertised refs (HEAD first when present).
    fn get_refs_list(&mut self) -> Result<RefSet>;

    /// Ask the remote whether it advertises a primer resource.
    fn prime_clone(&mut self) -> Result<Option<AltResource>>;

    /// Download the primer into `dest_dir`, returning the local path. A
    /// partial download leaves a `.temp` sibling that a later invocation
    /// continues from.
    fn download_primer(&mut self, resource: &AltResource, dest_dir: &Path) -> Result<PathBuf>;

    /// Transfer the objects reachable from the mapped refs.
    fn fetch(&mut self, refs: &[Ref]) -> Result<()>;

    fn set_option(&mut self, option: TransportOption, value: &str);

    fn disconnect(&mut self) -> Result<()>;
}
