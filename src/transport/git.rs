//! git2-backed transport
//!
//! Speaks the ordinary fetch protocol through libgit2. This transport has no
//! prime-clone channel, so it never advertises a primer itself; primer
//! downloads are served from local paths and `file://` URLs (the shape a
//! resume record carries).

use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use git2::{AutotagOption, Direction, FetchOptions, Oid, RemoteCallbacks, Repository};
use tracing::debug;

use super::{auth, AltResource, Transport, TransportOption};
use crate::cli::Family;
use crate::error::{CloneError, Result};
use crate::progress::TransferProgress;
use crate::refs::{Ref, RefSet};

pub struct GitTransport {
    url: String,
    git_dir: PathBuf,
    progress: bool,
    /// Address-family preference; recorded for the smart protocols that
    /// honor it.
    #[allow(dead_code)]
    family: Option<Family>,
    keep: bool,
    depth: Option<i32>,
    follow_tags: bool,
    upload_pack: Option<String>,
    prime_clone_program: Option<String>,
}

impl GitTransport {
    pub fn new(
        url: impl Into<String>,
        git_dir: impl Into<PathBuf>,
        progress: bool,
        family: Option<Family>,
    ) -> Self {
        Self {
            url: url.into(),
            git_dir: git_dir.into(),
            progress,
            family,
            keep: false,
            depth: None,
            follow_tags: false,
            upload_pack: None,
            prime_clone_program: None,
        }
    }

    fn open_repo(&self) -> Result<Repository> {
        Repository::open(&self.git_dir).map_err(|err| CloneError::TransportFailed {
            message: err.message().to_string(),
        })
    }

    fn transport_err(err: git2::Error) -> CloneError {
        CloneError::TransportFailed {
            message: err.message().to_string(),
        }
    }
}

/// Resolve a primer URL to a local file path, when it names one.
fn primer_source_path(url: &str) -> Option<PathBuf> {
    if let Some(rest) = url.strip_prefix("file://") {
        Some(PathBuf::from(rest))
    } else if url.starts_with('/') {
        Some(PathBuf::from(url))
    } else {
        None
    }
}

impl Transport for GitTransport {
    fn get_refs_list(&mut self) -> Result<RefSet> {
        let repo = self.open_repo()?;
        let mut remote = repo
            .remote_anonymous(&self.url)
            .map_err(Self::transport_err)?;
        let mut callbacks = RemoteCallbacks::new();
        auth::add_credentials(&mut callbacks);
        let connection = remote
            .connect_auth(Direction::Fetch, Some(callbacks), None)
            .map_err(Self::transport_err)?;

        let refs: Vec<Ref> = connection
            .list()
            .map_err(Self::transport_err)?
            .iter()
            .filter(|head| !head.name().ends_with("^{}"))
            .map(|head| {
                Ref::new(head.name(), head.oid())
                    .with_symref_target(head.symref_target().map(str::to_string))
            })
            .collect();
        let refs = RefSet::new(refs);
        debug!(
            advertised = refs.len(),
            url = %self.url,
            upload_pack = self.upload_pack.as_deref(),
            "listed remote refs"
        );
        Ok(refs)
    }

    fn prime_clone(&mut self) -> Result<Option<AltResource>> {
        // libgit2 has no prime-clone advertisement channel; primers reach
        // this transport through resume records only.
        debug!(
            program = self.prime_clone_program.as_deref(),
            "transport advertises no primer"
        );
        Ok(None)
    }

    fn download_primer(&mut self, resource: &AltResource, dest_dir: &Path) -> Result<PathBuf> {
        let source =
            primer_source_path(&resource.url).ok_or_else(|| CloneError::PrimerDownloadFailed {
                url: resource.url.clone(),
                reason: "scheme not supported by this transport".to_string(),
            })?;
        let metadata = fs::metadata(&source).map_err(|err| CloneError::PrimerDownloadFailed {
            url: resource.url.clone(),
            reason: err.to_string(),
        })?;
        let total = metadata.len();

        fs::create_dir_all(dest_dir)?;
        let name = source
            .file_name()
            .ok_or_else(|| CloneError::PrimerDownloadFailed {
                url: resource.url.clone(),
                reason: "resource has no file name".to_string(),
            })?;
        let dest = dest_dir.join(name);
        let mut temp_name = dest.as_os_str().to_os_string();
        temp_name.push(".temp");
        let temp = PathBuf::from(temp_name);

        // continue a partial download from its byte offset
        let mut offset = fs::metadata(&temp).map(|m| m.len()).unwrap_or(0);
        let mut out = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&temp)?;
        if offset > total {
            out.set_len(0)?;
            offset = 0;
        }

        let mut input = fs::File::open(&source)?;
        input.seek(SeekFrom::Start(offset))?;

        let bar = TransferProgress::bytes("Downloading primer", Some(total), self.progress);
        bar.set_position(offset);
        let mut buffer = [0u8; 64 * 1024];
        loop {
            let read = input.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            out.write_all(&buffer[..read])?;
            bar.inc(read as u64);
        }
        out.sync_all()?;
        drop(out);
        bar.finish();

        fs::rename(&temp, &dest)?;
        debug!(dest = %dest.display(), bytes = total, resumed_from = offset, "primer downloaded");
        Ok(dest)
    }

    fn fetch(&mut self, refs: &[Ref]) -> Result<()> {
        let repo = self.open_repo()?;
        let mut remote = repo
            .remote_anonymous(&self.url)
            .map_err(Self::transport_err)?;

        let mut callbacks = RemoteCallbacks::new();
        auth::add_credentials(&mut callbacks);
        let bar = TransferProgress::bytes("Receiving objects", None, self.progress);
        {
            let bar = bar.clone();
            callbacks.transfer_progress(move |stats| {
                bar.set_position(stats.received_bytes() as u64);
                true
            });
        }
        if self.progress {
            callbacks.sideband_progress(|data| {
                eprint!("remote: {}", String::from_utf8_lossy(data));
                true
            });
        }

        let mut options = FetchOptions::new();
        options.remote_callbacks(callbacks);
        if let Some(depth) = self.depth {
            options.depth(depth);
        }
        if self.follow_tags {
            options.download_tags(AutotagOption::Auto);
        }

        // download only; refs install separately in one transaction
        let specs: Vec<String> = refs
            .iter()
            .map(|r| match &r.peer_name {
                Some(peer) => format!("+{}:{}", r.name, peer),
                None => r.name.clone(),
            })
            .collect();
        let spec_refs: Vec<&str> = specs.iter().map(String::as_str).collect();
        remote
            .download(&spec_refs, Some(&mut options))
            .map_err(Self::transport_err)?;
        remote.disconnect().map_err(Self::transport_err)?;
        bar.finish();
        debug!(wanted = specs.len(), keep = self.keep, "objects transferred");
        Ok(())
    }

    fn set_option(&mut self, option: TransportOption, value: &str) {
        match option {
            TransportOption::Keep => self.keep = value == "yes" || value == "1",
            TransportOption::Depth => self.depth = value.parse().ok(),
            TransportOption::FollowTags => self.follow_tags = value == "1",
            TransportOption::UploadPack => self.upload_pack = Some(value.to_string()),
            TransportOption::PrimeClone => self.prime_clone_program = Some(value.to_string()),
        }
    }

    fn disconnect(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Verify the remote sent every object reachable from the wanted tips.
pub fn check_connected(git_dir: &Path, oids: &[Oid]) -> Result<()> {
    if oids.is_empty() {
        return Ok(());
    }
    let mut child = Command::new("git")
        .args(["rev-list", "--objects", "--stdin", "--not", "--all", "--quiet"])
        .current_dir(git_dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    {
        let stdin = child.stdin.as_mut().expect("piped stdin");
        for oid in oids {
            writeln!(stdin, "{oid}")?;
        }
    }
    let status = child.wait()?;
    if !status.success() {
        return Err(CloneError::IncompleteFetch);
    }
    Ok(())
}
