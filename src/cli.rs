//! CLI definitions using clap derive API

use std::path::PathBuf;

use clap::Parser;

use crate::error::{CloneError, Result};

/// primeclone - resumable repository cloning
///
/// Clone a repository into a new directory, optionally seeding most of the
/// object graph from an out-of-band primer resource advertised by the remote.
#[derive(Parser, Debug)]
#[command(
    name = "primeclone",
    version,
    about = "Clone a repository into a new directory",
    after_help = "EXAMPLES:\n    \
                  primeclone https://example.com/foo.git\n    \
                  primeclone --bare https://example.com/foo.git\n    \
                  primeclone --branch v1.2 https://example.com/foo.git foo-1.2\n    \
                  primeclone --resume foo"
)]
pub struct Cli {
    /// Repository to clone from (or, with --resume, the interrupted clone)
    pub repo: String,

    /// Directory to clone into (guessed from the repository when omitted)
    pub dir: Option<String>,

    /// Create a bare repository
    #[arg(long)]
    pub bare: bool,

    /// Create a mirror repository (implies --bare)
    #[arg(long)]
    pub mirror: bool,

    /// Clone from a local repository
    #[arg(short = 'l', long, overrides_with = "no_local")]
    local: bool,

    /// Never use the local-copy optimization
    #[arg(long, overrides_with = "local")]
    no_local: bool,

    /// Don't use local hardlinks, always copy
    #[arg(long)]
    pub no_hardlinks: bool,

    /// Set up as a shared repository (borrow the source's object store)
    #[arg(short = 's', long)]
    pub shared: bool,

    /// Initialize submodules in the clone
    #[arg(long, visible_alias = "recurse-submodules")]
    pub recursive: bool,

    /// Directory from which templates will be used
    #[arg(long, value_name = "DIR")]
    pub template: Option<PathBuf>,

    /// Reference repository (repeatable)
    #[arg(long, value_name = "REPO")]
    pub reference: Vec<String>,

    /// Use --reference only while cloning
    #[arg(long)]
    pub dissociate: bool,

    /// Use <NAME> instead of 'origin' to track upstream
    #[arg(short = 'o', long, value_name = "NAME")]
    pub origin: Option<String>,

    /// Checkout <REF> instead of the remote's HEAD
    #[arg(short = 'b', long, value_name = "REF")]
    pub branch: Option<String>,

    /// Path to the upload-pack program on the remote
    #[arg(short = 'u', long, value_name = "PATH", default_value = "git-upload-pack")]
    pub upload_pack: String,

    /// Path to the prime-clone program on the remote
    #[arg(short = 'p', long, value_name = "PATH", default_value = "git-prime-clone")]
    pub prime_clone: String,

    /// Create a shallow clone of that depth
    #[arg(long, value_name = "DEPTH")]
    pub depth: Option<String>,

    /// Clone only one branch, HEAD or --branch
    #[arg(long, overrides_with = "no_single_branch")]
    single_branch: bool,

    /// Clone all branches (default unless --depth is given)
    #[arg(long, overrides_with = "single_branch")]
    no_single_branch: bool,

    /// Continue a resumable clone
    #[arg(long)]
    pub resume: bool,

    /// Separate git dir from working tree
    #[arg(long, value_name = "GITDIR")]
    pub separate_git_dir: Option<PathBuf>,

    /// Set config inside the new repository (repeatable)
    #[arg(short = 'c', long = "config", value_name = "KEY=VALUE")]
    pub config: Vec<String>,

    /// Use IPv4 addresses only
    #[arg(short = '4', long = "ipv4", overrides_with = "ipv6")]
    ipv4: bool,

    /// Use IPv6 addresses only
    #[arg(short = '6', long = "ipv6", overrides_with = "ipv4")]
    ipv6: bool,

    /// Force progress reporting
    #[arg(long)]
    pub progress: bool,

    /// Be more verbose
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Be quiet
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    quiet: bool,

    /// Don't create a checkout
    #[arg(short = 'n', long)]
    pub no_checkout: bool,
}

/// Address-family preference passed down to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Ipv4,
    Ipv6,
}

/// Validated clone options, with flag interactions already resolved.
#[derive(Debug)]
pub struct CloneOptions {
    pub repo: String,
    pub dir: Option<String>,
    pub bare: bool,
    pub mirror: bool,
    /// `Some(true)` for --local, `Some(false)` for --no-local, `None` unset.
    pub local: Option<bool>,
    pub no_hardlinks: bool,
    pub shared: bool,
    pub recursive: bool,
    pub template: Option<PathBuf>,
    pub reference: Vec<String>,
    pub dissociate: bool,
    pub origin: String,
    pub branch: Option<String>,
    pub upload_pack: String,
    pub prime_clone: String,
    pub depth: Option<String>,
    pub single_branch: bool,
    pub resume: bool,
    pub separate_git_dir: Option<PathBuf>,
    pub config: Vec<String>,
    pub family: Option<Family>,
    pub progress: bool,
    /// < 0 quiet, 0 normal, > 0 verbose
    pub verbosity: i32,
    pub no_checkout: bool,
}

impl Cli {
    /// True when any flag beyond the positionals differs from its default.
    fn has_non_resume_options(&self) -> bool {
        self.bare
            || self.mirror
            || self.local
            || self.no_local
            || self.no_hardlinks
            || self.shared
            || self.recursive
            || self.template.is_some()
            || !self.reference.is_empty()
            || self.dissociate
            || self.origin.is_some()
            || self.branch.is_some()
            || self.upload_pack != "git-upload-pack"
            || self.prime_clone != "git-prime-clone"
            || self.depth.is_some()
            || self.single_branch
            || self.no_single_branch
            || self.separate_git_dir.is_some()
            || !self.config.is_empty()
            || self.ipv4
            || self.ipv6
            || self.no_checkout
    }

    /// Resolve flag interactions and reject conflicting combinations.
    pub fn validate(self) -> Result<CloneOptions> {
        if self.resume && (self.has_non_resume_options() || self.dir.is_some()) {
            return Err(CloneError::OptionConflict {
                message: "--resume is incompatible with all other options".to_string(),
            });
        }

        if let Some(depth) = &self.depth {
            match depth.parse::<u32>() {
                Ok(n) if n >= 1 => {}
                _ => {
                    return Err(CloneError::InvalidDepth {
                        value: depth.clone(),
                    });
                }
            }
        }

        let bare = self.bare || self.mirror;
        if bare {
            if let Some(origin) = &self.origin {
                return Err(CloneError::OptionConflict {
                    message: format!("--bare and --origin {origin} options are incompatible"),
                });
            }
            if self.separate_git_dir.is_some() {
                return Err(CloneError::OptionConflict {
                    message: "--bare and --separate-git-dir are incompatible".to_string(),
                });
            }
        }

        let single_branch = if self.single_branch {
            true
        } else if self.no_single_branch {
            false
        } else {
            self.depth.is_some()
        };

        let local = if self.local {
            Some(true)
        } else if self.no_local {
            Some(false)
        } else {
            None
        };

        let family = if self.ipv4 {
            Some(Family::Ipv4)
        } else if self.ipv6 {
            Some(Family::Ipv6)
        } else {
            None
        };

        Ok(CloneOptions {
            repo: self.repo,
            dir: self.dir,
            bare,
            mirror: self.mirror,
            local,
            no_hardlinks: self.no_hardlinks,
            shared: self.shared,
            recursive: self.recursive,
            template: self.template,
            reference: self.reference,
            dissociate: self.dissociate,
            origin: self.origin.unwrap_or_else(|| "origin".to_string()),
            branch: self.branch,
            upload_pack: self.upload_pack,
            prime_clone: self.prime_clone,
            depth: self.depth,
            single_branch,
            resume: self.resume,
            separate_git_dir: self.separate_git_dir,
            config: self.config,
            family,
            progress: self.progress,
            verbosity: if self.quiet { -1 } else { i32::from(self.verbose) },
            no_checkout: bare || self.no_checkout,
        })
    }
}
