//! Reference data model
//!
//! This module handles:
//! - Advertised and mapped references (`Ref`, `RefSet`)
//! - Refspec application (`refspec`)
//! - Reference planning and installation

pub mod install;
pub mod planner;
pub mod refspec;

use git2::Oid;

pub use planner::{plan_refs, PlanOptions, RefPlan};
pub use refspec::Refspec;

/// One reference, as advertised by the remote and (after mapping) as stored
/// locally under `peer_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ref {
    pub name: String,
    pub oid: Oid,
    /// Local name the ref will be stored under; advertised-but-not-adopted
    /// refs keep `None`.
    pub peer_name: Option<String>,
    /// Symref hint from the remote (HEAD usually carries one).
    pub symref_target: Option<String>,
}

impl Ref {
    pub fn new(name: impl Into<String>, oid: Oid) -> Self {
        Self {
            name: name.into(),
            oid,
            peer_name: None,
            symref_target: None,
        }
    }

    pub fn with_symref_target(mut self, target: Option<String>) -> Self {
        self.symref_target = target;
        self
    }
}

/// Ordered advertised reference set. Names are unique; the first entry named
/// `HEAD`, if any, is the symbolic-ref pointer.
#[derive(Debug, Clone, Default)]
pub struct RefSet {
    refs: Vec<Ref>,
}

impl RefSet {
    pub fn new(refs: Vec<Ref>) -> Self {
        debug_assert!(
            {
                let mut names: Vec<&str> = refs.iter().map(|r| r.name.as_str()).collect();
                names.sort_unstable();
                names.windows(2).all(|w| w[0] != w[1])
            },
            "advertised ref names must be unique"
        );
        Self { refs }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Ref> {
        self.refs.iter()
    }

    pub fn as_slice(&self) -> &[Ref] {
        &self.refs
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn find(&self, name: &str) -> Option<&Ref> {
        self.refs.iter().find(|r| r.name == name)
    }

    /// The advertised HEAD, when the remote sent one.
    pub fn head(&self) -> Option<&Ref> {
        self.find("HEAD")
    }

    /// True when some advertised ref carries a null object id (the transport
    /// could not resolve it without fetching).
    pub fn has_null_oid(&self) -> bool {
        self.refs.iter().any(|r| r.oid.is_zero())
    }
}

impl IntoIterator for RefSet {
    type Item = Ref;
    type IntoIter = std::vec::IntoIter<Ref>;

    fn into_iter(self) -> Self::IntoIter {
        self.refs.into_iter()
    }
}

#[cfg(test)]
pub(crate) fn oid(byte: u8) -> Oid {
    Oid::from_bytes(&[byte; 20]).unwrap()
}
