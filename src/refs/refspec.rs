//! Refspec application
//!
//! A refspec is a value: applying it to an advertised ref set is a pure
//! transformation that populates local peer names.

use crate::error::{CloneError, Result};

/// A single fetch mapping rule `[+]<src>:<dst>`, possibly with one `*`
/// wildcard on each side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refspec {
    pub force: bool,
    pub src: String,
    pub dst: String,
}

impl Refspec {
    pub fn new(force: bool, src: impl Into<String>, dst: impl Into<String>) -> Self {
        Self {
            force,
            src: src.into(),
            dst: dst.into(),
        }
    }

    /// Parse `[+]src:dst`. Both sides must carry the same number of `*`
    /// wildcards (zero or one).
    pub fn parse(spec: &str) -> Result<Self> {
        let bad = || CloneError::ConfigWriteFailed {
            message: format!("invalid fetch refspec '{spec}'"),
        };

        let (force, rest) = match spec.strip_prefix('+') {
            Some(rest) => (true, rest),
            None => (false, spec),
        };
        let (src, dst) = rest.split_once(':').ok_or_else(bad)?;
        let wildcards = |s: &str| s.matches('*').count();
        if wildcards(src) > 1 || wildcards(src) != wildcards(dst) || dst.is_empty() {
            return Err(bad());
        }
        Ok(Self::new(force, src, dst))
    }

    /// The standard tag-following refspec.
    pub fn tags() -> Self {
        Self::new(false, "refs/tags/*", "refs/tags/*")
    }

    /// Map an advertised name through this rule, yielding the local name.
    pub fn map_name(&self, name: &str) -> Option<String> {
        match self.src.split_once('*') {
            Some((prefix, suffix)) => {
                let middle = name.strip_prefix(prefix)?.strip_suffix(suffix)?;
                let (dst_prefix, dst_suffix) = self.dst.split_once('*')?;
                Some(format!("{dst_prefix}{middle}{dst_suffix}"))
            }
            None => (name == self.src).then(|| self.dst.clone()),
        }
    }

    /// Render back to the config-file form.
    pub fn to_config_string(&self) -> String {
        let force = if self.force { "+" } else { "" };
        format!("{force}{}:{}", self.src, self.dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forced_pattern() {
        let spec = Refspec::parse("+refs/heads/*:refs/remotes/origin/*").unwrap();
        assert!(spec.force);
        assert_eq!(spec.src, "refs/heads/*");
        assert_eq!(spec.dst, "refs/remotes/origin/*");
    }

    #[test]
    fn test_parse_literal() {
        let spec = Refspec::parse("+refs/heads/main:refs/remotes/origin/main").unwrap();
        assert_eq!(
            spec.map_name("refs/heads/main").as_deref(),
            Some("refs/remotes/origin/main")
        );
        assert_eq!(spec.map_name("refs/heads/other"), None);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Refspec::parse("refs/heads/*").is_err());
        assert!(Refspec::parse("+refs/heads/*:refs/remotes/origin/x").is_err());
        assert!(Refspec::parse("+a**:b**").is_err());
    }

    #[test]
    fn test_map_pattern() {
        let spec = Refspec::parse("+refs/heads/*:refs/remotes/origin/*").unwrap();
        assert_eq!(
            spec.map_name("refs/heads/main").as_deref(),
            Some("refs/remotes/origin/main")
        );
        assert_eq!(spec.map_name("refs/tags/v1"), None);
        assert_eq!(spec.map_name("HEAD"), None);
    }

    #[test]
    fn test_mirror_pattern_maps_everything() {
        let spec = Refspec::parse("+refs/*:refs/*").unwrap();
        assert_eq!(
            spec.map_name("refs/tags/v1").as_deref(),
            Some("refs/tags/v1")
        );
        assert_eq!(
            spec.map_name("refs/heads/dev").as_deref(),
            Some("refs/heads/dev")
        );
    }

    #[test]
    fn test_round_trip_config_string() {
        for raw in ["+refs/heads/*:refs/remotes/up/*", "refs/tags/*:refs/tags/*"] {
            assert_eq!(Refspec::parse(raw).unwrap().to_config_string(), raw);
        }
    }
}
