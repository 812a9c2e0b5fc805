//! Bundle-header parsing
//!
//! A bundle header names the tip references anchoring a pack. The indexing
//! step leaves one next to the primer pack as a `.bndl` file; its tips pin
//! the primed objects during negotiation.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use git2::Oid;

use crate::error::{CloneError, Result};

const BUNDLE_SIGNATURE: &str = "# v2 git bundle";

/// A tip reference recorded in a bundle header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleTip {
    pub oid: Oid,
    pub name: String,
}

/// Read the tip references from a bundle header file.
///
/// Prerequisite lines (leading `-`) are skipped; reading stops at the blank
/// line that separates the header from pack data.
pub fn read_bundle_tips(path: &Path) -> Result<Vec<BundleTip>> {
    let file = File::open(path).map_err(|err| CloneError::Io {
        message: format!("could not open bundle header '{}': {}", path.display(), err),
    })?;
    let mut reader = BufReader::new(file);

    let mut line = String::new();
    reader.read_line(&mut line)?;
    if line.trim_end() != BUNDLE_SIGNATURE {
        return Err(CloneError::Git {
            message: format!("'{}' is not a v2 bundle header", path.display()),
        });
    }

    let mut tips = Vec::new();
    loop {
        line.clear();
        let read = reader.read_line(&mut line)?;
        if read == 0 {
            break;
        }
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            break;
        }
        if trimmed.starts_with('-') {
            continue;
        }
        let (hex, name) = trimmed.split_once(' ').ok_or_else(|| CloneError::Git {
            message: format!("malformed bundle reference line: '{trimmed}'"),
        })?;
        let oid = Oid::from_str(hex).map_err(|_| CloneError::Git {
            message: format!("malformed bundle object id: '{hex}'"),
        })?;
        tips.push(BundleTip {
            oid,
            name: name.to_string(),
        });
    }

    Ok(tips)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const TIP_A: &str = "0123456789abcdef0123456789abcdef01234567";
    const TIP_B: &str = "89abcdef0123456789abcdef0123456789abcdef";

    fn write_header(dir: &TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("primer.bndl");
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_read_tips() {
        let temp = TempDir::new().unwrap();
        let path = write_header(
            &temp,
            &format!("# v2 git bundle\n{TIP_A} refs/heads/main\n{TIP_B} refs/tags/v1\n\n"),
        );
        let tips = read_bundle_tips(&path).unwrap();
        assert_eq!(tips.len(), 2);
        assert_eq!(tips[0].name, "refs/heads/main");
        assert_eq!(tips[0].oid, Oid::from_str(TIP_A).unwrap());
        assert_eq!(tips[1].name, "refs/tags/v1");
    }

    #[test]
    fn test_prerequisites_skipped() {
        let temp = TempDir::new().unwrap();
        let path = write_header(
            &temp,
            &format!("# v2 git bundle\n-{TIP_B} earlier commit\n{TIP_A} refs/heads/main\n\n"),
        );
        let tips = read_bundle_tips(&path).unwrap();
        assert_eq!(tips.len(), 1);
        assert_eq!(tips[0].name, "refs/heads/main");
    }

    #[test]
    fn test_reading_stops_at_blank_line() {
        let temp = TempDir::new().unwrap();
        let path = write_header(
            &temp,
            &format!("# v2 git bundle\n{TIP_A} refs/heads/main\n\nPACKbinarydata"),
        );
        let tips = read_bundle_tips(&path).unwrap();
        assert_eq!(tips.len(), 1);
    }

    #[test]
    fn test_bad_signature_rejected() {
        let temp = TempDir::new().unwrap();
        let path = write_header(&temp, "# v9 not a bundle\n");
        assert!(read_bundle_tips(&path).is_err());
    }

    #[test]
    fn test_malformed_reference_line_rejected() {
        let temp = TempDir::new().unwrap();
        let path = write_header(&temp, "# v2 git bundle\nnot-a-ref-line\n\n");
        assert!(read_bundle_tips(&path).is_err());
    }
}
