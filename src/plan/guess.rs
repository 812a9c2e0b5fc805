//! Destination-name guessing
//!
//! Derives a local directory name from the source identifier when no
//! destination was given on the command line.

use crate::error::{CloneError, Result};

fn is_dir_sep(b: u8) -> bool {
    b == b'/'
}

/// Guess the destination directory name for `repo`.
///
/// Strips scheme, credentials, a trailing `/.git` component, a trailing port
/// (hostname-only sources), and the `.git`/`.bundle` suffix, then takes the
/// last path component. Colons count as path separators so `foo:bar.git`
/// guesses `bar`. For bare clones the result gets a `.git` suffix.
pub fn guess_dir_name(repo: &str, is_bundle: bool, is_bare: bool) -> Result<String> {
    let bytes = repo.as_bytes();
    let mut start = match repo.find("://") {
        Some(pos) => pos + 3,
        None => 0,
    };
    let mut end = bytes.len();

    // Credentials strip greedily, up to the last '@' inside the host part.
    let mut ptr = start;
    while ptr < end && !is_dir_sep(bytes[ptr]) {
        if bytes[ptr] == b'@' {
            start = ptr + 1;
        }
        ptr += 1;
    }

    // Trailing spaces, slashes and /.git
    while start < end && (is_dir_sep(bytes[end - 1]) || bytes[end - 1].is_ascii_whitespace()) {
        end -= 1;
    }
    if end - start > 5 && is_dir_sep(bytes[end - 5]) && &bytes[end - 4..end] == b".git" {
        end -= 5;
        while start < end && is_dir_sep(bytes[end - 1]) {
            end -= 1;
        }
    }

    // A trailing port is stripped only from a plain host:port source; a path
    // like '/foo/bar:2222.git' keeps guessing '2222' for compatibility.
    if !bytes[start..end].contains(&b'/') && bytes[start..end].contains(&b':') {
        let mut ptr = end;
        while start < ptr && bytes[ptr - 1].is_ascii_digit() {
            ptr -= 1;
        }
        if start < ptr && bytes[ptr - 1] == b':' {
            end = ptr - 1;
        }
    }

    // Last component; colons double as separators.
    let mut ptr = end;
    while start < ptr && !is_dir_sep(bytes[ptr - 1]) && bytes[ptr - 1] != b':' {
        ptr -= 1;
    }
    start = ptr;

    let suffix: &[u8] = if is_bundle { b".bundle" } else { b".git" };
    let mut len = end - start;
    if len >= suffix.len() && &bytes[end - suffix.len()..end] == suffix {
        len -= suffix.len();
    }

    let component = &bytes[start..start + len];
    if component.is_empty() || component == b"/" {
        return Err(CloneError::NoDirName {
            repo: repo.to_string(),
        });
    }

    let mut raw = component.to_vec();
    if is_bare {
        raw.extend_from_slice(b".git");
    }

    // Collapse runs of control characters and whitespace into one space and
    // trim both ends.
    let mut out = Vec::with_capacity(raw.len());
    let mut prev_space = true;
    for &b in &raw {
        let b = if b < 0x20 { b' ' } else { b };
        if b == b' ' {
            if prev_space {
                continue;
            }
            prev_space = true;
        } else {
            prev_space = false;
        }
        out.push(b);
    }
    if prev_space {
        while out.last() == Some(&b' ') {
            out.pop();
        }
    }

    if out.is_empty() {
        return Err(CloneError::NoDirName {
            repo: repo.to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Drop trailing directory separators, keeping a lone leading one.
pub fn strip_trailing_slashes(dir: &str) -> String {
    let bytes = dir.as_bytes();
    let mut end = bytes.len();
    while end > 1 && is_dir_sep(bytes[end - 1]) {
        end -= 1;
    }
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guess(repo: &str) -> String {
        guess_dir_name(repo, false, false).unwrap()
    }

    #[test]
    fn test_plain_https_url() {
        assert_eq!(guess("https://example.com/foo.git"), "foo");
        assert_eq!(guess("https://example.com/foo"), "foo");
        assert_eq!(guess("https://example.com/foo/"), "foo");
    }

    #[test]
    fn test_bare_appends_git() {
        assert_eq!(
            guess_dir_name("https://example.com/foo.git", false, true).unwrap(),
            "foo.git"
        );
    }

    #[test]
    fn test_bundle_suffix() {
        assert_eq!(
            guess_dir_name("/srv/backups/foo.bundle", true, false).unwrap(),
            "foo"
        );
    }

    #[test]
    fn test_credentials_and_port_stripped() {
        assert_eq!(guess("https://user@example.com/x.git"), "x");
        assert_eq!(guess("https://example.com/user%40host:2222/x.git"), "x");
        assert_eq!(guess("example.com:2222"), "example.com");
    }

    #[test]
    fn test_colon_is_a_separator() {
        assert_eq!(guess("foo:bar.git"), "bar");
        assert_eq!(guess("host:/path/repo"), "repo");
    }

    #[test]
    fn test_path_with_numeric_git_component() {
        // Not a host:port, so the numeric component survives.
        assert_eq!(guess("/foo/bar:2222.git"), "2222");
    }

    #[test]
    fn test_trailing_dot_git_component() {
        assert_eq!(guess("https://example.com/foo/.git"), "foo");
        assert_eq!(guess("/work/repo/.git"), "repo");
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(guess("/srv/my \t repo"), "my repo");
        assert_eq!(guess("/srv/x\x01y"), "x y");
    }

    #[test]
    fn test_unguessable_sources() {
        assert!(guess_dir_name("/", false, false).is_err());
        assert!(guess_dir_name("https://", false, false).is_err());
        assert!(guess_dir_name(".git", false, false).is_err());
    }

    #[test]
    fn test_guess_is_idempotent() {
        for src in [
            "https://example.com/foo.git",
            "git@host.com:a/b.git",
            "/srv/repos/thing",
            "foo:bar.git",
            "example.com:9418",
        ] {
            let once = guess(src);
            assert_eq!(guess(&once), once, "guess not idempotent for {src}");
        }
    }

    #[test]
    fn test_strip_trailing_slashes() {
        assert_eq!(strip_trailing_slashes("a/b//"), "a/b");
        assert_eq!(strip_trailing_slashes("/"), "/");
        assert_eq!(strip_trailing_slashes("plain"), "plain");
    }
}
