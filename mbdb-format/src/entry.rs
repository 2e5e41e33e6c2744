use std::time::{SystemTime, UNIX_EPOCH};

use sha1::{Digest, Sha1};

use crate::mode::FileMode;
use crate::record::{ManifestRecord, FLAGS_NO_EXTENDED_DATA};

/// One entry of a backup archive. A closed set: the format knows exactly
/// these three file kinds.
#[derive(Debug, Clone)]
pub enum BackupEntry {
    File(FileEntry),
    Directory(DirectoryEntry),
    Symlink(SymlinkEntry),
}

impl BackupEntry {
    pub fn domain(&self) -> &str {
        match self {
            BackupEntry::File(file) => &file.domain,
            BackupEntry::Directory(dir) => &dir.domain,
            BackupEntry::Symlink(link) => &link.domain,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            BackupEntry::File(file) => &file.path,
            BackupEntry::Directory(dir) => &dir.path,
            BackupEntry::Symlink(link) => &link.path,
        }
    }

    /// Project this entry into its manifest record.
    pub fn to_record(&self) -> ManifestRecord {
        match self {
            BackupEntry::File(file) => file.to_record(),
            BackupEntry::Directory(dir) => dir.to_record(),
            BackupEntry::Symlink(link) => link.to_record(),
        }
    }
}

impl From<FileEntry> for BackupEntry {
    fn from(file: FileEntry) -> Self {
        BackupEntry::File(file)
    }
}

impl From<DirectoryEntry> for BackupEntry {
    fn from(dir: DirectoryEntry) -> Self {
        BackupEntry::Directory(dir)
    }
}

impl From<SymlinkEntry> for BackupEntry {
    fn from(link: SymlinkEntry) -> Self {
        BackupEntry::Symlink(link)
    }
}

/// A regular file carrying raw content bytes.
///
/// The inode is resolved once, at construction: minted uniformly at random
/// unless pinned with [with_inode][FileEntry::with_inode], so projecting
/// the same entry twice yields the same record (timestamps aside).
/// Collisions between entries are accepted and not checked.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: String,
    pub domain: String,
    pub contents: Vec<u8>,
    pub owner: u32,
    pub group: u32,
    pub inode: u64,
    pub mode: FileMode,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, domain: impl Into<String>, contents: Vec<u8>) -> FileEntry {
        FileEntry {
            path: path.into(),
            domain: domain.into(),
            contents,
            owner: 0,
            group: 0,
            inode: rand::random(),
            mode: FileMode::DEFAULT_PERMISSIONS,
        }
    }

    pub fn with_owner(mut self, owner: u32, group: u32) -> FileEntry {
        self.owner = owner;
        self.group = group;
        self
    }

    /// Pin the inode instead of keeping the randomly minted one. Any value
    /// is accepted, including 0.
    pub fn with_inode(mut self, inode: u64) -> FileEntry {
        self.inode = inode;
        self
    }

    pub fn with_mode(mut self, mode: FileMode) -> FileEntry {
        self.mode = mode;
        self
    }

    pub fn to_record(&self) -> ManifestRecord {
        ManifestRecord {
            domain: self.domain.clone(),
            filename: self.path.clone(),
            link: String::new(),
            hash: Sha1::digest(&self.contents).to_vec(),
            key: Vec::new(),
            mode: self.mode | FileMode::REGULAR,
            inode: self.inode,
            user_id: self.owner,
            group_id: self.group,
            mtime: unix_now(),
            atime: unix_now(),
            ctime: unix_now(),
            size: self.contents.len() as u64,
            flags: FLAGS_NO_EXTENDED_DATA,
            properties: Vec::new(),
        }
    }
}

/// A directory entry. Directories are not addressed by inode in this
/// format, so the variant carries none and its records always say inode 0.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub path: String,
    pub domain: String,
    pub owner: u32,
    pub group: u32,
    pub mode: FileMode,
}

impl DirectoryEntry {
    pub fn new(path: impl Into<String>, domain: impl Into<String>) -> DirectoryEntry {
        DirectoryEntry {
            path: path.into(),
            domain: domain.into(),
            owner: 0,
            group: 0,
            mode: FileMode::DEFAULT_PERMISSIONS,
        }
    }

    pub fn with_owner(mut self, owner: u32, group: u32) -> DirectoryEntry {
        self.owner = owner;
        self.group = group;
        self
    }

    pub fn with_mode(mut self, mode: FileMode) -> DirectoryEntry {
        self.mode = mode;
        self
    }

    pub fn to_record(&self) -> ManifestRecord {
        ManifestRecord {
            domain: self.domain.clone(),
            filename: self.path.clone(),
            link: String::new(),
            hash: Vec::new(),
            key: Vec::new(),
            mode: self.mode | FileMode::DIRECTORY,
            inode: 0,
            user_id: self.owner,
            group_id: self.group,
            mtime: unix_now(),
            atime: unix_now(),
            ctime: unix_now(),
            size: 0,
            flags: FLAGS_NO_EXTENDED_DATA,
            properties: Vec::new(),
        }
    }
}

/// A symbolic link pointing at `target`.
#[derive(Debug, Clone)]
pub struct SymlinkEntry {
    pub path: String,
    pub domain: String,
    pub target: String,
    pub owner: u32,
    pub group: u32,
    pub inode: u64,
    pub mode: FileMode,
}

impl SymlinkEntry {
    pub fn new(
        path: impl Into<String>,
        domain: impl Into<String>,
        target: impl Into<String>,
    ) -> SymlinkEntry {
        SymlinkEntry {
            path: path.into(),
            domain: domain.into(),
            target: target.into(),
            owner: 0,
            group: 0,
            inode: rand::random(),
            mode: FileMode::DEFAULT_PERMISSIONS,
        }
    }

    pub fn with_owner(mut self, owner: u32, group: u32) -> SymlinkEntry {
        self.owner = owner;
        self.group = group;
        self
    }

    pub fn with_inode(mut self, inode: u64) -> SymlinkEntry {
        self.inode = inode;
        self
    }

    pub fn with_mode(mut self, mode: FileMode) -> SymlinkEntry {
        self.mode = mode;
        self
    }

    pub fn to_record(&self) -> ManifestRecord {
        ManifestRecord {
            domain: self.domain.clone(),
            filename: self.path.clone(),
            link: self.target.clone(),
            hash: Vec::new(),
            key: Vec::new(),
            mode: self.mode | FileMode::SYMLINK,
            inode: self.inode,
            user_id: self.owner,
            group_id: self.group,
            mtime: unix_now(),
            atime: unix_now(),
            ctime: unix_now(),
            size: 0,
            flags: FLAGS_NO_EXTENDED_DATA,
            properties: Vec::new(),
        }
    }
}

// mtime/atime/ctime are captured independently and may differ between the
// three reads; the consumer does not cross-validate them.
fn unix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as u32)
        .unwrap_or(0)
}
