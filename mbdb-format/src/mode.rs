use bitflags::bitflags;

bitflags! {
    /// POSIX-style mode bits as they appear in a manifest record's `mode`
    /// field. File-type values live under [TYPE_MASK][FileMode::TYPE_MASK]
    /// and are mutually exclusive; permission bits combine freely.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FileMode: u16 {
        const FIFO = 0o010000;
        const CHAR_DEVICE = 0o020000;
        const DIRECTORY = 0o040000;
        const BLOCK_DEVICE = 0o060000;
        const REGULAR = 0o100000;
        const SYMLINK = 0o120000;
        const SOCKET = 0o140000;

        const SET_UID = 0o004000;
        const SET_GID = 0o002000;
        const STICKY = 0o001000;

        const OWNER_READ = 0o000400;
        const OWNER_WRITE = 0o000200;
        const OWNER_EXEC = 0o000100;
        const GROUP_READ = 0o000040;
        const GROUP_WRITE = 0o000020;
        const GROUP_EXEC = 0o000010;
        const OTHER_READ = 0o000004;
        const OTHER_WRITE = 0o000002;
        const OTHER_EXEC = 0o000001;
    }
}

/// The seven file kinds a mode field can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Fifo,
    CharDevice,
    Directory,
    BlockDevice,
    Regular,
    Symlink,
    Socket,
}

impl FileMode {
    /// Mask isolating the file-type field.
    pub const TYPE_MASK: u16 = 0o170000;

    /// `rw-r--r--`, applied to entries that don't override their mode.
    pub const DEFAULT_PERMISSIONS: FileMode = FileMode::from_bits_retain(0o644);

    /// Resolve the file-type field, or `None` when it holds no type or a
    /// combination that isn't one of the seven known kinds.
    pub fn file_type(self) -> Option<FileType> {
        match self.bits() & Self::TYPE_MASK {
            0o010000 => Some(FileType::Fifo),
            0o020000 => Some(FileType::CharDevice),
            0o040000 => Some(FileType::Directory),
            0o060000 => Some(FileType::BlockDevice),
            0o100000 => Some(FileType::Regular),
            0o120000 => Some(FileType::Symlink),
            0o140000 => Some(FileType::Socket),
            _ => None,
        }
    }

    /// Everything but the file-type field.
    pub fn permissions(self) -> FileMode {
        FileMode::from_bits_retain(self.bits() & !Self::TYPE_MASK)
    }
}
