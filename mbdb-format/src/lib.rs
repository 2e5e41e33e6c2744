//! Herein lies the brains of the `mbdb` manifest format.
//!
//! Use [Manifest] to encode and decode manifest streams, and [Backup] to
//! lay a full archive out on disk in the shape a restore consumer expects.

mod backup;
mod de;
mod entry;
mod header;
mod mode;
mod record;
mod ser;

pub use backup::{content_address, Backup, MaterializeError, MANIFEST_FILENAME};
pub use de::Error;
pub use entry::{BackupEntry, DirectoryEntry, FileEntry, SymlinkEntry};
pub use header::VERSION;
pub use mode::{FileMode, FileType};
pub use record::{Manifest, ManifestRecord, Property, SENTINEL_LEN};
