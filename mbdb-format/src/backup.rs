use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use plist::{Dictionary, Value};
use sha1::{Digest, Sha1};

use crate::entry::BackupEntry;
use crate::record::Manifest;

pub const MANIFEST_FILENAME: &str = "Manifest.mbdb";
const STATUS_FILENAME: &str = "Status.plist";
const METADATA_FILENAME: &str = "Manifest.plist";
const INFO_FILENAME: &str = "Info.plist";

// Opaque, pre-generated key bag. The consumer validates its structure; this
// crate never parses it.
const BACKUP_KEY_BAG: &[u8] = include_bytes!("../assets/backup.keybag");

/// Errors raised while laying an archive out in a staging directory. There
/// is no partial-write recovery: on any failure the caller discards the
/// whole directory.
#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error("Writing content file failed. Path: '{}'", .1.display())]
    WriteContent(#[source] io::Error, PathBuf),

    #[error("Encoding manifest failed.")]
    EncodeManifest(#[source] io::Error),

    #[error("Writing manifest failed. Path: '{}'", .1.display())]
    WriteManifest(#[source] io::Error, PathBuf),

    #[error("Encoding descriptor failed. Path: '{}'", .1.display())]
    EncodeDescriptor(#[source] plist::Error, PathBuf),

    #[error("Writing descriptor failed. Path: '{}'", .1.display())]
    WriteDescriptor(#[source] io::Error, PathBuf),
}

/// An ordered set of entries, consumed once by
/// [write_to_directory][Backup::write_to_directory]. Order is preserved
/// into the manifest; the consumer makes no restore-order promise from it.
#[derive(Debug, Clone, Default)]
pub struct Backup {
    pub entries: Vec<BackupEntry>,
}

impl Backup {
    pub fn new(entries: Vec<BackupEntry>) -> Backup {
        Backup { entries }
    }

    /// Project every entry into its record, in archive order. Projection is
    /// on demand: records are not cached between calls.
    pub fn manifest(&self) -> Manifest {
        Manifest {
            records: self.entries.iter().map(BackupEntry::to_record).collect(),
        }
    }

    /// Materialize the archive into `dir`, which must already exist and be
    /// writable: one content file per regular-file entry plus the manifest
    /// and the three descriptor files the restore consumer requires.
    pub fn write_to_directory(&self, dir: &Path) -> Result<(), MaterializeError> {
        for entry in &self.entries {
            if let BackupEntry::File(file) = entry {
                let path = dir.join(content_address(&file.domain, &file.path));
                tracing::debug!(
                    bytes = file.contents.len(),
                    path = %path.display(),
                    "writing content file"
                );
                std::fs::write(&path, &file.contents)
                    .map_err(|source| MaterializeError::WriteContent(source, path))?;
            }
        }

        let manifest_path = dir.join(MANIFEST_FILENAME);
        let manifest = self
            .manifest()
            .to_bytes()
            .map_err(MaterializeError::EncodeManifest)?;
        std::fs::write(&manifest_path, manifest)
            .map_err(|source| MaterializeError::WriteManifest(source, manifest_path))?;

        write_descriptor(dir, STATUS_FILENAME, &status_descriptor())?;
        write_descriptor(dir, METADATA_FILENAME, &metadata_descriptor())?;
        write_descriptor(dir, INFO_FILENAME, &Value::Dictionary(Dictionary::new()))?;

        tracing::debug!(
            entries = self.entries.len(),
            dir = %dir.display(),
            "staged backup archive"
        );
        Ok(())
    }
}

/// The content-addressed filename for a regular file's payload: lowercase
/// hex of the 20-byte digest of `domain + "-" + path`. Addressing is by
/// identity, not content. Two entries with the same identity but different
/// bytes land on the same name, last write wins.
pub fn content_address(domain: &str, path: &str) -> String {
    let digest = Sha1::digest(format!("{domain}-{path}").as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

fn status_descriptor() -> Value {
    let mut dict = Dictionary::new();
    dict.insert("BackupState".into(), Value::from("new"));
    dict.insert("Date".into(), Value::Date(SystemTime::UNIX_EPOCH.into()));
    dict.insert("IsFullBackup".into(), Value::Boolean(false));
    dict.insert("SnapshotState".into(), Value::from("finished"));
    dict.insert(
        "UUID".into(),
        Value::from("00000000-0000-0000-0000-000000000000"),
    );
    dict.insert("Version".into(), Value::from("2.4"));
    Value::Dictionary(dict)
}

fn metadata_descriptor() -> Value {
    let mut dict = Dictionary::new();
    dict.insert("BackupKeyBag".into(), Value::Data(BACKUP_KEY_BAG.to_vec()));
    dict.insert("Lockdown".into(), Value::Dictionary(Dictionary::new()));
    dict.insert("SystemDomainsVersion".into(), Value::from("20.0"));
    dict.insert("Version".into(), Value::from("9.1"));
    Value::Dictionary(dict)
}

fn write_descriptor(dir: &Path, name: &str, value: &Value) -> Result<(), MaterializeError> {
    let path = dir.join(name);
    let file = File::create(&path)
        .map_err(|source| MaterializeError::WriteDescriptor(source, path.clone()))?;
    value
        .to_writer_xml(BufWriter::new(file))
        .map_err(|source| MaterializeError::EncodeDescriptor(source, path))?;
    Ok(())
}
