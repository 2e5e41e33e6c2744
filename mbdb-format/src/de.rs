use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt};

use crate::header::{MAGIC_BYTES, VERSION};
use crate::mode::FileMode;
use crate::record::{Manifest, ManifestRecord, Property, SENTINEL_LEN};

/// Errors raised while decoding a manifest stream. All of them are fatal to
/// the decode operation; no record is individually retryable.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid magic bytes (not an mbdb manifest)")]
    InvalidMagic,

    #[error("unsupported manifest version: {0:#06x}")]
    UnsupportedVersion(u16),

    #[error("unexpected end of data reading {0}")]
    Truncated(&'static str),

    #[error("invalid UTF-8 in {field}")]
    InvalidUtf8 {
        field: &'static str,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("mode {0:#08o} does not name exactly one file type")]
    InvalidMode(u16),
}

fn read_u8(cursor: &mut Cursor<&[u8]>, field: &'static str) -> Result<u8, Error> {
    cursor.read_u8().map_err(|_| Error::Truncated(field))
}

fn read_u16(cursor: &mut Cursor<&[u8]>, field: &'static str) -> Result<u16, Error> {
    cursor
        .read_u16::<BigEndian>()
        .map_err(|_| Error::Truncated(field))
}

fn read_u32(cursor: &mut Cursor<&[u8]>, field: &'static str) -> Result<u32, Error> {
    cursor
        .read_u32::<BigEndian>()
        .map_err(|_| Error::Truncated(field))
}

fn read_u64(cursor: &mut Cursor<&[u8]>, field: &'static str) -> Result<u64, Error> {
    cursor
        .read_u64::<BigEndian>()
        .map_err(|_| Error::Truncated(field))
}

/// Read a length-prefixed byte field, honoring the absent sentinel.
fn read_bytes(cursor: &mut Cursor<&[u8]>, field: &'static str) -> Result<Vec<u8>, Error> {
    let len = read_u16(cursor, field)?;
    if len == SENTINEL_LEN {
        return Ok(Vec::new());
    }
    let mut buf = vec![0u8; usize::from(len)];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| Error::Truncated(field))?;
    Ok(buf)
}

fn read_string(cursor: &mut Cursor<&[u8]>, field: &'static str) -> Result<String, Error> {
    let buf = read_bytes(cursor, field)?;
    String::from_utf8(buf).map_err(|source| Error::InvalidUtf8 { field, source })
}

pub(crate) fn read_record(cursor: &mut Cursor<&[u8]>, strict: bool) -> Result<ManifestRecord, Error> {
    let domain = read_string(cursor, "domain")?;
    let filename = read_string(cursor, "filename")?;
    let link = read_string(cursor, "link")?;
    let hash = read_bytes(cursor, "hash")?;
    let key = read_bytes(cursor, "key")?;

    let raw_mode = read_u16(cursor, "mode")?;
    // Unknown bit combinations are preserved opaquely unless the caller
    // asked for strict validation.
    let mode = FileMode::from_bits_retain(raw_mode);
    if strict && mode.file_type().is_none() {
        return Err(Error::InvalidMode(raw_mode));
    }

    let inode = read_u64(cursor, "inode")?;
    let user_id = read_u32(cursor, "user id")?;
    let group_id = read_u32(cursor, "group id")?;
    let mtime = read_u32(cursor, "mtime")?;
    let atime = read_u32(cursor, "atime")?;
    let ctime = read_u32(cursor, "ctime")?;
    let size = read_u64(cursor, "size")?;
    let flags = read_u8(cursor, "flags")?;

    let count = read_u8(cursor, "property count")?;
    let mut properties = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        let name = read_string(cursor, "property name")?;
        let value = read_string(cursor, "property value")?;
        properties.push(Property { name, value });
    }

    Ok(ManifestRecord {
        domain,
        filename,
        link,
        hash,
        key,
        mode,
        inode,
        user_id,
        group_id,
        mtime,
        atime,
        ctime,
        size,
        flags,
        properties,
    })
}

fn read_manifest(data: &[u8], strict: bool) -> Result<Manifest, Error> {
    let mut cursor = Cursor::new(data);

    let mut magic = [0u8; 4];
    cursor
        .read_exact(&mut magic)
        .map_err(|_| Error::Truncated("magic bytes"))?;
    if &magic != MAGIC_BYTES {
        return Err(Error::InvalidMagic);
    }

    let version = read_u16(&mut cursor, "version")?;
    if version != VERSION {
        return Err(Error::UnsupportedVersion(version));
    }

    let mut records = Vec::new();
    while (cursor.position() as usize) < data.len() {
        records.push(read_record(&mut cursor, strict)?);
    }

    tracing::debug!(
        bytes = data.len(),
        records = records.len(),
        "parsed manifest"
    );

    Ok(Manifest { records })
}

impl ManifestRecord {
    /// Decode one record from the start of `data`. Trailing bytes are left
    /// untouched; a short read anywhere inside the record is a corruption
    /// error.
    pub fn parse(data: &[u8]) -> Result<ManifestRecord, Error> {
        let mut cursor = Cursor::new(data);
        read_record(&mut cursor, false)
    }
}

impl Manifest {
    /// Decode a full manifest stream. Unknown mode bit combinations are
    /// preserved as-is.
    pub fn parse(data: &[u8]) -> Result<Manifest, Error> {
        read_manifest(data, false)
    }

    /// Decode a full manifest stream, rejecting any record whose mode does
    /// not name exactly one known file type.
    pub fn parse_strict(data: &[u8]) -> Result<Manifest, Error> {
        read_manifest(data, true)
    }
}
