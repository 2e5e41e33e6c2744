use std::io::{self, Write};

use byteorder::{BigEndian, WriteBytesExt};

use crate::header::{MAGIC_BYTES, VERSION};
use crate::record::{Manifest, ManifestRecord, Property, SENTINEL_LEN};

pub(crate) trait Serialize {
    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()>;
}

fn write_len16<W: Write>(writer: &mut W, len: usize) -> io::Result<()> {
    // Lengths at or past the sentinel are unrepresentable: 0xFFFF on the
    // wire means "absent", not "65535 bytes follow".
    if len >= usize::from(SENTINEL_LEN) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("field of {} bytes does not fit a length prefix", len),
        ));
    }
    writer.write_u16::<BigEndian>(len as u16)
}

impl Serialize for str {
    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_len16(writer, self.len())?;
        writer.write_all(self.as_bytes())
    }
}

impl Serialize for [u8] {
    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_len16(writer, self.len())?;
        writer.write_all(self)
    }
}

impl Serialize for Property {
    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.name.as_str().write(writer)?;
        self.value.as_str().write(writer)
    }
}

impl Serialize for ManifestRecord {
    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.domain.as_str().write(writer)?;
        self.filename.as_str().write(writer)?;
        self.link.as_str().write(writer)?;
        self.hash.as_slice().write(writer)?;
        self.key.as_slice().write(writer)?;

        writer.write_u16::<BigEndian>(self.mode.bits())?;
        writer.write_u64::<BigEndian>(self.inode)?;
        writer.write_u32::<BigEndian>(self.user_id)?;
        writer.write_u32::<BigEndian>(self.group_id)?;
        writer.write_u32::<BigEndian>(self.mtime)?;
        writer.write_u32::<BigEndian>(self.atime)?;
        writer.write_u32::<BigEndian>(self.ctime)?;
        writer.write_u64::<BigEndian>(self.size)?;
        writer.write_u8(self.flags)?;

        let count = u8::try_from(self.properties.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} properties do not fit a count byte", self.properties.len()),
            )
        })?;
        writer.write_u8(count)?;
        for property in &self.properties {
            property.write(writer)?;
        }
        Ok(())
    }
}

impl Serialize for Manifest {
    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(MAGIC_BYTES)?;
        writer.write_u16::<BigEndian>(VERSION)?;
        for record in &self.records {
            record.write(writer)?;
        }
        Ok(())
    }
}

impl ManifestRecord {
    /// Encode this record alone, without the container header.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write(&mut buf)?;
        Ok(buf)
    }
}

impl Manifest {
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.write(writer)
    }

    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write(&mut buf)?;
        Ok(buf)
    }
}
