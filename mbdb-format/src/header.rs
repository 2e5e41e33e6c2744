// Plain ASCII on purpose: the magic doubles as a cheap eyeball check when
// poking at a staging directory with a hex dumper.
pub(crate) const MAGIC_BYTES: &[u8; 4] = b"mbdb";

/// The one supported manifest version, as a big-endian u16 (`0x05 0x00` on
/// the wire). There is no forward-compatibility shimming: any other version
/// is a fatal mismatch.
pub const VERSION: u16 = 0x0500;
