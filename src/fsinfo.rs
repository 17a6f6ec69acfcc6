//! FSInfo sector codec.
//!
//! The FSInfo sector caches the free-cluster count and a next-free hint
//! so mounts do not have to scan the whole FAT. Three signature words
//! bracket the payload and must all validate.

use std::io::{self, Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::ErrorKind;

const LEAD_SIGNATURE: u32 = 0x4161_5252;
const STRUCTURE_SIGNATURE: u32 = 0x6141_7272;
const TRAILING_SIGNATURE: u32 = 0xAA55_0000;

/// `next_free` value meaning "no hint available".
pub(crate) const NO_HINT: u32 = 0xFFFF_FFFF;

/// Free-cluster accounting cached in the FSInfo sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsInfo {
    /// Count of free clusters on the volume.
    pub free_count: u32,
    /// Smallest cluster number the allocator should probe first.
    pub next_free: u32,
}

impl FsInfo {
    /// Decode an FSInfo sector starting at the handle's current position.
    pub fn decode<D: Read + Seek>(disk: &mut D) -> Result<Self, ErrorKind> {
        if disk.read_u32::<LittleEndian>()? != LEAD_SIGNATURE {
            return Err(ErrorKind::InvalidFsInfoSignature);
        }
        disk.seek(SeekFrom::Current(480))?;
        if disk.read_u32::<LittleEndian>()? != STRUCTURE_SIGNATURE {
            return Err(ErrorKind::InvalidFsInfoSignature);
        }
        let free_count = disk.read_u32::<LittleEndian>()?;
        let next_free = disk.read_u32::<LittleEndian>()?;
        disk.seek(SeekFrom::Current(12))?;
        if disk.read_u32::<LittleEndian>()? != TRAILING_SIGNATURE {
            return Err(ErrorKind::InvalidFsInfoSignature);
        }
        Ok(FsInfo { free_count, next_free })
    }

    /// Write the sector at the given byte offset, re-emitting the three
    /// signature words. Bytes in the reserved gaps are left untouched.
    pub fn encode<D: Write + Seek>(&self, disk: &mut D, offset: u64) -> io::Result<()> {
        disk.seek(SeekFrom::Start(offset))?;
        disk.write_u32::<LittleEndian>(LEAD_SIGNATURE)?;
        disk.seek(SeekFrom::Current(480))?;
        disk.write_u32::<LittleEndian>(STRUCTURE_SIGNATURE)?;
        disk.write_u32::<LittleEndian>(self.free_count)?;
        disk.write_u32::<LittleEndian>(self.next_free)?;
        disk.seek(SeekFrom::Current(12))?;
        disk.write_u32::<LittleEndian>(TRAILING_SIGNATURE)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn encode_decode_round_trip() {
        let info = FsInfo { free_count: 16321, next_free: 3 };
        let mut disk = Cursor::new(vec![0u8; 512]);
        info.encode(&mut disk, 0).unwrap();
        disk.set_position(0);
        assert_eq!(FsInfo::decode(&mut disk).unwrap(), info);
    }

    #[test]
    fn rejects_bad_lead_signature() {
        let info = FsInfo { free_count: 1, next_free: 2 };
        let mut disk = Cursor::new(vec![0u8; 512]);
        info.encode(&mut disk, 0).unwrap();
        disk.get_mut()[0] = 0x00;
        disk.set_position(0);
        let err = FsInfo::decode(&mut disk).unwrap_err();
        assert!(matches!(err, ErrorKind::InvalidFsInfoSignature));
    }

    #[test]
    fn rejects_bad_structure_signature() {
        let info = FsInfo { free_count: 1, next_free: 2 };
        let mut disk = Cursor::new(vec![0u8; 512]);
        info.encode(&mut disk, 0).unwrap();
        disk.get_mut()[484] = 0x00;
        disk.set_position(0);
        let err = FsInfo::decode(&mut disk).unwrap_err();
        assert!(matches!(err, ErrorKind::InvalidFsInfoSignature));
    }
}
