//! BIOS Parameter Block decoding.
//!
//! The BPB occupies the first sector of the volume: 36 bytes of fields
//! common to all FAT widths, the FAT32 extension, 420 bytes of boot code
//! padding, and the `0x55 0xAA` signature at bytes 510-511. A second copy
//! lives in the backup boot sector (conventionally sector 6).

use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::ErrorKind;

/// Decoded BIOS Parameter Block, common fields plus the FAT32 extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bpb {
    pub jmp_boot: [u8; 3],
    pub oem_name: [u8; 8],
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sector_count: u16,
    pub num_fats: u8,
    pub root_entry_count: u16,
    pub total_sectors_16: u16,
    pub media: u8,
    pub fat_size_16: u16,
    pub sectors_per_track: u16,
    pub num_heads: u16,
    pub hidden_sectors: u32,
    pub total_sectors_32: u32,
    /// Sectors per FAT copy.
    pub fat_size_32: u32,
    pub ext_flags: u16,
    pub fs_version: u16,
    /// First data cluster of the root directory, conventionally 2.
    pub root_cluster: u32,
    /// Sector number of the FSInfo sector, conventionally 1.
    pub fsinfo_sector: u16,
    /// Sector number of the backup boot sector, conventionally 6.
    pub backup_boot_sector: u16,
    pub drive_num: u8,
    pub boot_sig: u8,
    pub volume_id: u32,
    /// Volume label, space padded.
    pub volume_label: [u8; 11],
    /// Filesystem type string, space padded (informational only).
    pub fs_type: [u8; 8],
}

impl Bpb {
    /// Decode a BPB starting at the handle's current position.
    ///
    /// Reads the full sector (fields, 420-byte padding, signature word)
    /// and leaves the cursor just past byte 511 of the copy. Fails with
    /// `InvalidSignature` when the signature word is not `0x55 0xAA` and
    /// with `InvalidGeometry` when the decoded fields violate the volume
    /// invariants.
    pub fn decode<D: Read + Seek>(disk: &mut D) -> Result<Self, ErrorKind> {
        let mut jmp_boot = [0u8; 3];
        disk.read_exact(&mut jmp_boot)?;
        let mut oem_name = [0u8; 8];
        disk.read_exact(&mut oem_name)?;

        let bytes_per_sector = disk.read_u16::<LittleEndian>()?;
        let sectors_per_cluster = disk.read_u8()?;
        let reserved_sector_count = disk.read_u16::<LittleEndian>()?;
        let num_fats = disk.read_u8()?;
        let root_entry_count = disk.read_u16::<LittleEndian>()?;
        let total_sectors_16 = disk.read_u16::<LittleEndian>()?;
        let media = disk.read_u8()?;
        let fat_size_16 = disk.read_u16::<LittleEndian>()?;
        let sectors_per_track = disk.read_u16::<LittleEndian>()?;
        let num_heads = disk.read_u16::<LittleEndian>()?;
        let hidden_sectors = disk.read_u32::<LittleEndian>()?;
        let total_sectors_32 = disk.read_u32::<LittleEndian>()?;

        let fat_size_32 = disk.read_u32::<LittleEndian>()?;
        let ext_flags = disk.read_u16::<LittleEndian>()?;
        let fs_version = disk.read_u16::<LittleEndian>()?;
        let root_cluster = disk.read_u32::<LittleEndian>()?;
        let fsinfo_sector = disk.read_u16::<LittleEndian>()?;
        let backup_boot_sector = disk.read_u16::<LittleEndian>()?;
        disk.seek(SeekFrom::Current(12))?; // reserved

        let drive_num = disk.read_u8()?;
        disk.seek(SeekFrom::Current(1))?; // reserved
        let boot_sig = disk.read_u8()?;
        let volume_id = disk.read_u32::<LittleEndian>()?;
        let mut volume_label = [0u8; 11];
        disk.read_exact(&mut volume_label)?;
        let mut fs_type = [0u8; 8];
        disk.read_exact(&mut fs_type)?;

        disk.seek(SeekFrom::Current(420))?; // boot code padding
        let mut signature = [0u8; 2];
        disk.read_exact(&mut signature)?;
        if signature != [0x55, 0xAA] {
            return Err(ErrorKind::InvalidSignature);
        }

        if !bytes_per_sector.is_power_of_two() || bytes_per_sector < 512 {
            return Err(ErrorKind::InvalidGeometry);
        }
        if !sectors_per_cluster.is_power_of_two() {
            return Err(ErrorKind::InvalidGeometry);
        }
        if reserved_sector_count == 0 {
            return Err(ErrorKind::InvalidGeometry);
        }

        Ok(Bpb {
            jmp_boot,
            oem_name,
            bytes_per_sector,
            sectors_per_cluster,
            reserved_sector_count,
            num_fats,
            root_entry_count,
            total_sectors_16,
            media,
            fat_size_16,
            sectors_per_track,
            num_heads,
            hidden_sectors,
            total_sectors_32,
            fat_size_32,
            ext_flags,
            fs_version,
            root_cluster,
            fsinfo_sector,
            backup_boot_sector,
            drive_num,
            boot_sig,
            volume_id,
            volume_label,
            fs_type,
        })
    }

    /// Bytes in one cluster.
    pub fn cluster_size(&self) -> u32 {
        self.bytes_per_sector as u32 * self.sectors_per_cluster as u32
    }

    /// Number of FAT entries to hold: one per data cluster, plus one so
    /// the highest cluster number indexes in range.
    pub fn max_clusters(&self) -> u32 {
        let data_sectors = self.total_sectors_32
            - (self.reserved_sector_count as u32 + self.num_fats as u32 * self.fat_size_32);
        data_sectors / self.sectors_per_cluster as u32 + 1
    }

    /// Byte offset of the primary FAT.
    pub fn fat_offset(&self) -> u64 {
        self.reserved_sector_count as u64 * self.bytes_per_sector as u64
    }

    /// Byte offset of the backup FAT, one FAT-size past the primary.
    pub fn backup_fat_offset(&self) -> u64 {
        (self.reserved_sector_count as u64 + self.fat_size_32 as u64)
            * self.bytes_per_sector as u64
    }

    /// Volume label with the space padding trimmed.
    pub fn volume_label_str(&self) -> String {
        String::from_utf8_lossy(&self.volume_label).trim_end().to_string()
    }

    /// Filesystem type string with the space padding trimmed.
    pub fn fs_type_str(&self) -> String {
        String::from_utf8_lossy(&self.fs_type).trim_end().to_string()
    }
}
