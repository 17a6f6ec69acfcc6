//! FAT table operations: entry lookup, free-cluster scan, end-of-chain
//! marking, and (de)serialization of a whole FAT copy.
//!
//! Entry 0 carries the media descriptor, entry 1 the canonical end-of-chain
//! marker; data clusters start at entry 2. The table is tagged by entry
//! width so a FAT16 volume can reuse the same accessors, but the FAT32
//! engine only ever constructs the 32-bit variant.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// Canonical FAT16 end-of-chain marker.
pub const FAT16_EOC: u16 = 0xFFFF;
/// Canonical FAT32 end-of-chain marker.
pub const FAT32_EOC: u32 = 0x0FFF_FFFF;

/// Smallest value the FAT16 convention treats as end-of-chain.
const FAT16_EOC_MIN: u16 = 0xFFF8;
/// Smallest value the FAT32 convention treats as end-of-chain.
const FAT32_EOC_MIN: u32 = 0x0FFF_FFF8;

/// In-memory File Allocation Table, tagged by entry width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatTable {
    Fat16(Vec<u16>),
    Fat32(Vec<u32>),
}

impl FatTable {
    /// Read `max_clusters` 32-bit entries from the handle's current position.
    pub fn read_fat32<D: Read>(disk: &mut D, max_clusters: u32) -> io::Result<Self> {
        let mut table = Vec::with_capacity(max_clusters as usize);
        for _ in 0..max_clusters {
            table.push(disk.read_u32::<LittleEndian>()?);
        }
        Ok(FatTable::Fat32(table))
    }

    /// Read `max_clusters` 16-bit entries from the handle's current position.
    pub fn read_fat16<D: Read>(disk: &mut D, max_clusters: u32) -> io::Result<Self> {
        let mut table = Vec::with_capacity(max_clusters as usize);
        for _ in 0..max_clusters {
            table.push(disk.read_u16::<LittleEndian>()?);
        }
        Ok(FatTable::Fat16(table))
    }

    /// Number of entries held.
    pub fn len(&self) -> usize {
        match self {
            FatTable::Fat16(t) => t.len(),
            FatTable::Fat32(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entry value for `cluster`. Out-of-range lookups terminate the chain.
    pub fn get(&self, cluster: u32) -> u32 {
        match self {
            FatTable::Fat16(t) => t
                .get(cluster as usize)
                .copied()
                .map(u32::from)
                .unwrap_or(FAT16_EOC as u32),
            FatTable::Fat32(t) => t.get(cluster as usize).copied().unwrap_or(FAT32_EOC),
        }
    }

    /// Canonical end-of-chain value: entry 1, when it carries the width's
    /// end-of-chain convention, else the width's canonical marker.
    pub fn eoc(&self) -> u32 {
        match self {
            FatTable::Fat16(t) => {
                let v = t.get(1).copied().unwrap_or(0);
                if v >= FAT16_EOC_MIN { v as u32 } else { FAT16_EOC as u32 }
            }
            FatTable::Fat32(t) => {
                let v = t.get(1).copied().unwrap_or(0);
                if v >= FAT32_EOC_MIN { v } else { FAT32_EOC }
            }
        }
    }

    /// Whether `value` marks the end of a chain under this width's convention.
    pub fn is_eoc(&self, value: u32) -> bool {
        match self {
            FatTable::Fat16(_) => value >= FAT16_EOC_MIN as u32,
            FatTable::Fat32(_) => value >= FAT32_EOC_MIN,
        }
    }

    /// Smallest free cluster number, scanning up from cluster 2.
    pub fn next_free(&self) -> Option<u32> {
        (2..self.len() as u32).find(|&i| self.get(i) == 0)
    }

    /// Terminate the chain at `cluster` with the canonical end-of-chain value.
    pub fn mark_eoc(&mut self, cluster: u32) {
        let eoc = self.eoc();
        match self {
            FatTable::Fat16(t) => {
                if let Some(e) = t.get_mut(cluster as usize) {
                    *e = eoc as u16;
                }
            }
            FatTable::Fat32(t) => {
                if let Some(e) = t.get_mut(cluster as usize) {
                    *e = eoc;
                }
            }
        }
    }

    /// Write every entry sequentially at the handle's current position.
    pub fn write_to<D: Write>(&self, disk: &mut D) -> io::Result<()> {
        match self {
            FatTable::Fat16(t) => {
                for &e in t {
                    disk.write_u16::<LittleEndian>(e)?;
                }
            }
            FatTable::Fat32(t) => {
                for &e in t {
                    disk.write_u32::<LittleEndian>(e)?;
                }
            }
        }
        Ok(())
    }
}
