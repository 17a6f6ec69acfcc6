//! Short directory entries, the directory walker, the path resolver, and
//! directory creation.
//!
//! Directory data is a run of 32-byte slots. A slot whose first name byte
//! is `0x00` ends the listing (everything after it is free); `0xE5` marks
//! a deleted entry. A slot whose attribute byte is the long-name mask
//! belongs to an LDIR group that decorates the short entry following it.

use std::io::{self, Read, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::debug;

use crate::datetime::current_dos_datetime;
use crate::error::{ErrorKind, FsError};
use crate::file::File;
use crate::fsinfo::NO_HINT;
use crate::lfn::{self, LongEntry, LAST_LONG_ENTRY};
use crate::Volume;

/// Directory entry attribute: read-only file.
pub const ATTR_READ_ONLY: u8 = 0x01;
/// Directory entry attribute: hidden file.
pub const ATTR_HIDDEN: u8 = 0x02;
/// Directory entry attribute: system file.
pub const ATTR_SYSTEM: u8 = 0x04;
/// Directory entry attribute: volume label.
pub const ATTR_VOLUME_ID: u8 = 0x08;
/// Directory entry attribute: subdirectory.
pub const ATTR_DIRECTORY: u8 = 0x10;
/// Directory entry attribute: archive (modified since backup).
pub const ATTR_ARCHIVE: u8 = 0x20;
/// Attribute mask marking a long-name entry.
pub const ATTR_LONG_NAME: u8 =
    ATTR_READ_ONLY | ATTR_HIDDEN | ATTR_SYSTEM | ATTR_VOLUME_ID;

/// Size of one directory entry slot on disk.
pub const DIR_ENTRY_SIZE: u64 = 32;

/// First name byte ending a directory listing.
const ENTRY_END: u8 = 0x00;
/// First name byte of a deleted entry.
const ENTRY_DELETED: u8 = 0xE5;

/// One 32-byte short directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// 8.3 name, upper-case, space padded.
    pub name: [u8; 11],
    pub attr: u8,
    pub ntres: u8,
    pub crt_time_tenth: u8,
    pub crt_time: u16,
    pub crt_date: u16,
    pub lst_acc_date: u16,
    pub cluster_hi: u16,
    pub wrt_time: u16,
    pub wrt_date: u16,
    pub cluster_lo: u16,
    pub filesize: u32,
}

impl DirEntry {
    /// Build a fresh directory entry for `name`, stamped with the current
    /// UTC write time.
    pub(crate) fn new_directory(name: &str) -> Result<Self, ErrorKind> {
        let short = short_name(name)?;
        let (wrt_date, wrt_time) = current_dos_datetime();
        Ok(DirEntry {
            name: short,
            attr: ATTR_DIRECTORY,
            ntres: 0,
            crt_time_tenth: 0,
            crt_time: 0,
            crt_date: 0,
            lst_acc_date: 0,
            cluster_hi: 0,
            wrt_time,
            wrt_date,
            cluster_lo: 0,
            filesize: 0,
        })
    }

    /// Build a `.`/`..` entry. System names bypass character validation,
    /// whose `.` rejection would otherwise refuse their literal bytes.
    pub(crate) fn new_system(
        name: &str,
        attr: u8,
        cluster: u32,
        wrt_time: u16,
        wrt_date: u16,
    ) -> Self {
        DirEntry {
            name: format_short_name(name),
            attr,
            ntres: 0,
            crt_time_tenth: 0,
            crt_time: 0,
            crt_date: 0,
            lst_acc_date: 0,
            cluster_hi: (cluster >> 16) as u16,
            wrt_time,
            wrt_date,
            cluster_lo: cluster as u16,
            filesize: 0,
        }
    }

    /// Read the entry at the handle's current position, leaving the cursor
    /// at the next slot. Only the fields the engine consumes are decoded;
    /// the timestamp block is skipped.
    pub fn decode<D: Read + Seek>(disk: &mut D) -> io::Result<Self> {
        let mut name = [0u8; 11];
        disk.read_exact(&mut name)?;
        let attr = disk.read_u8()?;
        disk.seek(SeekFrom::Current(8))?;
        let cluster_hi = disk.read_u16::<LittleEndian>()?;
        disk.seek(SeekFrom::Current(4))?;
        let cluster_lo = disk.read_u16::<LittleEndian>()?;
        let filesize = disk.read_u32::<LittleEndian>()?;
        Ok(DirEntry {
            name,
            attr,
            ntres: 0,
            crt_time_tenth: 0,
            crt_time: 0,
            crt_date: 0,
            lst_acc_date: 0,
            cluster_hi,
            wrt_time: 0,
            wrt_date: 0,
            cluster_lo,
            filesize,
        })
    }

    /// Write all 32 bytes at `offset` in definition order; returns the
    /// offset just past the entry.
    pub fn encode_at<D: Write + Seek>(&self, disk: &mut D, offset: u64) -> io::Result<u64> {
        disk.seek(SeekFrom::Start(offset))?;
        disk.write_all(&self.name)?;
        disk.write_u8(self.attr)?;
        disk.write_u8(self.ntres)?;
        disk.write_u8(self.crt_time_tenth)?;
        disk.write_u16::<LittleEndian>(self.crt_time)?;
        disk.write_u16::<LittleEndian>(self.crt_date)?;
        disk.write_u16::<LittleEndian>(self.lst_acc_date)?;
        disk.write_u16::<LittleEndian>(self.cluster_hi)?;
        disk.write_u16::<LittleEndian>(self.wrt_time)?;
        disk.write_u16::<LittleEndian>(self.wrt_date)?;
        disk.write_u16::<LittleEndian>(self.cluster_lo)?;
        disk.write_u32::<LittleEndian>(self.filesize)?;
        disk.stream_position()
    }

    /// First cluster of the entry's data, composed from the split halves.
    pub fn first_cluster(&self) -> u32 {
        (self.cluster_hi as u32) << 16 | self.cluster_lo as u32
    }

    pub fn is_directory(&self) -> bool {
        self.attr & ATTR_DIRECTORY != 0
    }

    /// Short name with the space padding trimmed.
    pub fn short_name_string(&self) -> String {
        String::from_utf8_lossy(&self.name).trim_matches(' ').to_string()
    }
}

/// Whether FAT32 allows `c` in a short file name.
fn valid_character(c: char) -> bool {
    const FORBIDDEN: [char; 16] = [
        '"', '*', '+', ',', '.', '/', ':', ';', '<', '=', '>', '?', '[', '\\', ']', '|',
    ];
    if (c as u32) < 0x20 {
        return false;
    }
    !FORBIDDEN.contains(&c)
}

/// Format `name` into the 11-byte short form: upper-case, spaces stripped,
/// truncated to 11 characters, padded with `0x20`. No validation.
fn format_short_name(name: &str) -> [u8; 11] {
    let mut short = [0x20u8; 11];
    let cleaned = name.to_uppercase().replace(' ', "");
    for (i, c) in cleaned.chars().take(11).enumerate() {
        short[i] = c as u8;
    }
    short
}

/// Validate and format a user-supplied name into the short form.
fn short_name(name: &str) -> Result<[u8; 11], ErrorKind> {
    let cleaned = name.to_uppercase().replace(' ', "");
    for c in cleaned.chars().take(11) {
        if !valid_character(c) {
            return Err(ErrorKind::InvalidName);
        }
    }
    Ok(format_short_name(name))
}

/// Split a path into (parent, basename): `"/a/b"` -> `("/a", "b")`,
/// `"/b"` -> `("", "b")`.
fn split_path(path: &str) -> (&str, &str) {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(i) => (&trimmed[..i], &trimmed[i + 1..]),
        None => ("", trimmed),
    }
}

impl<D: Read + Write + Seek> Volume<D> {
    /// Resolve an absolute, slash-separated path to a [`File`].
    ///
    /// Descends from the root cluster one segment at a time, enumerating
    /// each directory's slots within its cluster chain. The returned
    /// `File` carries the entry's name (long if LDIRs precede it), its
    /// byte locations, and the parsed entries; contents are read
    /// separately via [`Volume::read`] or [`Volume::read_all`].
    pub fn read_file(&mut self, path: &str) -> Result<File, FsError> {
        self.lookup(path)
            .map_err(|kind| FsError::new("read_file", path, kind))
    }

    pub(crate) fn lookup(&mut self, path: &str) -> Result<File, ErrorKind> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Err(ErrorKind::NoFileSpecified);
        }

        let mut cluster = self.bpb.root_cluster;
        self.disk.seek(SeekFrom::Start(self.cluster_offset(cluster)))?;
        let mut boundary = self.cluster_offset(cluster + 1);

        let last = segments.len() - 1;
        for (i, segment) in segments.iter().enumerate() {
            let found = loop {
                let pos = self.disk.stream_position()?;
                if pos >= boundary {
                    // The listing may continue in the directory's next cluster.
                    match self.next_dir_cluster(cluster) {
                        Some(next) => {
                            cluster = next;
                            self.disk.seek(SeekFrom::Start(self.cluster_offset(next)))?;
                            boundary = self.cluster_offset(next + 1);
                            continue;
                        }
                        None => return Err(ErrorKind::NotFound),
                    }
                }
                match self.peek_entry_byte()? {
                    ENTRY_END => return Err(ErrorKind::NotFound),
                    ENTRY_DELETED => {
                        self.disk.seek(SeekFrom::Current(DIR_ENTRY_SIZE as i64))?;
                        continue;
                    }
                    _ => {}
                }
                let file = self.next_file()?;
                if file.name() == *segment {
                    break file;
                }
            };

            if i == last {
                return Ok(found);
            }
            if !found.dir_entry().is_directory() {
                return Err(ErrorKind::NotFound);
            }
            cluster = found.dir_entry().first_cluster();
            self.disk.seek(SeekFrom::Start(self.cluster_offset(cluster)))?;
            boundary = self.cluster_offset(cluster + 1);
        }

        Err(ErrorKind::NotFound)
    }

    /// Read the LDIR group (if any) and the DIR entry at the current
    /// position, leaving the cursor at the next slot.
    fn next_file(&mut self) -> Result<File, ErrorKind> {
        let ldir_loc = self.disk.stream_position()?;

        let first = LongEntry::decode(&mut self.disk)?;
        let mut ldirs = Vec::new();
        let mut name = String::new();
        if first.is_long() {
            // The leading entry carries the 0x40 flag and the chunk count.
            let remaining = (first.ordinal ^ LAST_LONG_ENTRY).saturating_sub(1);
            ldirs.push(first);
            for _ in 0..remaining {
                ldirs.push(LongEntry::decode(&mut self.disk)?);
            }
            name = lfn::join_long_name(&ldirs);
        } else {
            self.disk.seek(SeekFrom::Current(-(DIR_ENTRY_SIZE as i64)))?;
        }

        let dir_loc = self.disk.stream_position()?;
        let dir_entry = DirEntry::decode(&mut self.disk)?;
        if name.is_empty() {
            name = dir_entry.short_name_string();
        }

        Ok(File::new(name, ldir_loc, dir_loc, ldirs, dir_entry))
    }

    fn peek_entry_byte(&mut self) -> io::Result<u8> {
        let mut byte = [0u8; 1];
        self.disk.read_exact(&mut byte)?;
        self.disk.seek(SeekFrom::Current(-1))?;
        Ok(byte[0])
    }

    /// Next cluster of a directory chain, or `None` at end of chain.
    fn next_dir_cluster(&self, cluster: u32) -> Option<u32> {
        let next = self.fat.get(cluster);
        if next == 0 || self.fat.is_eoc(next) {
            None
        } else {
            Some(next)
        }
    }

    /// Byte offset of the first run of `slots` free entries in the
    /// directory starting at `cluster`, following its chain. The run must
    /// not cross a cluster boundary.
    fn next_free_slot(&mut self, mut cluster: u32, slots: u64) -> Result<u64, ErrorKind> {
        self.disk.seek(SeekFrom::Start(self.cluster_offset(cluster)))?;
        let mut boundary = self.cluster_offset(cluster + 1);
        loop {
            let pos = self.disk.stream_position()?;
            if pos >= boundary || pos + slots * DIR_ENTRY_SIZE > boundary {
                match self.next_dir_cluster(cluster) {
                    Some(next) => {
                        cluster = next;
                        self.disk.seek(SeekFrom::Start(self.cluster_offset(next)))?;
                        boundary = self.cluster_offset(next + 1);
                        continue;
                    }
                    None => return Err(ErrorKind::NoFreeSlotInCluster),
                }
            }
            if self.peek_entry_byte()? == ENTRY_END {
                return Ok(pos);
            }
            self.disk.seek(SeekFrom::Current(DIR_ENTRY_SIZE as i64))?;
        }
    }

    /// Create the directory named by `path`.
    ///
    /// Allocates a cluster, writes the LDIR group and DIR entry into the
    /// parent, zeroes the new cluster, emits its `.` and `..` entries,
    /// terminates the chain in both FAT copies, refreshes the FSInfo
    /// accounting, and flushes all of it. A failure after the first write
    /// leaves the volume inconsistent; no rollback is attempted.
    pub fn create_dir(&mut self, path: &str) -> Result<File, FsError> {
        self.mkdir(path)
            .map_err(|kind| FsError::new("create_dir", path, kind))
    }

    fn mkdir(&mut self, path: &str) -> Result<File, ErrorKind> {
        let (parent_path, name) = split_path(path);
        if name.is_empty() || name == "." {
            return Err(ErrorKind::InvalidPath);
        }

        // The path must not already resolve.
        match self.lookup(path) {
            Ok(_) => return Err(ErrorKind::AlreadyExists),
            Err(ErrorKind::NotFound) => {}
            Err(err) => return Err(err),
        }

        // Resolve the parent's first cluster. The root directory is not
        // itself an entry, so it maps straight to the root cluster.
        let parent_cluster = if parent_path.is_empty() {
            self.bpb.root_cluster
        } else {
            let parent = self.lookup(parent_path)?;
            if !parent.dir_entry().is_directory() {
                return Err(ErrorKind::InvalidPath);
            }
            parent.dir_entry().first_cluster()
        };

        let mut dir_entry = DirEntry::new_directory(name)?;
        let chksum = lfn::short_name_checksum(&dir_entry.name);
        let ldirs = lfn::build_long_entries(name, chksum)?;

        let slot = self.next_free_slot(parent_cluster, ldirs.len() as u64 + 1)?;
        let free_cluster = self.fat.next_free().ok_or(ErrorKind::NoFreeClusters)?;
        dir_entry.cluster_lo = free_cluster as u16;
        dir_entry.cluster_hi = (free_cluster >> 16) as u16;

        debug!(
            "create_dir {:?}: cluster {}, {} LDIR entries at {:#x} in parent cluster {}",
            name,
            free_cluster,
            ldirs.len(),
            slot,
            parent_cluster,
        );

        // LDIR group first (last chunk leading), DIR immediately after.
        self.disk.seek(SeekFrom::Start(slot))?;
        for ldir in &ldirs {
            ldir.encode(&mut self.disk)?;
        }
        let dir_loc = self.disk.stream_position()?;
        dir_entry.encode_at(&mut self.disk, dir_loc)?;

        // Prepare the new cluster: zero it, then emit `.` and `..`. `..`
        // points at the parent, or 0 when the parent is the root.
        self.zero_cluster(free_cluster)?;
        let dot = DirEntry::new_system(
            ".",
            ATTR_DIRECTORY | ATTR_SYSTEM,
            free_cluster,
            dir_entry.wrt_time,
            dir_entry.wrt_date,
        );
        let dotdot_cluster = if parent_cluster == self.bpb.root_cluster {
            0
        } else {
            parent_cluster
        };
        let dotdot = DirEntry::new_system(
            "..",
            ATTR_DIRECTORY | ATTR_SYSTEM,
            dotdot_cluster,
            dir_entry.wrt_time,
            dir_entry.wrt_date,
        );
        let child_offset = self.cluster_offset(free_cluster);
        let dot_end = dot.encode_at(&mut self.disk, child_offset)?;
        dotdot.encode_at(&mut self.disk, dot_end)?;

        // Terminate the chain in both FAT copies, then refresh the FSInfo
        // accounting from the post-allocation table.
        self.fat.mark_eoc(free_cluster);
        self.backup_fat.mark_eoc(free_cluster);
        self.fsinfo.next_free = self.fat.next_free().unwrap_or(NO_HINT);
        self.fsinfo.free_count = self.fsinfo.free_count.saturating_sub(1);
        self.backup_fsinfo = self.fsinfo;

        self.flush_volume()?;

        Ok(File::new(name.to_string(), slot, dir_loc, ldirs, dir_entry))
    }
}
