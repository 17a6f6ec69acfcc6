//! fatvol: FAT32 volume engine over disk images.
//!
//! Mounts a FAT32 volume from an image file (or any seekable read/write
//! handle), resolves absolute paths through short and long directory
//! entries, reads file contents across cluster chains, and creates
//! directories while keeping the FSInfo sector and both FAT copies
//! consistent.
//!
//! Submodules:
//! - [`bpb`]: BIOS Parameter Block decoding
//! - [`fsinfo`]: FSInfo sector codec
//! - [`table`]: FAT table operations (entry lookup, allocation, EOC)
//! - [`datetime`]: DOS datetime conversion
//! - [`lfn`]: long directory entry (LDIR) support
//! - [`dir`]: DIR codec, path resolution, directory creation
//! - [`file`]: file handles and cluster-chain reads
//!
//! The engine is single threaded: every operation moves the underlying
//! handle's cursor, so a `Volume` must not be shared without external
//! serialisation. Mutations flush the FSInfo copies and both FATs before
//! returning, but a failure mid-transaction leaves the volume
//! inconsistent; the disk is assumed to be a local image, not a medium
//! needing crash atomicity.
//!
//! ```no_run
//! let mut volume = fatvol::Volume::open("disk.img")?;
//! volume.create_dir("/logs")?;
//! let mut file = volume.read_file("/boot/config.txt")?;
//! let n = volume.read_all(&mut file)?;
//! println!("{} bytes: {}", n, String::from_utf8_lossy(&file.content));
//! # Ok::<(), fatvol::FsError>(())
//! ```

pub mod bpb;
pub mod datetime;
pub mod dir;
pub mod error;
pub mod file;
pub mod fsinfo;
pub mod lfn;
pub mod table;

pub use bpb::Bpb;
pub use dir::DirEntry;
pub use error::{ErrorKind, FsError};
pub use file::File;
pub use fsinfo::FsInfo;
pub use lfn::LongEntry;
pub use table::FatTable;

use std::fmt;
use std::io::{Read, Seek, SeekFrom, Write};

use log::{debug, warn};

/// Sector index of the backup boot sector pair.
const BACKUP_BOOT_SECTOR: u16 = 6;

/// A mounted FAT32 volume.
///
/// Owns the disk handle exclusively and holds the decoded metadata: the
/// primary and backup BPB, FSInfo, and FAT. Both copies of the FAT are
/// kept byte-identical across mutations.
#[derive(Debug)]
pub struct Volume<D> {
    disk: D,
    bpb: Bpb,
    backup_bpb: Bpb,
    fsinfo: FsInfo,
    backup_fsinfo: FsInfo,
    fat: FatTable,
    backup_fat: FatTable,
}

impl Volume<std::fs::File> {
    /// Open the volume image at `path` read-write and mount it.
    pub fn open(path: &str) -> Result<Self, FsError> {
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|err| FsError::new("open", path, ErrorKind::Io(err)))?;
        Self::load(file).map_err(|kind| FsError::new("open", path, kind))
    }
}

impl<D: Read + Write + Seek> Volume<D> {
    /// Mount a volume from any seekable read/write handle.
    pub fn mount(disk: D) -> Result<Self, FsError> {
        Self::load(disk).map_err(|kind| FsError::new("mount", "volume", kind))
    }

    fn load(mut disk: D) -> Result<Self, ErrorKind> {
        disk.seek(SeekFrom::Start(0))?;
        let bpb = Bpb::decode(&mut disk)?;

        let bps = bpb.bytes_per_sector as u64;
        disk.seek(SeekFrom::Start(bpb.fsinfo_sector as u64 * bps))?;
        let fsinfo = FsInfo::decode(&mut disk)?;

        disk.seek(SeekFrom::Start(BACKUP_BOOT_SECTOR as u64 * bps))?;
        let backup_bpb = Bpb::decode(&mut disk)?;
        disk.seek(SeekFrom::Start((BACKUP_BOOT_SECTOR as u64 + 1) * bps))?;
        let backup_fsinfo = FsInfo::decode(&mut disk)?;

        if backup_bpb != bpb {
            warn!("backup BPB differs from the primary copy");
        }

        let max_clusters = bpb.max_clusters();
        disk.seek(SeekFrom::Start(bpb.fat_offset()))?;
        let fat = FatTable::read_fat32(&mut disk, max_clusters)?;
        disk.seek(SeekFrom::Start(bpb.backup_fat_offset()))?;
        let backup_fat = FatTable::read_fat32(&mut disk, max_clusters)?;

        if !fat.is_eoc(fat.get(1)) {
            warn!(
                "FAT[1] {:#010x} is not an end-of-chain marker; using {:#010x}",
                fat.get(1),
                fat.eoc(),
            );
        }

        debug!(
            "mounted FAT32 volume: {} bytes/sector, {} sectors/cluster, root cluster {}, {} FAT entries, {} free",
            bpb.bytes_per_sector,
            bpb.sectors_per_cluster,
            bpb.root_cluster,
            max_clusters,
            fsinfo.free_count,
        );

        Ok(Volume { disk, bpb, backup_bpb, fsinfo, backup_fsinfo, fat, backup_fat })
    }

    /// Byte offset of `cluster`'s first byte in the data region.
    ///
    /// The data region starts past the reserved sectors and both FAT
    /// copies; cluster numbers are relative to the root cluster.
    pub(crate) fn cluster_offset(&self, cluster: u32) -> u64 {
        let bps = self.bpb.bytes_per_sector as u64;
        let data_region = self.bpb.reserved_sector_count as u64 * bps
            + self.bpb.num_fats as u64 * self.bpb.fat_size_32 as u64 * bps;
        let relative = cluster as i64 - self.bpb.root_cluster as i64;
        (data_region as i64 + relative * self.bpb.cluster_size() as i64) as u64
    }

    pub(crate) fn zero_cluster(&mut self, cluster: u32) -> std::io::Result<()> {
        self.disk.seek(SeekFrom::Start(self.cluster_offset(cluster)))?;
        let zeros = vec![0u8; self.bpb.cluster_size() as usize];
        self.disk.write_all(&zeros)
    }

    /// Write the FSInfo copies and both FATs back to their sectors.
    pub fn flush(&mut self) -> Result<(), FsError> {
        self.flush_volume()
            .map_err(|kind| FsError::new("flush", "volume", kind))
    }

    pub(crate) fn flush_volume(&mut self) -> Result<(), ErrorKind> {
        let bps = self.bpb.bytes_per_sector as u64;
        self.fsinfo
            .encode(&mut self.disk, self.bpb.fsinfo_sector as u64 * bps)?;
        self.backup_fsinfo
            .encode(&mut self.disk, (BACKUP_BOOT_SECTOR as u64 + 1) * bps)?;
        self.disk.seek(SeekFrom::Start(self.bpb.fat_offset()))?;
        self.fat.write_to(&mut self.disk)?;
        self.disk.seek(SeekFrom::Start(self.bpb.backup_fat_offset()))?;
        self.backup_fat.write_to(&mut self.disk)?;
        self.disk.flush()?;
        Ok(())
    }

    /// Flush the handle and release the volume.
    pub fn close(mut self) -> Result<(), FsError> {
        self.disk
            .flush()
            .map_err(|err| FsError::new("close", "volume", ErrorKind::Io(err)))
    }

    /// Release the volume and hand back the disk handle.
    pub fn into_inner(self) -> D {
        self.disk
    }

    pub fn bpb(&self) -> &Bpb {
        &self.bpb
    }

    pub fn backup_bpb(&self) -> &Bpb {
        &self.backup_bpb
    }

    pub fn fsinfo(&self) -> &FsInfo {
        &self.fsinfo
    }

    pub fn backup_fsinfo(&self) -> &FsInfo {
        &self.backup_fsinfo
    }

    pub fn fat(&self) -> &FatTable {
        &self.fat
    }

    pub fn backup_fat(&self) -> &FatTable {
        &self.backup_fat
    }

    /// Snapshot of the volume's identity and free-space accounting.
    pub fn info(&self) -> VolumeInfo {
        VolumeInfo {
            volume_label: self.bpb.volume_label_str(),
            fs_type: self.bpb.fs_type_str(),
            bytes_per_sector: self.bpb.bytes_per_sector,
            sectors_per_cluster: self.bpb.sectors_per_cluster,
            free_clusters: self.fsinfo.free_count,
            next_free_cluster: self.fsinfo.next_free,
        }
    }
}

/// Volume identity and free-space accounting, as reported by the
/// inspector tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeInfo {
    pub volume_label: String,
    pub fs_type: String,
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub free_clusters: u32,
    pub next_free_cluster: u32,
}

impl fmt::Display for VolumeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "+---------------------+")?;
        writeln!(f, "|  VOLUME DEBUG INFO  |")?;
        writeln!(f, "+---------------------+")?;
        writeln!(f, "\\ bytes_per_sector: {}", self.bytes_per_sector)?;
        writeln!(f, "\\ sectors_per_cluster: {}", self.sectors_per_cluster)?;
        writeln!(f, "\\ volume_label: {}", self.volume_label)?;
        writeln!(f, "\\ file_sys_type: {}", self.fs_type)?;
        writeln!(f, "\\ free_clusters: {}", self.free_clusters)?;
        write!(f, "\\ next_free_cluster: {}", self.next_free_cluster)
    }
}
