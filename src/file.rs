//! File handles and cluster-chain content reads.

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::dir::DirEntry;
use crate::error::{ErrorKind, FsError};
use crate::lfn::LongEntry;
use crate::Volume;

/// A resolved directory entry: name, on-disk locations, parsed entries,
/// and (after [`Volume::read_all`]) cached content.
///
/// A `File` is a plain value. It holds no reference to the volume it came
/// from (content reads take the volume explicitly) and it goes stale if
/// the volume is mutated behind it.
#[derive(Debug, Clone)]
pub struct File {
    name: String,
    /// Cached content, filled by [`Volume::read_all`].
    pub content: Vec<u8>,
    ldir_loc: u64,
    dir_loc: u64,
    ldir_entries: Vec<LongEntry>,
    dir_entry: DirEntry,
}

impl File {
    pub(crate) fn new(
        name: String,
        ldir_loc: u64,
        dir_loc: u64,
        ldir_entries: Vec<LongEntry>,
        dir_entry: DirEntry,
    ) -> Self {
        File { name, content: Vec::new(), ldir_loc, dir_loc, ldir_entries, dir_entry }
    }

    /// Resolved name: the reassembled long name, or the trimmed short name
    /// when no LDIR entries precede the DIR entry.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File size in bytes as recorded in the DIR entry (0 for directories).
    pub fn size(&self) -> u32 {
        self.dir_entry.filesize
    }

    pub fn is_directory(&self) -> bool {
        self.dir_entry.is_directory()
    }

    /// First cluster of the entry's data.
    pub fn first_cluster(&self) -> u32 {
        self.dir_entry.first_cluster()
    }

    /// Byte offset of the first LDIR entry (equals [`Self::dir_loc`] when
    /// the entry has no long name).
    pub fn ldir_loc(&self) -> u64 {
        self.ldir_loc
    }

    /// Byte offset of the DIR entry.
    pub fn dir_loc(&self) -> u64 {
        self.dir_loc
    }

    pub fn ldir_entries(&self) -> &[LongEntry] {
        &self.ldir_entries
    }

    pub fn dir_entry(&self) -> &DirEntry {
        &self.dir_entry
    }
}

impl<D: Read + Write + Seek> Volume<D> {
    /// Read up to `buf.len()` bytes of `file`'s content, following the
    /// cluster chain; returns the number of bytes read.
    pub fn read(&mut self, file: &File, buf: &mut [u8]) -> Result<usize, FsError> {
        self.read_chain(file, buf)
            .map_err(|kind| FsError::new("read", file.name(), kind))
    }

    /// Read the whole file into `file.content`; returns the byte count.
    pub fn read_all(&mut self, file: &mut File) -> Result<usize, FsError> {
        let mut buf = vec![0u8; file.dir_entry.filesize as usize];
        let n = self
            .read_chain(file, &mut buf)
            .map_err(|kind| FsError::new("read_all", file.name(), kind))?;
        file.content = buf;
        Ok(n)
    }

    fn read_chain(&mut self, file: &File, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        if file.is_directory() {
            return Err(ErrorKind::IsDirectory);
        }

        let cluster_size = self.bpb.cluster_size() as usize;
        let mut remaining = buf.len().min(file.dir_entry.filesize as usize);
        if remaining == 0 {
            return Ok(0);
        }

        let mut cluster = file.first_cluster();
        self.disk.seek(SeekFrom::Start(self.cluster_offset(cluster)))?;

        let mut total = 0usize;
        while remaining > 0 {
            let read_size = remaining.min(cluster_size);
            self.disk
                .read_exact(&mut buf[total..total + read_size])
                .map_err(|err| {
                    if err.kind() == io::ErrorKind::UnexpectedEof {
                        ErrorKind::UnexpectedEof
                    } else {
                        ErrorKind::Io(err)
                    }
                })?;
            total += read_size;
            remaining -= read_size;

            cluster = self.fat.get(cluster);
            if remaining > 0 {
                // The recorded size promises more data than the chain holds.
                if self.fat.is_eoc(cluster) || cluster == 0 {
                    return Err(ErrorKind::UnexpectedEof);
                }
                self.disk.seek(SeekFrom::Start(self.cluster_offset(cluster)))?;
            }
        }

        Ok(total)
    }
}
