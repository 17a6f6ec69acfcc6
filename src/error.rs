//! Error reporting for volume operations.
//!
//! Every fallible public operation returns [`FsError`], which pairs the
//! failing operation's name and the path it was given with an
//! [`ErrorKind`] cause. `Display` renders `"<op> <path>: <cause>"`, the
//! format the CLI tools print after an `error: ` prefix.

use std::fmt;
use std::io;

/// The cause of a failed volume operation.
#[derive(Debug)]
pub enum ErrorKind {
    /// Underlying read, write, or seek failure.
    Io(io::Error),
    /// Boot sector does not end in `0x55 0xAA`.
    InvalidSignature,
    /// One of the three FSInfo sector signatures does not match.
    InvalidFsInfoSignature,
    /// BPB geometry violates the volume invariants (sector size not a
    /// power of two or below 512, cluster size not a power of two, no
    /// reserved sectors).
    InvalidGeometry,
    /// Name contains a character FAT32 forbids.
    InvalidName,
    /// Path did not resolve to a directory entry.
    NotFound,
    /// Path has no file component (`/` or empty).
    NoFileSpecified,
    /// An entry with that name already exists.
    AlreadyExists,
    /// Malformed path: empty basename, `.`, or a non-directory parent.
    InvalidPath,
    /// Every data cluster is allocated.
    NoFreeClusters,
    /// The directory's cluster chain has no free entry slot.
    NoFreeSlotInCluster,
    /// Content read attempted on a directory.
    IsDirectory,
    /// The volume or cluster chain ended before the recorded file size.
    UnexpectedEof,
    /// Name is longer than 255 UTF-16 code units.
    NameTooLong,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Io(err) => write!(f, "{}", err),
            ErrorKind::InvalidSignature => write!(f, "invalid boot sector signature"),
            ErrorKind::InvalidFsInfoSignature => write!(f, "invalid FSInfo signature"),
            ErrorKind::InvalidGeometry => write!(f, "BPB geometry out of range"),
            ErrorKind::InvalidName => write!(f, "name contains invalid characters"),
            ErrorKind::NotFound => write!(f, "file not found"),
            ErrorKind::NoFileSpecified => write!(f, "no file specified"),
            ErrorKind::AlreadyExists => write!(f, "file name already exists"),
            ErrorKind::InvalidPath => write!(f, "invalid directory path"),
            ErrorKind::NoFreeClusters => write!(f, "no free clusters"),
            ErrorKind::NoFreeSlotInCluster => write!(f, "no free space in cluster"),
            ErrorKind::IsDirectory => write!(f, "file must not be a directory"),
            ErrorKind::UnexpectedEof => write!(f, "encountered unexpected end of file"),
            ErrorKind::NameTooLong => write!(f, "name longer than 255 characters"),
        }
    }
}

impl From<io::Error> for ErrorKind {
    fn from(err: io::Error) -> Self {
        ErrorKind::Io(err)
    }
}

/// Error returned by [`Volume`](crate::Volume) operations.
#[derive(Debug)]
pub struct FsError {
    op: &'static str,
    path: String,
    kind: ErrorKind,
}

impl FsError {
    pub(crate) fn new(op: &'static str, path: impl Into<String>, kind: ErrorKind) -> Self {
        FsError { op, path: path.into(), kind }
    }

    /// Name of the operation that failed (`"open"`, `"read_file"`, ...).
    pub fn op(&self) -> &'static str {
        self.op
    }

    /// The path the operation was invoked with.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The underlying cause.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.op, self.path, self.kind)
    }
}

impl std::error::Error for FsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Io(err) => Some(err),
            _ => None,
        }
    }
}
