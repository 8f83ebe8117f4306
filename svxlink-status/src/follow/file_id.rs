//! On-disk identity of the followed file
//!
//! Log rotation by rename + recreate leaves the path pointing at a new inode.
//! Comparing the identity of the open handle with the identity behind the path
//! detects that switch.

use std::fs::{File, Metadata};
use std::io;

/// Device and inode of a file
///
/// On platforms without inode numbers both parts are zero, so only truncation
/// is detected there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId {
    dev: u64,
    ino: u64,
}

impl FileId {
    /// Identity taken from already fetched metadata
    #[cfg(unix)]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;

        Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        }
    }

    /// Identity taken from already fetched metadata
    #[cfg(not(unix))]
    pub fn from_metadata(_metadata: &Metadata) -> Self {
        Self { dev: 0, ino: 0 }
    }

    /// Identity of an open file handle
    pub fn from_file(file: &File) -> io::Result<Self> {
        Ok(Self::from_metadata(&file.metadata()?))
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.dev, self.ino)
    }
}
