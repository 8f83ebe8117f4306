//! Line follower for a single, rotatable log file

use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::file_id::FileId;
use crate::shutdown::Shutdown;
use crate::types::{Error, Result};

/// Outcome of one follower step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Follow {
    /// A complete line, newline stripped
    Line(String),
    /// Nothing new right now
    Idle,
}

/// The currently open file
struct OpenLog {
    reader: BufReader<File>,
    id: FileId,
    /// Byte offset just past the last consumed byte
    offset: u64,
}

/// Follows a log file across rotation and truncation
///
/// `poll_line` performs a single non-blocking step. The `Iterator`
/// implementation blocks between idle steps, waiting `poll_interval` on the
/// shutdown handle, and ends once shutdown is requested.
pub struct LogFollower {
    path: PathBuf,
    poll_interval: Duration,
    shutdown: Shutdown,
    current: Option<OpenLog>,
    /// Bytes of a line whose newline has not been written yet
    partial: Vec<u8>,
}

impl LogFollower {
    /// Create a follower; the file is opened lazily on the first poll
    pub fn new(path: impl AsRef<Path>, poll_interval: Duration, shutdown: Shutdown) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            poll_interval,
            shutdown,
            current: None,
            partial: Vec::new(),
        }
    }

    /// Identity of the open file, if any
    pub fn file_id(&self) -> Option<FileId> {
        self.current.as_ref().map(|log| log.id)
    }

    /// Offset just past the last consumed byte of the open file
    pub fn offset(&self) -> Option<u64> {
        self.current.as_ref().map(|log| log.offset)
    }

    /// Perform one non-blocking step
    ///
    /// A missing file is not an error: the step reports `Idle` and the next
    /// one tries again. Any other I/O failure is returned.
    pub fn poll_line(&mut self) -> Result<Follow> {
        if self.current.is_none() && !self.open().map_err(|e| self.error(e))? {
            return Ok(Follow::Idle);
        }

        if let Some(line) = self.read_line().map_err(|e| self.error(e))? {
            return Ok(Follow::Line(line));
        }

        // At EOF: only now look for rotation, so the old file is drained first
        self.check_rotation().map_err(|e| self.error(e))?;
        Ok(Follow::Idle)
    }

    /// Open the path and seek to its end; false if it does not exist
    fn open(&mut self) -> io::Result<bool> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::trace!("{:?} not present yet", self.path);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        let id = FileId::from_file(&file)?;
        let offset = file.seek(SeekFrom::End(0))?;
        log::info!("Following {:?} (id {}, offset {})", self.path, id, offset);

        self.partial.clear();
        self.current = Some(OpenLog {
            reader: BufReader::new(file),
            id,
            offset,
        });
        Ok(true)
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let Some(log) = self.current.as_mut() else {
            return Ok(None);
        };

        let read = log.reader.read_until(b'\n', &mut self.partial)?;
        log.offset += read as u64;

        if self.partial.last() != Some(&b'\n') {
            // EOF, possibly in the middle of a line
            return Ok(None);
        }

        self.partial.pop();
        if self.partial.last() == Some(&b'\r') {
            self.partial.pop();
        }
        let line = String::from_utf8_lossy(&self.partial).into_owned();
        self.partial.clear();
        Ok(Some(line))
    }

    fn check_rotation(&mut self) -> io::Result<()> {
        let Some(log) = self.current.as_ref() else {
            return Ok(());
        };

        let metadata = match std::fs::metadata(&self.path) {
            Ok(metadata) => metadata,
            // Rotated away and not recreated yet; keep the old handle
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };

        let id = FileId::from_metadata(&metadata);
        if id != log.id {
            log::info!("{:?} was replaced ({} -> {}), reopening", self.path, log.id, id);
        } else if metadata.len() < log.offset {
            log::info!(
                "{:?} was truncated ({} < {}), reopening",
                self.path,
                metadata.len(),
                log.offset
            );
        } else {
            return Ok(());
        }

        self.current = None;
        self.open()?;
        Ok(())
    }

    fn error(&self, source: io::Error) -> Error {
        Error::FollowError {
            path: self.path.clone(),
            source,
        }
    }
}

impl Iterator for LogFollower {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.shutdown.is_triggered() {
                return None;
            }

            match self.poll_line() {
                Ok(Follow::Line(line)) => return Some(Ok(line)),
                Ok(Follow::Idle) => {
                    if self.shutdown.wait(self.poll_interval) {
                        return None;
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
