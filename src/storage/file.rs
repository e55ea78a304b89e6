//! Database file access
//!
//! Opens a database file with the lock its access mode needs and exposes
//! line-sequential reads and appends, optionally through gzip.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use fs2::FileExt;

use crate::error::{LineKvError, Result};

/// How a database file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Read only, shared lock
    Read,

    /// Read plus append-only writes, exclusive lock
    Append,

    /// Create or truncate for writing, exclusive lock
    Create,
}

/// Advisory lock held for the lifetime of a `DbFile`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

impl AccessMode {
    pub fn lock_mode(&self) -> LockMode {
        match self {
            AccessMode::Read => LockMode::Shared,
            AccessMode::Append | AccessMode::Create => LockMode::Exclusive,
        }
    }

    fn open_options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self {
            AccessMode::Read => options.read(true),
            AccessMode::Append => options.read(true).append(true),
            AccessMode::Create => options.write(true).create(true).truncate(true),
        };
        options
    }
}

/// An open, locked database file
///
/// The lock is released when the handle is dropped, on every exit path.
pub struct DbFile {
    file: File,
    path: PathBuf,
    mode: AccessMode,
    compressed: bool,
}

impl DbFile {
    /// Open `path` and block until the lock for `mode` is granted
    ///
    /// A file can be renamed over while we wait for its lock. For existing
    /// files the handle is checked against the path after locking and the
    /// open is retried if it now points at a stale file.
    pub fn open(path: &Path, mode: AccessMode, compressed: bool) -> Result<Self> {
        loop {
            let file = mode
                .open_options()
                .open(path)
                .map_err(LineKvError::io("open database", path))?;

            let locked = match mode.lock_mode() {
                LockMode::Shared => FileExt::lock_shared(&file),
                LockMode::Exclusive => FileExt::lock_exclusive(&file),
            };
            locked.map_err(LineKvError::io("lock database", path))?;

            if mode == AccessMode::Create || is_current(&file, path)? {
                return Ok(Self {
                    file,
                    path: path.to_path_buf(),
                    mode,
                    compressed,
                });
            }

            tracing::debug!("{} was replaced while waiting for its lock, reopening", path.display());
        }
    }

    /// Create an empty file if none exists yet
    ///
    /// Returns true if this call created it.
    pub fn create_empty(path: &Path) -> Result<bool> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(LineKvError::io("create database", path)(e)),
        }
    }

    /// Iterate over raw byte lines from the start of the file, newlines stripped
    pub fn lines(&mut self) -> Result<Lines<'_>> {
        self.file
            .seek(SeekFrom::Start(0))
            .map_err(LineKvError::io("read database", &self.path))?;

        let len = self
            .file
            .metadata()
            .map_err(LineKvError::io("read database", &self.path))?
            .len();

        // An empty file has no gzip header; treat it as zero members
        let reader: Box<dyn BufRead + '_> = if len == 0 {
            Box::new(io::empty())
        } else if self.compressed {
            Box::new(BufReader::new(MultiGzDecoder::new(&self.file)))
        } else {
            Box::new(BufReader::new(&self.file))
        };

        Ok(Lines {
            reader,
            path: &self.path,
            done: false,
        })
    }

    /// Start writing lines at the end of the file
    ///
    /// Each writer becomes one gzip member when compression is on.
    pub fn writer(&mut self) -> Result<RecordWriter<'_>> {
        if self.mode == AccessMode::Read {
            return Err(LineKvError::io("write database", &self.path)(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "handle was opened read-only",
            )));
        }

        let buffered = BufWriter::new(&self.file);
        let inner = if self.compressed {
            WriterInner::Gzip(GzEncoder::new(buffered, Compression::default()))
        } else {
            WriterInner::Plain(buffered)
        };

        Ok(RecordWriter {
            inner,
            path: &self.path,
        })
    }

    /// Append one complete line
    pub fn append(&mut self, line: &str) -> Result<()> {
        let mut writer = self.writer()?;
        writer.write_line(line)?;
        writer.finish()
    }

    /// Flush file contents to disk
    pub fn sync(&self) -> Result<()> {
        self.file
            .sync_all()
            .map_err(LineKvError::io("sync database", &self.path))
    }
}

impl Drop for DbFile {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::trace!("Unlock of {} failed: {}", self.path.display(), e);
        }
    }
}

#[cfg(unix)]
fn is_current(file: &File, path: &Path) -> Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let held = file
        .metadata()
        .map_err(LineKvError::io("open database", path))?;
    let on_disk = std::fs::metadata(path).map_err(LineKvError::io("open database", path))?;

    Ok(held.dev() == on_disk.dev() && held.ino() == on_disk.ino())
}

#[cfg(not(unix))]
fn is_current(_file: &File, path: &Path) -> Result<bool> {
    std::fs::metadata(path).map_err(LineKvError::io("open database", path))?;
    Ok(true)
}

// =============================================================================
// Line Reader
// =============================================================================

/// Lazy sequence of lines in on-disk order
///
/// Lines are raw bytes. Text is only validated when a record is decoded.
pub struct Lines<'a> {
    reader: Box<dyn BufRead + 'a>,
    path: &'a Path,
    done: bool,
}

impl Iterator for Lines<'_> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut line = Vec::new();
        match self.reader.read_until(b'\n', &mut line) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(_) => {
                if line.last() == Some(&b'\n') {
                    line.pop();
                }
                Some(Ok(line))
            }
            Err(e) => {
                self.done = true;
                Some(Err(LineKvError::io("read database", self.path)(e)))
            }
        }
    }
}

// =============================================================================
// Line Writer
// =============================================================================

enum WriterInner<'a> {
    Plain(BufWriter<&'a File>),
    Gzip(GzEncoder<BufWriter<&'a File>>),
}

/// Buffered line writer; `finish` must be called for the data to land
pub struct RecordWriter<'a> {
    inner: WriterInner<'a>,
    path: &'a Path,
}

impl RecordWriter<'_> {
    /// Write one line, adding the trailing newline if missing
    pub fn write_line(&mut self, line: impl AsRef<[u8]>) -> Result<()> {
        let line = line.as_ref();
        let result = match &mut self.inner {
            WriterInner::Plain(w) => write_terminated(w, line),
            WriterInner::Gzip(w) => write_terminated(w, line),
        };
        result.map_err(LineKvError::io("write database", self.path))
    }

    /// Flush buffers (and close the gzip member)
    pub fn finish(self) -> Result<()> {
        let path = self.path;
        let buffered = match self.inner {
            WriterInner::Plain(w) => w,
            WriterInner::Gzip(w) => w.finish().map_err(LineKvError::io("write database", path))?,
        };

        buffered
            .into_inner()
            .map_err(|e| LineKvError::io("write database", path)(e.into_error()))?;
        Ok(())
    }
}

fn write_terminated<W: Write>(w: &mut W, line: &[u8]) -> io::Result<()> {
    w.write_all(line)?;
    if line.last() != Some(&b'\n') {
        w.write_all(b"\n")?;
    }
    Ok(())
}
