/// Output file naming.
///
/// Names are `<prefix>-<nanos>.<ext>`. Stamps come from the wall clock but are
/// forced strictly increasing within the process, so two tasks never receive
/// the same name even when the clock does not advance between them. Files are
/// opened create-new; a name already taken on disk moves on to the next stamp.
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use tokio::fs::{File, OpenOptions};
use tracing::debug;

/// Stamps tried before giving up on finding a free name.
const MAX_CREATE_ATTEMPTS: usize = 16;

#[derive(Debug)]
pub struct FileNamer {
    dir: PathBuf,
    prefix: String,
    extension: String,
    last_stamp: AtomicI64,
}

impl FileNamer {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            extension: extension.into(),
            last_stamp: AtomicI64::new(0),
        }
    }

    /// Next nanosecond stamp, strictly greater than any previously issued.
    pub fn next_stamp(&self) -> i64 {
        let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX - 1);
        let mut prev = self.last_stamp.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self
                .last_stamp
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }

    pub fn file_name(&self, stamp: i64) -> String {
        if self.extension.is_empty() {
            format!("{}-{}", self.prefix, stamp)
        } else {
            format!("{}-{}.{}", self.prefix, stamp, self.extension)
        }
    }

    fn path_for(&self, stamp: i64) -> PathBuf {
        let name = self.file_name(stamp);
        // Keep "file-1.html" instead of "./file-1.html" for the default dir.
        if self.dir.as_os_str().is_empty() || self.dir == Path::new(".") {
            PathBuf::from(name)
        } else {
            self.dir.join(name)
        }
    }

    /// Create a fresh output file exclusively and return it with its path.
    pub async fn create(&self) -> io::Result<(PathBuf, File)> {
        for _ in 0..MAX_CREATE_ATTEMPTS {
            let path = self.path_for(self.next_stamp());
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!("{} already exists, trying next stamp", path.display());
                }
                Err(e) => return Err(e),
            }
        }
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!(
                "no free file name in {} after {} attempts",
                self.dir.display(),
                MAX_CREATE_ATTEMPTS
            ),
        ))
    }
}
