/*!
 * Filesystem inode lookup.
 *
 * An inode number identifies a file's metadata record on a given volume:
 * distinct files on one volume have distinct inodes, while hardlinked
 * names share one. The tailer relies on this to tell "the same file grew"
 * apart from "a new file was swapped in at the same path" during log
 * rotation, which size/mtime heuristics cannot do reliably.
 *
 * Lookups follow symlinks (`stat`, not `lstat`). Inode numbers are a
 * POSIX concept; on non-Unix targets these functions report the
 * capability as unsupported rather than emulating it.
 */

use std::path::Path;
use tracing::debug;

use crate::error::Result;
#[cfg(not(unix))]
use crate::error::TailError;

/// Volume-qualified file identity.
///
/// Inode numbers are only unique per filesystem volume, so comparisons
/// across paths must include the device id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId {
    pub device: u64,
    pub inode: u64,
}

/// Look up the inode number of the file at `path`.
///
/// Resolves symlinks like `stat` does. Fails with the underlying I/O
/// error if the path cannot be statted.
#[cfg(unix)]
pub fn inode_of(path: impl AsRef<Path>) -> Result<u64> {
    use std::os::unix::fs::MetadataExt;

    let metadata = std::fs::metadata(path.as_ref())?;
    Ok(metadata.ino())
}

#[cfg(not(unix))]
pub fn inode_of(_path: impl AsRef<Path>) -> Result<u64> {
    Err(TailError::Unsupported("inode numbers"))
}

/// Look up the (device, inode) identity of the file at `path`.
#[cfg(unix)]
pub fn file_id(path: impl AsRef<Path>) -> Result<FileId> {
    use std::os::unix::fs::MetadataExt;

    let metadata = std::fs::metadata(path.as_ref())?;
    Ok(FileId {
        device: metadata.dev(),
        inode: metadata.ino(),
    })
}

#[cfg(not(unix))]
pub fn file_id(_path: impl AsRef<Path>) -> Result<FileId> {
    Err(TailError::Unsupported("inode numbers"))
}

/// Identity of an already-open file, taken from its handle rather than
/// its path. Immune to the path being renamed or unlinked underneath.
#[cfg(unix)]
pub fn handle_id(file: &std::fs::File) -> Result<FileId> {
    use std::os::unix::fs::MetadataExt;

    let metadata = file.metadata()?;
    Ok(FileId {
        device: metadata.dev(),
        inode: metadata.ino(),
    })
}

#[cfg(not(unix))]
pub fn handle_id(_file: &std::fs::File) -> Result<FileId> {
    Err(TailError::Unsupported("inode numbers"))
}

/// Narrow sentinel form of [`inode_of`]: the inode number on success,
/// `-1` on any failure.
///
/// All failure modes (missing path, permission denied, I/O error,
/// unsupported platform) collapse to `-1`; callers needing to know why
/// must stat the path themselves. Never panics.
pub fn get_inode(path: &str) -> i64 {
    match inode_of(path) {
        Ok(inode) => inode as i64,
        Err(e) => {
            debug!(path, error = %e, "inode lookup failed");
            -1
        }
    }
}
