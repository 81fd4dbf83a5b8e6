/*!
 * Linetail - rotation-aware log file tailing
 *
 * A small library for following appended lines in log files:
 * - Inode-based file identity, so rotation is detected even when the
 *   replacement file has the same size as the original
 * - Poll-based tail loop with pause/resume/stop control from other threads
 * - Listener trait or channel-based event delivery
 * - Narrow `get_inode` sentinel API and a matching C ABI export for
 *   embedding in other runtimes
 *
 * Inode numbers are a POSIX concept; the lookup functions report the
 * capability as unsupported on non-Unix targets.
 */

pub mod config;
pub mod error;
pub mod ffi;
pub mod inode;
pub mod logging;
pub mod tailer;

// Re-export commonly used types
pub use config::{LogLevel, TailConfig};
pub use error::{Result, TailError};
pub use inode::{file_id, get_inode, inode_of, FileId};
pub use tailer::{ChannelListener, TailEvent, TailHandle, TailListener, Tailer, TailerBuilder};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
