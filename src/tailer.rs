/*!
 * Rotation-aware file tailing.
 *
 * A `Tailer` polls a log file for appended lines and delivers them to a
 * listener, surviving the rotation schemes log daemons actually use:
 * rename-and-recreate (a new file appears at the watched path) and
 * truncate-in-place (copytruncate). Rotation is detected by comparing
 * the (device, inode) identity of the watched path against the identity
 * of the handle currently being read, so a replacement file of identical
 * size is never mistaken for the original.
 *
 * The tailer is a blocking poll loop intended to run on its own thread;
 * a `TailHandle` stops or pauses it from outside.
 */

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, trace};

use crate::config::TailConfig;
use crate::error::{Result, TailError};
use crate::inode;

/// Events produced while tailing a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailEvent {
    /// A complete line was read; `position` is the byte offset just past
    /// its terminator.
    Line { line: String, position: u64 },
    /// The watched path now names a different file (or was truncated);
    /// tailing restarts from offset 0.
    Rotated,
    /// The watched path does not currently exist; the tailer is waiting
    /// for it to appear.
    FileNotFound,
    /// The tailer loop failed with an error and is shutting down.
    Error(String),
    /// The tailer loop has exited.
    Stopped,
}

/// Receives tailing events.
///
/// Called from the tailer's thread. Only `on_line` is mandatory; the
/// remaining callbacks default to no-ops.
pub trait TailListener {
    /// A complete line was read from the file.
    fn on_line(&mut self, line: String, position: u64);

    /// The watched file was rotated; subsequent lines come from the
    /// replacement file, starting at offset 0.
    fn on_rotation(&mut self) {}

    /// The watched path does not exist; reported once per absence.
    fn on_file_not_found(&mut self) {}

    /// The tailer loop hit an unrecoverable error.
    fn on_error(&mut self, _err: &TailError) {}

    /// The tailer loop has exited.
    fn on_stop(&mut self) {}
}

/// Listener that forwards every event over a crossbeam channel, for
/// callers that prefer draining a receiver to implementing the trait.
pub struct ChannelListener {
    sender: Sender<TailEvent>,
}

impl ChannelListener {
    /// Create a listener and the receiver its events arrive on.
    pub fn channel() -> (Self, Receiver<TailEvent>) {
        let (sender, receiver) = unbounded();
        (Self { sender }, receiver)
    }
}

impl TailListener for ChannelListener {
    fn on_line(&mut self, line: String, position: u64) {
        let _ = self.sender.send(TailEvent::Line { line, position });
    }

    fn on_rotation(&mut self) {
        let _ = self.sender.send(TailEvent::Rotated);
    }

    fn on_file_not_found(&mut self) {
        let _ = self.sender.send(TailEvent::FileNotFound);
    }

    fn on_error(&mut self, err: &TailError) {
        let _ = self.sender.send(TailEvent::Error(err.to_string()));
    }

    fn on_stop(&mut self) {
        let _ = self.sender.send(TailEvent::Stopped);
    }
}

/// Cloneable remote control for a running tailer
#[derive(Debug, Clone)]
pub struct TailHandle {
    stop: Arc<AtomicBool>,
    pause: Arc<AtomicBool>,
}

impl TailHandle {
    /// Let the tailer finish its current pass and exit.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Let the tailer finish its current pass and idle.
    pub fn pause(&self) {
        self.pause.store(true, Ordering::Relaxed);
    }

    /// Resume a paused tailer.
    pub fn resume(&self) {
        self.pause.store(false, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

/// What a rotation check found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rotation {
    /// Path still names the file we hold open
    None,
    /// Path names a different file now
    Replaced,
    /// Same file, but shorter than our read position
    Truncated,
}

/// Follows appended lines in a file, delivering them to a listener.
pub struct Tailer<L: TailListener> {
    path: PathBuf,
    config: TailConfig,
    listener: L,
    stop: Arc<AtomicBool>,
    pause: Arc<AtomicBool>,
    /// Scratch buffer for read passes
    buf: Vec<u8>,
    /// Bytes of an incomplete trailing line, held until terminated
    pending: Vec<u8>,
    /// Absolute offset of the next unread byte
    position: u64,
}

impl<L: TailListener> Tailer<L> {
    /// Create a tailer with default configuration.
    pub fn new(path: impl Into<PathBuf>, listener: L) -> Self {
        Self::with_config(path, TailConfig::default(), listener)
    }

    fn with_config(path: impl Into<PathBuf>, config: TailConfig, listener: L) -> Self {
        let buf_size = config.buf_size;
        Self {
            path: path.into(),
            config,
            listener,
            stop: Arc::new(AtomicBool::new(false)),
            pause: Arc::new(AtomicBool::new(false)),
            buf: vec![0u8; buf_size],
            pending: Vec::new(),
            position: 0,
        }
    }

    /// Control handle usable from other threads.
    pub fn handle(&self) -> TailHandle {
        TailHandle {
            stop: Arc::clone(&self.stop),
            pause: Arc::clone(&self.pause),
        }
    }

    /// The path being tailed.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run the tail loop until stopped or an error occurs.
    ///
    /// Blocks the calling thread. On error the listener's `on_error` is
    /// invoked before the error is returned; `on_stop` fires on every
    /// exit path.
    pub fn run(mut self) -> Result<()> {
        let result = self.follow();
        if let Err(ref e) = result {
            self.listener.on_error(e);
        }
        self.listener.on_stop();
        result
    }

    fn follow(&mut self) -> Result<()> {
        let mut reader = match self.wait_for_open()? {
            Some(f) => f,
            None => return Ok(()),
        };

        self.position = if self.config.from_end {
            reader.metadata()?.len()
        } else {
            self.config.start_position
        };
        if self.position > 0 {
            reader.seek(SeekFrom::Start(self.position))?;
        }
        debug!(path = %self.path.display(), position = self.position, "tailing started");

        loop {
            if self.stop.load(Ordering::Relaxed) {
                return Ok(());
            }
            while self.pause.load(Ordering::Relaxed) && !self.stop.load(Ordering::Relaxed) {
                thread::sleep(self.config.delay());
            }

            self.read_pass(&mut reader)?;

            match self.check_rotation(&reader)? {
                Rotation::Replaced => {
                    // Drain whatever the old writer flushed before the
                    // rename, then switch to the new file.
                    self.read_pass(&mut reader)?;
                    debug!(path = %self.path.display(), "file rotated");
                    self.listener.on_rotation();
                    self.pending.clear();
                    self.position = 0;
                    reader = match self.wait_for_open()? {
                        Some(f) => f,
                        None => return Ok(()),
                    };
                    continue;
                }
                Rotation::Truncated => {
                    debug!(path = %self.path.display(), "file truncated in place");
                    self.listener.on_rotation();
                    self.pending.clear();
                    self.position = 0;
                    reader.seek(SeekFrom::Start(0))?;
                    continue;
                }
                Rotation::None => {}
            }

            thread::sleep(self.config.delay());

            if self.config.reopen {
                reader = File::open(&self.path)?;
                reader.seek(SeekFrom::Start(self.position))?;
            }
        }
    }

    /// Open the watched path, waiting for it to appear if absent.
    /// Returns `None` if stopped while waiting.
    fn wait_for_open(&mut self) -> Result<Option<File>> {
        let mut reported = false;
        loop {
            if self.stop.load(Ordering::Relaxed) {
                return Ok(None);
            }
            match File::open(&self.path) {
                Ok(f) => return Ok(Some(f)),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    if !reported {
                        debug!(path = %self.path.display(), "file not found, waiting");
                        self.listener.on_file_not_found();
                        reported = true;
                    }
                    thread::sleep(self.config.delay());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Read until EOF, delivering each complete line. An unterminated
    /// trailing line is held in `pending` for the next pass.
    fn read_pass(&mut self, reader: &mut File) -> Result<()> {
        loop {
            if self.stop.load(Ordering::Relaxed) {
                return Ok(());
            }
            let mut buf = std::mem::take(&mut self.buf);
            let read = reader.read(&mut buf);
            let n = match read {
                Ok(n) => n,
                Err(e) => {
                    self.buf = buf;
                    return Err(e.into());
                }
            };
            if n > 0 {
                trace!(bytes = n, position = self.position, "read chunk");
                let Self {
                    pending,
                    listener,
                    position,
                    ..
                } = self;
                *position = deliver_lines(pending, &buf[..n], *position, |line, pos| {
                    listener.on_line(line, pos)
                });
            }
            self.buf = buf;
            if n == 0 {
                return Ok(());
            }
        }
    }

    /// Compare the identity of the watched path against the open handle.
    fn check_rotation(&self, reader: &File) -> Result<Rotation> {
        let held = inode::handle_id(reader)?;
        match inode::file_id(&self.path) {
            Ok(on_disk) if on_disk != held => Ok(Rotation::Replaced),
            Ok(_) => {
                if reader.metadata()?.len() < self.position {
                    Ok(Rotation::Truncated)
                } else {
                    Ok(Rotation::None)
                }
            }
            // Path missing usually means we are mid-rename; keep reading
            // the handle we hold until a replacement appears.
            Err(e) if e.is_not_found() => Ok(Rotation::None),
            Err(e) => Err(e),
        }
    }
}

/// Split a chunk into lines, carrying incomplete tails in `pending`.
///
/// `position` is the absolute offset of the first byte of `chunk`; the
/// emitted position for each line is the offset just past its `\n`.
/// A `\r` before the `\n` is stripped. Returns the advanced position.
fn deliver_lines<F: FnMut(String, u64)>(
    pending: &mut Vec<u8>,
    chunk: &[u8],
    mut position: u64,
    mut emit: F,
) -> u64 {
    for &byte in chunk {
        position += 1;
        if byte == b'\n' {
            let mut line = std::mem::take(pending);
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            emit(String::from_utf8_lossy(&line).into_owned(), position);
        } else {
            pending.push(byte);
        }
    }
    position
}

/// Builder for [`Tailer`]
pub struct TailerBuilder {
    path: PathBuf,
    config: TailConfig,
}

impl TailerBuilder {
    /// Start building a tailer for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: TailConfig::default(),
        }
    }

    /// Delay between polls, in milliseconds.
    pub fn delay_ms(mut self, delay_ms: u64) -> Self {
        self.config.delay_ms = delay_ms;
        self
    }

    /// Read buffer size in bytes.
    pub fn buf_size(mut self, buf_size: usize) -> Self {
        self.config.buf_size = buf_size;
        self
    }

    /// Byte offset to start reading from.
    pub fn start_position(mut self, position: u64) -> Self {
        self.config.start_position = position;
        self
    }

    /// Start at the current end of the file, skipping existing content.
    pub fn from_end(mut self, from_end: bool) -> Self {
        self.config.from_end = from_end;
        self
    }

    /// Close and reopen the file between read passes.
    pub fn reopen(mut self, reopen: bool) -> Self {
        self.config.reopen = reopen;
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: TailConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the configuration and build the tailer.
    pub fn build<L: TailListener>(self, listener: L) -> Result<Tailer<L>> {
        self.config.validate()?;
        Ok(Tailer::with_config(self.path, self.config, listener))
    }
}
