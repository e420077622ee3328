//! Named-pipe liveness channel.
//!
//! A FIFO node is created per lock. The daemon keeps the read end open and
//! watches it for hang-up; the write end goes to the client. When every copy
//! of the write end has been closed the read end reports `POLLHUP` and the
//! lock is over.
//!
//! Both ends are opened with `O_NONBLOCK`: a blocking open of either end of a
//! FIFO waits for the other end, which would stall the creator.

use crate::error::{InhibitError, Result};
use crate::event_loop::{EventLoop, WatchId};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::libc::{dev_t, ino_t};
use nix::poll::PollFlags;
use nix::sys::stat::{FileStat, Mode, fstat, lstat};
use nix::unistd::mkfifo;
use std::fs::{self, DirBuilder, OpenOptions, Permissions};
use std::io;
use std::ops::ControlFlow;
use std::os::fd::{AsFd, OwnedFd};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Permissions of the lock directory.
pub const BASE_DIR_MODE: u32 = 0o755;

/// Filesystem primitives used to build the channel.
///
/// `SystemFifo` is the real implementation; the trait exists so the
/// rollback paths can be exercised without relying on OS failures.
pub trait FifoOps {
    /// Create the FIFO node. Must fail if anything already exists at `path`.
    fn make_fifo(&self, path: &Path) -> io::Result<()> {
        mkfifo(path, Mode::S_IRUSR | Mode::S_IWUSR).map_err(io::Error::from)
    }

    /// Open the monitoring (read) end: read-only, non-blocking, close-on-exec.
    fn open_monitor(&self, path: &Path) -> io::Result<OwnedFd> {
        // std always opens with O_CLOEXEC.
        OpenOptions::new()
            .read(true)
            .custom_flags(OFlag::O_NONBLOCK.bits())
            .open(path)
            .map(OwnedFd::from)
    }

    /// Open the client (write) end: write-only, non-blocking, close-on-exec.
    fn open_client(&self, path: &Path) -> io::Result<OwnedFd> {
        OpenOptions::new()
            .write(true)
            .custom_flags(OFlag::O_NONBLOCK.bits())
            .open(path)
            .map(OwnedFd::from)
    }

    /// Remove the FIFO node.
    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// FIFO operations backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemFifo;

impl FifoOps for SystemFifo {}

/// Device and inode of a FIFO node.
///
/// A path can be unlinked and recreated by someone else while a lock still
/// holds the old node open, so teardown compares this before removing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId {
    dev: dev_t,
    ino: ino_t,
}

impl NodeId {
    /// Identity of the node an open descriptor refers to.
    pub fn of_fd<Fd: AsFd>(fd: Fd) -> nix::Result<Self> {
        fstat(fd).map(Self::from)
    }

    /// Identity of the node currently at `path`, without following symlinks.
    pub fn of_path(path: &Path) -> nix::Result<Self> {
        lstat(path).map(Self::from)
    }
}

impl From<FileStat> for NodeId {
    fn from(st: FileStat) -> Self {
        Self {
            dev: st.st_dev,
            ino: st.st_ino,
        }
    }
}

/// A fully materialized liveness channel.
#[derive(Debug)]
pub struct NamedPipe {
    /// Path of the FIFO node.
    pub path: PathBuf,
    /// The node the monitoring end was opened on.
    pub node: NodeId,
    /// Read end kept for monitoring; also referenced by the event loop.
    pub monitor: Rc<OwnedFd>,
    /// Hang-up watch registered on `monitor`.
    pub watch: WatchId,
    /// Write end for the client.
    pub client: OwnedFd,
}

/// Create the lock directory and any missing parents.
///
/// Existing directories are fine. The mode is re-applied afterwards because
/// the process umask applies to `mkdir`; failing to do so is only a warning.
pub fn ensure_base_directory(base_dir: &Path) -> Result<()> {
    DirBuilder::new()
        .recursive(true)
        .mode(BASE_DIR_MODE)
        .create(base_dir)
        .map_err(|e| {
            InhibitError::general(
                format!("unable to create directory '{}'", base_dir.display()),
                e,
            )
        })?;

    if let Err(e) = fs::set_permissions(base_dir, Permissions::from_mode(BASE_DIR_MODE)) {
        tracing::warn!(
            dir = %base_dir.display(),
            error = %e,
            "failed to change permissions of inhibit directory"
        );
    }

    Ok(())
}

/// Build the liveness channel at `path`.
///
/// `on_hangup` runs from the event loop when the last client copy of the
/// write end is closed. Returning `ControlFlow::Break(())` makes the watch
/// single-shot.
///
/// Nothing is left behind on failure: a node created here is removed, and
/// the monitoring descriptor and watch are released before the error is
/// returned. Cleanup failures are logged and never replace the primary
/// error. A node that existed before the call is never touched.
pub fn create_named_pipe<F>(
    ops: &dyn FifoOps,
    path: &Path,
    event_loop: &EventLoop,
    on_hangup: F,
) -> Result<NamedPipe>
where
    F: FnMut(PollFlags) -> ControlFlow<()> + 'static,
{
    if path.as_os_str().is_empty() {
        return Err(InhibitError::InvalidInput(
            "named pipe path must not be empty".to_string(),
        ));
    }

    ops.make_fifo(path).map_err(|e| {
        InhibitError::general(
            format!("failed to create named pipe '{}'", path.display()),
            e,
        )
    })?;
    tracing::debug!(path = %path.display(), "created named pipe");

    let monitor = match ops.open_monitor(path) {
        Ok(fd) => Rc::new(fd),
        Err(e) => {
            remove_node(ops, path);
            return Err(InhibitError::general(
                format!(
                    "failed to open named pipe '{}' for reading",
                    path.display()
                ),
                e,
            ));
        }
    };

    let node = match NodeId::of_fd(monitor.as_fd()) {
        Ok(node) => node,
        Err(e) => {
            drop(monitor);
            remove_node(ops, path);
            return Err(InhibitError::general(
                format!("failed to stat named pipe '{}'", path.display()),
                e,
            ));
        }
    };

    let watch = event_loop.add_watch(Rc::clone(&monitor), PollFlags::POLLHUP, on_hangup);
    tracing::debug!(path = %path.display(), %watch, "monitoring named pipe");

    let client = match ops.open_client(path) {
        Ok(fd) => fd,
        Err(e) => {
            event_loop.remove_watch(watch);
            drop(monitor);
            remove_node(ops, path);
            return Err(InhibitError::general(
                format!(
                    "failed to open named pipe '{}' for writing",
                    path.display()
                ),
                e,
            ));
        }
    };

    Ok(NamedPipe {
        path: path.to_path_buf(),
        node,
        monitor,
        watch,
        client,
    })
}

/// Best-effort removal of a node this module created.
pub(crate) fn remove_node(ops: &dyn FifoOps, path: &Path) {
    match ops.remove(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed named pipe"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "failed to remove named pipe"
        ),
    }
}

/// Remove the node at `path` only if it is still `node`.
///
/// Someone may have cleared the node and a new lock may own the path now;
/// that node is left alone.
pub(crate) fn remove_own_node(ops: &dyn FifoOps, path: &Path, node: NodeId) {
    match NodeId::of_path(path) {
        Ok(found) if found == node => remove_node(ops, path),
        Ok(_) => tracing::warn!(
            path = %path.display(),
            "named pipe was replaced by another node; leaving it in place"
        ),
        Err(Errno::ENOENT) => {
            tracing::debug!(path = %path.display(), "named pipe already removed")
        }
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "failed to stat named pipe before removal"
        ),
    }
}
