//! Single-threaded readiness loop.
//!
//! Watches are registered on a descriptor together with the `poll(2)`
//! condition they care about. Each call to [`EventLoop::iteration`] performs
//! one `poll` over every registered descriptor and dispatches the callbacks
//! whose condition became ready. A callback returning
//! `ControlFlow::Break(())` is unregistered, which is how single-shot watches
//! are expressed.
//!
//! The loop is cooperative and not thread-safe: handles are `Rc`-backed and
//! must stay on the thread that drives the loop.

use crate::error::{InhibitError, Result};
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::ControlFlow;
use std::os::fd::{AsFd, OwnedFd};
use std::rc::Rc;

/// Callback invoked with the ready events of its descriptor.
pub type WatchCallback = Box<dyn FnMut(PollFlags) -> ControlFlow<()>>;

/// Registration token returned by [`EventLoop::add_watch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatchId(u64);

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watch#{}", self.0)
    }
}

struct Watch {
    fd: Rc<OwnedFd>,
    condition: PollFlags,
    callback: WatchCallback,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    watches: BTreeMap<u64, Watch>,
    /// Watch whose callback is running right now (it is out of the map).
    dispatching: Option<u64>,
    /// Set when the dispatching watch unregisters itself.
    cancel_dispatching: bool,
}

/// Cloneable handle to a shared readiness loop.
#[derive(Clone, Default)]
pub struct EventLoop {
    inner: Rc<RefCell<Inner>>,
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("watches", &self.watch_count())
            .finish()
    }
}

impl EventLoop {
    /// Create an empty loop.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` to run whenever `fd` reports any of `condition`.
    ///
    /// The loop keeps its own reference to the descriptor until the watch is
    /// removed, so the descriptor stays open at least that long.
    pub fn add_watch<F>(&self, fd: Rc<OwnedFd>, condition: PollFlags, callback: F) -> WatchId
    where
        F: FnMut(PollFlags) -> ControlFlow<()> + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.watches.insert(
            id,
            Watch {
                fd,
                condition,
                callback: Box::new(callback),
            },
        );
        tracing::trace!(watch = id, ?condition, "registered readiness watch");
        WatchId(id)
    }

    /// Unregister a watch. Returns `false` if it was already gone.
    pub fn remove_watch(&self, id: WatchId) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.watches.remove(&id.0).is_some() {
            tracing::trace!(watch = id.0, "unregistered readiness watch");
            return true;
        }
        if inner.dispatching == Some(id.0) && !inner.cancel_dispatching {
            inner.cancel_dispatching = true;
            return true;
        }
        false
    }

    /// Whether `id` is still registered.
    pub fn contains(&self, id: WatchId) -> bool {
        let inner = self.inner.borrow();
        inner.watches.contains_key(&id.0)
            || (inner.dispatching == Some(id.0) && !inner.cancel_dispatching)
    }

    /// Number of registered watches.
    pub fn watch_count(&self) -> usize {
        let inner = self.inner.borrow();
        let running = usize::from(inner.dispatching.is_some() && !inner.cancel_dispatching);
        inner.watches.len() + running
    }

    /// Poll once and dispatch ready watches.
    ///
    /// Returns the number of callbacks that ran. An interrupted `poll` is
    /// reported as an iteration in which nothing was dispatched.
    pub fn iteration(&self, timeout: PollTimeout) -> Result<usize> {
        let snapshot: Vec<(u64, Rc<OwnedFd>, PollFlags)> = self
            .inner
            .borrow()
            .watches
            .iter()
            .map(|(id, w)| (*id, Rc::clone(&w.fd), w.condition))
            .collect();

        if snapshot.is_empty() {
            return Ok(0);
        }

        let ready: Vec<(u64, PollFlags)> = {
            let mut fds: Vec<PollFd<'_>> = snapshot
                .iter()
                .map(|(_, fd, condition)| PollFd::new(fd.as_fd(), *condition))
                .collect();

            match poll(&mut fds, timeout) {
                Ok(0) | Err(Errno::EINTR) => return Ok(0),
                Ok(_) => {}
                Err(e) => return Err(InhibitError::general("poll failed", e)),
            }

            snapshot
                .iter()
                .zip(fds.iter())
                .filter_map(|((id, _, condition), pfd)| {
                    let revents = pfd.revents()?;
                    revents.intersects(*condition).then_some((*id, revents))
                })
                .collect()
        };

        let mut dispatched = 0;
        for (id, revents) in ready {
            // A callback earlier in this iteration may have removed it.
            let Some(mut watch) = self.begin_dispatch(id) else {
                continue;
            };

            let flow = (watch.callback)(revents);
            dispatched += 1;

            let mut inner = self.inner.borrow_mut();
            let cancelled = inner.cancel_dispatching;
            inner.dispatching = None;
            inner.cancel_dispatching = false;
            if flow.is_continue() && !cancelled {
                inner.watches.insert(id, watch);
            } else {
                tracing::trace!(watch = id, "readiness watch finished");
            }
        }

        Ok(dispatched)
    }

    fn begin_dispatch(&self, id: u64) -> Option<Watch> {
        let mut inner = self.inner.borrow_mut();
        let watch = inner.watches.remove(&id)?;
        inner.dispatching = Some(id);
        inner.cancel_dispatching = false;
        Some(watch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::{pipe, write};
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let c = Rc::new(Cell::new(0));
        (Rc::clone(&c), c)
    }

    #[test]
    fn empty_loop_dispatches_nothing() {
        let event_loop = EventLoop::new();
        assert_eq!(event_loop.iteration(PollTimeout::ZERO).unwrap(), 0);
        assert_eq!(event_loop.watch_count(), 0);
    }

    #[test]
    fn hangup_watch_fires_when_write_end_closes() {
        let event_loop = EventLoop::new();
        let (read_end, write_end) = pipe().unwrap();
        let (fired, seen) = counter();

        event_loop.add_watch(Rc::new(read_end), PollFlags::POLLHUP, move |revents| {
            assert!(revents.contains(PollFlags::POLLHUP));
            seen.set(seen.get() + 1);
            ControlFlow::Break(())
        });

        assert_eq!(event_loop.iteration(PollTimeout::ZERO).unwrap(), 0);
        assert_eq!(fired.get(), 0);

        drop(write_end);
        assert_eq!(event_loop.iteration(PollTimeout::ZERO).unwrap(), 1);
        assert_eq!(fired.get(), 1);

        // Single-shot: the watch is gone even though POLLHUP stays asserted.
        assert_eq!(event_loop.watch_count(), 0);
        assert_eq!(event_loop.iteration(PollTimeout::ZERO).unwrap(), 0);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn readable_data_does_not_trigger_hangup_watch() {
        let event_loop = EventLoop::new();
        let (read_end, write_end) = pipe().unwrap();
        let (fired, seen) = counter();

        event_loop.add_watch(Rc::new(read_end), PollFlags::POLLHUP, move |_| {
            seen.set(seen.get() + 1);
            ControlFlow::Break(())
        });

        write(&write_end, b"x").unwrap();
        assert_eq!(event_loop.iteration(PollTimeout::ZERO).unwrap(), 0);
        assert_eq!(fired.get(), 0);
    }

    #[test]
    fn continuing_watch_fires_every_iteration() {
        let event_loop = EventLoop::new();
        let (read_end, write_end) = pipe().unwrap();
        let (fired, seen) = counter();

        let id = event_loop.add_watch(Rc::new(read_end), PollFlags::POLLIN, move |_| {
            seen.set(seen.get() + 1);
            ControlFlow::Continue(())
        });

        write(&write_end, b"x").unwrap();
        event_loop.iteration(PollTimeout::ZERO).unwrap();
        event_loop.iteration(PollTimeout::ZERO).unwrap();
        assert_eq!(fired.get(), 2);
        assert!(event_loop.contains(id));
    }

    #[test]
    fn remove_watch_is_idempotent() {
        let event_loop = EventLoop::new();
        let (read_end, _write_end) = pipe().unwrap();

        let id = event_loop.add_watch(Rc::new(read_end), PollFlags::POLLHUP, |_| {
            ControlFlow::Break(())
        });

        assert_eq!(event_loop.watch_count(), 1);
        assert!(event_loop.remove_watch(id));
        assert!(!event_loop.remove_watch(id));
        assert!(!event_loop.contains(id));
        assert_eq!(event_loop.watch_count(), 0);
    }

    #[test]
    fn removed_watch_releases_its_descriptor_reference() {
        let event_loop = EventLoop::new();
        let (read_end, _write_end) = pipe().unwrap();
        let read_end = Rc::new(read_end);

        let id = event_loop.add_watch(Rc::clone(&read_end), PollFlags::POLLHUP, |_| {
            ControlFlow::Break(())
        });
        assert_eq!(Rc::strong_count(&read_end), 2);

        event_loop.remove_watch(id);
        assert_eq!(Rc::strong_count(&read_end), 1);
    }

    #[test]
    fn callback_can_cancel_itself() {
        let event_loop = EventLoop::new();
        let (read_end, write_end) = pipe().unwrap();
        let own_id: Rc<Cell<Option<WatchId>>> = Rc::new(Cell::new(None));

        let handle = event_loop.clone();
        let slot = Rc::clone(&own_id);
        let id = event_loop.add_watch(Rc::new(read_end), PollFlags::POLLIN, move |_| {
            if let Some(id) = slot.get() {
                assert!(handle.remove_watch(id));
            }
            ControlFlow::Continue(())
        });
        own_id.set(Some(id));

        write(&write_end, b"x").unwrap();
        assert_eq!(event_loop.iteration(PollTimeout::ZERO).unwrap(), 1);
        assert!(!event_loop.contains(id));
        assert_eq!(event_loop.iteration(PollTimeout::ZERO).unwrap(), 0);
    }

    #[test]
    fn callback_can_remove_a_later_watch() {
        let event_loop = EventLoop::new();
        let (first_read, first_write) = pipe().unwrap();
        let (second_read, second_write) = pipe().unwrap();
        let (second_fired, seen) = counter();
        let victim: Rc<Cell<Option<WatchId>>> = Rc::new(Cell::new(None));

        let handle = event_loop.clone();
        let slot = Rc::clone(&victim);
        event_loop.add_watch(Rc::new(first_read), PollFlags::POLLHUP, move |_| {
            if let Some(id) = slot.get() {
                handle.remove_watch(id);
            }
            ControlFlow::Break(())
        });
        let second = event_loop.add_watch(Rc::new(second_read), PollFlags::POLLHUP, move |_| {
            seen.set(seen.get() + 1);
            ControlFlow::Break(())
        });
        victim.set(Some(second));

        drop(first_write);
        drop(second_write);
        assert_eq!(event_loop.iteration(PollTimeout::ZERO).unwrap(), 1);
        assert_eq!(second_fired.get(), 0);
        assert_eq!(event_loop.watch_count(), 0);
    }

    #[test]
    fn watch_id_display() {
        assert_eq!(WatchId(7).to_string(), "watch#7");
    }
}
