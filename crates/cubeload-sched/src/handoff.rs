//! Hand-off channel back to the owning thread.
//!
//! Workers never touch owner state. They post a message through an
//! [`OwnerHandle`] and the owner applies it the next time it drains its
//! [`OwnerQueue`].

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

/// Owner side of the hand-off channel.
#[derive(Debug)]
pub struct OwnerQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

/// Cloneable sending side given to workers.
#[derive(Debug)]
pub struct OwnerHandle<T> {
    tx: Sender<T>,
}

impl<T> Clone for OwnerHandle<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> OwnerHandle<T> {
    /// Post `msg` for the owner to run on its next drain.
    ///
    /// Returns `false` if the owner queue has been dropped.
    pub fn run(&self, msg: T) -> bool {
        self.tx.send(msg).is_ok()
    }
}

impl<T> Default for OwnerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OwnerQueue<T> {
    /// Create an empty, unbounded queue.
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    /// A handle workers can post through.
    pub fn handle(&self) -> OwnerHandle<T> {
        OwnerHandle {
            tx: self.tx.clone(),
        }
    }

    /// Take every message posted so far without blocking.
    pub fn drain(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }

    /// Block up to `timeout` for the first message, then take everything
    /// else already posted. Empty on timeout.
    pub fn wait(&self, timeout: Duration) -> Vec<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(first) => {
                let mut out = vec![first];
                out.extend(self.rx.try_iter());
                out
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => Vec::new(),
        }
    }

    /// Number of messages waiting.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// `true` when no message is waiting.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn messages_arrive_in_post_order() {
        let q = OwnerQueue::new();
        let h = q.handle();
        assert!(h.run(1));
        assert!(h.run(2));
        assert_eq!(q.len(), 2);
        assert_eq!(q.drain(), vec![1, 2]);
        assert!(q.is_empty());
    }

    #[test]
    fn wait_blocks_for_worker() {
        let q = OwnerQueue::new();
        let h = q.handle();
        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            h.run("done");
        });
        assert_eq!(q.wait(Duration::from_secs(5)), vec!["done"]);
        worker.join().unwrap();
    }

    #[test]
    fn wait_times_out_empty() {
        let q: OwnerQueue<u8> = OwnerQueue::new();
        assert!(q.wait(Duration::from_millis(1)).is_empty());
    }

    #[test]
    fn handle_fails_after_owner_dropped() {
        let q = OwnerQueue::new();
        let h = q.handle();
        drop(q);
        assert!(!h.run(()));
    }
}
