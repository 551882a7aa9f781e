//! Single-slot handoff between a real-time game loop and a decision loop.
//!
//! A post replaces whatever is still pending, so the collector only ever sees
//! the most recent value. Dropping either endpoint closes the mailbox.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};

#[derive(Debug)]
struct Slot<T> {
    pending: Option<T>,
    latest: Option<T>,
    closed: bool,
}

#[derive(Debug)]
pub struct Poster<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

#[derive(Debug)]
pub struct Collector<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

pub fn mailbox<T>() -> (Poster<T>, Collector<T>) {
    let slot = Arc::new(Mutex::new(Slot {
        pending: None,
        latest: None,
        closed: false,
    }));

    (
        Poster { slot: slot.clone() },
        Collector { slot },
    )
}

fn lock<T>(slot: &Mutex<Slot<T>>) -> Result<MutexGuard<'_, Slot<T>>> {
    let guard = slot
        .lock()
        .map_err(|_| Error::Channel("mailbox lock poisoned".to_string()))?;

    if guard.closed {
        return Err(Error::Channel("mailbox closed".to_string()));
    }

    Ok(guard)
}

fn close<T>(slot: &Mutex<Slot<T>>) {
    if let Ok(mut guard) = slot.lock() {
        guard.closed = true;
    }
}

impl<T: Clone> Poster<T> {
    /// Returns `true` when an unread value was overwritten.
    pub fn post(&self, value: T) -> Result<bool> {
        let mut slot = lock(&self.slot)?;
        slot.latest = Some(value.clone());
        Ok(slot.pending.replace(value).is_some())
    }
}

impl<T> Poster<T> {
    pub fn close(&self) {
        close(&self.slot);
    }
}

impl<T: Clone> Collector<T> {
    /// Removes the pending value, if any.
    pub fn take(&self) -> Result<Option<T>> {
        Ok(lock(&self.slot)?.pending.take())
    }

    /// The most recently posted value, whether or not it was taken already.
    pub fn latest(&self) -> Result<Option<T>> {
        Ok(lock(&self.slot)?.latest.clone())
    }
}

impl<T> Collector<T> {
    pub fn close(&self) {
        close(&self.slot);
    }
}

impl<T> Drop for Poster<T> {
    fn drop(&mut self) {
        close(&self.slot);
    }
}

impl<T> Drop for Collector<T> {
    fn drop(&mut self) {
        close(&self.slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn post_overwrites_pending() {
        let (poster, collector) = mailbox();
        assert!(!poster.post(1).unwrap());
        assert!(poster.post(2).unwrap());
        assert_eq!(collector.take().unwrap(), Some(2));
        assert_eq!(collector.take().unwrap(), None);
        assert!(!poster.post(3).unwrap());
    }

    #[test]
    fn latest_survives_take() {
        let (poster, collector) = mailbox();
        assert_eq!(collector.latest().unwrap(), None);
        poster.post("a").unwrap();
        poster.post("b").unwrap();
        assert_eq!(collector.take().unwrap(), Some("b"));
        assert_eq!(collector.latest().unwrap(), Some("b"));
        assert_eq!(collector.latest().unwrap(), Some("b"));
    }

    #[test]
    fn dropped_endpoint_closes() {
        let (poster, collector) = mailbox::<u32>();
        drop(collector);
        assert!(matches!(poster.post(1), Err(Error::Channel(_))));

        let (poster, collector) = mailbox::<u32>();
        poster.post(5).unwrap();
        drop(poster);
        assert!(matches!(collector.take(), Err(Error::Channel(_))));
        assert!(matches!(collector.latest(), Err(Error::Channel(_))));
    }

    #[test]
    fn explicit_close() {
        let (poster, collector) = mailbox::<u32>();
        collector.close();
        assert!(poster.post(1).is_err());
    }

    #[test]
    fn cross_thread_latest_wins() {
        let (poster, collector) = mailbox();

        let join_handle = thread::spawn(move || {
            for i in 0..1000usize {
                poster.post(i).unwrap();
            }
            poster
        });

        let poster = join_handle.join().unwrap();
        assert_eq!(collector.take().unwrap(), Some(999));
        drop(poster);
    }
}
