//! Processing lock
//!
//! Coordinates the realtime render callback (reader) with the background
//! processing job (writer). The read path is strictly non-blocking: the
//! renderer tries once and emits silence for the block if the attempt
//! fails. The write path may block and is only ever used off the audio
//! thread.
//!
//! Readers run concurrently with each other; a writer excludes all
//! readers and other writers.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Guard returned by a successful non-blocking read acquisition
pub type ReadGuard<'a, T> = RwLockReadGuard<'a, T>;

/// Guard returned by a (possibly blocking) write acquisition
pub type WriteGuard<'a, T> = RwLockWriteGuard<'a, T>;

/// Read/write lock with a try-only read path
#[derive(Debug, Default)]
pub struct ProcessingLock<T> {
    inner: RwLock<T>,
}

impl<T> ProcessingLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: RwLock::new(value),
        }
    }

    /// Attempt a shared read without blocking
    ///
    /// Returns `None` if a writer holds or is waiting for the lock. The
    /// guard releases on drop, so every exit path of the caller gives
    /// the lock back.
    #[inline]
    pub fn try_read(&self) -> Option<ReadGuard<'_, T>> {
        self.inner.try_read()
    }

    /// Acquire shared read access, blocking until available
    ///
    /// Background-thread only; the render callback uses
    /// [`try_read`](Self::try_read) instead.
    #[inline]
    pub fn read(&self) -> ReadGuard<'_, T> {
        self.inner.read()
    }

    /// Acquire exclusive write access, blocking until available
    ///
    /// Background-thread only; never call from the render callback.
    #[inline]
    pub fn write(&self) -> WriteGuard<'_, T> {
        self.inner.write()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_try_read_succeeds_uncontended() {
        let lock = ProcessingLock::new(7);
        let guard = lock.try_read();
        assert_eq!(guard.as_deref(), Some(&7));
    }

    #[test]
    fn test_concurrent_readers() {
        let lock = ProcessingLock::new(0);
        let a = lock.try_read();
        let b = lock.try_read();
        assert!(a.is_some());
        assert!(b.is_some());
    }

    #[test]
    fn test_try_read_fails_while_writer_holds() {
        let lock = Arc::new(ProcessingLock::new(0));
        let guard = lock.write();

        let reader = Arc::clone(&lock);
        let handle = thread::spawn(move || reader.try_read().is_some());
        assert!(!handle.join().unwrap());

        drop(guard);
        assert!(lock.try_read().is_some());
    }

    #[test]
    fn test_writer_sees_previous_write() {
        let lock = ProcessingLock::new(1);
        *lock.write() = 2;
        assert_eq!(*lock.write(), 2);
    }

    #[test]
    fn test_blocking_read_waits_out_writer() {
        let lock = Arc::new(ProcessingLock::new(0));
        let mut guard = lock.write();

        let reader = Arc::clone(&lock);
        let handle = thread::spawn(move || *reader.read());

        *guard = 5;
        drop(guard);
        assert_eq!(handle.join().unwrap(), 5);
    }
}
