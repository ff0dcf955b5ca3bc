// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Versioned latest-value channel.
//!
//! A [`SnapshotChannel`] keeps the most recent value of a type in one of two
//! slots. The single [`SnapshotPublisher`] always writes the slot readers are
//! not pointed at, then flips the selector and bumps the version. Readers pin the
//! slot they are about to clone; the publisher waits for a slot's pins to drain
//! before reusing it, so a reader never clones a value that is being
//! overwritten.
//!
//! Each slot stores its value together with the version it was published
//! under, and reads are additionally bracketed by two loads of the global
//! version. A returned [`Snapshot`] therefore always pairs a value with the
//! version of the publish that produced it.

use crate::error::ChannelError;
use crate::policy::{DropMode, SnapshotOptions, WaitMode};
use crate::wait::SpinWait;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use strata_core::{CancellationToken, Cancelled};

/// A value read from a [`SnapshotChannel`] and the version it was published under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<T> {
    /// The published value.
    pub value: T,
    /// Version of the publish, starting at 1.
    pub version: u64,
}

/// Counters of a snapshot channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnapshotStats {
    /// Current version, 0 before the first publish.
    pub version: u64,
    /// Publishes that stored a value.
    pub published: u64,
    /// Publishes discarded by `NO_CONSUMER_YET` or `DEDUPLICATE`.
    pub suppressed: u64,
    /// Whether any reader has read yet.
    pub has_reader: bool,
}

type Slot<T> = UnsafeCell<Option<(T, u64)>>;

/// Broadcasts the latest value of `T` to any number of readers.
pub struct SnapshotChannel<T> {
    slots: [Slot<T>; 2],
    pins: [AtomicUsize; 2],
    selector: AtomicUsize,
    version: AtomicU64,
    first_published: AtomicBool,
    reader_seen: AtomicBool,
    publisher_claimed: AtomicBool,
    published: AtomicU64,
    suppressed: AtomicU64,
    options: SnapshotOptions,
    equals: Option<fn(&T, &T) -> bool>,
}

// SAFETY: the unique publisher only writes the slot the selector does not point
// at, after its pin count dropped to zero with `SeqCst`. Readers only take
// shared references to a slot while holding a pin they re-validated against the
// selector. Values are cloned from several threads, hence `T: Sync`.
unsafe impl<T: Send + Sync> Sync for SnapshotChannel<T> {}

impl<T> SnapshotChannel<T> {
    /// Creates an empty channel.
    ///
    /// # Errors
    ///
    /// [`ChannelError::UnsupportedPolicy`] if the drop mode asks for
    /// `DROP_NEWEST`, which would freeze the first value, or `DEDUPLICATE`, which
    /// needs [`with_deduplication`](Self::with_deduplication).
    pub fn new(options: SnapshotOptions) -> Result<Arc<Self>, ChannelError> {
        if options.drop_mode.contains(DropMode::DEDUPLICATE) {
            return Err(ChannelError::UnsupportedPolicy("DEDUPLICATE"));
        }
        Self::build(options, None)
    }

    fn build(
        options: SnapshotOptions,
        equals: Option<fn(&T, &T) -> bool>,
    ) -> Result<Arc<Self>, ChannelError> {
        if options.drop_mode.contains(DropMode::DROP_NEWEST) {
            return Err(ChannelError::UnsupportedPolicy("DROP_NEWEST"));
        }
        log::trace!(
            "SnapshotChannel<{}>: created, {:?}",
            std::any::type_name::<T>(),
            options
        );
        Ok(Arc::new(Self {
            slots: [UnsafeCell::new(None), UnsafeCell::new(None)],
            pins: [AtomicUsize::new(0), AtomicUsize::new(0)],
            selector: AtomicUsize::new(0),
            version: AtomicU64::new(0),
            first_published: AtomicBool::new(false),
            reader_seen: AtomicBool::new(false),
            publisher_claimed: AtomicBool::new(false),
            published: AtomicU64::new(0),
            suppressed: AtomicU64::new(0),
            options,
            equals,
        }))
    }

    /// Takes the publisher endpoint.
    ///
    /// Fails with [`ChannelError::EndpointClaimed`] while another publisher is alive.
    pub fn claim_publisher(self: &Arc<Self>) -> Result<SnapshotPublisher<T>, ChannelError> {
        if self.publisher_claimed.swap(true, Ordering::AcqRel) {
            return Err(ChannelError::EndpointClaimed("snapshot publisher"));
        }
        Ok(SnapshotPublisher {
            channel: Arc::clone(self),
        })
    }

    /// Current version, 0 before the first publish.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Returns `true` once a publish happened, including a deduplicated one.
    pub fn has_published(&self) -> bool {
        self.first_published.load(Ordering::Acquire)
    }

    /// The options the channel was created with.
    pub fn options(&self) -> SnapshotOptions {
        self.options
    }

    /// Reads the counters.
    pub fn stats(&self) -> SnapshotStats {
        SnapshotStats {
            version: self.version(),
            published: self.published.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            has_reader: self.reader_seen.load(Ordering::Relaxed),
        }
    }

    /// Must only be called by the unique publisher.
    fn publish(&self, value: T) -> bool {
        if self.options.drop_mode.contains(DropMode::NO_CONSUMER_YET)
            && !self.reader_seen.load(Ordering::Acquire)
        {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let current = self.selector.load(Ordering::Acquire);

        if let Some(equals) = self.equals {
            // SAFETY: only the publisher writes slots, and never the selected one,
            // so a shared reference to it cannot alias a write.
            let existing = unsafe { &*self.slots[current].get() };
            if matches!(existing, Some((stored, _)) if equals(stored, &value)) {
                self.suppressed.fetch_add(1, Ordering::Relaxed);
                self.first_published.store(true, Ordering::Release);
                return false;
            }
        }

        let target = current ^ 1;
        let mut wait = SpinWait::new(WaitMode::Hybrid);
        while self.pins[target].load(Ordering::SeqCst) != 0 {
            wait.spin_once();
        }

        let version = self.version.load(Ordering::Relaxed) + 1;
        // SAFETY: `target` is not selected and has no pins. A reader that pins it
        // from now on will see the selector moved and back off, until the store
        // below publishes it.
        unsafe {
            *self.slots[target].get() = Some((value, version));
        }
        self.selector.store(target, Ordering::SeqCst);
        self.version.store(version, Ordering::Release);
        self.first_published.store(true, Ordering::Release);
        self.published.fetch_add(1, Ordering::Relaxed);
        true
    }
}

impl<T: Clone> SnapshotChannel<T> {
    /// Reads the latest value.
    ///
    /// Marks the caller as a reader. Returns `None` before the first publish,
    /// unless the channel was created with `block_until_first_publish`, in which
    /// case it spins until that publish happens.
    pub fn read(&self) -> Option<Snapshot<T>> {
        self.reader_seen.store(true, Ordering::Release);
        let mut wait = SpinWait::new(WaitMode::Hybrid);
        loop {
            if let Some(snapshot) = self.read_validated() {
                return Some(snapshot);
            }
            if !self.options.block_until_first_publish {
                return None;
            }
            wait.spin_once();
        }
    }

    /// Like a blocking [`read`](Self::read), but gives up once `token` is cancelled.
    ///
    /// Waits for the first publish regardless of `block_until_first_publish`.
    pub fn read_until(&self, token: &CancellationToken) -> Result<Snapshot<T>, Cancelled> {
        self.reader_seen.store(true, Ordering::Release);
        let mut wait = SpinWait::new(WaitMode::Hybrid);
        loop {
            if let Some(snapshot) = self.read_validated() {
                return Ok(snapshot);
            }
            token.check()?;
            wait.spin_once();
        }
    }

    fn read_validated(&self) -> Option<Snapshot<T>> {
        let mut wait = SpinWait::new(WaitMode::Spin);
        loop {
            let before = self.version.load(Ordering::Acquire);
            if before == 0 {
                return None;
            }

            let slot = self.selector.load(Ordering::SeqCst);
            self.pins[slot].fetch_add(1, Ordering::SeqCst);
            if self.selector.load(Ordering::SeqCst) != slot {
                self.pins[slot].fetch_sub(1, Ordering::Release);
                wait.spin_once();
                continue;
            }

            // SAFETY: the slot is pinned and still selected, so the publisher
            // will not write it until we unpin.
            let read = unsafe { (*self.slots[slot].get()).clone() };
            self.pins[slot].fetch_sub(1, Ordering::Release);

            let after = self.version.load(Ordering::Acquire);
            match read {
                Some((value, version)) if before == after && version == after => {
                    return Some(Snapshot { value, version });
                }
                _ => wait.spin_once(),
            }
        }
    }
}

impl<T: PartialEq> SnapshotChannel<T> {
    /// Creates a channel that skips publishing values equal to the current one.
    ///
    /// `DEDUPLICATE` is added to `options.drop_mode`. A skipped duplicate still
    /// counts as the first publish for readers waiting on it.
    pub fn with_deduplication(mut options: SnapshotOptions) -> Result<Arc<Self>, ChannelError> {
        options.drop_mode.insert(DropMode::DEDUPLICATE);
        let equals: fn(&T, &T) -> bool = <T as PartialEq>::eq;
        Self::build(options, Some(equals))
    }
}

impl<T> std::fmt::Debug for SnapshotChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotChannel")
            .field("stats", &self.stats())
            .field("options", &self.options)
            .finish()
    }
}

/// The unique publishing side of a [`SnapshotChannel`].
pub struct SnapshotPublisher<T> {
    channel: Arc<SnapshotChannel<T>>,
}

impl<T> SnapshotPublisher<T> {
    /// Publishes `value` as the new latest value.
    ///
    /// Returns `false` if the drop mode discarded it. May briefly wait for
    /// readers still cloning the slot it is about to reuse.
    pub fn publish(&mut self, value: T) -> bool {
        self.channel.publish(value)
    }

    /// The shared channel.
    pub fn channel(&self) -> &Arc<SnapshotChannel<T>> {
        &self.channel
    }
}

impl<T> Drop for SnapshotPublisher<T> {
    fn drop(&mut self) {
        self.channel
            .publisher_claimed
            .store(false, Ordering::Release);
    }
}

impl<T> std::fmt::Debug for SnapshotPublisher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SnapshotPublisher").field(&self.channel).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_before_publish_is_empty() {
        let channel = SnapshotChannel::<u32>::new(SnapshotOptions::default()).unwrap();
        assert_eq!(channel.read(), None);
        assert_eq!(channel.version(), 0);
        assert!(channel.stats().has_reader);
    }

    #[test]
    fn test_latest_value_wins() {
        let channel = SnapshotChannel::new(SnapshotOptions::default()).unwrap();
        let mut publisher = channel.claim_publisher().unwrap();
        assert!(publisher.publish("first".to_string()));
        assert!(publisher.publish("second".to_string()));
        assert!(publisher.publish("third".to_string()));

        let snapshot = channel.read().unwrap();
        assert_eq!(snapshot.value, "third");
        assert_eq!(snapshot.version, 3);
        // Reading does not consume.
        assert_eq!(channel.read(), Some(snapshot));
    }

    #[test]
    fn test_single_publisher() {
        let channel = SnapshotChannel::<u8>::new(SnapshotOptions::default()).unwrap();
        let publisher = channel.claim_publisher().unwrap();
        assert_eq!(
            channel.claim_publisher().unwrap_err(),
            ChannelError::EndpointClaimed("snapshot publisher")
        );
        drop(publisher);
        assert!(channel.claim_publisher().is_ok());
    }

    #[test]
    fn test_no_consumer_yet_suppresses_until_first_read() {
        let options = SnapshotOptions::default().drop_mode(DropMode::NO_CONSUMER_YET);
        let channel = SnapshotChannel::new(options).unwrap();
        let mut publisher = channel.claim_publisher().unwrap();

        assert!(!publisher.publish(1u32));
        assert!(!channel.has_published());
        assert_eq!(channel.read(), None);

        assert!(publisher.publish(2));
        assert_eq!(channel.read().map(|s| s.value), Some(2));
        assert_eq!(channel.stats().suppressed, 1);
    }

    #[test]
    fn test_deduplication_skips_equal_values() {
        let channel = SnapshotChannel::with_deduplication(SnapshotOptions::default()).unwrap();
        let mut publisher = channel.claim_publisher().unwrap();

        assert!(publisher.publish(5u32));
        assert!(!publisher.publish(5));
        assert!(publisher.publish(6));

        let stats = channel.stats();
        assert_eq!((stats.version, stats.published, stats.suppressed), (2, 2, 1));
        assert!(channel.options().drop_mode.contains(DropMode::DEDUPLICATE));
    }

    #[test]
    fn test_unsupported_policies() {
        let options = SnapshotOptions::default().drop_mode(DropMode::DEDUPLICATE);
        assert_eq!(
            SnapshotChannel::<u8>::new(options).unwrap_err(),
            ChannelError::UnsupportedPolicy("DEDUPLICATE")
        );
        let options = SnapshotOptions::default().drop_mode(DropMode::DROP_NEWEST);
        assert!(SnapshotChannel::<u8>::new(options).is_err());
        let options = SnapshotOptions::default().drop_mode(DropMode::DROP_OLDEST);
        assert!(SnapshotChannel::<u8>::new(options).is_ok());
    }

    #[test]
    fn test_read_until_observes_cancellation() {
        let channel = SnapshotChannel::<u8>::new(SnapshotOptions::default()).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(channel.read_until(&token), Err(Cancelled));
    }

    #[test]
    fn test_blocking_read_returns_immediately_after_publish() {
        let options = SnapshotOptions::default().block_until_first_publish();
        let channel = SnapshotChannel::new(options).unwrap();
        channel.claim_publisher().unwrap().publish(9u64);
        assert_eq!(channel.read().map(|s| (s.value, s.version)), Some((9, 1)));
    }
}
