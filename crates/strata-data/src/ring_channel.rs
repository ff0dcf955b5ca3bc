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

//! Bounded single-producer/single-consumer ring channel.
//!
//! The buffer holds `capacity` slots (a power of two) indexed by two
//! monotonically increasing cursors: `head` is the next slot to read and `tail`
//! the next slot to write. The writer owns `tail` and the reader owns `head`;
//! each publishes its cursor with `Release` after touching the payload and reads
//! the other one with `Acquire`, so no compare-and-swap is needed.
//!
//! Exactly one [`RingWriter`] and one [`RingReader`] can exist at a time; they
//! are the only way to touch the buffer.

use crate::cache_padded::CachePadded;
use crate::error::ChannelError;
use crate::policy::{DropMode, RingOptions};
use crate::wait::SpinWait;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use strata_core::{CancellationToken, Cancelled};

/// Why [`RingWriter::try_write`] gave the item back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TryWriteError<T> {
    /// Every slot holds an unread item.
    #[error("ring channel is full")]
    Full(T),
    /// `NO_CONSUMER_YET` is set and no reader has read yet.
    #[error("ring channel has no consumer yet")]
    NoConsumer(T),
}

impl<T> TryWriteError<T> {
    /// Recovers the rejected item.
    pub fn into_inner(self) -> T {
        match self {
            TryWriteError::Full(item) | TryWriteError::NoConsumer(item) => item,
        }
    }
}

/// A point-in-time view of a ring channel's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RingStats {
    /// Number of slots.
    pub capacity: usize,
    /// Items written but not yet read.
    pub len: usize,
    /// Items successfully written.
    pub written: u64,
    /// Items read.
    pub read: u64,
    /// Items discarded by policy or by a cancelled write.
    pub dropped: u64,
}

/// The shared state of a single-producer/single-consumer ring.
pub struct RingChannel<T> {
    slots: Box<[UnsafeCell<Option<T>>]>,
    mask: usize,
    head: CachePadded<AtomicUsize>,
    tail: CachePadded<AtomicUsize>,
    reader_seen: AtomicBool,
    writer_claimed: AtomicBool,
    reader_claimed: AtomicBool,
    written: AtomicU64,
    read: AtomicU64,
    dropped: AtomicU64,
    options: RingOptions,
}

// SAFETY: slots are only touched through the unique writer and reader
// endpoints. A slot is written by the writer strictly before `tail` is
// published past it and taken by the reader strictly before `head` is published
// past it, so the two sides never access the same slot concurrently.
unsafe impl<T: Send> Sync for RingChannel<T> {}

impl<T> RingChannel<T> {
    /// Creates a ring with `capacity` slots.
    ///
    /// # Errors
    ///
    /// - [`ChannelError::InvalidCapacity`] if `capacity` is zero.
    /// - [`ChannelError::NotPowerOfTwo`] if `capacity` is not a power of two.
    /// - [`ChannelError::UnsupportedPolicy`] if the drop mode asks for
    ///   `DROP_OLDEST` or `DEDUPLICATE`, which a single-reader ring cannot honor.
    pub fn new(capacity: usize, options: RingOptions) -> Result<Arc<Self>, ChannelError> {
        if capacity == 0 {
            return Err(ChannelError::InvalidCapacity);
        }
        if !capacity.is_power_of_two() {
            return Err(ChannelError::NotPowerOfTwo(capacity));
        }
        if options.drop_mode.contains(DropMode::DROP_OLDEST) {
            return Err(ChannelError::UnsupportedPolicy("DROP_OLDEST"));
        }
        if options.drop_mode.contains(DropMode::DEDUPLICATE) {
            return Err(ChannelError::UnsupportedPolicy("DEDUPLICATE"));
        }

        let slots = (0..capacity).map(|_| UnsafeCell::new(None)).collect();
        log::trace!(
            "RingChannel<{}>: created with {} slots, {:?}",
            std::any::type_name::<T>(),
            capacity,
            options
        );

        Ok(Arc::new(Self {
            slots,
            mask: capacity - 1,
            head: CachePadded(AtomicUsize::new(0)),
            tail: CachePadded(AtomicUsize::new(0)),
            reader_seen: AtomicBool::new(false),
            writer_claimed: AtomicBool::new(false),
            reader_claimed: AtomicBool::new(false),
            written: AtomicU64::new(0),
            read: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            options,
        }))
    }

    /// Takes the writer endpoint.
    ///
    /// Fails with [`ChannelError::EndpointClaimed`] while another writer is alive.
    pub fn claim_writer(self: &Arc<Self>) -> Result<RingWriter<T>, ChannelError> {
        if self.writer_claimed.swap(true, Ordering::AcqRel) {
            return Err(ChannelError::EndpointClaimed("ring writer"));
        }
        Ok(RingWriter {
            channel: Arc::clone(self),
        })
    }

    /// Takes the reader endpoint.
    ///
    /// Fails with [`ChannelError::EndpointClaimed`] while another reader is alive.
    pub fn claim_reader(self: &Arc<Self>) -> Result<RingReader<T>, ChannelError> {
        if self.reader_claimed.swap(true, Ordering::AcqRel) {
            return Err(ChannelError::EndpointClaimed("ring reader"));
        }
        Ok(RingReader {
            channel: Arc::clone(self),
        })
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Items currently buffered. Only a hint while both sides are running.
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        tail.wrapping_sub(head).min(self.capacity())
    }

    /// Returns `true` if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The options the ring was created with.
    pub fn options(&self) -> RingOptions {
        self.options
    }

    /// Reads the counters.
    pub fn stats(&self) -> RingStats {
        RingStats {
            capacity: self.capacity(),
            len: self.len(),
            written: self.written.load(Ordering::Relaxed),
            read: self.read.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    fn count_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Must only be called by the unique writer.
    fn push(&self, item: T) -> Result<(), TryWriteError<T>> {
        if self.options.drop_mode.contains(DropMode::NO_CONSUMER_YET)
            && !self.reader_seen.load(Ordering::Acquire)
        {
            self.count_drop();
            return Err(TryWriteError::NoConsumer(item));
        }

        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if tail.wrapping_sub(head) >= self.capacity() {
            return Err(TryWriteError::Full(item));
        }

        // SAFETY: `tail - head < capacity`, so the reader has released this slot
        // (its `head` store happened-before our `Acquire` load) and will not look
        // at it until we publish the new tail below.
        unsafe {
            *self.slots[tail & self.mask].get() = Some(item);
        }
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        self.written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Records that a consumer exists, lifting `NO_CONSUMER_YET` suppression.
    fn mark_reader(&self) {
        self.reader_seen.store(true, Ordering::Release);
    }

    /// Must only be called by the unique reader.
    fn pop(&self) -> Option<T> {
        self.mark_reader();

        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head == tail {
            return None;
        }

        // SAFETY: `head < tail`, so the writer filled this slot before its
        // `Release` store of `tail`, which our `Acquire` load observed. The writer
        // will not reuse the slot until we publish the new head below.
        let item = unsafe { (*self.slots[head & self.mask].get()).take() };
        self.head.store(head.wrapping_add(1), Ordering::Release);
        self.read.fetch_add(1, Ordering::Relaxed);
        item
    }
}

impl<T> std::fmt::Debug for RingChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingChannel")
            .field("stats", &self.stats())
            .field("options", &self.options)
            .finish()
    }
}

/// Creates a ring and claims both of its endpoints.
///
/// ```
/// use strata_data::{ring_channel, RingOptions};
///
/// let (mut writer, mut reader) = ring_channel::<u32>(4, RingOptions::default()).unwrap();
/// writer.try_write(7).unwrap();
/// assert_eq!(reader.try_read(), Some(7));
/// assert_eq!(reader.try_read(), None);
/// ```
pub fn ring_channel<T>(
    capacity: usize,
    options: RingOptions,
) -> Result<(RingWriter<T>, RingReader<T>), ChannelError> {
    let channel = RingChannel::new(capacity, options)?;
    Ok((channel.claim_writer()?, channel.claim_reader()?))
}

/// The unique producer side of a [`RingChannel`].
///
/// Dropping the writer releases the claim, so another thread may claim it later.
pub struct RingWriter<T> {
    channel: Arc<RingChannel<T>>,
}

impl<T> RingWriter<T> {
    /// Writes without blocking.
    ///
    /// On failure the item is handed back inside the error and nothing changes,
    /// except the drop counter for [`TryWriteError::NoConsumer`].
    pub fn try_write(&mut self, item: T) -> Result<(), TryWriteError<T>> {
        self.channel.push(item)
    }

    /// Writes, waiting for room while the buffer is full.
    ///
    /// Returns `Ok(true)` if the item was enqueued and `Ok(false)` if the
    /// configured policy discarded it (no consumer yet, or `DropWrite` /
    /// `DROP_NEWEST` on a full buffer). The wait checks `token` on every retry
    /// and gives up with [`Cancelled`], dropping the item, once it fires.
    pub fn write(&mut self, item: T, token: &CancellationToken) -> Result<bool, Cancelled> {
        let mut pending = match self.channel.push(item) {
            Ok(()) => return Ok(true),
            Err(TryWriteError::NoConsumer(_)) => return Ok(false),
            Err(TryWriteError::Full(item)) => item,
        };

        if self.channel.options.drops_when_full() {
            self.channel.count_drop();
            return Ok(false);
        }

        let mut wait = SpinWait::new(self.channel.options.wait_mode);
        loop {
            if token.is_cancelled() {
                self.channel.count_drop();
                return Err(Cancelled);
            }
            wait.spin_once();
            pending = match self.channel.push(pending) {
                Ok(()) => return Ok(true),
                Err(TryWriteError::NoConsumer(_)) => return Ok(false),
                Err(TryWriteError::Full(item)) => item,
            };
        }
    }

    /// The shared channel.
    pub fn channel(&self) -> &Arc<RingChannel<T>> {
        &self.channel
    }
}

impl<T> Drop for RingWriter<T> {
    fn drop(&mut self) {
        self.channel.writer_claimed.store(false, Ordering::Release);
    }
}

impl<T> std::fmt::Debug for RingWriter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RingWriter").field(&self.channel).finish()
    }
}

/// The unique consumer side of a [`RingChannel`].
///
/// Dropping the reader releases the claim, so another thread may claim it later.
pub struct RingReader<T> {
    channel: Arc<RingChannel<T>>,
}

impl<T> RingReader<T> {
    /// Takes the oldest item, if any.
    ///
    /// The first call marks the channel as having a consumer, which lifts
    /// `NO_CONSUMER_YET` suppression for good.
    pub fn try_read(&mut self) -> Option<T> {
        self.channel.pop()
    }

    /// Takes every item available right now, oldest first.
    ///
    /// Like [`try_read`](Self::try_read), calling it marks the channel as having
    /// a consumer, even when nothing is buffered.
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.channel.mark_reader();
        let available = self.channel.len();
        let channel = &self.channel;
        (0..available).map_while(move |_| channel.pop())
    }

    /// The shared channel.
    pub fn channel(&self) -> &Arc<RingChannel<T>> {
        &self.channel
    }
}

impl<T> Drop for RingReader<T> {
    fn drop(&mut self) {
        self.channel.reader_claimed.store(false, Ordering::Release);
    }
}

impl<T> std::fmt::Debug for RingReader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RingReader").field(&self.channel).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::FullMode;

    fn ring(capacity: usize) -> (RingWriter<u32>, RingReader<u32>) {
        ring_channel(capacity, RingOptions::default()).unwrap()
    }

    #[test]
    fn test_capacity_validation() {
        assert_eq!(
            RingChannel::<u8>::new(0, RingOptions::default()).unwrap_err(),
            ChannelError::InvalidCapacity
        );
        assert_eq!(
            RingChannel::<u8>::new(12, RingOptions::default()).unwrap_err(),
            ChannelError::NotPowerOfTwo(12)
        );
        assert!(RingChannel::<u8>::new(1, RingOptions::default()).is_ok());
    }

    #[test]
    fn test_unsupported_drop_modes_are_rejected() {
        let options = RingOptions::default().drop_mode(DropMode::DROP_OLDEST);
        assert_eq!(
            RingChannel::<u8>::new(4, options).unwrap_err(),
            ChannelError::UnsupportedPolicy("DROP_OLDEST")
        );
        let options = RingOptions::default().drop_mode(DropMode::DEDUPLICATE);
        assert!(RingChannel::<u8>::new(4, options).is_err());
    }

    #[test]
    fn test_fifo_order_across_wraparound() {
        let (mut writer, mut reader) = ring(4);
        let mut expected = Vec::new();
        let mut received = Vec::new();
        for round in 0..5u32 {
            for i in 0..3 {
                let value = round * 10 + i;
                writer.try_write(value).unwrap();
                expected.push(value);
            }
            received.extend(reader.drain());
        }
        assert_eq!(received, expected);
        assert!(reader.channel().is_empty());
    }

    #[test]
    fn test_full_buffer_rejects_without_overwrite() {
        let (mut writer, mut reader) = ring(4);
        for i in 0..4 {
            writer.try_write(i).unwrap();
        }
        assert_eq!(writer.try_write(99), Err(TryWriteError::Full(99)));
        assert_eq!(reader.drain().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_endpoints_are_unique_until_dropped() {
        let channel = RingChannel::<u32>::new(2, RingOptions::default()).unwrap();
        let writer = channel.claim_writer().unwrap();
        assert_eq!(
            channel.claim_writer().unwrap_err(),
            ChannelError::EndpointClaimed("ring writer")
        );
        drop(writer);
        assert!(channel.claim_writer().is_ok());

        let _reader = channel.claim_reader().unwrap();
        assert!(channel.claim_reader().is_err());
    }

    #[test]
    fn test_no_consumer_yet_discards_until_first_read() {
        let options = RingOptions::default().drop_mode(DropMode::NO_CONSUMER_YET);
        let (mut writer, mut reader) = ring_channel::<u32>(4, options).unwrap();
        let token = CancellationToken::new();

        assert_eq!(writer.try_write(1), Err(TryWriteError::NoConsumer(1)));
        assert_eq!(writer.write(2, &token), Ok(false));
        assert_eq!(reader.try_read(), None);

        writer.try_write(3).unwrap();
        assert_eq!(reader.try_read(), Some(3));
        assert_eq!(writer.channel().stats().dropped, 2);
    }

    #[test]
    fn test_drain_on_empty_ring_counts_as_a_consumer() {
        let options = RingOptions::default().drop_mode(DropMode::NO_CONSUMER_YET);
        let (mut writer, mut reader) = ring_channel::<u32>(4, options).unwrap();

        assert_eq!(reader.drain().count(), 0);
        let mut received = Vec::new();
        for frame in 0..100 {
            writer.try_write(frame).unwrap();
            received.extend(reader.drain());
        }

        assert_eq!(received, (0..100).collect::<Vec<_>>());
        let stats = reader.channel().stats();
        assert_eq!((stats.written, stats.read, stats.dropped), (100, 100, 0));
    }

    #[test]
    fn test_drop_write_discards_on_full() {
        let options = RingOptions::default().full_mode(FullMode::DropWrite);
        let (mut writer, mut reader) = ring_channel::<u32>(1, options).unwrap();
        let token = CancellationToken::new();

        assert_eq!(writer.write(1, &token), Ok(true));
        assert_eq!(writer.write(2, &token), Ok(false));
        assert_eq!(reader.try_read(), Some(1));

        let stats = reader.channel().stats();
        assert_eq!((stats.written, stats.read, stats.dropped), (1, 1, 1));
    }

    #[test]
    fn test_blocking_write_on_full_buffer_observes_cancellation() {
        let (mut writer, _reader) = ring(1);
        let token = CancellationToken::new();
        writer.try_write(1).unwrap();
        token.cancel();
        assert_eq!(writer.write(2, &token), Err(Cancelled));
    }

    #[test]
    fn test_read_clears_slot() {
        let (mut writer, mut reader) = ring_channel::<Arc<u32>>(2, RingOptions::default()).unwrap();
        let payload = Arc::new(5);
        writer.try_write(Arc::clone(&payload)).unwrap();
        let received = reader.try_read().unwrap();
        drop(received);
        assert_eq!(Arc::strong_count(&payload), 1);
    }

    #[test]
    fn test_unread_items_are_dropped_with_channel() {
        let payload = Arc::new(());
        {
            let (mut writer, _reader) =
                ring_channel::<Arc<()>>(4, RingOptions::default()).unwrap();
            writer.try_write(Arc::clone(&payload)).unwrap();
            writer.try_write(Arc::clone(&payload)).unwrap();
            assert_eq!(Arc::strong_count(&payload), 3);
        }
        assert_eq!(Arc::strong_count(&payload), 1);
    }
}
