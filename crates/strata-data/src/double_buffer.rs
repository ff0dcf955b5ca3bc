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

//! A producer-owned pair of buffers for batching values within a frame.
//!
//! The producer pushes into the write buffer during a frame, then calls
//! [`DoubleBufferedQueue::swap_and_read`] to turn that batch into the read
//! view. The queue does no synchronization of its own; handing the read view
//! to another thread is up to the caller.

use crate::error::ChannelError;
use crate::policy::CapacityPolicy;
use crate::pool::BufferPool;
use std::sync::Arc;

/// Double-buffered batch queue with a capacity policy and pooled storage.
///
/// ```
/// use strata_data::{CapacityPolicy, DoubleBufferedQueue};
///
/// let mut queue = DoubleBufferedQueue::with_capacity(4, CapacityPolicy::Grow).unwrap();
/// queue.push("jump");
/// queue.push("fire");
/// assert_eq!(queue.swap_and_read(), &["jump", "fire"]);
/// assert!(queue.is_empty());
/// ```
#[derive(Debug)]
pub struct DoubleBufferedQueue<T> {
    write: Vec<T>,
    read: Vec<T>,
    capacity: usize,
    policy: CapacityPolicy,
    pool: Arc<BufferPool<T>>,
    dropped: u64,
    last_count: usize,
}

impl<T> DoubleBufferedQueue<T> {
    /// Creates a queue renting its buffers from `pool`.
    ///
    /// `capacity` is rounded up to a power of two.
    ///
    /// # Errors
    ///
    /// [`ChannelError::InvalidCapacity`] if `capacity` is zero.
    pub fn new(
        capacity: usize,
        policy: CapacityPolicy,
        pool: Arc<BufferPool<T>>,
    ) -> Result<Self, ChannelError> {
        if capacity == 0 {
            return Err(ChannelError::InvalidCapacity);
        }
        let capacity = capacity.next_power_of_two();
        Ok(Self {
            write: pool.rent(capacity),
            read: pool.rent(capacity),
            capacity,
            policy,
            pool,
            dropped: 0,
            last_count: 0,
        })
    }

    /// Creates a queue with a private pool.
    pub fn with_capacity(capacity: usize, policy: CapacityPolicy) -> Result<Self, ChannelError> {
        Self::new(capacity, policy, Arc::new(BufferPool::new(2)))
    }

    /// Appends `item` to the current batch.
    ///
    /// On a full batch, the capacity policy decides: `Grow` doubles the
    /// capacity, `DropNewest` rejects `item`, and `DropOldest` discards the first
    /// item of the batch. Returns whether `item` was accepted.
    pub fn push(&mut self, item: T) -> bool {
        if self.write.len() < self.capacity {
            self.write.push(item);
            return true;
        }

        match self.policy {
            CapacityPolicy::Grow => {
                self.capacity = (self.capacity * 2).next_power_of_two();
                self.write.reserve_exact(self.capacity - self.write.len());
                log::trace!(
                    "DoubleBufferedQueue<{}>: grew to {}",
                    std::any::type_name::<T>(),
                    self.capacity
                );
                self.write.push(item);
                true
            }
            CapacityPolicy::DropNewest => {
                self.dropped += 1;
                false
            }
            CapacityPolicy::DropOldest => {
                self.write.remove(0);
                self.dropped += 1;
                self.write.push(item);
                true
            }
        }
    }

    /// Ends the batch: the write buffer becomes the read view and a cleared
    /// buffer takes its place. Returns the new read view.
    pub fn swap_and_read(&mut self) -> &[T] {
        std::mem::swap(&mut self.write, &mut self.read);
        self.write.clear();
        self.last_count = self.read.len();
        &self.read
    }

    /// The batch returned by the last swap.
    pub fn read_view(&self) -> &[T] {
        &self.read
    }

    /// Makes room for at least `capacity` items in both buffers.
    pub fn ensure_capacity(&mut self, capacity: usize) {
        if capacity <= self.capacity {
            return;
        }
        self.capacity = capacity.next_power_of_two();
        self.write.reserve_exact(self.capacity - self.write.len());
        self.read.reserve_exact(self.capacity - self.read.len());
    }

    /// Shrinks both buffers to the smallest power of two holding their contents.
    pub fn trim_excess(&mut self) {
        self.capacity = self.write.len().max(self.read.len()).max(1).next_power_of_two();
        self.write.shrink_to(self.capacity);
        self.read.shrink_to(self.capacity);
    }

    /// Items pushed since the last swap.
    pub fn len(&self) -> usize {
        self.write.len()
    }

    /// Returns `true` if nothing was pushed since the last swap.
    pub fn is_empty(&self) -> bool {
        self.write.is_empty()
    }

    /// Current batch capacity, always a power of two.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The configured capacity policy.
    pub fn policy(&self) -> CapacityPolicy {
        self.policy
    }

    /// Items discarded by the `DropNewest` and `DropOldest` policies so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Size of the batch handed out by the last swap.
    pub fn last_count(&self) -> usize {
        self.last_count
    }
}

impl<T> Drop for DoubleBufferedQueue<T> {
    fn drop(&mut self) {
        self.pool.give_back(std::mem::take(&mut self.write));
        self.pool.give_back(std::mem::take(&mut self.read));
    }
}
