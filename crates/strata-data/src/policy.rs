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

//! Policies controlling channel and queue behavior under capacity pressure.

use strata_core::strata_bitflags;

strata_bitflags! {
    /// Drop behavior shared by the channels.
    ///
    /// Not every channel honors every flag; see [`RingOptions`] and
    /// [`SnapshotOptions`].
    pub struct DropMode: u8 {
        /// Discard the oldest unread value to make room.
        const DROP_OLDEST = 1 << 0;
        /// Discard the incoming value when there is no room.
        const DROP_NEWEST = 1 << 1;
        /// Discard writes until a reader has shown up once.
        const NO_CONSUMER_YET = 1 << 2;
        /// Skip publishing a value equal to the current one.
        const DEDUPLICATE = 1 << 3;
    }
}

/// What a blocking ring write does when the buffer is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FullMode {
    /// Wait for the reader to free a slot.
    #[default]
    Wait,
    /// Discard the item.
    DropWrite,
}

/// How a blocking ring write waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitMode {
    /// Busy-spin only. Lowest latency, burns a core.
    Spin,
    /// Spin briefly, then yield the thread between retries.
    #[default]
    Hybrid,
}

/// What a [`DoubleBufferedQueue`](crate::DoubleBufferedQueue) does when its write
/// buffer is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapacityPolicy {
    /// Double the capacity and keep every item.
    #[default]
    Grow,
    /// Reject the incoming item and count a drop.
    DropNewest,
    /// Shift out the oldest item and append. O(n), meant for small batches.
    DropOldest,
}

/// Construction options for a [`RingChannel`](crate::RingChannel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RingOptions {
    /// Behavior of blocking writes on a full buffer.
    pub full_mode: FullMode,
    /// Waiting strategy of blocking writes.
    pub wait_mode: WaitMode,
    /// Supported flags: `DROP_NEWEST` and `NO_CONSUMER_YET`.
    pub drop_mode: DropMode,
}

impl RingOptions {
    /// Sets the full mode.
    #[must_use]
    pub fn full_mode(mut self, full_mode: FullMode) -> Self {
        self.full_mode = full_mode;
        self
    }

    /// Sets the wait mode.
    #[must_use]
    pub fn wait_mode(mut self, wait_mode: WaitMode) -> Self {
        self.wait_mode = wait_mode;
        self
    }

    /// Sets the drop mode.
    #[must_use]
    pub fn drop_mode(mut self, drop_mode: DropMode) -> Self {
        self.drop_mode = drop_mode;
        self
    }

    /// Returns `true` if a blocking write on a full buffer discards instead of waiting.
    pub fn drops_when_full(&self) -> bool {
        self.full_mode == FullMode::DropWrite || self.drop_mode.contains(DropMode::DROP_NEWEST)
    }
}

/// Construction options for a [`SnapshotChannel`](crate::SnapshotChannel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnapshotOptions {
    /// Supported flags: `NO_CONSUMER_YET` and `DEDUPLICATE`. The latter requires
    /// [`SnapshotChannel::with_deduplication`](crate::SnapshotChannel::with_deduplication).
    /// `DROP_OLDEST` describes what a snapshot always does and is accepted.
    pub drop_mode: DropMode,
    /// Make [`read`](crate::SnapshotChannel::read) wait until the first publish.
    pub block_until_first_publish: bool,
}

impl SnapshotOptions {
    /// Sets the drop mode.
    #[must_use]
    pub fn drop_mode(mut self, drop_mode: DropMode) -> Self {
        self.drop_mode = drop_mode;
        self
    }

    /// Enables blocking reads until the first publish.
    #[must_use]
    pub fn block_until_first_publish(mut self) -> Self {
        self.block_until_first_publish = true;
        self
    }
}
