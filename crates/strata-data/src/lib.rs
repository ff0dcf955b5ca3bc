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

//! # Strata Data
//!
//! Inter-thread communication primitives used by modules running on different
//! kernels:
//!
//! - [`RingChannel`]: a bounded single-producer/single-consumer FIFO.
//! - [`SnapshotChannel`]: a versioned latest-value broadcast.
//! - [`DoubleBufferedQueue`]: a producer-owned batch buffer handed off by swap.
//!
//! Channels are plain values constructed during application assembly and shared
//! through `Arc`; there is no global channel registry.

#![warn(missing_docs)]

mod cache_padded;
pub mod double_buffer;
pub mod error;
pub mod policy;
pub mod pool;
pub mod ring_channel;
pub mod snapshot;
pub mod wait;

pub use double_buffer::DoubleBufferedQueue;
pub use error::ChannelError;
pub use policy::{CapacityPolicy, DropMode, FullMode, RingOptions, SnapshotOptions, WaitMode};
pub use pool::BufferPool;
pub use ring_channel::{ring_channel, RingChannel, RingReader, RingStats, RingWriter, TryWriteError};
pub use snapshot::{Snapshot, SnapshotChannel, SnapshotPublisher, SnapshotStats};
pub use wait::SpinWait;
