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

//! Errors raised when a channel or queue is misconfigured.

/// A configuration error detected while constructing or wiring a channel.
///
/// Backpressure is never reported through this type: a full channel resolves
/// through its configured policy instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// The requested capacity is zero.
    #[error("capacity must be greater than zero")]
    InvalidCapacity,
    /// A ring channel capacity is not a power of two.
    #[error("capacity {0} is not a power of two")]
    NotPowerOfTwo(usize),
    /// The single writer, reader, or publisher endpoint was already handed out.
    #[error("the {0} endpoint was already claimed")]
    EndpointClaimed(&'static str),
    /// The drop mode includes a policy this channel cannot honor.
    #[error("unsupported drop policy {0}")]
    UnsupportedPolicy(&'static str),
}
