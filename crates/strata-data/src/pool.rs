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

//! A pool of reusable `Vec` allocations.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Hands out and takes back empty vectors so that queues created and dropped
/// every few frames do not reallocate their storage.
///
/// Renting prefers the smallest pooled vector that is large enough. Returned
/// vectors are cleared; their capacity is kept.
#[derive(Debug)]
pub struct BufferPool<T> {
    free: Mutex<Vec<Vec<T>>>,
    max_pooled: usize,
}

impl<T> Default for BufferPool<T> {
    fn default() -> Self {
        Self::new(16)
    }
}

impl<T> BufferPool<T> {
    /// Creates a pool that keeps at most `max_pooled` vectors.
    pub fn new(max_pooled: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            max_pooled,
        }
    }

    fn free(&self) -> MutexGuard<'_, Vec<Vec<T>>> {
        // A panic while holding the lock cannot leave the list inconsistent.
        self.free.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns an empty vector with room for at least `capacity` items.
    pub fn rent(&self, capacity: usize) -> Vec<T> {
        let mut free = self.free();
        let best = free
            .iter()
            .enumerate()
            .filter(|(_, buffer)| buffer.capacity() >= capacity)
            .min_by_key(|(_, buffer)| buffer.capacity())
            .map(|(index, _)| index);

        match best {
            Some(index) => free.swap_remove(index),
            None => Vec::with_capacity(capacity),
        }
    }

    /// Gives a vector back to the pool. It is dropped if the pool is full.
    pub fn give_back(&self, mut buffer: Vec<T>) {
        buffer.clear();
        if buffer.capacity() == 0 {
            return;
        }
        let mut free = self.free();
        if free.len() < self.max_pooled {
            free.push(buffer);
        }
    }

    /// Number of vectors currently pooled.
    pub fn pooled(&self) -> usize {
        self.free().len()
    }
}
