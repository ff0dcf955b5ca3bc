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

//! A type-keyed service locator filled during application assembly.
//!
//! Channels and other shared services are constructed once, inserted here
//! before any kernel launches, and looked up by modules during `load`. The
//! registry is read-only afterwards, so lookups need no locking.

use crate::module::{ModuleError, ModuleResult};
use std::any::{Any, TypeId};
use std::collections::HashMap;

/// A service registry keyed by [`TypeId`].
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use strata_core::ServiceRegistry;
///
/// struct FrameBudget { millis: u32 }
///
/// let mut registry = ServiceRegistry::new();
/// registry.insert(Arc::new(FrameBudget { millis: 16 }));
///
/// let budget = registry.get::<Arc<FrameBudget>>().unwrap();
/// assert_eq!(budget.millis, 16);
/// ```
#[derive(Default)]
pub struct ServiceRegistry {
    services: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl ServiceRegistry {
    /// Creates an empty service registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Inserts a service, keyed by `T`'s [`TypeId`].
    ///
    /// Returns `true` if a service of the same type was replaced.
    pub fn insert<T: Send + Sync + 'static>(&mut self, service: T) -> bool {
        let replaced = self
            .services
            .insert(TypeId::of::<T>(), Box::new(service))
            .is_some();
        if replaced {
            log::warn!(
                "ServiceRegistry: replaced existing `{}`",
                std::any::type_name::<T>()
            );
        }
        replaced
    }

    /// Retrieves a shared reference to a previously registered service.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.services
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T>())
    }

    /// Like [`get`](Self::get), but reports a missing service as a module error,
    /// so `load` implementations can use `?`.
    pub fn require<T: Send + Sync + 'static>(&self) -> ModuleResult<&T> {
        self.get::<T>()
            .ok_or(ModuleError::MissingService(std::any::type_name::<T>()))
    }

    /// Returns `true` if a service of type `T` is registered.
    #[must_use]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if no services are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("len", &self.services.len())
            .finish()
    }
}
