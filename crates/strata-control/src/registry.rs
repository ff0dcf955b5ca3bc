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

//! The explicit module registration table.

use crate::error::KernelError;
use std::collections::HashMap;
use strata_core::graph::topological_sort;
use strata_core::{Affinity, ModuleDescriptor, ModuleId};

/// Collects module descriptors before any kernel launches.
///
/// Descriptors keep their declaration order, which breaks ties in the load order.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    entries: Vec<ModuleDescriptor>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module.
    ///
    /// # Errors
    ///
    /// - [`KernelError::InvalidAffinity`] unless the descriptor names exactly one affinity.
    /// - [`KernelError::DuplicateModule`] if the module type is already registered.
    pub fn register(&mut self, descriptor: ModuleDescriptor) -> Result<(), KernelError> {
        let id = descriptor.id();
        if !descriptor.affinity().is_single() {
            return Err(KernelError::InvalidAffinity {
                module: id.name(),
                affinity: descriptor.affinity(),
            });
        }
        if self.entries.iter().any(|entry| entry.id() == id) {
            return Err(KernelError::DuplicateModule(id.name()));
        }

        log::debug!(
            "ModuleRegistry: Registered {} on {} ({} dependencies)",
            id,
            descriptor.affinity(),
            descriptor.dependencies().len()
        );
        self.entries.push(descriptor);
        Ok(())
    }

    /// Returns the number of registered modules.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no modules are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates descriptors in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.entries.iter()
    }

    /// The union of the affinities modules were registered on.
    pub fn affinities(&self) -> Affinity {
        self.entries
            .iter()
            .fold(Affinity::EMPTY, |acc, entry| acc | entry.affinity())
    }

    /// Removes and returns the descriptors bound to `affinity`, in declaration order.
    pub fn take(&mut self, affinity: Affinity) -> Vec<ModuleDescriptor> {
        let (taken, rest) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|entry| entry.affinity() == affinity);
        self.entries = rest;
        taken
    }
}

/// Computes the load order of one kernel's modules.
///
/// Returns indices into `descriptors`: a topological order of the declared
/// dependencies where ties keep declaration order.
///
/// # Errors
///
/// - [`KernelError::MissingDependency`] if a dependency is not among `descriptors`.
/// - [`KernelError::Cycle`] if dependencies form a cycle.
pub fn resolve_load_order(descriptors: &[ModuleDescriptor]) -> Result<Vec<usize>, KernelError> {
    let index_of: HashMap<ModuleId, usize> = descriptors
        .iter()
        .enumerate()
        .map(|(index, descriptor)| (descriptor.id(), index))
        .collect();

    let mut edges = Vec::new();
    for (index, descriptor) in descriptors.iter().enumerate() {
        for dependency in descriptor.dependencies() {
            let Some(&parent) = index_of.get(dependency) else {
                return Err(KernelError::MissingDependency {
                    module: descriptor.id().name(),
                    dependency: dependency.name(),
                });
            };
            edges.push((parent, index));
        }
    }

    topological_sort(0..descriptors.len(), edges).map_err(|cycle| {
        KernelError::Cycle(
            cycle
                .remaining
                .into_iter()
                .map(|index| descriptors[index].id().name())
                .collect(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::Module;

    macro_rules! test_module {
        ($($name:ident),*) => {
            $(
                #[derive(Default)]
                struct $name;
                impl Module for $name {}
            )*
        };
    }

    test_module!(Window, Input, Physics, Gameplay, Audio);

    fn names(descriptors: &[ModuleDescriptor], order: &[usize]) -> Vec<&'static str> {
        order
            .iter()
            .map(|index| {
                let name = descriptors[*index].id().name();
                name.rsplit("::").next().unwrap_or(name)
            })
            .collect()
    }

    #[test]
    fn test_register_rejects_combined_affinity() {
        let mut registry = ModuleRegistry::new();
        let result = registry.register(ModuleDescriptor::new::<Window>(
            Affinity::MAIN | Affinity::GAME,
            Window::default,
        ));
        assert!(matches!(result, Err(KernelError::InvalidAffinity { .. })));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = ModuleRegistry::new();
        registry
            .register(ModuleDescriptor::new::<Audio>(Affinity::GAME, Audio::default))
            .unwrap();
        let result =
            registry.register(ModuleDescriptor::new::<Audio>(Affinity::RENDER, Audio::default));
        assert!(matches!(result, Err(KernelError::DuplicateModule(_))));
    }

    #[test]
    fn test_take_splits_by_affinity_in_declaration_order() {
        let mut registry = ModuleRegistry::new();
        registry
            .register(ModuleDescriptor::new::<Physics>(Affinity::GAME, Physics::default))
            .unwrap();
        registry
            .register(ModuleDescriptor::new::<Window>(Affinity::MAIN, Window::default))
            .unwrap();
        registry
            .register(ModuleDescriptor::new::<Gameplay>(Affinity::GAME, Gameplay::default))
            .unwrap();
        assert_eq!(registry.affinities(), Affinity::MAIN | Affinity::GAME);

        let game = registry.take(Affinity::GAME);
        assert_eq!(names(&game, &[0, 1]), vec!["Physics", "Gameplay"]);
        assert_eq!(registry.len(), 1);
        assert!(registry.take(Affinity::RENDER).is_empty());
    }

    #[test]
    fn test_load_order_follows_dependencies_then_declaration() {
        let descriptors = vec![
            ModuleDescriptor::new::<Gameplay>(Affinity::GAME, Gameplay::default)
                .depends_on::<Physics>()
                .depends_on::<Input>(),
            ModuleDescriptor::new::<Audio>(Affinity::GAME, Audio::default),
            ModuleDescriptor::new::<Physics>(Affinity::GAME, Physics::default),
            ModuleDescriptor::new::<Input>(Affinity::GAME, Input::default),
        ];
        let order = resolve_load_order(&descriptors).unwrap();
        assert_eq!(
            names(&descriptors, &order),
            vec!["Audio", "Physics", "Input", "Gameplay"]
        );
    }

    #[test]
    fn test_missing_dependency() {
        let descriptors = vec![
            ModuleDescriptor::new::<Gameplay>(Affinity::GAME, Gameplay::default)
                .depends_on::<Window>(),
        ];
        match resolve_load_order(&descriptors) {
            Err(KernelError::MissingDependency { dependency, .. }) => {
                assert!(dependency.ends_with("Window"))
            }
            other => panic!("expected a missing dependency, got {other:?}"),
        }
    }

    #[test]
    fn test_cycle() {
        let descriptors = vec![
            ModuleDescriptor::new::<Physics>(Affinity::GAME, Physics::default)
                .depends_on::<Gameplay>(),
            ModuleDescriptor::new::<Gameplay>(Affinity::GAME, Gameplay::default)
                .depends_on::<Physics>(),
            ModuleDescriptor::new::<Audio>(Affinity::GAME, Audio::default),
        ];
        match resolve_load_order(&descriptors) {
            Err(KernelError::Cycle(members)) => assert_eq!(members.len(), 2),
            other => panic!("expected a cycle, got {other:?}"),
        }
    }
}
