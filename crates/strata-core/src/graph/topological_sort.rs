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

//! A stable variant of Kahn's algorithm for topological sorting.

use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;

/// An error indicating that a cycle was detected in the graph.
///
/// Carries the nodes that could not be ordered, in their original order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError<T> {
    /// Nodes that are part of, or depend on, a cycle.
    pub remaining: Vec<T>,
}

/// Performs a topological sort on a generic directed graph.
///
/// The graph is defined by a list of nodes and a set of directed edges
/// representing dependencies (from parent to child). Among nodes that are ready
/// at the same time, the one listed first in `nodes` comes first, so the output
/// is deterministic and follows declaration order wherever edges allow it.
///
/// Edges that mention unknown nodes are ignored.
///
/// # Returns
///
/// * `Ok(Vec<T>)`: The nodes in a valid topological order.
/// * `Err(CycleError)`: If the graph contains one or more cycles.
pub fn topological_sort<T>(
    nodes: impl IntoIterator<Item = T>,
    edges: impl IntoIterator<Item = (T, T)>,
) -> Result<Vec<T>, CycleError<T>>
where
    T: Copy + Eq + Hash,
{
    let node_list: Vec<T> = nodes.into_iter().collect();
    if node_list.is_empty() {
        return Ok(Vec::new());
    }

    let position: HashMap<T, usize> = node_list
        .iter()
        .enumerate()
        .map(|(index, node)| (*node, index))
        .collect();

    // 1. Build adjacency list and in-degree counts over node positions.
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); node_list.len()];
    let mut in_degree = vec![0usize; node_list.len()];
    for (parent, child) in edges {
        if let (Some(&p), Some(&c)) = (position.get(&parent), position.get(&child)) {
            children[p].push(c);
            in_degree[c] += 1;
        }
    }

    // 2. Seed the ready set with every root, ordered by position.
    let mut ready: BTreeSet<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(index, _)| index)
        .collect();

    // 3. Always take the earliest declared ready node.
    let mut sorted = Vec::with_capacity(node_list.len());
    while let Some(parent) = ready.pop_first() {
        sorted.push(parent);
        for &child in &children[parent] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                ready.insert(child);
            }
        }
    }

    // 4. Check for cycles.
    if sorted.len() != node_list.len() {
        let remaining = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree > 0)
            .map(|(index, _)| node_list[index])
            .collect();
        Err(CycleError { remaining })
    } else {
        Ok(sorted.into_iter().map(|index| node_list[index]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_independent_nodes_keep_declaration_order() {
        let order = topological_sort([3, 1, 2], std::iter::empty()).unwrap();
        assert_eq!(order, vec![3, 1, 2]);
    }

    #[test]
    fn test_dependency_moves_node_forward() {
        // "c" is declared last but "a" needs it.
        let order = topological_sort(["a", "b", "c"], [("c", "a")]).unwrap();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_ready_ties_prefer_earlier_declaration() {
        // Both 1 and 2 become ready after 0; 2 is declared first.
        let order = topological_sort([2, 1, 0], [(0, 2), (0, 1)]).unwrap();
        assert_eq!(order, vec![0, 2, 1]);
    }

    #[test]
    fn test_cycle_is_reported_with_members() {
        let error = topological_sort([1, 2, 3, 4], [(1, 2), (2, 3), (3, 2)]).unwrap_err();
        assert_eq!(error.remaining, vec![2, 3]);
    }

    #[test]
    fn test_unknown_edge_endpoints_are_ignored() {
        let order = topological_sort([1, 2], [(9, 1)]).unwrap();
        assert_eq!(order, vec![1, 2]);
    }
}
