//! Execution order of the children of a system.
//!
//! All C components run first, then all Q, then all S, each class in
//! declaration order. Signal components are additionally sorted so that a
//! writer runs before every reader of the same node (Kahn's algorithm, ties
//! broken by declaration order). When signals form a loop the remaining
//! components keep their declaration order and the loop is reported.

use crate::component::CqsType;
use std::collections::{BTreeSet, HashSet};
use tlm_core::{CompId, NodeId};

/// What ordering needs to know about one child.
#[derive(Debug, Clone)]
pub(crate) struct ChildInfo {
    pub id: CompId,
    pub cqs: CqsType,
    pub is_system: bool,
    /// Every node the child's ports are bound to.
    pub nodes: Vec<NodeId>,
    pub writes: Vec<NodeId>,
    pub reads: Vec<NodeId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ExecutionOrder {
    /// Each pass is stepped in sequence; members of a multi-entry pass are
    /// independent subsystems that may be stepped concurrently.
    pub passes: Vec<Vec<CompId>>,
    /// Signal components caught in a loop, in the order they will run.
    pub algebraic_loop: Vec<CompId>,
}

impl ExecutionOrder {
    pub fn flat(&self) -> impl Iterator<Item = CompId> + '_ {
        self.passes.iter().flatten().copied()
    }
}

pub(crate) fn execution_order(children: &[ChildInfo], parallel: bool) -> ExecutionOrder {
    let of = |cqs: CqsType| -> Vec<usize> {
        children
            .iter()
            .enumerate()
            .filter(|(_, c)| c.cqs == cqs)
            .map(|(i, _)| i)
            .collect()
    };
    let c = of(CqsType::C);
    let q = of(CqsType::Q);
    let (s, algebraic_loop) = sort_signals(children, &of(CqsType::S));

    let mut passes = Vec::new();
    for class in [c, q, s] {
        group(children, &class, parallel, &mut passes);
    }

    ExecutionOrder {
        passes,
        algebraic_loop: algebraic_loop.into_iter().map(|i| children[i].id).collect(),
    }
}

/// Topological order of the S children (given as indices into `children`).
fn sort_signals(children: &[ChildInfo], s: &[usize]) -> (Vec<usize>, Vec<usize>) {
    let mut edges: BTreeSet<(usize, usize)> = BTreeSet::new();
    for &w in s {
        for &r in s {
            if w != r
                && children[w]
                    .writes
                    .iter()
                    .any(|n| children[r].reads.contains(n))
            {
                edges.insert((w, r));
            }
        }
    }

    let mut in_degree: Vec<usize> = vec![0; children.len()];
    for &(_, r) in &edges {
        in_degree[r] += 1;
    }

    let mut ready: BTreeSet<usize> = s.iter().copied().filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(s.len());
    while let Some(i) = ready.pop_first() {
        order.push(i);
        for &(_, r) in edges.range((i, 0)..=(i, usize::MAX)) {
            in_degree[r] -= 1;
            if in_degree[r] == 0 {
                ready.insert(r);
            }
        }
    }

    let placed: HashSet<usize> = order.iter().copied().collect();
    let stuck: Vec<usize> = s.iter().copied().filter(|i| !placed.contains(i)).collect();
    order.extend(stuck.iter().copied());
    (order, stuck)
}

fn group(children: &[ChildInfo], class: &[usize], parallel: bool, passes: &mut Vec<Vec<CompId>>) {
    let mut current: Vec<usize> = Vec::new();
    let mut used: HashSet<NodeId> = HashSet::new();

    for &i in class {
        let child = &children[i];
        let joins = parallel
            && child.is_system
            && !current.is_empty()
            && current.iter().all(|&j| children[j].is_system)
            && child.nodes.iter().all(|n| !used.contains(n));
        if !joins && !current.is_empty() {
            passes.push(current.iter().map(|&j| children[j].id).collect());
            current.clear();
            used.clear();
        }
        current.push(i);
        used.extend(child.nodes.iter().copied());
    }
    if !current.is_empty() {
        passes.push(current.iter().map(|&j| children[j].id).collect());
    }
}
