//! Construction-time verification of an assembled machine.
//!
//! The state tree is loaded into a graph whose edges are the ways a state
//! can become active: default entry of children, transition targets, and
//! activation of ancestors. Unresolved references are generator defects.

use std::collections::HashMap;

use form_fsm_core::StatePath;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;

use crate::error::GenerateError;
use crate::ir::{MachineDescription, StateKind};
use crate::tables::MachineOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Entry,
    Ancestor,
    Transition,
}

pub fn verify(
    description: &MachineDescription,
    options: &MachineOptions,
) -> Result<(), GenerateError> {
    let nodes = description.nodes();

    let mut graph = DiGraph::<StatePath, Edge>::new();
    let mut transient = DiGraph::<StatePath, ()>::new();
    let mut index: HashMap<StatePath, NodeIndex> = HashMap::new();
    for (path, _) in &nodes {
        let idx = graph.add_node(path.clone());
        transient.add_node(path.clone());
        index.insert(path.clone(), idx);
    }

    for (idx, (path, node)) in nodes.iter().enumerate() {
        let from = NodeIndex::new(idx);

        for child in &node.states {
            let Some(&to) = index.get(&path.child(child.key.clone())) else {
                continue;
            };
            graph.add_edge(to, from, Edge::Ancestor);
            let entered_by_default = match node.kind {
                StateKind::Parallel => true,
                _ => node.initial.as_deref() == Some(child.key.as_str()),
            };
            if entered_by_default {
                graph.add_edge(from, to, Edge::Entry);
            }
        }

        for transition in node.transitions() {
            for action in &transition.actions {
                if options.action(action).is_none() {
                    return Err(GenerateError::UnresolvedAction(action.clone()));
                }
            }
            if let Some(guard) = &transition.guard {
                if options.guard(guard).is_none() {
                    return Err(GenerateError::UnresolvedGuard(guard.clone()));
                }
            }
            for target in &transition.targets {
                let to = *index.get(target).ok_or_else(|| GenerateError::UnresolvedTarget {
                    from: path.clone(),
                    target: target.clone(),
                })?;
                graph.add_edge(from, to, Edge::Transition);
            }
        }

        for target in node.always.iter().flat_map(|t| t.targets.iter()) {
            if let Some(&to) = index.get(target) {
                transient.add_edge(from, to, ());
            }
        }
    }

    if let Err(cycle) = toposort(&transient, None) {
        return Err(GenerateError::TransientCycle(transient[cycle.node_id()].clone()));
    }

    let mut reached = vec![false; graph.node_count()];
    let mut dfs = Dfs::new(&graph, NodeIndex::new(0));
    while let Some(idx) = dfs.next(&graph) {
        reached[idx.index()] = true;
    }
    for idx in graph.node_indices().filter(|idx| !reached[idx.index()]) {
        tracing::warn!(state = %graph[idx], "state is unreachable");
    }

    let referenced = description.referenced_actions();
    for id in options.actions.keys().filter(|id| !referenced.contains(*id)) {
        tracing::warn!(action = %id, "action is never referenced");
    }
    let referenced = description.referenced_guards();
    for id in options.guards.keys().filter(|id| !referenced.contains(*id)) {
        tracing::warn!(guard = %id, "guard is never referenced");
    }

    let transitions = graph
        .edge_weights()
        .filter(|edge| **edge == Edge::Transition)
        .count();
    tracing::debug!(
        states = graph.node_count(),
        transitions,
        "verified form machine"
    );
    Ok(())
}
