//! Machine description: the generated state tree and its JSON form.
//!
//! Nodes reference actions and guards by typed id only; the behaviour lives
//! in [`MachineOptions`](crate::MachineOptions).

use std::collections::{BTreeMap, BTreeSet};

use form_fsm_core::{ActionId, EventType, FormContext, GuardId, StatePath};
use serde::ser::{Serialize, Serializer};

/// Shape of a state node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StateKind {
    Atomic,
    Compound,
    Parallel,
    Final,
}

/// One candidate transition. An empty target list means the transition only
/// runs its actions.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TransitionDef {
    #[serde(rename = "target", skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<StatePath>,
    #[serde(rename = "cond", skip_serializing_if = "Option::is_none")]
    pub guard: Option<GuardId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionId>,
}

impl TransitionDef {
    pub fn to(target: StatePath) -> Self {
        Self::to_all(vec![target])
    }

    /// A transition entering several states at once, one per parallel region.
    pub fn to_all(targets: Vec<StatePath>) -> Self {
        Self {
            targets,
            guard: None,
            actions: Vec::new(),
        }
    }

    pub fn guarded(mut self, guard: GuardId) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn action(mut self, action: ActionId) -> Self {
        self.actions.push(action);
        self
    }
}

/// An asynchronous service run while its state is active.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct InvokeDef {
    pub src: String,
    #[serde(rename = "onDone")]
    pub on_done: TransitionDef,
    #[serde(rename = "onError")]
    pub on_error: TransitionDef,
}

/// A node of the generated state tree.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StateNode {
    #[serde(skip)]
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: StateKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", serialize_with = "serialize_children")]
    pub states: Vec<StateNode>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub on: BTreeMap<EventType, Vec<TransitionDef>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub always: Vec<TransitionDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoke: Option<InvokeDef>,
}

impl StateNode {
    fn with_kind(key: impl Into<String>, kind: StateKind) -> Self {
        Self {
            key: key.into(),
            id: None,
            kind,
            initial: None,
            states: Vec::new(),
            on: BTreeMap::new(),
            always: Vec::new(),
            invoke: None,
        }
    }

    pub fn atomic(key: impl Into<String>) -> Self {
        Self::with_kind(key, StateKind::Atomic)
    }

    pub fn final_state(key: impl Into<String>) -> Self {
        Self::with_kind(key, StateKind::Final)
    }

    /// A compound state; without children it degrades to an atomic one.
    pub fn compound(key: impl Into<String>, states: Vec<StateNode>) -> Self {
        let initial = states.first().map(|s| s.key.clone());
        Self::compound_with_initial(key, initial, states)
    }

    pub fn compound_with_initial(
        key: impl Into<String>,
        initial: Option<String>,
        states: Vec<StateNode>,
    ) -> Self {
        let kind = if states.is_empty() {
            StateKind::Atomic
        } else {
            StateKind::Compound
        };
        let mut node = Self::with_kind(key, kind);
        node.initial = initial.filter(|_| !states.is_empty());
        node.states = states;
        node
    }

    pub fn parallel(key: impl Into<String>, states: Vec<StateNode>) -> Self {
        let mut node = Self::with_kind(key, StateKind::Parallel);
        node.states = states;
        node
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn on(mut self, event: EventType, transitions: Vec<TransitionDef>) -> Self {
        if !transitions.is_empty() {
            self.on.insert(event, transitions);
        }
        self
    }

    pub fn always(mut self, transitions: Vec<TransitionDef>) -> Self {
        self.always = transitions;
        self
    }

    pub fn invoke(mut self, invoke: InvokeDef) -> Self {
        self.invoke = Some(invoke);
        self
    }

    pub fn child(&self, key: &str) -> Option<&StateNode> {
        self.states.iter().find(|s| s.key == key)
    }

    /// Every transition declared directly on this node.
    pub fn transitions(&self) -> impl Iterator<Item = &TransitionDef> {
        self.on
            .values()
            .flatten()
            .chain(self.always.iter())
            .chain(
                self.invoke
                    .iter()
                    .flat_map(|invoke| [&invoke.on_done, &invoke.on_error]),
            )
    }
}

#[allow(clippy::ptr_arg)]
fn serialize_children<S: Serializer>(
    states: &Vec<StateNode>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(states.iter().map(|state| (&state.key, state)))
}

/// The generated machine: a state tree rooted at the form plus the initial
/// context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineDescription {
    pub root: StateNode,
    pub context: FormContext,
}

impl MachineDescription {
    pub fn id(&self) -> &str {
        &self.root.key
    }

    /// Looks a state up by absolute path.
    pub fn state(&self, path: &StatePath) -> Option<&StateNode> {
        path.segments()
            .iter()
            .try_fold(&self.root, |node, key| node.child(key))
    }

    /// Every node with its absolute path, in document order, root first.
    pub fn nodes(&self) -> Vec<(StatePath, &StateNode)> {
        let mut out = Vec::new();
        collect(&self.root, StatePath::root(), &mut out);
        out
    }

    pub fn referenced_actions(&self) -> BTreeSet<ActionId> {
        self.nodes()
            .into_iter()
            .flat_map(|(_, node)| {
                node.transitions()
                    .flat_map(|t| t.actions.iter().cloned())
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn referenced_guards(&self) -> BTreeSet<GuardId> {
        self.nodes()
            .into_iter()
            .flat_map(|(_, node)| {
                node.transitions()
                    .filter_map(|t| t.guard.clone())
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

fn collect<'a>(node: &'a StateNode, path: StatePath, out: &mut Vec<(StatePath, &'a StateNode)>) {
    out.push((path.clone(), node));
    for child in &node.states {
        collect(child, path.child(child.key.clone()), out);
    }
}

impl Serialize for MachineDescription {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let root = &self.root;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", root.key.as_str())?;
        if let Some(initial) = &root.initial {
            map.serialize_entry("initial", initial)?;
        }
        map.serialize_entry("context", &self.context)?;
        map.serialize_entry("states", &Children(&root.states))?;
        map.end()
    }
}

struct Children<'a>(&'a [StateNode]);

impl Serialize for Children<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|state| (&state.key, state)))
    }
}
