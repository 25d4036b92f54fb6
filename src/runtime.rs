//! Synchronous interpreter for generated form machines.
//!
//! Supports exactly what the generator emits: compound, parallel and final
//! states, guarded event transitions, transient (`always`) transitions and a
//! single invoked service. Each [`Interpreter::send`] is one macrostep:
//!
//! 1. every active state selects its first enabled transition for the event,
//!    with guards evaluated against the context as it was before the event;
//! 2. selected transitions fire deepest source first, and a transition whose
//!    source was exited by an earlier one is skipped;
//! 3. transient transitions are taken until none is enabled.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use form_fsm_core::{ActionId, Event, EventType, FormContext, GuardId, StatePath, UnknownField};
use form_fsm_gen::{
    FormMachine, InvokeDef, MachineOptions, SUBMIT_SERVICE, StateKind, SubmitFuture, TransitionDef,
};

/// Upper bound on transient steps within one macrostep.
pub const MAX_TRANSIENT_STEPS: usize = 64;

const ROOT: usize = 0;

/// Errors raised while interpreting a machine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("state `{0}` is not declared")]
    UnknownState(StatePath),

    #[error("action `{0}` has no implementation")]
    UnknownAction(ActionId),

    #[error("guard `{0}` has no implementation")]
    UnknownGuard(GuardId),

    #[error(transparent)]
    Context(#[from] UnknownField),

    #[error("transient transitions did not settle within {limit} steps")]
    TransientLoop { limit: usize },

    #[error("service `{0}` has no implementation")]
    UnknownService(String),
}

/// What a sent event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// At least one transition fired.
    Transitioned,
    /// No active state handles the event, or the machine is done.
    Ignored,
}

/// A service the machine wants started.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRequest {
    pub src: String,
    pub context: FormContext,
    /// The event whose macrostep entered the invoking state.
    pub event: Event,
}

/// Active leaf states and context at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct FormSnapshot {
    pub states: Vec<StatePath>,
    pub context: FormContext,
    pub done: bool,
}

impl FormSnapshot {
    /// True when the state at `path` (`draft.email.valid`) is active.
    pub fn matches(&self, path: &str) -> bool {
        let path = StatePath::parse(path);
        self.states.iter().any(|state| path.contains(state))
    }
}

struct Node {
    path: StatePath,
    kind: StateKind,
    parent: Option<usize>,
    children: Vec<usize>,
    initial: Option<usize>,
    on: BTreeMap<EventType, Vec<TransitionDef>>,
    always: Vec<TransitionDef>,
    invoke: Option<InvokeDef>,
}

/// Executes one [`FormMachine`].
pub struct Interpreter {
    nodes: Vec<Node>,
    index: HashMap<StatePath, usize>,
    options: MachineOptions,
    active: BTreeSet<usize>,
    context: FormContext,
    invoking: Option<usize>,
    pending: Option<(String, Event)>,
    done: bool,
}

impl Interpreter {
    /// Starts the machine in its initial configuration.
    pub fn new(machine: &FormMachine) -> Result<Self, RuntimeError> {
        let entries = machine.description.nodes();
        let index: HashMap<StatePath, usize> = entries
            .iter()
            .enumerate()
            .map(|(i, (path, _))| (path.clone(), i))
            .collect();

        let nodes = entries
            .iter()
            .map(|(path, node)| {
                let parent = path.parent().map(|p| lookup(&index, &p)).transpose()?;
                let children = node
                    .states
                    .iter()
                    .map(|child| lookup(&index, &path.child(child.key.clone())))
                    .collect::<Result<Vec<_>, _>>()?;
                let initial = node
                    .initial
                    .as_ref()
                    .map(|key| lookup(&index, &path.child(key.clone())))
                    .transpose()?;
                Ok::<_, RuntimeError>(Node {
                    path: path.clone(),
                    kind: node.kind,
                    parent,
                    children,
                    initial,
                    on: node.on.clone(),
                    always: node.always.clone(),
                    invoke: node.invoke.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut interpreter = Self {
            nodes,
            index,
            options: machine.options.clone(),
            active: BTreeSet::new(),
            context: machine.description.context.clone(),
            invoking: None,
            pending: None,
            done: false,
        };

        let mut entering = BTreeSet::from([ROOT]);
        interpreter.complete(&mut entering);
        interpreter.active = entering;
        tracing::debug!(
            machine = machine.id(),
            states = ?interpreter.active_states(),
            "form machine started"
        );
        Ok(interpreter)
    }

    /// Processes one event as a full macrostep.
    pub fn send(&mut self, event: &Event) -> Result<Outcome, RuntimeError> {
        if self.done {
            tracing::debug!(?event, "machine is done, event ignored");
            return Ok(Outcome::Ignored);
        }

        let selected = self.select(event)?;
        if selected.is_empty() {
            tracing::debug!(?event, "no transition enabled, event ignored");
            return Ok(Outcome::Ignored);
        }

        self.microstep(selected, event)?;
        self.settle(event)?;
        Ok(Outcome::Transitioned)
    }

    /// True when the state at `path` is active. The empty path is the root.
    pub fn matches(&self, path: &str) -> bool {
        self.index
            .get(&StatePath::parse(path))
            .is_some_and(|idx| self.active.contains(idx))
    }

    /// Active atomic and final states in document order.
    pub fn active_states(&self) -> Vec<StatePath> {
        self.active
            .iter()
            .map(|&idx| &self.nodes[idx])
            .filter(|node| matches!(node.kind, StateKind::Atomic | StateKind::Final))
            .map(|node| node.path.clone())
            .collect()
    }

    pub fn context(&self) -> &FormContext {
        &self.context
    }

    pub fn into_context(self) -> FormContext {
        self.context
    }

    /// True once a top-level final state is active.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Path of the active state running a service, if any.
    pub fn invoking(&self) -> Option<&StatePath> {
        self.invoking.map(|idx| &self.nodes[idx].path)
    }

    /// Takes the request raised by entering an invoking state.
    ///
    /// The context is the one at the end of the macrostep that entered it.
    pub fn take_service_request(&mut self) -> Option<ServiceRequest> {
        self.pending.take().map(|(src, event)| ServiceRequest {
            src,
            context: self.context.clone(),
            event,
        })
    }

    /// Takes the pending request and starts the matching service.
    pub fn start_service(&mut self) -> Result<Option<SubmitFuture>, RuntimeError> {
        let Some(request) = self.take_service_request() else {
            return Ok(None);
        };
        if request.src != SUBMIT_SERVICE {
            return Err(RuntimeError::UnknownService(request.src));
        }
        tracing::debug!(service = %request.src, "starting service");
        Ok(Some((self.options.submit)(request.context, request.event)))
    }

    pub fn snapshot(&self) -> FormSnapshot {
        FormSnapshot {
            states: self.active_states(),
            context: self.context.clone(),
            done: self.done,
        }
    }

    fn select(&self, event: &Event) -> Result<Vec<(usize, TransitionDef)>, RuntimeError> {
        let event_type = event.event_type();
        let mut selected = Vec::new();

        for &idx in &self.active {
            let node = &self.nodes[idx];
            let candidates: &[TransitionDef] = match (event, &node.invoke) {
                (Event::SubmitDone(_), Some(invoke)) => std::slice::from_ref(&invoke.on_done),
                (Event::SubmitError(_), Some(invoke)) => std::slice::from_ref(&invoke.on_error),
                _ => event_type
                    .as_ref()
                    .and_then(|ty| node.on.get(ty))
                    .map(Vec::as_slice)
                    .unwrap_or_default(),
            };
            if let Some(transition) = self.first_enabled(candidates, event)? {
                selected.push((idx, transition.clone()));
            }
        }
        Ok(selected)
    }

    fn select_always(&self, event: &Event) -> Result<Vec<(usize, TransitionDef)>, RuntimeError> {
        let mut selected = Vec::new();
        for &idx in &self.active {
            if let Some(transition) = self.first_enabled(&self.nodes[idx].always, event)? {
                selected.push((idx, transition.clone()));
            }
        }
        Ok(selected)
    }

    fn first_enabled<'a>(
        &self,
        candidates: &'a [TransitionDef],
        event: &Event,
    ) -> Result<Option<&'a TransitionDef>, RuntimeError> {
        for transition in candidates {
            let enabled = match &transition.guard {
                None => true,
                Some(id) => {
                    let guard = self
                        .options
                        .guard(id)
                        .ok_or_else(|| RuntimeError::UnknownGuard(id.clone()))?;
                    guard(&self.context, event)
                }
            };
            if enabled {
                return Ok(Some(transition));
            }
        }
        Ok(None)
    }

    fn settle(&mut self, event: &Event) -> Result<(), RuntimeError> {
        for _ in 0..MAX_TRANSIENT_STEPS {
            let selected = self.select_always(event)?;
            if selected.is_empty() {
                return Ok(());
            }
            self.microstep(selected, event)?;
        }
        if self.select_always(event)?.is_empty() {
            Ok(())
        } else {
            Err(RuntimeError::TransientLoop {
                limit: MAX_TRANSIENT_STEPS,
            })
        }
    }

    fn microstep(
        &mut self,
        mut selected: Vec<(usize, TransitionDef)>,
        event: &Event,
    ) -> Result<(), RuntimeError> {
        selected.sort_by_key(|(idx, _)| Reverse(self.nodes[*idx].path.depth()));
        for (source, transition) in selected {
            if !self.active.contains(&source) {
                tracing::trace!(
                    source = %self.nodes[source].path,
                    "source exited, transition skipped"
                );
                continue;
            }
            self.fire(source, &transition, event)?;
        }
        Ok(())
    }

    fn fire(
        &mut self,
        source: usize,
        transition: &TransitionDef,
        event: &Event,
    ) -> Result<(), RuntimeError> {
        let targets = transition
            .targets
            .iter()
            .map(|target| lookup(&self.index, target))
            .collect::<Result<Vec<_>, _>>()?;
        let domain = (!targets.is_empty()).then(|| self.domain(source, &targets));

        if let Some(domain) = domain {
            self.exit_below(domain);
        }
        for action in &transition.actions {
            let implementation = self
                .options
                .action(action)
                .ok_or_else(|| RuntimeError::UnknownAction(action.clone()))?;
            let patch = implementation(&self.context, event);
            self.context.apply(patch)?;
        }
        if let Some(domain) = domain {
            self.enter_below(domain, &targets, event);
        }

        tracing::trace!(
            source = %self.nodes[source].path,
            targets = ?transition.targets,
            actions = ?transition.actions,
            "transition fired"
        );
        Ok(())
    }

    /// The state whose active descendants a transition replaces.
    ///
    /// Starts at the longest common prefix of source and targets and walks up
    /// while it is a target itself or a parallel state other than the source.
    fn domain(&self, source: usize, targets: &[usize]) -> usize {
        let prefix = targets
            .iter()
            .fold(self.nodes[source].path.clone(), |prefix, &target| {
                prefix.common_prefix(&self.nodes[target].path)
            });
        let mut domain = self.index.get(&prefix).copied().unwrap_or(ROOT);

        while let Some(parent) = self.nodes[domain].parent {
            let is_target = targets.contains(&domain);
            let is_foreign_parallel =
                domain != source && self.nodes[domain].kind == StateKind::Parallel;
            if !is_target && !is_foreign_parallel {
                break;
            }
            domain = parent;
        }
        domain
    }

    fn exit_below(&mut self, domain: usize) {
        let domain_path = &self.nodes[domain].path;
        let exiting: Vec<usize> = self
            .active
            .iter()
            .copied()
            .filter(|&idx| idx != domain && domain_path.contains(&self.nodes[idx].path))
            .collect();

        // Reverse document order exits children before their parents.
        for idx in exiting.into_iter().rev() {
            self.active.remove(&idx);
            if self.invoking == Some(idx) {
                tracing::debug!(state = %self.nodes[idx].path, "service cancelled");
                self.invoking = None;
                self.pending = None;
            }
        }
    }

    fn enter_below(&mut self, domain: usize, targets: &[usize], event: &Event) {
        let mut entering = BTreeSet::new();
        for &target in targets {
            let mut current = Some(target);
            while let Some(idx) = current.filter(|&idx| idx != domain) {
                entering.insert(idx);
                current = self.nodes[idx].parent;
            }
        }
        self.complete(&mut entering);

        for idx in entering {
            self.active.insert(idx);
            let node = &self.nodes[idx];
            if let Some(invoke) = &node.invoke {
                self.invoking = Some(idx);
                self.pending = Some((invoke.src.clone(), event.clone()));
            }
            if node.kind == StateKind::Final && node.parent == Some(ROOT) {
                self.done = true;
            }
        }
    }

    /// Adds default descendants: the initial child of every compound state
    /// with no entered child, and every child of a parallel state.
    fn complete(&self, entering: &mut BTreeSet<usize>) {
        let mut stack: Vec<usize> = entering.iter().copied().collect();
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            match node.kind {
                StateKind::Compound => {
                    if !node.children.iter().any(|child| entering.contains(child)) {
                        if let Some(initial) = node.initial {
                            entering.insert(initial);
                            stack.push(initial);
                        }
                    }
                }
                StateKind::Parallel => {
                    for &child in &node.children {
                        if entering.insert(child) {
                            stack.push(child);
                        }
                    }
                }
                StateKind::Atomic | StateKind::Final => {}
            }
        }
    }
}

fn lookup(index: &HashMap<StatePath, usize>, path: &StatePath) -> Result<usize, RuntimeError> {
    index
        .get(path)
        .copied()
        .ok_or_else(|| RuntimeError::UnknownState(path.clone()))
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("states", &self.active_states())
            .field("context", &self.context)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}
