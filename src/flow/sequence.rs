//! Compiled sequence: the only artifact that outlives compilation

use std::fmt;
use std::sync::Arc;
use tracing::trace;

use crate::flow::action::{Action, Body};

/// One compiled action: its identity (for diagnostics) and its body
pub struct Step<A = ()> {
    name: Arc<str>,
    body: Body<A>,
}

impl<A> Step<A> {
    pub(crate) fn from_action(action: &Action<A>) -> Self {
        Self {
            name: action.shared_name(),
            body: action.body(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<A> Clone for Step<A> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            body: Arc::clone(&self.body),
        }
    }
}

/// Immutable, ordered list of action bodies.
///
/// Carries no dependency information: invoking it walks a fixed array and
/// calls every body exactly once, in order. Safe to invoke repeatedly and
/// from any thread; re-entrancy protection is the caller's job.
pub struct CompiledSequence<A = ()> {
    flow: Arc<str>,
    steps: Arc<[Step<A>]>,
    trace_steps: bool,
}

impl<A> CompiledSequence<A> {
    pub(crate) fn new(flow: &str, steps: Vec<Step<A>>, trace_steps: bool) -> Self {
        Self {
            flow: Arc::from(flow),
            steps: steps.into(),
            trace_steps,
        }
    }

    /// Run every step in compiled order
    pub fn run(&self, args: &A) {
        if self.trace_steps {
            self.run_traced(args);
            return;
        }
        for step in self.steps.iter() {
            (step.body)(args);
        }
    }

    fn run_traced(&self, args: &A) {
        trace!(flow = %self.flow, steps = self.steps.len(), "flow start");
        for step in self.steps.iter() {
            trace!(flow = %self.flow, step = %step.name, "flow step");
            (step.body)(args);
        }
        trace!(flow = %self.flow, "flow end");
    }

    pub fn flow(&self) -> &str {
        &self.flow
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Step<A>] {
        &self.steps
    }

    /// Identities in execution order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(Step::name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names().position(|n| n == name)
    }

    /// Consume into a plain callable for a dispatcher to store
    pub fn into_fn(self) -> impl Fn(&A) + Send + Sync {
        move |args: &A| self.run(args)
    }
}

impl CompiledSequence<()> {
    /// Run a zero-argument flow
    pub fn call(&self) {
        self.run(&())
    }
}

impl<A> Clone for CompiledSequence<A> {
    fn clone(&self) -> Self {
        Self {
            flow: Arc::clone(&self.flow),
            steps: Arc::clone(&self.steps),
            trace_steps: self.trace_steps,
        }
    }
}

impl<A> fmt::Debug for CompiledSequence<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSequence")
            .field("flow", &self.flow)
            .field("steps", &self.names().collect::<Vec<_>>())
            .finish()
    }
}
