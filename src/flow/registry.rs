//! Action registry: identity -> arena slot

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::config::DuplicatePolicy;
use crate::core::errors::{FlowError, Result};
use crate::flow::action::Action;

/// Index of an identity inside one registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionRef(u32);

impl ActionRef {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An identity known to the registry. `action` stays `None` while the name
/// has only been mentioned (by a reference or a by-name edge).
struct Slot<A> {
    name: Arc<str>,
    action: Option<Action<A>>,
}

/// Deduplicating registry of actions for one flow
pub struct ActionRegistry<A = ()> {
    flow: Arc<str>,
    policy: DuplicatePolicy,
    slots: Vec<Slot<A>>,
    index: HashMap<Arc<str>, ActionRef>,
    registered: usize,
}

impl<A> ActionRegistry<A> {
    pub fn new<F: Into<Arc<str>>>(flow: F, policy: DuplicatePolicy) -> Self {
        Self {
            flow: flow.into(),
            policy,
            slots: Vec::new(),
            index: HashMap::new(),
            registered: 0,
        }
    }

    pub fn flow(&self) -> &str {
        &self.flow
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Register an action, returning the slot for its identity.
    ///
    /// Registering the same definition again is a no-op. A different body
    /// under a known identity is rejected or ignored depending on the
    /// registry's [`DuplicatePolicy`].
    pub fn register(&mut self, action: Action<A>) -> Result<ActionRef> {
        let action_ref = self.intern(action.name());
        let slot = &mut self.slots[action_ref.index()];

        let Some(existing) = &slot.action else {
            debug!("Registered action {} in flow {}", action.name(), self.flow);
            slot.action = Some(action);
            self.registered += 1;
            return Ok(action_ref);
        };

        if !existing.same_definition(&action) {
            match self.policy {
                DuplicatePolicy::Reject => {
                    return Err(FlowError::duplicate(self.flow.as_ref(), action.name()));
                }
                DuplicatePolicy::FirstWins => {
                    warn!(
                        "Action {} in flow {} defined twice, keeping the first definition",
                        action.name(),
                        self.flow
                    );
                }
            }
        }

        Ok(action_ref)
    }

    /// Fail if registering `action` would be rejected as a conflicting duplicate
    pub fn check(&self, action: &Action<A>) -> Result<()> {
        match self.get(action.name()).and_then(|r| self.action(r)) {
            Some(existing)
                if self.policy == DuplicatePolicy::Reject && !existing.same_definition(action) =>
            {
                Err(FlowError::duplicate(self.flow.as_ref(), action.name()))
            }
            _ => Ok(()),
        }
    }

    /// Slot for an identity, creating an unregistered one if needed
    pub fn intern(&mut self, name: &str) -> ActionRef {
        if let Some(existing) = self.index.get(name) {
            return *existing;
        }
        let action_ref = ActionRef(self.slots.len() as u32);
        let name: Arc<str> = Arc::from(name);
        self.slots.push(Slot {
            name: Arc::clone(&name),
            action: None,
        });
        self.index.insert(name, action_ref);
        action_ref
    }

    pub fn get(&self, name: &str) -> Option<ActionRef> {
        self.index.get(name).copied()
    }

    pub fn name(&self, action_ref: ActionRef) -> &str {
        &self.slots[action_ref.index()].name
    }

    pub fn action(&self, action_ref: ActionRef) -> Option<&Action<A>> {
        self.slots
            .get(action_ref.index())
            .and_then(|slot| slot.action.as_ref())
    }

    pub fn is_registered(&self, action_ref: ActionRef) -> bool {
        self.action(action_ref).is_some()
    }

    /// Number of registered (not merely mentioned) actions
    pub fn len(&self) -> usize {
        self.registered
    }

    pub fn is_empty(&self) -> bool {
        self.registered == 0
    }

    /// Registered actions in slot order
    pub fn iter(&self) -> impl Iterator<Item = (ActionRef, &Action<A>)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.action
                .as_ref()
                .map(|action| (ActionRef(i as u32), action))
        })
    }

    /// Identities that were mentioned but never registered
    pub fn unregistered(&self) -> impl Iterator<Item = &str> {
        self.slots
            .iter()
            .filter(|slot| slot.action.is_none())
            .map(|slot| slot.name.as_ref())
    }
}
