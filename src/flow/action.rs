//! Named units of work
//!
//! An [`Action`] pairs an identity with a body. Identity alone decides
//! equality; bodies are only compared to detect two different definitions
//! claiming the same name. A body with no captures (a `fn` item or a
//! captureless closure) is identified by its type, anything else by its
//! allocation.

use std::any::TypeId;
use std::fmt;
use std::mem;
use std::sync::Arc;

/// Shared, thread-safe action body
pub type Body<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// A named, invocable unit of work.
///
/// `A` is the extra-argument set threaded to every action of a flow; most
/// flows use the default `()`. Cloning is cheap and keeps the same body, so a
/// clone of an action is always the same definition.
pub struct Action<A = ()> {
    name: Arc<str>,
    body: Body<A>,
    /// Type of a zero-sized body; equal types run identical code
    definition: Option<TypeId>,
    milestone: bool,
}

fn zero_sized_type<F: 'static>() -> Option<TypeId> {
    (mem::size_of::<F>() == 0).then(TypeId::of::<F>)
}

impl Action<()> {
    /// Create an action from a zero-argument body
    pub fn new<N, F>(name: N, body: F) -> Self
    where
        N: Into<Arc<str>>,
        F: Fn() + Send + Sync + 'static,
    {
        let definition = zero_sized_type::<F>();
        let body: Body<()> = Arc::new(move |_: &()| body());
        Self {
            name: name.into(),
            body,
            definition,
            milestone: false,
        }
    }
}

impl<A> Action<A> {
    /// Create an action whose body receives the flow's extra arguments
    pub fn with_args<N, F>(name: N, body: F) -> Self
    where
        N: Into<Arc<str>>,
        F: Fn(&A) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            body: Arc::new(body),
            definition: zero_sized_type::<F>(),
            milestone: false,
        }
    }

    /// An ordering anchor with an empty body.
    ///
    /// Milestones with the same name are always the same definition, no
    /// matter where they are declared.
    pub fn milestone<N: Into<Arc<str>>>(name: N) -> Self {
        Self {
            name: name.into(),
            body: Arc::new(|_: &A| {}),
            definition: None,
            milestone: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_milestone(&self) -> bool {
        self.milestone
    }

    /// True when both carry the same body (or are both milestones)
    pub fn same_definition(&self, other: &Self) -> bool {
        if self.milestone || other.milestone {
            return self.milestone && other.milestone;
        }
        if let (Some(ours), Some(theirs)) = (self.definition, other.definition) {
            return ours == theirs;
        }
        // Data pointers only; vtable addresses are not stable across codegen units.
        std::ptr::eq(
            Arc::as_ptr(&self.body) as *const (),
            Arc::as_ptr(&other.body) as *const (),
        )
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub(crate) fn body(&self) -> Body<A> {
        Arc::clone(&self.body)
    }
}

impl<A> Clone for Action<A> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            body: Arc::clone(&self.body),
            definition: self.definition,
            milestone: self.milestone,
        }
    }
}

impl<A> PartialEq for Action<A> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<A> Eq for Action<A> {}

impl<A> fmt::Debug for Action<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("milestone", &self.milestone)
            .finish()
    }
}
