//! Declarative contributions
//!
//! `a >> b >> c` orders actions, `a & b` groups them without ordering, and
//! `a.reference()` names an action without including it:
//!
//! ```
//! use flowseq::{Action, Graph};
//!
//! let power = Action::new("power", || {});
//! let clocks = Action::new("clocks", || {});
//! let uart = Action::new("uart", || {});
//! let spi = Action::new("spi", || {});
//!
//! let mut graph = Graph::new("init");
//! graph.add(&power >> &clocks >> (&uart & &spi)).unwrap();
//! assert_eq!(graph.node_count(), 4);
//! assert_eq!(graph.edge_count(), 3);
//! ```

use std::ops::{BitAnd, Shr};

use crate::flow::action::Action;

/// Whether a fragment member adds its action to the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Include,
    /// Only used as an ordering anchor; the action must be included elsewhere
    Reference,
}

/// A partial graph produced at one declaration site
#[derive(Debug)]
pub struct Fragment<A = ()> {
    members: Vec<(Action<A>, Mode)>,
    edges: Vec<(usize, usize)>,
    heads: Vec<usize>,
    tails: Vec<usize>,
}

impl<A> Fragment<A> {
    fn single(action: Action<A>, mode: Mode) -> Self {
        Self {
            members: vec![(action, mode)],
            edges: Vec::new(),
            heads: vec![0],
            tails: vec![0],
        }
    }

    /// Fragment with no members; a no-op contribution
    pub fn empty() -> Self {
        Self {
            members: Vec::new(),
            edges: Vec::new(),
            heads: Vec::new(),
            tails: Vec::new(),
        }
    }

    /// Append `other`, shifting its indices past ours
    fn absorb(&mut self, other: Fragment<A>) -> (Vec<usize>, Vec<usize>) {
        let offset = self.members.len();
        self.members.extend(other.members);
        self.edges
            .extend(other.edges.into_iter().map(|(f, t)| (f + offset, t + offset)));
        (
            other.heads.into_iter().map(|i| i + offset).collect(),
            other.tails.into_iter().map(|i| i + offset).collect(),
        )
    }

    /// Order every tail of `self` before every head of `next`
    pub fn then<R: Into<Fragment<A>>>(mut self, next: R) -> Self {
        let next = next.into();
        if next.members.is_empty() {
            return self;
        }
        if self.members.is_empty() {
            return next;
        }
        let (heads, tails) = self.absorb(next);
        for &from in &self.tails {
            for &to in &heads {
                self.edges.push((from, to));
            }
        }
        self.tails = tails;
        self
    }

    /// Group `other` alongside `self` with no ordering between them
    pub fn with<R: Into<Fragment<A>>>(mut self, other: R) -> Self {
        let (heads, tails) = self.absorb(other.into());
        self.heads.extend(heads);
        self.tails.extend(tails);
        self
    }

    pub fn members(&self) -> impl Iterator<Item = (&Action<A>, Mode)> {
        self.members.iter().map(|(action, mode)| (action, *mode))
    }

    pub(crate) fn into_parts(self) -> (Vec<(Action<A>, Mode)>, Vec<(usize, usize)>) {
        (self.members, self.edges)
    }
}

impl<A> Action<A> {
    /// Name this action in a chain without including it in the flow
    pub fn reference(&self) -> Fragment<A> {
        Fragment::single(self.clone(), Mode::Reference)
    }
}

impl<A> From<Action<A>> for Fragment<A> {
    fn from(action: Action<A>) -> Self {
        Fragment::single(action, Mode::Include)
    }
}

impl<A> From<&Action<A>> for Fragment<A> {
    fn from(action: &Action<A>) -> Self {
        Fragment::single(action.clone(), Mode::Include)
    }
}

impl<A, R: Into<Fragment<A>>> Shr<R> for Fragment<A> {
    type Output = Fragment<A>;

    fn shr(self, rhs: R) -> Fragment<A> {
        self.then(rhs)
    }
}

impl<A, R: Into<Fragment<A>>> BitAnd<R> for Fragment<A> {
    type Output = Fragment<A>;

    fn bitand(self, rhs: R) -> Fragment<A> {
        self.with(rhs)
    }
}

impl<A, R: Into<Fragment<A>>> Shr<R> for Action<A> {
    type Output = Fragment<A>;

    fn shr(self, rhs: R) -> Fragment<A> {
        Fragment::from(self).then(rhs)
    }
}

impl<A, R: Into<Fragment<A>>> BitAnd<R> for Action<A> {
    type Output = Fragment<A>;

    fn bitand(self, rhs: R) -> Fragment<A> {
        Fragment::from(self).with(rhs)
    }
}

impl<A, R: Into<Fragment<A>>> Shr<R> for &Action<A> {
    type Output = Fragment<A>;

    fn shr(self, rhs: R) -> Fragment<A> {
        Fragment::from(self).then(rhs)
    }
}

impl<A, R: Into<Fragment<A>>> BitAnd<R> for &Action<A> {
    type Output = Fragment<A>;

    fn bitand(self, rhs: R) -> Fragment<A> {
        Fragment::from(self).with(rhs)
    }
}
