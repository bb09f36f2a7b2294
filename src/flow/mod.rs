// Graph building and compilation
pub mod action;
pub mod compiler;
pub mod constraints;
pub mod dsl;
pub mod flow_set;
pub mod graph;
pub mod registry;
pub mod sequence;

pub use action::{Action, Body};
pub use compiler::compile;
pub use constraints::{ConstraintSet, EdgeKind};
pub use dsl::{Fragment, Mode};
pub use flow_set::{Contribution, FlowSet, CONTRIBUTIONS};
pub use graph::{EdgeSnapshot, Graph, GraphSnapshot};
pub use registry::{ActionRef, ActionRegistry};
pub use sequence::{CompiledSequence, Step};
