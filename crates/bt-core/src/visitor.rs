//! Tree visitors: observers run over the tree on every tick.
//!
//! A visitor is either *partial* (the default) or *full*:
//!
//! - partial visitors are handed each node as it finishes its tick, so they see
//!   exactly the nodes that were ticked, descendants before their parent
//! - full visitors are run once the tick has completed, over every node in the
//!   tree in post-order, including nodes that were not ticked

use std::collections::HashMap;

use crate::behavior::AsAny;
use crate::{Node, NodeId, Status};

/// Observer attached to a [`BehaviorTree`](crate::BehaviorTree).
///
/// Visitors only ever see shared references, so they cannot alter the tree.
pub trait Visitor: AsAny + Send {
    /// Whether this visitor walks the entire tree rather than just the ticked
    /// nodes.
    fn full(&self) -> bool {
        false
    }

    /// Called at the start of every tick, before any node is visited.
    fn initialise(&mut self) {}

    fn run(&mut self, node: &Node);

    /// Called once every node for this tick has been visited.
    fn finalise(&mut self) {}
}

/// Logs every visited node at `DEBUG` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugVisitor;

impl Visitor for DebugVisitor {
    fn run(&mut self, node: &Node) {
        if node.feedback_message().is_empty() {
            tracing::debug!("{} {} [visited][{}]", node.name(), node.id(), node.status());
        } else {
            tracing::debug!(
                "{} {} [visited][{}][{}]",
                node.name(),
                node.id(),
                node.status(),
                node.feedback_message()
            );
        }
    }
}

/// Records the status of every visited node, tick over tick.
///
/// After each tick, [`SnapshotVisitor::changed`] reports whether the set of
/// visited nodes or any of their statuses differs from the previous tick.
/// Useful for deciding when a tree display needs refreshing.
#[derive(Debug, Default)]
pub struct SnapshotVisitor {
    full: bool,
    changed: bool,
    visited: HashMap<NodeId, Status>,
    previously_visited: HashMap<NodeId, Status>,
    order: Vec<NodeId>,
}

impl SnapshotVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the whole tree rather than only the ticked nodes.
    #[must_use]
    pub fn full_tree(mut self) -> Self {
        self.full = true;
        self
    }

    /// Whether the last tick differed from the one before it.
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Statuses recorded during the last tick.
    pub fn visited(&self) -> &HashMap<NodeId, Status> {
        &self.visited
    }

    /// Statuses recorded during the tick before the last.
    pub fn previously_visited(&self) -> &HashMap<NodeId, Status> {
        &self.previously_visited
    }

    /// Ids in the order they were visited during the last tick.
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }
}

impl Visitor for SnapshotVisitor {
    fn full(&self) -> bool {
        self.full
    }

    fn initialise(&mut self) {
        self.changed = false;
        self.previously_visited = std::mem::take(&mut self.visited);
        self.order.clear();
    }

    fn run(&mut self, node: &Node) {
        self.visited.insert(node.id(), node.status());
        self.order.push(node.id());
        if self.previously_visited.get(&node.id()) != Some(&node.status()) {
            self.changed = true;
        }
    }

    fn finalise(&mut self) {
        // Nodes that dropped out of the traversal count as a change too
        if !self.changed && self.visited.len() != self.previously_visited.len() {
            self.changed = true;
        }
    }
}
