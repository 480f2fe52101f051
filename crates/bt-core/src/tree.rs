//! The tree manager: owns a root, ticks it, and restructures it safely.
//!
//! [`BehaviorTree`] keeps an index from [`NodeId`] to each node's position in
//! the owned hierarchy, rebuilt after every structural change, so lookups and
//! mutations never need to search the tree.
//!
//! Structural operations take `&mut self` and ticking takes `&mut self`, so
//! the borrow checker already guarantees a prune, replace or insert can never
//! interleave with an in-progress tick.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::behavior::AsAny;
use crate::{Node, NodeId, Result, Status, TreeError, Visitor};

type TickHandler = Box<dyn FnMut(&BehaviorTree) + Send>;

/// Clonable, thread-safe flag that stops [`BehaviorTree::tick_tock`] before
/// its next iteration.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    pub fn interrupt(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owns a root node and drives it.
///
/// # Examples
///
/// ```
/// use bt_core::behaviours::{Failure, Success};
/// use bt_core::{BehaviorTree, Node, Status};
///
/// let root = Node::selector(vec![Node::leaf(Failure), Node::leaf(Success).named("B")]);
/// let mut tree = BehaviorTree::new(root);
///
/// assert_eq!(tree.tick(), Status::Success);
/// let tip = tree.tip().and_then(|id| tree.node(id)).map(|n| n.name().to_owned());
/// assert_eq!(tip.as_deref(), Some("B"));
/// ```
///
/// The root must be a [`Node`]; anything else is rejected at compile time:
///
/// ```compile_fail
/// use bt_core::BehaviorTree;
///
/// let _ = BehaviorTree::new("root");
/// ```
pub struct BehaviorTree {
    root: Node,
    index: HashMap<NodeId, Vec<usize>>,
    visitors: Vec<Box<dyn Visitor>>,
    pre_tick_handlers: Vec<TickHandler>,
    post_tick_handlers: Vec<TickHandler>,
    count: u64,
    tip: Option<NodeId>,
    interrupt: InterruptHandle,
}

impl BehaviorTree {
    pub fn new(root: Node) -> Self {
        let mut tree = Self {
            root,
            index: HashMap::new(),
            visitors: Vec::new(),
            pre_tick_handlers: Vec::new(),
            post_tick_handlers: Vec::new(),
            count: 0,
            tip: None,
            interrupt: InterruptHandle::default(),
        };
        tree.rebuild_index();
        tree
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Number of ticks completed so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Id of the tip computed at the end of the last tick.
    pub fn tip(&self) -> Option<NodeId> {
        self.tip
    }

    /// Looks a node up by identity.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        let path = self.index.get(&id)?;
        path.iter()
            .try_fold(&self.root, |node, &index| node.children().get(index))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    /// Number of nodes owned by the tree, root included.
    pub fn node_count(&self) -> usize {
        self.index.len()
    }

    // ------------------------------------------------------------------------
    // Setup, observers
    // ------------------------------------------------------------------------

    /// Relays `setup` through the whole tree.
    ///
    /// # Errors
    ///
    /// [`TreeError::SetupFailed`] if any node reports failure.
    pub fn setup(&mut self, timeout: Duration) -> Result<()> {
        tracing::debug!(?timeout, "Setting up tree");
        if self.root.setup(timeout) {
            Ok(())
        } else {
            Err(TreeError::SetupFailed {
                name: self.root.name().to_owned(),
            })
        }
    }

    pub fn add_visitor(&mut self, visitor: impl Visitor) {
        self.visitors.push(Box::new(visitor));
    }

    /// First registered visitor of type `V`, for reading back its results.
    pub fn visitor<V: Visitor>(&self) -> Option<&V> {
        self.visitors
            .iter()
            .find_map(|visitor| (**visitor).as_any().downcast_ref())
    }

    /// Registers a handler run at the start of every tick.
    pub fn add_pre_tick_handler(&mut self, handler: impl FnMut(&BehaviorTree) + Send + 'static) {
        self.pre_tick_handlers.push(Box::new(handler));
    }

    /// Registers a handler run at the end of every tick.
    pub fn add_post_tick_handler(
        &mut self,
        handler: impl FnMut(&BehaviorTree) + Send + 'static,
    ) {
        self.post_tick_handlers.push(Box::new(handler));
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    // ------------------------------------------------------------------------
    // Ticking
    // ------------------------------------------------------------------------

    /// Ticks the tree once.
    ///
    /// Order: pre-tick handlers, the traversal (partial visitors see each node
    /// as it finishes), full visitors over the whole tree, tip bookkeeping,
    /// post-tick handlers.
    pub fn tick(&mut self) -> Status {
        let mut handlers = std::mem::take(&mut self.pre_tick_handlers);
        for handler in &mut handlers {
            handler(&*self);
        }
        self.pre_tick_handlers = handlers;

        for visitor in &mut self.visitors {
            visitor.initialise();
        }

        let visitors = &mut self.visitors;
        let status = self.root.tick(&mut |node| {
            for visitor in visitors.iter_mut().filter(|v| !v.full()) {
                visitor.run(node);
            }
        });

        for visitor in self.visitors.iter_mut().filter(|v| v.full()) {
            for node in self.root.iter() {
                visitor.run(node);
            }
        }
        for visitor in &mut self.visitors {
            visitor.finalise();
        }

        self.tip = self.root.tip().map(Node::id);
        self.count += 1;
        tracing::debug!(count = self.count, %status, "Tick complete");

        let mut handlers = std::mem::take(&mut self.post_tick_handlers);
        for handler in &mut handlers {
            handler(&*self);
        }
        self.post_tick_handlers = handlers;

        status
    }

    /// Ticks repeatedly, sleeping `period` between ticks.
    ///
    /// Runs `iterations` times, or until interrupted when `None`. The optional
    /// handlers run immediately before and after each tick, in addition to the
    /// registered ones. Blocks the calling thread; returns the number of ticks
    /// performed.
    pub fn tick_tock(
        &mut self,
        period: Duration,
        iterations: Option<u64>,
        mut pre_tick_handler: Option<&mut dyn FnMut(&BehaviorTree)>,
        mut post_tick_handler: Option<&mut dyn FnMut(&BehaviorTree)>,
    ) -> u64 {
        let mut ticks = 0;
        let more = |ticks: u64| iterations.is_none_or(|n| ticks < n);

        while more(ticks) && !self.interrupt.is_interrupted() {
            if let Some(handler) = pre_tick_handler.as_deref_mut() {
                handler(&*self);
            }
            self.tick();
            if let Some(handler) = post_tick_handler.as_deref_mut() {
                handler(&*self);
            }
            ticks += 1;

            if more(ticks) && !self.interrupt.is_interrupted() {
                thread::sleep(period);
            }
        }

        if self.interrupt.is_interrupted() {
            tracing::debug!(ticks, "Tick-tock interrupted");
        }
        self.interrupt.clear();
        ticks
    }

    /// Invalidates the whole tree so RUNNING leaves release their resources.
    pub fn shutdown(&mut self) {
        if !self.root.status().is_invalid() {
            self.root.stop(Status::Invalid);
        }
        self.tip = None;
        tracing::debug!(root = self.root.name(), "Tree shut down");
    }

    // ------------------------------------------------------------------------
    // Structural mutation
    // ------------------------------------------------------------------------

    /// Detaches the subtree rooted at `id` and hands it back.
    ///
    /// A RUNNING subtree is invalidated first.
    ///
    /// # Errors
    ///
    /// - [`TreeError::NodeNotFound`] if `id` is not in the tree
    /// - [`TreeError::InvalidOperation`] if `id` is the root, or the only child
    ///   of a decorator
    pub fn prune_subtree(&mut self, id: NodeId) -> Result<Node> {
        let path = self.path(id)?;
        let Some((_, parent_path)) = path.split_last() else {
            return Err(TreeError::InvalidOperation(format!(
                "cannot prune the root node '{}'",
                self.root.name()
            )));
        };

        let parent = self.node_at_mut(parent_path, id)?;
        if parent.is_decorator() {
            return Err(TreeError::InvalidOperation(format!(
                "cannot prune the only child of decorator '{}'",
                parent.name()
            )));
        }
        let pruned = parent.remove_child_by_id(id)?;

        tracing::debug!(node = pruned.name(), %id, "Pruned subtree");
        self.rebuild_index();
        Ok(pruned)
    }

    /// Swaps the subtree rooted at `id` for `subtree`, keeping its position,
    /// and hands the old subtree back.
    ///
    /// # Errors
    ///
    /// - [`TreeError::NodeNotFound`] if `id` is not in the tree
    /// - [`TreeError::InvalidOperation`] if `id` is the root (use
    ///   [`BehaviorTree::set_root`])
    pub fn replace_subtree(&mut self, id: NodeId, subtree: Node) -> Result<Node> {
        let path = self.path(id)?;
        let Some((_, parent_path)) = path.split_last() else {
            return Err(TreeError::InvalidOperation(format!(
                "cannot replace the root node '{}', use set_root instead",
                self.root.name()
            )));
        };

        let parent = self.node_at_mut(parent_path, id)?;
        let replaced = if parent.is_decorator() {
            parent.replace_decorated(subtree)?
        } else {
            parent.replace_child_by_id(id, subtree)?
        };

        tracing::debug!(node = replaced.name(), %id, "Replaced subtree");
        self.rebuild_index();
        Ok(replaced)
    }

    /// Inserts `child` beneath the composite `parent_id`, at `index`.
    ///
    /// # Errors
    ///
    /// - [`TreeError::NodeNotFound`] if `parent_id` is not in the tree
    /// - [`TreeError::TypeMismatch`] if the parent is not a composite
    /// - [`TreeError::InvalidArgument`] if `index` is past the end
    pub fn insert_subtree(&mut self, child: Node, parent_id: NodeId, index: usize) -> Result<NodeId> {
        let path = self.path(parent_id)?;
        let parent = self.node_at_mut(&path, parent_id)?;
        let id = parent.insert_child(child, index)?;

        tracing::debug!(%id, parent = %parent_id, index, "Inserted subtree");
        self.rebuild_index();
        Ok(id)
    }

    /// Installs a new root and hands the previous one back, invalidated.
    pub fn set_root(&mut self, root: Node) -> Node {
        let mut old = std::mem::replace(&mut self.root, root);
        if !old.status().is_invalid() {
            old.stop(Status::Invalid);
        }
        self.tip = None;
        self.rebuild_index();
        old
    }

    fn path(&self, id: NodeId) -> Result<Vec<usize>> {
        self.index.get(&id).cloned().ok_or(TreeError::NodeNotFound(id))
    }

    fn node_at_mut(&mut self, path: &[usize], id: NodeId) -> Result<&mut Node> {
        path.iter()
            .try_fold(&mut self.root, |node, &index| node.child_mut(index))
            .ok_or(TreeError::NodeNotFound(id))
    }

    /// Re-derives the id index and every parent link from the owned hierarchy.
    fn rebuild_index(&mut self) {
        self.index.clear();
        index_subtree(&mut self.root, None, &mut Vec::new(), &mut self.index);
        if let Some(tip) = self.tip
            && !self.index.contains_key(&tip)
        {
            self.tip = None;
        }
    }
}

fn index_subtree(
    node: &mut Node,
    parent: Option<NodeId>,
    path: &mut Vec<usize>,
    index: &mut HashMap<NodeId, Vec<usize>>,
) {
    node.set_parent(parent);
    let id = node.id();
    index.insert(id, path.clone());
    for (position, child) in node.children_mut().iter_mut().enumerate() {
        path.push(position);
        index_subtree(child, Some(id), path, index);
        path.pop();
    }
}
