//! Tree nodes: identity, lifecycle and the tick traversal protocol.
//!
//! A [`Node`] wraps one of three kinds of behavior:
//!
//! - a user-supplied leaf ([`Behavior`])
//! - a [`Composite`] owning an ordered list of children
//! - a [`Decorator`] owning exactly one child
//!
//! Every node, regardless of kind, follows the same tick protocol:
//!
//! 1. If the node is not RUNNING, `initialise` it.
//! 2. Compute the new status. Composites and decorators tick their children
//!    first, so descendants are always visited before the node itself.
//! 3. If the new status is not RUNNING, `stop` the node with it.
//! 4. Record the status and hand the node to the visit callback.
//!
//! The visit callback receives nodes in exactly this descendant-first order,
//! which is what visitors observe.

use std::any::type_name;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::slice;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::behavior::AsAny;
use crate::{Behavior, Composite, Decorator, Status};

// ============================================================================
// Identity
// ============================================================================

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque, process-unique identity of a node.
///
/// Assigned at construction and stable for the node's lifetime. Obtain it
/// from [`Node::id`]; ids are never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, for logging and export.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Node
// ============================================================================

pub(crate) enum NodeKind {
    Leaf(Box<dyn Behavior>),
    Composite(Composite),
    Decorator(Decorator),
}

/// A behavior in the tree.
///
/// A node exclusively owns its children. The parent link is a non-owning
/// [`NodeId`], used only for navigation.
pub struct Node {
    id: NodeId,
    name: String,
    status: Status,
    feedback_message: String,
    parent: Option<NodeId>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn with_kind(name: String, kind: NodeKind) -> Self {
        Self {
            id: NodeId::next(),
            name,
            status: Status::Invalid,
            feedback_message: String::new(),
            parent: None,
            kind,
        }
    }

    /// Creates a leaf node, named after the behavior's type.
    pub fn leaf<B: Behavior>(behavior: B) -> Self {
        let name = short_type_name::<B>().to_owned();
        Self::with_kind(name, NodeKind::Leaf(Box::new(behavior)))
    }

    /// Renames the node (builder pattern).
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn feedback_message(&self) -> &str {
        &self.feedback_message
    }

    /// Identity of the node this one is attached beneath, if any.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        self.parent = parent;
    }

    /// Direct children, in tick order. Empty for leaves, a single element for
    /// decorators.
    pub fn children(&self) -> &[Node] {
        match &self.kind {
            NodeKind::Leaf(_) => &[],
            NodeKind::Composite(composite) => &composite.children,
            NodeKind::Decorator(decorator) => slice::from_ref(&*decorator.child),
        }
    }

    pub(crate) fn children_mut(&mut self) -> &mut [Node] {
        match &mut self.kind {
            NodeKind::Leaf(_) => &mut [],
            NodeKind::Composite(composite) => &mut composite.children,
            NodeKind::Decorator(decorator) => slice::from_mut(&mut *decorator.child),
        }
    }

    pub(crate) fn child_mut(&mut self, index: usize) -> Option<&mut Node> {
        self.children_mut().get_mut(index)
    }

    /// Short name of this node's kind: `Behaviour` for leaves, otherwise the
    /// composite or decorator policy (`Sequence`, `Inverter`, ...).
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Leaf(_) => "Behaviour",
            NodeKind::Composite(composite) => composite.policy().into(),
            NodeKind::Decorator(decorator) => decorator.policy().into(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.kind, NodeKind::Composite(_))
    }

    pub fn is_decorator(&self) -> bool {
        matches!(self.kind, NodeKind::Decorator(_))
    }

    pub fn as_composite(&self) -> Option<&Composite> {
        match &self.kind {
            NodeKind::Composite(composite) => Some(composite),
            _ => None,
        }
    }

    pub fn as_decorator(&self) -> Option<&Decorator> {
        match &self.kind {
            NodeKind::Decorator(decorator) => Some(decorator),
            _ => None,
        }
    }

    /// Downcasts a leaf to its concrete behavior type.
    ///
    /// Returns `None` for composites, decorators and leaves of another type.
    pub fn behavior<B: Behavior>(&self) -> Option<&B> {
        match &self.kind {
            NodeKind::Leaf(behavior) => (**behavior).as_any().downcast_ref(),
            _ => None,
        }
    }

    /// Mutable counterpart of [`Node::behavior`].
    pub fn behavior_mut<B: Behavior>(&mut self) -> Option<&mut B> {
        match &mut self.kind {
            NodeKind::Leaf(behavior) => (**behavior).as_any_mut().downcast_mut(),
            _ => None,
        }
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Relays `setup` to this node and, in declaration order, every
    /// descendant.
    ///
    /// Stops at the first failure; the aggregate succeeds only if every node
    /// succeeds.
    pub fn setup(&mut self, timeout: Duration) -> bool {
        tracing::trace!("{}.setup()", self.name);
        let ok = match &mut self.kind {
            NodeKind::Leaf(behavior) => behavior.setup(timeout),
            NodeKind::Composite(composite) => composite
                .children
                .iter_mut()
                .all(|child| child.setup(timeout)),
            NodeKind::Decorator(decorator) => decorator.child.setup(timeout),
        };
        if !ok {
            tracing::warn!("{}.setup() failed", self.name);
        }
        ok
    }

    fn initialise(&mut self) {
        tracing::trace!("{}.initialise()", self.name);
        match &mut self.kind {
            NodeKind::Leaf(behavior) => behavior.initialise(),
            NodeKind::Composite(composite) => composite.initialise(),
            NodeKind::Decorator(decorator) => decorator.initialise(&mut self.feedback_message),
        }
    }

    /// Runs one tick over this subtree.
    ///
    /// `visit` is called once for every node ticked, descendants before the
    /// node that ticked them; this node is always visited last.
    pub fn tick(&mut self, visit: &mut dyn FnMut(&Node)) -> Status {
        tracing::trace!("{}.tick()", self.name);
        if self.status != Status::Running {
            self.initialise();
        }

        let mut anomaly = None;
        let new_status = match &mut self.kind {
            NodeKind::Leaf(behavior) => match update_leaf(&mut **behavior, &self.name) {
                Ok(status) => {
                    self.feedback_message.clear();
                    self.feedback_message.push_str(behavior.feedback_message());
                    status
                }
                Err(reason) => {
                    anomaly = Some(reason);
                    Status::Invalid
                }
            },
            NodeKind::Composite(composite) => composite.tick_children(visit),
            NodeKind::Decorator(decorator) => {
                decorator.tick_child(visit, &mut self.feedback_message)
            }
        };

        if new_status != Status::Running {
            self.stop(new_status);
        }
        // Applied after `stop` so terminate's feedback cannot overwrite it
        if let Some(reason) = anomaly {
            self.feedback_message = format!("update panicked: {reason}");
        }
        self.status = new_status;
        visit(self);
        new_status
    }

    /// Ticks this subtree without observing the traversal.
    pub fn tick_once(&mut self) -> Status {
        self.tick(&mut |_| {})
    }

    /// Transitions the node to `new_status`.
    ///
    /// Calls the node's `terminate` hook, then makes sure no descendant is
    /// left RUNNING: an `Invalid` stop invalidates the whole subtree.
    pub fn stop(&mut self, new_status: Status) {
        tracing::trace!("{}.stop({} -> {})", self.name, self.status, new_status);
        match &mut self.kind {
            NodeKind::Leaf(behavior) => {
                behavior.terminate(new_status);
                self.feedback_message.clear();
                self.feedback_message.push_str(behavior.feedback_message());
            }
            NodeKind::Composite(composite) => composite.stop(new_status),
            NodeKind::Decorator(decorator) => {
                decorator.stop(new_status, &self.name, &mut self.feedback_message)
            }
        }
        self.status = new_status;
    }

    /// The deepest node that was active at the end of the last tick.
    ///
    /// `None` if this node is INVALID (never ticked, or invalidated).
    pub fn tip(&self) -> Option<&Node> {
        if self.status.is_invalid() {
            return None;
        }
        match &self.kind {
            NodeKind::Leaf(_) => Some(self),
            NodeKind::Composite(composite) => composite
                .current_child()
                .and_then(Node::tip)
                .or(Some(self)),
            NodeKind::Decorator(decorator) if !decorator.child.status.is_invalid() => {
                decorator.child.tip().or(Some(self))
            }
            NodeKind::Decorator(_) => Some(self),
        }
    }

    /// Depth-first, post-order walk over the whole subtree (children before
    /// their parent), independent of ticking.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            stack: vec![(self, 0)],
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind_name())
            .field("status", &self.status)
            .field("children", &self.children())
            .finish()
    }
}

impl<'a> IntoIterator for &'a Node {
    type Item = &'a Node;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Post-order iterator returned by [`Node::iter`].
pub struct Iter<'a> {
    stack: Vec<(&'a Node, usize)>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            let node = top.0;
            match node.children().get(top.1) {
                Some(child) => {
                    top.1 += 1;
                    self.stack.push((child, 0));
                }
                None => {
                    self.stack.pop();
                    return Some(node);
                }
            }
        }
    }
}

/// Evaluates a leaf's `update`, containing panics from third-party code.
///
/// A panicking update is a protocol anomaly: it is logged and the panic
/// message is returned so the caller can coerce the node to INVALID while the
/// rest of the tree still ticks.
fn update_leaf(behavior: &mut dyn Behavior, name: &str) -> Result<Status, String> {
    panic::catch_unwind(AssertUnwindSafe(|| behavior.update())).map_err(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_owned());
        tracing::error!(
            "A behaviour's update panicked, setting to INVALID [{}][{}]",
            name,
            reason
        );
        reason
    })
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
