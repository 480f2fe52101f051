//! Composite behavior nodes.
//!
//! Composite nodes control the execution flow of multiple child behaviors.
//! This module provides the two priority policies every tree is built from:
//! [`CompositePolicy::Sequence`] (AND logic) and [`CompositePolicy::Selector`]
//! (OR logic).
//!
//! Both scan their children left to right and stop at the first child whose
//! status matches the policy's stop predicate. A composite never leaves a
//! RUNNING child dangling once priority has moved past it: such children are
//! stopped with [`Status::Invalid`].

use strum::{Display, IntoStaticStr};

use crate::node::NodeKind;
use crate::{Node, NodeId, Result, Status, TreeError};

/// Aggregation policy of a [`Composite`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum CompositePolicy {
    /// Executes children in order until one does not succeed.
    ///
    /// # Semantics
    ///
    /// - If a child returns `Running` or `Failure`, the sequence **stops** and
    ///   returns that status
    /// - If a child returns `Success`, the sequence **continues** to the next child
    /// - If all children return `Success`, the sequence returns `Success`
    ///
    /// A RUNNING sequence resumes at the child that was running. Re-entering a
    /// sequence from any other status invalidates all children and restarts
    /// from the first.
    Sequence,

    /// Executes children in priority order until one does not fail.
    ///
    /// # Semantics
    ///
    /// - If a child returns `Running` or `Success`, the selector **stops** and
    ///   returns that status
    /// - If a child returns `Failure`, the selector **continues** to the next child
    /// - If all children return `Failure`, the selector returns `Failure`
    ///
    /// The selector re-evaluates from the highest priority child every tick.
    /// When a different child claims control, every lower priority child is
    /// invalidated.
    Selector,
}

/// Children and scan bookkeeping of a composite node.
pub struct Composite {
    policy: CompositePolicy,
    pub(crate) children: Vec<Node>,
    /// Index of the child that determined the composite's status on the last
    /// tick. A RUNNING sequence resumes here.
    current_child: Option<usize>,
}

impl Composite {
    fn new(policy: CompositePolicy, children: Vec<Node>) -> Self {
        Self {
            policy,
            children,
            current_child: None,
        }
    }

    pub fn policy(&self) -> CompositePolicy {
        self.policy
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// The child that produced this composite's status on the last tick.
    pub fn current_child(&self) -> Option<&Node> {
        self.current_child.and_then(|index| self.children.get(index))
    }

    pub(crate) fn initialise(&mut self) {
        if self.policy == CompositePolicy::Sequence {
            self.current_child = None;
            for child in &mut self.children {
                if !child.status().is_invalid() {
                    child.stop(Status::Invalid);
                }
            }
        }
    }

    pub(crate) fn tick_children(&mut self, visit: &mut dyn FnMut(&Node)) -> Status {
        match self.policy {
            CompositePolicy::Sequence => self.tick_sequence(visit),
            CompositePolicy::Selector => self.tick_selector(visit),
        }
    }

    fn tick_sequence(&mut self, visit: &mut dyn FnMut(&Node)) -> Status {
        let start = self.current_child.unwrap_or(0);
        for (index, child) in self.children.iter_mut().enumerate().skip(start) {
            let status = child.tick(visit);
            self.current_child = Some(index);
            if status != Status::Success {
                return status;
            }
        }
        // All children succeeded
        Status::Success
    }

    fn tick_selector(&mut self, visit: &mut dyn FnMut(&Node)) -> Status {
        let previous = self.current_child;

        let mut claimed = None;
        for (index, child) in self.children.iter_mut().enumerate() {
            let status = child.tick(visit);
            if matches!(status, Status::Running | Status::Success) {
                claimed = Some((index, status));
                break;
            }
        }

        match claimed {
            Some((index, status)) => {
                self.current_child = Some(index);
                if previous != Some(index) {
                    // Priority moved: abandon everything beneath the new claimant
                    self.invalidate_after(index);
                }
                status
            }
            None => {
                // All children failed
                self.current_child = self.children.len().checked_sub(1);
                Status::Failure
            }
        }
    }

    fn invalidate_after(&mut self, index: usize) {
        for child in self.children.iter_mut().skip(index + 1) {
            if !child.status().is_invalid() {
                child.stop(Status::Invalid);
            }
        }
    }

    pub(crate) fn stop(&mut self, new_status: Status) {
        if new_status == Status::Invalid {
            self.current_child = None;
            for child in &mut self.children {
                if !child.status().is_invalid() {
                    child.stop(Status::Invalid);
                }
            }
        } else {
            for child in &mut self.children {
                if child.status().is_running() {
                    child.stop(Status::Invalid);
                }
            }
        }
    }

    fn position(&self, id: NodeId) -> Option<usize> {
        self.children.iter().position(|child| child.id() == id)
    }

    fn insert(&mut self, index: usize, child: Node) {
        self.children.insert(index, child);
        if let Some(current) = self.current_child.as_mut()
            && *current >= index
        {
            *current += 1;
        }
    }

    fn remove(&mut self, index: usize) -> Node {
        let mut child = self.children.remove(index);
        match self.current_child {
            Some(current) if current == index => self.current_child = None,
            Some(current) if current > index => self.current_child = Some(current - 1),
            _ => {}
        }
        if child.status().is_running() {
            child.stop(Status::Invalid);
        }
        child.set_parent(None);
        child
    }
}

// ============================================================================
// Construction and assembly
// ============================================================================

impl Node {
    /// Creates a composite node with the given policy and children.
    pub fn composite(policy: CompositePolicy, children: Vec<Node>) -> Self {
        let mut node = Self::with_kind(
            policy.to_string(),
            NodeKind::Composite(Composite::new(policy, Vec::new())),
        );
        for child in children {
            node.attach(child);
        }
        node
    }

    /// Creates a sequence node. See [`CompositePolicy::Sequence`].
    pub fn sequence(children: Vec<Node>) -> Self {
        Self::composite(CompositePolicy::Sequence, children)
    }

    /// Creates a selector node. See [`CompositePolicy::Selector`].
    pub fn selector(children: Vec<Node>) -> Self {
        Self::composite(CompositePolicy::Selector, children)
    }

    fn composite_mut(&mut self) -> Result<&mut Composite> {
        match self.kind {
            NodeKind::Composite(ref mut composite) => Ok(composite),
            _ => Err(TreeError::TypeMismatch {
                expected: "Composite",
                found: self.kind_name(),
                name: self.name().to_owned(),
            }),
        }
    }

    fn attach(&mut self, mut child: Node) {
        child.set_parent(Some(self.id()));
        if let NodeKind::Composite(composite) = &mut self.kind {
            composite.children.push(child);
        }
    }

    /// Appends a child.
    ///
    /// # Errors
    ///
    /// [`TreeError::TypeMismatch`] if this node is not a composite.
    pub fn add_child(&mut self, child: Node) -> Result<NodeId> {
        let len = self.composite_mut()?.children.len();
        self.insert_child(child, len)
    }

    /// Appends several children, in order.
    ///
    /// # Errors
    ///
    /// [`TreeError::TypeMismatch`] if this node is not a composite.
    pub fn add_children(&mut self, children: impl IntoIterator<Item = Node>) -> Result<()> {
        self.composite_mut()?;
        for child in children {
            self.add_child(child)?;
        }
        Ok(())
    }

    /// Inserts a child at `index`, shifting later children right.
    ///
    /// # Errors
    ///
    /// - [`TreeError::TypeMismatch`] if this node is not a composite
    /// - [`TreeError::InvalidArgument`] if `index` is past the end
    pub fn insert_child(&mut self, mut child: Node, index: usize) -> Result<NodeId> {
        let parent = self.id();
        let name = self.name().to_owned();
        let composite = self.composite_mut()?;
        if index > composite.children.len() {
            return Err(TreeError::InvalidArgument(format!(
                "insert index {index} out of range for '{name}' with {} children",
                composite.children.len()
            )));
        }
        let id = child.id();
        child.set_parent(Some(parent));
        composite.insert(index, child);
        Ok(id)
    }

    /// Inserts a child in front of all others (highest priority).
    ///
    /// # Errors
    ///
    /// [`TreeError::TypeMismatch`] if this node is not a composite.
    pub fn prepend_child(&mut self, child: Node) -> Result<NodeId> {
        self.insert_child(child, 0)
    }

    /// Detaches the direct child with the given id and hands it back.
    ///
    /// A RUNNING child is stopped with [`Status::Invalid`] first.
    ///
    /// # Errors
    ///
    /// - [`TreeError::TypeMismatch`] if this node is not a composite
    /// - [`TreeError::NodeNotFound`] if no direct child has that id
    pub fn remove_child_by_id(&mut self, id: NodeId) -> Result<Node> {
        let composite = self.composite_mut()?;
        let index = composite.position(id).ok_or(TreeError::NodeNotFound(id))?;
        Ok(composite.remove(index))
    }

    /// Swaps the direct child with the given id for `replacement`, keeping its
    /// position, and hands the old child back.
    ///
    /// # Errors
    ///
    /// - [`TreeError::TypeMismatch`] if this node is not a composite
    /// - [`TreeError::NodeNotFound`] if no direct child has that id
    pub fn replace_child_by_id(&mut self, id: NodeId, mut replacement: Node) -> Result<Node> {
        replacement.set_parent(Some(self.id()));
        let composite = self.composite_mut()?;
        let index = composite.position(id).ok_or(TreeError::NodeNotFound(id))?;
        let current = composite.current_child;
        let old = composite.remove(index);
        composite.insert(index, replacement);
        // The replacement takes over the old child's slot in the scan
        composite.current_child = current;
        Ok(old)
    }

    /// Detaches every child, stopping any that are RUNNING.
    ///
    /// # Errors
    ///
    /// [`TreeError::TypeMismatch`] if this node is not a composite.
    pub fn remove_all_children(&mut self) -> Result<Vec<Node>> {
        let composite = self.composite_mut()?;
        let mut removed = Vec::with_capacity(composite.children.len());
        while !composite.children.is_empty() {
            removed.push(composite.remove(0));
        }
        Ok(removed)
    }
}
