//! Builder utilities for ergonomic tree construction.
//!
//! Free functions that read like the tree they build:
//!
//! ```
//! use std::time::Duration;
//!
//! use bt_core::behaviours::{Count, Success};
//! use bt_core::builder::{leaf, one_shot, selector, sequence, timeout};
//!
//! let root = selector(vec![
//!     one_shot(leaf(Success)),
//!     sequence(vec![
//!         timeout(Duration::from_secs(5), leaf(Count::default())),
//!         leaf(Success),
//!     ]),
//! ]);
//! assert_eq!(root.iter().count(), 7);
//! ```

use std::time::Duration;

use crate::{Behavior, DecoratorPolicy, Node, Status};

/// Creates a leaf node.
///
/// Shorthand for `Node::leaf(behavior)`.
#[inline]
pub fn leaf(behavior: impl Behavior) -> Node {
    Node::leaf(behavior)
}

/// Creates a sequence node.
///
/// Shorthand for `Node::sequence(children)`.
#[inline]
pub fn sequence(children: Vec<Node>) -> Node {
    Node::sequence(children)
}

/// Creates a selector node.
///
/// Shorthand for `Node::selector(children)`.
#[inline]
pub fn selector(children: Vec<Node>) -> Node {
    Node::selector(children)
}

/// Creates an inverter node.
#[inline]
pub fn inverter(child: Node) -> Node {
    Node::decorate(DecoratorPolicy::Inverter, child)
}

#[inline]
pub fn running_is_failure(child: Node) -> Node {
    Node::decorate(DecoratorPolicy::RunningIsFailure, child)
}

#[inline]
pub fn running_is_success(child: Node) -> Node {
    Node::decorate(DecoratorPolicy::RunningIsSuccess, child)
}

#[inline]
pub fn failure_is_success(child: Node) -> Node {
    Node::decorate(DecoratorPolicy::FailureIsSuccess, child)
}

#[inline]
pub fn failure_is_running(child: Node) -> Node {
    Node::decorate(DecoratorPolicy::FailureIsRunning, child)
}

#[inline]
pub fn success_is_failure(child: Node) -> Node {
    Node::decorate(DecoratorPolicy::SuccessIsFailure, child)
}

#[inline]
pub fn success_is_running(child: Node) -> Node {
    Node::decorate(DecoratorPolicy::SuccessIsRunning, child)
}

/// Creates a condition node waiting for `child` to report `status`.
#[inline]
pub fn condition(status: Status, child: Node) -> Node {
    Node::decorate(DecoratorPolicy::Condition(status), child)
}

/// Creates a one-shot node.
#[inline]
pub fn one_shot(child: Node) -> Node {
    Node::decorate(DecoratorPolicy::OneShot, child)
}

/// Creates a timeout node failing once `duration` has elapsed since entry.
#[inline]
pub fn timeout(duration: Duration, child: Node) -> Node {
    Node::decorate(DecoratorPolicy::Timeout(duration), child)
}
