//! Leaf behavior contract.
//!
//! This module defines the [`Behavior`] trait, which every leaf of a tree
//! implements. Composites and decorators are provided by the engine itself;
//! user code only ever supplies leaves.
//!
//! # Lifecycle
//!
//! ```text
//!            setup(timeout)                      (once, before ticking)
//!                 |
//!   +-----> initialise()                         (entering from non-RUNNING)
//!   |             |
//!   |         update()  <----+                   (every tick)
//!   |             |          | RUNNING
//!   |             +----------+
//!   |             | SUCCESS / FAILURE / INVALID
//!   +------ terminate(new_status)
//! ```
//!
//! `terminate` is also invoked when a parent abandons a RUNNING node, in which
//! case `new_status` is [`Status::Invalid`].

use std::any::Any;
use std::time::Duration;

use crate::Status;

/// A leaf node's decision logic.
///
/// Only [`update`](Behavior::update) is required. Implementations must not
/// block: long-running work is expressed by returning [`Status::Running`]
/// across several ticks.
///
/// `setup` must report a definite outcome; anything but a `bool` is rejected
/// at compile time:
///
/// ```compile_fail
/// use std::time::Duration;
///
/// use bt_core::{Behavior, Status};
///
/// struct Sensor;
///
/// impl Behavior for Sensor {
///     fn setup(&mut self, _timeout: Duration) -> Option<bool> {
///         None
///     }
///
///     fn update(&mut self) -> Status {
///         Status::Success
///     }
/// }
/// ```
pub trait Behavior: AsAny + Send {
    /// One-time acquisition of expensive external resources.
    ///
    /// Returns `false` if the resources could not be acquired within
    /// `timeout`.
    fn setup(&mut self, _timeout: Duration) -> bool {
        true
    }

    /// Reset transient state when the node is (re-)entered.
    ///
    /// Never called while the node is already RUNNING.
    fn initialise(&mut self) {}

    /// Compute this tick's status.
    fn update(&mut self) -> Status;

    /// Release whatever `initialise`/`update` acquired.
    ///
    /// # Arguments
    ///
    /// * `new_status` - The status the node is transitioning to. `Invalid`
    ///   means the node was interrupted by its parent.
    fn terminate(&mut self, _new_status: Status) {}

    /// Diagnostic message describing the last update.
    ///
    /// Copied onto the owning node after every `update` and `terminate`.
    fn feedback_message(&self) -> &str {
        ""
    }
}

/// Type-erased access for downcasting trait objects back to concrete types.
///
/// Implemented for every `'static` type; it only exists so that
/// [`Node::behavior`](crate::Node::behavior) and
/// [`BehaviorTree::visitor`](crate::BehaviorTree::visitor) can hand back
/// concrete references.
#[doc(hidden)]
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
