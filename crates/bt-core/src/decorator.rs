//! Decorator behavior nodes.
//!
//! Decorators wrap a single child behavior and modify its result or execution.
//! A decorator ticks its child first, then evaluates its own policy against
//! the child's fresh status.
//!
//! # Policies
//!
//! | Policy | Behavior |
//! |---|---|
//! | `Inverter` | `Success` and `Failure` swapped, `Running` passes through |
//! | `RunningIsFailure` / `RunningIsSuccess` | `Running` remapped |
//! | `FailureIsSuccess` / `FailureIsRunning` | `Failure` remapped |
//! | `SuccessIsFailure` / `SuccessIsRunning` | `Success` remapped |
//! | `Condition(status)` | `Success` once the child reports `status`, `Running` otherwise |
//! | `OneShot` | Latches the child's first `Success` and never ticks it again |
//! | `Timeout(duration)` | `Failure` and an invalidated child once `duration` has elapsed |
//!
//! # Blocking children
//!
//! Remapping `Running` to a terminal status stops the child with
//! [`Status::Invalid`] on the same tick: a decorator never leaves its child
//! RUNNING once the decorator itself concludes.

use std::time::{Duration, Instant};

use strum::{Display, IntoStaticStr};

use crate::node::NodeKind;
use crate::{Node, Result, Status, TreeError};

/// The status-modifying policy a [`Decorator`] applies to its child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum DecoratorPolicy {
    Inverter,
    RunningIsFailure,
    RunningIsSuccess,
    FailureIsSuccess,
    FailureIsRunning,
    SuccessIsFailure,
    SuccessIsRunning,
    /// Wait for the child to report the given status.
    Condition(Status),
    /// Tick the child through to successful completion just once.
    OneShot,
    /// Fail if the child has not concluded within the duration of entry.
    Timeout(Duration),
}

/// A node holding exactly one decorated child.
pub struct Decorator {
    policy: DecoratorPolicy,
    pub(crate) child: Box<Node>,
    /// `OneShot`: the child has completed successfully.
    completed: bool,
    /// `Timeout`: when the current run expires. `None` if the deadline is not
    /// representable, in which case the run never expires.
    deadline: Option<Instant>,
}

impl Decorator {
    pub fn policy(&self) -> DecoratorPolicy {
        self.policy
    }

    /// The decorated child.
    pub fn child(&self) -> &Node {
        &self.child
    }

    /// Whether a `OneShot` has latched its child's success.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Expiry of the current `Timeout` run.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub(crate) fn initialise(&mut self, feedback: &mut String) {
        if let DecoratorPolicy::Timeout(duration) = self.policy {
            self.deadline = Instant::now().checked_add(duration);
            feedback.clear();
        }
    }

    /// Ticks the child (unless bypassed) and evaluates the policy.
    pub(crate) fn tick_child(
        &mut self,
        visit: &mut dyn FnMut(&Node),
        feedback: &mut String,
    ) -> Status {
        if self.bypasses_child() {
            tracing::trace!("{}.tick() [bouncing]", self.policy);
        } else {
            self.child.tick(visit);
        }
        self.update(feedback)
    }

    fn bypasses_child(&self) -> bool {
        self.policy == DecoratorPolicy::OneShot && self.completed
    }

    fn update(&mut self, feedback: &mut String) -> Status {
        let child_status = self.child.status();
        match self.policy {
            DecoratorPolicy::Inverter => match child_status {
                Status::Success => {
                    set(feedback, "success -> failure");
                    Status::Failure
                }
                Status::Failure => {
                    set(feedback, "failure -> success");
                    Status::Success
                }
                other => {
                    set(feedback, self.child.feedback_message());
                    other
                }
            },
            DecoratorPolicy::RunningIsFailure => {
                self.remap(Status::Running, Status::Failure, "running is failure", feedback)
            }
            DecoratorPolicy::RunningIsSuccess => {
                self.remap(Status::Running, Status::Success, "running is success", feedback)
            }
            DecoratorPolicy::FailureIsSuccess => {
                self.remap(Status::Failure, Status::Success, "failure is success", feedback)
            }
            DecoratorPolicy::FailureIsRunning => {
                self.remap(Status::Failure, Status::Running, "failure is running", feedback)
            }
            DecoratorPolicy::SuccessIsFailure => {
                self.remap(Status::Success, Status::Failure, "success is failure", feedback)
            }
            DecoratorPolicy::SuccessIsRunning => {
                self.remap(Status::Success, Status::Running, "success is running", feedback)
            }
            DecoratorPolicy::Condition(target) => {
                *feedback = format!(
                    "'{}' has status {}, waiting for {}",
                    self.child.name(),
                    child_status,
                    target
                );
                if child_status == target {
                    Status::Success
                } else {
                    Status::Running
                }
            }
            DecoratorPolicy::OneShot => {
                if self.completed {
                    Status::Success
                } else {
                    set(feedback, self.child.feedback_message());
                    child_status
                }
            }
            DecoratorPolicy::Timeout(duration) => match self.deadline {
                Some(deadline) if Instant::now() >= deadline => {
                    set(feedback, "timed out");
                    tracing::debug!("Timeout.update() timed out after {:?}", duration);
                    // Cancel the child
                    self.child.stop(Status::Invalid);
                    Status::Failure
                }
                _ => {
                    *feedback = format!(
                        "{} [timeout: {:?}]",
                        self.child.feedback_message(),
                        duration
                    );
                    child_status
                }
            },
        }
    }

    fn remap(&self, from: Status, to: Status, note: &str, feedback: &mut String) -> Status {
        let child_status = self.child.status();
        let child_feedback = self.child.feedback_message();
        if child_status != from {
            set(feedback, child_feedback);
            return child_status;
        }
        if child_feedback.is_empty() {
            set(feedback, note);
        } else {
            *feedback = format!("{note} [{child_feedback}]");
        }
        to
    }

    pub(crate) fn stop(&mut self, new_status: Status, name: &str, feedback: &mut String) {
        self.terminate(new_status, name, feedback);
        if new_status == Status::Invalid {
            self.child.stop(Status::Invalid);
        }
        if self.child.status().is_running() {
            self.child.stop(Status::Invalid);
        }
    }

    fn terminate(&mut self, new_status: Status, name: &str, feedback: &mut String) {
        if self.policy == DecoratorPolicy::OneShot
            && !self.completed
            && new_status == Status::Success
        {
            tracing::debug!("{}.terminate({}) [oneshot completed]", name, new_status);
            set(feedback, "oneshot completed");
            self.completed = true;
        }
    }
}

fn set(feedback: &mut String, message: &str) {
    feedback.clear();
    feedback.push_str(message);
}

// ============================================================================
// Construction
// ============================================================================

impl Node {
    /// Wraps `child` in a decorator applying `policy`.
    ///
    /// The decorator is named after the policy and its child, e.g.
    /// `Inverter [Sensor]`. The child must be a [`Node`]; anything else is
    /// rejected at compile time:
    ///
    /// ```compile_fail
    /// use bt_core::{DecoratorPolicy, Node};
    ///
    /// let _ = Node::decorate(DecoratorPolicy::Inverter, 5.0);
    /// ```
    pub fn decorate(policy: DecoratorPolicy, child: Node) -> Self {
        let name = format!("{} [{}]", policy, child.name());
        let mut node = Self::with_kind(
            name,
            NodeKind::Decorator(Decorator {
                policy,
                child: Box::new(child),
                completed: false,
                deadline: None,
            }),
        );
        let id = node.id();
        if let Some(child) = node.child_mut(0) {
            child.set_parent(Some(id));
        }
        node
    }

    /// Swaps the decorated child for `replacement` and hands the old child
    /// back, stopping it first if it was RUNNING.
    ///
    /// # Errors
    ///
    /// [`TreeError::TypeMismatch`] if this node is not a decorator.
    pub fn replace_decorated(&mut self, mut replacement: Node) -> Result<Node> {
        replacement.set_parent(Some(self.id()));
        match self.kind {
            NodeKind::Decorator(ref mut decorator) => {
                let mut old = std::mem::replace(&mut *decorator.child, replacement);
                if old.status().is_running() {
                    old.stop(Status::Invalid);
                }
                old.set_parent(None);
                Ok(old)
            }
            _ => Err(TreeError::TypeMismatch {
                expected: "Decorator",
                found: self.kind_name(),
                name: self.name().to_owned(),
            }),
        }
    }
}
