//! Status returned by behavior nodes.

use strum::{Display, EnumIter};

/// The result of evaluating a behavior node.
///
/// # Lifecycle Semantics
///
/// A node starts out [`Status::Invalid`]. Once ticked it reports one of the
/// three live outcomes, and it drops back to `Invalid` whenever its parent
/// abandons it (priority shift, pruning, tree shutdown).
///
/// - `Running` carries across ticks: the node is *not* re-initialised on the
///   next tick, it simply resumes.
/// - `Success` and `Failure` are terminal for the current run: the next tick
///   re-enters the node through `initialise`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Status {
    /// Never evaluated, or explicitly invalidated by a parent.
    #[default]
    Invalid,

    /// In progress; will be resumed on the next tick.
    Running,

    /// The behavior completed successfully.
    ///
    /// For conditions: The condition was met.
    /// For actions: The action executed without errors.
    Success,

    /// The behavior failed.
    ///
    /// For conditions: The condition was not met.
    /// For actions: The action could not be executed.
    Failure,
}

impl Status {
    /// Returns `true` if this status is `Success`.
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, Status::Success)
    }

    /// Returns `true` if this status is `Failure`.
    #[inline]
    pub fn is_failure(self) -> bool {
        matches!(self, Status::Failure)
    }

    /// Returns `true` if this status is `Running`.
    #[inline]
    pub fn is_running(self) -> bool {
        matches!(self, Status::Running)
    }

    /// Returns `true` if this status is `Invalid`.
    #[inline]
    pub fn is_invalid(self) -> bool {
        matches!(self, Status::Invalid)
    }

    /// Swaps `Success` and `Failure`; `Running` and `Invalid` pass through.
    #[inline]
    pub fn invert(self) -> Self {
        match self {
            Status::Success => Status::Failure,
            Status::Failure => Status::Success,
            other => other,
        }
    }
}
