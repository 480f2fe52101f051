//! Stock leaf behaviors.
//!
//! Small, self-contained leaves useful for prototyping trees and for
//! exercising the engine in tests. [`Count`] in particular records how often
//! it was updated and reset, which makes it the instrument of choice for
//! checking invalidation behavior.

use crate::{Behavior, Status};

/// Always returns `Success`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Success;

impl Behavior for Success {
    fn update(&mut self) -> Status {
        Status::Success
    }
}

/// Always returns `Failure`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Failure;

impl Behavior for Failure {
    fn update(&mut self) -> Status {
        Status::Failure
    }
}

/// Always returns `Running`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Running;

impl Behavior for Running {
    fn update(&mut self) -> Status {
        Status::Running
    }
}

/// Scripted counter: fails, then runs, then succeeds, then fails forever.
///
/// Each update increments the count and returns:
///
/// - `Failure` while `count <= fail_until`
/// - `Running` while `count <= running_until`
/// - `Success` while `count <= success_until`
/// - `Failure` thereafter
///
/// When `reset` is set, being invalidated rewinds the count to zero.
#[derive(Debug, Clone)]
pub struct Count {
    count: u32,
    fail_until: u32,
    running_until: u32,
    success_until: u32,
    reset: bool,
    number_count_resets: u32,
    number_updated: u32,
    feedback_message: &'static str,
}

impl Count {
    pub fn new(fail_until: u32, running_until: u32, success_until: u32) -> Self {
        Self {
            count: 0,
            fail_until,
            running_until,
            success_until,
            reset: true,
            number_count_resets: 0,
            number_updated: 0,
            feedback_message: "",
        }
    }

    /// Whether invalidation rewinds the count (builder pattern).
    #[must_use]
    pub fn with_reset(mut self, reset: bool) -> Self {
        self.reset = reset;
        self
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// How many times an invalidation rewound the count.
    pub fn number_count_resets(&self) -> u32 {
        self.number_count_resets
    }

    /// Total number of updates, never rewound.
    pub fn number_updated(&self) -> u32 {
        self.number_updated
    }
}

impl Default for Count {
    fn default() -> Self {
        Self::new(3, 5, 6)
    }
}

impl Behavior for Count {
    fn update(&mut self) -> Status {
        self.number_updated += 1;
        self.count += 1;
        let (status, message) = if self.count <= self.fail_until {
            (Status::Failure, "failing")
        } else if self.count <= self.running_until {
            (Status::Running, "running")
        } else if self.count <= self.success_until {
            (Status::Success, "success")
        } else {
            (Status::Failure, "failing forever more")
        };
        self.feedback_message = message;
        status
    }

    fn terminate(&mut self, new_status: Status) {
        // Rewind only when interrupted
        if new_status == Status::Invalid && self.reset {
            self.count = 0;
            self.number_count_resets += 1;
        }
        self.feedback_message = "";
    }

    fn feedback_message(&self) -> &str {
        self.feedback_message
    }
}

/// Cycles `Running` -> `Success` -> `Failure`.
///
/// The opening `Running` phase lasts `period` ticks; every later phase, the
/// flipping tick included, lasts `period + 1`.
#[derive(Debug, Clone)]
pub struct Periodic {
    count: u32,
    period: u32,
    response: Status,
    feedback_message: &'static str,
}

impl Periodic {
    pub fn new(period: u32) -> Self {
        Self {
            count: 0,
            period,
            response: Status::Running,
            feedback_message: "",
        }
    }
}

impl Behavior for Periodic {
    fn update(&mut self) -> Status {
        self.count += 1;
        if self.count > self.period {
            (self.response, self.feedback_message) = match self.response {
                Status::Failure => (Status::Running, "flip to running"),
                Status::Running => (Status::Success, "flip to success"),
                _ => (Status::Failure, "flip to failure"),
            };
            self.count = 0;
        } else {
            self.feedback_message = "constant";
        }
        self.response
    }

    fn feedback_message(&self) -> &str {
        self.feedback_message
    }
}

/// Succeeds on every `n`-th update and fails otherwise.
#[derive(Debug, Clone)]
pub struct SuccessEveryN {
    count: u32,
    every_n: u32,
    feedback_message: &'static str,
}

impl SuccessEveryN {
    /// `n` is clamped to at least one.
    pub fn new(n: u32) -> Self {
        Self {
            count: 0,
            every_n: n.max(1),
            feedback_message: "",
        }
    }
}

impl Behavior for SuccessEveryN {
    fn update(&mut self) -> Status {
        self.count = self.count % self.every_n + 1;
        if self.count == self.every_n {
            self.feedback_message = "now";
            Status::Success
        } else {
            self.feedback_message = "not yet";
            Status::Failure
        }
    }

    fn feedback_message(&self) -> &str {
        self.feedback_message
    }
}
