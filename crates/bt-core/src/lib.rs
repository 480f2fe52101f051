//! Behavior tree execution engine with a live, mutable tree manager.
//!
//! Trees are assembled from [`Node`]s and re-evaluated ("ticked") at a fixed
//! rate. Each tick yields one of four [`Status`] values per visited node.
//!
//! - **Cooperative and deterministic**: a tick is a single synchronous,
//!   depth-first traversal; a RUNNING node is simply not re-initialised next tick
//! - **Strict ownership**: every node owns its children; parent links are
//!   plain [`NodeId`]s
//! - **Safe live mutation**: [`BehaviorTree`] prunes, replaces and inserts
//!   subtrees between ticks, invalidating anything it detaches
//!
//! # Architecture
//!
//! - [`Behavior`]: contract implemented by user leaves
//! - [`Status`]: Invalid, Running, Success or Failure
//! - Composite nodes: [`CompositePolicy::Sequence`], [`CompositePolicy::Selector`]
//! - Decorator nodes: [`DecoratorPolicy`] (Inverter, OneShot, Timeout, ...)
//! - [`BehaviorTree`]: owns a root, ticks it, runs [`Visitor`]s, mutates structure
//!
//! ```
//! use bt_core::behaviours::Count;
//! use bt_core::builder::{leaf, selector};
//! use bt_core::{BehaviorTree, Status};
//!
//! let mut tree = BehaviorTree::new(selector(vec![leaf(Count::new(1, 1, 10))]));
//! assert_eq!(tree.tick(), Status::Failure);
//! assert_eq!(tree.tick(), Status::Success);
//! ```

pub mod behavior;
pub mod behaviours;
pub mod builder;
pub mod composite;
pub mod decorator;
pub mod error;
pub mod node;
pub mod status;
pub mod tree;
pub mod visitor;

// Re-export core types for ergonomic API
pub use behavior::Behavior;
pub use composite::{Composite, CompositePolicy};
pub use decorator::{Decorator, DecoratorPolicy};
pub use error::{Result, TreeError};
pub use node::{Iter, Node, NodeId};
pub use status::Status;
pub use tree::{BehaviorTree, InterruptHandle};
pub use visitor::{DebugVisitor, SnapshotVisitor, Visitor};
