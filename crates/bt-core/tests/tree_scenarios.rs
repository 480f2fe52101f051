//! Multi-tick scenarios driven through the tree manager.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bt_core::behaviours::{Count, Failure, Running, Success};
use bt_core::{
    BehaviorTree, DebugVisitor, DecoratorPolicy, Node, NodeId, SnapshotVisitor, Status, TreeError,
};

// ============================================================================
// Helpers
// ============================================================================

fn count(name: &str, fail_until: u32, running_until: u32, success_until: u32) -> Node {
    Node::leaf(Count::new(fail_until, running_until, success_until)).named(name)
}

fn sticky_count(name: &str, fail_until: u32, running_until: u32, success_until: u32) -> Node {
    Node::leaf(Count::new(fail_until, running_until, success_until).with_reset(false)).named(name)
}

fn status(tree: &BehaviorTree, id: NodeId) -> Status {
    tree.node(id).map(Node::status).unwrap_or_default()
}

fn counter(tree: &BehaviorTree, id: NodeId) -> &Count {
    tree.node(id)
        .and_then(Node::behavior::<Count>)
        .expect("node is a Count leaf")
}

fn tick_n(tree: &mut BehaviorTree, ticks: usize) {
    for _ in 0..ticks {
        tree.tick();
    }
}

fn tip_name(tree: &BehaviorTree) -> Option<String> {
    tree.tip()
        .and_then(|id| tree.node(id))
        .map(|node| node.name().to_owned())
}

/// Selector [A, Sequence [B, C], D], all default counters.
struct Standard {
    tree: BehaviorTree,
    a: NodeId,
    sequence: NodeId,
    b: NodeId,
    c: NodeId,
    d: NodeId,
}

fn standard_tree() -> Standard {
    let a = Node::leaf(Count::default()).named("A");
    let b = Node::leaf(Count::default()).named("B");
    let c = Node::leaf(Count::default()).named("C");
    let d = Node::leaf(Count::default()).named("D");
    let (a_id, b_id, c_id, d_id) = (a.id(), b.id(), c.id(), d.id());
    let sequence = Node::sequence(vec![b, c]).named("Sequence");
    let sequence_id = sequence.id();
    let root = Node::selector(vec![a, sequence, d]).named("Root");

    Standard {
        tree: BehaviorTree::new(root),
        a: a_id,
        sequence: sequence_id,
        b: b_id,
        c: c_id,
        d: d_id,
    }
}

// ============================================================================
// Composites
// ============================================================================

#[test]
fn selector_composite() {
    let a = Node::leaf(Count::default()).named("A");
    let b = Node::leaf(Count::default()).named("B");
    let c = count("C", 0, 3, 15);
    let (a_id, b_id, c_id) = (a.id(), b.id(), c.id());
    let mut tree = BehaviorTree::new(Node::selector(vec![a, b, c]));
    tree.add_visitor(DebugVisitor);

    tick_n(&mut tree, 3);
    assert_eq!(counter(&tree, a_id).count(), 3);
    assert_eq!(status(&tree, a_id), Status::Failure);
    assert_eq!(status(&tree, c_id), Status::Running);
    assert_eq!(counter(&tree, c_id).number_count_resets(), 0);

    tick_n(&mut tree, 1);
    assert_eq!(status(&tree, a_id), Status::Running);
    assert_eq!(status(&tree, b_id), Status::Invalid);
    assert_eq!(status(&tree, c_id), Status::Invalid);
    assert_eq!(counter(&tree, c_id).number_count_resets(), 1);
}

#[test]
fn sequence_composite() {
    let a = count("A", 0, 3, 6);
    let b = count("B", 0, 3, 6);
    let c = count("C", 0, 3, 6);
    let (a_id, b_id, c_id) = (a.id(), b.id(), c.id());
    let mut tree = BehaviorTree::new(Node::sequence(vec![a, b, c]));
    let root = tree.root().id();

    tick_n(&mut tree, 5);
    assert_eq!(status(&tree, a_id), Status::Success);
    assert_eq!(status(&tree, b_id), Status::Running);
    assert_eq!(status(&tree, root), Status::Running);

    tick_n(&mut tree, 5);
    assert_eq!(status(&tree, a_id), Status::Success);
    assert_eq!(status(&tree, b_id), Status::Success);
    assert_eq!(status(&tree, c_id), Status::Success);
    assert_eq!(status(&tree, root), Status::Success);

    // Re-entry restarts from the first child
    tick_n(&mut tree, 3);
    assert_eq!(status(&tree, a_id), Status::Running);
    assert_eq!(status(&tree, b_id), Status::Invalid);
    assert_eq!(status(&tree, c_id), Status::Invalid);
    assert_eq!(status(&tree, root), Status::Running);
}

#[test]
fn mixed_tree() {
    let a = sticky_count("A", 3, 5, 7);
    let b = sticky_count("B", 0, 3, 5);
    let c = sticky_count("C", 0, 3, 5);
    let d = count("D", 0, 3, 15);
    let (a_id, b_id, c_id, d_id) = (a.id(), b.id(), c.id(), d.id());
    let sequence = Node::sequence(vec![b, c]);
    let sequence_id = sequence.id();
    let mut tree = BehaviorTree::new(Node::selector(vec![a, sequence, d]));
    let root = tree.root().id();

    tick_n(&mut tree, 2);
    assert_eq!(status(&tree, a_id), Status::Failure);
    assert_eq!(status(&tree, sequence_id), Status::Running);
    assert_eq!(status(&tree, b_id), Status::Running);
    assert_eq!(status(&tree, root), Status::Running);

    tick_n(&mut tree, 7);
    assert_eq!(status(&tree, a_id), Status::Failure);
    assert_eq!(status(&tree, sequence_id), Status::Running);
    assert_eq!(status(&tree, c_id), Status::Running);
    assert_eq!(status(&tree, root), Status::Running);

    tick_n(&mut tree, 2);
    assert_eq!(status(&tree, a_id), Status::Failure);
    assert_eq!(status(&tree, sequence_id), Status::Success);
    assert_eq!(status(&tree, c_id), Status::Success);
    assert_eq!(status(&tree, root), Status::Success);

    tick_n(&mut tree, 2);
    assert_eq!(status(&tree, a_id), Status::Failure);
    assert_eq!(status(&tree, sequence_id), Status::Failure);
    assert_eq!(status(&tree, b_id), Status::Failure);
    assert_eq!(status(&tree, d_id), Status::Running);
    assert_eq!(status(&tree, root), Status::Running);
}

#[test]
fn success_failure_tree() {
    let failure = Node::leaf(Failure).named("Failure");
    let failure2 = Node::decorate(DecoratorPolicy::Inverter, Node::leaf(Success)).named("Failure2");
    let success = Node::leaf(Success).named("Success");
    let ids = [failure.id(), failure2.id(), success.id()];
    let mut tree = BehaviorTree::new(Node::selector(vec![failure, failure2, success]));

    assert_eq!(tree.tick(), Status::Success);
    assert_eq!(status(&tree, ids[0]), Status::Failure);
    assert_eq!(status(&tree, ids[1]), Status::Failure);
    assert_eq!(status(&tree, ids[2]), Status::Success);
}

/// Selector [A, B, C]: A fails for its first N ticks and then succeeds, B and
/// C would otherwise run indefinitely.
#[test]
fn selector_locks_onto_first_success() {
    const N: u32 = 3;
    let a = count("A", N, N, 100);
    let b = count("B", 0, 100, 200);
    let c = count("C", 0, 100, 200);
    let (a_id, b_id, c_id) = (a.id(), b.id(), c.id());
    let mut tree = BehaviorTree::new(Node::selector(vec![a, b, c]));

    for _ in 0..N {
        assert_eq!(tree.tick(), Status::Running);
        assert_eq!(status(&tree, a_id), Status::Failure);
        assert_eq!(status(&tree, b_id), Status::Running);
    }
    let b_updates = counter(&tree, b_id).number_updated();

    assert_eq!(tree.tick(), Status::Success);
    assert_eq!(status(&tree, a_id), Status::Success);
    assert_eq!(counter(&tree, b_id).number_updated(), b_updates);
    assert_eq!(status(&tree, b_id), Status::Invalid);
    assert_eq!(counter(&tree, c_id).number_updated(), 0);
    assert_eq!(tip_name(&tree).as_deref(), Some("A"));
}

#[test]
fn higher_priority_success_invalidates_running_sibling() {
    let a = count("A", 2, 2, 10);
    let c = count("C", 0, 10, 20);
    let (a_id, c_id) = (a.id(), c.id());
    let mut tree = BehaviorTree::new(Node::selector(vec![a, Node::leaf(Failure), c]));

    tick_n(&mut tree, 2);
    assert_eq!(status(&tree, c_id), Status::Running);

    tick_n(&mut tree, 1);
    assert_eq!(status(&tree, a_id), Status::Success);
    assert_eq!(status(&tree, c_id), Status::Invalid);
    assert_eq!(counter(&tree, c_id).number_count_resets(), 1);
}

#[test]
fn panicking_leaf_does_not_abort_the_tick() {
    struct Broken;
    impl bt_core::Behavior for Broken {
        fn update(&mut self) -> Status {
            panic!("driver fault");
        }
    }

    let broken = Node::leaf(Broken);
    let broken_id = broken.id();
    let mut tree = BehaviorTree::new(Node::selector(vec![broken, Node::leaf(Success)]));

    assert_eq!(tree.tick(), Status::Success);
    assert_eq!(status(&tree, broken_id), Status::Invalid);
    let feedback = tree.node(broken_id).map(Node::feedback_message);
    assert_eq!(feedback, Some("update panicked: driver fault"));
}

// ============================================================================
// Traversal and visitors
// ============================================================================

#[test]
fn full_iteration() {
    let standard = standard_tree();
    assert_eq!(standard.tree.root().iter().count(), 6);
    assert_eq!(standard.tree.node_count(), 6);

    let names: Vec<_> = standard.tree.root().iter().map(Node::name).collect();
    assert_eq!(names, ["A", "B", "C", "Sequence", "D", "Root"]);
}

#[test]
fn partial_visitor_sees_ticked_nodes_descendants_first() {
    let Standard {
        mut tree,
        a,
        sequence,
        b,
        d,
        ..
    } = standard_tree();
    let root = tree.root().id();
    tree.add_visitor(SnapshotVisitor::new());

    tree.tick();
    let snapshot = tree.visitor::<SnapshotVisitor>().expect("registered");
    // B fails, so the sequence fails before reaching C
    assert_eq!(snapshot.order(), [a, b, sequence, d, root]);
    assert_eq!(snapshot.visited()[&b], Status::Failure);
    assert!(snapshot.changed());
}

#[test]
fn full_visitor_sees_every_node() {
    let Standard { mut tree, c, .. } = standard_tree();
    tree.add_visitor(SnapshotVisitor::new().full_tree());

    tree.tick();
    let snapshot = tree.visitor::<SnapshotVisitor>().expect("registered");
    assert_eq!(snapshot.order().len(), 6);
    assert_eq!(snapshot.visited()[&c], Status::Invalid);
}

#[test]
fn snapshot_reports_steady_state() {
    let mut tree = BehaviorTree::new(Node::sequence(vec![Node::leaf(Running)]));
    tree.add_visitor(SnapshotVisitor::new());

    tree.tick();
    assert!(tree.visitor::<SnapshotVisitor>().is_some_and(SnapshotVisitor::changed));
    tree.tick();
    assert!(!tree.visitor::<SnapshotVisitor>().is_some_and(SnapshotVisitor::changed));
}

#[test]
fn tick_handlers_bracket_each_tick() {
    let mut tree = BehaviorTree::new(Node::leaf(Success));
    let seen = Arc::new(AtomicU64::new(0));

    let pre = Arc::clone(&seen);
    tree.add_pre_tick_handler(move |tree| {
        assert_eq!(tree.count(), pre.load(Ordering::SeqCst));
    });
    let post = Arc::clone(&seen);
    tree.add_post_tick_handler(move |tree| {
        post.store(tree.count(), Ordering::SeqCst);
    });

    tick_n(&mut tree, 3);
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

// ============================================================================
// Tip
// ============================================================================

#[test]
fn tip_simple() {
    let a = count("A", 0, 1, 100);
    let b = count("B", 0, 1, 100);
    let (a_id, b_id) = (a.id(), b.id());
    let mut tree = BehaviorTree::new(Node::sequence(vec![a, b]));
    tree.add_visitor(DebugVisitor);

    assert!(tree.root().tip().is_none());
    assert!(tree.node(a_id).and_then(Node::tip).is_none());
    assert!(tree.node(b_id).and_then(Node::tip).is_none());

    tree.tick();
    assert_eq!(status(&tree, a_id), Status::Running);
    assert_eq!(status(&tree, b_id), Status::Invalid);
    assert_eq!(tree.tip(), Some(a_id));
    assert_eq!(tree.node(a_id).and_then(Node::tip).map(Node::id), Some(a_id));
    assert!(tree.node(b_id).and_then(Node::tip).is_none());

    tree.tick();
    assert_eq!(status(&tree, a_id), Status::Success);
    assert_eq!(status(&tree, b_id), Status::Running);
    assert_eq!(tree.tip(), Some(b_id));
    assert_eq!(tree.node(a_id).and_then(Node::tip).map(Node::id), Some(a_id));

    tree.tick();
    assert_eq!(status(&tree, b_id), Status::Success);
    assert_eq!(tree.tip(), Some(b_id));
}

#[test]
fn tip_complex() {
    let a = sticky_count("A", 1, 0, 10);
    let b = count("B", 0, 1, 10);
    let c = count("C", 0, 2, 10);
    let d = count("D", 0, 1, 10);
    let (a_id, b_id, c_id, d_id) = (a.id(), b.id(), c.id(), d.id());
    let sequence1 = Node::sequence(vec![a, b]);
    let sequence2 = Node::sequence(vec![c, d]);
    let (seq1_id, seq2_id) = (sequence1.id(), sequence2.id());
    let mut tree = BehaviorTree::new(Node::selector(vec![sequence1, sequence2]));
    let tip_of = |tree: &BehaviorTree, id| tree.node(id).and_then(Node::tip).map(Node::id);

    tree.tick();
    assert_eq!(status(&tree, a_id), Status::Failure);
    assert_eq!(status(&tree, b_id), Status::Invalid);
    assert_eq!(status(&tree, c_id), Status::Running);
    assert_eq!(status(&tree, d_id), Status::Invalid);
    assert_eq!(tip_of(&tree, seq1_id), Some(a_id));
    assert_eq!(tip_of(&tree, seq2_id), Some(c_id));
    assert_eq!(tree.tip(), Some(c_id));

    tree.tick();
    assert_eq!(status(&tree, a_id), Status::Success);
    assert_eq!(status(&tree, b_id), Status::Running);
    assert_eq!(status(&tree, c_id), Status::Invalid);
    assert_eq!(status(&tree, d_id), Status::Invalid);
    assert_eq!(tip_of(&tree, seq1_id), Some(b_id));
    assert_eq!(tip_of(&tree, seq2_id), None);
    assert_eq!(tree.tip(), Some(b_id));
}

#[test]
fn failed_tree_tip_is_last_child() {
    let mut tree = BehaviorTree::new(Node::selector(vec![
        Node::leaf(Failure).named("Failure 1"),
        Node::leaf(Failure).named("Failure 2"),
        Node::leaf(Failure).named("Failure 3"),
    ]));
    assert_eq!(tree.tick(), Status::Failure);
    assert_eq!(tip_name(&tree).as_deref(), Some("Failure 3"));
}

#[test]
fn tip_through_decorators() {
    let leaf = Node::leaf(Running);
    let leaf_id = leaf.id();
    let mut tree = BehaviorTree::new(Node::decorate(
        DecoratorPolicy::Timeout(Duration::from_secs(3600)),
        Node::decorate(DecoratorPolicy::Inverter, leaf),
    ));
    tree.tick();
    assert_eq!(tree.tip(), Some(leaf_id));
}

// ============================================================================
// Structural mutation
// ============================================================================

#[test]
fn prune_behaviour_tree() {
    let Standard {
        mut tree,
        sequence,
        c,
        ..
    } = standard_tree();
    let root = tree.root().id();
    let children = |tree: &BehaviorTree, id| tree.node(id).map(|n| n.children().len());

    assert_eq!(children(&tree, sequence), Some(2));
    let pruned = tree.prune_subtree(c).unwrap();
    assert_eq!(pruned.id(), c);
    assert_eq!(pruned.parent(), None);
    assert_eq!(children(&tree, sequence), Some(1));
    assert!(!tree.contains(c));

    let pruned = tree.prune_subtree(sequence).unwrap();
    assert_eq!(pruned.iter().count(), 2);
    assert_eq!(children(&tree, root), Some(2));
    assert_eq!(tree.node_count(), 3);
}

#[test]
fn prune_running_subtree_invalidates_it() {
    let Standard {
        mut tree,
        a,
        sequence,
        ..
    } = standard_tree();
    tick_n(&mut tree, 4);
    assert_eq!(status(&tree, a), Status::Running);

    let pruned = tree.prune_subtree(a).unwrap();
    assert_eq!(pruned.status(), Status::Invalid);
    assert_eq!(tree.tip(), None);

    // The sequence now has the highest priority
    tree.tick();
    assert!(status(&tree, sequence) != Status::Invalid);
}

#[test]
fn replace_behaviour_tree() {
    let Standard {
        mut tree, sequence, ..
    } = standard_tree();
    let root = tree.root().id();

    let replacement = Node::sequence(vec![
        Node::leaf(Count::default()).named("E"),
        Node::leaf(Count::default()).named("F"),
        Node::leaf(Count::default()).named("G"),
    ])
    .named("Sequence2");
    let replacement_id = replacement.id();

    let old = tree.replace_subtree(sequence, replacement).unwrap();
    assert_eq!(old.name(), "Sequence");
    assert_eq!(old.children().len(), 2);

    let root_node = tree.root();
    assert_eq!(root_node.children().len(), 3);
    assert_eq!(root_node.children()[1].id(), replacement_id);
    assert_eq!(
        tree.node(replacement_id).map(|n| n.children().len()),
        Some(3)
    );
    assert_eq!(tree.node(replacement_id).and_then(Node::parent), Some(root));
    assert_eq!(tree.node_count(), 7);
}

#[test]
fn insert_subtree_into_composite() {
    let Standard {
        mut tree,
        sequence,
        b,
        ..
    } = standard_tree();

    let first = Node::leaf(Success).named("First");
    let id = tree.insert_subtree(first, sequence, 0).unwrap();

    assert!(tree.contains(id));
    assert_eq!(tree.node(id).and_then(Node::parent), Some(sequence));
    assert_eq!(
        tree.node(sequence).map(|n| n.children()[1].id()),
        Some(b)
    );
    assert_eq!(tree.node_count(), 7);

    let err = tree
        .insert_subtree(Node::leaf(Success), sequence, 9)
        .unwrap_err();
    assert_eq!(err.error_code(), "TREE_INVALID_ARGUMENT");
}

#[test]
fn tree_errors() {
    let mut tree = BehaviorTree::new(Node::leaf(Success));
    let root = tree.root().id();

    let err = tree.prune_subtree(root).unwrap_err();
    assert!(matches!(err, TreeError::InvalidOperation(_)));
    assert!(err.to_string().contains("prune"));

    let err = tree.replace_subtree(root, Node::leaf(Success)).unwrap_err();
    assert!(matches!(err, TreeError::InvalidOperation(_)));
    assert!(err.to_string().contains("replace"));

    let err = tree.insert_subtree(Node::leaf(Success), root, 0).unwrap_err();
    assert!(matches!(err, TreeError::TypeMismatch { .. }));
    assert!(err.to_string().contains("Composite"));

    // Nothing was committed
    assert_eq!(tree.node_count(), 1);
}

#[test]
fn set_root_hands_back_invalidated_root() {
    let Standard { mut tree, a, .. } = standard_tree();
    tick_n(&mut tree, 4);
    assert_eq!(status(&tree, a), Status::Running);

    let leaf = Node::leaf(Success);
    let leaf_id = leaf.id();
    let old = tree.set_root(leaf);

    assert_eq!(old.status(), Status::Invalid);
    assert!(old.iter().all(|node| node.status().is_invalid()));
    assert!(!tree.contains(a));
    assert_eq!(tree.tip(), None);
    assert_eq!(tree.tick(), Status::Success);
    assert_eq!(tree.tip(), Some(leaf_id));
}

// ============================================================================
// Tick-tock
// ============================================================================

#[test]
fn tick_tock_behaviour_tree() {
    let Standard { mut tree, a, .. } = standard_tree();
    tree.add_visitor(DebugVisitor);

    let mut pre_ticks = 0;
    let mut pre = |_: &BehaviorTree| pre_ticks += 1;
    let ticks = tree.tick_tock(Duration::from_millis(5), Some(5), Some(&mut pre), None);

    assert_eq!(ticks, 5);
    assert_eq!(pre_ticks, 5);
    assert_eq!(tree.count(), 5);
    assert_eq!(status(&tree, a), Status::Running);
}

#[test]
fn tick_tock_stops_when_interrupted() {
    let mut tree = BehaviorTree::new(Node::leaf(Running));
    let handle = tree.interrupt_handle();
    let interrupter = handle.clone();
    tree.add_post_tick_handler(move |tree| {
        if tree.count() == 3 {
            interrupter.interrupt();
        }
    });

    let ticks = tree.tick_tock(Duration::from_millis(1), None, None, None);
    assert_eq!(ticks, 3);
    assert!(!handle.is_interrupted());

    let mut post_ticks = 0;
    let mut post = |_: &BehaviorTree| post_ticks += 1;
    let ticks = tree.tick_tock(Duration::ZERO, Some(2), None, Some(&mut post));
    assert_eq!(ticks, 2);
    assert_eq!(post_ticks, 2);
}
