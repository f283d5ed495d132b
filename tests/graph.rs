//! Tests for graph construction, wiring rules, and node deletion.

mod common;

use common::*;
use nodeflow::*;

// ===========================================================================
// Wiring
// ===========================================================================

#[test]
fn nodes_start_with_unbound_inputs() {
    let registry = registry();
    let node = pure_node(&registry, "mul");
    assert_eq!(node.inputs, vec![Wire::Unbound, Wire::Unbound]);
    assert_eq!(node.flow_next, None);
}

#[test]
fn connect_data_links_matching_types() {
    let registry = registry();
    let mut graph = Graph::new();
    let product = graph.add(pure_node(&registry, "mul"));
    let sum = graph.add(pure_node(&registry, "add"));
    graph.connect_data((product, 0), (sum, 0)).unwrap();
    assert_eq!(
        graph.nodes[sum].inputs[0],
        Wire::Link {
            node: product,
            pin: 0
        }
    );
}

#[test]
fn connect_data_rejects_type_mismatch() {
    let registry = registry();
    let mut graph = Graph::new();
    let product = graph.add(pure_node(&registry, "mul"));
    let scaled = graph.add(pure_node(&registry, "scale"));
    // i32 output into an f32 input
    let err = graph.connect_data((product, 0), (scaled, 0)).unwrap_err();
    assert!(matches!(err, NodeflowError::TypeMismatch { .. }));
    assert_eq!(graph.nodes[scaled].inputs[0], Wire::Unbound);
}

#[test]
fn connect_data_rejects_missing_pins() {
    let registry = registry();
    let mut graph = Graph::new();
    let product = graph.add(pure_node(&registry, "mul"));
    let show = graph.add(call_node(&registry, "print_int"));
    assert!(graph.connect_data((product, 5), (show, 0)).is_err());
    assert!(graph.connect_data((product, 0), (show, 7)).is_err());
    assert!(graph.connect_data((99, 0), (show, 0)).is_err());
}

#[test]
fn last_connection_wins_on_an_input() {
    let registry = registry();
    let mut graph = Graph::new();
    let first = graph.add(pure_node(&registry, "mul"));
    let second = graph.add(pure_node(&registry, "add"));
    let sink = graph.add(call_node(&registry, "print_int"));
    graph.connect_data((first, 0), (sink, 0)).unwrap();
    graph.connect_data((second, 0), (sink, 0)).unwrap();
    assert_eq!(
        graph.nodes[sink].inputs[0],
        Wire::Link {
            node: second,
            pin: 0
        }
    );
}

#[test]
fn immediates_replace_links() {
    let registry = registry();
    let mut graph = Graph::new();
    let product = graph.add(pure_node(&registry, "mul"));
    let sum = graph.add(pure_node(&registry, "add"));
    graph.connect_data((product, 0), (sum, 0)).unwrap();
    graph.set_immediate(sum, 0, "5").unwrap();
    assert_eq!(graph.nodes[sum].inputs[0], Wire::Immediate("5".into()));
    graph.disconnect(sum, 0).unwrap();
    assert_eq!(graph.nodes[sum].inputs[0], Wire::Unbound);
}

// ===========================================================================
// Flow wiring
// ===========================================================================

#[test]
fn connect_flow_chains_sequenced_nodes() {
    let registry = registry();
    let mut graph = Graph::new();
    let start = graph.add(event_node("Start"));
    let show = graph.add(call_node(&registry, "print_int"));
    graph.connect_flow(start, show).unwrap();
    assert_eq!(graph.nodes[start].flow_next, Some(show));
    graph.clear_flow(start).unwrap();
    assert_eq!(graph.nodes[start].flow_next, None);
}

#[test]
fn connect_flow_rejects_pure_endpoints() {
    let registry = registry();
    let mut graph = Graph::new();
    let start = graph.add(event_node("Start"));
    let product = graph.add(pure_node(&registry, "mul"));
    let show = graph.add(call_node(&registry, "print_int"));
    // A pure node has no flow pins on either side
    assert!(graph.connect_flow(start, product).is_err());
    assert!(graph.connect_flow(product, show).is_err());
    // An event has no flow input
    assert!(graph.connect_flow(show, start).is_err());
}

// ===========================================================================
// Deletion
// ===========================================================================

#[test]
fn delete_node_unbinds_and_shifts_references() {
    let registry = registry();
    let mut graph = Graph::new();
    let start = graph.add(event_node("Start"));
    let product = graph.add(pure_node(&registry, "mul"));
    let sum = graph.add(pure_node(&registry, "add"));
    let show = graph.add(call_node(&registry, "print_int"));
    graph.connect_data((product, 0), (sum, 0)).unwrap();
    graph.connect_data((sum, 0), (show, 0)).unwrap();
    graph.connect_flow(start, show).unwrap();

    graph.delete_node(product);

    // The link into the deleted node is unbound, everything past it shifts
    let sum = sum - 1;
    let show = show - 1;
    assert_eq!(graph.nodes[sum].inputs[0], Wire::Unbound);
    assert_eq!(
        graph.nodes[show].inputs[0],
        Wire::Link { node: sum, pin: 0 }
    );
    assert_eq!(graph.nodes[start].flow_next, Some(show));
}

#[test]
fn delete_node_clears_flow_links_to_it() {
    let registry = registry();
    let mut graph = Graph::new();
    let start = graph.add(event_node("Start"));
    let show = graph.add(call_node(&registry, "print_int"));
    graph.connect_flow(start, show).unwrap();
    graph.delete_node(show);
    assert_eq!(graph.nodes[start].flow_next, None);
}

#[test]
fn delete_out_of_range_is_ignored() {
    let mut graph = Graph::new();
    graph.add(event_node("Start"));
    graph.delete_node(10);
    assert_eq!(graph.len(), 1);
    assert!(graph.get(0).is_some());
    assert!(graph.get(1).is_none());
}
