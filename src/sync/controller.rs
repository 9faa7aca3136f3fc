use tracing::debug;

use crate::core::{ControllerConfig, Error, Measurement, ReducerKind, Result, Topology};
use super::system::{Composed, OneEdgeOutputSystem, OutputSystem, PIStateSystem, PortScoped, Reducer, StateSystem};

/// A node's controller: occupancy reducer followed by a PI stage
pub type NodeController<R = Reducer> = Composed<PIStateSystem, R>;

/// Builds the controller for `node`.
///
/// The integral gain is rescaled by `poll_period / base_freq` so the
/// closed-loop integral action does not change with the polling interval or
/// the reference tick rate.
pub fn composed_controller<R>(
    node: usize,
    graph: &Topology,
    kp: f64,
    ki: f64,
    poll_period: f64,
    base_freq: f64,
    output_system: R,
) -> Result<NodeController<R>>
where
    R: for<'a> StateSystem<&'a Measurement, Output = f64> + PortScoped,
{
    if node >= graph.node_count() {
        return Err(Error::config(format!(
            "Node {} is not part of a {}-node topology",
            node,
            graph.node_count()
        )));
    }
    if !poll_period.is_finite() || poll_period <= 0.0 {
        return Err(Error::config(format!("Poll period must be positive, got {}", poll_period)));
    }
    if !base_freq.is_finite() || base_freq <= 0.0 {
        return Err(Error::config(format!("Base frequency must be positive, got {}", base_freq)));
    }
    let in_degree = graph.in_degree(node);
    if !output_system.accepts_in_degree(in_degree) {
        return Err(Error::config(format!(
            "Reducer does not fit node {} with in-degree {}",
            node, in_degree
        )));
    }

    let ki_normalized = ki * poll_period / base_freq;
    debug!(node, kp, ki = ki_normalized, "built node controller");
    Ok(Composed::new(PIStateSystem::new(kp, ki_normalized), output_system))
}

/// Whole-node reducer steering every incoming port towards `offset`
pub fn node_output_system(node: usize, graph: &Topology, offset: f64) -> Result<OutputSystem> {
    if node >= graph.node_count() {
        return Err(Error::config(format!("Node {} is not part of the topology", node)));
    }
    Ok(OutputSystem::new(vec![offset; graph.in_degree(node)]))
}

/// Single-edge reducer for the edge at `edge_index`.
///
/// Returns the edge's destination together with the reducer, since the
/// reducer only makes sense in that node's controller.
pub fn edge_output_system(
    edge_index: usize,
    graph: &Topology,
    offset: f64,
) -> Result<(usize, OneEdgeOutputSystem)> {
    let edge = graph.edge(edge_index)
        .ok_or_else(|| Error::config(format!("No edge with index {}", edge_index)))?;
    Ok((edge.destination, OneEdgeOutputSystem::new(edge.in_port, offset)))
}

/// One controller per node, in node order
pub fn build_controllers(graph: &Topology, config: &ControllerConfig) -> Result<Vec<NodeController>> {
    (0..graph.node_count())
        .map(|node| {
            let reducer = match config.reducer {
                ReducerKind::Node => Reducer::Node(node_output_system(node, graph, config.offset)?),
                ReducerKind::Edge { port } => Reducer::Edge(OneEdgeOutputSystem::new(port, config.offset)),
            };
            composed_controller(
                node,
                graph,
                config.kp,
                config.ki,
                config.poll_period,
                config.base_freq,
                reducer,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(n: usize) -> Topology {
        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| vec![(i, (i + 1) % n), ((i + 1) % n, i)])
            .collect();
        Topology::from_edges(n, &pairs).unwrap()
    }

    #[test]
    fn test_integral_gain_is_normalized() {
        let graph = ring(3);
        let reducer = node_output_system(0, &graph, 0.0).unwrap();
        let controller = composed_controller(0, &graph, 1.0, 6.0, 2.0, 4.0, reducer).unwrap();
        assert_eq!(controller.outer().kp(), 1.0);
        assert_eq!(controller.outer().ki(), 3.0);
    }

    #[test]
    fn test_node_controller_step() {
        let graph = ring(3);
        let reducer = node_output_system(1, &graph, 2.0).unwrap();
        let mut controller = composed_controller(1, &graph, 0.5, 1.0, 1.0, 1.0, reducer).unwrap();

        let mut m = Measurement::new(graph.in_degree(1));
        m.update(&[4.0, 6.0], 0.0, 0.0).unwrap();
        // Error 2 + 4 = 6: 0.5*6 + 1*6
        assert_eq!(controller.next(&m), 9.0);
        // Integral grows to 12
        assert_eq!(controller.next(&m), 15.0);
    }

    #[test]
    fn test_mismatched_reducer_is_rejected() {
        let graph = ring(3);
        let wrong = OutputSystem::new(vec![0.0; 5]);
        assert!(matches!(
            composed_controller(0, &graph, 1.0, 1.0, 1.0, 1.0, wrong),
            Err(Error::Config(_))
        ));

        let out_of_range = OneEdgeOutputSystem::new(2, 0.0);
        assert!(composed_controller(0, &graph, 1.0, 1.0, 1.0, 1.0, out_of_range).is_err());

        let reducer = node_output_system(0, &graph, 0.0).unwrap();
        assert!(composed_controller(0, &graph, 1.0, 1.0, 1.0, 0.0, reducer.clone()).is_err());
        assert!(composed_controller(7, &graph, 1.0, 1.0, 1.0, 1.0, reducer).is_err());
    }

    #[test]
    fn test_edge_reducer_lives_at_destination() {
        let graph = Topology::from_edges(3, &[(0, 2), (1, 2)]).unwrap();
        let (destination, reducer) = edge_output_system(1, &graph, 5.0).unwrap();
        assert_eq!(destination, 2);
        assert_eq!(reducer.portnum(), 1);

        let mut controller = composed_controller(destination, &graph, 1.0, 0.0, 1.0, 1.0, reducer).unwrap();
        let mut m = Measurement::new(2);
        m.update(&[100.0, 8.0], 0.0, 0.0).unwrap();
        assert_eq!(controller.next(&m), 3.0);

        assert!(edge_output_system(9, &graph, 0.0).is_err());
    }

    #[test]
    fn test_build_controllers_from_config() {
        let graph = ring(4);
        let config = ControllerConfig {
            kp: 1.0,
            ki: 0.0,
            offset: 1.0,
            ..Default::default()
        };
        let mut controllers = build_controllers(&graph, &config).unwrap();
        assert_eq!(controllers.len(), 4);

        let mut m = Measurement::new(2);
        m.update(&[3.0, 2.0], 0.0, 0.0).unwrap();
        assert_eq!(controllers[0].next(&m), 3.0);

        let config = ControllerConfig {
            reducer: ReducerKind::Edge { port: 2 },
            ..config
        };
        assert!(build_controllers(&graph, &config).is_err());
    }
}
