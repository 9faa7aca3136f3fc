use nalgebra::DMatrix;
use serde::{Serialize, Deserialize};

use super::error::{Error, Result};
use crate::time::ClockErrors;

/// Per-node measurement buffer handed to a controller at every poll.
///
/// The three port-indexed vectors always have the node's in-degree as their
/// length. The buffer is allocated once and overwritten in place by the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Buffer occupancy per incoming port, in port-index order
    pub occupancies: Vec<f64>,
    /// Phase at the most recent instant of frequency change
    pub theta_at_iofc: f64,
    /// Wall-clock time at the most recent instant of measurement
    pub physical_time_at_iom: f64,
    /// Link status per incoming port (1 = up, 0 = down)
    pub incoming_link_status: Vec<u8>,
}

impl Measurement {
    /// Creates a zeroed measurement with every incoming link up
    pub fn new(in_degree: usize) -> Self {
        Measurement {
            occupancies: vec![0.0; in_degree],
            theta_at_iofc: 0.0,
            physical_time_at_iom: 0.0,
            incoming_link_status: vec![super::LINK_UP; in_degree],
        }
    }

    /// Number of incoming ports this measurement covers
    pub fn in_degree(&self) -> usize {
        self.occupancies.len()
    }

    /// Marks an incoming port up or down
    pub fn set_link_status(&mut self, port: usize, up: bool) -> Result<()> {
        let status = self.incoming_link_status.get_mut(port).ok_or_else(|| {
            Error::precondition(format!("Port {} out of range for in-degree {}", port, self.occupancies.len()))
        })?;
        *status = if up { super::LINK_UP } else { super::LINK_DOWN };
        Ok(())
    }

    /// Copies fresh occupancies into the buffer without reallocating
    pub fn update(&mut self, occupancies: &[f64], theta: f64, physical_time: f64) -> Result<()> {
        if occupancies.len() != self.occupancies.len() {
            return Err(Error::precondition(format!(
                "Expected {} occupancies, got {}",
                self.occupancies.len(),
                occupancies.len()
            )));
        }
        self.occupancies.copy_from_slice(occupancies);
        self.theta_at_iofc = theta;
        self.physical_time_at_iom = physical_time;
        Ok(())
    }
}

/// A directed link between two nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: usize,
    pub destination: usize,
    /// Index of this edge among the destination's incoming ports
    pub in_port: usize,
}

/// Read-only view of a directed multigraph of nodes and links
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    node_count: usize,
    edges: Vec<Edge>,
}

impl Topology {
    /// Builds a topology from (source, destination) pairs.
    ///
    /// In-ports are numbered at each destination in the order its incoming
    /// edges appear.
    pub fn from_edges(node_count: usize, pairs: &[(usize, usize)]) -> Result<Self> {
        let mut next_port = vec![0usize; node_count];
        let mut edges = Vec::with_capacity(pairs.len());

        for &(source, destination) in pairs {
            if source >= node_count || destination >= node_count {
                return Err(Error::config(format!(
                    "Edge {} -> {} references a node outside 0..{}",
                    source, destination, node_count
                )));
            }
            edges.push(Edge {
                source,
                destination,
                in_port: next_port[destination],
            });
            next_port[destination] += 1;
        }

        Ok(Topology { node_count, edges })
    }

    /// Builds a topology where every pair of distinct nodes is linked both ways
    pub fn complete(node_count: usize) -> Self {
        let mut edges = Vec::with_capacity(node_count * node_count.saturating_sub(1));
        for destination in 0..node_count {
            let sources = (0..node_count).filter(|&s| s != destination);
            for (in_port, source) in sources.enumerate() {
                edges.push(Edge { source, destination, in_port });
            }
        }
        Topology { node_count, edges }
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge(&self, index: usize) -> Option<&Edge> {
        self.edges.get(index)
    }

    /// Incoming edges of a node, ordered by in-port
    pub fn incoming(&self, node: usize) -> Vec<&Edge> {
        let mut incoming: Vec<&Edge> = self.edges.iter()
            .filter(|e| e.destination == node)
            .collect();
        incoming.sort_by_key(|e| e.in_port);
        incoming
    }

    pub fn in_degree(&self, node: usize) -> usize {
        self.edges.iter().filter(|e| e.destination == node).count()
    }

    /// Linearized consensus generator of this topology.
    ///
    /// Every edge `s -> d` adds `weight` to `Q[d][s]`; diagonals make each row
    /// sum to zero.
    pub fn rate_matrix(&self, weight: f64) -> DMatrix<f64> {
        let n = self.node_count;
        let mut q = DMatrix::zeros(n, n);
        for edge in &self.edges {
            if edge.source != edge.destination {
                q[(edge.destination, edge.source)] += weight;
            }
        }
        for i in 0..n {
            let row_sum: f64 = (0..n).filter(|&j| j != i).map(|j| q[(i, j)]).sum();
            q[(i, i)] = -row_sum;
        }
        q
    }
}

/// Which occupancy reducer feeds a node's PI stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReducerKind {
    /// Sum over every incoming port of the node
    Node,
    /// A single incoming port, identified by in-port index
    Edge { port: usize },
}

/// Controller gains and timing shared by every node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Proportional gain
    pub kp: f64,
    /// Integral gain before poll-period normalization
    pub ki: f64,
    /// Local ticks between controller invocations
    pub poll_period: f64,
    /// Reference tick rate used to normalize the integral gain
    pub base_freq: f64,
    /// Occupancy each port is steered towards
    pub offset: f64,
    pub reducer: ReducerKind,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            kp: 2e-8,
            ki: 1e-15,
            poll_period: 1.0,
            base_freq: 1.0,
            offset: 0.0,
            reducer: ReducerKind::Node,
        }
    }
}

/// Per-run configuration consumed read-only by the core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub controller: ControllerConfig,
    /// Clock error model per node
    pub errors: ClockErrors,
    /// Link latency in wall-clock units
    pub latency: f64,
    /// Simulation horizon in wall-clock units
    pub tmax: f64,
    /// Initial phase of every node
    pub theta0: f64,
    /// Lower bound on effective frequency used by the time mapper
    pub wmin: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            controller: ControllerConfig::default(),
            errors: ClockErrors::default(),
            latency: 0.0,
            tmax: 1.0,
            theta0: 0.0,
            wmin: 0.1,
        }
    }
}

impl Config {
    /// Checks that the configuration is usable for a topology of `node_count` nodes
    pub fn validate(&self, node_count: usize) -> Result<()> {
        let c = &self.controller;
        if !c.poll_period.is_finite() || c.poll_period <= 0.0 {
            return Err(Error::config("Poll period must be positive"));
        }
        if !c.base_freq.is_finite() || c.base_freq <= 0.0 {
            return Err(Error::config("Base frequency must be positive"));
        }
        if !self.wmin.is_finite() || self.wmin <= 0.0 {
            return Err(Error::config("wmin must be positive"));
        }
        if self.latency < 0.0 || self.tmax < 0.0 {
            return Err(Error::config("Latency and tmax must be non-negative"));
        }
        for node in 0..node_count {
            self.errors.model_for(node)?;
        }
        Ok(())
    }
}
