use crate::core::{Measurement, LINK_DOWN};

/// A discrete-time transform that may carry internal state between steps.
///
/// `next` must be deterministic given the current state and `input`.
pub trait StateSystem<In> {
    type Output;

    /// Advances the system by one step
    fn next(&mut self, input: In) -> Self::Output;
}

impl<In, S: StateSystem<In> + ?Sized> StateSystem<In> for Box<S> {
    type Output = S::Output;

    fn next(&mut self, input: In) -> Self::Output {
        (**self).next(input)
    }
}

/// Reducers that only read a subset of a node's incoming ports
pub trait PortScoped {
    /// Whether the reducer can run on a node with this in-degree
    fn accepts_in_degree(&self, in_degree: usize) -> bool;
}

/// Proportional-integral controller.
///
/// The integral accumulates every input without clamping; there is no
/// anti-windup.
#[derive(Debug, Clone, PartialEq)]
pub struct PIStateSystem {
    kp: f64,
    ki: f64,
    running_integral: f64,
}

impl PIStateSystem {
    pub fn new(kp: f64, ki: f64) -> Self {
        PIStateSystem {
            kp,
            ki,
            running_integral: 0.0,
        }
    }

    pub fn kp(&self) -> f64 {
        self.kp
    }

    pub fn ki(&self) -> f64 {
        self.ki
    }

    /// Sum of all inputs seen so far
    pub fn integral(&self) -> f64 {
        self.running_integral
    }

    pub fn reset(&mut self) {
        self.running_integral = 0.0;
    }
}

impl StateSystem<f64> for PIStateSystem {
    type Output = f64;

    fn next(&mut self, input: f64) -> f64 {
        self.running_integral += input;
        self.kp * input + self.ki * self.running_integral
    }
}

/// Sums the offset-corrected occupancy of every incoming link that is up.
///
/// A down link contributes neither its occupancy nor its offset.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSystem {
    local_offsets: Vec<f64>,
}

impl OutputSystem {
    pub fn new(local_offsets: Vec<f64>) -> Self {
        OutputSystem { local_offsets }
    }

    pub fn local_offsets(&self) -> &[f64] {
        &self.local_offsets
    }
}

impl<'a> StateSystem<&'a Measurement> for OutputSystem {
    type Output = f64;

    fn next(&mut self, input: &'a Measurement) -> f64 {
        debug_assert_eq!(input.occupancies.len(), self.local_offsets.len());
        input.occupancies.iter()
            .zip(&self.local_offsets)
            .zip(&input.incoming_link_status)
            .filter(|&(_, &status)| status != LINK_DOWN)
            .map(|((occupancy, offset), _)| occupancy - offset)
            .sum()
    }
}

impl PortScoped for OutputSystem {
    fn accepts_in_degree(&self, in_degree: usize) -> bool {
        self.local_offsets.len() == in_degree
    }
}

/// Offset-corrected occupancy of a single incoming port.
///
/// Only meaningful at the destination node of the edge feeding `portnum`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OneEdgeOutputSystem {
    portnum: usize,
    offset: f64,
}

impl OneEdgeOutputSystem {
    pub fn new(portnum: usize, offset: f64) -> Self {
        OneEdgeOutputSystem { portnum, offset }
    }

    pub fn portnum(&self) -> usize {
        self.portnum
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }
}

impl<'a> StateSystem<&'a Measurement> for OneEdgeOutputSystem {
    type Output = f64;

    fn next(&mut self, input: &'a Measurement) -> f64 {
        input.occupancies[self.portnum] - self.offset
    }
}

impl PortScoped for OneEdgeOutputSystem {
    fn accepts_in_degree(&self, in_degree: usize) -> bool {
        self.portnum < in_degree
    }
}

/// Occupancy reducer chosen at run time
#[derive(Debug, Clone, PartialEq)]
pub enum Reducer {
    Node(OutputSystem),
    Edge(OneEdgeOutputSystem),
}

impl<'a> StateSystem<&'a Measurement> for Reducer {
    type Output = f64;

    fn next(&mut self, input: &'a Measurement) -> f64 {
        match self {
            Reducer::Node(system) => system.next(input),
            Reducer::Edge(system) => system.next(input),
        }
    }
}

impl PortScoped for Reducer {
    fn accepts_in_degree(&self, in_degree: usize) -> bool {
        match self {
            Reducer::Node(system) => system.accepts_in_degree(in_degree),
            Reducer::Edge(system) => system.accepts_in_degree(in_degree),
        }
    }
}

impl From<OutputSystem> for Reducer {
    fn from(system: OutputSystem) -> Self {
        Reducer::Node(system)
    }
}

impl From<OneEdgeOutputSystem> for Reducer {
    fn from(system: OneEdgeOutputSystem) -> Self {
        Reducer::Edge(system)
    }
}

/// Runs `inner` and feeds its output to `outer`.
///
/// Both children keep their own state across calls.
#[derive(Debug, Clone, PartialEq)]
pub struct Composed<O, I> {
    outer: O,
    inner: I,
}

impl<O, I> Composed<O, I> {
    pub fn new(outer: O, inner: I) -> Self {
        Composed { outer, inner }
    }

    pub fn outer(&self) -> &O {
        &self.outer
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }

    pub fn outer_mut(&mut self) -> &mut O {
        &mut self.outer
    }
}

impl<In, O, I> StateSystem<In> for Composed<O, I>
where
    I: StateSystem<In>,
    O: StateSystem<I::Output>,
{
    type Output = O::Output;

    fn next(&mut self, input: In) -> Self::Output {
        let reduced = self.inner.next(input);
        self.outer.next(reduced)
    }
}

impl<O, I: PortScoped> PortScoped for Composed<O, I> {
    fn accepts_in_degree(&self, in_degree: usize) -> bool {
        self.inner.accepts_in_degree(in_degree)
    }
}
