use crate::trace::Trace;
use serde::{Deserialize, Serialize};
use std::iter::StepBy;
use std::ops::Range;

/// Which trace indices are visited.
///
/// The charts this targets emit traces in pairs and only the first trace of each pair carries
/// the per-point records, so the default visits `0, 2, 4, ...` and never looks at odd indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStride {
    pub start: usize,
    pub step: usize,
}

impl TraceStride {
    pub const PAIRED: Self = Self { start: 0, step: 2 };

    pub fn indices(self, trace_count: usize) -> StepBy<Range<usize>> {
        (self.start.min(trace_count)..trace_count).step_by(self.step.max(1))
    }
}

impl Default for TraceStride {
    fn default() -> Self {
        Self::PAIRED
    }
}

/// A trace visited by [`TraceWalker`].
#[derive(Debug, Clone, Copy)]
pub struct WalkedTrace<'a> {
    pub index: usize,
    pub trace: &'a Trace,
    /// `None` when the trace exposes no recognised parallel sequence.
    pub point_count: Option<usize>,
}

impl<'a> WalkedTrace<'a> {
    pub fn points(&self) -> impl Iterator<Item = CandidatePoint<'a>> + use<'a> {
        let trace = self.trace;
        let trace_index = self.index;
        let count = self.point_count.unwrap_or(0);
        (0..count).map(move |point_index| CandidatePoint {
            trace_index,
            point_index,
            point_count: count,
            trace,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CandidatePoint<'a> {
    pub trace_index: usize,
    pub point_index: usize,
    pub point_count: usize,
    pub trace: &'a Trace,
}

/// Iterates the trace collection under a [`TraceStride`].
#[derive(Debug, Clone)]
pub struct TraceWalker<'a> {
    traces: &'a [Trace],
    indices: StepBy<Range<usize>>,
}

impl<'a> TraceWalker<'a> {
    pub fn new(traces: &'a [Trace], stride: TraceStride) -> Self {
        Self {
            traces,
            indices: stride.indices(traces.len()),
        }
    }
}

impl<'a> Iterator for TraceWalker<'a> {
    type Item = WalkedTrace<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.indices.next()?;
        let trace = &self.traces[index];
        Some(WalkedTrace {
            index,
            trace,
            point_count: trace.point_count(),
        })
    }
}
