use crate::filter::FilterSpec;
use crate::metadata::PointMetadata;
use crate::trace::Trace;
use crate::walker::{TraceStride, TraceWalker};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Hover text attached to a selected point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PointText {
    Value(String),
    NotAvailable,
}

impl PointText {
    pub const NOT_AVAILABLE: &'static str = "N/A (no text for point)";
}

impl fmt::Display for PointText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointText::Value(v) => f.write_str(v),
            PointText::NotAvailable => f.write_str(Self::NOT_AVAILABLE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedPoint {
    pub trace_index: usize,
    pub point_index: usize,
    pub metadata: PointMetadata,
    pub text: PointText,
}

/// Why a visited trace contributed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// None of `x`, `y`, `labels`, `customdata`, `text` is a sequence.
    Malformed,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SkippedTrace {
    pub trace_index: usize,
    pub reason: SkipReason,
}

/// The ordered, immutable result of one selection pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    filter: String,
    points: Vec<SelectedPoint>,
    /// Display names of the traces that produced at least one point, in trace order.
    trace_names: IndexMap<usize, String>,
    skipped: Vec<SkippedTrace>,
}

/// Points of one originating trace.
#[derive(Debug, Clone, Copy)]
pub struct TraceGroup<'a> {
    pub trace_index: usize,
    pub trace_name: &'a str,
    pub points: &'a [SelectedPoint],
}

impl Selection {
    pub fn points(&self) -> &[SelectedPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Description of the filter that produced this selection.
    pub fn filter_description(&self) -> &str {
        &self.filter
    }

    pub fn skipped(&self) -> &[SkippedTrace] {
        &self.skipped
    }

    pub fn trace_name(&self, trace_index: usize) -> Option<&str> {
        self.trace_names.get(&trace_index).map(String::as_str)
    }

    pub fn groups(&self) -> impl Iterator<Item = TraceGroup<'_>> {
        self.points
            .chunk_by(|a, b| a.trace_index == b.trace_index)
            .map(|points| {
                let trace_index = points[0].trace_index;
                TraceGroup {
                    trace_index,
                    trace_name: self.trace_name(trace_index).unwrap_or_default(),
                    points,
                }
            })
    }
}

/// Applies a [`FilterSpec`] to every candidate point produced by a [`TraceWalker`].
#[derive(Debug, Clone)]
pub struct PointSelector {
    filter: FilterSpec,
    stride: TraceStride,
}

impl PointSelector {
    pub fn new(filter: FilterSpec, stride: TraceStride) -> Self {
        Self { filter, stride }
    }

    pub fn filter(&self) -> &FilterSpec {
        &self.filter
    }

    pub fn select(&self, traces: &[Trace]) -> Selection {
        let mut points = Vec::new();
        let mut trace_names = IndexMap::new();
        let mut skipped = Vec::new();

        for walked in TraceWalker::new(traces, self.stride) {
            let Some(count) = walked.point_count else {
                tracing::warn!(
                    trace_index = walked.index,
                    "could not determine point count for trace; skipping"
                );
                skipped.push(SkippedTrace {
                    trace_index: walked.index,
                    reason: SkipReason::Malformed,
                });
                continue;
            };
            if count == 0 {
                tracing::debug!(trace_index = walked.index, "trace has no data points");
                skipped.push(SkippedTrace {
                    trace_index: walked.index,
                    reason: SkipReason::Empty,
                });
                continue;
            }

            let before = points.len();
            for candidate in walked.points() {
                let metadata =
                    PointMetadata::from_customdata(candidate.trace.customdata_at(candidate.point_index));
                if !self.filter.matches(&metadata) {
                    continue;
                }
                let text = candidate
                    .trace
                    .text_at(candidate.point_index, candidate.point_count)
                    .map_or(PointText::NotAvailable, PointText::Value);
                points.push(SelectedPoint {
                    trace_index: candidate.trace_index,
                    point_index: candidate.point_index,
                    metadata,
                    text,
                });
            }

            let matched = points.len() - before;
            tracing::debug!(
                trace_index = walked.index,
                points = count,
                matched,
                "processed trace"
            );
            if matched > 0 {
                trace_names.insert(walked.index, walked.trace.display_name(walked.index));
            }
        }

        Selection {
            filter: self.filter.describe(),
            points,
            trace_names,
            skipped,
        }
    }
}

pub fn select_points(traces: &[Trace], filter: &FilterSpec, stride: TraceStride) -> Selection {
    PointSelector::new(filter.clone(), stride).select(traces)
}
