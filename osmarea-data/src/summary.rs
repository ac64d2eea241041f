//! Entity counts and bounds of a source, measured with a plain pass.

use std::cell::RefCell;

use geo::{Coord, Rect};
use osmarea_core::{
    EntitySource, HandlerTable, Location, Mode, Node, PassReport, Pipeline, PipelineConfig,
    PipelineError,
};

/// Summary of the entities in a source.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct OsmSummary {
    /// Number of nodes, including dense-node entries.
    pub nodes: usize,
    /// Number of ways.
    pub ways: usize,
    /// Number of relations.
    pub relations: usize,
    /// Number of decoded blocks.
    pub blocks: usize,
    /// Bounding box covering all valid node locations, if any.
    /// Coordinates are WGS84 with `x = longitude`, `y = latitude`.
    pub bounds: Option<Rect<f64>>,
}

impl OsmSummary {
    fn include(&mut self, location: Location) {
        if !location.is_valid() {
            return;
        }
        let point = location.to_degrees();
        self.bounds = Some(match self.bounds {
            Some(existing) => Rect::new(
                Coord {
                    x: existing.min().x.min(point.x),
                    y: existing.min().y.min(point.y),
                },
                Coord {
                    x: existing.max().x.max(point.x),
                    y: existing.max().y.max(point.y),
                },
            ),
            None => Rect::new(point, point),
        });
    }

    fn record_node(&mut self, node: &Node) {
        self.include(node.location);
    }

    fn with_report(mut self, report: &PassReport) -> Self {
        self.nodes = report.nodes;
        self.ways = report.ways;
        self.relations = report.relations;
        self.blocks = report.checkpoints.saturating_sub(1);
        self
    }
}

/// Count the entities of `source` and measure the extent of its nodes.
///
/// # Examples
/// ```
/// use osmarea_core::{Location, MemorySource, Node};
/// use osmarea_data::summarise;
///
/// # fn main() -> Result<(), osmarea_core::PipelineError> {
/// let source = MemorySource::new([
///     Node::new(1, Location::from_degrees(13.4, 52.5).unwrap_or_default()).into(),
///     Node::new(2, Location::from_degrees(13.5, 52.4).unwrap_or_default()).into(),
/// ]);
/// let summary = summarise(&source)?;
/// assert_eq!(summary.nodes, 2);
/// assert!(summary.bounds.is_some());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// Returns [`PipelineError::Source`] when the source cannot be read.
pub fn summarise<S: EntitySource>(source: &S) -> Result<OsmSummary, PipelineError> {
    let summary = RefCell::new(OsmSummary::default());
    let mut table = HandlerTable::new().on_node(|node| {
        summary.borrow_mut().record_node(node);
        Ok(())
    });
    let report = Pipeline::new(Mode::Plain, PipelineConfig::default()).run(source, &mut table)?;
    drop(table);
    Ok(summary.into_inner().with_report(&report))
}
