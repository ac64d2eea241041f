//! Ordered dispatch of one pass over an entity source.
//!
//! A [`Pipeline`] describes what a pass does (its [`Mode`] and
//! configuration). [`Pipeline::start`] validates the handler table, runs the
//! relation scan when areas are wanted, and returns a [`Pass`] that the
//! caller drives one event at a time or drains with [`Pass::finish`].
//!
//! Dispatch order for every entity is: the entity's own slot, then
//! `tag_list`. Areas completed by a way are dispatched right after that way:
//! `area`, `tag_list`, then each outer ring followed by its inner rings.
//! `flush` runs after every block boundary and once at the very end.

use log::{debug, info};
use thiserror::Error;

use crate::{
    AreaAssembler, AssemblerConfig, AssemblerStats, Diagnostic, Entity, EntityKind, EntityRef,
    EntitySource, HandlerError, HandlerTable, LocationIndex, NodeLocationResolver, RelationScan,
    ResolveError, ResolvePolicy, ResolverStats, Slot, SlotSet, SourceError, SourceEvent,
    SparseLocationIndex, scan_relations,
};

/// Which stages run during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Mode {
    /// Dispatch entities as decoded; way locations stay unresolved.
    Plain,
    /// Resolve way node locations before dispatch.
    WithLocations,
    /// Resolve locations and assemble areas. Requires the source to be
    /// opened twice.
    #[default]
    WithAreas,
}

impl Mode {
    const fn resolves(self) -> bool {
        matches!(self, Self::WithLocations | Self::WithAreas)
    }
}

/// The phase of work that failed to read the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The relation scan that precedes area assembly.
    RelationScan,
    /// The main dispatch pass.
    Dispatch,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::RelationScan => "relation scan",
            Self::Dispatch => "dispatch pass",
        })
    }
}

/// Errors that abort a pass.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A slot the pass needs has no callback.
    #[error("handler slot `{slot}` must be bound before the pass starts")]
    UnboundSlot {
        /// First missing slot, in dispatch order.
        slot: Slot,
    },
    /// Reading the source failed.
    #[error("{stage} failed to read the entity source")]
    Source {
        /// Phase in which the failure happened.
        stage: Stage,
        /// Underlying source error.
        #[source]
        source: SourceError,
    },
    /// Location resolution failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// A handler callback failed.
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

/// Pass configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    /// Handling of unresolved way references.
    pub resolve: ResolvePolicy,
    /// Relation scan and ring assembly options.
    pub assembler: AssemblerConfig,
    /// Slots that must be bound for the pass to start. `area` is always
    /// required in [`Mode::WithAreas`].
    pub required_slots: SlotSet,
}

/// Outcome of one event processed by [`Pass::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// An entity was dispatched, followed by the listed areas.
    Entity {
        /// The dispatched entity.
        entity: EntityRef,
        /// Areas dispatched after it.
        areas: Vec<EntityRef>,
    },
    /// A block boundary was reached and `flush` was called.
    Checkpoint,
}

/// Counters and diagnostics of a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PassReport {
    /// Mode the pass ran in.
    pub mode: Mode,
    /// Nodes dispatched.
    pub nodes: usize,
    /// Ways dispatched.
    pub ways: usize,
    /// Relations dispatched.
    pub relations: usize,
    /// Areas dispatched.
    pub areas: usize,
    /// Flush checkpoints emitted, including the final one.
    pub checkpoints: usize,
    /// Resolver counters; zero in [`Mode::Plain`].
    pub resolver: ResolverStats,
    /// Assembler counters; zero unless areas were assembled.
    pub assembler: AssemblerStats,
    /// Problems recorded by the relation scan and the assembler.
    pub diagnostics: Vec<Diagnostic>,
}

/// A configured pipeline. Reusable across passes.
///
/// # Examples
/// ```
/// use std::cell::RefCell;
/// use osmarea_core::{
///     HandlerTable, Location, MemorySource, Mode, Node, Pipeline, PipelineConfig, Way,
/// };
///
/// # fn main() -> Result<(), osmarea_core::PipelineError> {
/// let corners = [(1, 0, 0), (2, 10, 0), (3, 10, 10), (4, 0, 10)];
/// let mut entities: Vec<_> = corners
///     .iter()
///     .map(|(id, x, y)| Node::new(*id, Location::new(*x, *y)).into())
///     .collect();
/// entities.push(Way::new(9, [1, 2, 3, 4, 1]).into());
/// let source = MemorySource::new(entities);
///
/// let areas = RefCell::new(Vec::new());
/// let mut table = HandlerTable::new().on_area(|area| {
///     areas.borrow_mut().push(area.original_id());
///     Ok(())
/// });
/// let report = Pipeline::new(Mode::WithAreas, PipelineConfig::default())
///     .run(&source, &mut table)?;
/// drop(table);
/// assert_eq!(areas.into_inner(), vec![9]);
/// assert_eq!(report.areas, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    mode: Mode,
    config: PipelineConfig,
}

impl Pipeline {
    /// Configure a pipeline.
    #[must_use]
    pub const fn new(mode: Mode, config: PipelineConfig) -> Self {
        Self { mode, config }
    }

    /// The configured mode.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Validate the table and prepare a pass.
    ///
    /// In [`Mode::WithAreas`] this opens the source once for the relation
    /// scan before opening it again for the pass. `index` is ignored in
    /// [`Mode::Plain`].
    ///
    /// # Errors
    /// Returns [`PipelineError::UnboundSlot`] when a required slot has no
    /// callback and [`PipelineError::Source`] when the source cannot be
    /// read.
    pub fn start<'t, 'h, S, I>(
        &self,
        source: &S,
        index: I,
        table: &'t mut HandlerTable<'h>,
    ) -> Result<Pass<'t, 'h, S::Events, I>, PipelineError>
    where
        S: EntitySource + ?Sized,
        I: LocationIndex,
    {
        self.validate(table)?;
        let scan = if self.mode == Mode::WithAreas {
            Some(
                scan_relations(source, &self.config.assembler).map_err(|error| {
                    PipelineError::Source {
                        stage: Stage::RelationScan,
                        source: error,
                    }
                })?,
            )
        } else {
            None
        };
        self.open(source, index, table, scan)
    }

    /// Prepare a pass from a relation scan built elsewhere, for example on
    /// another thread.
    ///
    /// The scan is ignored unless the mode is [`Mode::WithAreas`].
    ///
    /// # Errors
    /// As for [`start`](Self::start), minus the scan itself.
    pub fn start_with_scan<'t, 'h, S, I>(
        &self,
        source: &S,
        index: I,
        table: &'t mut HandlerTable<'h>,
        scan: RelationScan,
    ) -> Result<Pass<'t, 'h, S::Events, I>, PipelineError>
    where
        S: EntitySource + ?Sized,
        I: LocationIndex,
    {
        self.validate(table)?;
        let wanted = (self.mode == Mode::WithAreas).then_some(scan);
        self.open(source, index, table, wanted)
    }

    /// Run a complete pass with an in-memory [`SparseLocationIndex`].
    ///
    /// # Errors
    /// Any [`PipelineError`] raised while starting or draining the pass.
    pub fn run<S>(&self, source: &S, table: &mut HandlerTable<'_>) -> Result<PassReport, PipelineError>
    where
        S: EntitySource + ?Sized,
    {
        self.run_with_index(source, SparseLocationIndex::default(), table)
    }

    /// Run a complete pass with a caller-supplied location index.
    ///
    /// # Errors
    /// Any [`PipelineError`] raised while starting or draining the pass.
    pub fn run_with_index<S, I>(
        &self,
        source: &S,
        index: I,
        table: &mut HandlerTable<'_>,
    ) -> Result<PassReport, PipelineError>
    where
        S: EntitySource + ?Sized,
        I: LocationIndex,
    {
        self.start(source, index, table)?.finish()
    }

    fn validate(&self, table: &HandlerTable<'_>) -> Result<(), PipelineError> {
        let mut required = self.config.required_slots;
        if self.mode == Mode::WithAreas {
            required.insert(Slot::Area);
        }
        match required.difference(table.bound()).iter().next() {
            Some(slot) => Err(PipelineError::UnboundSlot { slot }),
            None => Ok(()),
        }
    }

    fn open<'t, 'h, S, I>(
        &self,
        source: &S,
        index: I,
        table: &'t mut HandlerTable<'h>,
        scan: Option<RelationScan>,
    ) -> Result<Pass<'t, 'h, S::Events, I>, PipelineError>
    where
        S: EntitySource + ?Sized,
        I: LocationIndex,
    {
        let events = source.open().map_err(|error| PipelineError::Source {
            stage: Stage::Dispatch,
            source: error,
        })?;
        let resolver = self
            .mode
            .resolves()
            .then(|| NodeLocationResolver::with_policy(index, self.config.resolve));
        let assembler =
            scan.map(|relations| AreaAssembler::new(relations, self.config.assembler.clone()));
        debug!("starting {:?} pass", self.mode);
        Ok(Pass {
            events,
            resolver,
            assembler,
            table,
            report: PassReport {
                mode: self.mode,
                ..PassReport::default()
            },
        })
    }
}

/// One pass in progress.
///
/// Dropping a pass (or calling [`cancel`](Self::cancel)) stops reading; any
/// relation still waiting for members is discarded and no area is emitted
/// for it.
pub struct Pass<'t, 'h, E, I> {
    events: E,
    resolver: Option<NodeLocationResolver<I>>,
    assembler: Option<AreaAssembler>,
    table: &'t mut HandlerTable<'h>,
    report: PassReport,
}

impl<E, I> std::fmt::Debug for Pass<'_, '_, E, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pass")
            .field("report", &self.report)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl<E, I> Pass<'_, '_, E, I>
where
    E: Iterator<Item = Result<SourceEvent, SourceError>>,
    I: LocationIndex,
{
    /// Process the next source event.
    ///
    /// Returns `Ok(None)` once the source is exhausted. End-of-stream work
    /// (incomplete relations and the final flush) happens in
    /// [`finish`](Self::finish).
    ///
    /// # Errors
    /// Returns the first [`PipelineError`] raised by the source, the
    /// resolver or a handler.
    pub fn step(&mut self) -> Result<Option<Step>, PipelineError> {
        let Some(next) = self.events.next() else {
            return Ok(None);
        };
        let event = next.map_err(|error| PipelineError::Source {
            stage: Stage::Dispatch,
            source: error,
        })?;
        match event {
            SourceEvent::Entity(entity) => self.entity(entity).map(Some),
            SourceEvent::BlockEnd => {
                self.checkpoint()?;
                Ok(Some(Step::Checkpoint))
            }
        }
    }

    /// Drain the source, assemble relations still pending, flush once more
    /// and return the report.
    ///
    /// # Errors
    /// Returns the first [`PipelineError`] raised while draining.
    pub fn finish(mut self) -> Result<PassReport, PipelineError> {
        while self.step()?.is_some() {}
        if let Some(assembler) = self.assembler.as_mut() {
            for area in assembler.finish() {
                self.table.area(&area)?;
                self.report.areas += 1;
            }
        }
        self.checkpoint()?;
        let report = self.into_report();
        info!(
            "pass complete: {} nodes, {} ways, {} relations, {} areas",
            report.nodes, report.ways, report.relations, report.areas
        );
        Ok(report)
    }

    /// Stop the pass early, discarding pending relations.
    #[must_use]
    pub fn cancel(self) -> PassReport {
        if let Some(pending) = self
            .assembler
            .as_ref()
            .map(AreaAssembler::pending_relations)
            .filter(|pending| *pending > 0)
        {
            debug!("pass cancelled; discarding {pending} pending relation(s)");
        }
        self.into_report()
    }

    /// Counters so far.
    #[must_use]
    pub const fn report(&self) -> &PassReport {
        &self.report
    }

    fn entity(&mut self, entity: Entity) -> Result<Step, PipelineError> {
        let target = entity.entity_ref();
        let mut areas = Vec::new();
        match entity {
            Entity::Node(node) => {
                if let Some(resolver) = self.resolver.as_mut() {
                    resolver.node(&node)?;
                }
                self.table.node(&node)?;
                self.report.nodes += 1;
            }
            Entity::Way(mut way) => {
                if let Some(resolver) = self.resolver.as_mut() {
                    resolver.way(&mut way)?;
                }
                self.table.way(&way)?;
                self.report.ways += 1;
                if let Some(assembler) = self.assembler.as_mut() {
                    for area in assembler.way(&way) {
                        self.table.area(&area)?;
                        self.report.areas += 1;
                        areas.push(EntityRef::new(EntityKind::Area, area.id().get()));
                    }
                }
            }
            Entity::Relation(relation) => {
                self.table.relation(&relation)?;
                self.report.relations += 1;
            }
        }
        Ok(Step::Entity {
            entity: target,
            areas,
        })
    }

    fn checkpoint(&mut self) -> Result<(), PipelineError> {
        if let Some(resolver) = self.resolver.as_mut() {
            resolver.checkpoint()?;
        }
        self.table.flush()?;
        self.report.checkpoints += 1;
        Ok(())
    }

    fn into_report(self) -> PassReport {
        let mut report = self.report;
        if let Some(resolver) = &self.resolver {
            report.resolver = resolver.stats();
        }
        if let Some(mut assembler) = self.assembler {
            report.assembler = assembler.stats();
            report.diagnostics = assembler.take_diagnostics();
        }
        report
    }
}

#[cfg(test)]
mod tests;
