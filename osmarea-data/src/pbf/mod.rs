//! `EntitySource` over an OpenStreetMap PBF file.
//!
//! Wire decoding is delegated to `osmpbf`. Every opening reads the file from
//! the start, decoding one blob at a time; each data blob yields its
//! entities followed by a [`SourceEvent::BlockEnd`].

use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::{debug, trace};
use osmarea_core::{EntitySource, SourceError, SourceEvent};
use osmpbf::{BlobDecode, BlobReader};

mod convert;

/// A restartable PBF file source.
///
/// # Examples
/// ```no_run
/// use osmarea_core::{HandlerTable, Mode, Pipeline, PipelineConfig};
/// use osmarea_data::PbfSource;
///
/// # fn main() -> Result<(), osmarea_core::PipelineError> {
/// let source = PbfSource::new("berlin.osm.pbf");
/// let mut table = HandlerTable::new().on_area(|_| Ok(()));
/// let report = Pipeline::new(Mode::WithAreas, PipelineConfig::default())
///     .run(&source, &mut table)?;
/// drop(table);
/// println!("areas: {}", report.areas);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PbfSource {
    path: PathBuf,
}

impl PbfSource {
    /// A source reading `path` on every [`EntitySource::open`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File the source reads.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EntitySource for PbfSource {
    type Events = PbfEvents;

    fn open(&self) -> Result<Self::Events, SourceError> {
        let reader = BlobReader::from_path(&self.path).map_err(|source| SourceError::Open {
            location: self.path.display().to_string(),
            source: source.into(),
        })?;
        debug!("opened {}", self.path.display());
        Ok(PbfEvents {
            path: self.path.clone(),
            reader,
            blob: 0,
            pending: VecDeque::new(),
            failed: false,
        })
    }
}

/// Events of one opening of a [`PbfSource`].
pub struct PbfEvents {
    path: PathBuf,
    reader: BlobReader<BufReader<File>>,
    blob: usize,
    pending: VecDeque<SourceEvent>,
    failed: bool,
}

impl std::fmt::Debug for PbfEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PbfEvents")
            .field("path", &self.path)
            .field("blob", &self.blob)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl PbfEvents {
    fn location(&self) -> String {
        format!("{} (blob {})", self.path.display(), self.blob)
    }

    fn decode_error(&self, source: osmpbf::Error) -> SourceError {
        SourceError::Decode {
            location: self.location(),
            entity: None,
            source: source.into(),
        }
    }

    /// Decode the next data blob into `pending`. `Ok(false)` at end of file.
    fn fill(&mut self) -> Result<bool, SourceError> {
        loop {
            let Some(next) = self.reader.next() else {
                return Ok(false);
            };
            self.blob = self.blob.saturating_add(1);
            let blob = next.map_err(|source| self.decode_error(source))?;
            let decoded = blob.decode().map_err(|source| self.decode_error(source))?;
            match decoded {
                BlobDecode::OsmData(block) => {
                    let location = self.location();
                    for element in block.elements() {
                        let entity = convert::entity(&element, &location)?;
                        self.pending.push_back(SourceEvent::Entity(entity));
                    }
                    trace!("decoded {} entities from {location}", self.pending.len());
                    self.pending.push_back(SourceEvent::BlockEnd);
                    return Ok(true);
                }
                BlobDecode::OsmHeader(_) => debug!("skipping header in {}", self.location()),
                BlobDecode::Unknown(kind) => {
                    debug!("skipping unknown blob `{kind}` in {}", self.location());
                }
            }
        }
    }
}

impl Iterator for PbfEvents {
    type Item = Result<SourceEvent, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if let Some(event) = self.pending.pop_front() {
            return Some(Ok(event));
        }
        match self.fill() {
            Ok(true) => self.pending.pop_front().map(Ok),
            Ok(false) => None,
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
