//! Ring construction: chaining, classification and orientation.
//!
//! Input is a list of member segments (resolved way geometry). Segments are
//! joined end to end on exact location matches into chains; chains that
//! return to their start become rings. Rings are then nested by containment
//! and re-wound to the configured orientation.

use geo::algorithm::coordinate_position::{CoordPos, CoordinatePosition};
use geo::{Coord, LineString, Polygon};
use log::{debug, trace};

use super::Orientation;
use crate::{Location, Ring, RingKind};

/// Rings built from one set of segments.
#[derive(Debug, Default)]
pub(crate) struct RingSet {
    /// Rings in arena order: each outer followed by its holes.
    pub(crate) rings: Vec<Ring>,
    /// Chains that could not be closed into a valid ring.
    pub(crate) open_chains: usize,
}

/// Build rings from `segments`.
pub(crate) fn assemble_rings<'a, I>(
    segments: I,
    min_points: usize,
    orientation: Orientation,
) -> RingSet
where
    I: IntoIterator<Item = &'a [Location]>,
{
    let prepared: Vec<Vec<Location>> = segments
        .into_iter()
        .map(dedup_consecutive)
        .filter(|segment| segment.len() >= 2)
        .collect();

    let (closed, mut open_chains) = chain_segments(prepared);
    let mut candidates = Vec::with_capacity(closed.len());
    for chain in closed {
        if chain.len() < min_points || twice_signed_area(&chain) == 0 {
            debug!("discarding degenerate ring of {} locations", chain.len());
            open_chains += 1;
            continue;
        }
        candidates.push(Candidate::new(chain));
    }

    RingSet {
        rings: classify(candidates, orientation),
        open_chains,
    }
}

fn dedup_consecutive(segment: &[Location]) -> Vec<Location> {
    let mut locations = segment.to_vec();
    locations.dedup();
    locations
}

/// Join segments into chains.
///
/// Segments that are already closed become rings on their own and are never
/// joined to others. Each remaining chain starts from the lowest-index unused
/// segment and grows at its tail, then at its head, always taking the
/// lowest-index unused open segment with a matching endpoint. A chain whose
/// tail comes back to one of its interior vertices has that loop cut off as a
/// separate ring. Returns the closed chains and the number of chains left
/// open.
fn chain_segments(segments: Vec<Vec<Location>>) -> (Vec<Vec<Location>>, usize) {
    let mut pool: Vec<Option<Vec<Location>>> = segments.into_iter().map(Some).collect();
    let mut closed = Vec::new();
    let mut open = 0;

    for seed in 0..pool.len() {
        let Some(mut chain) = pool.get_mut(seed).and_then(Option::take) else {
            continue;
        };
        if !is_closed(&chain) {
            extend_tail(&mut chain, &mut pool, &mut closed);
        }
        if !is_closed(&chain) {
            chain.reverse();
            extend_tail(&mut chain, &mut pool, &mut closed);
            chain.reverse();
        }
        if is_closed(&chain) {
            trace!("closed chain of {} locations", chain.len());
            closed.push(chain);
        } else {
            debug!("chain of {} locations left open", chain.len());
            open += 1;
        }
    }
    (closed, open)
}

fn is_closed(chain: &[Location]) -> bool {
    chain.len() > 2 && chain.first() == chain.last()
}

fn extend_tail(
    chain: &mut Vec<Location>,
    pool: &mut [Option<Vec<Location>>],
    closed: &mut Vec<Vec<Location>>,
) {
    while !is_closed(chain) {
        let Some(tail) = chain.last().copied() else {
            return;
        };
        let found = pool.iter_mut().find_map(|slot| {
            let segment = slot.as_ref().filter(|segment| !is_closed(segment))?;
            if segment.first() == Some(&tail) {
                slot.take()
            } else if segment.last() == Some(&tail) {
                slot.take().map(|mut reversed| {
                    reversed.reverse();
                    reversed
                })
            } else {
                None
            }
        });
        let Some(next) = found else {
            return;
        };
        chain.extend(next.into_iter().skip(1));
        split_loop(chain, closed);
    }
}

/// Cut off the loop formed when the tail touches an interior vertex.
fn split_loop(chain: &mut Vec<Location>, closed: &mut Vec<Vec<Location>>) {
    let Some((&touch, body)) = chain.split_last() else {
        return;
    };
    let Some(start) = body
        .iter()
        .rposition(|loc| *loc == touch)
        .filter(|start| *start > 0)
    else {
        return;
    };
    let ring = chain.split_off(start);
    chain.push(touch);
    trace!("split a loop of {} locations off a chain", ring.len());
    closed.push(ring);
}

/// Twice the shoelace area in raw coordinate units.
///
/// Positive for counter-clockwise rings. Computed in integers so the sign is
/// exact.
fn twice_signed_area(ring: &[Location]) -> i128 {
    ring.windows(2)
        .map(|pair| match pair {
            [a, b] => i128::from(a.x) * i128::from(b.y) - i128::from(b.x) * i128::from(a.y),
            _ => 0,
        })
        .sum()
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    min: (i32, i32),
    max: (i32, i32),
}

impl Bounds {
    fn of(ring: &[Location]) -> Self {
        let mut bounds = Self {
            min: (i32::MAX, i32::MAX),
            max: (i32::MIN, i32::MIN),
        };
        for loc in ring {
            bounds.min = (bounds.min.0.min(loc.x), bounds.min.1.min(loc.y));
            bounds.max = (bounds.max.0.max(loc.x), bounds.max.1.max(loc.y));
        }
        bounds
    }

    const fn covers(&self, other: &Self) -> bool {
        self.min.0 <= other.min.0
            && self.min.1 <= other.min.1
            && self.max.0 >= other.max.0
            && self.max.1 >= other.max.1
    }
}

struct Candidate {
    locations: Vec<Location>,
    bounds: Bounds,
    polygon: Polygon<f64>,
    area: i128,
}

impl Candidate {
    fn new(locations: Vec<Location>) -> Self {
        let exterior: LineString<f64> = locations.iter().map(|loc| loc.to_raw_coord()).collect();
        Self {
            bounds: Bounds::of(&locations),
            polygon: Polygon::new(exterior, Vec::new()),
            area: twice_signed_area(&locations),
            locations,
        }
    }

    /// Is `other` strictly inside this ring?
    ///
    /// Every vertex of `other` must be inside or on the boundary and at least
    /// one strictly inside, so identical rings do not contain each other.
    fn contains(&self, other: &Self) -> bool {
        if !self.bounds.covers(&other.bounds) {
            return false;
        }
        let mut inside = false;
        for loc in &other.locations {
            let coord: Coord<f64> = loc.to_raw_coord();
            match self.polygon.coordinate_position(&coord) {
                CoordPos::Outside => return false,
                CoordPos::Inside => inside = true,
                CoordPos::OnBoundary => {}
            }
        }
        inside
    }
}

/// Nest candidates by containment depth and lay them out in arena order.
///
/// A ring at even depth is an outer ring; a ring at odd depth is a hole of
/// its immediate container. A ring whose immediate container cannot be
/// identified is treated as an outer ring.
fn classify(candidates: Vec<Candidate>, orientation: Orientation) -> Vec<Ring> {
    let containers: Vec<Vec<usize>> = candidates
        .iter()
        .enumerate()
        .map(|(inner, ring)| {
            candidates
                .iter()
                .enumerate()
                .filter(|(outer, candidate)| *outer != inner && candidate.contains(ring))
                .map(|(outer, _)| outer)
                .collect()
        })
        .collect();
    let depths: Vec<usize> = containers.iter().map(Vec::len).collect();

    let parents: Vec<Option<usize>> = containers
        .iter()
        .zip(&depths)
        .map(|(around, depth)| {
            if depth & 1 == 0 {
                return None;
            }
            around
                .iter()
                .copied()
                .filter(|outer| depths.get(*outer).is_some_and(|d| d + 1 == *depth))
                .min_by_key(|outer| candidates.get(*outer).map(|c| c.area.abs()))
        })
        .collect();

    let mut slots: Vec<Option<Vec<Location>>> = candidates
        .into_iter()
        .map(|candidate| Some(candidate.locations))
        .collect();
    let mut rings = Vec::with_capacity(slots.len());

    for (index, parent) in parents.iter().enumerate() {
        if parent.is_some() {
            continue;
        }
        let Some(locations) = slots.get_mut(index).and_then(Option::take) else {
            continue;
        };
        let outer_index = rings.len();
        let outer_ccw = orientation.outer_is_counter_clockwise();
        rings.push(Ring::new(
            outer_index,
            RingKind::Outer,
            orient(locations, outer_ccw),
        ));
        for (hole, owner) in parents.iter().enumerate() {
            if *owner != Some(index) {
                continue;
            }
            if let Some(hole_locations) = slots.get_mut(hole).and_then(Option::take) {
                rings.push(Ring::new(
                    rings.len(),
                    RingKind::Inner { outer: outer_index },
                    orient(hole_locations, !outer_ccw),
                ));
            }
        }
    }
    rings
}

fn orient(mut ring: Vec<Location>, counter_clockwise: bool) -> Vec<Location> {
    if (twice_signed_area(&ring) > 0) != counter_clockwise {
        ring.reverse();
    }
    ring
}
