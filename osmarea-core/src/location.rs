//! Fixed-precision WGS84 coordinates.

use std::fmt;

use geo::Coord;

/// Number of raw units per degree.
///
/// Coordinates are stored as integers in `1/PRECISION` degrees, which keeps
/// equality exact when ring endpoints are matched against each other.
pub const PRECISION: i32 = 10_000_000;

/// A longitude/latitude pair in `1/PRECISION` degree units.
///
/// `x` carries the longitude and `y` the latitude. Equality is exact, so two
/// way endpoints that reference the same node always compare equal.
///
/// # Examples
/// ```
/// use osmarea_core::Location;
///
/// let berlin = Location::new(134_049_540, 525_200_080);
/// assert!(berlin.is_valid());
/// assert_eq!(berlin.to_string(), "52.5200080° N 13.4049540° E");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    /// Longitude in `1/PRECISION` degrees.
    pub x: i32,
    /// Latitude in `1/PRECISION` degrees.
    pub y: i32,
}

impl Location {
    /// Construct a location from raw fixed-precision units.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Construct a location from degrees, rounding to the nearest raw unit.
    ///
    /// Returns `None` when either value is not finite or does not fit the
    /// fixed-precision range.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        clippy::cast_possible_truncation,
        reason = "degree values are scaled and range-checked before narrowing"
    )]
    pub fn from_degrees(lon: f64, lat: f64) -> Option<Self> {
        let scale = f64::from(PRECISION);
        let to_raw = |value: f64| {
            let raw = (value * scale).round();
            (raw.is_finite() && raw >= f64::from(i32::MIN) && raw <= f64::from(i32::MAX))
                .then_some(raw as i32)
        };
        Some(Self {
            x: to_raw(lon)?,
            y: to_raw(lat)?,
        })
    }

    /// Longitude in degrees.
    #[must_use]
    #[expect(clippy::float_arithmetic, reason = "unit conversion")]
    pub fn lon(self) -> f64 {
        f64::from(self.x) / f64::from(PRECISION)
    }

    /// Latitude in degrees.
    #[must_use]
    #[expect(clippy::float_arithmetic, reason = "unit conversion")]
    pub fn lat(self) -> f64 {
        f64::from(self.y) / f64::from(PRECISION)
    }

    /// Check whether the coordinates are inside the usual bounds
    /// (`-180 <= lon <= 180`, `-90 <= lat <= 90`).
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.x >= -180 * PRECISION
            && self.x <= 180 * PRECISION
            && self.y >= -90 * PRECISION
            && self.y <= 90 * PRECISION
    }

    /// The location in degrees as a `geo` coordinate (`x = lon`, `y = lat`).
    #[must_use]
    pub fn to_degrees(self) -> Coord<f64> {
        Coord {
            x: self.lon(),
            y: self.lat(),
        }
    }

    /// The location in raw units as a `geo` coordinate.
    ///
    /// Every `i32` is exactly representable as `f64`, so geometric predicates
    /// evaluated on raw coordinates see the same values the chainer matched.
    #[must_use]
    pub fn to_raw_coord(self) -> Coord<f64> {
        Coord {
            x: f64::from(self.x),
            y: f64::from(self.y),
        }
    }
}

impl From<Location> for Coord<f64> {
    fn from(location: Location) -> Self {
        location.to_degrees()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lat = self.lat();
        let lon = self.lon();
        let north_south = if self.y >= 0 { 'N' } else { 'S' };
        let east_west = if self.x >= 0 { 'E' } else { 'W' };
        write!(
            f,
            "{:.7}° {north_south} {:.7}° {east_west}",
            lat.abs(),
            lon.abs()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(13.404_954, 52.520_008, Location::new(134_049_540, 525_200_080))]
    #[case(-0.12, 51.5, Location::new(-1_200_000, 515_000_000))]
    #[case(0.0, 0.0, Location::new(0, 0))]
    fn converts_degrees_to_raw_units(#[case] lon: f64, #[case] lat: f64, #[case] expected: Location) {
        assert_eq!(Location::from_degrees(lon, lat), Some(expected));
    }

    #[rstest]
    #[case(f64::NAN, 0.0)]
    #[case(0.0, f64::INFINITY)]
    #[case(1.0e6, 0.0)]
    fn rejects_unrepresentable_degrees(#[case] lon: f64, #[case] lat: f64) {
        assert_eq!(Location::from_degrees(lon, lat), None);
    }

    #[rstest]
    #[case(Location::new(180 * PRECISION, 90 * PRECISION), true)]
    #[case(Location::new(-180 * PRECISION, -90 * PRECISION), true)]
    #[case(Location::new(180 * PRECISION + 1, 0), false)]
    #[case(Location::new(0, -90 * PRECISION - 1), false)]
    fn validates_bounds(#[case] location: Location, #[case] valid: bool) {
        assert_eq!(location.is_valid(), valid);
    }

    #[rstest]
    fn displays_hemispheres() {
        let location = Location::new(-1_200_000, -335_000_000);
        assert_eq!(location.to_string(), "33.5000000° S 0.1200000° W");
    }
}
