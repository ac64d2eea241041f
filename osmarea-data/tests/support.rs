//! Fixture helpers shared by the data integration tests.

use base64::{Engine as _, engine::general_purpose};
use osmarea_data::PbfSource;
use std::{error::Error, fs, io::Write, path::PathBuf};
use tempfile::{Builder, TempPath};

/// Tolerance for coordinates stored at 1e-7 degree precision.
const COORDINATE_EPSILON: f64 = 1.0e-7;

/// Directory containing the encoded fixture blobs.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn write_decoded(stem: &str) -> Result<TempPath, Box<dyn Error>> {
    let encoded = fs::read_to_string(fixtures_dir().join(format!("{stem}.osm.pbf.b64")))?;
    let cleaned: String = encoded.split_ascii_whitespace().collect();
    let bytes = general_purpose::STANDARD.decode(cleaned)?;
    let mut file = Builder::new()
        .prefix(stem)
        .suffix(".osm.pbf")
        .tempfile()?;
    file.write_all(&bytes)?;
    file.flush()?;
    Ok(file.into_temp_path())
}

/// Decode `tests/fixtures/<stem>.osm.pbf.b64` into a temporary file.
///
/// The file is removed when the returned path is dropped.
pub fn decode_fixture(stem: &str) -> TempPath {
    write_decoded(stem).unwrap_or_else(|err| panic!("failed to prepare fixture {stem}: {err}"))
}

/// A source over a decoded fixture, kept alive by the returned path.
pub fn fixture_source(stem: &str) -> (TempPath, PbfSource) {
    let path = decode_fixture(stem);
    let source = PbfSource::new(path.to_path_buf());
    (path, source)
}

/// Compare floating-point coordinates within [`COORDINATE_EPSILON`].
#[expect(
    clippy::float_arithmetic,
    reason = "test delta computation requires float maths"
)]
pub fn assert_close(actual: f64, expected: f64) {
    let delta = (actual - expected).abs();
    assert!(
        delta <= COORDINATE_EPSILON,
        "expected {expected}, got {actual} (|Δ| = {delta})"
    );
}
