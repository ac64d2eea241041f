//! Test helpers for preparing extracts on disk.

use base64::{Engine as _, engine::general_purpose};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;

/// Encoded lake extract shared with the data crate's tests.
const LAKE_FIXTURE: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../osmarea-data/tests/fixtures/lake.osm.pbf.b64"
);

/// Tolerance for coordinates stored at 1e-7 degree precision.
const COORDINATE_EPSILON: f64 = 1.0e-7;

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    fs::write(path, contents).expect("write test file");
}

/// A temporary directory addressed by a UTF-8 path.
pub(super) fn workspace() -> (TempDir, Utf8PathBuf) {
    let tmp = TempDir::new().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf-8 workspace");
    (tmp, root)
}

/// Decode the lake extract into `dir` and return its path.
///
/// The extract holds a lake relation (outer way 10, inner way 11) and a
/// closed way 12 tagged `building=yes`.
pub(super) fn write_lake(dir: &Utf8Path) -> Utf8PathBuf {
    let encoded = fs::read_to_string(LAKE_FIXTURE).expect("read lake fixture");
    let cleaned: String = encoded.split_ascii_whitespace().collect();
    let bytes = general_purpose::STANDARD
        .decode(cleaned)
        .expect("decode lake fixture");
    let path = dir.join("lake.osm.pbf");
    write_utf8(&path, &bytes);
    path
}

#[expect(
    clippy::float_arithmetic,
    reason = "test delta computation requires float maths"
)]
pub(super) fn assert_close(actual: f64, expected: f64) {
    let delta = (actual - expected).abs();
    assert!(
        delta <= COORDINATE_EPSILON,
        "expected {expected}, got {actual} (|Δ| = {delta})"
    );
}
