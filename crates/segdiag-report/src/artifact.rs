//! Filesystem location shared with the presentation and packaging tools.
//!
//! Writes are atomic (temporary sibling file, then rename), so readers never see a partially
//! written artifact. Reads of previously produced artifacts never fail the run: a missing or
//! malformed file is reported as "no data".

use std::{
    collections::BTreeMap,
    fs,
    io::{self, Cursor},
    path::{Path, PathBuf},
};

use image::{ImageFormat, RgbImage};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    benchmark::BenchmarkResult,
    error::{ArtifactError, ReportError, ReportResult},
    report::FailureReport,
};

pub const FAILURE_ANALYSIS: &str = "failure_analysis.json";
pub const PER_CLASS_IOU: &str = "per_class_iou.json";
pub const DATASET_SUMMARY: &str = "dataset_summary.json";
pub const FAILURE_EXAMPLES: &str = "failure_examples_paths.json";
pub const BENCHMARK: &str = "inference_benchmark.json";
pub const BENCHMARK_FALLBACK: &str = "benchmark_results.json";

/// Class name → dataset-level IoU (`None` when the class never occurred).
pub type PerClassIou = BTreeMap<String, Option<f64>>;

/// File name of the rendered image for a 1-based rank.
pub fn visualization_name(rank: usize) -> String {
    format!("failure_case_{rank}.png")
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Like [`new`](Self::new), creating the directory when needed.
    pub fn create(root: impl Into<PathBuf>) -> ReportResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| ReportError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn write_bytes(&self, name: &str, bytes: &[u8]) -> ReportResult<PathBuf> {
        let path = self.path(name);
        write_atomic(&path, bytes).map_err(|source| ReportError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "artifact written");
        Ok(path)
    }

    /// Writes pretty-printed JSON.
    pub fn write_json<T: Serialize + ?Sized>(
        &self,
        name: &str,
        value: &T,
    ) -> ReportResult<PathBuf> {
        let mut bytes =
            serde_json::to_vec_pretty(value).map_err(|source| ReportError::Serialization {
                path: self.path(name),
                source,
            })?;
        bytes.push(b'\n');
        self.write_bytes(name, &bytes)
    }

    /// Writes a PNG image.
    pub fn write_image(&self, name: &str, image: &RgbImage) -> ReportResult<PathBuf> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|source| ReportError::ImageEncode {
                path: self.path(name),
                source,
            })?;
        self.write_bytes(name, &bytes)
    }

    pub fn write_failure_report(&self, report: &FailureReport) -> ReportResult<PathBuf> {
        self.write_json(FAILURE_ANALYSIS, report)
    }

    /// Reads and parses a JSON artifact.
    pub fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T, ArtifactError> {
        let path = self.path(name);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ArtifactError::Missing { path });
            }
            Err(e) => {
                return Err(ArtifactError::Malformed {
                    path,
                    reason: e.to_string(),
                })
            }
        };
        serde_json::from_slice(&bytes).map_err(|e| ArtifactError::Malformed {
            path,
            reason: e.to_string(),
        })
    }

    /// Reads a JSON artifact, treating a missing or malformed file as absent.
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        match self.read_json(name) {
            Ok(value) => Some(value),
            Err(ArtifactError::Missing { path }) => {
                tracing::debug!(path = %path.display(), "artifact not available");
                None
            }
            Err(e @ ArtifactError::Malformed { .. }) => {
                tracing::warn!(error = %e, "ignoring malformed artifact");
                None
            }
        }
    }

    /// The latency benchmark, looked up under its primary then its fallback name.
    ///
    /// A recorded status that contradicts the requirement is reported but kept.
    pub fn load_benchmark(&self) -> Option<BenchmarkResult> {
        let benchmark: BenchmarkResult = self
            .load(BENCHMARK)
            .or_else(|| self.load(BENCHMARK_FALLBACK))?;
        if !benchmark.is_consistent() {
            tracing::warn!(
                requirement = %benchmark.requirement,
                recorded = ?benchmark.status,
                expected = ?benchmark.expected_status(),
                "benchmark status disagrees with its timings, keeping recorded status",
            );
        }
        Some(benchmark)
    }

    /// Per-class IoU for charting, synthesised from the failure report when the dedicated
    /// artifact is unavailable.
    pub fn load_per_class_iou(&self) -> Option<PerClassIou> {
        self.load(PER_CLASS_IOU).or_else(|| {
            let report: FailureReport = self.load(FAILURE_ANALYSIS)?;
            tracing::info!("per-class IoU synthesised from {FAILURE_ANALYSIS}");
            Some(synthesize_per_class_iou(&report))
        })
    }
}

/// Class IoUs found among a report's worst classes; the first occurrence of a class wins.
pub fn synthesize_per_class_iou(report: &FailureReport) -> PerClassIou {
    let mut ious = PerClassIou::new();
    for class in report.worst_cases.iter().flat_map(|case| &case.worst_classes) {
        ious.entry(class.class_name.clone())
            .or_insert(Some(class.iou));
    }
    ious
}
