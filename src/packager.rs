//! Result packaging into a downloadable ZIP archive

use crate::error::{Error, Result};
use crate::types::JobId;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::CompressionMethod;
use zip::write::FileOptions;

/// Extension of output artifacts picked up by the packager
const OUTPUT_EXTENSION: &str = "md";

/// Outcome of a successful packaging run
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedArchive {
    /// Final archive location
    pub path: PathBuf,
    /// Entry names, in archive order
    pub entries: Vec<String>,
}

/// Bundles a job's outputs into `<results_root>/<job_id>.zip`
#[derive(Debug, Clone)]
pub struct ResultPackager {
    results_root: PathBuf,
}

impl ResultPackager {
    /// Create a packager writing archives into `results_root`
    pub fn new(results_root: impl Into<PathBuf>) -> Self {
        Self {
            results_root: results_root.into(),
        }
    }

    /// Where the archive for `job_id` lives
    pub fn archive_path(&self, job_id: &JobId) -> PathBuf {
        self.results_root.join(format!("{job_id}.zip"))
    }

    /// Package every `*.md` file in `result_dir`
    ///
    /// Entries are flat basenames in lexical order, deflate-compressed. A missing
    /// or empty `result_dir` yields a valid archive with zero entries. The archive
    /// is written to a `.zip.part` file first and renamed into place, so a
    /// re-run replaces an earlier archive with an equivalent one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Packaging`] when the directory cannot be read or the
    /// archive cannot be written.
    pub async fn pack(&self, job_id: &JobId, result_dir: &Path) -> Result<PackedArchive> {
        let archive_path = self.archive_path(job_id);
        let result_dir = result_dir.to_path_buf();
        let target = archive_path.clone();

        let entries = tokio::task::spawn_blocking(move || write_archive(&result_dir, &target))
            .await
            .map_err(|e| packaging_error(job_id, format!("packaging task failed: {e}")))?
            .map_err(|e| packaging_error(job_id, e.to_string()))?;

        info!(
            job_id = %job_id,
            path = %archive_path.display(),
            entries = entries.len(),
            "result archive written"
        );

        Ok(PackedArchive {
            path: archive_path,
            entries,
        })
    }
}

fn packaging_error(job_id: &JobId, reason: String) -> Error {
    Error::Packaging {
        job_id: job_id.clone(),
        reason,
    }
}

/// Collect output files in `dir`, sorted by name
fn collect_outputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "result directory missing, packaging nothing");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut outputs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) == Some(OUTPUT_EXTENSION) {
            outputs.push(path);
        }
    }
    outputs.sort();
    Ok(outputs)
}

fn write_archive(result_dir: &Path, archive_path: &Path) -> Result<Vec<String>> {
    let outputs = collect_outputs(result_dir)?;

    if let Some(parent) = archive_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let part_path = archive_path.with_extension("zip.part");

    let written = write_entries(&outputs, &part_path);
    match written {
        Ok(names) => {
            std::fs::rename(&part_path, archive_path)?;
            Ok(names)
        }
        Err(e) => {
            let _ = std::fs::remove_file(&part_path);
            Err(e)
        }
    }
}

fn write_entries(outputs: &[PathBuf], part_path: &Path) -> Result<Vec<String>> {
    let file = File::create(part_path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut names = Vec::with_capacity(outputs.len());
    let mut buffer = Vec::new();
    for path in outputs {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        buffer.clear();
        File::open(path)?.read_to_end(&mut buffer)?;

        zip.start_file(name, options)?;
        zip.write_all(&buffer)?;
        names.push(name.to_string());
    }

    zip.finish()?.sync_all()?;
    Ok(names)
}
