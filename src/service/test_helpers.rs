//! Shared test helpers for creating BatchService instances in tests.

use crate::config::Config;
use crate::converter::Converter;
use crate::error::{ConversionError, Result};
use crate::service::BatchService;
use crate::types::{Job, UploadedFile};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::Semaphore;

/// Scripted behaviour for one input filename
#[derive(Clone, Debug)]
pub(crate) enum Script {
    /// Image conversion returns this text
    Text(String),
    /// Document conversion returns these pages
    Pages(Vec<String>),
    /// Conversion fails with a backend error carrying this message
    Fail(String),
    /// Conversion sleeps this long before answering with default output
    Delay(Duration),
    /// Conversion panics with this message
    Panic(&'static str),
}

/// In-memory converter with per-filename scripts
///
/// Unscripted images convert to `text of <filename>`; unscripted documents to a
/// single page `page 1 of <filename>`.
#[derive(Default)]
pub(crate) struct ScriptedConverter {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<(String, String)>>,
    gate: Option<Arc<Semaphore>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    healthy: bool,
}

impl ScriptedConverter {
    pub(crate) fn new() -> Self {
        Self {
            healthy: true,
            ..Self::default()
        }
    }

    /// Every call waits for a permit on `gate` before answering
    pub(crate) fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }

    pub(crate) fn unhealthy() -> Self {
        Self::default()
    }

    pub(crate) fn script(self, filename: &str, script: Script) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(filename.to_string(), script);
        self
    }

    /// `(filename, prompt)` for every call, in call order
    pub(crate) fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of calls observed in flight at once
    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, filename: &str, prompt: &str) -> Option<Script> {
        self.calls
            .lock()
            .unwrap()
            .push((filename.to_string(), prompt.to_string()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        let script = self.scripts.lock().unwrap().get(filename).cloned();
        if let Some(Script::Delay(delay)) = script {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        script
    }
}

#[async_trait]
impl Converter for ScriptedConverter {
    async fn convert_image(&self, filename: &str, _bytes: Vec<u8>, prompt: &str) -> Result<String> {
        match self.enter(filename, prompt).await {
            Some(Script::Text(text)) => Ok(text),
            Some(Script::Pages(pages)) => Ok(pages.join("\n")),
            Some(Script::Fail(message)) => Err(ConversionError::Backend {
                status: 500,
                message,
            }
            .into()),
            Some(Script::Panic(message)) => panic!("{message}"),
            Some(Script::Delay(_)) | None => Ok(format!("text of {filename}")),
        }
    }

    async fn convert_document(
        &self,
        filename: &str,
        _bytes: Vec<u8>,
        prompt: &str,
    ) -> Result<Vec<String>> {
        match self.enter(filename, prompt).await {
            Some(Script::Pages(pages)) => Ok(pages),
            Some(Script::Text(text)) => Ok(vec![text]),
            Some(Script::Fail(message)) => Err(ConversionError::Backend {
                status: 500,
                message,
            }
            .into()),
            Some(Script::Panic(message)) => panic!("{message}"),
            Some(Script::Delay(_)) | None => Ok(vec![format!("page 1 of {filename}")]),
        }
    }

    async fn health(&self) -> Result<bool> {
        Ok(self.healthy)
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Test configuration with both artifact roots inside `root`
pub(crate) fn test_config(root: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.storage.upload_dir = root.join("uploads");
    config.storage.results_dir = root.join("results");
    config.processing.max_concurrent_jobs = 2;
    config.processing.conversion_timeout = Duration::from_secs(5);
    config
}

/// Helper to create a test BatchService backed by `converter`.
/// Returns the service and the tempdir (which must be kept alive).
pub(crate) async fn create_test_service(
    converter: Arc<ScriptedConverter>,
) -> (BatchService, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path());
    let service = BatchService::with_converter(config, converter)
        .await
        .unwrap();
    (service, temp_dir)
}

/// Same as [`create_test_service`] with a caller-adjusted config
pub(crate) async fn create_test_service_with(
    converter: Arc<ScriptedConverter>,
    adjust: impl FnOnce(&mut Config),
) -> (BatchService, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let mut config = test_config(temp_dir.path());
    adjust(&mut config);
    let service = BatchService::with_converter(config, converter)
        .await
        .unwrap();
    (service, temp_dir)
}

/// Upload fixture with a recognisable body
pub(crate) fn upload(name: &str) -> UploadedFile {
    UploadedFile::new(name, format!("content of {name}").into_bytes())
}

/// Submit `names` and wait for the job to finish
pub(crate) async fn run_batch(service: &BatchService, names: &[&str]) -> Job {
    let submitted = service
        .submit(names.iter().map(|n| upload(n)).collect(), None)
        .await
        .unwrap();
    tokio::time::timeout(Duration::from_secs(10), submitted.handle.wait())
        .await
        .expect("job should finish")
        .unwrap()
}

/// Read every entry of a ZIP archive as `(name, content)`
pub(crate) fn read_archive(path: &std::path::Path) -> Vec<(String, String)> {
    use std::io::Read;

    let mut archive = zip::ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).unwrap();
            let mut content = String::new();
            entry.read_to_string(&mut content).unwrap();
            (entry.name().to_string(), content)
        })
        .collect()
}
