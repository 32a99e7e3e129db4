use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::{Client, Url};

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json::{self, Value};
use rst_common::with_logging::log::{debug, info, warn};
use rst_common::with_tokio::tokio;
use rst_common::with_tokio::tokio::sync::OnceCell;

use satchel_core::runtime::types::LedgerBuilder;
use satchel_core::tails::types::validate_filename;
use satchel_core::tails::{TailsBuilder, TailsError, TailsReader, TailsWriter};

use crate::config::Config;

type Slots<T> = Arc<Mutex<HashMap<String, Arc<OnceCell<T>>>>>;

/// `TailsCache` keeps the local tails files of the agent
///
/// Readers are opened once per filename and shared by every caller. Downloads
/// are single-flight per filename, concurrent callers wait for the same download
#[derive(Clone)]
pub struct TailsCache<TLedger>
where
    TLedger: LedgerBuilder,
{
    dir: PathBuf,
    ledger: TLedger,
    client: Client,
    readers: Slots<Arc<TailsReader>>,
    downloads: Slots<()>,
}

impl<TLedger> TailsCache<TLedger>
where
    TLedger: LedgerBuilder,
{
    pub fn new(dir: PathBuf, ledger: TLedger, timeout: Duration) -> Result<Self, TailsError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| TailsError::TailsDownloadError(err.to_string()))?;

        Ok(Self {
            dir,
            ledger,
            client,
            readers: Arc::new(Mutex::new(HashMap::new())),
            downloads: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn from_config(config: &Config, ledger: TLedger) -> Result<Self, TailsError> {
        Self::new(config.tails().get_path(), ledger, config.http().get_timeout())
    }

    pub fn dir(&self) -> PathBuf {
        self.dir.to_owned()
    }

    fn slot<T>(slots: &Slots<T>, filename: &str) -> Result<Arc<OnceCell<T>>, TailsError> {
        let mut slots = slots
            .lock()
            .map_err(|_| TailsError::IOError("tails cache lock poisoned".to_string()))?;

        let slot = slots
            .entry(filename.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()));

        Ok(slot.clone())
    }

    fn release<T>(
        slots: &Slots<T>,
        filename: &str,
        slot: &Arc<OnceCell<T>>,
    ) -> Result<(), TailsError> {
        let mut slots = slots
            .lock()
            .map_err(|_| TailsError::IOError("tails cache lock poisoned".to_string()))?;

        let same = slots
            .get(filename)
            .map(|current| Arc::ptr_eq(current, slot))
            .unwrap_or(false);

        if same {
            slots.remove(filename);
        }

        Ok(())
    }

    async fn exists(path: &Path) -> Result<bool, TailsError> {
        tokio::fs::try_exists(path)
            .await
            .map_err(|err| TailsError::IOError(err.to_string()))
    }

    async fn download(&self, location: &str, filename: &str) -> Result<(), TailsError> {
        info!(
            "[tails:download] downloading tails file {} from {}",
            filename, location
        );

        let mut response = self
            .client
            .get(location)
            .send()
            .await
            .map_err(|err| TailsError::TailsDownloadError(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TailsError::TailsDownloadError(format!(
                "{} responded with {}",
                location, status
            )));
        }

        let mut writer = TailsWriter::create(&self.dir).await?;
        loop {
            let chunk = match response.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(err) => {
                    writer.abort().await?;
                    return Err(TailsError::TailsDownloadError(err.to_string()));
                }
            };

            if let Err(err) = writer.write(&chunk).await {
                writer.abort().await?;
                return Err(err);
            }
        }

        writer.finalize_as(filename).await?;
        Ok(())
    }
}

/// `tails_location` reads `value.tailsLocation` of a revocation registry definition
fn tails_location(definition_json: &str) -> Result<String, TailsError> {
    let definition: Value = serde_json::from_str(definition_json)
        .map_err(|err| TailsError::InvalidTailsLocation(err.to_string()))?;

    definition
        .get("value")
        .and_then(|value| value.get("tailsLocation"))
        .and_then(|location| location.as_str())
        .map(|location| location.to_string())
        .ok_or(TailsError::InvalidTailsLocation(
            "tailsLocation is missing".to_string(),
        ))
}

/// `tails_filename` is the last non empty path segment of the tails location
fn tails_filename(location: &str) -> Result<String, TailsError> {
    let url =
        Url::parse(location).map_err(|err| TailsError::InvalidTailsLocation(err.to_string()))?;

    let filename = url
        .path_segments()
        .and_then(|segments| segments.filter(|segment| !segment.is_empty()).last())
        .map(|segment| segment.to_string())
        .ok_or(TailsError::InvalidTailsLocation(location.to_string()))?;

    validate_filename(&filename)?;
    Ok(filename)
}

#[async_trait]
impl<TLedger> TailsBuilder for TailsCache<TLedger>
where
    TLedger: LedgerBuilder,
{
    async fn open_for_read(&self, filename: String) -> Result<Arc<TailsReader>, TailsError> {
        validate_filename(&filename)?;

        let slot = Self::slot(&self.readers, &filename)?;
        let reader = slot
            .get_or_try_init(|| async {
                TailsReader::open(&self.dir, &filename)
                    .await
                    .map(Arc::new)
            })
            .await?;

        Ok(reader.clone())
    }

    async fn open_for_write(&self) -> Result<TailsWriter, TailsError> {
        TailsWriter::create(&self.dir).await
    }

    async fn ensure_local(&self, revocation_registry_id: String) -> Result<String, TailsError> {
        let definition = self
            .ledger
            .lookup_revocation_registry_definition(revocation_registry_id.clone())
            .await
            .map_err(|err| TailsError::LedgerError(err.to_string()))?
            .ok_or(TailsError::RegistryNotFound(revocation_registry_id.clone()))?;

        let location = tails_location(&definition)?;
        let filename = tails_filename(&location)?;
        let path = self.dir.join(&filename);

        if Self::exists(&path).await? {
            debug!("[tails:ensure_local] tails file is available: {}", filename);
            return Ok(filename);
        }

        let slot = Self::slot(&self.downloads, &filename)?;
        let downloaded = slot
            .get_or_try_init(|| async {
                match Self::exists(&path).await {
                    Ok(true) => Ok(()),
                    Ok(false) => self.download(&location, &filename).await,
                    Err(err) => Err(err),
                }
            })
            .await
            .map(|_| ());

        match downloaded {
            Ok(_) => {
                Self::release(&self.downloads, &filename, &slot)?;
                Ok(filename)
            }
            Err(err) => {
                warn!(
                    "[tails:ensure_local] unable to fetch tails file for {}: {}",
                    revocation_registry_id, err
                );

                Self::release(&self.downloads, &filename, &slot)?;
                Err(err)
            }
        }
    }
}
