use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use rst_common::standard::uuid::Uuid;
use rst_common::with_logging::log::{debug, warn};
use rst_common::with_tokio::tokio;
use rst_common::with_tokio::tokio::io::AsyncWriteExt;

use super::types::{validate_filename, TailsError};

/// `TailsWriter` is a single-use writer into the tails directory
///
/// Bytes are written into a hidden temporary file next to their final location.
/// The file only becomes visible under its final name once [`TailsWriter::finalize`]
/// or [`TailsWriter::finalize_as`] renames it, so readers never observe a partial file.
/// A writer dropped before it is finalized removes its temporary file
pub struct TailsWriter {
    dir: PathBuf,
    temp_path: PathBuf,
    file: tokio::fs::File,
    hasher: Sha256,
    written: u64,
    settled: bool,
}

impl TailsWriter {
    pub async fn create(dir: &Path) -> Result<Self, TailsError> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|err| TailsError::IOError(err.to_string()))?;

        let temp_path = dir.join(format!(".tails.{}.partial", Uuid::new_v4()));
        let file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|err| TailsError::IOError(err.to_string()))?;

        Ok(Self {
            dir: dir.to_path_buf(),
            temp_path,
            file,
            hasher: Sha256::new(),
            written: 0,
            settled: false,
        })
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), TailsError> {
        self.file
            .write_all(chunk)
            .await
            .map_err(|err| TailsError::IOError(err.to_string()))?;

        self.hasher.update(chunk);
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// `finalize` publishes the file under the hex encoded sha256 of its content
    pub async fn finalize(self) -> Result<String, TailsError> {
        let filename = hex::encode(self.hasher.clone().finalize());
        self.finalize_as(&filename).await
    }

    /// `finalize_as` publishes the file under the given filename
    ///
    /// On failure the temporary file is removed
    pub async fn finalize_as(mut self, filename: &str) -> Result<String, TailsError> {
        if let Err(err) = validate_filename(filename) {
            self.abort().await?;
            return Err(err);
        }

        let synced = match self.file.flush().await {
            Ok(_) => self.file.sync_all().await,
            Err(err) => Err(err),
        };

        if let Err(err) = synced {
            self.abort().await?;
            return Err(TailsError::IOError(err.to_string()));
        }

        let target = self.dir.join(filename);
        if let Err(err) = tokio::fs::rename(&self.temp_path, &target).await {
            self.abort().await?;
            return Err(TailsError::IOError(err.to_string()));
        }
        self.settled = true;

        debug!(
            "[tails:finalize] published tails file: {} ({} bytes)",
            filename, self.written
        );

        Ok(filename.to_string())
    }

    /// `abort` drops the written bytes
    pub async fn abort(mut self) -> Result<(), TailsError> {
        match tokio::fs::remove_file(&self.temp_path).await {
            Ok(_) => {
                self.settled = true;
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                self.settled = true;
                Ok(())
            }
            Err(err) => {
                warn!(
                    "[tails:abort] unable to remove {}: {}",
                    self.temp_path.display(),
                    err
                );
                Err(TailsError::IOError(err.to_string()))
            }
        }
    }
}

impl Drop for TailsWriter {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        match std::fs::remove_file(&self.temp_path) {
            Ok(_) => debug!(
                "[tails:drop] removed unfinished tails file: {}",
                self.temp_path.display()
            ),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!(
                "[tails:drop] unable to remove {}: {}",
                self.temp_path.display(),
                err
            ),
        }
    }
}
