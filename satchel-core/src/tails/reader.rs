use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rst_common::with_logging::log::debug;
use rst_common::with_tokio::tokio;

use super::types::{validate_filename, TailsError};

/// `TailsReader` is a read handle over a local tails file
///
/// It is shared behind an `Arc` by every consumer of the same revocation registry,
/// reads are positional so callers never depend on each other's cursor
#[derive(Debug)]
pub struct TailsReader {
    filename: String,
    path: PathBuf,
    len: u64,
    file: Mutex<File>,
}

impl TailsReader {
    pub async fn open(dir: &Path, filename: &str) -> Result<Self, TailsError> {
        validate_filename(filename)?;

        let path = dir.join(filename);
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|err| TailsError::IOError(format!("{}: {}", path.display(), err)))?;

        let metadata = file
            .metadata()
            .await
            .map_err(|err| TailsError::IOError(err.to_string()))?;

        debug!("[tails:open] opened tails file: {}", filename);

        Ok(Self {
            filename: filename.to_string(),
            path,
            len: metadata.len(),
            file: Mutex::new(file.into_std().await),
        })
    }

    pub fn filename(&self) -> String {
        self.filename.to_owned()
    }

    pub fn path(&self) -> PathBuf {
        self.path.to_owned()
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>, TailsError> {
        let end = offset.saturating_add(len as u64);
        if end > self.len {
            return Err(TailsError::IOError(format!(
                "read beyond tails file end: {} > {}",
                end, self.len
            )));
        }

        let mut file = self
            .file
            .lock()
            .map_err(|_| TailsError::IOError("tails reader lock poisoned".to_string()))?;

        let mut buf = vec![0u8; len];
        file.seek(SeekFrom::Start(offset))
            .map_err(|err| TailsError::IOError(err.to_string()))?;
        file.read_exact(&mut buf)
            .map_err(|err| TailsError::IOError(err.to_string()))?;

        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_and_read_at() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("tails-a"), b"0123456789").unwrap();

        let reader = TailsReader::open(dir.path(), "tails-a").await;
        assert!(!reader.is_err());

        let reader = reader.unwrap();
        assert_eq!(reader.len(), 10);
        assert_eq!(reader.filename(), "tails-a".to_string());
        assert_eq!(reader.read_at(3, 4).unwrap(), b"3456".to_vec());
        assert_eq!(reader.read_at(0, 2).unwrap(), b"01".to_vec());
        assert!(reader.read_at(8, 4).is_err())
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let dir = tempdir().unwrap();
        let reader = TailsReader::open(dir.path(), "missing").await;
        assert!(matches!(reader.unwrap_err(), TailsError::IOError(_)))
    }

    #[tokio::test]
    async fn test_open_rejects_path_traversal() {
        let dir = tempdir().unwrap();
        let reader = TailsReader::open(dir.path(), "../outside").await;
        assert!(matches!(
            reader.unwrap_err(),
            TailsError::InvalidFilename(_)
        ))
    }
}
