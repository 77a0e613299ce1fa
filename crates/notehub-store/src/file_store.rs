use std::{
    fmt::Display,
    path::{Path, PathBuf},
    sync::Arc,
};

use bytes::Bytes;
use futures::{pin_mut, Stream, StreamExt as _, TryFutureExt as _, TryStreamExt as _};
use sha2::{Digest, Sha256};
use tokio::{fs, io::AsyncWriteExt as _};
use tokio_util::io::ReaderStream;
use tracing::{debug, error};

use crate::{
    error::{StoreError, StoreResult},
    StoreInfo, ValidatedName,
};

#[inline]
fn hex(bytes: &[u8]) -> String {
    base16ct::lower::encode_string(bytes)
}

async fn cleanup<E: Display>(path: &Path, error: E) -> Result<(), E> {
    error!("Failed to store file to tmp path {path:?}: {error}");
    fs::remove_file(path)
        .await
        .map_err(|e| error!("Failed to remove file {path:?}: {e}"))
        .ok();
    Err(error)
}

struct FileStoreInner {
    root: PathBuf,
}

/// Flat file store rooted at a single directory (uploads are served
/// back verbatim by name, there is no hierarchy).
#[derive(Clone)]
pub struct FileStore {
    inner: Arc<FileStoreInner>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(FileStoreInner { root: root.into() }),
        }
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn local_path(&self, name: &ValidatedName) -> PathBuf {
        self.inner.root.join(name.as_ref())
    }

    async fn prepare_paths(&self, name: &ValidatedName) -> StoreResult<(PathBuf, PathBuf)> {
        if !self.inner.root.exists() {
            fs::create_dir_all(&self.inner.root).await?;
        }
        let final_path = self.local_path(name);
        let tmp_path = final_path.with_extension("tmp");
        Ok((final_path, tmp_path))
    }

    pub async fn store_stream<S, E>(&self, name: &ValidatedName, stream: S) -> StoreResult<StoreInfo>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<StoreError>,
    {
        let (final_path, tmp_path) = self.prepare_paths(name).await?;
        let mut file = fs::File::create(&tmp_path).await?;
        let mut size = 0;
        pin_mut!(stream);
        let mut digester = Sha256::new();
        while let Some(chunk) = stream.next().await {
            match chunk.map_err(|e| e.into()) {
                Ok(chunk) => {
                    file.write_all(&chunk)
                        .or_else(|e| cleanup(&tmp_path, e))
                        .await?;
                    size += chunk.len() as u64;
                    digester.update(&chunk);
                }
                Err(e) => {
                    cleanup(&tmp_path, e).await?;
                    unreachable!()
                }
            }
        }
        file.flush().await?;
        debug!("Stored {size} bytes to {tmp_path:?} and will move to {final_path:?}");
        fs::rename(&tmp_path, &final_path).await?;
        let digest = digester.finalize();

        Ok(StoreInfo {
            file_name: name.as_ref().to_string(),
            size,
            hash: hex(&digest),
        })
    }

    pub async fn store_data(&self, name: &ValidatedName, data: &[u8]) -> StoreResult<StoreInfo> {
        let (final_path, tmp_path) = self.prepare_paths(name).await?;
        fs::File::create(&tmp_path)
            .await?
            .write_all(data)
            .or_else(|e| cleanup(&tmp_path, e))
            .await?;
        fs::rename(&tmp_path, &final_path).await?;
        let digest = Sha256::digest(data);
        Ok(StoreInfo {
            file_name: name.as_ref().to_string(),
            size: data.len() as u64,
            hash: hex(&digest),
        })
    }

    pub async fn load(
        &self,
        name: &ValidatedName,
    ) -> Result<impl Stream<Item = StoreResult<Bytes>> + 'static, StoreError> {
        let final_path = self.local_path(name);
        let file = fs::File::open(&final_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(name.as_ref().to_string())
            } else {
                e.into()
            }
        })?;
        let stream = ReaderStream::new(file).map_err(StoreError::from);
        Ok(stream)
    }

    pub async fn size(&self, name: &ValidatedName) -> StoreResult<u64> {
        let final_path = self.local_path(name);
        let meta = fs::metadata(&final_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(name.as_ref().to_string())
            } else {
                StoreError::from(e)
            }
        })?;
        Ok(meta.len())
    }
}

#[cfg(test)]
mod tests {
    use futures::stream::try_unfold;

    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 3)]
    async fn test_store() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let content = b"lecture notes";
        let store = FileStore::new(tmp_dir.path());
        let store2 = store.clone();
        // store must be usable from another task
        let name = ValidatedName::new("lecture.txt").unwrap();
        let name2 = name.clone();
        let handle = tokio::spawn(async move { store2.store_data(&name2, content).await });
        let res = handle.await.unwrap().unwrap();
        assert_eq!(res.size, 13);
        assert_eq!(res.file_name, "lecture.txt");
        assert!(store.local_path(&name).exists());
        assert_eq!(fs::read(store.local_path(&name)).await.unwrap(), content);
    }

    fn data_generator(size_kb: u8) -> impl Stream<Item = StoreResult<Bytes>> {
        try_unfold(size_kb, |mut count| async move {
            if count == 0 {
                Ok::<_, StoreError>(None)
            } else {
                let data = rand::random::<[u8; 1024]>();
                let data = data.to_vec();
                count -= 1;

                Ok(Some((Bytes::from(data), count)))
            }
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 3)]
    async fn test_stream() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let chunks = data_generator(10);

        let store = FileStore::new(tmp_dir.path().join("uploads"));
        let name = ValidatedName::new("cover.png").unwrap();
        let res = store.store_stream(&name, chunks).await.unwrap();
        assert_eq!(res.file_name, "cover.png");
        assert_eq!(res.size, 10240);
        let file_path = store.local_path(&name);
        assert!(file_path.exists());
        let meta = file_path.metadata().unwrap();
        assert_eq!(meta.len(), 10240);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 3)]
    async fn test_load() {
        let size_kb: u8 = 100;
        let size = size_kb as usize * 1024;
        let tmp_dir = tempfile::tempdir().unwrap();
        let chunks = data_generator(size_kb);
        let name = ValidatedName::new("notes.pdf").unwrap();
        let store = FileStore::new(tmp_dir.path());
        let _res = store.store_stream(&name, chunks).await.unwrap();
        let mut stream = store.load(&name).await.unwrap();
        let mut data = Vec::with_capacity(size);
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();
            data.extend_from_slice(&chunk);
        }
        assert_eq!(data.len(), size);
        let original = fs::read(tmp_dir.path().join("notes.pdf")).await.unwrap();
        assert_eq!(data, original);
        assert_eq!(store.size(&name).await.unwrap(), size as u64);

        let missing = ValidatedName::new("absent.pdf").unwrap();
        assert!(matches!(
            store.load(&missing).await.map(|_| ()).unwrap_err(),
            StoreError::NotFound(_)
        ));
    }
}
