use bytes::Bytes;
use longscribe_core::{RemoteObject, StorageError};
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use std::path::Path;
use std::sync::Arc;

/// The bucket audio is staged in while a recognition job reads it.
///
/// Uploads and deletes are separate calls: the pipeline deletes only once the
/// job that consumes the object has finished.
#[derive(Clone)]
pub struct StagingBucket {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl StagingBucket {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: &str) -> Self {
        Self {
            store,
            bucket: bucket.to_string(),
        }
    }

    /// Connect to Google Cloud Storage using credentials from the environment
    /// (`GOOGLE_SERVICE_ACCOUNT`, `GOOGLE_APPLICATION_CREDENTIALS`, ...).
    pub fn gcs(bucket: &str) -> Result<Self, StorageError> {
        let store = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| StorageError::InitializationFailed(e.to_string()))?;
        Ok(Self::new(Arc::new(store), bucket))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub async fn upload(&self, local: &Path, name: &str) -> Result<RemoteObject, StorageError> {
        let data = tokio::fs::read(local).await;
        let data = data.map_err(|source| StorageError::LocalRead {
            path: local.display().to_string(),
            source,
        })?;
        let size = data.len();

        let payload = PutPayload::from(Bytes::from(data));
        self.store
            .put(&ObjectPath::from(name), payload)
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        let object = RemoteObject {
            bucket: self.bucket.clone(),
            name: name.to_string(),
        };
        tracing::info!(uri = %object, bytes = size, "uploaded audio");
        Ok(object)
    }

    pub async fn delete(&self, object: &RemoteObject) -> Result<(), StorageError> {
        if object.bucket != self.bucket {
            return Err(StorageError::DeleteFailed(format!(
                "{} is not in staging bucket {}",
                object, self.bucket
            )));
        }
        self.store
            .delete(&ObjectPath::from(object.name.as_str()))
            .await
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;
        tracing::info!(uri = %object, "deleted staged audio");
        Ok(())
    }

    pub async fn exists(&self, object: &RemoteObject) -> Result<bool, StorageError> {
        let path = ObjectPath::from(object.name.as_str());
        match self.store.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::LookupFailed(e.to_string())),
        }
    }
}
