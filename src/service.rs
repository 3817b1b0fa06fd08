use crate::error::{Error, Result};
use crate::media_store::MediaStore;
use crate::place_store::{Place, PlaceBook, PlaceStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// A freshly parsed image upload, held fully in memory
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Raw file content
    pub bytes: Vec<u8>,
    /// Declared content type of the file
    pub mime_type: String,
}

/// Orchestrates place operations across the media client and the record
/// store.
///
/// Every operation reloads the collection from disk, mutates the owned
/// snapshot, and persists it back; the store is never kept in memory across
/// requests. Two concurrent writers can still race (later persist wins);
/// that lost-update window is accepted for a single-user tool.
pub struct PlaceService {
    media: Arc<dyn MediaStore>,
    store: PlaceStore,
}

impl PlaceService {
    /// Create a new service over the given media client and record store
    pub fn new(media: Arc<dyn MediaStore>, store: PlaceStore) -> Self {
        Self { media, store }
    }

    /// All places in stored (display) order
    pub async fn list(&self) -> Result<Vec<Place>> {
        let book = self.reload().await?;
        Ok(book.places)
    }

    /// A single place by id
    pub async fn get(&self, id: Uuid) -> Result<Place> {
        let book = self.reload().await?;
        book.find(id)
            .cloned()
            .ok_or_else(|| Error::not_found(id.to_string()))
    }

    /// Create a place from a title and an uploaded image.
    ///
    /// The image is uploaded first; no record is created if that fails. If
    /// the persist after a successful upload fails, the fresh remote image
    /// would be orphaned, so the service compensates with a best-effort
    /// delete before surfacing the error.
    #[instrument(skip(self, image), fields(title = %title, size_bytes = image.bytes.len()))]
    pub async fn create(&self, title: &str, image: ImageUpload) -> Result<Place> {
        if title.trim().is_empty() {
            return Err(Error::bad_request("title is required"));
        }

        let mut book = self.reload().await?;

        let uploaded = self.media.upload(&image.bytes, &image.mime_type).await?;

        let place = Place {
            id: Uuid::new_v4(),
            title: title.to_string(),
            image_url: uploaded.url,
            image_public_id: uploaded.public_id.clone(),
            created_at: Utc::now(),
            updated_at: None,
        };
        book.places.push(place.clone());

        if let Err(e) = self.store.persist(&book).await {
            // Compensate for the would-be orphaned remote image
            if let Err(cleanup) = self.media.delete(&uploaded.public_id).await {
                warn!(
                    public_id = %uploaded.public_id,
                    error = %cleanup,
                    "failed to clean up remote image after persist failure, object is orphaned"
                );
            }
            return Err(Error::Persist(e));
        }

        metrics::counter!("places.created").increment(1);

        info!(id = %place.id, "place created");

        Ok(place)
    }

    /// Update a place's title and, optionally, replace its image.
    ///
    /// When a new image is supplied the old remote object is deleted first,
    /// best-effort: a failure there is logged and never aborts the edit.
    /// Failure to upload the replacement aborts with the record unchanged.
    #[instrument(skip(self, image), fields(id = %id, title = %title))]
    pub async fn edit(&self, id: Uuid, title: &str, image: Option<ImageUpload>) -> Result<Place> {
        let mut book = self.reload().await?;

        let index = book
            .position(id)
            .ok_or_else(|| Error::not_found(id.to_string()))?;

        if let Some(image) = image {
            let old_public_id = book.places[index].image_public_id.clone();
            if !old_public_id.is_empty() {
                if let Err(e) = self.media.delete(&old_public_id).await {
                    warn!(
                        public_id = %old_public_id,
                        error = %e,
                        "failed to delete replaced remote image, continuing"
                    );
                }
            }

            let uploaded = self.media.upload(&image.bytes, &image.mime_type).await?;
            book.places[index].image_url = uploaded.url;
            book.places[index].image_public_id = uploaded.public_id;
        }

        book.places[index].title = title.to_string();
        book.places[index].updated_at = Some(Utc::now());

        self.store.persist(&book).await.map_err(Error::Persist)?;

        metrics::counter!("places.updated").increment(1);

        info!("place updated");

        Ok(book.places[index].clone())
    }

    /// Remove a place and, best-effort, its remote image.
    ///
    /// A failed remote delete is logged and never blocks record removal.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let mut book = self.reload().await?;

        let index = book
            .position(id)
            .ok_or_else(|| Error::not_found(id.to_string()))?;

        let public_id = book.places[index].image_public_id.clone();
        if !public_id.is_empty() {
            if let Err(e) = self.media.delete(&public_id).await {
                warn!(
                    public_id = %public_id,
                    error = %e,
                    "failed to delete remote image, removing record anyway"
                );
            }
        }

        book.places.remove(index);

        self.store.persist(&book).await.map_err(Error::Persist)?;

        metrics::counter!("places.deleted").increment(1);

        info!("place deleted");

        Ok(())
    }

    async fn reload(&self) -> Result<PlaceBook> {
        self.store.load().await.map_err(Error::Persist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media_store::testing::FakeMediaStore;

    fn jpeg_upload() -> ImageUpload {
        ImageUpload {
            bytes: vec![0xff, 0xd8, 0xff, 0xe0],
            mime_type: "image/jpeg".to_string(),
        }
    }

    fn service_in(dir: &tempfile::TempDir) -> (PlaceService, Arc<FakeMediaStore>) {
        let media = FakeMediaStore::new();
        let store = PlaceStore::new(dir.path().join("db.json"));
        (PlaceService::new(media.clone(), store), media)
    }

    #[tokio::test]
    async fn test_create_grows_collection_with_fresh_id() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _media) = service_in(&dir);

        let first = service.create("Lighthouse", jpeg_upload()).await.unwrap();
        let second = service.create("Harbor", jpeg_upload()).await.unwrap();

        let places = service.list().await.unwrap();
        assert_eq!(places.len(), 2);
        assert_ne!(first.id, second.id);
        assert_eq!(places[0].title, "Lighthouse");
        assert!(!places[0].image_url.is_empty());
        assert!(places[0].updated_at.is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_blank_title() {
        let dir = tempfile::tempdir().unwrap();
        let (service, media) = service_in(&dir);

        let err = service.create("   ", jpeg_upload()).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest { .. }));
        // Nothing was uploaded for the rejected request
        assert_eq!(media.upload_count(), 0);
    }

    #[tokio::test]
    async fn test_create_upload_failure_leaves_no_record() {
        let dir = tempfile::tempdir().unwrap();
        let (service, media) = service_in(&dir);
        media.fail_uploads();

        let err = service.create("Lighthouse", jpeg_upload()).await.unwrap_err();
        assert!(matches!(err, Error::Upload(_)));
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_persist_failure_compensates_remote_image() {
        let dir = tempfile::tempdir().unwrap();
        let media = FakeMediaStore::new();
        // Parent directory does not exist, so the persist write fails
        let store = PlaceStore::new(dir.path().join("missing").join("db.json"));
        let service = PlaceService::new(media.clone(), store);

        let err = service.create("Lighthouse", jpeg_upload()).await.unwrap_err();
        assert!(matches!(err, Error::Persist(_)));
        assert_eq!(media.deleted(), vec!["places/upload-1".to_string()]);
    }

    #[tokio::test]
    async fn test_edit_without_image_keeps_image_fields() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _media) = service_in(&dir);

        let created = service.create("Lighthouse", jpeg_upload()).await.unwrap();
        let edited = service
            .edit(created.id, "Lighthouse Point", None)
            .await
            .unwrap();

        assert_eq!(edited.title, "Lighthouse Point");
        assert_eq!(edited.image_url, created.image_url);
        assert_eq!(edited.image_public_id, created.image_public_id);
        assert!(edited.updated_at.is_some());
        assert_eq!(edited.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_edit_with_image_replaces_remote_object() {
        let dir = tempfile::tempdir().unwrap();
        let (service, media) = service_in(&dir);

        let created = service.create("Lighthouse", jpeg_upload()).await.unwrap();
        let edited = service
            .edit(created.id, "Lighthouse", Some(jpeg_upload()))
            .await
            .unwrap();

        assert_ne!(edited.image_public_id, created.image_public_id);
        assert_eq!(media.deleted(), vec![created.image_public_id]);
    }

    #[tokio::test]
    async fn test_edit_tolerates_old_image_delete_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (service, media) = service_in(&dir);

        let created = service.create("Lighthouse", jpeg_upload()).await.unwrap();
        media.fail_deletes();

        let edited = service
            .edit(created.id, "Lighthouse", Some(jpeg_upload()))
            .await
            .unwrap();
        assert_ne!(edited.image_public_id, created.image_public_id);
    }

    #[tokio::test]
    async fn test_edit_unknown_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _media) = service_in(&dir);

        let err = service
            .edit(Uuid::new_v4(), "Anything", None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_removes_record_and_remote_image() {
        let dir = tempfile::tempdir().unwrap();
        let (service, media) = service_in(&dir);

        let created = service.create("Lighthouse", jpeg_upload()).await.unwrap();
        service.delete(created.id).await.unwrap();

        assert!(service.list().await.unwrap().is_empty());
        assert_eq!(media.deleted(), vec![created.image_public_id]);
    }

    #[tokio::test]
    async fn test_delete_tolerates_remote_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (service, media) = service_in(&dir);

        let created = service.create("Lighthouse", jpeg_upload()).await.unwrap();
        media.fail_deletes();

        service.delete(created.id).await.unwrap();
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_id_leaves_collection_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _media) = service_in(&dir);

        let created = service.create("Lighthouse", jpeg_upload()).await.unwrap();
        let err = service.delete(Uuid::new_v4()).await.unwrap_err();

        assert!(err.is_not_found());
        let places = service.list().await.unwrap();
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].id, created.id);
    }
}
