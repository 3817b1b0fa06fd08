use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// A titled location record with an associated hosted image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    /// Unique place ID, generated at creation and never reused
    pub id: Uuid,
    /// Free-text label
    pub title: String,
    /// Publicly resolvable URL of the stored image
    pub image_url: String,
    /// Opaque id used to delete/replace the image at the hosting service
    pub image_public_id: String,
    /// When the place was created
    pub created_at: DateTime<Utc>,
    /// When the place was last edited; absent until first edit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// The full persisted collection, in insertion (display) order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceBook {
    /// All places, oldest first
    pub places: Vec<Place>,
}

impl PlaceBook {
    /// Find a place by id
    pub fn find(&self, id: Uuid) -> Option<&Place> {
        self.places.iter().find(|p| p.id == id)
    }

    /// Find the index of a place by id
    pub fn position(&self, id: Uuid) -> Option<usize> {
        self.places.iter().position(|p| p.id == id)
    }
}

/// File-backed store for the place collection.
///
/// The on-disk JSON document is the durable mirror of the collection; callers
/// own the in-memory `PlaceBook` between `load` and `persist`. The store is
/// not transactional and takes no locks: concurrent writers race, and the
/// later `persist` wins.
pub struct PlaceStore {
    path: PathBuf,
}

impl PlaceStore {
    /// Create a store backed by the given file path
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the entire persisted document into memory.
    ///
    /// A missing file is treated as an empty collection so that the first
    /// boot needs no seed document.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<PlaceBook> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("store file missing, starting with empty collection");
                return Ok(PlaceBook::default());
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to read store file {}", self.path.display())
                });
            }
        };

        let book: PlaceBook = serde_json::from_slice(&raw).with_context(|| {
            format!("failed to parse store file {}", self.path.display())
        })?;

        debug!(places = book.places.len(), "loaded place collection");

        Ok(book)
    }

    /// Serialize the full collection and overwrite the backing file.
    #[instrument(skip(self, book), fields(path = %self.path.display(), places = book.places.len()))]
    pub async fn persist(&self, book: &PlaceBook) -> Result<()> {
        let raw = serde_json::to_vec_pretty(book).context("failed to serialize collection")?;

        tokio::fs::write(&self.path, raw).await.with_context(|| {
            format!("failed to write store file {}", self.path.display())
        })?;

        info!(places = book.places.len(), "persisted place collection");

        Ok(())
    }
}
