//! Placebook
//!
//! A small server-rendered web application for managing a list of places,
//! each with a title and a hosted image. Uploads go to a remote image
//! service; place metadata lives in a single JSON document on disk.
//!
//! ## Architecture
//!
//! ```text
//! Browser ──▶ Router ──▶ PlaceService ──▶ MediaStore (hosted image API)
//!                │            │
//!                ▼            ▼
//!            Views (HTML)  PlaceStore (db.json)
//! ```
//!
//! Every mutating operation reloads the JSON document, mutates the owned
//! snapshot, and writes the whole document back. There is no locking and no
//! transaction: concurrent writers race and the later persist wins, which is
//! accepted for a single-user tool.

pub mod config;
pub mod error;
pub mod media_store;
pub mod place_store;
pub mod routes;
pub mod service;
pub mod views;

pub use config::Config;
pub use error::{Error, Result};
pub use media_store::{CloudinaryStore, MediaStore, UploadedImage};
pub use place_store::{Place, PlaceBook, PlaceStore};
pub use routes::{create_router, AppState};
pub use service::{ImageUpload, PlaceService};
