mod queries;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use photoflow_application::{ApplicationError, ImageStore, StoreSnapshot};
use photoflow_domain::{HashedImage, ImageHash, ImageId};
use rusqlite::Connection;
use tracing::info;

use crate::migrations::MIGRATIONS;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct NewImage {
    pub file_name: String,
    pub hash: ImageHash,
    pub data: Option<Vec<u8>>,
    pub thumbnail_data: Option<Vec<u8>>,
}

/// Image catalog kept in a single SQLite file.
///
/// Each snapshot owns a separate connection holding a deferred read transaction, so
/// writes committed after the snapshot's first read stay invisible to it.
#[derive(Debug, Clone)]
pub struct SqliteImageStore {
    path: PathBuf,
}

impl SqliteImageStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_connection(&self) -> Result<Connection, ApplicationError> {
        let conn = Connection::open(&self.path)
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?;
        Ok(conn)
    }

    pub fn initialize(&self) -> Result<(), ApplicationError> {
        if self.path.as_os_str().is_empty() {
            return Err(ApplicationError::InvalidInput(
                "catalog path must not be empty".to_string(),
            ));
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|error| ApplicationError::Io(error.to_string()))?;
            }
        }

        let conn = self.open_connection()?;
        conn.execute_batch("PRAGMA foreign_keys=ON; PRAGMA journal_mode=WAL;")
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?;

        for migration in MIGRATIONS {
            conn.execute_batch(migration)
                .map_err(|error| ApplicationError::Persistence(error.to_string()))?;
        }

        info!(path = %self.path.display(), "image catalog initialized");
        Ok(())
    }

    pub fn insert_image(&self, image: &NewImage) -> Result<ImageId, ApplicationError> {
        let conn = self.open_connection()?;
        let id = queries::insert_image(
            &conn,
            &image.file_name,
            image.hash.bits() as i64,
            image.data.as_deref(),
            image.thumbnail_data.as_deref(),
        )
        .map_err(|error| ApplicationError::Persistence(error.to_string()))?;
        Ok(ImageId::new(id)?)
    }
}

fn hashed_image((id, hash): (i64, i64)) -> Result<HashedImage, ApplicationError> {
    Ok(HashedImage {
        id: ImageId::new(id)?,
        hash: ImageHash::new(hash as u64),
    })
}

impl ImageStore for SqliteImageStore {
    fn enumerate(&self) -> Result<Vec<HashedImage>, ApplicationError> {
        let conn = self.open_connection()?;
        queries::list_hashed_images(&conn)
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?
            .into_iter()
            .map(hashed_image)
            .collect()
    }

    fn find_image(&self, image_id: ImageId) -> Result<Option<HashedImage>, ApplicationError> {
        let conn = self.open_connection()?;
        queries::find_hashed_image(&conn, image_id.get())
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?
            .map(hashed_image)
            .transpose()
    }

    fn snapshot(&self) -> Result<Box<dyn StoreSnapshot>, ApplicationError> {
        let conn = self.open_connection()?;
        conn.execute_batch("BEGIN DEFERRED")
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?;
        Ok(Box::new(SqliteSnapshot { conn }))
    }
}

/// Read view backed by its own connection; the open transaction is rolled back on drop.
struct SqliteSnapshot {
    conn: Connection,
}

impl StoreSnapshot for SqliteSnapshot {
    fn resolve(&mut self, image_id: ImageId) -> Result<Option<HashedImage>, ApplicationError> {
        queries::find_hashed_image(&self.conn, image_id.get())
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?
            .map(hashed_image)
            .transpose()
    }

    fn full_payload(&mut self, image: &HashedImage) -> Result<Option<Vec<u8>>, ApplicationError> {
        queries::full_payload(&self.conn, image.id.get())
            .map_err(|error| ApplicationError::Persistence(error.to_string()))
    }

    fn thumbnail_payload(
        &mut self,
        image: &HashedImage,
    ) -> Result<Option<Vec<u8>>, ApplicationError> {
        queries::thumbnail_payload(&self.conn, image.id.get())
            .map_err(|error| ApplicationError::Persistence(error.to_string()))
    }
}
