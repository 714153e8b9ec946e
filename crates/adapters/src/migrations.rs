pub const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS images (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        file_name       TEXT NOT NULL,
        image_hash      INTEGER NOT NULL,
        data            BLOB,
        thumbnail_data  BLOB
    );",
    "CREATE INDEX IF NOT EXISTS idx_images_image_hash ON images(image_hash);",
];
