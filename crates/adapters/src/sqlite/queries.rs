use rusqlite::{params, Connection, OptionalExtension, Result};

pub fn insert_image(
    conn: &Connection,
    file_name: &str,
    image_hash: i64,
    data: Option<&[u8]>,
    thumbnail_data: Option<&[u8]>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO images (file_name, image_hash, data, thumbnail_data)
         VALUES (?1, ?2, ?3, ?4)",
        params![file_name, image_hash, data, thumbnail_data],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_hashed_images(conn: &Connection) -> Result<Vec<(i64, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT id, image_hash
         FROM images
         ORDER BY id ASC",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

pub fn find_hashed_image(conn: &Connection, image_id: i64) -> Result<Option<(i64, i64)>> {
    conn.query_row(
        "SELECT id, image_hash FROM images WHERE id = ?1",
        params![image_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
}

pub fn full_payload(conn: &Connection, image_id: i64) -> Result<Option<Vec<u8>>> {
    let found: Option<Option<Vec<u8>>> = conn
        .query_row(
            "SELECT data FROM images WHERE id = ?1",
            params![image_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.flatten())
}

pub fn thumbnail_payload(conn: &Connection, image_id: i64) -> Result<Option<Vec<u8>>> {
    let found: Option<Option<Vec<u8>>> = conn
        .query_row(
            "SELECT thumbnail_data FROM images WHERE id = ?1",
            params![image_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.flatten())
}
