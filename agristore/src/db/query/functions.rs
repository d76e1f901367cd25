//! SQL functions registered on every pooled connection

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

/// Unicode-aware lower-casing; SQLite's built-in `LOWER` folds ASCII only
pub const UNICODE_LOWER: &str = "unicode_lower";

pub fn register(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        UNICODE_LOWER,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|s| s.to_lowercase()))
        },
    )
}
