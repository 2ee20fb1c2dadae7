use sqlx::mysql::MySqlDatabaseError;

pub fn is_dup_key(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db) = err {
        if let Some(mysql_err) = db.try_downcast_ref::<MySqlDatabaseError>() {
            return mysql_err.number() == 1062; // ER_DUP_ENTRY
        }
    }

    false
}

/// Table names are spliced into SQL text, so only plain identifiers are accepted:
/// ASCII letters, digits and underscores, optionally qualified by one schema name.
pub fn is_valid_table_name(name: &str) -> bool {
    let mut parts = name.split('.');
    let valid_part = |part: &str| {
        !part.is_empty()
            && part.len() <= 64
            && !part.starts_with(|c: char| c.is_ascii_digit())
            && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    };
    match (parts.next(), parts.next(), parts.next()) {
        (Some(table), None, None) => valid_part(table),
        (Some(schema), Some(table), None) => valid_part(schema) && valid_part(table),
        _ => false,
    }
}
