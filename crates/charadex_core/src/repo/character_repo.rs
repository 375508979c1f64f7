//! Character repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over canonical `characters` storage.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Identifiers come from `AUTOINCREMENT` and are never reused, so reads
//!   in id order reproduce insertion order.
//! - `info_url` is persisted scheme-less; read paths reject rows that
//!   violate this instead of masking them.
//! - Name search is exact and case-sensitive (BINARY collation).
//!
//! # See also
//! - docs/architecture/data-model.md

use crate::db::{migrations::latest_version, DbError};
use crate::model::character::{Character, CharacterFields, CharacterId};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const CHARACTER_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    appearance_date,
    info_url,
    image,
    category
FROM characters";

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for character persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target record does not exist.
    NotFound(CharacterId),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "character not found: {id}"),
            Self::InvalidData(message) => {
                write!(f, "invalid persisted character data: {message}")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "character repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "character repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "character repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
            Self::MissingRequiredColumn { .. } => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for character CRUD operations.
pub trait CharacterRepository {
    /// Inserts one record and returns its storage-assigned id.
    fn insert_character(&self, fields: &CharacterFields) -> RepoResult<CharacterId>;
    /// Replaces every mutable field of an existing record.
    fn update_character(&self, id: CharacterId, fields: &CharacterFields) -> RepoResult<()>;
    /// Deletes one record; returns whether it existed.
    fn delete_character(&self, id: CharacterId) -> RepoResult<bool>;
    /// Gets one record by id.
    fn get_character(&self, id: CharacterId) -> RepoResult<Option<Character>>;
    /// Lists the full catalog in insertion (id) order.
    fn list_characters(&self) -> RepoResult<Vec<Character>>;
    /// Lists records whose name matches `name` exactly, in id order.
    fn find_by_name(&self, name: &str) -> RepoResult<Vec<Character>>;
}

/// SQLite-backed character repository.
pub struct SqliteCharacterRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCharacterRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_character_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl CharacterRepository for SqliteCharacterRepository<'_> {
    fn insert_character(&self, fields: &CharacterFields) -> RepoResult<CharacterId> {
        self.conn.execute(
            "INSERT INTO characters (
                name,
                description,
                appearance_date,
                info_url,
                image,
                category
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                fields.name.as_str(),
                fields.description.as_str(),
                fields.appearance_date.as_str(),
                fields.info_url.as_str(),
                fields.image.as_deref(),
                fields.category.as_str(),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update_character(&self, id: CharacterId, fields: &CharacterFields) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE characters
             SET
                name = ?1,
                description = ?2,
                appearance_date = ?3,
                info_url = ?4,
                image = ?5,
                category = ?6
             WHERE id = ?7;",
            params![
                fields.name.as_str(),
                fields.description.as_str(),
                fields.appearance_date.as_str(),
                fields.info_url.as_str(),
                fields.image.as_deref(),
                fields.category.as_str(),
                id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn delete_character(&self, id: CharacterId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM characters WHERE id = ?1;", [id])?;

        Ok(changed > 0)
    }

    fn get_character(&self, id: CharacterId) -> RepoResult<Option<Character>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CHARACTER_SELECT_SQL} WHERE id = ?1;"))?;

        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_character_row(row)?));
        }

        Ok(None)
    }

    fn list_characters(&self) -> RepoResult<Vec<Character>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CHARACTER_SELECT_SQL} ORDER BY id ASC;"))?;

        let mut rows = stmt.query([])?;
        let mut characters = Vec::new();
        while let Some(row) = rows.next()? {
            characters.push(parse_character_row(row)?);
        }

        Ok(characters)
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Vec<Character>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CHARACTER_SELECT_SQL} WHERE name = ?1 ORDER BY id ASC;"
        ))?;

        let mut rows = stmt.query([name])?;
        let mut characters = Vec::new();
        while let Some(row) = rows.next()? {
            characters.push(parse_character_row(row)?);
        }

        Ok(characters)
    }
}

fn parse_character_row(row: &Row<'_>) -> RepoResult<Character> {
    let info_url: String = row.get("info_url")?;
    if info_url.starts_with("http://") || info_url.starts_with("https://") {
        return Err(RepoError::InvalidData(format!(
            "scheme-prefixed value `{info_url}` in characters.info_url"
        )));
    }

    Ok(Character {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        appearance_date: row.get("appearance_date")?,
        info_url,
        image: row.get("image")?,
        category: row.get("category")?,
    })
}

fn ensure_character_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "characters")? {
        return Err(RepoError::MissingRequiredTable("characters"));
    }

    for column in [
        "id",
        "name",
        "description",
        "appearance_date",
        "info_url",
        "image",
        "category",
    ] {
        if !table_has_column(conn, "characters", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "characters",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
