use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

/// Characters listed per page
pub const PER_PAGE: u32 = 15;

/// Stored character
/// `house` was validated at the moment of its last write, nothing more
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Stable identity (UUID v4)
    pub id: String,
    pub name: String,
    pub role: String,
    pub school: String,
    pub house: String,
    pub patronus: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCharacter {
    pub name: String,
    pub role: String,
    pub school: String,
    pub house: String,
    pub patronus: String,
}

/// Partial update; `None` leaves the stored value alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterChanges {
    pub name: Option<String>,
    pub role: Option<String>,
    pub school: Option<String>,
    pub house: Option<String>,
    pub patronus: Option<String>,
}

impl CharacterChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.role.is_none()
            && self.school.is_none()
            && self.house.is_none()
            && self.patronus.is_none()
    }

    fn apply_to(&self, character: &mut Character) {
        if let Some(name) = &self.name {
            character.name = name.clone();
        }
        if let Some(role) = &self.role {
            character.role = role.clone();
        }
        if let Some(school) = &self.school {
            character.school = school.clone();
        }
        if let Some(house) = &self.house {
            character.house = house.clone();
        }
        if let Some(patronus) = &self.patronus {
            character.patronus = patronus.clone();
        }
    }
}

/// One page of a listing plus the numbers needed to walk the rest
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
    pub total: i64,
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS characters (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            role TEXT NOT NULL,
            school TEXT NOT NULL,
            house TEXT NOT NULL,
            patronus TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    // Listing filters by house
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_characters_house ON characters(house)",
        [],
    )?;

    Ok(())
}

const SELECT_COLUMNS: &str =
    "SELECT id, name, role, school, house, patronus, created_at, updated_at FROM characters";

fn parse_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn character_from_row(row: &Row) -> rusqlite::Result<Character> {
    Ok(Character {
        id: row.get(0)?,
        name: row.get(1)?,
        role: row.get(2)?,
        school: row.get(3)?,
        house: row.get(4)?,
        patronus: row.get(5)?,
        created_at: parse_timestamp(row, 6)?,
        updated_at: parse_timestamp(row, 7)?,
    })
}

pub fn insert_character(conn: &Connection, new: &NewCharacter) -> Result<Character> {
    let now = Utc::now();
    let character = Character {
        id: uuid::Uuid::new_v4().to_string(),
        name: new.name.clone(),
        role: new.role.clone(),
        school: new.school.clone(),
        house: new.house.clone(),
        patronus: new.patronus.clone(),
        created_at: now,
        updated_at: now,
    };

    conn.execute(
        "INSERT INTO characters (id, name, role, school, house, patronus, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            character.id,
            character.name,
            character.role,
            character.school,
            character.house,
            character.patronus,
            character.created_at.to_rfc3339(),
            character.updated_at.to_rfc3339(),
        ],
    )
    .context("Failed to insert character")?;

    Ok(character)
}

pub fn get_character(conn: &Connection, id: &str) -> Result<Option<Character>> {
    let character = conn
        .query_row(
            &format!("{} WHERE id = ?1", SELECT_COLUMNS),
            params![id],
            character_from_row,
        )
        .optional()
        .with_context(|| format!("Failed to load character {}", id))?;

    Ok(character)
}

/// Page through characters in insertion order, optionally only one house.
/// `page` below 1 is treated as 1.
pub fn list_characters(
    conn: &Connection,
    house: Option<&str>,
    page: u32,
    per_page: u32,
) -> Result<Page<Character>> {
    let page = page.max(1);
    let per_page = per_page.max(1);
    let offset = (page as i64 - 1) * per_page as i64;

    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM characters WHERE (?1 IS NULL OR house = ?1)",
        params![house],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "{} WHERE (?1 IS NULL OR house = ?1) ORDER BY rowid LIMIT ?2 OFFSET ?3",
        SELECT_COLUMNS
    ))?;

    let items = stmt
        .query_map(params![house, per_page as i64, offset], character_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to list characters")?;

    let last_page = ((total + per_page as i64 - 1) / per_page as i64).max(1) as u32;

    Ok(Page {
        items,
        current_page: page,
        last_page,
        per_page,
        total,
    })
}

/// Apply `changes` and bump `updated_at`. `None` if the character does not exist.
pub fn update_character(
    conn: &Connection,
    id: &str,
    changes: &CharacterChanges,
) -> Result<Option<Character>> {
    let mut character = match get_character(conn, id)? {
        Some(character) => character,
        None => return Ok(None),
    };

    if changes.is_empty() {
        return Ok(Some(character));
    }

    changes.apply_to(&mut character);
    character.updated_at = Utc::now();

    conn.execute(
        "UPDATE characters
         SET name = ?2, role = ?3, school = ?4, house = ?5, patronus = ?6, updated_at = ?7
         WHERE id = ?1",
        params![
            character.id,
            character.name,
            character.role,
            character.school,
            character.house,
            character.patronus,
            character.updated_at.to_rfc3339(),
        ],
    )
    .with_context(|| format!("Failed to update character {}", id))?;

    Ok(Some(character))
}

/// Remove a character, returning what was deleted
pub fn delete_character(conn: &Connection, id: &str) -> Result<Option<Character>> {
    let character = match get_character(conn, id)? {
        Some(character) => character,
        None => return Ok(None),
    };

    conn.execute("DELETE FROM characters WHERE id = ?1", params![id])
        .with_context(|| format!("Failed to delete character {}", id))?;

    Ok(Some(character))
}

pub fn count_characters(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM characters", [], |row| row.get(0))?;
    Ok(count)
}
