use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use timeline::{Project, ProjectId};
use tracing::{debug, info};

mod users;
pub use users::*;

pub fn app_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(std::env::temp_dir);
    base.join("branchline")
}

pub fn default_db_path() -> PathBuf {
    app_data_dir().join("studio.sqlite3")
}

/// Errors surfaced across the [`ProjectStore`] boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("project not found: {0}")]
    NotFound(ProjectId),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Persistence seam used by the server and tooling.
pub trait ProjectStore {
    fn load_project(&self, id: ProjectId) -> Result<Project, StoreError>;
    /// Upsert. Concurrent writers are not reconciled; the last save wins.
    fn save_project(&self, project: &Project) -> Result<(), StoreError>;
}

/// Listing row. The project blob is not loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub id: ProjectId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct ProjectDb {
    conn: Connection,
}

impl ProjectDb {
    pub fn open_or_create(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("opening database at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        apply_migrations(&conn)?;
        info!(path = %path.display(), "database ready");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Creates and stores an empty project.
    pub fn create_project(&self, name: &str) -> Result<Project> {
        let name = name.trim();
        if name.is_empty() {
            anyhow::bail!("project name is required");
        }
        let project = Project::new(name);
        self.upsert(&project)?;
        info!(project = %project.id, name, "project created");
        Ok(project)
    }

    pub fn list_projects(&self) -> Result<Vec<ProjectInfo>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, created_at, updated_at FROM projects ORDER BY updated_at DESC, name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, name, created_at, updated_at) = row?;
            out.push(ProjectInfo {
                id: id
                    .parse()
                    .with_context(|| format!("stored project id {:?} is not a uuid", id))?,
                name,
                created_at: from_unix(created_at),
                updated_at: from_unix(updated_at),
            });
        }
        Ok(out)
    }

    pub fn project_info(&self, id: ProjectId) -> Result<Option<ProjectInfo>> {
        let row = self
            .conn
            .query_row(
                "SELECT name, created_at, updated_at FROM projects WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;
        Ok(row.map(|(name, created_at, updated_at)| ProjectInfo {
            id,
            name,
            created_at: from_unix(created_at),
            updated_at: from_unix(updated_at),
        }))
    }

    pub fn get_project(&self, id: ProjectId) -> Result<Option<Project>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT data_json FROM projects WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(raw) => {
                let project = Project::from_json(&raw)
                    .with_context(|| format!("stored project {} is malformed", id))?;
                Ok(Some(project))
            }
            None => Ok(None),
        }
    }

    /// Renames both the listing column and the stored document.
    pub fn rename_project(&self, id: ProjectId, name: &str) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() {
            anyhow::bail!("project name is required");
        }
        let Some(mut project) = self.get_project(id)? else {
            return Ok(false);
        };
        project.name = name.to_string();
        self.upsert(&project)?;
        debug!(project = %id, name, "project renamed");
        Ok(true)
    }

    pub fn delete_project(&self, id: ProjectId) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1", params![id.to_string()])?;
        if removed > 0 {
            info!(project = %id, "project deleted");
        }
        Ok(removed > 0)
    }

    fn upsert(&self, project: &Project) -> Result<()> {
        let now = Utc::now().timestamp();
        let json = project.to_json()?;
        self.conn.execute(
            "INSERT INTO projects(id, name, data_json, created_at, updated_at) VALUES(?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, data_json = excluded.data_json, updated_at = excluded.updated_at",
            params![project.id.to_string(), project.name, json, now],
        )?;
        Ok(())
    }
}

impl ProjectStore for ProjectDb {
    fn load_project(&self, id: ProjectId) -> Result<Project, StoreError> {
        self.get_project(id)?.ok_or(StoreError::NotFound(id))
    }

    fn save_project(&self, project: &Project) -> Result<(), StoreError> {
        self.upsert(project)?;
        debug!(project = %project.id, nodes = project.videos.len(), "project saved");
        Ok(())
    }
}

pub(crate) fn from_unix(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

const MIGRATIONS: &[(&str, &str)] = &[
    ("V0001__init", include_str!("../migrations/V0001__init.sql")),
    ("V0002__auth", include_str!("../migrations/V0002__auth.sql")),
];

fn apply_migrations(conn: &Connection) -> Result<()> {
    for (name, sql) in MIGRATIONS {
        conn.execute_batch(sql)
            .with_context(|| format!("applying migration {}", name))?;
        conn.execute(
            "INSERT OR IGNORE INTO migrations(name, applied_at) VALUES(?1, strftime('%s','now'))",
            params![name],
        )?;
    }
    Ok(())
}
