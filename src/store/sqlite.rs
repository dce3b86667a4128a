//! SQLite-backed store.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tokio::task;
use tracing::info;

use super::{
    Giveaway, GiveawayId, GiveawayStatus, GiveawayStore, NewGiveaway, Participant,
    RequiredChannel, StoreError, Winner,
};
use crate::telegram::{MessageRef, UserId};

const GIVEAWAY_COLUMNS: &str = "id, owner_id, title, prizes, winner_count, channels, ends_at, \
     status, message_chat_id, message_id, results_announced, created_at";

fn migrate(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS giveaways (
            id                  TEXT PRIMARY KEY,
            owner_id            INTEGER NOT NULL,
            title               TEXT NOT NULL,
            prizes              TEXT NOT NULL,
            winner_count        INTEGER NOT NULL CHECK (winner_count >= 1),
            channels            TEXT NOT NULL,
            ends_at             INTEGER NOT NULL,
            status              TEXT NOT NULL CHECK (status IN ('active', 'completed')),
            message_chat_id     INTEGER,
            message_id          INTEGER,
            results_announced   INTEGER NOT NULL DEFAULT 0,
            created_at          INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_giveaways_status
            ON giveaways(status, ends_at);

        CREATE TABLE IF NOT EXISTS participants (
            giveaway_id     TEXT NOT NULL REFERENCES giveaways(id),
            user_id         INTEGER NOT NULL,
            first_name      TEXT NOT NULL,
            username        TEXT,
            PRIMARY KEY (giveaway_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS winners (
            giveaway_id     TEXT NOT NULL REFERENCES giveaways(id),
            user_id         INTEGER NOT NULL,
            first_name      TEXT NOT NULL,
            username        TEXT,
            PRIMARY KEY (giveaway_id, user_id)
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}

/// Store over a single SQLite connection.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) the database file and runs migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the schema cannot be
    /// created.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        let store = Self::with_connection(conn)?;
        info!("Database opened at {}", path.display());
        Ok(store)
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the connection on the blocking thread pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Backend(format!("DB lock poisoned: {e}")))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("DB task failed: {e}")))?
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

/// Raw `giveaways` row before decoding.
struct GiveawayRow {
    id: String,
    owner_id: i64,
    title: String,
    prizes: String,
    winner_count: i64,
    channels: String,
    ends_at: i64,
    status: String,
    message_chat_id: Option<i64>,
    message_id: Option<i64>,
    results_announced: bool,
    created_at: i64,
}

impl GiveawayRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            title: row.get(2)?,
            prizes: row.get(3)?,
            winner_count: row.get(4)?,
            channels: row.get(5)?,
            ends_at: row.get(6)?,
            status: row.get(7)?,
            message_chat_id: row.get(8)?,
            message_id: row.get(9)?,
            results_announced: row.get(10)?,
            created_at: row.get(11)?,
        })
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| StoreError::InvalidRecord(format!("timestamp out of range: {secs}")))
}

impl TryFrom<GiveawayRow> for Giveaway {
    type Error = StoreError;

    fn try_from(row: GiveawayRow) -> Result<Self, Self::Error> {
        let id = row
            .id
            .parse()
            .map_err(|e| StoreError::InvalidRecord(format!("bad id {}: {e}", row.id)))?;
        let status = GiveawayStatus::parse(&row.status)
            .ok_or_else(|| StoreError::InvalidRecord(format!("bad status {}", row.status)))?;
        let winner_count = u32::try_from(row.winner_count)
            .map_err(|_| StoreError::InvalidRecord(format!("bad winner count {}", row.winner_count)))?;
        let channels: Vec<RequiredChannel> = serde_json::from_str(&row.channels)?;
        let published_message = match (row.message_chat_id, row.message_id) {
            (Some(chat_id), Some(message_id)) => Some(MessageRef {
                chat_id,
                message_id,
            }),
            _ => None,
        };

        Ok(Self {
            id,
            owner_id: row.owner_id,
            title: row.title,
            prizes: row.prizes,
            winner_count,
            channels,
            ends_at: timestamp(row.ends_at)?,
            status,
            published_message,
            results_announced: row.results_announced,
            created_at: timestamp(row.created_at)?,
        })
    }
}

fn query_giveaways(
    conn: &Connection,
    filter: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Giveaway>, StoreError> {
    let sql = format!("SELECT {GIVEAWAY_COLUMNS} FROM giveaways WHERE {filter} ORDER BY ends_at");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params, GiveawayRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(Giveaway::try_from).collect()
}

fn query_entrants(
    conn: &Connection,
    table: &str,
    id: GiveawayId,
) -> Result<Vec<Participant>, StoreError> {
    let sql = format!(
        "SELECT user_id, first_name, username FROM {table} WHERE giveaway_id = ?1 ORDER BY rowid"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([id.to_string()], |row| {
            Ok(Participant {
                giveaway_id: id,
                user_id: row.get(0)?,
                first_name: row.get(1)?,
                username: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Primary-key collisions on `participants`; foreign-key failures stay
/// backend errors.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

impl GiveawayStore for SqliteStore {
    async fn create_giveaway(&self, new: NewGiveaway) -> Result<Giveaway, StoreError> {
        let now = Utc::now().trunc_subsecs(0);
        new.validate(now).map_err(StoreError::InvalidRecord)?;

        let mut giveaway = new.into_giveaway(now);
        giveaway.ends_at = giveaway.ends_at.trunc_subsecs(0);
        let channels = serde_json::to_string(&giveaway.channels)?;

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO giveaways (id, owner_id, title, prizes, winner_count, channels, \
                 ends_at, status, results_announced, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9)",
                params![
                    giveaway.id.to_string(),
                    giveaway.owner_id,
                    giveaway.title,
                    giveaway.prizes,
                    giveaway.winner_count,
                    channels,
                    giveaway.ends_at.timestamp(),
                    giveaway.status.as_str(),
                    giveaway.created_at.timestamp(),
                ],
            )?;
            Ok(giveaway)
        })
        .await
    }

    async fn giveaway(&self, id: GiveawayId) -> Result<Option<Giveaway>, StoreError> {
        self.with_conn(move |conn| {
            let sql = format!("SELECT {GIVEAWAY_COLUMNS} FROM giveaways WHERE id = ?1");
            conn.query_row(&sql, [id.to_string()], GiveawayRow::from_row)
                .optional()?
                .map(Giveaway::try_from)
                .transpose()
        })
        .await
    }

    async fn giveaways_by_status(
        &self,
        status: GiveawayStatus,
    ) -> Result<Vec<Giveaway>, StoreError> {
        self.with_conn(move |conn| query_giveaways(conn, "status = ?1", [status.as_str()]))
            .await
    }

    async fn set_published_message(
        &self,
        id: GiveawayId,
        message: MessageRef,
    ) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            let updated = conn.execute(
                "UPDATE giveaways SET message_chat_id = ?1, message_id = ?2 WHERE id = ?3",
                params![message.chat_id, message.message_id, id.to_string()],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
        .await
    }

    async fn add_participant(&self, participant: Participant) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO participants (giveaway_id, user_id, first_name, username) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    participant.giveaway_id.to_string(),
                    participant.user_id,
                    participant.first_name,
                    participant.username,
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::UniqueViolation {
                        giveaway_id: participant.giveaway_id,
                        user_id: participant.user_id,
                    }
                } else {
                    e.into()
                }
            })?;
            Ok(())
        })
        .await
    }

    async fn participant(
        &self,
        id: GiveawayId,
        user_id: UserId,
    ) -> Result<Option<Participant>, StoreError> {
        self.with_conn(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT first_name, username FROM participants \
                     WHERE giveaway_id = ?1 AND user_id = ?2",
                    params![id.to_string(), user_id],
                    |row| {
                        Ok(Participant {
                            giveaway_id: id,
                            user_id,
                            first_name: row.get(0)?,
                            username: row.get(1)?,
                        })
                    },
                )
                .optional()?)
        })
        .await
    }

    async fn participants(&self, id: GiveawayId) -> Result<Vec<Participant>, StoreError> {
        self.with_conn(move |conn| query_entrants(conn, "participants", id))
            .await
    }

    async fn winners(&self, id: GiveawayId) -> Result<Vec<Winner>, StoreError> {
        self.with_conn(move |conn| {
            Ok(query_entrants(conn, "winners", id)?
                .iter()
                .map(Winner::from)
                .collect())
        })
        .await
    }

    async fn complete_giveaway(
        &self,
        id: GiveawayId,
        winners: Vec<Winner>,
    ) -> Result<bool, StoreError> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let key = id.to_string();

            let status: Option<String> = tx
                .query_row("SELECT status FROM giveaways WHERE id = ?1", [&key], |row| {
                    row.get(0)
                })
                .optional()?;
            match status.as_deref().and_then(GiveawayStatus::parse) {
                None => return Err(StoreError::NotFound(id)),
                Some(GiveawayStatus::Completed) => return Ok(false),
                Some(GiveawayStatus::Active) => {}
            }

            let existing: i64 = tx.query_row(
                "SELECT COUNT(*) FROM winners WHERE giveaway_id = ?1",
                [&key],
                |row| row.get(0),
            )?;
            if existing == 0 {
                let mut insert = tx.prepare(
                    "INSERT INTO winners (giveaway_id, user_id, first_name, username) \
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for winner in &winners {
                    insert.execute(params![
                        key,
                        winner.user_id,
                        winner.first_name,
                        winner.username
                    ])?;
                }
            }

            tx.execute(
                "UPDATE giveaways SET status = ?1 WHERE id = ?2",
                params![GiveawayStatus::Completed.as_str(), key],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
    }

    async fn pending_announcements(&self) -> Result<Vec<Giveaway>, StoreError> {
        self.with_conn(|conn| {
            query_giveaways(
                conn,
                "status = ?1 AND results_announced = 0",
                [GiveawayStatus::Completed.as_str()],
            )
        })
        .await
    }

    async fn mark_results_announced(&self, id: GiveawayId) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            let updated = conn.execute(
                "UPDATE giveaways SET results_announced = 1 WHERE id = ?1",
                [id.to_string()],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
        .await
    }
}
