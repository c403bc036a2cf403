//! Tag store and representative-map contracts with SQLite implementation.
//!
//! # Responsibility
//! - Own per-tag membership rows and the live tagged count.
//! - Own per-account representative-item rows.
//! - Append one notification row per successful membership change.
//!
//! # Invariants
//! - `tags.tagged_count` equals the number of `tag_members` rows for that tag
//!   after every committed transaction.
//! - Membership flip, count update, event append, and the optional
//!   representative insert commit together or not at all.
//! - `tag_events` rows are never updated or deleted.

use crate::db::DbError;
use crate::model::{Account, ItemId, TagId};
use rusqlite::{params, Connection, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

const EVENT_SELECT_SQL: &str = "SELECT seq, kind, tag, item, at_ms FROM tag_events";

pub type RepoResult<T> = Result<T, RepoError>;

/// Storage-layer error for registry persistence operations.
#[derive(Debug)]
pub enum RepoError {
    /// The (tag, item) pair already carries the tag.
    AlreadyTagged { tag: TagId, item: ItemId },
    /// The (tag, item) pair does not carry the tag.
    NotTagged { tag: TagId, item: ItemId },
    /// The connection carries no registry schema; migrations never ran.
    SchemaMissing,
    Db(DbError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyTagged { tag, item } => {
                write!(f, "item {item} already carries tag {tag}")
            }
            Self::NotTagged { tag, item } => {
                write!(f, "item {item} does not carry tag {tag}")
            }
            Self::SchemaMissing => {
                write!(f, "registry schema is missing; open the connection via db::open_db")
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => {
                write!(f, "invalid persisted registry data: {message}")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
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

/// Kind of one observable registry notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagEventKind {
    TagAdded,
    TagRemoved,
}

/// One append-only registry notification, consumed by external indexers.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TagEvent {
    /// Monotonically increasing sequence number.
    pub seq: i64,
    pub kind: TagEventKind,
    pub tag: TagId,
    pub item: ItemId,
    /// Append timestamp in epoch milliseconds.
    pub at_ms: i64,
}

/// Storage interface for the tag store and representative map.
pub trait RegistryStore {
    /// Direct membership lookup for one (tag, item) pair.
    fn item_has_tag(&self, tag: TagId, item: ItemId) -> RepoResult<bool>;
    /// Live count of items carrying the tag; 0 for never-used tags.
    fn tag_count(&self, tag: TagId) -> RepoResult<u64>;
    /// Sets membership, bumps the count, and appends a `tag_added` event.
    ///
    /// When `default_for` is provided, also sets that account's
    /// representative item to `item` unless the account already has one.
    /// The whole operation commits atomically.
    fn add_tag(
        &mut self,
        tag: TagId,
        item: ItemId,
        default_for: Option<&Account>,
    ) -> RepoResult<()>;
    /// Clears membership, decrements the count, and appends a `tag_removed`
    /// event, atomically.
    fn remove_tag(&mut self, tag: TagId, item: ItemId) -> RepoResult<()>;
    /// Returns the account's representative item, if one was ever set.
    fn resolve_default(&self, account: &Account) -> RepoResult<Option<ItemId>>;
    /// Overwrites the account's representative item unconditionally.
    fn set_default(&mut self, account: &Account, item: ItemId) -> RepoResult<()>;
    /// Returns notifications with `seq` strictly greater than `after_seq`,
    /// in append order.
    fn events_since(&self, after_seq: i64) -> RepoResult<Vec<TagEvent>>;
}

/// SQLite-backed registry store.
pub struct SqliteRegistryStore<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteRegistryStore<'conn> {
    /// Constructs a store from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_registry_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl RegistryStore for SqliteRegistryStore<'_> {
    fn item_has_tag(&self, tag: TagId, item: ItemId) -> RepoResult<bool> {
        let mut stmt = self
            .conn
            .prepare("SELECT 1 FROM tag_members WHERE tag = ?1 AND item = ?2;")?;
        let found = stmt.exists(params![tag.to_string(), item.to_string()])?;
        Ok(found)
    }

    fn tag_count(&self, tag: TagId) -> RepoResult<u64> {
        let mut stmt = self
            .conn
            .prepare("SELECT tagged_count FROM tags WHERE tag = ?1;")?;
        let mut rows = stmt.query([tag.to_string()])?;

        let Some(row) = rows.next()? else {
            return Ok(0);
        };
        let count: i64 = row.get(0)?;
        u64::try_from(count).map_err(|_| {
            RepoError::InvalidData(format!("negative tagged_count {count} for tag {tag}"))
        })
    }

    fn add_tag(
        &mut self,
        tag: TagId,
        item: ItemId,
        default_for: Option<&Account>,
    ) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Tag rows are created implicitly on first use and never deleted.
        tx.execute(
            "INSERT OR IGNORE INTO tags (tag, tagged_count) VALUES (?1, 0);",
            [tag.to_string()],
        )?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO tag_members (tag, item) VALUES (?1, ?2);",
            params![tag.to_string(), item.to_string()],
        )?;
        if inserted == 0 {
            return Err(RepoError::AlreadyTagged { tag, item });
        }

        tx.execute(
            "UPDATE tags SET tagged_count = tagged_count + 1 WHERE tag = ?1;",
            [tag.to_string()],
        )?;
        append_event(&tx, TagEventKind::TagAdded, tag, item)?;

        if let Some(account) = default_for {
            tx.execute(
                "INSERT INTO defaults (account, item) VALUES (?1, ?2)
                 ON CONFLICT (account) DO NOTHING;",
                params![account.as_str(), item.to_string()],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn remove_tag(&mut self, tag: TagId, item: ItemId) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let deleted = tx.execute(
            "DELETE FROM tag_members WHERE tag = ?1 AND item = ?2;",
            params![tag.to_string(), item.to_string()],
        )?;
        if deleted == 0 {
            return Err(RepoError::NotTagged { tag, item });
        }

        tx.execute(
            "UPDATE tags SET tagged_count = tagged_count - 1 WHERE tag = ?1;",
            [tag.to_string()],
        )?;
        append_event(&tx, TagEventKind::TagRemoved, tag, item)?;

        tx.commit()?;
        Ok(())
    }

    fn resolve_default(&self, account: &Account) -> RepoResult<Option<ItemId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT item FROM defaults WHERE account = ?1;")?;
        let mut rows = stmt.query([account.as_str()])?;

        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let item_text: String = row.get(0)?;
        Ok(Some(parse_item_text(&item_text)?))
    }

    fn set_default(&mut self, account: &Account, item: ItemId) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO defaults (account, item) VALUES (?1, ?2)
             ON CONFLICT (account) DO UPDATE SET item = excluded.item;",
            params![account.as_str(), item.to_string()],
        )?;
        Ok(())
    }

    fn events_since(&self, after_seq: i64) -> RepoResult<Vec<TagEvent>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{EVENT_SELECT_SQL} WHERE seq > ?1 ORDER BY seq ASC;"))?;
        let mut rows = stmt.query([after_seq])?;
        let mut events = Vec::new();

        while let Some(row) = rows.next()? {
            events.push(parse_event_row(row)?);
        }

        Ok(events)
    }
}

fn append_event(
    conn: &Connection,
    kind: TagEventKind,
    tag: TagId,
    item: ItemId,
) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO tag_events (kind, tag, item, at_ms) VALUES (?1, ?2, ?3, ?4);",
        params![
            event_kind_to_db(kind),
            tag.to_string(),
            item.to_string(),
            now_epoch_ms(),
        ],
    )?;
    Ok(())
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}

fn ensure_registry_schema_ready(conn: &Connection) -> RepoResult<()> {
    conn.prepare("SELECT tag FROM tags LIMIT 1;")
        .map_err(|_| RepoError::SchemaMissing)?;
    Ok(())
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<TagEvent> {
    let kind_text: String = row.get("kind")?;
    let kind = parse_event_kind(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid event kind `{kind_text}` in tag_events.kind"))
    })?;

    let tag_text: String = row.get("tag")?;
    let tag = Uuid::parse_str(&tag_text).map(TagId::from_uuid).map_err(|_| {
        RepoError::InvalidData(format!("invalid tag token `{tag_text}` in tag_events.tag"))
    })?;

    let item_text: String = row.get("item")?;
    let item = parse_item_text(&item_text)?;

    Ok(TagEvent {
        seq: row.get("seq")?,
        kind,
        tag,
        item,
        at_ms: row.get("at_ms")?,
    })
}

fn parse_item_text(value: &str) -> RepoResult<ItemId> {
    ItemId::from_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid item id `{value}`")))
}

fn event_kind_to_db(kind: TagEventKind) -> &'static str {
    match kind {
        TagEventKind::TagAdded => "tag_added",
        TagEventKind::TagRemoved => "tag_removed",
    }
}

fn parse_event_kind(value: &str) -> Option<TagEventKind> {
    match value {
        "tag_added" => Some(TagEventKind::TagAdded),
        "tag_removed" => Some(TagEventKind::TagRemoved),
        _ => None,
    }
}
