//! Read-only access to the decrypted message store.
//!
//! Every query binds the contact label and time bounds as parameters.

use crate::error::{WeChatError, WeChatResult};
use chrono::NaiveDateTime;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, Row};
use std::path::Path;
use tracing::debug;
use wxdoc_core::constants::SELF_DISPLAY_NAME;
use wxdoc_core::window::millis_to_local;
use wxdoc_core::{ExportWindow, MessageKind, MessageRecord, Sender};

const RECORD_COLUMNS: &str = "msg.msgId, msg.createTime, msg.isSend, name.conRemark, \
     msg.content, msg.type, msg.imgPath, msg.status, msg.lvbuffer";

const CONTACT_JOIN: &str =
    "FROM message msg INNER JOIN rcontact name ON msg.talker = name.username";

/// Which rows feed a timestamp scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeScope {
    /// Every message in the conversation.
    All,
    /// Messages the contact sent, plus calls from either side.
    ContactOrCalls,
}

/// A text message reduced to what the phrase counters need.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedText {
    /// Local send time.
    pub time: NaiveDateTime,
    /// Message text.
    pub content: String,
}

/// A call summary row.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRow {
    /// Local time of the call summary.
    pub time: NaiveDateTime,
    /// Raw summary buffer.
    pub buffer: Vec<u8>,
}

/// Decrypted message store plus the optional file-index store.
pub struct MessageStore {
    conn: Connection,
    file_index: Option<Connection>,
}

impl MessageStore {
    /// Open both stores read-only and check the expected tables exist.
    pub fn open(message_db: &Path, file_index_db: Option<&Path>) -> WeChatResult<Self> {
        let conn = open_read_only(message_db)?;
        let store = Self::from_connection(conn)?;

        let file_index = match file_index_db {
            Some(path) if path.exists() => Some(open_read_only(path)?),
            Some(path) => {
                debug!("file index store {} not present", path.display());
                None
            }
            None => None,
        };

        Ok(Self { file_index, ..store })
    }

    /// Wrap an existing connection (in-memory stores, tests).
    pub fn from_connection(conn: Connection) -> WeChatResult<Self> {
        let present: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('message', 'rcontact')",
            [],
            |row| row.get(0),
        )?;
        if present < 2 {
            return Err(WeChatError::Store(
                "expected tables 'message' and 'rcontact'".to_string(),
            ));
        }
        Ok(Self {
            conn,
            file_index: None,
        })
    }

    /// Whether a file-index store was opened alongside the message store.
    pub fn has_file_index(&self) -> bool {
        self.file_index.is_some()
    }

    /// Username (wxid) of the contact carrying `label`.
    pub fn contact_username(&self, label: &str) -> WeChatResult<String> {
        let mut stmt = self
            .conn
            .prepare("SELECT username FROM rcontact WHERE conRemark = ?1 LIMIT 1")?;
        let mut rows = stmt.query(params![label])?;
        match rows.next()? {
            Some(row) => Ok(row.get(0)?),
            None => Err(WeChatError::UnknownContact(label.to_string())),
        }
    }

    /// Username of the account owner, if the store records one.
    pub fn self_username(&self) -> WeChatResult<Option<String>> {
        let has_userinfo: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'userinfo'",
            [],
            |row| row.get(0),
        )?;
        if has_userinfo == 0 {
            return Ok(None);
        }

        let mut stmt = self
            .conn
            .prepare("SELECT value FROM userinfo WHERE value LIKE 'wxid#_%' ESCAPE '#' LIMIT 1")?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => Ok(Some(text_column(row, 0)?)),
            None => Ok(None),
        }
    }

    /// All records with `label` inside `window`, in send order.
    pub fn fetch_window(
        &self,
        label: &str,
        window: &ExportWindow,
    ) -> WeChatResult<Vec<MessageRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} {CONTACT_JOIN} \
             WHERE name.conRemark = ?1 AND msg.createTime >= ?2 AND msg.createTime < ?3 \
             ORDER BY msg.createTime"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(
                params![label, window.start_millis(), window.end_millis()],
                record_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            "fetched {} records for {} in {}",
            records.len(),
            label,
            window.file_stem()
        );
        Ok(records)
    }

    /// Text messages containing `phrase`, oldest first.
    pub fn fetch_texts_containing(&self, label: &str, phrase: &str) -> WeChatResult<Vec<TimedText>> {
        let sql = format!(
            "SELECT msg.createTime, msg.content {CONTACT_JOIN} \
             WHERE name.conRemark = ?1 AND msg.type = ?2 AND instr(msg.content, ?3) > 0 \
             ORDER BY msg.createTime"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![label, MessageKind::Text.tag(), phrase], |row| {
                Ok(TimedText {
                    time: millis_to_local(row.get(0)?),
                    content: text_column(row, 1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Call summary buffers, oldest first.
    pub fn fetch_call_buffers(&self, label: &str) -> WeChatResult<Vec<CallRow>> {
        let sql = format!(
            "SELECT msg.createTime, msg.lvbuffer {CONTACT_JOIN} \
             WHERE name.conRemark = ?1 AND msg.type = ?2 \
             ORDER BY msg.createTime"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![label, MessageKind::Voip.tag()], |row| {
                Ok(CallRow {
                    time: millis_to_local(row.get(0)?),
                    buffer: bytes_column(row, 1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Send times for `scope`, oldest first.
    pub fn fetch_times(&self, label: &str, scope: TimeScope) -> WeChatResult<Vec<NaiveDateTime>> {
        let filter = match scope {
            TimeScope::All => "",
            TimeScope::ContactOrCalls => "AND (msg.type = ?2 OR msg.isSend = 0)",
        };
        let sql = format!(
            "SELECT msg.createTime {CONTACT_JOIN} \
             WHERE name.conRemark = ?1 {filter} ORDER BY msg.createTime"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = match scope {
            TimeScope::All => stmt
                .query_map(params![label], time_from_row)?
                .collect::<Result<Vec<_>, _>>()?,
            TimeScope::ContactOrCalls => stmt
                .query_map(params![label, MessageKind::Voip.tag()], time_from_row)?
                .collect::<Result<Vec<_>, _>>()?,
        };
        Ok(rows)
    }

    /// Number of messages in `[start_ms, end_ms)`.
    pub fn count_between(&self, label: &str, start_ms: i64, end_ms: i64) -> WeChatResult<i64> {
        let sql = format!(
            "SELECT COUNT(*) {CONTACT_JOIN} \
             WHERE name.conRemark = ?1 AND msg.createTime >= ?2 AND msg.createTime < ?3"
        );
        let count = self
            .conn
            .query_row(&sql, params![label, start_ms, end_ms], |row| row.get(0))?;
        Ok(count)
    }
}

fn open_read_only(path: &Path) -> WeChatResult<Connection> {
    if !path.exists() {
        return Err(WeChatError::Store(format!(
            "store not found: {}",
            path.display()
        )));
    }
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
    )?;
    Ok(conn)
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRecord> {
    let sender = Sender::from_is_send(row.get::<_, Option<i64>>(2)?.unwrap_or(0));
    let display_name = match sender {
        Sender::SelfUser => SELF_DISPLAY_NAME.to_string(),
        Sender::Contact => text_column(row, 3)?,
    };
    Ok(MessageRecord {
        msg_id: row.get(0)?,
        time: millis_to_local(row.get(1)?),
        sender,
        display_name,
        content: text_column(row, 4)?,
        type_tag: row.get::<_, Option<i64>>(5)?.unwrap_or(0),
        img_path: text_column(row, 6)?,
        status: row.get::<_, Option<i64>>(7)?.unwrap_or(0),
        buffer: bytes_column(row, 8)?,
    })
}

fn time_from_row(row: &Row<'_>) -> rusqlite::Result<NaiveDateTime> {
    row.get::<_, i64>(0).map(millis_to_local)
}

fn text_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => String::new(),
        ValueRef::Integer(v) => v.to_string(),
        ValueRef::Real(v) => v.to_string(),
        ValueRef::Text(v) | ValueRef::Blob(v) => String::from_utf8_lossy(v).into_owned(),
    })
}

fn bytes_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<u8>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Text(v) | ValueRef::Blob(v) => v.to_vec(),
        _ => Vec::new(),
    })
}
