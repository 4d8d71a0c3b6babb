//! Row -> wire model conversion. Corrupt stored values are logged and
//! replaced with defaults rather than failing the whole listing.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use taskboard_db::models::{BoardRow, TodoRow};
use taskboard_types::models::{Board, Priority, Todo};

pub(crate) fn board_from_row(row: BoardRow) -> Board {
    Board {
        id: parse_id(&row.id, "board id", &row.id),
        user: parse_id(&row.user_id, "user_id", &row.id),
        created_at: parse_timestamp(&row.created_at, &row.id),
        updated_at: parse_timestamp(&row.updated_at, &row.id),
        name: row.name,
        description: row.description,
        color: row.color,
    }
}

pub(crate) fn todo_from_row(row: TodoRow) -> Todo {
    Todo {
        id: parse_id(&row.id, "todo id", &row.id),
        board: parse_id(&row.board_id, "board_id", &row.id),
        priority: row.priority.parse().unwrap_or_else(|e| {
            warn!("Corrupt priority on todo '{}': {}", row.id, e);
            Priority::default()
        }),
        due_date: row
            .due_date
            .as_deref()
            .map(|raw| parse_timestamp(raw, &row.id)),
        created_at: parse_timestamp(&row.created_at, &row.id),
        updated_at: parse_timestamp(&row.updated_at, &row.id),
        title: row.title,
        description: row.description,
        completed: row.completed,
    }
}

fn parse_id(raw: &str, field: &str, row_id: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}' on row '{}': {}", field, raw, row_id, e);
        Uuid::default()
    })
}

fn parse_timestamp(raw: &str, row_id: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Rows written by SQLite's datetime('now') carry no timezone.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on row '{}': {}", raw, row_id, e);
            DateTime::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_accept_rfc3339_and_sqlite_format() {
        let a = parse_timestamp("2026-03-01T10:00:00.000Z", "r");
        let b = parse_timestamp("2026-03-01 10:00:00", "r");
        assert_eq!(a, b);
        assert_eq!(parse_timestamp("garbage", "r"), DateTime::<Utc>::default());
    }
}
