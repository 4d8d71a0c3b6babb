use crate::Database;
use crate::models::{BoardRow, NewTodo, TodoRow, UserRow};
use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, email: &str, password_hash: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, password, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id, email, password_hash, timestamp()),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, email, password, created_at FROM users WHERE email = ?1",
                    [email],
                    |row| {
                        Ok(UserRow {
                            id: row.get(0)?,
                            email: row.get(1)?,
                            password: row.get(2)?,
                            created_at: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    // -- Boards --

    pub fn create_board(
        &self,
        id: &str,
        user_id: &str,
        name: &str,
        description: Option<&str>,
        color: Option<&str>,
    ) -> Result<BoardRow> {
        let now = timestamp();
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO boards (id, user_id, name, description, color, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![id, user_id, name, description, color, now],
            )?;
            Ok(BoardRow {
                id: id.to_string(),
                user_id: user_id.to_string(),
                name: name.to_string(),
                description: description.map(str::to_string),
                color: color.map(str::to_string),
                created_at: now.clone(),
                updated_at: now.clone(),
            })
        })
    }

    /// Boards owned by `user_id`, oldest first.
    pub fn list_boards(&self, user_id: &str) -> Result<Vec<BoardRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name, description, color, created_at, updated_at
                 FROM boards
                 WHERE user_id = ?1
                 ORDER BY created_at, rowid",
            )?;
            let rows = stmt
                .query_map([user_id], board_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_board(&self, id: &str, user_id: &str) -> Result<Option<BoardRow>> {
        self.with_conn(|conn| query_board(conn, id, user_id))
    }

    /// Applies `apply` to the board if `user_id` owns it and persists the
    /// result. Returns `None` when no such board exists for that owner.
    pub fn update_board<F>(&self, id: &str, user_id: &str, apply: F) -> Result<Option<BoardRow>>
    where
        F: FnOnce(&mut BoardRow),
    {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(mut board) = query_board(&tx, id, user_id)? else {
                return Ok(None);
            };

            apply(&mut board);
            board.updated_at = timestamp();

            tx.execute(
                "UPDATE boards SET name = ?1, description = ?2, color = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![
                    board.name,
                    board.description,
                    board.color,
                    board.updated_at,
                    board.id
                ],
            )?;
            tx.commit()?;
            Ok(Some(board))
        })
    }

    /// Deletes the board and all of its todos in one transaction.
    /// Returns `false` if `user_id` owns no board with this id.
    pub fn delete_board(&self, id: &str, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if query_board(&tx, id, user_id)?.is_none() {
                return Ok(false);
            }

            tx.execute("DELETE FROM todos WHERE board_id = ?1", [id])?;
            tx.execute("DELETE FROM boards WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(true)
        })
    }

    // -- Todos --

    /// Inserts a todo under a board owned by `owner_id`. Returns `None` if the
    /// board is missing or belongs to someone else.
    pub fn create_todo(&self, owner_id: &str, todo: NewTodo<'_>) -> Result<Option<TodoRow>> {
        let now = timestamp();
        self.with_conn_mut(|conn| {
            if query_board(conn, todo.board_id, owner_id)?.is_none() {
                return Ok(None);
            }

            conn.execute(
                "INSERT INTO todos
                    (id, board_id, title, description, priority, due_date, completed, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7)",
                params![
                    todo.id,
                    todo.board_id,
                    todo.title,
                    todo.description,
                    todo.priority,
                    todo.due_date,
                    now
                ],
            )?;

            Ok(Some(TodoRow {
                id: todo.id.to_string(),
                board_id: todo.board_id.to_string(),
                title: todo.title.to_string(),
                description: todo.description.map(str::to_string),
                priority: todo.priority.to_string(),
                due_date: todo.due_date.map(str::to_string),
                completed: false,
                created_at: now.clone(),
                updated_at: now.clone(),
            }))
        })
    }

    /// Todos of a board owned by `owner_id`, oldest first. `None` if the
    /// board is not visible to that owner.
    pub fn list_todos(&self, board_id: &str, owner_id: &str) -> Result<Option<Vec<TodoRow>>> {
        self.with_conn(|conn| {
            if query_board(conn, board_id, owner_id)?.is_none() {
                return Ok(None);
            }

            let mut stmt = conn.prepare(
                "SELECT id, board_id, title, description, priority, due_date, completed, created_at, updated_at
                 FROM todos
                 WHERE board_id = ?1
                 ORDER BY created_at, rowid",
            )?;
            let rows = stmt
                .query_map([board_id], todo_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(Some(rows))
        })
    }

    /// `(completed, total)` for a board owned by `owner_id`.
    pub fn todo_counts(&self, board_id: &str, owner_id: &str) -> Result<Option<(usize, usize)>> {
        self.with_conn(|conn| {
            if query_board(conn, board_id, owner_id)?.is_none() {
                return Ok(None);
            }

            let (completed, total): (i64, i64) = conn.query_row(
                "SELECT COALESCE(SUM(completed), 0), COUNT(*) FROM todos WHERE board_id = ?1",
                [board_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok(Some((completed as usize, total as usize)))
        })
    }

    /// Read-modify-write of a todo whose board is owned by `owner_id`.
    pub fn update_todo<F>(&self, id: &str, owner_id: &str, apply: F) -> Result<Option<TodoRow>>
    where
        F: FnOnce(&mut TodoRow),
    {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(mut todo) = query_todo(&tx, id, owner_id)? else {
                return Ok(None);
            };

            apply(&mut todo);
            todo.updated_at = timestamp();

            tx.execute(
                "UPDATE todos
                 SET title = ?1, description = ?2, priority = ?3, due_date = ?4, completed = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![
                    todo.title,
                    todo.description,
                    todo.priority,
                    todo.due_date,
                    todo.completed,
                    todo.updated_at,
                    todo.id
                ],
            )?;
            tx.commit()?;
            Ok(Some(todo))
        })
    }

    pub fn delete_todo(&self, id: &str, owner_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM todos
                 WHERE id = ?1 AND board_id IN (SELECT id FROM boards WHERE user_id = ?2)",
                [id, owner_id],
            )?;
            Ok(deleted > 0)
        })
    }
}

/// True if `err` came from a UNIQUE constraint (e.g. a duplicate email).
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn query_board(conn: &Connection, id: &str, user_id: &str) -> Result<Option<BoardRow>> {
    let row = conn
        .query_row(
            "SELECT id, user_id, name, description, color, created_at, updated_at
             FROM boards
             WHERE id = ?1 AND user_id = ?2",
            [id, user_id],
            board_row,
        )
        .optional()?;
    Ok(row)
}

fn query_todo(conn: &Connection, id: &str, owner_id: &str) -> Result<Option<TodoRow>> {
    let row = conn
        .query_row(
            "SELECT t.id, t.board_id, t.title, t.description, t.priority, t.due_date, t.completed,
                    t.created_at, t.updated_at
             FROM todos t
             JOIN boards b ON b.id = t.board_id
             WHERE t.id = ?1 AND b.user_id = ?2",
            [id, owner_id],
            todo_row,
        )
        .optional()?;
    Ok(row)
}

fn board_row(row: &Row<'_>) -> rusqlite::Result<BoardRow> {
    Ok(BoardRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        color: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn todo_row(row: &Row<'_>) -> rusqlite::Result<TodoRow> {
    Ok(TodoRow {
        id: row.get(0)?,
        board_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        priority: row.get(4)?,
        due_date: row.get(5)?,
        completed: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}
