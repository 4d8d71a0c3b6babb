//! Database row types. These map directly to SQLite rows and stay
//! independent of the wire models in taskboard-types.

pub struct UserRow {
    pub id: String,
    pub email: String,
    /// Argon2 PHC string.
    pub password: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct BoardRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct TodoRow {
    pub id: String,
    pub board_id: String,
    pub title: String,
    pub description: Option<String>,
    pub priority: String,
    pub due_date: Option<String>,
    pub completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields supplied by the caller when inserting a todo.
pub struct NewTodo<'a> {
    pub id: &'a str,
    pub board_id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub priority: &'a str,
    pub due_date: Option<&'a str>,
}
