use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::models::Priority;

// -- JWT Claims --

/// Claims carried by every bearer token. `sub` is the user id; `email` is
/// only there so clients can display who is signed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub iat: usize,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

// -- Boards --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBoardRequest {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

/// Patch for a board. `None` leaves a field alone; `Some(None)` clears an
/// optional field.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateBoardRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub color: Option<Option<String>>,
}

// -- Todos --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateTodoRequest {
    pub board: Uuid,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    /// `YYYY-MM-DD` or RFC 3339; empty means none.
    pub due_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UpdateTodoRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "present")]
    pub due_date: Option<Option<String>>,
    pub completed: Option<bool>,
}

// -- Misc --

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Distinguishes an explicit `null` from an absent field: with
/// `#[serde(default)]` an absent field stays `None`, while a present one
/// (including `null`) becomes `Some(..)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_todo_distinguishes_null_from_absent() {
        let patch: UpdateTodoRequest =
            serde_json::from_str(r#"{"dueDate": null, "completed": true}"#).unwrap();
        assert_eq!(patch.due_date, Some(None));
        assert_eq!(patch.description, None);
        assert_eq!(patch.completed, Some(true));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let res = serde_json::from_str::<CreateBoardRequest>(r#"{"name": "a", "owner": "x"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn register_fields_default_to_empty() {
        let req: RegisterRequest = serde_json::from_str("{}").unwrap();
        assert!(req.email.is_empty());
        assert!(req.password.is_empty());
    }
}
