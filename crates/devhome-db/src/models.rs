//! Row types as stored in SQLite, kept apart from the devhome-types API models.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields written when a user signs up.
pub struct NewUser<'a> {
    pub id: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub age: Option<i64>,
    pub gender: Option<&'a str>,
}

/// Partial profile update; `None` leaves the column untouched.
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
}

pub struct ConnectionRow {
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}
