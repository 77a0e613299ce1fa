pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Password error: {0}")]
    PasswordError(#[from] argon2::password_hash::Error),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email is already registered")]
    EmailTaken,

    #[error("Rating own note is forbidden")]
    OwnRating,

    #[error("Note already rated by this user")]
    DuplicateRating,
}
