//! Subcommand implementations.

pub mod migrate;
pub mod seed;
pub mod stock;

use secrecy::SecretString;

use crate::commands::migrate::MigrationError;

/// Connection string from `PAZAR_DATABASE_URL`, falling back to `DATABASE_URL`.
///
/// Loads `.env` first if present.
pub fn database_url() -> Result<SecretString, MigrationError> {
    dotenvy::dotenv().ok();

    std::env::var("PAZAR_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MigrationError::MissingEnvVar("PAZAR_DATABASE_URL"))
}
