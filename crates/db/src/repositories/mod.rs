use chrono::{DateTime, Utc};
use thiserror::Error;

use cobuy_core::errors::ApplicationError;

pub mod cart;
pub mod catalog;
pub mod memory;
pub mod order;

pub use cart::SqlCartRepository;
pub use catalog::SqlCatalogRepository;
pub use memory::{InMemoryCartRepository, InMemoryCatalog, InMemoryOrderHistory};
pub use order::SqlOrderHistoryRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error(transparent)]
    Service(#[from] ApplicationError),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Service(error) => error,
            other => Self::Persistence(other.to_string()),
        }
    }
}

pub(crate) fn parse_u32(column: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| {
        RepositoryError::Decode(format!(
            "invalid value for `{column}` (expected non-negative u32): {value}"
        ))
    })
}

pub(crate) fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}


#[cfg(test)]
mod tests {
    use cobuy_core::errors::ApplicationError;

    use super::{parse_timestamp, parse_u32, RepositoryError};

    #[test]
    fn repository_errors_surface_as_persistence_failures() {
        let error = ApplicationError::from(RepositoryError::Decode("bad price".to_string()));
        assert_eq!(error, ApplicationError::Persistence("decode error: bad price".to_string()));

        let passthrough = ApplicationError::Integration("catalog offline".to_string());
        let error = ApplicationError::from(RepositoryError::from(passthrough.clone()));
        assert_eq!(error, passthrough);
    }

    #[test]
    fn column_parsers_reject_out_of_range_values() {
        assert_eq!(parse_u32("quantity", 3).expect("u32"), 3);
        assert!(matches!(parse_u32("quantity", -1), Err(RepositoryError::Decode(_))));
        assert!(parse_timestamp("placed_at", "2026-01-04T10:00:00Z").is_ok());
        assert!(matches!(parse_timestamp("placed_at", "yesterday"), Err(RepositoryError::Decode(_))));
    }
}
