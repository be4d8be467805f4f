use tracing::error;

use crate::http_err::ApiError;

use super::services::LedgerError;

mod handlers;
pub mod reps;

pub use handlers::routes;

impl From<LedgerError> for ApiError {
    fn from(error: LedgerError) -> Self {
        match error {
            LedgerError::NotFound(resource) => Self::not_found(resource),
            LedgerError::Invalid(errors) => Self::BadRequest(errors),
            LedgerError::InsufficientFunds(_) => Self::UnprocessableEntity(
                "The account balance cannot cover this transaction.".to_owned(),
            ),
            LedgerError::Conflict(message) => Self::Conflict(message),
            LedgerError::Other(error) => {
                error!(?error, "Ledger operation failed.");

                Self::InternalServerError
            }
        }
    }
}
