//! Row representations of persisted records and their conversions into
//! domain types.

pub mod ledger;
pub mod places;
pub mod users;
