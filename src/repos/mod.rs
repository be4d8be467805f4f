pub mod accounts;
pub mod categories;
pub mod currencies;
pub mod memory;
pub mod places;
pub mod transactions;
pub mod users;

pub use accounts::{AccountRepo, DynAccountRepo, LedgerPersistenceError};
pub use categories::{CategoryRepo, DynCategoryRepo};
pub use currencies::{CurrencyPersistenceError, CurrencyRepo, DynCurrencyRepo};
pub use memory::MemoryStore;
pub use places::{DynPlaceRepo, PlaceRepo};
pub use transactions::{DynTransactionRepo, TransactionRepo};
pub use users::{DynUserRepo, UserPersistenceError, UserRepo};
