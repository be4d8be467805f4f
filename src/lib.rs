pub mod authentication;
pub mod authorization;
pub mod cli;
pub mod database;
pub mod http_err;
pub mod identities;
pub mod ledger;
pub mod models;
pub mod passwords;
pub mod places;
pub mod repos;
pub mod server;
pub mod storage;
