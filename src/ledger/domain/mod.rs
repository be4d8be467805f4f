//! Ledger types and the rules that govern them.

pub mod accounts;
pub mod categories;
pub mod currency;
pub mod transactions;
