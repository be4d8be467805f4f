//! Password policy and storage.
mod hash;
mod password;

pub use hash::Hash;
pub use password::{Password, PasswordInvalidity};
