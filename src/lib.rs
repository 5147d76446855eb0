pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod identity;
pub mod session;
pub mod storage;
pub mod validation;
pub mod vault;
