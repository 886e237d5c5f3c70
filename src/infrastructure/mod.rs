pub mod config;
pub mod error;
pub mod logging;
pub mod state_store;
pub mod storage;
