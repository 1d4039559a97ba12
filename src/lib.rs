pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod http;
pub mod service;
pub mod storage;
pub mod uploads;
pub mod validation;

pub use config::ServerConfig;
pub use error::{JournalError, Result};
pub use service::JournalService;
