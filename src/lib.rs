pub mod config;
pub mod detection;
pub mod detector;
pub mod error;
pub mod server;

pub use error::{Error, Result};
