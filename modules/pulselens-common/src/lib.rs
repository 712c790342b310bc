pub mod config;
pub mod error;
pub mod types;
pub mod window;

pub use config::Config;
pub use error::PulseError;
pub use types::*;
pub use window::*;
