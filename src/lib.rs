pub mod cli;
pub mod collector;
pub mod error;
pub mod output;
pub mod targets;
pub mod tls;
pub mod zone;

pub use collector::Collector;
pub use error::{Error, Result};
pub use zone::Zone;
