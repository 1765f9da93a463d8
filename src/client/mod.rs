pub mod engine;
pub mod error;

pub use engine::{EngineClient, ServerErrorLevel};
pub use error::{ClientError, ClientResult};
