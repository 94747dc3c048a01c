// Data models for plans and training logs

pub mod plan;
pub mod session;

pub use plan::*;
pub use session::*;
