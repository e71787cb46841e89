pub mod board;
pub mod collaborators;
pub mod config;
pub mod history;
pub mod session;
pub mod storage;
pub mod sync;
pub mod types;

pub use session::{BoardSession, RehydrateOutcome};
