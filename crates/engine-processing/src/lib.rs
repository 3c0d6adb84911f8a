pub mod chunker;
pub mod error;
pub mod retry;
pub mod step;
