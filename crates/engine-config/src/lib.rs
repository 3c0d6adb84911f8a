pub mod error;
pub mod settings;

pub use settings::{Settings, validated::ValidatedSettings};
