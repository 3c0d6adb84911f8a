pub mod core {
    pub mod identifiers;
    pub mod status;
}
pub mod error;
pub mod records {
    pub mod batch;
    pub mod record;
}
