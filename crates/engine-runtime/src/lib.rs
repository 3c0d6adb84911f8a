pub mod error;
pub mod execution {
    pub mod executor;
    pub mod factory;
    pub mod prepare;
    pub mod report;
}
