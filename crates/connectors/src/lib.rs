pub mod file {
    pub mod csv {
        pub mod error;
        pub mod source;
        pub mod store;
    }
}
pub mod manifest;
pub mod source;
pub mod store;
