pub mod rename;
pub mod serve;
pub mod version;
