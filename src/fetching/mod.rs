pub mod client;
pub mod error;
pub mod paginated;
pub mod raw;
