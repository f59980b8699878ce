pub mod error;
pub mod refresh;
pub mod storage;
pub mod supplementary;
