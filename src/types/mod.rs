pub mod category;
pub mod location;
pub mod measurement;
pub mod station;
