pub mod labels;
pub mod profile;
pub mod stats;
pub mod well;
