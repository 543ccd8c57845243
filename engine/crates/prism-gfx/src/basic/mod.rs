pub mod format;
pub mod native;
pub mod usage;
