pub mod analysis;
pub mod ids;
pub mod resume;
pub mod task;
pub mod timestamp;
pub mod user;
