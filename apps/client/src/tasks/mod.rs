pub mod lifecycle;
pub mod resources;
