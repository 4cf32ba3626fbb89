pub mod classify;
pub mod handler;
pub mod transform;
pub mod types;
