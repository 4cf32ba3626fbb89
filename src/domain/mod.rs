mod point;

pub use point::{FieldValue, Point};
