// Per-frame pose detection, skeleton rendering and side-by-side composition

pub mod compose;
pub mod detection;
pub mod render;
pub mod topology;
pub mod types;
