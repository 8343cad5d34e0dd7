pub mod core;
pub mod papers;
pub mod staff;
pub mod subjects;
