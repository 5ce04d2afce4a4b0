pub mod analyze;
pub mod benchmark;
pub mod financing;
pub mod projection;
pub mod sensitivity;
