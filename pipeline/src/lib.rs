pub mod aggregate;
pub mod epsilon;
pub mod extract;
pub mod log;
mod tree;
