// File and network I/O for the pipeline

pub mod csv;
pub mod error;
pub mod projector;
pub mod segment;
pub mod vectors;

pub use error::IoError;
