pub mod csv;
pub mod matrix;
pub mod usage;
