pub mod diagnostics_io;
pub mod table;
