// Reader for generated forest plot scripts

pub mod frame;
pub mod lexer;

// Public API re-exports
pub use frame::{extract_rows, parse_data_frame, Column, Literal};
