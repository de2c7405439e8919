pub mod processor;
pub mod utils;

pub use processor::{ExcelProcessor, WorkbookFormat};
