pub mod csv_reader;
pub mod excel;
pub mod file_processor;
pub mod file_store;
pub mod quality;
pub mod query_engine;
pub mod raw;
