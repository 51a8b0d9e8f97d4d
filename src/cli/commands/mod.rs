pub mod config;
pub mod generate;
pub mod ingest;
pub mod init;
pub mod scan;
