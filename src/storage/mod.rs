pub mod code_store;
pub mod database;
pub mod generation;

pub use code_store::CodeStore;
pub use database::{Database, PoolConfig, SharedDatabase};
pub use generation::{ClassRecord, GenerationStore, MethodRecord};
