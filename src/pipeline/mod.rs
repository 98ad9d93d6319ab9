pub mod safety;
pub mod intake;
pub mod storage;
pub mod rag;
pub mod processor; // Ingestion: validate → record → index
