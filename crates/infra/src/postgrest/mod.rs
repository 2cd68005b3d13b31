//! PostgREST (Supabase REST) adapters for the remote tables

pub mod query;
pub mod records;
pub mod table;

pub use records::PostgrestRecordTable;
pub use table::PostgrestFailureModeTable;
