pub mod memory;
pub mod store;
pub mod supabase;
pub mod supabase_store;

pub use memory::MemoryStore;
pub use store::{digits_only, SchedulingStore, SharedStore, StoreError, StoreResult};
pub use supabase::{SupabaseApiError, SupabaseClient};
pub use supabase_store::SupabaseStore;
