mod in_memory_message_store;
mod pg_message_store;
mod pg_pool;
mod supabase_message_store;

pub use in_memory_message_store::InMemoryMessageStore;
pub use pg_message_store::PgMessageStore;
pub use supabase_message_store::SupabaseMessageStore;

pub use pg_pool::create_pool;
