pub mod kv;
pub mod local;
pub mod session_cache;
