pub mod capture_listener;
pub mod capture_source;
pub mod persist_target;
