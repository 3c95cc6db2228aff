pub mod coordinator;
pub mod replay;
