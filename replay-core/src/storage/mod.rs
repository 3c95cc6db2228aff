pub mod dir_target;
pub mod handoff;
pub mod metadata;
