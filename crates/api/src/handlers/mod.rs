pub mod cache;
pub mod callback;
pub mod status;
