pub mod codes;
pub mod engine;
pub mod stores;
