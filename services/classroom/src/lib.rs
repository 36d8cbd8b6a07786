pub mod adapters;
pub mod classroom;
pub mod config;
pub mod error;
