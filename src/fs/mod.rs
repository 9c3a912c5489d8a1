//! File helpers shared by the storage implementations.

pub mod operations;
