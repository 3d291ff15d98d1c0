//! Sync feature slice: trigger runs, inspect sources, read history

pub mod commands;
pub mod queries;
pub mod routes;
