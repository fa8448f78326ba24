pub mod clients;
pub mod commands;
pub mod config;
pub mod http;
pub mod retry;
pub mod runtime;
