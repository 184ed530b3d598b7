pub mod config;
pub mod daemon;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod mail;
pub mod remote;
pub mod store;
