//! Integration tests for the org chart sync engine

mod cli_contracts;
mod store_integration;
mod support;
mod sync_pipeline;
