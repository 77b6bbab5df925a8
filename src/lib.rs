pub mod api;
pub mod build_info;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod orchestrator;
pub mod output;
pub mod remap;
pub mod report;
pub mod store;
