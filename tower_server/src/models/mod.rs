//! Tower data models: repositories, environments and their layered defaults.

pub mod environment;
pub mod general_config;
pub mod repository;
pub mod settings;
pub mod status;
pub mod tower;
