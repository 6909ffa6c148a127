//! Tower services: default resolution, status gating and the lifecycle
//! operations built on them.

pub mod configuration_service;
pub mod environment_service;
pub mod gate;
pub mod github_service;
pub mod lifecycle;
pub mod repository_service;
pub mod resolver;
pub mod trigger_service;
pub mod validation;
pub mod version_service;
