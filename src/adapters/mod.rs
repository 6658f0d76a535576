// Adapters layer: concrete implementations for external systems (Azure DevOps REST, webhook HTTP).

pub mod azure_devops;
pub mod webhook;
