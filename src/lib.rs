pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::ProvisionConfig;

pub use core::properties::PropertiesOutcome;
pub use core::provisioner::{ProvisionPlan, ProvisionReport, ProvisionRequest, Provisioner};
pub use core::version_gate::ConfigSchema;
pub use domain::model::{ApplicationDetails, Credentials, SandboxLayout, ServiceBinding, Version};
pub use utils::error::{DeployError, Result};
