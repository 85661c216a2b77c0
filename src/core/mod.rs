pub mod properties;
pub mod provisioner;
pub mod repackager;
pub mod service_binding;
pub mod version_gate;
pub mod xml_config;

pub use crate::domain::model::{ApplicationDetails, SandboxLayout, ServiceBinding, Version};
pub use crate::domain::ports::{LibraryLinker, ResourceCopier, RuntimeExtractor};
pub use crate::utils::error::Result;
