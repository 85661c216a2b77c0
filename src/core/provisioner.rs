use crate::adapters::{DirectoryResourceCopier, FsLibraryLinker, TarballExtractor};
use crate::core::properties::{self, PropertiesOutcome};
use crate::core::repackager;
use crate::core::service_binding::find_service;
use crate::core::version_gate::ConfigSchema;
use crate::core::xml_config;
use crate::domain::model::{ApplicationDetails, SandboxLayout, Version};
use crate::domain::ports::{LibraryLinker, ResourceCopier, RuntimeExtractor};
use crate::utils::error::Result;
use regex::Regex;
use std::path::PathBuf;
use std::time::Instant;

/// 一次部署所需的全部輸入
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub version: Version,
    pub runtime_archive: PathBuf,
    pub application: ApplicationDetails,
    pub sandbox: SandboxLayout,
    pub service_filter: Regex,
    pub additional_libraries: Vec<PathBuf>,
}

/// 實際執行後的結果摘要
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionReport {
    pub schema: ConfigSchema,
    pub jasper_listener: bool,
    pub artifact: PathBuf,
    pub packaged_files: usize,
    pub service: Option<String>,
    pub properties: Option<PropertiesOutcome>,
    pub linked_libraries: Vec<PathBuf>,
}

/// dry run 的預測結果，不會動到檔案系統
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionPlan {
    pub schema: ConfigSchema,
    pub artifact: PathBuf,
    pub service: Option<String>,
    pub properties_path: PathBuf,
    pub properties_exists: bool,
    pub libraries: Vec<PathBuf>,
}

pub struct Provisioner<E: RuntimeExtractor, R: ResourceCopier, L: LibraryLinker> {
    extractor: E,
    resources: R,
    linker: L,
}

impl Provisioner<TarballExtractor, DirectoryResourceCopier, FsLibraryLinker> {
    pub fn with_filesystem(resources: Option<PathBuf>) -> Self {
        Self::new(
            TarballExtractor::new(),
            DirectoryResourceCopier::new(resources),
            FsLibraryLinker::new(),
        )
    }
}

impl<E: RuntimeExtractor, R: ResourceCopier, L: LibraryLinker> Provisioner<E, R, L> {
    pub fn new(extractor: E, resources: R, linker: L) -> Self {
        Self {
            extractor,
            resources,
            linker,
        }
    }

    /// 依序執行每個步驟，任何一步失敗就中止；已完成的步驟不回滾
    pub fn run(&self, request: &ProvisionRequest) -> Result<ProvisionReport> {
        let schema = ConfigSchema::for_version(&request.version);
        let layout = &request.sandbox;
        let application = &request.application;

        tracing::info!(
            "🚀 Provisioning Tomcat {} ({:?} config schema) into {}",
            request.version,
            schema,
            layout.root().display()
        );

        let jasper_listener = with_timing(
            &format!("Expanding Tomcat to {}", layout.root().display()),
            || self.expand(request, schema),
        )?;

        let artifact = layout.artifact_path(&application.name);
        let packaged_files = with_timing(
            &format!(
                "Packaging {} to {}",
                application.root.display(),
                artifact.display()
            ),
            || repackager::repackage(&application.root, &artifact),
        )?;

        let (service, properties) = self.configure_mysql_service(request)?;

        let linked_libraries = self.link_libraries(request)?;

        tracing::info!("✅ Tomcat sandbox ready at {}", layout.root().display());

        Ok(ProvisionReport {
            schema,
            jasper_listener,
            artifact,
            packaged_files,
            service,
            properties,
            linked_libraries,
        })
    }

    /// 只計算會做什麼，不寫入任何檔案
    pub fn plan(&self, request: &ProvisionRequest) -> ProvisionPlan {
        let layout = &request.sandbox;
        let properties_path = layout.portal_ext_properties();

        ProvisionPlan {
            schema: ConfigSchema::for_version(&request.version),
            artifact: layout.artifact_path(&request.application.name),
            service: find_service(&request.application.services, &request.service_filter)
                .map(|s| s.name.clone()),
            properties_exists: properties_path.exists(),
            properties_path,
            libraries: self.libraries(request),
        }
    }

    fn expand(&self, request: &ProvisionRequest, schema: ConfigSchema) -> Result<bool> {
        let layout = &request.sandbox;

        std::fs::create_dir_all(layout.root())?;
        self.extractor.extract(&request.runtime_archive, layout.root())?;
        self.resources.copy_resources(layout.root())?;

        xml_config::configure_linking(&layout.context_xml(), schema)?;
        xml_config::configure_jasper(&layout.server_xml(), schema)
    }

    fn configure_mysql_service(
        &self,
        request: &ProvisionRequest,
    ) -> Result<(Option<String>, Option<PropertiesOutcome>)> {
        let filter = &request.service_filter;
        let Some(service) = find_service(&request.application.services, filter) else {
            tracing::warn!("No service matching '{}' found, skipping MySQL configuration", filter);
            return Ok((None, None));
        };

        tracing::info!("Configuring MySQL store for Liferay from service '{}'", service.name);
        let path = request.sandbox.portal_ext_properties();
        let outcome = with_timing(&format!("Creating {}", path.display()), || {
            properties::write_if_absent(&path, service)
        })?;

        Ok((Some(service.name.clone()), Some(outcome)))
    }

    fn link_libraries(&self, request: &ProvisionRequest) -> Result<Vec<PathBuf>> {
        let libraries = self.libraries(request);
        let linked = self
            .linker
            .link_to(&libraries, &request.application.web_inf_lib())?;
        if !linked.is_empty() {
            tracing::info!(
                "Linked {} libraries into {}",
                linked.len(),
                request.application.web_inf_lib().display()
            );
        }
        Ok(linked)
    }

    fn libraries(&self, request: &ProvisionRequest) -> Vec<PathBuf> {
        let mut libraries = request.additional_libraries.clone();
        let datasource = request.sandbox.datasource_jar();
        if datasource.exists() {
            libraries.push(datasource);
        }
        libraries
    }
}

fn with_timing<T>(description: &str, step: impl FnOnce() -> Result<T>) -> Result<T> {
    let started = Instant::now();
    let result = step();
    match &result {
        Ok(_) => tracing::info!("{} ({:.1}s)", description, started.elapsed().as_secs_f64()),
        Err(e) => tracing::error!(
            "{} failed after {:.1}s: {}",
            description,
            started.elapsed().as_secs_f64(),
            e
        ),
    }
    result
}
