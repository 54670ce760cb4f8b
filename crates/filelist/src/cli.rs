//! Command implementations. Each returns the process exit code, or an error
//! for failures that stop the command outright.
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use filelist_core::kernel::Result;
use filelist_core::plugin_system::{
    AssemblyResolver, ConnectMode, DisconnectMode, FileListProvider, LoadReport, PluginProvider,
    PluginRegistry,
};
use filelist_core::storage::ProviderConfig;
use filelist_core::{ManifestFile, Trace};

use crate::SearchArgs;

fn provider_config(search: &SearchArgs) -> Result<ProviderConfig> {
    let mut config = match &search.config {
        Some(path) => ProviderConfig::load(path)?,
        None => ProviderConfig::default(),
    };
    for path in &search.paths {
        config.add_plugin_path(path);
    }
    Ok(config)
}

fn build_provider(search: &SearchArgs, registry: &Arc<PluginRegistry>) -> Result<FileListProvider> {
    FileListProvider::builder(registry.clone())
        .config(provider_config(search)?)
        .trace(Trace::global())
        .build()
}

fn print_report(report: &LoadReport) {
    for plugin in &report.loaded {
        println!("loaded  {} ({})", plugin.type_name, plugin.source_path.display());
    }
    for path in &report.skipped {
        println!("skipped {} (already loaded)", path.display());
    }
    for failure in &report.failures {
        match &failure.type_name {
            Some(type_name) => eprintln!(
                "failed  {} ({}): {}",
                type_name,
                failure.library_path.display(),
                failure.error
            ),
            None => eprintln!("failed  {}: {}", failure.library_path.display(), failure.error),
        }
    }
}

/// Load with a fresh registry and hand the attached provider to `then`.
fn with_loaded_plugins<F>(search: &SearchArgs, then: F) -> Result<ExitCode>
where
    F: FnOnce(&FileListProvider, &PluginRegistry) -> Result<()>,
{
    let registry = Arc::new(PluginRegistry::with_trace(Trace::global()));
    let mut provider = build_provider(search, &registry)?;

    provider.attach(ConnectMode::Startup)?;
    let report = provider.load_plugins();
    print_report(&report);
    let outcome = then(&provider, &registry);

    provider.detach(DisconnectMode::HostShutdown)?;
    registry.shutdown_all();
    outcome?;

    Ok(if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

pub fn validate(manifest: &Path) -> Result<ExitCode> {
    let descriptors = ManifestFile::new(manifest)?.read()?;
    for descriptor in &descriptors {
        println!("{}: {}", descriptor.library_id(), descriptor.type_names().join(", "));
    }
    println!("{} valid, {} plugin entries", manifest.display(), descriptors.len());
    Ok(ExitCode::SUCCESS)
}

pub fn resolve(name: &str, search: &SearchArgs) -> Result<ExitCode> {
    let registry = Arc::new(PluginRegistry::new());
    let provider = build_provider(search, &registry)?;

    match provider.resolve(name)? {
        Some(found) => {
            println!("{}", found.path.display());
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("{} not found", name);
            Ok(ExitCode::FAILURE)
        }
    }
}

pub fn load(search: &SearchArgs) -> Result<ExitCode> {
    with_loaded_plugins(search, |_, registry| {
        println!("{} plugin(s) registered", registry.plugin_count());
        for entry in registry.entries() {
            println!("  {} from {} [{}]", entry.type_name(), entry.source_path.display(), entry.mode);
        }
        Ok(())
    })
}

pub fn rebuild(search: &SearchArgs) -> Result<ExitCode> {
    with_loaded_plugins(search, |provider, _| {
        let written = provider.rebuild_manifests()?;
        if written.is_empty() {
            println!("No manifests written");
        }
        for path in written {
            println!("wrote {}", path.display());
        }
        Ok(())
    })
}
