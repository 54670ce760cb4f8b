#![cfg(test)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc;

use log::Level;
use tempfile::tempdir;

use crate::kernel::error::Error;
use crate::manifest::ManifestFile;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::provider::FileListProvider;
use crate::plugin_system::traits::{
    AssemblyResolver, ConnectMode, DisconnectMode, PluginHost, PluginProvider,
};
use crate::storage::config::ProviderConfig;
use crate::tests::integration::common::{
    FakeHost, FakeInspector, FakeWatchService, MemoryLogger, StaticResolver, manifest_xml,
    memory_trace, touch, write_manifest,
};
use crate::watch::{ChangeKind, ManifestChange};

struct Fixture {
    provider: FileListProvider,
    host: Arc<FakeHost>,
    watches: Arc<FakeWatchService>,
    logger: Arc<MemoryLogger>,
}

fn fixture(paths: &[PathBuf], inspector: FakeInspector) -> Fixture {
    let host = Arc::new(FakeHost::new());
    let watches = Arc::new(FakeWatchService::new());
    let (trace, logger) = memory_trace();
    let provider = FileListProvider::builder(host.clone())
        .config(ProviderConfig::with_plugin_paths(paths.iter().cloned()))
        .inspector(Arc::new(inspector))
        .watch_service(watches.clone())
        .trace(trace)
        .build()
        .expect("provider should build");
    Fixture {
        provider,
        host,
        watches,
        logger,
    }
}

fn plugin_dir(root: &Path, name: &str, entries: &[(&str, &[&str])]) -> PathBuf {
    let dir = root.join(name);
    for (library, _) in entries {
        touch(&dir.join(library));
    }
    write_manifest(&dir, &manifest_xml(entries));
    dir
}

#[test]
fn test_load_plugins_walks_every_directory_in_order() {
    let tmp_dir = tempdir().expect("Failed to create temp directory");
    let first = plugin_dir(tmp_dir.path(), "first", &[("A.dll", &["A.Type"])]);
    let second = plugin_dir(tmp_dir.path(), "second", &[("B.dll", &["B.One", "B.Two"])]);
    let mut fx = fixture(&[first.clone(), second.clone()], FakeInspector::new());

    fx.provider.attach(ConnectMode::Startup).unwrap();
    let report = fx.provider.load_plugins();

    let loaded: Vec<_> = report.loaded.iter().map(|p| p.type_name.as_str()).collect();
    assert_eq!(loaded, vec!["A.Type", "B.One", "B.Two"]);
    assert_eq!(fx.host.registered_plugins().len(), 3);
    assert_eq!(fx.provider.watched_directories(), vec![first, second]);
}

#[test]
fn test_watches_only_directories_with_a_manifest() {
    let tmp_dir = tempdir().expect("Failed to create temp directory");
    let listed = plugin_dir(tmp_dir.path(), "listed", &[("A.dll", &["A.Type"])]);
    let bare = tmp_dir.path().join("bare");
    std::fs::create_dir_all(&bare).unwrap();
    let absent = tmp_dir.path().join("absent");
    let mut fx = fixture(&[bare, listed.clone(), absent], FakeInspector::new());

    fx.provider.attach(ConnectMode::Startup).unwrap();
    fx.provider.load_plugins();

    assert_eq!(fx.watches.watched(), vec![(listed, "list.xml".to_string())]);
    assert!(fx.logger.contains(Level::Info, "not found in target directory"));
}

#[test]
fn test_repeated_load_keeps_one_watch_per_directory() {
    let tmp_dir = tempdir().expect("Failed to create temp directory");
    let dir = plugin_dir(tmp_dir.path(), "plugins", &[("A.dll", &["A.Type"])]);
    let mut fx = fixture(&[dir], FakeInspector::new());

    fx.provider.attach(ConnectMode::Startup).unwrap();
    fx.provider.load_plugins();
    let second = fx.provider.load_plugins();

    assert!(second.loaded.is_empty());
    assert_eq!(fx.host.attempts().len(), 1);
    assert_eq!(fx.watches.watched().len(), 1);
}

#[test]
fn test_broken_manifest_is_logged_and_other_directories_load() {
    let tmp_dir = tempdir().expect("Failed to create temp directory");
    let broken = tmp_dir.path().join("broken");
    std::fs::create_dir_all(&broken).unwrap();
    write_manifest(&broken, "<Plugins><Plugin><Instance>X</Instance></Plugin></Plugins>");
    let good = plugin_dir(tmp_dir.path(), "good", &[("G.dll", &["G.Type"])]);
    let mut fx = fixture(&[broken.clone(), good], FakeInspector::new());

    fx.provider.attach(ConnectMode::Startup).unwrap();
    let report = fx.provider.load_plugins();

    assert_eq!(report.loaded.len(), 1);
    assert!(fx.logger.contains(Level::Error, &broken.display().to_string()));
}

#[test]
fn test_not_attached_loads_without_watching() {
    let tmp_dir = tempdir().expect("Failed to create temp directory");
    let dir = plugin_dir(tmp_dir.path(), "plugins", &[("A.dll", &["A.Type"])]);
    let mut fx = fixture(&[dir], FakeInspector::new());

    let report = fx.provider.load_plugins();
    assert_eq!(report.loaded.len(), 1);
    assert!(fx.watches.watched().is_empty());
}

#[test]
fn test_detach_twice_cancels_each_watch_once() {
    let tmp_dir = tempdir().expect("Failed to create temp directory");
    let a = plugin_dir(tmp_dir.path(), "a", &[("A.dll", &["A.Type"])]);
    let b = plugin_dir(tmp_dir.path(), "b", &[("B.dll", &["B.Type"])]);
    let mut fx = fixture(&[a.clone(), b.clone()], FakeInspector::new());

    fx.provider.attach(ConnectMode::Startup).unwrap();
    fx.provider.load_plugins();
    fx.provider.detach(DisconnectMode::HostShutdown).unwrap();
    fx.provider.detach(DisconnectMode::HostShutdown).unwrap();

    assert_eq!(fx.watches.cancelled(), vec![a, b]);
    assert!(!fx.provider.is_attached());
    assert!(fx.provider.watched_directories().is_empty());
}

#[test]
fn test_attached_provider_is_readable_from_other_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<FileListProvider>();

    let tmp_dir = tempdir().expect("Failed to create temp directory");
    let dir = plugin_dir(tmp_dir.path(), "plugins", &[("A.dll", &["A.Type"])]);
    let mut fx = fixture(&[dir.clone()], FakeInspector::new());
    fx.provider.attach(ConnectMode::Startup).unwrap();
    fx.provider.load_plugins();

    let provider = &fx.provider;
    let seen = std::thread::scope(|scope| {
        scope
            .spawn(|| (provider.is_attached(), provider.watched_directories()))
            .join()
            .unwrap()
    });
    assert_eq!(seen, (true, vec![dir]));
}

#[test]
fn test_user_close_is_refused() {
    let tmp_dir = tempdir().expect("Failed to create temp directory");
    let dir = plugin_dir(tmp_dir.path(), "plugins", &[("A.dll", &["A.Type"])]);
    let mut fx = fixture(&[dir], FakeInspector::new());
    fx.provider.attach(ConnectMode::Startup).unwrap();
    fx.provider.load_plugins();

    let err = fx.provider.detach(DisconnectMode::UserClosed).unwrap_err();
    assert!(matches!(err, PluginSystemError::UnloadNotSupported { provider: "filelist" }));
    assert!(fx.watches.cancelled().is_empty());
    assert!(fx.provider.is_attached());
}

#[test]
fn test_manifest_changes_are_logged_and_forwarded() {
    let tmp_dir = tempdir().expect("Failed to create temp directory");
    let dir = plugin_dir(tmp_dir.path(), "plugins", &[("A.dll", &["A.Type"])]);
    let host = Arc::new(FakeHost::new());
    let watches = Arc::new(FakeWatchService::new());
    let (trace, logger) = memory_trace();
    let (sender, receiver) = mpsc::channel();
    let mut provider = FileListProvider::builder(host)
        .plugin_path(&dir)
        .inspector(Arc::new(FakeInspector::new()))
        .watch_service(watches.clone())
        .change_channel(sender)
        .trace(trace)
        .build()
        .unwrap();

    provider.attach(ConnectMode::AfterStartup).unwrap();
    provider.load_plugins();
    let change = ManifestChange {
        path: dir.join("list.xml"),
        kind: ChangeKind::Changed,
    };
    watches.fire(&dir, change.clone());

    assert_eq!(receiver.try_recv().unwrap(), change);
    assert!(logger.contains(Level::Info, "list.xml Changed"));
}

#[test]
fn test_load_from_directory_uses_attach_mode() {
    let tmp_dir = tempdir().expect("Failed to create temp directory");
    let dir = plugin_dir(tmp_dir.path(), "late", &[("L.dll", &["L.Type"])]);
    let mut fx = fixture(&[], FakeInspector::new());

    fx.provider.attach(ConnectMode::AfterStartup).unwrap();
    let report = fx.provider.load_from_directory(&dir).unwrap();

    assert_eq!(report.loaded.len(), 1);
    assert_eq!(fx.host.attempts()[0].mode, ConnectMode::AfterStartup);
}

#[test]
fn test_resolve_searches_plugin_paths_then_parent() {
    let tmp_dir = tempdir().expect("Failed to create temp directory");
    let dir = tmp_dir.path().join("plugins");
    touch(&dir.join("widgets.so"));
    let fallback = tmp_dir.path().join("shared").join("other.so");
    let parent = Arc::new(StaticResolver::new(Some(fallback.clone())));
    let provider = FileListProvider::builder(Arc::new(FakeHost::new()))
        .plugin_path(&dir)
        .inspector(Arc::new(FakeInspector::new().with_identity(dir.join("widgets.so"), "Acme.Widgets")))
        .watch_service(Arc::new(FakeWatchService::new()))
        .parent(parent.clone())
        .trace(memory_trace().0)
        .build()
        .unwrap();

    assert_eq!(provider.resolve("Acme.Widgets").unwrap().unwrap().path, dir.join("widgets.so"));
    assert_eq!(provider.resolve("Acme.Other").unwrap().unwrap().path, fallback);
    assert_eq!(parent.calls(), 1);
    assert!(provider.parent().is_some());
}

#[test]
fn test_rebuild_after_load_round_trips_the_manifest() {
    let tmp_dir = tempdir().expect("Failed to create temp directory");
    let dir = plugin_dir(tmp_dir.path(), "plugins", &[("Sample.dll", &["Acme.Widget"])]);
    let mut fx = fixture(&[dir.clone()], FakeInspector::new());
    fx.provider.attach(ConnectMode::Startup).unwrap();
    fx.provider.load_plugins();

    let written = fx.provider.rebuild_manifests().unwrap();
    assert_eq!(written, vec![dir.join("list(1).xml")]);
    assert_eq!(
        ManifestFile::new(&written[0]).unwrap().read().unwrap(),
        ManifestFile::new(dir.join("list.xml")).unwrap().read().unwrap()
    );
    assert_eq!(fx.provider.rebuild_manifest_for(&tmp_dir.path().join("empty")).unwrap(), None);
}

#[test]
fn test_invalid_config_is_rejected_at_build() {
    let mut config = ProviderConfig::default();
    config.manifest_file_name = String::new();
    let result = FileListProvider::builder(Arc::new(FakeHost::new()))
        .config(config)
        .build();

    assert!(matches!(result, Err(Error::StorageSystem(_))));
}
