mod common;

use std::fs;
use std::path::Path;

use semver::Version;
use stackup_plugin::{
    InstallEvent, InstallOptions, InstallOrchestrator, InstallOutcome, InstallStage, Placement,
    PluginKind, PluginRequirement, ProgramInfo, RecordingObserver, Satisfaction, Silent,
};
use tempfile::{tempdir, TempDir};

use common::*;

struct Fixture {
    _root: TempDir,
    cache: std::path::PathBuf,
    temp: std::path::PathBuf,
    program: ProgramInfo,
}

impl Fixture {
    fn new() -> Self {
        let root = tempdir().unwrap();
        let cache = root.path().join("plugins");
        let temp = root.path().join("tmp");
        fs::create_dir_all(&temp).unwrap();
        let program = ProgramInfo::new(root.path().join("app"), "nodejs");
        Self {
            _root: root,
            cache,
            temp,
            program,
        }
    }

    fn orchestrator(&self, transport: FakeTransport, attempts: u32) -> InstallOrchestrator<FakeTransport> {
        InstallOrchestrator::new(downloader(transport, &self.temp, attempts), installer(&self.cache))
    }

    fn preinstall(&self, dir_name: &str) {
        fs::create_dir_all(self.cache.join(dir_name)).unwrap();
    }
}

fn pinned(name: &str, version: &str) -> PluginRequirement {
    PluginRequirement::new(PluginKind::Resource, name).with_version(Version::parse(version).unwrap())
}

fn assert_no_temp_files(dir: &Path) {
    assert_eq!(count_entries(dir), 0, "temporary files left in {}", dir.display());
}

#[tokio::test]
async fn test_cached_pinned_plugin_needs_no_download() {
    let fx = Fixture::new();
    fx.preinstall("resource-aws-v1.0.0");
    let runtime = FakeRuntime::with_requirements(vec![pinned("aws", "1.0.0")]);
    let transport = FakeTransport::default();

    let report = fx
        .orchestrator(transport.clone(), 3)
        .run(&runtime, &fx.program, InstallOptions::default(), &Silent)
        .await
        .unwrap();

    assert_eq!(report.downloads, 0);
    assert_eq!(transport.calls(), 0);
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].1, InstallOutcome::Skipped(Satisfaction::Exact));
    assert!(report.dependencies_installed);
    assert_eq!(runtime.dependency_calls(), 1);
    assert_eq!(runtime.lookup_calls(), 1);
}

#[tokio::test]
async fn test_installs_missing_plugins_in_order() {
    let fx = Fixture::new();
    fx.preinstall("language-nodejs");
    let aws = pinned("aws", "6.1.0");
    let random = PluginRequirement::new(PluginKind::Resource, "random");
    let nodejs = PluginRequirement::new(PluginKind::Language, "nodejs");
    let runtime = FakeRuntime::with_requirements(vec![aws.clone(), nodejs.clone(), random.clone()]);
    let transport = FakeTransport::new([Reply::Body(plugin_archive(&aws)), Reply::Body(plugin_archive(&random))]);
    let observer = RecordingObserver::new();

    let report = fx
        .orchestrator(transport.clone(), 3)
        .run(&runtime, &fx.program, InstallOptions::default(), &observer)
        .await
        .unwrap();

    assert_eq!(report.downloads, 2);
    assert_eq!(report.installed(), 2);
    assert_eq!(report.skipped(), 1);
    assert_eq!(
        transport.urls(),
        vec![
            format!("{BASE_URL}/pulumi-resource-aws-v6.1.0-linux-amd64.tar.gz"),
            format!("{BASE_URL}/pulumi-resource-random-latest-linux-amd64.tar.gz"),
        ]
    );
    assert_eq!(
        observer.events(),
        vec![
            InstallEvent::Installing(aws.label()),
            InstallEvent::Installed(aws.label()),
            InstallEvent::Skipped(nodejs.label()),
            InstallEvent::Installing(random.label()),
            InstallEvent::Installed(random.label()),
        ]
    );

    assert!(fx.cache.join("resource-aws-v6.1.0/pulumi-resource-aws").is_file());
    assert!(fx.cache.join("resource-random/pulumi-resource-random").is_file());
    assert_no_temp_files(&fx.temp);
}

#[tokio::test]
async fn test_failure_stops_remaining_requirements() {
    let fx = Fixture::new();
    let first = pinned("aws", "1.0.0");
    let second = pinned("gcp", "2.0.0");
    let third = pinned("azure", "3.0.0");
    let runtime = FakeRuntime::with_requirements(vec![first.clone(), second.clone(), third.clone()]);
    // The second download gets the default 404.
    let transport = FakeTransport::new([Reply::Body(plugin_archive(&first))]);
    let observer = RecordingObserver::new();

    let err = fx
        .orchestrator(transport.clone(), 3)
        .run(&runtime, &fx.program, InstallOptions::default(), &observer)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), InstallStage::Download);
    assert_eq!(err.plugin(), Some(&second.label()));
    assert!(err.to_string().contains("resource plugin gcp-2.0.0"));
    assert_eq!(transport.calls(), 2);
    assert_eq!(
        observer.events(),
        vec![
            InstallEvent::Installing(first.label()),
            InstallEvent::Installed(first.label()),
            InstallEvent::Installing(second.label()),
            InstallEvent::Failed(second.label()),
        ]
    );
    assert!(!fx.cache.join(third.dir_name()).exists());
    assert_no_temp_files(&fx.temp);
}

#[tokio::test]
async fn test_force_reinstalls_cached_plugin() {
    let fx = Fixture::new();
    let aws = pinned("aws", "1.0.0");
    fx.preinstall(&aws.dir_name());
    fs::write(fx.cache.join(aws.dir_name()).join("stale"), "old").unwrap();
    let runtime = FakeRuntime::with_requirements(vec![aws.clone()]);
    let transport = FakeTransport::new([Reply::Body(plugin_archive(&aws))]);

    let options = InstallOptions {
        force: true,
        ..InstallOptions::default()
    };
    let report = fx
        .orchestrator(transport.clone(), 1)
        .run(&runtime, &fx.program, options, &Silent)
        .await
        .unwrap();

    assert_eq!(report.downloads, 1);
    let dir = fx.cache.join(aws.dir_name());
    assert!(!dir.join("stale").exists());
    assert!(dir.join("pulumi-resource-aws").is_file());
}

#[tokio::test]
async fn test_bad_archive_is_an_install_error() {
    let fx = Fixture::new();
    let aws = pinned("aws", "1.0.0");
    let runtime = FakeRuntime::with_requirements(vec![aws.clone()]);
    let transport = FakeTransport::new([Reply::Body(b"definitely not gzip".to_vec())]);

    let err = fx
        .orchestrator(transport, 1)
        .run(&runtime, &fx.program, InstallOptions::default(), &Silent)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), InstallStage::Install);
    assert_eq!(err.plugin(), Some(&aws.label()));
    assert_no_temp_files(&fx.temp);
    assert_eq!(count_entries(&fx.cache), 0);
}

#[tokio::test]
async fn test_skip_plugins_never_asks_for_requirements() {
    let fx = Fixture::new();
    let runtime = FakeRuntime::with_requirements(vec![pinned("aws", "1.0.0")]);
    let transport = FakeTransport::default();

    let options = InstallOptions {
        skip_plugins: true,
        use_version_tools: true,
        ..InstallOptions::default()
    };
    let report = fx
        .orchestrator(transport.clone(), 1)
        .run(&runtime, &fx.program, options, &Silent)
        .await
        .unwrap();

    assert!(report.outcomes.is_empty());
    assert_eq!(runtime.dependency_calls(), 1);
    assert!(runtime.used_version_tools.load(std::sync::atomic::Ordering::SeqCst));
    assert_eq!(runtime.lookup_calls(), 0);
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_skip_everything_is_a_no_op() {
    let fx = Fixture::new();
    let runtime = FakeRuntime::with_requirements(vec![pinned("aws", "1.0.0")]);

    let options = InstallOptions {
        skip_plugins: true,
        skip_dependencies: true,
        ..InstallOptions::default()
    };
    let report = fx
        .orchestrator(FakeTransport::default(), 1)
        .run(&runtime, &fx.program, options, &Silent)
        .await
        .unwrap();

    assert!(!report.dependencies_installed);
    assert_eq!(runtime.dependency_calls(), 0);
    assert_eq!(runtime.lookup_calls(), 0);
}

#[tokio::test]
async fn test_dependency_failure_is_fatal() {
    let fx = Fixture::new();
    let runtime = FakeRuntime {
        fail_dependencies: true,
        ..FakeRuntime::with_requirements(vec![pinned("aws", "1.0.0")])
    };

    let err = fx
        .orchestrator(FakeTransport::default(), 1)
        .run(&runtime, &fx.program, InstallOptions::default(), &Silent)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), InstallStage::DependencyInstall);
    assert!(err.plugin().is_none());
    assert_eq!(runtime.lookup_calls(), 0);
}

#[tokio::test]
async fn test_lookup_failure_is_fatal() {
    let fx = Fixture::new();
    let runtime = FakeRuntime {
        fail_lookup: true,
        ..FakeRuntime::default()
    };

    let err = fx
        .orchestrator(FakeTransport::default(), 1)
        .run(&runtime, &fx.program, InstallOptions::default(), &Silent)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), InstallStage::PluginLookup);
    assert!(err.to_string().starts_with("determining required plugins"));
}

#[tokio::test]
async fn test_leftover_staging_is_swept() {
    let fx = Fixture::new();
    fx.preinstall(".tmp-interrupted");
    let runtime = FakeRuntime::default();

    fx.orchestrator(FakeTransport::default(), 1)
        .run(&runtime, &fx.program, InstallOptions::default(), &Silent)
        .await
        .unwrap();

    assert!(!fx.cache.join(".tmp-interrupted").exists());
}

#[tokio::test]
async fn test_directory_appearing_during_download_is_kept() {
    let fx = Fixture::new();
    let aws = pinned("aws", "1.0.0");
    let downloader = downloader(FakeTransport::new([Reply::Body(plugin_archive(&aws))]), &fx.temp, 1);
    let artifact = downloader.fetch(&aws, &Silent, &Silent).await.unwrap();

    fx.preinstall("resource-aws-v1.0.0");
    let observer = RecordingObserver::new();
    let placement = installer(&fx.cache)
        .install(&aws, artifact, false, &observer)
        .await
        .unwrap();

    let target = fx.cache.join("resource-aws-v1.0.0");
    assert_eq!(placement, Placement::KeptExisting(target.clone()));
    assert_eq!(count_entries(&target), 0);
    assert_no_temp_files(&fx.temp);
    assert!(observer.events().is_empty());
}
