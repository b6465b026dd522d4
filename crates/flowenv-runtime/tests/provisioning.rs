
use std::ffi::{OsStr, OsString};
use std::fs;
use std::sync::Arc;

use flowenv_adapters::{LocalObjectStore, ObjectStore, StorageRegistry};
use flowenv_core::{DatastoreType, EnvConfig, EnvError, ErrorKind, ExecutionRole, Libraries, ManifestStore, ProcessRegistry};
use flowenv_persistence::FileManifestStore;
use flowenv_runtime::{build_resolution, EnvironmentProvisioner, EnvironmentStepDecorator, HostLinks, LaunchPlan, NoTrampolines,
                      StepInit, StepLifecycle, TaskAttempt};
use test_support::{linux_host, mac_host, settings, FakeFetcher, FakeResolver, RecordingTrampolines, SyntheticDistribution, SHIM_FILE_NAME};

fn step_config() -> EnvConfig {
    EnvConfig { libraries: Libraries::Compact("numpy:1.21.0".into()), python: Some("3.9.0".into()), ..Default::default() }
}

fn flow_config() -> EnvConfig {
    EnvConfig { channels: vec!["conda-forge".into()], ..Default::default() }
}

struct Harness {
    _dir: tempfile::TempDir,
    root: std::path::PathBuf,
    resolver: Arc<FakeResolver>,
    fetcher: Arc<FakeFetcher>,
    decorator: EnvironmentStepDecorator,
}

fn harness(datastore: DatastoreType, host: flowenv_core::HostPlatform, ext_count: usize) -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().to_path_buf();
    let settings = settings(&root);
    let resolver = Arc::new(FakeResolver::new(root.join("pkgs")));
    let fetcher = Arc::new(FakeFetcher::default());
    let mut storage = StorageRegistry::new();
    let objects = root.join("objects");
    storage.register(DatastoreType::S3,
                     Box::new(move |_root: &str| Ok(Box::new(LocalObjectStore::new(objects.clone())) as Box<dyn ObjectStore>)));
    let resolution = build_resolution(&settings,
                                      datastore,
                                      resolver.clone(),
                                      fetcher.clone(),
                                      &storage,
                                      Arc::new(ProcessRegistry::new())).expect("wiring");
    let dist = SyntheticDistribution::create(&root.join("site"), true, ext_count);
    let decorator = EnvironmentStepDecorator::new("train",
                                                  step_config(),
                                                  flow_config(),
                                                  settings,
                                                  host,
                                                  Arc::new(resolution),
                                                  Arc::new(dist),
                                                  Arc::new(NoTrampolines));
    Harness { _dir: dir, root, resolver, fetcher, decorator }
}

fn init(d: &mut EnvironmentStepDecorator, datastore: DatastoreType, extensions: &[String]) {
    d.step_init(&StepInit { flow_name: "HelloFlow", environment_mode: "conda", datastore, active_extensions: extensions })
     .expect("step_init");
}

#[test]
fn namespace_extension_with_three_paths_gets_three_subdirectories() {
    let dir = tempfile::tempdir().expect("tempdir");
    let dist = SyntheticDistribution::create(&dir.path().join("site"), true, 3);
    let links = HostLinks::create(&dir.path().join("tmp"), &dist, &NoTrampolines).expect("links");

    assert_eq!(links.additional_paths().len(), 3);
    assert!(!links.path().join("metaflow_extensions").exists());
    for (sub, target) in links.additional_paths().iter().zip(&dist.ext_paths) {
        assert!(sub.starts_with(links.path()));
        assert_eq!(&fs::read_link(sub.join("metaflow_extensions")).expect("symlink"), target);
    }
    let search = links.module_search_path();
    assert_eq!(search.len(), 4);
    assert_eq!(search.last().map(|p| p.as_path()), Some(links.path()));
}

#[test]
fn full_lifecycle_on_local_datastore() {
    let mut h = harness(DatastoreType::Local, linux_host(), 2);
    let d = &mut h.decorator;
    init(d, DatastoreType::Local, &[]);
    let expected_id = d.spec().expect("spec").identity().clone();
    assert!(expected_id.as_str().starts_with("metaflow_HelloFlow_linux-64_"));

    d.package_init().expect("package_init");
    d.runtime_init().expect("runtime_init");
    d.runtime_task_created(ExecutionRole::Regular).expect("task created");
    assert_eq!(h.resolver.creates(), 1);
    assert_eq!(d.env_id(), Some(&expected_id));

    let mut plan = LaunchPlan::new(vec!["python3".into(), "flow.py".into(), "step".into(), "train".into()]);
    plan.commands = vec!["step".into()];
    plan.env.insert("PATH".into(), OsString::from("/usr/bin"));
    d.runtime_step_cli(&mut plan, ExecutionRole::Regular).expect("cli");

    let links_dir = d.provisioner().host_links().expect("links").path().to_path_buf();
    let python = format!("/envs/{expected_id}/bin/python");
    assert_eq!(plan.entrypoint[0], OsString::from(&python));
    assert_eq!(plan.env["PATH"], OsString::from(format!("/envs/{expected_id}/bin:/usr/bin")));
    assert_eq!(plan.env["_METAFLOW_CONDA_ENV"], OsString::from(expected_id.as_str()));
    assert_eq!(plan.env["PYTHONNOUSERSITE"], OsString::from("1"));
    let module_path = plan.env["PYTHONPATH"].to_string_lossy().into_owned();
    assert!(module_path.ends_with(&*links_dir.to_string_lossy()));
    assert_eq!(module_path.split(':').count(), 3);

    // Manifest durable sin cache remota.
    let manifest = FileManifestStore::new(h.root.join("datastore")).read("HelloFlow").expect("manifest");
    assert!(manifest[&expected_id].cache_urls.is_none());
    assert_eq!(h.fetcher.calls.load(std::sync::atomic::Ordering::SeqCst), 0);

    d.runtime_finished(None).expect("finished");
    assert!(!links_dir.exists());
}

#[test]
fn forcing_command_bypasses_context() {
    let mut h = harness(DatastoreType::Local, linux_host(), 0);
    let d = &mut h.decorator;
    init(d, DatastoreType::Local, &[]);
    d.runtime_init().expect("runtime_init");
    d.runtime_task_created(ExecutionRole::Regular).expect("task created");

    let mut plan = LaunchPlan::new(vec!["python3".into()]);
    plan.commands = vec!["batch".into(), "step".into()];
    d.runtime_step_cli(&mut plan, ExecutionRole::Regular).expect("cli");
    assert!(plan.env.is_empty());
    assert_eq!(plan.entrypoint, vec![OsString::from("python3")]);
    d.runtime_finished(None).expect("finished");
}

#[test]
fn remote_extension_forces_architecture_and_relaxes_checks_on_mac() {
    let mut h = harness(DatastoreType::Local, mac_host(), 0);
    init(&mut h.decorator, DatastoreType::Local, &["batch".to_string()]);
    let spec = h.decorator.spec().expect("spec");
    assert_eq!(spec.architecture().as_str(), "linux-64");
    assert!(spec.force_architecture());
    assert!(spec.disable_safety_checks());

    h.decorator.package_init().expect("package_init");
    assert_eq!(*h.resolver.last_request.lock().unwrap(), Some(("linux-64".to_string(), true)));
}

#[test]
fn remote_datastore_caches_artifacts() {
    let mut h = harness(DatastoreType::S3, linux_host(), 0);
    init(&mut h.decorator, DatastoreType::S3, &[]);
    h.decorator.package_init().expect("package_init");
    let env_id = h.decorator.spec().expect("spec").identity().clone();

    let manifest = FileManifestStore::new(h.root.join("datastore")).read("HelloFlow").expect("manifest");
    let cache_urls = manifest[&env_id].cache_urls.clone().expect("cache urls");
    assert_eq!(cache_urls.len(), 1);
    assert_eq!(cache_urls[0].1, "repo.example/main/requests-2.26.0.tar.bz2/md5req/requests-2.26.0.tar.bz2");
    assert!(h.root.join("objects").join(&cache_urls[0].1).is_file());
    assert!(h.root.join("pkgs").join("requests-2.26.0.tar.bz2").is_file());
    // S3 fija boto3 en los tokens.
    assert!(manifest[&env_id].requested_deps.iter().any(|d| d.starts_with("boto3==")));
}

#[test]
fn wrong_environment_mode_is_configuration_error() {
    let mut h = harness(DatastoreType::Local, linux_host(), 0);
    let err = h.decorator
               .step_init(&StepInit { flow_name: "HelloFlow", environment_mode: "local", datastore: DatastoreType::Local, active_extensions: &[] })
               .expect_err("guard");
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("--environment=conda"));
}

#[test]
fn control_task_is_tagged_but_not_provisioned() {
    let mut h = harness(DatastoreType::Local, linux_host(), 0);
    let d = &mut h.decorator;
    init(d, DatastoreType::Local, &[]);
    d.runtime_task_created(ExecutionRole::Control).expect("task created");
    assert_eq!(h.resolver.creates(), 0);

    let pre = d.task_pre_step(&TaskAttempt { role: ExecutionRole::Control,
                                             retry_count: 0,
                                             interpreter: "/envs/x/bin/python".into(),
                                             inherited_path: None })
               .expect("pre step");
    assert!(pre.context.env_id().is_some());
    assert!(pre.context.variable("PATH").is_none());
    assert!(pre.metadata.is_empty());
}

#[test]
fn regular_task_pre_step_prepends_interpreter_dir_and_emits_metadata() {
    let mut h = harness(DatastoreType::Local, linux_host(), 0);
    let d = &mut h.decorator;
    init(d, DatastoreType::Local, &[]);
    let pre = d.task_pre_step(&TaskAttempt { role: ExecutionRole::Task,
                                             retry_count: 2,
                                             interpreter: "/envs/x/bin/python".into(),
                                             inherited_path: Some("/usr/bin".into()) })
               .expect("pre step");
    assert_eq!(pre.context.variable("PATH"), Some(OsStr::new("/envs/x/bin:/usr/bin")));
    assert_eq!(pre.metadata.len(), 1);
    let meta = &pre.metadata[0];
    assert_eq!(meta.field, "conda_env_id");
    assert_eq!(meta.kind, "conda_env_id");
    assert_eq!(meta.tags, vec!["attempt_id:2".to_string()]);
    assert_eq!(serde_json::to_value(meta).expect("json")["type"], "conda_env_id");
}

#[test]
fn disabled_step_skips_everything() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = settings(dir.path());
    let resolver = Arc::new(FakeResolver::new(dir.path().join("pkgs")));
    let resolution = build_resolution(&settings,
                                      DatastoreType::Local,
                                      resolver.clone(),
                                      Arc::new(FakeFetcher::default()),
                                      &StorageRegistry::new(),
                                      Arc::new(ProcessRegistry::new())).expect("wiring");
    let dist = SyntheticDistribution::create(&dir.path().join("site"), false, 0);
    let mut d = EnvironmentStepDecorator::new("train",
                                              EnvConfig { disabled: Some(true), ..step_config() },
                                              flow_config(),
                                              settings,
                                              linux_host(),
                                              Arc::new(resolution),
                                              Arc::new(dist),
                                              Arc::new(NoTrampolines));
    init(&mut d, DatastoreType::Local, &[]);
    d.package_init().expect("package_init");
    d.runtime_task_created(ExecutionRole::Regular).expect("task created");
    let mut plan = LaunchPlan::new(vec!["python3".into()]);
    d.runtime_step_cli(&mut plan, ExecutionRole::Regular).expect("cli");
    assert_eq!(resolver.creates(), 0);
    assert!(plan.env.is_empty());
}

#[test]
fn launch_without_prepared_environment_fails() {
    let mut h = harness(DatastoreType::Local, linux_host(), 0);
    let d = &mut h.decorator;
    init(d, DatastoreType::Local, &[]);
    d.runtime_init().expect("runtime_init");
    let mut plan = LaunchPlan::new(vec!["python3".into()]);
    let err = d.runtime_step_cli(&mut plan, ExecutionRole::Regular).expect_err("no env");
    assert!(matches!(err, EnvError::MissingEnvironment(_)));
    let private = d.provisioner().host_links().expect("links").path().to_path_buf();
    assert!(private.is_dir());
    d.runtime_finished(Some(&err)).expect("teardown after failure");
    assert!(!private.exists());
}

#[test]
fn trampolines_are_installed_once_into_private_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    let dist = SyntheticDistribution::create(&dir.path().join("site"), true, 0);
    let trampolines = RecordingTrampolines::default();
    let links = HostLinks::create(&dir.path().join("tmp"), &dist, &trampolines).expect("links");

    assert_eq!(*trampolines.dirs.lock().unwrap(), vec![links.path().to_path_buf()]);
    assert!(links.path().join(SHIM_FILE_NAME).is_file());
}

#[test]
fn runtime_init_installs_trampolines_through_decorator() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = settings(dir.path());
    let resolution = build_resolution(&settings,
                                      DatastoreType::Local,
                                      Arc::new(FakeResolver::new(dir.path().join("pkgs"))),
                                      Arc::new(FakeFetcher::default()),
                                      &StorageRegistry::new(),
                                      Arc::new(ProcessRegistry::new())).expect("wiring");
    let trampolines = Arc::new(RecordingTrampolines::default());
    let mut d = EnvironmentStepDecorator::new("train",
                                              step_config(),
                                              flow_config(),
                                              settings,
                                              linux_host(),
                                              Arc::new(resolution),
                                              Arc::new(SyntheticDistribution::create(&dir.path().join("site"), true, 0)),
                                              trampolines.clone());
    init(&mut d, DatastoreType::Local, &[]);
    d.runtime_init().expect("runtime_init");
    d.runtime_init().expect("second runtime_init is a no-op");

    let private = d.provisioner().host_links().expect("links").path().to_path_buf();
    assert_eq!(*trampolines.dirs.lock().unwrap(), vec![private]);
    d.runtime_finished(None).expect("finished");
}

#[test]
fn unregistered_remote_backend_fails_wiring() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = build_resolution(&settings(dir.path()),
                               DatastoreType::Azure,
                               Arc::new(FakeResolver::new(dir.path())),
                               Arc::new(FakeFetcher::default()),
                               &StorageRegistry::new(),
                               Arc::new(ProcessRegistry::new())).err()
                                                                .expect("no azure backend");
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn context_requires_host_links() {
    let dir = tempfile::tempdir().expect("tempdir");
    let resolution = build_resolution(&settings(dir.path()),
                                      DatastoreType::Local,
                                      Arc::new(FakeResolver::new(dir.path())),
                                      Arc::new(FakeFetcher::default()),
                                      &StorageRegistry::new(),
                                      Arc::new(ProcessRegistry::new())).expect("wiring");
    let provisioner = EnvironmentProvisioner::new(Arc::new(resolution));
    assert!(provisioner.build_execution_context(&"metaflow_F_linux-64_x".into(), None).is_err());
}
