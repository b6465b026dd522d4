//! Máquina de estados de resolución sobre el store en memoria.


use std::sync::atomic::Ordering;
use std::sync::Arc;

use flowenv_core::{Architecture, DependencySpec, EnvironmentResolution, ErrorKind, InMemoryManifestStore, LibrarySet, ManifestEntry, ManifestStore, ProcessRegistry, ResolutionState};
use test_support::{FakeCache, FakeResolver};

fn spec(pkg: &str) -> DependencySpec {
    let mut libs = LibrarySet::new();
    libs.insert(pkg.to_string(), "1.0".to_string());
    DependencySpec::new("HelloFlow", Architecture::new("linux-64"), "3.9.0", libs, vec!["conda-forge".into()])
}

struct Harness {
    store: Arc<InMemoryManifestStore>,
    resolver: Arc<FakeResolver>,
    registry: Arc<ProcessRegistry>,
}

impl Harness {
    fn new(resolver: FakeResolver) -> Self {
        Self { store: Arc::new(InMemoryManifestStore::new()),
               resolver: Arc::new(resolver),
               registry: Arc::new(ProcessRegistry::new()) }
    }
    fn local(&self) -> EnvironmentResolution {
        EnvironmentResolution::new(self.store.clone(), self.resolver.clone(), self.registry.clone())
    }
    fn remote(&self, cache: Arc<FakeCache>) -> EnvironmentResolution {
        self.local().with_cache(cache)
    }
}

#[test]
fn second_resolve_without_force_does_not_invoke_resolver() {
    let h = Harness::new(FakeResolver::default());
    let res = h.local();
    let s = spec("numpy");

    let first = res.resolve("start", &s, false).expect("first resolve");
    let second = res.resolve("start", &s, false).expect("second resolve");

    assert_eq!(h.resolver.creates(), 1);
    assert_eq!(first, second);
    assert_eq!(h.store.write_count(), 1);
    assert_eq!(first.requested_deps, vec!["python==3.9.0", "numpy==1.0", "-c conda-forge"]);
}

#[test]
fn manifest_hit_in_fresh_process_skips_resolver() {
    let h = Harness::new(FakeResolver::default());
    let s = spec("numpy");
    h.local().resolve("start", &s, false).expect("seed");

    // Nuevo registro = nuevo proceso; el manifest durable sigue ahí.
    let fresh = EnvironmentResolution::new(h.store.clone(), h.resolver.clone(), Arc::new(ProcessRegistry::new()));
    fresh.resolve("start", &s, false).expect("resolve from manifest");
    assert_eq!(h.resolver.creates(), 1);
    assert_eq!(h.store.write_count(), 1, "a local hit must not rewrite the manifest");
}

#[test]
fn force_reinvokes_resolver_and_touches_only_that_entry() {
    let h = Harness::new(FakeResolver::default());
    let res = h.local();
    let a = spec("numpy");
    let b = spec("pandas");
    res.resolve("start", &a, false).expect("a");
    res.resolve("start", &b, false).expect("b");
    let before_b = h.store.read("HelloFlow").expect("read")[b.identity()].clone();

    *h.resolver.url_suffix.lock().unwrap() = "?v2".into();
    let forced = res.resolve("start", &a, true).expect("forced");

    assert_eq!(h.resolver.creates(), 3);
    assert!(forced.download_urls.iter().all(|u| u.ends_with("?v2")));
    let manifest = h.store.read("HelloFlow").expect("read");
    assert_eq!(manifest[a.identity()], forced);
    assert_eq!(manifest[b.identity()], before_b);
}

#[test]
fn remote_execution_adds_cache_urls_to_existing_resolution() {
    let h = Harness::new(FakeResolver::default());
    let s = spec("numpy");
    let local_entry = h.local().resolve("start", &s, false).expect("local");
    assert_eq!(local_entry.state(), ResolutionState::Resolved);

    let cache = Arc::new(FakeCache::default());
    let remote = h.remote(cache.clone());
    let cached = remote.resolve("start", &s, false).expect("remote");

    assert_eq!(h.resolver.creates(), 1, "existing resolution must be reused");
    assert_eq!(cached.state(), ResolutionState::ResolvedCached);
    assert_eq!(cached.download_urls, local_entry.download_urls);
    assert_eq!(cache.calls.load(Ordering::SeqCst), 1);

    // Estado terminal: llamadas repetidas son no-ops.
    remote.resolve("start", &s, false).expect("again");
    assert_eq!(cache.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.store.write_count(), 2);
}

#[test]
fn remote_cache_of_uninstalled_environment_installs_exact_urls_first() {
    let h = Harness::new(FakeResolver::default());
    let s = spec("numpy");
    h.local().resolve("start", &s, false).expect("local");
    h.resolver.forget_installed();

    let remote = EnvironmentResolution::new(h.store.clone(), h.resolver.clone(), Arc::new(ProcessRegistry::new()))
        .with_cache(Arc::new(FakeCache::default()));
    remote.resolve("start", &s, false).expect("remote");
    assert_eq!(h.resolver.creates(), 1);
    assert_eq!(h.resolver.explicit_installs(), 1);
}

#[test]
fn prepare_installs_from_manifest_when_missing() {
    let h = Harness::new(FakeResolver::default());
    let s = spec("numpy");
    let env_id = h.local().prepare("start", &s).expect("prepare");
    assert_eq!(&env_id, s.identity());
    assert_eq!(h.resolver.explicit_installs(), 0, "create already installed it");

    h.resolver.forget_installed();
    let other_process = EnvironmentResolution::new(h.store.clone(), h.resolver.clone(), Arc::new(ProcessRegistry::new()));
    other_process.prepare("start", &s).expect("prepare again");
    assert_eq!(h.resolver.creates(), 1);
    assert_eq!(h.resolver.explicit_installs(), 1);
}

#[test]
fn resolver_failure_propagates_and_writes_nothing() {
    let h = Harness::new(FakeResolver::failing("unsatisfiable"));
    let err = h.local().resolve("start", &spec("numpy"), false).expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::Resolution);
    assert_eq!(h.store.write_count(), 0);
}

#[test]
fn manifest_round_trip_leaves_other_identities_alone() {
    let store = InMemoryManifestStore::new();
    let x = spec("numpy");
    let y = spec("pandas");
    let entry = |tag: &str| ManifestEntry { explicit_packages: vec![tag.into()],
                                            requested_deps: vec![],
                                            download_urls: vec![],
                                            install_order: vec![],
                                            cache_urls: None };
    store.write("HelloFlow", y.identity(), &entry("y")).expect("write y");
    store.write("HelloFlow", x.identity(), &entry("x")).expect("write x");
    let m = store.read("HelloFlow").expect("read");
    assert_eq!(m[x.identity()], entry("x"));
    assert_eq!(m[y.identity()], entry("y"));
    assert!(store.read("OtherFlow").expect("read other").is_empty());
}
