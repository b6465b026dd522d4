//! `FLOWENV_PYTHON_VERSION` llega hasta el token `python==` del spec.

use std::path::Path;

use flowenv_core::{select_architecture, DatastoreType, DependencySpecBuilder, EnvConfig, HostPlatform, Settings};

#[test]
fn python_override_reaches_dependency_tokens() {
    let settings = Settings::from_lookup(|k| (k == "FLOWENV_PYTHON_VERSION").then(|| "3.7.4".to_string()), Path::new("/"))
        .expect("settings");
    assert_eq!(settings.python_version.as_deref(), Some("3.7.4"));

    let host = HostPlatform::from_settings(&settings).expect("host");
    assert_eq!(host.python_version, "3.7.4");

    let choice = select_architecture::<String>(&[], &settings.force_linux64, &host);
    let spec = DependencySpecBuilder::new("HelloFlow", DatastoreType::Local, host.python_version.clone(), choice)
        .build(&EnvConfig::default(), &EnvConfig::default())
        .expect("spec");
    assert_eq!(spec.tokens(false)[0], "python==3.7.4");
}

#[test]
fn step_python_still_wins_over_host_override() {
    let settings = Settings::from_lookup(|k| (k == "FLOWENV_PYTHON_VERSION").then(|| "3.7.4".to_string()), Path::new("/"))
        .expect("settings");
    let host = HostPlatform::from_settings(&settings).expect("host");
    let choice = select_architecture::<String>(&[], &settings.force_linux64, &host);
    let step = EnvConfig { python: Some("3.10.1".into()), ..Default::default() };
    let spec = DependencySpecBuilder::new("HelloFlow", DatastoreType::Local, host.python_version.clone(), choice)
        .build(&step, &EnvConfig::default())
        .expect("spec");
    assert_eq!(spec.python(), "3.10.1");
}
