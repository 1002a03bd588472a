use std::io::Write;

use transpiler_ir::{config::Config, errors::ConfigError, ir::builder::IRBuilder};

mod common;

#[test]
fn load_from_disk() {
    common::init_tracing();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[package]
name = "demo"
version = "0.2.0"
license = "MIT"

[profile.dev]
debug_info = true
"#
    )
    .unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.package.license, "MIT");

    let options = config.builder_options("dev", Some("demo.py")).unwrap();
    let mut builder = IRBuilder::new(options);
    builder.set_position(1, 1);
    builder.checkpoint();
    assert_eq!(builder.instructions().len(), 1);
}

#[test]
fn missing_file_and_bad_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Transpiler.toml");

    assert!(matches!(Config::load(&path), Err(ConfigError::Io { .. })));

    std::fs::write(&path, "[package\nname = 1").unwrap();
    assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
}
