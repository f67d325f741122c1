//! Configuration loading and precedence tests

use pretty_assertions::assert_eq;
use ptrcall_config::loader::{ENV_POOL_MAX_IDLE, ENV_POOL_PREWARM, ENV_POOL_SCRUB};
use ptrcall_config::{Config, ConfigError, ConfigLoader, PoolConfig, DEFAULT_MAX_IDLE};
use rstest::rstest;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn create_config_file(dir: &Path, content: &str) -> PathBuf {
    let config_path = dir.join("ptrcall.toml");
    fs::write(&config_path, content).unwrap();
    config_path
}

fn create_global_file(dir: &Path, content: &str) -> PathBuf {
    let global_path = dir.join("global.toml");
    fs::write(&global_path, content).unwrap();
    global_path
}

fn load(project_dir: &Path, global_path: PathBuf) -> Result<Config, ConfigError> {
    ConfigLoader::with_global_config_path(global_path).load_from_directory(project_dir)
}

fn clear_env() {
    env::remove_var(ENV_POOL_MAX_IDLE);
    env::remove_var(ENV_POOL_PREWARM);
    env::remove_var(ENV_POOL_SCRUB);
}

// ============================================================================
// Config Loading Tests
// ============================================================================

#[test]
#[serial]
fn test_no_config_anywhere_gives_defaults() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    let config = load(temp_dir.path(), temp_dir.path().join("missing.toml")).unwrap();

    assert!(!config.is_project());
    assert_eq!(config.pool, PoolConfig::default());
    assert_eq!(config.pool.max_idle, DEFAULT_MAX_IDLE);
    assert_eq!(config.library, None);
}

#[test]
#[serial]
fn test_empty_project_config_is_valid() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "");

    let config = load(temp_dir.path(), temp_dir.path().join("missing.toml")).unwrap();

    assert!(config.is_project());
    assert_eq!(config.pool, PoolConfig::default());
}

#[test]
#[serial]
fn test_load_from_nested_subdirectory() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[pool]\nmax_idle = 12\n");

    let nested = temp_dir.path().join("a").join("b");
    fs::create_dir_all(&nested).unwrap();

    let config = load(&nested, temp_dir.path().join("missing.toml")).unwrap();

    assert_eq!(config.pool.max_idle, 12);
    assert_eq!(config.project_root(), Some(temp_dir.path()));
}

#[test]
#[serial]
fn test_load_from_specific_file() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), "[pool]\nscrub_on_release = true\n");

    let config = ConfigLoader::with_global_config_path(temp_dir.path().join("missing.toml"))
        .load_from_file(&path)
        .unwrap();

    assert!(config.pool.scrub_on_release);
}

// ============================================================================
// Precedence Tests
// ============================================================================

#[test]
#[serial]
fn test_project_overrides_global_per_key() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let global = create_global_file(
        temp_dir.path(),
        "[pool]\nmax_idle = 100\nprewarm = 10\nscrub_on_release = true\n",
    );
    create_config_file(temp_dir.path(), "[pool]\nmax_idle = 20\n");

    let config = load(temp_dir.path(), global).unwrap();

    assert_eq!(
        config.pool,
        PoolConfig {
            max_idle: 20,
            prewarm: 10,
            scrub_on_release: true,
        }
    );
}

#[test]
#[serial]
fn test_env_overrides_project() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[pool]\nmax_idle = 20\nprewarm = 1\n");

    env::set_var(ENV_POOL_PREWARM, "5");
    env::set_var(ENV_POOL_SCRUB, "1");
    let config = load(temp_dir.path(), temp_dir.path().join("missing.toml"));
    clear_env();

    let config = config.unwrap();
    assert_eq!(config.pool.max_idle, 20);
    assert_eq!(config.pool.prewarm, 5);
    assert!(config.pool.scrub_on_release);
}

#[rstest]
#[case("-1")]
#[case("many")]
#[case("")]
#[serial]
fn test_env_invalid_count(#[case] value: &str) {
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    env::set_var(ENV_POOL_MAX_IDLE, value);
    let result = load(temp_dir.path(), temp_dir.path().join("missing.toml"));
    clear_env();

    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

#[test]
#[serial]
fn test_merged_prewarm_must_fit_max_idle() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let global = create_global_file(temp_dir.path(), "[pool]\nprewarm = 16\n");
    create_config_file(temp_dir.path(), "[pool]\nmax_idle = 8\n");

    let err = load(temp_dir.path(), global).unwrap_err();

    insta::assert_snapshot!(
        err.to_string(),
        @"invalid ptrcall config: pool.prewarm (16) cannot exceed pool.max_idle (8)"
    );
}

// ============================================================================
// Library Section Tests
// ============================================================================

#[test]
#[serial]
fn test_library_search_paths_resolved_against_root() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let global_dir = TempDir::new().unwrap();
    let global = create_global_file(
        temp_dir.path(),
        &format!(
            "search_paths = [{:?}]\n",
            global_dir.path().to_string_lossy()
        ),
    );
    create_config_file(
        temp_dir.path(),
        r#"
[library]
name = "godot_host"
proc_address_symbol = "host_get_proc_address"
search_paths = ["bin"]
"#,
    );

    let config = load(temp_dir.path(), global).unwrap();

    assert_eq!(config.library.as_deref(), Some("godot_host"));
    assert_eq!(
        config.proc_address_symbol.as_deref(),
        Some("host_get_proc_address")
    );
    assert_eq!(
        config.search_paths,
        vec![temp_dir.path().join("bin"), global_dir.path().to_path_buf()]
    );
}

// ============================================================================
// Error Tests
// ============================================================================

#[test]
#[serial]
fn test_invalid_toml_reports_file() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), "[pool\nmax_idle = 1\n");

    let err = load(temp_dir.path(), temp_dir.path().join("missing.toml")).unwrap_err();

    match err {
        ConfigError::Parse { file, .. } => assert_eq!(file, path),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
#[serial]
fn test_invalid_global_file_is_an_error() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let global = create_global_file(temp_dir.path(), "[pool]\nunknown = 1\n");

    let result = load(temp_dir.path(), global);

    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}
