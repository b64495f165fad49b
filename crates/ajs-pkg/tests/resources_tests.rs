//! Resource file loading tests.
//!
//! The lookup consults `$AJS_RC` and `$HOME`, so every test temporarily
//! rewrites the environment behind a shared mutex.

use std::path::Path;
use std::sync::Mutex;

use ajs_common::message::{self, ErrCode, MessageLevel};
use ajs_pkg::Resources;
use tempfile::TempDir;

static ENV_LOCK: Mutex<()> = Mutex::new(());

struct EnvGuard {
    saved_rc: Option<String>,
    saved_home: Option<String>,
}

impl EnvGuard {
    fn set(rc: Option<&Path>, home: Option<&Path>) -> Self {
        let guard = Self {
            saved_rc: std::env::var("AJS_RC").ok(),
            saved_home: std::env::var("HOME").ok(),
        };
        match rc {
            Some(dir) => std::env::set_var("AJS_RC", dir),
            None => std::env::remove_var("AJS_RC"),
        }
        match home {
            Some(dir) => std::env::set_var("HOME", dir),
            None => std::env::remove_var("HOME"),
        }
        guard
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match &self.saved_rc {
            Some(value) => std::env::set_var("AJS_RC", value),
            None => std::env::remove_var("AJS_RC"),
        }
        match &self.saved_home {
            Some(value) => std::env::set_var("HOME", value),
            None => std::env::remove_var("HOME"),
        }
    }
}

fn write_rc(dir: &Path, content: &str) {
    std::fs::write(dir.join("ajs.rc"), content).unwrap();
}

#[test]
fn defaults_without_any_rc_file() {
    let _lock = ENV_LOCK.lock().unwrap();
    let empty = TempDir::new().unwrap();
    let _env = EnvGuard::set(None, Some(empty.path()));

    let mut resources = Resources::new();
    resources.init(true).unwrap();
    assert_eq!(resources.db(), "/tmp/ajs_packages.db");
    assert_eq!(resources.temporary_variable_name(), "@temp");
}

#[test]
fn missing_rc_is_fatal_when_required() {
    let _lock = ENV_LOCK.lock().unwrap();
    message::set_message_level(MessageLevel::Off);
    let empty = TempDir::new().unwrap();
    let _env = EnvGuard::set(None, Some(empty.path()));

    let mut resources = Resources::new();
    let err = resources.init(false).unwrap_err();
    assert_eq!(err.code, ErrCode::Installation);
}

#[test]
fn rc_round_trip() {
    let _lock = ENV_LOCK.lock().unwrap();
    let dir = TempDir::new().unwrap();
    let scripts = TempDir::new().unwrap();
    write_rc(
        dir.path(),
        &format!(
            r#"{{ "scripts": "{}", "db": "/tmp/test.db", "temporary_variable_name": "@tmp" }}"#,
            scripts.path().display()
        ),
    );
    let _env = EnvGuard::set(Some(dir.path()), None);

    let mut resources = Resources::new();
    resources.init(false).unwrap();
    assert_eq!(resources.db(), "/tmp/test.db");
    assert_eq!(resources.temporary_variable_name(), "@tmp");
    assert_eq!(resources.scripts().len(), 1);
    assert_eq!(
        resources.scripts()[0],
        std::fs::canonicalize(scripts.path()).unwrap()
    );
}

#[test]
fn unknown_keys_are_ignored() {
    let _lock = ENV_LOCK.lock().unwrap();
    let dir = TempDir::new().unwrap();
    write_rc(dir.path(), r#"{ "db": "/tmp/x.db", "future_key": "hello" }"#);
    let _env = EnvGuard::set(Some(dir.path()), None);

    let mut resources = Resources::new();
    resources.init(false).unwrap();
    assert_eq!(resources.db(), "/tmp/x.db");
}

#[test]
fn non_string_value_is_fatal() {
    let _lock = ENV_LOCK.lock().unwrap();
    message::set_message_level(MessageLevel::Off);
    let dir = TempDir::new().unwrap();
    write_rc(dir.path(), r#"{ "db": 123 }"#);
    let _env = EnvGuard::set(Some(dir.path()), None);

    let mut resources = Resources::new();
    let err = resources.init(false).unwrap_err();
    assert_eq!(err.code, ErrCode::UnexpectedRc);
}

#[test]
fn empty_db_is_fatal() {
    let _lock = ENV_LOCK.lock().unwrap();
    message::set_message_level(MessageLevel::Off);
    let dir = TempDir::new().unwrap();
    write_rc(dir.path(), r#"{ "db": "" }"#);
    let _env = EnvGuard::set(Some(dir.path()), None);

    let mut resources = Resources::new();
    let err = resources.init(false).unwrap_err();
    assert_eq!(err.code, ErrCode::Installation);
}

#[test]
fn null_rc_keeps_defaults() {
    let _lock = ENV_LOCK.lock().unwrap();
    let dir = TempDir::new().unwrap();
    write_rc(dir.path(), "null");
    let _env = EnvGuard::set(Some(dir.path()), None);

    let mut resources = Resources::new();
    resources.init(false).unwrap();
    assert_eq!(resources.db(), "/tmp/ajs_packages.db");
}

#[test]
fn ajs_rc_takes_precedence_over_home() {
    let _lock = ENV_LOCK.lock().unwrap();
    let rc_dir = TempDir::new().unwrap();
    write_rc(rc_dir.path(), r#"{ "db": "/tmp/from_rc_dir.db" }"#);

    let home = TempDir::new().unwrap();
    let config = home.path().join(".config/ajs");
    std::fs::create_dir_all(&config).unwrap();
    write_rc(&config, r#"{ "db": "/tmp/from_home.db" }"#);

    let _env = EnvGuard::set(Some(rc_dir.path()), Some(home.path()));
    let mut resources = Resources::new();
    resources.init(false).unwrap();
    assert_eq!(resources.db(), "/tmp/from_rc_dir.db");

    // without $AJS_RC the home configuration wins
    let _env2 = EnvGuard::set(None, Some(home.path()));
    let mut resources = Resources::new();
    resources.init(false).unwrap();
    assert_eq!(resources.db(), "/tmp/from_home.db");
}

#[test]
fn inaccessible_script_paths_are_dropped() {
    let _lock = ENV_LOCK.lock().unwrap();
    let good = TempDir::new().unwrap();
    let mut resources = Resources::new();
    resources.set_scripts(
        &format!("/no/such/dir/anywhere:{}", good.path().display()),
        false,
    );
    assert_eq!(resources.scripts().len(), 1);
}

#[test]
fn duplicate_script_paths_collapse() {
    let _lock = ENV_LOCK.lock().unwrap();
    let dir = TempDir::new().unwrap();
    let mut resources = Resources::new();
    resources.set_scripts(
        &format!("{0}:{0}", dir.path().display()),
        false,
    );
    assert_eq!(resources.scripts().len(), 1);
}
