//! `.rc` resource file support.
//!
//! The resource file tells the compiler where the system scripts live,
//! where the package database is saved and which prefix to use for
//! compiler-synthesized variables. The file is JSON with only string
//! values:
//!
//! ```json
//! { "scripts": "ajs/scripts:/usr/lib/ajs/scripts",
//!   "db": "/tmp/ajs_packages.db",
//!   "temporary_variable_name": "@temp" }
//! ```
//!
//! Lookup stops at the first existing file of:
//!
//! 1. `$AJS_RC/ajs.rc`
//! 2. `./ajs/ajs.rc`
//! 3. `$HOME/.config/ajs/ajs.rc`
//! 4. `/etc/ajs/ajs.rc`

use std::path::{Path, PathBuf};

use ajs_common::message::{self, ErrCode, FatalError};
use ajs_common::position::Position;

/// Default colon-separated script paths.
const DEFAULT_SCRIPTS: &str = "ajs/scripts:/usr/lib/ajs/scripts";
/// Default package database location.
const DEFAULT_DB: &str = "/tmp/ajs_packages.db";
/// Default prefix of compiler-synthesized variables.
const DEFAULT_TEMPORARY_VARIABLE_NAME: &str = "@temp";

/// The loaded resource parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resources {
    scripts: Vec<PathBuf>,
    db: String,
    temporary_variable_name: String,
}

impl Resources {
    pub fn new() -> Self {
        let mut resources = Self {
            scripts: Vec::new(),
            db: String::new(),
            temporary_variable_name: String::new(),
        };
        resources.reset();
        resources
    }

    /// Restore the internal defaults.
    pub fn reset(&mut self) {
        self.set_scripts(DEFAULT_SCRIPTS, false);
        self.db = DEFAULT_DB.to_string();
        self.temporary_variable_name = DEFAULT_TEMPORARY_VARIABLE_NAME.to_string();
    }

    /// The ordered list of candidate `.rc` files.
    fn rc_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Ok(dir) = std::env::var("AJS_RC") {
            if !dir.is_empty() {
                candidates.push(Path::new(&dir).join("ajs.rc"));
            }
        }
        candidates.push(PathBuf::from("ajs/ajs.rc"));
        if let Ok(home) = std::env::var("HOME") {
            if !home.is_empty() {
                candidates.push(Path::new(&home).join(".config/ajs/ajs.rc"));
            }
        }
        candidates.push(PathBuf::from("/etc/ajs/ajs.rc"));
        candidates
    }

    /// Find and load the resource file. With `accept_if_missing` set, a
    /// missing file leaves the defaults in place; otherwise it is a
    /// fatal installation problem.
    pub fn init(&mut self, accept_if_missing: bool) -> Result<(), FatalError> {
        self.reset();

        let mut rc_filename: Option<PathBuf> = None;
        let mut content = String::new();
        for candidate in Self::rc_candidates() {
            if let Ok(text) = std::fs::read_to_string(&candidate) {
                content = text;
                rc_filename = Some(candidate);
                break;
            }
        }

        let rc_filename = match rc_filename {
            None => {
                if accept_if_missing {
                    // nothing to load, keep the defaults
                    return Ok(());
                }
                return Err(message::fatal(
                    ErrCode::Installation,
                    &Position::new(),
                    "cannot find the \"ajs.rc\" file; the system default is usually put in \"/etc/ajs/ajs.rc\".",
                ));
            }
            Some(filename) => filename,
        };

        let mut pos = Position::new();
        pos.set_filename(rc_filename.to_string_lossy());

        let root: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
            message::fatal(
                ErrCode::UnexpectedRc,
                &pos,
                format!("a resource file (.rc) must be valid JSON: {e}."),
            )
        })?;

        // null keeps the defaults
        if root.is_null() {
            return Ok(());
        }
        let object = match root.as_object() {
            Some(object) => object,
            None => {
                return Err(message::fatal(
                    ErrCode::UnexpectedRc,
                    &pos,
                    "a resource file (.rc) must be defined as a JSON object, or set to \"null\".",
                ));
            }
        };

        for (name, value) in object {
            // only strings are recognized in a resource file
            let value = match value.as_str() {
                Some(value) => value,
                None => {
                    return Err(message::fatal(
                        ErrCode::UnexpectedRc,
                        &pos,
                        "a resource file is expected to be an object of string elements.",
                    ));
                }
            };
            match name.as_str() {
                "scripts" => self.set_scripts(value, false),
                "db" => self.set_db(value)?,
                "temporary_variable_name" => self.set_temporary_variable_name(value)?,
                _ => {
                    // unknown parameters are ignored
                }
            }
        }

        Ok(())
    }

    pub fn scripts(&self) -> &[PathBuf] {
        &self.scripts
    }

    /// Replace the script paths from a colon-separated list. Entries
    /// are canonicalized; inaccessible entries are dropped, with a
    /// warning when requested.
    pub fn set_scripts(&mut self, scripts: &str, warn_about_invalid: bool) {
        self.scripts.clear();
        for part in scripts.split(':') {
            if part.is_empty() {
                continue;
            }
            match std::fs::canonicalize(part) {
                Ok(canonical) => {
                    // skip duplicates, preserving the order
                    if !self.scripts.contains(&canonical) {
                        self.scripts.push(canonical);
                    }
                }
                Err(e) => {
                    if warn_about_invalid {
                        message::warning(
                            ErrCode::Installation,
                            &Position::new(),
                            format!("scripts path \"{part}\" is not accessible ({e})."),
                        );
                    }
                }
            }
        }
    }

    pub fn db(&self) -> &str {
        &self.db
    }

    pub fn set_db(&mut self, db: &str) -> Result<(), FatalError> {
        if db.is_empty() {
            return Err(message::fatal(
                ErrCode::Installation,
                &Position::new(),
                "db path cannot be empty.",
            ));
        }
        self.db = db.to_string();
        Ok(())
    }

    pub fn temporary_variable_name(&self) -> &str {
        &self.temporary_variable_name
    }

    pub fn set_temporary_variable_name(&mut self, name: &str) -> Result<(), FatalError> {
        if name.is_empty() {
            return Err(message::fatal(
                ErrCode::Installation,
                &Position::new(),
                "the temporary variable name cannot be empty.",
            ));
        }
        self.temporary_variable_name = name.to_string();
        Ok(())
    }
}

impl Default for Resources {
    fn default() -> Self {
        Self::new()
    }
}
