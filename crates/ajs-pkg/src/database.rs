//! Persistent on-disk index of `(package, element) → (kind, file, line)`.
//!
//! The database is a two-level JSON object:
//!
//! ```json
//! {
//!   "<package>": {
//!     "<element>": { "type": "class", "filename": "x.ajs", "line": 3 }
//!   }
//! }
//! ```
//!
//! Package names may be dotted sub-packages. The database is rebuilt
//! when the native scripts directory is scanned and then persisted so
//! later invocations can resolve imports without re-parsing everything.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ajs_common::message::{ErrCode, FatalError};
use serde::{Deserialize, Serialize};

/// One indexed declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// `class`, `function`, `getter`, `setter`, `variable` or
    /// `enumeration`.
    #[serde(rename = "type")]
    pub kind: String,
    pub filename: String,
    pub line: u32,
}

impl Element {
    fn new() -> Self {
        Self {
            kind: String::new(),
            filename: String::new(),
            line: 1,
        }
    }
}

type PackageMap = BTreeMap<String, Element>;

/// The package database. `BTreeMap`s keep the saved JSON stable so the
/// file diffs cleanly between invocations.
#[derive(Debug, Default)]
pub struct Database {
    filename: PathBuf,
    packages: BTreeMap<String, PackageMap>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the database from `filename`. A missing file is not an
    /// error (the database starts empty and is created on save); a
    /// malformed file is fatal.
    pub fn load(&mut self, filename: impl AsRef<Path>) -> Result<(), FatalError> {
        self.filename = filename.as_ref().to_path_buf();
        self.packages.clear();
        let text = match std::fs::read_to_string(&self.filename) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(FatalError::new(
                    ErrCode::UnexpectedDatabase,
                    format!(
                        "cannot read database file \"{}\": {e}.",
                        self.filename.display()
                    ),
                ));
            }
        };
        // an empty or null database is acceptable
        if text.trim().is_empty() || text.trim() == "null" {
            return Ok(());
        }
        self.packages = serde_json::from_str(&text).map_err(|e| {
            FatalError::new(
                ErrCode::UnexpectedDatabase,
                format!(
                    "database file \"{}\" is not a valid database: {e}.",
                    self.filename.display()
                ),
            )
        })?;
        Ok(())
    }

    /// Serialize the database back over the file it was loaded from.
    pub fn save(&self) -> Result<(), FatalError> {
        let text = serde_json::to_string_pretty(&self.packages).map_err(|e| {
            FatalError::new(
                ErrCode::UnexpectedDatabase,
                format!("cannot serialize the package database: {e}."),
            )
        })?;
        std::fs::write(&self.filename, text).map_err(|e| {
            FatalError::new(
                ErrCode::IoError,
                format!(
                    "cannot write database file \"{}\": {e}.",
                    self.filename.display()
                ),
            )
        })
    }

    /// Glob-like match: `*` matches any run of characters, anything
    /// else matches itself. An empty pattern matches nothing.
    pub fn match_pattern(name: &str, pattern: &str) -> bool {
        if pattern.is_empty() {
            return false;
        }
        fn glob(name: &[u8], pattern: &[u8]) -> bool {
            match pattern.first() {
                None => name.is_empty(),
                Some(b'*') => {
                    // zero or more of any character
                    (0..=name.len()).any(|skip| glob(&name[skip..], &pattern[1..]))
                }
                Some(&c) => name.first() == Some(&c) && glob(&name[1..], &pattern[1..]),
            }
        }
        glob(name.as_bytes(), pattern.as_bytes())
    }

    /// Names of the packages matching `pattern`.
    pub fn find_packages(&self, pattern: &str) -> Vec<String> {
        self.packages
            .keys()
            .filter(|name| Self::match_pattern(name, pattern))
            .cloned()
            .collect()
    }

    /// Elements of `package` whose name matches `pattern`.
    pub fn find_elements(&self, package: &str, pattern: &str) -> Vec<(String, Element)> {
        match self.packages.get(package) {
            None => Vec::new(),
            Some(elements) => elements
                .iter()
                .filter(|(name, _)| Self::match_pattern(name, pattern))
                .map(|(name, element)| (name.clone(), element.clone()))
                .collect(),
        }
    }

    /// First element matching the package pattern, element pattern and
    /// optional kind. This is the query the compiler runs to discover
    /// which file declares an imported name.
    pub fn find_element(
        &self,
        package_pattern: &str,
        element_pattern: &str,
        kind: Option<&str>,
    ) -> Option<Element> {
        for package in self.find_packages(package_pattern) {
            for (_, element) in self.find_elements(&package, element_pattern) {
                if kind.is_none() || kind == Some(element.kind.as_str()) {
                    return Some(element);
                }
            }
        }
        None
    }

    /// Insert-or-get a package entry.
    pub fn add_package(&mut self, name: &str) {
        self.packages.entry(name.to_string()).or_default();
    }

    /// Insert-or-get an element entry, returned mutably so the caller
    /// can fill in the declaration data.
    pub fn add_element(&mut self, package: &str, element: &str) -> &mut Element {
        self.packages
            .entry(package.to_string())
            .or_default()
            .entry(element.to_string())
            .or_insert_with(Element::new)
    }

    pub fn get_element(&self, package: &str, element: &str) -> Option<&Element> {
        self.packages.get(package)?.get(element)
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Database {
        let mut db = Database::new();
        let e = db.add_element("foo", "bar");
        e.kind = "class".to_string();
        e.filename = "X.ajs".to_string();
        e.line = 12;
        let e = db.add_element("foo.sub", "baz");
        e.kind = "function".to_string();
        e.filename = "Y.ajs".to_string();
        e.line = 3;
        db
    }

    #[test]
    fn match_pattern_semantics() {
        // exact match without '*'
        assert!(Database::match_pattern("foo", "foo"));
        assert!(!Database::match_pattern("foo", "fo"));
        assert!(!Database::match_pattern("fo", "foo"));

        // '*' matches any run of characters, including empty
        assert!(Database::match_pattern("foo", "*"));
        assert!(Database::match_pattern("foo", "f*"));
        assert!(Database::match_pattern("foo", "*o"));
        assert!(Database::match_pattern("foo", "f*o"));
        assert!(Database::match_pattern("foo", "foo*"));
        assert!(Database::match_pattern("foo.sub", "foo.*"));
        assert!(!Database::match_pattern("bar", "f*"));

        // several '*' are fine
        assert!(Database::match_pattern("alpha.beta", "*a*b*"));

        // an empty pattern matches nothing, even an empty name
        assert!(!Database::match_pattern("foo", ""));
        assert!(!Database::match_pattern("", ""));
        assert!(Database::match_pattern("", "*"));
    }

    #[test]
    fn find_packages_and_elements() {
        let db = sample();
        let mut packages = db.find_packages("foo*");
        packages.sort();
        assert_eq!(packages, vec!["foo".to_string(), "foo.sub".to_string()]);

        let elements = db.find_elements("foo", "*");
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].0, "bar");
        assert_eq!(elements[0].1.kind, "class");

        assert!(db.find_elements("unknown", "*").is_empty());
    }

    #[test]
    fn find_element_honors_the_kind() {
        let db = sample();
        let found = db.find_element("foo", "bar", None).unwrap();
        assert_eq!(found.filename, "X.ajs");
        assert!(db.find_element("foo", "bar", Some("function")).is_none());
        let found = db.find_element("*", "baz", Some("function")).unwrap();
        assert_eq!(found.filename, "Y.ajs");
    }

    #[test]
    fn add_element_is_insert_or_get() {
        let mut db = Database::new();
        db.add_element("p", "e").kind = "variable".to_string();
        // a second add returns the same entry
        assert_eq!(db.add_element("p", "e").kind, "variable");
        assert_eq!(db.package_count(), 1);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("packages.db");

        let mut db = sample();
        db.load(&path).unwrap(); // load clears; point at the new file
        let e = db.add_element("foo", "bar");
        e.kind = "class".to_string();
        e.filename = "X.ajs".to_string();
        e.line = 12;
        db.save().unwrap();

        let mut reloaded = Database::new();
        reloaded.load(&path).unwrap();
        let element = reloaded.get_element("foo", "bar").unwrap();
        assert_eq!(element.kind, "class");
        assert_eq!(element.filename, "X.ajs");
        assert_eq!(element.line, 12);
    }

    #[test]
    fn loading_a_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let mut db = Database::new();
        db.load(dir.path().join("absent.db")).unwrap();
        assert_eq!(db.package_count(), 0);
    }

    #[test]
    fn loading_a_malformed_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.db");
        std::fs::write(&path, "{ not json").unwrap();
        let mut db = Database::new();
        let err = db.load(&path).unwrap_err();
        assert_eq!(err.code, ErrCode::UnexpectedDatabase);
    }

    #[test]
    fn database_file_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("format.db");
        let mut db = Database::new();
        db.load(&path).unwrap();
        let e = db.add_element("pkg", "elem");
        e.kind = "getter".to_string();
        e.filename = "g.ajs".to_string();
        e.line = 7;
        db.save().unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["pkg"]["elem"]["type"], "getter");
        assert_eq!(value["pkg"]["elem"]["filename"], "g.ajs");
        assert_eq!(value["pkg"]["elem"]["line"], 7);
    }
}
