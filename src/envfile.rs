//! The `.env` file on disk and the environment snapshot checks run against.

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// A point-in-time view of variable names and values.
///
/// Built once at the start of a run and passed explicitly to every check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the current process environment.
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn from_process() -> Self {
        std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect()
    }

    /// Add every entry whose name is not already present.
    ///
    /// Existing values win, matching the dotenv convention that the real
    /// environment takes precedence over the file.
    pub fn fill_from<I, K, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in entries {
            self.vars.entry(key.into()).or_insert_with(|| value.into());
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvSnapshot {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut snapshot = Self::new();
        for (key, value) in iter {
            snapshot.insert(key, value);
        }
        snapshot
    }
}

/// Format a single `NAME="value"` line (without the trailing newline).
pub fn format_entry(name: &str, value: &str) -> String {
    format!("{name}=\"{value}\"")
}

/// An append-only `.env` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvFile {
    path: PathBuf,
}

impl EnvFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create the file empty if it does not exist yet.
    ///
    /// Returns `true` when the file was created by this call.
    pub fn ensure_exists(&self) -> Result<bool> {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(_) => {
                tracing::info!(path = %self.path.display(), "created env file");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                tracing::debug!(path = %self.path.display(), "env file already exists");
                Ok(false)
            }
            Err(e) => Err(Error::io(&self.path, e)),
        }
    }

    /// Parse the file into a snapshot. A missing file reads as empty.
    ///
    /// Values are taken literally; `$NAME` is never expanded. Lines that are
    /// not `NAME=value` are skipped with a warning. When a name appears more
    /// than once the first occurrence wins.
    pub fn read(&self) -> Result<EnvSnapshot> {
        let mut snapshot = EnvSnapshot::new();
        if !self.exists() {
            return Ok(snapshot);
        }

        let content = self.contents()?;
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match parse_line(line) {
                Some((key, value)) => snapshot.fill_from([(key, value)]),
                None => tracing::warn!(
                    path = %self.path.display(),
                    line = index + 1,
                    "skipping line that is not NAME=value"
                ),
            }
        }

        Ok(snapshot)
    }

    /// Append `NAME="value"` lines in one write.
    ///
    /// A newline is inserted first if the file does not already end with one.
    pub fn append<'a, I>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut buf = String::new();
        for (name, value) in entries {
            buf.push_str(&format_entry(name, value));
            buf.push('\n');
        }
        if buf.is_empty() {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| Error::io(&self.path, e))?;

        if !ends_with_newline(&mut file).map_err(|e| Error::io(&self.path, e))? {
            buf.insert(0, '\n');
        }

        file.write_all(buf.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| Error::io(&self.path, e))
    }

    /// Raw file contents, mostly useful for diagnostics and tests.
    pub fn contents(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|e| Error::io(&self.path, e))
    }
}

static ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:export\s+)?([A-Za-z_][A-Za-z0-9_.\-]*)\s*=\s*(.*)$")
        .expect("env entry pattern is valid")
});

/// Split a trimmed, non-comment line into name and literal value.
///
/// Quoted values keep everything between the quotes. Unquoted values are
/// cut at a ` #` comment.
fn parse_line(line: &str) -> Option<(&str, &str)> {
    let caps = ENTRY.captures(line)?;
    let key = caps.get(1)?.as_str();
    let raw = caps.get(2)?.as_str();

    let value = match raw.chars().next() {
        Some(quote @ ('"' | '\'')) => match raw[1..].rfind(quote) {
            Some(end) => &raw[1..=end],
            None => raw,
        },
        _ => raw.split(" #").next().unwrap_or_default().trim_end(),
    };

    Some((key, value))
}

/// An empty file counts as ending with a newline.
fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
