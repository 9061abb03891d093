//! On-disk WordPress installation scanning
//!
//! Detects installation roots and extracts the declared core and plugin
//! versions from their source files.

use crate::error::{Error, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Core version assignment in wp-includes/version.php
const CORE_VERSION_PATTERN: &str = r"(?m)\$wp_version\s*=\s*'([^']+)'";

/// Plugin header lines in a plugin's top-level .php files
const PLUGIN_NAME_PATTERN: &str = r"(?m)Plugin Name:\s*(.+?)$";
const PLUGIN_VERSION_PATTERN: &str = r"(?m)Version:\s*(.+?)$";

/// Name and version declared in a plugin's header comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginHeader {
    /// Display name from the `Plugin Name:` line
    pub name: String,
    /// Version string from the `Version:` line
    pub version: String,
}

/// Read a text file, handling different encodings.
///
/// Strict UTF-8 first; on failure the raw bytes go through byte-level
/// encoding detection. A detected encoding that still produces malformed
/// sequences is a hard error.
pub fn read_file(path: &Path) -> Result<String> {
    let raw = fs::read(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    match String::from_utf8(raw) {
        Ok(text) => Ok(text),
        Err(err) => {
            let raw = err.into_bytes();
            let mut detector = chardetng::EncodingDetector::new();
            detector.feed(&raw, true);
            let encoding = detector.guess(None, true);
            debug!(
                "{} is not UTF-8, decoding as {}",
                path.display(),
                encoding.name()
            );
            let (text, _, malformed) = encoding.decode(&raw);
            if malformed {
                return Err(Error::FileEncoding {
                    path: path.to_path_buf(),
                });
            }
            Ok(text.into_owned())
        }
    }
}

/// Naive on-disk WordPress detection.
///
/// A directory is an installation root iff it has both a `wp-content` and a
/// `wp-includes` entry directly beneath it. Existence only; no content
/// validation, so non-standard layouts go undetected.
pub fn is_wordpress(dir: &Path) -> bool {
    dir.join("wp-content").exists() && dir.join("wp-includes").exists()
}

/// Extract the core version declared in `wp-includes/version.php`.
///
/// A missing file or a missing `$wp_version` assignment yields `None`.
pub fn core_version(wp_dir: &Path) -> Result<Option<String>> {
    let version_php = wp_dir.join("wp-includes").join("version.php");
    if !version_php.exists() {
        return Ok(None);
    }
    let code = read_file(&version_php)?;
    let re = Regex::new(CORE_VERSION_PATTERN).unwrap();
    Ok(re.captures(&code).map(|caps| caps[1].to_string()))
}

/// Extract the declared name and version from a plugin's header comment.
///
/// Scans every top-level `.php` file in the plugin directory in file-name
/// order. Later files overwrite earlier matches, so the name and version can
/// come from different files. Returns `None` unless both were found.
pub fn plugin_header(plugin_dir: &Path) -> Result<Option<PluginHeader>> {
    let name_re = Regex::new(PLUGIN_NAME_PATTERN).unwrap();
    let version_re = Regex::new(PLUGIN_VERSION_PATTERN).unwrap();

    let mut name = None;
    let mut version = None;
    for php_file in php_files(plugin_dir)? {
        let code = read_file(&php_file)?;
        let Some(caps) = name_re.captures(&code) else {
            continue;
        };
        name = Some(caps[1].to_string());
        // The version is only taken from files that also declare a name
        let Some(caps) = version_re.captures(&code) else {
            continue;
        };
        version = Some(caps[1].to_string());
    }
    match (name, version) {
        (Some(name), Some(version)) => Ok(Some(PluginHeader { name, version })),
        _ => Ok(None),
    }
}

/// Non-hidden plugin subdirectories, sorted by name
pub fn plugin_dirs(plugins_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in list_dir(plugins_dir)? {
        let hidden = entry
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with('.'));
        if entry.is_dir() && !hidden {
            dirs.push(entry);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Top-level `.php` regular files in a directory, sorted by file name
fn php_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in list_dir(dir)? {
        if entry.is_file() && entry.extension().is_some_and(|ext| ext == "php") {
            files.push(entry);
        }
    }
    files.sort();
    Ok(files)
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|source| Error::DirList {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| Error::DirList {
            path: dir.to_path_buf(),
            source,
        })?;
        paths.push(entry.path());
    }
    Ok(paths)
}
