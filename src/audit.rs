//! Walking the filesystem and reporting findings
//!
//! The auditor walks a directory tree, reports every WordPress installation
//! it finds, and checks core and plugin versions against WordPress.org.

use crate::error::{Error, Result};
use crate::scanner;
use crate::version::PackageVersion;
use crate::wporg::WpOrg;
use chrono::{Local, NaiveDate};
use std::io::Write;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// A core release older than this many days is reported as probably outdated
const STALE_AFTER_DAYS: i64 = 180;

/// Walks a directory tree and reports outdated WordPress installations
pub struct Auditor<'a, W> {
    wporg: &'a mut WpOrg,
    out: W,
    today: NaiveDate,
}

impl<'a, W: Write> Auditor<'a, W> {
    /// Create an auditor writing its report to `out`
    pub fn new(wporg: &'a mut WpOrg, out: W) -> Self {
        Self {
            wporg,
            out,
            today: Local::now().date_naive(),
        }
    }

    /// Evaluate staleness against a fixed date instead of the current one
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Recursively audit every WordPress installation beneath `root`.
    ///
    /// Unreadable directory entries are skipped. Traversal does not prune
    /// below a detected installation, so nested installations (a backup
    /// inside an uploads folder, say) are reported independently.
    pub fn run(&mut self, root: &Path) -> Result<()> {
        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_dir() && scanner::is_wordpress(entry.path()) {
                self.report_installation(entry.path())?;
            }
        }
        Ok(())
    }

    fn report_installation(&mut self, wp_dir: &Path) -> Result<()> {
        self.line(&"-".repeat(40))?;
        self.line(&format!("WordPress: {}", wp_dir.display()))?;
        match scanner::core_version(wp_dir)? {
            Some(version) => {
                self.line(&format!("   Version: {version}"))?;
                self.report_core_staleness(&version)?;
            }
            None => {
                self.line("   wp-includes/version.php not found, skipping.")?;
            }
        }
        // Plugin checking is gated only on the plugins directory existing,
        // not on the core version having been found.
        self.report_plugins(wp_dir)
    }

    fn report_core_staleness(&mut self, version: &str) -> Result<()> {
        match self.wporg.core_release_date(version) {
            None => self.line("   This WordPress version is OUT-OF-DATE"),
            Some(released) if (self.today - released).num_days() > STALE_AFTER_DAYS => {
                self.line("   This WordPress version is probabily outdated")
            }
            Some(_) => Ok(()),
        }
    }

    fn report_plugins(&mut self, wp_dir: &Path) -> Result<()> {
        let plugins_dir = wp_dir.join("wp-content").join("plugins");
        if !plugins_dir.exists() {
            return Ok(());
        }
        self.line(&format!("Plugins: {}", plugins_dir.display()))?;
        for plugin_dir in scanner::plugin_dirs(&plugins_dir)? {
            self.report_plugin(&plugin_dir)?;
        }
        Ok(())
    }

    fn report_plugin(&mut self, plugin_dir: &Path) -> Result<()> {
        let slug = plugin_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Some(header) = scanner::plugin_header(plugin_dir)? else {
            debug!("{}: no plugin header, skipping", plugin_dir.display());
            return Ok(());
        };
        let Some(status) = self.wporg.plugin_latest(&slug) else {
            return Ok(());
        };
        let installed = PackageVersion::parse(&header.version);
        if status.closed {
            self.line(&format!("   {slug}: CLOSED"))?;
        } else if status.latest > installed {
            self.line(&format!(
                "   {slug}: updated required from {installed} to {}",
                status.latest
            ))?;
        }
        Ok(())
    }

    fn line(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{text}").map_err(Error::Output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::fs;
    use std::path::PathBuf;
    use url::Url;

    const RELEASES_HTML: &str = concat!(
        "<html><body><table><tbody>",
        "<tr><td>6.2</td><td>2023-01-01</td></tr>",
        "</tbody></table></body></html>"
    );

    fn oracle(server: &MockServer) -> WpOrg {
        WpOrg::with_base_url(Url::parse(&server.base_url()).unwrap()).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn mock_releases(server: &MockServer) {
        server.mock(|when, then| {
            when.method(GET).path("/download/releases/");
            then.status(200).body(RELEASES_HTML);
        });
    }

    /// Lay out a minimal installation with the given core version and plugins
    fn fake_install(dir: &Path, core: Option<&str>, plugins: &[(&str, &str)]) -> PathBuf {
        fs::create_dir_all(dir.join("wp-includes")).unwrap();
        if let Some(core) = core {
            fs::write(
                dir.join("wp-includes").join("version.php"),
                format!("<?php\n$wp_version = '{core}';\n"),
            )
            .unwrap();
        }
        let plugins_dir = dir.join("wp-content").join("plugins");
        fs::create_dir_all(&plugins_dir).unwrap();
        for (slug, version) in plugins {
            let plugin_dir = plugins_dir.join(slug);
            fs::create_dir_all(&plugin_dir).unwrap();
            fs::write(
                plugin_dir.join(format!("{slug}.php")),
                format!("<?php\n/*\nPlugin Name: {slug}\nVersion: {version}\n*/\n"),
            )
            .unwrap();
        }
        dir.to_path_buf()
    }

    fn run_audit(wporg: &mut WpOrg, root: &Path, today: NaiveDate) -> String {
        let mut out = Vec::new();
        Auditor::new(wporg, &mut out)
            .with_today(today)
            .run(root)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn fresh_core_prints_no_warning() {
        let server = MockServer::start();
        mock_releases(&server);
        let tmp = tempfile::tempdir().unwrap();
        let site = fake_install(&tmp.path().join("site"), Some("6.2"), &[]);
        let report = run_audit(&mut oracle(&server), tmp.path(), date(2023, 2, 1));
        let expected = format!(
            "{}\nWordPress: {}\n   Version: 6.2\nPlugins: {}\n",
            "-".repeat(40),
            site.display(),
            site.join("wp-content").join("plugins").display(),
        );
        assert_eq!(report, expected);
    }

    #[test]
    fn stale_core_is_probably_outdated() {
        let server = MockServer::start();
        mock_releases(&server);
        let tmp = tempfile::tempdir().unwrap();
        fake_install(&tmp.path().join("site"), Some("6.2"), &[]);
        let report = run_audit(&mut oracle(&server), tmp.path(), date(2023, 12, 1));
        assert!(report.contains("   This WordPress version is probabily outdated\n"));
    }

    #[test]
    fn unlisted_core_is_out_of_date() {
        let server = MockServer::start();
        mock_releases(&server);
        let tmp = tempfile::tempdir().unwrap();
        fake_install(&tmp.path().join("site"), Some("6.1.1"), &[]);
        let report = run_audit(&mut oracle(&server), tmp.path(), date(2023, 2, 1));
        assert!(report.contains("   This WordPress version is OUT-OF-DATE\n"));
    }

    #[test]
    fn missing_version_php_still_checks_plugins() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/plugins/hello-dolly");
            then.status(200)
                .body(r#"<div class="entry-meta">Version: 1.7</div>"#);
        });
        let tmp = tempfile::tempdir().unwrap();
        fake_install(&tmp.path().join("site"), None, &[("hello-dolly", "1.0")]);
        let report = run_audit(&mut oracle(&server), tmp.path(), date(2023, 2, 1));
        assert!(report.contains("   wp-includes/version.php not found, skipping.\n"));
        assert!(report.contains("   hello-dolly: updated required from 1.0 to 1.7\n"));
    }

    #[test]
    fn outdated_plugin_is_reported() {
        let server = MockServer::start();
        mock_releases(&server);
        server.mock(|when, then| {
            when.method(GET).path("/plugins/hello-dolly");
            then.status(200)
                .body(r#"<div class="entry-meta">Version: 1.7</div>"#);
        });
        let tmp = tempfile::tempdir().unwrap();
        fake_install(&tmp.path().join("site"), Some("6.2"), &[("hello-dolly", "1.0")]);
        let report = run_audit(&mut oracle(&server), tmp.path(), date(2023, 2, 1));
        assert!(report.contains("   hello-dolly: updated required from 1.0 to 1.7\n"));
    }

    #[test]
    fn up_to_date_plugin_prints_nothing() {
        let server = MockServer::start();
        mock_releases(&server);
        server.mock(|when, then| {
            when.method(GET).path("/plugins/hello-dolly");
            then.status(200)
                .body(r#"<div class="entry-meta">Version: 1.7</div>"#);
        });
        let tmp = tempfile::tempdir().unwrap();
        fake_install(&tmp.path().join("site"), Some("6.2"), &[("hello-dolly", "1.7")]);
        let report = run_audit(&mut oracle(&server), tmp.path(), date(2023, 2, 1));
        assert!(!report.contains("hello-dolly:"));
    }

    #[test]
    fn closed_plugin_line_is_exact() {
        let server = MockServer::start();
        mock_releases(&server);
        server.mock(|when, then| {
            when.method(GET).path("/plugins/abandoned");
            then.status(200).body(concat!(
                "<p>This plugin has been closed and is no longer available.</p>",
                r#"<div class="entry-meta">Version: 2.0</div>"#,
            ));
        });
        let tmp = tempfile::tempdir().unwrap();
        fake_install(&tmp.path().join("site"), Some("6.2"), &[("abandoned", "1.0")]);
        let report = run_audit(&mut oracle(&server), tmp.path(), date(2023, 2, 1));
        assert!(report.contains("   abandoned: CLOSED\n"));
    }

    #[test]
    fn unknown_plugin_prints_nothing_and_is_retried() {
        let server = MockServer::start();
        mock_releases(&server);
        let page = server.mock(|when, then| {
            when.method(GET).path("/plugins/ghost");
            then.status(404);
        });
        let tmp = tempfile::tempdir().unwrap();
        fake_install(&tmp.path().join("site"), Some("6.2"), &[("ghost", "1.0")]);
        let mut wporg = oracle(&server);
        let first = run_audit(&mut wporg, tmp.path(), date(2023, 2, 1));
        assert!(!first.contains("ghost:"));
        // A second scan hits the page again; the failure was not cached
        run_audit(&mut wporg, tmp.path(), date(2023, 2, 1));
        page.assert_hits(2);
    }

    #[test]
    fn repeated_runs_are_byte_identical() {
        let server = MockServer::start();
        mock_releases(&server);
        server.mock(|when, then| {
            when.method(GET).path("/plugins/hello-dolly");
            then.status(200)
                .body(r#"<div class="entry-meta">Version: 1.7</div>"#);
        });
        let tmp = tempfile::tempdir().unwrap();
        fake_install(&tmp.path().join("site"), Some("6.1.1"), &[("hello-dolly", "1.0")]);
        let mut wporg = oracle(&server);
        let first = run_audit(&mut wporg, tmp.path(), date(2023, 2, 1));
        let second = run_audit(&mut wporg, tmp.path(), date(2023, 2, 1));
        assert_eq!(first, second);
    }

    #[test]
    fn nested_installations_are_each_reported() {
        let server = MockServer::start();
        mock_releases(&server);
        let tmp = tempfile::tempdir().unwrap();
        let site = fake_install(&tmp.path().join("site"), Some("6.2"), &[]);
        fake_install(
            &site.join("wp-content").join("uploads").join("backup"),
            Some("6.2"),
            &[],
        );
        let report = run_audit(&mut oracle(&server), tmp.path(), date(2023, 2, 1));
        assert_eq!(report.matches("WordPress: ").count(), 2);
        assert!(report.contains("backup"));
    }
}
