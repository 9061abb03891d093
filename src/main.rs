//! wp-check CLI - Check if local WordPress installations need to be updated

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use wp_check::{Auditor, WpOrg};

/// Check for out-of-date WordPress core and plugin installations
#[derive(Parser, Debug)]
#[command(name = "wp-check")]
#[command(version, about, long_about = None)]
struct Args {
    /// Root directory to scan recursively
    directory: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // Invoking without a directory is not an error; print the usage text
    // and exit cleanly.
    let Some(directory) = args.directory else {
        print_usage();
        return ExitCode::SUCCESS;
    };

    match run_audit(&directory) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_audit(directory: &Path) -> wp_check::Result<()> {
    let mut wporg = WpOrg::new()?;
    let stdout = std::io::stdout();
    let mut auditor = Auditor::new(&mut wporg, stdout.lock());
    auditor.run(directory)
}

fn print_usage() {
    println!("Usage: wp-check <DIRECTORY>\n");
    println!("Check for out-of-date WordPress core and plugin installations.");
    println!("The check is performed recursively within the specified directory.");
}
