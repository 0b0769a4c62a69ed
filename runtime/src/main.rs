// Copyright 2026 Course Harvest Contributors
// SPDX-License-Identifier: Apache-2.0

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use course_harvest::settings::Overrides;
use course_harvest::{cli, logging};
use harvest_core::FatalContainment;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "course-harvest",
    about = "Course Harvest: log in, enumerate the course catalog and download every course",
    version,
    after_help = "Run 'course-harvest <command> --help' for details on each command.\nRun 'course-harvest' with no command to start a download run."
)]
struct Cli {
    /// Path to the JSON settings file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Download this single course (overrides courseUrl)
    #[arg(long, global = true)]
    course_url: Option<String>,

    /// Download every course in the catalog (overrides downloadAllCourses)
    #[arg(long, global = true)]
    all: bool,

    /// Check for an existing session before downloading
    #[arg(long, global = true, overrides_with = "no_login_check")]
    login_check: bool,

    /// Skip the session check
    #[arg(long, global = true, overrides_with = "login_check")]
    no_login_check: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the configured course or the whole catalog (default)
    Run,
    /// Check environment and settings
    Doctor {
        /// Also launch and close Chromium once
        #[arg(long)]
        launch: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

impl Cli {
    fn overrides(&self) -> Overrides {
        let login_check = if self.login_check {
            Some(true)
        } else if self.no_login_check {
            Some(false)
        } else {
            None
        };
        Overrides {
            course_url: self.course_url.clone(),
            download_all: self.all.then_some(true),
            login_check,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet, cli.json);

    let containment = FatalContainment::process();
    containment.install_panic_hook();

    let overrides = cli.overrides();
    let config = cli.config.as_deref();

    // 0 = success (including a run with nothing to do), 1 = contained failure
    containment
        .guard(async {
            match cli.command {
                None | Some(Commands::Run) => cli::run::run(config, &overrides, containment.clone())
                    .await
                    .map(|_| ()),
                Some(Commands::Doctor { launch }) => {
                    cli::doctor::run(config, &overrides, launch, containment.clone()).await
                }
                Some(Commands::Completions { shell }) => {
                    let mut cmd = Cli::command();
                    clap_complete::generate(shell, &mut cmd, "course-harvest", &mut std::io::stdout());
                    Ok(())
                }
            }
        })
        .await;
}
