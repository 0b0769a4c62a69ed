//! Environment readiness check.

use crate::browser::chromium::{find_chromium, ChromiumProcess};
use crate::settings::{resolve_settings_path, Overrides, Settings};
use anyhow::Result;
use harvest_core::{FatalContainment, ProcessHandle, RunMode};
use std::path::Path;

/// Report Chromium availability, settings, run mode and output directory.
///
/// With `launch`, also starts and closes Chromium once.
pub async fn run(
    config: Option<&Path>,
    overrides: &Overrides,
    launch: bool,
    containment: FatalContainment,
) -> Result<()> {
    println!("Course Harvest Doctor");
    println!("=====================");
    println!();

    // OS and architecture
    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!();

    let mut ready = true;

    // Settings
    match resolve_settings_path(config) {
        Some(path) => println!("[OK] Settings file: {}", path.display()),
        None => println!("[??] No settings file found, defaults apply"),
    }
    let mut settings = match Settings::load(config) {
        Ok(settings) => settings,
        Err(e) => {
            println!("[!!] Settings could not be loaded: {e}");
            println!();
            println!("Status: NOT READY");
            return Ok(());
        }
    };
    settings.apply_overrides(overrides);

    // Run mode
    match settings.run.mode() {
        Ok(RunMode::Catalog) => {
            println!("[OK] Mode: catalog");
            ready &= check_set("platform.catalogEndpoint", &settings.platform.catalog_endpoint);
            ready &= check_set("platform.courseUrlPrefix", &settings.platform.course_url_prefix);
        }
        Ok(RunMode::Single(target)) => println!("[OK] Mode: single course ({target})"),
        Err(no_target) => {
            println!("[!!] {no_target}");
            ready = false;
        }
    }
    if settings.run.login_check {
        ready &= check_set("platform.sessionCheckUrl", &settings.platform.session_check_url);
        ready &= check_set("platform.loginUrl", &settings.platform.login_url);
        ready &= check_set("platform.loggedInSelector", &settings.platform.logged_in_selector);
    }

    // Chromium
    let chromium_path = find_chromium(settings.browser.chromium_path.as_deref());
    match &chromium_path {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => {
            println!("[!!] Chromium NOT found. Set browser.chromiumPath or HARVEST_CHROMIUM_PATH.");
            ready = false;
        }
    }
    if let Some(profile) = settings.browser.resolved_profile_dir() {
        println!("[OK] Browser profile: {}", profile.display());
    }

    // Output directory
    let output_dir = &settings.download.output_dir;
    match std::fs::create_dir_all(output_dir) {
        Ok(()) => println!("[OK] Output directory: {}", output_dir.display()),
        Err(e) => {
            println!("[!!] Output directory {} is not writable: {e}", output_dir.display());
            ready = false;
        }
    }

    if launch && chromium_path.is_some() {
        let process = ChromiumProcess::new(settings.browser.clone(), containment);
        let launched = process.acquire().await;
        let closed = process.close().await;
        match launched.and(closed) {
            Ok(()) => println!("[OK] Chromium launches and closes cleanly"),
            Err(e) => {
                println!("[!!] Chromium failed to launch: {e:#}");
                ready = false;
            }
        }
    }

    println!();
    if ready {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }

    Ok(())
}

fn check_set(key: &str, value: &str) -> bool {
    if value.trim().is_empty() {
        println!("[!!] {key} is not set");
        false
    } else {
        println!("[OK] {key}: {value}");
        true
    }
}
