// Copyright 2026 Course Harvest Contributors
// SPDX-License-Identifier: Apache-2.0

//! Course Harvest runtime: Chromium-backed collaborators for the harvest
//! core, settings loading and the CLI commands.
//!
//! This library crate exposes the modules for integration testing.

pub mod browser;
pub mod cli;
pub mod http_client;
pub mod logging;
pub mod platform;
pub mod settings;
