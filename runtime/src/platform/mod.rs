//! Concrete collaborators for a course platform reached through Chromium.

pub mod catalog;
pub mod download;
pub mod manifest;
pub mod session;

pub use catalog::{extract_slugs, HttpCatalog};
pub use download::{file_stem_for, PageDownloader};
pub use manifest::{DownloadRecord, Manifest};
pub use session::{has_marker, BrowserSessionGate};
