//! Core building blocks shared by the restore and removal flows.
//!
//! This module contains the pieces every flow leans on: specifier
//! classification, installed-state probing, and serial batch reporting.

mod probe;
mod sequence;
mod specifier;

pub use probe::{installed_platforms, installed_plugins, platform_installed, plugin_installed};
pub use sequence::{BatchReport, StepOutcome, StepStatus};
pub use specifier::{install_source, platform_package, Specifier, PLATFORM_PACKAGE_PREFIX};
