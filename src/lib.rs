//! # Cova
//!
//! Project tool for Cordova-style hybrid apps: keeps the `config.xml`
//! descriptor and the `package.json` manifest in sync, and drives platform
//! and plugin installs and removals from the declared state.
//!
//! ## How a project fits together
//!
//! - `config.xml` declares engines (platforms) and plugins with variables
//! - `package.json` mirrors the same set under a reserved `cordova` section
//! - `platforms/` and `plugins/` hold whatever is actually materialized
//!
//! Restore reconciles the two stores (descriptor entries migrate into the
//! manifest, which then becomes authoritative) and installs whatever is
//! declared but missing, strictly one item at a time. Removal walks the
//! inverse steps per target.
//!
//! ## Quick Start
//!
//! ```bash
//! # Install
//! cargo install cova
//!
//! # Bring the project tree in line with the declarations
//! cova restore
//!
//! # Add a platform, pinned to a version range
//! cova platform add ios@^7.0.0
//! ```

pub mod core;
pub mod ops;
pub mod project;
pub mod removal;
pub mod restore;

// Re-export commonly used types
pub use crate::core::{BatchReport, Specifier, StepOutcome, StepStatus};
pub use crate::ops::Toolchain;
pub use crate::project::Project;
pub use crate::removal::{
    remove_platforms, remove_plugins, RemovalError, RemovalStep, RemoveOptions,
};
pub use crate::restore::{restore_platforms, restore_plugins, restore_project};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "cova";
