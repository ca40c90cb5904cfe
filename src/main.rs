//! Cova command line interface.
//!
//! Subcommands map onto the library flows: `platform`/`plugin` manage the
//! declared state and drive installs, `restore` reconciles the whole
//! project, `completions` emits shell completion scripts.

use std::collections::BTreeMap;
use std::io;

use anyhow::{bail, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cova::core::{installed_platforms, installed_plugins, platform_package};
use cova::project::PluginDecl;
use cova::{
    remove_platforms, remove_plugins, restore_platforms, restore_plugins, restore_project,
    BatchReport, Project, RemoveOptions, Toolchain,
};

/// Project tool for Cordova-style hybrid apps
#[derive(Parser)]
#[command(name = "cova")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage target platforms
    Platform {
        #[command(subcommand)]
        operation: PlatformOperation,
    },

    /// Manage plugins
    Plugin {
        #[command(subcommand)]
        operation: PluginOperation,
    },

    /// Install everything the config stores declare
    Restore,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum PlatformOperation {
    /// Declare platforms and install them
    Add {
        /// Platform names, optionally pinned (`ios@^7.0.0`)
        #[arg(required = true)]
        platforms: Vec<String>,
    },

    /// Uninstall platforms
    #[command(alias = "remove")]
    Rm {
        /// Platform names
        platforms: Vec<String>,

        /// Keep the declarations in config.xml and package.json
        #[arg(long)]
        no_save: bool,
    },

    /// List installed and declared platforms
    #[command(alias = "list")]
    Ls,
}

#[derive(Subcommand)]
enum PluginOperation {
    /// Declare plugins and install them
    Add {
        /// Plugin ids, optionally pinned (`cordova-plugin-camera@^6.0.0`)
        #[arg(required = true)]
        plugins: Vec<String>,

        /// Install-time variable, may be given multiple times
        #[arg(long = "variable", value_name = "KEY=VALUE")]
        variable: Vec<String>,
    },

    /// Uninstall plugins
    #[command(alias = "remove")]
    Rm {
        /// Plugin ids (short names resolve against the installed set)
        plugins: Vec<String>,

        /// Keep the declarations in config.xml and package.json
        #[arg(long)]
        no_save: bool,
    },

    /// List installed and declared plugins
    #[command(alias = "list")]
    Ls,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let code = match cli.command {
        Commands::Platform { operation } => match operation {
            PlatformOperation::Add { platforms } => cmd_platform_add(&platforms)?,
            PlatformOperation::Rm { platforms, no_save } => cmd_platform_rm(&platforms, no_save)?,
            PlatformOperation::Ls => cmd_platform_ls()?,
        },
        Commands::Plugin { operation } => match operation {
            PluginOperation::Add { plugins, variable } => cmd_plugin_add(&plugins, &variable)?,
            PluginOperation::Rm { plugins, no_save } => cmd_plugin_rm(&plugins, no_save)?,
            PluginOperation::Ls => cmd_plugin_ls()?,
        },
        Commands::Restore => cmd_restore()?,
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "cova", &mut io::stdout());
            0
        }
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

/// Locate and open the project the current directory belongs to.
async fn open_project() -> Result<Project> {
    let cwd = std::env::current_dir()?;
    let Some(root) = Project::find_root(&cwd) else {
        bail!("Current directory is not inside a Cova project (no config.xml found)");
    };
    Ok(Project::open(root).await?)
}

/// Split `name[@spec]`, tolerating scoped package ids like `@scope/pkg@1.0`.
fn split_target(raw: &str) -> (&str, Option<&str>) {
    match raw.rsplit_once('@') {
        Some((name, spec)) if !name.is_empty() && !spec.is_empty() => (name, Some(spec)),
        _ => (raw, None),
    }
}

fn parse_variables(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    let mut variables = BTreeMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("Invalid --variable '{pair}', expected KEY=VALUE");
        };
        variables.insert(key.to_string(), value.to_string());
    }
    Ok(variables)
}

fn print_report(report: &BatchReport) {
    for outcome in report.steps() {
        println!("  {}: {}", outcome.name, outcome.status);
    }
    println!(
        "{} done, {} skipped, {} failed",
        report.done_count(),
        report.skipped_count(),
        report.failed_count()
    );
}

fn cmd_platform_add(names: &[String]) -> Result<i32> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let mut project = open_project().await?;

        let mut targets = Vec::new();
        for raw in names {
            let (name, spec) = split_target(raw);
            project.descriptor.add_engine(name, spec);
            targets.push(name.to_string());
        }
        project.descriptor.persist().await?;

        let tools = Toolchain::host();
        let report = restore_platforms(&mut project, &tools, &targets).await?;
        print_report(&report);
        Ok(report.exit_code())
    })
}

fn cmd_platform_rm(names: &[String], no_save: bool) -> Result<i32> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let mut project = open_project().await?;
        let tools = Toolchain::host();
        let opts = RemoveOptions { save: !no_save };
        let report = remove_platforms(&mut project, &tools, names, &opts).await?;
        print_report(&report);
        Ok(report.exit_code())
    })
}

fn cmd_platform_ls() -> Result<i32> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let project = open_project().await?;
        let installed = installed_platforms(project.root()).await?;

        println!("Installed platforms:");
        if installed.is_empty() {
            println!("  (none)");
        }
        for name in &installed {
            println!("  {name}");
        }

        // Manifest entries first, then engines only config.xml still knows.
        let mut declared: Vec<(String, Option<String>)> = Vec::new();
        for name in project.manifest.platforms() {
            let spec = project
                .manifest
                .dependency_spec(&platform_package(name))
                .map(str::to_string);
            declared.push((name.clone(), spec));
        }
        for engine in project.descriptor.engines() {
            if !declared.iter().any(|(name, _)| *name == engine.name) {
                declared.push((engine.name, engine.spec));
            }
        }

        println!();
        println!("Declared platforms:");
        if declared.is_empty() {
            println!("  (none)");
        }
        for (name, spec) in &declared {
            match spec {
                Some(spec) => println!("  {name} ({spec})"),
                None => println!("  {name}"),
            }
        }
        Ok(0)
    })
}

fn cmd_plugin_add(ids: &[String], variable: &[String]) -> Result<i32> {
    let variables = parse_variables(variable)?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let mut project = open_project().await?;

        let mut targets = Vec::new();
        for raw in ids {
            let (id, spec) = split_target(raw);
            project.descriptor.add_plugin(&PluginDecl {
                id: id.to_string(),
                spec: spec.map(str::to_string),
                variables: variables.clone(),
            });
            targets.push(id.to_string());
        }
        project.descriptor.persist().await?;

        let tools = Toolchain::host();
        let report = restore_plugins(&mut project, &tools, &targets).await?;
        print_report(&report);
        Ok(report.exit_code())
    })
}

fn cmd_plugin_rm(ids: &[String], no_save: bool) -> Result<i32> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let mut project = open_project().await?;
        let tools = Toolchain::host();
        let opts = RemoveOptions { save: !no_save };
        let report = remove_plugins(&mut project, &tools, ids, &opts).await?;
        print_report(&report);
        Ok(report.exit_code())
    })
}

fn cmd_plugin_ls() -> Result<i32> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let project = open_project().await?;
        let installed = installed_plugins(project.root()).await?;

        println!("Installed plugins:");
        if installed.is_empty() {
            println!("  (none)");
        }
        for id in &installed {
            println!("  {id}");
        }

        let mut declared: Vec<(String, Option<String>, BTreeMap<String, String>)> = Vec::new();
        for (id, variables) in project.manifest.plugins() {
            let spec = project.manifest.dependency_spec(id).map(str::to_string);
            declared.push((id.clone(), spec, variables.clone()));
        }
        for decl in project.descriptor.plugins() {
            if !declared.iter().any(|(id, _, _)| *id == decl.id) {
                declared.push((decl.id, decl.spec, decl.variables));
            }
        }

        println!();
        println!("Declared plugins:");
        if declared.is_empty() {
            println!("  (none)");
        }
        for (id, spec, variables) in &declared {
            let mut line = format!("  {id}");
            if let Some(spec) = spec {
                line.push_str(&format!(" ({spec})"));
            }
            if !variables.is_empty() {
                let pairs: Vec<String> =
                    variables.iter().map(|(k, v)| format!("{k}={v}")).collect();
                line.push_str(&format!(" [{}]", pairs.join(", ")));
            }
            println!("{line}");
        }
        Ok(0)
    })
}

fn cmd_restore() -> Result<i32> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let mut project = open_project().await?;
        let tools = Toolchain::host();
        let report = restore_project(&mut project, &tools).await?;
        print_report(&report);
        Ok(report.exit_code())
    })
}
