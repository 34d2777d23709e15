//! Binary entry point for textplate.
//!
//! Manages a template directory from the command line and expands `!!`
//! triggers in a single line of text.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use textplate::config::TextplateConfig;
use textplate::host::{LineBuffer, TracingReportSink};
use textplate::observability::{self, LoggingConfig};
use textplate::services::{LoadReport, SaveReport, TemplateManager};

/// Textplate - file-backed text templates with `!!` trigger expansion.
#[derive(Parser)]
#[command(name = "textplate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "TEXTPLATE_CONFIG")]
    config: Option<PathBuf>,

    /// Template directory, overriding the configuration.
    #[arg(short, long, global = true, env = "TEXTPLATE_DIR")]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// List templates, optionally filtered by name.
    List {
        /// Case-insensitive substring of the name.
        query: Option<String>,

        /// Print the templates as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print a template's content.
    Show {
        /// Exact template name.
        name: String,
    },

    /// Add a template. Content is read from stdin unless given.
    Add {
        /// Template name.
        name: String,

        /// Template content.
        #[arg(long)]
        content: Option<String>,

        /// Replace an existing template with the same name.
        #[arg(short, long)]
        force: bool,
    },

    /// Change a template's content or name.
    Edit {
        /// Current template name.
        name: String,

        /// New name.
        #[arg(long)]
        rename: Option<String>,

        /// New content. Read from stdin when piped; kept otherwise.
        #[arg(long)]
        content: Option<String>,
    },

    /// Remove a template.
    Remove {
        /// Exact template name.
        name: String,
    },

    /// Load the directory, migrate legacy files and write it back.
    Sync,

    /// Expand the trigger before the cursor in a line of text.
    Expand {
        /// The line of text.
        #[arg(long)]
        line: String,

        /// Cursor position in characters; defaults to the end of the line.
        #[arg(long)]
        cursor: Option<usize>,

        /// Template to insert instead of the best match.
        #[arg(long)]
        name: Option<String>,
    },
}

/// Main entry point.
fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref(), cli.dir.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            return ExitCode::FAILURE;
        },
    };

    let logging = LoggingConfig::from_settings(Some(&config.logging), cli.verbose);
    if let Err(e) = observability::init(&logging) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Loads configuration.
fn load_config(path: Option<&Path>, dir: Option<&Path>) -> anyhow::Result<TextplateConfig> {
    let config = match path {
        Some(path) => TextplateConfig::load_from_file(path)
            .with_context(|| format!("config file {}", path.display()))?,
        None => TextplateConfig::load_default(),
    };

    Ok(match dir {
        Some(dir) => config.with_template_dir(dir),
        None => config,
    })
}

/// Runs the selected command.
fn run_command(command: Commands, config: &TextplateConfig) -> anyhow::Result<()> {
    let mut manager = TemplateManager::from_config(config, Arc::new(TracingReportSink));
    let loaded = manager.load().context("loading templates")?;

    match command {
        Commands::List { query, json } => cmd_list(&manager, query.as_deref().unwrap_or(""), json),
        Commands::Show { name } => cmd_show(&manager, &name),
        Commands::Add {
            name,
            content,
            force,
        } => cmd_add(&mut manager, &name, content, force),
        Commands::Edit {
            name,
            rename,
            content,
        } => cmd_edit(&mut manager, &name, rename, content),
        Commands::Remove { name } => {
            let saved = manager.delete(&name)?;
            print_saved(saved.as_ref());
            Ok(())
        },
        Commands::Sync => cmd_sync(&mut manager, &loaded),
        Commands::Expand { line, cursor, name } => {
            cmd_expand(&mut manager, &line, cursor, name.as_deref())
        },
    }
}

fn cmd_list(manager: &TemplateManager, query: &str, json: bool) -> anyhow::Result<()> {
    let templates = manager.search(query);

    if json {
        println!("{}", serde_json::to_string_pretty(&templates)?);
        return Ok(());
    }

    if templates.is_empty() {
        println!("No templates found.");
        return Ok(());
    }
    for template in templates {
        if template.expose_as_command {
            println!("{}", template.name);
        } else {
            println!("{} (not a command)", template.name);
        }
    }
    Ok(())
}

fn cmd_show(manager: &TemplateManager, name: &str) -> anyhow::Result<()> {
    let Some(template) = manager.get(name) else {
        bail!(textplate::Error::NotFound(name.to_string()));
    };
    println!("{}", template.content);
    Ok(())
}

fn cmd_add(
    manager: &mut TemplateManager,
    name: &str,
    content: Option<String>,
    force: bool,
) -> anyhow::Result<()> {
    let content = match content {
        Some(content) => content,
        None => read_stdin()?,
    };

    let saved = manager
        .create(name, &content, force)
        .map_err(|e| match e {
            textplate::Error::Conflict { .. } => {
                anyhow::Error::new(e).context("use --force to replace it")
            },
            other => other.into(),
        })?;
    print_saved(saved.as_ref());
    Ok(())
}

fn cmd_edit(
    manager: &mut TemplateManager,
    name: &str,
    rename: Option<String>,
    content: Option<String>,
) -> anyhow::Result<()> {
    let current = manager
        .get(name)
        .map(|t| t.content.clone())
        .ok_or_else(|| textplate::Error::NotFound(name.to_string()))?;

    let content = match content {
        Some(content) => content,
        None if !std::io::stdin().is_terminal() => read_stdin()?,
        None => current,
    };
    let new_name = rename.as_deref().unwrap_or(name);

    let saved = manager.edit(name, new_name, &content)?;
    print_saved(saved.as_ref());
    Ok(())
}

fn cmd_sync(manager: &mut TemplateManager, loaded: &LoadReport) -> anyhow::Result<()> {
    println!(
        "Loaded {} template(s), migrated {}{}",
        loaded.loaded,
        loaded.migrated,
        if loaded.created_directory {
            " (created directory)"
        } else {
            ""
        }
    );
    for issue in &loaded.issues {
        println!("  skipped {issue}");
    }

    let saved = manager.persist()?;
    print_saved(Some(&saved));
    Ok(())
}

fn cmd_expand(
    manager: &mut TemplateManager,
    line: &str,
    cursor: Option<usize>,
    name: Option<&str>,
) -> anyhow::Result<()> {
    let cursor = cursor.unwrap_or_else(|| line.chars().count());
    let now = Instant::now();

    let Some(found) = manager.detect_trigger(line, cursor, now) else {
        println!("{line}");
        return Ok(());
    };

    let chosen = match name {
        Some(name) => name.to_string(),
        None => {
            let candidates = manager.search(&found.query);
            let exact = candidates.iter().find(|t| t.name == found.query);
            match exact.or_else(|| candidates.first()) {
                Some(template) => template.name.clone(),
                None => bail!("no template matches '{}'", found.query),
            }
        },
    };

    let mut buffer = LineBuffer::new(line, cursor);
    manager.accept_trigger(&found, &chosen, &mut buffer, now)?;
    println!("{}", buffer.text());
    Ok(())
}

fn read_stdin() -> anyhow::Result<String> {
    let mut content = String::new();
    std::io::stdin()
        .read_to_string(&mut content)
        .context("reading template content from stdin")?;
    Ok(content)
}

fn print_saved(report: Option<&SaveReport>) {
    let Some(report) = report else {
        println!("Template sync is disabled; the change was not saved.");
        return;
    };

    println!("Saved: {report}");
    for collision in &report.collisions {
        println!(
            "  '{}' shadowed by '{}' (both map to {})",
            collision.shadowed, collision.kept, collision.stem
        );
    }
    for failure in &report.failures {
        println!("  failed {failure}");
    }
    for kept in &report.retained {
        println!("  kept {kept}");
    }
}
