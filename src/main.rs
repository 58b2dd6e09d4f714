mod config;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use nmrkit_changelog::{ChangelogParser, ChangelogStats, MarkdownRenderer};
use nmrkit_engine::{CommandTable, EngineClient, OperationRegistry, Recipe};
use nmrkit_manifest::{ManifestFilter, resolve_platform};

use crate::config::Config;

/// nmrkit - Release, build and engine-dispatch tooling for NMR processing
#[derive(Parser, Debug)]
#[command(name = "nmrkit")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only report errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Configuration file (defaults to ./nmrkit.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the release log as Markdown for the documentation site
    Changelog {
        /// Release log (defaults to logall.txt)
        #[arg(value_name = "INPUT")]
        input: Option<PathBuf>,

        /// Write to a file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Document title
        #[arg(long)]
        title: Option<String>,
    },

    /// Rewrite a classpath properties file into a JAR manifest fragment
    Manifest {
        /// Properties file holding the classpath
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Path convention of the listing: windows or unix (defaults to the host)
        #[arg(long)]
        platform: Option<String>,

        /// Property that holds the classpath
        #[arg(long)]
        key: Option<String>,

        /// Directory of the dependencies relative to the JAR
        #[arg(long, value_name = "DIR")]
        lib_dir: Option<String>,

        /// Also write a Main-Class attribute
        #[arg(long, value_name = "CLASS")]
        main_class: Option<String>,

        /// Write to a file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Forward a command (or script file) and its arguments to the engine
    Run {
        /// Print the engine command line instead of running it
        #[arg(long)]
        dry_run: bool,

        /// Command name or path to a script, then the arguments passed to the
        /// engine unchanged. Nothing after the command is read as an nmrkit flag.
        #[arg(
            trailing_var_arg = true,
            allow_hyphen_values = true,
            num_args = 1..,
            required = true,
            value_name = "COMMAND [ARGS]..."
        )]
        command: Vec<String>,
    },

    /// Validate or launch a processing recipe
    Recipe {
        #[command(subcommand)]
        action: RecipeAction,
    },

    /// List the commands the engine dispatcher knows
    Commands,

    /// List the processing operations recipes may use
    Operations,
}

#[derive(Subcommand, Debug)]
enum RecipeAction {
    /// Validate a recipe and print its canonical form
    Check {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print JSON instead
        #[arg(long)]
        json: bool,
    },

    /// Validate a recipe and hand it to the engine
    Run {
        /// Print the engine command line instead of running it
        #[arg(long)]
        dry_run: bool,

        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    let level = if args.quiet {
        tracing::Level::ERROR
    } else {
        match args.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = run_app(args).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_app(args: Args) -> Result<()> {
    debug!(?args, "parsed arguments");
    let config = Config::load(args.config.as_deref())?;

    // The dispatch table is validated up front, whatever the subcommand
    let table = CommandTable::builtin()?
        .with_overrides(&config.commands)
        .context("Invalid [commands] section in config")?;
    let registry = OperationRegistry::builtin()?;
    let client = EngineClient::new(config.engine.program.clone(), config.engine.args.clone());

    match args.command {
        Command::Changelog {
            input,
            output,
            title,
        } => {
            let input = input.unwrap_or_else(|| config.changelog.input.clone());
            let title = title.unwrap_or_else(|| config.changelog.title.clone());
            run_changelog(&input, output.as_deref(), &title)
        }

        Command::Manifest {
            input,
            platform,
            key,
            lib_dir,
            main_class,
            output,
        } => {
            let platform =
                resolve_platform(platform.or_else(|| config.manifest.platform.clone()).as_deref())?;

            let mut filter = ManifestFilter::new(platform)
                .with_key(key.unwrap_or_else(|| config.manifest.key.clone()))
                .with_lib_dir(lib_dir.unwrap_or_else(|| config.manifest.lib_dir.clone()));
            if let Some(main_class) = main_class.or_else(|| config.manifest.main_class.clone()) {
                filter = filter.with_main_class(main_class);
            }

            let fragment = filter
                .filter_file(&input)
                .with_context(|| format!("Failed to filter '{}'", input.display()))?;
            write_output(output.as_deref(), &fragment)
        }

        Command::Run { dry_run, command } => {
            let Some((verb, args)) = command.split_first() else {
                bail!("No command given");
            };
            let target = table.resolve(verb)?;
            info!(verb = %verb, ?target, "dispatching");
            let invocation = client.invocation(&target, args);

            if dry_run {
                println!("{}", invocation.command_line());
                Ok(())
            } else {
                Ok(client.run(&invocation).await?)
            }
        }

        Command::Recipe { action } => match action {
            RecipeAction::Check { file, json } => {
                let recipe = load_recipe(&file, &registry)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&recipe)?);
                } else {
                    print!("{}", recipe);
                }
                Ok(())
            }
            RecipeAction::Run { dry_run, file } => {
                let recipe = load_recipe(&file, &registry)?;
                info!(
                    steps = recipe.steps.len(),
                    "recipe valid, handing to engine"
                );
                let invocation = client.recipe_invocation(&config.engine.process_entry, &file);

                if dry_run {
                    println!("{}", invocation.command_line());
                    Ok(())
                } else {
                    Ok(client.run(&invocation).await?)
                }
            }
        },

        Command::Commands => {
            for spec in table.iter() {
                println!("{:<10} {:<12} {}", spec.name, spec.entry, spec.about);
            }
            Ok(())
        }

        Command::Operations => {
            for spec in registry.iter() {
                println!("{:<32} {}", spec.signature(), spec.about);
            }
            Ok(())
        }
    }
}

fn run_changelog(input: &Path, output: Option<&Path>, title: &str) -> Result<()> {
    // Parse everything first so a bad line never leaves a partial document behind
    let lines = ChangelogParser::parse_file(input)
        .with_context(|| format!("Failed to format changelog '{}'", input.display()))?;

    let stats = ChangelogStats::from_lines(&lines);
    info!(
        versions = stats.versions,
        new = stats.new,
        bug = stats.bug,
        improve = stats.improve,
        "changelog parsed"
    );

    let markdown = MarkdownRenderer::new(title).render(&lines);
    write_output(output, &markdown)
}

fn load_recipe(file: &Path, registry: &OperationRegistry) -> Result<Recipe> {
    Recipe::from_file_with(file, registry)
        .with_context(|| format!("Invalid recipe '{}'", file.display()))
}

fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content)
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            info!(path = %path.display(), bytes = content.len(), "wrote output");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}
