mod logging;

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use stampname_core::{
    app_paths, apply_plan_with, generate_plan, load_config, ApplyEvent, ApplyResult, AppConfig,
    CollisionPolicy, Placement, PlacementAction, PlacementPlan, PlanOptions, RelatedNaming,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "stampname")]
#[command(about = "Renames photos to YYYYMMDD_HHMMSS_mmm after their EXIF capture time")]
#[command(args_conflicts_with_subcommands = true)]
#[command(
    after_help = "An input named `config` given first is read as the subcommand; pass it after `--`."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    #[command(flatten)]
    run: RunArgs,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Include files with the same stem and a different extension
    #[arg(long)]
    related: bool,
    /// Use the file modification time when no EXIF capture time is found
    #[arg(long)]
    modtime: bool,
    /// Copy files (takes precedence over --mv)
    #[arg(long)]
    cp: bool,
    /// Move files
    #[arg(long)]
    mv: bool,
    /// Symlink files into the target folder (takes precedence over --hardlink)
    #[arg(long)]
    symlink: bool,
    /// Hard link files into the target folder
    #[arg(long)]
    hardlink: bool,
    /// Overwrite the destination file if it exists
    #[arg(long)]
    overwrite: bool,
    /// Append _1, _2, ... instead of refusing when the destination exists
    #[arg(long)]
    suffixes: bool,
    /// Directory to scan; may be repeated
    #[arg(long)]
    source: Vec<PathBuf>,
    /// Descend into subdirectories of scanned directories
    #[arg(long)]
    recurse: bool,
    /// Destination folder [default: .]
    #[arg(long)]
    target: Option<PathBuf>,
    /// Treat mp4/mov/3gp files as anchors of their own
    #[arg(long)]
    videos: bool,
    /// Keep the original stem of related files; only the image is renamed
    #[arg(long)]
    keep_related_names: bool,
    /// Include files whose name starts with a dot
    #[arg(long)]
    include_hidden: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
    /// Files or directories to process
    paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<ExitCode> {
    logging::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Config(config)) => match config.action {
            ConfigAction::Show => cmd_config_show().map(|()| ExitCode::SUCCESS),
        },
        None => cmd_run(cli.run),
    }
}

fn cmd_run(args: RunArgs) -> Result<ExitCode> {
    let mut inputs = args.paths.clone();
    inputs.extend(args.source.iter().cloned());
    if inputs.is_empty() {
        eprintln!("{}", Cli::command().render_help());
        return Ok(ExitCode::from(2));
    }

    let config = load_config()?;

    let options = plan_options(&args, &config, inputs);
    let plan = generate_plan(&options)?;
    for failure in &plan.failures {
        eprintln!("{}", failure.message);
    }

    let output = args.output;
    let result = apply_plan_with(&plan, |event| match event {
        ApplyEvent::Started(placement) => print_placement(placement, output),
        ApplyEvent::Failed(_, err) => eprintln!("{err}"),
    });

    print_summary(&plan, &result);
    Ok(ExitCode::SUCCESS)
}

fn plan_options(args: &RunArgs, config: &AppConfig, inputs: Vec<PathBuf>) -> PlanOptions {
    let action = PlacementAction::from_flags(args.cp, args.mv, args.symlink, args.hardlink)
        .unwrap_or(config.action);
    let related_naming = if args.keep_related_names || config.keep_related_names {
        RelatedNaming::KeepOriginal
    } else {
        RelatedNaming::Timestamp
    };

    PlanOptions {
        inputs,
        target: args.target.clone().unwrap_or_else(|| config.target.clone()),
        recursive: args.recurse || config.recurse,
        include_hidden: args.include_hidden || config.include_hidden,
        related: args.related || config.related,
        videos: args.videos || config.videos,
        use_modtime: args.modtime || config.modtime,
        related_naming,
        collision: CollisionPolicy::from_flags(
            args.overwrite || config.overwrite,
            args.suffixes || config.suffixes,
        ),
        action,
    }
}

fn print_placement(placement: &Placement, output: OutputFormat) {
    match output {
        OutputFormat::Text => println!("{}", placement.audit_line()),
        OutputFormat::Json => match serde_json::to_string(placement) {
            Ok(line) => println!("{line}"),
            Err(err) => eprintln!("\"{}\": {err}", placement.source.display()),
        },
    }
}

fn print_summary(plan: &PlacementPlan, result: &ApplyResult) {
    eprintln!(
        "summary: scanned={} groups={} planned={} in_place={} placed={} skipped={} failed={}",
        plan.stats.scan.scanned_files,
        plan.stats.groups,
        plan.stats.planned,
        plan.stats.in_place,
        result.placed,
        plan.stats.skipped,
        result.failures.len()
    );
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let paths = app_paths()?;
    println!("config file: {}", paths.config_path.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
