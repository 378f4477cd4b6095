use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tlm_cli::{CliError, CliResult, load_options, models, run};
use tlm_components::register_default_library;
use tlm_sim::{ComponentFactory, ComponentSystem, MessageLevel, SimOptions};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tlm-cli")]
#[command(about = "TLM CLI - transmission line simulation of hydraulic and signal models", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in demo models
    Models,
    /// List registered component types
    Types,
    /// Show ports and parameters of a component type
    Describe {
        /// Registered type name, e.g. HydraulicVolumeC
        type_name: String,
    },
    /// Run a demo model
    Run {
        /// Model name (see `models`)
        model: String,
        /// YAML file with simulation options
        #[arg(short, long)]
        options: Option<PathBuf>,
        /// Stop time in seconds
        #[arg(long)]
        stop: Option<f64>,
        /// Time step in seconds
        #[arg(long)]
        dt: Option<f64>,
        /// Record node values every N steps
        #[arg(long)]
        log_every: Option<usize>,
        /// Step independent subsystems in parallel
        #[arg(long)]
        parallel: bool,
        /// Write the full report as JSON to this file ("-" for stdout)
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut factory = ComponentFactory::new();
    register_default_library(&mut factory);

    match cli.command {
        Commands::Models => {
            cmd_models();
            Ok(())
        }
        Commands::Types => {
            cmd_types(&factory);
            Ok(())
        }
        Commands::Describe { type_name } => cmd_describe(&mut factory, &type_name),
        Commands::Run {
            model,
            options,
            stop,
            dt,
            log_every,
            parallel,
            json,
        } => {
            let mut opts = match options {
                Some(path) => load_options(&path)?,
                None => SimOptions::default(),
            };
            if let Some(stop) = stop {
                opts.stop_time = stop;
            }
            if let Some(dt) = dt {
                opts.timestep = dt;
            }
            if let Some(n) = log_every {
                opts.log_every = n;
            }
            opts.parallel |= parallel;
            cmd_run(&mut factory, &model, &opts, json.as_deref())
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn cmd_models() {
    println!("Demo models:");
    for model in models::MODELS {
        println!("  {:<16} {}", model.name, model.summary);
    }
}

fn cmd_types(factory: &ComponentFactory) {
    let mut keys = factory.registered_keys();
    keys.sort();
    println!("Registered component types:");
    for key in keys {
        println!("  {key}");
    }
}

fn cmd_describe(factory: &mut ComponentFactory, type_name: &str) -> CliResult<()> {
    let mut scratch = ComponentSystem::new("Scratch");
    let name = scratch.add_new(factory, type_name, type_name)?;
    let core = scratch
        .component(&name)
        .ok_or_else(|| CliError::Sim(tlm_sim::SimError::UnknownComponent { name: name.clone() }))?
        .core();

    println!("{} ({:?})", core.type_name(), core.cqs());
    println!("Ports:");
    for port in core.ports() {
        let required = if port.is_required() { "" } else { ", optional" };
        println!(
            "  {:<8} {:?} {}{}",
            port.name(),
            port.kind(),
            port.node_type(),
            required
        );
    }
    if !core.parameters().is_empty() {
        println!("Parameters:");
        for p in core.parameters().iter() {
            let unit = if p.unit_text().is_empty() {
                String::new()
            } else {
                format!(" [{}]", p.unit_text())
            };
            println!(
                "  {:<8} = {}{}  {}",
                p.name(),
                p.default_value(),
                unit,
                p.description_text()
            );
        }
    }
    Ok(())
}

fn cmd_run(
    factory: &mut ComponentFactory,
    model_name: &str,
    options: &SimOptions,
    json: Option<&Path>,
) -> CliResult<()> {
    let model = models::find(model_name).ok_or_else(|| CliError::UnknownModel {
        name: model_name.to_string(),
    })?;
    println!("Running model: {}", model.name);
    println!(
        "  dt = {:e} s, t = {} .. {} s",
        options.timestep, options.start_time, options.stop_time
    );

    let started = Instant::now();
    let report = run::run_model(model, factory, options)?;
    let elapsed = started.elapsed().as_secs_f64();

    println!("✓ Simulation completed: {} steps in {:.3}s", report.steps, elapsed);
    println!("  Execution order: {}", report.execution_order.join(", "));
    if !report.algebraic_loop.is_empty() {
        println!("  Algebraic loop:  {}", report.algebraic_loop.join(", "));
    }
    for message in &report.messages {
        if message.level >= MessageLevel::Info {
            println!("  [{:?}] {}: {}", message.level, message.source, message.text);
        }
    }

    println!("\nFinal node values:");
    for node in &report.final_nodes {
        let values: Vec<String> = node
            .values
            .iter()
            .map(|(name, v)| format!("{name}={v:.6e}"))
            .collect();
        println!("  {} [{}] {}", node.node_type, node.ports.join(" "), values.join(" "));
    }

    match json {
        Some(path) if path == Path::new("-") => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Some(path) => {
            let text = serde_json::to_string_pretty(&report)?;
            std::fs::write(path, text).map_err(|source| CliError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            println!("Report written to {}", path.display());
        }
        None => {}
    }
    Ok(())
}
