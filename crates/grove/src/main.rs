use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use grove_core::config::{ConfigBindings, ConfigParser};
use grove_core::plugin_system::PhaseReport;
use grove_core::{
    AppMetadata, Application, ApplicationContext, Environment, EventMap, FileConfigParser, PluginLoader,
    PluginManager, RuntimeConfiguration, StaticClassResolver,
};
use log::{error, info};

// --- Core plugins registered statically ---
use core_logging::{LoggingPlugin, LOGGING_PLUGIN_CLASS};

/// Grove: a plugin manager for modular applications
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Print "pong" and exit
    #[arg(long)]
    ping: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect plugins
    Plugins {
        #[command(subcommand)]
        command: PluginCommand,
    },
    /// Load plugins and drive every lifecycle phase
    Run(RunArgs),
}

#[derive(Subcommand, Debug)]
enum PluginCommand {
    /// Load plugins and print the final order and the failed set
    List(LoadArgs),
}

#[derive(Args, Debug, Default)]
struct LoadArgs {
    /// Directory scanned for `*.plugin.*` manifests (repeatable)
    #[arg(long = "dir", value_name = "DIR")]
    dirs: Vec<PathBuf>,

    /// Application configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Environment name; defaults to GROVE_ENV or "development"
    #[arg(long, value_name = "NAME")]
    env: Option<String>,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    #[command(flatten)]
    load: LoadArgs,

    /// Active profile (repeatable)
    #[arg(long = "profile", value_name = "PROFILE")]
    profiles: Vec<String>,
}

type CliResult<T> = Result<T, grove_core::Error>;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    if args.ping {
        println!("pong");
        return ExitCode::SUCCESS;
    }

    let outcome = match args.command {
        Some(Commands::Plugins {
            command: PluginCommand::List(load),
        }) => list_plugins(&load),
        Some(Commands::Run(run_args)) => run(&run_args),
        None => run(&RunArgs::default()),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Build a manager over the core plugins and the given manifest directories
fn build_manager(args: &LoadArgs) -> CliResult<PluginManager> {
    let environment = args
        .env
        .as_deref()
        .map(Environment::new)
        .unwrap_or_else(Environment::current);
    let resolver = StaticClassResolver::new().with_class(LoggingPlugin::class());
    let mut application = Application::new(AppMetadata::default(), environment, Arc::new(resolver));

    if let Some(path) = &args.config {
        let bindings = ConfigBindings::standard(application.metadata());
        let config = FileConfigParser::new().parse(path, application.environment(), &bindings)?;
        application = application.with_config(config);
    }

    let loader = args
        .dirs
        .iter()
        .fold(PluginLoader::new().with_core_class(LOGGING_PLUGIN_CLASS), |loader, dir| {
            loader.with_manifest_source(dir.clone())
        });

    PluginManager::new(application, loader)
}

fn list_plugins(args: &LoadArgs) -> CliResult<()> {
    let mut manager = build_manager(args)?;
    manager.load_plugins()?;

    println!("Plugins ({}):", manager.get_all_plugins().len());
    for entry in manager.get_all_plugins() {
        println!("  {} {} {}", entry.name(), entry.version(), entry.origin());
    }

    let failed = manager.get_failed_plugins();
    if !failed.is_empty() {
        println!("Failed ({}):", failed.len());
        for plugin in failed {
            println!("  {}: {}", plugin.entry.name(), plugin.error);
        }
    }
    Ok(())
}

fn run(args: &RunArgs) -> CliResult<()> {
    println!("Initializing application...");
    let mut manager = build_manager(&args.load)?;
    manager.load_plugins()?;
    println!(
        "Loaded {} plugins ({} failed)",
        manager.get_all_plugins().len(),
        manager.get_failed_plugins().len()
    );

    let context = Arc::new(ApplicationContext::with_profiles(args.profiles.iter()));
    manager.set_application_context(Arc::clone(&context));

    print_report(&manager.do_artefact_configuration()?);
    let provided = manager.register_provided_artefacts()?;
    info!("Registered {} provided artefacts", provided);

    let mut runtime = RuntimeConfiguration::new();
    print_report(&manager.do_runtime_configuration_all(&mut runtime)?);
    let beans = runtime.register_beans_with(&context);
    info!("Registered {} beans", beans);

    print_report(&manager.do_dynamic_methods()?);
    print_report(&manager.do_post_processing(&context)?);

    let mut event = EventMap::new();
    event.insert("application".to_string(), manager.application().metadata().name.clone().into());
    print_report(&manager.on_startup(&event)?);

    println!("Shutting down application...");
    print_report(&manager.shutdown()?);
    Ok(())
}

fn print_report(report: &PhaseReport) {
    println!(
        "{}: {} run, {} skipped, {} failed",
        report.phase.name(),
        report.visited.len(),
        report.skipped.len(),
        report.failures.len()
    );
    for (plugin, err) in &report.failures {
        println!("  {}: {}", plugin, err);
    }
}
