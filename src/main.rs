use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use vk_layerman::{probe, Error, LayerDescriptor, LayerKind, LayerRegistry, Result, ScanReport};

#[derive(Parser)]
#[command(
    name = "vk-layerman",
    version,
    about = "Inspect and toggle the Vulkan layers installed on this machine"
)]
struct Cli {
    /// Keep this tool's own files under DIR instead of the platform config
    /// directory
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the search locations and list every layer found
    List {
        /// Only show layers of one kind
        #[arg(long, value_enum)]
        kind: Option<KindFilter>,
        /// Emit a JSON array instead of text
        #[arg(long)]
        json: bool,
    },
    /// Rescan and report what the scan saw
    Scan,
    /// Manage the extra search paths scanned as custom layers
    Paths {
        #[command(subcommand)]
        action: PathsAction,
    },
    /// Inspect or change the launch preferences
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Check the Vulkan loader version
    Doctor,
    /// Persistently disable an implicit layer (Windows only)
    Disable {
        /// Layer name, e.g. VK_LAYER_OBS_HOOK
        layer: String,
    },
    /// Re-enable a layer disabled earlier (Windows only)
    Enable {
        /// Layer name, e.g. VK_LAYER_OBS_HOOK
        layer: String,
    },
    /// Load the saved layer profiles
    Profiles,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindFilter {
    Implicit,
    Explicit,
    Custom,
}

impl KindFilter {
    fn matches(self, kind: LayerKind) -> bool {
        matches!(
            (self, kind),
            (KindFilter::Implicit, LayerKind::Implicit)
                | (KindFilter::Explicit, LayerKind::Explicit)
                | (KindFilter::Custom, LayerKind::Custom)
        )
    }
}

#[derive(Subcommand)]
enum PathsAction {
    /// Print the configured extra search paths
    List,
    /// Add a directory to scan for custom layers
    Add { path: PathBuf },
    /// Remove a previously added directory
    Remove { path: PathBuf },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print every setting
    Show,
    /// Change one setting
    Set { key: String, value: String },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli.command, cli.config_dir) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config_dir: Option<PathBuf>) -> Result<()> {
    let mut registry = match config_dir {
        Some(dir) => LayerRegistry::with_config_dir(dir)?,
        None => LayerRegistry::new()?,
    };
    show_intro_notice_once(&mut registry);

    match command {
        Command::List { kind, json } => {
            let report = registry.rescan();
            let layers: Vec<&LayerDescriptor> = registry
                .all_layers()
                .filter(|layer| kind.map_or(true, |k| k.matches(layer.kind)))
                .collect();
            if json {
                print_layers_json(&layers)?;
            } else {
                print_layers(&layers);
                if !report.errors.is_empty() {
                    eprintln!(
                        "note: {} manifest(s) skipped, run `vk-layerman scan` for details",
                        report.files_skipped
                    );
                }
            }
            Ok(())
        }
        Command::Scan => {
            let report = registry.rescan();
            print_report(&registry, &report);
            Ok(())
        }
        Command::Paths { action } => run_paths(&mut registry, action),
        Command::Settings { action } => run_settings(&mut registry, action),
        Command::Doctor => run_doctor(&mut registry),
        Command::Disable { layer } => toggle_layer(&mut registry, &layer, true),
        Command::Enable { layer } => toggle_layer(&mut registry, &layer, false),
        Command::Profiles => registry.load_profiles(),
    }
}

/// One-time note on first use, mirroring the dismissable startup notice of
/// the GUI this tool replaces.
fn show_intro_notice_once(registry: &mut LayerRegistry) {
    if registry.settings.intro_notice_dismissed {
        return;
    }
    eprintln!(
        "note: layer changes made here affect every Vulkan application run by this user"
    );
    registry.settings.intro_notice_dismissed = true;
    if let Err(err) = registry.save_app_settings() {
        warn!(%err, "could not persist intro notice dismissal");
    }
}

fn print_layers(layers: &[&LayerDescriptor]) {
    if layers.is_empty() {
        println!("no layers found");
        return;
    }
    for layer in layers {
        let state = if layer.is_active() { "active" } else { "inactive" };
        println!(
            "{:<8} {:<8} {:<44} {:<10} {}",
            layer.kind.as_str(),
            state,
            layer.name,
            layer.api_version,
            layer.library_path
        );
    }
}

fn print_layers_json(layers: &[&LayerDescriptor]) -> Result<()> {
    let items: Vec<serde_json::Value> = layers
        .iter()
        .map(|layer| {
            serde_json::json!({
                "name": layer.name,
                "kind": layer.kind.as_str(),
                "library_path": layer.library_path,
                "api_version": layer.api_version,
                "implementation_version": layer.implementation_version,
                "description": layer.description,
                "manifest_path": layer.manifest_path,
                "active": layer.is_active(),
            })
        })
        .collect();
    let text = serde_json::to_string_pretty(&items)
        .map_err(|err| Error::Config(format!("could not serialize layer list: {err}")))?;
    println!("{text}");
    Ok(())
}

fn print_report(registry: &LayerRegistry, report: &ScanReport) {
    println!(
        "searched {} location(s), {} absent; parsed {} manifest(s), skipped {}, discarded {} duplicate(s)",
        report.paths_visited + report.paths_skipped,
        report.paths_skipped,
        report.files_parsed,
        report.files_skipped,
        report.duplicates_discarded
    );
    println!(
        "found {} implicit, {} explicit, {} custom layer(s)",
        registry.implicit_layers.len(),
        registry.explicit_layers.len(),
        registry.custom_layers.len()
    );
    if !report.errors.is_empty() {
        println!("errors:");
        for error in &report.errors {
            println!("  {error}");
        }
    }
}

fn run_paths(registry: &mut LayerRegistry, action: PathsAction) -> Result<()> {
    match action {
        PathsAction::List => {
            for path in &registry.additional_search_paths {
                println!("{}", path.display());
            }
            Ok(())
        }
        PathsAction::Add { path } => {
            if !registry.add_search_path(path.clone()) {
                println!("{} is already in the list", path.display());
                return Ok(());
            }
            registry.save_additional_search_paths()?;
            println!("added {}", path.display());
            Ok(())
        }
        PathsAction::Remove { path } => {
            if !registry.remove_search_path(&path) {
                return Err(Error::Config(format!(
                    "{} is not in the list",
                    path.display()
                )));
            }
            registry.save_additional_search_paths()?;
            println!("removed {}", path.display());
            Ok(())
        }
    }
}

fn run_settings(registry: &mut LayerRegistry, action: SettingsAction) -> Result<()> {
    match action {
        SettingsAction::Show => {
            for (key, value) in registry.settings.entries() {
                println!("{key} = {value}");
            }
            Ok(())
        }
        SettingsAction::Set { key, value } => {
            registry.settings.set(&key, &value)?;
            registry.save_app_settings()?;
            println!("{key} = {value}");
            Ok(())
        }
    }
}

fn run_doctor(registry: &mut LayerRegistry) -> Result<()> {
    let info = probe::probe_loader()?;
    println!(
        "vulkan loader {}.{}.{} (raw {})",
        info.major, info.minor, info.patch, info.version
    );
    if info.supports_override {
        println!("per-application layer overrides are supported");
    } else {
        println!("warning: this loader applies layer overrides to ALL Vulkan applications");
        println!("at least 1.2.141 is needed for per-application overrides");
        if !registry.settings.loader_warning_dismissed {
            registry.settings.loader_warning_dismissed = true;
            registry.save_app_settings()?;
        }
    }
    Ok(())
}

#[cfg(windows)]
fn toggle_layer(registry: &mut LayerRegistry, name: &str, disable: bool) -> Result<()> {
    registry.rescan();
    let layer = registry
        .find(name)
        .ok_or_else(|| Error::Config(format!("no layer named '{name}'")))?;
    let key = layer.disable_environment.as_ref().ok_or_else(|| {
        Error::Config(format!("layer '{name}' declares no disable variable"))
    })?;
    let planted = vk_layerman::winreg::user_environment_keys()?;
    let already_disabled = planted.iter().any(|k| k == key);
    if disable {
        if already_disabled {
            println!("{name} is already disabled");
            return Ok(());
        }
        vk_layerman::winreg::set_user_environment(key)?;
        println!("disabled {name} (takes effect for newly started applications)");
    } else {
        if !already_disabled {
            println!("{name} is not disabled");
            return Ok(());
        }
        vk_layerman::winreg::remove_user_environment(key)?;
        println!("enabled {name} (takes effect for newly started applications)");
    }
    Ok(())
}

#[cfg(not(windows))]
fn toggle_layer(_registry: &mut LayerRegistry, _name: &str, _disable: bool) -> Result<()> {
    Err(Error::Unsupported("toggling layers on this platform"))
}
