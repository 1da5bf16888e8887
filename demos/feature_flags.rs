//! # configchain demo application
//!
//! A sample CLI that declares a table of feature flags and settings, resolves
//! them through their provider chains, and lets you poke at the sources. This
//! is **not** a real app; it exists to demonstrate and manually verify
//! configchain's features.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example feature_flags -- show
//! cargo run --example feature_flags -- tweaks list
//! ```
//!
//! ## Features demonstrated
//!
//! | Feature               | How to exercise it                                                          |
//! |-----------------------|-----------------------------------------------------------------------------|
//! | Compiled defaults     | `cargo run --example feature_flags -- show`                                 |
//! | Conditional override  | `cargo run --example feature_flags -- --tablet show`                        |
//! | Remote config         | `cargo run --example feature_flags -- --remote show`                        |
//! | Persisted override    | `cargo run --example feature_flags -- save 12`, then `show`                 |
//! | Env var override      | `DEMO_BACKEND_URL=http://localhost cargo run --example feature_flags -- show` |
//! | Tweak listing         | `cargo run --example feature_flags -- tweaks list`                          |
//! | Tweak set             | `cargo run --example feature_flags -- tweaks set "Features Onboarding New flow" on` |
//! | Change notification   | Any of the above prints `changed:` lines for listened configs               |

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand};

use configchain::{
    Condition, ConfigDefinition, ConfigError, ConfigRepository, ConfigValue, DeviceClass, FileStore,
    RemoteKey, RemoteValues, StorageMechanism, StoreKey, StoreLocation, TweakArgs, TweakStore,
    TypedStore,
};

// ---------------------------------------------------------------------------
// CLI definitions
// ---------------------------------------------------------------------------

/// configchain demo: resolve feature flags through layered providers.
#[derive(Parser, Debug)]
#[command(name = "feature-flags")]
struct Cli {
    /// Pretend to run on a tablet.
    #[arg(long, global = true)]
    tablet: bool,

    /// Activate a canned remote-config payload before resolving.
    #[arg(long, global = true)]
    remote: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print every resolved value.
    Show,
    /// Persist a local override for the free item count.
    Save {
        free_items: i64,
    },
    /// Inspect or edit developer tweaks, then print resolved values.
    Tweaks(TweakArgs),
}

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// An A/B experiment arm, stored as its lowercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variant {
    A,
    B,
}

impl ConfigValue for Variant {}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Variant::A => f.write_str("a"),
            Variant::B => f.write_str("b"),
        }
    }
}

impl std::str::FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a" => Ok(Variant::A),
            "b" => Ok(Variant::B),
            other => Err(format!("unknown variant '{other}'")),
        }
    }
}

/// External systems the definitions read from.
struct Sources {
    store: Arc<FileStore>,
    remote: Arc<RemoteValues>,
    tweaks: Arc<TweakStore>,
    is_tablet: Arc<AtomicBool>,
}

struct Definitions {
    new_onboarding: ConfigDefinition<bool>,
    backend_url: ConfigDefinition<String>,
    free_items: ConfigDefinition<i64>,
    chart_offset: ConfigDefinition<Option<f64>>,
    experiment: ConfigDefinition<Variant>,
}

fn declare(sources: &Sources) -> Definitions {
    let tablet = Arc::clone(&sources.is_tablet);
    let big_screen = Condition::device_class(DeviceClass::Tablet | DeviceClass::Tv, move || {
        if tablet.load(Ordering::SeqCst) {
            DeviceClass::Tablet
        } else {
            DeviceClass::Phone
        }
    });

    Definitions {
        new_onboarding: ConfigDefinition::new("new_onboarding", false)
            .remote_config(&sources.remote, RemoteKey::new("new_onboarding"))
            .tweak(&sources.tweaks, "Features", "Onboarding", "New flow"),
        backend_url: ConfigDefinition::new("backend_url", "https://api.example.com".to_string())
            .remote_config(&sources.remote, RemoteKey::new("backend_url"))
            .env_var("DEMO_BACKEND_URL"),
        free_items: ConfigDefinition::new("free_items", 3)
            .remote_config(&sources.remote, RemoteKey::new("free_items"))
            .persisted(&sources.store, StoreKey::new("free_items")),
        chart_offset: ConfigDefinition::new("chart_offset", None)
            .when(big_screen, Some(20.0))
            .tweak(&sources.tweaks, "Design", "Chart", "Offset"),
        experiment: ConfigDefinition::new("checkout_experiment", Variant::A).persisted_with(
            &sources.store,
            StoreKey::new("checkout_experiment"),
            StorageMechanism::parsed(),
        ),
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), ConfigError> {
    let sources = Sources {
        store: Arc::new(FileStore::at(
            &StoreLocation::Home(".configchain-demo"),
            "configchain-demo",
            "overrides.toml",
        )?),
        remote: Arc::new(RemoteValues::new()),
        tweaks: Arc::new(TweakStore::new()),
        is_tablet: Arc::new(AtomicBool::new(cli.tablet)),
    };
    let defs = declare(&sources);

    let mut repo = ConfigRepository::new();
    repo.add(&defs.new_onboarding)?;
    repo.add(&defs.backend_url)?;
    repo.add(&defs.free_items)?;
    repo.add(&defs.chart_offset)?;
    repo.add(&defs.experiment)?;

    repo.listen(&defs.new_onboarding, |v| println!("changed: new_onboarding = {v}"));
    repo.listen(&defs.free_items, |v| println!("changed: free_items = {v}"));

    if cli.remote {
        let payload: toml::Table = [
            ("new_onboarding".to_string(), toml::Value::Boolean(true)),
            ("free_items".to_string(), toml::Value::Integer(10)),
        ]
        .into_iter()
        .collect();
        sources.remote.activate(payload);
    }

    match cli.command {
        Commands::Show => {}
        Commands::Save { free_items } => {
            sources
                .store
                .write(&StoreKey::new("free_items"), Some(free_items))?;
            println!("Saved to {}", sources.store.path().display());
        }
        Commands::Tweaks(args) => {
            let result = sources.tweaks.handle(&args.into_action())?;
            println!("{result}");
        }
    }

    println!();
    println!("new_onboarding      = {}", repo.get(&defs.new_onboarding));
    println!("backend_url         = {}", repo.get(&defs.backend_url));
    println!("free_items          = {}", repo.get(&defs.free_items));
    println!("chart_offset        = {:?}", repo.get(&defs.chart_offset));
    println!("checkout_experiment = {}", repo.get(&defs.experiment));
    Ok(())
}
