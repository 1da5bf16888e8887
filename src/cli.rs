//! Clap adapter for developer tweaks.
//!
//! Compiled only when the `clap` Cargo feature is enabled (on by default).
//! [`TweakArgs`] embeds into an application's clap derive to give it
//! `tweaks list|get|set|reset` subcommands. The only bridge to the core is
//! [`TweakArgs::into_action()`], which produces a
//! [`TweakAction`](crate::TweakAction) for
//! [`TweakStore::handle()`](crate::TweakStore::handle).
//!
//! Applications using another CLI parser can skip this module and build
//! [`TweakAction`](crate::TweakAction) values directly.

use clap::{Args, Subcommand};

use crate::types::TweakAction;

/// Clap-derived args for the `tweaks` subcommand group.
///
/// ```ignore
/// #[derive(Parser)]
/// struct Cli {
///     #[command(subcommand)]
///     command: Commands,
/// }
///
/// #[derive(Subcommand)]
/// enum Commands {
///     Tweaks(TweakArgs),
/// }
/// ```
#[derive(Debug, Args)]
pub struct TweakArgs {
    #[command(subcommand)]
    pub action: Option<TweakSubcommand>,
}

#[derive(Debug, Subcommand)]
pub enum TweakSubcommand {
    /// Show every registered tweak with its initial and current value.
    List,
    /// Show one tweak.
    Get {
        /// Tweak id: "<category> <section> <name>" (quote it).
        id: String,
    },
    /// Override a tweak with a value in its display form.
    Set { id: String, value: String },
    /// Clear one tweak, or every tweak with `--all`.
    Reset {
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        id: Option<String>,
        #[arg(long)]
        all: bool,
    },
}

impl TweakArgs {
    /// Bare `tweaks` and `tweaks list` both map to `TweakAction::List`.
    pub fn into_action(self) -> TweakAction {
        match self.action {
            None | Some(TweakSubcommand::List) => TweakAction::List,
            Some(TweakSubcommand::Get { id }) => TweakAction::Get { id },
            Some(TweakSubcommand::Set { id, value }) => TweakAction::Set { id, value },
            Some(TweakSubcommand::Reset { id, .. }) => TweakAction::Reset { id },
        }
    }
}
