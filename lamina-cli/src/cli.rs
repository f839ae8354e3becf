use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "lamina")]
#[command(version, about = "Resolve and run layer actions against a scene")]
pub struct Args {
    /// JSON config with extra submenus and actions
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the registry and report what was registered
    Check,

    /// Print the context keys derived from a scene
    Context {
        #[arg(long)]
        scene: PathBuf,
    },

    /// Print the resolved action menu for a scene
    Menu {
        #[arg(long)]
        scene: PathBuf,
    },

    /// Run an action on a scene and print the resulting layers
    Invoke {
        #[arg(long)]
        scene: PathBuf,

        /// Action id, e.g. lamina:duplicate_layer
        action: String,

        /// Run even if the action is disabled for the scene
        #[arg(long)]
        force: bool,
    },
}
