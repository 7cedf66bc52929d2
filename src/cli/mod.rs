//! CLI argument definitions for Roadmap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Roadmap - plan projects across Gantt, list, Kanban and table views.
///
/// Start with `roadmap init --seed`, then `roadmap login`.
#[derive(Parser, Debug)]
#[command(name = "roadmap")]
#[command(author, version, about = "Roadmap planning across streams, statuses and quarters", long_about = None)]
#[command(long_version = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("ROADMAP_GIT_COMMIT"),
    ", built ",
    env!("ROADMAP_BUILD_TIMESTAMP"),
    ")"
))]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Data directory holding roadmap.db, config.kdl and the session
    #[arg(long, global = true, env = "ROADMAP_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database
    Init {
        /// Insert the default statuses, streams, owner, initiatives and releases
        #[arg(long)]
        seed: bool,
    },

    /// Log in with the shared credentials
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,
    },

    /// End the stored session
    Logout,

    /// Show whether a session is active
    Session,

    /// Project management commands
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Render a view of the visible projects
    View(ViewArgs),

    /// Reference data commands (statuses, streams, owners, ...)
    Reference {
        #[command(subcommand)]
        command: ReferenceCommands,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Start the HTTP API (requires 'serve' feature)
    #[cfg(feature = "serve")]
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "ROADMAP_PORT", default_value = "3000")]
        port: u16,

        /// Host address to bind to (use 0.0.0.0 for network access)
        #[arg(long, env = "ROADMAP_HOST", default_value = "127.0.0.1")]
        host: String,
    },
}

/// Form fields shared by project create and update.
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectFields {
    /// Stream name (e.g. Payments)
    #[arg(long)]
    pub stream: Option<String>,

    /// Status name (e.g. "In progress")
    #[arg(long)]
    pub status: Option<String>,

    /// Owner name
    #[arg(long)]
    pub owner: Option<String>,

    #[arg(short, long)]
    pub description: Option<String>,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,

    /// End date (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<String>,
}

/// Project subcommands
#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a project
    Create {
        /// Project name
        name: String,

        #[command(flatten)]
        fields: ProjectFields,

        /// Use the backlog screen (status is always the backlog status)
        #[arg(long)]
        backlog: bool,
    },

    /// Update a project; unspecified fields keep their current values
    Update {
        /// Project ID
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        fields: ProjectFields,

        /// Use the backlog screen
        #[arg(long)]
        backlog: bool,
    },

    /// Delete a project
    Delete {
        /// Project ID
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Use the backlog screen
        #[arg(long)]
        backlog: bool,
    },

    /// Show a project
    Show {
        /// Project ID
        id: String,
    },

    /// List the projects a screen shows
    List {
        /// Use the backlog screen
        #[arg(long)]
        backlog: bool,

        /// Only these streams (repeatable; default all)
        #[arg(long = "stream")]
        streams: Vec<String>,
    },
}

/// Arguments of `roadmap view`.
#[derive(Args, Debug, Clone)]
pub struct ViewArgs {
    /// gantt, list, kanban or table
    pub kind: String,

    /// Use the backlog screen
    #[arg(long)]
    pub backlog: bool,

    /// Only these streams (repeatable; default all)
    #[arg(long = "stream")]
    pub streams: Vec<String>,

    /// Preview a lane drop: ID=STATUS (repeatable, not saved)
    #[arg(long = "move")]
    pub moves: Vec<String>,

    /// Preview a timeline drag: ID=START[:END] (repeatable, not saved)
    #[arg(long)]
    pub reschedule: Vec<String>,

    /// Table sort column: name, owner, status, start, end, release
    #[arg(long, default_value = "start")]
    pub sort: String,

    /// Sort the table descending
    #[arg(long)]
    pub desc: bool,
}

/// Reference subcommands
#[derive(Subcommand, Debug)]
pub enum ReferenceCommands {
    /// List one kind of reference data
    List {
        /// statuses, streams, owners, users, initiatives or releases
        kind: String,
    },

    /// Add a reference row
    Add {
        /// status, stream, owner, user, initiative or release
        kind: String,

        /// Display name
        name: String,

        /// Hex color (statuses, streams)
        #[arg(long)]
        color: Option<String>,

        /// Icon name (streams)
        #[arg(long)]
        icon: Option<String>,

        /// Quarter label, e.g. Q3 (releases)
        #[arg(long)]
        quarter: Option<String>,

        /// Year (releases)
        #[arg(long)]
        year: Option<i32>,

        /// Release date (releases)
        #[arg(long)]
        date: Option<String>,

        /// Role (owners)
        #[arg(long)]
        role: Option<String>,

        /// Email (owners, users)
        #[arg(long)]
        email: Option<String>,

        /// Avatar or image URL (owners, users)
        #[arg(long)]
        avatar_url: Option<String>,

        /// Description (initiatives)
        #[arg(long)]
        description: Option<String>,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration with the source of each value
    Show,

    /// Set a value in the data-dir config.kdl
    Set {
        /// output-format, backlog-status, default-owner, username, password or session-secret
        key: String,

        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_project_create() {
        let cli = Cli::parse_from([
            "roadmap",
            "project",
            "create",
            "Checkout",
            "--stream",
            "Payments",
            "--status",
            "In progress",
            "--start",
            "2026-11-01",
        ]);
        match cli.command {
            Commands::Project {
                command:
                    ProjectCommands::Create {
                        name,
                        fields,
                        backlog,
                    },
            } => {
                assert_eq!(name, "Checkout");
                assert_eq!(fields.stream.as_deref(), Some("Payments"));
                assert_eq!(fields.status.as_deref(), Some("In progress"));
                assert_eq!(fields.start.as_deref(), Some("2026-11-01"));
                assert!(fields.end.is_none());
                assert!(!backlog);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_view_moves() {
        let cli = Cli::parse_from([
            "roadmap", "-H", "view", "kanban", "--move", "a=Done", "--move", "b=At risk",
        ]);
        assert!(cli.human_readable);
        match cli.command {
            Commands::View(args) => {
                assert_eq!(args.kind, "kanban");
                assert_eq!(args.moves, vec!["a=Done", "b=At risk"]);
                assert_eq!(args.sort, "start");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
