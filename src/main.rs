//! Roadmap CLI - plan projects across Gantt, list, Kanban and table views.

use chrono::Local;
use clap::Parser;
use roadmap::cli::{Cli, Commands, ConfigCommands, ProjectCommands, ReferenceCommands};
use roadmap::commands::{self, Context, Output, ReferenceFields, StdinConfirm};
use roadmap::config::{ConfigOverrides, OutputFormat};
use roadmap::storage;
use std::process;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "ROADMAP_LOG";

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let data_dir = match storage::data_dir(cli.data_dir.as_deref()) {
        Ok(dir) => dir,
        Err(e) => fail(&e.to_string(), cli.human_readable),
    };

    let overrides = if cli.human_readable {
        ConfigOverrides::new().with_output_format(OutputFormat::Human)
    } else {
        ConfigOverrides::new()
    };
    let today = Local::now().date_naive();
    let ctx = match Context::load(&data_dir, &overrides, today) {
        Ok(ctx) => ctx,
        Err(e) => fail(&e.to_string(), cli.human_readable),
    };
    let human = *ctx.config.output_format() == OutputFormat::Human;

    if let Err(e) = run_command(cli.command, &ctx, human) {
        fail(&e.to_string(), human);
    }
}

/// Logs go to stderr so JSON on stdout stays parseable.
fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn fail(message: &str, human: bool) -> ! {
    if human {
        eprintln!("Error: {}", message);
    } else {
        eprintln!("{}", serde_json::json!({ "error": message }));
    }
    process::exit(1);
}

fn run_command(command: Commands, ctx: &Context, human: bool) -> Result<(), roadmap::Error> {
    match command {
        Commands::Init { seed } => {
            let result = commands::init(ctx, seed)?;
            output(&result, human);
        }

        Commands::Login { username, password } => {
            let result = commands::login(ctx, &username, &password)?;
            output(&result, human);
        }

        Commands::Logout => {
            let result = commands::logout(ctx)?;
            output(&result, human);
        }

        Commands::Session => {
            let result = commands::session(ctx)?;
            output(&result, human);
        }

        Commands::Project { command } => match command {
            ProjectCommands::Create {
                name,
                fields,
                backlog,
            } => {
                let result = commands::project_create(ctx, &name, &fields, backlog)?;
                output(&result, human);
            }
            ProjectCommands::Update {
                id,
                name,
                fields,
                backlog,
            } => {
                let result =
                    commands::project_update(ctx, &id, name.as_deref(), &fields, backlog)?;
                output(&result, human);
            }
            ProjectCommands::Delete { id, yes, backlog } => {
                let result = if yes {
                    commands::project_delete(ctx, &id, backlog, &|_: &str| true)?
                } else {
                    commands::project_delete(ctx, &id, backlog, &StdinConfirm)?
                };
                output(&result, human);
            }
            ProjectCommands::Show { id } => {
                let result = commands::project_show(ctx, &id)?;
                output(&result, human);
            }
            ProjectCommands::List { backlog, streams } => {
                let result = commands::project_list(ctx, backlog, &streams)?;
                output(&result, human);
            }
        },

        Commands::View(args) => {
            let result = commands::view(ctx, &args)?;
            output(&result, human);
        }

        Commands::Reference { command } => match command {
            ReferenceCommands::List { kind } => {
                let result = commands::reference_list(ctx, &kind)?;
                output(&result, human);
            }
            ReferenceCommands::Add {
                kind,
                name,
                color,
                icon,
                quarter,
                year,
                date,
                role,
                email,
                avatar_url,
                description,
            } => {
                let fields = ReferenceFields {
                    color,
                    icon,
                    quarter,
                    year,
                    date,
                    role,
                    email,
                    avatar_url,
                    description,
                };
                let result = commands::reference_add(ctx, &kind, &name, fields)?;
                output(&result, human);
            }
        },

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let result = commands::config_show(ctx)?;
                output(&result, human);
            }
            ConfigCommands::Set { key, value } => {
                let result = commands::config_set(ctx, &key, &value)?;
                output(&result, human);
            }
        },

        #[cfg(feature = "serve")]
        Commands::Serve { port, host } => run_server(ctx, &host, port)?,
    }

    Ok(())
}

fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

/// Run the HTTP API until interrupted.
#[cfg(feature = "serve")]
fn run_server(ctx: &Context, host: &str, port: u16) -> Result<(), roadmap::Error> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(roadmap::server::serve(ctx.clone(), host, port))
}
