mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_DECLARATION_ERROR, EXIT_FAILURE};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "crondeck",
    version,
    about = "Deploy serverless functions and their cron-scheduled triggers"
)]
struct Cli {
    /// Control plane URL (overrides the config file).
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Manage deployed functions.
    Functions {
        #[command(subcommand)]
        command: FunctionCommands,
    },
    /// Manage cron-scheduled triggers.
    Events {
        #[command(subcommand)]
        command: EventCommands,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Debug, Subcommand)]
enum FunctionCommands {
    /// List deployed functions.
    List,
    /// Scaffold a new function project in the current directory.
    New {
        /// Function name (unprefixed).
        name: String,
        /// Artifact bucket to record in the declaration.
        #[arg(long)]
        bucket: String,
        /// Overwrite existing project files.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Package, upload, and deploy the function declared in function.json.
    Deploy {
        /// Path to the function declaration.
        #[arg(default_value = "function.json")]
        file: PathBuf,
        /// Source directory to package (default: functions/<name>).
        #[arg(long)]
        source: Option<PathBuf>,
        /// Override the declared timeout in seconds.
        #[arg(long)]
        timeout: Option<u64>,
        /// Override the declared memory in megabytes.
        #[arg(long)]
        memory: Option<u32>,
        /// Override the declared description.
        #[arg(long)]
        description: Option<String>,
    },
    /// Remove a function, its execution role, and its artifact.
    Rm {
        /// Function name (unprefixed). Defaults to the declared name.
        name: Option<String>,
        /// Artifact bucket. Defaults to the declared bucket.
        #[arg(long)]
        bucket: Option<String>,
        /// Path to the function declaration.
        #[arg(long, default_value = "function.json")]
        file: PathBuf,
    },
    /// Invoke a function synchronously and print its response.
    Invoke {
        /// Function name (unprefixed). Defaults to the declared name.
        name: Option<String>,
        /// JSON payload to send.
        #[arg(long, default_value = "{}")]
        payload: String,
        /// Path to the function declaration.
        #[arg(long, default_value = "function.json")]
        file: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum EventCommands {
    /// List scheduled triggers.
    List,
    /// Create or replace a scheduled trigger.
    Add {
        /// Trigger name (unprefixed).
        name: String,
        /// Schedule expression, e.g. "cron(0 2 * * ? *)" or "rate(1 hour)".
        #[arg(long)]
        cron: String,
        /// Target function name (unprefixed).
        #[arg(long)]
        function: String,
        /// JSON event payload delivered on each invocation.
        #[arg(long, default_value = "{}")]
        input: String,
        /// Create the trigger in the disabled state.
        #[arg(long, default_value_t = false)]
        disabled: bool,
    },
    /// Remove a scheduled trigger.
    Rm {
        /// Trigger name (unprefixed).
        name: String,
    },
    /// Enable a scheduled trigger.
    Enable {
        /// Trigger name (unprefixed).
        name: String,
    },
    /// Disable a scheduled trigger without removing it.
    Disable {
        /// Trigger name (unprefixed).
        name: String,
    },
    /// Apply every trigger from a JSON file, in order.
    Load {
        /// Path to the trigger list.
        #[arg(default_value = "events.json")]
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("CRONDECK_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .init();

    let endpoint = cli.endpoint.as_deref();
    let json_output = cli.json;

    let result = match cli.command {
        Commands::Functions { command } => match command {
            FunctionCommands::List => commands::functions::list::run(endpoint, json_output),
            FunctionCommands::New { name, bucket, force } => {
                commands::functions::new::run(&name, &bucket, force, json_output)
            }
            FunctionCommands::Deploy {
                file,
                source,
                timeout,
                memory,
                description,
            } => commands::functions::deploy::run(
                endpoint,
                &file,
                source.as_deref(),
                commands::functions::deploy::Overrides {
                    timeout,
                    memory,
                    description,
                },
                json_output,
            ),
            FunctionCommands::Rm { name, bucket, file } => commands::functions::rm::run(
                endpoint,
                name.as_deref(),
                bucket.as_deref(),
                &file,
                json_output,
            ),
            FunctionCommands::Invoke {
                name,
                payload,
                file,
            } => commands::functions::invoke::run(
                endpoint,
                name.as_deref(),
                &payload,
                &file,
                json_output,
            ),
        },
        Commands::Events { command } => match command {
            EventCommands::List => commands::events::list::run(endpoint, json_output),
            EventCommands::Add {
                name,
                cron,
                function,
                input,
                disabled,
            } => commands::events::add::run(
                endpoint,
                &name,
                &cron,
                &function,
                &input,
                !disabled,
                json_output,
            ),
            EventCommands::Rm { name } => commands::events::rm::run(endpoint, &name, json_output),
            EventCommands::Enable { name } => {
                commands::events::enable::run(endpoint, &name, json_output)
            }
            EventCommands::Disable { name } => {
                commands::events::disable::run(endpoint, &name, json_output)
            }
            EventCommands::Load { file } => commands::events::load::run(endpoint, &file, json_output),
        },
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("declaration error:") {
                EXIT_DECLARATION_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
