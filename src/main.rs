#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::assigning_clones,
    clippy::bool_to_int_with_if,
    clippy::case_sensitive_file_extension_comparisons,
    clippy::cast_possible_wrap,
    clippy::doc_markdown,
    clippy::field_reassign_with_default,
    clippy::float_cmp,
    clippy::implicit_clone,
    clippy::items_after_statements,
    clippy::map_unwrap_or,
    clippy::manual_let_else,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::needless_pass_by_value,
    clippy::needless_raw_string_hashes,
    clippy::redundant_closure_for_method_calls,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::struct_field_names,
    clippy::too_many_lines,
    clippy::uninlined_format_args,
    clippy::unused_self,
    clippy::cast_precision_loss,
    clippy::unnecessary_cast,
    clippy::unnecessary_lazy_evaluations,
    clippy::unnecessary_literal_bound,
    clippy::unnecessary_map_or,
    clippy::unnecessary_wraps
)]

use anyhow::{bail, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::io::Write;
use voicegate::config::Config;
use voicegate::{gateway, observability, providers};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CompletionShell {
    #[value(name = "bash")]
    Bash,
    #[value(name = "fish")]
    Fish,
    #[value(name = "zsh")]
    Zsh,
    #[value(name = "powershell")]
    PowerShell,
    #[value(name = "elvish")]
    Elvish,
}

/// `voicegate` - LLM-backed fulfillment webhook for voice assistants.
#[derive(Parser, Debug)]
#[command(name = "voicegate")]
#[command(version)]
#[command(about = "Voice assistant webhook gateway backed by LLMs.", long_about = None)]
struct Cli {
    /// Directory holding config.toml (default: ~/.voicegate)
    #[arg(long, global = true)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook gateway
    #[command(long_about = "\
Start the webhook gateway.

Serves the Dialogflow fulfillment webhook plus health, metrics and \
session admin endpoints. Bind address defaults to the values in \
your config file (gateway.host / gateway.port).

Examples:
  voicegate serve                  # use config defaults
  voicegate serve -p 8080          # listen on port 8080
  voicegate serve --host 127.0.0.1 # local only")]
    Serve {
        /// Port to listen on; defaults to config gateway.port
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to; defaults to config gateway.host
        #[arg(long)]
        host: Option<String>,
    },

    /// Show effective configuration and backend health
    Status,

    /// List supported LLM backends
    Providers,

    /// Manage configuration
    #[command(long_about = "\
Manage voicegate configuration.

Use 'schema' to dump the full JSON Schema for the config file, which \
documents every available key, type, and default value.

Examples:
  voicegate config schema              # print JSON Schema to stdout
  voicegate config schema > schema.json")]
    Config {
        #[command(subcommand)]
        config_command: ConfigCommands,
    },

    /// Generate shell completion script to stdout
    #[command(long_about = "\
Generate shell completion scripts for `voicegate`.

The script is printed to stdout so it can be sourced directly:

Examples:
  source <(voicegate completions bash)
  voicegate completions zsh > ~/.zfunc/_voicegate")]
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Dump the full configuration JSON Schema to stdout
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(config_dir) = &cli.config_dir {
        if config_dir.trim().is_empty() {
            bail!("--config-dir cannot be empty");
        }
        std::env::set_var("VOICEGATE_CONFIG_DIR", config_dir);
    }

    // Completions and schema stay stdout-only: no config load, no logging.
    match &cli.command {
        Commands::Completions { shell } => {
            let mut stdout = std::io::stdout().lock();
            return write_shell_completion(*shell, &mut stdout);
        }
        Commands::Config {
            config_command: ConfigCommands::Schema,
        } => {
            let schema = schemars::schema_for!(Config);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            return Ok(());
        }
        _ => {}
    }

    let mut config = Config::load_or_init().await?;
    observability::init_logging(&config.observability.log_format);
    tracing::info!(
        path = %config.config_path.display(),
        backend = %config.default_backend,
        "Config loaded"
    );

    match cli.command {
        Commands::Completions { .. } | Commands::Config { .. } => unreachable!(),

        Commands::Serve { port, host } => {
            if let Some(port) = port {
                config.gateway.port = port;
            }
            if let Some(host) = host {
                config.gateway.host = host;
            }
            gateway::run_gateway(&config).await
        }

        Commands::Status => {
            let registry = providers::create_registry(&config)?;
            let provider = registry.resolve(Some(&config.default_backend))?;
            let healthy = provider.health_check().await;

            println!("voicegate status");
            println!();
            println!("Version:     {}", env!("CARGO_PKG_VERSION"));
            println!("Config:      {}", config.config_path.display());
            println!();
            println!("Backend:     {} ({})", provider.name(), provider.default_model());
            println!(
                "  Health:    {}",
                if healthy { "connected" } else { "unavailable" }
            );
            println!(
                "Gateway:     {}:{}",
                config.gateway.host, config.gateway.port
            );
            println!(
                "Sessions:    max {} messages, {} min idle timeout, sweep every {}s",
                config.conversation.max_history,
                config.conversation.session_timeout_minutes,
                config.conversation.sweep_interval_secs
            );
            println!(
                "Voice:       {} chars max",
                config.voice.max_response_chars
            );
            println!(
                "Logging:     {} (metrics {})",
                config.observability.log_format,
                if config.observability.metrics_enabled { "on" } else { "off" }
            );
            Ok(())
        }

        Commands::Providers => {
            let providers = providers::list_providers();
            let current = config.default_backend.trim().to_ascii_lowercase();
            println!("Supported backends ({} total):\n", providers.len());
            println!("  ID (use in config)  DESCRIPTION");
            println!("  ------------------- -----------");
            for p in &providers {
                let marker = if p.name.eq_ignore_ascii_case(&current) {
                    " (active)"
                } else {
                    ""
                };
                println!(
                    "  {:<19} {}{}  [key: {}]",
                    p.name,
                    p.display_name,
                    marker,
                    p.key_env.join(" or ")
                );
            }
            Ok(())
        }
    }
}

fn write_shell_completion<W: Write>(shell: CompletionShell, writer: &mut W) -> Result<()> {
    use clap_complete::generate;
    use clap_complete::shells;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    match shell {
        CompletionShell::Bash => generate(shells::Bash, &mut cmd, bin_name, writer),
        CompletionShell::Fish => generate(shells::Fish, &mut cmd, bin_name, writer),
        CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, bin_name, writer),
        CompletionShell::PowerShell => generate(shells::PowerShell, &mut cmd, bin_name, writer),
        CompletionShell::Elvish => generate(shells::Elvish, &mut cmd, bin_name, writer),
    }

    writer.flush()?;
    Ok(())
}
