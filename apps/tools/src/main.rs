use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use server_api::{
    bump_version, config::DEFAULT_CONFIG_PATH, generate_app, version_info, ApiContext,
    EditorConfig, Session,
};
use shared::domain::BumpComponent;

#[derive(Parser, Debug)]
#[command(name = "gbt-tools", about = "Operator commands for GBT-Editor")]
struct Cli {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current version.
    Version,
    /// Bump one version component (patch, minor or major).
    Bump { component: BumpComponent },
    /// Load the configuration and print the effective settings.
    CheckConfig,
    /// Generate an app file for a user without going through the web UI.
    Generate {
        #[arg(long)]
        user: String,
        prompt: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("warn").init();
    let cli = Cli::parse();

    let config = EditorConfig::load(&cli.config)?;

    match cli.command {
        Command::CheckConfig => check_config(&config),
        Command::Version => {
            let api = context(config)?;
            println!("{}", version_info(&api).await?);
        }
        Command::Bump { component } => {
            let api = context(config)?;
            let operator = Session::new("gbt-tools");
            let version = bump_version(&api, &operator, component).await?;
            println!("bumped {component} -> {version}");
        }
        Command::Generate { user, prompt } => {
            let api = context(config)?;
            let app = generate_app(&api, &Session::new(user), &prompt).await?;
            println!(
                "saved {}",
                api.app_files.resolve(&app.file_name).display()
            );
        }
    }

    Ok(())
}

fn context(config: EditorConfig) -> Result<ApiContext> {
    ApiContext::from_config(config, std::env::var("OPENAI_API_KEY").ok())
}

fn check_config(config: &EditorConfig) {
    let (username, _) = config.credentials();
    let deploy = config.deployer_settings();
    println!("config        {}", config.path().display());
    println!(
        "username      {}",
        username.as_deref().unwrap_or("<not a string>")
    );
    println!("generator     {:?}", config.generator_kind());
    println!("workspace     {}", config.workspace_dir().display());
    println!("version file  {}", config.version_file().display());
    println!(
        "deploy        {} (ports from {})",
        deploy.command, deploy.base_port
    );
}
