use crate::config::Config;
use crate::docker_client::DockerClient;
use crate::error::Result;
use crate::types::{ContainerListOptions, ImageListOptions, LogsOptions, PullOptions};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dockhand", version, about = "Talk to a Docker engine over its HTTP API")]
pub struct CLI {
    #[arg(
        short = 'H',
        long,
        help = "Engine endpoint (unix:///var/run/docker.sock, tcp://host:2375, ...)"
    )]
    pub host: Option<String>,
    #[arg(long, help = "Engine API version, e.g. 1.43")]
    pub api_version: Option<String>,
    #[arg(
        short = 'e',
        long = "env-file",
        default_value = ".env",
        help = "Path to .env file"
    )]
    pub env_file: String,
    #[arg(short, long, action = clap::ArgAction::Count, help = "Increase verbosity (-v, -vv, etc.)")]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Check that the engine answers
    Ping,
    /// List containers
    Ps {
        #[arg(short, long, help = "Include stopped containers")]
        all: bool,
    },
    /// Show a container as JSON
    Inspect { id: String },
    /// Print a container's logs
    Logs {
        id: String,
        #[arg(long, default_value = "all")]
        tail: String,
    },
    /// List images
    Images {
        #[arg(short, long, help = "Include intermediate images")]
        all: bool,
    },
    /// Pull an image
    Pull {
        image: String,
        #[arg(short, long, default_value = "latest")]
        tag: String,
    },
    /// List networks
    Networks,
    /// Create the networks declared in a compose file
    ComposeNetworks { file: PathBuf },
}

pub async fn dispatch(cli: &CLI) {
    let config = match Config::from_env_and_cli(cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            println!();
            Config::show_configuration_help();
            return;
        }
    };
    tracing::debug!("Using engine at {}", config.endpoint);

    let client = DockerClient::connect(config);
    if let Err(e) = execute(&client, &cli.command).await {
        eprintln!("Error: {}", e);
    }
}

pub async fn execute(client: &DockerClient, command: &Command) -> Result<()> {
    match command {
        Command::Ping => {
            let ok = client.ping().await?;
            println!("{}", if ok { "OK" } else { "unexpected ping reply" });
        }
        Command::Ps { all } => {
            let options = ContainerListOptions {
                all: *all,
                ..ContainerListOptions::default()
            };
            let containers = client.containers().list(&options).await?;
            println!("{:<14} {:<24} {:<30} {:<10} STATUS", "ID", "NAME", "IMAGE", "STATE");
            for container in containers.iter() {
                println!(
                    "{:<14} {:<24} {:<30} {:<10} {}",
                    short_id(&container.id),
                    container.name,
                    container.image,
                    container.state,
                    container.status
                );
            }
            report_skipped(containers.skipped.len());
        }
        Command::Inspect { id } => {
            let record = client.containers().inspect(id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Logs { id, tail } => {
            let options = LogsOptions {
                tail: tail.clone(),
                ..LogsOptions::default()
            };
            for line in client.containers().logs(id, &options).await? {
                println!("{}", line);
            }
        }
        Command::Images { all } => {
            let options = ImageListOptions {
                all: *all,
                ..ImageListOptions::default()
            };
            let images = client.images().list(&options).await?;
            println!("{:<14} {:<40} SIZE", "ID", "TAGS");
            for image in images.iter() {
                println!(
                    "{:<14} {:<40} {}",
                    short_id(&image.id),
                    image.repo_tags.join(","),
                    image.size
                );
            }
            report_skipped(images.skipped.len());
        }
        Command::Pull { image, tag } => {
            let options = PullOptions {
                tag: tag.clone(),
                ..PullOptions::image(image.as_str())
            };
            println!("{}", client.images().pull(&options).await?);
        }
        Command::Networks => {
            let networks = client.networks().list(&Default::default()).await?;
            println!("{:<14} {:<24} {:<10} SCOPE", "ID", "NAME", "DRIVER");
            for network in networks.iter() {
                println!(
                    "{:<14} {:<24} {:<10} {}",
                    short_id(network.id()),
                    network.name(),
                    network.spec.driver,
                    network.spec.scope
                );
            }
            report_skipped(networks.skipped.len());
        }
        Command::ComposeNetworks { file } => {
            for (name, action) in client.networks().create_from_compose(file).await? {
                println!("{}: {:?}", name, action);
            }
        }
    }
    Ok(())
}

fn short_id(id: &str) -> &str {
    let id = id.strip_prefix("sha256:").unwrap_or(id);
    id.get(..12).unwrap_or(id)
}

fn report_skipped(skipped: usize) {
    if skipped > 0 {
        eprintln!("({} entries could not be decoded and were skipped)", skipped);
    }
}
