//! mesos-collector - Mesos master/agent metrics collector
//!
//! Serves metric discovery and collection for a Mesos cluster over HTTP.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use mesos_collector::{
    catalog::{Namespace, Service},
    cli::{Cli, OutputFormat},
    config::Config,
    plugin::MesosCollector,
    server,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    mesos_collector::init_logging(&cli.log_level.to_string())?;

    let mut config = Config::load_or_default(&cli.config)?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    if cli.validate {
        return print_validated(&config, cli.output_format);
    }

    if let Some(service) = cli.discover {
        return discover(&config, service, cli.output_format).await;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        master = ?config.mesos.master,
        agent = ?config.mesos.agent,
        "Starting mesos-collector"
    );

    let port = config.server.port;
    server::run(config, port).await
}

fn print_validated(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("Configuration is valid");
            println!(
                "  master: {}",
                config.mesos.master.as_deref().unwrap_or("(none)")
            );
            println!(
                "  agent: {}",
                config.mesos.agent.as_deref().unwrap_or("(none)")
            );
            println!("  discovery: {:?}", config.mesos.discovery);
            println!(
                "  listen: {}:{}",
                config.server.bind_address, config.server.port
            );
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(config)?),
    }
    Ok(())
}

async fn discover(config: &Config, service: Service, format: OutputFormat) -> Result<()> {
    let collector = MesosCollector::new(&config.mesos)?;
    let namespaces: Vec<String> = collector
        .metric_types(Some(service))
        .await?
        .iter()
        .map(Namespace::to_string)
        .collect();

    match format {
        OutputFormat::Text => {
            for namespace in &namespaces {
                println!("{}", namespace);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&namespaces)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&namespaces)?),
    }
    Ok(())
}
