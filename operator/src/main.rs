//! Operator is a long lived process that keeps a companion pod running for every Book.
#![deny(missing_docs)]

use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use books_common::telemetry;
use books_operator::{
    book::pod::{parse_quantity, PodConfig, DEFAULT_IMAGE},
    utils::Context,
};
use clap::{Args, Parser, Subcommand};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use opentelemetry::global::shutdown_tracer_provider;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Export spans to this OTLP endpoint, spans are not exported when unset.
    #[arg(long, env = "OPERATOR_OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,

    /// Address of the Prometheus metrics endpoint.
    #[arg(long, env = "OPERATOR_PROM_BIND", default_value = "0.0.0.0:9464")]
    prom_bind: SocketAddr,
}

/// Available Subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the daemon
    Daemon(DaemonOpts),
}

/// Options for the daemon, describing the pods created for books.
#[derive(Args, Debug)]
pub struct DaemonOpts {
    /// Container image of book pods.
    #[arg(long, env = "BOOKS_POD_IMAGE", default_value = DEFAULT_IMAGE)]
    pod_image: String,

    /// Cpu request of book pods.
    #[arg(long, env = "BOOKS_POD_CPU_REQUEST", default_value = "100m", value_parser = parse_quantity)]
    pod_cpu_request: Quantity,

    /// Memory request of book pods.
    #[arg(long, env = "BOOKS_POD_MEMORY_REQUEST", default_value = "128Mi", value_parser = parse_quantity)]
    pod_memory_request: Quantity,

    /// Cpu limit of book pods.
    #[arg(long, env = "BOOKS_POD_CPU_LIMIT", default_value = "200m", value_parser = parse_quantity)]
    pod_cpu_limit: Quantity,

    /// Memory limit of book pods.
    #[arg(long, env = "BOOKS_POD_MEMORY_LIMIT", default_value = "256Mi", value_parser = parse_quantity)]
    pod_memory_limit: Quantity,
}

impl From<DaemonOpts> for PodConfig {
    fn from(opts: DaemonOpts) -> Self {
        Self {
            image: opts.pod_image,
            cpu_request: opts.pod_cpu_request,
            memory_request: opts.pod_memory_request,
            cpu_limit: opts.pod_cpu_limit,
            memory_limit: opts.pod_memory_limit,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    telemetry::init_tracing(args.otlp_endpoint.clone()).await?;
    let (metrics_provider, metrics_server) = telemetry::init_metrics_prom(&args.prom_bind).await?;

    info!(?args.command, ?args.otlp_endpoint, %args.prom_bind, "starting operator");
    match args.command {
        Command::Daemon(opts) => {
            let k_client = kube::Client::try_default().await?;
            let cx = Arc::new(Context::new(k_client, opts.into()));
            books_operator::book::run(cx).await?
        }
    };

    // Flush traces and metrics before shutdown
    metrics_server.abort();
    shutdown_tracer_provider();
    metrics_provider.shutdown()?;
    Ok(())
}
