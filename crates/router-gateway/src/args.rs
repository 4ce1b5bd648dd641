use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Multi-tenant LLM request router
#[derive(Debug, Parser)]
#[command(name = "router-gateway", about = "Admission-controlled, circuit-broken LLM request router")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "router.toml", env = "ROUTER_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "ROUTER_LISTEN")]
    pub listen: Option<SocketAddr>,
}
