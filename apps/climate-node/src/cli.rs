use crate::config::Role;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "climate-node",
    version,
    about = "Climate sampling node and multi-node aggregation host"
)]
pub struct Args {
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,
    #[arg(long, default_value_t = 5000)]
    pub port: u16,
    /// Overrides CLIMATE_ROLE.
    #[arg(long, value_enum)]
    pub role: Option<Role>,
    #[arg(long)]
    pub static_root: Option<PathBuf>,
}

impl Args {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
