//! Serves the alert API that both trading modes post to.

use anyhow::Result;
use clap::Args;
use tradebot_core::AppConfig;
use tradebot_web_api::ApiServer;

#[derive(Args, Debug)]
pub struct AlertServerArgs {
    /// Listen address, overriding `alerts.listen_addr`
    #[arg(short, long)]
    pub addr: Option<String>,
}

pub async fn run(config: &AppConfig, args: AlertServerArgs) -> Result<()> {
    let addr = args
        .addr
        .unwrap_or_else(|| config.alerts.listen_addr.clone());
    ApiServer::new().serve(&addr).await
}
