use crate::config::AppConfig;
use crate::server;

pub async fn handle(host: Option<String>, port: Option<u16>, mut config: AppConfig) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.api.host = host;
    }
    if let Some(port) = port {
        config.api.port = port;
    }

    server::serve(config).await
}
