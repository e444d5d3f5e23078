use anyhow::Context;
use portal_harvest::portal::{Credentials, PortalBuilder};
use portal_harvest::utils::write_pretty_json;
use portal_harvest::PortalConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

const ENV_PREFIX: &str = "PORTAL";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    #[cfg(feature = "env-file")]
    let config = PortalConfig::from_env_file(ENV_PREFIX);
    #[cfg(not(feature = "env-file"))]
    let config = PortalConfig::from_env(ENV_PREFIX);
    let config = config.context("loading portal configuration")?;

    info!(
        base_url = %config.base_url,
        api_url = %config.api_url,
        algorithm = %config.algorithm,
        "starting run"
    );

    let credentials = Credentials::from(&config);
    let output_path = config.output_path.clone();

    let mut portal = PortalBuilder::new(config)
        .build()
        .context("building portal session")?;

    let users = portal
        .run(&credentials)
        .await
        .with_context(|| format!("run failed in state: {}", portal.state()))?;

    write_pretty_json(&output_path, &users)
        .with_context(|| format!("writing {}", output_path.display()))?;

    info!(users = users.len(), path = %output_path.display(), "done");
    Ok(())
}
