use zbot_server::config::{ServerArgs, ServerConfig};

pub fn run(args: ServerArgs) -> anyhow::Result<()> {
    // Validate before starting a runtime so bad settings fail fast.
    let config = ServerConfig::from_args(args)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        tokio::select! {
            result = zbot_server::serve(config) => result,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                Ok(())
            }
        }
    })
}
