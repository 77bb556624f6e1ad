use std::path::Path;

use anyhow::Context;

use super::open_orchestrator;

pub fn run(root: &Path, port: Option<u16>) -> anyhow::Result<()> {
    let (config, orchestrator) = open_orchestrator(root)?;
    for warning in config.validate() {
        tracing::warn!(level = ?warning.level, "config: {}", warning.message);
    }
    let port = port.unwrap_or(config.server.port);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let recovered = orchestrator
            .recover_interrupted()
            .await
            .context("failed to recover interrupted runs")?;
        if recovered > 0 {
            println!("Marked {recovered} interrupted run(s) as error");
        }

        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
            .await
            .with_context(|| format!("failed to bind port {port}"))?;
        let actual_port = listener.local_addr()?.port();
        println!(
            "switchboard serving {} action(s) on http://localhost:{actual_port}",
            orchestrator.catalog().len()
        );

        let shutdown = async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        };
        switchboard_server::serve_on(orchestrator, listener, shutdown).await
    })
}
