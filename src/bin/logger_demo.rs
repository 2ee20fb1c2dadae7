use tokenward::logger::*;

fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    debug!("bootstrap debug log, hidden at the bootstrap level");
    info!("bootstrap info log");

    let config = LogConfig {
        filter: "info,tokenward=debug".to_string(),
    };
    logger.reload_from_config(&config)?;
    debug!(target: "tokenward::demo", "crate debug log, visible after reload");
    trace!(target: "tokenward::demo", "crate trace log, still hidden");
    warn!("session extension failed");

    Ok(())
}
