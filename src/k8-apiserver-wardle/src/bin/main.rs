use anyhow::Context;
use anyhow::Result;
use fluvio_future::task::run_block_on;
use tracing::info;

use k8_apiserver_config::ServerOptions;
use k8_apiserver_wardle::WardleServer;
use k8_apiserver_wardle::GROUP;

fn main() -> Result<()> {
    fluvio_future::subscriber::init_tracer(None);

    let options = match std::env::args().nth(1) {
        Some(path) => ServerOptions::from_file(&path)
            .with_context(|| format!("reading server options from {}", path))?,
        None => ServerOptions::for_group(GROUP),
    };
    run_block_on(run(options))
}

async fn run(options: ServerOptions) -> Result<()> {
    let server = WardleServer::new(options).context("building wardle server")?;
    for (version, resources) in &server.group().versioned_resources_storage_map {
        for (resource, storage) in resources {
            info!(
                %version,
                %resource,
                kind = storage.kind(),
                namespaced = storage.namespace_scoped(),
                "serving"
            );
        }
    }
    Ok(())
}
