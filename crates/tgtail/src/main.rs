use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use tgtail_core::{
    bootstrap::bootstrap,
    config::Config,
    consumer::TracingLog,
    ports::SessionPort,
    runtime,
    shutdown::{OsSignals, ProcessExit},
};

#[tokio::main]
async fn main() {
    if let Err(e) = tgtail_core::logging::init("tgtail") {
        eprintln!("{e}");
    }

    if let Err(e) = run().await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cfg = Config::load().context("loading configuration")?;

    let session = connect().context("creating TDLib client")?;
    bootstrap(session.as_ref(), &cfg)
        .await
        .context("starting session")?;

    let signals = OsSignals::subscribe().context("subscribing to termination signals")?;
    let report = runtime::run(session, signals, ProcessExit, &TracingLog).await;

    info!(
        received = report.received,
        logged = report.logged,
        "update stream closed, exiting"
    );
    Ok(())
}

#[cfg(feature = "tdjson")]
fn connect() -> anyhow::Result<Arc<dyn SessionPort>> {
    use tgtail_tdjson::{RustTdlib, TdClient};

    Ok(Arc::new(TdClient::new(RustTdlib::new())))
}

#[cfg(not(feature = "tdjson"))]
fn connect() -> anyhow::Result<Arc<dyn SessionPort>> {
    Err(tgtail_core::Error::Config(
        "built without the `tdjson` feature; rebuild with `--features tdjson` to link libtdjson"
            .to_string(),
    )
    .into())
}
