use tracing_subscriber::{fmt, EnvFilter};

use crate::{errors::Error, Result};

/// Install the process-wide `fmt` subscriber.
///
/// Without `RUST_LOG`, our own crates log at info and everything else only at
/// warn, so the log carries the version, the identity and the observed
/// messages without TDLib binding chatter.
pub fn init(service_name: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(service_name)));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| Error::External(format!("failed to install log subscriber: {e}")))
}

fn default_directives(service_name: &str) -> String {
    format!("warn,tgtail_core=info,tgtail_tdjson=info,{service_name}=info")
}
