use tracing::info;

use crate::{
    config::Config,
    errors::Error,
    ports::SessionPort,
    updates::{OptionValue, User},
    Result,
};

/// What the backend told us about itself and the authorized account.
#[derive(Clone, Debug)]
pub struct Identity {
    pub version: String,
    pub me: User,
}

/// Start the session and prove it is usable.
///
/// Runs once, in order: backend log verbosity, authorization, the `version`
/// option, then the account identity. The first failure aborts the sequence;
/// there are no retries.
pub async fn bootstrap(session: &dyn SessionPort, cfg: &Config) -> Result<Identity> {
    session.set_log_verbosity(cfg.log_verbosity).await?;

    session.start(&cfg.tdlib).await?;

    let version = match session.get_option("version").await? {
        OptionValue::String { value } => value,
        other => {
            return Err(Error::UnexpectedResponse {
                expected: "optionValueString",
                got: format!("{other:?}"),
            })
        }
    };
    info!("TDLib version: {version}");

    let me = session.get_me().await?;
    info!(
        user_id = me.id.0,
        "Me: {} {} [{}]",
        me.first_name,
        me.last_name,
        me.handle()
    );

    Ok(Identity { version, me })
}
