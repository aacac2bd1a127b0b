use std::process::ExitCode;

use clap::Parser;
use nsc_user_creator::{
    build_info, init_subscriber_with_config, Cli, CreatorError, CredentialOrchestrator, Defaults,
    EnvSource, FileCredentialStore, NkeyProvider, Settings, TracingConfig,
};
use tracing::{debug, error};

fn main() -> ExitCode {
    let flags = Cli::parse().into_flags();
    let settings = Settings::resolve(&flags, &EnvSource::capture(), &Defaults::default());

    init_subscriber_with_config(TracingConfig {
        format: flags
            .log_format
            .or_else(|| settings.as_ref().ok().map(|s| s.log_format))
            .unwrap_or_default(),
        ..Default::default()
    });
    debug!(version = %build_info::version_info(), "Starting");

    let result = settings.map_err(CreatorError::from).and_then(|settings| {
        debug!(?settings, "Resolved settings");
        let store = FileCredentialStore::new(&settings.creds_file_target);
        CredentialOrchestrator::new(NkeyProvider, store).run(&settings)
    });

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "Failed to create user credentials");
            ExitCode::from(err.exit_code())
        }
    }
}
