use girder_cli::{
    client::rest::RestClientFactory,
    commands::{params::PARAMETER_VERBOSE, standard_registry, Invocation},
    configuration::Configuration,
    error::CliError,
    exit_codes::GirderExitCode,
};
use tracing::{debug, trace};
use tracing_subscriber::EnvFilter;

async fn run() -> Result<(), CliError> {
    let registry = standard_registry()?;
    let matches = registry.command().get_matches();

    // Initialize the logging subsystem
    let filter = if matches.get_flag(PARAMETER_VERBOSE) {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let configuration = Configuration::load_or_default()?;
    trace!("Configuration: {:?}", configuration);

    let invocation = Invocation::from_matches(&matches, &configuration)?;
    registry
        .dispatch(&invocation, &RestClientFactory::default())
        .await
}

/// Main entry point for the program
#[tokio::main(flavor = "current_thread")]
async fn main() {
    match run().await {
        Ok(()) => std::process::exit(GirderExitCode::Success.code()),
        Err(e) => {
            let code = e.exit_code();
            eprintln!("ERROR: {}", e);
            debug!("Exiting with code {} ({})", code.code(), code.message());
            std::process::exit(code.code());
        }
    }
}
