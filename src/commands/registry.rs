//! Command registration and dispatch.
//!
//! A command is a [`CommandDescriptor`]: a name, a description, its argument
//! list and the handler that runs it. Registering a descriptor with
//! [`CommandRegistry::register`] is all it takes for the command to appear on
//! the command line.

use clap::{error::ErrorKind, Arg, ArgMatches, Command};
use futures::future::LocalBoxFuture;
use std::ffi::OsString;
use thiserror::Error;
use tracing::trace;

use crate::client::ClientFactory;
use crate::commands::params::{
    global_parameters, PARAMETER_API_KEY, PARAMETER_API_ROOT, PARAMETER_API_URL,
    PARAMETER_HOST, PARAMETER_PASSWORD, PARAMETER_PORT, PARAMETER_SCHEME, PARAMETER_USERNAME,
};
use crate::configuration::Configuration;
use crate::error::CliError;
use crate::model::{ConnectionParameters, Credentials};

pub type HandlerFuture<'a> = LocalBoxFuture<'a, Result<(), CliError>>;

/// Runs a command for one invocation.
pub type Handler = for<'a> fn(&'a Invocation, &'a dyn ClientFactory) -> HandlerFuture<'a>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("command {0:?} is registered twice")]
    DuplicateCommand(String),
}

#[derive(Clone)]
pub struct CommandDescriptor {
    name: &'static str,
    description: &'static str,
    args: Vec<Arg>,
    handler: Handler,
}

impl CommandDescriptor {
    pub fn new(name: &'static str, description: &'static str, handler: Handler) -> Self {
        Self {
            name,
            description,
            args: Vec::new(),
            handler,
        }
    }

    /// Append an argument. Arguments keep their declaration order.
    pub fn arg(mut self, arg: Arg) -> Self {
        self.args.push(arg);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    fn command(&self) -> Command {
        Command::new(self.name)
            .about(self.description)
            .args(self.args.clone())
    }
}

impl std::fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("args", &self.args.iter().map(Arg::get_id).collect::<Vec<_>>())
            .finish()
    }
}

/// The parsed command line of one invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    subcommand: String,
    connection: ConnectionParameters,
    credentials: Credentials,
    matches: ArgMatches,
}

impl Invocation {
    /// Build the invocation from the top-level matches. Values missing from the
    /// command line fall back to the configuration file.
    pub fn from_matches(
        matches: &ArgMatches,
        configuration: &Configuration,
    ) -> Result<Invocation, CliError> {
        let (subcommand, sub_matches) = matches.subcommand().ok_or_else(|| {
            CliError::UnsupportedSubcommand("no subcommand given".to_string())
        })?;

        let string = |name: &str| sub_matches.get_one::<String>(name).cloned();

        let connection = ConnectionParameters {
            scheme: string(PARAMETER_SCHEME),
            host: string(PARAMETER_HOST),
            port: sub_matches.get_one::<u16>(PARAMETER_PORT).copied(),
            api_root: string(PARAMETER_API_ROOT),
            api_url: string(PARAMETER_API_URL),
        }
        .or(configuration.connection());

        let defaults = configuration.credentials();
        let credentials = Credentials {
            username: string(PARAMETER_USERNAME).or(defaults.username),
            password: string(PARAMETER_PASSWORD),
            api_key: string(PARAMETER_API_KEY).or(defaults.api_key),
        };

        Ok(Invocation {
            subcommand: subcommand.to_string(),
            connection,
            credentials,
            matches: sub_matches.clone(),
        })
    }

    pub fn subcommand(&self) -> &str {
        &self.subcommand
    }

    pub fn connection(&self) -> &ConnectionParameters {
        &self.connection
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Matches of the selected subcommand, global options included.
    pub fn matches(&self) -> &ArgMatches {
        &self.matches
    }
}

#[derive(Debug, Default)]
pub struct CommandRegistry {
    descriptors: Vec<CommandDescriptor>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: CommandDescriptor) -> Result<&mut Self, RegistryError> {
        if self.descriptor(descriptor.name).is_some() {
            return Err(RegistryError::DuplicateCommand(descriptor.name.to_string()));
        }
        trace!("Registering command {:?}", descriptor.name);
        self.descriptors.push(descriptor);
        Ok(self)
    }

    pub fn descriptor(&self, name: &str) -> Option<&CommandDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.descriptors.iter().map(|d| d.name).collect()
    }

    /// The full command line interface: global options plus one subcommand per
    /// registered descriptor.
    pub fn command(&self) -> Command {
        Command::new(env!("CARGO_PKG_NAME"))
            .version(env!("CARGO_PKG_VERSION"))
            .about("Perform common Girder CLI operations.")
            .propagate_version(true)
            .subcommand_required(true)
            .arg_required_else_help(true)
            .subcommand_help_heading("Subcommands")
            .args(global_parameters())
            .subcommands(self.descriptors.iter().map(CommandDescriptor::command))
    }

    pub fn try_parse_from<I, T>(
        &self,
        args: I,
        configuration: &Configuration,
    ) -> Result<Invocation, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let mut command = self.command();
        let matches = command.try_get_matches_from_mut(args)?;
        Invocation::from_matches(&matches, configuration)
            .map_err(|e| command.error(ErrorKind::MissingSubcommand, e))
    }

    /// Run the handler of the invocation's subcommand.
    pub async fn dispatch(
        &self,
        invocation: &Invocation,
        factory: &dyn ClientFactory,
    ) -> Result<(), CliError> {
        let descriptor = self
            .descriptor(invocation.subcommand())
            .ok_or_else(|| CliError::UnsupportedSubcommand(invocation.subcommand().to_string()))?;

        trace!("Executing \"{}\" command...", descriptor.name);
        (descriptor.handler)(invocation, factory).await
    }
}
