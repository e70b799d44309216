//! CLI command definitions and argument parsing.
//!
//! Each command lives in its own module and contributes a descriptor to the
//! [`registry::CommandRegistry`]. [`standard_registry`] assembles the commands
//! shipped with the binary.

pub mod download;
pub mod localsync;
pub mod params;
pub mod registry;
pub mod upload;

pub use registry::{CommandDescriptor, CommandRegistry, Invocation, RegistryError};

/// Registry with every built-in command, in help order.
pub fn standard_registry() -> Result<CommandRegistry, RegistryError> {
    let mut registry = CommandRegistry::new();
    upload::register(&mut registry)?;
    download::register(&mut registry)?;
    localsync::register(&mut registry)?;
    Ok(registry)
}
