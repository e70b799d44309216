//! The `download` command.

use futures::FutureExt;
use std::path::PathBuf;
use tracing::debug;

use crate::client::ClientFactory;
use crate::commands::params::{
    local_folder_parameter, parent_id_parameter, parent_type_parameter, COMMAND_DOWNLOAD,
    PARAMETER_LOCAL_FOLDER, PARAMETER_PARENT_ID, PARAMETER_PARENT_TYPE,
};
use crate::commands::registry::{
    CommandDescriptor, CommandRegistry, HandlerFuture, Invocation, RegistryError,
};
use crate::error::CliError;
use crate::model::ParentType;

pub fn descriptor() -> CommandDescriptor {
    CommandDescriptor::new(COMMAND_DOWNLOAD, "Download files from Girder", run)
        .arg(parent_type_parameter())
        .arg(parent_id_parameter())
        .arg(local_folder_parameter())
}

pub fn register(registry: &mut CommandRegistry) -> Result<(), RegistryError> {
    registry.register(descriptor())?;
    Ok(())
}

/// A remote folder and the local folder it is mirrored into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderTarget {
    pub folder_id: String,
    pub local_folder: PathBuf,
}

impl FolderTarget {
    /// Read the target of `download` or `localsync`. Both only work on
    /// folders, so any other parent type is rejected here, before a client is
    /// ever built.
    pub fn from_invocation(invocation: &Invocation) -> Result<FolderTarget, CliError> {
        let matches = invocation.matches();

        let parent_type = matches
            .get_one::<String>(PARAMETER_PARENT_TYPE)
            .map(String::as_str)
            .unwrap_or("folder");
        if parent_type != ParentType::Folder.to_string() {
            return Err(CliError::InvalidParentType {
                command: invocation.subcommand().to_string(),
                parent_type: parent_type.to_string(),
            });
        }

        let folder_id = matches
            .get_one::<String>(PARAMETER_PARENT_ID)
            .ok_or_else(|| CliError::MissingRequiredArgument(PARAMETER_PARENT_ID.to_string()))?;
        let local_folder = matches
            .get_one::<PathBuf>(PARAMETER_LOCAL_FOLDER)
            .ok_or_else(|| {
                CliError::MissingRequiredArgument(PARAMETER_LOCAL_FOLDER.to_string())
            })?;

        Ok(FolderTarget {
            folder_id: folder_id.clone(),
            local_folder: local_folder.clone(),
        })
    }
}

fn run<'a>(invocation: &'a Invocation, factory: &'a dyn ClientFactory) -> HandlerFuture<'a> {
    async move {
        let target = FolderTarget::from_invocation(invocation)?;

        let mut client = factory
            .connect(invocation.connection(), invocation.credentials())
            .await?;
        debug!(
            "Downloading folder {} into {}",
            target.folder_id,
            target.local_folder.display()
        );
        client
            .download_folder_recursive(&target.folder_id, &target.local_folder, false)
            .await?;
        Ok(())
    }
    .boxed_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::recording::{Call, RecordingFactory};
    use crate::commands::standard_registry;
    use crate::configuration::Configuration;

    #[tokio::test]
    async fn test_download_delegates_to_recursive_download() {
        let registry = standard_registry().unwrap();
        let invocation = registry
            .try_parse_from(
                ["girder-cli", "download", "5f0c", "/tmp/girder-out"],
                &Configuration::default(),
            )
            .unwrap();

        let factory = RecordingFactory::new();
        registry.dispatch(&invocation, &factory).await.unwrap();

        assert_eq!(
            factory.calls(),
            vec![
                Call::Create(Default::default()),
                Call::Download {
                    folder_id: "5f0c".to_string(),
                    dest: PathBuf::from("/tmp/girder-out"),
                    sync: false,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_non_folder_parent_fails_before_any_client_call() {
        let registry = standard_registry().unwrap();
        for parent_type in ["collection", "user", "item"] {
            let invocation = registry
                .try_parse_from(
                    [
                        "girder-cli",
                        "--username",
                        "admin",
                        "download",
                        "--parent-type",
                        parent_type,
                        "5f0c",
                        "/tmp/girder-out",
                    ],
                    &Configuration::default(),
                )
                .unwrap();

            let factory = RecordingFactory::new();
            let result = registry.dispatch(&invocation, &factory).await;

            match result {
                Err(CliError::InvalidParentType {
                    command,
                    parent_type: rejected,
                }) => {
                    assert_eq!(command, "download");
                    assert_eq!(rejected, parent_type);
                }
                other => panic!("unexpected result: {:?}", other),
            }
            assert!(factory.calls().is_empty());
        }
    }

    #[test]
    fn test_connection_comes_from_global_options() {
        let registry = standard_registry().unwrap();
        let invocation = registry
            .try_parse_from(
                [
                    "girder-cli",
                    "--api-url",
                    "https://data.kitware.com/api/v1",
                    "download",
                    "5f0c",
                    "out",
                ],
                &Configuration::default(),
            )
            .unwrap();

        assert_eq!(
            invocation.connection().endpoint().unwrap().as_str(),
            "https://data.kitware.com/api/v1/"
        );
    }
}
