//! The `localsync` command.
//!
//! Runs three steps in a fixed order: load the metadata left by the previous
//! sync, download with sync semantics, save the metadata. The metadata is saved
//! even when the download fails part way, so the next run resumes from what was
//! already fetched.

use futures::FutureExt;
use tracing::{debug, warn};

use crate::client::ClientFactory;
use crate::commands::download::FolderTarget;
use crate::commands::params::{
    local_folder_parameter, parent_id_parameter, parent_type_parameter, COMMAND_LOCALSYNC,
};
use crate::commands::registry::{
    CommandDescriptor, CommandRegistry, HandlerFuture, Invocation, RegistryError,
};

pub fn descriptor() -> CommandDescriptor {
    CommandDescriptor::new(
        COMMAND_LOCALSYNC,
        "Synchronize local folder with remote Girder folder",
        run,
    )
    .arg(parent_type_parameter())
    .arg(parent_id_parameter())
    .arg(local_folder_parameter())
}

pub fn register(registry: &mut CommandRegistry) -> Result<(), RegistryError> {
    registry.register(descriptor())?;
    Ok(())
}

fn run<'a>(invocation: &'a Invocation, factory: &'a dyn ClientFactory) -> HandlerFuture<'a> {
    async move {
        let target = FolderTarget::from_invocation(invocation)?;

        let mut client = factory
            .connect(invocation.connection(), invocation.credentials())
            .await?;

        client.load_local_metadata(&target.local_folder).await?;
        debug!(
            "Synchronizing folder {} into {}",
            target.folder_id,
            target.local_folder.display()
        );
        let downloaded = client
            .download_folder_recursive(&target.folder_id, &target.local_folder, true)
            .await;
        let saved = client.save_local_metadata(&target.local_folder).await;

        if let (Err(_), Err(e)) = (&downloaded, &saved) {
            warn!("Failed to save sync metadata: {}", e);
        }
        downloaded?;
        saved?;
        Ok(())
    }
    .boxed_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::recording::{Call, RecordingFactory};
    use crate::client::ClientError;
    use crate::commands::standard_registry;
    use crate::configuration::Configuration;
    use crate::error::CliError;
    use std::path::PathBuf;

    fn sync_calls(dest: &str) -> Vec<Call> {
        vec![
            Call::LoadMetadata(PathBuf::from(dest)),
            Call::Download {
                folder_id: "5f0c".to_string(),
                dest: PathBuf::from(dest),
                sync: true,
            },
            Call::SaveMetadata(PathBuf::from(dest)),
        ]
    }

    #[tokio::test]
    async fn test_steps_run_in_order() {
        let registry = standard_registry().unwrap();
        let invocation = registry
            .try_parse_from(
                ["girder-cli", "localsync", "5f0c", "mirror"],
                &Configuration::default(),
            )
            .unwrap();

        let factory = RecordingFactory::new();
        registry.dispatch(&invocation, &factory).await.unwrap();

        let calls = factory.calls();
        assert!(matches!(calls[0], Call::Create(_)));
        assert_eq!(calls[1..].to_vec(), sync_calls("mirror"));
    }

    #[tokio::test]
    async fn test_metadata_is_saved_after_a_failed_download() {
        let registry = standard_registry().unwrap();
        let invocation = registry
            .try_parse_from(
                ["girder-cli", "localsync", "5f0c", "mirror"],
                &Configuration::default(),
            )
            .unwrap();

        let factory = RecordingFactory::failing_download();
        let result = registry.dispatch(&invocation, &factory).await;

        assert!(matches!(
            result,
            Err(CliError::ClientError(ClientError::Api { .. }))
        ));
        assert_eq!(factory.calls()[1..].to_vec(), sync_calls("mirror"));
    }

    #[tokio::test]
    async fn test_non_folder_parent_is_rejected() {
        let registry = standard_registry().unwrap();
        let invocation = registry
            .try_parse_from(
                [
                    "girder-cli",
                    "localsync",
                    "--parent-type",
                    "collection",
                    "5f0c",
                    "mirror",
                ],
                &Configuration::default(),
            )
            .unwrap();

        let factory = RecordingFactory::new();
        let result = registry.dispatch(&invocation, &factory).await;

        assert!(matches!(
            result,
            Err(CliError::InvalidParentType { command, .. }) if command == "localsync"
        ));
        assert!(factory.calls().is_empty());
    }
}
