//! The `upload` command.

use futures::FutureExt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

use crate::client::ClientFactory;
use crate::commands::params::{
    blacklist_parameter, dryrun_parameter, leaf_folders_as_items_parameter,
    local_folder_parameter, parent_id_parameter, parent_type_parameter, reuse_parameter,
    COMMAND_UPLOAD, PARAMETER_BLACKLIST, PARAMETER_DRYRUN, PARAMETER_LEAF_FOLDERS_AS_ITEMS,
    PARAMETER_LOCAL_FOLDER, PARAMETER_PARENT_ID, PARAMETER_PARENT_TYPE, PARAMETER_REUSE,
};
use crate::commands::registry::{
    CommandDescriptor, CommandRegistry, HandlerFuture, Invocation, RegistryError,
};
use crate::error::CliError;
use crate::model::{ParentType, UploadRequest};

pub fn descriptor() -> CommandDescriptor {
    CommandDescriptor::new(COMMAND_UPLOAD, "Upload files to Girder", run)
        .arg(reuse_parameter())
        .arg(leaf_folders_as_items_parameter())
        .arg(blacklist_parameter())
        .arg(dryrun_parameter())
        .arg(parent_type_parameter())
        .arg(parent_id_parameter())
        .arg(local_folder_parameter())
}

pub fn register(registry: &mut CommandRegistry) -> Result<(), RegistryError> {
    registry.register(descriptor())?;
    Ok(())
}

/// Split the `--blacklist` value on commas.
///
/// Kept literal: an empty value yields one empty name and empty segments are
/// preserved. No file has an empty name, so those entries never match.
pub fn parse_blacklist(value: &str) -> Vec<String> {
    value.split(',').map(str::to_string).collect()
}

/// Collect the upload parameters from the command line.
pub fn upload_request(invocation: &Invocation) -> Result<UploadRequest, CliError> {
    let matches = invocation.matches();

    let parent_type = matches
        .get_one::<String>(PARAMETER_PARENT_TYPE)
        .map(String::as_str)
        .unwrap_or("folder");
    let parent_type = ParentType::from_str(parent_type)
        .map_err(|_| CliError::UnknownParentType(parent_type.to_string()))?;

    let parent_id = matches
        .get_one::<String>(PARAMETER_PARENT_ID)
        .ok_or_else(|| CliError::MissingRequiredArgument(PARAMETER_PARENT_ID.to_string()))?;
    let local_folder = matches
        .get_one::<PathBuf>(PARAMETER_LOCAL_FOLDER)
        .ok_or_else(|| CliError::MissingRequiredArgument(PARAMETER_LOCAL_FOLDER.to_string()))?;
    let blacklist = matches
        .get_one::<String>(PARAMETER_BLACKLIST)
        .map(String::as_str)
        .unwrap_or("");

    Ok(UploadRequest {
        local_folder: local_folder.clone(),
        parent_id: parent_id.clone(),
        parent_type,
        leaf_folders_as_items: matches.get_flag(PARAMETER_LEAF_FOLDERS_AS_ITEMS),
        reuse_existing: matches.get_flag(PARAMETER_REUSE),
        blacklist: parse_blacklist(blacklist),
        dry_run: matches.get_flag(PARAMETER_DRYRUN),
    })
}

fn run<'a>(invocation: &'a Invocation, factory: &'a dyn ClientFactory) -> HandlerFuture<'a> {
    async move {
        let request = upload_request(invocation)?;
        if !request.local_folder.exists() {
            return Err(CliError::LocalFolderNotFound(request.local_folder));
        }

        debug!(
            "Uploading {} to {} {}",
            request.local_folder.display(),
            request.parent_type,
            request.parent_id
        );
        let mut client = factory
            .connect(invocation.connection(), invocation.credentials())
            .await?;
        client.upload(&request).await?;
        Ok(())
    }
    .boxed_local()
}
