//! [`GirderClient`] implementation over the Girder REST API (v1).

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Password, PasswordDisplayMode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, trace, warn};
use url::Url;

use crate::client::http::{HttpClient, DEFAULT_TIMEOUT};
use crate::client::metadata::{self, SyncMetadata};
use crate::client::{ClientError, ClientFactory, GirderClient};
use crate::model::{
    AuthMethod, AuthenticationResponse, ConnectionParameters, FileDocument, FolderDocument,
    ItemDocument, ParentType, UploadDocument, UploadRequest,
};

/// Page size for listing endpoints.
pub const PAGE_LIMIT: usize = 50;

/// Size of the chunks a file is uploaded in.
pub const UPLOAD_CHUNK_SIZE: u64 = 64 * 1024 * 1024;

/// Folder id used in dry runs, where no folder is really created.
const DRY_RUN_FOLDER_ID: &str = "dryrun";

/// Builds [`RestClient`]s.
#[derive(Debug, Clone)]
pub struct RestClientFactory {
    timeout: Duration,
}

impl RestClientFactory {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for RestClientFactory {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait(?Send)]
impl ClientFactory for RestClientFactory {
    fn create(
        &self,
        connection: &ConnectionParameters,
    ) -> Result<Box<dyn GirderClient>, ClientError> {
        let endpoint = connection.endpoint()?;
        debug!("Connecting to Girder at {}", endpoint);
        Ok(Box::new(RestClient::new(endpoint, self.timeout)?))
    }
}

pub struct RestClient {
    http: HttpClient,
    /// Item documents loaded from the local metadata file.
    local_metadata: SyncMetadata,
    /// Item documents seen during the current download, saved afterwards.
    incoming_metadata: SyncMetadata,
    progress: ProgressBar,
}

impl RestClient {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            http: HttpClient::new(endpoint, timeout)?,
            local_metadata: SyncMetadata::new(),
            incoming_metadata: SyncMetadata::new(),
            progress: ProgressBar::hidden(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        self.http.base_url()
    }

    pub fn token(&self) -> Option<&str> {
        self.http.token()
    }

    fn start_progress(&mut self) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }
        spinner.enable_steady_tick(Duration::from_millis(120));
        self.progress = spinner;
    }

    fn finish_progress(&mut self) {
        self.progress.finish_and_clear();
        self.progress = ProgressBar::hidden();
    }

    /// Print a line for the user without tearing the spinner.
    fn report(&self, message: String) {
        debug!("{}", message);
        self.progress.suspend(|| println!("{}", message));
    }

    async fn get_paged<T>(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<T>, ClientError>
    where
        T: DeserializeOwned,
    {
        let mut results = Vec::new();
        let mut offset = 0;

        loop {
            let mut page_query = query.to_vec();
            page_query.push(("limit", PAGE_LIMIT.to_string()));
            page_query.push(("offset", offset.to_string()));

            let page: Vec<T> = self.http.get(path, &page_query).await?;
            let count = page.len();
            results.extend(page);

            if count < PAGE_LIMIT {
                return Ok(results);
            }
            offset += count;
        }
    }

    async fn authenticate_with_api_key(&mut self, api_key: &str) -> Result<(), ClientError> {
        let response: AuthenticationResponse = self
            .http
            .post("api_key/token", &[("key", api_key.to_string())])
            .await
            .map_err(into_authentication_error)?;
        self.http.set_token(response.auth_token.token);
        Ok(())
    }

    async fn authenticate_with_password(
        &mut self,
        username: &str,
        password: Option<&str>,
    ) -> Result<(), ClientError> {
        let password = match password {
            Some(password) => password.to_string(),
            None => prompt_password(username)?,
        };

        let response: AuthenticationResponse = self
            .http
            .get_with_basic_auth("user/authentication", username, &password)
            .await
            .map_err(into_authentication_error)?;
        self.http.set_token(response.auth_token.token);
        Ok(())
    }

    async fn create_folder(
        &self,
        parent_id: &str,
        parent_type: ParentType,
        name: &str,
        reuse_existing: bool,
    ) -> Result<FolderDocument, ClientError> {
        trace!("Creating folder {:?} under {} {}", name, parent_type, parent_id);
        self.http
            .post(
                "folder",
                &[
                    ("parentId", parent_id.to_string()),
                    ("parentType", parent_type.to_string()),
                    ("name", name.to_string()),
                    ("reuseExisting", reuse_existing.to_string()),
                ],
            )
            .await
    }

    async fn create_item(
        &self,
        folder_id: &str,
        name: &str,
        reuse_existing: bool,
    ) -> Result<ItemDocument, ClientError> {
        trace!("Creating item {:?} in folder {}", name, folder_id);
        self.http
            .post(
                "item",
                &[
                    ("folderId", folder_id.to_string()),
                    ("name", name.to_string()),
                    ("reuseExisting", reuse_existing.to_string()),
                ],
            )
            .await
    }

    async fn list_item_files(&self, item_id: &str) -> Result<Vec<FileDocument>, ClientError> {
        self.get_paged(&format!("item/{}/files", item_id), &[]).await
    }

    /// Upload one local file into an item. A file of the same name and size
    /// is left alone; a file of the same name but another size gets its
    /// contents replaced.
    async fn upload_file_to_item(&self, item_id: &str, path: &Path) -> Result<(), ClientError> {
        let name = file_name(path);
        let size = tokio::fs::metadata(path).await?.len();

        let existing = self.list_item_files(item_id).await?;
        let stale = existing.iter().find(|file| file.name == name);
        if stale.is_some_and(|file| file.size == size) {
            debug!("{} is already current in item {}", name, item_id);
            return Ok(());
        }

        self.progress.set_message(format!("Uploading {}", name));
        let upload: UploadDocument = match stale {
            Some(file) => {
                debug!("Replacing contents of file {} in item {}", file.id, item_id);
                self.http
                    .put(
                        &format!("file/{}/contents", file.id),
                        &[("size", size.to_string())],
                    )
                    .await?
            }
            None => {
                self.http
                    .post(
                        "file",
                        &[
                            ("parentType", "item".to_string()),
                            ("parentId", item_id.to_string()),
                            ("name", name.clone()),
                            ("size", size.to_string()),
                            ("mimeType", "application/octet-stream".to_string()),
                        ],
                    )
                    .await?
            }
        };

        // An empty file is complete as soon as the upload is created.
        if size == 0 {
            return Ok(());
        }

        let mut file = tokio::fs::File::open(path).await?;
        let mut offset: u64 = 0;
        loop {
            let mut chunk = Vec::new();
            let read = (&mut file)
                .take(UPLOAD_CHUNK_SIZE)
                .read_to_end(&mut chunk)
                .await?;
            if read == 0 {
                break;
            }

            trace!("Uploading chunk of {} bytes at offset {}", read, offset);
            let _: Value = self
                .http
                .post_bytes(
                    "file/chunk",
                    &[
                        ("uploadId", upload.id.clone()),
                        ("offset", offset.to_string()),
                    ],
                    chunk,
                )
                .await?;
            offset += read as u64;
        }

        Ok(())
    }

    async fn upload_as_item(
        &self,
        path: &Path,
        folder_id: &str,
        request: &UploadRequest,
    ) -> Result<(), ClientError> {
        self.report(format!("Uploading item from {}", path.display()));
        if request.dry_run {
            return Ok(());
        }

        let item = self
            .create_item(folder_id, &file_name(path), request.reuse_existing)
            .await?;
        self.upload_file_to_item(&item.id, path).await
    }

    async fn upload_folder_as_item(
        &self,
        path: &Path,
        folder_id: &str,
        request: &UploadRequest,
    ) -> Result<(), ClientError> {
        self.report(format!("Creating item from folder {}", path.display()));

        let files: Vec<PathBuf> = sorted_entries(path)
            .await?
            .into_iter()
            .filter(|file| !request.is_blacklisted(&file_name(file)))
            .collect();

        if request.dry_run {
            for file in &files {
                self.report(format!("Adding file {}", file.display()));
            }
            return Ok(());
        }

        let item = self
            .create_item(folder_id, &file_name(path), request.reuse_existing)
            .await?;
        for file in &files {
            self.report(format!("Adding file {}", file.display()));
            self.upload_file_to_item(&item.id, file).await?;
        }
        Ok(())
    }

    async fn upload_path(
        &self,
        path: &Path,
        parent_id: &str,
        parent_type: ParentType,
        request: &UploadRequest,
    ) -> Result<(), ClientError> {
        let name = file_name(path);
        if request.is_blacklisted(&name) {
            self.report(format!("Ignoring {} as it is blacklisted", path.display()));
            return Ok(());
        }

        if path.is_file() {
            if parent_type != ParentType::Folder {
                return Err(ClientError::InvalidParent(format!(
                    "Attempting to upload an item under a {}. Items can only be added to folders.",
                    parent_type
                )));
            }
            self.upload_as_item(path, parent_id, request).await
        } else if path.is_dir() {
            self.upload_folder_recursive(path, parent_id, parent_type, request)
                .await
        } else {
            Err(ClientError::LocalPathNotFound(path.to_path_buf()))
        }
    }

    async fn upload_folder_recursive(
        &self,
        path: &Path,
        parent_id: &str,
        parent_type: ParentType,
        request: &UploadRequest,
    ) -> Result<(), ClientError> {
        if request.leaf_folders_as_items && has_only_files(path).await? {
            if parent_type != ParentType::Folder {
                return Err(ClientError::InvalidParent(format!(
                    "Attempting to upload a folder as an item under a {}. Items can only be added to folders.",
                    parent_type
                )));
            }
            return self.upload_folder_as_item(path, parent_id, request).await;
        }

        self.report(format!("Creating folder from {}", path.display()));
        let folder_id = if request.dry_run {
            DRY_RUN_FOLDER_ID.to_string()
        } else {
            self.create_folder(
                parent_id,
                parent_type,
                &file_name(path),
                request.reuse_existing,
            )
            .await?
            .id
        };

        for entry in sorted_entries(path).await? {
            Box::pin(self.upload_path(&entry, &folder_id, ParentType::Folder, request)).await?;
        }
        Ok(())
    }

    async fn download_file(&self, file: &FileDocument, path: &Path) -> Result<(), ClientError> {
        self.progress
            .set_message(format!("Downloading {}", path.display()));

        let mut response = self.http.download(&format!("file/{}/download", file.id)).await?;
        let mut output = tokio::fs::File::create(path).await?;
        while let Some(chunk) = response.chunk().await? {
            output.write_all(&chunk).await?;
        }
        output.flush().await?;
        Ok(())
    }

    /// Download an item. A single file named like the item lands directly in
    /// `dest`; anything else goes into a directory named after the item.
    async fn download_item(&self, item: &ItemDocument, dest: &Path) -> Result<(), ClientError> {
        let files = self.list_item_files(&item.id).await?;

        if let [file] = files.as_slice() {
            if file.name == item.name {
                return self
                    .download_file(file, &dest.join(transform_filename(&item.name)))
                    .await;
            }
        }

        let item_dir = dest.join(transform_filename(&item.name));
        tokio::fs::create_dir_all(&item_dir).await?;
        for file in &files {
            self.download_file(file, &item_dir.join(transform_filename(&file.name)))
                .await?;
        }
        Ok(())
    }

    async fn download_folder(
        &mut self,
        folder_id: &str,
        dest: &Path,
        sync: bool,
    ) -> Result<(), ClientError> {
        tokio::fs::create_dir_all(dest).await?;

        let folders: Vec<FolderDocument> = self
            .get_paged(
                "folder",
                &[
                    ("parentType", "folder".to_string()),
                    ("parentId", folder_id.to_string()),
                ],
            )
            .await?;
        for folder in folders {
            let local = dest.join(transform_filename(&folder.name));
            Box::pin(self.download_folder(&folder.id, &local, sync)).await?;
        }

        let items: Vec<ItemDocument> = self
            .get_paged("item", &[("folderId", folder_id.to_string())])
            .await?;
        for item in items {
            if sync && self.local_metadata.get(&item.id) == Some(&item.raw) {
                trace!("Item {} is unchanged, skipping", item.name);
            } else {
                self.download_item(&item, dest).await?;
            }
            // Record only what is on disk so an interrupted sync resumes correctly.
            self.incoming_metadata.insert(item.id, item.raw);
        }

        Ok(())
    }
}

#[async_trait(?Send)]
impl GirderClient for RestClient {
    async fn authenticate(&mut self, method: &AuthMethod) -> Result<(), ClientError> {
        match method {
            AuthMethod::ApiKey(api_key) => self.authenticate_with_api_key(api_key).await,
            AuthMethod::Password { username, password } => {
                self.authenticate_with_password(username, password.as_deref())
                    .await
            }
        }
    }

    async fn upload(&mut self, request: &UploadRequest) -> Result<(), ClientError> {
        if !request.local_folder.exists() {
            return Err(ClientError::LocalPathNotFound(request.local_folder.clone()));
        }

        self.start_progress();
        let result = self
            .upload_path(
                &request.local_folder,
                &request.parent_id,
                request.parent_type,
                request,
            )
            .await;
        self.finish_progress();
        result
    }

    async fn download_folder_recursive(
        &mut self,
        folder_id: &str,
        dest: &Path,
        sync: bool,
    ) -> Result<(), ClientError> {
        self.start_progress();
        let result = self.download_folder(folder_id, dest, sync).await;
        self.finish_progress();
        result
    }

    async fn load_local_metadata(&mut self, dest: &Path) -> Result<(), ClientError> {
        match metadata::load(dest).await? {
            Some(local_metadata) => self.local_metadata = local_metadata,
            None => warn!(
                "Local metadata does not exist in {}, falling back to a full download",
                dest.display()
            ),
        }
        Ok(())
    }

    async fn save_local_metadata(&mut self, dest: &Path) -> Result<(), ClientError> {
        metadata::save(dest, &self.incoming_metadata).await
    }
}

fn into_authentication_error(error: ClientError) -> ClientError {
    match error {
        ClientError::Api { message, .. } => ClientError::AuthenticationFailed(message),
        other => other,
    }
}

fn prompt_password(username: &str) -> Result<String, ClientError> {
    Ok(Password::new(&format!("Password for {}:", username))
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()?)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Make a remote name safe to use as a single local path component.
pub fn transform_filename(name: &str) -> String {
    match name {
        "" | "." | ".." => "_".repeat(name.len().max(1)),
        _ => name.replace(['/', '\\'], "_"),
    }
}

async fn sorted_entries(path: &Path) -> Result<Vec<PathBuf>, ClientError> {
    let mut entries = Vec::new();
    let mut read_dir = tokio::fs::read_dir(path).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        entries.push(entry.path());
    }
    entries.sort();
    Ok(entries)
}

async fn has_only_files(path: &Path) -> Result<bool, ClientError> {
    Ok(sorted_entries(path).await?.iter().all(|entry| !entry.is_dir()))
}
