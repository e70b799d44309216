//! The remote Girder client.
//!
//! Commands talk to the server only through the [`GirderClient`] trait and
//! obtain instances from a [`ClientFactory`]. [`rest::RestClient`] is the
//! implementation used by the binary.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::model::{AuthMethod, ConnectionParameters, Credentials, ModelError, UploadRequest};

pub mod http;
pub mod metadata;
pub mod rest;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("{0}")]
    Endpoint(#[from] ModelError),
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Failed to read password: {0}")]
    PasswordPrompt(#[from] inquire::InquireError),
    #[error("Girder returned {status}: {message}")]
    Api { status: StatusCode, message: String },
    #[error("{0}")]
    InvalidParent(String),
    #[error("Local path does not exist: {0:?}")]
    LocalPathNotFound(PathBuf),
}

/// Operations the commands need from a Girder server.
#[async_trait(?Send)]
pub trait GirderClient {
    async fn authenticate(&mut self, method: &AuthMethod) -> Result<(), ClientError>;

    /// Upload a local file or folder tree under the given parent.
    async fn upload(&mut self, request: &UploadRequest) -> Result<(), ClientError>;

    /// Download the contents of a remote folder into `dest`. With `sync`, items
    /// unchanged since the loaded metadata are skipped.
    async fn download_folder_recursive(
        &mut self,
        folder_id: &str,
        dest: &Path,
        sync: bool,
    ) -> Result<(), ClientError>;

    async fn load_local_metadata(&mut self, dest: &Path) -> Result<(), ClientError>;

    async fn save_local_metadata(&mut self, dest: &Path) -> Result<(), ClientError>;
}

/// Builds clients for the commands.
#[async_trait(?Send)]
pub trait ClientFactory {
    /// Build an unauthenticated client bound to the resolved endpoint.
    fn create(
        &self,
        connection: &ConnectionParameters,
    ) -> Result<Box<dyn GirderClient>, ClientError>;

    /// Build a client and authenticate it: with the API key if there is one,
    /// otherwise with the username and password. Without either the client
    /// stays anonymous.
    async fn connect(
        &self,
        connection: &ConnectionParameters,
        credentials: &Credentials,
    ) -> Result<Box<dyn GirderClient>, ClientError> {
        let mut client = self.create(connection)?;

        match credentials.auth_method() {
            Some(method) => {
                debug!(
                    "Authenticating (interactive: {})...",
                    method.is_interactive()
                );
                client.authenticate(&method).await?;
            }
            None => debug!("No credentials given, continuing anonymously"),
        }

        Ok(client)
    }
}

#[cfg(test)]
pub(crate) mod recording {
    //! A client double that records every call in order.

    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Create(ConnectionParameters),
        Authenticate(AuthMethod),
        Upload(UploadRequest),
        Download {
            folder_id: String,
            dest: PathBuf,
            sync: bool,
        },
        LoadMetadata(PathBuf),
        SaveMetadata(PathBuf),
    }

    #[derive(Debug, Clone, Default)]
    pub struct RecordingFactory {
        calls: Rc<RefCell<Vec<Call>>>,
        fail_download: bool,
    }

    impl RecordingFactory {
        pub fn new() -> Self {
            Self::default()
        }

        /// A factory whose clients fail every download.
        pub fn failing_download() -> Self {
            Self {
                fail_download: true,
                ..Self::default()
            }
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }
    }

    struct RecordingClient {
        calls: Rc<RefCell<Vec<Call>>>,
        fail_download: bool,
    }

    #[async_trait(?Send)]
    impl ClientFactory for RecordingFactory {
        fn create(
            &self,
            connection: &ConnectionParameters,
        ) -> Result<Box<dyn GirderClient>, ClientError> {
            self.calls
                .borrow_mut()
                .push(Call::Create(connection.clone()));
            Ok(Box::new(RecordingClient {
                calls: self.calls.clone(),
                fail_download: self.fail_download,
            }))
        }
    }

    #[async_trait(?Send)]
    impl GirderClient for RecordingClient {
        async fn authenticate(&mut self, method: &AuthMethod) -> Result<(), ClientError> {
            self.calls
                .borrow_mut()
                .push(Call::Authenticate(method.clone()));
            Ok(())
        }

        async fn upload(&mut self, request: &UploadRequest) -> Result<(), ClientError> {
            self.calls.borrow_mut().push(Call::Upload(request.clone()));
            Ok(())
        }

        async fn download_folder_recursive(
            &mut self,
            folder_id: &str,
            dest: &Path,
            sync: bool,
        ) -> Result<(), ClientError> {
            self.calls.borrow_mut().push(Call::Download {
                folder_id: folder_id.to_string(),
                dest: dest.to_path_buf(),
                sync,
            });
            if self.fail_download {
                return Err(ClientError::Api {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    message: "connection dropped".to_string(),
                });
            }
            Ok(())
        }

        async fn load_local_metadata(&mut self, dest: &Path) -> Result<(), ClientError> {
            self.calls
                .borrow_mut()
                .push(Call::LoadMetadata(dest.to_path_buf()));
            Ok(())
        }

        async fn save_local_metadata(&mut self, dest: &Path) -> Result<(), ClientError> {
            self.calls
                .borrow_mut()
                .push(Call::SaveMetadata(dest.to_path_buf()));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::recording::{Call, RecordingFactory};
    use super::*;

    #[tokio::test]
    async fn test_connect_uses_api_key_over_password() {
        let factory = RecordingFactory::new();
        let credentials = Credentials {
            username: Some("admin".to_string()),
            password: Some("hunter2".to_string()),
            api_key: Some("key-123".to_string()),
        };

        factory
            .connect(&ConnectionParameters::default(), &credentials)
            .await
            .unwrap();

        assert_eq!(
            factory.calls(),
            vec![
                Call::Create(ConnectionParameters::default()),
                Call::Authenticate(AuthMethod::ApiKey("key-123".to_string())),
            ]
        );
    }

    #[tokio::test]
    async fn test_connect_with_username_without_password_is_interactive() {
        let factory = RecordingFactory::new();
        let credentials = Credentials {
            username: Some("admin".to_string()),
            ..Default::default()
        };

        factory
            .connect(&ConnectionParameters::default(), &credentials)
            .await
            .unwrap();

        match factory.calls().as_slice() {
            [Call::Create(_), Call::Authenticate(method)] => {
                assert!(method.is_interactive());
            }
            calls => panic!("unexpected calls: {:?}", calls),
        }
    }

    #[tokio::test]
    async fn test_connect_without_credentials_stays_anonymous() {
        let factory = RecordingFactory::new();
        factory
            .connect(&ConnectionParameters::default(), &Credentials::default())
            .await
            .unwrap();

        assert_eq!(
            factory.calls(),
            vec![Call::Create(ConnectionParameters::default())]
        );
    }
}
