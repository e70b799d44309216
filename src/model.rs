//! Data model for girder-cli.
//!
//! The first half of this module holds the values the command line produces
//! (connection parameters, credentials, parent types, upload requests). The
//! second half holds the documents exchanged with the Girder REST API.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use strum::{Display, EnumString};
use thiserror::Error;
use url::Url;

pub const DEFAULT_SCHEME: &str = "http";
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_API_ROOT: &str = "/api/v1";

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid Girder API URL {url:?}: {cause}")]
    InvalidEndpoint {
        url: String,
        cause: url::ParseError,
    },
}

/// Identifies the remote Girder instance.
///
/// Either `api_url` is set, or the endpoint is assembled from the
/// `(scheme, host, port, api_root)` tuple. All fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl ConnectionParameters {
    /// True when no endpoint field is set.
    pub fn is_empty(&self) -> bool {
        self.scheme.is_none()
            && self.host.is_none()
            && self.port.is_none()
            && self.api_root.is_none()
            && self.api_url.is_none()
    }

    /// Use `defaults` only when nothing is set here. The parameters are taken
    /// as a whole so an explicit host is never paired with a default `api_url`.
    pub fn or(self, defaults: &ConnectionParameters) -> ConnectionParameters {
        if self.is_empty() {
            defaults.clone()
        } else {
            self
        }
    }

    /// Resolve the base URL of the REST API.
    ///
    /// `api_url` wins when present. Otherwise the URL is derived from scheme
    /// (default `http`), host (default `localhost`), port (default 443 for
    /// https, 80 otherwise) and API root (default `/api/v1`). The result always
    /// ends with a `/` so relative paths can be joined onto it.
    pub fn endpoint(&self) -> Result<Url, ModelError> {
        let mut base = match self.api_url.as_deref().filter(|url| !url.is_empty()) {
            Some(api_url) => api_url.to_string(),
            None => {
                let scheme = self.scheme.as_deref().unwrap_or(DEFAULT_SCHEME);
                let host = self.host.as_deref().unwrap_or(DEFAULT_HOST);
                let port = self
                    .port
                    .unwrap_or(if scheme == "https" { 443 } else { 80 });
                let api_root = match self.api_root.as_deref() {
                    None | Some("") => DEFAULT_API_ROOT.to_string(),
                    Some(root) if root.starts_with('/') => root.to_string(),
                    Some(root) => format!("/{}", root),
                };
                format!("{}://{}:{}{}", scheme, host, port, api_root)
            }
        };

        if !base.ends_with('/') {
            base.push('/');
        }

        Url::parse(&base).map_err(|cause| ModelError::InvalidEndpoint { url: base, cause })
    }
}

/// The credentials given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
}

/// How a client should authenticate, if at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    ApiKey(String),
    /// Username and password login. When `password` is `None` the client
    /// prompts for it.
    Password {
        username: String,
        password: Option<String>,
    },
}

impl AuthMethod {
    pub fn is_interactive(&self) -> bool {
        matches!(self, AuthMethod::Password { password: None, .. })
    }
}

impl Credentials {
    /// Pick the authentication mode. An API key takes precedence over a
    /// username; empty values count as absent. `None` means the client stays
    /// anonymous.
    pub fn auth_method(&self) -> Option<AuthMethod> {
        if let Some(api_key) = self.api_key.as_ref().filter(|key| !key.is_empty()) {
            return Some(AuthMethod::ApiKey(api_key.clone()));
        }

        self.username
            .as_ref()
            .filter(|username| !username.is_empty())
            .map(|username| AuthMethod::Password {
                username: username.clone(),
                password: self.password.clone(),
            })
    }
}

/// Type of a Girder container that can receive uploads or anchor a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ParentType {
    Folder,
    Collection,
    User,
}

/// Parameters of a recursive upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub local_folder: PathBuf,
    pub parent_id: String,
    pub parent_type: ParentType,
    pub leaf_folders_as_items: bool,
    pub reuse_existing: bool,
    pub blacklist: Vec<String>,
    pub dry_run: bool,
}

impl UploadRequest {
    pub fn is_blacklisted(&self, name: &str) -> bool {
        self.blacklist.iter().any(|entry| entry == name)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthToken {
    pub token: String,
    #[serde(default)]
    pub expires: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthenticationResponse {
    #[serde(rename = "authToken")]
    pub auth_token: AuthToken,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FolderDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

/// An item as returned by the server. The raw document is kept because the
/// local sync metadata stores and compares it verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDocument {
    pub id: String,
    pub name: String,
    pub raw: Value,
}

impl<'de> Deserialize<'de> for ItemDocument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Fields {
            #[serde(rename = "_id")]
            id: String,
            name: String,
        }

        let raw = Value::deserialize(deserializer)?;
        let fields = Fields::deserialize(&raw).map_err(serde::de::Error::custom)?;
        Ok(ItemDocument {
            id: fields.id,
            name: fields.name,
            raw,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

/// An upload in progress, as returned by `POST file`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadDocument {
    #[serde(rename = "_id")]
    pub id: String,
}

/// The body Girder sends with an error status.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GirderErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_endpoint_prefers_api_url() {
        let parameters = ConnectionParameters {
            scheme: Some("https".to_string()),
            host: Some("ignored.example.com".to_string()),
            port: Some(8443),
            api_root: Some("/other".to_string()),
            api_url: Some("https://data.kitware.com/api/v1".to_string()),
        };
        assert_eq!(
            parameters.endpoint().unwrap().as_str(),
            "https://data.kitware.com/api/v1/"
        );
    }

    #[test]
    fn test_endpoint_from_parts() {
        let parameters = ConnectionParameters {
            scheme: Some("https".to_string()),
            host: Some("girder.example.com".to_string()),
            port: Some(8443),
            api_root: Some("api/v1".to_string()),
            api_url: None,
        };
        assert_eq!(
            parameters.endpoint().unwrap().as_str(),
            "https://girder.example.com:8443/api/v1/"
        );
    }

    #[test]
    fn test_endpoint_defaults() {
        let endpoint = ConnectionParameters::default().endpoint().unwrap();
        assert_eq!(endpoint.scheme(), "http");
        assert_eq!(endpoint.host_str(), Some("localhost"));
        assert_eq!(endpoint.port_or_known_default(), Some(80));
        assert_eq!(endpoint.path(), "/api/v1/");
    }

    #[test]
    fn test_endpoint_https_defaults_to_443() {
        let parameters = ConnectionParameters {
            scheme: Some("https".to_string()),
            host: Some("girder.example.com".to_string()),
            ..Default::default()
        };
        let endpoint = parameters.endpoint().unwrap();
        assert_eq!(endpoint.port_or_known_default(), Some(443));
        assert_eq!(endpoint.as_str(), "https://girder.example.com/api/v1/");
    }

    #[test]
    fn test_endpoint_rejects_garbage() {
        let parameters = ConnectionParameters {
            api_url: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            parameters.endpoint(),
            Err(ModelError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_connection_parameters_or_keeps_explicit_values() {
        let explicit = ConnectionParameters {
            host: Some("cli.example.com".to_string()),
            ..Default::default()
        };
        let defaults = ConnectionParameters {
            host: Some("config.example.com".to_string()),
            port: Some(8080),
            ..Default::default()
        };
        let merged = explicit.clone().or(&defaults);
        assert_eq!(merged, explicit);
        assert_eq!(merged.port, None);
    }

    #[test]
    fn test_explicit_host_overrides_default_api_url() {
        let explicit = ConnectionParameters {
            host: Some("cli.example.com".to_string()),
            ..Default::default()
        };
        let defaults = ConnectionParameters {
            api_url: Some("https://config.example.com/api/v1".to_string()),
            ..Default::default()
        };
        assert_eq!(
            explicit.or(&defaults).endpoint().unwrap().as_str(),
            "http://cli.example.com/api/v1/"
        );
    }

    #[test]
    fn test_empty_parameters_fall_back_to_defaults() {
        let defaults = ConnectionParameters {
            api_url: Some("https://config.example.com/api/v1".to_string()),
            ..Default::default()
        };
        assert_eq!(ConnectionParameters::default().or(&defaults), defaults);
    }

    #[test]
    fn test_api_key_takes_precedence() {
        let credentials = Credentials {
            username: Some("admin".to_string()),
            password: Some("secret".to_string()),
            api_key: Some("key".to_string()),
        };
        assert_eq!(
            credentials.auth_method(),
            Some(AuthMethod::ApiKey("key".to_string()))
        );
    }

    #[test]
    fn test_missing_password_is_interactive() {
        let credentials = Credentials {
            username: Some("admin".to_string()),
            ..Default::default()
        };
        let method = credentials.auth_method().unwrap();
        assert!(method.is_interactive());
    }

    #[test]
    fn test_no_credentials_means_anonymous() {
        assert_eq!(Credentials::default().auth_method(), None);

        let empty = Credentials {
            username: Some(String::new()),
            password: None,
            api_key: Some(String::new()),
        };
        assert_eq!(empty.auth_method(), None);
    }

    #[test]
    fn test_parent_type_parsing() {
        assert_eq!(ParentType::from_str("folder").unwrap(), ParentType::Folder);
        assert_eq!(
            ParentType::from_str("collection").unwrap(),
            ParentType::Collection
        );
        assert_eq!(ParentType::User.to_string(), "user");
        assert!(ParentType::from_str("item").is_err());
    }

    #[test]
    fn test_item_document_keeps_raw_json() {
        let json = r#"{"_id": "abc", "name": "scan.tif", "updated": "2024-01-01", "size": 12}"#;
        let item: ItemDocument = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, "abc");
        assert_eq!(item.name, "scan.tif");
        assert_eq!(item.raw["size"], 12);
    }
}
