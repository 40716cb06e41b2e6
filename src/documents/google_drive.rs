// rag_playground/src/documents/google_drive.rs
// Loads Google Drive files with a service-account key.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::docx::docx_bytes_to_text;
use super::pdf::pdf_bytes_to_pages;
use super::{Document, DocumentLoader, DocumentMetadata, SourceType};
use crate::config::GoogleDriveSettings;
use crate::error::{PlaygroundError, Result};

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";
const GOOGLE_DOC_MIME: &str = "application/vnd.google-apps.document";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Deserialize,)]
struct ServiceAccountKey {
    client_email: String,
    private_key:  SecretString,
    #[serde(default = "default_token_uri")]
    token_uri:    String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

#[derive(Serialize,)]
struct Claims<'a,> {
    iss:   &'a str,
    scope: &'a str,
    aud:   &'a str,
    iat:   i64,
    exp:   i64,
}

#[derive(Deserialize,)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize,)]
#[serde(rename_all = "camelCase")]
struct FileInfo {
    id:        String,
    name:      String,
    mime_type: String,
}

/// How a Drive file's text is retrieved.
#[derive(Debug, PartialEq, Eq,)]
pub enum ContentKind {
    /// Native Google Doc, exported as plain text.
    GoogleDoc,
    /// Uploaded Word file, downloaded and unzipped.
    Docx,
    Pdf,
    Text,
    Unsupported,
}

impl ContentKind {
    pub fn from_mime(mime_type: &str,) -> Self {
        if mime_type == GOOGLE_DOC_MIME {
            ContentKind::GoogleDoc
        } else if mime_type == DOCX_MIME {
            ContentKind::Docx
        } else if mime_type.contains("pdf",) {
            ContentKind::Pdf
        } else if mime_type.starts_with("text/",) {
            ContentKind::Text
        } else {
            ContentKind::Unsupported
        }
    }
}

pub struct GoogleDriveLoader {
    client:   Client,
    key:      ServiceAccountKey,
    api_base: String,
    file_ids: Vec<String,>,
}

impl GoogleDriveLoader {
    pub fn new(settings: &GoogleDriveSettings,) -> Result<Self,> {
        let raw = std::fs::read_to_string(&settings.credentials_path,).map_err(|e| {
            PlaygroundError::ConfigurationError(format!(
                "Failed to read service account key {}: {}",
                settings.credentials_path.display(),
                e
            ),)
        },)?;
        let key: ServiceAccountKey = serde_json::from_str(&raw,).map_err(|e| {
            PlaygroundError::ConfigurationError(format!("Invalid service account key: {}", e),)
        },)?;

        Ok(Self {
            client: Client::new(),
            key,
            api_base: DRIVE_API_BASE.to_string(),
            file_ids: settings.file_ids.clone(),
        },)
    }

    pub fn with_api_base(mut self, api_base: impl Into<String,>,) -> Self {
        self.api_base = api_base.into().trim_end_matches('/',).to_string();
        self
    }

    pub fn with_token_uri(mut self, token_uri: impl Into<String,>,) -> Self {
        self.key.token_uri = token_uri.into();
        self
    }

    /// Exchanges a signed JWT assertion for an OAuth access token.
    async fn access_token(&self,) -> Result<String,> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss:   &self.key.client_email,
            scope: DRIVE_SCOPE,
            aud:   &self.key.token_uri,
            iat:   now,
            exp:   now + TOKEN_LIFETIME_SECS,
        };
        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.expose_secret().as_bytes(),)
            .map_err(|e| PlaygroundError::ConfigurationError(format!("Invalid service account private key: {}", e),),)?;
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256,), &claims, &signing_key,)
            .map_err(|e| PlaygroundError::Other(format!("Failed to sign token request: {}", e),),)?;

        let response = self
            .client
            .post(&self.key.token_uri,)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer",),
                ("assertion", assertion.as_str(),),
            ],)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PlaygroundError::ApiError { status, body, },);
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token,)
    }

    async fn get(&self, token: &str, url: String, query: &[(&str, &str,)],) -> Result<reqwest::Response,> {
        let response = self.client.get(url,).bearer_auth(token,).query(query,).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PlaygroundError::ApiError { status, body, },);
        }
        Ok(response,)
    }

    async fn load_file(&self, token: &str, file_id: &str,) -> Result<Vec<Document,>,> {
        let info: FileInfo = self
            .get(
                token,
                format!("{}/files/{}", self.api_base, file_id),
                &[("fields", "id,name,mimeType",),],
            )
            .await?
            .json()
            .await?;

        let metadata = {
            let mut m = DocumentMetadata::new("google_drive", info.name.clone(), SourceType::GoogleDrive,);
            m.id = Some(info.id.clone(),);
            m.mime_type = Some(info.mime_type.clone(),);
            m
        };
        let file_url = format!("{}/files/{}", self.api_base, info.id);

        match ContentKind::from_mime(&info.mime_type,) {
            ContentKind::GoogleDoc => {
                let text = self
                    .get(token, format!("{}/export", file_url), &[("mimeType", "text/plain",),],)
                    .await?
                    .text()
                    .await?;
                Ok(vec![Document::new(text.trim_start_matches('\u{feff}',), metadata,)],)
            },
            ContentKind::Text => {
                let text = self.get(token, file_url, &[("alt", "media",),],).await?.text().await?;
                Ok(vec![Document::new(text, metadata,)],)
            },
            ContentKind::Docx => {
                let bytes = self.get(token, file_url, &[("alt", "media",),],).await?.bytes().await?;
                let text = docx_bytes_to_text(bytes.to_vec(),).await?;
                Ok(vec![Document::new(text, metadata,)],)
            },
            ContentKind::Pdf => {
                let bytes = self.get(token, file_url, &[("alt", "media",),],).await?.bytes().await?;
                let pages = pdf_bytes_to_pages(bytes.to_vec(),).await?;
                Ok(pages
                    .into_iter()
                    .map(|(page, text,)| {
                        let mut m = metadata.clone();
                        m.page = Some(page,);
                        Document::new(text, m,)
                    },)
                    .collect(),)
            },
            ContentKind::Unsupported => Err(PlaygroundError::UnsupportedFormat(format!(
                "{} ({})",
                info.name, info.mime_type
            ),),),
        }
    }
}

#[async_trait]
impl DocumentLoader for GoogleDriveLoader {
    fn name(&self,) -> &str {
        "Google Drive"
    }

    async fn load(&self,) -> Result<Vec<Document,>,> {
        let token = self.access_token().await?;

        let mut documents = Vec::new();
        for file_id in &self.file_ids {
            match self.load_file(&token, file_id,).await {
                Ok(docs,) => {
                    info!("Loaded Google Drive file {} ({} parts)", file_id, docs.len());
                    documents.extend(docs,);
                },
                Err(e,) => warn!("Failed to load Google Drive file {}: {}", file_id, e),
            }
        }
        Ok(documents,)
    }
}
