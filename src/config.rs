// rag_playground/src/config.rs
// Resolved runtime settings built from CLI arguments and the environment.

use std::path::PathBuf;

use secrecy::SecretString;
use tracing::{debug, warn};

use crate::cli::{ConfluenceArgs, GoogleDriveArgs, OpenAIArgs, PostgresArgs};
use crate::error::{PlaygroundError, Result};

/// Loads `.env` from the working directory. A missing file is fine.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path,) => debug!("Loaded environment from {}", path.display()),
        Err(e,) if e.not_found() => {},
        Err(e,) => warn!("Failed to read .env: {}", e),
    }
}

#[derive(Debug, Clone,)]
pub struct OpenAISettings {
    pub api_key:         SecretString,
    pub base_url:        String,
    pub chat_model:      String,
    pub embedding_model: String,
}

impl TryFrom<&OpenAIArgs,> for OpenAISettings {
    type Error = PlaygroundError;

    /// Fails when no API key was given on the command line or in `OPENAI_API_KEY`.
    fn try_from(args: &OpenAIArgs,) -> Result<Self,> {
        let api_key = args
            .openai_api_key
            .as_deref()
            .map(str::trim,)
            .filter(|key| !key.is_empty(),)
            .ok_or_else(|| {
                PlaygroundError::ConfigurationError(
                    "OPENAI_API_KEY is not set; pass --openai-api-key or add it to .env".to_string(),
                )
            },)?;

        Ok(Self {
            api_key:         SecretString::new(api_key.to_string(),),
            base_url:        args.openai_base_url.clone(),
            chat_model:      args.llm_model.clone(),
            embedding_model: args.embedding_model.clone(),
        },)
    }
}

#[derive(Debug, Clone,)]
pub struct PostgresSettings {
    pub host:     String,
    pub port:     u16,
    pub dbname:   String,
    pub user:     String,
    pub password: SecretString,
}

impl From<&PostgresArgs,> for PostgresSettings {
    fn from(args: &PostgresArgs,) -> Self {
        Self {
            host:     args.postgres_host.clone(),
            port:     args.postgres_port,
            dbname:   args.postgres_db.clone(),
            user:     args.postgres_user.clone(),
            password: SecretString::new(args.postgres_password.clone(),),
        }
    }
}

#[derive(Debug, Clone,)]
pub struct ConfluenceSettings {
    pub base_url:  String,
    pub username:  String,
    pub api_token: SecretString,
    pub page_url:  String,
}

impl ConfluenceArgs {
    /// Returns `None` unless every Confluence setting is present.
    pub fn settings(&self,) -> Option<ConfluenceSettings,> {
        match (
            &self.confluence_base_url,
            &self.confluence_username,
            &self.confluence_api_token,
            &self.code_of_conduct_url,
        ) {
            (Some(base_url,), Some(username,), Some(token,), Some(page_url,),) => {
                Some(ConfluenceSettings {
                    base_url:  base_url.clone(),
                    username:  username.clone(),
                    api_token: SecretString::new(token.clone(),),
                    page_url:  page_url.clone(),
                },)
            },
            _ => None,
        }
    }
}

#[derive(Debug, Clone,)]
pub struct GoogleDriveSettings {
    pub credentials_path: PathBuf,
    pub file_ids:         Vec<String,>,
}

impl GoogleDriveArgs {
    /// Returns `None` when no Drive file ids are configured.
    pub fn settings(&self,) -> Option<GoogleDriveSettings,> {
        let file_ids: Vec<String,> = [&self.anti_harassment_file_id, &self.nomination_guideline_doc_id,]
            .into_iter()
            .flatten()
            .filter(|id| !id.trim().is_empty(),)
            .cloned()
            .collect();

        if file_ids.is_empty() {
            return None;
        }

        Some(GoogleDriveSettings {
            credentials_path: self.google_credentials.clone(),
            file_ids,
        },)
    }
}
