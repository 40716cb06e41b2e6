// rag_playground/src/documents/confluence.rs
// Loads Confluence pages through the REST content API.

use std::borrow::Cow;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Node};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::info;
use url::Url;

use super::{Document, DocumentLoader, DocumentMetadata, SourceType};
use crate::config::ConfluenceSettings;
use crate::error::{PlaygroundError, Result};

pub struct ConfluenceLoader {
    client:    Client,
    base_url:  String,
    username:  String,
    api_token: SecretString,
    page_ids:  Vec<String,>,
}

impl ConfluenceLoader {
    pub fn new(settings: &ConfluenceSettings,) -> Result<Self,> {
        let page_id = page_id_from_url(&settings.page_url,)?;
        Ok(Self {
            client:    Client::new(),
            base_url:  settings.base_url.trim_end_matches('/',).to_string(),
            username:  settings.username.clone(),
            api_token: settings.api_token.clone(),
            page_ids:  vec![page_id],
        },)
    }

    async fn load_page(&self, page_id: &str,) -> Result<Document,> {
        let response = self
            .client
            .get(format!("{}/rest/api/content/{}", self.base_url, page_id),)
            .query(&[("expand", "body.storage,version",),],)
            .basic_auth(&self.username, Some(self.api_token.expose_secret(),),)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PlaygroundError::ApiError { status, body, },);
        }

        let page: ContentResponse = response.json().await?;
        let text = html_to_text(&page.body.storage.value,);

        let mut metadata = DocumentMetadata::new(
            format!("{}/pages/{}", self.base_url, page.id),
            page.title,
            SourceType::Confluence,
        );
        metadata.id = Some(page.id,);

        Ok(Document::new(text, metadata,),)
    }
}

#[derive(Deserialize,)]
struct ContentResponse {
    id:    String,
    title: String,
    body:  ContentBody,
}

#[derive(Deserialize,)]
struct ContentBody {
    storage: StorageValue,
}

#[derive(Deserialize,)]
struct StorageValue {
    value: String,
}

#[async_trait]
impl DocumentLoader for ConfluenceLoader {
    fn name(&self,) -> &str {
        "Confluence"
    }

    async fn load(&self,) -> Result<Vec<Document,>,> {
        let mut documents = Vec::with_capacity(self.page_ids.len(),);
        for page_id in &self.page_ids {
            let doc = self.load_page(page_id,).await?;
            info!("Loaded Confluence page '{}'", doc.metadata.title);
            documents.push(doc,);
        }
        Ok(documents,)
    }
}

/// Extracts the numeric page id that follows `/pages/` in a Confluence URL.
pub fn page_id_from_url(page_url: &str,) -> Result<String,> {
    let url = Url::parse(page_url,).map_err(|e| {
        PlaygroundError::ConfigurationError(format!("Invalid Confluence page URL '{}': {}", page_url, e),)
    },)?;

    let id = url
        .path_segments()
        .into_iter()
        .flatten()
        .skip_while(|s| *s != "pages",)
        .nth(1,);

    match id {
        Some(id,) if !id.is_empty() => Ok(id.to_string(),),
        _ => Err(PlaygroundError::ConfigurationError(format!(
            "No page id after /pages/ in '{}'",
            page_url
        ),),),
    }
}

const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";

const BLOCK_TAGS: &[&str] = &[
    "p",
    "div",
    "li",
    "ul",
    "ol",
    "tr",
    "table",
    "hr",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "blockquote",
    "pre",
    "ac:structured-macro",
    "ac:plain-text-body",
    "ac:rich-text-body",
];

const CELL_TAGS: &[&str] = &["td", "th",];

/// Macro parameters (code language, panel colour) are not page text.
const SKIPPED_TAGS: &[&str] = &["ac:parameter", "script", "style",];

/// Converts Confluence storage-format XHTML to plain text, one paragraph per
/// block element.
pub fn html_to_text(html: &str,) -> String {
    let fragment = Html::parse_fragment(&escape_cdata(html,),);
    let mut raw = String::with_capacity(html.len(),);
    collect_text(fragment.root_element(), &mut raw,);

    let mut out = String::new();
    let mut blank_run = 0;
    for line in raw.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_,>>().join(" ",);
        if collapsed.is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if blank_run > 0 { "\n\n" } else { "\n" },);
        }
        out.push_str(&collapsed,);
        blank_run = 0;
    }
    out
}

fn collect_text(element: ElementRef<'_,>, out: &mut String,) {
    for child in element.children() {
        match child.value() {
            Node::Text(text,) => out.push_str(text,),
            Node::Element(el,) => {
                let name = el.name();
                if SKIPPED_TAGS.contains(&name,) {
                    continue;
                }
                if name == "br" {
                    out.push('\n',);
                    continue;
                }

                let block = BLOCK_TAGS.contains(&name,);
                if block {
                    out.push('\n',);
                } else if CELL_TAGS.contains(&name,) {
                    out.push(' ',);
                }
                if let Some(child,) = ElementRef::wrap(child,) {
                    collect_text(child, out,);
                }
                if block {
                    out.push('\n',);
                }
            },
            _ => {},
        }
    }
}

/// Storage format wraps code and plain-text macro bodies in CDATA, which an
/// HTML parser reads as a bogus comment. Re-encode those bodies as escaped
/// text before parsing.
fn escape_cdata(storage: &str,) -> Cow<'_, str,> {
    if !storage.contains(CDATA_OPEN,) {
        return Cow::Borrowed(storage,);
    }

    let mut out = String::with_capacity(storage.len(),);
    let mut rest = storage;
    while let Some(start,) = rest.find(CDATA_OPEN,) {
        out.push_str(&rest[..start],);
        let body = &rest[start + CDATA_OPEN.len()..];
        let end = body.find(CDATA_CLOSE,).unwrap_or(body.len(),);
        for ch in body[..end].chars() {
            match ch {
                '&' => out.push_str("&amp;",),
                '<' => out.push_str("&lt;",),
                '>' => out.push_str("&gt;",),
                _ => out.push(ch,),
            }
        }
        rest = body.get(end + CDATA_CLOSE.len()..,).unwrap_or("",);
    }
    out.push_str(rest,);
    Cow::Owned(out,)
}
