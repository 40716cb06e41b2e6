// rag_playground/src/extraction.rs
// Company detail extraction from free text.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PlaygroundError, Result};
use crate::llm::{ChatMessage, ChatModel};
use crate::postgres::{CompanyRepository, StoredCompany};

pub const FOUNDING_DATE_FORMAT: &str = "%Y-%m-%d";

/// Sample essay used when no input file is given.
pub const SAMPLE_ESSAY: &str = include_str!("../data/companies_essay.txt");

/// Company details as returned by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize,)]
pub struct CompanyInfo {
    pub company_name:  String,
    pub founding_date: String,
    pub founders:      Vec<String,>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize,)]
pub struct ExtractedCompanies {
    pub companies: Vec<CompanyInfo,>,
}

/// A row ready for the `company_details` table.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct CompanyDetail {
    pub company_name: String,
    pub founded_in:   NaiveDate,
    pub founded_by:   Vec<String,>,
}

impl CompanyInfo {
    pub fn to_detail(&self,) -> Result<CompanyDetail,> {
        let founded_in = NaiveDate::parse_from_str(self.founding_date.trim(), FOUNDING_DATE_FORMAT,)
            .map_err(|e| {
                PlaygroundError::ExtractionError(format!(
                    "founding date '{}' of {} is not YYYY-MM-DD: {}",
                    self.founding_date, self.company_name, e
                ),)
            },)?;

        Ok(CompanyDetail {
            company_name: self.company_name.clone(),
            founded_in,
            founded_by: self.founders.clone(),
        },)
    }
}

const FORMAT_INSTRUCTIONS: &str = r#"Respond with a single JSON object matching this schema and nothing else:
{"companies": [{"company_name": string, "founding_date": string (YYYY-MM-DD), "founders": [string]}]}
Use {"companies": []} when the text mentions no company."#;

pub fn build_extraction_prompt(text: &str,) -> String {
    format!(
        "Extract company information from the following text. For each company mentioned, identify:
1. Company name (full official name)
2. Founding date (The date the company was founded, in YYYY-MM-DD format)
3. Founders (list of individual founder names)

**IMPORTANT**: In certain scenarios, the founding date information may not be available. To handle such cases:
  - If only the year is provided, default the date to **January 1st** of that year.
  - If the year and month are provided, default the date to the **1st day** of the specified month.
  - If you cannot deduce the date, DO NOT include that company in the output.

Text to analyze: ```{text}```

Output format Instruction: ```{FORMAT_INSTRUCTIONS}```"
    )
}

/// Splits text on blank lines, dropping empty paragraphs.
pub fn split_paragraphs(text: &str,) -> Vec<&str,> {
    text.split("\n\n",)
        .map(str::trim,)
        .filter(|p| !p.is_empty(),)
        .collect()
}

pub fn parse_extraction(value: serde_json::Value,) -> Result<ExtractedCompanies,> {
    serde_json::from_value(value,).map_err(|e| {
        PlaygroundError::ExtractionError(format!("model output does not match the company schema: {}", e),)
    },)
}

pub struct Extractor<'a,> {
    chat: &'a dyn ChatModel,
}

impl<'a,> Extractor<'a,> {
    pub fn new(chat: &'a dyn ChatModel,) -> Self {
        Self { chat, }
    }

    /// Extracts companies from one piece of text with a single model call.
    pub async fn extract_text(&self, text: &str,) -> Result<ExtractedCompanies,> {
        let reply = self
            .chat
            .complete_json(&[ChatMessage::user(build_extraction_prompt(text,),)],)
            .await?;
        parse_extraction(reply,)
    }

    /// Extracts companies paragraph by paragraph. A paragraph whose call or
    /// parse fails is logged and skipped.
    pub async fn extract(&self, essay: &str,) -> Vec<CompanyInfo,> {
        let mut all_companies = Vec::new();

        for paragraph in split_paragraphs(essay,) {
            match self.extract_text(paragraph,).await {
                Ok(result,) => {
                    for company in result.companies {
                        info!("Found: {} ({})", company.company_name, company.founding_date);
                        all_companies.push(company,);
                    }
                },
                Err(e,) => warn!("Error processing paragraph: {}", e),
            }
        }

        info!("Total companies extracted: {}", all_companies.len());
        all_companies
    }
}

/// Extracts companies from `essay`, stores them and returns every stored row.
/// Returns an empty list when nothing was extracted.
pub async fn extract_and_store(
    essay: &str,
    extractor: &Extractor<'_,>,
    store: &dyn CompanyRepository,
) -> Result<Vec<StoredCompany,>,> {
    let companies = extractor.extract(essay,).await;
    if companies.is_empty() {
        return Ok(Vec::new(),);
    }

    let details = companies
        .iter()
        .map(CompanyInfo::to_detail,)
        .collect::<Result<Vec<_,>,>>()?;

    store.ensure_schema().await?;
    let inserted = store.insert_companies(&details,).await?;
    info!("Successfully inserted {} companies into database", inserted);

    store.list_companies().await
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    struct ScriptedChat {
        replies: Mutex<Vec<Result<serde_json::Value,>,>,>,
    }

    impl ScriptedChat {
        fn new(mut replies: Vec<Result<serde_json::Value,>,>,) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies,),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedChat {
        async fn complete(&self, _messages: &[ChatMessage],) -> Result<String,> {
            Err(PlaygroundError::Other("not scripted".into(),),)
        }

        async fn complete_json(&self, _messages: &[ChatMessage],) -> Result<serde_json::Value,> {
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(json!({"companies": []}),),)
        }
    }

    #[derive(Default,)]
    struct MemoryRepository {
        rows: Mutex<Vec<StoredCompany,>,>,
    }

    #[async_trait]
    impl CompanyRepository for MemoryRepository {
        async fn ensure_schema(&self,) -> Result<(),> {
            Ok((),)
        }

        async fn insert_companies(&self, companies: &[CompanyDetail],) -> Result<u64,> {
            let mut rows = self.rows.lock().unwrap();
            for c in companies {
                let id = rows.len() as i32 + 1;
                rows.push(StoredCompany {
                    id,
                    company_name: c.company_name.clone(),
                    founded_in: c.founded_in,
                    founded_by: c.founded_by.clone(),
                    created_at: Utc::now(),
                },);
            }
            Ok(companies.len() as u64,)
        }

        async fn list_companies(&self,) -> Result<Vec<StoredCompany,>,> {
            let mut rows = self.rows.lock().unwrap().clone();
            rows.sort_by_key(|r| r.founded_in,);
            Ok(rows,)
        }
    }

    #[test]
    fn paragraphs_split_on_blank_lines() {
        let text = "\n    First paragraph.\n\n    \n\n    Second\n    paragraph.\n";
        assert_eq!(split_paragraphs(text,), vec!["First paragraph.", "Second\n    paragraph."]);
    }

    #[test]
    fn prompt_embeds_text_and_defaulting_rules() {
        let prompt = build_extraction_prompt("Apple Inc. was founded in 1976.",);
        assert!(prompt.contains("```Apple Inc. was founded in 1976.```",));
        assert!(prompt.contains("default the date to **January 1st**",));
        assert!(prompt.contains("\"founding_date\"",));
    }

    #[test]
    fn schema_mismatch_is_extraction_error() {
        let err = parse_extraction(json!({"companies": [{"company_name": "Sony"}]}),).unwrap_err();
        assert!(matches!(err, PlaygroundError::ExtractionError(_)));
    }

    #[test]
    fn founding_date_must_be_iso() {
        let info = CompanyInfo {
            company_name:  "Stripe, Inc.".into(),
            founding_date: "2010-01-01".into(),
            founders:      vec!["Patrick Collison".into(), "John Collison".into()],
        };
        let detail = info.to_detail().unwrap();
        assert_eq!(detail.founded_in, NaiveDate::from_ymd_opt(2010, 1, 1).unwrap());

        let bad = CompanyInfo {
            founding_date: "August 2008".into(),
            ..info
        };
        assert!(matches!(bad.to_detail(), Err(PlaygroundError::ExtractionError(_))));
    }

    #[tokio::test]
    async fn failing_paragraph_is_skipped() {
        let chat = ScriptedChat::new(vec![
            Ok(json!({"companies": [{
                "company_name": "Sony Corporation",
                "founding_date": "1946-05-07",
                "founders": ["Masaru Ibuka", "Akio Morita"]
            }]}),),
            Err(PlaygroundError::ExtractionError("model reply is not valid JSON".into(),),),
            Ok(json!({"companies": [{
                "company_name": "The Coca-Cola Company",
                "founding_date": "1886-05-08",
                "founders": ["John Stith Pemberton"]
            }]}),),
        ],);

        let companies = Extractor::new(&chat,).extract("Sony...\n\nbroken\n\nCoca-Cola...",).await;
        let names: Vec<_,> = companies.iter().map(|c| c.company_name.as_str(),).collect();
        assert_eq!(names, vec!["Sony Corporation", "The Coca-Cola Company"]);
    }

    #[tokio::test]
    async fn stored_rows_come_back_ordered_by_founding_date() {
        let chat = ScriptedChat::new(vec![Ok(json!({"companies": [
            {"company_name": "Sony Corporation", "founding_date": "1946-05-07", "founders": ["Masaru Ibuka"]},
            {"company_name": "The Coca-Cola Company", "founding_date": "1886-05-08", "founders": ["John Stith Pemberton"]}
        ]}),)],);
        let repo = MemoryRepository::default();

        let stored = extract_and_store("One paragraph.", &Extractor::new(&chat,), &repo,)
            .await
            .unwrap();

        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].company_name, "The Coca-Cola Company");
        assert_eq!(stored[1].founded_by, vec!["Masaru Ibuka".to_string()]);
    }

    #[tokio::test]
    async fn nothing_extracted_stores_nothing() {
        let chat = ScriptedChat::new(vec![],);
        let repo = MemoryRepository::default();

        let stored = extract_and_store("No companies here.", &Extractor::new(&chat,), &repo,)
            .await
            .unwrap();

        assert!(stored.is_empty());
        assert!(repo.rows.lock().unwrap().is_empty());
    }

    #[test]
    fn sample_essay_has_many_paragraphs() {
        assert!(split_paragraphs(SAMPLE_ESSAY,).len() > 10);
    }
}
