//! Gemini-backed invoice drafter.
//!
//! Calls the Gemini REST `generateContent` endpoint with a single function
//! declaration (`generate_invoice`) and forced function calling, so the model
//! must answer with structured invoice arguments rather than prose.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::draft::{DraftError, DraftItem, InvoiceDraft};
use crate::drafter::InvoiceDrafter;

const DEFAULT_MODEL: &str = "gemini-2.0-flash-001";

pub struct GeminiDrafter {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiDrafter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the endpoint (tests point this at a local server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request_body(prompt: &str) -> serde_json::Value {
        json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "toolConfig": {
                "functionCallingConfig": {
                    "mode": "ANY",
                    "allowedFunctionNames": ["generate_invoice"]
                }
            },
            "tools": [{
                "functionDeclarations": [{
                    "name": "generate_invoice",
                    "description": "Generates a detailed invoice in JSON format",
                    "parameters": {
                        "type": "OBJECT",
                        "properties": {
                            "clientName": { "type": "STRING" },
                            "clientEmail": { "type": "STRING" },
                            "clientAddress": { "type": "STRING" },
                            "items": {
                                "type": "ARRAY",
                                "items": {
                                    "type": "OBJECT",
                                    "properties": {
                                        "description": { "type": "STRING" },
                                        "quantity": { "type": "NUMBER" },
                                        "unitPrice": { "type": "NUMBER" },
                                        "amount": { "type": "NUMBER" }
                                    },
                                    "required": ["description", "quantity", "unitPrice", "amount"]
                                }
                            },
                            "notes": { "type": "STRING" },
                            "terms": { "type": "STRING" },
                            "dueDate": { "type": "STRING" }
                        },
                        "required": ["clientName", "clientEmail", "items", "dueDate"]
                    }
                }]
            }]
        })
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(rename = "functionCall")]
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    args: serde_json::Value,
}

/// Arguments of the `generate_invoice` function call, in the model's wire
/// casing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvoiceArgs {
    client_name: String,
    client_email: String,
    #[serde(default)]
    client_address: Option<String>,
    items: Vec<ItemArgs>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    terms: Option<String>,
    /// e.g. "2025-05-10"
    due_date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemArgs {
    description: String,
    quantity: f64,
    unit_price: f64,
    amount: f64,
}

fn args_to_draft(args: InvoiceArgs) -> Result<InvoiceDraft, DraftError> {
    let due_date = parse_due_date(&args.due_date)?;

    let items = args
        .items
        .into_iter()
        .map(|i| DraftItem {
            description: i.description,
            quantity: (i.quantity.max(1.0)) as u32,
            unit_price: i.unit_price,
            amount: i.amount,
        })
        .collect();

    Ok(InvoiceDraft {
        client_name: args.client_name,
        client_email: args.client_email,
        client_address: args.client_address,
        items,
        notes: args.notes,
        terms: args.terms,
        due_date,
    })
}

fn parse_due_date(s: &str) -> Result<DateTime<Utc>, DraftError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|d| {
            d.and_hms_opt(0, 0, 0)
                .unwrap_or_default()
                .and_utc()
        })
        .map_err(|e| DraftError::Malformed(format!("unparseable due date {s:?}: {e}")))
}

#[async_trait]
impl InvoiceDrafter for GeminiDrafter {
    async fn draft(&self, prompt: &str) -> Result<InvoiceDraft, DraftError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .http
            .post(&url)
            .json(&Self::request_body(prompt))
            .send()
            .await
            .map_err(|e| DraftError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DraftError::Upstream(format!(
                "gemini returned {}",
                response.status()
            )));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| DraftError::Malformed(e.to_string()))?;

        let call = body
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.function_call)
            .find(|c| c.name == "generate_invoice")
            .ok_or_else(|| {
                DraftError::Malformed("no generate_invoice function call in response".to_string())
            })?;

        let args: InvoiceArgs = serde_json::from_value(call.args)
            .map_err(|e| DraftError::Malformed(e.to_string()))?;

        args_to_draft(args)
    }
}
