use super::error::{Result, StoreError};
use super::SheetStore;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const NOT_SUPPORTED_MARKER: &str = "This operation is not supported";

/// Google Sheets v4 REST backend authenticated with a bearer access token
pub struct GoogleSheetsStore {
    client: Client,
    spreadsheet_id: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl GoogleSheetsStore {
    pub fn new(spreadsheet_id: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        let spreadsheet_id = spreadsheet_id.into();
        let access_token = access_token.into();

        if spreadsheet_id.trim().is_empty() {
            return Err(StoreError::Config("spreadsheet id is empty".to_string()));
        }
        if access_token.trim().is_empty() {
            return Err(StoreError::Config("access token is empty".to_string()));
        }

        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            spreadsheet_id,
            access_token,
        })
    }

    fn spreadsheet_url(&self) -> String {
        format!("{}/{}", API_BASE, self.spreadsheet_id)
    }

    fn values_url(&self, sheet: &str, suffix: &str) -> String {
        format!("{}/values/{}{}", self.spreadsheet_url(), encode_range(sheet), suffix)
    }

    async fn add_sheet(&self, name: &str) -> Result<()> {
        info!("Creating sheet {}", name);
        let body = json!({
            "requests": [{ "addSheet": { "properties": { "title": name } } }]
        });
        let response = self
            .client
            .post(format!("{}:batchUpdate", self.spreadsheet_url()))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

/// A1 range covering a whole sheet, quoted and URL-encoded
fn encode_range(sheet: &str) -> String {
    let quoted = format!("'{}'", sheet.replace('\'', "''"));
    urlencoding::encode(&quoted).into_owned()
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Map an unsuccessful response to a store error
fn classify_error(status: u16, body: &str) -> StoreError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| body.trim().to_string());

    match status {
        403 => StoreError::PermissionDenied(message),
        400 if message.contains(NOT_SUPPORTED_MARKER) => StoreError::NotNativeSpreadsheet,
        _ => StoreError::Api { status, message },
    }
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_error(status.as_u16(), &body))
}

#[async_trait]
impl SheetStore for GoogleSheetsStore {
    async fn list_sheets(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(self.spreadsheet_url())
            .query(&[("fields", "sheets.properties.title")])
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let meta: SpreadsheetMeta = check(response).await?.json().await?;
        Ok(meta.sheets.into_iter().map(|s| s.properties.title).collect())
    }

    async fn read_sheet(&self, name: &str) -> Result<Option<Vec<Vec<String>>>> {
        if !self.list_sheets().await?.iter().any(|s| s == name) {
            return Ok(None);
        }

        let response = self
            .client
            .get(self.values_url(name, ""))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let range: ValueRange = check(response).await?.json().await?;
        debug!("Read {} rows from sheet {}", range.values.len(), name);

        Ok(Some(
            range
                .values
                .into_iter()
                .map(|row| row.into_iter().map(cell_text).collect())
                .collect(),
        ))
    }

    async fn write_sheet(&self, name: &str, rows: &[Vec<String>]) -> Result<()> {
        if !self.list_sheets().await?.iter().any(|s| s == name) {
            self.add_sheet(name).await?;
        }

        let response = self
            .client
            .post(self.values_url(name, ":clear"))
            .bearer_auth(&self.access_token)
            .json(&json!({}))
            .send()
            .await?;
        check(response).await?;

        let body = json!({
            "range": format!("'{}'", name.replace('\'', "''")),
            "majorDimension": "ROWS",
            "values": rows,
        });
        let response = self
            .client
            .put(self.values_url(name, ""))
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        check(response).await?;

        debug!("Wrote {} rows to sheet {}", rows.len(), name);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("Google spreadsheet {}", self.spreadsheet_id)
    }
}
