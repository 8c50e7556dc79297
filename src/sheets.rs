//! Google Sheets upload client.
//!
//! Spreadsheets are addressed by their human titles through a Drive lookup,
//! then driven through the v4 values/batchUpdate endpoints with a bearer
//! token from the environment. Transient quota statuses (429/503) retry with
//! a fixed pause.

use derive_more::{Display, Error};
use num_traits::ToPrimitive;
use reqwest::{RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;

const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SHEETS_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const RETRY_DELAY: Duration = Duration::from_secs(30);
const MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Display, Error)]
pub enum SheetsError {
    #[display("Таблица '{_0}' не найдена")]
    #[error(ignore)]
    SpreadsheetNotFound(String),
    #[display("Лист '{_0}' не найден")]
    #[error(ignore)]
    WorksheetNotFound(String),
    #[display("HTTP {status}: {body}")]
    #[error(ignore)]
    Api {
        status: StatusCode,
        body: String,
    },
    Network(reqwest::Error),
    Decode(serde_json::Error),
    #[display("GSHEETS_TOKEN не задан")]
    MissingToken,
}

impl From<reqwest::Error> for SheetsError {
    fn from(err: reqwest::Error) -> Self {
        SheetsError::Network(err)
    }
}

impl From<serde_json::Error> for SheetsError {
    fn from(err: serde_json::Error) -> Self {
        SheetsError::Decode(err)
    }
}

/// One typed cell: numbers stay numbers in the sheet, gaps stay empty.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Int(i64),
    Number(f64),
    Empty,
}

impl CellValue {
    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Text(s) => json!(s),
            CellValue::Int(n) => json!(n),
            CellValue::Number(n) => json!(n),
            CellValue::Empty => json!(""),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s)
        }
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Int(n)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<Decimal> for CellValue {
    fn from(d: Decimal) -> Self {
        match d.to_f64() {
            Some(n) => CellValue::Number(n),
            None => CellValue::Text(d.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct SheetsClient {
    http: reqwest::Client,
    token: String,
}

impl SheetsClient {
    pub fn from_env() -> Result<Self, SheetsError> {
        let token = crate::env_var("GSHEETS_TOKEN").map_err(|_| SheetsError::MissingToken)?;
        Ok(Self {
            http: reqwest::Client::new(),
            token,
        })
    }

    /// Resolves a spreadsheet by its title the way gspread's `open` does:
    /// a Drive name query filtered to live spreadsheets.
    pub async fn open(&self, title: &str) -> Result<Spreadsheet, SheetsError> {
        log::info!("Открываю таблицу '{title}'");
        let q = format!(
            "name = '{}' and mimeType = 'application/vnd.google-apps.spreadsheet' and trashed = false",
            escape_query(title)
        );
        let value = self
            .send(self.http.get(DRIVE_FILES_URL).query(&[
                ("q", q.as_str()),
                ("fields", "files(id,name)"),
                ("pageSize", "10"),
            ]))
            .await?;
        let id = value["files"][0]["id"]
            .as_str()
            .ok_or_else(|| SheetsError::SpreadsheetNotFound(title.to_string()))?
            .to_string();
        Ok(Spreadsheet {
            client: self.clone(),
            id,
            title: title.to_string(),
        })
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Value, SheetsError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let request = builder
                .try_clone()
                .ok_or_else(|| SheetsError::Api {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: "request not clonable".to_string(),
                })?
                .bearer_auth(&self.token);
            let response = request.send().await?;
            let status = response.status();
            if (status == StatusCode::TOO_MANY_REQUESTS
                || status == StatusCode::SERVICE_UNAVAILABLE)
                && attempt < MAX_ATTEMPTS
            {
                log::warn!(
                    "Sheets API ответил {status}, повтор {attempt}/{MAX_ATTEMPTS} через {RETRY_DELAY:?}"
                );
                sleep(RETRY_DELAY).await;
                continue;
            }
            let text = response.text().await?;
            if !status.is_success() {
                return Err(SheetsError::Api {
                    status,
                    body: crate::truncate_body(&text),
                });
            }
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_str(&text)?);
        }
    }
}

pub struct Spreadsheet {
    client: SheetsClient,
    pub id: String,
    pub title: String,
}

impl Spreadsheet {
    pub async fn worksheet(&self, title: &str) -> Result<Worksheet, SheetsError> {
        for properties in self.sheet_properties().await? {
            if properties.title == title {
                return Ok(self.make_worksheet(properties));
            }
        }
        Err(SheetsError::WorksheetNotFound(title.to_string()))
    }

    /// The per-cabinet pushes create their worksheet on first run.
    pub async fn worksheet_or_create(
        &self,
        title: &str,
        rows: i64,
        cols: i64,
    ) -> Result<Worksheet, SheetsError> {
        match self.worksheet(title).await {
            Ok(worksheet) => Ok(worksheet),
            Err(SheetsError::WorksheetNotFound(_)) => {
                log::info!("Лист '{title}' не найден, создаю новый");
                self.add_worksheet(title, rows, cols).await
            }
            Err(err) => Err(err),
        }
    }

    pub async fn add_worksheet(
        &self,
        title: &str,
        rows: i64,
        cols: i64,
    ) -> Result<Worksheet, SheetsError> {
        let body = json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": title,
                        "gridProperties": { "rowCount": rows.max(1), "columnCount": cols.max(1) },
                    },
                },
            }],
        });
        let value = self
            .client
            .send(
                self.client
                    .http
                    .post(format!("{SHEETS_URL}/{}:batchUpdate", self.id))
                    .json(&body),
            )
            .await?;
        let properties = &value["replies"][0]["addSheet"]["properties"];
        Ok(self.make_worksheet(SheetProperties {
            sheet_id: properties["sheetId"].as_i64().unwrap_or_default(),
            title: title.to_string(),
            row_count: rows.max(1),
            col_count: cols.max(1),
        }))
    }

    async fn sheet_properties(&self) -> Result<Vec<SheetProperties>, SheetsError> {
        let value = self
            .client
            .send(
                self.client
                    .http
                    .get(format!("{SHEETS_URL}/{}", self.id))
                    .query(&[("fields", "sheets.properties")]),
            )
            .await?;
        let sheets = value["sheets"].as_array().cloned().unwrap_or_default();
        Ok(sheets
            .iter()
            .filter_map(|s| {
                let p = &s["properties"];
                Some(SheetProperties {
                    sheet_id: p["sheetId"].as_i64()?,
                    title: p["title"].as_str()?.to_string(),
                    row_count: p["gridProperties"]["rowCount"].as_i64().unwrap_or(0),
                    col_count: p["gridProperties"]["columnCount"].as_i64().unwrap_or(0),
                })
            })
            .collect())
    }

    fn make_worksheet(&self, properties: SheetProperties) -> Worksheet {
        Worksheet {
            client: self.client.clone(),
            spreadsheet_id: self.id.clone(),
            sheet_id: properties.sheet_id,
            title: properties.title,
            row_count: properties.row_count,
            col_count: properties.col_count,
        }
    }
}

struct SheetProperties {
    sheet_id: i64,
    title: String,
    row_count: i64,
    col_count: i64,
}

pub struct Worksheet {
    client: SheetsClient,
    spreadsheet_id: String,
    pub sheet_id: i64,
    pub title: String,
    pub row_count: i64,
    pub col_count: i64,
}

impl Worksheet {
    fn range(&self, a1: &str) -> String {
        if a1.is_empty() {
            format!("'{}'", self.title)
        } else {
            format!("'{}'!{}", self.title, a1)
        }
    }

    pub async fn clear(&self) -> Result<(), SheetsError> {
        self.batch_clear(&[""]).await
    }

    pub async fn batch_clear(&self, ranges: &[&str]) -> Result<(), SheetsError> {
        let ranges: Vec<String> = ranges.iter().map(|r| self.range(r)).collect();
        let body = json!({ "ranges": ranges });
        self.client
            .send(
                self.client
                    .http
                    .post(format!(
                        "{SHEETS_URL}/{}/values:batchClear",
                        self.spreadsheet_id
                    ))
                    .json(&body),
            )
            .await?;
        Ok(())
    }

    /// Every populated row, cells as strings; trailing empty cells are absent
    /// the way the API returns them.
    pub async fn values(&self) -> Result<Vec<Vec<String>>, SheetsError> {
        let value = self
            .client
            .send(
                self.client
                    .http
                    .get(format!(
                        "{SHEETS_URL}/{}/values:batchGet",
                        self.spreadsheet_id
                    ))
                    .query(&[("ranges", self.range("").as_str())]),
            )
            .await?;
        let rows = value["valueRanges"][0]["values"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        Ok(rows
            .into_iter()
            .map(|row| {
                row.as_array()
                    .cloned()
                    .unwrap_or_default()
                    .into_iter()
                    .map(|cell| match cell {
                        Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect())
    }

    /// Writes the table with its top-left corner at `start` (A1 notation).
    pub async fn update(&self, start: &str, rows: &[Vec<CellValue>]) -> Result<(), SheetsError> {
        if rows.is_empty() {
            return Ok(());
        }
        let values: Vec<Vec<Value>> = rows
            .iter()
            .map(|row| row.iter().map(CellValue::to_json).collect())
            .collect();
        let body = json!({
            "valueInputOption": "RAW",
            "data": [{ "range": self.range(start), "values": values }],
        });
        self.client
            .send(
                self.client
                    .http
                    .post(format!(
                        "{SHEETS_URL}/{}/values:batchUpdate",
                        self.spreadsheet_id
                    ))
                    .json(&body),
            )
            .await?;
        Ok(())
    }

    pub async fn resize(&self, rows: i64, cols: i64) -> Result<(), SheetsError> {
        let body = json!({
            "requests": [{
                "updateSheetProperties": {
                    "properties": {
                        "sheetId": self.sheet_id,
                        "gridProperties": { "rowCount": rows, "columnCount": cols },
                    },
                    "fields": "gridProperties(rowCount,columnCount)",
                },
            }],
        });
        self.client
            .send(
                self.client
                    .http
                    .post(format!("{SHEETS_URL}/{}:batchUpdate", self.spreadsheet_id))
                    .json(&body),
            )
            .await?;
        Ok(())
    }
}

fn escape_query(title: &str) -> String {
    title.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn cells_serialize_with_their_types() {
        assert_eq!(json!(5), CellValue::Int(5).to_json());
        assert_eq!(json!(2.5), CellValue::Number(2.5).to_json());
        assert_eq!(json!("Бренд"), CellValue::from("Бренд").to_json());
        assert_eq!(json!(""), CellValue::Empty.to_json());
        assert_eq!(json!(""), CellValue::from("").to_json());
        assert_eq!(json!(80.0), CellValue::from(dec!(80)).to_json());
    }

    #[test]
    fn drive_queries_escape_quotes() {
        assert_eq!("Фин модель", escape_query("Фин модель"));
        assert_eq!("it\\'s", escape_query("it's"));
    }
}
