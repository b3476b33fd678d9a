//! # Sheets REST proxy
//!
//! [TableStore] over a Sheets-v4-shaped values API:
//!
//! - `GET  {base}/v4/spreadsheets/{id}/values/{range}`
//! - `PUT  {base}/v4/spreadsheets/{id}/values/{range}?valueInputOption=RAW`
//!
//! Both exchange a value range, `{ "range": ..., "majorDimension": "ROWS", "values": [[...]] }`.
//! Sheets drops trailing empty rows and cells, so callers must treat short rows
//! as missing cells.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    decode::Row,
    range::CellRange,
    table::{StoreError, TableStore},
};

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    major_dimension: Option<String>,
    #[serde(default)]
    values: Vec<Row>,
}

pub struct SheetsProxy {
    client: Client,
    base: Url,
    spreadsheet_id: String,
    token: Option<String>,
}

impl SheetsProxy {
    pub fn new(
        base: &str,
        spreadsheet_id: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let base = Url::parse(base).map_err(|e| StoreError::Malformed(format!("{base}: {e}")))?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base,
            spreadsheet_id: spreadsheet_id.to_string(),
            token,
        })
    }

    fn values_url(&self, range: &CellRange) -> Result<Url, StoreError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Malformed(format!("{} cannot be a base URL", self.base)))?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                &self.spreadsheet_id,
                "values",
                &range.to_string(),
            ]);

        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl TableStore for SheetsProxy {
    async fn get_values(&self, range: &CellRange) -> Result<Vec<Row>, StoreError> {
        let url = self.values_url(range)?;
        debug!("GET {url}");

        let response = self.authorize(self.client.get(url)).send().await?;
        let value_range: ValueRange = check_status(response).await?.json().await?;

        // row indexes are positional, so the answer must start where we asked
        if let Some(answered) = &value_range.range {
            let answered: CellRange = answered.parse()?;
            if answered.first_row() != range.first_row() {
                return Err(StoreError::Malformed(format!(
                    "asked for {range}, store answered {answered}"
                )));
            }
        }

        Ok(value_range.values)
    }

    async fn update_values(&self, range: &CellRange, values: Vec<Row>) -> Result<(), StoreError> {
        let mut url = self.values_url(range)?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        debug!("PUT {url}");

        let body = ValueRange {
            range: Some(range.to_string()),
            major_dimension: Some("ROWS".to_string()),
            values,
        };

        let response = self
            .authorize(self.client.put(url))
            .json(&body)
            .send()
            .await?;
        check_status(response).await?;

        Ok(())
    }
}
