//! Warehouse stock analytics, requested in sku batches.

use super::FetchError;
use crate::config;
use crate::engine::OzonCabinet;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use serde_json::json;
use tokio::time::sleep;

const ANALYTICS_STOCKS_URL: &str = "https://api-seller.ozon.ru/v1/analytics/stocks";
/// The endpoint accepts at most 100 skus per call.
const CHUNK: usize = 100;

#[derive(Debug, Deserialize)]
struct StocksResponse {
    #[serde(default)]
    items: Vec<OzonStockRecord>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct OzonStockRecord {
    #[serde(default)]
    pub sku: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub available_stock_count: i64,
    #[serde(default)]
    pub valid_stock_count: i64,
}

pub async fn fetch_stocks(
    client: &ClientWithMiddleware,
    cabinet: &OzonCabinet,
    skus: &[i64],
) -> Result<Vec<OzonStockRecord>, FetchError> {
    let name = &cabinet.name;
    log::info!("{name}: запрашиваю аналитику остатков по {} SKU", skus.len());

    let mut all_items = vec![];
    for (idx, chunk) in skus.chunks(CHUNK).enumerate() {
        if idx > 0 {
            sleep(*config::PAGE_DELAY).await;
        }
        let payload = json!({
            "skus": chunk.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        });
        let page: StocksResponse =
            super::post_json(client, ANALYTICS_STOCKS_URL, cabinet, &payload).await?;
        all_items.extend(page.items);
        log::info!("{name}: текущий объём {} записей", all_items.len());
    }

    log::info!("{name}: получено всего {} записей по складам", all_items.len());
    Ok(all_items)
}
