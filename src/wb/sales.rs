//! Sales funnel (воронка продаж): per-card view/cart/order counters for the
//! current and previous week.

use super::FetchError;
use crate::config;
use reqwest_middleware::ClientWithMiddleware;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tokio::time::sleep;

const REPORT_DETAIL_URL: &str =
    "https://seller-analytics-api.wildberries.ru/api/v2/nm-report/detail";
const PAGE_SIZE: usize = 1000;

#[derive(Debug, Deserialize)]
struct DetailResponse {
    data: Option<DetailData>,
}

#[derive(Debug, Deserialize)]
struct DetailData {
    #[serde(default)]
    cards: Vec<SalesFunnelCard>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SalesFunnelCard {
    #[serde(rename = "nmID")]
    pub nm_id: i64,
    #[serde(rename = "vendorCode", default)]
    pub vendor_code: String,
    #[serde(rename = "brandName", default)]
    pub brand_name: String,
    #[serde(default)]
    pub object: ObjectRef,
    pub statistics: CardStatistics,
    #[serde(default)]
    pub stocks: CardStocks,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectRef {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardStatistics {
    #[serde(rename = "selectedPeriod")]
    pub selected_period: PeriodStats,
    #[serde(rename = "previousPeriod")]
    pub previous_period: Option<PeriodStats>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeriodStats {
    #[serde(default)]
    pub begin: String,
    #[serde(default)]
    pub end: String,
    #[serde(rename = "openCardCount", default)]
    pub open_card_count: i64,
    #[serde(rename = "addToCartCount", default)]
    pub add_to_cart_count: i64,
    #[serde(rename = "ordersCount", default)]
    pub orders_count: i64,
    #[serde(rename = "ordersSumRub", default)]
    pub orders_sum_rub: Decimal,
    #[serde(rename = "buyoutsCount", default)]
    pub buyouts_count: i64,
    #[serde(rename = "buyoutsSumRub", default)]
    pub buyouts_sum_rub: Decimal,
    #[serde(rename = "cancelCount", default)]
    pub cancel_count: i64,
    #[serde(rename = "cancelSumRub", default)]
    pub cancel_sum_rub: Decimal,
    #[serde(default)]
    pub conversions: Conversions,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Conversions {
    #[serde(rename = "addToCartPercent", default)]
    pub add_to_cart_percent: f64,
    #[serde(rename = "cartToOrderPercent", default)]
    pub cart_to_order_percent: f64,
    #[serde(rename = "buyoutsPercent", default)]
    pub buyouts_percent: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardStocks {
    #[serde(rename = "stocksMp", default)]
    pub stocks_mp: i64,
    #[serde(rename = "stocksWb", default)]
    pub stocks_wb: i64,
}

/// Full detail report for the last seven days, page by page. The endpoint
/// allows three requests a minute, hence the long pause between pages.
pub async fn fetch_sales_funnel(
    client: &ClientWithMiddleware,
    name: &str,
    token: &str,
) -> Result<Vec<SalesFunnelCard>, FetchError> {
    let (begin, end) = crate::report_window();
    let begin = format!("{} 00:00:00", crate::format_date(begin));
    let end = format!("{} 23:59:59", crate::format_date(end));

    let mut all_cards = vec![];
    let mut page = 1u32;
    loop {
        let payload = json!({
            "timezone": "Europe/Moscow",
            "period": { "begin": begin, "end": end },
            "orderBy": { "field": "openCard", "mode": "desc" },
            "page": page,
        });
        let response: DetailResponse =
            super::post_json(client, REPORT_DETAIL_URL, token, &payload).await?;
        let cards = response.data.map(|d| d.cards).unwrap_or_default();
        if cards.is_empty() {
            break;
        }
        let page_len = cards.len();
        all_cards.extend(cards);
        log::info!(
            "{name}: получено {page_len} записей воронки, всего {}",
            all_cards.len()
        );
        if page_len < PAGE_SIZE {
            break;
        }
        page += 1;
        sleep(*config::FUNNEL_PAGE_DELAY).await;
    }

    Ok(all_cards)
}
