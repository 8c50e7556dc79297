//! Advertising campaigns: campaign list plus per-day per-nm statistics.

use super::FetchError;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use time::Date;

const PROMOTION_COUNT_URL: &str = "https://advert-api.wildberries.ru/adv/v1/promotion/count";
const FULLSTATS_URL: &str = "https://advert-api.wildberries.ru/adv/v2/fullstats";

#[derive(Debug, Deserialize)]
struct PromotionCount {
    #[serde(default)]
    adverts: Vec<AdvertBlock>,
}

#[derive(Debug, Deserialize)]
struct AdvertBlock {
    #[serde(rename = "type", default)]
    advert_type: i64,
    #[serde(default)]
    status: i64,
    #[serde(default)]
    count: i64,
    #[serde(default)]
    advert_list: Vec<AdvertRef>,
}

#[derive(Debug, Deserialize)]
struct AdvertRef {
    #[serde(rename = "advertId")]
    advert_id: i64,
}

/// A campaign flattened out of the `adverts` blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct Campaign {
    pub advert_id: i64,
    pub advert_type: i64,
    pub status: i64,
    pub count: i64,
}

#[derive(Debug, Deserialize)]
struct FullStats {
    #[serde(rename = "advertId")]
    advert_id: i64,
    #[serde(default)]
    days: Vec<DayStats>,
}

#[derive(Debug, Deserialize)]
struct DayStats {
    #[serde(default)]
    date: String,
    #[serde(default)]
    apps: Vec<AppStats>,
}

#[derive(Debug, Deserialize)]
struct AppStats {
    #[serde(rename = "appType", default)]
    app_type: i64,
    #[serde(default)]
    nm: Vec<NmStats>,
}

#[derive(Debug, Default, Deserialize)]
struct NmStats {
    #[serde(rename = "nmId")]
    nm_id: i64,
    #[serde(default)]
    views: i64,
    #[serde(default)]
    clicks: i64,
    #[serde(default)]
    atbs: i64,
    #[serde(default)]
    orders: i64,
    #[serde(default)]
    shks: i64,
    #[serde(default)]
    sum_price: Decimal,
    #[serde(rename = "sum", default)]
    spend: Decimal,
}

/// Campaign statistics flattened to one row per (campaign, day, app, nm).
#[derive(Debug, Clone, PartialEq)]
pub struct AdvertStatRecord {
    pub advert_id: i64,
    pub date: Option<Date>,
    pub app_type: i64,
    pub nm_id: i64,
    pub views: i64,
    pub clicks: i64,
    pub atbs: i64,
    pub orders: i64,
    pub shks: i64,
    pub sum_price: Decimal,
    pub spend: Decimal,
}

pub async fn fetch_campaign_stats(
    client: &ClientWithMiddleware,
    name: &str,
    token: &str,
) -> Result<Vec<AdvertStatRecord>, FetchError> {
    let response = client
        .get(PROMOTION_COUNT_URL)
        .header(AUTHORIZATION, token)
        .send()
        .await?;
    // 204 means the cabinet simply has no campaigns.
    if response.status() == StatusCode::NO_CONTENT {
        log::warn!("{name}: нет рекламных кампаний (204)");
        return Ok(vec![]);
    }
    let count: PromotionCount = super::decode_response(response).await?;
    let campaigns = flatten_campaigns(count);
    if campaigns.is_empty() {
        log::warn!("{name}: нет активных кампаний");
        return Ok(vec![]);
    }
    log::info!("{name}: получено {} кампаний", campaigns.len());

    let (begin, end) = crate::report_window();
    let params: Vec<serde_json::Value> = campaigns
        .iter()
        .map(|c| {
            json!({
                "id": c.advert_id,
                "interval": {
                    "begin": crate::format_date(begin),
                    "end": crate::format_date(end),
                },
            })
        })
        .collect();

    log::info!("{name}: загружаю статистику для {} кампаний", params.len());
    let stats: Option<Vec<FullStats>> =
        super::post_json(client, FULLSTATS_URL, token, &params).await?;
    let stats = match stats {
        Some(stats) if !stats.is_empty() => stats,
        _ => {
            log::warn!("{name}: нет статистики по кампаниям");
            return Ok(vec![]);
        }
    };

    let rows = flatten_fullstats(stats);
    log::info!("{name}: статистика развёрнута в {} строк", rows.len());
    Ok(rows)
}

fn flatten_campaigns(count: PromotionCount) -> Vec<Campaign> {
    count
        .adverts
        .into_iter()
        .flat_map(|block| {
            block.advert_list.into_iter().map(move |advert| Campaign {
                advert_id: advert.advert_id,
                advert_type: block.advert_type,
                status: block.status,
                count: block.count,
            })
        })
        .collect()
}

fn flatten_fullstats(stats: Vec<FullStats>) -> Vec<AdvertStatRecord> {
    let mut rows = vec![];
    for campaign in stats {
        for day in campaign.days {
            let date = crate::parse_date_prefix(&day.date);
            for app in day.apps {
                for nm in app.nm {
                    rows.push(AdvertStatRecord {
                        advert_id: campaign.advert_id,
                        date,
                        app_type: app.app_type,
                        nm_id: nm.nm_id,
                        views: nm.views,
                        clicks: nm.clicks,
                        atbs: nm.atbs,
                        orders: nm.orders,
                        shks: nm.shks,
                        sum_price: nm.sum_price,
                        spend: nm.spend,
                    });
                }
            }
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use time::macros::date;

    #[test]
    fn flattens_campaign_blocks() {
        let count = PromotionCount {
            adverts: vec![AdvertBlock {
                advert_type: 8,
                status: 9,
                count: 2,
                advert_list: vec![AdvertRef { advert_id: 100 }, AdvertRef { advert_id: 101 }],
            }],
        };
        let campaigns = flatten_campaigns(count);
        assert_eq!(2, campaigns.len());
        assert_eq!(100, campaigns[0].advert_id);
        assert_eq!(8, campaigns[1].advert_type);
        assert_eq!(9, campaigns[1].status);
    }

    #[test]
    fn flattens_days_apps_and_nms() {
        let stats = vec![FullStats {
            advert_id: 500,
            days: vec![DayStats {
                date: "2025-07-29T00:00:00+03:00".to_string(),
                apps: vec![AppStats {
                    app_type: 1,
                    nm: vec![
                        NmStats {
                            nm_id: 11,
                            views: 100,
                            clicks: 7,
                            spend: dec!(123.45),
                            ..NmStats::default()
                        },
                        NmStats {
                            nm_id: 12,
                            ..NmStats::default()
                        },
                    ],
                }],
            }],
        }];
        let rows = flatten_fullstats(stats);
        assert_eq!(2, rows.len());
        assert_eq!(500, rows[0].advert_id);
        assert_eq!(Some(date!(2025 - 07 - 29)), rows[0].date);
        assert_eq!(1, rows[0].app_type);
        assert_eq!(11, rows[0].nm_id);
        assert_eq!(dec!(123.45), rows[0].spend);
        assert_eq!(12, rows[1].nm_id);
    }
}
