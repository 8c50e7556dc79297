//! Product card directory: nm id, КТ grouping id, sizes and barcodes.
//!
//! Cursor-paginated fetch; one output row per card size and barcode, the
//! shape every other report joins against.

use super::FetchError;
use crate::config;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use serde_json::json;
use std::ops::ControlFlow;
use tokio::time::sleep;

const CARD_LIST_URL: &str = "https://content-api.wildberries.ru/content/v2/get/cards/list";
const PAGE_LIMIT: usize = 100;
/// Cards never change retroactively before this date; keeps payloads small.
const PERIOD_BEGIN: &str = "2024-01-01";

#[derive(Debug, Deserialize)]
pub(crate) struct CardListResponse {
    #[serde(default)]
    pub cards: Vec<Card>,
    pub cursor: Cursor,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Cursor {
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<String>,
    #[serde(rename = "nmID")]
    pub nm_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Card {
    #[serde(rename = "nmID")]
    pub nm_id: i64,
    #[serde(rename = "imtID")]
    pub imt_id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "vendorCode", default)]
    pub vendor_code: String,
    #[serde(default)]
    pub brand: String,
    #[serde(rename = "subjectName", default)]
    pub subject_name: String,
    #[serde(default)]
    pub photos: Vec<Photo>,
    #[serde(default)]
    pub dimensions: Dimensions,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: String,
    #[serde(default)]
    pub sizes: Vec<CardSize>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Photo {
    pub big: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Dimensions {
    #[serde(default)]
    pub width: i64,
    #[serde(default)]
    pub height: i64,
    #[serde(default)]
    pub length: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CardSize {
    #[serde(rename = "techSize")]
    pub tech_size: Option<String>,
    #[serde(default)]
    pub skus: Vec<String>,
}

/// One row per card size and barcode.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogCard {
    pub nm_id: i64,
    pub imt_id: i64,
    pub title: String,
    pub vendor_code: String,
    pub brand: String,
    pub subject: String,
    pub photo: Option<String>,
    pub width: i64,
    pub height: i64,
    pub length: i64,
    pub size: String,
    pub barcode: Option<String>,
    pub updated_at: String,
}

pub async fn fetch_cards(
    client: &ClientWithMiddleware,
    name: &str,
    token: &str,
) -> Result<Vec<CatalogCard>, FetchError> {
    let mut all_cards: Vec<Card> = vec![];
    let mut cursor: Option<(String, i64)> = None;

    loop {
        let mut cursor_json = json!({ "limit": PAGE_LIMIT });
        if let Some((updated_at, nm_id)) = &cursor {
            cursor_json["updatedAt"] = json!(updated_at);
            cursor_json["nmID"] = json!(nm_id);
        }
        let payload = json!({
            "settings": {
                "sort": { "ascending": false },
                "filter": { "withPhoto": -1 },
                "cursor": cursor_json,
                "period": {
                    "begin": PERIOD_BEGIN,
                    "end": crate::format_date(crate::moscow_today()),
                },
            },
        });

        let page: CardListResponse = super::post_json(client, CARD_LIST_URL, token, &payload).await?;
        let page_len = page.cards.len();
        all_cards.extend(page.cards);
        log::info!(
            "{name}: получено {page_len} карточек, всего {}",
            all_cards.len()
        );

        match page_step(page_len, page.cursor)? {
            ControlFlow::Break(()) => break,
            ControlFlow::Continue(next) => cursor = Some(next),
        }
        sleep(*config::PAGE_DELAY).await;
    }

    Ok(flatten_cards(all_cards))
}

/// A short page ends pagination; a full page without a complete cursor means
/// the response format changed under us.
fn page_step(
    page_len: usize,
    cursor: Cursor,
) -> Result<ControlFlow<(), (String, i64)>, FetchError> {
    if page_len < PAGE_LIMIT {
        return Ok(ControlFlow::Break(()));
    }
    match (cursor.updated_at, cursor.nm_id) {
        (Some(updated_at), Some(nm_id)) => Ok(ControlFlow::Continue((updated_at, nm_id))),
        _ => Err(FetchError::MissingCursor),
    }
}

fn flatten_cards(cards: Vec<Card>) -> Vec<CatalogCard> {
    let mut rows = vec![];
    for card in cards {
        let info = CatalogCard {
            nm_id: card.nm_id,
            imt_id: card.imt_id,
            title: card.title,
            vendor_code: card.vendor_code,
            brand: card.brand,
            subject: card.subject_name,
            photo: card.photos.into_iter().find_map(|p| p.big),
            width: card.dimensions.width,
            height: card.dimensions.height,
            length: card.dimensions.length,
            size: String::new(),
            barcode: None,
            updated_at: card.updated_at,
        };
        if card.sizes.is_empty() {
            rows.push(info);
            continue;
        }
        for size in card.sizes {
            let tech_size = size.tech_size.unwrap_or_default();
            if size.skus.is_empty() {
                rows.push(CatalogCard {
                    size: tech_size.clone(),
                    barcode: None,
                    ..info.clone()
                });
                continue;
            }
            for barcode in size.skus {
                rows.push(CatalogCard {
                    size: tech_size.clone(),
                    barcode: Some(barcode),
                    ..info.clone()
                });
            }
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(nm_id: i64, sizes: Vec<CardSize>) -> Card {
        Card {
            nm_id,
            imt_id: 10,
            title: "Платье".to_string(),
            vendor_code: "ART-1".to_string(),
            brand: "Бренд".to_string(),
            subject_name: "Платья".to_string(),
            photos: vec![Photo {
                big: Some("https://img/1/big".to_string()),
            }],
            dimensions: Dimensions {
                width: 20,
                height: 30,
                length: 5,
            },
            updated_at: "2025-07-01T10:00:00Z".to_string(),
            sizes,
        }
    }

    #[test]
    fn flattens_sizes_and_barcodes() {
        let rows = flatten_cards(vec![card(
            1,
            vec![
                CardSize {
                    tech_size: Some("42".to_string()),
                    skus: vec!["201".to_string(), "202".to_string()],
                },
                CardSize {
                    tech_size: Some("44".to_string()),
                    skus: vec![],
                },
            ],
        )]);
        assert_eq!(3, rows.len());
        assert_eq!(Some("201".to_string()), rows[0].barcode);
        assert_eq!(Some("202".to_string()), rows[1].barcode);
        assert_eq!("42", rows[0].size);
        assert_eq!(None, rows[2].barcode);
        assert_eq!("44", rows[2].size);
        assert!(rows.iter().all(|r| r.imt_id == 10));
    }

    #[test]
    fn card_without_sizes_still_produces_a_row() {
        let rows = flatten_cards(vec![card(2, vec![])]);
        assert_eq!(1, rows.len());
        assert_eq!(2, rows[0].nm_id);
        assert_eq!(None, rows[0].barcode);
    }

    #[test]
    fn short_page_stops_pagination() {
        let step = page_step(
            PAGE_LIMIT - 1,
            Cursor {
                updated_at: Some("2025-07-01T10:00:00Z".to_string()),
                nm_id: Some(1),
            },
        );
        assert!(matches!(step, Ok(ControlFlow::Break(()))));
    }

    #[test]
    fn full_page_continues_with_cursor() {
        let step = page_step(
            PAGE_LIMIT,
            Cursor {
                updated_at: Some("2025-07-01T10:00:00Z".to_string()),
                nm_id: Some(5),
            },
        );
        match step {
            Ok(ControlFlow::Continue((updated_at, nm_id))) => {
                assert_eq!("2025-07-01T10:00:00Z", updated_at);
                assert_eq!(5, nm_id);
            }
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[test]
    fn full_page_without_cursor_is_an_error() {
        let step = page_step(
            PAGE_LIMIT,
            Cursor {
                updated_at: None,
                nm_id: None,
            },
        );
        assert!(matches!(step, Err(FetchError::MissingCursor)));
    }
}
