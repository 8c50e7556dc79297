//! Ozon product cards with the attributes the matrix sheet shows.

use super::FetchError;
use crate::config;
use crate::engine::OzonCabinet;
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Deserializer};
use serde_aux::field_attributes::deserialize_number_from_string;
use serde_json::json;
use tokio::time::sleep;

const PRODUCT_ATTRIBUTES_URL: &str = "https://api-seller.ozon.ru/v4/product/info/attributes";
const PAGE_LIMIT: usize = 1000;

// Attribute ids of the card fields the reports need.
const ATTR_BRAND: i64 = 31;
const ATTR_MERGE_CARD: i64 = 8292;
const ATTR_COLOR: [i64; 2] = [10096, 10097];
const ATTR_TYPE: [i64; 2] = [4501, 4503];

#[derive(Debug, Deserialize)]
struct AttributesResponse {
    #[serde(default)]
    result: Vec<ProductAttributes>,
    last_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductAttributes {
    #[serde(default)]
    offer_id: String,
    #[serde(default)]
    name: String,
    #[serde(default, deserialize_with = "de_barcode")]
    barcode: String,
    #[serde(default, deserialize_with = "deserialize_number_from_string")]
    width: i64,
    #[serde(default, deserialize_with = "deserialize_number_from_string")]
    height: i64,
    #[serde(default, deserialize_with = "deserialize_number_from_string")]
    depth: i64,
    #[serde(default)]
    primary_image: String,
    sku: Option<i64>,
    #[serde(default)]
    attributes: Vec<Attribute>,
}

#[derive(Debug, Deserialize)]
struct Attribute {
    id: i64,
    #[serde(default)]
    values: Vec<AttributeValue>,
}

#[derive(Debug, Deserialize)]
struct AttributeValue {
    #[serde(default)]
    value: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OzonProduct {
    pub offer_id: String,
    pub name: String,
    pub barcode: String,
    pub width: i64,
    pub height: i64,
    pub depth: i64,
    pub primary_image: String,
    pub sku: Option<i64>,
    pub brand: Option<String>,
    pub merge_card: Option<String>,
    pub color: Option<String>,
    pub product_type: Option<String>,
}

/// Full card list, `last_id` pagination, visibility ALL.
pub async fn fetch_products(
    client: &ClientWithMiddleware,
    cabinet: &OzonCabinet,
) -> Result<Vec<OzonProduct>, FetchError> {
    let name = &cabinet.name;
    let mut all_rows = vec![];
    let mut last_id = String::new();

    loop {
        let payload = json!({
            "filter": { "visibility": "ALL" },
            "limit": PAGE_LIMIT,
            "last_id": last_id,
            "sort_dir": "ASC",
        });
        log::info!("{name}: запрашиваю карточки Ozon, last_id={last_id:?}");
        let page: AttributesResponse =
            super::post_json(client, PRODUCT_ATTRIBUTES_URL, cabinet, &payload).await?;
        let page_len = page.result.len();
        all_rows.extend(page.result.into_iter().map(map_product));
        log::info!("{name}: получено {page_len} карточек, всего {}", all_rows.len());

        if page_len < PAGE_LIMIT {
            break;
        }
        last_id = page.last_id.ok_or(FetchError::MissingCursor)?;
        sleep(*config::PAGE_DELAY).await;
    }

    Ok(all_rows)
}

pub fn extract_skus(products: &[OzonProduct]) -> Vec<i64> {
    products.iter().filter_map(|p| p.sku).collect()
}

/// Barcodes arrive as strings, bare numbers or null depending on the card.
fn de_barcode<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawBarcode {
        Str(String),
        Num(i64),
    }
    let value = Option::<RawBarcode>::deserialize(deserializer)?;
    Ok(match value {
        Some(RawBarcode::Str(s)) => s.trim().to_string(),
        Some(RawBarcode::Num(n)) => n.to_string(),
        None => String::new(),
    })
}

fn map_product(item: ProductAttributes) -> OzonProduct {
    let mut product = OzonProduct {
        offer_id: item.offer_id,
        name: item.name,
        barcode: item.barcode,
        width: item.width,
        height: item.height,
        depth: item.depth,
        primary_image: item.primary_image,
        sku: item.sku,
        ..OzonProduct::default()
    };
    for attr in item.attributes {
        let value = match attr.values.into_iter().next() {
            Some(v) if !v.value.is_empty() => v.value,
            _ => continue,
        };
        if attr.id == ATTR_BRAND {
            product.brand = Some(value);
        } else if attr.id == ATTR_MERGE_CARD {
            product.merge_card = Some(value);
        } else if ATTR_COLOR.contains(&attr.id) {
            product.color = Some(value);
        } else if ATTR_TYPE.contains(&attr.id) {
            product.product_type = Some(value);
        }
    }
    product
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_attribute_ids() {
        let item = ProductAttributes {
            offer_id: "A-1".to_string(),
            name: "Куртка".to_string(),
            barcode: "4600000000000".to_string(),
            width: 300,
            height: 400,
            depth: 100,
            primary_image: "https://img".to_string(),
            sku: Some(123),
            attributes: vec![
                Attribute {
                    id: ATTR_BRAND,
                    values: vec![AttributeValue {
                        value: "Бренд".to_string(),
                    }],
                },
                Attribute {
                    id: 10097,
                    values: vec![AttributeValue {
                        value: "синий".to_string(),
                    }],
                },
                Attribute {
                    id: 4501,
                    values: vec![AttributeValue {
                        value: "Куртки".to_string(),
                    }],
                },
                // unknown ids are ignored
                Attribute {
                    id: 9999,
                    values: vec![AttributeValue {
                        value: "мусор".to_string(),
                    }],
                },
            ],
        };
        let product = map_product(item);
        assert_eq!(Some("Бренд".to_string()), product.brand);
        assert_eq!(Some("синий".to_string()), product.color);
        assert_eq!(Some("Куртки".to_string()), product.product_type);
        assert_eq!(None, product.merge_card);
        assert_eq!(Some(123), product.sku);
    }

    #[test]
    fn numeric_barcodes_decode_as_strings() {
        let raw = serde_json::json!({
            "offer_id": "A-2",
            "barcode": 4600000000001i64,
            "sku": 5
        });
        let item: ProductAttributes = serde_json::from_value(raw).expect("attributes decode");
        assert_eq!("4600000000001", item.barcode);
    }

    #[test]
    fn collects_only_present_skus() {
        let products = vec![
            OzonProduct {
                sku: Some(1),
                ..OzonProduct::default()
            },
            OzonProduct {
                sku: None,
                ..OzonProduct::default()
            },
            OzonProduct {
                sku: Some(2),
                ..OzonProduct::default()
            },
        ];
        assert_eq!(vec![1, 2], extract_skus(&products));
    }
}
