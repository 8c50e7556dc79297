//! Warehouse stock snapshots with actual price/discount resolution.

use super::FetchError;
use reqwest_middleware::ClientWithMiddleware;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use time::Date;

const SUPPLIER_STOCKS_URL: &str =
    "https://statistics-api.wildberries.ru/api/v1/supplier/stocks";
/// The endpoint returns the full snapshot for any date this far back.
const DATE_FROM: &str = "2024-01-01";

#[derive(Debug, Deserialize)]
pub(crate) struct SupplierStock {
    #[serde(rename = "nmId")]
    nm_id: i64,
    #[serde(default)]
    barcode: String,
    #[serde(rename = "techSize", default)]
    tech_size: String,
    #[serde(default)]
    brand: String,
    #[serde(rename = "supplierArticle", default)]
    supplier_article: String,
    #[serde(rename = "quantityFull", default)]
    quantity_full: i64,
    #[serde(rename = "lastChangeDate", default)]
    last_change_date: String,
    #[serde(rename = "Price")]
    price: Option<Decimal>,
    #[serde(rename = "Discount")]
    discount: Option<Decimal>,
}

/// One warehouse-level snapshot row per barcode.
#[derive(Debug, Clone, PartialEq)]
pub struct StockRecord {
    pub nm_id: i64,
    pub barcode: String,
    pub size: String,
    pub brand: String,
    pub supplier_article: String,
    pub quantity: i64,
    pub price: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub last_change: Option<Date>,
}

pub async fn fetch_stocks(
    client: &ClientWithMiddleware,
    name: &str,
    token: &str,
) -> Result<Vec<StockRecord>, FetchError> {
    log::info!("🚀 Начинаю запрос остатков кабинета {name}");
    let raw: Vec<SupplierStock> = super::get_json(
        client,
        SUPPLIER_STOCKS_URL,
        token,
        &[("dateFrom", DATE_FROM.to_string())],
    )
    .await?;

    if raw.is_empty() {
        log::warn!("Пустой ответ остатков для {name}, подставляю строку-заглушку");
        return Ok(vec![empty_placeholder()]);
    }

    let mut rows: Vec<StockRecord> = raw
        .into_iter()
        .map(|s| StockRecord {
            nm_id: s.nm_id,
            barcode: s.barcode,
            size: s.tech_size,
            brand: s.brand,
            supplier_article: s.supplier_article,
            quantity: s.quantity_full,
            price: s.price,
            discount: s.discount,
            last_change: crate::parse_date_prefix(&s.last_change_date),
        })
        .collect();

    resolve_latest_prices(&mut rows);
    rows.sort_by(|a, b| b.last_change.cmp(&a.last_change));
    log::info!("✅ Остатки {name} обработаны: {} строк", rows.len());
    Ok(rows)
}

/// A cabinet without stock still has to show up in the summary sheet.
fn empty_placeholder() -> StockRecord {
    StockRecord {
        nm_id: 0,
        barcode: "0".to_string(),
        size: "пусто".to_string(),
        brand: "пусто".to_string(),
        supplier_article: "0".to_string(),
        quantity: 0,
        price: Some(Decimal::ZERO),
        discount: Some(Decimal::ZERO),
        last_change: None,
    }
}

/// Warehouses report stale prices; the actual price and discount of an nm id
/// are the maxima among the rows of its most recent snapshot date, applied
/// to every row of that nm id.
fn resolve_latest_prices(rows: &mut [StockRecord]) {
    let mut latest_date: HashMap<i64, Option<Date>> = HashMap::new();
    for row in rows.iter() {
        let entry = latest_date.entry(row.nm_id).or_insert(row.last_change);
        if row.last_change > *entry {
            *entry = row.last_change;
        }
    }

    let mut actual: HashMap<i64, (Option<Decimal>, Option<Decimal>)> = HashMap::new();
    for row in rows.iter() {
        if latest_date.get(&row.nm_id) != Some(&row.last_change) {
            continue;
        }
        let entry = actual.entry(row.nm_id).or_insert((None, None));
        if row.price > entry.0 {
            entry.0 = row.price;
        }
        if row.discount > entry.1 {
            entry.1 = row.discount;
        }
    }

    for row in rows.iter_mut() {
        if let Some((price, discount)) = actual.get(&row.nm_id) {
            row.price = *price;
            row.discount = *discount;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use time::macros::date;

    fn record(nm_id: i64, price: Decimal, discount: Decimal, day: Date) -> StockRecord {
        StockRecord {
            nm_id,
            barcode: "101".to_string(),
            size: "0".to_string(),
            brand: "Бренд".to_string(),
            supplier_article: "ART".to_string(),
            quantity: 1,
            price: Some(price),
            discount: Some(discount),
            last_change: Some(day),
        }
    }

    #[test]
    fn latest_snapshot_wins() {
        let mut rows = vec![
            record(1, dec!(900), dec!(10), date!(2025 - 07 - 01)),
            record(1, dec!(1500), dec!(30), date!(2025 - 07 - 03)),
            record(1, dec!(1400), dec!(35), date!(2025 - 07 - 03)),
        ];
        resolve_latest_prices(&mut rows);
        // max price and max discount of the latest date, on every row
        for row in &rows {
            assert_eq!(Some(dec!(1500)), row.price);
            assert_eq!(Some(dec!(35)), row.discount);
        }
    }

    #[test]
    fn nm_ids_are_independent() {
        let mut rows = vec![
            record(1, dec!(100), dec!(5), date!(2025 - 07 - 01)),
            record(2, dec!(200), dec!(50), date!(2025 - 07 - 02)),
        ];
        resolve_latest_prices(&mut rows);
        assert_eq!(Some(dec!(100)), rows[0].price);
        assert_eq!(Some(dec!(200)), rows[1].price);
    }

    #[test]
    fn rows_without_dates_keep_going() {
        let mut rows = vec![StockRecord {
            last_change: None,
            ..record(7, dec!(10), dec!(0), date!(2025 - 07 - 01))
        }];
        resolve_latest_prices(&mut rows);
        assert_eq!(Some(dec!(10)), rows[0].price);
    }
}
