//! Ozon matrix rows: product cards joined with aggregated stock analytics.

use crate::ozon::products::OzonProduct;
use crate::ozon::stocks::OzonStockRecord;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct OzonMatrixRow {
    pub offer_id: String,
    pub name: String,
    pub barcode: String,
    pub width: i64,
    pub height: i64,
    pub depth: i64,
    pub primary_image: String,
    pub brand: String,
    pub merge_card: String,
    pub color: String,
    pub available: i64,
    pub valid: i64,
    pub type_label: String,
}

/// Left-merges the card list with stock analytics grouped by (sku, name).
/// The stock-side name doubles as the display type, with the card attribute
/// as fallback for skus that had no stock rows. Sorted by available stock.
pub fn merge_products_with_stocks(
    products: Vec<OzonProduct>,
    stocks: Vec<OzonStockRecord>,
    cabinet: &str,
) -> Vec<OzonMatrixRow> {
    let mut grouped: HashMap<i64, OzonStockRecord> = HashMap::new();
    for stock in stocks {
        let entry = grouped.entry(stock.sku).or_insert(OzonStockRecord {
            sku: stock.sku,
            name: stock.name.clone(),
            available_stock_count: 0,
            valid_stock_count: 0,
        });
        entry.available_stock_count += stock.available_stock_count;
        entry.valid_stock_count += stock.valid_stock_count;
    }
    log::info!("{cabinet}: остатки сгруппированы, {} SKU", grouped.len());

    let mut rows: Vec<OzonMatrixRow> = products
        .into_iter()
        .map(|product| {
            let stock = product.sku.and_then(|sku| grouped.get(&sku));
            let type_label = match stock {
                Some(stock) if !stock.name.is_empty() => stock.name.clone(),
                _ => product.product_type.unwrap_or_default(),
            };
            OzonMatrixRow {
                offer_id: product.offer_id,
                name: product.name,
                barcode: product.barcode,
                width: product.width,
                height: product.height,
                depth: product.depth,
                primary_image: product.primary_image,
                brand: product.brand.unwrap_or_default(),
                merge_card: product.merge_card.unwrap_or_default(),
                color: product.color.unwrap_or_default(),
                available: stock.map(|s| s.available_stock_count).unwrap_or(0),
                valid: stock.map(|s| s.valid_stock_count).unwrap_or(0),
                type_label,
            }
        })
        .collect();
    rows.sort_by(|a, b| b.available.cmp(&a.available));

    log::info!("{cabinet}: матрица собрана, {} строк", rows.len());
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(offer_id: &str, sku: Option<i64>) -> OzonProduct {
        OzonProduct {
            offer_id: offer_id.to_string(),
            name: "Куртка".to_string(),
            barcode: "460".to_string(),
            width: 1,
            height: 2,
            depth: 3,
            primary_image: "img".to_string(),
            sku,
            brand: Some("Бренд".to_string()),
            merge_card: None,
            color: Some("синий".to_string()),
            product_type: Some("Куртки".to_string()),
        }
    }

    fn stock(sku: i64, available: i64, valid: i64) -> OzonStockRecord {
        OzonStockRecord {
            sku,
            name: "Куртка мужская".to_string(),
            available_stock_count: available,
            valid_stock_count: valid,
        }
    }

    #[test]
    fn stock_counts_sum_per_sku() {
        let rows = merge_products_with_stocks(
            vec![product("A-1", Some(5))],
            vec![stock(5, 3, 2), stock(5, 4, 1)],
            "Havva",
        );
        assert_eq!(7, rows[0].available);
        assert_eq!(3, rows[0].valid);
        assert_eq!("Куртка мужская", rows[0].type_label);
    }

    #[test]
    fn products_without_stock_fall_back_to_attribute_type() {
        let rows = merge_products_with_stocks(vec![product("A-2", Some(6))], vec![], "Havva");
        assert_eq!(0, rows[0].available);
        assert_eq!("Куртки", rows[0].type_label);
    }

    #[test]
    fn rows_sort_by_available_desc() {
        let rows = merge_products_with_stocks(
            vec![product("A-1", Some(1)), product("A-2", Some(2))],
            vec![stock(1, 2, 2), stock(2, 9, 9)],
            "Havva",
        );
        assert_eq!("A-2", rows[0].offer_id);
    }
}
