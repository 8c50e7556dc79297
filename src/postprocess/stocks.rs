//! Stock × catalog reconciliation.
//!
//! Outer join on (nm id, barcode). Stock rows without a card are the
//! "problem cards": logged and excluded. Card rows without stock stay, with
//! price/discount carried forward inside the nm id and gaps filled with
//! zeros and dashes. Quantities are summed per distinct row, a discounted
//! price is derived, and a barcode lookup table is split off.

use crate::wb::cards::CatalogCard;
use crate::wb::stocks::StockRecord;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Catalog-enriched stock row, one per nm id after the final regroup.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedStockRow {
    pub nm_id: i64,
    pub imt_id: i64,
    pub supplier_article: String,
    pub brand: String,
    pub title: String,
    pub subject: String,
    pub quantity: i64,
    pub price: Decimal,
    pub discount: Decimal,
    pub price_after_spp: Decimal,
    pub photo: String,
    pub width: i64,
    pub height: i64,
    pub length: i64,
    pub cabinet: String,
}

/// nm id ↔ barcode ↔ supplier article lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct BarcodeRow {
    pub nm_id: i64,
    pub barcode: String,
    pub supplier_article: String,
    pub size: String,
}

#[derive(Debug, Clone, PartialEq)]
struct MergedRow {
    nm_id: i64,
    imt_id: i64,
    title: String,
    supplier_article: String,
    brand: String,
    size: String,
    barcode: String,
    subject: String,
    photo: String,
    width: i64,
    height: i64,
    length: i64,
    quantity: i64,
    price: Option<Decimal>,
    discount: Option<Decimal>,
    stock_only: bool,
}

pub fn merge_stocks_with_catalog(
    stocks: Vec<StockRecord>,
    catalog: Vec<CatalogCard>,
    cabinet: &str,
) -> (Vec<EnrichedStockRow>, Vec<BarcodeRow>) {
    let mut merged = outer_join(&stocks, &catalog);
    forward_fill_prices(&mut merged);

    for row in merged.iter_mut() {
        row.price.get_or_insert(Decimal::ZERO);
        row.discount.get_or_insert(Decimal::ZERO);
    }

    let problems: Vec<i64> = merged
        .iter()
        .filter(|r| r.stock_only)
        .map(|r| r.nm_id)
        .collect();
    if problems.is_empty() {
        log::info!("✅ Косячных карточек в {cabinet} не найдено");
    } else {
        log::warn!(
            "Косячные карточки кабинета {cabinet}: {} шт. {problems:?}",
            problems.len()
        );
    }
    merged.retain(|r| !r.stock_only);

    let merged = group_quantities(merged, |r| {
        (
            r.nm_id,
            r.imt_id,
            r.title.clone(),
            r.supplier_article.clone(),
            r.brand.clone(),
            r.size.clone(),
            r.barcode.clone(),
            r.subject.clone(),
            r.photo.clone(),
            (r.width, r.height, r.length),
            r.price,
            r.discount,
        )
    });

    let barcode_rows: Vec<BarcodeRow> = merged
        .iter()
        .map(|r| BarcodeRow {
            nm_id: r.nm_id,
            barcode: r.barcode.clone(),
            supplier_article: r.supplier_article.clone(),
            size: r.size.clone(),
        })
        .collect();

    // Sizes and barcodes fold away; the first price of an nm id speaks for
    // all of its rows.
    let mut first_price: HashMap<i64, (Option<Decimal>, Option<Decimal>)> = HashMap::new();
    for row in &merged {
        first_price
            .entry(row.nm_id)
            .or_insert((row.price, row.discount));
    }
    let mut merged = merged;
    for row in merged.iter_mut() {
        if let Some((price, discount)) = first_price.get(&row.nm_id) {
            row.price = *price;
            row.discount = *discount;
        }
        row.size = String::new();
        row.barcode = String::new();
    }

    let merged = group_quantities(merged, |r| {
        (
            r.nm_id,
            r.imt_id,
            r.title.clone(),
            r.supplier_article.clone(),
            r.brand.clone(),
            String::new(),
            String::new(),
            r.subject.clone(),
            r.photo.clone(),
            (r.width, r.height, r.length),
            r.price,
            r.discount,
        )
    });

    let mut result: Vec<EnrichedStockRow> = merged
        .into_iter()
        .map(|r| {
            let price = r.price.unwrap_or(Decimal::ZERO);
            let discount = r.discount.unwrap_or(Decimal::ZERO);
            EnrichedStockRow {
                nm_id: r.nm_id,
                imt_id: r.imt_id,
                supplier_article: r.supplier_article,
                brand: r.brand,
                title: r.title,
                subject: r.subject,
                quantity: r.quantity,
                price,
                discount,
                price_after_spp: price_after_spp(price, discount),
                photo: r.photo,
                width: r.width,
                height: r.height,
                length: r.length,
                cabinet: cabinet.to_string(),
            }
        })
        .collect();
    result.sort_by(|a, b| b.quantity.cmp(&a.quantity));

    (result, barcode_rows)
}

/// Price the buyer sees after the platform discount.
pub fn price_after_spp(price: Decimal, discount: Decimal) -> Decimal {
    price * (Decimal::ONE - discount / Decimal::ONE_HUNDRED)
}

/// Catalog rows drive the join; unmatched stock rows trail behind flagged as
/// stock-only, the same shape an indicator outer merge produces.
fn outer_join(stocks: &[StockRecord], catalog: &[CatalogCard]) -> Vec<MergedRow> {
    let mut stock_index: HashMap<(i64, &str), Vec<usize>> = HashMap::new();
    for (idx, stock) in stocks.iter().enumerate() {
        stock_index
            .entry((stock.nm_id, stock.barcode.as_str()))
            .or_default()
            .push(idx);
    }

    let mut used = vec![false; stocks.len()];
    let mut merged = vec![];
    for card in catalog {
        let matches = card
            .barcode
            .as_deref()
            .and_then(|barcode| stock_index.get(&(card.nm_id, barcode)));
        match matches {
            Some(indices) => {
                for &idx in indices {
                    used[idx] = true;
                    let stock = &stocks[idx];
                    merged.push(MergedRow {
                        quantity: stock.quantity,
                        price: stock.price,
                        discount: stock.discount,
                        ..card_row(card)
                    });
                }
            }
            None => merged.push(card_row(card)),
        }
    }

    for (idx, stock) in stocks.iter().enumerate() {
        if used[idx] {
            continue;
        }
        merged.push(MergedRow {
            nm_id: stock.nm_id,
            imt_id: 0,
            title: "-".to_string(),
            supplier_article: String::new(),
            brand: "-".to_string(),
            size: "-".to_string(),
            barcode: stock.barcode.clone(),
            subject: "-".to_string(),
            photo: String::new(),
            width: 0,
            height: 0,
            length: 0,
            quantity: stock.quantity,
            price: stock.price,
            discount: stock.discount,
            stock_only: true,
        });
    }
    merged
}

fn card_row(card: &CatalogCard) -> MergedRow {
    MergedRow {
        nm_id: card.nm_id,
        imt_id: card.imt_id,
        title: card.title.clone(),
        supplier_article: card.vendor_code.clone(),
        brand: card.brand.clone(),
        size: card.size.clone(),
        barcode: card.barcode.clone().unwrap_or_default(),
        subject: card.subject.clone(),
        photo: card.photo.clone().unwrap_or_default(),
        width: card.width,
        height: card.height,
        length: card.length,
        quantity: 0,
        price: None,
        discount: None,
        stock_only: false,
    }
}

/// Carries the last known price/discount of an nm id into its later gap rows.
fn forward_fill_prices(rows: &mut [MergedRow]) {
    let mut last: HashMap<i64, (Option<Decimal>, Option<Decimal>)> = HashMap::new();
    for row in rows.iter_mut() {
        let entry = last.entry(row.nm_id).or_insert((None, None));
        match row.price {
            Some(price) => entry.0 = Some(price),
            None => row.price = entry.0,
        }
        match row.discount {
            Some(discount) => entry.1 = Some(discount),
            None => row.discount = entry.1,
        }
    }
}

type GroupKey = (
    i64,
    i64,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    (i64, i64, i64),
    Option<Decimal>,
    Option<Decimal>,
);

/// Groups by every non-quantity column and sums the quantities, first-seen
/// order preserved.
fn group_quantities(rows: Vec<MergedRow>, key: impl Fn(&MergedRow) -> GroupKey) -> Vec<MergedRow> {
    let mut order: Vec<MergedRow> = vec![];
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    for row in rows {
        match index.get(&key(&row)) {
            Some(&idx) => order[idx].quantity += row.quantity,
            None => {
                index.insert(key(&row), order.len());
                order.push(row);
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use time::macros::date;

    fn card(nm_id: i64, barcode: &str, size: &str) -> CatalogCard {
        CatalogCard {
            nm_id,
            imt_id: nm_id * 10,
            title: "Платье летнее".to_string(),
            vendor_code: "ART-1".to_string(),
            brand: "Бренд".to_string(),
            subject: "Платья".to_string(),
            photo: Some("https://img/big".to_string()),
            width: 20,
            height: 30,
            length: 5,
            size: size.to_string(),
            barcode: Some(barcode.to_string()),
            updated_at: "2025-07-01T00:00:00Z".to_string(),
        }
    }

    fn stock(nm_id: i64, barcode: &str, quantity: i64, price: Option<Decimal>) -> StockRecord {
        StockRecord {
            nm_id,
            barcode: barcode.to_string(),
            size: "42".to_string(),
            brand: "Бренд".to_string(),
            supplier_article: "ART-1".to_string(),
            quantity,
            price,
            discount: price.map(|_| dec!(20)),
            last_change: Some(date!(2025 - 07 - 01)),
        }
    }

    #[test]
    fn matched_pairs_appear_exactly_once() {
        let (rows, barcodes) = merge_stocks_with_catalog(
            vec![
                stock(1, "101", 3, Some(dec!(100))),
                stock(1, "101", 4, Some(dec!(100))),
            ],
            vec![card(1, "101", "42")],
            "Азарья",
        );
        assert_eq!(1, rows.len());
        // two warehouse rows of the same barcode collapse, quantities summed
        assert_eq!(7, rows[0].quantity);
        assert_eq!(
            1,
            barcodes
                .iter()
                .filter(|b| b.nm_id == 1 && b.barcode == "101")
                .count()
        );
    }

    #[test]
    fn stock_only_rows_are_problem_cards() {
        let (rows, barcodes) = merge_stocks_with_catalog(
            vec![
                stock(1, "101", 3, Some(dec!(100))),
                stock(99, "999", 5, Some(dec!(500))),
            ],
            vec![card(1, "101", "42")],
            "Азарья",
        );
        assert!(rows.iter().all(|r| r.nm_id != 99));
        assert!(barcodes.iter().all(|b| b.nm_id != 99));
    }

    #[test]
    fn catalog_only_rows_survive_with_zero_quantity() {
        let (rows, _) = merge_stocks_with_catalog(
            vec![stock(1, "101", 3, Some(dec!(100)))],
            vec![card(1, "101", "42"), card(2, "202", "44")],
            "Азарья",
        );
        let no_stock = rows
            .iter()
            .find(|r| r.nm_id == 2)
            .expect("catalog-only row kept");
        assert_eq!(0, no_stock.quantity);
        assert_eq!(Decimal::ZERO, no_stock.price);
    }

    #[test]
    fn forward_fill_resolves_missing_prices() {
        // two barcodes of one card: the first has a price, the second does not
        let (rows, _) = merge_stocks_with_catalog(
            vec![
                stock(1, "101", 3, Some(dec!(150))),
                stock(1, "102", 2, None),
            ],
            vec![card(1, "101", "42"), card(1, "102", "44")],
            "Азарья",
        );
        assert_eq!(1, rows.len());
        assert_eq!(dec!(150), rows[0].price);
        assert_eq!(5, rows[0].quantity);
    }

    #[test]
    fn discounted_price_is_derived() {
        assert_eq!(dec!(80), price_after_spp(dec!(100), dec!(20)));
        assert_eq!(dec!(100), price_after_spp(dec!(100), Decimal::ZERO));
        let (rows, _) = merge_stocks_with_catalog(
            vec![stock(1, "101", 3, Some(dec!(100)))],
            vec![card(1, "101", "42")],
            "Азарья",
        );
        assert_eq!(dec!(80), rows[0].price_after_spp);
    }

    #[test]
    fn result_is_sorted_by_quantity_and_tagged_with_cabinet() {
        let (rows, _) = merge_stocks_with_catalog(
            vec![
                stock(1, "101", 2, Some(dec!(100))),
                stock(2, "202", 9, Some(dec!(100))),
            ],
            vec![card(1, "101", "42"), card(2, "202", "44")],
            "Рахель",
        );
        assert_eq!(vec![9, 2], rows.iter().map(|r| r.quantity).collect::<Vec<_>>());
        assert!(rows.iter().all(|r| r.cabinet == "Рахель"));
    }

    #[test]
    fn sizes_fold_into_one_row_per_nm() {
        let (rows, barcodes) = merge_stocks_with_catalog(
            vec![
                stock(1, "101", 3, Some(dec!(100))),
                stock(1, "102", 4, Some(dec!(100))),
            ],
            vec![card(1, "101", "42"), card(1, "102", "44")],
            "Азарья",
        );
        assert_eq!(1, rows.len());
        assert_eq!(7, rows[0].quantity);
        // the lookup table still keeps both barcodes
        assert_eq!(2, barcodes.len());
    }
}
