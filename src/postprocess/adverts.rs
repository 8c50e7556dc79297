//! Weekly aggregation of advertising spend per card.

use crate::wb::adverts::AdvertStatRecord;
use crate::wb::cards::CatalogCard;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyAdvertRow {
    pub imt_id: i64,
    pub week: u8,
    pub spend: Decimal,
    pub nm_id: i64,
    pub ctr: f64,
}

#[derive(Debug, Default)]
struct Sums {
    views: i64,
    clicks: i64,
    atbs: i64,
    orders: i64,
    shks: i64,
    sum_price: Decimal,
    spend: Decimal,
}

/// Groups campaign statistics into (КТ id, ISO week, nm id) buckets with a
/// guarded CTR. The nm → КТ resolution takes the most recently updated card
/// of each nm id.
pub fn weekly_adverts(
    records: Vec<AdvertStatRecord>,
    catalog: &[CatalogCard],
    cabinet: &str,
) -> Vec<WeeklyAdvertRow> {
    let mut latest: HashMap<i64, (&str, i64)> = HashMap::new();
    for card in catalog {
        match latest.get(&card.nm_id) {
            Some((updated_at, _)) if *updated_at >= card.updated_at.as_str() => {}
            _ => {
                latest.insert(card.nm_id, (card.updated_at.as_str(), card.imt_id));
            }
        }
    }

    let total_before: Decimal = records.iter().map(|r| r.spend).sum();
    log::info!(
        "{cabinet}: расход до группировки {total_before}, строк {}",
        records.len()
    );

    let mut buckets: BTreeMap<(i64, u8, i64), Sums> = BTreeMap::new();
    for record in records {
        let week = record.date.map(crate::iso_week).unwrap_or(0);
        let imt_id = latest
            .get(&record.nm_id)
            .map(|(_, imt_id)| *imt_id)
            .unwrap_or(0);
        let sums = buckets.entry((imt_id, week, record.nm_id)).or_default();
        sums.views += record.views;
        sums.clicks += record.clicks;
        sums.atbs += record.atbs;
        sums.orders += record.orders;
        sums.shks += record.shks;
        sums.sum_price += record.sum_price;
        sums.spend += record.spend;
    }

    let rows: Vec<WeeklyAdvertRow> = buckets
        .into_iter()
        .map(|((imt_id, week, nm_id), sums)| WeeklyAdvertRow {
            imt_id,
            week,
            spend: sums.spend,
            nm_id,
            ctr: ctr(sums.clicks, sums.views),
        })
        .collect();

    let total_after: Decimal = rows.iter().map(|r| r.spend).sum();
    log::info!("{cabinet}: агрегация рекламы выполнена, расход {total_after}");
    rows
}

/// Click-through ratio rounded to three digits; zero views give zero instead
/// of a division blow-up.
fn ctr(clicks: i64, views: i64) -> f64 {
    if views == 0 {
        return 0.0;
    }
    (clicks as f64 / views as f64 * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use time::macros::date;

    fn catalog_card(nm_id: i64, imt_id: i64, updated_at: &str) -> CatalogCard {
        CatalogCard {
            nm_id,
            imt_id,
            title: String::new(),
            vendor_code: String::new(),
            brand: String::new(),
            subject: String::new(),
            photo: None,
            width: 0,
            height: 0,
            length: 0,
            size: String::new(),
            barcode: None,
            updated_at: updated_at.to_string(),
        }
    }

    fn record(nm_id: i64, day: time::Date, views: i64, clicks: i64, spend: Decimal) -> AdvertStatRecord {
        AdvertStatRecord {
            advert_id: 1,
            date: Some(day),
            app_type: 1,
            nm_id,
            views,
            clicks,
            atbs: 0,
            orders: 0,
            shks: 0,
            sum_price: Decimal::ZERO,
            spend,
        }
    }

    #[test]
    fn spend_sums_within_a_week() {
        let rows = weekly_adverts(
            vec![
                record(1, date!(2025 - 07 - 28), 100, 5, dec!(40)),
                record(1, date!(2025 - 07 - 29), 100, 5, dec!(60)),
            ],
            &[catalog_card(1, 7, "2025-01-01T00:00:00Z")],
            "Азарья",
        );
        assert_eq!(1, rows.len());
        assert_eq!(dec!(100), rows[0].spend);
        assert_eq!(7, rows[0].imt_id);
        assert_eq!(31, rows[0].week);
    }

    #[test]
    fn zero_views_give_zero_ctr() {
        let rows = weekly_adverts(
            vec![record(1, date!(2025 - 07 - 28), 0, 0, dec!(10))],
            &[],
            "Азарья",
        );
        assert_eq!(0.0, rows[0].ctr);
        assert_eq!(0, rows[0].imt_id);
    }

    #[test]
    fn ctr_is_rounded_to_three_digits() {
        assert_eq!(0.333, ctr(1, 3));
        assert_eq!(0.05, ctr(5, 100));
        assert_eq!(0.0, ctr(0, 100));
    }

    #[test]
    fn latest_card_wins_the_nm_resolution() {
        let rows = weekly_adverts(
            vec![record(1, date!(2025 - 07 - 28), 10, 1, dec!(5))],
            &[
                catalog_card(1, 70, "2025-01-01T00:00:00Z"),
                catalog_card(1, 71, "2025-06-01T00:00:00Z"),
            ],
            "Азарья",
        );
        assert_eq!(71, rows[0].imt_id);
    }
}
