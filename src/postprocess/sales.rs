//! Weekly aggregation of the sales funnel, keyed by the КТ grouping id.

use crate::wb::cards::CatalogCard;
use crate::wb::sales::SalesFunnelCard;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklySalesRow {
    pub imt_id: i64,
    pub week: u8,
    pub open_card: i64,
    pub add_to_cart: i64,
    pub orders: i64,
    pub buyouts: i64,
    pub cancels: i64,
    pub orders_sum: Decimal,
}

/// Sums the current-period counters of each card into (КТ id, ISO week)
/// buckets. Cards without a catalog match land under id 0, duplicates are
/// dropped before aggregation.
pub fn weekly_sales(
    cards: Vec<SalesFunnelCard>,
    catalog: &[CatalogCard],
    cabinet: &str,
) -> Vec<WeeklySalesRow> {
    let ids: HashMap<i64, i64> = catalog.iter().map(|c| (c.nm_id, c.imt_id)).collect();

    let mut seen: HashSet<(i64, String)> = HashSet::new();
    let mut buckets: BTreeMap<(i64, u8), WeeklySalesRow> = BTreeMap::new();
    for card in cards {
        let period = &card.statistics.selected_period;
        if !seen.insert((card.nm_id, period.begin.clone())) {
            continue;
        }
        let week = crate::parse_date_prefix(&period.begin)
            .map(crate::iso_week)
            .unwrap_or(0);
        let imt_id = ids.get(&card.nm_id).copied().unwrap_or(0);
        let row = buckets.entry((imt_id, week)).or_insert(WeeklySalesRow {
            imt_id,
            week,
            open_card: 0,
            add_to_cart: 0,
            orders: 0,
            buyouts: 0,
            cancels: 0,
            orders_sum: Decimal::ZERO,
        });
        row.open_card += period.open_card_count;
        row.add_to_cart += period.add_to_cart_count;
        row.orders += period.orders_count;
        row.buyouts += period.buyouts_count;
        row.cancels += period.cancel_count;
        row.orders_sum += period.orders_sum_rub;
    }

    let rows: Vec<WeeklySalesRow> = buckets.into_values().collect();
    log::info!("{cabinet}: воронка сгруппирована в {} строк", rows.len());
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wb::sales::{CardStatistics, PeriodStats};
    use rust_decimal_macros::dec;

    fn catalog_card(nm_id: i64, imt_id: i64) -> CatalogCard {
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
            updated_at: String::new(),
        }
    }

    fn funnel_card(nm_id: i64, begin: &str, orders: i64) -> SalesFunnelCard {
        SalesFunnelCard {
            nm_id,
            vendor_code: String::new(),
            brand_name: String::new(),
            object: Default::default(),
            statistics: CardStatistics {
                selected_period: PeriodStats {
                    begin: begin.to_string(),
                    orders_count: orders,
                    open_card_count: 10,
                    add_to_cart_count: 4,
                    orders_sum_rub: dec!(1000),
                    ..PeriodStats::default()
                },
                previous_period: None,
            },
            stocks: Default::default(),
        }
    }

    #[test]
    fn same_id_and_week_sum_up() {
        // nm 1 and nm 2 share one КТ id, the orders add up: 3 + 5 = 8
        let rows = weekly_sales(
            vec![
                funnel_card(1, "2025-07-28 00:00:00", 3),
                funnel_card(2, "2025-07-28 00:00:00", 5),
            ],
            &[catalog_card(1, 77), catalog_card(2, 77)],
            "Азарья",
        );
        assert_eq!(1, rows.len());
        assert_eq!(77, rows[0].imt_id);
        assert_eq!(31, rows[0].week);
        assert_eq!(8, rows[0].orders);
        assert_eq!(20, rows[0].open_card);
        assert_eq!(dec!(2000), rows[0].orders_sum);
    }

    #[test]
    fn unknown_nm_falls_back_to_zero_id() {
        let rows = weekly_sales(
            vec![funnel_card(404, "2025-07-28 00:00:00", 1)],
            &[catalog_card(1, 77)],
            "Азарья",
        );
        assert_eq!(0, rows[0].imt_id);
    }

    #[test]
    fn exact_duplicates_are_dropped() {
        let rows = weekly_sales(
            vec![
                funnel_card(1, "2025-07-28 00:00:00", 3),
                funnel_card(1, "2025-07-28 00:00:00", 3),
            ],
            &[catalog_card(1, 77)],
            "Азарья",
        );
        assert_eq!(3, rows[0].orders);
    }
}
