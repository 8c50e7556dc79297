//! Spreadsheet upload orchestration: which rows land on which worksheet.
//!
//! Fetching is concurrent per cabinet; everything here runs sequentially so
//! no two writers ever touch the same worksheet.

use crate::config;
use crate::postprocess::adverts::WeeklyAdvertRow;
use crate::postprocess::ozon::OzonMatrixRow;
use crate::postprocess::sales::WeeklySalesRow;
use crate::postprocess::stocks::{BarcodeRow, EnrichedStockRow};
use crate::sheets::{CellValue, SheetsClient};
use crate::wb::tariffs::BoxTariff;
use log_error::LogError;
use std::collections::HashSet;

pub const STOCKS_HEADER: [&str; 15] = [
    "Артикул WB",
    "ID KT",
    "Артикул поставщика",
    "Бренд",
    "Наименование",
    "Категория",
    "Итого остатки",
    "Цена",
    "Скидка",
    "Цена до СПП",
    "Фото",
    "Ширина",
    "Высота",
    "Длина",
    "Кабинет",
];

pub const BARCODES_HEADER: [&str; 4] = ["Артикул WB", "Баркод", "Артикул поставщика", "Размер"];

pub const TARIFFS_HEADER: [&str; 8] = [
    "Доставка_и_хранение",
    "Доставка_базовая",
    "Доставка_за_литр",
    "Хранение_база_день",
    "Хранение_за_литр_день",
    "Склад",
    "dtNextBox",
    "dtTillMax",
];

pub const OZON_HEADER: [&str; 13] = [
    "Артикул",
    "Название товара",
    "Штрихкод",
    "Ширина упаковки, мм",
    "Высота упаковки, мм",
    "Длина упаковки, мм",
    "Ссылка на главное фото",
    "Бренд в одежде и обуви",
    "Объединить на одной карточке",
    "Цвет товара",
    "Количество единиц товара, доступное к продаже",
    "Количество товара без брака и с достаточным сроком годности",
    "Тип",
];

pub fn stock_cells(row: &EnrichedStockRow) -> Vec<CellValue> {
    vec![
        row.nm_id.into(),
        row.imt_id.into(),
        row.supplier_article.as_str().into(),
        row.brand.as_str().into(),
        row.title.as_str().into(),
        row.subject.as_str().into(),
        row.quantity.into(),
        row.price.into(),
        row.discount.into(),
        row.price_after_spp.into(),
        row.photo.as_str().into(),
        row.width.into(),
        row.height.into(),
        row.length.into(),
        row.cabinet.as_str().into(),
    ]
}

pub fn barcode_cells(row: &BarcodeRow) -> Vec<CellValue> {
    vec![
        row.nm_id.into(),
        row.barcode.as_str().into(),
        row.supplier_article.as_str().into(),
        row.size.as_str().into(),
    ]
}

pub fn sales_cells(row: &WeeklySalesRow) -> Vec<CellValue> {
    vec![
        row.imt_id.into(),
        i64::from(row.week).into(),
        row.open_card.into(),
        row.add_to_cart.into(),
        row.orders.into(),
        row.buyouts.into(),
        row.cancels.into(),
        row.orders_sum.into(),
    ]
}

pub fn advert_cells(row: &WeeklyAdvertRow) -> Vec<CellValue> {
    vec![
        row.imt_id.into(),
        i64::from(row.week).into(),
        row.spend.into(),
        row.nm_id.into(),
        row.ctr.into(),
    ]
}

pub fn tariff_cells(row: &BoxTariff) -> Vec<CellValue> {
    vec![
        row.delivery_and_storage_expr.into(),
        row.delivery_base.into(),
        row.delivery_liter.into(),
        row.storage_base.into(),
        row.storage_liter.into(),
        row.warehouse.as_str().into(),
        row.dt_next_box.as_str().into(),
        row.dt_till_max.as_str().into(),
    ]
}

pub fn ozon_cells(row: &OzonMatrixRow) -> Vec<CellValue> {
    vec![
        row.offer_id.as_str().into(),
        row.name.as_str().into(),
        row.barcode.as_str().into(),
        row.width.into(),
        row.height.into(),
        row.depth.into(),
        row.primary_image.as_str().into(),
        row.brand.as_str().into(),
        row.merge_card.as_str().into(),
        row.color.as_str().into(),
        row.available.into(),
        row.valid.into(),
        row.type_label.as_str().into(),
    ]
}

/// nm ids flagged in the БЛОК worksheet: first column `0` means blocked, the
/// second holds the nm id. Any read problem degrades to an empty set.
pub async fn read_blocklist(client: &SheetsClient) -> HashSet<i64> {
    let values = async {
        client
            .open(config::MATRIX_SPREADSHEET)
            .await?
            .worksheet(config::SHEET_BLOCKLIST)
            .await?
            .values()
            .await
    }
    .await;
    match values.log_error("Ошибка чтения листа БЛОК") {
        Some(values) => {
            let block = parse_blocklist(&values);
            log::info!("Найдено {} заблокированных nm id", block.len());
            block
        }
        None => HashSet::new(),
    }
}

fn parse_blocklist(values: &[Vec<String>]) -> HashSet<i64> {
    values
        .iter()
        .skip(1)
        .filter_map(|row| {
            let flag: i64 = row.first()?.trim().parse().ok()?;
            if flag != 0 {
                return None;
            }
            row.get(1)?.trim().parse().ok()
        })
        .collect()
}

/// Concatenated cabinet stocks into the master matrix, blocked nm ids
/// dropped, worksheet rewritten from the first cell.
pub async fn push_concat_stocks(
    client: &SheetsClient,
    data: &[(String, Vec<EnrichedStockRow>)],
    blocklist: &HashSet<i64>,
) -> Result<(), anyhow::Error> {
    let mut rows: Vec<Vec<CellValue>> = vec![STOCKS_HEADER.iter().map(|h| (*h).into()).collect()];
    let mut dropped = 0usize;
    for (_, cabinet_rows) in data {
        for row in cabinet_rows {
            if blocklist.contains(&row.nm_id) {
                dropped += 1;
                continue;
            }
            rows.push(stock_cells(row));
        }
    }
    log::info!(
        "Объединено строк остатков: {} (отфильтровано по БЛОК: {dropped})",
        rows.len() - 1
    );

    let worksheet = client
        .open(config::MATRIX_SPREADSHEET)
        .await?
        .worksheet(config::SHEET_GROUP_STOCKS)
        .await?;
    worksheet.clear().await?;
    worksheet.update("A1", &rows).await?;
    log::info!("✅ Остатки выгружены в лист '{}'", config::SHEET_GROUP_STOCKS);
    Ok(())
}

/// Full barcode lookup of every cabinet into the second matrix worksheet.
pub async fn push_all_barcodes(
    client: &SheetsClient,
    data: &[(String, Vec<BarcodeRow>)],
) -> Result<(), anyhow::Error> {
    let mut rows: Vec<Vec<CellValue>> =
        vec![BARCODES_HEADER.iter().map(|h| (*h).into()).collect()];
    rows.extend(
        data.iter()
            .flat_map(|(_, cabinet_rows)| cabinet_rows.iter().map(barcode_cells)),
    );

    let worksheet = client
        .open(config::MATRIX_SPREADSHEET)
        .await?
        .worksheet(config::SHEET_ALL_BARCODES)
        .await?;
    worksheet.batch_clear(&["A:D"]).await?;
    worksheet.update("A1", &rows).await?;
    log::info!("✅ Баркоды выгружены в лист '{}'", config::SHEET_ALL_BARCODES);
    Ok(())
}

/// Refreshes the barcode worksheet of every finmodel spreadsheet with the
/// barcodes of its own cabinets.
pub async fn update_barcodes(
    client: &SheetsClient,
    data: &[(String, Vec<BarcodeRow>)],
) -> Result<(), anyhow::Error> {
    for (table, rows) in group_by_finmodel(data) {
        let mut cells: Vec<Vec<CellValue>> =
            vec![BARCODES_HEADER.iter().map(|h| (*h).into()).collect()];
        cells.extend(rows.iter().copied().map(barcode_cells));

        let worksheet = async {
            client
                .open(table)
                .await?
                .worksheet(config::SHEET_WB_BARCODE)
                .await
        }
        .await;
        // one broken finmodel spreadsheet must not stop the rest
        let worksheet = match worksheet.log_error(&format!("Ошибка при открытии '{table}'")) {
            Some(worksheet) => worksheet,
            None => continue,
        };
        let uploaded = async {
            worksheet.batch_clear(&["A:C"]).await?;
            worksheet.update("A1", &cells).await
        }
        .await;
        if uploaded
            .log_error(&format!("Ошибка загрузки баркодов в '{table}'"))
            .is_none()
        {
            continue;
        }
        log::info!("✅ Баркоды обновлены: '{table}' → '{}'", config::SHEET_WB_BARCODE);
    }
    Ok(())
}

/// Appends weekly rows after the last occupied row of the named worksheet in
/// every finmodel spreadsheet, resizing the grid when it is too small.
pub async fn append_grouped(
    client: &SheetsClient,
    worksheet_name: &str,
    data: &[(String, Vec<Vec<CellValue>>)],
) -> Result<(), anyhow::Error> {
    for (table, rows) in group_by_finmodel(data) {
        let spreadsheet = client.open(table).await?;
        let worksheet = spreadsheet.worksheet(worksheet_name).await?;

        let existing = worksheet.values().await?;
        let start_row = existing.len() as i64 + 1;
        let req_rows = start_row + rows.len() as i64;
        let req_cols = rows.iter().map(|r| r.len() as i64).max().unwrap_or(0);
        if req_rows > worksheet.row_count || req_cols > worksheet.col_count {
            worksheet
                .resize(
                    req_rows.max(worksheet.row_count),
                    req_cols.max(worksheet.col_count),
                )
                .await?;
        }

        log::info!(
            "📤 '{table}': добавляю {} строк в '{worksheet_name}' начиная с A{start_row}",
            rows.len()
        );
        let cells: Vec<Vec<CellValue>> = rows.into_iter().cloned().collect();
        worksheet.update(&format!("A{start_row}"), &cells).await?;
    }
    log::info!("📤 Данные выгружены в лист '{worksheet_name}'");
    Ok(())
}

/// Box tariffs worksheet, rewritten in place.
pub async fn push_tariffs(
    client: &SheetsClient,
    tariffs: &[BoxTariff],
) -> Result<(), anyhow::Error> {
    let mut rows: Vec<Vec<CellValue>> = vec![TARIFFS_HEADER.iter().map(|h| (*h).into()).collect()];
    rows.extend(tariffs.iter().map(tariff_cells));

    let worksheet = client
        .open(config::MATRIX_SPREADSHEET)
        .await?
        .worksheet(config::SHEET_BOX_TARIFFS)
        .await?;
    worksheet.batch_clear(&["A:H"]).await?;
    worksheet.update("A1", &rows).await?;
    log::info!("✅ Тарифы выгружены в лист '{}'", config::SHEET_BOX_TARIFFS);
    Ok(())
}

/// One worksheet per Ozon cabinet in the Ozon matrix, created on first run.
pub async fn push_ozon_stocks(
    client: &SheetsClient,
    data: &[(String, Vec<OzonMatrixRow>)],
) -> Result<(), anyhow::Error> {
    let spreadsheet = client.open(config::OZON_MATRIX_SPREADSHEET).await?;
    for (name, matrix_rows) in data {
        let sheet_name = format!("{}_{name}", config::SHEET_OZON_STOCKS);
        let mut rows: Vec<Vec<CellValue>> =
            vec![OZON_HEADER.iter().map(|h| (*h).into()).collect()];
        rows.extend(matrix_rows.iter().map(ozon_cells));

        let worksheet = spreadsheet
            .worksheet_or_create(&sheet_name, rows.len() as i64, OZON_HEADER.len() as i64)
            .await?;
        worksheet.batch_clear(&["A:M"]).await?;
        worksheet.update("A1", &rows).await?;
        log::info!("✅ {name}: выгружено {} строк в '{sheet_name}'", rows.len() - 1);
    }
    Ok(())
}

/// Collects the rows of each finmodel's cabinets, preserving cabinet order.
fn group_by_finmodel<'a, T>(data: &'a [(String, Vec<T>)]) -> Vec<(&'static str, Vec<&'a T>)> {
    config::group_map()
        .iter()
        .filter_map(|(table, names)| {
            let rows: Vec<&T> = data
                .iter()
                .filter(|(name, _)| names.contains(&name.as_str()))
                .flat_map(|(_, rows)| rows.iter())
                .collect();
            if rows.is_empty() {
                log::warn!("⚠️ {table}: нет данных для выгрузки");
                return None;
            }
            Some((*table, rows))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocklist_takes_only_zero_flagged_rows() {
        let values = vec![
            vec!["Флаг".to_string(), "Артикул WB".to_string()],
            vec!["0".to_string(), "111".to_string()],
            vec!["1".to_string(), "222".to_string()],
            vec!["0".to_string(), "333".to_string()],
            vec!["мусор".to_string(), "444".to_string()],
            vec!["0".to_string()],
        ];
        let block = parse_blocklist(&values);
        assert_eq!(HashSet::from([111, 333]), block);
    }

    #[test]
    fn finmodel_grouping_follows_the_map() {
        let data = vec![
            ("Азарья".to_string(), vec![1, 2]),
            ("Михаил".to_string(), vec![3]),
            ("Галилова".to_string(), vec![4]),
            ("Неизвестный".to_string(), vec![5]),
        ];
        let grouped = group_by_finmodel(&data);
        assert_eq!(2, grouped.len());
        assert_eq!("Фин модель Иосифовы Р А М", grouped[0].0);
        assert_eq!(vec![&1, &2, &3], grouped[0].1);
        assert_eq!("Фин модель Галилова", grouped[1].0);
    }

    #[test]
    fn header_widths_match_row_builders() {
        use rust_decimal_macros::dec;
        let stock = EnrichedStockRow {
            nm_id: 1,
            imt_id: 2,
            supplier_article: "ART".to_string(),
            brand: "Бренд".to_string(),
            title: "Платье".to_string(),
            subject: "Платья".to_string(),
            quantity: 5,
            price: dec!(100),
            discount: dec!(20),
            price_after_spp: dec!(80),
            photo: "img".to_string(),
            width: 1,
            height: 2,
            length: 3,
            cabinet: "Азарья".to_string(),
        };
        assert_eq!(STOCKS_HEADER.len(), stock_cells(&stock).len());

        let barcode = BarcodeRow {
            nm_id: 1,
            barcode: "101".to_string(),
            supplier_article: "ART".to_string(),
            size: "42".to_string(),
        };
        assert_eq!(BARCODES_HEADER.len(), barcode_cells(&barcode).len());
    }
}
