//! Остатки WB: supplier stocks of every cabinet, reconciled with the card
//! directory and pushed into the matrix spreadsheet plus the per-finmodel
//! barcode worksheets.

use mp_reports::postprocess::stocks::{merge_stocks_with_catalog, BarcodeRow, EnrichedStockRow};
use mp_reports::{config, engine, fetch, notify, push, sheets, wb};
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    mp_reports::bootstrap()?;
    notify::notify_started("wb_stocks").await;
    let started = Instant::now();

    let cabinets = config::wb_cabinets();
    if cabinets.is_empty() {
        anyhow::bail!("Не настроен ни один кабинет WB");
    }
    let client = fetch::build_client()?;

    let (data, report) =
        engine::run_wb_cabinets(&client, cabinets, |client, cabinet, cards| async move {
            let stocks = wb::stocks::fetch_stocks(&client, &cabinet.name, &cabinet.token).await?;
            Ok(merge_stocks_with_catalog(stocks, cards, &cabinet.name))
        })
        .await;
    report.notify("wb_stocks").await;

    if data.is_empty() {
        log::warn!("Нет данных ни по одному кабинету, выгрузка пропущена");
        return Ok(());
    }

    let stocks_data: Vec<(String, Vec<EnrichedStockRow>)> = data
        .iter()
        .map(|(name, (rows, _))| (name.clone(), rows.clone()))
        .collect();
    let barcode_data: Vec<(String, Vec<BarcodeRow>)> = data
        .into_iter()
        .map(|(name, (_, barcodes))| (name, barcodes))
        .collect();

    let sheets_client = sheets::SheetsClient::from_env()?;
    let blocklist = push::read_blocklist(&sheets_client).await;
    push::push_concat_stocks(&sheets_client, &stocks_data, &blocklist).await?;
    push::push_all_barcodes(&sheets_client, &barcode_data).await?;
    push::update_barcodes(&sheets_client, &barcode_data).await?;

    let elapsed = started.elapsed();
    log::info!("😎 Время выполнения: {}", mp_reports::format_duration(&elapsed));
    notify::notify_finished("wb_stocks", &elapsed).await;
    Ok(())
}
