//! Остатки Ozon: card attributes joined with stock analytics, one worksheet
//! per cabinet in the Ozon matrix spreadsheet.

use mp_reports::postprocess::ozon::merge_products_with_stocks;
use mp_reports::{config, engine, fetch, notify, ozon, push, sheets};
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    mp_reports::bootstrap()?;
    notify::notify_started("ozon_stocks").await;
    let started = Instant::now();

    let cabinets = config::ozon_cabinets();
    if cabinets.is_empty() {
        anyhow::bail!("Не настроен ни один кабинет Ozon");
    }
    let client = fetch::build_client()?;

    let (data, report) = engine::run_ozon_cabinets(&client, cabinets, |client, cabinet| async move {
        let products = ozon::products::fetch_products(&client, &cabinet).await?;
        let skus = ozon::products::extract_skus(&products);
        let stocks = ozon::stocks::fetch_stocks(&client, &cabinet, &skus).await?;
        Ok(merge_products_with_stocks(products, stocks, &cabinet.name))
    })
    .await;
    report.notify("ozon_stocks").await;
    if report.has_failures() {
        log::warn!("Часть кабинетов завершилась с ошибками, выгружаю остальные");
    }

    if data.is_empty() {
        log::warn!("Нет данных ни по одному кабинету, выгрузка пропущена");
        return Ok(());
    }
    for (name, rows) in &data {
        notify::send_tg_message(&format!("{name} -> {} строк", rows.len())).await;
    }

    let sheets_client = sheets::SheetsClient::from_env()?;
    push::push_ozon_stocks(&sheets_client, &data).await?;

    let elapsed = started.elapsed();
    log::info!("⏱ Время выполнения: {}", mp_reports::format_duration(&elapsed));
    notify::notify_finished("ozon_stocks", &elapsed).await;
    Ok(())
}
