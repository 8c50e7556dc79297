//! Реклама WB: weekly campaign spend per card appended to each finmodel
//! spreadsheet.

use mp_reports::postprocess::adverts::weekly_adverts;
use mp_reports::sheets::CellValue;
use mp_reports::{config, engine, fetch, notify, push, sheets, wb};
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    mp_reports::bootstrap()?;
    notify::notify_started("wb_advertising").await;
    let started = Instant::now();

    let cabinets = config::wb_cabinets();
    if cabinets.is_empty() {
        anyhow::bail!("Не настроен ни один кабинет WB");
    }
    let client = fetch::build_client()?;

    let (data, report) =
        engine::run_wb_cabinets(&client, cabinets, |client, cabinet, cards| async move {
            let stats =
                wb::adverts::fetch_campaign_stats(&client, &cabinet.name, &cabinet.token).await?;
            Ok(weekly_adverts(stats, &cards, &cabinet.name))
        })
        .await;
    report.notify("wb_advertising").await;

    let grouped: Vec<(String, Vec<Vec<CellValue>>)> = data
        .into_iter()
        .map(|(name, rows)| (name, rows.iter().map(push::advert_cells).collect()))
        .collect();

    let sheets_client = sheets::SheetsClient::from_env()?;
    push::append_grouped(&sheets_client, config::SHEET_WB_ADVERT, &grouped).await?;

    let elapsed = started.elapsed();
    log::info!("⏱ Выполнено за {}", mp_reports::format_duration(&elapsed));
    notify::notify_finished("wb_advertising", &elapsed).await;
    Ok(())
}
