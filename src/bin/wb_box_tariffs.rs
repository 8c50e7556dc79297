//! Тарифы коробов WB: warehouse box tariffs into the matrix spreadsheet.
//! The tariffs are account-independent, one configured token is enough.

use mp_reports::{config, fetch, notify, push, sheets, wb};
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    mp_reports::bootstrap()?;
    notify::notify_started("wb_box_tariffs").await;
    let started = Instant::now();

    let cabinets = config::wb_cabinets();
    let cabinet = cabinets
        .iter()
        .find(|c| c.name == "Рахель")
        .or_else(|| cabinets.first())
        .ok_or_else(|| anyhow::anyhow!("Не настроен ни один кабинет WB"))?;

    let client = fetch::build_client()?;
    let tariffs = wb::tariffs::fetch_box_tariffs(&client, &cabinet.token).await?;
    log::info!("Получено {} складов с тарифами", tariffs.len());

    let sheets_client = sheets::SheetsClient::from_env()?;
    push::push_tariffs(&sheets_client, &tariffs).await?;

    let elapsed = started.elapsed();
    log::info!("⏱ Выполнено за {}", mp_reports::format_duration(&elapsed));
    notify::notify_finished("wb_box_tariffs", &elapsed).await;
    Ok(())
}
