//! Per-cabinet fan-out with isolated failures.
//!
//! One concurrent task per cabinet over a shared client; a broken cabinet
//! turns into a status line, never a process abort. The WB runner fetches the
//! card directory first, since every report joins against it.

use crate::wb::cards::{self, CatalogCard};
use futures::future::join_all;
use reqwest_middleware::ClientWithMiddleware;
use std::future::Future;

#[derive(Debug, Clone)]
pub struct Cabinet {
    pub name: String,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct OzonCabinet {
    pub name: String,
    pub client_id: String,
    pub api_key: String,
}

#[derive(Debug)]
pub enum CabinetStatus {
    Success,
    Skipped(String),
    Failed(String),
}

impl std::fmt::Display for CabinetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CabinetStatus::Success => write!(f, "✅ УСПЕШНО"),
            CabinetStatus::Skipped(reason) => write!(f, "⚠️ ПРОПУЩЕН: {reason}"),
            CabinetStatus::Failed(reason) => write!(f, "❌ ОШИБКА: {reason}"),
        }
    }
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub statuses: Vec<(String, CabinetStatus)>,
}

impl RunReport {
    pub fn log_summary(&self) {
        log::info!("📊 Итоговый отчёт по кабинетам:");
        for (name, status) in &self.statuses {
            log::info!("{name:<15} - {status}");
        }
    }

    pub async fn notify(&self, script: &str) {
        let mut lines = vec![format!("Отчёт '{script}':")];
        for (name, status) in &self.statuses {
            lines.push(format!("{name}: {status}"));
        }
        crate::notify::send_tg_message(&lines.join("\n")).await;
    }

    pub fn has_failures(&self) -> bool {
        self.statuses
            .iter()
            .any(|(_, status)| matches!(status, CabinetStatus::Failed(_)))
    }
}

/// Runs `task` for every WB cabinet concurrently, handing each task the
/// cabinet's freshly fetched card directory. Returns the per-cabinet results
/// in configuration order plus the status report.
pub async fn run_wb_cabinets<T, F, Fut>(
    client: &ClientWithMiddleware,
    cabinets: Vec<Cabinet>,
    task: F,
) -> (Vec<(String, T)>, RunReport)
where
    F: Fn(ClientWithMiddleware, Cabinet, Vec<CatalogCard>) -> Fut,
    Fut: Future<Output = Result<T, anyhow::Error>>,
{
    let task = &task;
    let futures = cabinets.into_iter().map(|cabinet| {
        let client = client.clone();
        async move {
            let name = cabinet.name.clone();
            log::info!("🚀 Запускаю кабинет {name}");
            let cards = match cards::fetch_cards(&client, &name, &cabinet.token).await {
                Ok(cards) => cards,
                Err(err) => {
                    log::error!("Ошибка запроса карточек кабинета {name}: {err}");
                    return (name, Err(CabinetStatus::Failed(err.to_string())));
                }
            };
            if cards.is_empty() {
                log::warn!("{name}: справочник карточек пуст");
                return (
                    name,
                    Err(CabinetStatus::Skipped("пустой справочник карточек".to_string())),
                );
            }
            log::info!("{name}: получено {} строк справочника", cards.len());
            match task(client, cabinet, cards).await {
                Ok(data) => {
                    log::info!("🏁 Кабинет {name} завершён без ошибок");
                    (name, Ok(data))
                }
                Err(err) => {
                    log::error!("❌ Ошибка в кабинете {name}: {err}");
                    (name, Err(CabinetStatus::Failed(err.to_string())))
                }
            }
        }
    });

    collect_results(join_all(futures).await)
}

/// Same fan-out over Ozon credentials; no card prefetch, the task owns its
/// whole pipeline.
pub async fn run_ozon_cabinets<T, F, Fut>(
    client: &ClientWithMiddleware,
    cabinets: Vec<OzonCabinet>,
    task: F,
) -> (Vec<(String, T)>, RunReport)
where
    F: Fn(ClientWithMiddleware, OzonCabinet) -> Fut,
    Fut: Future<Output = Result<T, anyhow::Error>>,
{
    let task = &task;
    let futures = cabinets.into_iter().map(|cabinet| {
        let client = client.clone();
        async move {
            let name = cabinet.name.clone();
            log::info!("🚀 Запускаю кабинет {name}");
            match task(client, cabinet).await {
                Ok(data) => (name, Ok(data)),
                Err(err) => {
                    log::error!("❌ Ошибка в кабинете {name}: {err}");
                    (name, Err(CabinetStatus::Failed(err.to_string())))
                }
            }
        }
    });

    collect_results(join_all(futures).await)
}

fn collect_results<T>(
    outcomes: Vec<(String, Result<T, CabinetStatus>)>,
) -> (Vec<(String, T)>, RunReport) {
    let mut results = vec![];
    let mut report = RunReport::default();
    for (name, outcome) in outcomes {
        match outcome {
            Ok(data) => {
                report.statuses.push((name.clone(), CabinetStatus::Success));
                results.push((name, data));
            }
            Err(status) => report.statuses.push((name, status)),
        }
    }
    report.log_summary();
    (results, report)
}
