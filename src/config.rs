//! Static cabinet, spreadsheet and pacing configuration.
//!
//! Cabinet credentials live in the environment (one variable per cabinet);
//! everything that maps names to destinations is code, the same tables the
//! reporting spreadsheets are built around.

use crate::engine::{Cabinet, OzonCabinet};
use once_cell::sync::Lazy;
use std::time::Duration;

/// Master WB reporting spreadsheet.
pub const MATRIX_SPREADSHEET: &str = "Ассортиментная матрица. Полная";
/// Master Ozon reporting spreadsheet.
pub const OZON_MATRIX_SPREADSHEET: &str = "Ассортиментная матрица OZON";

pub const SHEET_GROUP_STOCKS: &str = "API";
pub const SHEET_ALL_BARCODES: &str = "API 2";
pub const SHEET_BLOCKLIST: &str = "БЛОК";
pub const SHEET_WB_ADVERT: &str = "API WB РК";
pub const SHEET_WB_SALES: &str = "API WB Воронка";
pub const SHEET_WB_BARCODE: &str = "API WB barcode";
pub const SHEET_BOX_TARIFFS: &str = "API(Тарифы коробов)";
pub const SHEET_OZON_STOCKS: &str = "API OZ Остатки";

const WB_CABINET_KEYS: [(&str, &str); 6] = [
    ("Азарья", "AZARYA"),
    ("Михаил", "MICHAEL"),
    ("Рахель", "RACHEL"),
    ("Галилова", "GALILOVA"),
    ("Мартыненко", "MARTYNENKO"),
    ("Мелихов", "MELIKHOV"),
];

const OZON_CABINET_KEYS: [(&str, &str, &str); 3] = [
    ("Havva", "HAVVA_CLIENT_ID_OZ", "HAVVA_API_KEY_OZ"),
    ("Gabriel", "GABRIEL_CLIENT_ID_OZ", "GABRIEL_API_KEY_OZ"),
    ("UCARE", "UCARE_CLIENT_ID_OZ", "UCARE_API_KEY_OZ"),
];

/// WB cabinets with a token present in the environment. A cabinet with a
/// missing token is logged and left out so the rest of the run proceeds.
pub fn wb_cabinets() -> Vec<Cabinet> {
    WB_CABINET_KEYS
        .iter()
        .filter_map(|(name, key)| match crate::env_var(key) {
            Ok(token) if !token.is_empty() => Some(Cabinet {
                name: name.to_string(),
                token,
            }),
            _ => {
                log::warn!("Кабинет {name}: токен {key} не задан, пропускаю");
                None
            }
        })
        .collect()
}

pub fn ozon_cabinets() -> Vec<OzonCabinet> {
    OZON_CABINET_KEYS
        .iter()
        .filter_map(|(name, client_key, api_key)| {
            match (crate::env_var(client_key), crate::env_var(api_key)) {
                (Ok(client_id), Ok(api_key)) if !client_id.is_empty() && !api_key.is_empty() => {
                    Some(OzonCabinet {
                        name: name.to_string(),
                        client_id,
                        api_key,
                    })
                }
                _ => {
                    log::warn!("Кабинет {name}: не заданы {client_key}/{api_key}, пропускаю");
                    None
                }
            }
        })
        .collect()
}

/// Finmodel spreadsheet title → cabinets whose rows land in it.
pub fn group_map() -> &'static [(&'static str, &'static [&'static str])] {
    &[
        ("Фин модель Иосифовы Р А М", &["Азарья", "Рахель", "Михаил"]),
        ("Фин модель Галилова", &["Галилова"]),
        ("Фин модель Мартыненко", &["Мартыненко", "Торгмаксимум"]),
    ]
}

fn env_duration(key: &str, default_value: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|raw| duration_str::parse(raw.trim()).ok())
        .unwrap_or(default_value)
}

/// Pause between catalog/product pages; the marketplaces rate-limit hard.
pub static PAGE_DELAY: Lazy<Duration> =
    Lazy::new(|| env_duration("PAGE_DELAY", Duration::from_secs(3)));

/// The sales-funnel endpoint is the strictest one: 3 requests per minute.
pub static FUNNEL_PAGE_DELAY: Lazy<Duration> =
    Lazy::new(|| env_duration("FUNNEL_PAGE_DELAY", Duration::from_secs(21)));
