//! Box storage and delivery tariffs per warehouse.
//!
//! The endpoint reports rates as strings with decimal commas and `-` for
//! missing values; everything lands as a number or zero.

use super::FetchError;
use reqwest_middleware::ClientWithMiddleware;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

const TARIFFS_BOX_URL: &str = "https://common-api.wildberries.ru/api/v1/tariffs/box";

#[derive(Debug, Deserialize)]
struct TariffsResponse {
    response: TariffsBody,
}

#[derive(Debug, Deserialize)]
struct TariffsBody {
    data: TariffsData,
}

#[derive(Debug, Deserialize)]
struct TariffsData {
    #[serde(rename = "dtNextBox", default)]
    dt_next_box: String,
    #[serde(rename = "dtTillMax", default)]
    dt_till_max: String,
    #[serde(rename = "warehouseList", default)]
    warehouse_list: Vec<WarehouseTariff>,
}

#[derive(Debug, Deserialize)]
struct WarehouseTariff {
    #[serde(rename = "warehouseName", default)]
    warehouse_name: String,
    #[serde(rename = "boxDeliveryAndStorageExpr", deserialize_with = "de_rate", default)]
    delivery_and_storage_expr: Decimal,
    #[serde(rename = "boxDeliveryBase", deserialize_with = "de_rate", default)]
    delivery_base: Decimal,
    #[serde(rename = "boxDeliveryLiter", deserialize_with = "de_rate", default)]
    delivery_liter: Decimal,
    #[serde(rename = "boxStorageBase", deserialize_with = "de_rate", default)]
    storage_base: Decimal,
    #[serde(rename = "boxStorageLiter", deserialize_with = "de_rate", default)]
    storage_liter: Decimal,
}

/// One row per warehouse; the report-level action dates repeat on each row
/// so the sheet stays flat.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxTariff {
    pub warehouse: String,
    pub delivery_and_storage_expr: Decimal,
    pub delivery_base: Decimal,
    pub delivery_liter: Decimal,
    pub storage_base: Decimal,
    pub storage_liter: Decimal,
    pub dt_next_box: String,
    pub dt_till_max: String,
}

pub async fn fetch_box_tariffs(
    client: &ClientWithMiddleware,
    token: &str,
) -> Result<Vec<BoxTariff>, FetchError> {
    let response: TariffsResponse = super::get_json(
        client,
        TARIFFS_BOX_URL,
        token,
        &[("date", crate::format_date(crate::moscow_today()))],
    )
    .await?;
    let data = response.response.data;
    let rows = data
        .warehouse_list
        .into_iter()
        .map(|w| BoxTariff {
            warehouse: w.warehouse_name,
            delivery_and_storage_expr: w.delivery_and_storage_expr,
            delivery_base: w.delivery_base,
            delivery_liter: w.delivery_liter,
            storage_base: w.storage_base,
            storage_liter: w.storage_liter,
            dt_next_box: data.dt_next_box.clone(),
            dt_till_max: data.dt_till_max.clone(),
        })
        .collect();
    Ok(rows)
}

fn de_rate<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawRate {
        Num(f64),
        Str(String),
    }
    match Option::<RawRate>::deserialize(deserializer)? {
        None => Ok(Decimal::ZERO),
        Some(RawRate::Num(n)) => Ok(Decimal::try_from(n).unwrap_or(Decimal::ZERO)),
        Some(RawRate::Str(s)) => {
            let cleaned = s.trim().replace(',', ".");
            if cleaned.is_empty() || cleaned == "-" {
                return Ok(Decimal::ZERO);
            }
            Ok(cleaned.parse().unwrap_or(Decimal::ZERO))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn decodes_comma_rates_and_dashes() {
        let raw = json!({
            "response": {
                "data": {
                    "dtNextBox": "2025-08-01",
                    "dtTillMax": "2025-08-31",
                    "warehouseList": [
                        {
                            "warehouseName": "Коледино",
                            "boxDeliveryAndStorageExpr": "160",
                            "boxDeliveryBase": "48,75",
                            "boxDeliveryLiter": "11,2",
                            "boxStorageBase": "-",
                            "boxStorageLiter": "0,07"
                        }
                    ]
                }
            }
        });
        let decoded: TariffsResponse =
            serde_json::from_value(raw).expect("tariffs payload decodes");
        let data = decoded.response.data;
        assert_eq!("2025-08-01", data.dt_next_box);
        let w = &data.warehouse_list[0];
        assert_eq!("Коледино", w.warehouse_name);
        assert_eq!(dec!(48.75), w.delivery_base);
        assert_eq!(dec!(11.2), w.delivery_liter);
        assert_eq!(Decimal::ZERO, w.storage_base);
        assert_eq!(dec!(0.07), w.storage_liter);
    }

    #[test]
    fn garbage_rates_fall_back_to_zero() {
        let raw = json!({
            "response": { "data": { "warehouseList": [
                { "warehouseName": "X", "boxDeliveryBase": "н/д" }
            ] } }
        });
        let decoded: TariffsResponse =
            serde_json::from_value(raw).expect("tariffs payload decodes");
        assert_eq!(Decimal::ZERO, decoded.response.data.warehouse_list[0].delivery_base);
    }
}
