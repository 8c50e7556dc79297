//! Ozon seller API: product attributes and warehouse stock analytics.

pub use crate::fetch::FetchError;
use crate::engine::OzonCabinet;
use reqwest_middleware::ClientWithMiddleware;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub mod products;
pub mod stocks;

pub(crate) async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
    client: &ClientWithMiddleware,
    url: &str,
    cabinet: &OzonCabinet,
    body: &B,
) -> Result<T, FetchError> {
    let response = client
        .post(url)
        .header("Client-Id", cabinet.client_id.as_str())
        .header("Api-Key", cabinet.api_key.as_str())
        .json(body)
        .send()
        .await?;
    crate::fetch::decode_response(response).await
}
