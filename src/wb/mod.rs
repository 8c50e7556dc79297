//! Wildberries seller API: one submodule per report endpoint.

pub use crate::fetch::FetchError;
use reqwest::header::AUTHORIZATION;
use reqwest_middleware::ClientWithMiddleware;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub mod adverts;
pub mod cards;
pub mod sales;
pub mod stocks;
pub mod tariffs;

pub(crate) use crate::fetch::decode_response;

pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &ClientWithMiddleware,
    url: &str,
    token: &str,
    query: &[(&str, String)],
) -> Result<T, FetchError> {
    let response = client
        .get(url)
        .header(AUTHORIZATION, token)
        .query(query)
        .send()
        .await?;
    decode_response(response).await
}

pub(crate) async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
    client: &ClientWithMiddleware,
    url: &str,
    token: &str,
    body: &B,
) -> Result<T, FetchError> {
    let response = client
        .post(url)
        .header(AUTHORIZATION, token)
        .json(body)
        .send()
        .await?;
    decode_response(response).await
}
