/// This module provides the `Query` extractor, which deserializes the URL query string
/// into a strongly-typed structure with `serde_urlencoded`.
use std::future::Future;

use http::StatusCode;
use serde::de::DeserializeOwned;

use crate::{
    extractors::FromRequest,
    responder::{Responder, json_error},
    types::{Request, Response},
};

/// # Example
///
/// ```rust,ignore
/// #[derive(Deserialize)]
/// struct Params {
///     #[serde(rename = "targetSize")]
///     target_size: Option<String>,
/// }
///
/// let Query(params) = Query::<Params>::from_request(&mut req).await?;
/// ```
#[derive(Debug)]
pub struct Query<T>(pub T);

#[derive(Debug)]
pub struct QueryError(pub String);

impl Responder for QueryError {
    fn into_response(self) -> Response {
        json_error(
            StatusCode::BAD_REQUEST,
            &format!("Invalid query string: {}", self.0),
        )
    }
}

impl<T> Query<T>
where
    T: DeserializeOwned,
{
    pub fn parse(query: &str) -> Result<Self, QueryError> {
        serde_urlencoded::from_str(query)
            .map(Query)
            .map_err(|e| QueryError(e.to_string()))
    }
}

impl<'a, T> FromRequest<'a> for Query<T>
where
    T: DeserializeOwned + Send + 'a,
{
    type Error = QueryError;

    fn from_request(
        req: &'a mut Request,
    ) -> impl Future<Output = Result<Self, Self::Error>> + Send + 'a {
        let query = req.uri().query().unwrap_or_default();
        futures_util::future::ready(Self::parse(query))
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::body::Body;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Params {
        #[serde(rename = "targetSize")]
        target_size: Option<String>,
    }

    #[tokio::test]
    async fn extracts_optional_fields() {
        let mut req = http::Request::builder()
            .uri("/compress?targetSize=250&other=1")
            .body(Body::empty())
            .unwrap();
        let Query(params) = Query::<Params>::from_request(&mut req).await.unwrap();
        assert_eq!(params.target_size.as_deref(), Some("250"));

        let mut req = http::Request::builder()
            .uri("/compress")
            .body(Body::empty())
            .unwrap();
        let Query(params) = Query::<Params>::from_request(&mut req).await.unwrap();
        assert_eq!(params, Params { target_size: None });
    }

    #[test]
    fn malformed_query_is_rejected() {
        #[derive(Debug, Deserialize)]
        struct Strict {
            #[allow(dead_code)]
            n: u32,
        }
        assert!(Query::<Strict>::parse("n=abc").is_err());
    }
}
