//! # 入力エクストラクタ
//!
//! axum 標準の `Json` / `Path` / `Query` は拒否時にプレーンテキストの 400/422 を返す。
//! ここのラッパーは拒否理由を [`CoreError::BadRequest`] に変換し、
//! 他のエラーと同じ `{ success, code, error }` 形式で返す。

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::CoreError;

/// JSON ボディ
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = CoreError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| CoreError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// パスパラメータ
#[derive(Debug, Clone, Copy)]
pub struct ApiPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = CoreError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| CoreError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// クエリパラメータ
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = CoreError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| CoreError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}
