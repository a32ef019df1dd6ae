// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sqlx::SqlitePool;
use tracing::debug;

use crate::database;
use crate::handlers::AppError;
use common::Engineer;

/// Header carrying the caller's ET id. The real authentication layer in
/// front of this service resolves the session and sets this header; the
/// domain logic only ever sees the resolved engineer, never ambient state.
pub const ENGINEER_ID_HEADER: &str = "x-engineer-id";

/// Extractor for the authenticated engineer.
///
/// Rejects with 401 when the header is missing or does not match a
/// provisioned engineer. Handlers that take this extractor cannot be
/// reached anonymously.
pub struct CurrentEngineer(pub Engineer);

impl FromRequestParts<SqlitePool> for CurrentEngineer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        pool: &SqlitePool,
    ) -> Result<Self, Self::Rejection> {
        let et_id = parts
            .headers
            .get(ENGINEER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| AppError::unauthorized("Missing x-engineer-id header."))?;

        debug!("Resolving current engineer: {}", et_id);

        let engineer = database::get_engineer_by_et_id(pool, et_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::unauthorized("Unknown engineer."))?;

        Ok(CurrentEngineer(engineer))
    }
}
