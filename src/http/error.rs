use std::borrow::Cow;

use axum::response::IntoResponse;
use axum::Json;
use hyper::StatusCode;

use crate::database::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct ApiErrorCode(pub u16);

impl ApiErrorCode {
	/// The requested route does not exist.
	pub const ROUTE_NOT_FOUND: Self = Self(404);
	/// No library game with this id for the current user.
	pub const GAME_NOT_FOUND: Self = Self(1000);
	/// The game is already in the user's collection.
	pub const DUPLICATE_GAME: Self = Self(1001);
	/// A subscription lookup had no title and no library row to take one from.
	pub const MISSING_TITLE: Self = Self(1002);
	/// The library store failed unexpectedly.
	pub const STORAGE_ERROR: Self = Self(2000);
	/// Subscription catalogs could not be loaded.
	pub const SUBSCRIPTIONS_UNAVAILABLE: Self = Self(3000);
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ApiError {
	#[serde(skip)]
	pub status_code: StatusCode,
	pub status: Cow<'static, str>,
	pub error_code: ApiErrorCode,
	pub error: Cow<'static, str>,
}

impl ApiError {
	pub fn new(status_code: StatusCode, error_code: ApiErrorCode, error: impl Into<Cow<'static, str>>) -> Self {
		Self {
			status_code,
			status: status_code.canonical_reason().unwrap_or("unknown").into(),
			error_code,
			error: error.into(),
		}
	}

	pub fn bad_request(error_code: ApiErrorCode, error: impl Into<Cow<'static, str>>) -> Self {
		Self::new(StatusCode::BAD_REQUEST, error_code, error)
	}

	pub fn not_found(error_code: ApiErrorCode, error: impl Into<Cow<'static, str>>) -> Self {
		Self::new(StatusCode::NOT_FOUND, error_code, error)
	}

	pub fn service_unavailable(error_code: ApiErrorCode, error: impl Into<Cow<'static, str>>) -> Self {
		Self::new(StatusCode::SERVICE_UNAVAILABLE, error_code, error)
	}

	pub fn internal_server_error(error_code: ApiErrorCode, error: impl Into<Cow<'static, str>>) -> Self {
		Self::new(StatusCode::INTERNAL_SERVER_ERROR, error_code, error)
	}
}

impl From<StorageError> for ApiError {
	fn from(e: StorageError) -> Self {
		match e {
			StorageError::NotFound(_) => Self::not_found(ApiErrorCode::GAME_NOT_FOUND, "game not found"),
			StorageError::Duplicate { .. } => {
				Self::bad_request(ApiErrorCode::DUPLICATE_GAME, "game already in your collection")
			}
			StorageError::Backend(e) => {
				tracing::error!(error = %e, "library storage failed");
				Self::internal_server_error(ApiErrorCode::STORAGE_ERROR, "library storage failed")
			}
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> axum::http::Response<axum::body::Body> {
		(self.status_code, Json(self)).into_response()
	}
}
