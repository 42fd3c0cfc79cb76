//! JSON envelopes shared by the API handlers.

use serde::Serialize;

/// `{ "success": true, "data": ... }`
#[derive(Serialize, Debug)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// `{ "success": true }`, plus a count for batch operations.
#[derive(Serialize, Debug)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<usize>,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            deleted: None,
        }
    }

    pub fn deleted(count: usize) -> Self {
        Self {
            success: true,
            deleted: Some(count),
        }
    }
}
