use serde::Serialize;

/// Standard success envelope: `{success: true, data, message?, total?}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
            total: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T> SuccessResponse<Vec<T>> {
    /// List envelope carrying `total = data.len()`
    pub fn list(data: Vec<T>) -> Self {
        let total = data.len();
        Self {
            success: true,
            data,
            message: None,
            total: Some(total),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: &'static str,
}
