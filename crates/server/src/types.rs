use serde::{Deserialize, Serialize};

/// The body of a `POST /chat` request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub query: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Query parameters for `GET /users/resolve`.
#[derive(Debug, Deserialize)]
pub struct ResolveParams {
    pub identifier: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub user_id: String,
}
