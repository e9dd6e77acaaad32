use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct VoiceInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct VoicesResponse {
    pub voices: Vec<VoiceInfo>,
}

#[derive(Debug, Serialize)]
pub struct FormatInfo {
    pub id: String,
    pub name: String,
    pub content_type: String,
}

#[derive(Debug, Serialize)]
pub struct FormatsResponse {
    pub formats: Vec<FormatInfo>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}
