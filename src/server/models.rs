use serde::{Deserialize, Serialize};

/// Wire contract of `POST /generate`. Field names follow the original web
/// client; everything except `message` is optional and defaults server-side.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct GenerateRequest {
    pub(crate) title: Option<String>,
    pub(crate) message: Option<String>,
    pub(crate) instruction: Option<String>,
    pub(crate) font: Option<String>,
    #[serde(rename = "textColor")]
    pub(crate) text_color: Option<String>,
    #[serde(rename = "borderColor")]
    pub(crate) border_color: Option<String>,
    pub(crate) position: Option<String>,
    #[serde(rename = "fontSize")]
    pub(crate) font_size: Option<f32>,
    pub(crate) painting_style: Option<String>,
    pub(crate) use_keywords: Option<bool>,
    pub(crate) round_trip: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateResponse {
    #[serde(rename = "imageUrl")]
    pub(crate) image_url: String,
    #[serde(rename = "originalUrl")]
    pub(crate) original_url: String,
    pub(crate) caption: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_fields_use_the_client_names() {
        let payload = r#"{
            "title": "생일 축하",
            "message": "오래오래 행복하세요",
            "textColor": "black",
            "borderColor": "white",
            "fontSize": 50,
            "painting_style": "watercolor",
            "position": "bottom right"
        }"#;
        let request: GenerateRequest = serde_json::from_str(payload).expect("parse");
        assert_eq!(request.message.as_deref(), Some("오래오래 행복하세요"));
        assert_eq!(request.text_color.as_deref(), Some("black"));
        assert_eq!(request.border_color.as_deref(), Some("white"));
        assert_eq!(request.font_size, Some(50.0));
        assert_eq!(request.painting_style.as_deref(), Some("watercolor"));
    }

    #[test]
    fn missing_fields_default_to_none() {
        let request: GenerateRequest = serde_json::from_str("{}").expect("parse");
        assert!(request.message.is_none());
        assert!(request.font_size.is_none());
        assert!(request.use_keywords.is_none());
    }

    #[test]
    fn response_serializes_with_camel_case_urls() {
        let response = GenerateResponse {
            image_url: "http://localhost:5000/static/abc-result.jpg".to_string(),
            original_url: "http://localhost:5000/static/abc-original.jpg".to_string(),
            caption: "calm sea".to_string(),
        };
        let value = serde_json::to_value(&response).expect("serialize");
        assert!(value["imageUrl"].is_string());
        assert!(value["originalUrl"].is_string());
    }
}
