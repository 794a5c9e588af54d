//! HTTP classifier client (hosted object-detection model).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use crate::classifier::{Classifier, ClassifierError, DetectionResponse, Prediction};
use crate::image::ImagePayload;

pub const DEFAULT_ENDPOINT: &str = "https://detect.roboflow.com/pantry-object-detection/1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Posts the base64 image to a hosted detection endpoint.
#[derive(Clone)]
pub struct HttpClassifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpClassifier {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClassifierError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl core::fmt::Debug for HttpClassifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HttpClassifier")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, image: &ImagePayload) -> Result<Vec<Prediction>, ClassifierError> {
        tracing::debug!(endpoint = %self.endpoint, bytes = image.len(), "submitting image to classifier");

        let resp = self
            .client
            .post(&self.endpoint)
            .query(&[("api_key", self.api_key.as_str())])
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(image.to_base64())
            .send()
            .await
            .map_err(|e| ClassifierError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ClassifierError::Api(
                status.as_u16(),
                resp.text().await.unwrap_or_default(),
            ));
        }

        let doc: DetectionResponse = resp
            .json()
            .await
            .map_err(|e| ClassifierError::Parse(e.to_string()))?;

        tracing::debug!(predictions = doc.predictions.len(), "classifier responded");
        Ok(doc.predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL_PATH: &str = "/pantry-object-detection/1";

    fn image() -> ImagePayload {
        ImagePayload::from_bytes(b"hello".to_vec()).unwrap()
    }

    fn classifier(server: &MockServer, timeout: Duration) -> HttpClassifier {
        HttpClassifier::new(format!("{}{MODEL_PATH}", server.uri()), "test-key", timeout).unwrap()
    }

    #[tokio::test]
    async fn posts_base64_body_with_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(query_param("api_key", "test-key"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string("aGVsbG8="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "predictions": [
                    {"class": "apple", "confidence": 0.88},
                    {"class": "Milk"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let predictions = classifier(&server, DEFAULT_TIMEOUT)
            .classify(&image())
            .await
            .unwrap();

        let labels: Vec<_> = predictions.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["apple", "Milk"]);
    }

    #[tokio::test]
    async fn missing_predictions_field_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"time": 0.1})))
            .mount(&server)
            .await;

        let predictions = classifier(&server, DEFAULT_TIMEOUT)
            .classify(&image())
            .await
            .unwrap();
        assert!(predictions.is_empty());
    }

    #[tokio::test]
    async fn non_success_status_is_an_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = classifier(&server, DEFAULT_TIMEOUT)
            .classify(&image())
            .await
            .unwrap_err();
        match err {
            ClassifierError::Api(status, body) => {
                assert_eq!(status, 403);
                assert_eq!(body, "invalid api key");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn undecodable_body_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = classifier(&server, DEFAULT_TIMEOUT)
            .classify(&image())
            .await
            .unwrap_err();
        assert!(matches!(err, ClassifierError::Parse(_)));
    }

    #[tokio::test]
    async fn slow_endpoint_times_out_as_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"predictions": []}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let err = classifier(&server, Duration::from_millis(100))
            .classify(&image())
            .await
            .unwrap_err();
        assert!(matches!(err, ClassifierError::Network(_)));
    }

    #[test]
    fn debug_output_hides_the_key() {
        let c = HttpClassifier::new(DEFAULT_ENDPOINT, "secret", DEFAULT_TIMEOUT).unwrap();
        let rendered = format!("{c:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("detect.roboflow.com"));
    }
}
