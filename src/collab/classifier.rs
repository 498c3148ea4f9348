use std::env;
use std::path::Path;

use reqwest::Client;
use serde_json::Value;
use tokio::fs::File;
use tokio_util::codec::{BytesCodec, FramedRead};

use crate::error::CollabError;

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub prediction: String,
    pub confidence: f64,
}

/// Client for the external image-classification service. The service is
/// assumed unreliable; every failure maps to a generic analysis-failed
/// response at the API edge.
pub struct ClassifierClient {
    client: Client,
    base_url: String,
}

impl ClassifierClient {
    pub fn new() -> Self {
        let base_url = env::var("CLASSIFIER_URL")
            .unwrap_or_else(|_| "http://classifier:5000/classify".to_string());
        Self {
            client: Client::new(),
            base_url,
        }
    }

    pub async fn classify(
        &self,
        image_path: &str,
        species: &str,
    ) -> Result<Classification, CollabError> {
        // Local precheck before touching the network.
        let path = Path::new(image_path);
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(CollabError::MissingFile(image_path.to_string()));
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let file = File::open(path).await?;
        let stream = FramedRead::new(file, BytesCodec::new());
        let body = reqwest::Body::wrap_stream(stream);

        let form = reqwest::multipart::Form::new()
            .part(
                "image",
                reqwest::multipart::Part::stream(body).file_name(file_name),
            )
            .text("species", species.to_string());

        let res = self
            .client
            .post(&self.base_url)
            .multipart(form)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(CollabError::BadResponse(format!(
                "classifier returned {}: {}",
                status, text
            )));
        }

        let json: Value = res.json().await?;
        let prediction = json["prediction"]
            .as_str()
            .ok_or_else(|| CollabError::BadResponse("no prediction in response".to_string()))?
            .to_string();
        let confidence = json["confidence"]
            .as_f64()
            .ok_or_else(|| CollabError::BadResponse("no confidence in response".to_string()))?
            .clamp(0.0, 1.0);

        Ok(Classification {
            prediction,
            confidence,
        })
    }
}

impl Default for ClassifierClient {
    fn default() -> Self {
        Self::new()
    }
}
