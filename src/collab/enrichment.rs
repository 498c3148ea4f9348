use std::env;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::CollabError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Contagious {
    Yes,
    No,
    Possibly,
    Unknown,
}

/// Structured care advice returned to the reporting owner alongside the
/// classification result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CareAdvice {
    pub explanation: String,
    pub home_care: Vec<String>,
    pub vet_urgency: Urgency,
    pub contagious: Contagious,
}

#[derive(Deserialize)]
struct WireAdvice {
    explanation: String,
    home_care: Vec<String>,
    vet_urgency: String,
    contagious: String,
}

/// Client for the recommendation-enrichment service. Never fails the caller:
/// any transport, parse or shape problem substitutes the deterministic
/// rule-based fallback.
pub struct EnrichmentClient {
    client: Client,
    base_url: String,
}

impl EnrichmentClient {
    pub fn new() -> Self {
        let base_url = env::var("ENRICHMENT_URL")
            .unwrap_or_else(|_| "http://enrichment:5001/advise".to_string());
        Self {
            client: Client::new(),
            base_url,
        }
    }

    pub async fn advise(
        &self,
        prediction: &str,
        confidence: f64,
        species: &str,
        notes: Option<&str>,
    ) -> CareAdvice {
        match self.request(prediction, confidence, species, notes).await {
            Ok(advice) => advice,
            Err(e) => {
                tracing::warn!("Enrichment unavailable, using rule-based fallback: {}", e);
                crate::metrics::swallowed_failure("enrichment");
                fallback_advice(prediction, confidence)
            }
        }
    }

    async fn request(
        &self,
        prediction: &str,
        confidence: f64,
        species: &str,
        notes: Option<&str>,
    ) -> Result<CareAdvice, CollabError> {
        let body = serde_json::json!({
            "prediction": prediction,
            "confidence": confidence,
            "species": species,
            "notes": notes,
        });
        let res = self.client.post(&self.base_url).json(&body).send().await?;
        if !res.status().is_success() {
            return Err(CollabError::BadResponse(format!(
                "enrichment returned {}",
                res.status()
            )));
        }

        let wire: WireAdvice = res
            .json()
            .await
            .map_err(|e| CollabError::BadResponse(format!("unparseable advice: {}", e)))?;

        let vet_urgency = match wire.vet_urgency.as_str() {
            "low" => Urgency::Low,
            "medium" => Urgency::Medium,
            "high" => Urgency::High,
            other => {
                return Err(CollabError::BadResponse(format!(
                    "unknown vet_urgency {:?}",
                    other
                )))
            }
        };
        let contagious = match wire.contagious.as_str() {
            "yes" => Contagious::Yes,
            "no" => Contagious::No,
            "possibly" => Contagious::Possibly,
            other => {
                return Err(CollabError::BadResponse(format!(
                    "unknown contagious value {:?}",
                    other
                )))
            }
        };
        if wire.home_care.is_empty() {
            return Err(CollabError::BadResponse("empty home_care list".to_string()));
        }

        Ok(CareAdvice {
            explanation: wire.explanation,
            home_care: wire.home_care,
            vet_urgency,
            contagious,
        })
    }
}

impl Default for EnrichmentClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic advice used whenever the enrichment service cannot be
/// trusted: urgency from the confidence alone, contagiousness unknown.
pub fn fallback_advice(prediction: &str, confidence: f64) -> CareAdvice {
    let vet_urgency = if confidence > 0.8 {
        Urgency::High
    } else {
        Urgency::Medium
    };
    CareAdvice {
        explanation: format!(
            "The analysis suggests {} (confidence {:.0}%). Automated advice is unavailable right now.",
            prediction,
            confidence * 100.0
        ),
        home_care: vec![
            "Keep your pet rested, hydrated and separated from other animals.".to_string(),
            "Monitor symptoms and note any changes over the next 24 hours.".to_string(),
            "Avoid home remedies until a veterinarian has seen your pet.".to_string(),
        ],
        vet_urgency,
        contagious: Contagious::Unknown,
    }
}
