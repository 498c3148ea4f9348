//! Clients for the external analysis collaborators.

pub mod classifier;
pub mod enrichment;

pub use classifier::{Classification, ClassifierClient};
pub use enrichment::{fallback_advice, CareAdvice, Contagious, EnrichmentClient, Urgency};
