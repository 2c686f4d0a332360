use serde::Serialize;
use serde_json::Value;

use crate::upstream::{ANALYZE_PATH, COSINE_SIM_PATH, EMBED_PATH, HEALTH_PATH};

pub(crate) const SERVICE_NAME: &str = "LLaVA Local Client";

pub(crate) const DEFAULT_PROMPT: &str = "Describe this image in one concise sentence.";

#[derive(Serialize, Debug)]
pub(crate) struct InfoResponse {
    pub(crate) message: &'static str,
    pub(crate) status: &'static str,
    pub(crate) colab_server: String,
    pub(crate) endpoints: Endpoints,
}

#[derive(Serialize, Debug)]
pub(crate) struct Endpoints {
    pub(crate) analyze: &'static str,
    pub(crate) embed: &'static str,
    pub(crate) cosine_sim: &'static str,
    pub(crate) health: &'static str,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            analyze: ANALYZE_PATH,
            embed: EMBED_PATH,
            cosine_sim: COSINE_SIM_PATH,
            health: HEALTH_PATH,
        }
    }
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum UpstreamStatus {
    Connected,
    Disconnected,
}

/// Health of the relay itself and of the upstream it forwards to.
#[derive(Serialize, Debug)]
pub(crate) struct HealthResponse {
    pub(crate) local_status: &'static str,
    pub(crate) colab_status: UpstreamStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) colab_details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<String>,
}

impl HealthResponse {
    pub(crate) fn connected(details: Value) -> Self {
        HealthResponse {
            local_status: "healthy",
            colab_status: UpstreamStatus::Connected,
            colab_details: Some(details),
            error: None,
            message: None,
        }
    }

    pub(crate) fn disconnected(error: String, upstream_url: &str) -> Self {
        HealthResponse {
            local_status: "healthy",
            colab_status: UpstreamStatus::Disconnected,
            colab_details: None,
            error: Some(error),
            message: Some(format!(
                "Make sure the upstream URL ({}) points at a running inference server",
                upstream_url
            )),
        }
    }
}
