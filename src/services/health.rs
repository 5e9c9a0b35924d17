use serde::Serialize;
use supabase::storage::Bucket;
use supabase::{RawResponse, StatusClass, SupabaseClient};

#[derive(Debug, Clone, Serialize)]
pub struct EndpointHealth {
    pub endpoint: String,
    pub status: Option<u16>,
    pub reachable: bool,
    pub class: Option<StatusClass>,
    pub detail: String,
}

impl EndpointHealth {
    fn from_outcome(
        endpoint: &str,
        outcome: supabase::Result<RawResponse>,
        describe: impl Fn(&RawResponse) -> String,
    ) -> Self {
        match outcome {
            Ok(raw) => {
                let detail = if raw.is_success() { describe(&raw) } else { raw.error_message() };
                Self {
                    endpoint: endpoint.to_string(),
                    status: Some(raw.status),
                    reachable: true,
                    class: Some(raw.class()),
                    detail,
                }
            }
            Err(err) => Self {
                endpoint: endpoint.to_string(),
                status: err.status(),
                reachable: false,
                class: None,
                detail: err.to_string(),
            },
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.reachable && self.class.map_or(false, |class| class.is_success())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub rest: EndpointHealth,
    pub auth: EndpointHealth,
    pub storage: EndpointHealth,
}

impl HealthReport {
    pub fn endpoints(&self) -> [&EndpointHealth; 3] {
        [&self.rest, &self.auth, &self.storage]
    }

    pub fn is_healthy(&self) -> bool {
        self.endpoints().iter().all(|endpoint| endpoint.is_healthy())
    }
}

/// Verifica REST, Auth e Storage, uma requisição por vez
pub async fn check(client: &SupabaseClient) -> HealthReport {
    let rest = EndpointHealth::from_outcome("rest", client.rest_root_raw().await, |_| {
        "schema available".to_string()
    });

    let auth = EndpointHealth::from_outcome("auth", client.auth_health().await, |raw| {
        raw.json()
            .ok()
            .and_then(|body| body.get("version").and_then(|v| v.as_str()).map(str::to_string))
            .map(|version| format!("GoTrue {}", version))
            .unwrap_or_else(|| "ok".to_string())
    });

    let storage = EndpointHealth::from_outcome("storage", client.list_buckets_raw().await, |raw| {
        match Bucket::parse_list(raw) {
            Ok(buckets) => format!("{} bucket(s)", buckets.len()),
            Err(_) => "ok".to_string(),
        }
    });

    for endpoint in [&rest, &auth, &storage] {
        if endpoint.is_healthy() {
            tracing::info!("✅ {} reachable ({:?})", endpoint.endpoint, endpoint.status);
        } else {
            tracing::warn!("❌ {} unhealthy: {}", endpoint.endpoint, endpoint.detail);
        }
    }

    HealthReport { rest, auth, storage }
}
