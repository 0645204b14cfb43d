//! HTTP handler for frontend configuration retrieval.

use axum::{Json, extract::State};

use crate::AppState;
use crate::api::models::convert::FrontendConfig;

#[utoipa::path(
    get,
    path = "/api/config",
    tag = "config",
    summary = "Get frontend config",
    description = "Metadata and limits the upload page needs: title, upload size limit, \
                   default quality, and the optional analytics script to inject at load.",
    responses(
        (status = 200, description = "Frontend configuration", body = FrontendConfig),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_config(State(state): State<AppState>) -> Json<FrontendConfig> {
    let metadata = &state.config.metadata;

    Json(FrontendConfig {
        title: metadata.title.clone(),
        description: metadata.description.clone(),
        max_file_size: state.config.upload.max_file_size,
        default_quality: state.config.upload.default_quality,
        analytics_script_url: metadata.analytics_script_url.as_ref().map(|url| url.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use crate::AppState;
    use crate::config::Config;
    use axum_test::TestServer;
    use serde_json::Value;

    #[tokio::test]
    async fn test_get_config_returns_limits() {
        let mut config = Config::default();
        config.metadata.title = Some("JFIF to JPG".to_string());
        let state = AppState::builder().config(config).build();
        let server = TestServer::new(crate::build_router(&state).unwrap()).unwrap();

        let response = server.get("/api/config").await;

        response.assert_status_ok();
        let json: Value = response.json();
        assert_eq!(json["title"], "JFIF to JPG");
        assert_eq!(json["maxFileSize"], 10 * 1024 * 1024);
        assert_eq!(json["defaultQuality"], 90);
        // Not configured: omitted rather than null
        assert!(json.get("analyticsScriptUrl").is_none());
    }
}
