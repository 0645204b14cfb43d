//! OpenAPI documentation configuration.
//!
//! The rendered docs are served at `/docs` when the server is running.

use utoipa::OpenApi;

use crate::api;
use crate::api::models::convert::{ConversionSettings, ConvertResponse, FrontendConfig, TargetFormat};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "jfifconv",
        description = "Anonymous single-file JFIF/JPEG converter. Upload an image, get it back \
                       re-encoded as progressive JPEG with a base64 data-URL preview.",
    ),
    paths(api::handlers::convert::convert_image, api::handlers::config::get_config),
    components(schemas(ConvertResponse, ConversionSettings, TargetFormat, FrontendConfig)),
    tags(
        (name = "convert", description = "Image conversion"),
        (name = "config", description = "Frontend configuration")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_doc_includes_both_endpoints() {
        let doc = ApiDoc::openapi();
        let paths: Vec<_> = doc.paths.paths.keys().cloned().collect();
        assert!(paths.contains(&"/api/convert".to_string()), "{paths:?}");
        assert!(paths.contains(&"/api/config".to_string()), "{paths:?}");
    }
}
