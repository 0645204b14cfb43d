use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Requested output naming. Both targets produce JPEG-encoded bytes; `jfif`
/// only changes the suggested file extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    #[default]
    Jpg,
    Jfif,
}

impl TargetFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TargetFormat::Jpg => "jpg",
            TargetFormat::Jfif => "jfif",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TargetFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jpg" => Ok(TargetFormat::Jpg),
            "jfif" => Ok(TargetFormat::Jfif),
            other => Err(format!("unknown target format '{other}': expected 'jpg' or 'jfif'")),
        }
    }
}

/// The settings echo included in every successful conversion response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversionSettings {
    pub maintain_size: bool,
    pub auto_orient: bool,
    pub remove_metadata: bool,
}

/// Successful conversion envelope.
///
/// `preview_url` and `download_url` are the same `data:image/jpeg;base64,...`
/// URL; the client uses one as an `<img>` source and the other as a download
/// link.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub success: bool,
    pub preview_url: String,
    pub download_url: String,
    /// Suggested output file name (input stem plus the target extension)
    pub file_name: String,
    /// Output size in bytes
    pub file_size: u64,
    /// Declared MIME type of the upload
    pub original_format: String,
    pub target_format: TargetFormat,
    pub quality: u8,
    pub settings: ConversionSettings,
}

/// Frontend metadata served to the upload page at load time.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FrontendConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Server-side upload limit in bytes, for the client's advisory check
    pub max_file_size: u64,
    pub default_quality: u8,
    /// Analytics/ad script injected once at page load, when configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics_script_url: Option<String>,
}
