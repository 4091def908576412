//! Request inputs: the screenshot plus the PXO form fields.
//!
//! `RawForm` is what arrives from a multipart form or the CLI; it becomes an
//! immutable `AnalysisInputs` once validated.
use crate::error::ValidationError;
use std::fmt;
use std::str::FromStr;

pub const FIELD_IMAGE: &str = "image";
pub const FIELD_PROBLEM_STATEMENT: &str = "problemStatement";
pub const FIELD_USER_SEGMENT: &str = "userSegment";
pub const FIELD_METRIC_AT_RISK: &str = "metricAtRisk";
pub const FIELD_HYPOTHESIS_X: &str = "hypothesisX";
pub const FIELD_HYPOTHESIS_SEGMENT: &str = "hypothesisSegment";
pub const FIELD_HYPOTHESIS_METRIC: &str = "hypothesisMetric";
pub const FIELD_HYPOTHESIS_BEHAVIOR: &str = "hypothesisBehavior";
pub const FIELD_RISK_LEVEL: &str = "riskLevel";

/// Raster formats the model accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl MediaType {
    pub fn as_mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }

    /// Parse a declared MIME type, ignoring case and parameters.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Guess from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Identify the format from the leading magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::Webp)
        } else {
            None
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_mime())
    }
}

/// Image bytes plus their validated media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub bytes: Vec<u8>,
    pub media_type: MediaType,
}

/// Risk level chosen on the form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            "high" => Ok(Self::High),
            _ => Err(ValidationError::InvalidRiskLevel(value.to_string())),
        }
    }
}

/// An uploaded file before validation.
#[derive(Debug, Clone, Default)]
pub struct RawImage {
    pub bytes: Vec<u8>,
    /// Declared content type, if the client sent one.
    pub content_type: Option<String>,
}

/// Unvalidated form fields, keyed by the multipart field names.
#[derive(Debug, Clone, Default)]
pub struct RawForm {
    pub image: Option<RawImage>,
    pub problem_statement: Option<String>,
    pub user_segment: Option<String>,
    pub metric_at_risk: Option<String>,
    pub hypothesis_x: Option<String>,
    pub hypothesis_segment: Option<String>,
    pub hypothesis_metric: Option<String>,
    pub hypothesis_behavior: Option<String>,
    pub risk_level: Option<String>,
}

impl RawForm {
    /// Record a text field by its form name. Unknown names are ignored.
    pub fn set_text(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            FIELD_PROBLEM_STATEMENT => &mut self.problem_statement,
            FIELD_USER_SEGMENT => &mut self.user_segment,
            FIELD_METRIC_AT_RISK => &mut self.metric_at_risk,
            FIELD_HYPOTHESIS_X => &mut self.hypothesis_x,
            FIELD_HYPOTHESIS_SEGMENT => &mut self.hypothesis_segment,
            FIELD_HYPOTHESIS_METRIC => &mut self.hypothesis_metric,
            FIELD_HYPOTHESIS_BEHAVIOR => &mut self.hypothesis_behavior,
            FIELD_RISK_LEVEL => &mut self.risk_level,
            _ => return false,
        };
        *slot = Some(value);
        true
    }
}

/// Validated, immutable inputs for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisInputs {
    pub image: ImageAttachment,
    pub problem_statement: String,
    pub user_segment: String,
    pub metric_at_risk: String,
    pub hypothesis_x: String,
    pub hypothesis_segment: String,
    pub hypothesis_metric: String,
    pub hypothesis_behavior: String,
    pub risk_level: RiskLevel,
}

impl AnalysisInputs {
    /// Validate a raw form. The image is checked first so a request without
    /// one always reports `MissingImage`.
    pub fn from_form(form: RawForm) -> Result<Self, ValidationError> {
        let image = match form.image {
            Some(raw) if !raw.bytes.is_empty() => resolve_image(raw)?,
            _ => return Err(ValidationError::MissingImage),
        };
        let problem_statement = required(form.problem_statement, "problem statement")?;
        let user_segment = required(form.user_segment, "user segment")?;
        let metric_at_risk = required(form.metric_at_risk, "metric at risk")?;
        let risk_level = form
            .risk_level
            .as_deref()
            .unwrap_or("")
            .parse::<RiskLevel>()?;
        Ok(Self {
            image,
            problem_statement,
            user_segment,
            metric_at_risk,
            hypothesis_x: optional(form.hypothesis_x),
            hypothesis_segment: optional(form.hypothesis_segment),
            hypothesis_metric: optional(form.hypothesis_metric),
            hypothesis_behavior: optional(form.hypothesis_behavior),
            risk_level,
        })
    }

    /// The hypothesis sentence assembled from the four fragments.
    pub fn hypothesis(&self) -> String {
        format!(
            "If we improve {}, for {}, then {} will improve, because {}.",
            self.hypothesis_x,
            self.hypothesis_segment,
            self.hypothesis_metric,
            self.hypothesis_behavior
        )
    }
}

fn resolve_image(raw: RawImage) -> Result<ImageAttachment, ValidationError> {
    let declared = raw
        .content_type
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let media_type = match declared {
        None => MediaType::Png,
        Some(mime) => match MediaType::from_mime(mime) {
            Some(media_type) => media_type,
            None => MediaType::sniff(&raw.bytes)
                .ok_or_else(|| ValidationError::UnsupportedMediaType(mime.to_string()))?,
        },
    };
    Ok(ImageAttachment {
        bytes: raw.bytes,
        media_type,
    })
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ValidationError> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ValidationError::MissingField(name))
}

fn optional(value: Option<String>) -> String {
    value.map(|value| value.trim().to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn form() -> RawForm {
        RawForm {
            image: Some(RawImage {
                bytes: PNG.to_vec(),
                content_type: Some("image/png".to_string()),
            }),
            problem_statement: Some("Users abandon checkout".to_string()),
            user_segment: Some("new users".to_string()),
            metric_at_risk: Some("conversion".to_string()),
            ..RawForm::default()
        }
    }

    #[test]
    fn missing_image_is_reported_before_fields() {
        let err = AnalysisInputs::from_form(RawForm::default()).unwrap_err();
        assert_eq!(err, ValidationError::MissingImage);
    }

    #[test]
    fn empty_image_counts_as_missing() {
        let mut raw = form();
        raw.image = Some(RawImage::default());
        assert_eq!(
            AnalysisInputs::from_form(raw).unwrap_err(),
            ValidationError::MissingImage
        );
    }

    #[test]
    fn whitespace_required_field_is_missing() {
        let mut raw = form();
        raw.user_segment = Some("   ".to_string());
        assert_eq!(
            AnalysisInputs::from_form(raw).unwrap_err(),
            ValidationError::MissingField("user segment")
        );
    }

    #[test]
    fn risk_level_defaults_to_medium() {
        let inputs = AnalysisInputs::from_form(form()).expect("valid form");
        assert_eq!(inputs.risk_level, RiskLevel::Medium);
        assert_eq!(inputs.hypothesis_x, "");
    }

    #[test]
    fn risk_level_parses_case_insensitively() {
        let mut raw = form();
        raw.risk_level = Some("HIGH".to_string());
        let inputs = AnalysisInputs::from_form(raw).expect("valid form");
        assert_eq!(inputs.risk_level, RiskLevel::High);

        let mut raw = form();
        raw.risk_level = Some("severe".to_string());
        assert!(matches!(
            AnalysisInputs::from_form(raw),
            Err(ValidationError::InvalidRiskLevel(_))
        ));
    }

    #[test]
    fn hypothesis_sentence_has_fixed_shape() {
        let mut raw = form();
        raw.hypothesis_x = Some("the payment step".to_string());
        raw.hypothesis_segment = Some("first-time buyers".to_string());
        raw.hypothesis_metric = Some("checkout completion".to_string());
        raw.hypothesis_behavior = Some("fewer fields reduce drop-off".to_string());
        let inputs = AnalysisInputs::from_form(raw).expect("valid form");
        assert_eq!(
            inputs.hypothesis(),
            "If we improve the payment step, for first-time buyers, then checkout \
             completion will improve, because fewer fields reduce drop-off."
        );
    }

    #[test]
    fn missing_content_type_defaults_to_png() {
        let mut raw = form();
        raw.image = Some(RawImage {
            bytes: vec![1, 2, 3],
            content_type: None,
        });
        let inputs = AnalysisInputs::from_form(raw).expect("valid form");
        assert_eq!(inputs.image.media_type, MediaType::Png);
    }

    #[test]
    fn unsupported_declared_type_falls_back_to_sniffing() {
        let mut raw = form();
        raw.image = Some(RawImage {
            bytes: b"GIF89a....".to_vec(),
            content_type: Some("application/octet-stream".to_string()),
        });
        let inputs = AnalysisInputs::from_form(raw).expect("valid form");
        assert_eq!(inputs.image.media_type, MediaType::Gif);

        let mut raw = form();
        raw.image = Some(RawImage {
            bytes: b"%PDF-1.7".to_vec(),
            content_type: Some("application/pdf".to_string()),
        });
        assert_eq!(
            AnalysisInputs::from_form(raw).unwrap_err(),
            ValidationError::UnsupportedMediaType("application/pdf".to_string())
        );
    }

    #[test]
    fn mime_parsing_ignores_parameters_and_case() {
        assert_eq!(
            MediaType::from_mime("Image/JPEG; charset=binary"),
            Some(MediaType::Jpeg)
        );
        assert_eq!(MediaType::from_mime("image/svg+xml"), None);
    }

    #[test]
    fn set_text_routes_known_fields_only() {
        let mut raw = RawForm::default();
        assert!(raw.set_text(FIELD_RISK_LEVEL, "Low".to_string()));
        assert!(!raw.set_text("unknown", "x".to_string()));
        assert_eq!(raw.risk_level.as_deref(), Some("Low"));
    }
}
