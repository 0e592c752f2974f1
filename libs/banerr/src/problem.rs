//! RFC 7807 Problem Details payload and formatter (pure data model, no HTTP
//! framework dependencies)

use chrono::{DateTime, Utc};
use http::StatusCode;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Value, json};
use uuid::Uuid;

#[cfg(feature = "utoipa")]
use utoipa::ToSchema;

use crate::error::BanError;
use crate::formatter::{ErrorFormatter, FormatContext, FormatError};
use crate::sanitize::scrub;
use crate::status::reason_phrase;

/// Content type for Problem Details as per RFC 7807.
pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

/// Placeholder base for problem `type` URIs when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://errors.example.com";

/// Custom serializer for `StatusCode` to u16
#[allow(clippy::trivially_copy_pass_by_ref)] // serde requires &T signature
fn serialize_status_code<S>(status: &StatusCode, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u16(status.as_u16())
}

/// Custom deserializer for `StatusCode` from u16
fn deserialize_status_code<'de, D>(deserializer: D) -> Result<StatusCode, D::Error>
where
    D: Deserializer<'de>,
{
    let code = u16::deserialize(deserializer)?;
    StatusCode::from_u16(code).map_err(serde::de::Error::custom)
}

/// RFC 7807 Problem Details for HTTP APIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[cfg_attr(
    feature = "utoipa",
    schema(
        title = "Problem",
        description = "RFC 7807 Problem Details for HTTP APIs"
    )
)]
#[must_use]
pub struct Problem {
    /// A URI reference that identifies the problem type.
    /// When dereferenced, it might provide human-readable documentation.
    #[serde(rename = "type")]
    pub type_url: String,
    /// A short, human-readable summary of the problem type.
    pub title: String,
    /// The HTTP status code for this occurrence of the problem.
    /// Serializes as u16 for RFC 7807 compatibility.
    #[serde(
        serialize_with = "serialize_status_code",
        deserialize_with = "deserialize_status_code"
    )]
    #[cfg_attr(feature = "utoipa", schema(value_type = u16))]
    pub status: StatusCode,
    /// A human-readable explanation specific to this occurrence of the problem.
    pub detail: String,
    /// A URI reference identifying this specific occurrence; unique per
    /// formatted response.
    pub instance: String,
    /// When this occurrence was formatted, ISO-8601.
    pub timestamp: DateTime<Utc>,
    /// Validation extension: one entry per rejected input parameter.
    #[serde(rename = "invalid-params", skip_serializing_if = "Option::is_none")]
    pub invalid_params: Option<Vec<InvalidParam>>,
    /// Constraint-violation extension, mutually exclusive with
    /// `invalid-params`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<Violation>>,
}

/// Individual rejected input parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[cfg_attr(feature = "utoipa", schema(title = "InvalidParam"))]
pub struct InvalidParam {
    /// Parameter path, e.g. "email" or "user.email"
    pub name: String,
    /// Human-readable message describing the rejection
    pub reason: String,
}

/// Individual business-constraint violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[cfg_attr(feature = "utoipa", schema(title = "Violation"))]
pub struct Violation {
    pub name: String,
    pub reason: String,
    pub resource: String,
    pub constraint: String,
}

impl Problem {
    /// Check the assembled document against the problem-details shape.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::InvalidProblem`] when the status is outside
    /// the error range, the title is empty, or `type`/`instance` are not
    /// absolute URIs.
    pub fn validate(&self) -> Result<(), FormatError> {
        let status = self.status.as_u16();
        if !(400..=599).contains(&status) {
            return Err(FormatError::InvalidProblem {
                reason: format!("status {status} outside the 400-599 range"),
            });
        }
        if self.title.is_empty() {
            return Err(FormatError::InvalidProblem {
                reason: "empty title".to_owned(),
            });
        }
        if !is_absolute_uri(&self.type_url) {
            return Err(FormatError::InvalidProblem {
                reason: format!("type is not an absolute URI: {}", self.type_url),
            });
        }
        if !is_absolute_uri(&self.instance) {
            return Err(FormatError::InvalidProblem {
                reason: format!("instance is not an absolute URI: {}", self.instance),
            });
        }
        Ok(())
    }
}

fn is_absolute_uri(uri: &str) -> bool {
    !uri.is_empty()
        && (uri.contains("://") || uri.starts_with("urn:") || uri == "about:blank")
}

/// The built-in `application/problem+json` formatter.
///
/// `type` is `{base_url}/{status}`, `instance` a fresh `urn:uuid` per call.
/// If the error's `data` carries an `invalid-params` array it is attached;
/// otherwise a `violations` array is attached when present. When both are
/// present only `invalid-params` is honored, intentional precedence rather
/// than a merge.
#[derive(Debug, Clone)]
pub struct Rfc7807Formatter {
    base_url: String,
}

impl Default for Rfc7807Formatter {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl Rfc7807Formatter {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }
}

impl ErrorFormatter for Rfc7807Formatter {
    fn content_type(&self) -> &str {
        APPLICATION_PROBLEM_JSON
    }

    fn format(&self, error: &BanError, ctx: &FormatContext<'_>) -> Result<Value, FormatError> {
        let status = error.status();
        let mut problem = Problem {
            type_url: format!("{}/{}", self.base_url, status.as_u16()),
            title: reason_phrase(status.as_u16()).to_owned(),
            status,
            detail: error.message().to_owned(),
            instance: format!("urn:uuid:{}", Uuid::new_v4()),
            timestamp: Utc::now(),
            invalid_params: None,
            violations: None,
        };

        if let Some(data) = error.data() {
            if let Some(params) = data.get("invalid-params") {
                problem.invalid_params = Some(parse_extension(params, "invalid-params")?);
            } else if let Some(violations) = data.get("violations") {
                problem.violations = Some(parse_extension(violations, "violations")?);
            }
        }

        problem.validate()?;
        let body = serde_json::to_value(&problem).map_err(|e| FormatError::InvalidProblem {
            reason: e.to_string(),
        })?;
        Ok(scrub(body, ctx.sanitize))
    }
}

fn parse_extension<T>(value: &Value, field: &str) -> Result<Vec<T>, FormatError>
where
    T: serde::de::DeserializeOwned,
{
    if !value.is_array() {
        return Err(FormatError::InvalidProblem {
            reason: format!("{field} must be an array"),
        });
    }
    serde_json::from_value(value.clone()).map_err(|e| FormatError::InvalidProblem {
        reason: format!("malformed {field}: {e}"),
    })
}

/// Build the `invalid-params` data payload from explicit entries.
///
/// # Errors
///
/// Returns [`FormatError::InvalidParam`] for entries with an empty name or
/// reason.
pub fn validation_error(params: &[InvalidParam]) -> Result<Value, FormatError> {
    for param in params {
        if param.name.is_empty() {
            return Err(FormatError::InvalidParam {
                reason: "empty param name".to_owned(),
            });
        }
        if param.reason.is_empty() {
            return Err(FormatError::InvalidParam {
                reason: format!("empty reason for param '{}'", param.name),
            });
        }
    }
    Ok(json!({ "invalid-params": params }))
}

/// Build the `violations` data payload for a single constraint violation.
/// `constraint` defaults to `"unique"`.
#[must_use]
pub fn constraint_violation(
    name: &str,
    reason: &str,
    resource: &str,
    constraint: Option<&str>,
) -> Value {
    json!({
        "violations": [Violation {
            name: name.to_owned(),
            reason: reason.to_owned(),
            resource: resource.to_owned(),
            constraint: constraint.unwrap_or("unique").to_owned(),
        }]
    })
}

/// Map a `validator` report to the `invalid-params` payload, one entry per
/// issue with the field path joined by `.`.
#[cfg(feature = "validator")]
#[must_use]
pub fn from_validator_errors(errors: &validator::ValidationErrors) -> Value {
    let mut params = Vec::new();
    collect_params(errors, None, &mut params);
    json!({ "invalid-params": params })
}

#[cfg(feature = "validator")]
fn collect_params(
    errors: &validator::ValidationErrors,
    prefix: Option<&str>,
    out: &mut Vec<InvalidParam>,
) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{field}"),
            None => field.to_string(),
        };
        match kind {
            ValidationErrorsKind::Field(issues) => {
                for issue in issues {
                    let reason = issue
                        .message
                        .as_ref()
                        .map_or_else(|| issue.code.to_string(), ToString::to_string);
                    out.push(InvalidParam {
                        name: path.clone(),
                        reason,
                    });
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_params(nested, Some(&path), out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_params(nested, Some(&format!("{path}.{index}")), out);
                }
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::error::Opts;
    use http::HeaderMap;

    fn format(error: &BanError) -> Result<Value, FormatError> {
        let headers = HeaderMap::new();
        let ctx = FormatContext {
            headers: &headers,
            sanitize: &[],
            include_stack_trace: false,
        };
        Rfc7807Formatter::default().format(error, &ctx)
    }

    #[test]
    fn mandatory_fields_are_assembled() {
        let err = BanError::from_opts(Opts::new().status(404).message("no such user"));
        let body = format(&err).unwrap();
        assert_eq!(body["status"], 404);
        assert_eq!(body["title"], "Not Found");
        assert_eq!(body["detail"], "no such user");
        assert!(
            body["type"]
                .as_str()
                .unwrap()
                .ends_with("/404")
        );
        assert!(body["instance"].as_str().unwrap().starts_with("urn:uuid:"));
        assert!(body["timestamp"].as_str().is_some());
    }

    #[test]
    fn instance_is_unique_per_call() {
        let err = BanError::new(400);
        let first = format(&err).unwrap();
        let second = format(&err).unwrap();
        assert_ne!(first["instance"], second["instance"]);
    }

    #[test]
    fn invalid_params_are_attached() {
        let data = validation_error(&[InvalidParam {
            name: "email".to_owned(),
            reason: "Must be valid".to_owned(),
        }])
        .unwrap();
        let err = BanError::from_opts(Opts::new().status(400).message("Invalid input").data(data));
        let body = format(&err).unwrap();
        assert_eq!(
            body["invalid-params"],
            json!([{ "name": "email", "reason": "Must be valid" }])
        );
        assert!(body.get("violations").is_none());
    }

    #[test]
    fn violations_are_attached_when_no_invalid_params() {
        let data = constraint_violation("email", "already taken", "user", None);
        let err = BanError::from_opts(Opts::new().status(409).data(data));
        let body = format(&err).unwrap();
        assert_eq!(body["violations"][0]["constraint"], "unique");
        assert!(body.get("invalid-params").is_none());
    }

    #[test]
    fn invalid_params_win_over_violations() {
        let data = json!({
            "invalid-params": [{ "name": "a", "reason": "r" }],
            "violations": [{ "name": "b", "reason": "r", "resource": "x", "constraint": "unique" }]
        });
        let err = BanError::from_opts(Opts::new().status(400).data(data));
        let body = format(&err).unwrap();
        assert!(body.get("invalid-params").is_some());
        assert!(body.get("violations").is_none());
    }

    #[test]
    fn malformed_extension_is_rejected() {
        let err = BanError::from_opts(
            Opts::new()
                .status(400)
                .data(json!({ "invalid-params": [{ "name": "x" }] })),
        );
        assert!(matches!(
            format(&err),
            Err(FormatError::InvalidProblem { .. })
        ));

        let err = BanError::from_opts(
            Opts::new()
                .status(400)
                .data(json!({ "invalid-params": "nope" })),
        );
        assert!(format(&err).is_err());
    }

    #[test]
    fn validation_error_rejects_empty_fields() {
        assert!(matches!(
            validation_error(&[InvalidParam {
                name: String::new(),
                reason: "r".to_owned(),
            }]),
            Err(FormatError::InvalidParam { .. })
        ));
        assert!(
            validation_error(&[InvalidParam {
                name: "email".to_owned(),
                reason: String::new(),
            }])
            .is_err()
        );
    }

    #[test]
    fn problem_validate_rejects_bad_shapes() {
        let good = Problem {
            type_url: "https://errors.example.com/400".to_owned(),
            title: "Bad Request".to_owned(),
            status: StatusCode::BAD_REQUEST,
            detail: "nope".to_owned(),
            instance: "urn:uuid:00000000-0000-0000-0000-000000000000".to_owned(),
            timestamp: Utc::now(),
            invalid_params: None,
            violations: None,
        };
        assert!(good.validate().is_ok());

        let mut bad = good.clone();
        bad.type_url = "not-a-uri".to_owned();
        assert!(bad.validate().is_err());

        let mut bad = good.clone();
        bad.title = String::new();
        assert!(bad.validate().is_err());

        let mut bad = good;
        bad.status = StatusCode::OK;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let formatter = Rfc7807Formatter::new("https://errors.acme.dev/");
        let err = BanError::new(404);
        let headers = HeaderMap::new();
        let ctx = FormatContext {
            headers: &headers,
            sanitize: &[],
            include_stack_trace: false,
        };
        let body = formatter.format(&err, &ctx).unwrap();
        assert_eq!(body["type"], "https://errors.acme.dev/404");
    }

    #[test]
    fn status_serializes_as_u16() {
        let p = Problem {
            type_url: "about:blank".to_owned(),
            title: "Not Found".to_owned(),
            status: StatusCode::NOT_FOUND,
            detail: "Resource not found".to_owned(),
            instance: "urn:uuid:00000000-0000-0000-0000-000000000000".to_owned(),
            timestamp: Utc::now(),
            invalid_params: None,
            violations: None,
        };
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"status\":404"));
    }

    #[cfg(feature = "validator")]
    mod validator_mapping {
        use super::*;
        use validator::Validate;

        #[derive(Debug, Validate)]
        struct Signup {
            #[validate(email(message = "Must be valid"))]
            email: String,
            #[validate(length(min = 8, message = "Too short"))]
            password: String,
        }

        #[test]
        fn issues_map_to_invalid_params() {
            let bad = Signup {
                email: "not-an-email".to_owned(),
                password: "short".to_owned(),
            };
            let report = bad.validate().unwrap_err();
            let data = from_validator_errors(&report);
            let params = data["invalid-params"].as_array().unwrap();
            assert_eq!(params.len(), 2);
            assert!(params.iter().any(|p| p["name"] == "email"
                && p["reason"] == "Must be valid"));
            assert!(params.iter().any(|p| p["name"] == "password"
                && p["reason"] == "Too short"));
        }
    }
}
