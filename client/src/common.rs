use reqwest::StatusCode;
use serde::Deserialize;

use taskmgmt_core::error::TaskMgmtError;

/// Domain of a Genesys Cloud region
pub fn region_domain(region: &str) -> Option<&'static str> {
    let domain = match region.to_ascii_lowercase().as_str() {
        "dca" => "inindca.com",
        "tca" => "inintca.com",
        "us-east-1" => "mypurecloud.com",
        "us-east-2" => "use2.us-gov-pure.cloud",
        "us-west-2" => "usw2.pure.cloud",
        "eu-west-1" => "mypurecloud.ie",
        "eu-west-2" => "euw2.pure.cloud",
        "ap-southeast-2" => "mypurecloud.com.au",
        "ap-northeast-1" => "mypurecloud.jp",
        "eu-central-1" => "mypurecloud.de",
        "ca-central-1" => "cac1.pure.cloud",
        "ap-northeast-2" => "apne2.pure.cloud",
        "ap-south-1" => "aps1.pure.cloud",
        "sa-east-1" => "sae1.pure.cloud",
        "ap-northeast-3" => "apne3.pure.cloud",
        "eu-central-2" => "euc2.pure.cloud",
        "me-central-1" => "mec1.pure.cloud",
        "mx-central-1" => "mxc1.pure.cloud",
        "ap-southeast-1" => "apse1.pure.cloud",
        _ => return None,
    };
    Some(domain)
}

/// API base URL of a region, e.g. `https://api.mypurecloud.com`
pub fn region_base_url(region: &str) -> Option<String> {
    region_domain(region).map(|domain| format!("https://api.{domain}"))
}

/// OAuth token URL of a region
pub fn region_token_url(region: &str) -> Option<String> {
    region_domain(region).map(|domain| format!("https://login.{domain}/oauth/token"))
}

/// Error body returned by the platform API
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Map a non-success response to a domain error
pub fn status_to_error(status: StatusCode, body: &str) -> TaskMgmtError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|parsed| match (parsed.message, parsed.code) {
            (Some(message), Some(code)) => Some(format!("{message} ({code})")),
            (Some(message), None) => Some(message),
            (None, code) => code,
        })
        .unwrap_or_else(|| body.to_string());

    if status == StatusCode::NOT_FOUND {
        return TaskMgmtError::NotFound(message);
    }
    TaskMgmtError::api(status.as_u16(), message)
}

pub fn transport_error(err: reqwest::Error) -> TaskMgmtError {
    if err.is_decode() {
        TaskMgmtError::Serialization(format!("Failed to decode response: {err}"))
    } else {
        TaskMgmtError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_urls() {
        assert_eq!(region_base_url("us-east-1").as_deref(), Some("https://api.mypurecloud.com"));
        assert_eq!(region_base_url("EU-WEST-1").as_deref(), Some("https://api.mypurecloud.ie"));
        assert_eq!(
            region_token_url("ap-southeast-2").as_deref(),
            Some("https://login.mypurecloud.com.au/oauth/token")
        );
        assert_eq!(region_domain("mars-north-1"), None);
    }

    #[test]
    fn test_status_to_error() {
        let err = status_to_error(StatusCode::NOT_FOUND, r#"{"message":"Worktype not found","code":"not.found"}"#);
        assert_eq!(err, TaskMgmtError::NotFound("Worktype not found (not.found)".to_string()));
        assert!(err.is_retryable());

        let err = status_to_error(
            StatusCode::BAD_REQUEST,
            r#"{"message":"Database transaction was cancelled","status":400}"#,
        );
        assert!(err.is_retryable());

        let err = status_to_error(StatusCode::CONFLICT, "plain text");
        assert_eq!(err, TaskMgmtError::api(409, "plain text"));
        assert!(!err.is_retryable());
    }
}
