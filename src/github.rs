use crate::models::VersionToken;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

const API_ROOT: &str = "https://api.github.com";
const ACCEPT: &str = "application/vnd.github.v3+json";

/// Identifies exactly one file in one repository as the sync target.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSyncConfig {
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub token: String,
    #[serde(default = "default_branch")]
    pub branch: String,
}

fn default_branch() -> String {
    "main".to_string()
}

impl RemoteSyncConfig {
    pub fn location(&self) -> String {
        format!("{}/{}/{}", self.owner, self.repo, self.path)
    }
}

#[derive(Debug)]
pub enum RemoteError {
    Auth(String),
    Permission(String),
    NotFound(String),
    Conflict(String),
    Network(String),
    Encoding(String),
    Api(String),
}

impl RemoteError {
    pub fn message(&self) -> String {
        match self {
            RemoteError::Auth(msg)
            | RemoteError::Permission(msg)
            | RemoteError::NotFound(msg)
            | RemoteError::Conflict(msg)
            | RemoteError::Api(msg) => msg.clone(),
            RemoteError::Network(msg) => format!("network error: {msg}"),
            RemoteError::Encoding(msg) => format!("undecodable file content: {msg}"),
        }
    }
}

pub struct RemoteFile {
    pub content: String,
    pub version: VersionToken,
}

#[derive(Deserialize)]
struct ContentResponse {
    content: String,
    sha: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// Thin client for the GitHub contents API. All three operations are pure
/// network calls; persisting returned version tokens is the caller's job.
pub struct RemoteClient {
    http: Client,
    api_root: String,
}

impl RemoteClient {
    pub fn new(timeout_seconds: u64) -> Result<Self, RemoteError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds.max(5)))
            // The GitHub API rejects requests without a user agent.
            .user_agent(concat!("lifelog/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        Ok(Self {
            http,
            api_root: API_ROOT.to_string(),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_api_root(api_root: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(5))
            .user_agent("lifelog-test")
            .build()
            .expect("build test client");
        Self {
            http,
            api_root: api_root.into(),
        }
    }

    fn contents_url(&self, config: &RemoteSyncConfig) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_root, config.owner, config.repo, config.path
        )
    }

    /// Reads the sync target. A missing file is a legitimate outcome and
    /// returns `None`; everything else non-2xx is an error.
    pub fn fetch_file(
        &self,
        config: &RemoteSyncConfig,
    ) -> Result<Option<RemoteFile>, RemoteError> {
        let resp = self
            .http
            .get(self.contents_url(config))
            .header("Authorization", format!("token {}", config.token))
            .header("Accept", ACCEPT)
            .query(&[("ref", config.branch.as_str())])
            .send()
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(status_error(resp));
        }

        let body: ContentResponse = resp
            .json()
            .map_err(|e| RemoteError::Api(format!("unexpected contents response: {e}")))?;
        let content = decode_content(&body.content)?;
        Ok(Some(RemoteFile {
            content,
            version: VersionToken::new(body.sha),
        }))
    }

    /// Creates or updates the sync target. With `previous` set, the remote
    /// side rejects the write when the file moved past that revision; with
    /// no `previous`, the write is an unconditional create-or-overwrite.
    pub fn write_file(
        &self,
        config: &RemoteSyncConfig,
        content: &str,
        previous: Option<&VersionToken>,
        message: &str,
    ) -> Result<(), RemoteError> {
        let mut body = json!({
            "message": message,
            "content": encode_content(content),
            "branch": config.branch,
        });
        if let Some(previous) = previous {
            body["sha"] = json!(previous.as_str());
        }

        let resp = self
            .http
            .put(self.contents_url(config))
            .header("Authorization", format!("token {}", config.token))
            .header("Accept", ACCEPT)
            .json(&body)
            .send()
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(status_error(resp))
        }
    }

    /// Read-only credential and repository check; mutates nothing.
    pub fn validate(&self, config: &RemoteSyncConfig) -> Result<(), RemoteError> {
        let url = format!("{}/repos/{}/{}", self.api_root, config.owner, config.repo);
        let resp = self
            .http
            .get(url)
            .header("Authorization", format!("token {}", config.token))
            .header("Accept", ACCEPT)
            .send()
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        match resp.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED => {
                Err(RemoteError::Auth("token is invalid or expired".to_string()))
            }
            StatusCode::FORBIDDEN => Err(RemoteError::Permission(
                "token lacks permission for this repository".to_string(),
            )),
            StatusCode::NOT_FOUND => Err(RemoteError::NotFound(
                "repository not found or not accessible".to_string(),
            )),
            status => Err(RemoteError::Api(format!("validation failed: HTTP {status}"))),
        }
    }
}

fn status_error(resp: Response) -> RemoteError {
    let status = resp.status();
    let reason = resp
        .json::<ApiErrorBody>()
        .ok()
        .and_then(|body| body.message)
        .unwrap_or_else(|| format!("HTTP {status}"));
    match status {
        StatusCode::UNAUTHORIZED => RemoteError::Auth(reason),
        StatusCode::FORBIDDEN => RemoteError::Permission(reason),
        StatusCode::NOT_FOUND => RemoteError::NotFound(reason),
        // 409 is the stale-sha rejection; 422 covers the required-but-missing
        // sha family. Both mean the caller did not observe the latest revision.
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => RemoteError::Conflict(reason),
        _ => RemoteError::Api(format!("HTTP {status}: {reason}")),
    }
}

pub fn encode_content(content: &str) -> String {
    BASE64.encode(content.as_bytes())
}

pub fn decode_content(encoded: &str) -> Result<String, RemoteError> {
    // The contents API wraps base64 payloads in newlines.
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64
        .decode(compact.as_bytes())
        .map_err(|e| RemoteError::Encoding(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| RemoteError::Encoding(e.to_string()))
}


#[cfg(test)]
mod tests {
    use super::stub::{StubResponse, serve};
    use super::*;

    fn config() -> RemoteSyncConfig {
        RemoteSyncConfig {
            owner: "octocat".to_string(),
            repo: "life".to_string(),
            path: "data/life-tracker.json".to_string(),
            token: "ghp_test".to_string(),
            branch: "main".to_string(),
        }
    }

    #[test]
    fn encoding_round_trips_multi_byte_content() {
        let samples = ["", "plain ascii", "你好 #tag", "emoji 🌊 and \n newlines"];
        for sample in samples {
            let decoded = decode_content(&encode_content(sample)).expect("decode");
            assert_eq!(decoded, sample);
        }
    }

    #[test]
    fn decode_tolerates_api_newline_wrapping() {
        let encoded = encode_content("snapshot body");
        let wrapped = format!("{}\n{}\n", &encoded[..4], &encoded[4..]);
        assert_eq!(decode_content(&wrapped).expect("decode"), "snapshot body");
    }

    #[test]
    fn decode_rejects_invalid_base64() {
        assert!(decode_content("@@not-base64@@").is_err());
    }

    #[test]
    fn fetch_file_decodes_content_and_captures_version() {
        let body = serde_json::json!({
            "content": encode_content("{\"dailyRecords\":[]}"),
            "sha": "abc123",
        })
        .to_string();
        let (root, handle) = serve(vec![StubResponse { status: 200, body }]);

        let client = RemoteClient::with_api_root(root);
        let file = client
            .fetch_file(&config())
            .expect("fetch")
            .expect("file present");
        assert_eq!(file.content, "{\"dailyRecords\":[]}");
        assert_eq!(file.version.as_str(), "abc123");

        let captured = handle.join().expect("stub thread");
        assert_eq!(captured[0].method, "GET");
        assert!(
            captured[0]
                .path
                .starts_with("/repos/octocat/life/contents/data/life-tracker.json")
        );
        assert!(captured[0].path.contains("ref=main"));
    }

    #[test]
    fn fetch_file_treats_404_as_missing_not_error() {
        let (root, handle) = serve(vec![StubResponse {
            status: 404,
            body: "{\"message\":\"Not Found\"}".to_string(),
        }]);
        let client = RemoteClient::with_api_root(root);
        let file = client.fetch_file(&config()).expect("fetch");
        assert!(file.is_none());
        handle.join().expect("stub thread");
    }

    #[test]
    fn write_file_sends_previous_version_as_sha() {
        let (root, handle) = serve(vec![StubResponse {
            status: 200,
            body: "{}".to_string(),
        }]);
        let client = RemoteClient::with_api_root(root);
        let previous = VersionToken::new("oldsha");
        client
            .write_file(&config(), "payload", Some(&previous), "update")
            .expect("write");

        let captured = handle.join().expect("stub thread");
        assert_eq!(captured[0].method, "PUT");
        let body: serde_json::Value =
            serde_json::from_str(&captured[0].body).expect("parse request body");
        assert_eq!(body["sha"], "oldsha");
        assert_eq!(body["branch"], "main");
        assert_eq!(
            decode_content(body["content"].as_str().expect("content field")).expect("decode"),
            "payload"
        );
    }

    #[test]
    fn write_file_without_previous_version_omits_sha() {
        let (root, handle) = serve(vec![StubResponse {
            status: 201,
            body: "{}".to_string(),
        }]);
        let client = RemoteClient::with_api_root(root);
        client
            .write_file(&config(), "payload", None, "first push")
            .expect("write");

        let captured = handle.join().expect("stub thread");
        let body: serde_json::Value =
            serde_json::from_str(&captured[0].body).expect("parse request body");
        assert!(body.get("sha").is_none());
    }

    #[test]
    fn stale_version_write_surfaces_as_conflict() {
        let (root, handle) = serve(vec![StubResponse {
            status: 409,
            body: "{\"message\":\"data/life-tracker.json does not match\"}".to_string(),
        }]);
        let client = RemoteClient::with_api_root(root);
        let previous = VersionToken::new("stale");
        let err = client
            .write_file(&config(), "payload", Some(&previous), "update")
            .expect_err("write should fail");
        assert!(matches!(err, RemoteError::Conflict(_)));
        assert!(err.message().contains("does not match"));
        handle.join().expect("stub thread");
    }

    #[test]
    fn validate_reports_invalid_token_on_401() {
        let (root, handle) = serve(vec![StubResponse {
            status: 401,
            body: "{\"message\":\"Bad credentials\"}".to_string(),
        }]);
        let client = RemoteClient::with_api_root(root);
        let err = client.validate(&config()).expect_err("validation fails");
        assert!(matches!(err, RemoteError::Auth(_)));
        assert!(err.message().contains("token is invalid"));
        handle.join().expect("stub thread");
    }

    #[test]
    fn validate_reports_repository_access_on_404() {
        let (root, handle) = serve(vec![StubResponse {
            status: 404,
            body: "{\"message\":\"Not Found\"}".to_string(),
        }]);
        let client = RemoteClient::with_api_root(root);
        let err = client.validate(&config()).expect_err("validation fails");
        assert!(matches!(err, RemoteError::NotFound(_)));
        assert!(err.message().contains("repository"));

        let captured = handle.join().expect("stub thread");
        assert_eq!(captured[0].path, "/repos/octocat/life");
    }

    #[test]
    fn validate_reports_permission_on_403() {
        let (root, handle) = serve(vec![StubResponse {
            status: 403,
            body: "{\"message\":\"Forbidden\"}".to_string(),
        }]);
        let client = RemoteClient::with_api_root(root);
        let err = client.validate(&config()).expect_err("validation fails");
        assert!(matches!(err, RemoteError::Permission(_)));
        assert!(err.message().contains("permission"));
        handle.join().expect("stub thread");
    }
}
