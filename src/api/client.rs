//! HTTP client for the service under test
//!
//! Every call is timed and never returns a harness error: transport
//! failures and non-200 answers become an `ApiFailure` that the test cases
//! turn into failed results.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde_json::{json, Value};

use crate::common::config::RunConfig;
use crate::common::Result;

/// Header carrying the task password on read endpoints
pub const PASSWORD_HEADER: &str = "X-Password";

/// MIME type of the submitted workbook
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const BROWSER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// A failed exchange with the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    /// Short reason, e.g. `HTTP 403` or the transport error
    pub error: String,
    /// Response body for HTTP failures
    pub detail: Option<String>,
}

impl ApiFailure {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: None,
        }
    }

    /// JSON form used in report details
    pub fn to_value(&self) -> Value {
        match &self.detail {
            Some(detail) => json!({ "error": self.error, "detail": detail }),
            None => json!({ "error": self.error }),
        }
    }
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) if !detail.is_empty() => write!(f, "{}: {}", self.error, detail),
            _ => f.write_str(&self.error),
        }
    }
}

impl From<reqwest::Error> for ApiFailure {
    fn from(e: reqwest::Error) -> Self {
        Self::new(e.to_string())
    }
}

/// Outcome of one call together with its wall time
#[derive(Debug, Clone)]
pub struct Timed<T> {
    pub outcome: std::result::Result<T, ApiFailure>,
    pub duration: Duration,
}

impl<T> Timed<T> {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Error text, or an empty string on success
    pub fn error_message(&self) -> String {
        match &self.outcome {
            Ok(_) => String::new(),
            Err(e) => e.error.clone(),
        }
    }
}

async fn timed<T, F>(fut: F) -> Timed<T>
where
    F: Future<Output = std::result::Result<T, ApiFailure>>,
{
    let start = Instant::now();
    let outcome = fut.await;
    Timed {
        outcome,
        duration: start.elapsed(),
    }
}

/// A file part of a multipart submission
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content,
        }
    }
}

/// Multipart body for an online form submission
///
/// Absent fields are left out of the request entirely, which is how the
/// error scenarios exercise server-side validation.
#[derive(Debug, Clone, Default)]
pub struct FormSubmission {
    pub name: Option<String>,
    pub contact: Option<String>,
    pub department: Option<String>,
    /// Row values, sent as a JSON string in `jsonData`
    pub json_data: Option<Value>,
    pub password: Option<String>,
    /// Overrides the configured slug
    pub slug: Option<String>,
    pub attachments: Vec<Upload>,
}

/// Multipart body for a file collection submission
#[derive(Debug, Clone)]
pub struct FileSubmission {
    pub name: String,
    pub contact: String,
    pub department: String,
    pub password: Option<String>,
    pub file_name: String,
    pub file_content: Vec<u8>,
    pub attachments: Vec<Upload>,
}

/// Client for both task workflows of one slug
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_api: String,
    slug: String,
    password: String,
}

impl ApiClient {
    /// Create a client for the task described by `config`
    pub fn new(config: &RunConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
        );

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout);
        if config.no_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            http: builder.build()?,
            base_api: config.base_api.trim_end_matches('/').to_string(),
            slug: config.slug.clone(),
            password: config.password.clone(),
        })
    }

    fn distribution_url(&self, slug: &str, tail: &str) -> String {
        format!("{}/api/distribution/{}/{}", self.base_api, slug, tail)
    }

    // === Online form mode ===

    /// Fetch the column schema
    pub async fn get_schema(&self) -> Timed<Value> {
        let url = self.distribution_url(&self.slug, "schema");
        timed(async {
            let resp = self.get_protected(&url).await?;
            json_body(resp).await
        })
        .await
    }

    /// Fetch the list of attachments published with the task
    pub async fn get_attachments(&self) -> Timed<Value> {
        let url = self.distribution_url(&self.slug, "attachments");
        timed(async {
            let resp = self.get_protected(&url).await?;
            json_body(resp).await
        })
        .await
    }

    /// Download one published attachment
    pub async fn download_attachment(&self, id: &str) -> Timed<Vec<u8>> {
        let url = self.distribution_url(&self.slug, &format!("attachments/{}", id));
        timed(async {
            let resp = self.get_protected(&url).await?;
            bytes_body(resp).await
        })
        .await
    }

    /// Submit one form row
    pub async fn submit_form(&self, submission: FormSubmission) -> Timed<Value> {
        let slug = submission.slug.as_deref().unwrap_or(&self.slug);
        let url = self.distribution_url(slug, "submit");

        let mut form = Form::new();
        if let Some(name) = submission.name {
            form = form.text("name", name);
        }
        if let Some(contact) = submission.contact {
            form = form.text("contact", contact);
        }
        if let Some(department) = submission.department {
            form = form.text("department", department);
        }
        if let Some(data) = &submission.json_data {
            form = form.text("jsonData", data.to_string());
        }
        if let Some(password) = submission.password {
            form = form.text("password", password);
        }
        for upload in submission.attachments {
            form = form.part(
                "attachment",
                Part::bytes(upload.content).file_name(upload.file_name),
            );
        }

        timed(async {
            tracing::debug!(url = %url, "Submitting form");
            let resp = self.http.post(&url).multipart(form).send().await?;
            json_body(resp).await
        })
        .await
    }

    // === File collection mode ===

    /// Fetch task metadata
    pub async fn get_task_info(&self) -> Timed<Value> {
        let url = format!("{}/api/task/{}/info", self.base_api, self.slug);
        timed(async {
            tracing::debug!(url = %url, "GET");
            let resp = self.http.get(&url).send().await?;
            json_body(resp).await
        })
        .await
    }

    /// Download the Excel template
    pub async fn download_template(&self) -> Timed<Vec<u8>> {
        let url = format!("{}/api/template/{}", self.base_api, self.slug);
        timed(async {
            let resp = self.get_protected(&url).await?;
            bytes_body(resp).await
        })
        .await
    }

    /// Submit a filled workbook
    pub async fn submit_file(&self, submission: FileSubmission) -> Timed<Value> {
        let url = format!("{}/api/submit/{}", self.base_api, self.slug);

        timed(async move {
            let mut form = Form::new()
                .text("name", submission.name)
                .text("contact", submission.contact)
                .text("department", submission.department);
            if let Some(password) = submission.password.filter(|p| !p.is_empty()) {
                form = form.text("password", password);
            }

            let workbook = Part::bytes(submission.file_content)
                .file_name(submission.file_name)
                .mime_str(XLSX_MIME)?;
            form = form.part("file", workbook);

            for upload in submission.attachments {
                form = form.part(
                    "attachments",
                    Part::bytes(upload.content).file_name(upload.file_name),
                );
            }

            tracing::debug!(url = %url, "Submitting file");
            let resp = self.http.post(&url).multipart(form).send().await?;
            json_body(resp).await
        })
        .await
    }

    /// Fetch the department list
    pub async fn get_departments(&self) -> Timed<Vec<String>> {
        let url = format!("{}/api/departments", self.base_api);
        timed(async {
            let resp = self.http.get(&url).send().await?;
            let body = json_body(resp).await?;
            Ok(body
                .get("departments")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|d| d.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default())
        })
        .await
    }

    async fn get_protected(&self, url: &str) -> std::result::Result<Response, ApiFailure> {
        tracing::debug!(url = %url, "GET");
        Ok(self
            .http
            .get(url)
            .header(PASSWORD_HEADER, &self.password)
            .send()
            .await?)
    }
}

async fn expect_ok(resp: Response) -> std::result::Result<Response, ApiFailure> {
    let status = resp.status();
    if status == StatusCode::OK {
        return Ok(resp);
    }
    let detail = resp.text().await.unwrap_or_default();
    tracing::debug!(status = status.as_u16(), detail = %detail, "Request rejected");
    Err(ApiFailure {
        error: format!("HTTP {}", status.as_u16()),
        detail: Some(detail),
    })
}

async fn json_body(resp: Response) -> std::result::Result<Value, ApiFailure> {
    let resp = expect_ok(resp).await?;
    resp.json::<Value>()
        .await
        .map_err(|e| ApiFailure::new(format!("invalid JSON body: {}", e)))
}

async fn bytes_body(resp: Response) -> std::result::Result<Vec<u8>, ApiFailure> {
    let resp = expect_ok(resp).await?;
    Ok(resp.bytes().await?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_display() {
        let failure = ApiFailure {
            error: "HTTP 403".to_string(),
            detail: Some("bad password".to_string()),
        };
        assert_eq!(failure.to_string(), "HTTP 403: bad password");
        assert_eq!(failure.to_value()["detail"], "bad password");
        assert_eq!(ApiFailure::new("timeout").to_string(), "timeout");
    }

    #[test]
    fn test_distribution_url() {
        let config = RunConfig::from_file_config(
            &crate::common::config::FileConfig::default(),
            "abc",
            "pw",
        );
        let client = ApiClient::new(&config).unwrap();
        assert_eq!(
            client.distribution_url("abc", "schema"),
            "http://192.168.0.100:8080/api/distribution/abc/schema"
        );
    }
}
