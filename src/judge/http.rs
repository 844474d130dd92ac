use crate::errors::{Configuration, Error, Result, Source, Transport};
use crate::judge::client::{Rejudger, StatusClient, Submitter};
use crate::message::{request, response};
use crate::plan::PlanEntry;
use crate::verdict::{SubmissionId, Verdict};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

const DEFAULT_SOURCES: [&str; 3] = ["c-code.zip", "cpp-code.zip", "py-code.zip"];

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Authenticated session against the judge's REST API. The cookie jar holds the session, so one
/// client is shared by every concurrent request of a run.
pub struct JudgeHttpClient {
    http: reqwest::Client,
    api_base: String,
}

impl JudgeHttpClient {
    pub fn new(api_base: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| Error::transport("building HTTP client", e))?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let context = format!("POST /auth/session as {username}");
        let response = self
            .http
            .post(self.url("/auth/session"))
            .json(&request::Login { username, password })
            .send()
            .await
            .map_err(|e| Error::transport(&context, e))?;
        read_body(&context, response).await?;
        info!("Logged in");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn grade(&self, id: &SubmissionId, score: i64) -> Result<()> {
        let context = format!("PUT /submission/{id}/grade");
        let response = self
            .http
            .put(self.url(&format!("/submission/{id}/grade")))
            .json(&request::Grade { score })
            .send()
            .await
            .map_err(|e| Error::transport(&context, e))?;
        read_body(&context, response).await?;
        Ok(())
    }

    async fn upload_source(&self, id: &SubmissionId, entry: &PlanEntry) -> Result<()> {
        let path = source_path(entry)?;
        let code = tokio::fs::read(&path).await.map_err(|e| Source {
            path: path.clone(),
            message: e.to_string(),
        })?;
        if !code.starts_with(ZIP_MAGIC) {
            warn!(source = %path, "Submitting a source that is not a zip archive");
        }

        let file_name = Path::new(&path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "code.zip".to_string());
        let part = Part::bytes(code)
            .file_name(file_name)
            .mime_str("application/zip")
            .map_err(|e| Error::transport("building upload form", e))?;

        let context = format!("PUT /submission/{id}");
        let response = self
            .http
            .put(self.url(&format!("/submission/{id}")))
            .multipart(Form::new().part("code", part))
            .send()
            .await
            .map_err(|e| Error::transport(&context, e))?;
        read_body(&context, response).await?;
        Ok(())
    }
}

#[async_trait]
impl Submitter for JudgeHttpClient {
    #[instrument(skip(self), fields(source = %entry.source))]
    async fn submit(&self, entry: &PlanEntry) -> Result<SubmissionId> {
        let context = "POST /submission";
        let response = self
            .http
            .post(self.url("/submission"))
            .json(&request::CreateSubmission {
                language_type: entry.language,
                problem_id: entry.problem_id,
            })
            .send()
            .await
            .map_err(|e| Error::transport(context, e))?;
        let created: response::Envelope<response::CreatedSubmission> =
            read_json(context, response).await?;
        let id = created.data.submission_id;

        self.upload_source(&id, entry).await?;
        debug!(submission_id = %id, "Submission uploaded");
        Ok(id)
    }
}

#[async_trait]
impl StatusClient for JudgeHttpClient {
    async fn fetch_status(&self, id: &SubmissionId) -> Result<Verdict> {
        let context = format!("GET /submission/{id}");
        let response = self
            .http
            .get(self.url(&format!("/submission/{id}")))
            .send()
            .await
            .map_err(|e| Error::transport(&context, e))?;
        let status: response::SubmissionStatus = read_json(&context, response).await?;
        debug!(submission_id = %id, status = %status.data.status, "Fetched status");
        Ok(status.data)
    }
}

#[async_trait]
impl Rejudger for JudgeHttpClient {
    async fn rejudge(&self, id: &SubmissionId) -> Result<()> {
        let context = format!("GET /submission/{id}/rejudge");
        let response = self
            .http
            .get(self.url(&format!("/submission/{id}/rejudge")))
            .send()
            .await
            .map_err(|e| Error::transport(&context, e))?;
        read_body(&context, response).await?;
        Ok(())
    }
}

fn source_path(entry: &PlanEntry) -> Result<String> {
    if !entry.source.is_empty() {
        return Ok(entry.source.clone());
    }
    usize::try_from(entry.language)
        .ok()
        .and_then(|language| DEFAULT_SOURCES.get(language))
        .map(|name| name.to_string())
        .ok_or_else(|| {
            Configuration(format!(
                "No default source for language {}; pass a source file",
                entry.language
            ))
        })
}

async fn read_body(context: &str, response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::transport(context, e))?;
    debug!(context, %status, body = %body, "Judge reply");
    check_status(context, status, &body)?;
    Ok(body)
}

async fn read_json<T: DeserializeOwned>(context: &str, response: reqwest::Response) -> Result<T> {
    let body = read_body(context, response).await?;
    decode(context, &body)
}

/// Any non-2xx reply is a transport failure, whatever its body says.
fn check_status(context: &str, status: StatusCode, body: &str) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    Err(Transport {
        context: context.to_string(),
        status: Some(status.as_u16()),
        message: body.to_string(),
    })
}

fn decode<T: DeserializeOwned>(context: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| Error::malformed(context, e))
}
