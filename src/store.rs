//! The hosted lead store: what the uploader talks to, plus a REST/RPC client
//! for a PostgREST-style backend.

use crate::config::StoreConfig;
use crate::lead::{LeadRecord, Platform, Stage};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use crc32fast::Hasher as Crc32;
use reqwest::{Client, RequestBuilder};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("lead store returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected lead store response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("lead store rejected the request: {0}")]
    Rejected(String),
    #[error("Project not found: {0}")]
    ProjectNotFound(String),
}

/// A contiguous slice of leads sent in one store call.
#[derive(Debug, Clone)]
pub struct LeadBatch<'a> {
    /// Zero-based position in the partition.
    pub index: usize,
    /// Derived from project id and contents; identical batches share a key.
    pub idempotency_key: String,
    pub leads: &'a [LeadRecord],
}

impl<'a> LeadBatch<'a> {
    pub fn new(project_id: &str, index: usize, leads: &'a [LeadRecord]) -> Self {
        let mut crc = Crc32::new();
        crc.update(project_id.as_bytes());
        for lead in leads {
            // '\x1e' between records, '\x1f' between fields
            crc.update(&[0x1e]);
            for (i, cell) in lead.cells().iter().enumerate() {
                if i > 0 {
                    crc.update(&[0x1f]);
                }
                crc.update(cell.as_bytes());
            }
        }
        Self {
            index,
            idempotency_key: format!("leads-{:08x}-{}", crc.finalize(), leads.len()),
            leads,
        }
    }

    pub fn len(&self) -> usize {
        self.leads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }
}

/// Body of a successful `rpc_upload_leads` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub inserted: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_true() -> bool {
    true
}

impl UploadReceipt {
    pub fn accepted(inserted: u64) -> Self {
        Self {
            success: true,
            inserted: Some(inserted),
            error: None,
            message: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "name_or_relation")]
    pub developer: Option<String>,
    #[serde(default)]
    pub available_leads: i64,
    #[serde(default)]
    pub price_per_lead: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStats {
    #[serde(default)]
    pub total_projects: u64,
    #[serde(default)]
    pub projects_with_leads: u64,
    #[serde(default)]
    pub total_available_leads: i64,
    #[serde(default)]
    pub total_developers: u64,
}

impl ProjectStats {
    /// Stats derived locally when the backend stats call is unavailable.
    pub fn from_projects(projects: &[Project]) -> Self {
        let developers: HashSet<&str> = projects
            .iter()
            .filter_map(|p| p.developer.as_deref())
            .collect();
        Self {
            total_projects: projects.len() as u64,
            projects_with_leads: projects.iter().filter(|p| p.available_leads > 0).count() as u64,
            total_available_leads: projects.iter().map(|p| p.available_leads).sum(),
            total_developers: developers.len() as u64,
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("unexpected project id: {other}"))),
    }
}

// PostgREST embeds the developer as `{ "name": ... }`; older views return a plain string.
fn name_or_relation<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        Value::Object(map) => map.get("name").and_then(Value::as_str).map(str::to_string),
        _ => None,
    })
}

#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn upload_leads(
        &self,
        project_id: &str,
        batch: &LeadBatch<'_>,
    ) -> Result<UploadReceipt, StoreError>;

    async fn list_projects(&self) -> Result<Vec<Project>, StoreError>;

    async fn project_stats(&self) -> Result<ProjectStats, StoreError>;

    async fn update_project_cpl(
        &self,
        project_id: &str,
        price_per_lead: f64,
    ) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: LeadStore + ?Sized> LeadStore for Arc<S> {
    async fn upload_leads(
        &self,
        project_id: &str,
        batch: &LeadBatch<'_>,
    ) -> Result<UploadReceipt, StoreError> {
        (**self).upload_leads(project_id, batch).await
    }

    async fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        (**self).list_projects().await
    }

    async fn project_stats(&self) -> Result<ProjectStats, StoreError> {
        (**self).project_stats().await
    }

    async fn update_project_cpl(
        &self,
        project_id: &str,
        price_per_lead: f64,
    ) -> Result<(), StoreError> {
        (**self).update_project_cpl(project_id, price_per_lead).await
    }
}

/// Projects and stats as seen right after an upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSnapshot {
    pub projects: Vec<Project>,
    pub stats: ProjectStats,
}

/// Re-read projects and stats. A failing stats call falls back to stats
/// computed from the project list.
pub async fn refresh_projects<S: LeadStore + ?Sized>(
    store: &S,
) -> Result<ProjectSnapshot, StoreError> {
    let projects = store.list_projects().await?;
    let stats = match store.project_stats().await {
        Ok(stats) => stats,
        Err(err) => {
            tracing::warn!(error = %err, "project stats unavailable, deriving from project list");
            ProjectStats::from_projects(&projects)
        }
    };
    Ok(ProjectSnapshot { projects, stats })
}

/// [`refresh_projects`] once leads are already stored: a failure is only
/// worth a warning.
pub async fn refresh_after_upload<S: LeadStore + ?Sized>(store: &S) -> Option<ProjectSnapshot> {
    match refresh_projects(store).await {
        Ok(snapshot) => Some(snapshot),
        Err(err) => {
            tracing::warn!(error = %err, "leads stored, but projects could not be refreshed");
            None
        }
    }
}

const PROJECT_COLUMNS: &str =
    "id,name,region,available_leads,price_per_lead,developer:entities!projects_developer_id_fkey(name)";

pub struct HttpLeadStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpLeadStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{function}", self.base_url)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.api_key).bearer_auth(&self.api_key)
    }

    async fn send_raw(&self, req: RequestBuilder) -> Result<Bytes, StoreError> {
        let resp = self.authed(req).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.bytes().await?)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<Option<T>, StoreError> {
        let bytes = self.send_raw(req).await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Ok(serde_json::from_slice::<Option<T>>(&bytes)?)
    }

    async fn ensure_project(&self, project_id: &str) -> Result<(), StoreError> {
        let filter = format!("eq.{project_id}");
        let req = self
            .client
            .get(self.table_url("projects"))
            .query(&[("select", "id,name"), ("id", filter.as_str())]);
        match self.send::<Vec<Value>>(req).await {
            Ok(Some(rows)) if !rows.is_empty() => Ok(()),
            Ok(_) | Err(StoreError::Status { .. }) => {
                Err(StoreError::ProjectNotFound(project_id.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    /// Any 2xx answer means the function ran; only a receipt object can
    /// report a rejection.
    async fn upload_via_rpc(
        &self,
        project_id: &str,
        batch: &LeadBatch<'_>,
    ) -> Result<UploadReceipt, StoreError> {
        let req = self
            .client
            .post(self.rpc_url("rpc_upload_leads"))
            .header("Idempotency-Key", &batch.idempotency_key)
            .json(&upload_payload(project_id, batch));
        let body = self.send_raw(req).await?;
        let receipt = match serde_json::from_slice::<Value>(&body) {
            Ok(value @ Value::Object(_)) => serde_json::from_value(value).ok(),
            _ => None,
        };
        Ok(receipt.unwrap_or_else(|| UploadReceipt::accepted(batch.len() as u64)))
    }

    async fn insert_rows(
        &self,
        project_id: &str,
        batch: &LeadBatch<'_>,
    ) -> Result<UploadReceipt, StoreError> {
        let batch_id = format!(
            "batch_{}_{}",
            Utc::now().timestamp_millis(),
            batch.idempotency_key
        );
        let req = self
            .client
            .post(self.table_url("leads"))
            .query(&[("select", "id")])
            .header("Prefer", "return=representation")
            .header("Idempotency-Key", &batch.idempotency_key)
            .json(&lead_rows(project_id, batch.leads, &batch_id));
        let ids: Option<Vec<Value>> = self.send(req).await?;
        let inserted = ids.map_or(0, |ids| ids.len() as u64);
        tracing::info!(batch = batch.index + 1, inserted, %batch_id, "inserted lead rows directly");
        Ok(UploadReceipt {
            success: true,
            inserted: Some(inserted),
            error: None,
            message: Some("Leads uploaded successfully".to_string()),
        })
    }
}

fn upload_payload(project_id: &str, batch: &LeadBatch<'_>) -> Value {
    #[derive(Serialize)]
    struct RpcLead<'a> {
        #[serde(flatten)]
        lead: &'a LeadRecord,
        source: Platform,
    }

    let leads_data: Vec<RpcLead<'_>> = batch
        .leads
        .iter()
        .map(|lead| RpcLead {
            lead,
            source: lead.platform,
        })
        .collect();
    json!({ "project_id": project_id, "leads_data": leads_data })
}

/// A row of the `leads` table, written when the upload function is unavailable.
#[derive(Debug, Serialize)]
struct LeadRow<'a> {
    project_id: &'a str,
    client_name: &'a str,
    client_phone: &'a str,
    client_phone2: Option<&'a str>,
    client_phone3: Option<&'a str>,
    client_email: Option<&'a str>,
    client_job_title: Option<&'a str>,
    source: Platform,
    stage: Stage,
    batch_id: &'a str,
}

fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn lead_rows<'a>(
    project_id: &'a str,
    leads: &'a [LeadRecord],
    batch_id: &'a str,
) -> Vec<LeadRow<'a>> {
    leads
        .iter()
        .map(|lead| LeadRow {
            project_id,
            client_name: trimmed(Some(lead.client_name.as_str())).unwrap_or("Unknown"),
            client_phone: lead.client_phone.trim(),
            client_phone2: trimmed(lead.client_phone2.as_deref()),
            client_phone3: trimmed(lead.client_phone3.as_deref()),
            client_email: trimmed(lead.client_email.as_deref()),
            client_job_title: trimmed(lead.client_job_title.as_deref()),
            source: lead.platform,
            stage: lead.stage,
            batch_id,
        })
        .collect()
}

#[async_trait]
impl LeadStore for HttpLeadStore {
    /// Checks the project, calls `rpc_upload_leads`, and inserts into the
    /// `leads` table directly when the function call errors.
    async fn upload_leads(
        &self,
        project_id: &str,
        batch: &LeadBatch<'_>,
    ) -> Result<UploadReceipt, StoreError> {
        self.ensure_project(project_id).await?;
        match self.upload_via_rpc(project_id, batch).await {
            Ok(receipt) => Ok(receipt),
            Err(err) => {
                tracing::warn!(
                    batch = batch.index + 1,
                    error = %err,
                    "rpc_upload_leads failed, falling back to direct insert"
                );
                self.insert_rows(project_id, batch).await
            }
        }
    }

    async fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        let req = self
            .client
            .get(self.table_url("projects"))
            .query(&[("select", PROJECT_COLUMNS), ("order", "name")]);
        Ok(self.send(req).await?.unwrap_or_default())
    }

    async fn project_stats(&self) -> Result<ProjectStats, StoreError> {
        let req = self
            .client
            .post(self.rpc_url("rpc_project_stats"))
            .json(&json!({}));
        self.send(req)
            .await?
            .ok_or_else(|| StoreError::Rejected("empty project stats".into()))
    }

    async fn update_project_cpl(
        &self,
        project_id: &str,
        price_per_lead: f64,
    ) -> Result<(), StoreError> {
        let req = self.client.post(self.rpc_url("rpc_update_project_cpl")).json(&json!({
            "project_id": project_id,
            "new_price_per_lead": price_per_lead,
        }));
        let body: Option<Value> = self.send(req).await?;
        match body {
            Some(v) if v.get("success") == Some(&Value::Bool(false)) => {
                let msg = v
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("CPL update failed");
                Err(StoreError::Rejected(msg.to_string()))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::{BatchUploader, UploadConfig};
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio_util::sync::CancellationToken;

    fn config(base_url: &str) -> StoreConfig {
        StoreConfig {
            base_url: base_url.to_string(),
            api_key: "anon".to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn urls_ignore_trailing_slash() {
        let store = HttpLeadStore::new(&config("https://db.example.com/")).unwrap();
        assert_eq!(
            store.rpc_url("rpc_upload_leads"),
            "https://db.example.com/rest/v1/rpc/rpc_upload_leads"
        );
        assert_eq!(store.table_url("projects"), "https://db.example.com/rest/v1/projects");
    }

    #[test]
    fn upload_payload_copies_platform_into_source() {
        let mut lead = LeadRecord::new("Sara Ali", "+201098765432");
        lead.platform = Platform::Google;
        lead.stage = Stage::Potential;
        let leads = vec![lead];
        let batch = LeadBatch::new("p-1", 0, &leads);

        let body = upload_payload("p-1", &batch);
        assert_eq!(body["project_id"], "p-1");
        assert_eq!(body["leads_data"][0]["source"], "Google");
        assert_eq!(body["leads_data"][0]["platform"], "Google");
        assert_eq!(body["leads_data"][0]["stage"], "Potential");
        assert!(body["leads_data"][0].get("client_phone2").is_none());
    }

    #[test]
    fn project_accepts_numeric_id_and_embedded_developer() {
        let raw = r#"[{"id": 948, "name": "Jazebeya", "developer": {"name": "Palm Hills"},
                      "available_leads": 12, "price_per_lead": 25.5},
                     {"id": "c3a1", "name": "Bloomfields", "developer": "Tatweer Misr"}]"#;
        let projects: Vec<Project> = serde_json::from_str(raw).unwrap();
        assert_eq!(projects[0].id, "948");
        assert_eq!(projects[0].developer.as_deref(), Some("Palm Hills"));
        assert_eq!(projects[1].available_leads, 0);

        let stats = ProjectStats::from_projects(&projects);
        assert_eq!(stats.total_projects, 2);
        assert_eq!(stats.projects_with_leads, 1);
        assert_eq!(stats.total_available_leads, 12);
        assert_eq!(stats.total_developers, 2);
    }

    #[test]
    fn receipt_defaults_to_success() {
        let receipt: UploadReceipt = serde_json::from_str(r#"{"inserted": 3}"#).unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.inserted, Some(3));
    }

    const PROJECT_ROW: &str = r#"[{"id": "p-1", "name": "Bloomfields"}]"#;

    #[derive(Debug, Clone)]
    struct Seen {
        line: String,
        body: String,
    }

    /// Answers one connection per canned `(status, body)` reply, in order,
    /// and records what each request asked for.
    async fn serve(replies: Vec<(u16, &'static str)>) -> (StoreConfig, Arc<Mutex<Vec<Seen>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        tokio::spawn(async move {
            for (status, body) in replies {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let request = read_request(&mut socket).await;
                log.lock().unwrap().push(request);
                let response = format!(
                    "HTTP/1.1 {status} Canned\r\ncontent-type: application/json\r\n\
                     content-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        (config(&base_url), seen)
    }

    async fn read_request(socket: &mut TcpStream) -> Seen {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).into_owned();
                let content_length = head
                    .lines()
                    .filter_map(|l| l.split_once(':'))
                    .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                while buf.len() < end + 4 + content_length {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }
                return Seen {
                    line: head.lines().next().unwrap_or_default().to_string(),
                    body: String::from_utf8_lossy(&buf[end + 4..]).into_owned(),
                };
            }
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return Seen {
                    line: String::new(),
                    body: String::new(),
                };
            }
            buf.extend_from_slice(&chunk[..n]);
        }
    }

    fn one_lead() -> Vec<LeadRecord> {
        vec![LeadRecord::new("Sara Ali", "+201098765432")]
    }

    #[tokio::test]
    async fn non_success_status_keeps_code_and_body() {
        let (config, _) = serve(vec![(500, "boom")]).await;
        let store = HttpLeadStore::new(&config).unwrap();
        match store.list_projects().await {
            Err(StoreError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_rpc_body_counts_as_stored() {
        let (config, seen) = serve(vec![(200, PROJECT_ROW), (200, "")]).await;
        let store = HttpLeadStore::new(&config).unwrap();
        let leads = one_lead();
        let receipt = store
            .upload_leads("p-1", &LeadBatch::new("p-1", 0, &leads))
            .await
            .unwrap();
        assert_eq!(receipt, UploadReceipt::accepted(1));

        let seen = seen.lock().unwrap().clone();
        assert!(seen[0].line.starts_with("GET /rest/v1/projects?select=id%2Cname&id=eq.p-1"));
        assert!(seen[1].line.starts_with("POST /rest/v1/rpc/rpc_upload_leads"));
        let body: Value = serde_json::from_str(&seen[1].body).unwrap();
        assert_eq!(body["leads_data"][0]["source"], "Other");
    }

    #[tokio::test]
    async fn non_object_rpc_body_counts_as_stored() {
        for reply in ["5", "true", "[]"] {
            let (config, _) = serve(vec![(200, PROJECT_ROW), (200, reply)]).await;
            let store = HttpLeadStore::new(&config).unwrap();
            let leads = one_lead();
            let receipt = store
                .upload_leads("p-1", &LeadBatch::new("p-1", 0, &leads))
                .await
                .unwrap();
            assert!(receipt.success, "reply {reply}");
            assert_eq!(receipt.inserted, Some(1));
        }
    }

    #[tokio::test]
    async fn unknown_project_stops_before_upload() {
        let (config, seen) = serve(vec![(200, "[]")]).await;
        let store = HttpLeadStore::new(&config).unwrap();
        let leads = one_lead();
        let err = store
            .upload_leads("p-9", &LeadBatch::new("p-9", 0, &leads))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ProjectNotFound(ref id) if id == "p-9"));
        assert_eq!(err.to_string(), "Project not found: p-9");
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_rpc_falls_back_to_direct_insert() {
        let (config, seen) = serve(vec![
            (200, PROJECT_ROW),
            (404, r#"{"message": "function rpc_upload_leads does not exist"}"#),
            (201, r#"[{"id": 11}, {"id": 12}]"#),
        ])
        .await;
        let store = HttpLeadStore::new(&config).unwrap();

        let mut first = LeadRecord::new("  Sara Ali ", " +201098765432 ");
        first.platform = Platform::Google;
        first.client_email = Some("   ".into());
        first.client_job_title = Some(" Broker ".into());
        let second = LeadRecord::new("   ", "+201000000001");
        let leads = vec![first, second];

        let receipt = store
            .upload_leads("p-1", &LeadBatch::new("p-1", 0, &leads))
            .await
            .unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.inserted, Some(2));

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 3);
        assert!(seen[2].line.starts_with("POST /rest/v1/leads?select=id"));
        let rows: Value = serde_json::from_str(&seen[2].body).unwrap();
        assert_eq!(rows[0]["project_id"], "p-1");
        assert_eq!(rows[0]["client_name"], "Sara Ali");
        assert_eq!(rows[0]["client_phone"], "+201098765432");
        assert_eq!(rows[0]["client_email"], Value::Null);
        assert_eq!(rows[0]["client_job_title"], "Broker");
        assert_eq!(rows[0]["source"], "Google");
        assert_eq!(rows[0]["stage"], "New Lead");
        assert_eq!(rows[1]["client_name"], "Unknown");
        assert_eq!(rows[1]["source"], "Other");

        let batch_id = rows[0]["batch_id"].as_str().unwrap();
        assert!(batch_id.starts_with("batch_"));
        assert_eq!(rows[1]["batch_id"], batch_id);
    }

    #[tokio::test]
    async fn failing_insert_fails_the_call() {
        let (config, _) = serve(vec![
            (200, PROJECT_ROW),
            (500, "rpc down"),
            (409, "duplicate key value"),
        ])
        .await;
        let store = HttpLeadStore::new(&config).unwrap();
        let leads = one_lead();
        let err = store
            .upload_leads("p-1", &LeadBatch::new("p-1", 0, &leads))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Status { status: 409, .. }));
    }

    #[tokio::test]
    async fn rejected_receipt_fails_only_its_batch() {
        let (config, _) = serve(vec![
            (200, PROJECT_ROW),
            (200, r#"{"success": false, "error": "duplicate phone numbers"}"#),
            (200, PROJECT_ROW),
            (200, r#"{"success": true, "inserted": 1}"#),
        ])
        .await;
        let store = HttpLeadStore::new(&config).unwrap();
        let uploader = BatchUploader::new(
            store,
            UploadConfig {
                batch_size: 1,
                ..UploadConfig::default()
            },
        );
        let leads = vec![
            LeadRecord::new("Sara Ali", "+201098765432"),
            LeadRecord::new("Omar Said", "+201011112222"),
        ];
        let summary = uploader
            .upload("p-1", &leads, &CancellationToken::new(), |_| {})
            .await
            .unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.failed_batches.len(), 1);
        assert_eq!(summary.failed_batches[0].index, 0);
        assert_eq!(summary.failed_batches[0].error, "duplicate phone numbers");
    }
}
