use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{Fields, Filter, Record, RecordId, RecordStore, StoreError};
use crate::config::AirtableConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// [`RecordStore`] backed by the Airtable REST API.
pub struct AirtableStore {
    client: Client,
    api_key: String,
    base_id: String,
    api_url: Url,
}

#[derive(Debug, Deserialize)]
struct ListPage {
    records: Vec<Record>,
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Debug, Serialize)]
struct WriteBody<'a> {
    fields: &'a Fields,
}

/// Tables, fields and views of a base as reported by the metadata API.
#[derive(Debug, Clone, Deserialize)]
pub struct BaseSchema {
    pub tables: Vec<TableSchema>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    pub id: String,
    pub name: String,
    pub primary_field_id: String,
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
    #[serde(default)]
    pub views: Vec<ViewSchema>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldSchema {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewSchema {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl AirtableStore {
    pub fn new(config: &AirtableConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| StoreError::Unavailable(format!("failed to build HTTP client: {err}")))?;
        Self::with_client(config, client)
    }

    pub fn with_client(config: &AirtableConfig, client: Client) -> Result<Self, StoreError> {
        let api_url = Url::parse(config.api_url.trim_end_matches('/')).map_err(|err| {
            StoreError::Unavailable(format!("invalid Airtable URL '{}': {err}", config.api_url))
        })?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_id: config.base_id.clone(),
            api_url,
        })
    }

    /// Fetch the table layout of the configured base.
    pub fn schema(&self) -> Result<BaseSchema, StoreError> {
        let url = self.url(&["meta", "bases", &self.base_id, "tables"])?;
        let response = self.send(self.client.get(url))?;
        Ok(response.json()?)
    }

    fn url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Unavailable(format!("cannot extend URL {}", self.api_url)))?
            .extend(segments);
        Ok(url)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request.bearer_auth(&self.api_key).send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(StoreError::Rejected {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }

    fn list(&self, table: &str, formula: Option<&str>) -> Result<Vec<Record>, StoreError> {
        let url = self.url(&[&self.base_id, table])?;
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut params: Vec<(&str, &str)> = Vec::new();
            if let Some(formula) = formula {
                params.push(("filterByFormula", formula));
            }
            if let Some(offset) = offset.as_deref() {
                params.push(("offset", offset));
            }

            let page: ListPage = self
                .send(self.client.get(url.clone()).query(&params))?
                .json()?;
            debug!(table, fetched = page.records.len(), "listed records page");
            records.extend(page.records);

            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(records)
    }
}

impl RecordStore for AirtableStore {
    fn query(&self, table: &str, filter: &Filter) -> Result<Vec<Record>, StoreError> {
        match filter {
            Filter::All => self.list(table, None),
            Filter::Eq { field, value } => self.list(table, Some(&equality_formula(field, value))),
            // Formulas see the primary field of linked rows, not their ids.
            Filter::LinksTo { .. } => Ok(self
                .list(table, None)?
                .into_iter()
                .filter(|record| filter.matches(record))
                .collect()),
        }
    }

    fn get(&self, table: &str, id: &RecordId) -> Result<Option<Record>, StoreError> {
        let url = self.url(&[&self.base_id, table, id.as_str()])?;
        match self.send(self.client.get(url)) {
            Ok(response) => Ok(Some(response.json()?)),
            Err(StoreError::Rejected { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn create(&self, table: &str, fields: Fields) -> Result<Record, StoreError> {
        let url = self.url(&[&self.base_id, table])?;
        let body = WriteBody { fields: &fields };
        Ok(self.send(self.client.post(url).json(&body))?.json()?)
    }

    fn update(&self, table: &str, id: &RecordId, fields: Fields) -> Result<Record, StoreError> {
        let url = self.url(&[&self.base_id, table, id.as_str()])?;
        let body = WriteBody { fields: &fields };
        Ok(self.send(self.client.patch(url).json(&body))?.json()?)
    }

    fn delete(&self, table: &str, id: &RecordId) -> Result<(), StoreError> {
        let url = self.url(&[&self.base_id, table, id.as_str()])?;
        self.send(self.client.delete(url))?;
        Ok(())
    }
}

fn equality_formula(field: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("{{{field}}} = '{escaped}'")
}

/// Airtable reports errors as `{"error": {"message": ..}}` or `{"error": "CODE"}`.
fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|value| value.get("error"));
    match error {
        Some(Value::Object(details)) => details
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| details.get("type").and_then(Value::as_str))
            .unwrap_or(body)
            .to_string(),
        Some(Value::String(code)) => code.clone(),
        _ => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread;
    use tiny_http::{Response as HttpResponse, Server};

    fn serve(responses: Vec<(u16, &'static str)>) -> (String, thread::JoinHandle<Vec<String>>) {
        let server = Server::http("127.0.0.1:0").expect("bind test server");
        let addr = server.server_addr().to_ip().expect("ip listener");
        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for (status, body) in responses {
                let request = server.recv().expect("receive request");
                seen.push(format!("{} {}", request.method(), request.url()));
                request
                    .respond(HttpResponse::from_string(body).with_status_code(status))
                    .expect("send response");
            }
            seen
        });
        (format!("http://{addr}/v0"), handle)
    }

    fn store(api_url: String) -> AirtableStore {
        let config = AirtableConfig {
            api_key: "key-test".to_string(),
            base_id: "appBase".to_string(),
            api_url,
        };
        let client = Client::builder().no_proxy().build().expect("client builds");
        AirtableStore::with_client(&config, client).expect("store builds")
    }

    #[test]
    fn query_follows_pagination_offsets() {
        let (url, handle) = serve(vec![
            (
                200,
                r#"{"records":[{"id":"rec1","fields":{"Applicant ID":"A-1"}}],"offset":"page2"}"#,
            ),
            (200, r#"{"records":[{"id":"rec2","fields":{}}]}"#),
        ]);

        let records = store(url)
            .query("Applicants", &Filter::eq("Applicant ID", "A-1"))
            .expect("query succeeds");
        let seen = handle.join().expect("server thread");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text("Applicant ID"), Some("A-1"));
        assert!(seen[0].starts_with("GET /v0/appBase/Applicants?filterByFormula="));
        assert!(seen[1].contains("offset=page2"));
    }

    #[test]
    fn links_to_lists_the_table_and_filters_locally() {
        let (url, handle) = serve(vec![(
            200,
            r#"{"records":[{"id":"recW1","fields":{"Applicant ID":["recA"],"Company":"Acme"}},{"id":"recW2","fields":{"Applicant ID":["recB"]}}]}"#,
        )]);

        let records = store(url)
            .query(
                "Work Experience",
                &Filter::links_to("Applicant ID", &RecordId::from("recA")),
            )
            .expect("query succeeds");
        let seen = handle.join().expect("server thread");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, RecordId::from("recW1"));
        assert_eq!(seen, vec!["GET /v0/appBase/Work%20Experience".to_string()]);
    }

    #[test]
    fn create_and_delete_hit_record_endpoints() {
        let (url, handle) = serve(vec![
            (200, r#"{"id":"recNew","fields":{"Company":"Acme"}}"#),
            (200, r#"{"deleted":true,"id":"recNew"}"#),
        ]);
        let store = store(url);
        let fields: Fields = json!({ "Company": "Acme" })
            .as_object()
            .cloned()
            .expect("object fields");

        let created = store
            .create("Work Experience", fields)
            .expect("create succeeds");
        store
            .delete("Work Experience", &created.id)
            .expect("delete succeeds");
        let seen = handle.join().expect("server thread");

        assert_eq!(created.id, RecordId::from("recNew"));
        assert_eq!(created.text("Company"), Some("Acme"));
        assert_eq!(
            seen,
            vec![
                "POST /v0/appBase/Work%20Experience".to_string(),
                "DELETE /v0/appBase/Work%20Experience/recNew".to_string(),
            ]
        );
    }

    #[test]
    fn get_maps_not_found_to_none() {
        let (url, handle) = serve(vec![(404, r#"{"error":"NOT_FOUND"}"#)]);
        let record = store(url)
            .get("Applicants", &RecordId::from("recMissing"))
            .expect("not found is not an error");
        let seen = handle.join().expect("server thread");
        assert!(record.is_none());
        assert_eq!(seen, vec!["GET /v0/appBase/Applicants/recMissing".to_string()]);
    }

    #[test]
    fn rejected_writes_surface_airtable_message() {
        let (url, handle) = serve(vec![(
            422,
            r#"{"error":{"type":"INVALID_VALUE_FOR_COLUMN","message":"Field \"Preferred Rate\" cannot accept the provided value"}}"#,
        )]);
        let err = store(url)
            .update("Salary Preferences", &RecordId::from("rec9"), Fields::new())
            .expect_err("write rejected");
        let seen = handle.join().expect("server thread");
        assert_eq!(seen, vec!["PATCH /v0/appBase/Salary%20Preferences/rec9".to_string()]);
        match err {
            StoreError::Rejected { status, message } => {
                assert_eq!(status, 422);
                assert!(message.contains("Preferred Rate"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn schema_lists_tables_fields_and_views() {
        let (url, handle) = serve(vec![(
            200,
            r#"{"tables":[{"id":"tbl1","name":"Applicants","primaryFieldId":"fld1","fields":[{"id":"fld1","name":"Applicant ID","type":"singleLineText"}],"views":[{"id":"viw1","name":"Grid view","type":"grid"}]}]}"#,
        )]);
        let schema = store(url).schema().expect("schema loads");
        let seen = handle.join().expect("server thread");

        assert_eq!(seen, vec!["GET /v0/meta/bases/appBase/tables".to_string()]);
        let table = &schema.tables[0];
        assert_eq!(table.primary_field_id, "fld1");
        assert_eq!(table.fields[0].kind, "singleLineText");
        assert_eq!(table.views[0].name, "Grid view");
    }

    #[test]
    fn equality_formula_escapes_quotes() {
        assert_eq!(
            equality_formula("Applicant ID", "O'Neil"),
            "{Applicant ID} = 'O\\'Neil'"
        );
    }
}
