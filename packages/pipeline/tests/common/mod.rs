#![allow(dead_code)]

use sqlx::SqlitePool;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use oaiharvest_pipeline::config::PipelineConfig;
use oaiharvest_pipeline::db;

pub struct TestDb {
    pub pool: SqlitePool,
    // Holds the database file for the duration of the test
    pub dir: TempDir,
}

impl TestDb {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::new(dir.path().join("registry.db"));
        let pool = db::open(&config).await.unwrap();

        Self { pool, dir }
    }
}

pub fn envelope(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
  <responseDate>2024-01-01T00:00:00Z</responseDate>
  {body}
</OAI-PMH>"#
    )
}

pub fn identify() -> String {
    envelope(
        r#"<Identify>
    <repositoryName>Mock Repository</repositoryName>
    <baseURL>http://localhost/oai</baseURL>
    <protocolVersion>2.0</protocolVersion>
    <earliestDatestamp>2000-01-01T00:00:00Z</earliestDatestamp>
    <deletedRecord>persistent</deletedRecord>
    <granularity>YYYY-MM-DDThh:mm:ssZ</granularity>
  </Identify>"#,
    )
}

pub fn metadata_formats(prefixes: &[&str]) -> String {
    let formats: String = prefixes
        .iter()
        .map(|prefix| {
            format!(
                "<metadataFormat><metadataPrefix>{prefix}</metadataPrefix>\
                 <schema>http://example.com/{prefix}.xsd</schema>\
                 <metadataNamespace>http://example.com/{prefix}/</metadataNamespace></metadataFormat>"
            )
        })
        .collect();
    envelope(&format!("<ListMetadataFormats>{formats}</ListMetadataFormats>"))
}

pub fn live_record(id: &str) -> String {
    format!(
        r#"<record>
      <header><identifier>{id}</identifier><datestamp>2024-01-01T10:00:00Z</datestamp></header>
      <metadata><oai_dc:dc xmlns:oai_dc="http://www.openarchives.org/OAI/2.0/oai_dc/"/></metadata>
    </record>"#
    )
}

pub fn list_records(records: &[String], token: Option<&str>) -> String {
    let token = token
        .map(|t| format!("<resumptionToken>{t}</resumptionToken>"))
        .unwrap_or_default();
    envelope(&format!("<ListRecords>{}{token}</ListRecords>", records.join("")))
}

pub fn oai_error(code: &str, message: &str) -> String {
    envelope(&format!(r#"<error code="{code}">{message}</error>"#))
}

pub async fn mount_verb(server: &MockServer, verb: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/oai"))
        .and(query_param("verb", verb))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

pub fn base_url(server: &MockServer) -> String {
    format!("{}/oai", server.uri())
}
