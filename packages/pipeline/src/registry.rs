//! Registry of OAI-PMH providers and their last-harvest bookkeeping.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use url::Url;

use oaiharvest_harvester::OaiClient;

use crate::config::{ALL_PROVIDERS, MAX_PROVIDER_NAME_LEN};
use crate::error::{PipelineError, Result};
use crate::models::{NewProvider, Provider};

/// Check a short name can be told apart from URLs and the `all` keyword.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name.chars().count() > MAX_PROVIDER_NAME_LEN
        || name == ALL_PROVIDERS
        || is_url(name)
    {
        return Err(PipelineError::InvalidProviderName(name.to_string()));
    }
    Ok(())
}

/// Whether a provider argument is a base URL rather than a registered name.
pub fn is_url(provider: &str) -> bool {
    provider.starts_with("http://") || provider.starts_with("https://")
}

/// Check `url` is an absolute http(s) URL.
pub fn validate_url(url: &str) -> Result<()> {
    let parsed = Url::parse(url).map_err(|e| PipelineError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(PipelineError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{scheme}'"),
        }),
    }
}

/// The `ListRecords` request that would start the next incremental harvest.
pub fn next_harvest_url(provider: &Provider) -> String {
    let from = provider.last_harvest.format("%Y-%m-%dT%H:%M:%SZ").to_string();
    match Url::parse(&provider.url) {
        Ok(mut url) => {
            url.query_pairs_mut()
                .append_pair("verb", "ListRecords")
                .append_pair("metadataPrefix", &provider.metadata_prefix)
                .append_pair("from", &from);
            url.to_string()
        }
        Err(_) => format!(
            "{}?verb=ListRecords&metadataPrefix={}&from={from}",
            provider.url, provider.metadata_prefix
        ),
    }
}

/// Insert a provider row without contacting the provider.
#[tracing::instrument(skip(executor, new), fields(name = %new.name))]
pub async fn insert_provider<'e, E>(executor: E, new: &NewProvider) -> Result<Provider>
where
    E: Executor<'e, Database = Sqlite>,
{
    validate_name(&new.name)?;

    let provider = sqlx::query_as::<_, Provider>(
        r#"
        INSERT INTO providers (name, url, destination, metadataPrefix)
        VALUES (?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&new.name)
    .bind(&new.url)
    .bind(new.destination.to_string_lossy().into_owned())
    .bind(&new.metadata_prefix)
    .fetch_one(executor)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            PipelineError::DuplicateProvider(new.name.clone())
        }
        other => PipelineError::Database(other),
    })?;

    Ok(provider)
}

/// Register a provider after checking it is a working OAI-PMH endpoint that
/// offers the requested metadata format.
///
/// The provider is contacted before anything is written, so no database lock
/// is held across network requests; any failure leaves the registry
/// unchanged.
#[tracing::instrument(skip(pool, new), fields(name = %new.name, url = %new.url))]
pub async fn register_provider(pool: &SqlitePool, new: &NewProvider) -> Result<Provider> {
    validate_name(&new.name)?;
    validate_url(&new.url)?;
    if find_provider(pool, &new.name).await?.is_some() {
        return Err(PipelineError::DuplicateProvider(new.name.clone()));
    }

    let base_url = new.url.clone();
    let formats = tokio::task::spawn_blocking(move || {
        let client = OaiClient::new()?;
        let identify = client.identify(&base_url)?;
        tracing::info!(repository = %identify.repository_name, "Provider answered Identify");
        client.list_metadata_formats(&base_url)
    })
    .await??;

    if !formats.iter().any(|f| f.prefix == new.metadata_prefix) {
        return Err(PipelineError::UnsupportedMetadataPrefix {
            prefix: new.metadata_prefix.clone(),
            available: formats.into_iter().map(|f| f.prefix).collect(),
        });
    }

    // A concurrent registration of the same name still fails here
    let provider = insert_provider(pool, new).await?;
    tracing::info!(next_harvest = %next_harvest_url(&provider), "Added provider");
    Ok(provider)
}

/// Look up a provider by name.
pub async fn find_provider(pool: &SqlitePool, name: &str) -> Result<Option<Provider>> {
    let provider = sqlx::query_as::<_, Provider>(r#"SELECT * FROM providers WHERE name = ?"#)
        .bind(name)
        .fetch_optional(pool)
        .await?;

    Ok(provider)
}

/// Get a provider by name.
pub async fn get_provider(pool: &SqlitePool, name: &str) -> Result<Provider> {
    find_provider(pool, name)
        .await?
        .ok_or_else(|| PipelineError::ProviderNotFound(name.to_string()))
}

/// All providers, ordered by name.
pub async fn list_providers(pool: &SqlitePool) -> Result<Vec<Provider>> {
    let providers = sqlx::query_as::<_, Provider>(r#"SELECT * FROM providers ORDER BY name"#)
        .fetch_all(pool)
        .await?;

    Ok(providers)
}

/// Remove a provider.
#[tracing::instrument(skip(pool))]
pub async fn remove_provider(pool: &SqlitePool, name: &str) -> Result<()> {
    let result = sqlx::query(r#"DELETE FROM providers WHERE name = ?"#)
        .bind(name)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(PipelineError::ProviderNotFound(name.to_string()));
    }
    tracing::info!("Deleted provider");
    Ok(())
}

/// Record the end of a completed harvest slice.
#[tracing::instrument(skip(pool))]
pub async fn update_last_harvest(
    pool: &SqlitePool,
    name: &str,
    harvested_until: DateTime<Utc>,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(r#"UPDATE providers SET lastHarvest = ? WHERE name = ?"#)
        .bind(harvested_until)
        .bind(name)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(PipelineError::ProviderNotFound(name.to_string()));
    }

    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("ucl").is_ok());
        assert!(validate_name("exactly15chars_").is_ok());

        assert!(validate_name("").is_err());
        assert!(validate_name("sixteen_chars___").is_err());
        assert!(validate_name("all").is_err());
        assert!(validate_name("http://x").is_err());
        assert!(validate_name("https://x").is_err());
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://oai.example.com/oai").is_ok());
        assert!(validate_url("http://localhost:8080/oai2d").is_ok());

        assert!(matches!(
            validate_url("ftp://example.com"),
            Err(PipelineError::InvalidUrl { .. })
        ));
        assert!(validate_url("not a url").is_err());
    }

    #[test]
    fn test_next_harvest_url() {
        let provider = Provider {
            id: 1,
            name: "ex".into(),
            url: "https://oai.example.com/oai".into(),
            destination: "/data".into(),
            metadata_prefix: "oai_dc".into(),
            last_harvest: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
        };

        assert_eq!(
            next_harvest_url(&provider),
            "https://oai.example.com/oai?verb=ListRecords&metadataPrefix=oai_dc&from=2024-03-01T12%3A30%3A00Z"
        );
    }
}
