//! BigQuery client construction.

use anyhow::Context;
use gcp_bigquery_client::Client;

/// Build a BigQuery client from the ambient credentials.
///
/// `GOOGLE_APPLICATION_CREDENTIALS` takes precedence as an explicit
/// service-account key file; otherwise Application Default Credentials
/// are used (gcloud login, workload identity, metadata service).
pub async fn new_bigquery_client() -> anyhow::Result<Client> {
    if let Ok(key_path) = std::env::var("GOOGLE_APPLICATION_CREDENTIALS") {
        let sa_key = gcp_bigquery_client::yup_oauth2::read_service_account_key(&key_path)
            .await
            .with_context(|| format!("failed to read service account key from '{key_path}'"))?;
        return Client::from_service_account_key(sa_key, false)
            .await
            .context("failed to create BigQuery client from service account key");
    }

    Client::from_application_default_credentials()
        .await
        .context("failed to create BigQuery client with application default credentials")
}
