//! Synthetic GA4-shaped data generator.
//!
//! Appends one row per interval through the streaming insertAll API so
//! the sync loop has fresh appends to pick up in test and demo
//! environments.

use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use gcp_bigquery_client::model::table_data_insert_all_request::TableDataInsertAllRequest;
use rand::Rng;
use serde::Serialize;
use tracing::info;

#[derive(Serialize)]
struct SyntheticRow {
    event_timestamp: i64,
    user_id: String,
    device_category: &'static str,
    geo_country: &'static str,
    ecommerce_purchase_revenue_in_usd: f64,
}

fn synthetic_row() -> SyntheticRow {
    let mut rng = rand::rng();
    SyntheticRow {
        event_timestamp: Utc::now().timestamp_micros(),
        user_id: format!(
            "{}-{}-{}",
            rng.random_range(100..=199),
            rng.random_range(100..=199),
            rng.random_range(100..=199)
        ),
        device_category: "mobile",
        geo_country: "us",
        ecommerce_purchase_revenue_in_usd: rng.random_range(0..=10_000) as f64 / 100.0,
    }
}

/// Append `total` synthetic rows, one every `interval`.
pub async fn run_generate(
    project_id: &str,
    dataset_id: &str,
    table_id: &str,
    interval: Duration,
    total: u64,
) -> anyhow::Result<()> {
    let client = crate::bigquery::new_bigquery_client().await?;

    info!(
        table = %format!("{project_id}.{dataset_id}.{table_id}"),
        total, "generating synthetic rows"
    );

    for i in 0..total {
        let mut request = TableDataInsertAllRequest::new();
        request
            .add_row(None, synthetic_row())
            .context("failed to encode synthetic row")?;

        let response = client
            .tabledata()
            .insert_all(project_id, dataset_id, table_id, request)
            .await
            .with_context(|| {
                format!("insert into {project_id}.{dataset_id}.{table_id} failed")
            })?;
        if let Some(errors) = response.insert_errors {
            anyhow::bail!(
                "insertAll reported {} row errors: {:?}",
                errors.len(),
                errors.first()
            );
        }

        info!(row = i + 1, total, "generated record");

        if i + 1 < total {
            tokio::time::sleep(interval).await;
        }
    }

    Ok(())
}
