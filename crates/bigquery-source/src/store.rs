//! BigQuery-backed [`TableStore`] implementation.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use gcp_bigquery_client::error::BQError;
use gcp_bigquery_client::model::query_parameter::QueryParameter;
use gcp_bigquery_client::model::query_parameter_type::QueryParameterType;
use gcp_bigquery_client::model::query_parameter_value::QueryParameterValue;
use gcp_bigquery_client::model::query_request::QueryRequest;
use gcp_bigquery_client::model::query_response::ResultSet;
use gcp_bigquery_client::Client;
use sync_core::{ChangeRecord, ChangeStream, SyncError, SyncWindow, TableStore, TrackedTable};
use tracing::debug;

/// Table store over one BigQuery project/dataset.
///
/// The client is constructed by the caller and injected; this type holds
/// no other state.
pub struct BigQueryTableStore {
    client: Client,
    project_id: String,
    dataset_id: String,
}

impl BigQueryTableStore {
    pub fn new(
        client: Client,
        project_id: impl Into<String>,
        dataset_id: impl Into<String>,
    ) -> BigQueryTableStore {
        BigQueryTableStore {
            client,
            project_id: project_id.into(),
            dataset_id: dataset_id.into(),
        }
    }
}

/// Change-feed query for one table.
///
/// The window boundaries are named bind parameters. BigQuery cannot bind
/// table identifiers, so the fully-qualified name is built from the
/// validated prefix and the formatted date.
fn change_feed_query(project_id: &str, dataset_id: &str, table: &TrackedTable) -> String {
    format!(
        "SELECT event_timestamp, user_id, device_category, geo_country, \
         ecommerce_purchase_revenue_in_usd, \
         _CHANGE_TYPE AS change_type, \
         UNIX_MICROS(_CHANGE_TIMESTAMP) AS change_timestamp \
         FROM APPENDS(TABLE `{}.{}.{}`, @window_start, @window_end)",
        project_id,
        dataset_id,
        table.physical_id()
    )
}

/// Named TIMESTAMP parameter; `None` binds SQL NULL, which `APPENDS`
/// reads as "from the start of the feed's retention".
fn timestamp_parameter(name: &str, value: Option<DateTime<Utc>>) -> QueryParameter {
    QueryParameter {
        name: Some(name.to_string()),
        parameter_type: Some(QueryParameterType {
            r#type: "TIMESTAMP".to_string(),
            array_type: None,
            struct_types: None,
        }),
        parameter_value: Some(QueryParameterValue {
            value: value.map(|ts| ts.to_rfc3339_opts(SecondsFormat::Micros, true)),
            array_values: None,
            struct_values: None,
        }),
    }
}

fn is_not_found(err: &BQError) -> bool {
    matches!(err, BQError::ResponseError { error } if error.error.code == 404)
}

#[async_trait]
impl TableStore for BigQueryTableStore {
    async fn table_exists(&self, table: &TrackedTable) -> Result<bool, SyncError> {
        let table_id = table.physical_id();
        match self
            .client
            .table()
            .get(&self.project_id, &self.dataset_id, &table_id, None)
            .await
        {
            Ok(_) => Ok(true),
            Err(ref e) if is_not_found(e) => Ok(false),
            Err(e) => Err(SyncError::Transient(format!(
                "metadata lookup for {table_id} failed: {e}"
            ))),
        }
    }

    async fn fetch_changes(
        &self,
        table: &TrackedTable,
        window: &SyncWindow,
    ) -> Result<Box<dyn ChangeStream>, SyncError> {
        let mut request = QueryRequest::new(change_feed_query(
            &self.project_id,
            &self.dataset_id,
            table,
        ));
        request.parameter_mode = Some("NAMED".to_string());
        request.query_parameters = Some(vec![
            timestamp_parameter("window_start", window.start),
            timestamp_parameter("window_end", Some(window.end)),
        ]);

        debug!(table = %table, window = %window, "issuing change-feed query");

        let response = self
            .client
            .job()
            .query(&self.project_id, request)
            .await
            .map_err(|e| {
                if is_not_found(&e) {
                    // The table was deleted between resolution and the
                    // query; the caller re-resolves without advancing
                    // the window.
                    SyncError::TableNotFound(table.physical_id())
                } else {
                    SyncError::Transient(format!(
                        "change-feed query against {} failed: {e}",
                        table.physical_id()
                    ))
                }
            })?;

        Ok(Box::new(BigQueryChangeStream {
            rows: ResultSet::new_from_query_response(response),
        }))
    }
}

/// Single pass over one query's result set.
struct BigQueryChangeStream {
    rows: ResultSet,
}

impl BigQueryChangeStream {
    fn current_record(&self) -> Result<ChangeRecord, SyncError> {
        let change_micros = required_i64(&self.rows, "change_timestamp")?;
        let change_timestamp = DateTime::from_timestamp_micros(change_micros).ok_or_else(|| {
            SyncError::Transient(format!(
                "change_timestamp {change_micros} is out of range"
            ))
        })?;

        Ok(ChangeRecord {
            event_timestamp: required_i64(&self.rows, "event_timestamp")?,
            user_id: required_string(&self.rows, "user_id")?,
            device_category: required_string(&self.rows, "device_category")?,
            geo_country: required_string(&self.rows, "geo_country")?,
            purchase_revenue: required_f64(&self.rows, "ecommerce_purchase_revenue_in_usd")?,
            change_type: required_string(&self.rows, "change_type")?.parse()?,
            change_timestamp,
        })
    }
}

#[async_trait]
impl ChangeStream for BigQueryChangeStream {
    async fn next(&mut self) -> Option<Result<ChangeRecord, SyncError>> {
        if !self.rows.next_row() {
            return None;
        }
        Some(self.current_record())
    }
}

fn column_error(column: &str, err: BQError) -> SyncError {
    SyncError::Transient(format!("failed to read column {column}: {err}"))
}

fn null_column(column: &str) -> SyncError {
    SyncError::Transient(format!("column {column} is unexpectedly null"))
}

fn required_i64(rows: &ResultSet, column: &str) -> Result<i64, SyncError> {
    rows.get_i64_by_name(column)
        .map_err(|e| column_error(column, e))?
        .ok_or_else(|| null_column(column))
}

fn required_f64(rows: &ResultSet, column: &str) -> Result<f64, SyncError> {
    rows.get_f64_by_name(column)
        .map_err(|e| column_error(column, e))?
        .ok_or_else(|| null_column(column))
}

fn required_string(rows: &ResultSet, column: &str) -> Result<String, SyncError> {
    rows.get_string_by_name(column)
        .map_err(|e| column_error(column, e))?
        .ok_or_else(|| null_column(column))
}
