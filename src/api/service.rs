use std::collections::HashMap;

use chrono::{DateTime, Utc};
use reqwest::header::DATE;

use crate::client::{evaluate_response, evaluate_xml, BaseClient};
use crate::error::D1Error;
use crate::request::RequestType;
use crate::types::{datetime, Event, Log, Node};

/// Checks that a node is alive.
///
/// # Arguments
///
/// * `client` - A reference to the `BaseClient` of the node.
///
/// # Returns
///
/// The node's clock as reported in the `Date` header, if it sent one.
pub async fn ping(client: &BaseClient) -> Result<Option<DateTime<Utc>>, D1Error> {
    let response = client
        .get(&["monitor", "ping"], None, RequestType::Plain, None)
        .await?;
    let (headers, _) = evaluate_response(response).await?;

    Ok(headers
        .get(DATE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| DateTime::parse_from_rfc2822(v.trim()).ok())
        .map(|dt| dt.with_timezone(&Utc)))
}

/// Retrieves a member node's self description, including the services it
/// supports.
pub async fn get_capabilities(client: &BaseClient) -> Result<Node, D1Error> {
    let response = client
        .get(&["node"], None, RequestType::Plain, None)
        .await?;
    evaluate_xml(response).await
}

/// Filters for [`get_log_records`]. Unset fields are left to the node's
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub event: Option<Event>,
    /// Only entries whose identifier starts with this value.
    pub id_filter: Option<String>,
    pub start: Option<u32>,
    pub count: Option<u32>,
}

impl LogQuery {
    pub(crate) fn to_parameters(&self) -> HashMap<String, String> {
        let mut parameters = HashMap::new();

        if let Some(from) = &self.from_date {
            parameters.insert("fromDate".to_string(), datetime::format(from));
        }
        if let Some(to) = &self.to_date {
            parameters.insert("toDate".to_string(), datetime::format(to));
        }
        if let Some(event) = &self.event {
            parameters.insert("event".to_string(), event.to_string());
        }
        if let Some(filter) = &self.id_filter {
            parameters.insert("idFilter".to_string(), filter.clone());
        }
        if let Some(start) = self.start {
            parameters.insert("start".to_string(), start.to_string());
        }
        if let Some(count) = self.count {
            parameters.insert("count".to_string(), count.to_string());
        }

        parameters
    }
}

/// Retrieves access log records. Requires administrative rights on most
/// nodes.
pub async fn get_log_records(client: &BaseClient, query: &LogQuery) -> Result<Log, D1Error> {
    let response = client
        .get(&["log"], Some(query.to_parameters()), RequestType::Plain, None)
        .await?;
    evaluate_xml(response).await
}
