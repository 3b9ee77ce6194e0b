use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::error::{D1Error, ExceptionKind, CLIENT_SIDE_DETAIL_CODE};
use crate::node::cnode::CNode;
use crate::response::decode_xml;
use crate::types::{ObjectFormat, ObjectFormatIdentifier, ObjectFormatList};

const BUNDLED_FORMATS: &str = include_str!("../../resources/object_formats.xml");

#[derive(Debug)]
struct FormatState {
    formats: BTreeMap<ObjectFormatIdentifier, ObjectFormat>,
    last_attempt: Option<Instant>,
}

/// The object formats registered in the network.
///
/// Starts from a bundled copy of the list and replaces it from a CN when
/// stale. A CN that cannot be reached leaves the current list in place.
#[derive(Debug)]
pub struct ObjectFormatCache {
    state: RwLock<FormatState>,
    refresh_interval: Duration,
}

impl ObjectFormatCache {
    pub fn new(refresh_interval: Duration) -> Result<Self, D1Error> {
        let bundled: ObjectFormatList = decode_xml(BUNDLED_FORMATS.as_bytes())?;

        Ok(ObjectFormatCache {
            state: RwLock::new(FormatState {
                formats: index(bundled),
                last_attempt: None,
            }),
            refresh_interval,
        })
    }

    /// Stamps a refresh attempt if the list is stale. Only the caller that
    /// gets `true` refreshes.
    fn claim_refresh(&self) -> bool {
        let mut state = self.state.write();
        let stale = state
            .last_attempt
            .map_or(true, |at| at.elapsed() >= self.refresh_interval);
        if stale {
            state.last_attempt = Some(Instant::now());
        }
        stale
    }

    /// Replaces the list with the one published by `cn`.
    pub async fn refresh(&self, cn: &CNode) -> Result<usize, D1Error> {
        self.state.write().last_attempt = Some(Instant::now());
        self.fetch(cn).await
    }

    async fn fetch(&self, cn: &CNode) -> Result<usize, D1Error> {
        let list = cn.list_formats().await?;
        let formats = index(list);
        let count = formats.len();

        self.state.write().formats = formats;
        tracing::debug!(formats = count, "refreshed object format list");

        Ok(count)
    }

    /// Looks up a format, refreshing from `cn` at most once per interval
    /// when the list is stale or the format is unknown.
    pub async fn get_format(
        &self,
        format_id: &ObjectFormatIdentifier,
        cn: &CNode,
    ) -> Result<ObjectFormat, D1Error> {
        if self.claim_refresh() {
            if let Err(e) = self.fetch(cn).await {
                tracing::warn!(error = %e, "could not refresh object formats, using cached list");
            }
        }

        self.state
            .read()
            .formats
            .get(format_id)
            .cloned()
            .ok_or_else(|| {
                D1Error::new(
                    ExceptionKind::NotFound,
                    CLIENT_SIDE_DETAIL_CODE,
                    format!("Unknown object format {format_id}"),
                )
            })
    }

    /// Every known format, ordered by identifier.
    pub fn list(&self) -> Vec<ObjectFormat> {
        self.state.read().formats.values().cloned().collect()
    }
}

fn index(list: ObjectFormatList) -> BTreeMap<ObjectFormatIdentifier, ObjectFormat> {
    list.object_format
        .into_iter()
        .map(|format| (format.format_id.clone(), format))
        .collect()
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;

    use super::*;
    use crate::test_utils::{error_xml, mock_client};

    const CN_FORMATS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ns3:objectFormatList xmlns:ns3="http://ns.dataone.org/service/types/v2.0" count="1" start="0" total="1">
    <objectFormat>
        <formatId>application/x-custom</formatId>
        <formatName>Custom format</formatName>
        <formatType>DATA</formatType>
    </objectFormat>
</ns3:objectFormatList>"#;

    #[test]
    fn test_bundled_list() {
        let cache = ObjectFormatCache::new(Duration::from_secs(60)).unwrap();
        let formats = cache.list();

        assert!(!formats.is_empty());
        assert!(formats.iter().any(|f| f.format_id.as_str() == "text/csv"));
    }

    #[tokio::test]
    async fn test_refreshes_once_per_interval() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/v2/formats");
                then.status(200).body(CN_FORMATS);
            })
            .await;

        let cn = CNode::new(mock_client(&server), None);
        let cache = ObjectFormatCache::new(Duration::from_secs(3600)).unwrap();

        let format = cache
            .get_format(&"application/x-custom".into(), &cn)
            .await
            .unwrap();
        assert_eq!(format.format_name, "Custom format");

        // A miss within the interval does not hit the CN again
        let error = cache.get_format(&"text/csv".into(), &cn).await.unwrap_err();
        assert!(error.is_not_found());

        mock.assert_hits_async(1).await;
        assert_eq!(cache.list().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_refresh_once() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/v2/formats");
                then.status(200)
                    .delay(Duration::from_millis(200))
                    .body(CN_FORMATS);
            })
            .await;

        let cn = CNode::new(mock_client(&server), None);
        let cache = ObjectFormatCache::new(Duration::from_secs(3600)).unwrap();

        let custom_id: ObjectFormatIdentifier = "application/x-custom".into();
        let csv_id: ObjectFormatIdentifier = "text/csv".into();
        let (first, second) = tokio::join!(
            cache.get_format(&custom_id, &cn),
            cache.get_format(&csv_id, &cn),
        );

        assert_eq!(first.unwrap().format_name, "Custom format");
        // Served from the bundled list while the other lookup refreshes
        assert_eq!(second.unwrap().format_id.as_str(), "text/csv");
        mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_falls_back_to_bundled_list() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v2/formats");
                then.status(500)
                    .body(error_xml("ServiceFailure", 500, "4841", "Format store down"));
            })
            .await;

        let cn = CNode::new(mock_client(&server), None);
        let cache = ObjectFormatCache::new(Duration::from_secs(3600)).unwrap();

        let format = cache.get_format(&"text/csv".into(), &cn).await.unwrap();
        assert_eq!(format.format_id.as_str(), "text/csv");
    }
}
