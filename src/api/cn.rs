use std::collections::HashMap;

use crate::client::{evaluate_identifier, evaluate_text, evaluate_xml, BaseClient};
use crate::error::D1Error;
use crate::request::RequestType;
use crate::types::{
    Identifier, NodeList, ObjectFormat, ObjectFormatIdentifier, ObjectFormatList,
    ObjectLocationList, SubjectInfo,
};

/// Retrieves the registry of every node in the network.
pub async fn list_nodes(client: &BaseClient) -> Result<NodeList, D1Error> {
    let response = client
        .get(&["node"], None, RequestType::Plain, None)
        .await?;
    evaluate_xml(response).await
}

/// Retrieves the list of registered object formats.
pub async fn list_formats(client: &BaseClient) -> Result<ObjectFormatList, D1Error> {
    let response = client
        .get(&["formats"], None, RequestType::Plain, None)
        .await?;
    evaluate_xml(response).await
}

/// Retrieves a single object format.
pub async fn get_format(
    client: &BaseClient,
    format_id: &ObjectFormatIdentifier,
) -> Result<ObjectFormat, D1Error> {
    let response = client
        .get(&["formats", format_id.as_str()], None, RequestType::Plain, None)
        .await?;
    evaluate_xml(response).await
}

/// Finds the member nodes holding a copy of an object.
///
/// The CN answers with `303 See Other` pointing at the preferred copy. The
/// redirect is not followed; its body lists every location.
pub async fn resolve(client: &BaseClient, pid: &Identifier) -> Result<ObjectLocationList, D1Error> {
    let response = client
        .get(&["resolve", pid.as_str()], None, RequestType::Plain, None)
        .await?;
    evaluate_xml(response).await
}

/// Reserves an identifier for the caller so it can be used in a later
/// `create`.
pub async fn reserve_identifier(
    client: &BaseClient,
    pid: &Identifier,
) -> Result<Identifier, D1Error> {
    let context = RequestType::multipart().text("pid", pid.as_str());
    let response = client.post(&["reserve"], None, context, None).await?;
    evaluate_identifier(response).await
}

/// Runs a query against one of the CN's search engines, e.g. `solr`.
///
/// The raw response text is returned since its format depends on the
/// engine and on the `wt` parameter.
///
/// # Arguments
///
/// * `client` - A reference to the `BaseClient` of the coordinating node.
/// * `engine` - The query engine name.
/// * `parameters` - Query parameters passed through as is.
pub async fn query(
    client: &BaseClient,
    engine: &str,
    parameters: HashMap<String, String>,
) -> Result<String, D1Error> {
    let response = client
        .get(&["query", engine, ""], Some(parameters), RequestType::Plain, None)
        .await?;
    evaluate_text(response).await
}

/// Asks the CN who the caller is, based on the credentials sent.
pub async fn echo_credentials(client: &BaseClient) -> Result<SubjectInfo, D1Error> {
    let response = client
        .get(&["diag", "subject"], None, RequestType::Plain, None)
        .await?;
    evaluate_xml(response).await
}
