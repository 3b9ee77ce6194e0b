use std::collections::HashMap;

use crate::client::{evaluate_response, BaseClient};
use crate::error::{D1Error, ExceptionKind};
use crate::request::RequestType;
use crate::types::{Identifier, Permission};

/// Checks whether the caller may perform `action` on an object.
///
/// Nodes answer a denial with a `NotAuthorized` exception, which is
/// returned as `Ok(false)`. Any other exception, such as `NotFound` for an
/// unknown identifier, is returned as an error.
///
/// # Arguments
///
/// * `client` - A reference to the `BaseClient` of the node.
/// * `pid` - The identifier of the object.
/// * `action` - The permission to check.
pub async fn is_authorized(
    client: &BaseClient,
    pid: &Identifier,
    action: Permission,
) -> Result<bool, D1Error> {
    let parameters = HashMap::from([("action".to_string(), action.to_string())]);

    let response = client
        .get(
            &["isAuthorized", pid.as_str()],
            Some(parameters),
            RequestType::Plain,
            None,
        )
        .await?;

    match evaluate_response(response).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind == ExceptionKind::NotAuthorized => Ok(false),
        Err(e) => Err(e),
    }
}
