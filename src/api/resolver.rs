//! Name to id resolution over Jamf listing endpoints
//!
//! Lookups are never cached; every call hits the listing endpoint once.

use super::client::JamfClient;
use super::constants::{LOOKUP_PAGE_SIZE, headers};
use super::endpoints::{ApiFamily, ObjectType};
use super::models::{ApiRequest, id_to_string};
use crate::error::{JamfError, Result};
use serde_json::Value;

/// Id of the object of `object_type` called `name`, or `None` when absent.
/// `filter_key` overrides the field a Jamf Pro listing is matched on.
pub async fn find_id(
    client: &JamfClient,
    object_type: ObjectType,
    name: &str,
    filter_key: Option<&str>,
) -> Result<Option<String>> {
    let record = find_object(client, object_type, name, filter_key).await?;
    Ok(record.as_ref().and_then(|r| r.get("id")).and_then(id_to_string))
}

/// Full listing record of the named object
pub async fn find_object(
    client: &JamfClient,
    object_type: ObjectType,
    name: &str,
    filter_key: Option<&str>,
) -> Result<Option<Value>> {
    let found = match object_type.family() {
        ApiFamily::Classic => find_classic(client, object_type, name).await?,
        ApiFamily::JamfPro => {
            let key = filter_key
                .or_else(|| object_type.lookup_key())
                .ok_or_else(|| {
                    JamfError::invalid("object_type", format!("{} cannot be looked up by name", object_type))
                })?;
            find_jamf_pro(client, object_type, key, name).await?
        }
    };

    match &found {
        Some(record) => log::info!(
            "Found existing {} '{}' with id {}",
            object_type,
            name,
            record.get("id").and_then(id_to_string).unwrap_or_default()
        ),
        None => log::info!("No existing {} named '{}'", object_type, name),
    }
    Ok(found)
}

async fn find_classic(client: &JamfClient, object_type: ObjectType, name: &str) -> Result<Option<Value>> {
    let list_key = object_type
        .classic_list_key()
        .ok_or_else(|| JamfError::invalid("object_type", format!("{} has no Classic listing", object_type)))?;

    let request = ApiRequest::get(object_type.list_path(), ApiFamily::Classic)
        .with_accept(headers::CONTENT_TYPE_JSON);
    let Some(listing) = fetch_listing(client, &request).await? else {
        return Ok(None);
    };
    Ok(match_classic(&listing, list_key, name))
}

async fn find_jamf_pro(
    client: &JamfClient,
    object_type: ObjectType,
    key: &str,
    name: &str,
) -> Result<Option<Value>> {
    let filter = format!("{}==\"{}\"", key, name);
    let path = format!(
        "{}?page=0&page-size={}&sort=id&filter={}",
        object_type.list_path(),
        LOOKUP_PAGE_SIZE,
        urlencoding::encode(&filter)
    );

    let request = ApiRequest::get(path, ApiFamily::JamfPro);
    let Some(listing) = fetch_listing(client, &request).await? else {
        return Ok(None);
    };
    Ok(match_jamf_pro(&listing, key, name))
}

async fn fetch_listing(client: &JamfClient, request: &ApiRequest) -> Result<Option<Value>> {
    let response = client.send(request).await?;
    match response.status_code {
        404 => Ok(None),
        401 => Err(JamfError::PermissionDenied { url: response.url }),
        code if !response.is_success() => Err(JamfError::UnexpectedResponse(format!(
            "listing {} returned HTTP {}",
            request.path, code
        ))),
        _ => response.json().cloned().map(Some).ok_or_else(|| {
            JamfError::UnexpectedResponse(format!("listing {} did not return JSON", request.path))
        }),
    }
}

/// First entry of `listing[list_key]` whose `name` matches, ignoring case
pub fn match_classic(listing: &Value, list_key: &str, name: &str) -> Option<Value> {
    listing
        .get(list_key)?
        .as_array()?
        .iter()
        .find(|entry| {
            entry
                .get("name")
                .and_then(Value::as_str)
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
        .cloned()
}

/// First entry of `listing.results` whose `key` equals `name` exactly
pub fn match_jamf_pro(listing: &Value, key: &str, name: &str) -> Option<Value> {
    listing
        .get("results")?
        .as_array()?
        .iter()
        .find(|entry| entry.get(key).and_then(Value::as_str) == Some(name))
        .cloned()
}
