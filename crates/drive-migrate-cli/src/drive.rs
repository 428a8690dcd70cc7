use anyhow::{Context, Result};
use drive_migrate_core::remote::{
    ParentRef, Permission, RemoteEntry, RemoteError, RemoteStore, Role, FOLDER_MIME,
};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::trace;

const PAGE_SIZE: &str = "1000";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    md5_checksum: Option<String>,
    /// int64 values are sent as JSON strings.
    #[serde(default)]
    file_size: Option<String>,
    #[serde(default)]
    parents: Vec<DriveParent>,
    #[serde(default = "copyable_default")]
    copyable: bool,
}

fn copyable_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveParent {
    id: String,
    #[serde(default)]
    is_root: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DrivePermission {
    id: String,
    role: String,
}

#[derive(Debug, Deserialize)]
struct DriveChild {
    id: String,
}

impl From<DriveFile> for RemoteEntry {
    fn from(file: DriveFile) -> Self {
        RemoteEntry {
            size: file
                .file_size
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            id: file.id,
            title: file.title,
            mime_type: file.mime_type,
            checksum: file.md5_checksum.unwrap_or_default(),
            parents: file
                .parents
                .into_iter()
                .map(|p| {
                    if p.is_root {
                        ParentRef::root(p.id)
                    } else {
                        ParentRef::new(p.id)
                    }
                })
                .collect(),
            copyable: file.copyable,
        }
    }
}

/// Maps a failed response to the error classes the retry logic understands.
fn classify(status: StatusCode, body: &str, what: &str) -> RemoteError {
    match status.as_u16() {
        404 => RemoteError::NotFound(what.to_string()),
        429 | 500..=599 => RemoteError::Transient(format!("{} ({})", what, status)),
        403 if body.contains("rateLimitExceeded") || body.contains("userRateLimitExceeded") => {
            RemoteError::Transient(format!("{} ({}): rate limited", what, status))
        }
        _ => RemoteError::Rejected(format!("{} ({}): {}", what, status, body.trim())),
    }
}

fn parent_list(parent_ids: &[String]) -> Vec<serde_json::Value> {
    parent_ids.iter().map(|id| json!({ "id": id })).collect()
}

/// Drive v2 REST client authenticated with a bearer token.
pub struct DriveClient {
    http: Client,
    base_url: String,
}

impl DriveClient {
    pub fn new(base_url: &str, access_token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", access_token))
            .context("Access token contains invalid characters")?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn execute(&self, request: RequestBuilder, what: &str) -> Result<String, RemoteError> {
        let response = request
            .send()
            .map_err(|e| RemoteError::Transient(format!("{}: {}", what, e)))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| RemoteError::Transient(format!("{}: {}", what, e)))?;
        trace!(%status, what, "Drive response");
        if status.is_success() {
            Ok(body)
        } else {
            Err(classify(status, &body, what))
        }
    }

    fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T, RemoteError> {
        let body = self.execute(request, what)?;
        serde_json::from_str(&body)
            .map_err(|e| RemoteError::Rejected(format!("{}: malformed response: {}", what, e)))
    }

    /// Follows `nextPageToken` until the listing is exhausted.
    fn fetch_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<Vec<T>, RemoteError> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .http
                .get(self.url(path))
                .query(query)
                .query(&[("maxResults", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }
            let page: DriveList<T> = self.fetch(request, what)?;
            items.extend(page.items);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(items),
            }
        }
    }
}

impl RemoteStore for DriveClient {
    fn list_owned_entries(&self, owner: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        let q = format!("'{}' in owners", owner.replace('\'', "\\'"));
        let files: Vec<DriveFile> =
            self.fetch_all("/files", &[("q", q.as_str())], "list owned files")?;
        Ok(files.into_iter().map(RemoteEntry::from).collect())
    }

    fn get_entry(&self, id: &str) -> Result<RemoteEntry, RemoteError> {
        let request = self.http.get(self.url(&format!("/files/{}", id)));
        let file: DriveFile = self.fetch(request, &format!("get file {}", id))?;
        Ok(file.into())
    }

    fn create_folder(&self, title: &str, parent_ids: &[String]) -> Result<String, RemoteError> {
        let mut body = json!({ "title": title, "mimeType": FOLDER_MIME });
        if !parent_ids.is_empty() {
            body["parents"] = serde_json::Value::Array(parent_list(parent_ids));
        }
        let request = self.http.post(self.url("/files")).json(&body);
        let file: DriveFile = self.fetch(request, &format!("create folder {}", title))?;
        Ok(file.id)
    }

    fn copy_entry(
        &self,
        source_id: &str,
        title: &str,
        parent_ids: &[String],
    ) -> Result<RemoteEntry, RemoteError> {
        let body = json!({ "title": title, "parents": parent_list(parent_ids) });
        let request = self
            .http
            .post(self.url(&format!("/files/{}/copy", source_id)))
            .json(&body);
        let file: DriveFile = self.fetch(request, &format!("copy file {}", source_id))?;
        Ok(file.into())
    }

    fn list_permissions(&self, entry_id: &str) -> Result<Vec<Permission>, RemoteError> {
        let request = self
            .http
            .get(self.url(&format!("/files/{}/permissions", entry_id)));
        let list: DriveList<DrivePermission> =
            self.fetch(request, &format!("list permissions of {}", entry_id))?;
        Ok(list
            .items
            .into_iter()
            .map(|p| Permission {
                id: p.id,
                role: Role::parse(&p.role),
            })
            .collect())
    }

    fn delete_permission(&self, entry_id: &str, permission_id: &str) -> Result<(), RemoteError> {
        let request = self.http.delete(self.url(&format!(
            "/files/{}/permissions/{}",
            entry_id, permission_id
        )));
        self.execute(
            request,
            &format!("delete permission {} of {}", permission_id, entry_id),
        )?;
        Ok(())
    }

    fn insert_permission(
        &self,
        entry_id: &str,
        grantee: &str,
        role: Role,
        suppress_notification: bool,
    ) -> Result<(), RemoteError> {
        let body = json!({ "role": role.as_str(), "type": "user", "value": grantee });
        let notify = if suppress_notification { "false" } else { "true" };
        let request = self
            .http
            .post(self.url(&format!("/files/{}/permissions", entry_id)))
            .query(&[("sendNotificationEmails", notify)])
            .json(&body);
        self.execute(request, &format!("share {} with {}", entry_id, grantee))?;
        Ok(())
    }

    fn list_children(&self, folder_id: &str) -> Result<Vec<String>, RemoteError> {
        let children: Vec<DriveChild> = self.fetch_all(
            &format!("/files/{}/children", folder_id),
            &[],
            &format!("list children of {}", folder_id),
        )?;
        Ok(children.into_iter().map(|c| c.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_resource_maps_to_entry() {
        let file: DriveFile = serde_json::from_str(
            r#"{
                "id": "abc",
                "title": "report.pdf",
                "mimeType": "application/pdf",
                "md5Checksum": "d41d8cd98f00b204e9800998ecf8427e",
                "fileSize": "1048576",
                "copyable": false,
                "parents": [
                    {"id": "0AAroot", "isRoot": true},
                    {"id": "folder-1", "isRoot": false}
                ]
            }"#,
        )
        .unwrap();

        let entry = RemoteEntry::from(file);
        assert_eq!(entry.size, 1_048_576);
        assert_eq!(entry.checksum, "d41d8cd98f00b204e9800998ecf8427e");
        assert!(!entry.copyable);
        assert_eq!(entry.parents, vec![ParentRef::root("0AAroot"), ParentRef::new("folder-1")]);
    }

    #[test]
    fn test_folder_resource_defaults() {
        let file: DriveFile = serde_json::from_str(
            r#"{"id": "f", "title": "Docs", "mimeType": "application/vnd.google-apps.folder"}"#,
        )
        .unwrap();

        let entry = RemoteEntry::from(file);
        assert!(entry.is_folder());
        assert!(entry.copyable);
        assert_eq!(entry.size, 0);
        assert!(entry.checksum.is_empty());
        assert!(entry.parents.is_empty());
    }

    #[test]
    fn test_list_page_without_items() {
        let page: DriveList<DriveChild> =
            serde_json::from_str(r#"{"kind": "drive#childList"}"#).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            classify(StatusCode::NOT_FOUND, "", "get"),
            RemoteError::NotFound(_)
        ));
        assert!(classify(StatusCode::TOO_MANY_REQUESTS, "", "get").is_transient());
        assert!(classify(StatusCode::BAD_GATEWAY, "", "get").is_transient());
        assert!(classify(
            StatusCode::FORBIDDEN,
            r#"{"error":{"errors":[{"reason":"userRateLimitExceeded"}]}}"#,
            "get"
        )
        .is_transient());
        assert!(matches!(
            classify(StatusCode::FORBIDDEN, r#"{"error":{"message":"insufficient"}}"#, "get"),
            RemoteError::Rejected(_)
        ));
        assert!(matches!(
            classify(StatusCode::BAD_REQUEST, "", "get"),
            RemoteError::Rejected(_)
        ));
    }
}
