use acpn_core::{merge_patch, new_id, now_rfc3339, ListParams, ListResult, ServiceError};
use acpn_sql::Value;

use crate::model::{
    AccessLevel, CreateDocument, DocumentStatus, OrganizationDocument,
};
use crate::service::DocsService;

/// Filters for document listing (combined with the caller's allowed
/// access levels).
#[derive(Debug, Default)]
pub struct DocumentFilters {
    pub category: Option<crate::model::DocumentCategory>,
    pub access_level: Option<AccessLevel>,
    pub status: Option<DocumentStatus>,
}

impl DocsService {
    /// Create a document's metadata shell. File content arrives through
    /// version upload, which bumps `version` from 0 to 1.
    pub fn create_document(
        &self,
        input: CreateDocument,
        uploaded_by: &str,
    ) -> Result<OrganizationDocument, ServiceError> {
        if input.title.trim().is_empty() {
            return Err(ServiceError::Validation("document title cannot be empty".into()));
        }

        let now = now_rfc3339();
        let document = OrganizationDocument {
            id: new_id(),
            title: input.title,
            description: input.description,
            file_key: None,
            file_name: None,
            mime_type: None,
            file_size: 0,
            category: input.category,
            tags: input.tags,
            access_level: input.access_level,
            status: DocumentStatus::Active,
            version: 0,
            view_count: 0,
            download_count: 0,
            uploaded_by: uploaded_by.to_string(),
            uploaded_at: now.clone(),
            modified_by: None,
            modified_at: None,
            expiration_date: input.expiration_date,
        };

        self.insert_record(
            "documents",
            &document.id,
            &document,
            &[
                ("title", Value::Text(document.title.clone())),
                ("category", Value::Text(document.category.as_str().into())),
                (
                    "access_level",
                    Value::Text(document.access_level.as_str().into()),
                ),
                ("status", Value::Text(document.status.as_str().into())),
                ("version", Value::Integer(0)),
                ("view_count", Value::Integer(0)),
                ("download_count", Value::Integer(0)),
                ("created_at", Value::Text(now.clone())),
                ("updated_at", Value::Text(now)),
            ],
        )?;

        Ok(document)
    }

    pub fn get_document(&self, id: &str) -> Result<OrganizationDocument, ServiceError> {
        self.get_record("documents", id)
    }

    /// List documents visible to a caller with the given allowed access
    /// levels. An explicit access-level filter is intersected with the
    /// allowed set: requesting a level the caller cannot read yields an
    /// empty page, not an error.
    pub fn list_documents(
        &self,
        params: &ListParams,
        filters: &DocumentFilters,
        allowed: &[AccessLevel],
    ) -> Result<ListResult<OrganizationDocument>, ServiceError> {
        let levels: Vec<AccessLevel> = match filters.access_level {
            Some(requested) => {
                if allowed.contains(&requested) {
                    vec![requested]
                } else {
                    return Ok(ListResult {
                        items: Vec::new(),
                        total: 0,
                    });
                }
            }
            None => allowed.to_vec(),
        };
        if levels.is_empty() {
            return Ok(ListResult {
                items: Vec::new(),
                total: 0,
            });
        }

        let mut where_clauses = Vec::new();
        let mut args: Vec<Value> = Vec::new();

        let placeholders: Vec<String> = levels
            .iter()
            .enumerate()
            .map(|(i, _)| format!("?{}", i + 1))
            .collect();
        for level in &levels {
            args.push(Value::Text(level.as_str().into()));
        }
        where_clauses.push(format!("access_level IN ({})", placeholders.join(", ")));

        if let Some(category) = filters.category {
            args.push(Value::Text(category.as_str().into()));
            where_clauses.push(format!("category = ?{}", args.len()));
        }
        let status = filters.status.unwrap_or(DocumentStatus::Active);
        args.push(Value::Text(status.as_str().into()));
        where_clauses.push(format!("status = ?{}", args.len()));

        if let Some(ref q) = params.q {
            args.push(Value::Text(format!("%{}%", q)));
            where_clauses.push(format!("title LIKE ?{}", args.len()));
        }

        let where_sql = format!(" WHERE {}", where_clauses.join(" AND "));

        let count_rows = self
            .sql
            .query(
                &format!("SELECT COUNT(*) as cnt FROM documents{}", where_sql),
                &args,
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let total = count_rows
            .first()
            .and_then(|r| r.get_i64("cnt"))
            .unwrap_or(0) as usize;

        let limit_idx = args.len() + 1;
        let offset_idx = args.len() + 2;
        args.push(Value::Integer(params.limit as i64));
        args.push(Value::Integer(params.offset as i64));

        let rows = self
            .sql
            .query(
                &format!(
                    "SELECT data FROM documents{} ORDER BY created_at DESC \
                     LIMIT ?{} OFFSET ?{}",
                    where_sql, limit_idx, offset_idx
                ),
                &args,
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let mut items = Vec::new();
        for row in &rows {
            let data = row
                .get_str("data")
                .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
            items.push(
                serde_json::from_str(data).map_err(|e| ServiceError::Internal(e.to_string()))?,
            );
        }

        Ok(ListResult { items, total })
    }

    /// Patch metadata. File pointers and counters are owned by upload /
    /// view / download and cannot be patched.
    pub fn update_document(
        &self,
        id: &str,
        patch: serde_json::Value,
        modified_by: &str,
    ) -> Result<OrganizationDocument, ServiceError> {
        let current: OrganizationDocument = self.get_record("documents", id)?;
        let now = now_rfc3339();

        let mut patch = patch;
        if let Some(obj) = patch.as_object_mut() {
            for protected in [
                "id",
                "file_key",
                "file_name",
                "mime_type",
                "file_size",
                "version",
                "view_count",
                "download_count",
                "uploaded_by",
                "uploaded_at",
                "modified_by",
                "modified_at",
            ] {
                obj.remove(protected);
            }
        }

        let mut base = serde_json::to_value(&current)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        merge_patch(&mut base, &patch);
        base["modified_by"] = serde_json::json!(modified_by);
        base["modified_at"] = serde_json::json!(now);

        let updated: OrganizationDocument =
            serde_json::from_value(base).map_err(|e| ServiceError::Internal(e.to_string()))?;

        self.persist_document(&updated)?;
        Ok(updated)
    }

    /// Archive a document, stamping who archived it and when.
    pub fn archive_document(
        &self,
        id: &str,
        modified_by: &str,
    ) -> Result<OrganizationDocument, ServiceError> {
        let mut document: OrganizationDocument = self.get_record("documents", id)?;
        document.status = DocumentStatus::Archived;
        document.modified_by = Some(modified_by.to_string());
        document.modified_at = Some(now_rfc3339());
        self.persist_document(&document)?;
        Ok(document)
    }

    /// Delete a document, its version history and stored content.
    pub fn delete_document(&self, id: &str) -> Result<(), ServiceError> {
        let versions = self.list_versions(id)?;
        for version in &versions {
            // Best-effort blob cleanup; a missing blob is not an error.
            let _ = self.blob.delete(&version.file_key);
        }
        self.sql
            .exec(
                "DELETE FROM document_versions WHERE document_id = ?1",
                &[Value::Text(id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        self.delete_record("documents", id)
    }

    /// Record a view and return the document.
    pub fn view_document(&self, id: &str) -> Result<OrganizationDocument, ServiceError> {
        let mut document: OrganizationDocument = self.get_record("documents", id)?;
        document.view_count += 1;
        self.persist_document(&document)?;
        self.record_activity("view")?;
        Ok(document)
    }

    /// Record a download and return the current version's content.
    pub fn download_document(
        &self,
        id: &str,
    ) -> Result<(OrganizationDocument, Vec<u8>), ServiceError> {
        let mut document: OrganizationDocument = self.get_record("documents", id)?;
        let file_key = document
            .file_key
            .clone()
            .ok_or_else(|| ServiceError::NotFound("document has no uploaded file".into()))?;

        let content = self.blob.get(&file_key).map_err(|e| match e {
            acpn_blob::BlobError::NotFound(k) => {
                ServiceError::NotFound(format!("stored file missing: {}", k))
            }
            other => ServiceError::Storage(other.to_string()),
        })?;

        document.download_count += 1;
        self.persist_document(&document)?;
        self.record_activity("download")?;
        Ok((document, content))
    }

    pub(crate) fn persist_document(
        &self,
        document: &OrganizationDocument,
    ) -> Result<(), ServiceError> {
        self.update_record(
            "documents",
            &document.id,
            document,
            &[
                ("title", Value::Text(document.title.clone())),
                ("category", Value::Text(document.category.as_str().into())),
                (
                    "access_level",
                    Value::Text(document.access_level.as_str().into()),
                ),
                ("status", Value::Text(document.status.as_str().into())),
                ("version", Value::Integer(document.version as i64)),
                ("view_count", Value::Integer(document.view_count as i64)),
                (
                    "download_count",
                    Value::Integer(document.download_count as i64),
                ),
                ("updated_at", Value::Text(now_rfc3339())),
            ],
        )
    }

    pub(crate) fn record_activity(&self, kind: &str) -> Result<(), ServiceError> {
        let now = chrono::Utc::now();
        self.sql
            .exec(
                "INSERT INTO document_activity (id, kind, date, created_at) \
                 VALUES (?1, ?2, ?3, ?4)",
                &[
                    Value::Text(new_id()),
                    Value::Text(kind.to_string()),
                    Value::Text(now.format("%Y-%m-%d").to_string()),
                    Value::Text(now.to_rfc3339()),
                ],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DocumentCategory;
    use crate::service::access::allowed_levels;
    use crate::service::test_support::{add_document, test_service};
    use acpn_core::UserRole;

    #[test]
    fn listing_intersects_access_levels() {
        let svc = test_service();
        add_document(&svc, "constitution", AccessLevel::Public);
        add_document(&svc, "agm minutes", AccessLevel::Members);
        add_document(&svc, "committee brief", AccessLevel::Committee);
        add_document(&svc, "budget draft", AccessLevel::Executives);
        add_document(&svc, "disciplinary file", AccessLevel::Admin);

        let member_view = svc
            .list_documents(
                &ListParams::default(),
                &DocumentFilters::default(),
                &allowed_levels(UserRole::Member),
            )
            .unwrap();
        assert_eq!(member_view.total, 2);

        let secretary_view = svc
            .list_documents(
                &ListParams::default(),
                &DocumentFilters::default(),
                &allowed_levels(UserRole::Secretary),
            )
            .unwrap();
        assert_eq!(secretary_view.total, 3);

        // Explicit filter for an accessible level narrows the page.
        let committee_only = svc
            .list_documents(
                &ListParams::default(),
                &DocumentFilters {
                    access_level: Some(AccessLevel::Committee),
                    ..Default::default()
                },
                &allowed_levels(UserRole::Secretary),
            )
            .unwrap();
        assert_eq!(committee_only.total, 1);

        // Explicit filter for an inaccessible level yields nothing.
        let denied = svc
            .list_documents(
                &ListParams::default(),
                &DocumentFilters {
                    access_level: Some(AccessLevel::Admin),
                    ..Default::default()
                },
                &allowed_levels(UserRole::Member),
            )
            .unwrap();
        assert_eq!(denied.total, 0);
    }

    #[test]
    fn archive_stamps_modifier() {
        let svc = test_service();
        let doc = add_document(&svc, "old policy", AccessLevel::Members);

        let archived = svc.archive_document(&doc.id, "admin1").unwrap();
        assert_eq!(archived.status, DocumentStatus::Archived);
        assert_eq!(archived.modified_by.as_deref(), Some("admin1"));
        assert!(archived.modified_at.is_some());

        // Archived documents drop out of the default (active) listing.
        let listing = svc
            .list_documents(
                &ListParams::default(),
                &DocumentFilters::default(),
                &AccessLevel::ALL,
            )
            .unwrap();
        assert_eq!(listing.total, 0);
    }

    #[test]
    fn view_and_download_counters() {
        let svc = test_service();
        let doc = add_document(&svc, "newsletter", AccessLevel::Public);

        svc.view_document(&doc.id).unwrap();
        let viewed = svc.view_document(&doc.id).unwrap();
        assert_eq!(viewed.view_count, 2);

        // No file uploaded yet: download is NotFound.
        assert!(matches!(
            svc.download_document(&doc.id).unwrap_err(),
            ServiceError::NotFound(_)
        ));

        svc.upload_version(&doc.id, "news.pdf", "application/pdf", b"pdf!", "sec1", None)
            .unwrap();
        let (downloaded, content) = svc.download_document(&doc.id).unwrap();
        assert_eq!(downloaded.download_count, 1);
        assert_eq!(content, b"pdf!");
    }

    #[test]
    fn metadata_patch_cannot_touch_counters_or_pointers() {
        let svc = test_service();
        let doc = add_document(&svc, "form", AccessLevel::Members);

        let updated = svc
            .update_document(
                &doc.id,
                serde_json::json!({
                    "title": "Membership form",
                    "category": "form",
                    "view_count": 999,
                    "version": 42,
                    "file_key": "evil"
                }),
                "sec1",
            )
            .unwrap();
        assert_eq!(updated.title, "Membership form");
        assert_eq!(updated.category, DocumentCategory::Form);
        assert_eq!(updated.view_count, 0);
        assert_eq!(updated.version, 0);
        assert!(updated.file_key.is_none());
    }

    #[test]
    fn delete_removes_versions() {
        let svc = test_service();
        let doc = add_document(&svc, "temp", AccessLevel::Members);
        svc.upload_version(&doc.id, "a.txt", "text/plain", b"v1", "sec1", None)
            .unwrap();

        svc.delete_document(&doc.id).unwrap();
        assert!(svc.get_document(&doc.id).is_err());
        assert!(svc.list_versions(&doc.id).unwrap().is_empty());
    }
}
