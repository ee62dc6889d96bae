use acpn_core::{new_id, now_rfc3339, ServiceError};
use acpn_sql::Value;

use crate::model::{DocumentVersion, OrganizationDocument};
use crate::service::DocsService;

impl DocsService {
    /// Upload file content as the next version of a document.
    ///
    /// Writes the content to the blob store, appends an immutable
    /// DocumentVersion record, bumps the parent's version counter and
    /// overwrites its current file pointers. The parent's `version`
    /// always equals the highest version number on record.
    pub fn upload_version(
        &self,
        document_id: &str,
        file_name: &str,
        mime_type: &str,
        content: &[u8],
        uploaded_by: &str,
        change_note: Option<String>,
    ) -> Result<OrganizationDocument, ServiceError> {
        if file_name.trim().is_empty() {
            return Err(ServiceError::Validation("file name cannot be empty".into()));
        }
        if content.is_empty() {
            return Err(ServiceError::Validation("file content cannot be empty".into()));
        }

        let mut document: OrganizationDocument = self.get_record("documents", document_id)?;

        let next_version = document.version + 1;
        let file_key = format!("documents/{}/v{}/{}", document_id, next_version, file_name);

        self.blob
            .put(&file_key, content)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let version = DocumentVersion {
            id: new_id(),
            document_id: document_id.to_string(),
            version: next_version,
            file_key: file_key.clone(),
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            file_size: content.len() as u64,
            uploaded_by: uploaded_by.to_string(),
            uploaded_at: now_rfc3339(),
            change_note,
        };

        self.insert_record(
            "document_versions",
            &version.id,
            &version,
            &[
                ("document_id", Value::Text(version.document_id.clone())),
                ("version", Value::Integer(version.version as i64)),
                ("created_at", Value::Text(version.uploaded_at.clone())),
            ],
        )?;

        document.version = next_version;
        document.file_key = Some(file_key);
        document.file_name = Some(file_name.to_string());
        document.mime_type = Some(mime_type.to_string());
        document.file_size = content.len() as u64;
        document.modified_by = Some(uploaded_by.to_string());
        document.modified_at = Some(now_rfc3339());
        self.persist_document(&document)?;

        self.record_activity("upload")?;
        tracing::info!(document_id = %document_id, version = next_version, "version uploaded");
        Ok(document)
    }

    /// Version history of a document, newest first.
    pub fn list_versions(&self, document_id: &str) -> Result<Vec<DocumentVersion>, ServiceError> {
        let rows = self
            .sql
            .query(
                "SELECT data FROM document_versions WHERE document_id = ?1 \
                 ORDER BY version DESC",
                &[Value::Text(document_id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let mut versions = Vec::new();
        for row in &rows {
            let data = row
                .get_str("data")
                .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
            versions.push(
                serde_json::from_str(data).map_err(|e| ServiceError::Internal(e.to_string()))?,
            );
        }
        Ok(versions)
    }
}

#[cfg(test)]
mod tests {
    use crate::model::AccessLevel;
    use crate::service::test_support::{add_document, test_service};

    #[test]
    fn versions_accumulate_and_parent_tracks_highest() {
        let svc = test_service();
        let doc = add_document(&svc, "bylaws", AccessLevel::Members);
        assert_eq!(doc.version, 0);

        let v1 = svc
            .upload_version(&doc.id, "bylaws.pdf", "application/pdf", b"first", "sec1", None)
            .unwrap();
        assert_eq!(v1.version, 1);
        assert_eq!(v1.file_name.as_deref(), Some("bylaws.pdf"));
        assert_eq!(v1.file_size, 5);

        let v2 = svc
            .upload_version(
                &doc.id,
                "bylaws-2025.pdf",
                "application/pdf",
                b"second!",
                "sec1",
                Some("2025 amendments".into()),
            )
            .unwrap();
        assert_eq!(v2.version, 2);
        assert_eq!(v2.file_name.as_deref(), Some("bylaws-2025.pdf"));

        let history = svc.list_versions(&doc.id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].version, 2);
        assert_eq!(history[1].version, 1);
        assert_eq!(history[0].change_note.as_deref(), Some("2025 amendments"));

        // Current content is the latest upload.
        let (_, content) = svc.download_document(&doc.id).unwrap();
        assert_eq!(content, b"second!");
    }

    #[test]
    fn empty_upload_rejected() {
        let svc = test_service();
        let doc = add_document(&svc, "empty", AccessLevel::Members);
        assert!(svc
            .upload_version(&doc.id, "x.txt", "text/plain", b"", "sec1", None)
            .is_err());
        assert!(svc
            .upload_version(&doc.id, " ", "text/plain", b"data", "sec1", None)
            .is_err());
    }

    #[test]
    fn unknown_document_is_not_found() {
        let svc = test_service();
        assert!(svc
            .upload_version("ghost", "x.txt", "text/plain", b"data", "sec1", None)
            .is_err());
    }
}
