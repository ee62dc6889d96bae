//! Dashboard summary — counts, recent/popular lists and a 30-day
//! activity series built from the append-only activity table.

use std::collections::HashMap;

use chrono::Duration;
use serde::Serialize;

use acpn_core::ServiceError;
use acpn_sql::Value;

use crate::model::OrganizationDocument;
use crate::service::DocsService;

#[derive(Debug, Clone, Serialize)]
pub struct CountBucket {
    pub key: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityDay {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub uploads: i64,
    pub views: i64,
    pub downloads: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocsSummary {
    pub total_documents: i64,
    pub archived_documents: i64,
    pub by_category: Vec<CountBucket>,
    pub by_access_level: Vec<CountBucket>,
    /// Five most recently created documents.
    pub recent: Vec<OrganizationDocument>,
    /// Five most viewed documents.
    pub popular: Vec<OrganizationDocument>,
    /// One entry per day for the trailing 30 days, zero-filled.
    pub activity: Vec<ActivityDay>,
}

impl DocsService {
    pub fn summary(&self) -> Result<DocsSummary, ServiceError> {
        let status_rows = self
            .sql
            .query(
                "SELECT status, COUNT(*) as cnt FROM documents GROUP BY status",
                &[],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let mut total_documents = 0;
        let mut archived_documents = 0;
        for row in &status_rows {
            let count = row.get_i64("cnt").unwrap_or(0);
            total_documents += count;
            if row.get_str("status") == Some("archived") {
                archived_documents = count;
            }
        }

        let by_category = self.count_by("category")?;
        let by_access_level = self.count_by("access_level")?;

        let recent = self.top_documents("created_at DESC", 5)?;
        let popular = self.top_documents("view_count DESC", 5)?;

        let activity = self.activity_series(30)?;

        Ok(DocsSummary {
            total_documents,
            archived_documents,
            by_category,
            by_access_level,
            recent,
            popular,
            activity,
        })
    }

    fn count_by(&self, column: &str) -> Result<Vec<CountBucket>, ServiceError> {
        let rows = self
            .sql
            .query(
                &format!(
                    "SELECT {col} as key, COUNT(*) as cnt FROM documents \
                     GROUP BY {col} ORDER BY cnt DESC",
                    col = column
                ),
                &[],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(rows
            .iter()
            .map(|row| CountBucket {
                key: row.get_str("key").unwrap_or_default().to_string(),
                count: row.get_i64("cnt").unwrap_or(0),
            })
            .collect())
    }

    fn top_documents(
        &self,
        order: &str,
        limit: usize,
    ) -> Result<Vec<OrganizationDocument>, ServiceError> {
        let rows = self
            .sql
            .query(
                &format!(
                    "SELECT data FROM documents WHERE status = 'active' \
                     ORDER BY {} LIMIT ?1",
                    order
                ),
                &[Value::Integer(limit as i64)],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let mut items = Vec::new();
        for row in &rows {
            if let Some(data) = row.get_str("data") {
                items.push(
                    serde_json::from_str(data)
                        .map_err(|e| ServiceError::Internal(e.to_string()))?,
                );
            }
        }
        Ok(items)
    }

    fn activity_series(&self, days: i64) -> Result<Vec<ActivityDay>, ServiceError> {
        let today = chrono::Utc::now().date_naive();
        let start = today - Duration::days(days - 1);

        let rows = self
            .sql
            .query(
                "SELECT date, kind, COUNT(*) as cnt FROM document_activity \
                 WHERE date >= ?1 GROUP BY date, kind",
                &[Value::Text(start.format("%Y-%m-%d").to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let mut by_day: HashMap<String, (i64, i64, i64)> = HashMap::new();
        for row in &rows {
            let date = row.get_str("date").unwrap_or_default().to_string();
            let count = row.get_i64("cnt").unwrap_or(0);
            let entry = by_day.entry(date).or_default();
            match row.get_str("kind") {
                Some("upload") => entry.0 = count,
                Some("view") => entry.1 = count,
                Some("download") => entry.2 = count,
                _ => {}
            }
        }

        let mut series = Vec::with_capacity(days as usize);
        for offset in 0..days {
            let date = (start + Duration::days(offset)).format("%Y-%m-%d").to_string();
            let (uploads, views, downloads) = by_day.get(&date).copied().unwrap_or((0, 0, 0));
            series.push(ActivityDay {
                date,
                uploads,
                views,
                downloads,
            });
        }
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use crate::model::AccessLevel;
    use crate::service::test_support::{add_document, test_service};

    #[test]
    fn summary_counts_and_series_shape() {
        let svc = test_service();
        let a = add_document(&svc, "a", AccessLevel::Public);
        let b = add_document(&svc, "b", AccessLevel::Members);
        add_document(&svc, "c", AccessLevel::Members);

        svc.upload_version(&a.id, "a.txt", "text/plain", b"x", "sec1", None)
            .unwrap();
        svc.view_document(&b.id).unwrap();
        svc.view_document(&b.id).unwrap();
        svc.download_document(&a.id).unwrap();
        svc.archive_document(&b.id, "admin1").unwrap();

        let summary = svc.summary().unwrap();
        assert_eq!(summary.total_documents, 3);
        assert_eq!(summary.archived_documents, 1);
        assert_eq!(summary.by_category.len(), 1); // all minutes
        assert_eq!(summary.by_access_level.len(), 2);

        // 30 zero-filled days, today's entry carrying the counts.
        assert_eq!(summary.activity.len(), 30);
        let today = summary.activity.last().unwrap();
        assert_eq!(today.uploads, 1);
        assert_eq!(today.views, 2);
        assert_eq!(today.downloads, 1);
        assert_eq!(summary.activity[0].uploads, 0);

        // Popular excludes archived documents, so the most-viewed active
        // document leads.
        assert!(summary.popular.iter().all(|d| d.id != b.id));
    }
}
