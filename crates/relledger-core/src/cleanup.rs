//! Consistency repair for version groups.
//!
//! A `(product, version)` group is trustworthy only when it carries one row
//! per supported platform and all of those rows agree on the commit. Groups
//! that fall short are deleted outright. There is no dry run.
//!
//! Both passes run in the same transaction: incompleteness first, then
//! divergence over whatever survived.

use relledger_schema::SUPPORTED_PLATFORM_COUNT;
use rusqlite::Connection;
use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use tracing::info;

use crate::store::DbError;
use crate::store::DbHandle;
use crate::store::filter::Filter;

/// Rows removed by one cleanup run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Rows in groups with fewer platforms than expected
    pub incomplete_rows: usize,
    /// Rows in groups whose commits disagree
    pub divergent_rows: usize,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.incomplete_rows + self.divergent_rows
    }
}

/// Deletes version groups that are incomplete or disagree on their commit.
#[derive(Debug, Clone)]
pub struct ConsistencyEnforcer {
    db: DbHandle,
    expected_platforms: usize,
}

impl ConsistencyEnforcer {
    pub fn new(db: DbHandle) -> Self {
        Self {
            db,
            expected_platforms: SUPPORTED_PLATFORM_COUNT,
        }
    }

    /// Override how many platform rows make a group complete.
    #[must_use]
    pub fn with_expected_platforms(mut self, expected_platforms: usize) -> Self {
        self.expected_platforms = expected_platforms;
        self
    }

    pub fn expected_platforms(&self) -> usize {
        self.expected_platforms
    }

    /// Run both passes, optionally limited to one product.
    pub async fn run(&self, product: Option<String>) -> Result<CleanupReport, DbError> {
        let scope = product.clone().unwrap_or_else(|| "*".to_string());
        let report = self.db.cleanup(product, self.expected_platforms).await?;
        info!(
            product = %scope,
            incomplete = report.incomplete_rows,
            divergent = report.divergent_rows,
            "cleaned up versions"
        );
        Ok(report)
    }
}

/// Delete every group with fewer than `expected` rows.
pub(crate) fn delete_incomplete_groups(
    conn: &Connection,
    product: Option<&str>,
    expected: usize,
) -> Result<usize, DbError> {
    let filter = Filter::new().eq("product", product);
    let sql = format!(
        "DELETE FROM versions WHERE (product, version) IN (
             SELECT product, version FROM versions{}
             GROUP BY product, version HAVING COUNT(*) < ?)",
        filter.where_clause()
    );
    let expected = i64::try_from(expected).unwrap_or(i64::MAX);
    let params = filter.into_params([SqlValue::Integer(expected)]);
    Ok(conn.execute(&sql, params_from_iter(params))?)
}

/// Delete every group whose rows carry more than one distinct commit.
pub(crate) fn delete_divergent_groups(
    conn: &Connection,
    product: Option<&str>,
) -> Result<usize, DbError> {
    let filter = Filter::new().eq("product", product);
    let sql = format!(
        "DELETE FROM versions WHERE (product, version) IN (
             SELECT product, version FROM versions{}
             GROUP BY product, version HAVING COUNT(DISTINCT commit_sha) > 1)",
        filter.where_clause()
    );
    Ok(conn.execute(&sql, params_from_iter(filter.into_params([])))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relledger_schema::{ListQuery, VersionKey};

    const PLATFORMS: [(&str, &str); 6] = [
        ("linux", "amd64"),
        ("linux", "arm64"),
        ("windows", "amd64"),
        ("windows", "arm64"),
        ("apple", "amd64"),
        ("apple", "arm64"),
    ];

    async fn seed(db: &DbHandle, product: &str, version: &str, rows: usize, commits: &[&str]) {
        for (i, (os, arch)) in PLATFORMS.iter().take(rows).enumerate() {
            let commit = commits[i.min(commits.len() - 1)];
            db.upsert_url(
                VersionKey::new(product, version, os, arch),
                "u".into(),
                commit.into(),
            )
            .await
            .unwrap();
        }
    }

    async fn versions(db: &DbHandle, product: &str) -> Vec<String> {
        let query = ListQuery {
            product: Some(product.into()),
            ..ListQuery::default()
        };
        let mut versions: Vec<_> = db
            .list_versions(query)
            .await
            .unwrap()
            .into_iter()
            .map(|row| row.version)
            .collect();
        versions.dedup();
        versions
    }

    #[tokio::test]
    async fn incomplete_and_divergent_groups_are_removed() {
        let db = DbHandle::in_memory().unwrap();
        seed(&db, "agent", "1.0", 5, &["c"]).await;
        seed(&db, "agent", "2.0", 6, &["c", "c", "c", "c", "c", "other"]).await;
        seed(&db, "agent", "3.0", 6, &["c"]).await;

        let report = ConsistencyEnforcer::new(db.clone()).run(None).await.unwrap();

        assert_eq!(report.incomplete_rows, 5);
        assert_eq!(report.divergent_rows, 6);
        assert_eq!(report.total(), 11);
        assert_eq!(versions(&db, "agent").await, vec!["3.0"]);
    }

    #[tokio::test]
    async fn groups_are_per_product() {
        let db = DbHandle::in_memory().unwrap();
        // same version string, each product complete only in its own right
        seed(&db, "agent", "1.0", 6, &["a"]).await;
        seed(&db, "cli", "1.0", 6, &["b"]).await;

        let report = ConsistencyEnforcer::new(db.clone()).run(None).await.unwrap();
        assert_eq!(report, CleanupReport::default());
        assert_eq!(db.count_versions(None).await.unwrap(), 12);
    }

    #[tokio::test]
    async fn product_scope_limits_deletion() {
        let db = DbHandle::in_memory().unwrap();
        seed(&db, "agent", "1.0", 2, &["a"]).await;
        seed(&db, "cli", "1.0", 2, &["b"]).await;

        let enforcer = ConsistencyEnforcer::new(db.clone());
        let report = enforcer.run(Some("agent".into())).await.unwrap();

        assert_eq!(report.incomplete_rows, 2);
        assert!(versions(&db, "agent").await.is_empty());
        assert_eq!(versions(&db, "cli").await, vec!["1.0"]);
    }

    #[tokio::test]
    async fn expected_count_is_configurable() {
        let db = DbHandle::in_memory().unwrap();
        seed(&db, "agent", "1.0", 2, &["a"]).await;

        let enforcer = ConsistencyEnforcer::new(db.clone()).with_expected_platforms(2);
        assert_eq!(enforcer.expected_platforms(), 2);
        assert_eq!(enforcer.run(None).await.unwrap().total(), 0);
        assert_eq!(db.count_versions(None).await.unwrap(), 2);
    }
}
