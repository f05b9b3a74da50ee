//! SQLite 저장소 — 취약점 레코드와 스캔 이력의 영속화
//!
//! [`AdvisoryStore`]는 `(source, id)`를 기본 키로 하는 취약점 테이블과
//! 추가 전용 스캔 이력 테이블을 관리합니다. `(ecosystem, package)` 인덱스로
//! 매처 조회가 캐시 크기에 대해 O(log n)으로 동작합니다.
//!
//! WAL 저널 모드를 사용하므로 갱신 트랜잭션이 진행 중이어도 읽기는
//! 갱신 전 스냅샷을 봅니다 (조회가 절대 찢긴 상태를 보지 않음).

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;

use lockvet_core::error::AdvisoryError;
use lockvet_core::types::{Ecosystem, ScanHistoryEntry, Severity, VulnSource, Vulnerability};

/// upsert 결과 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// 새 레코드 삽입
    Inserted,
    /// 기존 레코드 갱신
    Updated,
    /// 변경 없음 (동일하거나 더 오래된 레코드)
    Unchanged,
}

/// 취약점 레코드와 스캔 이력의 SQLite 저장소
#[derive(Debug, Clone)]
pub struct AdvisoryStore {
    pool: SqlitePool,
}

impl AdvisoryStore {
    /// 지정된 경로의 데이터베이스를 열고 스키마를 준비합니다.
    ///
    /// 파일이 없으면 생성합니다 (`mode=rwc`).
    pub async fn open(path: &str) -> Result<Self, AdvisoryError> {
        let url = format!("sqlite:{path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .map_err(storage_err)?;

        let store = Self { pool };
        store.configure_pragmas().await?;
        store.create_tables().await?;
        Ok(store)
    }

    async fn configure_pragmas(&self) -> Result<(), AdvisoryError> {
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn create_tables(&self) -> Result<(), AdvisoryError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS vulnerabilities (
                id TEXT NOT NULL,
                source TEXT NOT NULL,
                severity TEXT NOT NULL,
                cvss_score REAL,
                title TEXT NOT NULL,
                description TEXT,
                package TEXT NOT NULL,
                ecosystem TEXT NOT NULL,
                affected_versions TEXT,
                fixed_versions TEXT,
                published_at TEXT,
                refs TEXT NOT NULL DEFAULT '[]',
                fetched_at TEXT,
                PRIMARY KEY (source, id)
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_vulnerabilities_package
             ON vulnerabilities(ecosystem, package)",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS scan_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                directory TEXT NOT NULL,
                ecosystem TEXT NOT NULL,
                vulnerability_count INTEGER NOT NULL,
                scanned_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    /// 레코드 묶음을 하나의 트랜잭션으로 upsert하고
    /// 추가/갱신된 레코드 수를 반환합니다.
    ///
    /// 도중 실패 시 트랜잭션이 롤백되어 캐시는 변경되지 않습니다.
    pub async fn upsert_all(&self, vulns: &[Vulnerability]) -> Result<u64, AdvisoryError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;
        let mut changed = 0u64;
        for vuln in vulns {
            match upsert_in(&mut tx, vuln).await? {
                UpsertOutcome::Inserted | UpsertOutcome::Updated => changed += 1,
                UpsertOutcome::Unchanged => {}
            }
        }
        tx.commit().await.map_err(storage_err)?;
        Ok(changed)
    }

    /// 단일 레코드를 upsert합니다.
    pub async fn upsert(&self, vuln: &Vulnerability) -> Result<UpsertOutcome, AdvisoryError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;
        let outcome = upsert_in(&mut tx, vuln).await?;
        tx.commit().await.map_err(storage_err)?;
        Ok(outcome)
    }

    /// `(ecosystem, package)` 조회 — 로컬 읽기만 수행합니다.
    pub async fn lookup(
        &self,
        ecosystem: Ecosystem,
        package: &str,
    ) -> Result<Vec<Vulnerability>, AdvisoryError> {
        let rows = sqlx::query(
            "SELECT * FROM vulnerabilities
             WHERE ecosystem = ? AND package = ?
             ORDER BY id ASC",
        )
        .bind(ecosystem.canonical_name())
        .bind(package)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(rows.iter().map(row_to_vuln).collect())
    }

    /// 어드바이저리 ID로 단건 조회 — 출처를 가리지 않고
    /// 가장 최근에 수집된 레코드를 반환합니다.
    pub async fn detail(&self, id: &str) -> Result<Option<Vulnerability>, AdvisoryError> {
        let row = sqlx::query(
            "SELECT * FROM vulnerabilities
             WHERE id = ?
             ORDER BY fetched_at DESC
             LIMIT 1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(row.as_ref().map(row_to_vuln))
    }

    /// 캐시된 레코드 목록 조회 (에코시스템 필터 + 페이지네이션)
    pub async fn list(
        &self,
        ecosystem: Option<Ecosystem>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Vulnerability>, AdvisoryError> {
        let rows = match ecosystem {
            Some(eco) => {
                sqlx::query(
                    "SELECT * FROM vulnerabilities
                     WHERE ecosystem = ?
                     ORDER BY published_at DESC
                     LIMIT ? OFFSET ?",
                )
                .bind(eco.canonical_name())
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT * FROM vulnerabilities
                     ORDER BY published_at DESC
                     LIMIT ? OFFSET ?",
                )
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(storage_err)?;

        Ok(rows.iter().map(row_to_vuln).collect())
    }

    /// 캐시된 전체 레코드 수
    pub async fn count(&self) -> Result<u64, AdvisoryError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM vulnerabilities")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        let count: i64 = row.get("count");
        Ok(count as u64)
    }

    /// 스캔 이력 한 행을 기록합니다.
    pub async fn record_scan(
        &self,
        directory: &str,
        ecosystem: Ecosystem,
        vulnerability_count: u32,
        scanned_at: DateTime<Utc>,
    ) -> Result<i64, AdvisoryError> {
        let result = sqlx::query(
            "INSERT INTO scan_history (directory, ecosystem, vulnerability_count, scanned_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(directory)
        .bind(ecosystem.canonical_name())
        .bind(vulnerability_count)
        .bind(scanned_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(result.last_insert_rowid())
    }

    /// 최근 스캔 이력 조회 (최신 우선)
    pub async fn recent_scans(&self, limit: u32) -> Result<Vec<ScanHistoryEntry>, AdvisoryError> {
        let rows = sqlx::query(
            "SELECT id, directory, ecosystem, vulnerability_count, scanned_at
             FROM scan_history
             ORDER BY id DESC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(rows
            .iter()
            .map(|row| ScanHistoryEntry {
                id: row.get("id"),
                directory: row.get("directory"),
                ecosystem: Ecosystem::from_str_loose(row.get::<String, _>("ecosystem").as_str())
                    .unwrap_or(Ecosystem::Npm),
                vulnerability_count: row.get::<i64, _>("vulnerability_count") as u32,
                scanned_at: parse_timestamp(Some(row.get("scanned_at"))).unwrap_or_else(Utc::now),
            })
            .collect())
    }
}

/// 트랜잭션 내부 upsert — newer-wins 충돌 해결
///
/// 공개 시각이 더 최신인 레코드가 이기며, 시각이 같고 내용도 같으면
/// 아무것도 변경하지 않습니다 (갱신 멱등성의 근거).
async fn upsert_in(
    conn: &mut SqliteConnection,
    vuln: &Vulnerability,
) -> Result<UpsertOutcome, AdvisoryError> {
    let existing = sqlx::query(
        "SELECT severity, cvss_score, title, description, affected_versions,
                fixed_versions, published_at, refs
         FROM vulnerabilities WHERE source = ? AND id = ?",
    )
    .bind(vuln.source.to_string())
    .bind(&vuln.id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(storage_err)?;

    let refs_json = serde_json::to_string(&vuln.references).unwrap_or_else(|_| "[]".to_owned());

    let Some(row) = existing else {
        insert_row(conn, vuln, &refs_json).await?;
        return Ok(UpsertOutcome::Inserted);
    };

    let old_published = parse_timestamp(row.get("published_at"));
    if vuln.published_at < old_published {
        debug!(id = %vuln.id, source = %vuln.source, "skipping older record");
        return Ok(UpsertOutcome::Unchanged);
    }

    let same_content = row.get::<String, _>("severity") == vuln.severity.to_string()
        && row.get::<Option<f64>, _>("cvss_score") == vuln.cvss_score
        && row.get::<String, _>("title") == vuln.title
        && row.get::<Option<String>, _>("description") == vuln.description
        && row.get::<Option<String>, _>("affected_versions") == vuln.affected_versions
        && row.get::<Option<String>, _>("fixed_versions") == vuln.fixed_versions
        && row.get::<String, _>("refs") == refs_json;
    if vuln.published_at == old_published && same_content {
        return Ok(UpsertOutcome::Unchanged);
    }

    insert_row(conn, vuln, &refs_json).await?;
    Ok(UpsertOutcome::Updated)
}

async fn insert_row(
    conn: &mut SqliteConnection,
    vuln: &Vulnerability,
    refs_json: &str,
) -> Result<(), AdvisoryError> {
    sqlx::query(
        "INSERT OR REPLACE INTO vulnerabilities
         (id, source, severity, cvss_score, title, description, package, ecosystem,
          affected_versions, fixed_versions, published_at, refs, fetched_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&vuln.id)
    .bind(vuln.source.to_string())
    .bind(vuln.severity.to_string())
    .bind(vuln.cvss_score)
    .bind(&vuln.title)
    .bind(&vuln.description)
    .bind(&vuln.package)
    .bind(vuln.ecosystem.canonical_name())
    .bind(&vuln.affected_versions)
    .bind(&vuln.fixed_versions)
    .bind(vuln.published_at.map(|t| t.to_rfc3339()))
    .bind(refs_json)
    .bind(vuln.fetched_at.unwrap_or_else(Utc::now).to_rfc3339())
    .execute(conn)
    .await
    .map_err(storage_err)?;
    Ok(())
}

fn row_to_vuln(row: &sqlx::sqlite::SqliteRow) -> Vulnerability {
    let refs: Vec<String> =
        serde_json::from_str(row.get::<String, _>("refs").as_str()).unwrap_or_default();
    Vulnerability {
        id: row.get("id"),
        source: VulnSource::from_str_loose(row.get::<String, _>("source").as_str())
            .unwrap_or(VulnSource::Osv),
        severity: Severity::from_str_loose(row.get::<String, _>("severity").as_str())
            .unwrap_or_default(),
        cvss_score: row.get("cvss_score"),
        title: row.get("title"),
        description: row.get("description"),
        package: row.get("package"),
        ecosystem: Ecosystem::from_str_loose(row.get::<String, _>("ecosystem").as_str())
            .unwrap_or(Ecosystem::Npm),
        affected_versions: row.get("affected_versions"),
        fixed_versions: row.get("fixed_versions"),
        published_at: parse_timestamp(row.get("published_at")),
        references: refs,
        fetched_at: parse_timestamp(row.get("fetched_at")),
    }
}

fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn storage_err(e: sqlx::Error) -> AdvisoryError {
    AdvisoryError::Storage {
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vuln(id: &str) -> Vulnerability {
        Vulnerability {
            id: id.to_owned(),
            source: VulnSource::Osv,
            severity: Severity::High,
            cvss_score: Some(7.5),
            title: "Prototype pollution".to_owned(),
            description: Some("details".to_owned()),
            package: "lodash".to_owned(),
            ecosystem: Ecosystem::Npm,
            affected_versions: Some("< 4.17.21".to_owned()),
            fixed_versions: Some("4.17.21".to_owned()),
            published_at: Some("2021-02-15T00:00:00Z".parse().unwrap()),
            references: vec!["https://example.test/advisory".to_owned()],
            fetched_at: Some(Utc::now()),
        }
    }

    async fn temp_store() -> (tempfile::TempDir, AdvisoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("advisories.db");
        let store = AdvisoryStore::open(path.to_str().unwrap()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn upsert_then_lookup() {
        let (_dir, store) = temp_store().await;
        let vuln = sample_vuln("GHSA-aaaa-bbbb-cccc");
        assert_eq!(store.upsert(&vuln).await.unwrap(), UpsertOutcome::Inserted);

        let found = store.lookup(Ecosystem::Npm, "lodash").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "GHSA-aaaa-bbbb-cccc");
        assert_eq!(found[0].severity, Severity::High);
        assert_eq!(found[0].references.len(), 1);
    }

    #[tokio::test]
    async fn lookup_is_ecosystem_scoped() {
        let (_dir, store) = temp_store().await;
        store.upsert(&sample_vuln("OSV-1")).await.unwrap();

        let found = store.lookup(Ecosystem::PyPi, "lodash").await.unwrap();
        assert!(found.is_empty());
        let found = store.lookup(Ecosystem::Npm, "underscore").await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn upsert_same_record_is_unchanged() {
        let (_dir, store) = temp_store().await;
        let vuln = sample_vuln("OSV-2");
        store.upsert(&vuln).await.unwrap();
        assert_eq!(store.upsert(&vuln).await.unwrap(), UpsertOutcome::Unchanged);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn upsert_newer_record_wins() {
        let (_dir, store) = temp_store().await;
        let mut vuln = sample_vuln("OSV-3");
        store.upsert(&vuln).await.unwrap();

        vuln.published_at = Some("2022-01-01T00:00:00Z".parse().unwrap());
        vuln.severity = Severity::Critical;
        assert_eq!(store.upsert(&vuln).await.unwrap(), UpsertOutcome::Updated);

        let found = store.detail("OSV-3").await.unwrap().unwrap();
        assert_eq!(found.severity, Severity::Critical);
    }

    #[tokio::test]
    async fn upsert_older_record_is_ignored() {
        let (_dir, store) = temp_store().await;
        let mut vuln = sample_vuln("OSV-4");
        store.upsert(&vuln).await.unwrap();

        vuln.published_at = Some("2020-01-01T00:00:00Z".parse().unwrap());
        vuln.severity = Severity::Low;
        assert_eq!(store.upsert(&vuln).await.unwrap(), UpsertOutcome::Unchanged);

        let found = store.detail("OSV-4").await.unwrap().unwrap();
        assert_eq!(found.severity, Severity::High);
    }

    #[tokio::test]
    async fn upsert_all_counts_changes_only() {
        let (_dir, store) = temp_store().await;
        let batch = vec![sample_vuln("OSV-5"), sample_vuln("OSV-6")];
        assert_eq!(store.upsert_all(&batch).await.unwrap(), 2);
        // 같은 배치를 다시 넣으면 변경 없음
        assert_eq!(store.upsert_all(&batch).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn same_id_different_sources_coexist() {
        let (_dir, store) = temp_store().await;
        let mut osv = sample_vuln("CVE-2021-23337");
        store.upsert(&osv).await.unwrap();
        osv.source = VulnSource::Github;
        store.upsert(&osv).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
        let found = store.lookup(Ecosystem::Npm, "lodash").await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn detail_missing_returns_none() {
        let (_dir, store) = temp_store().await;
        assert!(store.detail("CVE-0000-0000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_filters_and_paginates() {
        let (_dir, store) = temp_store().await;
        for i in 0..5 {
            let mut v = sample_vuln(&format!("OSV-{i}"));
            v.ecosystem = if i % 2 == 0 {
                Ecosystem::Npm
            } else {
                Ecosystem::Go
            };
            store.upsert(&v).await.unwrap();
        }
        let npm = store.list(Some(Ecosystem::Npm), 10, 0).await.unwrap();
        assert_eq!(npm.len(), 3);
        let page = store.list(None, 2, 0).await.unwrap();
        assert_eq!(page.len(), 2);
    }

    #[tokio::test]
    async fn scan_history_is_most_recent_first() {
        let (_dir, store) = temp_store().await;
        store
            .record_scan("/a", Ecosystem::Npm, 3, Utc::now())
            .await
            .unwrap();
        store
            .record_scan("/b", Ecosystem::Go, 0, Utc::now())
            .await
            .unwrap();

        let history = store.recent_scans(10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].directory, "/b");
        assert_eq!(history[1].directory, "/a");
        assert_eq!(history[1].vulnerability_count, 3);

        let limited = store.recent_scans(1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }
}
