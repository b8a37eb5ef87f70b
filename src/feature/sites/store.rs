use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use reqwest::Url;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::feature::error::SiteError;
use crate::feature::options::ReferenceOptions;
use crate::feature::reference::FeatureReference;
use crate::feature::site::{DEFAULT_FEATURE_TYPE, Site};
use crate::feature::sites::{ConfiguredFeature, StaticSite};
use crate::feature::types::Category;

/// Schema migrations
/// Each version contains a list of SQL statements to execute
const MIGRATIONS: &[&[&str]] = &[];

/// Separator for category names stored in a single column
const CATEGORY_SEPARATOR: &str = "\n";

const FEATURE_COLUMNS: &str =
    "url, feature_type, feature_id, feature_version, category_names, options, enabled";

/// Raw `features` row, before URL and options are decoded
type FeatureRow = (
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
    bool,
);

/// Site-level settings kept next to the features
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSettings {
    pub default_feature_type: String,
    /// An unconfigured site offers no candidate pool
    pub configured: bool,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            default_feature_type: DEFAULT_FEATURE_TYPE.to_string(),
            configured: true,
        }
    }
}

/// A configured site persisted in SQLite.
///
/// Features keep the position at which they were first configured, so the
/// candidate pool is always read in the same order. A site that was never
/// given settings uses [`SiteSettings::default`].
pub struct SiteStore {
    this: Weak<SiteStore>,
    conn: Mutex<Connection>,
    url: Url,
}

impl SiteStore {
    pub fn open(db_path: &Path, url: Url) -> Result<Arc<Self>, SiteError> {
        info!("Opening site store at {:?} for {}", db_path, url);

        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Self::create_schema(&conn)?;

        Ok(Arc::new_cyclic(|this| Self {
            this: this.clone(),
            conn: Mutex::new(conn),
            url,
        }))
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, SiteError> {
        self.conn.lock().map_err(|_| SiteError::LockPoisoned)
    }

    fn create_schema(conn: &Connection) -> Result<(), SiteError> {
        debug!("Creating site store schema");

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS sites (
                url TEXT PRIMARY KEY,
                default_feature_type TEXT NOT NULL,
                configured INTEGER NOT NULL DEFAULT 1,
                updated_at INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS features (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                site_url TEXT NOT NULL,
                position INTEGER NOT NULL,
                url TEXT NOT NULL,
                feature_type TEXT,
                feature_id TEXT,
                feature_version TEXT,
                category_names TEXT NOT NULL DEFAULT '',
                options TEXT,
                enabled INTEGER NOT NULL DEFAULT 1,
                configured_at INTEGER NOT NULL,
                UNIQUE(site_url, url)
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_features_site ON features(site_url, position)",
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                site_url TEXT NOT NULL,
                name TEXT NOT NULL,
                label TEXT NOT NULL,
                description TEXT,
                PRIMARY KEY (site_url, name)
            )
            "#,
            [],
        )?;

        Self::apply_migrations(conn)
    }

    /// Apply pending migrations based on user_version pragma
    fn apply_migrations(conn: &Connection) -> Result<(), SiteError> {
        let current_version: i32 =
            conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        for (i, statements) in MIGRATIONS.iter().enumerate() {
            let version = (i + 1) as i32;
            if version > current_version {
                for sql in *statements {
                    conn.execute(sql, [])?;
                }
                debug!("Applied migration v{}", version);
            }
        }

        let target_version = MIGRATIONS.len() as i32;
        if target_version > current_version {
            conn.pragma_update(None, "user_version", target_version)?;
            debug!("Updated schema version to v{}", target_version);
        }

        Ok(())
    }

    /// Store the site-level settings
    pub fn configure_site(&self, settings: &SiteSettings) -> Result<(), SiteError> {
        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT INTO sites (url, default_feature_type, configured, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(url) DO UPDATE SET
                default_feature_type = excluded.default_feature_type,
                configured = excluded.configured,
                updated_at = excluded.updated_at
            "#,
            (
                self.url.as_str(),
                &settings.default_feature_type,
                settings.configured,
                chrono::Utc::now().timestamp_millis(),
            ),
        )?;
        debug!("Configured site {}: {:?}", self.url, settings);
        Ok(())
    }

    pub fn settings(&self) -> Result<SiteSettings, SiteError> {
        let conn = self.lock_conn()?;
        let settings = conn
            .query_row(
                "SELECT default_feature_type, configured FROM sites WHERE url = ?1",
                [self.url.as_str()],
                |row| {
                    Ok(SiteSettings {
                        default_feature_type: row.get(0)?,
                        configured: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(settings.unwrap_or_default())
    }

    /// Add or re-enable a feature. A feature already known keeps its position.
    pub fn configure(&self, feature: &ConfiguredFeature) -> Result<(), SiteError> {
        let site_url = self.url.as_str();
        let now = chrono::Utc::now().timestamp_millis();
        let category_names = feature.category_names.join(CATEGORY_SEPARATOR);
        let options = feature
            .options
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let next_position: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM features WHERE site_url = ?1",
            [site_url],
            |row| row.get(0),
        )?;

        tx.execute(
            r#"
            INSERT INTO features (
                site_url, position, url, feature_type, feature_id, feature_version,
                enabled, configured_at, category_names, options
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(site_url, url) DO UPDATE SET
                feature_type = excluded.feature_type,
                feature_id = excluded.feature_id,
                feature_version = excluded.feature_version,
                enabled = excluded.enabled,
                configured_at = excluded.configured_at,
                category_names = excluded.category_names,
                options = excluded.options
            "#,
            (
                site_url,
                next_position,
                feature.url.as_str(),
                feature.feature_type.as_deref(),
                feature.identifier.as_deref(),
                feature.version.as_deref(),
                feature.enabled,
                now,
                category_names,
                options,
            ),
        )?;

        tx.commit()?;
        debug!("Configured {} on {}", feature.url, site_url);
        Ok(())
    }

    /// Exclude a feature from the candidate pool. Returns false if unknown.
    pub fn disable(&self, url: &Url) -> Result<bool, SiteError> {
        let conn = self.lock_conn()?;
        let changed = conn.execute(
            "UPDATE features SET enabled = 0 WHERE site_url = ?1 AND url = ?2",
            (self.url.as_str(), url.as_str()),
        )?;
        Ok(changed > 0)
    }

    pub fn add_category(&self, category: &Category) -> Result<(), SiteError> {
        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT INTO categories (site_url, name, label, description)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(site_url, name) DO UPDATE SET
                label = excluded.label,
                description = excluded.description
            "#,
            (
                self.url.as_str(),
                &category.name,
                &category.label,
                category.description.as_deref(),
            ),
        )?;
        Ok(())
    }

    /// Copy the settings, categories and features of `site` into this store
    pub fn import(&self, site: &StaticSite) -> Result<usize, SiteError> {
        self.configure_site(&SiteSettings {
            default_feature_type: site.default_feature_type(),
            configured: site.is_configured(),
        })?;
        for category in site.categories() {
            self.add_category(category)?;
        }
        for feature in site.features() {
            self.configure(feature)?;
        }
        info!(
            "Imported {} features from {} into {}",
            site.features().len(),
            site.url(),
            self.url
        );
        Ok(site.features().len())
    }

    /// Enabled features ordered by position
    pub fn configured_features(&self) -> Result<Vec<ConfiguredFeature>, SiteError> {
        let rows = {
            let conn = self.lock_conn()?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM features WHERE site_url = ?1 AND enabled = 1 ORDER BY position",
                FEATURE_COLUMNS
            ))?;
            let rows = stmt
                .query_map([self.url.as_str()], read_feature_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let mut features = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(feature) = decode_feature(row)? {
                features.push(feature);
            }
        }
        Ok(features)
    }

    /// A stored feature at `url`, enabled or not
    pub fn feature(&self, url: &Url) -> Result<Option<ConfiguredFeature>, SiteError> {
        let row = {
            let conn = self.lock_conn()?;
            conn.query_row(
                &format!(
                    "SELECT {} FROM features WHERE site_url = ?1 AND url = ?2",
                    FEATURE_COLUMNS
                ),
                (self.url.as_str(), url.as_str()),
                read_feature_row,
            )
            .optional()?
        };

        match row {
            Some(row) => decode_feature(row),
            None => Ok(None),
        }
    }

    fn lookup_category(&self, name: &str) -> Result<Option<Category>, SiteError> {
        let conn = self.lock_conn()?;
        let category = conn
            .query_row(
                "SELECT name, label, description FROM categories WHERE site_url = ?1 AND name = ?2",
                (self.url.as_str(), name),
                |row| {
                    Ok(Category {
                        name: row.get(0)?,
                        label: row.get(1)?,
                        description: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(category)
    }

    fn handle(&self) -> Result<Arc<dyn Site>, SiteError> {
        let site: Arc<dyn Site> = self.this.upgrade().ok_or(SiteError::Gone)?;
        Ok(site)
    }
}

fn read_feature_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FeatureRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

/// Rows with an unparseable URL are skipped
fn decode_feature(row: FeatureRow) -> Result<Option<ConfiguredFeature>, SiteError> {
    let (url, feature_type, identifier, version, category_names, options, enabled) = row;

    let url = match Url::parse(&url) {
        Ok(url) => url,
        Err(e) => {
            warn!("Skipping stored feature with invalid URL {}: {}", url, e);
            return Ok(None);
        }
    };
    let options = options
        .as_deref()
        .map(serde_json::from_str::<ReferenceOptions>)
        .transpose()?;

    Ok(Some(ConfiguredFeature {
        url,
        feature_type,
        identifier,
        version,
        category_names: category_names
            .split(CATEGORY_SEPARATOR)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
        options,
        enabled,
    }))
}

#[async_trait::async_trait]
impl Site for SiteStore {
    fn url(&self) -> Url {
        self.url.clone()
    }

    fn default_feature_type(&self) -> String {
        match self.settings() {
            Ok(settings) => settings.default_feature_type,
            Err(e) => {
                warn!("Failed to read settings of {}: {}", self.url, e);
                DEFAULT_FEATURE_TYPE.to_string()
            }
        }
    }

    fn category(&self, name: &str) -> Option<Category> {
        self.lookup_category(name)
            .inspect_err(|e| warn!("Failed to look up category {}: {}", name, e))
            .unwrap_or(None)
    }

    fn reference_to(&self, url: &Url) -> Result<FeatureReference, SiteError> {
        let site = self.handle()?;
        Ok(match self.feature(url)? {
            Some(feature) => feature.to_reference(site),
            None => FeatureReference::new(site, url.clone()),
        })
    }

    async fn configured_candidates(&self) -> Result<Option<Vec<FeatureReference>>, SiteError> {
        let site = self.handle()?;
        if !self.settings()?.configured {
            return Ok(None);
        }
        let features = self.configured_features()?;
        Ok(Some(
            features
                .iter()
                .map(|f| f.to_reference(Arc::clone(&site)))
                .collect(),
        ))
    }
}
