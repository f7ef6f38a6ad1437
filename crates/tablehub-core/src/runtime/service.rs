// crates/tablehub-core/src/runtime/service.rs
// ============================================================================
// Module: Tablehub Table Service
// Description: Request-level facade over resolution, queries, and caching.
// Purpose: Give the HTTP layer one entry point per user-facing operation.
// Dependencies: crate::core, crate::interfaces, crate::runtime
// ============================================================================

//! ## Overview
//! [`TableService`] accepts raw, already URL-unescaped path components and a
//! typed [`Requester`] from the session layer. Every component is validated
//! first; rejections are recorded as validation audit events, with bot
//! template placeholders flagged as noise.
//!
//! Read operations always resolve through the [`VersionResolver`], so a
//! private database is refused before any object is fetched. Chart data is
//! the only cached response: the database is resolved (and authorized) on
//! every call, then the serialized body is looked up by fingerprint. Cache
//! failures degrade to an uncached response rather than an error.
//!
//! Row caps: anonymous requesters get the anonymous cap; logged-in users get
//! their stored preference, or the default, never above the configured
//! maximum. Projections are capped separately by the chart limit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use crate::core::audit::AccessAuditEvent;
use crate::core::audit::AccessOutcome;
use crate::core::audit::AuditSink;
use crate::core::audit::CacheAuditEvent;
use crate::core::audit::CacheOutcome;
use crate::core::audit::ValidationAuditEvent;
use crate::core::error::TablehubError;
use crate::core::export::render_csv;
use crate::core::fingerprint::FingerprintInput;
use crate::core::identifiers::DatabaseName;
use crate::core::identifiers::IdentifierError;
use crate::core::identifiers::Requester;
use crate::core::identifiers::TableName;
use crate::core::identifiers::UserName;
use crate::core::identifiers::VersionSelector;
use crate::core::query::ChartParams;
use crate::core::query::DEFAULT_ROW_CAP;
use crate::core::query::PROJECTION_MAX_ROWS;
use crate::core::query::QueryError;
use crate::core::query::QuerySpec;
use crate::core::query::RowSet;
use crate::core::records::DatabaseRecord;
use crate::core::records::DatabaseSummary;
use crate::core::records::Visibility;
use crate::interfaces::MetadataStore;
use crate::interfaces::ObjectHandle;
use crate::interfaces::ObjectStore;
use crate::interfaces::ResultCache;
use crate::interfaces::TableEngine;
use crate::runtime::resolver::VersionResolver;
use crate::runtime::upload::UploadPipeline;
use crate::runtime::upload::UploadRequest;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Default result cache TTL.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);
/// Default upper bound for a user's row cap preference.
pub const DEFAULT_MAX_USER_MAX_ROWS: u32 = 500;

/// Row caps and cache lifetime applied by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceLimits {
    /// Row cap for anonymous requesters.
    pub anonymous_max_rows: u32,
    /// Row cap for users without a stored preference.
    pub default_user_max_rows: u32,
    /// Largest row cap a user may choose.
    pub max_user_max_rows: u32,
    /// Row cap for chart projections.
    pub chart_max_rows: u32,
    /// Lifetime of cached chart responses.
    pub cache_ttl: Duration,
}

impl Default for ServiceLimits {
    fn default() -> Self {
        Self {
            anonymous_max_rows: DEFAULT_ROW_CAP,
            default_user_max_rows: DEFAULT_ROW_CAP,
            max_user_max_rows: DEFAULT_MAX_USER_MAX_ROWS,
            chart_max_rows: PROJECTION_MAX_ROWS,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

// ============================================================================
// SECTION: Requests and Responses
// ============================================================================

/// Raw path components naming one database version.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatabaseRequest<'a> {
    /// Owner name.
    pub owner: &'a str,
    /// Database name.
    pub database: &'a str,
    /// Version tag; empty or `0` means latest.
    pub version: &'a str,
}

/// Raw parameters of a table view.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableViewRequest<'a> {
    /// Target database version.
    pub target: DatabaseRequest<'a>,
    /// Table name; empty selects the first table.
    pub table: &'a str,
}

/// Raw parameters of a chart data request. Charts always read the latest version.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChartRequest<'a> {
    /// Owner name.
    pub owner: &'a str,
    /// Database name.
    pub database: &'a str,
    /// Table name; empty selects the first table.
    pub table: &'a str,
    /// Column and filter parameters.
    pub params: ChartParams<'a>,
}

/// CSV export of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    /// Exported table name.
    pub table: String,
    /// CSV document.
    pub body: String,
}

/// Raw database download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// Record of the downloaded version.
    pub record: DatabaseRecord,
    /// File bytes.
    pub bytes: Vec<u8>,
}

/// Star state after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarState {
    /// True when the requester now stars the database.
    pub starred: bool,
    /// Number of users starring the database.
    pub count: u64,
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Backends shared by the service and its upload pipeline.
pub struct ServiceBackends {
    /// Metadata backend.
    pub metadata: Arc<dyn MetadataStore>,
    /// Object backend.
    pub objects: Arc<dyn ObjectStore>,
    /// Embedded table engine.
    pub engine: Arc<dyn TableEngine>,
    /// Result cache for chart responses.
    pub cache: Arc<dyn ResultCache>,
    /// Audit sink.
    pub audit: Arc<dyn AuditSink>,
}

/// Request-level facade over every Tablehub operation.
pub struct TableService {
    /// Metadata backend.
    metadata: Arc<dyn MetadataStore>,
    /// Object backend.
    objects: Arc<dyn ObjectStore>,
    /// Embedded table engine.
    engine: Arc<dyn TableEngine>,
    /// Result cache for chart responses.
    cache: Arc<dyn ResultCache>,
    /// Audit sink.
    audit: Arc<dyn AuditSink>,
    /// Version resolver.
    resolver: VersionResolver,
    /// Upload pipeline.
    uploads: UploadPipeline,
    /// Row caps and cache lifetime.
    limits: ServiceLimits,
}

impl TableService {
    /// Creates a service over the given backends and upload pipeline.
    #[must_use]
    pub fn new(backends: ServiceBackends, uploads: UploadPipeline, limits: ServiceLimits) -> Self {
        Self {
            resolver: VersionResolver::new(Arc::clone(&backends.metadata)),
            metadata: backends.metadata,
            objects: backends.objects,
            engine: backends.engine,
            cache: backends.cache,
            audit: backends.audit,
            uploads,
            limits,
        }
    }

    /// Returns the configured limits.
    #[must_use]
    pub const fn limits(&self) -> &ServiceLimits {
        &self.limits
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Returns a capped full dump of one table.
    ///
    /// # Errors
    ///
    /// Returns [`TablehubError`] when validation, resolution, or the query fails.
    pub fn table_view(
        &self,
        request: &TableViewRequest<'_>,
        requester: &Requester,
    ) -> Result<RowSet, TablehubError> {
        let table = self.optional_table(request.table)?;
        let (_, handle) = self.open("table_view", &request.target, requester)?;
        let row_cap = self.row_cap_for(requester)?;
        let spec = QuerySpec::full_dump(table, Some(row_cap));
        Ok(self.engine.execute(&handle, &spec)?)
    }

    /// Returns the serialized two-column projection of the latest version.
    ///
    /// # Errors
    ///
    /// Returns [`TablehubError`] when validation, resolution, or the query fails.
    pub fn chart_data(
        &self,
        request: &ChartRequest<'_>,
        requester: &Requester,
    ) -> Result<Arc<[u8]>, TablehubError> {
        let owner = self.checked(UserName::parse(request.owner))?;
        let database = self.checked(DatabaseName::parse(request.database))?;
        let table = self.optional_table(request.table)?;
        let shape = self.checked_query(request.params.to_shape())?;
        let record = self.resolve(
            "chart_data",
            &owner,
            &database,
            VersionSelector::Latest,
            requester,
        )?;
        let fingerprint = FingerprintInput {
            owner: &owner,
            database: &database,
            version: record.version,
            table: table.as_ref(),
            shape: &shape,
            requester,
        }
        .fingerprint();

        match self.cache.get(&fingerprint) {
            Ok(Some(body)) => {
                self.audit.record_cache(&CacheAuditEvent::new(CacheOutcome::Hit, fingerprint.as_str()));
                return Ok(body);
            }
            Ok(None) => {
                self.audit.record_cache(&CacheAuditEvent::new(CacheOutcome::Miss, fingerprint.as_str()));
            }
            Err(_) => {
                self.audit.record_cache(&CacheAuditEvent::new(CacheOutcome::Error, fingerprint.as_str()));
            }
        }

        let handle = self.objects.open_for_read(&record.locator)?;
        let spec = QuerySpec {
            table,
            shape,
            row_cap: Some(self.limits.chart_max_rows),
        };
        let rows = self.engine.execute(&handle, &spec)?;
        drop(handle);
        let body = rows.to_json_bytes().map_err(|err| TablehubError::Internal(err.to_string()))?;
        let body: Arc<[u8]> = Arc::from(body);
        let outcome = match self.cache.put(fingerprint.clone(), body.to_vec(), self.limits.cache_ttl) {
            Ok(()) => CacheOutcome::Store,
            Err(_) => CacheOutcome::Error,
        };
        self.audit.record_cache(&CacheAuditEvent::new(outcome, fingerprint.as_str()));
        Ok(body)
    }

    /// Exports every row of one table as CSV.
    ///
    /// # Errors
    ///
    /// Returns [`TablehubError`] when validation, resolution, or the read fails.
    pub fn csv_export(
        &self,
        request: &TableViewRequest<'_>,
        requester: &Requester,
    ) -> Result<CsvExport, TablehubError> {
        let table = self.optional_table(request.table)?;
        let (_, handle) = self.open("csv_export", &request.target, requester)?;
        let rows = self.engine.export(&handle, table.as_ref())?;
        Ok(CsvExport {
            body: render_csv(&rows),
            table: rows.table,
        })
    }

    /// Returns the raw bytes of one database version.
    ///
    /// # Errors
    ///
    /// Returns [`TablehubError`] when validation, resolution, or the read fails.
    pub fn download(
        &self,
        request: &DatabaseRequest<'_>,
        requester: &Requester,
    ) -> Result<Download, TablehubError> {
        let (record, handle) = self.open("download", request, requester)?;
        Ok(Download {
            record,
            bytes: handle.into_bytes(),
        })
    }

    /// Lists an owner's databases visible to the requester.
    ///
    /// # Errors
    ///
    /// Returns [`TablehubError`] when validation or the metadata lookup fails.
    pub fn list_databases(
        &self,
        owner: &str,
        requester: &Requester,
    ) -> Result<Vec<DatabaseSummary>, TablehubError> {
        let owner = self.checked(UserName::parse(owner))?;
        let mut summaries = Vec::new();
        for record in self.metadata.list_databases(&owner)? {
            if !record.readable_by(requester) {
                continue;
            }
            let stars = self.metadata.star_count(&record.owner, &record.name)?;
            summaries.push(DatabaseSummary {
                owner: record.owner,
                name: record.name,
                latest_version: record.version,
                size_bytes: record.size_bytes,
                visibility: record.visibility,
                stars,
            });
        }
        Ok(summaries)
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    /// Uploads a new version of a database owned by the requester.
    ///
    /// # Errors
    ///
    /// Returns [`TablehubError::AccessDenied`] for anonymous requesters and
    /// the upload pipeline's errors otherwise.
    pub fn upload(
        &self,
        requester: &Requester,
        database: &str,
        bytes: &[u8],
        public: bool,
        content_type: Option<&str>,
    ) -> Result<DatabaseRecord, TablehubError> {
        let owner = requester.user().ok_or(TablehubError::AccessDenied)?;
        self.uploads.upload(&UploadRequest {
            owner,
            database,
            bytes,
            visibility: Visibility::from_public_flag(public),
            content_type,
        })
    }

    /// Changes the visibility of every version of a database.
    ///
    /// # Errors
    ///
    /// Returns [`TablehubError::AccessDenied`] unless the requester is the
    /// owner and [`TablehubError::NotFound`] when the database does not exist.
    pub fn set_visibility(
        &self,
        owner: &str,
        database: &str,
        visibility: Visibility,
        requester: &Requester,
    ) -> Result<(), TablehubError> {
        let owner = self.checked(UserName::parse(owner))?;
        let database = self.checked(DatabaseName::parse(database))?;
        if !requester.is(&owner) {
            self.audit.record_access(&AccessAuditEvent::new(
                "set_visibility",
                requester,
                &owner,
                &database,
                AccessOutcome::Denied,
            ));
            return Err(TablehubError::AccessDenied);
        }
        Ok(self.metadata.set_visibility(&owner, &database, visibility)?)
    }

    /// Toggles the requester's star on a readable database.
    ///
    /// # Errors
    ///
    /// Returns [`TablehubError::AccessDenied`] for anonymous requesters or
    /// unreadable databases.
    pub fn toggle_star(
        &self,
        owner: &str,
        database: &str,
        requester: &Requester,
    ) -> Result<StarState, TablehubError> {
        let user = requester.user().ok_or(TablehubError::AccessDenied)?;
        let owner = self.checked(UserName::parse(owner))?;
        let database = self.checked(DatabaseName::parse(database))?;
        self.resolve("toggle_star", &owner, &database, VersionSelector::Latest, requester)?;
        let starred = self.metadata.toggle_star(user, &owner, &database)?;
        let count = self.metadata.star_count(&owner, &database)?;
        Ok(StarState {
            starred,
            count,
        })
    }

    /// Returns the star count of a readable database.
    ///
    /// # Errors
    ///
    /// Returns [`TablehubError`] when validation or resolution fails.
    pub fn star_count(
        &self,
        owner: &str,
        database: &str,
        requester: &Requester,
    ) -> Result<u64, TablehubError> {
        let owner = self.checked(UserName::parse(owner))?;
        let database = self.checked(DatabaseName::parse(database))?;
        self.resolve("star_count", &owner, &database, VersionSelector::Latest, requester)?;
        Ok(self.metadata.star_count(&owner, &database)?)
    }

    /// Returns the users starring a readable database.
    ///
    /// # Errors
    ///
    /// Returns [`TablehubError`] when validation or resolution fails.
    pub fn stargazers(
        &self,
        owner: &str,
        database: &str,
        requester: &Requester,
    ) -> Result<Vec<UserName>, TablehubError> {
        let owner = self.checked(UserName::parse(owner))?;
        let database = self.checked(DatabaseName::parse(database))?;
        self.resolve("stargazers", &owner, &database, VersionSelector::Latest, requester)?;
        Ok(self.metadata.stargazers(&owner, &database)?)
    }

    /// Stores the requester's row cap preference.
    ///
    /// # Errors
    ///
    /// Returns [`TablehubError::AccessDenied`] for anonymous requesters and
    /// [`TablehubError::InvalidFormat`] for values outside the allowed range.
    pub fn set_max_rows(&self, requester: &Requester, max_rows: u32) -> Result<(), TablehubError> {
        let user = requester.user().ok_or(TablehubError::AccessDenied)?;
        if max_rows == 0 || max_rows > self.limits.max_user_max_rows {
            return Err(TablehubError::InvalidFormat(format!(
                "max rows must be between 1 and {}",
                self.limits.max_user_max_rows
            )));
        }
        Ok(self.metadata.set_user_max_rows(user, max_rows)?)
    }

    /// Returns the full-dump row cap applied to a requester.
    ///
    /// # Errors
    ///
    /// Returns [`TablehubError`] when the preference lookup fails.
    pub fn row_cap_for(&self, requester: &Requester) -> Result<u32, TablehubError> {
        let Some(user) = requester.user() else {
            return Ok(self.limits.anonymous_max_rows);
        };
        let preferred =
            self.metadata.user_max_rows(user)?.unwrap_or(self.limits.default_user_max_rows);
        Ok(preferred.clamp(1, self.limits.max_user_max_rows))
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Validates a database request, resolves it, and opens its object.
    fn open(
        &self,
        operation: &'static str,
        request: &DatabaseRequest<'_>,
        requester: &Requester,
    ) -> Result<(DatabaseRecord, ObjectHandle), TablehubError> {
        let owner = self.checked(UserName::parse(request.owner))?;
        let database = self.checked(DatabaseName::parse(request.database))?;
        let selector = self.checked(VersionSelector::parse(request.version))?;
        let record = self.resolve(operation, &owner, &database, selector, requester)?;
        let handle = self.objects.open_for_read(&record.locator)?;
        Ok((record, handle))
    }

    /// Resolves a version, recording refused and missing lookups.
    fn resolve(
        &self,
        operation: &'static str,
        owner: &UserName,
        database: &DatabaseName,
        selector: VersionSelector,
        requester: &Requester,
    ) -> Result<DatabaseRecord, TablehubError> {
        self.resolver.resolve_record(owner, database, selector, requester).inspect_err(|err| {
            let outcome = match err {
                TablehubError::AccessDenied => AccessOutcome::Denied,
                TablehubError::NotFound | TablehubError::VersionNotFound => AccessOutcome::NotFound,
                _ => return,
            };
            self.audit.record_access(&AccessAuditEvent::new(
                operation, requester, owner, database, outcome,
            ));
        })
    }

    /// Validates an optional table name; empty selects the first table.
    fn optional_table(&self, raw: &str) -> Result<Option<TableName>, TablehubError> {
        if raw.is_empty() {
            return Ok(None);
        }
        self.checked(TableName::parse(raw)).map(Some)
    }

    /// Records a validation event for rejected identifiers.
    fn checked<T>(&self, result: Result<T, IdentifierError>) -> Result<T, TablehubError> {
        result.map_err(|err| {
            self.audit.record_validation(&ValidationAuditEvent::from_error(&err));
            TablehubError::from(err)
        })
    }

    /// Records a validation event for rejected query identifiers.
    fn checked_query<T>(&self, result: Result<T, QueryError>) -> Result<T, TablehubError> {
        result.map_err(|err| {
            if let QueryError::Identifier(inner) = &err {
                self.audit.record_validation(&ValidationAuditEvent::from_error(inner));
            }
            TablehubError::from(err)
        })
    }
}
