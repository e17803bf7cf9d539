//! Per-call options of document operations.
//!
//! Each struct maps onto the query parameters of its endpoint. `Default`
//! matches the server's own defaults, with revision checking switched on.

use arangodb_core::Request;

pub(crate) const DIRTY_READ_HEADER: &str = "x-arango-allow-dirty-read";

/// Options for reads (`get`, `has`)
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Expected revision; overrides a `_rev` in a body reference
    pub rev: Option<String>,
    /// Compare the known revision against the stored document
    pub check_rev: bool,
    /// Allow reads from followers in a cluster
    pub allow_dirty_read: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            rev: None,
            check_rev: true,
            allow_dirty_read: false,
        }
    }
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rev(mut self, rev: impl Into<String>) -> Self {
        self.rev = Some(rev.into());
        self
    }

    pub fn check_rev(mut self, check_rev: bool) -> Self {
        self.check_rev = check_rev;
        self
    }

    pub fn allow_dirty_read(mut self, allow: bool) -> Self {
        self.allow_dirty_read = allow;
        self
    }

    pub(crate) fn apply(&self, request: Request) -> Request {
        if self.allow_dirty_read {
            request.header(DIRTY_READ_HEADER, "true")
        } else {
            request
        }
    }
}

/// Behaviour when an inserted key already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteMode {
    Replace,
    Update,
    Ignore,
    Conflict,
}

impl OverwriteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverwriteMode::Replace => "replace",
            OverwriteMode::Update => "update",
            OverwriteMode::Ignore => "ignore",
            OverwriteMode::Conflict => "conflict",
        }
    }
}

/// Options for `insert` and `insert_many`
#[derive(Debug, Clone, Default)]
pub struct InsertOptions {
    pub return_new: bool,
    pub return_old: bool,
    pub sync: Option<bool>,
    pub silent: bool,
    pub overwrite: bool,
    pub overwrite_mode: Option<OverwriteMode>,
    /// Keep `null` fields (update-insert only)
    pub keep_null: Option<bool>,
    /// Merge sub-objects (update-insert only)
    pub merge_objects: Option<bool>,
}

impl InsertOptions {
    pub(crate) fn apply(&self, request: Request) -> Request {
        request
            .param("returnNew", self.return_new)
            .param("returnOld", self.return_old)
            .param("silent", self.silent)
            .param("overwrite", self.overwrite)
            .param_opt("waitForSync", self.sync)
            .param_opt("overwriteMode", self.overwrite_mode.map(|m| m.as_str()))
            .param_opt("keepNull", self.keep_null)
            .param_opt("mergeObjects", self.merge_objects)
    }
}

/// Options for `update` and `update_many`
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    pub check_rev: bool,
    pub merge_objects: bool,
    pub keep_null: bool,
    pub return_new: bool,
    pub return_old: bool,
    pub sync: Option<bool>,
    pub silent: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            check_rev: true,
            merge_objects: true,
            keep_null: true,
            return_new: false,
            return_old: false,
            sync: None,
            silent: false,
        }
    }
}

impl UpdateOptions {
    pub(crate) fn apply(&self, request: Request) -> Request {
        request
            .param("keepNull", self.keep_null)
            .param("mergeObjects", self.merge_objects)
            .param("returnNew", self.return_new)
            .param("returnOld", self.return_old)
            .param("ignoreRevs", !self.check_rev)
            .param("overwrite", !self.check_rev)
            .param("silent", self.silent)
            .param_opt("waitForSync", self.sync)
    }
}

/// Options for `replace` and `replace_many`
#[derive(Debug, Clone)]
pub struct ReplaceOptions {
    pub check_rev: bool,
    pub return_new: bool,
    pub return_old: bool,
    pub sync: Option<bool>,
    pub silent: bool,
}

impl Default for ReplaceOptions {
    fn default() -> Self {
        Self {
            check_rev: true,
            return_new: false,
            return_old: false,
            sync: None,
            silent: false,
        }
    }
}

impl ReplaceOptions {
    pub(crate) fn apply(&self, request: Request) -> Request {
        request
            .param("returnNew", self.return_new)
            .param("returnOld", self.return_old)
            .param("ignoreRevs", !self.check_rev)
            .param("overwrite", !self.check_rev)
            .param("silent", self.silent)
            .param_opt("waitForSync", self.sync)
    }
}

/// Options for `delete` and `delete_many`
#[derive(Debug, Clone)]
pub struct DeleteOptions {
    pub rev: Option<String>,
    pub check_rev: bool,
    /// Return `None` instead of failing when the document is missing
    pub ignore_missing: bool,
    pub return_old: bool,
    pub sync: Option<bool>,
    pub silent: bool,
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self {
            rev: None,
            check_rev: true,
            ignore_missing: false,
            return_old: false,
            sync: None,
            silent: false,
        }
    }
}

impl DeleteOptions {
    pub(crate) fn apply(&self, request: Request) -> Request {
        request
            .param("returnOld", self.return_old)
            .param("ignoreRevs", !self.check_rev)
            .param("overwrite", !self.check_rev)
            .param("silent", self.silent)
            .param_opt("waitForSync", self.sync)
    }
}

/// Which fields an export keeps or drops
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldFilter {
    Include(Vec<String>),
    Exclude(Vec<String>),
}

/// Options for `Collection::export`
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub limit: Option<u64>,
    pub count: bool,
    pub batch_size: Option<u32>,
    pub flush: bool,
    pub flush_wait: Option<u64>,
    pub ttl: Option<u64>,
    pub filter: Option<FieldFilter>,
}

/// Options for `Database::query`
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub count: bool,
    pub batch_size: Option<u32>,
    pub ttl: Option<u64>,
    pub full_count: Option<bool>,
    pub profile: Option<bool>,
    pub max_warning_count: Option<u32>,
    pub allow_dirty_read: bool,
}
