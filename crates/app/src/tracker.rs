//! Owns the registries, their stores and the statement session.
//!
//! Every registry mutation is validated on a copy, saved, swapped in and then
//! pushed through the session before the call returns. A failed validation or
//! save leaves the in-memory registry as it was.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use feetrack_core::{
    Category, CategoryRegistry, NameMapping, NameRegistry, Transaction, TransactionId,
    TransactionPatch,
};
use feetrack_import::mappings::{apply_import, export_csv};
use feetrack_import::{export_workbook, IdentityResolver, ImportReport, MappingSource};
use feetrack_storage::{CategoryStore, EditLog, NameStore, SidecarStore};

use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::session::{RegistryKind, RestoreReport, Session, StatementSource};
use crate::summary;

/// What the caller learns when a statement is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenReport {
    pub transactions: Vec<Transaction>,
    /// When edits for a statement of this name were last saved, if ever.
    /// The caller decides whether to call [`Tracker::restore_saved_edits`].
    pub saved_edits: Option<DateTime<Utc>>,
}

pub struct Tracker {
    categories: CategoryRegistry,
    category_store: CategoryStore,
    names: NameRegistry,
    name_store: NameStore,
    sidecars: SidecarStore,
    session: Session,
    currency_symbol: String,
    pending_edits: Option<EditLog>,
}

impl Tracker {
    /// Load (or seed) both registries from the data directory.
    pub fn open(data_dir: &Path, config: &TrackerConfig) -> Result<Self, TrackerError> {
        let category_store = CategoryStore::new(config.categories_path(data_dir));
        let categories = category_store.load_or_create()?;
        let mut name_store = NameStore::new(config.names_path(data_dir));
        let names = name_store.load_or_create()?;

        Ok(Self {
            categories,
            category_store,
            names,
            name_store,
            sidecars: SidecarStore::new(config.edits_path(data_dir)),
            session: Session::new(IdentityResolver::new(config.collision_policy)),
            currency_symbol: config.currency_symbol.clone(),
            pending_edits: None,
        })
    }

    pub fn categories(&self) -> &CategoryRegistry {
        &self.categories
    }

    pub fn names(&self) -> &NameRegistry {
        &self.names
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn transactions(&self) -> &[Transaction] {
        self.session.transactions()
    }

    // ── Categories ───────────────────────────────────────────────────────────

    pub fn add_category(&mut self, category: Category) -> Result<(), TrackerError> {
        let mut next = self.categories.clone();
        next.add(category)?;
        self.commit_categories(next)
    }

    pub fn edit_category(&mut self, name: &str, replacement: Category) -> Result<(), TrackerError> {
        let mut next = self.categories.clone();
        next.edit(name, replacement)?;
        self.commit_categories(next)
    }

    pub fn remove_category(&mut self, name: &str) -> Result<Category, TrackerError> {
        let mut next = self.categories.clone();
        let removed = next.remove(name)?;
        self.commit_categories(next)?;
        Ok(removed)
    }

    fn commit_categories(&mut self, next: CategoryRegistry) -> Result<(), TrackerError> {
        self.category_store.save(&next)?;
        self.categories = next;
        self.session
            .on_registry_changed(RegistryKind::Categories, &self.categories, &self.names);
        tracing::info!(count = self.categories.len(), "categories updated");
        Ok(())
    }

    // ── Names ────────────────────────────────────────────────────────────────

    pub fn add_mapping(&mut self, short_name: &str, full_name: &str) -> Result<(), TrackerError> {
        let mut next = self.names.clone();
        next.add(short_name, full_name)?;
        self.commit_names(next)
    }

    pub fn edit_mapping(&mut self, short_name: &str, full_name: &str) -> Result<(), TrackerError> {
        let mut next = self.names.clone();
        next.edit(short_name, full_name)?;
        self.commit_names(next)
    }

    pub fn rename_mapping(&mut self, short_name: &str, new_short_name: &str) -> Result<(), TrackerError> {
        let mut next = self.names.clone();
        next.rename(short_name, new_short_name)?;
        self.commit_names(next)
    }

    pub fn remove_mapping(&mut self, short_name: &str) -> Result<NameMapping, TrackerError> {
        let mut next = self.names.clone();
        let removed = next.remove(short_name)?;
        self.commit_names(next)?;
        Ok(removed)
    }

    /// Merge a two-column file into the registry. Nothing is saved when the
    /// import changes nothing.
    pub fn import_mappings(&mut self, source: &MappingSource) -> Result<ImportReport, TrackerError> {
        let rows = source.rows()?;
        let mut next = self.names.clone();
        let report = apply_import(&mut next, &rows);
        if report.added + report.updated > 0 {
            self.commit_names(next)?;
        }
        Ok(report)
    }

    pub fn export_mappings<W: Write>(&self, writer: W) -> Result<(), TrackerError> {
        export_csv(&self.names, writer).map_err(|e| TrackerError::Import(e.into()))
    }

    /// The same two columns as [`Tracker::export_mappings`], as `.xlsx` bytes.
    pub fn export_mappings_workbook(&self) -> Result<Vec<u8>, TrackerError> {
        Ok(export_workbook(&self.names)?)
    }

    fn commit_names(&mut self, next: NameRegistry) -> Result<(), TrackerError> {
        self.name_store.save(&next)?;
        self.names = next;
        self.session
            .on_registry_changed(RegistryKind::Names, &self.categories, &self.names);
        tracing::info!(count = self.names.len(), "name mappings updated");
        Ok(())
    }

    pub fn unmapped_short_names(&self) -> Vec<String> {
        self.session.unmapped_short_names(&self.names)
    }

    // ── Statement ────────────────────────────────────────────────────────────

    /// Ingest a statement and report whether saved edits exist for it.
    pub fn open_statement(&mut self, source: &StatementSource) -> Result<OpenReport, TrackerError> {
        let transactions = self
            .session
            .ingest(source, &self.categories, &self.names)?
            .to_vec();
        self.pending_edits = match self.sidecars.load(&source.file_name) {
            Ok(log) => log,
            Err(e) => {
                tracing::warn!(file = %source.file_name, error = %e, "ignoring unreadable saved edits");
                None
            }
        };
        Ok(OpenReport {
            transactions,
            saved_edits: self.pending_edits.as_ref().map(|log| log.saved_at),
        })
    }

    pub fn restore_saved_edits(&mut self) -> Result<RestoreReport, TrackerError> {
        let log = match self.pending_edits.take() {
            Some(log) => log,
            None => {
                let file_name = self
                    .session
                    .statement()
                    .map(|s| s.file_name.clone())
                    .ok_or(TrackerError::NoStatement)?;
                return Err(TrackerError::NoSavedEdits(file_name));
            }
        };
        self.session.restore_edits(log, &self.categories, &self.names)
    }

    pub fn save_edits(&mut self) -> Result<PathBuf, TrackerError> {
        let path = self.session.persist_edits(&self.sidecars)?;
        self.pending_edits = None;
        Ok(path)
    }

    /// Drop the saved edits for the open statement. Returns whether any existed.
    pub fn discard_saved_edits(&mut self) -> Result<bool, TrackerError> {
        self.pending_edits = None;
        let file_name = self
            .session
            .statement()
            .map(|s| s.file_name.clone())
            .ok_or(TrackerError::NoStatement)?;
        Ok(self.sidecars.remove(&file_name)?)
    }

    pub fn edit_transaction(
        &mut self,
        id: &TransactionId,
        patch: TransactionPatch,
    ) -> Result<&Transaction, TrackerError> {
        Ok(self.session.edit(id, patch, &self.categories, &self.names)?)
    }

    pub fn delete_transaction(&mut self, id: &TransactionId) -> Result<Transaction, TrackerError> {
        Ok(self.session.delete(id)?)
    }

    pub fn duplicate_transaction(&mut self, id: &TransactionId) -> Result<&Transaction, TrackerError> {
        Ok(self.session.duplicate(id)?)
    }

    /// Plain-text summary of the open statement.
    pub fn summary(&self) -> String {
        summary::render(
            self.session.statement().map(|s| s.file_name.as_str()),
            &self.session.by_category(&self.categories),
            &self.currency_symbol,
        )
    }
}
