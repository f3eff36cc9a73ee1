//! One loaded statement and the user's edits to it.
//!
//! `Empty → Loaded → Edited → Saved`. Registries are passed in by the caller
//! on every call that needs them; the session never holds on to them.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Utc;
use feetrack_core::{
    Category, CategoryRegistry, Money, NameRegistry, NotFoundError, Origin, Transaction,
    TransactionId, TransactionPatch, UNCATEGORIZED,
};
use feetrack_import::{
    extract_short_name, is_workbook_path, parse_statement, read_workbook, AmountClassifier,
    IdentityResolver, Sheet, StatementContent, StatementRow,
};
use feetrack_storage::{fingerprint, EditLog, SidecarStore, StatementRef};

use crate::error::TrackerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Loaded,
    Edited,
    Saved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryKind {
    Names,
    Categories,
}

/// A statement file as handed to the session: its name and its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementSource {
    pub file_name: String,
    pub content: StatementContent,
}

impl StatementSource {
    pub fn csv(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content: StatementContent::Csv(bytes.into()),
        }
    }

    pub fn sheet(file_name: impl Into<String>, sheet: Sheet) -> Self {
        Self {
            file_name: file_name.into(),
            content: StatementContent::Sheet(sheet),
        }
    }

    /// Read a statement from disk: a workbook by extension, CSV otherwise.
    /// The file name is the path's last component.
    pub fn read(path: &Path) -> Result<Self, TrackerError> {
        let bytes = std::fs::read(path).map_err(|source| TrackerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        if is_workbook_path(path) {
            return Ok(Self::sheet(file_name, read_workbook(&bytes)?));
        }
        Ok(Self::csv(file_name, bytes))
    }

    pub fn fingerprint(&self) -> String {
        match &self.content {
            StatementContent::Csv(bytes) => fingerprint(bytes),
            StatementContent::Sheet(sheet) => {
                let mut buf = Vec::new();
                for row in &sheet.rows {
                    for cell in row {
                        buf.extend_from_slice(cell.as_bytes());
                        buf.push(0x1f);
                    }
                    buf.push(0x1e);
                }
                fingerprint(&buf)
            }
        }
    }
}

/// Outcome of reconciling saved edits with a freshly ingested statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Saved transactions put back into the set.
    pub restored: usize,
    /// Fresh rows the saved edits knew nothing about.
    pub added: usize,
    /// Saved transactions whose statement row no longer exists.
    pub orphaned: Vec<Transaction>,
    pub statement_changed: bool,
}

/// Transactions sharing one category name, for totals and the summary.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryGroup<'a> {
    pub name: &'a str,
    /// `None` for `Uncategorized` and for names no longer in the registry.
    pub category: Option<&'a Category>,
    pub transactions: Vec<&'a Transaction>,
}

impl CategoryGroup<'_> {
    pub fn total(&self) -> Money {
        self.transactions.iter().map(|t| t.money()).sum()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchField {
    #[default]
    All,
    Name,
    Amount,
    Category,
    Description,
}

impl SearchField {
    fn matches(self, tx: &Transaction, needle: &str) -> bool {
        let hit = |s: &str| s.to_lowercase().contains(needle);
        match self {
            SearchField::Name => hit(&tx.resolved_name) || hit(&tx.raw_short_name),
            SearchField::Amount => hit(&tx.amount.to_string()),
            SearchField::Category => hit(&tx.category),
            SearchField::Description => hit(&tx.description),
            SearchField::All => [
                SearchField::Name,
                SearchField::Amount,
                SearchField::Category,
                SearchField::Description,
            ]
            .iter()
            .any(|f| f.matches(tx, needle)),
        }
    }
}

impl FromStr for SearchField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(SearchField::All),
            "name" => Ok(SearchField::Name),
            "amount" => Ok(SearchField::Amount),
            "category" => Ok(SearchField::Category),
            "description" => Ok(SearchField::Description),
            other => Err(format!("unknown search field '{other}'")),
        }
    }
}

struct LoadedStatement {
    statement: StatementRef,
    transactions: Vec<Transaction>,
    /// Statement-origin ids the user removed.
    deleted: Vec<TransactionId>,
}

pub struct Session {
    resolver: IdentityResolver,
    state: SessionState,
    loaded: Option<LoadedStatement>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(IdentityResolver::default())
    }
}

impl Session {
    pub fn new(resolver: IdentityResolver) -> Self {
        Self {
            resolver,
            state: SessionState::Empty,
            loaded: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn statement(&self) -> Option<&StatementRef> {
        self.loaded.as_ref().map(|l| &l.statement)
    }

    pub fn transactions(&self) -> &[Transaction] {
        self.loaded
            .as_ref()
            .map(|l| l.transactions.as_slice())
            .unwrap_or_default()
    }

    pub fn deleted(&self) -> &[TransactionId] {
        self.loaded
            .as_ref()
            .map(|l| l.deleted.as_slice())
            .unwrap_or_default()
    }

    pub fn get(&self, id: &TransactionId) -> Option<&Transaction> {
        self.transactions().iter().find(|t| &t.id == id)
    }

    /// Parse a statement and replace the held set with its classified credits.
    /// On error the previously loaded statement is kept as it was.
    pub fn ingest(
        &mut self,
        source: &StatementSource,
        categories: &CategoryRegistry,
        names: &NameRegistry,
    ) -> Result<&[Transaction], TrackerError> {
        let statement =
            parse_statement(&source.content).map_err(|source_err| TrackerError::Ingest {
                file_name: source.file_name.clone(),
                source: source_err,
            })?;

        let classifier = AmountClassifier::new(categories);
        let mut occurrences: HashMap<String, usize> = HashMap::new();
        let transactions: Vec<Transaction> = statement
            .credits()
            .map(|row| self.transaction_from_row(row, &mut occurrences, &classifier, names))
            .collect();

        tracing::info!(
            file = %source.file_name,
            rows = statement.rows.len(),
            credits = transactions.len(),
            header_line = ?statement.header_line,
            "ingested statement"
        );

        self.loaded = Some(LoadedStatement {
            statement: StatementRef {
                file_name: source.file_name.clone(),
                fingerprint: source.fingerprint(),
            },
            transactions,
            deleted: Vec::new(),
        });
        self.state = SessionState::Loaded;
        Ok(self.transactions())
    }

    fn transaction_from_row(
        &self,
        row: &StatementRow,
        occurrences: &mut HashMap<String, usize>,
        classifier: &AmountClassifier<'_>,
        names: &NameRegistry,
    ) -> Transaction {
        let amount = row.credit.unwrap_or_default();
        let amount_text = amount.normalize().to_string();

        // Identical rows in one statement are told apart by their position.
        let key = [
            row.date.as_str(),
            row.description.as_str(),
            row.reference.as_str(),
            amount_text.as_str(),
        ];
        let seen = occurrences.entry(key.join("\u{1f}")).or_insert(0);
        let occurrence = seen.to_string();
        *seen += 1;
        let id = TransactionId::derive(&[key[0], key[1], key[2], key[3], &occurrence]);

        let raw_short_name = extract_short_name(&row.description);
        let resolution = self.resolver.resolve(&raw_short_name, names);
        tracing::debug!(line = row.line, short_name = %raw_short_name, tier = ?resolution.tier, "resolved payer");

        Transaction {
            id,
            date: row.date.clone(),
            description: row.description.clone(),
            reference: row.reference.clone(),
            amount,
            raw_short_name,
            resolved_name: resolution.display_name,
            category: classifier.classify(amount).name().to_string(),
            origin: Origin::Statement,
        }
    }

    /// Re-derive names or categories for everything held. Returns how many
    /// transactions changed.
    pub fn on_registry_changed(
        &mut self,
        kind: RegistryKind,
        categories: &CategoryRegistry,
        names: &NameRegistry,
    ) -> usize {
        let Some(loaded) = self.loaded.as_mut() else {
            return 0;
        };
        let changed = match kind {
            RegistryKind::Names => self.resolver.apply(&mut loaded.transactions, names),
            RegistryKind::Categories => {
                AmountClassifier::new(categories).apply(&mut loaded.transactions)
            }
        };
        tracing::debug!(?kind, changed, "re-ran pipeline after registry change");
        changed
    }

    /// Apply a patch to one transaction. A new short name is re-resolved; a
    /// new amount without an explicit category is re-classified.
    pub fn edit(
        &mut self,
        id: &TransactionId,
        patch: TransactionPatch,
        categories: &CategoryRegistry,
        names: &NameRegistry,
    ) -> Result<&Transaction, NotFoundError> {
        if let Some(category) = &patch.category {
            if category != UNCATEGORIZED && categories.get(category).is_none() {
                return Err(NotFoundError::Category(category.clone()));
            }
        }
        let loaded = self
            .loaded
            .as_mut()
            .ok_or_else(|| NotFoundError::Transaction(id.clone()))?;
        let index = position(&loaded.transactions, id)?;
        if patch.is_empty() {
            return Ok(&loaded.transactions[index]);
        }

        let tx = &mut loaded.transactions[index];
        if let Some(date) = patch.date {
            tx.date = date;
        }
        if let Some(description) = patch.description {
            tx.description = description;
        }
        if let Some(raw) = patch.raw_short_name {
            tx.resolved_name = self.resolver.resolve(&raw, names).display_name;
            tx.raw_short_name = raw;
        }
        if let Some(amount) = patch.amount {
            tx.amount = amount;
        }
        match patch.category {
            Some(category) => tx.category = category,
            None if patch.amount.is_some() => {
                tx.category = AmountClassifier::new(categories)
                    .classify(tx.amount)
                    .name()
                    .to_string();
            }
            None => {}
        }

        tracing::debug!(id = %tx.id, "edited transaction");
        self.state = SessionState::Edited;
        Ok(tx)
    }

    pub fn delete(&mut self, id: &TransactionId) -> Result<Transaction, NotFoundError> {
        let loaded = self
            .loaded
            .as_mut()
            .ok_or_else(|| NotFoundError::Transaction(id.clone()))?;
        let index = position(&loaded.transactions, id)?;
        let removed = loaded.transactions.remove(index);
        if removed.origin == Origin::Statement {
            loaded.deleted.push(removed.id.clone());
        }
        self.state = SessionState::Edited;
        Ok(removed)
    }

    /// Copy a transaction; the copy lands right after the original.
    pub fn duplicate(&mut self, id: &TransactionId) -> Result<&Transaction, NotFoundError> {
        let loaded = self
            .loaded
            .as_mut()
            .ok_or_else(|| NotFoundError::Transaction(id.clone()))?;
        let index = position(&loaded.transactions, id)?;
        let copy = loaded.transactions[index].duplicate();
        loaded.transactions.insert(index + 1, copy);
        self.state = SessionState::Edited;
        Ok(&loaded.transactions[index + 1])
    }

    /// Snapshot of the current set as a sidecar document, stamped now.
    pub fn edit_log(&self) -> Option<EditLog> {
        self.loaded.as_ref().map(|l| EditLog {
            statement: l.statement.clone(),
            transactions: l.transactions.clone(),
            deleted: l.deleted.clone(),
            saved_at: Utc::now(),
        })
    }

    pub fn persist_edits(&mut self, store: &SidecarStore) -> Result<PathBuf, TrackerError> {
        let log = self.edit_log().ok_or(TrackerError::NoStatement)?;
        let path = store.save(&log)?;
        self.state = SessionState::Saved;
        Ok(path)
    }

    /// Bring back previously saved edits on top of the freshly ingested set.
    ///
    /// An unchanged statement takes the saved set as is. A changed one is
    /// reconciled by transaction id: saved versions win, deletions stick, new
    /// rows are kept and saved rows without a fresh counterpart are reported.
    pub fn restore_edits(
        &mut self,
        log: EditLog,
        categories: &CategoryRegistry,
        names: &NameRegistry,
    ) -> Result<RestoreReport, TrackerError> {
        let loaded = self.loaded.as_mut().ok_or(TrackerError::NoStatement)?;

        let report = if log.statement.fingerprint == loaded.statement.fingerprint {
            let restored = log.transactions.len();
            loaded.transactions = log.transactions;
            loaded.deleted = log.deleted;
            RestoreReport {
                restored,
                ..RestoreReport::default()
            }
        } else {
            reconcile(loaded, log)
        };

        // The registries may have changed since the edits were saved.
        let renamed = self.resolver.apply(&mut loaded.transactions, names);
        let reclassified = AmountClassifier::new(categories).reclassify_unknown(&mut loaded.transactions);
        if renamed + reclassified > 0 {
            tracing::debug!(renamed, reclassified, "brought restored edits up to date");
        }

        if !report.orphaned.is_empty() {
            tracing::warn!(
                file = %loaded.statement.file_name,
                orphaned = report.orphaned.len(),
                "saved edits refer to rows no longer in the statement"
            );
        }
        tracing::info!(
            file = %loaded.statement.file_name,
            restored = report.restored,
            added = report.added,
            statement_changed = report.statement_changed,
            "restored saved edits"
        );
        self.state = SessionState::Edited;
        Ok(report)
    }

    pub fn total(&self) -> Money {
        self.transactions().iter().map(|t| t.money()).sum()
    }

    /// Registry categories in order (even when empty), then `Uncategorized`
    /// and any other category names found on transactions.
    pub fn by_category<'a>(&'a self, categories: &'a CategoryRegistry) -> Vec<CategoryGroup<'a>> {
        let mut groups: Vec<CategoryGroup<'a>> = categories
            .iter()
            .map(|c| CategoryGroup {
                name: &c.name,
                category: Some(c),
                transactions: Vec::new(),
            })
            .collect();
        groups.push(CategoryGroup {
            name: UNCATEGORIZED,
            category: None,
            transactions: Vec::new(),
        });

        for tx in self.transactions() {
            match groups.iter_mut().find(|g| g.name == tx.category) {
                Some(group) => group.transactions.push(tx),
                None => groups.push(CategoryGroup {
                    name: &tx.category,
                    category: None,
                    transactions: vec![tx],
                }),
            }
        }
        groups.retain(|g| g.category.is_some() || !g.is_empty());
        groups
    }

    /// Case-insensitive substring search. A blank query matches everything.
    pub fn search(&self, query: &str, field: SearchField) -> Vec<&Transaction> {
        let needle = query.trim().to_lowercase();
        self.transactions()
            .iter()
            .filter(|tx| needle.is_empty() || field.matches(tx, &needle))
            .collect()
    }

    pub fn unmapped_short_names(&self, names: &NameRegistry) -> Vec<String> {
        self.resolver.unmapped_short_names(self.transactions(), names)
    }
}

fn position(transactions: &[Transaction], id: &TransactionId) -> Result<usize, NotFoundError> {
    transactions
        .iter()
        .position(|t| &t.id == id)
        .ok_or_else(|| NotFoundError::Transaction(id.clone()))
}

fn reconcile(loaded: &mut LoadedStatement, log: EditLog) -> RestoreReport {
    let fresh_ids: HashSet<TransactionId> =
        loaded.transactions.iter().map(|t| t.id.clone()).collect();
    let deleted: Vec<TransactionId> = log
        .deleted
        .into_iter()
        .filter(|id| fresh_ids.contains(id))
        .collect();

    // duplicate id -> id it was copied from
    let copied_from: HashMap<TransactionId, TransactionId> = log
        .transactions
        .iter()
        .filter_map(|t| match &t.origin {
            Origin::Duplicate { of } => Some((t.id.clone(), of.clone())),
            Origin::Statement => None,
        })
        .collect();
    let source_row = |id: &TransactionId| -> TransactionId {
        let mut current = id;
        for _ in 0..=copied_from.len() {
            match copied_from.get(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current.clone()
    };

    let mut saved: HashMap<TransactionId, Transaction> = HashMap::new();
    let mut copies: HashMap<TransactionId, Vec<Transaction>> = HashMap::new();
    let mut orphaned = Vec::new();
    for tx in log.transactions {
        if tx.origin == Origin::Statement {
            if fresh_ids.contains(&tx.id) {
                saved.insert(tx.id.clone(), tx);
            } else {
                orphaned.push(tx);
            }
        } else {
            let source = source_row(&tx.id);
            if fresh_ids.contains(&source) {
                copies.entry(source).or_default().push(tx);
            } else {
                orphaned.push(tx);
            }
        }
    }

    let mut report = RestoreReport {
        statement_changed: true,
        ..RestoreReport::default()
    };
    let fresh = std::mem::take(&mut loaded.transactions);
    for tx in fresh {
        let id = tx.id.clone();
        if !deleted.contains(&id) {
            match saved.remove(&id) {
                Some(edited) => {
                    report.restored += 1;
                    loaded.transactions.push(edited);
                }
                None => {
                    report.added += 1;
                    loaded.transactions.push(tx);
                }
            }
        }
        if let Some(list) = copies.remove(&id) {
            report.restored += list.len();
            loaded.transactions.extend(list);
        }
    }
    loaded.deleted = deleted;
    report.orphaned = orphaned;
    report
}
