use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use crate::core::catalog::Catalog;
use crate::core::error::{Error, ErrorKind, Result};
use crate::query::ast::Constraint;
use crate::schema::record::RecordKind;
use crate::tree::applier::PropertyUpdate;

/// Transaction ID generator
static TRANSACTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Where a transaction is in its Delete, Insert, Update sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Begin,
    Deleting,
    Inserting,
    Updating,
    Committed,
    Failed,
}

/// How an Update rewrites its targets.
#[derive(Debug, Clone)]
pub enum UpdateMode {
    Replace(RecordKind),
    Properties(Vec<PropertyUpdate>),
}

#[derive(Debug, Clone)]
pub enum Action {
    Delete { constraint: Constraint },
    Insert { document: RecordKind },
    /// Without a constraint only `Replace` is allowed; it targets the record
    /// carrying the replacement's identifier.
    Update { constraint: Option<Constraint>, mode: UpdateMode },
}

impl Action {
    pub fn delete(constraint: Constraint) -> Self {
        Action::Delete { constraint }
    }

    pub fn insert(document: RecordKind) -> Self {
        Action::Insert { document }
    }

    pub fn replace(constraint: Option<Constraint>, document: RecordKind) -> Self {
        Action::Update {
            constraint,
            mode: UpdateMode::Replace(document),
        }
    }

    pub fn update_properties(constraint: Constraint, updates: Vec<PropertyUpdate>) -> Self {
        Action::Update {
            constraint: Some(constraint),
            mode: UpdateMode::Properties(updates),
        }
    }

    fn phase(&self) -> TransactionState {
        match self {
            Action::Delete { .. } => TransactionState::Deleting,
            Action::Insert { .. } => TransactionState::Inserting,
            Action::Update { .. } => TransactionState::Updating,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Action::Delete { .. } => "Delete",
            Action::Insert { .. } => "Insert",
            Action::Update { .. } => "Update",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub total_deleted: usize,
    pub total_inserted: usize,
    pub total_updated: usize,
    pub inserted_identifiers: Vec<String>,
}

/// Runs the actions of one transaction phase by phase.
///
/// There is no rollback: when an action fails the transaction stops, and
/// whatever earlier actions committed stays committed.
pub struct TransactionCoordinator<'c> {
    pub id: u64,
    state: TransactionState,
    catalog: &'c Catalog,
    summary: TransactionSummary,
}

impl<'c> TransactionCoordinator<'c> {
    pub fn begin(catalog: &'c Catalog) -> Self {
        TransactionCoordinator {
            id: TRANSACTION_ID_COUNTER.fetch_add(1, Ordering::SeqCst),
            state: TransactionState::Begin,
            catalog,
            summary: TransactionSummary::default(),
        }
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn execute(mut self, actions: Vec<Action>) -> Result<TransactionSummary> {
        let mut ordered: Vec<(usize, Action)> = actions.into_iter().enumerate().collect();
        // stable, so each phase keeps submission order
        ordered.sort_by_key(|(_, action)| action.phase() as u8);

        for (position, action) in ordered {
            self.state = action.phase();
            let label = action.label();
            if let Err(err) = self.run(action) {
                self.state = TransactionState::Failed;
                warn!(
                    transaction = self.id,
                    action = position + 1,
                    kind = label,
                    error = %err,
                    "transaction action failed"
                );
                return Err(err.within(&format!("{} action #{}", label, position + 1)));
            }
        }

        self.state = TransactionState::Committed;
        info!(
            transaction = self.id,
            deleted = self.summary.total_deleted,
            inserted = self.summary.total_inserted,
            updated = self.summary.total_updated,
            "transaction committed"
        );
        Ok(self.summary)
    }

    fn run(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Delete { constraint } => {
                for identifier in self.catalog.resolve_targets(&constraint)? {
                    if self.catalog.delete_record(&identifier) {
                        self.summary.total_deleted += 1;
                    }
                }
                Ok(())
            }
            Action::Insert { document } => {
                let identifier = self.catalog.insert_document(document)?;
                self.summary.total_inserted += 1;
                self.summary.inserted_identifiers.push(identifier);
                Ok(())
            }
            Action::Update { constraint: None, mode: UpdateMode::Replace(document) } => {
                let identifier = document.tree().identifier().ok_or_else(|| {
                    Error::new(
                        ErrorKind::InvalidArgument,
                        "a replacement without a constraint must carry an identifier".to_string(),
                    )
                })?;
                self.catalog.replace_record(&identifier, document)?;
                self.summary.total_updated += 1;
                Ok(())
            }
            Action::Update { constraint: None, mode: UpdateMode::Properties(_) } => Err(Error::new(
                ErrorKind::InvalidArgument,
                "a property update needs a target constraint".to_string(),
            )),
            Action::Update { constraint: Some(constraint), mode } => self.update_matching(&constraint, &mode),
        }
    }

    /// Every matched record is attempted; the first failure is reported
    /// once all of them have been.
    fn update_matching(&mut self, constraint: &Constraint, mode: &UpdateMode) -> Result<()> {
        let targets = self.catalog.resolve_targets(constraint)?;
        debug!(transaction = self.id, targets = targets.len(), "resolved update targets");

        let mut first_error = None;
        for identifier in targets {
            let outcome = match mode {
                UpdateMode::Replace(document) => self.catalog.replace_record(&identifier, document.clone()),
                UpdateMode::Properties(updates) => self.catalog.update_properties(&identifier, updates),
            };
            match outcome {
                Ok(_) => self.summary.total_updated += 1,
                Err(err) => {
                    warn!(transaction = self.id, identifier = %identifier, error = %err, "record not updated");
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
