//! Multi-step install/remove transactions with compensating rollback.
//!
//! A transaction records actions while it is being built and applies them
//! in insertion order on commit. `commit` consumes the transaction, so the
//! building phase ends at the type level the moment a commit starts. On the
//! first failing action, every action that already succeeded is undone in
//! reverse order: an install by a remove, a remove by a reinstall pinned to
//! the version captured just before the removal (unpinned when the version
//! could not be determined). Rollback runs to completion even when
//! individual compensations fail; the resulting error reports both the
//! trigger and every failed compensation.

use std::fmt;

use crate::error::{Error, Result};
use crate::ui::prelude::*;

/// One pending operation in a transaction. Insertion order is commit order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Install { name: String, version: Option<String> },
    Remove { name: String },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Install { name, version: Some(version) } => {
                write!(f, "install {name} {version}")
            }
            Action::Install { name, version: None } => write!(f, "install {name}"),
            Action::Remove { name } => write!(f, "remove {name}"),
        }
    }
}

/// The facade surface a transaction commits against.
pub trait PackageOps {
    fn install(&self, name: &str, version: Option<&str>) -> Result<()>;
    fn remove(&self, name: &str) -> Result<()>;
    /// Best-effort currently-installed version, used to pin rollback
    /// reinstalls. `None` when it cannot be determined.
    fn installed_version(&self, name: &str) -> Option<String>;
}

/// A compensating action that itself failed during rollback.
#[derive(Debug, Clone)]
pub struct RollbackFailure {
    pub action: Action,
    pub reason: String,
}

/// Commit failure: the triggering action, its error, and whatever went
/// wrong while rolling back.
#[derive(Debug)]
pub struct TransactionError {
    pub failed: Action,
    pub source: Box<Error>,
    pub rollback_failures: Vec<RollbackFailure>,
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transaction failed at `{}`: {}", self.failed, self.source)?;
        if !self.rollback_failures.is_empty() {
            let failed: Vec<String> = self
                .rollback_failures
                .iter()
                .map(|failure| format!("`{}` ({})", failure.action, failure.reason))
                .collect();
            write!(f, "; rollback incomplete: {}", failed.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for TransactionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.source)
    }
}

/// Records pending actions and commits them all-or-nothing.
pub struct Transaction<'a, P: PackageOps> {
    ops: &'a P,
    actions: Vec<Action>,
}

impl<'a, P: PackageOps> Transaction<'a, P> {
    pub fn new(ops: &'a P) -> Self {
        Self {
            ops,
            actions: Vec::new(),
        }
    }

    pub fn add_install(&mut self, name: &str, version: Option<&str>) {
        self.actions.push(Action::Install {
            name: name.to_string(),
            version: version.map(str::to_string),
        });
    }

    pub fn add_remove(&mut self, name: &str) {
        self.actions.push(Action::Remove {
            name: name.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Apply every action in insertion order. Returns the number of applied
    /// actions, or rolls back and reports on the first failure.
    pub fn commit(self) -> Result<usize> {
        let mut undo_stack: Vec<Action> = Vec::new();
        for action in &self.actions {
            if let Err(err) = self.apply(action, &mut undo_stack) {
                let rollback_failures = self.rollback(&undo_stack);
                return Err(Error::Transaction(TransactionError {
                    failed: action.clone(),
                    source: Box::new(err),
                    rollback_failures,
                }));
            }
        }
        Ok(self.actions.len())
    }

    fn apply(&self, action: &Action, undo_stack: &mut Vec<Action>) -> Result<()> {
        match action {
            Action::Install { name, version } => {
                self.ops.install(name, version.as_deref())?;
                undo_stack.push(Action::Remove { name: name.clone() });
            }
            Action::Remove { name } => {
                // Captured before the removal so the compensation can pin.
                let previous = self.ops.installed_version(name);
                self.ops.remove(name)?;
                undo_stack.push(Action::Install {
                    name: name.clone(),
                    version: previous,
                });
            }
        }
        Ok(())
    }

    /// Undo already-applied actions in reverse order, attempting every
    /// compensation even when some fail.
    fn rollback(&self, undo_stack: &[Action]) -> Vec<RollbackFailure> {
        if !undo_stack.is_empty() {
            emit(
                Level::Warn,
                "tx.rollback",
                &format!("Rolling back {} applied action(s)", undo_stack.len()),
                None,
            );
        }
        let mut failures = Vec::new();
        for action in undo_stack.iter().rev() {
            let outcome = match action {
                Action::Install { name, version } => self.ops.install(name, version.as_deref()),
                Action::Remove { name } => self.ops.remove(name),
            };
            if let Err(err) = outcome {
                failures.push(RollbackFailure {
                    action: action.clone(),
                    reason: err.to_string(),
                });
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Scripted facade stand-in: records every call and fails on command.
    #[derive(Default)]
    struct ScriptedOps {
        fail_install_of: Option<String>,
        fail_remove_of: Option<String>,
        versions: HashMap<String, String>,
        log: RefCell<Vec<String>>,
    }

    impl ScriptedOps {
        fn log_entry(&self, entry: String) {
            self.log.borrow_mut().push(entry);
        }

        fn calls(&self) -> Vec<String> {
            self.log.borrow().clone()
        }
    }

    impl PackageOps for ScriptedOps {
        fn install(&self, name: &str, version: Option<&str>) -> Result<()> {
            self.log_entry(match version {
                Some(v) => format!("install {name} {v}"),
                None => format!("install {name}"),
            });
            if self.fail_install_of.as_deref() == Some(name) {
                return Err(Error::ExternalCommand {
                    command: format!("install {name}"),
                    code: 1,
                    stderr: "scripted failure".to_string(),
                });
            }
            Ok(())
        }

        fn remove(&self, name: &str) -> Result<()> {
            self.log_entry(format!("remove {name}"));
            if self.fail_remove_of.as_deref() == Some(name) {
                return Err(Error::ExternalCommand {
                    command: format!("remove {name}"),
                    code: 1,
                    stderr: "scripted failure".to_string(),
                });
            }
            Ok(())
        }

        fn installed_version(&self, name: &str) -> Option<String> {
            self.versions.get(name).cloned()
        }
    }

    fn expect_transaction_error(result: Result<usize>) -> TransactionError {
        match result {
            Err(Error::Transaction(err)) => err,
            other => panic!("expected TransactionError, got {other:?}"),
        }
    }

    #[test]
    fn test_commit_applies_in_insertion_order() {
        let ops = ScriptedOps::default();
        let mut tx = Transaction::new(&ops);
        tx.add_install("git", None);
        tx.add_install("docker", Some("5.0"));
        tx.add_remove("apache2");

        assert_eq!(tx.commit().unwrap(), 3);
        assert_eq!(
            ops.calls(),
            vec!["install git", "install docker 5.0", "remove apache2"]
        );
    }

    #[test]
    fn test_failure_rolls_back_in_reverse_and_stops() {
        let ops = ScriptedOps {
            fail_install_of: Some("b".to_string()),
            ..Default::default()
        };
        let mut tx = Transaction::new(&ops);
        tx.add_install("a", None);
        tx.add_install("b", None);
        tx.add_remove("c");

        let err = expect_transaction_error(tx.commit());
        assert_eq!(
            err.failed,
            Action::Install { name: "b".to_string(), version: None }
        );
        assert!(err.rollback_failures.is_empty());
        // a was installed, b failed, a was compensated; c was never touched.
        assert_eq!(ops.calls(), vec!["install a", "install b", "remove a"]);
    }

    #[test]
    fn test_remove_rollback_reinstalls_at_captured_version() {
        let mut versions = HashMap::new();
        versions.insert("apache2".to_string(), "2.4.58".to_string());
        let ops = ScriptedOps {
            fail_install_of: Some("docker".to_string()),
            versions,
            ..Default::default()
        };
        let mut tx = Transaction::new(&ops);
        tx.add_remove("apache2");
        tx.add_install("docker", None);

        let err = expect_transaction_error(tx.commit());
        assert_eq!(err.rollback_failures.len(), 0);
        assert_eq!(
            ops.calls(),
            vec!["remove apache2", "install docker", "install apache2 2.4.58"]
        );
    }

    #[test]
    fn test_remove_rollback_without_known_version_is_unpinned() {
        let ops = ScriptedOps {
            fail_install_of: Some("docker".to_string()),
            ..Default::default()
        };
        let mut tx = Transaction::new(&ops);
        tx.add_remove("apache2");
        tx.add_install("docker", None);

        expect_transaction_error(tx.commit());
        assert_eq!(
            ops.calls(),
            vec!["remove apache2", "install docker", "install apache2"]
        );
    }

    #[test]
    fn test_rollback_failures_are_reported_and_do_not_abort_rollback() {
        let ops = ScriptedOps {
            fail_install_of: Some("c".to_string()),
            // The compensating remove of "a" will fail too.
            fail_remove_of: Some("a".to_string()),
            ..Default::default()
        };
        let mut tx = Transaction::new(&ops);
        tx.add_install("a", None);
        tx.add_install("b", None);
        tx.add_install("c", None);

        let err = expect_transaction_error(tx.commit());
        assert_eq!(err.failed, Action::Install { name: "c".to_string(), version: None });
        assert_eq!(err.rollback_failures.len(), 1);
        assert_eq!(
            err.rollback_failures[0].action,
            Action::Remove { name: "a".to_string() }
        );
        // Both compensations were attempted despite the failure of one.
        assert_eq!(
            ops.calls(),
            vec!["install a", "install b", "install c", "remove b", "remove a"]
        );
        assert!(err.to_string().contains("rollback incomplete"));
    }

    #[test]
    fn test_empty_transaction_commits_trivially() {
        let ops = ScriptedOps::default();
        let tx = Transaction::new(&ops);
        assert!(tx.is_empty());
        assert_eq!(tx.commit().unwrap(), 0);
        assert!(ops.calls().is_empty());
    }
}
