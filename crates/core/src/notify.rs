//! User notification and confirmation, injected into [`GridSession`](crate::GridSession).

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Loaded(usize),
    LoadFailed(String),
    NothingToSave,
    Invalid(String),
    Saved(String),
    SaveFailed(String),
    NothingSelected,
    Deleted(usize),
    DeleteFailed(String),
}

impl Notice {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Notice::LoadFailed(_)
                | Notice::Invalid(_)
                | Notice::SaveFailed(_)
                | Notice::DeleteFailed(_)
        )
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Loaded(n) => write!(f, "loaded {n} row(s)"),
            Notice::LoadFailed(e) => write!(f, "failed to load rows: {e}"),
            Notice::NothingToSave => f.write_str("no changes to save"),
            Notice::Invalid(msg) => f.write_str(msg),
            Notice::Saved(msg) => write!(f, "saved: {msg}"),
            Notice::SaveFailed(e) => write!(f, "save failed: {e}"),
            Notice::NothingSelected => f.write_str("select the rows to delete"),
            Notice::Deleted(n) => write!(f, "deleted {n} row(s)"),
            Notice::DeleteFailed(e) => write!(f, "delete failed: {e}"),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);

    /// Asks the user to confirm a destructive action.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Reports notices through `tracing` and answers confirmations with a fixed policy.
#[derive(Clone, Debug, Default)]
pub struct LogNotifier {
    assume_yes: bool,
}

impl LogNotifier {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, notice: &Notice) {
        if notice.is_failure() {
            tracing::warn!("{}", notice);
        } else {
            tracing::info!("{}", notice);
        }
    }

    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            tracing::info!("{} yes (assumed)", prompt);
        } else {
            tracing::warn!("{} no (pass --yes to confirm)", prompt);
        }
        self.assume_yes
    }
}
