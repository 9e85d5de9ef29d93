//! Read-only ledger state access for validators

/// Hands out state snapshots
#[cfg_attr(test, mockall::automock)]
pub trait StateFetcher: Send + Sync {
    fn fetch_state(&self) -> anyhow::Result<Box<dyn State>>;
}

/// A state snapshot; release it with [`State::done`]
#[cfg_attr(test, mockall::automock)]
pub trait State: Send {
    fn get_state(&self, namespace: &str, key: &str) -> anyhow::Result<Option<Vec<u8>>>;

    fn done(&mut self);
}
