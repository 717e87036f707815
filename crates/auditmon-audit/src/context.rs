use auditmon_common::types::ChangeItem;
use std::collections::HashMap;

/// Current items of the support technologies, indexed for lookup by
/// (technology, account). Built from the same slurp cycle that feeds
/// the audit pass; checks match inside the returned slice by name.
#[derive(Default)]
pub struct SupportIndex {
    by_tech_account: HashMap<(String, String), Vec<ChangeItem>>,
}

impl SupportIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index copies of the given items.
    pub fn from_items(items: &[ChangeItem]) -> Self {
        let mut index = Self::new();
        for item in items {
            index.insert(item.clone());
        }
        index
    }

    pub fn insert(&mut self, item: ChangeItem) {
        self.by_tech_account
            .entry((item.index.clone(), item.account.clone()))
            .or_default()
            .push(item);
    }

    /// Current items of one technology in one account.
    pub fn items(&self, technology: &str, account: &str) -> &[ChangeItem] {
        self.by_tech_account
            .get(&(technology.to_string(), account.to_string()))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

/// Read-only state handed to every check invocation.
pub struct AuditContext<'a> {
    support: &'a SupportIndex,
}

impl<'a> AuditContext<'a> {
    pub fn new(support: &'a SupportIndex) -> Self {
        Self { support }
    }

    /// The explicit read-time join: current items of a support
    /// technology for one account.
    pub fn support_items(&self, technology: &str, account: &str) -> &[ChangeItem] {
        self.support.items(technology, account)
    }
}
