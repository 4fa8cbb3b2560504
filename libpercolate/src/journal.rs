use crate::transaction::Transaction;
use indexmap::IndexSet;

use std::fmt;

/// Transactions of a journal and all the files it includes, in file order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Journal {
    transactions: Vec<Transaction>,
}

impl Journal {
    pub fn new() -> Journal {
        Journal {
            transactions: Vec::new(),
        }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn into_transactions(self) -> Vec<Transaction> {
        self.transactions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Transaction> {
        self.transactions.iter()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn top_level_accounts(&self) -> Vec<String> {
        top_level_accounts(&self.transactions)
    }
}

impl From<Vec<Transaction>> for Journal {
    fn from(transactions: Vec<Transaction>) -> Self {
        Journal { transactions }
    }
}

impl IntoIterator for Journal {
    type Item = Transaction;
    type IntoIter = std::vec::IntoIter<Transaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.transactions.into_iter()
    }
}

impl<'j> IntoIterator for &'j Journal {
    type Item = &'j Transaction;
    type IntoIter = std::slice::Iter<'j, Transaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.transactions.iter()
    }
}

/// First segment of every posting account (`Assets` for `Assets:Bank:Checking`),
/// each listed once, in order of first use.
pub fn top_level_accounts(transactions: &[Transaction]) -> Vec<String> {
    let categories: IndexSet<&str> = transactions
        .iter()
        .flat_map(|txn| txn.postings.iter())
        .filter_map(|posting| posting.account.trim().split(':').next())
        .collect();
    categories.into_iter().map(str::to_string).collect()
}

impl fmt::Display for Journal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, txn) in self.transactions.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}", txn)?;
        }
        Ok(())
    }
}
