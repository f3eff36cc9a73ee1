use feetrack_core::{Category, CategoryRegistry, Transaction, UNCATEGORIZED};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification<'a> {
    /// A category whose fee equals the amount exactly.
    Fixed(&'a Category),
    /// No fee matched; the variable-fee category took it.
    Variable(&'a Category),
    /// No fee matched and there is no variable-fee category.
    Uncategorized,
}

impl Classification<'_> {
    pub fn name(&self) -> &str {
        match self {
            Classification::Fixed(c) | Classification::Variable(c) => &c.name,
            Classification::Uncategorized => UNCATEGORIZED,
        }
    }
}

/// Assigns categories by exact amount match against a registry.
pub struct AmountClassifier<'a> {
    registry: &'a CategoryRegistry,
}

impl<'a> AmountClassifier<'a> {
    pub fn new(registry: &'a CategoryRegistry) -> Self {
        Self { registry }
    }

    pub fn classify(&self, amount: Decimal) -> Classification<'a> {
        if let Some(category) = self.registry.by_fee(amount) {
            return Classification::Fixed(category);
        }
        match self.registry.wildcard() {
            Some(category) => Classification::Variable(category),
            None => Classification::Uncategorized,
        }
    }

    /// Re-classify every transaction in place. Returns how many changed.
    pub fn apply(&self, transactions: &mut [Transaction]) -> usize {
        let mut changed = 0;
        for tx in transactions.iter_mut() {
            let category = self.classify(tx.amount).name().to_string();
            if category != tx.category {
                tx.category = category;
                changed += 1;
            }
        }
        changed
    }

    /// Re-classify only transactions whose category is no longer in the
    /// registry. Registry categories and `Uncategorized` are left alone.
    pub fn reclassify_unknown(&self, transactions: &mut [Transaction]) -> usize {
        let mut changed = 0;
        for tx in transactions.iter_mut() {
            if tx.category == UNCATEGORIZED || self.registry.get(&tx.category).is_some() {
                continue;
            }
            tx.category = self.classify(tx.amount).name().to_string();
            changed += 1;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feetrack_core::{Origin, TransactionId};
    use rust_decimal_macros::dec;

    fn tx(id: &str, amount: Decimal) -> Transaction {
        Transaction {
            id: TransactionId::from(id),
            date: "01-04-2024".into(),
            description: "UPI/JOHND/transfer".into(),
            reference: String::new(),
            amount,
            raw_short_name: "JOHND".into(),
            resolved_name: "John Doe".into(),
            category: String::new(),
            origin: Origin::Statement,
        }
    }

    #[test]
    fn exact_fee_match() {
        let registry = CategoryRegistry::new(vec![Category::fixed("Piano", dec!(502))]).unwrap();
        let classifier = AmountClassifier::new(&registry);
        assert_eq!(classifier.classify(dec!(502.00)).name(), "Piano");
        assert!(matches!(classifier.classify(dec!(502.00)), Classification::Fixed(_)));
    }

    #[test]
    fn no_tolerance() {
        let registry = CategoryRegistry::with_defaults();
        let classifier = AmountClassifier::new(&registry);
        assert_eq!(classifier.classify(dec!(501.99)).name(), "Donations");
        assert!(matches!(classifier.classify(dec!(501.99)), Classification::Variable(_)));
    }

    #[test]
    fn without_wildcard_falls_back_to_uncategorized() {
        let registry = CategoryRegistry::new(vec![Category::fixed("Piano", dec!(502))]).unwrap();
        let classifier = AmountClassifier::new(&registry);
        assert_eq!(classifier.classify(dec!(999.00)), Classification::Uncategorized);
        assert_eq!(classifier.classify(dec!(999.00)).name(), "Uncategorized");
    }

    #[test]
    fn apply_is_idempotent() {
        let registry = CategoryRegistry::with_defaults();
        let classifier = AmountClassifier::new(&registry);
        let mut txs = vec![tx("a", dec!(502)), tx("b", dec!(750.00)), tx("c", dec!(42))];

        assert_eq!(classifier.apply(&mut txs), 3);
        let first: Vec<String> = txs.iter().map(|t| t.category.clone()).collect();
        assert_eq!(first, vec!["Namasankeerthanam", "Rishabhaa Class", "Donations"]);

        assert_eq!(classifier.apply(&mut txs), 0);
        let second: Vec<String> = txs.iter().map(|t| t.category.clone()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn reclassify_unknown_keeps_known_and_manual_choices() {
        let registry = CategoryRegistry::with_defaults();
        let classifier = AmountClassifier::new(&registry);
        let mut txs = vec![tx("a", dec!(502)), tx("b", dec!(502)), tx("c", dec!(750)), tx("d", dec!(42))];
        txs[0].category = "Shloka Class".into();
        txs[1].category = "Guitar".into();
        txs[2].category = UNCATEGORIZED.into();
        txs[3].category = "Old Donations".into();

        assert_eq!(classifier.reclassify_unknown(&mut txs), 2);
        let categories: Vec<&str> = txs.iter().map(|t| t.category.as_str()).collect();
        assert_eq!(
            categories,
            vec!["Shloka Class", "Namasankeerthanam", UNCATEGORIZED, "Donations"]
        );
        assert_eq!(classifier.reclassify_unknown(&mut txs), 0);
    }
}
