//! Plain-text fee summary, one block per category.

use std::fmt;

use feetrack_core::Money;

use crate::session::CategoryGroup;

const WIDTH: usize = 80;

/// The report for one statement. Render it with `to_string()`.
pub struct Summary<'a> {
    pub file_name: Option<&'a str>,
    pub groups: &'a [CategoryGroup<'a>],
    pub symbol: &'a str,
}

impl Summary<'_> {
    fn heading(&self, group: &CategoryGroup<'_>) -> String {
        match group.category.and_then(|c| c.fee) {
            Some(fee) => format!("{} ({})", group.name, Money::from_decimal(fee).format_with(self.symbol)),
            None if group.category.is_some() => format!("{} (any amount)", group.name),
            None => group.name.to_string(),
        }
    }
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(WIDTH);
        let thin = "-".repeat(WIDTH);

        writeln!(f, "{rule}")?;
        writeln!(f, "FEE SUMMARY")?;
        if let Some(name) = self.file_name {
            writeln!(f, "Statement: {name}")?;
        }
        writeln!(f, "{rule}")?;

        for group in self.groups {
            writeln!(f)?;
            writeln!(f, "{}", self.heading(group))?;
            writeln!(f, "{thin}")?;
            writeln!(
                f,
                "{} {} | Subtotal: {}",
                group.len(),
                if group.len() == 1 { "entry" } else { "entries" },
                group.total().format_with(self.symbol)
            )?;
            for tx in &group.transactions {
                writeln!(
                    f,
                    "  {:<30} {:>14}  {}",
                    tx.resolved_name,
                    tx.money().format_with(self.symbol),
                    tx.date
                )?;
            }
        }

        let grand: Money = self.groups.iter().map(|g| g.total()).sum();
        let count: usize = self.groups.iter().map(|g| g.len()).sum();
        writeln!(f)?;
        writeln!(f, "{rule}")?;
        writeln!(f, "GRAND TOTAL: {} ({count} entries)", grand.format_with(self.symbol))?;
        writeln!(f, "{rule}")
    }
}

pub fn render(file_name: Option<&str>, groups: &[CategoryGroup<'_>], symbol: &str) -> String {
    Summary {
        file_name,
        groups,
        symbol,
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Session, StatementSource};
    use feetrack_core::{Category, CategoryRegistry, NameRegistry};
    use rust_decimal_macros::dec;

    #[test]
    fn groups_subtotals_and_grand_total() {
        let categories = CategoryRegistry::new(vec![
            Category::fixed("Piano", dec!(502)),
            Category::fixed("Veena", dec!(503)),
            Category::variable("Donations"),
        ])
        .unwrap();
        let names = NameRegistry::from_pairs([("JOHND", "John Doe")]).unwrap();
        let mut session = Session::default();
        session
            .ingest(
                &StatementSource::csv(
                    "apr.csv",
                    "Txn Date,Description,Credit\n\
                     01-04-2024,UPI/JOHND/x,502.00\n\
                     02-04-2024,UPI/KASI/x,502.00\n\
                     03-04-2024,UPI/ZED/x,1000.50\n",
                ),
                &categories,
                &names,
            )
            .unwrap();

        let text = render(Some("apr.csv"), &session.by_category(&categories), "Rs.");
        assert!(text.contains("Statement: apr.csv"));
        assert!(text.contains("Piano (Rs.502.00)\n"));
        assert!(text.contains("2 entries | Subtotal: Rs.1004.00"));
        assert!(text.contains("Veena (Rs.503.00)\n"));
        assert!(text.contains("0 entries | Subtotal: Rs.0.00"));
        assert!(text.contains("Donations (any amount)\n"));
        assert!(text.contains("1 entry | Subtotal: Rs.1000.50"));
        assert!(text.contains("GRAND TOTAL: Rs.2004.50 (3 entries)"));

        let piano = text.find("Piano (").unwrap();
        let donations = text.find("Donations (").unwrap();
        let john = text.find("John Doe").unwrap();
        assert!(piano < john && john < donations);
        assert!(!text.contains(feetrack_core::UNCATEGORIZED));
    }

    #[test]
    fn summary_writes_into_any_formatter() {
        let summary = Summary {
            file_name: Some("may.csv"),
            groups: &[],
            symbol: "$",
        };
        let text = format!("{summary}");
        assert_eq!(text, render(Some("may.csv"), &[], "$"));
        assert!(text.ends_with(&format!("GRAND TOTAL: $0.00 (0 entries)\n{}\n", "=".repeat(WIDTH))));
    }

    #[test]
    fn empty_session() {
        let text = render(None, &[], "₹");
        assert!(!text.contains("Statement:"));
        assert!(text.contains("GRAND TOTAL: ₹0.00 (0 entries)"));
    }
}
