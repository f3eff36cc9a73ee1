use std::sync::OnceLock;

use feetrack_core::{NameMapping, NameRegistry, Transaction};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::util::{collapse_whitespace, strip_whitespace, title_case};

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// Segments that sit between the rail marker and the payer name.
re!(re_direction, r"(?i)^(?:CR|DR|P2A|P2M)$");
re!(re_reference, r"\d");

// ── Short-name extraction ─────────────────────────────────────────────────────

struct PaymentRail {
    marker: &'static str,
    separators: &'static [char],
}

const RAILS: &[PaymentRail] = &[
    PaymentRail { marker: "UPI", separators: &['/'] },
    PaymentRail { marker: "IMPS", separators: &['/'] },
    PaymentRail { marker: "NEFT", separators: &['*', '-', '/'] },
];

/// Pull the payer token out of a statement description.
///
/// `UPI/CR/412345678901/SUNDARA P/SBIN/...` yields `SUNDARA P` and
/// `UPI/JOHND/transfer` yields `JOHND`. Without a recognised rail the whole
/// description is the candidate.
pub fn extract_short_name(description: &str) -> String {
    RAILS
        .iter()
        .find_map(|rail| payer_after_marker(description, rail))
        .unwrap_or_else(|| collapse_whitespace(description))
}

fn payer_after_marker(description: &str, rail: &PaymentRail) -> Option<String> {
    let segments: Vec<&str> = description.split(rail.separators).map(str::trim).collect();
    let start = segments
        .iter()
        .position(|s| s.eq_ignore_ascii_case(rail.marker))?;
    segments[start + 1..]
        .iter()
        .filter(|s| !s.is_empty())
        .find(|s| !re_direction().is_match(s) && !re_reference().is_match(s))
        .map(|s| collapse_whitespace(s))
}

// ── Resolution cascade ────────────────────────────────────────────────────────

/// Which key wins when several registry keys normalise to the same candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    #[default]
    FirstInserted,
    LastInserted,
}

/// One step of the cascade.
pub trait MatchTier {
    fn name(&self) -> &'static str;

    fn find<'r>(
        &self,
        candidate: &str,
        registry: &'r NameRegistry,
        policy: CollisionPolicy,
    ) -> Option<&'r NameMapping>;
}

/// Tier 1: byte-for-byte key match. Keys are unique so policy is irrelevant.
pub struct ExactTier;

impl MatchTier for ExactTier {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn find<'r>(
        &self,
        candidate: &str,
        registry: &'r NameRegistry,
        _policy: CollisionPolicy,
    ) -> Option<&'r NameMapping> {
        registry.iter().find(|m| m.short_name == candidate)
    }
}

/// Tiers 2–4: compare after normalising both sides.
pub struct NormalizedTier {
    name: &'static str,
    normalize: fn(&str) -> String,
}

impl NormalizedTier {
    pub const CASE_INSENSITIVE: NormalizedTier = NormalizedTier {
        name: "case-insensitive",
        normalize: fold_case,
    };
    pub const SPACE_REMOVED: NormalizedTier = NormalizedTier {
        name: "space-removed",
        normalize: strip_whitespace,
    };
    pub const SPACE_REMOVED_CASE_INSENSITIVE: NormalizedTier = NormalizedTier {
        name: "space-removed-case-insensitive",
        normalize: fold_and_strip,
    };
}

fn fold_case(s: &str) -> String {
    s.to_lowercase()
}

fn fold_and_strip(s: &str) -> String {
    strip_whitespace(&s.to_lowercase())
}

impl MatchTier for NormalizedTier {
    fn name(&self) -> &'static str {
        self.name
    }

    fn find<'r>(
        &self,
        candidate: &str,
        registry: &'r NameRegistry,
        policy: CollisionPolicy,
    ) -> Option<&'r NameMapping> {
        let wanted = (self.normalize)(candidate);
        let hit = |m: &&NameMapping| (self.normalize)(&m.short_name) == wanted;
        match policy {
            CollisionPolicy::FirstInserted => registry.iter().find(hit),
            CollisionPolicy::LastInserted => registry.iter().rev().find(hit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub display_name: String,
    /// Name of the tier that matched; `None` means the title-case fallback.
    pub tier: Option<&'static str>,
}

/// Ordered first-match-wins cascade from short name to display name.
pub struct IdentityResolver {
    tiers: Vec<Box<dyn MatchTier>>,
    policy: CollisionPolicy,
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new(CollisionPolicy::default())
    }
}

impl IdentityResolver {
    pub fn new(policy: CollisionPolicy) -> Self {
        Self::with_tiers(
            vec![
                Box::new(ExactTier),
                Box::new(NormalizedTier::CASE_INSENSITIVE),
                Box::new(NormalizedTier::SPACE_REMOVED),
                Box::new(NormalizedTier::SPACE_REMOVED_CASE_INSENSITIVE),
            ],
            policy,
        )
    }

    pub fn with_tiers(tiers: Vec<Box<dyn MatchTier>>, policy: CollisionPolicy) -> Self {
        Self { tiers, policy }
    }

    pub fn policy(&self) -> CollisionPolicy {
        self.policy
    }

    /// Resolve a short name. Never fails: unmatched names are title-cased.
    pub fn resolve(&self, short_name: &str, registry: &NameRegistry) -> Resolution {
        for tier in &self.tiers {
            if let Some(mapping) = tier.find(short_name, registry, self.policy) {
                return Resolution {
                    display_name: mapping.full_name.clone(),
                    tier: Some(tier.name()),
                };
            }
        }
        Resolution {
            display_name: title_case(short_name),
            tier: None,
        }
    }

    /// Re-resolve every transaction from its raw short name. Returns how many
    /// display names changed.
    pub fn apply(&self, transactions: &mut [Transaction], registry: &NameRegistry) -> usize {
        let mut changed = 0;
        for tx in transactions.iter_mut() {
            let resolved = self.resolve(&tx.raw_short_name, registry).display_name;
            if resolved != tx.resolved_name {
                tx.resolved_name = resolved;
                changed += 1;
            }
        }
        changed
    }

    /// Raw short names that only resolved through the fallback, first-seen order.
    pub fn unmapped_short_names(
        &self,
        transactions: &[Transaction],
        registry: &NameRegistry,
    ) -> Vec<String> {
        let mut unmapped: Vec<String> = Vec::new();
        for tx in transactions {
            if self.resolve(&tx.raw_short_name, registry).tier.is_none()
                && !unmapped.contains(&tx.raw_short_name)
            {
                unmapped.push(tx.raw_short_name.clone());
            }
        }
        unmapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn registry() -> NameRegistry {
        NameRegistry::from_pairs([
            ("JOHND", "John Doe"),
            ("SUNDARA P", "Dhanalakshmi V"),
            ("Manisha", "Manisha Sharma"),
            ("DHARINI  N", "Dharini N"),
        ])
        .unwrap()
    }

    /// Wraps a real tier and records every invocation.
    struct CountingTier {
        inner: Box<dyn MatchTier>,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl MatchTier for CountingTier {
        fn name(&self) -> &'static str {
            self.inner.name()
        }

        fn find<'r>(
            &self,
            candidate: &str,
            registry: &'r NameRegistry,
            policy: CollisionPolicy,
        ) -> Option<&'r NameMapping> {
            self.log.borrow_mut().push(self.inner.name());
            self.inner.find(candidate, registry, policy)
        }
    }

    fn counting_resolver() -> (IdentityResolver, Rc<RefCell<Vec<&'static str>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let real: Vec<Box<dyn MatchTier>> = vec![
            Box::new(ExactTier),
            Box::new(NormalizedTier::CASE_INSENSITIVE),
            Box::new(NormalizedTier::SPACE_REMOVED),
            Box::new(NormalizedTier::SPACE_REMOVED_CASE_INSENSITIVE),
        ];
        let tiers: Vec<Box<dyn MatchTier>> = real
            .into_iter()
            .map(|inner| {
                Box::new(CountingTier {
                    inner,
                    log: Rc::clone(&log),
                }) as Box<dyn MatchTier>
            })
            .collect();
        (IdentityResolver::with_tiers(tiers, CollisionPolicy::FirstInserted), log)
    }

    // ── extraction ────────────────────────────────────────────────────────────

    #[test]
    fn extracts_token_after_upi_marker() {
        assert_eq!(extract_short_name("UPI/JOHND/transfer, school fee"), "JOHND");
    }

    #[test]
    fn skips_direction_and_reference_segments() {
        assert_eq!(
            extract_short_name("UPI/CR/412345678901/SUNDARA  P/SBIN/sundarap@okaxis/UPI"),
            "SUNDARA P"
        );
        assert_eq!(extract_short_name("IMPS/P2A/312345/MEENA KAI/HDFC"), "MEENA KAI");
    }

    #[test]
    fn neft_uses_its_own_separators() {
        assert_eq!(
            extract_short_name("NEFT*HDFC0000123*N123456789*GOMATHI Y*fees"),
            "GOMATHI Y"
        );
    }

    #[test]
    fn marker_must_be_a_whole_segment() {
        assert_eq!(extract_short_name("  CASH   DEPOSIT  "), "CASH DEPOSIT");
        assert_eq!(extract_short_name("UPIX/JOHND"), "UPIX/JOHND");
    }

    #[test]
    fn marker_without_payer_falls_back_to_description() {
        assert_eq!(extract_short_name("UPI/CR/12345"), "UPI/CR/12345");
    }

    // ── cascade ───────────────────────────────────────────────────────────────

    #[test]
    fn exact_key_hits_tier_one_only() {
        let (resolver, log) = counting_resolver();
        for key in ["JOHND", "SUNDARA P", "Manisha", "DHARINI  N"] {
            log.borrow_mut().clear();
            let resolution = resolver.resolve(key, &registry());
            assert_eq!(resolution.tier, Some("exact"));
            assert_eq!(*log.borrow(), vec!["exact"]);
        }
    }

    #[test]
    fn tiers_run_in_order_until_a_hit() {
        let (resolver, log) = counting_resolver();
        let resolution = resolver.resolve("sundarap", &registry());
        assert_eq!(resolution.display_name, "Dhanalakshmi V");
        assert_eq!(
            *log.borrow(),
            vec![
                "exact",
                "case-insensitive",
                "space-removed",
                "space-removed-case-insensitive"
            ]
        );
    }

    #[test]
    fn case_insensitive_tier() {
        let resolution = IdentityResolver::default().resolve("MANISHA", &registry());
        assert_eq!(resolution.display_name, "Manisha Sharma");
        assert_eq!(resolution.tier, Some("case-insensitive"));
    }

    #[test]
    fn space_removed_tier() {
        let resolution = IdentityResolver::default().resolve("SUNDARAP", &registry());
        assert_eq!(resolution.display_name, "Dhanalakshmi V");
        assert_eq!(resolution.tier, Some("space-removed"));

        let resolution = IdentityResolver::default().resolve("DHARINI N", &registry());
        assert_eq!(resolution.display_name, "Dharini N");
        assert_eq!(resolution.tier, Some("space-removed"));
    }

    #[test]
    fn fallback_title_cases() {
        let resolution = IdentityResolver::default().resolve("UNKNOWN KID", &registry());
        assert_eq!(resolution.display_name, "Unknown Kid");
        assert_eq!(resolution.tier, None);
    }

    #[test]
    fn collision_policy_picks_first_or_last_inserted() {
        let names = NameRegistry::from_pairs([("SUN DARAP", "First"), ("SUNDARA P", "Second")]).unwrap();
        let first = IdentityResolver::new(CollisionPolicy::FirstInserted).resolve("SUNDARAP", &names);
        assert_eq!(first.display_name, "First");
        let last = IdentityResolver::new(CollisionPolicy::LastInserted).resolve("SUNDARAP", &names);
        assert_eq!(last.display_name, "Second");
    }

    #[test]
    fn policy_deserializes_kebab_case() {
        let policy: CollisionPolicy = serde_json::from_str("\"last-inserted\"").unwrap();
        assert_eq!(policy, CollisionPolicy::LastInserted);
    }
}
