use regex::Regex;

use crate::error::Result;
use crate::keystone::types::Named;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Every record whose whole name equals the target, ignoring case.
    Exact,
    /// Only the first record whose name contains the target, ignoring case.
    Contains,
}

impl MatchMode {
    pub fn from_exact(exact: bool) -> Self {
        if exact {
            MatchMode::Exact
        } else {
            MatchMode::Contains
        }
    }
}

/// Anchored, case-folded pattern treating every character of `target`
/// (parentheses included) literally.
pub fn exact_matcher(target: &str) -> Result<Regex> {
    let lowered = target.to_lowercase();
    Ok(Regex::new(&format!("^{}$", regex::escape(&lowered)))?)
}

/// Keeps response order. Exact mode collects all matches, contains mode
/// stops at the first.
pub fn filter_by_name<R: Named>(records: Vec<R>, target: &str, mode: MatchMode) -> Result<Vec<R>> {
    match mode {
        MatchMode::Exact => {
            let matcher = exact_matcher(target)?;
            Ok(records
                .into_iter()
                .filter(|r| matcher.is_match(&r.name().to_lowercase()))
                .collect())
        }
        MatchMode::Contains => {
            let needle = target.to_lowercase();
            Ok(records
                .into_iter()
                .find(|r| r.name().to_lowercase().contains(&needle))
                .into_iter()
                .collect())
        }
    }
}

/// Removes a leading organizational prefix such as `C3PO - `, `C3PO-` or a
/// bare `C3PO ` (any case, any spacing around the dash).
pub fn strip_org_prefix(name: &str, org_prefix: &str) -> String {
    let core = org_prefix.trim().trim_end_matches('-').trim_end();
    let trimmed = name.trim_start();
    if core.is_empty() {
        return trimmed.trim_end().to_string();
    }

    let head = match trimmed.get(..core.len()) {
        Some(h) if h.eq_ignore_ascii_case(core) => h,
        _ => return name.trim().to_string(),
    };
    let rest = &trimmed[head.len()..];
    let separated = rest.is_empty() || rest.starts_with(|c: char| c.is_whitespace() || c == '-');
    if !separated {
        return name.trim().to_string();
    }

    let rest = rest.trim_start();
    let rest = rest.strip_prefix('-').unwrap_or(rest);
    rest.trim().to_string()
}

/// Adds the organizational prefix exactly once.
pub fn with_org_prefix(name: &str, org_prefix: &str) -> String {
    format!("{}{}", org_prefix, strip_org_prefix(name, org_prefix))
}

/// Stable ascending sort by display name (prefix removed, case-folded).
pub fn sort_by_display_name<R: Named>(records: &mut [R], org_prefix: &str) {
    records.sort_by_cached_key(|r| strip_org_prefix(r.name(), org_prefix).to_lowercase());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Rec(&'static str, u32);

    impl Named for Rec {
        fn name(&self) -> &str {
            self.0
        }
    }

    fn names(recs: &[Rec]) -> Vec<&str> {
        recs.iter().map(|r| r.0).collect()
    }

    #[test]
    fn exact_collects_every_case_insensitive_match() {
        let recs = vec![Rec("Ops", 1), Rec("ops eu", 2), Rec("OPS", 3)];
        let out = filter_by_name(recs, "ops", MatchMode::Exact).unwrap();
        assert_eq!(out, vec![Rec("Ops", 1), Rec("OPS", 3)]);
    }

    #[test]
    fn exact_treats_parentheses_literally() {
        let recs = vec![Rec("ops eu", 1), Rec("ops (eu)", 2), Rec("Ops (EU) x", 3)];
        let out = filter_by_name(recs, "Ops (EU)", MatchMode::Exact).unwrap();
        assert_eq!(names(&out), vec!["ops (eu)"]);
    }

    #[test]
    fn exact_escapes_other_metacharacters() {
        let recs = vec![Rec("a.b", 1), Rec("axb", 2)];
        let out = filter_by_name(recs, "a.b", MatchMode::Exact).unwrap();
        assert_eq!(names(&out), vec!["a.b"]);
    }

    #[test]
    fn contains_keeps_only_first() {
        let recs = vec![Rec("Beta", 0), Rec("Alpha Team", 1), Rec("Alpha Squad", 2)];
        let out = filter_by_name(recs, "alpha", MatchMode::Contains).unwrap();
        assert_eq!(names(&out), vec!["Alpha Team"]);
    }

    #[test]
    fn no_match_is_empty() {
        let recs = vec![Rec("Beta", 0)];
        assert!(filter_by_name(recs.clone(), "gamma", MatchMode::Contains).unwrap().is_empty());
        assert!(filter_by_name(recs, "bet", MatchMode::Exact).unwrap().is_empty());
    }

    #[test]
    fn strip_prefix_variants() {
        let p = "C3PO - ";
        assert_eq!(strip_org_prefix("C3PO - Finance", p), "Finance");
        assert_eq!(strip_org_prefix("C3PO-Finance", p), "Finance");
        assert_eq!(strip_org_prefix("c3po   -   Finance EU", p), "Finance EU");
        assert_eq!(strip_org_prefix("C3PO Finance", p), "Finance");
        assert_eq!(strip_org_prefix("C3POFinance", p), "C3POFinance");
        assert_eq!(strip_org_prefix("Finance", p), "Finance");
        assert_eq!(strip_org_prefix("C3PO", p), "");
    }

    #[test]
    fn with_prefix_is_idempotent() {
        let p = "C3PO - ";
        assert_eq!(with_org_prefix("Finance", p), "C3PO - Finance");
        assert_eq!(with_org_prefix("C3PO - Finance", p), "C3PO - Finance");
        assert_eq!(with_org_prefix(" Finance  EU ", p), "C3PO - Finance  EU");
    }

    #[test]
    fn sort_is_stable_by_display_name() {
        let mut recs = vec![
            Rec("C3PO - beta", 1),
            Rec("C3PO - Alpha", 2),
            Rec("alpha", 3),
            Rec("Gamma", 4),
        ];
        sort_by_display_name(&mut recs, "C3PO - ");
        assert_eq!(
            recs.iter().map(|r| r.1).collect::<Vec<_>>(),
            vec![2, 3, 1, 4]
        );
    }
}
