//! Path rewriting for forwarded requests.
//!
//! # Design Decisions
//! - Ordered prefix-replace rules; first match wins
//! - No regex, matching stays O(rules × prefix length)
//! - No matching rule forwards the path unchanged

use crate::config::RewriteRule;

/// Apply the service's rewrite rules to an inbound path.
pub fn rewrite_path(path: &str, rules: &[RewriteRule]) -> String {
    for rule in rules {
        if let Some(rest) = path.strip_prefix(rule.from.as_str()) {
            let rewritten = format!("{}{}", rule.to, rest);
            if rewritten.is_empty() {
                return "/".to_string();
            }
            return rewritten;
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(from: &str, to: &str) -> RewriteRule {
        RewriteRule {
            from: from.into(),
            to: to.into(),
        }
    }

    #[test]
    fn test_prefix_is_replaced() {
        let rules = vec![rule("/api/vehicles", "/api/v1/vehicles")];
        assert_eq!(
            rewrite_path("/api/vehicles/42/location", &rules),
            "/api/v1/vehicles/42/location"
        );
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let rules = vec![rule("/api", "/internal"), rule("/api/vehicles", "/never")];
        assert_eq!(rewrite_path("/api/vehicles", &rules), "/internal/vehicles");
    }

    #[test]
    fn test_no_match_passes_through() {
        let rules = vec![rule("/api/maintenance", "/maintenance")];
        assert_eq!(rewrite_path("/api/vehicles", &rules), "/api/vehicles");
    }

    #[test]
    fn test_stripping_whole_path_yields_root() {
        let rules = vec![rule("/api/tracking", "")];
        assert_eq!(rewrite_path("/api/tracking", &rules), "/");
        assert_eq!(rewrite_path("/api/tracking/live", &rules), "/live");
    }

    #[test]
    fn test_empty_rules_pass_through() {
        assert_eq!(rewrite_path("/api/vehicles", &[]), "/api/vehicles");
    }
}
