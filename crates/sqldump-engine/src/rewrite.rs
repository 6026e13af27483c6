//! Literal rewrites of server-returned `CREATE ...` text
//!
//! These are plain pattern substitutions over the `SHOW CREATE` output. They
//! move the optional clauses into version-gated comments so older servers
//! skip what they do not understand:
//!
//! | Input | Output |
//! | --- | --- |
//! | `CREATE DEFINER=d PROCEDURE rest` | `/*!50003 CREATE*/ /*!50020 DEFINER=d*/ /*!50003 PROCEDURE rest */` |
//! | `CREATE DEFINER=d TRIGGER rest` | `/*!50003 CREATE*/ /*!50017 DEFINER=d*/ /*!50003 TRIGGER rest */` |
//! | `CREATE ALGORITHM=a DEFINER=d SQL SECURITY s VIEW rest` | [`ViewParts`] { algorithm, definer, security, body } |

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static ROUTINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*CREATE\s+(?:(DEFINER=\S+)\s+)?((?:PROCEDURE|FUNCTION)\b.*?)\s*$")
        .expect("routine pattern is valid")
});

static TRIGGER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*CREATE\s+(?:(DEFINER=\S+)\s+)?(TRIGGER\b.*?)\s*$")
        .expect("trigger pattern is valid")
});

static VIEW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)^\s*CREATE\s+(?:(ALGORITHM=\S+)\s+)?(?:(DEFINER=\S+)\s+)?(?:(SQL\s+SECURITY\s+\S+)\s+)?VIEW\s+(.*?)\s*$",
    )
    .expect("view pattern is valid")
});

/// Version-gate a `CREATE PROCEDURE` / `CREATE FUNCTION` statement.
///
/// Returns `None` if the text is not a routine definition.
pub fn rewrite_routine(create: &str) -> Option<String> {
    let caps = ROUTINE.captures(create)?;
    let definer = caps.get(1).map(|m| m.as_str());
    let rest = &caps[2];
    Some(gate(definer, "50020", rest))
}

/// Version-gate a `CREATE TRIGGER` statement.
///
/// Returns `None` if the text is not a trigger definition.
pub fn rewrite_trigger(create: &str) -> Option<String> {
    let caps = TRIGGER.captures(create)?;
    let definer = caps.get(1).map(|m| m.as_str());
    let rest = &caps[2];
    Some(gate(definer, "50017", rest))
}

fn gate(definer: Option<&str>, definer_version: &str, rest: &str) -> String {
    match definer {
        Some(definer) => format!(
            "/*!50003 CREATE*/ /*!{} {}*/ /*!50003 {} */",
            definer_version, definer, rest
        ),
        None => format!("/*!50003 CREATE*/ /*!50003 {} */", rest),
    }
}

/// Fragments of a `SHOW CREATE VIEW` statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewParts {
    /// e.g. `ALGORITHM=UNDEFINED`
    pub algorithm: String,
    /// e.g. ``DEFINER=`root`@`localhost` ``
    pub definer: String,
    /// e.g. `SQL SECURITY DEFINER`
    pub security: String,
    /// Everything after `VIEW `: name, column list and select
    pub body: String,
}

/// Split a `CREATE VIEW` statement into its gated fragments.
///
/// Clauses the server left out come back as empty strings.
pub fn split_view(create: &str) -> Option<ViewParts> {
    let caps = VIEW.captures(create)?;
    let part = |idx: usize| caps.get(idx).map(|m| m.as_str().to_string()).unwrap_or_default();
    Some(ViewParts {
        algorithm: part(1),
        definer: part(2),
        security: part(3),
        body: part(4),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_procedure_with_definer() {
        let create = "CREATE DEFINER=`root`@`localhost` PROCEDURE `refresh`(IN n INT)\nBEGIN\n  SELECT n;\nEND";
        assert_eq!(
            rewrite_routine(create).unwrap(),
            "/*!50003 CREATE*/ /*!50020 DEFINER=`root`@`localhost`*/ /*!50003 PROCEDURE `refresh`(IN n INT)\nBEGIN\n  SELECT n;\nEND */"
        );
    }

    #[test]
    fn test_function_without_definer() {
        let create = "CREATE FUNCTION `one`() RETURNS int\n    DETERMINISTIC\nRETURN 1";
        assert_eq!(
            rewrite_routine(create).unwrap(),
            "/*!50003 CREATE*/ /*!50003 FUNCTION `one`() RETURNS int\n    DETERMINISTIC\nRETURN 1 */"
        );
    }

    #[test]
    fn test_routine_rejects_other_statements() {
        assert_eq!(rewrite_routine("CREATE TABLE `t` (id int)"), None);
        assert_eq!(rewrite_routine(""), None);
    }

    #[test]
    fn test_trigger() {
        let create = "CREATE DEFINER=`app`@`%` TRIGGER `t_bi` BEFORE INSERT ON `t` FOR EACH ROW SET NEW.created = NOW()";
        assert_eq!(
            rewrite_trigger(create).unwrap(),
            "/*!50003 CREATE*/ /*!50017 DEFINER=`app`@`%`*/ /*!50003 TRIGGER `t_bi` BEFORE INSERT ON `t` FOR EACH ROW SET NEW.created = NOW() */"
        );
    }

    #[test]
    fn test_view_parts() {
        let create = "CREATE ALGORITHM=UNDEFINED DEFINER=`root`@`localhost` SQL SECURITY DEFINER VIEW `v` AS select `t`.`id` AS `id` from `t`";
        assert_eq!(
            split_view(create).unwrap(),
            ViewParts {
                algorithm: "ALGORITHM=UNDEFINED".into(),
                definer: "DEFINER=`root`@`localhost`".into(),
                security: "SQL SECURITY DEFINER".into(),
                body: "`v` AS select `t`.`id` AS `id` from `t`".into(),
            }
        );
    }

    #[test]
    fn test_view_without_optional_clauses() {
        let parts = split_view("CREATE VIEW `v` AS select 1 AS `x`").unwrap();
        assert_eq!(parts.algorithm, "");
        assert_eq!(parts.definer, "");
        assert_eq!(parts.security, "");
        assert_eq!(parts.body, "`v` AS select 1 AS `x`");
    }

    #[test]
    fn test_view_rejects_tables() {
        assert_eq!(split_view("CREATE TABLE `v` (x int)"), None);
    }
}
