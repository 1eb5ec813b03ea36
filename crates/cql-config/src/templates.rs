//! Configuration templates for `cql init`.
//!
//! Templates are kept as valid TOML and handed out with every setting commented out.

/// Project configuration template.
const LOCAL_TEMPLATE: &str = include_str!("../templates/config.toml");

/// Global configuration template.
const GLOBAL_TEMPLATE: &str = include_str!("../templates/config-global.toml");

/// Returns the project configuration template.
pub fn local_template() -> String {
    comment_out(LOCAL_TEMPLATE)
}

/// Returns the global configuration template.
pub fn global_template() -> String {
    comment_out(GLOBAL_TEMPLATE)
}

/// Prefixes every non-empty, non-comment line with `# `.
fn comment_out(template: &str) -> String {
    template
        .lines()
        .map(|line| {
            if line.is_empty() || line.starts_with('#') {
                format!("{line}\n")
            } else {
                format!("# {line}\n")
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_config;

    #[test]
    fn templates_are_valid_toml() {
        for template in [LOCAL_TEMPLATE, GLOBAL_TEMPLATE] {
            let parsed = parse_config(template);
            assert!(parsed.is_ok(), "template failed to parse: {parsed:?}");
        }
    }

    #[test]
    fn local_template_documents_every_parser_key() {
        let parser = parse_config(LOCAL_TEMPLATE).unwrap().parser.unwrap();
        assert!(parser.version.is_some());
        assert!(parser.error_on_empty_term.is_some());
        assert!(parser.error_on_quoted_identifier.is_some());
        assert!(parser.error_on_duplicate_prefix.is_some());
        assert!(parser.full_result_set_name_check.is_some());
        assert!(parser.max_depth.is_some());
    }

    #[test]
    fn commented_templates_set_nothing() {
        for template in [local_template(), global_template()] {
            let parsed = parse_config(&template).unwrap();
            assert!(parsed.parser.is_none());
            assert!(parsed.prefixes.is_none());
        }
    }

    #[test]
    fn comment_out_keeps_comments_and_blanks() {
        assert_eq!(
            comment_out("# note\n[parser]\n\nmax_depth = 3\n"),
            "# note\n# [parser]\n\n# max_depth = 3\n"
        );
    }
}
