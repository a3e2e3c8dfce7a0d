/// Replace `${ENV_VAR}` placeholders in raw config text before parsing.
///
/// Unresolvable variables are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// Replace `${ENV_VAR}` placeholders using a custom lookup function.
///
/// Variable names are `[A-Za-z0-9_]+`; anything else between the braces is
/// emitted literally.
fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let name = after.find('}').map(|end| &after[..end]).filter(|name| {
            !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });

        match name {
            Some(name) => {
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    },
                }
                rest = &after[name.len() + 1..];
            },
            None => {
                out.push_str("${");
                rest = after;
            },
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_var() {
        let lookup = |name: &str| match name {
            "TWITCH_CLIENT_ID" => Some("abc123".to_string()),
            _ => None,
        };
        assert_eq!(
            substitute_env_with("client_id = \"${TWITCH_CLIENT_ID}\"", lookup),
            "client_id = \"abc123\""
        );
    }

    #[test]
    fn leaves_unknown_var() {
        let lookup = |_: &str| None;
        assert_eq!(
            substitute_env_with("token = \"${DISCORD_TOKEN}\"", lookup),
            "token = \"${DISCORD_TOKEN}\""
        );
    }

    #[test]
    fn unterminated_placeholder_is_literal() {
        let lookup = |_: &str| Some("never".to_string());
        assert_eq!(substitute_env_with("a ${OPEN", lookup), "a ${OPEN");
    }

    #[test]
    fn invalid_name_is_literal() {
        let lookup = |_: &str| Some("never".to_string());
        assert_eq!(substitute_env_with("${not a var}", lookup), "${not a var}");
        assert_eq!(substitute_env_with("${}", lookup), "${}");
    }

    #[test]
    fn multiple_placeholders() {
        let lookup = |name: &str| Some(name.to_lowercase());
        assert_eq!(substitute_env_with("${A}-${B_2}", lookup), "a-b_2");
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_env("cost $5, plain text"), "cost $5, plain text");
    }
}
