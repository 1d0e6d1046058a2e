//! Small text helpers for rendering command lines and process output

/// Quote a single argument so a POSIX shell reads it back verbatim
pub fn quote_for_shell(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }
    if arg
        .chars()
        .any(|c| c.is_whitespace() || "'\"${}()\\".contains(c))
    {
        return format!("'{}'", arg.replace('\'', r"'\''"));
    }
    arg.to_string()
}

/// Render an argument vector as a single pasteable command line
pub fn command_line<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .map(|arg| quote_for_shell(arg.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Keep the head and tail of a long multi-line text, replacing the middle with a marker
pub fn trim_long_text(text: &str, max_lines: usize) -> String {
    let max_lines = max_lines.max(3);
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= max_lines {
        return text.to_string();
    }

    let keep = (max_lines - 1) / 2;
    let skipped = lines.len() - keep * 2;

    let mut trimmed: Vec<String> = lines[..keep].iter().map(|l| l.to_string()).collect();
    trimmed.push(format!("({} lines skipped)", skipped));
    trimmed.extend(lines[lines.len() - keep..].iter().map(|l| l.to_string()));
    trimmed.join("\n")
}

/// Interpret a flag-like value such as `1`, `yes` or ` TrUe `
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "t" | "true" | "y" | "yes"
    )
}

/// Read a boolean environment variable; unset means false
pub fn bool_env_var(name: &str) -> bool {
    std::env::var(name).map(|v| is_truthy(&v)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_for_shell() {
        assert_eq!(quote_for_shell(""), "''");
        assert_eq!(quote_for_shell("plain-arg"), "plain-arg");
        assert_eq!(quote_for_shell(".[core,docs]"), ".[core,docs]");
        assert_eq!(quote_for_shell("$HOME"), "'$HOME'");
        assert_eq!(quote_for_shell("it's"), r"'it'\''s'");
        assert_eq!(quote_for_shell("two words"), "'two words'");
    }

    #[test]
    fn test_command_line() {
        let args = ["git", "commit", "-m", "Updating version to (1.0.1)"];
        assert_eq!(
            command_line(&args[..]),
            "git commit -m 'Updating version to (1.0.1)'"
        );
    }

    #[test]
    fn test_trim_long_text_keeps_short_text() {
        assert_eq!(trim_long_text("a\nb\nc", 10), "a\nb\nc");
    }

    #[test]
    fn test_trim_long_text_skips_middle() {
        let text = (1..=10).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        assert_eq!(trim_long_text(&text, 5), "1\n2\n(6 lines skipped)\n9\n10");
        // Anything below three lines is raised to three
        assert_eq!(trim_long_text(&text, 1), "1\n(8 lines skipped)\n10");
    }

    #[test]
    fn test_is_truthy() {
        for value in ["1", "  1 ", "t", "TrUe", "y", "  YeS "] {
            assert!(is_truthy(value), "{:?} should be true", value);
        }
        for value in ["", "0", "fAlSe ", "No", "maybe"] {
            assert!(!is_truthy(value), "{:?} should be false", value);
        }
    }
}
