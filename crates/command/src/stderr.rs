//! Recognised shapes of mise's stderr.

use misebridge_core::CommandError;
use once_cell::sync::Lazy;
use regex::Regex;

static NOT_TRUSTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Config file (.+) is not trusted\.").expect("valid not-trusted regex")
});

static CONFIG_PARSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"error parsing config file: (.+)").expect("valid config-parse regex")
});

/// Classify the stderr of a failed invocation.
pub fn parse_stderr(command: &str, stderr: &str) -> CommandError {
    if let Some(captures) = NOT_TRUSTED.captures(stderr) {
        return CommandError::not_trusted(command, captures[1].trim());
    }
    if let Some(captures) = CONFIG_PARSE.captures(stderr) {
        return CommandError::config_parse(command, captures[1].trim());
    }
    CommandError::failed(command, stderr.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_trusted() {
        let stderr = "mise ERROR Config file /work/mise.toml is not trusted. Trust it with `mise trust`.\n";
        let error = parse_stderr("mise env --json", stderr);
        assert_eq!(error, CommandError::not_trusted("mise env --json", "/work/mise.toml"));
        assert_eq!(error.config_path(), Some("/work/mise.toml"));
    }

    #[test]
    fn test_config_parse() {
        let stderr = "mise ERROR error parsing config file: /work/.mise.toml\nmise ERROR expected `=`\n";
        let error = parse_stderr("mise ls", stderr);
        assert_eq!(error, CommandError::config_parse("mise ls", "/work/.mise.toml"));
    }

    #[test]
    fn test_unrecognised_keeps_raw_stderr() {
        let error = parse_stderr("mise ls", "mise ERROR something else\n");
        assert_eq!(error, CommandError::failed("mise ls", "mise ERROR something else"));
        assert_eq!(error.to_string(), "mise ERROR something else");
    }
}
