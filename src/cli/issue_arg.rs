use std::str::FromStr;
use std::sync::LazyLock;

use clap::builder::TypedValueParser;
use clap::{Arg, Command, error::ErrorKind};
use regex::Regex;

static ISSUE_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[^\s]+/issues/(\d+)(?:[/?#][^\s]*)?$")
        .expect("Invalid issue url regex")
});

/// An issue given on the command line, either as `42`, `#42` or as the
/// issue's URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssueArg(pub u64);

impl FromStr for IssueArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let number = match ISSUE_URL_REGEX.captures(s) {
            Some(captures) => captures.get(1).map_or("", |m| m.as_str()),
            None => s.strip_prefix('#').unwrap_or(s),
        };
        number
            .parse::<u64>()
            .ok()
            .filter(|n| *n > 0)
            .map(IssueArg)
            .ok_or_else(|| format!("'{s}' is not an issue number or issue URL"))
    }
}

// Custom parser for clap
#[derive(Clone)]
pub struct IssueArgParser;

impl TypedValueParser for IssueArgParser {
    type Value = IssueArg;

    fn parse_ref(
        &self,
        _cmd: &Command,
        arg: Option<&Arg>,
        value: &std::ffi::OsStr,
    ) -> Result<Self::Value, clap::Error> {
        let s = value.to_str().ok_or_else(|| {
            clap::Error::raw(ErrorKind::InvalidUtf8, "Invalid UTF-8 in issue argument")
        })?;

        s.parse().map_err(|_| {
            let mut err = clap::Error::new(ErrorKind::InvalidValue);
            if let Some(arg) = arg {
                err.insert(
                    clap::error::ContextKind::InvalidArg,
                    clap::error::ContextValue::String(arg.to_string()),
                );
            }
            err.insert(
                clap::error::ContextKind::InvalidValue,
                clap::error::ContextValue::String(s.to_string()),
            );
            err.insert(
                clap::error::ContextKind::ValidValue,
                clap::error::ContextValue::String(
                    "42 or https://github.com/owner/repo/issues/42".to_string(),
                ),
            );
            err
        })
    }
}
