use justconfig::error::ConfigError;
use justconfig::item::{MapAction, StringItem};

/// Strips one pair of surrounding quotes from configuration strings.
pub trait Unquote
where
    Self: Sized,
{
    fn unquote(self) -> Result<StringItem, ConfigError>;
}

impl Unquote for Result<StringItem, ConfigError> {
    /// Trims every value and removes a matching pair of `"` or `'` around it, so
    /// paths with spaces can be written as `"my data/tags.txt"`. Values without
    /// quotes are kept as they are.
    fn unquote(self) -> Result<StringItem, ConfigError> {
        self?.map(|v| match strip_quotes(v) {
            Some(unquoted) => MapAction::Replace(vec![unquoted.to_owned()]),
            None => MapAction::Keep,
        })
    }
}

fn strip_quotes(value: &str) -> Option<&str> {
    let value = value.trim();
    ['"', '\''].iter().find_map(|quote| {
        if value.len() >= 2 && value.starts_with(*quote) && value.ends_with(*quote) {
            Some(&value[1..value.len() - 1])
        } else {
            None
        }
    })
}
