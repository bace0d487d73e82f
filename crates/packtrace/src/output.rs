//! JSON rendering for command results.

use anyhow::Result;
use serde::Serialize;

pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[allow(clippy::print_stdout)]
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", to_json(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_to_json_is_pretty() -> Result<()> {
        let text = to_json(&json!({"valid": true}))?;
        assert_eq!(text, "{\n  \"valid\": true\n}");
        Ok(())
    }
}
