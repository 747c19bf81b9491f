//! Command for calling a tool on an MCP server.

use crate::client::Inspect;
use crate::error::Error;
use omcp::protocol::CallToolResult;
use serde_json::{Map, Value};

/// Parse `key=value` pairs into a JSON object.
///
/// Each value is first attempted as JSON. If parsing fails, it is
/// treated as a plain string.
pub fn parse_args(args: &[String]) -> Result<Map<String, Value>, Error> {
    let mut map = Map::new();
    for arg in args {
        let (key, raw_value) = arg
            .split_once('=')
            .ok_or_else(|| Error::InvalidArg(arg.clone()))?;

        let value = serde_json::from_str(raw_value)
            .unwrap_or_else(|_| Value::String(raw_value.to_string()));

        map.insert(key.to_string(), value);
    }
    Ok(map)
}

/// Call a tool on the connected MCP server.
pub async fn call(service: &mut impl Inspect, name: &str, args: &[String]) -> Result<CallToolResult, Error> {
    let arguments = parse_args(args)?;
    service.call_tool(name, arguments).await
}

#[cfg(test)]
mod tests {
    use crate::cmd::call::parse_args;
    use crate::error::Error;
    use serde_json::json;

    #[test]
    fn values_parse_as_json_or_string() {
        let args = vec!["a=5".to_string(), "city=Paris".to_string(), "flags=[1,2]".to_string()];
        let map = parse_args(&args).unwrap();
        assert_eq!(map["a"], json!(5));
        assert_eq!(map["city"], json!("Paris"));
        assert_eq!(map["flags"], json!([1, 2]));
    }

    #[test]
    fn missing_equals_is_rejected() {
        assert!(matches!(
            parse_args(&["oops".to_string()]),
            Err(Error::InvalidArg(arg)) if arg == "oops"
        ));
    }
}
