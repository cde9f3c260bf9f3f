use std::str::FromStr;

use log::trace;
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};

use crate::{
    config::COMMAND_PREFIX,
    error::WalletConnectError,
    registry::{CommandDefinition, CommandRegistry, ParamType}
};

// A session request resolved against the registry: the matched definition
// plus the coerced parameter map ready for dispatch
#[derive(Debug)]
pub struct PreparedCommand<'a> {
    pub definition: &'a CommandDefinition,
    pub params: Map<String, Value>,
}

// Resolve a raw wire method and parameter bag against the registry.
// Pure and deterministic: no I/O, same output for the same input.
//
// Params are processed in declared order; defaults are applied before the
// required check; a missing optional param without a default is absent from
// the output, never present as null.
pub fn prepare<'a>(
    registry: &'a CommandRegistry,
    method: &str,
    raw: &Map<String, Value>,
) -> Result<PreparedCommand<'a>, WalletConnectError> {
    let command = method.strip_prefix(COMMAND_PREFIX).unwrap_or(method);
    let definition = registry.get(command)
        .ok_or_else(|| WalletConnectError::UnknownCommand(method.to_string()))?;

    trace!("preparing command '{}'", command);

    let mut params = Map::new();
    for spec in &definition.params {
        // JSON null is treated as absent, the same as a missing key
        let value = raw.get(spec.name)
            .filter(|v| !v.is_null())
            .cloned()
            .or_else(|| spec.default.clone());

        let value = match value {
            Some(value) => value,
            None if spec.optional => continue,
            None => return Err(WalletConnectError::MissingArgument(spec.name)),
        };

        let coerced = match spec.kind {
            Some(kind) => coerce(spec.name, kind, value)?,
            None => value,
        };

        params.insert(spec.name.to_string(), coerced);
    }

    Ok(PreparedCommand { definition, params })
}

// Fingerprints are 32-bit key identifiers; larger wire values must fail
// outright rather than alias into a granted key through truncation
pub fn fingerprint_param(value: Option<&Value>) -> Result<Option<u32>, WalletConnectError> {
    let value = match value.filter(|v| !v.is_null()) {
        Some(value) => value,
        None => return Ok(None),
    };

    let fingerprint = value.as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| WalletConnectError::InvalidArgument("fingerprint", value.clone()))?;

    Ok(Some(fingerprint))
}

fn coerce(name: &'static str, kind: ParamType, value: Value) -> Result<Value, WalletConnectError> {
    match kind {
        ParamType::BigDecimal => coerce_decimal(name, value),
        ParamType::Number => coerce_number(name, value),
        ParamType::Boolean => coerce_boolean(name, value),
        ParamType::String => coerce_string(name, value),
        ParamType::Object => Ok(value),
    }
}

// Precision decimals are carried to the wallet API as strings so no
// float rounding is introduced on the way
fn coerce_decimal(name: &'static str, value: Value) -> Result<Value, WalletConnectError> {
    let decimal = match &value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    };

    match decimal {
        Some(decimal) => Ok(Value::String(decimal.normalize().to_string())),
        None => Err(WalletConnectError::InvalidArgument(name, value)),
    }
}

// Accepts both plain and scientific notation; JSON floats may be
// rendered in scientific form (e.g. 1e-12)
fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s).or_else(|_| Decimal::from_scientific(s)).ok()
}

fn coerce_number(name: &'static str, value: Value) -> Result<Value, WalletConnectError> {
    let parsed = match &value {
        Value::Number(n) => Some(Value::Number(n.clone())),
        Value::String(s) => parse_number(s.trim()),
        _ => None,
    };

    parsed.ok_or(WalletConnectError::InvalidArgument(name, value))
}

// NaN and infinities are rejected, never silently produced
fn parse_number(s: &str) -> Option<Value> {
    if let Ok(v) = s.parse::<u64>() {
        return Some(Value::Number(v.into()));
    }

    if let Ok(v) = s.parse::<i64>() {
        return Some(Value::Number(v.into()));
    }

    s.parse::<f64>().ok()
        .filter(|v| v.is_finite())
        .and_then(Number::from_f64)
        .map(Value::Number)
}

// Tightened from the historical truthiness cast: only unambiguous
// boolean spellings are accepted
fn coerce_boolean(name: &'static str, value: Value) -> Result<Value, WalletConnectError> {
    let parsed = match &value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    };

    match parsed {
        Some(parsed) => Ok(Value::Bool(parsed)),
        None => Err(WalletConnectError::InvalidArgument(name, value)),
    }
}

fn coerce_string(name: &'static str, value: Value) -> Result<Value, WalletConnectError> {
    let coerced = match &value {
        Value::String(_) => return Ok(value),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    };

    match coerced {
        Some(coerced) => Ok(Value::String(coerced)),
        None => Err(WalletConnectError::InvalidArgument(name, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::registry;
    use serde_json::json;

    fn raw(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_prefix_stripped_and_definition_returned() {
        let prepared = prepare(registry(), "chia_getWalletBalance", &raw(json!({ "walletId": 2 }))).unwrap();
        assert_eq!(prepared.definition.command, "getWalletBalance");
        assert_eq!(prepared.params.get("walletId"), Some(&json!(2)));
    }

    #[test]
    fn test_unknown_command() {
        let err = prepare(registry(), "chia_doesNotExist", &Map::new()).unwrap_err();
        assert!(matches!(err, WalletConnectError::UnknownCommand(_)));
    }

    #[test]
    fn test_default_applied_when_absent() {
        // registry declares walletId optional with default 1
        let prepared = prepare(registry(), "chia_getWalletBalance", &Map::new()).unwrap();
        assert_eq!(prepared.params.get("walletId"), Some(&json!(1)));
    }

    #[test]
    fn test_missing_required_argument() {
        let err = prepare(registry(), "chia_sendTransaction", &raw(json!({
            "fee": "0.00005",
            "address": "xch1abc"
        }))).unwrap_err();
        assert!(matches!(err, WalletConnectError::MissingArgument("amount")));
    }

    #[test]
    fn test_omitted_optional_without_default_is_absent() {
        let prepared = prepare(registry(), "chia_getAllOffers", &Map::new()).unwrap();
        assert!(!prepared.params.contains_key("sortKey"));
        // while defaults are still applied for the others
        assert_eq!(prepared.params.get("start"), Some(&json!(0)));
    }

    #[test]
    fn test_null_treated_as_absent() {
        let err = prepare(registry(), "chia_getTransaction", &raw(json!({ "transactionId": null }))).unwrap_err();
        assert!(matches!(err, WalletConnectError::MissingArgument("transactionId")));
    }

    #[test]
    fn test_decimal_coercion() {
        let prepared = prepare(registry(), "chia_sendTransaction", &raw(json!({
            "amount": 0.000000000001,
            "fee": "0.00005",
            "address": "xch1abc"
        }))).unwrap();
        assert_eq!(prepared.params.get("amount"), Some(&json!("0.000000000001")));
        assert_eq!(prepared.params.get("fee"), Some(&json!("0.00005")));
    }

    #[test]
    fn test_decimal_rejects_nan() {
        let err = prepare(registry(), "chia_sendTransaction", &raw(json!({
            "amount": "NaN",
            "fee": "0",
            "address": "xch1abc"
        }))).unwrap_err();
        assert!(matches!(err, WalletConnectError::InvalidArgument("amount", _)));
    }

    #[test]
    fn test_number_rejects_nan_and_garbage() {
        for bad in ["NaN", "infinity", "12abc"] {
            let err = prepare(registry(), "chia_getCATAssetId", &raw(json!({ "walletId": bad }))).unwrap_err();
            assert!(matches!(err, WalletConnectError::InvalidArgument("walletId", _)), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_numeric_string_parsed() {
        let prepared = prepare(registry(), "chia_getCATAssetId", &raw(json!({ "walletId": "3" }))).unwrap();
        assert_eq!(prepared.params.get("walletId"), Some(&json!(3)));
    }

    #[test]
    fn test_boolean_spellings() {
        for (input, expected) in [(json!(true), true), (json!("false"), false), (json!(1), true), (json!(0), false)] {
            let prepared = prepare(registry(), "chia_getWallets", &raw(json!({ "includeData": input }))).unwrap();
            assert_eq!(prepared.params.get("includeData"), Some(&json!(expected)));
        }

        let err = prepare(registry(), "chia_getWallets", &raw(json!({ "includeData": "yes" }))).unwrap_err();
        assert!(matches!(err, WalletConnectError::InvalidArgument("includeData", _)));
    }

    #[test]
    fn test_string_coercion() {
        let prepared = prepare(registry(), "chia_getTransaction", &raw(json!({ "transactionId": 42 }))).unwrap();
        assert_eq!(prepared.params.get("transactionId"), Some(&json!("42")));
    }

    #[test]
    fn test_fingerprint_param_bounds() {
        assert_eq!(fingerprint_param(None).unwrap(), None);
        assert_eq!(fingerprint_param(Some(&json!(null))).unwrap(), None);
        assert_eq!(fingerprint_param(Some(&json!(12345))).unwrap(), Some(12345));
        assert_eq!(fingerprint_param(Some(&json!(u32::MAX))).unwrap(), Some(u32::MAX));

        // values beyond 32 bits must not wrap around into a valid key
        for bad in [json!(u32::MAX as u64 + 1), json!((1u64 << 32) + 42), json!(-1), json!("12345")] {
            let err = fingerprint_param(Some(&bad)).unwrap_err();
            assert!(matches!(err, WalletConnectError::InvalidArgument("fingerprint", _)), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_preparation_is_deterministic() {
        let params = raw(json!({
            "amount": "1.5",
            "fee": 0,
            "address": "xch1abc",
            "memos": { "note": "hi" }
        }));

        let a = prepare(registry(), "chia_sendTransaction", &params).unwrap();
        let b = prepare(registry(), "chia_sendTransaction", &params).unwrap();
        assert_eq!(Value::Object(a.params), Value::Object(b.params));
    }
}
