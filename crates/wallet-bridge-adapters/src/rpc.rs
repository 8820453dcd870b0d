//! Decoding of EIP-1193 / JSON-RPC results shared by every runtime.

use alloy::primitives::{Address, Bytes, B256, U256};
use serde_json::Value;

use wallet_bridge_core::{ChainId, PortError};

/// JSON-RPC "method not found".
pub const METHOD_NOT_FOUND_CODE: i64 = -32601;
/// JSON-RPC "internal error", used when a wallet error carries no code.
pub const INTERNAL_ERROR_CODE: i64 = -32603;

/// Unwraps a JSON-RPC 2.0 response envelope into its `result`.
pub fn decode_response(body: Value) -> Result<Value, PortError> {
    if let Some(err) = body.get("error").filter(|e| !e.is_null()) {
        return Err(error_from_value(err));
    }
    match body {
        Value::Object(mut map) => map
            .remove("result")
            .ok_or_else(|| PortError::Transport("response missing result".to_owned())),
        other => Err(PortError::Transport(format!(
            "response must be an object, got {other}"
        ))),
    }
}

/// `{code, message}` as thrown by wallets and returned in JSON-RPC errors.
pub fn error_from_value(err: &Value) -> PortError {
    let message = err
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| err.to_string());
    let code = err.get("code").and_then(|c| {
        c.as_i64()
            .or_else(|| c.as_str().and_then(|s| s.parse().ok()))
    });
    PortError::Rpc {
        code: code.unwrap_or(INTERNAL_ERROR_CODE),
        message,
    }
}

pub fn parse_accounts(value: &Value) -> Result<Vec<Address>, PortError> {
    let arr = value
        .as_array()
        .ok_or_else(|| PortError::Transport("accounts: array expected".to_owned()))?;
    arr.iter().map(parse_address).collect()
}

pub fn parse_address(value: &Value) -> Result<Address, PortError> {
    value
        .as_str()
        .ok_or_else(|| PortError::Transport("address must be a string".to_owned()))?
        .parse()
        .map_err(|e| PortError::Validation(format!("invalid account address: {e}")))
}

pub fn parse_chain_id(value: &Value) -> Result<ChainId, PortError> {
    serde_json::from_value(value.clone())
        .map_err(|e| PortError::Validation(format!("invalid chain id {value}: {e}")))
}

pub fn parse_quantity(value: &Value) -> Result<U256, PortError> {
    let raw = value
        .as_str()
        .ok_or_else(|| PortError::Transport("quantity must be a hex string".to_owned()))?;
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| PortError::Validation(format!("quantity missing 0x prefix: {raw}")))?;
    if digits.is_empty() {
        return Err(PortError::Validation("empty quantity".to_owned()));
    }
    U256::from_str_radix(digits, 16)
        .map_err(|e| PortError::Validation(format!("invalid quantity {raw}: {e}")))
}

pub fn parse_bytes(value: &Value) -> Result<Bytes, PortError> {
    value
        .as_str()
        .ok_or_else(|| PortError::Transport("signature must be hex string".to_owned()))?
        .parse()
        .map_err(|e| PortError::Validation(format!("invalid signature hex: {e}")))
}

pub fn parse_tx_hash(value: &Value) -> Result<B256, PortError> {
    value
        .as_str()
        .ok_or_else(|| PortError::Transport("transaction hash must be hex string".to_owned()))?
        .parse()
        .map_err(|e| PortError::Validation(format!("invalid tx hash: {e}")))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn error_envelope_keeps_wallet_code() {
        let err = decode_response(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": 4902, "message": "Unrecognized chain ID \"0xa4b1\"."}
        }))
        .expect_err("error");
        assert!(err.is_unrecognized_chain());
        assert_eq!(err.rpc_code(), Some(4902));

        let err = error_from_value(&json!({"message": "boom"}));
        assert_eq!(err.rpc_code(), Some(INTERNAL_ERROR_CODE));
    }

    #[test]
    fn quantities_and_chain_ids_accept_wallet_encodings() {
        assert_eq!(parse_quantity(&json!("0x0")).expect("zero"), U256::ZERO);
        assert_eq!(
            parse_quantity(&json!("0x14d1120d7b160000")).expect("1.5 eth"),
            U256::from(1_500_000_000_000_000_000u128)
        );
        assert!(parse_quantity(&json!("1500")).is_err());
        assert_eq!(parse_chain_id(&json!("0x2105")).expect("hex"), ChainId(8453));
        assert_eq!(parse_chain_id(&json!(10)).expect("number"), ChainId(10));
    }
}
