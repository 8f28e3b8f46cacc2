use alloy::{
    dyn_abi::{DynSolValue, Word},
    json_abi::{Function, Param},
    primitives::{Address, I256, U256},
};
use serde_json::Value;
use std::str::FromStr;

use crate::error::{BindingError, Result};

/// Convert JSON call parameters into ABI values for `function`.
///
/// Accepts either a positional array or an object keyed by parameter name.
pub fn json_to_args(function: &Function, parameters: &Value) -> Result<Vec<DynSolValue>> {
    match parameters {
        Value::Array(params) => {
            if params.len() != function.inputs.len() {
                return Err(BindingError::Encoding(format!(
                    "Parameter count mismatch for function '{}': expected {} parameters, got {}. Expected parameters: [{}]",
                    function.name,
                    function.inputs.len(),
                    params.len(),
                    describe_params(&function.inputs)
                )));
            }

            function
                .inputs
                .iter()
                .zip(params)
                .enumerate()
                .map(|(i, (input, value))| {
                    json_to_value(value, &input.ty).map_err(|e| {
                        BindingError::Encoding(format!(
                            "Invalid parameter #{} ('{}' of type '{}'): {}",
                            i + 1,
                            input.name,
                            input.ty,
                            e
                        ))
                    })
                })
                .collect()
        }
        Value::Object(obj) => function
            .inputs
            .iter()
            .map(|input| {
                let value = obj.get(&input.name).ok_or_else(|| {
                    BindingError::Encoding(format!(
                        "Missing required parameter '{}' of type '{}' for function '{}'. Expected parameters: {{{}}}",
                        input.name,
                        input.ty,
                        function.name,
                        describe_params(&function.inputs)
                    ))
                })?;
                json_to_value(value, &input.ty).map_err(|e| {
                    BindingError::Encoding(format!(
                        "Invalid parameter '{}' of type '{}': {}",
                        input.name, input.ty, e
                    ))
                })
            })
            .collect(),
        Value::Null if function.inputs.is_empty() => Ok(Vec::new()),
        _ => Err(BindingError::Encoding(format!(
            "Invalid parameter format for function '{}'. Parameters must be an array or an object: {{{}}}",
            function.name,
            describe_params(&function.inputs)
        ))),
    }
}

fn describe_params(params: &[Param]) -> String {
    params
        .iter()
        .map(|p| format!("{}: {}", p.name, p.ty))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convert one JSON value into an ABI value of Solidity type `sol_type`.
pub fn json_to_value(value: &Value, sol_type: &str) -> Result<DynSolValue, String> {
    match sol_type {
        "address" => {
            let s = value.as_str().ok_or("Address must be a string")?;
            let address = Address::from_str(s).map_err(|e| e.to_string())?;
            Ok(DynSolValue::Address(address))
        }
        "bool" => value
            .as_bool()
            .map(DynSolValue::Bool)
            .ok_or_else(|| "Bool parameter must be a boolean".to_string()),
        "string" => value
            .as_str()
            .map(|s| DynSolValue::String(s.to_string()))
            .ok_or_else(|| "String parameter must be a string".to_string()),
        "bytes" => {
            let s = value.as_str().ok_or("Bytes must be a hex string")?;
            let bytes = decode_hex(s)?;
            Ok(DynSolValue::Bytes(bytes))
        }
        ty if ty.ends_with("[]") => {
            let array = value.as_array().ok_or("Array parameter must be an array")?;
            let element_type = &ty[..ty.len() - 2];
            array
                .iter()
                .map(|element| json_to_value(element, element_type))
                .collect::<Result<Vec<_>, _>>()
                .map(DynSolValue::Array)
        }
        ty if ty.starts_with("uint") => {
            let bits = type_bits(ty, "uint")?;
            let num = match value {
                Value::Number(n) => n
                    .as_u64()
                    .map(U256::from)
                    .ok_or_else(|| format!("Invalid uint value: {}", n))?,
                Value::String(s) => parse_u256(s)?,
                _ => return Err("Uint must be a number or string".to_string()),
            };
            if bits < 256 && num >= (U256::from(1) << bits) {
                return Err(format!("Value {} does not fit in {}", num, ty));
            }
            Ok(DynSolValue::Uint(num, bits))
        }
        ty if ty.starts_with("int") => {
            let bits = type_bits(ty, "int")?;
            let num = match value {
                Value::Number(n) => n
                    .as_i64()
                    .map(I256::try_from)
                    .and_then(|r| r.ok())
                    .ok_or_else(|| format!("Invalid int value: {}", n))?,
                Value::String(s) => {
                    I256::from_dec_str(s).map_err(|_| format!("Invalid int string: {}", s))?
                }
                _ => return Err("Int must be a number or string".to_string()),
            };
            if bits < 256 {
                let bound = I256::try_from(U256::from(1) << (bits - 1))
                    .map_err(|e| format!("Invalid int width {}: {}", ty, e))?;
                if num >= bound || num < -bound {
                    return Err(format!("Value {} does not fit in {}", num, ty));
                }
            }
            Ok(DynSolValue::Int(num, bits))
        }
        ty if ty.starts_with("bytes") => {
            let size: usize = ty[5..]
                .parse()
                .map_err(|_| format!("Unsupported Solidity type: {}", ty))?;
            if !(1..=32).contains(&size) {
                return Err(format!("Unsupported Solidity type: {}", ty));
            }
            let s = value.as_str().ok_or("Bytes must be a hex string")?;
            let bytes = decode_hex(s)?;
            if bytes.len() != size {
                return Err(format!(
                    "Expected {} bytes for {}, got {}",
                    size,
                    ty,
                    bytes.len()
                ));
            }
            let mut word = Word::ZERO;
            word[..size].copy_from_slice(&bytes);
            Ok(DynSolValue::FixedBytes(word, size))
        }
        _ => Err(format!("Unsupported Solidity type: {}", sol_type)),
    }
}

fn type_bits(ty: &str, prefix: &str) -> Result<usize, String> {
    let suffix = &ty[prefix.len()..];
    if suffix.is_empty() {
        return Ok(256);
    }
    match suffix.parse::<usize>() {
        Ok(bits) if bits % 8 == 0 && (8..=256).contains(&bits) => Ok(bits),
        _ => Err(format!("Unsupported Solidity type: {}", ty)),
    }
}

fn parse_u256(s: &str) -> Result<U256, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex_part) => U256::from_str_radix(hex_part, 16),
        None => U256::from_str_radix(s, 10),
    };
    parsed.map_err(|_| format!("Invalid uint string: {}", s))
}

fn decode_hex(s: &str) -> Result<Vec<u8>, String> {
    hex::decode(s.trim_start_matches("0x")).map_err(|_| format!("Invalid hex string: {}", s))
}

/// Convert decoded outputs to JSON. A single output is returned unwrapped.
pub fn values_to_json(values: &[DynSolValue]) -> Result<Value> {
    if let [single] = values {
        return value_to_json(single);
    }
    values
        .iter()
        .map(value_to_json)
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

/// Convert one ABI value to JSON. Integers become decimal strings, bytes become 0x-hex.
pub fn value_to_json(value: &DynSolValue) -> Result<Value> {
    match value {
        DynSolValue::Address(addr) => Ok(Value::String(addr.to_checksum(None))),
        DynSolValue::Uint(num, _) => Ok(Value::String(num.to_string())),
        DynSolValue::Int(num, _) => Ok(Value::String(num.to_string())),
        DynSolValue::Bool(b) => Ok(Value::Bool(*b)),
        DynSolValue::String(s) => Ok(Value::String(s.clone())),
        DynSolValue::Bytes(bytes) => Ok(Value::String(format!("0x{}", hex::encode(bytes)))),
        DynSolValue::FixedBytes(word, size) => Ok(Value::String(format!(
            "0x{}",
            hex::encode(&word[..*size])
        ))),
        DynSolValue::Array(items)
        | DynSolValue::FixedArray(items)
        | DynSolValue::Tuple(items) => items
            .iter()
            .map(value_to_json)
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        other => Err(BindingError::Decoding(format!(
            "Unsupported ABI value: {:?}",
            other
        ))),
    }
}
