// Each of these yields `Result<&T, &'static str>` where the error names the CBOR
// type that was actually found, for diagnostics.

macro_rules! cbor_try_map {
    (
        $v:expr
    ) => {{
        match $v {
            serde_cbor_2::Value::Map(m) => Ok(m),
            other => Err($crate::macros::cbor_type_name(other)),
        }
    }};
}

macro_rules! cbor_try_string {
    (
        $v:expr
    ) => {{
        match $v {
            serde_cbor_2::Value::Text(m) => Ok(m),
            other => Err($crate::macros::cbor_type_name(other)),
        }
    }};
}

macro_rules! cbor_try_bytes {
    (
        $v:expr
    ) => {{
        match $v {
            serde_cbor_2::Value::Bytes(m) => Ok(m),
            other => Err($crate::macros::cbor_type_name(other)),
        }
    }};
}

pub(crate) fn cbor_type_name(v: &serde_cbor_2::Value) -> &'static str {
    use serde_cbor_2::Value;
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Integer(_) => "integer",
        Value::Float(_) => "float",
        Value::Bytes(_) => "bytes",
        Value::Text(_) => "text",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        Value::Tag(_, _) => "tag",
        #[allow(unreachable_patterns)]
        _ => "unknown",
    }
}
