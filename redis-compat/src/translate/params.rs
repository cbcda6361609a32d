//! Parameter translation: caller dialect to driver dialect
//!
//! One conversion function per parameter family, each exhaustively matched
//! over [`CallerValue`] so every caller shape either maps to a defined
//! `DriverArg` sequence or is rejected before any driver call. Translation is
//! total for the families that must not crash on shape variations (string,
//! flat-array) and falls back to a caller-visible `Translate` error only
//! where no reasonable interpretation exists.

use bytes::Bytes;
use redis_compat_core::{CallerValue, CompatError, CompatResult, DriverArg};

/// Flattening depth bound for nested list/map arguments.
///
/// Anything nested deeper collapses to [`NESTED_PLACEHOLDER`] instead of
/// recursing further, so pathological inputs cannot overflow the stack.
pub const MAX_ARG_DEPTH: usize = 8;

/// Stable stand-in for values beyond the flattening depth bound
pub const NESTED_PLACEHOLDER: &str = "[nested]";

/// Translate a string-family parameter.
///
/// Total: any string passes through byte-for-byte (empty strings, embedded
/// NUL and control characters, multi-byte text), scalars stringify, and the
/// absent-value sentinels become an explicit empty blob rather than a crash.
pub fn string_arg(value: &CallerValue) -> DriverArg {
    DriverArg::Blob(scalar_bytes(value, 0))
}

/// Translate a numeric-family parameter.
///
/// Accepts numbers directly and numeric strings by parsing; the infinity and
/// NaN spellings are numeric sentinels, not errors.
pub fn numeric_arg(value: &CallerValue) -> CompatResult<DriverArg> {
    match value {
        CallerValue::Int(i) => Ok(DriverArg::Int(*i)),
        CallerValue::Float(f) => Ok(DriverArg::Float(*f)),
        CallerValue::Str(s) => {
            if let Ok(i) = s.parse::<i64>() {
                return Ok(DriverArg::Int(i));
            }
            parse_float_token(s)
                .map(DriverArg::Float)
                .ok_or_else(|| CompatError::Translate(format!("not a number: {s:?}")))
        }
        CallerValue::Bool(b) => Ok(DriverArg::Int(i64::from(*b))),
        other => Err(CompatError::Translate(format!(
            "expected a number, got {}",
            other.shape()
        ))),
    }
}

/// Parse a score value for the sorted-set family.
///
/// Numbers, numeric strings, and the `-inf`/`+inf`/`Infinity`/`NaN` token
/// spellings are all valid scores.
pub fn parse_score(value: &CallerValue) -> CompatResult<f64> {
    match value {
        CallerValue::Int(i) => Ok(*i as f64),
        CallerValue::Float(f) => Ok(*f),
        CallerValue::Str(s) => parse_float_token(s)
            .ok_or_else(|| CompatError::Translate(format!("not a valid score: {s:?}"))),
        other => Err(CompatError::Translate(format!(
            "expected a score, got {}",
            other.shape()
        ))),
    }
}

/// Translate a flat array-family parameter.
///
/// Total: every element normalizes to its blob form; `Nil` elements become
/// empty-blob placeholders rather than being removed, so index alignment with
/// parallel arrays is preserved.
pub fn flat_args(values: &[CallerValue]) -> Vec<DriverArg> {
    values.iter().map(string_arg).collect()
}

/// Translate a field-map-family parameter (hash-set style).
///
/// Accepts either an already-flat `[field, value, field, value, ...]` list or
/// a single `Map`; both normalize to the identical flat sequence. A flat list
/// with an odd length has no defined pairing and is rejected.
pub fn field_map_args(values: &[CallerValue]) -> CompatResult<Vec<DriverArg>> {
    if let [CallerValue::Map(pairs)] = values {
        let mut args = Vec::with_capacity(pairs.len() * 2);
        for (field, value) in pairs {
            args.push(DriverArg::from(field.as_str()));
            args.push(string_arg(value));
        }
        return Ok(args);
    }

    if values.len() % 2 != 0 {
        return Err(CompatError::Translate(format!(
            "field/value list has odd length {}",
            values.len()
        )));
    }
    Ok(flat_args(values))
}

/// Translate a score/member-family parameter (sorted-set style).
///
/// Accepts interleaved `[score, member, score, member, ...]`; scores go
/// through [`parse_score`], members through the string family, and relative
/// pair order is preserved.
pub fn score_member_args(values: &[CallerValue]) -> CompatResult<Vec<DriverArg>> {
    if values.len() % 2 != 0 {
        return Err(CompatError::Translate(format!(
            "score/member list has odd length {}",
            values.len()
        )));
    }

    let mut args = Vec::with_capacity(values.len());
    for pair in values.chunks(2) {
        args.push(DriverArg::Float(parse_score(&pair[0])?));
        args.push(string_arg(&pair[1]));
    }
    Ok(args)
}

/// Translate a range-bound parameter.
///
/// Numeric bounds, the infinity tokens, and `(`-prefixed open-interval bounds
/// all pass through verbatim; the driver interprets the marker.
pub fn range_bound(value: &CallerValue) -> CompatResult<DriverArg> {
    match value {
        CallerValue::Int(i) => Ok(DriverArg::from(i.to_string())),
        CallerValue::Float(f) if f.is_infinite() => {
            Ok(DriverArg::from(if *f > 0.0 { "+inf" } else { "-inf" }))
        }
        CallerValue::Float(f) => Ok(DriverArg::from(f.to_string())),
        CallerValue::Str(s) if is_range_token(s) => Ok(DriverArg::from(s.as_str())),
        CallerValue::Str(s) => Err(CompatError::Translate(format!(
            "not a valid range bound: {s:?}"
        ))),
        other => Err(CompatError::Translate(format!(
            "expected a range bound, got {}",
            other.shape()
        ))),
    }
}

/// Append a trailing `LIMIT offset count` clause.
pub fn limit_clause(args: &mut Vec<DriverArg>, offset: i64, count: i64) {
    args.push(DriverArg::from("LIMIT"));
    args.push(DriverArg::Int(offset));
    args.push(DriverArg::Int(count));
}

/// Translate a command-option parameter sequence.
///
/// Flag tokens and flag+value pairs pass through in the order given; option
/// order is part of the wire contract for some command families, so nothing
/// here reorders or deduplicates.
pub fn option_args(tokens: &[CallerValue]) -> Vec<DriverArg> {
    flat_args(tokens)
}

/// Check whether an already-canonical argument list survives re-translation
/// unchanged; used by the idempotence tests and by callers that may hold a
/// pre-flattened form.
#[must_use]
pub fn is_canonical(values: &[CallerValue]) -> bool {
    values
        .iter()
        .all(|v| matches!(v, CallerValue::Str(_) | CallerValue::Bytes(_)))
}

fn is_range_token(s: &str) -> bool {
    let body = s.strip_prefix('(').unwrap_or(s);
    body.parse::<i64>().is_ok() || parse_float_token(body).is_some()
}

/// Parse the numeric token spellings the caller dialect allows, including the
/// signed infinity and NaN words.
fn parse_float_token(s: &str) -> Option<f64> {
    match s.trim() {
        "inf" | "+inf" | "Infinity" | "+Infinity" => Some(f64::INFINITY),
        "-inf" | "-Infinity" => Some(f64::NEG_INFINITY),
        "NaN" | "nan" => Some(f64::NAN),
        other => other.parse::<f64>().ok().filter(|f| f.is_finite()),
    }
}

/// Normalize one caller value to its blob form, bounded by depth.
fn scalar_bytes(value: &CallerValue, depth: usize) -> Bytes {
    if depth > MAX_ARG_DEPTH {
        return Bytes::from_static(NESTED_PLACEHOLDER.as_bytes());
    }
    match value {
        CallerValue::Nil => Bytes::new(),
        CallerValue::Bool(b) => Bytes::from_static(if *b { b"true" } else { b"false" }),
        CallerValue::Int(i) => Bytes::from(i.to_string().into_bytes()),
        CallerValue::Float(f) => Bytes::from(super::results::format_double(*f).into_bytes()),
        CallerValue::Str(s) => Bytes::from(s.clone().into_bytes()),
        CallerValue::Bytes(b) => b.clone(),
        CallerValue::List(items) => {
            // Nested arrays flatten to a comma-joined rendering, matching the
            // caller dialect's string coercion of arrays.
            let parts: Vec<Bytes> = items.iter().map(|v| scalar_bytes(v, depth + 1)).collect();
            let mut joined = Vec::new();
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    joined.push(b',');
                }
                joined.extend_from_slice(part);
            }
            Bytes::from(joined)
        }
        CallerValue::Map(pairs) => {
            let mut joined = Vec::new();
            for (i, (field, value)) in pairs.iter().enumerate() {
                if i > 0 {
                    joined.push(b',');
                }
                joined.extend_from_slice(field.as_bytes());
                joined.push(b'=');
                joined.extend_from_slice(&scalar_bytes(value, depth + 1));
            }
            Bytes::from(joined)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(s: &str) -> DriverArg {
        DriverArg::from(s)
    }

    #[test]
    fn string_arg_passes_through_awkward_strings() {
        assert_eq!(string_arg(&CallerValue::from("")), blob(""));
        assert_eq!(string_arg(&CallerValue::from("a\0b")), blob("a\0b"));
        assert_eq!(string_arg(&CallerValue::from("héllo")), blob("héllo"));
        assert_eq!(string_arg(&CallerValue::Nil), blob(""));
    }

    #[test]
    fn numeric_arg_parses_strings_and_sentinels() {
        assert_eq!(
            numeric_arg(&CallerValue::from("123")).unwrap(),
            DriverArg::Int(123)
        );
        assert_eq!(
            numeric_arg(&CallerValue::from("45.67")).unwrap(),
            DriverArg::Float(45.67)
        );
        assert!(matches!(
            numeric_arg(&CallerValue::from("Infinity")).unwrap(),
            DriverArg::Float(f) if f.is_infinite() && f > 0.0
        ));
        assert!(matches!(
            numeric_arg(&CallerValue::from("NaN")).unwrap(),
            DriverArg::Float(f) if f.is_nan()
        ));
        assert!(numeric_arg(&CallerValue::from("abc")).is_err());
    }

    #[test]
    fn flat_args_keeps_nil_placeholders() {
        let values = vec![
            CallerValue::from("k1"),
            CallerValue::Nil,
            CallerValue::from("k2"),
        ];
        let args = flat_args(&values);
        assert_eq!(args, vec![blob("k1"), blob(""), blob("k2")]);
    }

    #[test]
    fn field_map_forms_normalize_identically() {
        let flat = vec![
            CallerValue::from("f1"),
            CallerValue::from("v1"),
            CallerValue::from("f2"),
            CallerValue::from(2i64),
        ];
        let map = vec![CallerValue::Map(vec![
            ("f1".to_string(), CallerValue::from("v1")),
            ("f2".to_string(), CallerValue::from(2i64)),
        ])];

        assert_eq!(field_map_args(&flat).unwrap(), field_map_args(&map).unwrap());
    }

    #[test]
    fn field_map_rejects_odd_flat_list() {
        let flat = vec![CallerValue::from("f1")];
        assert!(matches!(
            field_map_args(&flat),
            Err(CompatError::Translate(_))
        ));
    }

    #[test]
    fn score_member_preserves_pair_order() {
        let values = vec![
            CallerValue::from("2"),
            CallerValue::from("b"),
            CallerValue::from(1i64),
            CallerValue::from("a"),
            CallerValue::from("-inf"),
            CallerValue::from("floor"),
        ];
        let args = score_member_args(&values).unwrap();
        assert_eq!(args.len(), 6);
        assert_eq!(args[0], DriverArg::Float(2.0));
        assert_eq!(args[1], blob("b"));
        assert_eq!(args[2], DriverArg::Float(1.0));
        assert!(matches!(args[4], DriverArg::Float(f) if f.is_infinite() && f < 0.0));
    }

    #[test]
    fn range_bounds_keep_exclusivity_markers() {
        assert_eq!(
            range_bound(&CallerValue::from("(5")).unwrap(),
            blob("(5")
        );
        assert_eq!(
            range_bound(&CallerValue::from("+inf")).unwrap(),
            blob("+inf")
        );
        assert_eq!(
            range_bound(&CallerValue::Float(f64::NEG_INFINITY)).unwrap(),
            blob("-inf")
        );
        assert!(range_bound(&CallerValue::from("five")).is_err());
    }

    #[test]
    fn option_args_keep_order() {
        let tokens = vec![
            CallerValue::from("XX"),
            CallerValue::from("EX"),
            CallerValue::from(30i64),
        ];
        let args = option_args(&tokens);
        assert_eq!(args, vec![blob("XX"), blob("EX"), blob("30")]);
    }

    #[test]
    fn deep_nesting_collapses_to_placeholder() {
        let mut value = CallerValue::from("leaf");
        for _ in 0..(MAX_ARG_DEPTH + 4) {
            value = CallerValue::List(vec![value]);
        }
        let arg = string_arg(&value);
        if let DriverArg::Blob(bytes) = arg {
            let text = String::from_utf8(bytes.to_vec()).unwrap();
            assert!(text.contains(NESTED_PLACEHOLDER));
            assert!(!text.contains("leaf"));
        } else {
            panic!("expected blob");
        }
    }

    #[test]
    fn translating_canonical_args_is_noop() {
        let canonical = vec![CallerValue::from("a"), CallerValue::from("b")];
        assert!(is_canonical(&canonical));
        assert_eq!(flat_args(&canonical), vec![blob("a"), blob("b")]);
    }
}
