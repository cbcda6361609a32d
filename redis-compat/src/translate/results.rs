//! Result translation: driver dialect to caller dialect
//!
//! The inverse mapping: every structured driver result reshapes into the flat
//! string/array encoding the caller expects. Translation is total and
//! deterministic: the same `DriverReply` always yields the identical
//! `CallerReply`, with no locale-dependent number formatting.

use redis_compat_core::{
    CallerReply, CompatError, DriverError, DriverReply, ScoredMember, StreamEntry,
};

/// Render a driver double in the caller dialect.
///
/// Integers render without a decimal point or trailing zeros; non-integers
/// render as the shortest decimal that parses back to the same value; the
/// special values render as the literal words `Infinity`, `-Infinity`, and
/// `NaN`. Both zeros render `"0"`.
#[must_use]
pub fn format_double(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    value.to_string()
}

/// Translate a driver result in scalar position.
///
/// `Nil` stays the absence sentinel here; inside arrays it becomes the empty
/// string instead, because array positions must be preserved for parallel
/// decoding.
#[must_use]
pub fn caller_reply(reply: DriverReply) -> CallerReply {
    match reply {
        DriverReply::Ok => CallerReply::Str("OK".to_string()),
        DriverReply::Nil => CallerReply::Nil,
        DriverReply::Bool(b) => CallerReply::Int(i64::from(b)),
        DriverReply::Int(i) => CallerReply::Int(i),
        DriverReply::Double(f) => CallerReply::Str(format_double(f)),
        DriverReply::Blob(b) => CallerReply::Str(String::from_utf8_lossy(&b).into_owned()),
        DriverReply::List(items) => {
            CallerReply::Array(items.into_iter().map(element_reply).collect())
        }
        DriverReply::Scored(members) => scored_to_flat(members),
        DriverReply::Entries(entries) => entries_to_nested(entries),
    }
}

/// Translate a driver result in array-element position: `Nil` leaves become
/// the empty string so positions stay aligned.
fn element_reply(reply: DriverReply) -> CallerReply {
    match reply {
        DriverReply::Nil => CallerReply::Str(String::new()),
        other => caller_reply(other),
    }
}

/// Flatten a sorted-set record list into the alternating
/// `[member, score, member, score, ...]` caller encoding.
#[must_use]
pub fn scored_to_flat(members: Vec<ScoredMember>) -> CallerReply {
    let mut flat = Vec::with_capacity(members.len() * 2);
    for ScoredMember { member, score } in members {
        flat.push(CallerReply::Str(
            String::from_utf8_lossy(&member).into_owned(),
        ));
        flat.push(CallerReply::Str(format_double(score)));
    }
    CallerReply::Array(flat)
}

/// Flatten a stream record list into nested
/// `[[id, [field, value, ...]], ...]` caller encoding.
#[must_use]
pub fn entries_to_nested(entries: Vec<StreamEntry>) -> CallerReply {
    let nested = entries
        .into_iter()
        .map(|entry| {
            let mut fields = Vec::with_capacity(entry.fields.len() * 2);
            for (field, value) in entry.fields {
                fields.push(CallerReply::Str(String::from_utf8_lossy(&field).into_owned()));
                fields.push(CallerReply::Str(String::from_utf8_lossy(&value).into_owned()));
            }
            CallerReply::Array(vec![CallerReply::Str(entry.id), CallerReply::Array(fields)])
        })
        .collect();
    CallerReply::Array(nested)
}

/// Translate a score-carrying blocking-pop result.
///
/// A 3-element `[key, member, score]` becomes `[key, member, scoreString]`;
/// any other arity, or a `Nil`/non-array result, translates to `Nil`, since
/// "no data within the timeout" is an expected outcome rather than an error.
#[must_use]
pub fn blocking_pop_reply(reply: DriverReply) -> CallerReply {
    match reply {
        DriverReply::List(items) if items.len() == 3 => {
            let mut it = items.into_iter();
            let key = element_reply(it.next().unwrap_or(DriverReply::Nil));
            let member = element_reply(it.next().unwrap_or(DriverReply::Nil));
            let score = match it.next() {
                Some(DriverReply::Double(f)) => CallerReply::Str(format_double(f)),
                Some(other) => element_reply(other),
                None => CallerReply::Str(String::new()),
            };
            CallerReply::Array(vec![key, member, score])
        }
        _ => CallerReply::Nil,
    }
}

/// Translate a driver failure into the caller's error convention.
///
/// Structured errors pass through unchanged, preserving their kind and
/// message. Shapeless failures collapse into the fixed unknown-driver-error
/// variant, never a fabricated, more specific message.
#[must_use]
pub fn translate_error(error: DriverError) -> CompatError {
    match error {
        DriverError::Raw(_) => CompatError::UnknownDriver,
        structured => CompatError::Driver(structured),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn double_formatting_edges() {
        assert_eq!(format_double(0.0), "0");
        assert_eq!(format_double(-0.0), "0");
        assert_eq!(format_double(1.5), "1.5");
        assert_eq!(format_double(2.0), "2");
        assert_eq!(format_double(-17.0), "-17");
        assert_eq!(format_double(f64::INFINITY), "Infinity");
        assert_eq!(format_double(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_double(f64::NAN), "NaN");
        assert_eq!(format_double(9007199254740991.0), "9007199254740991");
    }

    #[test]
    fn double_formatting_shortest_round_trip() {
        assert_eq!(format_double(1.5), "1.5");
        assert_eq!(format_double(0.1), "0.1");
        // One ulp below 2 keeps its full representation...
        assert_eq!(format_double(1.999_999_999_999_999_8), "1.9999999999999998");
        // ...but a literal with more digits than the type holds collapses to
        // the nearer integer.
        assert_eq!(format_double("1.99999999999999998".parse().unwrap()), "2");
        // Stability across repeated calls.
        assert_eq!(format_double(1.5), format_double(1.5));
    }

    #[test]
    fn scored_records_flatten_alternating() {
        let reply = caller_reply(DriverReply::Scored(vec![
            ScoredMember::new("a", 1.0),
            ScoredMember::new("b", 2.5),
            ScoredMember::new("top", f64::INFINITY),
        ]));
        assert_eq!(
            reply,
            CallerReply::Array(vec![
                CallerReply::Str("a".into()),
                CallerReply::Str("1".into()),
                CallerReply::Str("b".into()),
                CallerReply::Str("2.5".into()),
                CallerReply::Str("top".into()),
                CallerReply::Str("Infinity".into()),
            ])
        );
    }

    #[test]
    fn nil_is_positional_in_arrays_and_absent_at_top() {
        assert_eq!(caller_reply(DriverReply::Nil), CallerReply::Nil);

        let reply = caller_reply(DriverReply::List(vec![
            DriverReply::blob("v1"),
            DriverReply::Nil,
            DriverReply::blob("v3"),
        ]));
        assert_eq!(
            reply,
            CallerReply::Array(vec![
                CallerReply::Str("v1".into()),
                CallerReply::Str(String::new()),
                CallerReply::Str("v3".into()),
            ])
        );
    }

    #[test]
    fn blocking_pop_shapes() {
        let hit = blocking_pop_reply(DriverReply::List(vec![
            DriverReply::blob("zset"),
            DriverReply::blob("member"),
            DriverReply::Double(1.5),
        ]));
        assert_eq!(
            hit,
            CallerReply::Array(vec![
                CallerReply::Str("zset".into()),
                CallerReply::Str("member".into()),
                CallerReply::Str("1.5".into()),
            ])
        );

        assert_eq!(blocking_pop_reply(DriverReply::Nil), CallerReply::Nil);
        assert_eq!(
            blocking_pop_reply(DriverReply::List(vec![DriverReply::blob("only-key")])),
            CallerReply::Nil
        );
        assert_eq!(blocking_pop_reply(DriverReply::Int(3)), CallerReply::Nil);
    }

    #[test]
    fn stream_entries_nest() {
        let reply = caller_reply(DriverReply::Entries(vec![StreamEntry {
            id: "1-0".to_string(),
            fields: vec![(Bytes::from_static(b"user"), Bytes::from_static(b"alice"))],
        }]));
        assert_eq!(
            reply,
            CallerReply::Array(vec![CallerReply::Array(vec![
                CallerReply::Str("1-0".into()),
                CallerReply::Array(vec![
                    CallerReply::Str("user".into()),
                    CallerReply::Str("alice".into()),
                ]),
            ])])
        );
    }

    #[test]
    fn structured_errors_pass_through_raw_errors_collapse() {
        let structured = DriverError::command("WRONGTYPE", "bad type");
        assert_eq!(
            translate_error(structured.clone()),
            CompatError::Driver(structured)
        );

        assert_eq!(
            translate_error(DriverError::Raw(Some("whatever".into()))),
            CompatError::UnknownDriver
        );
        assert_eq!(translate_error(DriverError::Raw(None)), CompatError::UnknownDriver);
    }
}
