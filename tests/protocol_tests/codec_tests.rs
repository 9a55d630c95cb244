//! Codec Tests
//!
//! Tests for value encoding/decoding and the reply grammar.

use dlcpro::protocol::{decode, encode, parse_atom, Value};
use dlcpro::{DlcError, MalformedResponse};

fn malformed(bytes: &[u8]) -> MalformedResponse {
    match decode(bytes) {
        Err(DlcError::Malformed(m)) => m,
        other => panic!("expected malformed response for {:?}, got {:?}", String::from_utf8_lossy(bytes), other),
    }
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_encode_atoms() {
    assert_eq!(encode(&Value::Boolean(true)).unwrap(), b"#t");
    assert_eq!(encode(&Value::Boolean(false)).unwrap(), b"#f");
    assert_eq!(encode(&Value::Integer(-17)).unwrap(), b"-17");
    assert_eq!(encode(&Value::Float(0.001)).unwrap(), b"0.001");
    assert_eq!(encode(&Value::from("hello world")).unwrap(), b"\"hello world\"");
}

#[test]
fn test_encode_nested_list() {
    let value = Value::List(vec![
        Value::Integer(1),
        Value::List(vec![Value::Boolean(false), Value::from("x")]),
        Value::List(vec![]),
    ]);
    assert_eq!(encode(&value).unwrap(), b"(1 (#f \"x\") ())");
}

#[test]
fn test_encode_embedded_quote_passes_through() {
    assert_eq!(encode(&Value::from("a\"b")).unwrap(), b"\"a\"b\"");
}

#[test]
fn test_encode_unsupported_values() {
    assert!(matches!(
        encode(&Value::Float(f64::NAN)),
        Err(DlcError::UnsupportedType(_))
    ));
    assert!(matches!(
        encode(&Value::Float(f64::INFINITY)),
        Err(DlcError::UnsupportedType(_))
    ));
    assert!(matches!(
        encode(&Value::from(vec!["µA"])),
        Err(DlcError::UnsupportedType(_))
    ));
}

// =============================================================================
// Decoding Tests
// =============================================================================

#[test]
fn test_decode_atoms() {
    assert_eq!(decode(b"#t").unwrap(), Value::Boolean(true));
    assert_eq!(decode(b"123").unwrap(), Value::Integer(123));
    assert_eq!(decode(b"-0.5").unwrap(), Value::Float(-0.5));
    assert_eq!(decode(b"\"DL pro\"").unwrap(), Value::from("DL pro"));
}

#[test]
fn test_decode_nested_lists() {
    let value = decode(b"((1 2) (3 (4 \"five\")) ())").unwrap();
    assert_eq!(
        value,
        Value::List(vec![
            Value::from(vec![1, 2]),
            Value::List(vec![
                Value::Integer(3),
                Value::List(vec![Value::Integer(4), Value::from("five")]),
            ]),
            Value::unit(),
        ])
    );
}

#[test]
fn test_decode_quoted_parentheses() {
    assert_eq!(
        decode(b"(\"a)b\" 1 2)").unwrap(),
        Value::List(vec![Value::from("a)b"), Value::Integer(1), Value::Integer(2)])
    );
    assert_eq!(
        decode(b"(\"((\" \")\")").unwrap(),
        Value::List(vec![Value::from("(("), Value::from(")")])
    );
}

#[test]
fn test_decode_string_keeps_spaces() {
    assert_eq!(decode(b"\"  padded  \"").unwrap(), Value::from("  padded  "));
    assert_eq!(
        decode(b"(\"two words\" 2)").unwrap(),
        Value::List(vec![Value::from("two words"), Value::Integer(2)])
    );
}

#[test]
fn test_malformed_error_message() {
    let err = decode(b"(\"two words\" x1)").unwrap_err();
    assert_eq!(err.to_string(), "Malformed response: could not parse atom 'x1'");
}

#[test]
fn test_decode_whitespace_between_tokens() {
    assert_eq!(decode(b"  ( 1   2\n3 )  ").unwrap(), Value::from(vec![1, 2, 3]));
}

#[test]
fn test_decode_empty_list() {
    let value = decode(b"()").unwrap();
    assert!(value.is_unit());
}

#[test]
fn test_parse_atom_order() {
    // Integers win over floats, floats over text
    assert_eq!(parse_atom(b"10").unwrap(), Value::Integer(10));
    assert_eq!(parse_atom(b"10.0").unwrap(), Value::Float(10.0));
    assert_eq!(parse_atom(b"\"10\"").unwrap(), Value::from("10"));
}

// =============================================================================
// Malformed Input Tests
// =============================================================================

#[test]
fn test_unterminated_string() {
    assert_eq!(
        malformed(b"\"never closed"),
        MalformedResponse::UnterminatedString { position: 0 }
    );
    assert_eq!(
        malformed(b"(1 \"open"),
        MalformedResponse::UnterminatedString { position: 3 }
    );
}

#[test]
fn test_unterminated_list() {
    assert_eq!(
        malformed(b"(1 2"),
        MalformedResponse::UnterminatedList { position: 0 }
    );
    assert_eq!(
        malformed(b"(1 (2 \")\" 3)"),
        MalformedResponse::UnterminatedList { position: 0 }
    );
}

#[test]
fn test_unmatched_close() {
    assert_eq!(
        malformed(b")"),
        MalformedResponse::UnexpectedClose { position: 0 }
    );
}

#[test]
fn test_multiple_top_level_values() {
    assert_eq!(
        malformed(b"1 2"),
        MalformedResponse::MultipleTopLevelValues(2)
    );
    assert_eq!(
        malformed(b"(1) \"a\" #t"),
        MalformedResponse::MultipleTopLevelValues(3)
    );
}

#[test]
fn test_unparsable_atom() {
    assert_eq!(
        malformed(b"(1 foo)"),
        MalformedResponse::UnparsableAtom("foo".to_string())
    );
}

#[test]
fn test_empty_input() {
    assert_eq!(malformed(b""), MalformedResponse::Empty);
    assert_eq!(malformed(b" \r\n"), MalformedResponse::Empty);
}

#[test]
fn test_invalid_utf8_in_string() {
    assert_eq!(
        malformed(b"(\"\xff\xfe\")"),
        MalformedResponse::InvalidUtf8 { position: 1 }
    );
}

// =============================================================================
// Deep Nesting Tests
// =============================================================================

fn nested(depth: usize) -> Vec<u8> {
    let mut bytes = vec![b'('; depth];
    bytes.push(b'7');
    bytes.extend(std::iter::repeat(b')').take(depth));
    bytes
}

/// Number of list levels around the innermost value, counted without recursion
fn depth_of(value: &Value) -> (usize, &Value) {
    let mut depth = 0;
    let mut current = value;
    while let Some([inner]) = current.as_list() {
        depth += 1;
        current = inner;
    }
    (depth, current)
}

#[test]
fn test_decode_deeply_nested_list() {
    let depth = 200_000;
    let wire = nested(depth);

    let value = decode(&wire).unwrap();
    let (levels, innermost) = depth_of(&value);
    assert_eq!(levels, depth);
    assert_eq!(*innermost, Value::Integer(7));

    // Encoding, display and drop walk the same depth
    assert_eq!(encode(&value).unwrap(), wire);
    assert_eq!(value.to_string().len(), wire.len());
    drop(value);
}

#[test]
fn test_deeply_nested_unterminated_list() {
    let mut wire = nested(100_000);
    wire.pop();
    assert_eq!(malformed(&wire), MalformedResponse::UnterminatedList { position: 0 });

    let mut wire = nested(100_000);
    wire.push(b')');
    assert_eq!(
        malformed(&wire),
        MalformedResponse::UnexpectedClose { position: 200_001 }
    );
}

// =============================================================================
// Round-trip Tests
// =============================================================================

#[test]
fn test_round_trip_representative_values() {
    let values = vec![
        Value::Boolean(true),
        Value::Integer(i64::MIN),
        Value::Integer(i64::MAX),
        Value::Float(1.0),
        Value::Float(-1e-9),
        Value::Float(123456789.125),
        Value::Float(1e21),
        Value::from(""),
        Value::from("with (parens) and spaces"),
        Value::unit(),
        Value::List(vec![
            Value::from(vec![Value::unit(), Value::from("x)")]),
            Value::Float(0.1),
            Value::Boolean(false),
        ]),
    ];

    for value in values {
        let encoded = encode(&value).unwrap();
        assert_eq!(decode(&encoded).unwrap(), value, "wire form {:?}", String::from_utf8_lossy(&encoded));
    }
}
