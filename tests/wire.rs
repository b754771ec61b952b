//! Wire-format conformance: known byte sequences and boundary values.

use avro_core::{Schema, from_avro_datum, to_avro_datum, types::Value};
use pretty_assertions::assert_eq;
use std::collections::HashMap;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn round_trip(schema: &Schema, value: Value, expected: &[u8]) -> TestResult {
    let encoded = to_avro_datum(schema, value.clone())?;
    assert_eq!(encoded, expected, "encoding of {value:?}");
    assert_eq!(
        from_avro_datum(schema, &mut &encoded[..], None)?,
        value,
        "decoding of {expected:?}"
    );
    Ok(())
}

#[test]
fn spec_seed_vectors() -> TestResult {
    round_trip(&Schema::Int, Value::Int(64), &[0x80, 0x01])?;
    round_trip(&Schema::Int, Value::Int(-1), &[0x01])?;
    round_trip(
        &Schema::String,
        Value::String("foo".to_string()),
        &[0x06, 0x66, 0x6F, 0x6F],
    )?;

    let array = Schema::parse_str(r#"{"type": "array", "items": "long"}"#)?;
    round_trip(
        &array,
        Value::Array(vec![Value::Long(3), Value::Long(27)]),
        &[0x04, 0x06, 0x36, 0x00],
    )?;

    let union = Schema::parse_str(r#"["null", "string"]"#)?;
    round_trip(&union, Value::Union(0, Box::new(Value::Null)), &[0x00])?;
    round_trip(
        &union,
        Value::Union(1, Box::new(Value::String("a".to_string()))),
        &[0x02, 0x02, 0x61],
    )?;
    Ok(())
}

#[test]
fn integer_boundaries() -> TestResult {
    for value in [0, 1, -1, i32::MIN, i32::MAX] {
        let encoded = to_avro_datum(&Schema::Int, Value::Int(value))?;
        assert!(encoded.len() <= 5, "int {value} took {} bytes", encoded.len());
        assert_eq!(
            from_avro_datum(&Schema::Int, &mut &encoded[..], None)?,
            Value::Int(value)
        );
    }
    for value in [0, 1, -1, i64::MIN, i64::MAX] {
        let encoded = to_avro_datum(&Schema::Long, Value::Long(value))?;
        assert!(
            encoded.len() <= 10,
            "long {value} took {} bytes",
            encoded.len()
        );
        assert_eq!(
            from_avro_datum(&Schema::Long, &mut &encoded[..], None)?,
            Value::Long(value)
        );
    }
    Ok(())
}

#[test]
fn empty_aggregates() -> TestResult {
    round_trip(&Schema::Bytes, Value::Bytes(Vec::new()), &[0x00])?;
    round_trip(&Schema::String, Value::String(String::new()), &[0x00])?;

    let array = Schema::parse_str(r#"{"type": "array", "items": "int"}"#)?;
    round_trip(&array, Value::Array(Vec::new()), &[0x00])?;

    let map = Schema::parse_str(r#"{"type": "map", "values": "int"}"#)?;
    round_trip(&map, Value::Map(HashMap::new()), &[0x00])?;

    let empty_record = Schema::parse_str(r#"{"type": "record", "name": "nothing", "fields": []}"#)?;
    round_trip(&empty_record, Value::Record(Vec::new()), &[])?;
    Ok(())
}

#[test]
fn floats_are_little_endian_ieee754() -> TestResult {
    round_trip(&Schema::Float, Value::Float(1.0), &1.0f32.to_le_bytes())?;
    round_trip(&Schema::Double, Value::Double(-2.5), &(-2.5f64).to_le_bytes())?;
    round_trip(
        &Schema::Double,
        Value::Double(f64::NEG_INFINITY),
        &f64::NEG_INFINITY.to_le_bytes(),
    )?;
    Ok(())
}

#[test]
fn booleans_are_one_strict_byte() -> TestResult {
    round_trip(&Schema::Boolean, Value::Boolean(false), &[0x00])?;
    round_trip(&Schema::Boolean, Value::Boolean(true), &[0x01])?;
    assert!(from_avro_datum(&Schema::Boolean, &mut &[0x02u8][..], None).is_err());
    Ok(())
}

#[test]
fn union_index_boundaries() -> TestResult {
    let schema = Schema::parse_str(r#"["int", "string", "boolean"]"#)?;
    round_trip(&schema, Value::Union(0, Box::new(Value::Int(1))), &[0x00, 0x02])?;
    round_trip(
        &schema,
        Value::Union(2, Box::new(Value::Boolean(true))),
        &[0x04, 0x01],
    )?;
    // An out-of-range index on the wire must fail.
    assert!(from_avro_datum(&schema, &mut &[0x06u8, 0x01][..], None).is_err());
    Ok(())
}

#[test]
fn map_entries_are_key_then_value() -> TestResult {
    let schema = Schema::parse_str(r#"{"type": "map", "values": "int"}"#)?;
    let mut entries = HashMap::new();
    entries.insert("k".to_string(), Value::Int(3));
    let encoded = to_avro_datum(&schema, Value::Map(entries.clone()))?;
    assert_eq!(encoded, [0x02, 0x02, b'k', 0x06, 0x00]);
    assert_eq!(
        from_avro_datum(&schema, &mut &encoded[..], None)?,
        Value::Map(entries)
    );
    Ok(())
}

#[test]
fn nested_record_wire_layout() -> TestResult {
    let schema = Schema::parse_str(
        r#"{
            "type": "record", "name": "outer",
            "fields": [
                {"name": "flag", "type": "boolean"},
                {
                    "name": "inner",
                    "type": {
                        "type": "record", "name": "pair",
                        "fields": [
                            {"name": "x", "type": "int"},
                            {"name": "y", "type": "int"}
                        ]
                    }
                }
            ]
        }"#,
    )?;
    let value = Value::Record(vec![
        ("flag".to_string(), Value::Boolean(true)),
        (
            "inner".to_string(),
            Value::Record(vec![
                ("x".to_string(), Value::Int(1)),
                ("y".to_string(), Value::Int(-2)),
            ]),
        ),
    ]);
    // records have no framing of their own
    round_trip(&schema, value, &[0x01, 0x02, 0x03])?;
    Ok(())
}

#[test]
fn validation_rejects_mismatched_values() -> TestResult {
    assert!(to_avro_datum(&Schema::Int, Value::Long(1)).is_err());
    assert!(to_avro_datum(&Schema::String, Value::Bytes(vec![1])).is_err());

    let fixed = Schema::parse_str(r#"{"type": "fixed", "name": "f4", "size": 4}"#)?;
    assert!(to_avro_datum(&fixed, Value::Fixed(3, vec![1, 2, 3])).is_err());
    assert!(to_avro_datum(&fixed, Value::Fixed(4, vec![1, 2, 3, 4])).is_ok());
    Ok(())
}
