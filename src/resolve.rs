//! Schema resolution: reading data written under one schema through a
//! compatible reader schema.
//!
//! A writer/reader pair is compiled once into a [`ResolutionPlan`], a tree of
//! resolution nodes; every subsequent datum read is a table-driven walk of
//! that tree. Named writer/reader pairs are compiled into an arena and
//! referenced by index, so recursive records compile to a finite plan.

use crate::{
    AvroResult,
    decode::{decode_block_count, decode_internal, decode_len},
    error::Error,
    schema::{
        DecimalSchema, EnumSchema, FixedSchema, Name, Names, RecordSchema, Schema, SchemaKind,
        UnionSchema,
    },
    types::Value,
    util::{zag_i32, zag_i64},
};
use std::{collections::HashMap, io::Read};

/// A compiled writer/reader schema pair.
#[derive(Debug, Clone)]
pub struct ResolutionPlan {
    writer_names: Names,
    named: Vec<PlanNode>,
    root: PlanNode,
}

#[derive(Debug, Clone)]
enum PlanNode {
    /// Writer and reader agree on the wire shape; decode with this schema.
    Direct(Schema),
    /// Decode the writer's primitive, widen to the reader's.
    Promote(Promotion),
    Array(Box<PlanNode>),
    Map(Box<PlanNode>),
    Record(RecordPlan),
    Enum(EnumPlan),
    /// Writer union read by a non-union reader: the runtime branch decides.
    WriterUnion { branches: Vec<PlanNode> },
    /// Non-union writer read into a union reader branch.
    ReaderUnion { index: u32, inner: Box<PlanNode> },
    /// Union on both sides: one pre-resolved node per writer branch.
    UnionToUnion { branches: Vec<PlanNode> },
    /// A named pair compiled in the arena.
    NamedRef(usize),
    /// A writer-union branch that does not resolve; fails only if it is the
    /// branch actually encountered at read time.
    Incompatible {
        writer: Box<Schema>,
        reader: Box<Schema>,
    },
}

#[derive(Debug, Clone, Copy)]
enum Promotion {
    IntToLong,
    IntToFloat,
    IntToDouble,
    LongToFloat,
    LongToDouble,
    FloatToDouble,
    StringToBytes,
    BytesToString,
}

#[derive(Debug, Clone)]
struct RecordPlan {
    /// One step per writer field, in writer declaration order.
    steps: Vec<FieldStep>,
    /// Reader positions filled from defaults, materialized at compile time.
    defaults: Vec<(usize, Value)>,
    /// Reader field names, in reader declaration order.
    reader_fields: Vec<String>,
}

#[derive(Debug, Clone)]
enum FieldStep {
    /// Decode through `plan` into the reader position.
    Read { position: usize, plan: PlanNode },
    /// Decode with the writer schema and discard.
    Skip(Schema),
}

#[derive(Debug, Clone)]
struct EnumPlan {
    writer_symbols: Vec<String>,
    reader_symbols: Vec<String>,
    /// Writer index to reader index; `None` falls back to the default.
    mapping: Vec<Option<u32>>,
    default: Option<u32>,
}

impl ResolutionPlan {
    /// Compile a plan for reading data written with `writer` through `reader`.
    ///
    /// Fails with a schema-mismatch error when the pair is statically
    /// incompatible under the resolution rules.
    pub fn compile(writer: &Schema, reader: &Schema) -> AvroResult<Self> {
        let writer_names = writer.names();
        let reader_names = reader.names();
        let mut compiler = Compiler {
            writer_names: &writer_names,
            reader_names: &reader_names,
            memo: HashMap::new(),
            nodes: Vec::new(),
        };
        let root = compiler.compile(writer, reader)?;
        let named = compiler
            .nodes
            .into_iter()
            .map(|node| node.expect("arena entries are filled before compile returns"))
            .collect();
        Ok(Self {
            writer_names,
            named,
            root,
        })
    }

    /// Read one datum through the plan.
    pub fn read_value<R: Read>(&self, reader: &mut R) -> AvroResult<Value> {
        self.read_node(&self.root, reader)
    }

    fn read_node<R: Read>(&self, node: &PlanNode, reader: &mut R) -> AvroResult<Value> {
        match node {
            PlanNode::Direct(schema) => decode_internal(schema, &self.writer_names, reader),
            PlanNode::Promote(promotion) => promotion.read(reader),
            PlanNode::Array(inner) => {
                let mut items = Vec::new();
                loop {
                    let count = decode_block_count(reader)?;
                    if count == 0 {
                        break;
                    }
                    items.reserve(count);
                    for _ in 0..count {
                        items.push(self.read_node(inner, reader)?);
                    }
                }
                Ok(Value::Array(items))
            }
            PlanNode::Map(inner) => {
                let mut entries = HashMap::new();
                loop {
                    let count = decode_block_count(reader)?;
                    if count == 0 {
                        break;
                    }
                    entries.reserve(count);
                    for _ in 0..count {
                        let key = match decode_internal(&Schema::String, &self.writer_names, reader)? {
                            Value::String(key) => key,
                            _ => unreachable!("a string schema decodes to a string"),
                        };
                        let value = self.read_node(inner, reader)?;
                        entries.insert(key, value);
                    }
                }
                Ok(Value::Map(entries))
            }
            PlanNode::Record(plan) => {
                let mut slots: Vec<Option<Value>> = vec![None; plan.reader_fields.len()];
                for step in &plan.steps {
                    match step {
                        FieldStep::Read { position, plan } => {
                            slots[*position] = Some(self.read_node(plan, reader)?);
                        }
                        FieldStep::Skip(schema) => {
                            decode_internal(schema, &self.writer_names, reader)?;
                        }
                    }
                }
                for (position, default) in &plan.defaults {
                    slots[*position] = Some(default.clone());
                }
                plan.reader_fields
                    .iter()
                    .zip(slots)
                    .map(|(name, slot)| {
                        slot.map(|value| (name.clone(), value))
                            .ok_or_else(|| Error::ResolveRecordField(name.clone()))
                    })
                    .collect::<AvroResult<Vec<_>>>()
                    .map(Value::Record)
            }
            PlanNode::Enum(plan) => {
                let index = zag_i32(reader)?;
                let mapped = usize::try_from(index)
                    .ok()
                    .and_then(|i| plan.mapping.get(i).copied())
                    .ok_or(Error::GetEnumValue {
                        index: index.max(0) as usize,
                        nsymbols: plan.writer_symbols.len(),
                    })?;
                let reader_index = match mapped.or(plan.default) {
                    Some(reader_index) => reader_index,
                    None => {
                        return Err(Error::ResolveEnumSymbol(
                            plan.writer_symbols[index as usize].clone(),
                        ));
                    }
                };
                Ok(Value::Enum(
                    reader_index,
                    plan.reader_symbols[reader_index as usize].clone(),
                ))
            }
            PlanNode::WriterUnion { branches } => {
                let index = zag_i64(reader)?;
                let branch = usize::try_from(index)
                    .ok()
                    .and_then(|i| branches.get(i))
                    .ok_or(Error::GetUnionVariant {
                        index,
                        num_variants: branches.len(),
                    })?;
                self.read_node(branch, reader)
            }
            PlanNode::ReaderUnion { index, inner } => {
                let value = self.read_node(inner, reader)?;
                Ok(Value::Union(*index, Box::new(value)))
            }
            PlanNode::UnionToUnion { branches } => {
                let index = zag_i64(reader)?;
                let branch = usize::try_from(index)
                    .ok()
                    .and_then(|i| branches.get(i))
                    .ok_or(Error::GetUnionVariant {
                        index,
                        num_variants: branches.len(),
                    })?;
                self.read_node(branch, reader)
            }
            PlanNode::NamedRef(index) => self.read_node(&self.named[*index], reader),
            PlanNode::Incompatible { writer, reader } => Err(Error::SchemaIncompatible {
                writer: writer.clone(),
                reader: reader.clone(),
            }),
        }
    }
}

impl Promotion {
    fn read<R: Read>(self, reader: &mut R) -> AvroResult<Value> {
        match self {
            Promotion::IntToLong => zag_i32(reader).map(|i| Value::Long(i as i64)),
            Promotion::IntToFloat => zag_i32(reader).map(|i| Value::Float(i as f32)),
            Promotion::IntToDouble => zag_i32(reader).map(|i| Value::Double(i as f64)),
            Promotion::LongToFloat => zag_i64(reader).map(|i| Value::Float(i as f32)),
            Promotion::LongToDouble => zag_i64(reader).map(|i| Value::Double(i as f64)),
            Promotion::FloatToDouble => {
                let mut buf = [0u8; 4];
                reader.read_exact(&mut buf[..]).map_err(Error::ReadFloat)?;
                Ok(Value::Double(f32::from_le_bytes(buf) as f64))
            }
            Promotion::StringToBytes => {
                let len = decode_len(reader)?;
                let mut payload = vec![0u8; len];
                reader.read_exact(&mut payload).map_err(Error::ReadBytes)?;
                Ok(Value::Bytes(payload))
            }
            Promotion::BytesToString => {
                let len = decode_len(reader)?;
                let mut payload = vec![0u8; len];
                reader.read_exact(&mut payload).map_err(Error::ReadBytes)?;
                String::from_utf8(payload)
                    .map(Value::String)
                    .map_err(Error::ConvertToUtf8)
            }
        }
    }
}

struct Compiler<'a> {
    writer_names: &'a Names,
    reader_names: &'a Names,
    memo: HashMap<(Name, Name), usize>,
    nodes: Vec<Option<PlanNode>>,
}

impl Compiler<'_> {
    fn compile(&mut self, writer: &Schema, reader: &Schema) -> AvroResult<PlanNode> {
        let writer = self.deref(writer, self.writer_names)?;
        let reader = self.deref(reader, self.reader_names)?;

        match (&writer, &reader) {
            (Schema::Union(writer_union), Schema::Union(_)) => {
                let branches = writer_union
                    .variants()
                    .iter()
                    .map(|branch| self.compile_lenient(branch, &reader))
                    .collect::<AvroResult<Vec<_>>>()?;
                Ok(PlanNode::UnionToUnion { branches })
            }
            (Schema::Union(writer_union), _) => {
                let branches = writer_union
                    .variants()
                    .iter()
                    .map(|branch| self.compile_lenient(branch, &reader))
                    .collect::<AvroResult<Vec<_>>>()?;
                Ok(PlanNode::WriterUnion { branches })
            }
            (_, Schema::Union(reader_union)) => {
                self.compile_into_union(&writer, reader_union)
            }
            _ => self.compile_flat(&writer, &reader),
        }
    }

    /// Compile a writer-union branch: an unresolvable branch poisons only
    /// itself, failing at read time if encountered.
    fn compile_lenient(&mut self, writer: &Schema, reader: &Schema) -> AvroResult<PlanNode> {
        let nodes_len = self.nodes.len();
        match self.compile(writer, reader) {
            Ok(node) => Ok(node),
            Err(Error::SchemaIncompatible { .. })
            | Err(Error::ResolveRecordField(_))
            | Err(Error::CompareFixedSizes { .. })
            | Err(Error::GetDefaultValue(_)) => {
                // speculative work is discarded
                self.nodes.truncate(nodes_len);
                self.memo.retain(|_, index| *index < nodes_len);
                Ok(PlanNode::Incompatible {
                    writer: Box::new(writer.clone()),
                    reader: Box::new(reader.clone()),
                })
            }
            Err(other) => Err(other),
        }
    }

    /// Select the first reader-union branch the writer resolves against.
    fn compile_into_union(
        &mut self,
        writer: &Schema,
        reader_union: &UnionSchema,
    ) -> AvroResult<PlanNode> {
        for (index, branch) in reader_union.variants().iter().enumerate() {
            let nodes_len = self.nodes.len();
            match self.compile(writer, branch) {
                Ok(node) => {
                    return Ok(PlanNode::ReaderUnion {
                        index: index as u32,
                        inner: Box::new(node),
                    });
                }
                Err(_) => {
                    self.nodes.truncate(nodes_len);
                    self.memo.retain(|_, i| *i < nodes_len);
                }
            }
        }
        Err(self.incompatible(writer, &Schema::Union(reader_union.clone())))
    }

    fn compile_flat(&mut self, writer: &Schema, reader: &Schema) -> AvroResult<PlanNode> {
        // Identical subtrees need no transformation at all.
        if writer == reader {
            return Ok(PlanNode::Direct(reader.clone()));
        }

        match (writer, reader) {
            (Schema::Record(w), Schema::Record(r)) => {
                if !names_match(&w.name, &r.name, reader.aliases()) {
                    return Err(self.incompatible(writer, reader));
                }
                self.compile_record(w, r)
            }
            (Schema::Enum(w), Schema::Enum(r)) => {
                if !names_match(&w.name, &r.name, reader.aliases()) {
                    return Err(self.incompatible(writer, reader));
                }
                Ok(PlanNode::Enum(compile_enum(w, r)))
            }
            (Schema::Array(w), Schema::Array(r)) => {
                self.compile(w, r).map(|inner| PlanNode::Array(Box::new(inner)))
            }
            (Schema::Map(w), Schema::Map(r)) => {
                self.compile(w, r).map(|inner| PlanNode::Map(Box::new(inner)))
            }
            _ => {
                let writer_base = encoding_base(writer);
                let reader_base = encoding_base(reader);
                if writer_base == reader_base {
                    if writer_base == SchemaKind::Fixed {
                        self.check_fixed_pair(writer, reader)?;
                    }
                    return Ok(PlanNode::Direct(reader.clone()));
                }
                match (writer_base, reader) {
                    (SchemaKind::Int, Schema::Long) => Ok(PlanNode::Promote(Promotion::IntToLong)),
                    (SchemaKind::Int, Schema::Float) => {
                        Ok(PlanNode::Promote(Promotion::IntToFloat))
                    }
                    (SchemaKind::Int, Schema::Double) => {
                        Ok(PlanNode::Promote(Promotion::IntToDouble))
                    }
                    (SchemaKind::Long, Schema::Float) => {
                        Ok(PlanNode::Promote(Promotion::LongToFloat))
                    }
                    (SchemaKind::Long, Schema::Double) => {
                        Ok(PlanNode::Promote(Promotion::LongToDouble))
                    }
                    (SchemaKind::Float, Schema::Double) => {
                        Ok(PlanNode::Promote(Promotion::FloatToDouble))
                    }
                    (SchemaKind::String, Schema::Bytes) => {
                        Ok(PlanNode::Promote(Promotion::StringToBytes))
                    }
                    (SchemaKind::Bytes, Schema::String) => {
                        Ok(PlanNode::Promote(Promotion::BytesToString))
                    }
                    _ => Err(self.incompatible(writer, reader)),
                }
            }
        }
    }

    fn compile_record(&mut self, w: &RecordSchema, r: &RecordSchema) -> AvroResult<PlanNode> {
        let key = (w.name.clone(), r.name.clone());
        if let Some(&index) = self.memo.get(&key) {
            return Ok(PlanNode::NamedRef(index));
        }
        let index = self.nodes.len();
        self.nodes.push(None);
        self.memo.insert(key, index);

        let mut steps = Vec::with_capacity(w.fields.len());
        let mut matched = vec![false; r.fields.len()];
        for writer_field in &w.fields {
            let reader_position = r.fields.iter().position(|reader_field| {
                reader_field.name == writer_field.name
                    || reader_field
                        .aliases
                        .as_ref()
                        .is_some_and(|aliases| aliases.contains(&writer_field.name))
            });
            match reader_position {
                Some(position) => {
                    matched[position] = true;
                    let plan = self.compile(&writer_field.schema, &r.fields[position].schema)?;
                    steps.push(FieldStep::Read { position, plan });
                }
                None => steps.push(FieldStep::Skip(writer_field.schema.clone())),
            }
        }

        let mut defaults = Vec::new();
        for (position, reader_field) in r.fields.iter().enumerate() {
            if matched[position] {
                continue;
            }
            let default = reader_field
                .default
                .as_ref()
                .ok_or_else(|| Error::ResolveRecordField(reader_field.name.clone()))?;
            let value =
                Value::from_json_default(default, &reader_field.schema, self.reader_names)?;
            defaults.push((position, value));
        }

        let plan = PlanNode::Record(RecordPlan {
            steps,
            defaults,
            reader_fields: r.fields.iter().map(|field| field.name.clone()).collect(),
        });
        self.nodes[index] = Some(plan);
        Ok(PlanNode::NamedRef(index))
    }

    /// Fixed-family pairs must agree on size, and plain fixeds on name.
    fn check_fixed_pair(&self, writer: &Schema, reader: &Schema) -> AvroResult<()> {
        let (Some(writer_size), Some(reader_size)) = (fixed_size(writer), fixed_size(reader))
        else {
            return Err(self.incompatible(writer, reader));
        };
        if writer_size != reader_size {
            return Err(Error::CompareFixedSizes {
                size: reader_size,
                n: writer_size,
            });
        }
        if let (Schema::Fixed(w), Schema::Fixed(r)) = (writer, reader) {
            if !names_match(&w.name, &r.name, reader.aliases()) {
                return Err(self.incompatible(writer, reader));
            }
        }
        Ok(())
    }

    fn deref(&self, schema: &Schema, names: &Names) -> AvroResult<Schema> {
        match schema {
            Schema::Ref { name } => names
                .get(name)
                .cloned()
                .ok_or_else(|| Error::SchemaResolutionError(name.clone())),
            other => Ok(other.clone()),
        }
    }

    fn incompatible(&self, writer: &Schema, reader: &Schema) -> Error {
        Error::SchemaIncompatible {
            writer: Box::new(writer.clone()),
            reader: Box::new(reader.clone()),
        }
    }
}

fn compile_enum(w: &EnumSchema, r: &EnumSchema) -> EnumPlan {
    let mapping = w
        .symbols
        .iter()
        .map(|symbol| {
            r.symbols
                .iter()
                .position(|reader_symbol| reader_symbol == symbol)
                .map(|position| position as u32)
        })
        .collect();
    let default = r.default.as_ref().and_then(|symbol| {
        r.symbols
            .iter()
            .position(|reader_symbol| reader_symbol == symbol)
            .map(|position| position as u32)
    });
    EnumPlan {
        writer_symbols: w.symbols.clone(),
        reader_symbols: r.symbols.clone(),
        mapping,
        default,
    }
}

/// The wire-level kind a schema encodes as; logical types share their base.
fn encoding_base(schema: &Schema) -> SchemaKind {
    match schema {
        Schema::Date | Schema::TimeMillis => SchemaKind::Int,
        Schema::TimeMicros
        | Schema::TimestampMillis
        | Schema::TimestampMicros
        | Schema::LocalTimestampMillis
        | Schema::LocalTimestampMicros => SchemaKind::Long,
        Schema::Uuid => SchemaKind::String,
        Schema::Decimal(DecimalSchema { inner, .. }) => match inner.as_ref() {
            Schema::Fixed(_) => SchemaKind::Fixed,
            _ => SchemaKind::Bytes,
        },
        Schema::Duration(_) => SchemaKind::Fixed,
        other => other.into(),
    }
}

fn fixed_size(schema: &Schema) -> Option<usize> {
    match schema {
        Schema::Fixed(FixedSchema { size, .. }) => Some(*size),
        Schema::Duration(_) => Some(12),
        Schema::Decimal(DecimalSchema { inner, .. }) => match inner.as_ref() {
            Schema::Fixed(FixedSchema { size, .. }) => Some(*size),
            _ => None,
        },
        _ => None,
    }
}

fn names_match(writer: &Name, reader: &Name, reader_aliases: Option<&Vec<crate::schema::Alias>>) -> bool {
    if writer == reader {
        return true;
    }
    reader_aliases.is_some_and(|aliases| {
        aliases
            .iter()
            .any(|alias| alias.fullname() == writer.fullname())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode_to_vec;
    use pretty_assertions::assert_eq;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn resolve_one(writer: &Schema, reader: &Schema, value: &Value) -> AvroResult<Value> {
        let encoded = encode_to_vec(value, writer).unwrap();
        let plan = ResolutionPlan::compile(writer, reader)?;
        plan.read_value(&mut &encoded[..])
    }

    #[test]
    fn numeric_promotions() -> TestResult {
        assert_eq!(
            resolve_one(&Schema::Int, &Schema::Long, &Value::Int(42))?,
            Value::Long(42)
        );
        assert_eq!(
            resolve_one(&Schema::Int, &Schema::Double, &Value::Int(-7))?,
            Value::Double(-7.0)
        );
        assert_eq!(
            resolve_one(&Schema::Long, &Schema::Double, &Value::Long(1 << 40))?,
            Value::Double((1u64 << 40) as f64)
        );
        assert_eq!(
            resolve_one(&Schema::Float, &Schema::Double, &Value::Float(3.5))?,
            Value::Double(3.5)
        );
        Ok(())
    }

    #[test]
    fn string_bytes_promotions() -> TestResult {
        assert_eq!(
            resolve_one(
                &Schema::String,
                &Schema::Bytes,
                &Value::String("ab".to_string())
            )?,
            Value::Bytes(vec![b'a', b'b'])
        );
        assert_eq!(
            resolve_one(
                &Schema::Bytes,
                &Schema::String,
                &Value::Bytes(vec![b'a', b'b'])
            )?,
            Value::String("ab".to_string())
        );
        Ok(())
    }

    #[test]
    fn narrowing_is_rejected() {
        assert!(matches!(
            ResolutionPlan::compile(&Schema::Long, &Schema::Int),
            Err(Error::SchemaIncompatible { .. })
        ));
        assert!(matches!(
            ResolutionPlan::compile(&Schema::Double, &Schema::Float),
            Err(Error::SchemaIncompatible { .. })
        ));
    }

    #[test]
    fn record_defaults_and_discards() -> TestResult {
        let writer = Schema::parse_str(
            r#"{
                "type": "record", "name": "test",
                "fields": [
                    {"name": "a", "type": "long"},
                    {"name": "obsolete", "type": "string"},
                    {"name": "b", "type": "string"}
                ]
            }"#,
        )?;
        let reader = Schema::parse_str(
            r#"{
                "type": "record", "name": "test",
                "fields": [
                    {"name": "b", "type": "string"},
                    {"name": "a", "type": "long"},
                    {"name": "c", "type": "long", "default": 42}
                ]
            }"#,
        )?;
        let value = Value::Record(vec![
            ("a".to_string(), Value::Long(1)),
            ("obsolete".to_string(), Value::String("gone".to_string())),
            ("b".to_string(), Value::String("kept".to_string())),
        ]);
        assert_eq!(
            resolve_one(&writer, &reader, &value)?,
            Value::Record(vec![
                ("b".to_string(), Value::String("kept".to_string())),
                ("a".to_string(), Value::Long(1)),
                ("c".to_string(), Value::Long(42)),
            ])
        );
        Ok(())
    }

    #[test]
    fn missing_default_fails_at_compile_time() -> TestResult {
        let writer = Schema::parse_str(
            r#"{"type": "record", "name": "test", "fields": [{"name": "a", "type": "long"}]}"#,
        )?;
        let reader = Schema::parse_str(
            r#"{
                "type": "record", "name": "test",
                "fields": [
                    {"name": "a", "type": "long"},
                    {"name": "b", "type": "string"}
                ]
            }"#,
        )?;
        assert!(matches!(
            ResolutionPlan::compile(&writer, &reader),
            Err(Error::ResolveRecordField(field)) if field == "b"
        ));
        Ok(())
    }

    #[test]
    fn reader_field_aliases_match_writer_names() -> TestResult {
        let writer = Schema::parse_str(
            r#"{"type": "record", "name": "test", "fields": [{"name": "old", "type": "long"}]}"#,
        )?;
        let reader = Schema::parse_str(
            r#"{
                "type": "record", "name": "test",
                "fields": [{"name": "new", "type": "long", "aliases": ["old"]}]
            }"#,
        )?;
        let value = Value::Record(vec![("old".to_string(), Value::Long(9))]);
        assert_eq!(
            resolve_one(&writer, &reader, &value)?,
            Value::Record(vec![("new".to_string(), Value::Long(9))])
        );
        Ok(())
    }

    #[test]
    fn record_name_matches_via_reader_alias() -> TestResult {
        let writer = Schema::parse_str(
            r#"{"type": "record", "name": "old_name", "fields": [{"name": "a", "type": "int"}]}"#,
        )?;
        let reader = Schema::parse_str(
            r#"{
                "type": "record", "name": "new_name", "aliases": ["old_name"],
                "fields": [{"name": "a", "type": "int"}]
            }"#,
        )?;
        let value = Value::Record(vec![("a".to_string(), Value::Int(5))]);
        assert_eq!(resolve_one(&writer, &reader, &value)?, value);
        Ok(())
    }

    #[test]
    fn enum_resolution_with_default() -> TestResult {
        let writer = Schema::parse_str(
            r#"{"type": "enum", "name": "suit", "symbols": ["hearts", "clubs", "stars"]}"#,
        )?;
        let reader = Schema::parse_str(
            r#"{
                "type": "enum", "name": "suit",
                "symbols": ["clubs", "hearts"], "default": "clubs"
            }"#,
        )?;
        let plan = ResolutionPlan::compile(&writer, &reader)?;

        let hearts = encode_to_vec(&Value::Enum(0, "hearts".to_string()), &writer)?;
        assert_eq!(
            plan.read_value(&mut &hearts[..])?,
            Value::Enum(1, "hearts".to_string())
        );

        // "stars" is unknown to the reader and falls back to the default.
        let stars = encode_to_vec(&Value::Enum(2, "stars".to_string()), &writer)?;
        assert_eq!(
            plan.read_value(&mut &stars[..])?,
            Value::Enum(0, "clubs".to_string())
        );
        Ok(())
    }

    #[test]
    fn enum_without_default_fails_at_read_time() -> TestResult {
        let writer = Schema::parse_str(
            r#"{"type": "enum", "name": "suit", "symbols": ["hearts", "stars"]}"#,
        )?;
        let reader =
            Schema::parse_str(r#"{"type": "enum", "name": "suit", "symbols": ["hearts"]}"#)?;
        let plan = ResolutionPlan::compile(&writer, &reader)?;

        let hearts = encode_to_vec(&Value::Enum(0, "hearts".to_string()), &writer)?;
        assert_eq!(
            plan.read_value(&mut &hearts[..])?,
            Value::Enum(0, "hearts".to_string())
        );

        let stars = encode_to_vec(&Value::Enum(1, "stars".to_string()), &writer)?;
        assert!(matches!(
            plan.read_value(&mut &stars[..]),
            Err(Error::ResolveEnumSymbol(symbol)) if symbol == "stars"
        ));
        Ok(())
    }

    #[test]
    fn writer_union_into_plain_reader() -> TestResult {
        let writer = Schema::parse_str(r#"["null", "string"]"#)?;
        let reader = Schema::String;
        let plan = ResolutionPlan::compile(&writer, &reader)?;

        let tagged = encode_to_vec(
            &Value::Union(1, Box::new(Value::String("a".to_string()))),
            &writer,
        )?;
        assert_eq!(
            plan.read_value(&mut &tagged[..])?,
            Value::String("a".to_string())
        );

        // The null branch does not resolve against a string reader.
        let null = encode_to_vec(&Value::Union(0, Box::new(Value::Null)), &writer)?;
        assert!(matches!(
            plan.read_value(&mut &null[..]),
            Err(Error::SchemaIncompatible { .. })
        ));
        Ok(())
    }

    #[test]
    fn plain_writer_into_reader_union() -> TestResult {
        let writer = Schema::Long;
        let reader = Schema::parse_str(r#"["null", "double", "long"]"#)?;
        // First matching reader branch wins: long promotes to double at
        // index 1 before the exact match at index 2 is considered.
        assert_eq!(
            resolve_one(&writer, &reader, &Value::Long(3))?,
            Value::Union(1, Box::new(Value::Double(3.0)))
        );
        Ok(())
    }

    #[test]
    fn union_to_union_remaps_branch_indices() -> TestResult {
        let writer = Schema::parse_str(r#"["string", "null"]"#)?;
        let reader = Schema::parse_str(r#"["null", "string"]"#)?;
        assert_eq!(
            resolve_one(
                &writer,
                &reader,
                &Value::Union(0, Box::new(Value::String("x".to_string())))
            )?,
            Value::Union(1, Box::new(Value::String("x".to_string())))
        );
        assert_eq!(
            resolve_one(&writer, &reader, &Value::Union(1, Box::new(Value::Null)))?,
            Value::Union(0, Box::new(Value::Null))
        );
        Ok(())
    }

    #[test]
    fn recursive_records_compile_to_a_finite_plan() -> TestResult {
        let writer = Schema::parse_str(
            r#"{
                "type": "record", "name": "LongList",
                "fields": [
                    {"name": "value", "type": "long"},
                    {"name": "next", "type": ["null", "LongList"]}
                ]
            }"#,
        )?;
        let reader = Schema::parse_str(
            r#"{
                "type": "record", "name": "LongList",
                "fields": [
                    {"name": "value", "type": "long"},
                    {"name": "label", "type": "string", "default": "unlabeled"},
                    {"name": "next", "type": ["null", "LongList"]}
                ]
            }"#,
        )?;
        let value = Value::Record(vec![
            ("value".to_string(), Value::Long(1)),
            (
                "next".to_string(),
                Value::Union(
                    1,
                    Box::new(Value::Record(vec![
                        ("value".to_string(), Value::Long(2)),
                        ("next".to_string(), Value::Union(0, Box::new(Value::Null))),
                    ])),
                ),
            ),
        ]);
        let resolved = resolve_one(&writer, &reader, &value)?;
        let Value::Record(fields) = &resolved else {
            panic!("expected a record");
        };
        assert_eq!(fields[1].1, Value::String("unlabeled".to_string()));
        Ok(())
    }

    #[test]
    fn fixed_requires_matching_name_and_size() -> TestResult {
        let writer = Schema::parse_str(r#"{"type": "fixed", "name": "md5", "size": 16}"#)?;
        let same = Schema::parse_str(r#"{"type": "fixed", "name": "md5", "size": 16}"#)?;
        assert!(ResolutionPlan::compile(&writer, &same).is_ok());

        let wrong_size = Schema::parse_str(r#"{"type": "fixed", "name": "md5", "size": 8}"#)?;
        assert!(matches!(
            ResolutionPlan::compile(&writer, &wrong_size),
            Err(Error::CompareFixedSizes { size: 8, n: 16 })
        ));

        let wrong_name = Schema::parse_str(r#"{"type": "fixed", "name": "sha", "size": 16}"#)?;
        assert!(ResolutionPlan::compile(&writer, &wrong_name).is_err());

        let aliased = Schema::parse_str(
            r#"{"type": "fixed", "name": "sha", "aliases": ["md5"], "size": 16}"#,
        )?;
        assert!(ResolutionPlan::compile(&writer, &aliased).is_ok());
        Ok(())
    }
}
