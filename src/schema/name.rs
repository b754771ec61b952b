use crate::{AvroResult, error::Error, util::MapHelper};
use regex_lite::Regex;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
    sync::OnceLock,
};

/// The namespace of a named schema, `None` when it lives in the null namespace.
pub type Namespace = Option<String>;

/// The aliases of a named schema or record field.
pub type Aliases = Option<Vec<Alias>>;

const NAME_R: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";
const NAMESPACE_R: &str = r"^([A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*)?$";

fn name_regex() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| Regex::new(NAME_R).unwrap())
}

fn namespace_regex() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| Regex::new(NAMESPACE_R).unwrap())
}

pub(crate) fn validate_name_part(name: &str) -> AvroResult<()> {
    if name_regex().is_match(name) {
        Ok(())
    } else {
        Err(Error::InvalidSchemaName(name.to_string(), NAME_R))
    }
}

pub(crate) fn validate_namespace(namespace: &str) -> AvroResult<()> {
    if namespace_regex().is_match(namespace) {
        Ok(())
    } else {
        Err(Error::InvalidNamespace(namespace.to_string(), NAMESPACE_R))
    }
}

/// The name of a `record`, `enum` or `fixed` schema.
///
/// Names are always stored fully qualified: the parser resolves the enclosing
/// namespace while it walks the document, so two `Name`s compare equal exactly
/// when their fullnames are equal.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Name {
    /// The unqualified part of the name.
    pub name: String,
    /// The namespace; `None` for the null namespace.
    pub namespace: Namespace,
}

impl Name {
    /// Create a `Name` from a (possibly dotted) name string.
    pub fn new(name: &str) -> AvroResult<Self> {
        Self::with_enclosing_namespace(name, &None)
    }

    /// Create a `Name`, inheriting `enclosing` when `name` is not dotted.
    ///
    /// A leading dot anchors the name in the null namespace.
    pub fn with_enclosing_namespace(name: &str, enclosing: &Namespace) -> AvroResult<Self> {
        if let Some(stripped) = name.strip_prefix('.') {
            validate_name_part(stripped)?;
            return Ok(Self {
                name: stripped.to_string(),
                namespace: None,
            });
        }
        match name.rsplit_once('.') {
            Some((namespace, simple)) => {
                validate_namespace(namespace)?;
                validate_name_part(simple)?;
                Ok(Self {
                    name: simple.to_string(),
                    namespace: Some(namespace.to_string()),
                })
            }
            None => {
                validate_name_part(name)?;
                let namespace = enclosing.as_deref().filter(|ns| !ns.is_empty());
                if let Some(ns) = namespace {
                    validate_namespace(ns)?;
                }
                Ok(Self {
                    name: name.to_string(),
                    namespace: namespace.map(|ns| ns.to_string()),
                })
            }
        }
    }

    /// Read `name`/`namespace` out of a JSON object describing a named schema.
    pub(crate) fn parse(
        complex: &Map<String, Value>,
        enclosing: &Namespace,
    ) -> AvroResult<Self> {
        let name = complex.name().ok_or(Error::GetNameField)?;
        let namespace = complex.string("namespace").or_else(|| enclosing.clone());
        Self::with_enclosing_namespace(&name, &namespace)
    }

    /// The dotted fullname.
    pub fn fullname(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.fullname())
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.fullname())
    }
}

/// An alias of a named schema, serialized as its fullname.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Alias(Name);

impl Alias {
    pub fn new(alias: &str) -> AvroResult<Self> {
        Name::new(alias).map(Self)
    }

    /// Qualify an alias that is not dotted with the namespace of the schema
    /// that declares it, per the specification's alias resolution rule.
    pub(crate) fn with_enclosing_namespace(alias: &str, enclosing: &Namespace) -> AvroResult<Self> {
        Name::with_enclosing_namespace(alias, enclosing).map(Self)
    }

    pub fn name(&self) -> &Name {
        &self.0
    }

    pub fn fullname(&self) -> String {
        self.0.fullname()
    }
}

impl Serialize for Alias {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.fullname())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn dotted_name_carries_its_own_namespace() {
        let name = Name::new("some.namespace.record").unwrap();
        assert_eq!(name.name, "record");
        assert_eq!(name.namespace.as_deref(), Some("some.namespace"));
        assert_eq!(name.fullname(), "some.namespace.record");
    }

    #[test]
    fn simple_name_inherits_enclosing_namespace() {
        let name =
            Name::with_enclosing_namespace("record", &Some("outer".to_string())).unwrap();
        assert_eq!(name.fullname(), "outer.record");
    }

    #[test]
    fn leading_dot_means_null_namespace() {
        let name =
            Name::with_enclosing_namespace(".record", &Some("outer".to_string())).unwrap();
        assert_eq!(name.namespace, None);
        assert_eq!(name.fullname(), "record");
    }

    #[test]
    fn empty_enclosing_namespace_is_no_namespace() {
        let name = Name::with_enclosing_namespace("record", &Some(String::new())).unwrap();
        assert_eq!(name.namespace, None);
    }

    #[test]
    fn invalid_names_are_rejected() {
        assert!(Name::new(" ").is_err());
        assert!(Name::new("ns.").is_err());
        assert!(Name::new("3way").is_err());
        assert!(Name::new("with-dash").is_err());
    }

    #[test]
    fn underscores_are_valid_everywhere() {
        for funny in ["_", "_._", "__._", "_.__", "_._._"] {
            assert!(Name::new(funny).is_ok(), "{funny} should parse");
        }
    }
}
