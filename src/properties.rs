//! # Resource Properties
//!
//! Decodes the untyped `ResourceProperties` object of a lifecycle event into
//! a strictly typed [`ResourceProperties`].
//!
//! All validation happens here, once, before any I/O. Field names follow the
//! collaborator-facing JSON shape exactly (`S3Bucket`, `SecretArn`, ...).
//! `WholeFile` crosses a lossy string-serialization boundary and may arrive as
//! `true` or `"true"`; it is normalised to a `bool` here and nowhere else.

use crate::constants::WHOLE_FILE_INPUT_TYPE;
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// How a located value is serialized into the secret
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingEncoding {
    /// Scalars are stringified, objects and arrays are treated as absent
    #[default]
    String,
    /// Any value is written as compact JSON
    Json,
}

impl MappingEncoding {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingEncoding::String => "string",
            MappingEncoding::Json => "json",
        }
    }
}

impl FromStr for MappingEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(MappingEncoding::String),
            "json" => Ok(MappingEncoding::Json),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for MappingEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named extraction rule: where to look and how to encode what is found
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mapping {
    pub path: Vec<String>,
    pub encoding: MappingEncoding,
}

impl Mapping {
    pub fn new<I, S>(path: I, encoding: MappingEncoding) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            encoding,
        }
    }
}

/// Output key to mapping. Keys are unique and order is irrelevant.
pub type MappingSet = BTreeMap<String, Mapping>;

/// Wire shape of a mapping before validation
#[derive(Debug, Deserialize)]
struct RawMapping {
    path: Vec<String>,
    #[serde(default)]
    encoding: Option<String>,
}

impl RawMapping {
    fn into_mapping(self, name: &str) -> Result<Mapping, ValidationError> {
        if self.path.is_empty() {
            return Err(ValidationError::EmptyMappingPath {
                name: name.to_string(),
            });
        }
        let encoding = match self.encoding {
            None => MappingEncoding::default(),
            Some(encoding) => {
                encoding
                    .parse::<MappingEncoding>()
                    .map_err(|encoding| ValidationError::UnknownEncoding {
                        name: name.to_string(),
                        encoding,
                    })?
            }
        };
        Ok(Mapping {
            path: self.path,
            encoding,
        })
    }
}

/// Which output the invocation produces
///
/// Whole-file wins over a single-value mapping, which wins over the mapping
/// set. An empty mapping set yields `{}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode<'a> {
    WholeFile,
    SingleValue(&'a Mapping),
    Mappings(&'a MappingSet),
}

/// Validated per-invocation configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceProperties {
    pub kms_key_arn: Option<String>,
    pub s3_bucket: String,
    pub s3_path: String,
    pub mappings: MappingSet,
    pub single_value_mapping: Option<Mapping>,
    pub whole_file: bool,
    pub secret_arn: String,
    /// Changes whenever the encrypted asset changes; not used for logic
    pub source_hash: String,
    pub file_type: Option<String>,
}

impl ResourceProperties {
    /// Decode and validate an untyped `ResourceProperties` value
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the first missing or malformed field.
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let object = value.as_object().ok_or(ValidationError::WrongType {
            field: "ResourceProperties",
            expected: "an object",
        })?;

        let s3_bucket = required_str(object, "S3Bucket")?;
        let s3_path = required_str(object, "S3Path")?;
        let mappings_json = required_str(object, "Mappings")?;
        let single_value_json = required_str(object, "SingleValueMapping")?;
        let secret_arn = required_str(object, "SecretArn")?;
        let source_hash = required_str(object, "SourceHash")?;
        let kms_key_arn = optional_str(object, "KMSKeyArn")?;
        let file_type = optional_str(object, "FileType")?;
        let whole_file = whole_file_flag(object)?;

        let mappings = parse_mappings(&mappings_json)?;
        let single_value_mapping = parse_single_value_mapping(&single_value_json)?;

        let properties = Self {
            kms_key_arn,
            s3_bucket,
            s3_path,
            mappings,
            single_value_mapping,
            whole_file,
            secret_arn,
            source_hash,
            file_type,
        };

        let configured_modes = [
            properties.whole_file,
            properties.single_value_mapping.is_some(),
            !properties.mappings.is_empty(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count();
        if configured_modes > 1 {
            warn!(
                whole_file = properties.whole_file,
                single_value_mapping = properties.single_value_mapping.is_some(),
                mappings = properties.mappings.len(),
                "More than one output mode configured, applying precedence"
            );
        }

        Ok(properties)
    }

    #[must_use]
    pub fn output_mode(&self) -> OutputMode<'_> {
        if self.whole_file {
            OutputMode::WholeFile
        } else if let Some(mapping) = &self.single_value_mapping {
            OutputMode::SingleValue(mapping)
        } else {
            OutputMode::Mappings(&self.mappings)
        }
    }

    /// Input type handed to sops
    ///
    /// An explicit `FileType` always wins. Whole-file secrets are stored as
    /// sops binary documents, which decrypt as json. Otherwise the extension
    /// of the object key is used.
    #[must_use]
    pub fn input_type(&self) -> &str {
        if let Some(file_type) = &self.file_type {
            return file_type;
        }
        if self.whole_file {
            return WHOLE_FILE_INPUT_TYPE;
        }
        file_extension(&self.s3_path)
    }
}

/// Text after the last `.`, or the whole key when it has none
fn file_extension(key: &str) -> &str {
    key.rsplit('.').next().unwrap_or(key)
}

fn required_str(object: &Map<String, Value>, field: &'static str) -> Result<String, ValidationError> {
    match object.get(field) {
        None => Err(ValidationError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ValidationError::WrongType {
            field,
            expected: "a string",
        }),
    }
}

/// Absent, `null` and empty strings all mean "not set"
fn optional_str(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, ValidationError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::WrongType {
            field,
            expected: "a string",
        }),
    }
}

fn whole_file_flag(object: &Map<String, Value>) -> Result<bool, ValidationError> {
    const FIELD: &str = "WholeFile";
    match object.get(FIELD) {
        None | Some(Value::Null) => Ok(false),
        Some(value) => normalise_boolean(FIELD, value),
    }
}

/// Accept `true`/`false` or their string forms
///
/// # Errors
///
/// Any other string or JSON type fails validation.
pub fn normalise_boolean(field: &'static str, value: &Value) -> Result<bool, ValidationError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s == "true" => Ok(true),
        Value::String(s) if s == "false" => Ok(false),
        Value::String(s) => Err(ValidationError::InvalidBoolean {
            field,
            value: s.clone(),
        }),
        _ => Err(ValidationError::WrongType {
            field,
            expected: "a boolean or \"true\"/\"false\"",
        }),
    }
}

/// Parse the JSON-encoded `Mappings` property
///
/// # Errors
///
/// Fails when the payload is not JSON, not an object, or any entry is not a
/// valid mapping.
pub fn parse_mappings(json: &str) -> Result<MappingSet, ValidationError> {
    const FIELD: &str = "Mappings";
    let value: Value = serde_json::from_str(json)
        .map_err(|source| ValidationError::InvalidJson { field: FIELD, source })?;
    let Value::Object(entries) = value else {
        return Err(ValidationError::WrongType {
            field: FIELD,
            expected: "a JSON-encoded object",
        });
    };

    entries
        .into_iter()
        .map(|(name, entry)| {
            let mapping = decode_mapping(&name, entry)?;
            Ok::<_, ValidationError>((name, mapping))
        })
        .collect()
}

/// Parse the JSON-encoded `SingleValueMapping` property (`null` or a mapping)
///
/// # Errors
///
/// Fails when the payload is not JSON or not a valid mapping.
pub fn parse_single_value_mapping(json: &str) -> Result<Option<Mapping>, ValidationError> {
    const FIELD: &str = "SingleValueMapping";
    let value: Value = serde_json::from_str(json)
        .map_err(|source| ValidationError::InvalidJson { field: FIELD, source })?;
    if value.is_null() {
        return Ok(None);
    }
    decode_mapping(FIELD, value).map(Some)
}

fn decode_mapping(name: &str, value: Value) -> Result<Mapping, ValidationError> {
    let raw: RawMapping =
        serde_json::from_value(value).map_err(|source| ValidationError::InvalidMapping {
            name: name.to_string(),
            source,
        })?;
    raw.into_mapping(name)
}
