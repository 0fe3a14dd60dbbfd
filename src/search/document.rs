//! Index types, per-type field schemas and document construction

use crate::models::IndexedEntity;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use tantivy::schema::*;
use tantivy::tokenizer::{LowerCaser, RawTokenizer, TextAnalyzer};
use tantivy::{Index, TantivyDocument};
use uuid::Uuid;

/// Tokenizer for raw fields: the whole value as one lowercased term
pub const RAW_TOKENIZER: &str = "raw_lowercase";

/// Name of the identifier field shared by every schema
pub const UUID_FIELD: &str = "uuid";

/// Trait for documents that can be indexed and searched
pub trait SearchDocument {
    /// Convert to Tantivy document
    fn to_tantivy_doc(&self, schema: &Schema) -> TantivyDocument;

    /// Get document ID
    fn document_id(&self) -> String;
}

/// The six indexed entity kinds
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum IndexType {
    Project,
    Component,
    ServiceComponent,
    License,
    Cpe,
    VulnerableSoftware,
}

impl IndexType {
    pub const ALL: [IndexType; 6] = [
        IndexType::Project,
        IndexType::Component,
        IndexType::ServiceComponent,
        IndexType::License,
        IndexType::Cpe,
        IndexType::VulnerableSoftware,
    ];

    /// Field schema descriptor for this kind
    pub fn schema(&self) -> &'static IndexSchema {
        match self {
            IndexType::Project => &PROJECT_SCHEMA,
            IndexType::Component => &COMPONENT_SCHEMA,
            IndexType::ServiceComponent => &SERVICE_COMPONENT_SCHEMA,
            IndexType::License => &LICENSE_SCHEMA,
            IndexType::Cpe => &CPE_SCHEMA,
            IndexType::VulnerableSoftware => &VULNERABLE_SOFTWARE_SCHEMA,
        }
    }

    /// Result bucket and on-disk directory name
    pub fn name(&self) -> String {
        self.to_string()
    }
}

/// How a field is indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Exact-match identifier, stored, not analyzed
    Identifier,
    /// Analyzed with the default tokenizer
    Text,
    /// One lowercased term per value, for exact and regex matching
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub boost: f32,
}

const fn field(name: &'static str, kind: FieldKind, boost: f32) -> FieldSpec {
    FieldSpec { name, kind, boost }
}

const fn identifier() -> FieldSpec {
    field(UUID_FIELD, FieldKind::Identifier, 1.0)
}

/// Per-type schema descriptor; `fields` is the ordered list of search fields
#[derive(Debug)]
pub struct IndexSchema {
    pub index_type: IndexType,
    pub fields: &'static [FieldSpec],
}

pub static PROJECT_SCHEMA: IndexSchema = IndexSchema {
    index_type: IndexType::Project,
    fields: &[
        identifier(),
        field("name", FieldKind::Text, 50.0),
        field("version", FieldKind::Raw, 10.0),
        field("description", FieldKind::Text, 20.0),
    ],
};

pub static COMPONENT_SCHEMA: IndexSchema = IndexSchema {
    index_type: IndexType::Component,
    fields: &[
        identifier(),
        field("name", FieldKind::Text, 50.0),
        field("group", FieldKind::Text, 60.0),
        field("version", FieldKind::Raw, 10.0),
        field("sha1", FieldKind::Raw, 90.0),
        field("description", FieldKind::Text, 20.0),
    ],
};

pub static SERVICE_COMPONENT_SCHEMA: IndexSchema = IndexSchema {
    index_type: IndexType::ServiceComponent,
    fields: &[
        identifier(),
        field("name", FieldKind::Text, 50.0),
        field("group", FieldKind::Text, 60.0),
        field("version", FieldKind::Raw, 10.0),
        field("url", FieldKind::Raw, 90.0),
        field("description", FieldKind::Text, 20.0),
    ],
};

pub static LICENSE_SCHEMA: IndexSchema = IndexSchema {
    index_type: IndexType::License,
    fields: &[
        identifier(),
        field("licenseId", FieldKind::Text, 90.0),
        field("name", FieldKind::Text, 20.0),
    ],
};

const CPE_FIELDS: &[FieldSpec] = &[
    identifier(),
    field("cpe22", FieldKind::Raw, 90.0),
    field("cpe23", FieldKind::Raw, 90.0),
    field("vendor", FieldKind::Raw, 20.0),
    field("product", FieldKind::Raw, 20.0),
    field("version", FieldKind::Raw, 10.0),
];

pub static CPE_SCHEMA: IndexSchema = IndexSchema {
    index_type: IndexType::Cpe,
    fields: CPE_FIELDS,
};

pub static VULNERABLE_SOFTWARE_SCHEMA: IndexSchema = IndexSchema {
    index_type: IndexType::VulnerableSoftware,
    fields: CPE_FIELDS,
};

impl IndexSchema {
    /// Ordered field names eligible for free-text querying
    pub fn search_fields(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    pub fn field_spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Build the Tantivy schema
    pub fn build(&self) -> Schema {
        let mut builder = Schema::builder();

        for spec in self.fields {
            match spec.kind {
                FieldKind::Identifier => {
                    builder.add_text_field(spec.name, STRING | STORED);
                }
                FieldKind::Text => {
                    builder.add_text_field(spec.name, TEXT | STORED);
                }
                FieldKind::Raw => {
                    let indexing = TextFieldIndexing::default()
                        .set_tokenizer(RAW_TOKENIZER)
                        .set_index_option(IndexRecordOption::Basic);
                    let options = TextOptions::default()
                        .set_indexing_options(indexing)
                        .set_stored();
                    builder.add_text_field(spec.name, options);
                }
            }
        }

        builder.build()
    }
}

/// Register the analyzers referenced by the schemas; required on every open
pub fn register_tokenizers(index: &Index) {
    index.tokenizers().register(
        RAW_TOKENIZER,
        TextAnalyzer::builder(RawTokenizer::default())
            .filter(LowerCaser)
            .build(),
    );
}

/// Flat field set derived from one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub index_type: IndexType,
    pub uuid: Uuid,
    pub fields: Vec<(String, String)>,
}

impl IndexedDocument {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }
}

fn push(fields: &mut Vec<(String, String)>, name: &str, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        fields.push((name.to_string(), value.to_string()));
    }
}

impl From<&IndexedEntity> for IndexedDocument {
    fn from(entity: &IndexedEntity) -> Self {
        let uuid = entity.uuid();
        let mut fields = vec![(UUID_FIELD.to_string(), uuid.to_string())];

        match entity {
            IndexedEntity::Project(p) => {
                push(&mut fields, "name", Some(&p.name));
                push(&mut fields, "version", p.version.as_deref());
                push(&mut fields, "description", p.description.as_deref());
            }
            IndexedEntity::Component(c) => {
                push(&mut fields, "name", Some(&c.name));
                push(&mut fields, "group", c.group.as_deref());
                push(&mut fields, "version", c.version.as_deref());
                push(&mut fields, "sha1", c.sha1.as_deref());
                push(&mut fields, "description", c.description.as_deref());
            }
            IndexedEntity::ServiceComponent(s) => {
                push(&mut fields, "name", Some(&s.name));
                push(&mut fields, "group", s.group.as_deref());
                push(&mut fields, "version", s.version.as_deref());
                push(&mut fields, "url", s.url.as_deref());
                push(&mut fields, "description", s.description.as_deref());
            }
            IndexedEntity::License(l) => {
                push(&mut fields, "licenseId", l.license_id.as_deref());
                push(&mut fields, "name", Some(&l.name));
            }
            IndexedEntity::Cpe(c) => {
                push(&mut fields, "cpe22", c.cpe22.as_deref());
                push(&mut fields, "cpe23", c.cpe23.as_deref());
                push(&mut fields, "vendor", c.vendor.as_deref());
                push(&mut fields, "product", c.product.as_deref());
                push(&mut fields, "version", c.version.as_deref());
            }
            IndexedEntity::VulnerableSoftware(vs) => {
                push(&mut fields, "cpe22", vs.cpe22.as_deref());
                push(&mut fields, "cpe23", vs.cpe23.as_deref());
                push(&mut fields, "vendor", vs.vendor.as_deref());
                push(&mut fields, "product", vs.product.as_deref());
                push(&mut fields, "version", vs.version.as_deref());
            }
        }

        Self {
            index_type: entity.index_type(),
            uuid,
            fields,
        }
    }
}

impl SearchDocument for IndexedDocument {
    fn to_tantivy_doc(&self, schema: &Schema) -> TantivyDocument {
        let mut doc = TantivyDocument::new();

        for (name, value) in &self.fields {
            if let Ok(field) = schema.get_field(name) {
                doc.add_text(field, value);
            }
        }

        doc
    }

    fn document_id(&self) -> String {
        self.uuid.to_string()
    }
}
