//! Record schema resolution.
//!
//! A schema is the flattened, name-sorted list of convertible fields of a
//! record type. Embedded records contribute their own fields; direct fields
//! shadow embedded ones. Schemas are resolved once per type and cached by
//! [`SchemaCache`](crate::cache::SchemaCache) together with any error.

use std::any::TypeId;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use crate::cache::SchemaCache;
use crate::error::SchemaError;
use crate::reflect::{FieldDesc, Shape, TypeDesc};

/// Tag value that removes a field.
pub const TAG_IGNORE: &str = "-";
/// Tag value that flattens a non-embedded field.
pub const TAG_FLATTEN: &str = "+";

/// Interpreted `#[convert(tag = "...")]` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTag {
    Ignore,
    Flatten,
    Rename(&'static str),
}

impl FieldTag {
    pub fn parse(tag: &'static str) -> Self {
        match tag {
            TAG_IGNORE => FieldTag::Ignore,
            TAG_FLATTEN => FieldTag::Flatten,
            name => FieldTag::Rename(name),
        }
    }
}

/// One convertible field of a schema.
#[derive(Debug, Clone)]
pub struct FieldEntry {
    /// Effective name (tag override or declared name).
    pub name: &'static str,
    pub ty: TypeDesc,
    /// Declaration indices from the record down to the field, one per
    /// flattened embedding. Pointers are dereferenced between steps.
    pub path: Vec<usize>,
}

/// Resolved, immutable description of a record type.
#[derive(Debug)]
pub struct RecordSchema {
    type_name: &'static str,
    record: bool,
    error: Option<SchemaError>,
    fields: Vec<FieldEntry>,
}

static NOT_A_RECORD: LazyLock<Arc<RecordSchema>> = LazyLock::new(|| {
    Arc::new(RecordSchema {
        type_name: "<not a record>",
        record: false,
        error: None,
        fields: Vec::new(),
    })
});

impl RecordSchema {
    /// Shared schema for every non-record type.
    ///
    /// An empty record also has no fields, so compare with
    /// [`is_record`](Self::is_record) or by pointer, never by emptiness.
    pub fn not_a_record() -> Arc<RecordSchema> {
        Arc::clone(&NOT_A_RECORD)
    }

    fn failed(type_name: &'static str, error: SchemaError) -> Self {
        Self {
            type_name,
            record: true,
            error: Some(error),
            fields: Vec::new(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is_record(&self) -> bool {
        self.record
    }

    pub fn error(&self) -> Option<&SchemaError> {
        self.error.as_ref()
    }

    /// Fields sorted by name, ascending byte order.
    pub fn fields(&self) -> &[FieldEntry] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldEntry> {
        self.fields
            .binary_search_by(|f| f.name.cmp(name))
            .ok()
            .map(|i| &self.fields[i])
    }
}

/// Resolve `ty` through `cache`.
///
/// `in_progress` holds the types currently being resolved above this call;
/// meeting one of them again is a circular dependency. That error is
/// returned without being cached for the repeated type; the callers above
/// cache it for themselves.
pub(crate) fn resolve(
    cache: &SchemaCache,
    ty: TypeDesc,
    in_progress: &mut HashSet<TypeId>,
) -> Arc<RecordSchema> {
    if let Some(schema) = cache.get(ty.id) {
        return schema;
    }
    if !in_progress.insert(ty.id) {
        return Arc::new(RecordSchema::failed(
            ty.name,
            SchemaError::CircularDependency(ty.name),
        ));
    }

    let schema = build(cache, ty, in_progress);
    in_progress.remove(&ty.id);

    match &schema {
        Err(err) => {
            tracing::warn!(ty = ty.name, error = %err, "record schema failed to resolve");
        }
        Ok(schema) if schema.is_record() => {
            tracing::debug!(ty = ty.name, fields = schema.fields.len(), "resolved record schema");
        }
        Ok(_) => {}
    }

    let schema = match schema {
        Ok(schema) => schema,
        Err(err) => Arc::new(RecordSchema::failed(ty.name, err)),
    };
    cache.insert(ty.id, schema)
}

fn build(
    cache: &SchemaCache,
    ty: TypeDesc,
    in_progress: &mut HashSet<TypeId>,
) -> Result<Arc<RecordSchema>, SchemaError> {
    let mut target = ty;
    let declared = loop {
        match target.shape() {
            Shape::Pointer(inner) => target = inner,
            Shape::Record(fields) => break fields,
            _ => return Ok(RecordSchema::not_a_record()),
        }
    };

    let mut fields = Vec::with_capacity(declared.len());
    let mut names: HashSet<&'static str> = HashSet::with_capacity(declared.len());
    let mut deferred: Vec<FieldDesc> = Vec::new();

    for field in declared {
        if !field.exported {
            continue;
        }
        let tag = field.tag.map(FieldTag::parse);
        let name = match tag {
            Some(FieldTag::Ignore) => continue,
            Some(FieldTag::Flatten) => {
                deferred.push(field);
                continue;
            }
            Some(FieldTag::Rename(name)) => name,
            None if field.embedded => {
                deferred.push(field);
                continue;
            }
            None => field.name,
        };
        if !names.insert(name) {
            return Err(SchemaError::ConflictingNameAndTag(name));
        }
        fields.push(FieldEntry {
            name,
            ty: field.ty,
            path: vec![field.index],
        });
    }

    // Embedded records: lower priority than direct fields, and no two
    // embeddings may surface the same name.
    let mut surfaced: HashSet<&'static str> = HashSet::new();
    for field in deferred {
        let inner = resolve(cache, field.ty, in_progress);
        if let Some(err) = inner.error() {
            return Err(err.clone());
        }
        if let Some(dup) = inner.fields().iter().find(|f| surfaced.contains(f.name)) {
            return Err(SchemaError::AmbiguousField(dup.name));
        }
        surfaced.extend(inner.fields().iter().map(|f| f.name));

        for sub in inner.fields() {
            if !names.insert(sub.name) {
                continue;
            }
            let mut path = Vec::with_capacity(sub.path.len() + 1);
            path.push(field.index);
            path.extend_from_slice(&sub.path);
            fields.push(FieldEntry {
                name: sub.name,
                ty: sub.ty,
                path,
            });
        }
    }

    fields.sort_by(|a, b| a.name.cmp(b.name));

    Ok(Arc::new(RecordSchema {
        type_name: ty.name,
        record: true,
        error: None,
        fields,
    }))
}
