use std::cmp::Ordering;
use std::sync::{Arc, LazyLock};

use crate::cache::SchemaCache;
use crate::config::{ConvertOptions, NilElementPolicy};
use crate::error::{BoxError, ConvertError, RegistrationError};
use crate::reflect::{Record, Reflect, ReflectMut, ReflectRef, Sequence, TypeDesc};
use crate::registry::{ConversionFn, FunctionRegistry, SharedRegistry};
use crate::schema::FieldEntry;

static DEFAULT: LazyLock<Converter> = LazyLock::new(Converter::new);

static SOURCE_FIELD_MISSING_OK: LazyLock<Converter> = LazyLock::new(|| Converter {
    options: ConvertOptions {
        source_field_missing_ok: true,
        ..ConvertOptions::default()
    },
    ..Converter::new()
});

static DESTINATION_FIELD_MISSING_OK: LazyLock<Converter> = LazyLock::new(|| Converter {
    options: ConvertOptions {
        destination_field_missing_ok: true,
        ..ConvertOptions::default()
    },
    ..Converter::new()
});

/// Convert `src` into `dest` with the default converter.
///
/// Uses the global schema cache and function registry, with no missing-field
/// tolerance.
pub fn convert<S: Reflect, D: Reflect>(src: &S, dest: &mut D) -> Result<(), ConvertError> {
    DEFAULT.convert(src, dest)
}

/// Field-by-field value mapper between independently defined types.
///
/// Immutable once built; one converter can serve any number of concurrent
/// calls.
#[derive(Debug)]
pub struct Converter {
    functions: FunctionRegistry,
    shared: Arc<SharedRegistry>,
    cache: Arc<SchemaCache>,
    options: ConvertOptions,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter {
    /// Converter with no private functions and default options.
    pub fn new() -> Self {
        Self {
            functions: FunctionRegistry::new(),
            shared: SharedRegistry::global(),
            cache: SchemaCache::global(),
            options: ConvertOptions::default(),
        }
    }

    /// Shared converter that leaves destination fields without a source
    /// counterpart untouched.
    pub fn source_field_missing_ok() -> &'static Converter {
        &SOURCE_FIELD_MISSING_OK
    }

    /// Shared converter that drops source fields without a destination
    /// counterpart.
    pub fn destination_field_missing_ok() -> &'static Converter {
        &DESTINATION_FIELD_MISSING_OK
    }

    pub fn builder() -> ConverterBuilder {
        ConverterBuilder::default()
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    pub fn schema_cache(&self) -> &Arc<SchemaCache> {
        &self.cache
    }

    /// Convert `src` into `dest`.
    ///
    /// On error, whatever was written before the failure stays written.
    pub fn convert<S: Reflect, D: Reflect>(&self, src: &S, dest: &mut D) -> Result<(), ConvertError> {
        self.convert_dyn(src, dest)
    }

    pub fn convert_dyn(&self, src: &dyn Reflect, dest: &mut dyn Reflect) -> Result<(), ConvertError> {
        // A nil source clears a nullable destination; a nil sequence stays nil.
        let Some(src) = src.deref() else {
            dest.set_nil();
            return Ok(());
        };
        let dest = dest.deref_alloc();
        let from = src.reflect_desc();
        let to = dest.reflect_desc();

        if let Some(func) = self.find_function(from, to) {
            tracing::trace!(from = from.name, to = to.name, "dispatching conversion function");
            return func.call(src, dest);
        }

        if from == to && dest.assign_from(src) {
            return Ok(());
        }

        match (src.reflect_ref(), dest.reflect_mut()) {
            (ReflectRef::Scalar(value), ReflectMut::Scalar(slot))
                if value.kind().coercible_to(slot.kind()) =>
            {
                if slot.store(value) {
                    return Ok(());
                }
            }
            (ReflectRef::Sequence(items), ReflectMut::Sequence(slots)) => {
                return self.convert_sequence(items, slots);
            }
            (ReflectRef::Record(fields), ReflectMut::Record(slots)) => {
                return self.convert_record(from, fields, to, slots);
            }
            (value, _) => {
                tracing::trace!(from = from.name, to = to.name, kind = value.kind(), "no conversion rule");
            }
        }

        Err(ConvertError::NotConvertible {
            from: from.name,
            to: to.name,
        })
    }

    /// Private functions shadow shared ones.
    fn find_function(&self, from: TypeDesc, to: TypeDesc) -> Option<ConversionFn> {
        match self.functions.find(from.id, to.id) {
            Some(func) => Some(func.clone()),
            None => self.shared.find(from.id, to.id),
        }
    }

    fn convert_sequence(
        &self,
        items: &dyn Sequence,
        slots: &mut dyn Sequence,
    ) -> Result<(), ConvertError> {
        slots.reset(items.len());
        for index in 0..items.len() {
            let (Some(item), Some(slot)) = (items.get(index), slots.get_mut(index)) else {
                continue;
            };
            match item.deref() {
                Some(value) => self.convert_dyn(value, slot)?,
                None if self.options.nil_elements == NilElementPolicy::ZeroInitialize => {
                    slot.deref_alloc();
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Merge-join the two name-sorted field lists.
    fn convert_record(
        &self,
        from: TypeDesc,
        src: &dyn Record,
        to: TypeDesc,
        dest: &mut dyn Record,
    ) -> Result<(), ConvertError> {
        let src_schema = self.cache.resolve(from);
        let dest_schema = self.cache.resolve(to);
        if let Some(err) = src_schema.error() {
            return Err(err.clone().into());
        }
        if let Some(err) = dest_schema.error() {
            return Err(err.clone().into());
        }

        let src_fields = src_schema.fields();
        let dest_fields = dest_schema.fields();
        let (mut i, mut j) = (0, 0);

        while i < src_fields.len() && j < dest_fields.len() {
            let (s, d) = (&src_fields[i], &dest_fields[j]);
            match s.name.cmp(d.name) {
                Ordering::Less => {
                    if !self.options.destination_field_missing_ok {
                        return Err(missing_destination(s));
                    }
                    i += 1;
                }
                Ordering::Greater => {
                    if !self.options.source_field_missing_ok {
                        return Err(missing_source(d));
                    }
                    j += 1;
                }
                Ordering::Equal => {
                    // Absent or nil source data leaves the destination alone.
                    if let Some(value) = field_value(src, &s.path) {
                        let slot = field_slot(dest, to, &d.path)?;
                        self.convert_dyn(value, slot)?;
                    }
                    i += 1;
                    j += 1;
                }
            }
        }

        if let Some(s) = src_fields.get(i) {
            if !self.options.destination_field_missing_ok {
                return Err(missing_destination(s));
            }
        }
        if let Some(d) = dest_fields.get(j) {
            if !self.options.source_field_missing_ok {
                return Err(missing_source(d));
            }
        }
        Ok(())
    }
}

fn missing_destination(field: &FieldEntry) -> ConvertError {
    ConvertError::MissingDestinationField {
        name: field.name,
        ty: field.ty.name,
    }
}

fn missing_source(field: &FieldEntry) -> ConvertError {
    ConvertError::MissingSourceField {
        name: field.name,
        ty: field.ty.name,
    }
}

/// Follow `path` from `record`, dereferencing pointers between steps.
/// `None` when an intermediate pointer or the value itself is nil.
fn field_value<'a>(record: &'a dyn Record, path: &[usize]) -> Option<&'a dyn Reflect> {
    let (&first, rest) = path.split_first()?;
    let mut value = record.field(first)?;
    for &index in rest {
        value = match value.deref()?.reflect_ref() {
            ReflectRef::Record(inner) => inner.field(index)?,
            _ => return None,
        };
    }
    value.deref()
}

/// Follow `path` from `record`, allocating nil pointers on the way.
fn field_slot<'a>(
    record: &'a mut dyn Record,
    ty: TypeDesc,
    path: &[usize],
) -> Result<&'a mut dyn Reflect, ConvertError> {
    let missing = |index| ConvertError::FieldAccess { ty: ty.name, index };
    let Some((&first, rest)) = path.split_first() else {
        return Err(missing(0));
    };
    let mut slot = record.field_mut(first).ok_or_else(|| missing(first))?;
    for &index in rest {
        slot = match slot.deref_alloc().reflect_mut() {
            ReflectMut::Record(inner) => inner.field_mut(index).ok_or_else(|| missing(index))?,
            _ => return Err(missing(index)),
        };
    }
    Ok(slot)
}

/// Builder for [`Converter`].
///
/// Registration errors are kept and reported by [`build`](Self::build).
#[derive(Debug, Default)]
pub struct ConverterBuilder {
    functions: FunctionRegistry,
    shared: Option<Arc<SharedRegistry>>,
    cache: Option<Arc<SchemaCache>>,
    options: ConvertOptions,
    error: Option<RegistrationError>,
}

impl ConverterBuilder {
    /// Add a private `S → D` conversion function. It takes priority over
    /// shared functions for the same pair.
    pub fn conversion_function<S, D, F, E>(mut self, f: F) -> Self
    where
        S: Reflect,
        D: Reflect,
        F: Fn(&S, &mut D) -> Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        if let Err(e) = self.functions.register(f) {
            if self.error.is_none() {
                self.error = Some(e);
            }
        }
        self
    }

    /// Destination fields with no source counterpart are left untouched.
    pub fn source_field_missing_ok(mut self) -> Self {
        self.options.source_field_missing_ok = true;
        self
    }

    /// Source fields with no destination counterpart are dropped.
    pub fn destination_field_missing_ok(mut self) -> Self {
        self.options.destination_field_missing_ok = true;
        self
    }

    pub fn nil_elements(mut self, policy: NilElementPolicy) -> Self {
        self.options.nil_elements = policy;
        self
    }

    /// Replace all toggles at once, e.g. with options loaded from TOML.
    pub fn options(mut self, options: ConvertOptions) -> Self {
        self.options = options;
        self
    }

    pub fn schema_cache(mut self, cache: Arc<SchemaCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn shared_functions(mut self, shared: Arc<SharedRegistry>) -> Self {
        self.shared = Some(shared);
        self
    }

    pub fn build(self) -> Result<Converter, ConvertError> {
        if let Some(e) = self.error {
            return Err(e.into());
        }
        Ok(Converter {
            functions: self.functions,
            shared: self.shared.unwrap_or_else(SharedRegistry::global),
            cache: self.cache.unwrap_or_else(SchemaCache::global),
            options: self.options,
        })
    }
}
