use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock, RwLock};

use crate::error::{BoxError, ConvertError, RegistrationError};
use crate::reflect::{Reflect, TypeDesc};

type DynConvertFn = dyn Fn(&dyn Reflect, &mut dyn Reflect) -> Result<(), ConvertError> + Send + Sync;

/// A registered, type-erased conversion function.
#[derive(Clone)]
pub struct ConversionFn {
    source: TypeDesc,
    dest: TypeDesc,
    func: Arc<DynConvertFn>,
}

impl ConversionFn {
    /// Wrap `f`, checking the rules its signature cannot express.
    pub fn new<S, D, F, E>(f: F) -> Result<Self, RegistrationError>
    where
        S: Reflect,
        D: Reflect,
        F: Fn(&S, &mut D) -> Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let source = S::type_desc();
        let dest = D::type_desc();
        if source.is_pointer() {
            return Err(RegistrationError::SourceIsPointer(source.name));
        }
        if dest.is_pointer() {
            return Err(RegistrationError::DestinationIsPointer(dest.name));
        }

        let func = move |src: &dyn Reflect, out: &mut dyn Reflect| {
            let (Some(src), Some(out)) = (
                src.as_any().downcast_ref::<S>(),
                out.as_any_mut().downcast_mut::<D>(),
            ) else {
                return Err(ConvertError::NotConvertible {
                    from: source.name,
                    to: dest.name,
                });
            };
            f(src, out).map_err(|e| ConvertError::Custom(e.into()))
        };

        Ok(Self {
            source,
            dest,
            func: Arc::new(func),
        })
    }

    pub fn source(&self) -> TypeDesc {
        self.source
    }

    pub fn dest(&self) -> TypeDesc {
        self.dest
    }

    /// Errors returned by the function come back as
    /// [`ConvertError::Custom`], unmodified.
    pub fn call(&self, src: &dyn Reflect, dest: &mut dyn Reflect) -> Result<(), ConvertError> {
        (self.func)(src, dest)
    }
}

impl fmt::Debug for ConversionFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionFn")
            .field("source", &self.source)
            .field("dest", &self.dest)
            .finish()
    }
}

/// `(source, destination)` type pair → conversion function.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<(TypeId, TypeId), ConversionFn>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `f` for `S → D`, replacing any earlier function for the pair.
    pub fn register<S, D, F, E>(&mut self, f: F) -> Result<(), RegistrationError>
    where
        S: Reflect,
        D: Reflect,
        F: Fn(&S, &mut D) -> Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        self.insert(ConversionFn::new(f)?);
        Ok(())
    }

    pub fn insert(&mut self, func: ConversionFn) {
        tracing::debug!(source = func.source.name, dest = func.dest.name, "registered conversion function");
        self.functions.insert((func.source.id, func.dest.id), func);
    }

    pub fn find(&self, source: TypeId, dest: TypeId) -> Option<&ConversionFn> {
        self.functions.get(&(source, dest))
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

static GLOBAL: LazyLock<Arc<SharedRegistry>> = LazyLock::new(|| Arc::new(SharedRegistry::new()));

/// Registry shared between converters, consulted after each converter's
/// own functions.
///
/// Populate it during start-up; lookups clone the function out so no lock is
/// held while it runs.
#[derive(Debug, Default)]
pub struct SharedRegistry {
    functions: RwLock<FunctionRegistry>,
}

impl SharedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> Arc<SharedRegistry> {
        Arc::clone(&GLOBAL)
    }

    pub fn register<S, D, F, E>(&self, f: F) -> Result<(), RegistrationError>
    where
        S: Reflect,
        D: Reflect,
        F: Fn(&S, &mut D) -> Result<(), E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let func = ConversionFn::new(f)?;
        let mut guard = match self.functions.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("function registry write lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.insert(func);
        Ok(())
    }

    pub fn find(&self, source: TypeId, dest: TypeId) -> Option<ConversionFn> {
        let guard = match self.functions.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("function registry read lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.find(source, dest).cloned()
    }
}

/// Register `f` in the process-wide registry.
///
/// Meant for start-up code with hard-coded functions.
///
/// # Panics
///
/// Panics if `f` is rejected (pointer source or destination type).
pub fn register_global_conversion_function<S, D, F, E>(f: F)
where
    S: Reflect,
    D: Reflect,
    F: Fn(&S, &mut D) -> Result<(), E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    if let Err(e) = SharedRegistry::global().register(f) {
        panic!("invalid global conversion function: {e}");
    }
}

#[cfg(test)]
mod tests {
    use std::num::ParseIntError;

    use super::*;

    #[test]
    fn pointer_source_is_rejected() {
        let mut registry = FunctionRegistry::new();
        let err = registry
            .register(|_: &Option<i32>, _: &mut f64| Ok::<_, BoxError>(()))
            .unwrap_err();
        assert_eq!(
            err,
            RegistrationError::SourceIsPointer(<Option<i32>>::type_desc().name)
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn boxed_source_is_rejected() {
        let mut registry = FunctionRegistry::new();
        let err = registry
            .register(|_: &Box<i32>, _: &mut f64| Ok::<_, BoxError>(()))
            .unwrap_err();
        assert!(matches!(err, RegistrationError::SourceIsPointer(_)));
    }

    #[test]
    fn pointer_destination_is_rejected() {
        let mut registry = FunctionRegistry::new();
        let err = registry
            .register(|_: &i32, _: &mut Option<f64>| Ok::<_, BoxError>(()))
            .unwrap_err();
        assert!(matches!(err, RegistrationError::DestinationIsPointer(_)));
    }

    #[test]
    fn finds_by_exact_pair() {
        let mut registry = FunctionRegistry::new();
        registry
            .register(|src: &String, dest: &mut i64| -> Result<(), ParseIntError> {
                *dest = src.parse()?;
                Ok(())
            })
            .unwrap();
        let string = TypeId::of::<String>();
        assert!(registry.find(string, TypeId::of::<i64>()).is_some());
        assert!(registry.find(string, TypeId::of::<i32>()).is_none());
        assert!(registry.find(TypeId::of::<i64>(), string).is_none());
    }

    #[test]
    fn call_passes_errors_through() {
        let func = ConversionFn::new(|src: &String, dest: &mut i64| -> Result<(), ParseIntError> {
            *dest = src.parse()?;
            Ok(())
        })
        .unwrap();

        let mut out = 0i64;
        func.call(&String::from("42"), &mut out).unwrap();
        assert_eq!(out, 42);

        let err = func.call(&String::from("4x2"), &mut out).unwrap_err();
        assert!(err.custom_ref::<ParseIntError>().is_some());
    }

    #[test]
    fn later_registration_replaces_earlier() {
        let mut registry = FunctionRegistry::new();
        registry
            .register(|_: &u8, dest: &mut String| {
                *dest = "first".into();
                Ok::<_, BoxError>(())
            })
            .unwrap();
        registry
            .register(|_: &u8, dest: &mut String| {
                *dest = "second".into();
                Ok::<_, BoxError>(())
            })
            .unwrap();
        assert_eq!(registry.len(), 1);

        let mut out = String::new();
        registry
            .find(TypeId::of::<u8>(), TypeId::of::<String>())
            .unwrap()
            .call(&1u8, &mut out)
            .unwrap();
        assert_eq!(out, "second");
    }

    #[test]
    fn shared_registry_clones_functions_out() {
        let shared = SharedRegistry::new();
        shared
            .register(|src: &bool, dest: &mut String| {
                *dest = src.to_string();
                Ok::<_, BoxError>(())
            })
            .unwrap();
        let func = shared
            .find(TypeId::of::<bool>(), TypeId::of::<String>())
            .unwrap();
        assert_eq!(func.source(), bool::type_desc());
        assert_eq!(func.dest(), String::type_desc());
    }

    #[test]
    #[should_panic(expected = "invalid global conversion function")]
    fn invalid_global_registration_panics() {
        register_global_conversion_function(|_: &Option<u8>, _: &mut u8| Ok::<_, BoxError>(()));
    }
}
