//! Runtime type information for Reef classes, interfaces, primitives and
//! arrays.
//!
//! The target host's objects carry no nominal type of their own, so the
//! compiler emits one [`TypeInfo`] per declared type and tags every heap
//! object with it. Subtype tests do not walk an inheritance chain at run
//! time: each descriptor stores the flat set of its ancestor keys, and
//! `is_assignable_from` is a single set-membership check.
//!
//! Array shapes are derived on demand with [`TypeInfo::array_of`] and
//! memoized on their component descriptor, so the same shape request always
//! returns the identical descriptor. Assignability between array types is
//! covariant: equal depths compare their base element types, and an array
//! of the root type accepts any more deeply nested array.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use rustc_hash::FxHashSet;

use crate::value::{ArrayInstance, Value};

/// Compiler-assigned identity of a declared type.
///
/// Key 0 is reserved for the universal root type. Keys at or above
/// [`TypeKey::RUNTIME_BASE`] are handed out by the runtime itself for
/// primitives and array shapes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TypeKey(pub u32);

impl TypeKey {
    /// The universal root type ("Any").
    pub const ANY: TypeKey = TypeKey(0);

    /// First key of the runtime-assigned range.
    pub const RUNTIME_BASE: u32 = 0x8000_0000;
}

static NEXT_RUNTIME_KEY: AtomicU32 = AtomicU32::new(TypeKey::RUNTIME_BASE);

fn fresh_runtime_key() -> TypeKey {
    TypeKey(NEXT_RUNTIME_KEY.fetch_add(1, Ordering::Relaxed))
}

/// What sort of type a descriptor describes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TypeKind {
    Primitive,
    Class,
    Interface,
    Array,
}

/// Instance test for types whose values are host-represented (text, whole
/// numbers, booleans) and therefore carry no type tag.
pub type InstanceTest = fn(&Value) -> bool;

/// Component, leaf element type and nesting depth of an array descriptor.
pub struct ArrayShape {
    component: Arc<TypeInfo>,
    base: Arc<TypeInfo>,
    depth: u32,
}

/// Metadata record for one Reef type.
///
/// Descriptors are immutable once constructed; the only mutable state is
/// the array-shape memo slot, populated at most once.
pub struct TypeInfo {
    key: TypeKey,
    name: String,
    kind: TypeKind,
    ancestors: FxHashSet<TypeKey>,
    instance_test: Option<InstanceTest>,
    zero: Value,
    shape: Option<ArrayShape>,
    array_of: OnceLock<Arc<TypeInfo>>,
    // Back-reference to the owning Arc; descriptors only ever live behind
    // one, so upgrading cannot fail.
    this: Weak<TypeInfo>,
}

impl TypeInfo {
    fn shared(&self) -> Arc<TypeInfo> {
        self.this.upgrade().expect("descriptor not behind an Arc")
    }

    /// The universal root type. Every non-primitive is assignable to it and
    /// every value is an instance of it.
    pub fn for_root(name: &str) -> Arc<TypeInfo> {
        Arc::new_cyclic(|this| TypeInfo {
            key: TypeKey::ANY,
            name: name.to_owned(),
            kind: TypeKind::Class,
            ancestors: FxHashSet::from_iter([TypeKey::ANY]),
            instance_test: Some(|_| true),
            zero: Value::Unit,
            shape: None,
            array_of: OnceLock::new(),
            this: this.clone(),
        })
    }

    /// A primitive type. `zero` is the element value freshly allocated
    /// arrays of this type are filled with.
    pub fn for_primitive(name: &str, zero: Value) -> Arc<TypeInfo> {
        let key = fresh_runtime_key();
        Arc::new_cyclic(|this| TypeInfo {
            key,
            name: name.to_owned(),
            kind: TypeKind::Primitive,
            ancestors: FxHashSet::from_iter([key, TypeKey::ANY]),
            instance_test: None,
            zero,
            shape: None,
            array_of: OnceLock::new(),
            this: this.clone(),
        })
    }

    /// A class or interface descriptor.
    ///
    /// `ancestors` lists the keys of all transitive supertypes; the own key
    /// and the root key are added here, so callers never pass them. A
    /// custom `instance_test` takes precedence over the tag check and is
    /// used for host-represented types.
    pub fn for_class(
        key: TypeKey,
        is_interface: bool,
        name: &str,
        ancestors: &[TypeKey],
        instance_test: Option<InstanceTest>,
    ) -> Arc<TypeInfo> {
        let mut set: FxHashSet<TypeKey> = ancestors.iter().copied().collect();
        set.insert(key);
        set.insert(TypeKey::ANY);
        Arc::new_cyclic(|this| TypeInfo {
            key,
            name: name.to_owned(),
            kind: if is_interface {
                TypeKind::Interface
            } else {
                TypeKind::Class
            },
            ancestors: set,
            instance_test,
            zero: Value::Unit,
            shape: None,
            array_of: OnceLock::new(),
            this: this.clone(),
        })
    }

    /// The array-of-self descriptor.
    ///
    /// The first request constructs the shape and caches it on this
    /// descriptor; later requests return the identical `Arc`.
    pub fn array_of(&self) -> Arc<TypeInfo> {
        self.array_of
            .get_or_init(|| {
                let (base, depth) = match &self.shape {
                    Some(shape) => (shape.base.clone(), shape.depth + 1),
                    None => (self.shared(), 1),
                };
                let key = fresh_runtime_key();
                Arc::new_cyclic(|this| TypeInfo {
                    key,
                    name: format!("{}[]", self.name),
                    kind: TypeKind::Array,
                    ancestors: FxHashSet::from_iter([key, TypeKey::ANY]),
                    instance_test: None,
                    zero: Value::Unit,
                    shape: Some(ArrayShape {
                        component: self.shared(),
                        base,
                        depth,
                    }),
                    array_of: OnceLock::new(),
                    this: this.clone(),
                })
            })
            .clone()
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is_primitive(&self) -> bool {
        self.kind == TypeKind::Primitive
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn is_array(&self) -> bool {
        self.kind == TypeKind::Array
    }

    pub fn is_root(&self) -> bool {
        self.key == TypeKey::ANY
    }

    /// The component type, for array descriptors.
    pub fn component(&self) -> Option<&Arc<TypeInfo>> {
        self.shape.as_ref().map(|s| &s.component)
    }

    /// The non-array leaf element type, for array descriptors.
    pub fn array_base(&self) -> Option<&Arc<TypeInfo>> {
        self.shape.as_ref().map(|s| &s.base)
    }

    /// Nesting depth: 0 for non-arrays.
    pub fn array_depth(&self) -> u32 {
        self.shape.as_ref().map_or(0, |s| s.depth)
    }

    /// The default element value for arrays of this type: the declared zero
    /// for primitives, an unset slot for everything else.
    pub fn zero_value(&self) -> Value {
        self.zero.clone()
    }

    /// Whether `value` is an instance of this type. Total: unrecognized
    /// values are simply not instances.
    pub fn is_instance(&self, value: &Value) -> bool {
        match self.kind {
            // Primitives have no reference identity to test.
            TypeKind::Primitive => false,
            TypeKind::Array => match value.type_tag() {
                Some(tag) if tag.is_array() => {
                    tag.key == self.key || self.is_assignable_from(tag)
                }
                _ => false,
            },
            TypeKind::Class | TypeKind::Interface => match self.instance_test {
                Some(test) => test(value),
                None => value
                    .type_tag()
                    .is_some_and(|tag| tag.ancestors.contains(&self.key)),
            },
        }
    }

    /// Whether values of type `other` can stand wherever this type is
    /// expected.
    pub fn is_assignable_from(&self, other: &TypeInfo) -> bool {
        match self.kind {
            TypeKind::Primitive => other.key == self.key,
            TypeKind::Array => {
                let Some(shape) = &self.shape else { return false };
                let Some(other_shape) = &other.shape else { return false };
                if other_shape.depth == shape.depth {
                    shape.base.is_assignable_from(&other_shape.base)
                } else {
                    other_shape.depth > shape.depth && shape.base.is_root()
                }
            }
            TypeKind::Class | TypeKind::Interface => {
                if self.is_root() {
                    !other.is_primitive()
                } else {
                    other.ancestors.contains(&self.key)
                }
            }
        }
    }

    /// Allocate a (possibly multi-dimensional) array of this array type.
    ///
    /// `dims` gives the length of each dimension, outermost first, and may
    /// be shorter than the nesting depth; the innermost allocated level is
    /// then filled with unset slots instead of sub-arrays. Leaf elements
    /// get the base type's zero value.
    pub fn new_array(&self, dims: &[usize]) -> Value {
        let shape = self
            .shape
            .as_ref()
            .expect("new_array called on a non-array type");
        assert!(
            !dims.is_empty() && dims.len() as u32 <= shape.depth,
            "array dimension count {} out of range for {}",
            dims.len(),
            self.name,
        );
        let len = dims[0];
        let elems: Vec<Value> = if dims.len() > 1 {
            (0..len).map(|_| shape.component.new_array(&dims[1..])).collect()
        } else {
            vec![shape.component.zero_value(); len]
        };
        Value::Array(ArrayInstance::new(self.shared(), elems))
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Instance;

    struct Lattice {
        root: Arc<TypeInfo>,
        drawable: Arc<TypeInfo>,
        shape: Arc<TypeInfo>,
        circle: Arc<TypeInfo>,
        int: Arc<TypeInfo>,
        text: Arc<TypeInfo>,
    }

    /// Any <- Shape <- Circle, with Circle also implementing Drawable.
    fn lattice() -> Lattice {
        let root = TypeInfo::for_root("Any");
        let drawable = TypeInfo::for_class(TypeKey(10), true, "Drawable", &[], None);
        let shape = TypeInfo::for_class(TypeKey(11), false, "Shape", &[], None);
        let circle = TypeInfo::for_class(
            TypeKey(12),
            false,
            "Circle",
            &[TypeKey(11), TypeKey(10)],
            None,
        );
        let int = TypeInfo::for_primitive("Int", Value::Number(0.0));
        let text = TypeInfo::for_class(
            TypeKey(13),
            false,
            "Text",
            &[],
            Some(|v| matches!(v, Value::Text(_))),
        );
        Lattice { root, drawable, shape, circle, int, text }
    }

    #[test]
    fn test_instance_checks_follow_ancestors() {
        let l = lattice();
        let obj = Value::Object(Instance::new(&l.circle, 0));
        assert!(l.circle.is_instance(&obj));
        assert!(l.shape.is_instance(&obj));
        assert!(l.drawable.is_instance(&obj));
        assert!(l.root.is_instance(&obj));

        let shape_obj = Value::Object(Instance::new(&l.shape, 0));
        assert!(!l.circle.is_instance(&shape_obj));
        assert!(!l.drawable.is_instance(&shape_obj));
    }

    #[test]
    fn test_primitive_is_never_an_instance() {
        let l = lattice();
        assert!(!l.int.is_instance(&Value::Number(3.0)));
        assert!(!l.int.is_instance(&Value::Unit));
    }

    #[test]
    fn test_custom_instance_test() {
        let l = lattice();
        assert!(l.text.is_instance(&Value::text("hello")));
        assert!(!l.text.is_instance(&Value::Number(1.0)));
        // Tagless values are not instances of ordinary classes.
        assert!(!l.shape.is_instance(&Value::text("hello")));
    }

    #[test]
    fn test_root_accepts_everything() {
        let l = lattice();
        assert!(l.root.is_instance(&Value::Unit));
        assert!(l.root.is_instance(&Value::Number(1.0)));
        assert!(l.root.is_instance(&Value::text("x")));
    }

    #[test]
    fn test_assignability() {
        let l = lattice();
        assert!(l.shape.is_assignable_from(&l.circle));
        assert!(l.drawable.is_assignable_from(&l.circle));
        assert!(!l.circle.is_assignable_from(&l.shape));
        assert!(l.root.is_assignable_from(&l.circle));
        assert!(l.root.is_assignable_from(&l.drawable));
        assert!(!l.root.is_assignable_from(&l.int));
        assert!(l.int.is_assignable_from(&l.int));
        assert!(!l.int.is_assignable_from(&l.circle));
    }

    #[test]
    fn test_array_of_is_memoized() {
        let l = lattice();
        let a = l.circle.array_of();
        let b = l.circle.array_of();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a.array_of(), &b.array_of()));
        assert_eq!(a.name(), "Circle[]");
        assert_eq!(a.array_of().name(), "Circle[][]");
        assert_eq!(a.kind(), TypeKind::Array);
        assert_eq!(a.array_depth(), 1);
        assert_eq!(a.array_of().array_depth(), 2);
        assert!(Arc::ptr_eq(a.array_of().array_base().unwrap(), &l.circle));
    }

    #[test]
    fn test_array_covariance_equal_depth() {
        let l = lattice();
        let shape_arr = l.shape.array_of();
        let circle_arr = l.circle.array_of();
        assert!(shape_arr.is_assignable_from(&circle_arr));
        assert!(!circle_arr.is_assignable_from(&shape_arr));
        assert!(circle_arr.is_assignable_from(&circle_arr));
    }

    #[test]
    fn test_array_covariance_depth_mismatch() {
        let l = lattice();
        let any_arr = l.root.array_of();
        let circle_arr2 = l.circle.array_of().array_of();
        // An array of the root type accepts any deeper array.
        assert!(any_arr.is_assignable_from(&circle_arr2));
        // But not the other way around, and non-root bases reject deeper
        // arrays.
        assert!(!circle_arr2.is_assignable_from(&any_arr));
        assert!(!l.shape.array_of().is_assignable_from(&circle_arr2));
    }

    #[test]
    fn test_arrays_assignable_to_root_only_among_classes() {
        let l = lattice();
        let arr = l.circle.array_of();
        assert!(l.root.is_assignable_from(&arr));
        assert!(!l.shape.is_assignable_from(&arr));
        // Non-arrays are never assignable to an array type.
        assert!(!arr.is_assignable_from(&l.circle));
    }

    #[test]
    fn test_array_instance_checks() {
        let l = lattice();
        let circle_arr = l.circle.array_of();
        let shape_arr = l.shape.array_of();
        let arr = circle_arr.new_array(&[2]);
        assert!(circle_arr.is_instance(&arr));
        assert!(shape_arr.is_instance(&arr));
        assert!(!shape_arr.array_of().is_instance(&arr));
        assert!(!circle_arr.is_instance(&Value::Number(1.0)));
        assert!(l.root.is_instance(&arr));
    }

    #[test]
    fn test_new_array_fills_primitive_zero() {
        let l = lattice();
        let arr_ty = l.int.array_of();
        let arr = match arr_ty.new_array(&[3]) {
            Value::Array(a) => a,
            other => panic!("expected array, got {other:?}"),
        };
        assert_eq!(arr.len(), 3);
        assert_eq!(arr.get(0), Value::Number(0.0));
    }

    #[test]
    fn test_new_array_nested() {
        let l = lattice();
        let ty2 = l.int.array_of().array_of();
        let outer = match ty2.new_array(&[2, 3]) {
            Value::Array(a) => a,
            other => panic!("expected array, got {other:?}"),
        };
        assert_eq!(outer.len(), 2);
        let inner = match outer.get(1) {
            Value::Array(a) => a,
            other => panic!("expected inner array, got {other:?}"),
        };
        assert_eq!(inner.len(), 3);
        assert_eq!(inner.get(0), Value::Number(0.0));
        assert!(l.int.array_of().is_instance(&outer.get(1)));
    }

    #[test]
    fn test_new_array_partial_dims() {
        let l = lattice();
        let ty2 = l.int.array_of().array_of();
        let outer = match ty2.new_array(&[2]) {
            Value::Array(a) => a,
            other => panic!("expected array, got {other:?}"),
        };
        // Sub-arrays are left unallocated.
        assert_eq!(outer.get(0), Value::Unit);
    }
}
