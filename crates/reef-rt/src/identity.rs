//! Hash codes for runtime values.
//!
//! Host-represented values (booleans, numbers, text) hash by content, the
//! same way the target runtime does, so equal values agree across
//! processes. References have no content to hash; they get a process-wide
//! identity hash assigned lazily from a counter and remembered for the
//! referent's lifetime.
//!
//! The registry holds a `Weak` per entry, so it never keeps a referent
//! alive, and a dead entry whose address is reused by a new allocation is
//! detected and replaced. Dead entries are swept whenever the table crosses
//! a growth watermark. The lock only guards the create-if-absent step;
//! lookups of already-hashed references stay cheap.

use std::any::Any;
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::value::Value;

struct Entry {
    live: Weak<dyn Any + Send + Sync>,
    hash: i32,
}

struct Registry {
    last_hash: i32,
    entries: FxHashMap<usize, Entry>,
    sweep_at: usize,
}

const MIN_SWEEP_AT: usize = 64;

static REGISTRY: OnceLock<Mutex<Registry>> = OnceLock::new();

fn registry() -> &'static Mutex<Registry> {
    REGISTRY.get_or_init(|| {
        Mutex::new(Registry {
            last_hash: 0,
            entries: FxHashMap::default(),
            sweep_at: MIN_SWEEP_AT,
        })
    })
}

/// The identity hash of a shared reference: assigned on first request,
/// stable for the referent's lifetime.
pub fn identity_hash<T: Any + Send + Sync>(value: &Arc<T>) -> i32 {
    let addr = Arc::as_ptr(value) as usize;
    let mut reg = registry().lock();

    if let Some(entry) = reg.entries.get(&addr) {
        if entry.live.strong_count() > 0 {
            return entry.hash;
        }
        // The old referent died and the allocator reused its address.
    }

    let hash = reg.last_hash.wrapping_add(1);
    reg.last_hash = hash;
    let live = Arc::downgrade(value);
    let live: Weak<dyn Any + Send + Sync> = live;
    reg.entries.insert(addr, Entry { live, hash });

    if reg.entries.len() >= reg.sweep_at {
        reg.entries.retain(|_, entry| entry.live.strong_count() > 0);
        reg.sweep_at = (reg.entries.len() * 2).max(MIN_SWEEP_AT);
    }
    hash
}

/// The hash code of any runtime value, dispatching between content hashes
/// and identity hashes the way the target runtime does.
pub fn value_hash(value: &Value) -> i32 {
    match value {
        Value::Unit => 0,
        Value::Bool(true) => 1231,
        Value::Bool(false) => 1237,
        Value::Number(n) => number_hash(*n),
        Value::Text(s) => string_hash(s),
        Value::Object(obj) => identity_hash(obj),
        Value::Array(arr) => identity_hash(arr),
    }
}

/// Numbers exactly representable in 32 bits hash as that integer (so 5 and
/// 5.0 agree); everything else folds the IEEE bits.
fn number_hash(n: f64) -> i32 {
    let truncated = n as i32;
    if truncated as f64 == n {
        return truncated;
    }
    let bits = n.to_bits();
    (bits ^ (bits >> 32)) as i32
}

/// 31-based rolling hash over UTF-16 units.
fn string_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typeinfo::{TypeInfo, TypeKey};
    use crate::value::Instance;

    fn test_class() -> std::sync::Arc<TypeInfo> {
        TypeInfo::for_class(TypeKey(40), false, "Node", &[], None)
    }

    #[test]
    fn test_identity_hash_is_stable() {
        let class = test_class();
        let obj = Instance::new(&class, 0);
        let first = identity_hash(&obj);
        assert_eq!(identity_hash(&obj), first);
        assert_eq!(value_hash(&Value::Object(obj.clone())), first);
    }

    #[test]
    fn test_identity_hash_distinguishes_live_objects() {
        let class = test_class();
        let a = Instance::new(&class, 0);
        let b = Instance::new(&class, 0);
        assert_ne!(identity_hash(&a), identity_hash(&b));
    }

    #[test]
    fn test_registry_survives_many_dead_entries() {
        let class = test_class();
        // Far more allocations than the sweep watermark; entries for dead
        // instances must not pin memory or corrupt later hashes.
        let keeper = Instance::new(&class, 0);
        let keeper_hash = identity_hash(&keeper);
        for _ in 0..1000 {
            let temp = Instance::new(&class, 0);
            let h = identity_hash(&temp);
            assert_ne!(h, keeper_hash);
        }
        assert_eq!(identity_hash(&keeper), keeper_hash);
    }

    #[test]
    fn test_bool_hashes() {
        assert_eq!(value_hash(&Value::Bool(true)), 1231);
        assert_eq!(value_hash(&Value::Bool(false)), 1237);
        assert_eq!(value_hash(&Value::Unit), 0);
    }

    #[test]
    fn test_number_hashes() {
        assert_eq!(value_hash(&Value::Number(0.0)), 0);
        assert_eq!(value_hash(&Value::Number(-0.0)), 0);
        assert_eq!(value_hash(&Value::Number(42.0)), 42);
        assert_eq!(value_hash(&Value::Number(-7.0)), -7);
        // Non-integral values fold their bits; just pin the agreement
        // between equal values.
        assert_eq!(
            value_hash(&Value::Number(1.5)),
            value_hash(&Value::Number(1.5))
        );
        assert_ne!(
            value_hash(&Value::Number(1.5)),
            value_hash(&Value::Number(2.5))
        );
    }

    #[test]
    fn test_string_hashes() {
        assert_eq!(value_hash(&Value::text("")), 0);
        assert_eq!(value_hash(&Value::text("a")), 97);
        // Java-compatible rolling hash.
        assert_eq!(value_hash(&Value::text("abc")), 96354);
        assert_eq!(
            value_hash(&Value::text("hello")),
            value_hash(&Value::text("hello"))
        );
    }
}
