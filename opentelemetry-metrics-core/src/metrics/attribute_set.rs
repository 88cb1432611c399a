use std::hash::{Hash, Hasher};

use opentelemetry::{Array, KeyValue, Value};
use rustc_hash::FxHasher;

/// A unique set of attributes that identifies one data point of a stream.
///
/// Keys are sorted and de-duplicated (the last value for a key wins), so the
/// same attributes passed in any order map to the same set.
#[derive(Clone, Default, Debug)]
pub(crate) struct AttributeSet(Vec<KeyValue>, u64);

impl From<&[KeyValue]> for AttributeSet {
    fn from(values: &[KeyValue]) -> Self {
        let mut vec: Vec<KeyValue> = Vec::with_capacity(values.len());
        for kv in values {
            // keep the last value written for a key
            if let Some(existing) = vec.iter_mut().find(|e| e.key == kv.key) {
                existing.value = kv.value.clone();
            } else {
                vec.push(kv.clone());
            }
        }
        vec.sort_by(|a, b| a.key.cmp(&b.key));

        let hash = calculate_hash(&vec);
        AttributeSet(vec, hash)
    }
}

fn calculate_hash(values: &[KeyValue]) -> u64 {
    let mut hasher = FxHasher::default();
    for kv in values {
        kv.key.hash(&mut hasher);
        hash_value(&kv.value, &mut hasher);
    }
    hasher.finish()
}

fn hash_value(value: &Value, hasher: &mut FxHasher) {
    match value {
        Value::Bool(b) => {
            hasher.write_u8(0);
            b.hash(hasher);
        }
        Value::I64(i) => {
            hasher.write_u8(1);
            i.hash(hasher);
        }
        Value::F64(f) => {
            hasher.write_u8(2);
            f.to_bits().hash(hasher);
        }
        Value::String(s) => {
            hasher.write_u8(3);
            s.as_str().hash(hasher);
        }
        Value::Array(array) => {
            hasher.write_u8(4);
            match array {
                Array::Bool(v) => v.hash(hasher),
                Array::I64(v) => v.hash(hasher),
                Array::F64(v) => v.iter().for_each(|f| f.to_bits().hash(hasher)),
                Array::String(v) => v.iter().for_each(|s| s.as_str().hash(hasher)),
                other => other.to_string().hash(hasher),
            }
        }
        other => {
            hasher.write_u8(5);
            other.to_string().hash(hasher);
        }
    }
}

impl AttributeSet {
    pub(crate) fn into_vec(self) -> Vec<KeyValue> {
        self.0
    }

    pub(crate) fn to_vec(&self) -> Vec<KeyValue> {
        self.0.clone()
    }
}

impl PartialEq for AttributeSet {
    fn eq(&self, other: &Self) -> bool {
        self.1 == other.1 && self.0 == other.0
    }
}

impl Eq for AttributeSet {}

impl Hash for AttributeSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_does_not_matter() {
        let a = AttributeSet::from(&[KeyValue::new("b", 2), KeyValue::new("a", "x")][..]);
        let b = AttributeSet::from(&[KeyValue::new("a", "x"), KeyValue::new("b", 2)][..]);
        assert_eq!(a, b);
        assert_eq!(
            a.to_vec().iter().map(|kv| kv.key.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn last_duplicate_wins() {
        let set = AttributeSet::from(
            &[
                KeyValue::new("k", 1),
                KeyValue::new("other", true),
                KeyValue::new("k", 2),
            ][..],
        );
        let attrs = set.into_vec();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0], KeyValue::new("k", 2));
    }

    #[test]
    fn different_values_differ() {
        let a = AttributeSet::from(&[KeyValue::new("k", 1.5)][..]);
        let b = AttributeSet::from(&[KeyValue::new("k", 2.5)][..]);
        assert_ne!(a, b);
        assert!(AttributeSet::from(&[][..]).into_vec().is_empty());
    }
}
