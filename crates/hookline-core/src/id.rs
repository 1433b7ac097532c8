//! # Unique ids
//!
//! [`IdRegistry`] hands out human-readable ids (`id-button-3`) for arbitrary
//! keys and remembers them, so asking again for the same key returns the
//! same id. An optional [`IdNamespace`] (the live document, in a browser)
//! is consulted so generated ids never shadow ids that already exist there.
//!
//! A process-wide registry backs the free functions [`generate_id`],
//! [`release_id`], [`has_id`] and [`reset_ids`].
//!
//! ```rust
//! use hookline_core::*;
//!
//! let mut ids = IdRegistry::new();
//! let a = ids.generate(Some("user name".into()), &IdOptions::default()).unwrap();
//! assert_eq!(a, "id-user_name-0");
//! assert_eq!(ids.generate(Some("user name".into()), &IdOptions::default()).unwrap(), a);
//! ```

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::{HookError, Result};

/// Candidate redraws allowed when the namespace keeps reporting collisions.
pub const MAX_ATTEMPTS: usize = 1000;

static NEXT_OBJECT: AtomicU64 = AtomicU64::new(0);

/// Opaque identity for keying ids by object rather than by value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectKey(u64);

impl ObjectKey {
    pub fn new() -> Self {
        Self(NEXT_OBJECT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ObjectKey {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity of a document element, tagged with its tag name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ElementKey {
    tag: String,
    object: ObjectKey,
}

impl ElementKey {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            object: ObjectKey::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn object(&self) -> ObjectKey {
        self.object
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IdKey {
    Text(String),
    Number(i64),
    Object(ObjectKey),
    Element(ElementKey),
    /// Stand-in used when no key is given; never equal to any other key.
    Anonymous(u64),
}

impl IdKey {
    /// The readable middle part of generated ids.
    pub fn kind_tag(&self) -> Cow<'_, str> {
        match self {
            IdKey::Element(el) => Cow::Owned(el.tag.to_lowercase()),
            IdKey::Object(_) => Cow::Borrowed("object"),
            IdKey::Text(s) => sanitize(s),
            IdKey::Number(n) => sanitize(&n.to_string()).into_owned().into(),
            IdKey::Anonymous(_) => Cow::Borrowed("generic"),
        }
    }
}

fn sanitize(s: &str) -> Cow<'_, str> {
    let ok = |c: char| c.is_ascii_alphanumeric() || c == '_';
    if s.chars().all(ok) {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(s.chars().map(|c| if ok(c) { c } else { '_' }).collect())
    }
}

impl From<&str> for IdKey {
    fn from(s: &str) -> Self {
        IdKey::Text(s.to_owned())
    }
}

impl From<String> for IdKey {
    fn from(s: String) -> Self {
        IdKey::Text(s)
    }
}

impl From<i64> for IdKey {
    fn from(n: i64) -> Self {
        IdKey::Number(n)
    }
}

impl From<i32> for IdKey {
    fn from(n: i32) -> Self {
        IdKey::Number(n.into())
    }
}

impl From<u32> for IdKey {
    fn from(n: u32) -> Self {
        IdKey::Number(n.into())
    }
}

impl From<ObjectKey> for IdKey {
    fn from(o: ObjectKey) -> Self {
        IdKey::Object(o)
    }
}

impl From<ElementKey> for IdKey {
    fn from(el: ElementKey) -> Self {
        IdKey::Element(el)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct IdOptions {
    pub prefix: String,
    pub divider: String,
    /// Issue a fresh id even if the key already has one.
    pub force_new: bool,
}

impl Default for IdOptions {
    fn default() -> Self {
        Self {
            prefix: "id".into(),
            divider: "-".into(),
            force_new: false,
        }
    }
}

impl IdOptions {
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn divider(mut self, divider: impl Into<String>) -> Self {
        self.divider = divider.into();
        self
    }

    pub fn force_new(mut self, force_new: bool) -> Self {
        self.force_new = force_new;
        self
    }
}

/// An external id space generated ids must not collide with.
pub trait IdNamespace: Send {
    fn contains(&self, id: &str) -> bool;
}

impl<F> IdNamespace for F
where
    F: Fn(&str) -> bool + Send,
{
    fn contains(&self, id: &str) -> bool {
        self(id)
    }
}

impl IdNamespace for HashSet<String> {
    fn contains(&self, id: &str) -> bool {
        HashSet::contains(self, id)
    }
}

#[derive(Default)]
pub struct IdRegistry {
    ids: HashMap<IdKey, String>,
    issued: HashSet<String>,
    counter: u64,
    next_anonymous: u64,
    namespace: Option<Box<dyn IdNamespace>>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(namespace: impl IdNamespace + 'static) -> Self {
        Self {
            namespace: Some(Box::new(namespace)),
            ..Self::default()
        }
    }

    pub fn set_namespace(&mut self, namespace: Option<Box<dyn IdNamespace>>) {
        self.namespace = namespace;
    }

    /// Returns the id stored for `key`, generating and storing one if there
    /// is none (or if `force_new` is set). Without a key every call yields a
    /// new id.
    pub fn generate(&mut self, key: Option<IdKey>, options: &IdOptions) -> Result<String> {
        let key = match key {
            Some(key) => key,
            None => {
                self.next_anonymous += 1;
                IdKey::Anonymous(self.next_anonymous)
            }
        };

        if !options.force_new
            && let Some(id) = self.ids.get(&key)
        {
            return Ok(id.clone());
        }

        let kind = key.kind_tag();
        let mut candidate = self.candidate(&kind, options);
        let mut redraws = 0;
        while self.is_taken(&candidate) {
            if redraws >= MAX_ATTEMPTS {
                return Err(HookError::GenerationExhausted {
                    attempts: redraws,
                    last: candidate,
                });
            }
            log::warn!("id `{candidate}` already in use; drawing another");
            redraws += 1;
            candidate = self.candidate(&kind, options);
        }
        drop(kind);

        self.issued.insert(candidate.clone());
        if let Some(old) = self.ids.insert(key, candidate.clone()) {
            self.issued.remove(&old);
        }
        Ok(candidate)
    }

    fn candidate(&mut self, kind: &str, options: &IdOptions) -> String {
        let n = self.counter;
        self.counter += 1;
        let IdOptions {
            prefix, divider, ..
        } = options;
        format!("{prefix}{divider}{kind}{divider}{n}")
    }

    fn is_taken(&self, id: &str) -> bool {
        self.issued.contains(id) || self.namespace.as_ref().is_some_and(|ns| ns.contains(id))
    }

    pub fn get(&self, key: &IdKey) -> Option<&str> {
        self.ids.get(key).map(String::as_str)
    }

    /// Forgets the id for `key`. Returns whether there was one.
    pub fn release(&mut self, key: &IdKey) -> bool {
        match self.ids.remove(key) {
            Some(id) => {
                self.issued.remove(&id);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, key: &IdKey) -> bool {
        self.ids.contains_key(key)
    }

    /// Forgets every id and restarts the counter at zero. Ids handed out
    /// before the reset can be issued again afterwards.
    pub fn reset(&mut self) {
        self.ids.clear();
        self.issued.clear();
        self.counter = 0;
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

static DEFAULT_REGISTRY: LazyLock<Mutex<IdRegistry>> =
    LazyLock::new(|| Mutex::new(IdRegistry::new()));

/// [`IdRegistry::generate`] on the process-wide registry.
pub fn generate_id(key: Option<IdKey>, options: &IdOptions) -> Result<String> {
    DEFAULT_REGISTRY.lock().generate(key, options)
}

pub fn release_id(key: &IdKey) -> bool {
    DEFAULT_REGISTRY.lock().release(key)
}

pub fn has_id(key: &IdKey) -> bool {
    DEFAULT_REGISTRY.lock().contains(key)
}

/// Clears the process-wide registry. Meant for test isolation.
pub fn reset_ids() {
    DEFAULT_REGISTRY.lock().reset();
}

/// Sets the namespace the process-wide registry checks candidates against.
/// The namespace must not call back into the process-wide registry.
pub fn set_id_namespace(namespace: Option<Box<dyn IdNamespace>>) {
    DEFAULT_REGISTRY.lock().set_namespace(namespace);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn opts() -> IdOptions {
        IdOptions::default()
    }

    #[test]
    fn test_default_shape() {
        let mut ids = IdRegistry::new();
        assert_eq!(ids.generate(Some("test-key".into()), &opts()).unwrap(), "id-test_key-0");
        assert_eq!(ids.generate(Some("a b/c".into()), &opts()).unwrap(), "id-a_b_c-1");
        assert_eq!(ids.generate(Some(42.into()), &opts()).unwrap(), "id-42-2");
        assert_eq!(ids.generate(Some((-7).into()), &opts()).unwrap(), "id-_7-3");
    }

    #[test]
    fn test_same_key_same_id() {
        let mut ids = IdRegistry::new();
        let a = ids.generate(Some("k".into()), &opts()).unwrap();
        let b = ids.generate(Some("k".into()), &opts()).unwrap();
        assert_eq!(a, b);
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn test_text_and_number_keys_are_distinct() {
        let mut ids = IdRegistry::new();
        let text = ids.generate(Some("5".into()), &opts()).unwrap();
        let num = ids.generate(Some(5.into()), &opts()).unwrap();
        assert_ne!(text, num);
    }

    #[test]
    fn test_different_keys_never_collide() {
        let mut ids = IdRegistry::new();
        let mut seen = HashSet::new();
        for i in 0..200 {
            let id = ids.generate(Some(format!("k{}", i % 50).into()), &opts()).unwrap();
            seen.insert(id);
        }
        assert_eq!(seen.len(), 50);
    }

    #[test]
    fn test_force_new_replaces_id() {
        let mut ids = IdRegistry::new();
        let a = ids.generate(Some("k".into()), &opts()).unwrap();
        let b = ids.generate(Some("k".into()), &opts().force_new(true)).unwrap();
        assert_ne!(a, b);
        assert_eq!(ids.get(&"k".into()), Some(b.as_str()));
        assert_eq!(ids.generate(Some("k".into()), &opts()).unwrap(), b);
    }

    #[test]
    fn test_custom_prefix_and_divider() {
        let mut ids = IdRegistry::new();
        let id = ids
            .generate(Some("test-key".into()), &opts().prefix("custom").divider("."))
            .unwrap();
        assert_eq!(id, "custom.test_key.0");
    }

    #[test]
    fn test_missing_key_is_always_new() {
        let mut ids = IdRegistry::new();
        let a = ids.generate(None, &opts()).unwrap();
        let b = ids.generate(None, &opts()).unwrap();
        assert_eq!(a, "id-generic-0");
        assert_eq!(b, "id-generic-1");
    }

    #[test]
    fn test_object_and_element_keys() {
        let mut ids = IdRegistry::new();
        let obj = ObjectKey::new();
        let el = ElementKey::new("BUTTON");
        assert_eq!(el.tag(), "BUTTON");

        let o1 = ids.generate(Some(obj.into()), &opts()).unwrap();
        let e1 = ids.generate(Some(el.clone().into()), &opts()).unwrap();
        assert!(o1.starts_with("id-object-"));
        assert!(e1.starts_with("id-button-"));

        assert_eq!(ids.generate(Some(obj.into()), &opts()).unwrap(), o1);
        assert_eq!(ids.generate(Some(el.into()), &opts()).unwrap(), e1);

        // a second element with the same tag is a different identity
        let other = ids.generate(Some(ElementKey::new("button").into()), &opts()).unwrap();
        assert_ne!(other, e1);
    }

    #[test]
    fn test_namespace_collisions_are_skipped() {
        let taken: HashSet<String> = ["id-x-0", "id-x-1"].into_iter().map(String::from).collect();
        let mut ids = IdRegistry::with_namespace(taken);
        assert_eq!(ids.generate(Some("x".into()), &opts()).unwrap(), "id-x-2");
    }

    #[test]
    fn test_exhaustion() {
        let mut ids = IdRegistry::with_namespace(|_: &str| true);
        let err = ids.generate(Some("x".into()), &opts()).unwrap_err();
        match err {
            HookError::GenerationExhausted { attempts, last } => {
                assert_eq!(attempts, MAX_ATTEMPTS);
                assert_eq!(last, format!("id-x-{MAX_ATTEMPTS}"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!ids.contains(&"x".into()));
    }

    #[test]
    fn test_reset_reissues_after_clear() {
        let mut ids = IdRegistry::new();
        let a = ids.generate(Some("k".into()), &opts()).unwrap();
        ids.reset();
        assert!(ids.is_empty());
        assert_eq!(ids.generate(Some("other".into()), &opts()).unwrap(), "id-other-0");
        assert_ne!(ids.generate(Some("k".into()), &opts()).unwrap(), a);
    }

    #[test]
    fn test_registry_never_reissues_a_held_id() {
        // "a b" and "a/b" share a readable tag
        let mut ids = IdRegistry::new();
        let first = ids.generate(Some("a b".into()), &opts()).unwrap();
        ids.counter = 0;
        let second = ids.generate(Some("a/b".into()), &opts()).unwrap();
        assert_eq!(first, "id-a_b-0");
        assert_eq!(second, "id-a_b-1");
    }

    #[test]
    fn test_release_and_has() {
        let mut ids = IdRegistry::new();
        ids.generate(Some("k".into()), &opts()).unwrap();
        assert!(ids.contains(&"k".into()));
        assert!(ids.release(&"k".into()));
        assert!(!ids.release(&"k".into()));
        assert!(!ids.contains(&"k".into()));
    }

    #[test]
    fn test_namespace_closure_sees_live_state() {
        let live = Arc::new(Mutex::new(HashSet::new()));
        let l = live.clone();
        let mut ids = IdRegistry::with_namespace(move |id: &str| l.lock().contains(id));

        live.lock().insert("id-n-0".to_string());
        assert_eq!(ids.generate(Some("n".into()), &opts()).unwrap(), "id-n-1");
    }

    // the only test touching the process-wide registry; reset_ids and the
    // namespace would otherwise race with other tests
    #[test]
    fn test_process_wide_registry() {
        let key: IdKey = ObjectKey::new().into();
        assert!(!has_id(&key));
        let id = generate_id(Some(key.clone()), &opts()).unwrap();
        assert!(has_id(&key));
        assert_eq!(generate_id(Some(key.clone()), &opts()).unwrap(), id);
        let fresh = generate_id(Some(key.clone()), &opts().force_new(true)).unwrap();
        assert_ne!(fresh, id);
        assert!(release_id(&key));
        assert!(!has_id(&key));

        generate_id(Some("scope".into()), &opts()).unwrap();
        reset_ids();
        assert!(!has_id(&"scope".into()));
        assert_eq!(generate_id(Some("first".into()), &opts()).unwrap(), "id-first-0");

        let taken: HashSet<String> = ["id-dom-1".to_string()].into_iter().collect();
        set_id_namespace(Some(Box::new(taken)));
        assert_eq!(generate_id(Some("dom".into()), &opts()).unwrap(), "id-dom-2");

        set_id_namespace(None);
        reset_ids();
        assert_eq!(generate_id(Some("dom".into()), &opts()).unwrap(), "id-dom-0");
        reset_ids();
    }
}
