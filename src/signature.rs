//! Signature hashing and name derivation.
//!
//! A signature is a fully-qualified class-plus-method identifier such as
//! `com.a.Foo.bar(I)V`, or a bare class name. The hash is the stable,
//! content-derived key every table uses to refer to a method.

use sha2::{Digest, Sha256};

/// Length of a signature hash in hex characters.
pub const SIGNATURE_HASH_LEN: usize = 32;

/// Deterministic fixed-length digest of a signature.
///
/// First 32 hex characters of SHA-256. Hash equality is treated as
/// signature identity downstream; distinct signatures that collide would
/// be silently merged. Known limitation, not mitigated here.
pub fn signature_hash(signature: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(signature.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..SIGNATURE_HASH_LEN].to_string()
}

/// Simple class name: the segment after the last `.`.
pub fn simple_class_name(full_class_name: &str) -> &str {
    match full_class_name.rfind('.') {
        Some(dot) => &full_class_name[dot + 1..],
        None => full_class_name,
    }
}

/// Splits a full method signature into (full class name, method name).
///
/// The class part is everything before the last `.` preceding the first
/// `(`. Dots inside the descriptor never shift the split point.
fn split_method(full_method: &str) -> (&str, &str) {
    let paren = full_method.find('(').unwrap_or(full_method.len());
    let head = &full_method[..paren];
    match head.rfind('.') {
        Some(dot) => (&full_method[..dot], &head[dot + 1..]),
        None => (head, ""),
    }
}

/// Full class name of a method signature's declaring class.
pub fn class_name_of_method(full_method: &str) -> &str {
    split_method(full_method).0
}

/// Bare method name of a full method signature.
pub fn method_name_of_method(full_method: &str) -> &str {
    split_method(full_method).1
}

const STREAM_CLASSES: &[&str] = &[
    "java.util.stream.Stream",
    "java.util.stream.IntStream",
    "java.util.stream.LongStream",
    "java.util.stream.DoubleStream",
];

const STREAM_INTERMEDIATE_METHODS: &[&str] = &[
    "map",
    "mapToObj",
    "mapToInt",
    "mapToLong",
    "mapToDouble",
    "filter",
    "flatMap",
    "distinct",
    "sorted",
    "peek",
    "limit",
    "skip",
    "boxed",
];

const STREAM_TERMINAL_METHODS: &[&str] = &[
    "forEach",
    "forEachOrdered",
    "toArray",
    "reduce",
    "collect",
    "toList",
    "sum",
    "min",
    "max",
    "count",
    "average",
    "anyMatch",
    "allMatch",
    "noneMatch",
    "findFirst",
    "findAny",
];

/// Whether a full class name is one of the well-known stream API types.
pub fn is_stream_class(full_class_name: &str) -> bool {
    STREAM_CLASSES.contains(&full_class_name)
}

/// Whether a method name is a stream intermediate operation.
pub fn is_stream_intermediate_method(method_name: &str) -> bool {
    STREAM_INTERMEDIATE_METHODS.contains(&method_name)
}

/// Whether a method name is a stream terminal operation.
pub fn is_stream_terminal_method(method_name: &str) -> bool {
    STREAM_TERMINAL_METHODS.contains(&method_name)
}
