//! Record classification for the extractor's line-oriented output.
//!
//! Every record starts with a fixed two-byte tag. Blank lines are skipped
//! by the reader; lines with an unrecognized tag are ignored so newer
//! extractor versions can add record kinds without breaking older loaders.
//! Structural validation happens in the per-kind decoders, which fail the
//! whole pass on a malformed record.

/// Class reference: `C#<callerFullClass> <calleeFullClass>`
pub const TAG_CLASS_REFERENCE: &str = "C#";
/// Jar mapping: `J#<jarNumber> <absolutePath>`
pub const TAG_JAR_INFO: &str = "J#";
/// Method call: `M#<callId> <callerSig> (<TYPE>)<calleeSig> <line> <jar>`
pub const TAG_METHOD_CALL: &str = "M#";
/// Method annotation (sibling file): `A#<fullMethodSig> <annotationText>`
pub const TAG_METHOD_ANNOTATION: &str = "A#";
/// Lambda call: `L#<callId> <lambdaCalleeSig>[ <lambdaNextSig>]`
pub const TAG_LAMBDA_INFO: &str = "L#";

/// Tag prefix length in bytes.
pub const TAG_LEN: usize = 2;

/// The kind of an input record, derived from its tag prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    ClassReference,
    JarInfo,
    MethodCall,
    MethodAnnotation,
    LambdaInfo,
}

impl RecordKind {
    /// Classify a line by its tag prefix. `None` means unrecognized.
    pub fn classify(line: &str) -> Option<RecordKind> {
        // get() rather than a slice: a line starting with a multibyte
        // character must classify as unknown, not panic.
        match line.get(..TAG_LEN)? {
            TAG_CLASS_REFERENCE => Some(RecordKind::ClassReference),
            TAG_JAR_INFO => Some(RecordKind::JarInfo),
            TAG_METHOD_CALL => Some(RecordKind::MethodCall),
            TAG_METHOD_ANNOTATION => Some(RecordKind::MethodAnnotation),
            TAG_LAMBDA_INFO => Some(RecordKind::LambdaInfo),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::ClassReference => "class_reference",
            RecordKind::JarInfo => "jar_info",
            RecordKind::MethodCall => "method_call",
            RecordKind::MethodAnnotation => "method_annotation",
            RecordKind::LambdaInfo => "lambda_info",
        }
    }
}

/// Strip the two-byte tag from a classified line.
pub fn strip_tag(line: &str) -> &str {
    &line[TAG_LEN..]
}
