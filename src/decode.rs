//! Decoders for the two call-record kinds.
//!
//! Both are pure line-to-record functions; buffering and dispatch stay
//! with the orchestrator. Structural problems (wrong field count,
//! non-numeric required field) are fatal for the whole pass; records
//! excluded by policy are dropped silently and debug-logged.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{LoadError, Result};
use crate::record::{strip_tag, TAG_LEN};
use crate::signature::{
    class_name_of_method, is_stream_class, is_stream_intermediate_method,
    is_stream_terminal_method, method_name_of_method, signature_hash, simple_class_name,
};
use crate::types::{LambdaMethodInfoRecord, LambdaNextInfo, MethodCallRecord, ENABLED};
use crate::PrefixFilter;

/// Outcome of decoding one method-call line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Record(Box<MethodCallRecord>),
    /// Caller or callee outside the allowed prefixes. Not an error.
    Filtered,
    /// Caller hash equals callee hash. Deliberately omitted so graph
    /// traversal cannot loop on self-calls.
    Recursive,
}

/// Decode a `M#` line:
/// `M#<callId> <callerSig> (<TYPE>)<calleeSig> <line> <jarNum>`
pub fn decode_method_call(
    line: &str,
    filter: &PrefixFilter,
    collisions: &HashSet<String>,
) -> Result<Decoded> {
    let fields: Vec<&str> = line.split(' ').collect();
    if fields.len() != 5 {
        return Err(LoadError::malformed(
            line,
            format!("expected 5 fields, got {}", fields.len()),
        ));
    }

    let call_id: i64 = fields[0][TAG_LEN..]
        .parse()
        .map_err(|_| LoadError::malformed(line, "non-numeric call id"))?;
    let caller_full_method = fields[1];
    let (call_type, callee_full_method) = split_callee(line, fields[2])?;
    let caller_line_num: u32 = fields[3]
        .parse()
        .map_err(|_| LoadError::malformed(line, "non-numeric caller line number"))?;
    let caller_jar_num: u32 = fields[4]
        .parse()
        .map_err(|_| LoadError::malformed(line, "non-numeric jar number"))?;

    if !filter.allows(caller_full_method) || !filter.allows(callee_full_method) {
        debug!("method call outside allowed prefixes, dropped: {}", line);
        return Ok(Decoded::Filtered);
    }

    let caller_method_hash = signature_hash(caller_full_method);
    let callee_method_hash = signature_hash(callee_full_method);
    if caller_method_hash == callee_method_hash {
        // Recursive calls are never stored; downstream traversal would
        // otherwise loop forever.
        debug!("recursive call not stored: {}", caller_full_method);
        return Ok(Decoded::Recursive);
    }

    let caller_full_class_name = class_name_of_method(caller_full_method);
    let callee_full_class_name = class_name_of_method(callee_full_method);

    Ok(Decoded::Record(Box::new(MethodCallRecord {
        call_id,
        call_type: call_type.to_string(),
        enabled: ENABLED,
        caller_jar_num,
        caller_method_hash,
        caller_full_method: caller_full_method.to_string(),
        caller_method_name: method_name_of_method(caller_full_method).to_string(),
        caller_full_class_name: caller_full_class_name.to_string(),
        caller_class_name: display_class_name(caller_full_class_name, collisions),
        caller_line_num,
        callee_method_hash,
        callee_full_method: callee_full_method.to_string(),
        callee_method_name: method_name_of_method(callee_full_method).to_string(),
        callee_full_class_name: callee_full_class_name.to_string(),
        callee_class_name: display_class_name(callee_full_class_name, collisions),
    })))
}

/// Split the bracketed callee field `(<TYPE>)<calleeSig>` into its
/// call-type tag and the real callee signature.
fn split_callee<'a>(line: &str, field: &'a str) -> Result<(&'a str, &'a str)> {
    let open = field
        .find('(')
        .ok_or_else(|| LoadError::malformed(line, "callee field missing '('"))?;
    let close = field
        .find(')')
        .ok_or_else(|| LoadError::malformed(line, "callee field missing ')'"))?;
    if close < open {
        return Err(LoadError::malformed(line, "callee field brackets reversed"));
    }
    Ok((&field[open + 1..close], field[close + 1..].trim()))
}

/// Display class name: simple name unless ambiguous across packages.
///
/// Correct only once the collision set is fully computed; the orchestrator
/// guarantees that ordering.
pub fn display_class_name(full_class_name: &str, collisions: &HashSet<String>) -> String {
    let simple = simple_class_name(full_class_name);
    if collisions.contains(simple) {
        full_class_name.to_string()
    } else {
        simple.to_string()
    }
}

/// Decode a `L#` line: `L#<callId> <lambdaCalleeSig>[ <lambdaNextSig>]`
///
/// The record has 2 or 3 fields after the tag. With 2 fields the whole
/// `next` block is absent and every next column stores NULL.
pub fn decode_lambda_info(line: &str) -> Result<LambdaMethodInfoRecord> {
    let body = strip_tag(line);
    let fields: Vec<&str> = body.split(' ').collect();
    if fields.len() < 2 || fields.len() > 3 {
        return Err(LoadError::malformed(
            line,
            format!("expected 2 or 3 fields, got {}", fields.len()),
        ));
    }

    let call_id: i64 = fields[0]
        .parse()
        .map_err(|_| LoadError::malformed(line, "non-numeric call id"))?;
    let callee_full_method = fields[1];

    let next = fields.get(2).map(|next_full_method| {
        let class_name = class_name_of_method(next_full_method);
        let method_name = method_name_of_method(next_full_method);
        LambdaNextInfo {
            class_name: class_name.to_string(),
            method_name: method_name.to_string(),
            full_method: next_full_method.to_string(),
            is_stream: is_stream_class(class_name),
            is_intermediate: is_stream_intermediate_method(method_name),
            is_terminal: is_stream_terminal_method(method_name),
        }
    });

    Ok(LambdaMethodInfoRecord {
        call_id,
        callee_class_name: class_name_of_method(callee_full_method).to_string(),
        callee_method_name: method_name_of_method(callee_full_method).to_string(),
        callee_full_method: callee_full_method.to_string(),
        next,
    })
}
