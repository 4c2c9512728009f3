//! Assertion helpers with diagnostic output.
//!
//! Every failure message carries the caller's context string plus expected
//! vs actual, so a scenario failure reads like a sentence.

use tenon_engine::UpdatePass;
use tenon_naming::ShapeRegistry;
use tenon_types::ShapeKind;
use uuid::Uuid;

use crate::HarnessError;

/// Assert the end-of-update invariant: no nil ids, no id on two records.
pub fn assert_normalized(registry: &ShapeRegistry, ctx: &str) -> Result<(), HarnessError> {
    let nils = registry.nil_shapes().len();
    if nils > 0 {
        return Err(HarnessError::AssertionFailed {
            detail: format!("[{ctx}] expected no nil ids, got {nils} nil records"),
        });
    }
    if !registry.is_normalized() {
        return Err(HarnessError::AssertionFailed {
            detail: format!("[{ctx}] expected unique ids, got a duplicate assignment"),
        });
    }
    Ok(())
}

/// Assert an update pass finished without any feature failing.
pub fn assert_pass_clean(pass: &UpdatePass, ctx: &str) -> Result<(), HarnessError> {
    if pass.failed.is_empty() {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!(
                "[{ctx}] expected no failed features, got {} ({:?})",
                pass.failed.len(),
                pass.failed
            ),
        })
    }
}

/// Assert an id is present and maps to a record of the expected kind.
pub fn assert_id_kind(
    registry: &ShapeRegistry,
    id: Uuid,
    expected: ShapeKind,
    ctx: &str,
) -> Result<(), HarnessError> {
    if !registry.has_id(id) {
        return Err(HarnessError::AssertionFailed {
            detail: format!("[{ctx}] expected id {id} to be present, got no record"),
        });
    }
    let actual = registry.record_by_id(id).shape.kind();
    if actual != expected {
        return Err(HarnessError::AssertionFailed {
            detail: format!("[{ctx}] expected {id} to be a {expected:?}, got {actual:?}"),
        });
    }
    Ok(())
}

/// Assert a resolution produced exactly one non-nil id and return it.
pub fn assert_single_resolution(ids: &[Uuid], ctx: &str) -> Result<Uuid, HarnessError> {
    match ids {
        [id] if !id.is_nil() => Ok(*id),
        [id] => Err(HarnessError::AssertionFailed {
            detail: format!("[{ctx}] expected a non-nil id, got {id}"),
        }),
        other => Err(HarnessError::AssertionFailed {
            detail: format!("[{ctx}] expected exactly 1 resolved id, got {}", other.len()),
        }),
    }
}
