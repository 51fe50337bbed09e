// src/flow/hooks.rs

//! Post-processing of a task's raw result before it is recorded.

use serde_json::Value;

/// A completion hook, applied in registration order.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionHook {
    /// Replace a `null` result with the given value.
    DefaultTo(Value),
    /// Fail the task when its (possibly defaulted) result is `null`.
    AssertExists,
}

/// Why a hook rejected a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookFailure {
    Missing,
}

/// Run `hooks` over `value` in order.
pub fn apply_hooks(hooks: &[CompletionHook], mut value: Value) -> Result<Value, HookFailure> {
    for hook in hooks {
        match hook {
            CompletionHook::DefaultTo(default) => {
                if value.is_null() {
                    value = default.clone();
                }
            }
            CompletionHook::AssertExists => {
                if value.is_null() {
                    return Err(HookFailure::Missing);
                }
            }
        }
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn default_applies_only_to_null() {
        let hooks = [CompletionHook::DefaultTo(json!([]))];
        assert_eq!(apply_hooks(&hooks, Value::Null), Ok(json!([])));
        assert_eq!(apply_hooks(&hooks, json!(0)), Ok(json!(0)));
        assert_eq!(apply_hooks(&hooks, json!(false)), Ok(json!(false)));
    }

    #[test]
    fn hooks_compose_in_registration_order() {
        let default_then_assert = [
            CompletionHook::DefaultTo(json!("fallback")),
            CompletionHook::AssertExists,
        ];
        assert_eq!(
            apply_hooks(&default_then_assert, Value::Null),
            Ok(json!("fallback"))
        );

        let assert_then_default = [
            CompletionHook::AssertExists,
            CompletionHook::DefaultTo(json!("fallback")),
        ];
        assert_eq!(
            apply_hooks(&assert_then_default, Value::Null),
            Err(HookFailure::Missing)
        );
    }
}
