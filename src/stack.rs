//! Stack growth for the recursive passes.
//!
//! Parsing and evaluation recurse once per nesting level and once per call, so
//! deep programs can outrun the thread's native stack. Recursive entry points
//! wrap themselves in [`ensure_sufficient_stack`], which switches to a freshly
//! allocated segment when the remaining space drops below the red zone.

/// Grow when less than this much stack remains (128KB).
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated segment (1MB).
const STACK_PER_SEGMENT: usize = 1024 * 1024;

#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_SEGMENT, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deep_recurse(n: u32) -> u32 {
        ensure_sufficient_stack(|| if n == 0 { 0 } else { deep_recurse(n - 1) + 1 })
    }

    #[test]
    fn deep_recursion_does_not_overflow() {
        assert_eq!(deep_recurse(100_000), 100_000);
    }

    #[test]
    fn passes_results_through() {
        let result: Result<u32, &str> = ensure_sufficient_stack(|| Ok(7));
        assert_eq!(result, Ok(7));
    }
}
