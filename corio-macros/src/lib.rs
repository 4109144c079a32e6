//! Attribute macros for `corio`.
//!
//! Both macros turn an `async fn` into a plain `fn` that builds a
//! scheduler and drives the body to completion with `block_on`. They
//! accept the same arguments:
//!
//! - `worker_threads = N`
//! - `strategy = "spawn"` (default) or `strategy = "manual"`

mod utils;

use proc_macro::TokenStream;

/// Runs an `async fn main` on a corio scheduler.
///
/// ```rust,ignore
/// #[corio::main(worker_threads = 2)]
/// async fn main() {
///     corio::time::sleep(std::time::Duration::from_millis(10)).await;
/// }
/// ```
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    utils::wrap_in_scheduler(attr, item)
}

/// Runs an `async fn` test on its own corio scheduler.
///
/// ```rust,ignore
/// #[corio::test(strategy = "manual")]
/// async fn sleeps() {
///     corio::time::sleep(std::time::Duration::from_millis(10)).await;
/// }
/// ```
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let wrapped = utils::wrap_in_scheduler(attr, item);

    let mut result: TokenStream = "#[::core::prelude::v1::test]"
        .parse()
        .unwrap_or_default();
    result.extend(wrapped);
    result
}
