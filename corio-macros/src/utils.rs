use proc_macro::{Delimiter, Group, TokenStream, TokenTree};

/// Splits a `TokenStream` into comma-separated arguments.
///
/// Each argument is returned as a `Vec<TokenTree>`. Only top-level commas
/// separate arguments; groups are kept whole.
pub(crate) fn split_args(input: TokenStream) -> Vec<Vec<TokenTree>> {
    let mut args = Vec::new();
    let mut current = Vec::new();

    for token in input {
        match &token {
            TokenTree::Punct(p) if p.as_char() == ',' => {
                if !current.is_empty() {
                    args.push(current);
                    current = Vec::new();
                }
            }
            _ => current.push(token),
        }
    }

    if !current.is_empty() {
        args.push(current);
    }

    args
}

/// Turns `key = value, ...` attribute arguments into a scheduler builder
/// expression.
///
/// Accepted keys: `worker_threads = <integer>` and
/// `strategy = "spawn" | "manual"`.
pub(crate) fn builder_expr(attr: TokenStream) -> Result<String, String> {
    let mut builder = String::from("::corio::SchedulerBuilder::new()");

    for arg in split_args(attr) {
        let [TokenTree::Ident(key), TokenTree::Punct(eq), TokenTree::Literal(value)] = &arg[..]
        else {
            return Err("expected `key = value`".to_owned());
        };

        if eq.as_char() != '=' {
            return Err(format!("expected `=` after `{key}`"));
        }

        let value = value.to_string();

        match key.to_string().as_str() {
            "worker_threads" => {
                let n = value
                    .parse::<usize>()
                    .map_err(|_| format!("`worker_threads` expects an integer, got {value}"))?;
                if n == 0 {
                    return Err("`worker_threads` must be > 0".to_owned());
                }
                builder.push_str(&format!(".worker_threads({n})"));
            }
            "strategy" => {
                let strategy = match value.trim_matches('"') {
                    "spawn" => "Spawn",
                    "manual" => "Manual",
                    other => return Err(format!("unknown strategy `{other}`")),
                };
                builder.push_str(&format!(
                    ".thread_strategy(::corio::ThreadStrategy::{strategy})"
                ));
            }
            other => return Err(format!("unknown attribute `{other}`")),
        }
    }

    builder.push_str(".build().expect(\"failed to build corio scheduler\")");

    Ok(builder)
}

/// Rewrites `async fn` into a plain `fn` whose body runs on a fresh
/// scheduler through `block_on`.
pub(crate) fn wrap_in_scheduler(attr: TokenStream, item: TokenStream) -> TokenStream {
    let builder = match builder_expr(attr) {
        Ok(builder) => builder,
        Err(message) => return compile_error(&message),
    };

    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    let Some(async_pos) = tokens
        .iter()
        .position(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == "async"))
    else {
        return compile_error("the `async` keyword is missing from the function declaration");
    };
    tokens.remove(async_pos);

    let Some(pos) = tokens
        .iter()
        .rposition(|t| matches!(t, TokenTree::Group(g) if g.delimiter() == Delimiter::Brace))
    else {
        return compile_error("expected a function body");
    };

    let TokenTree::Group(body) = &tokens[pos] else {
        return compile_error("expected a function body");
    };

    let new_body = format!(
        "{{
            let scheduler = {builder};
            scheduler.block_on(async move {{ {} }})
        }}",
        body.stream()
    );

    let stream = match new_body.parse::<TokenStream>() {
        Ok(stream) => stream,
        Err(err) => return compile_error(&err.to_string()),
    };

    tokens[pos] = TokenTree::Group(Group::new(Delimiter::Brace, stream));
    tokens.into_iter().collect()
}

pub(crate) fn compile_error(message: &str) -> TokenStream {
    format!("::core::compile_error!({message:?});")
        .parse()
        .unwrap_or_default()
}
