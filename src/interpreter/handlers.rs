//! Built-in handler library
//!
//! Capability blocks register under a handler name; when that name matches an
//! entry here, dispatch runs the library implementation, otherwise the request
//! is echoed back. Library handlers never fail on bad input: they answer with
//! `{"ok": false, "error": ...}` instead.
//!
//! | Handler | Effect |
//! |---|---|
//! | `kernel_boot` | boot sequence: boot log, boot counter, tape registration |
//! | `tape_boot` | mark a registered tape active |
//! | `basher_run` | command dispatcher (`tapes.*`, `ram.*`, `health`) |
//! | `ram_get` / `ram_set` / `ram_list` | associative memory |
//! | `cms_rlhf_list` / `_get` / `_post` | append-only trace records |
//! | `gram_observe` / `gram_analyze_patterns` / `gram_suggest_next` | n-gram statistics |

use super::constants::*;
use super::context::RequestContext;
use super::errors::RuntimeError;
use crate::memory::state::RuntimeState;
use crate::memory::value::{dict, Value};

/// Names served by the library instead of the echo fallback.
pub const LIBRARY_HANDLERS: &[&str] = &[
    "kernel_boot",
    "tape_boot",
    "basher_run",
    "ram_get",
    "ram_set",
    "ram_list",
    "cms_rlhf_list",
    "cms_rlhf_get",
    "cms_rlhf_post",
    "gram_observe",
    "gram_analyze_patterns",
    "gram_suggest_next",
];

/// Run the library handler `name`, or echo the request when there is none.
pub fn execute(name: &str, ctx: &RequestContext<'_>) -> Result<Value, RuntimeError> {
    let result = match name {
        "kernel_boot" => kernel_boot(ctx.state),
        "tape_boot" => match ctx.arg_text("tape_id") {
            Some(tape_id) => tape_boot(ctx.state, &tape_id),
            None => failure("No tape_id provided"),
        },
        "basher_run" => basher_run(ctx),
        "ram_get" => match ctx.arg_text("key") {
            Some(key) => ram_get(ctx.state, &key),
            None => failure("No key provided"),
        },
        "ram_set" => match ctx.arg_text("key") {
            Some(key) => {
                let value = ctx.arg("value").cloned().unwrap_or_default();
                ram_set(ctx.state, &key, value)
            }
            None => failure("No key provided"),
        },
        "ram_list" => ram_list(ctx.state),
        "cms_rlhf_list" => trace_list(ctx.state),
        "cms_rlhf_get" => trace_get(ctx),
        "cms_rlhf_post" => trace_post(ctx),
        "gram_observe" => gram_observe(ctx),
        "gram_analyze_patterns" => gram_analyze(ctx.state),
        "gram_suggest_next" => gram_suggest(ctx),
        _ => echo(ctx),
    };
    Ok(result)
}

fn ok(pairs: Vec<(&str, Value)>) -> Value {
    let mut map = dict(pairs);
    map.insert("ok".to_string(), Value::Bool(true));
    Value::Dict(map)
}

fn failure(message: impl Into<String>) -> Value {
    Value::Dict(dict([("ok", Value::Bool(false)), ("error", Value::Text(message.into()))]))
}

fn text_list<'a>(items: impl IntoIterator<Item = &'a String>) -> Value {
    Value::List(items.into_iter().map(|s| Value::from(s.as_str())).collect())
}

fn echo(ctx: &RequestContext<'_>) -> Value {
    ok(vec![
        ("handler", Value::from(ctx.handler.as_str())),
        ("params", Value::Dict(ctx.params.clone())),
    ])
}

/// Boot sequence. All state changes happen in one critical section.
fn kernel_boot(state: &RuntimeState) -> Value {
    let (boot_count, boot_steps, manifest) = state.write(|data| {
        data.boot_steps.push(BOOT_START.to_string());

        let mut boot_count = data
            .memory
            .get("os.boot.count")
            .map(Value::to_number)
            .unwrap_or(0.0);
        // Boot bookkeeping only happens once a manifest has been loaded.
        if !data.manifest.is_empty() {
            boot_count += 1.0;
            data.memory.insert("os.boot.count".to_string(), Value::Number(boot_count));
            data.memory.insert("os.state".to_string(), Value::from("booting"));
            data.memory.insert("os.kernel".to_string(), Value::from(KERNEL_ID));
            data.boot_steps.push(BOOT_MANIFEST_LOADED.to_string());
        }

        if let Some(Value::Dict(tapes)) = data.manifest.get("tapes") {
            let tapes = tapes.clone();
            data.stores.tapes.extend(tapes);
            data.boot_steps.push(BOOT_TAPES_REGISTERED.to_string());
        }

        data.booted = true;
        data.memory.insert("os.state".to_string(), Value::from("active"));
        data.boot_steps.push(BOOT_COMPLETE.to_string());

        let manifest = data
            .manifest
            .get("n")
            .or_else(|| data.manifest.get("name"))
            .map(Value::to_text)
            .unwrap_or_default();
        (boot_count, data.boot_steps.clone(), manifest)
    });

    tracing::info!(boot_count, manifest = %manifest, "kernel booted");

    ok(vec![
        ("status", Value::from("booted")),
        ("boot_count", Value::Number(boot_count)),
        ("boot_steps", text_list(&boot_steps)),
        ("manifest", Value::from(manifest)),
    ])
}

fn tape_boot(state: &RuntimeState, tape_id: &str) -> Value {
    let tape = state.write(|data| {
        let tape = data.stores.tapes.get(tape_id).cloned()?;
        data.memory.insert("os.active_tape".to_string(), Value::from(tape_id));
        data.memory.insert("tapes.active_id".to_string(), Value::from(tape_id));
        Some(tape)
    });

    match tape {
        Some(tape) => ok(vec![
            ("message", Value::Text(format!("Tape {} booted", tape_id))),
            ("tape_id", Value::from(tape_id)),
            ("tape", tape),
        ]),
        None => {
            let mut result = failure("Tape not found");
            if let Value::Dict(map) = &mut result {
                map.insert("tape_id".to_string(), Value::from(tape_id));
            }
            result
        }
    }
}

/// `basher_run`: whitespace-separated command from body or params.
fn basher_run(ctx: &RequestContext<'_>) -> Value {
    let Some(command) = ctx.arg_text("command") else {
        return failure("No command provided");
    };
    let mut parts = command.split_whitespace();
    let Some(cmd) = parts.next() else {
        return failure("No command provided");
    };
    let args: Vec<&str> = parts.collect();

    match (cmd, args.as_slice()) {
        ("tapes.list", _) => {
            let tapes = ctx.state.read(|data| {
                data.stores
                    .tapes
                    .iter()
                    .map(|(id, tape)| {
                        let mut entry = dict([("id", id.as_str())]);
                        for key in ["label", "role"] {
                            if let Some(value) = tape.get(key) {
                                entry.insert(key.to_string(), value.clone());
                            }
                        }
                        Value::Dict(entry)
                    })
                    .collect::<Vec<_>>()
            });
            ok(vec![("tapes", Value::List(tapes))])
        }
        ("tapes.boot", [tape_id, ..]) => tape_boot(ctx.state, tape_id),
        ("tapes.boot", []) => failure("No tape_id provided"),
        ("ram.get", [key, ..]) => ram_get(ctx.state, key),
        ("ram.get", []) => failure("No key provided"),
        ("ram.set", [key, rest @ ..]) if !rest.is_empty() => {
            ram_set(ctx.state, key, Value::Text(rest.join(" ")))
        }
        ("ram.set", _) => failure("Key and value required"),
        ("ram.list", _) => ram_list(ctx.state),
        ("health", _) => {
            let (booted, ram_keys, tapes) = ctx.state.read(|data| {
                (data.booted, data.memory.len(), data.stores.tapes.len())
            });
            ok(vec![
                ("kernel", Value::from(KERNEL_ID)),
                ("booted", Value::Bool(booted)),
                ("ram_keys", Value::from(ram_keys)),
                ("tapes", Value::from(tapes)),
            ])
        }
        (other, _) => failure(format!("Unknown command: {}", other)),
    }
}

fn ram_get(state: &RuntimeState, key: &str) -> Value {
    ok(vec![
        ("key", Value::from(key)),
        ("value", state.memory_get(key).unwrap_or_default()),
    ])
}

fn ram_set(state: &RuntimeState, key: &str, value: Value) -> Value {
    state.memory_set(key, value);
    ok(vec![("key", Value::from(key))])
}

fn ram_list(state: &RuntimeState) -> Value {
    let keys = state.memory_keys();
    ok(vec![("count", Value::from(keys.len())), ("keys", text_list(&keys))])
}

fn trace_list(state: &RuntimeState) -> Value {
    let items = state.read(|data| data.stores.traces.clone());
    ok(vec![
        ("mode", Value::from("list")),
        ("total", Value::from(items.len())),
        ("items", Value::List(items)),
    ])
}

fn trace_get(ctx: &RequestContext<'_>) -> Value {
    let case_id = ctx
        .params
        .get("id")
        .or_else(|| ctx.query.get("id"))
        .or_else(|| ctx.body.get("id"))
        .map(Value::to_text)
        .unwrap_or_default();

    let item = ctx.state.read(|data| {
        data.stores
            .traces
            .iter()
            .find(|trace| trace.get("case_id").and_then(Value::as_str) == Some(case_id.as_str()))
            .cloned()
    });

    match item {
        Some(item) => ok(vec![("mode", Value::from("get")), ("item", item)]),
        None => {
            let mut result = failure("Case not found");
            if let Value::Dict(map) = &mut result {
                map.insert("case_id".to_string(), Value::Text(case_id));
            }
            result
        }
    }
}

/// Append a trace record built from the body's `title`, `label` and `body`.
fn trace_post(ctx: &RequestContext<'_>) -> Value {
    let field = |key: &str| ctx.body.get(key).cloned().unwrap_or_default();
    let (title, label, body) = (field("title"), field("label"), field("body"));

    let case_id = ctx.state.write(|data| {
        let case_id = format!("{}{}", TRACE_ID_PREFIX, data.stores.traces.len() + 1);
        data.stores.traces.push(Value::Dict(dict([
            ("case_id", Value::from(case_id.as_str())),
            ("title", title),
            ("label", label),
            ("body", body),
        ])));
        case_id
    });

    ok(vec![
        ("mode", Value::from("post")),
        ("case_id", Value::Text(case_id)),
        ("message", Value::from("RLHF case created")),
    ])
}

fn ngram_key(items: &[Value]) -> String {
    items
        .iter()
        .map(Value::to_text)
        .collect::<Vec<_>>()
        .join(NGRAM_SEPARATOR)
}

/// Count every window of `window_size` consecutive items of `body.sequence`.
fn gram_observe(ctx: &RequestContext<'_>) -> Value {
    let Some(sequence) = ctx.body.get("sequence").and_then(Value::as_list) else {
        return failure("No sequence provided");
    };
    let window = ctx
        .body
        .get("window_size")
        .and_then(Value::as_f64)
        .filter(|size| *size >= 1.0)
        .map(|size| size as usize)
        .unwrap_or(DEFAULT_NGRAM_WINDOW);

    let grams: Vec<String> = if sequence.len() >= window {
        sequence.windows(window).map(ngram_key).collect()
    } else {
        Vec::new()
    };

    let distinct = ctx.state.write(|data| {
        for gram in grams {
            *data.stores.ngrams.entry(gram).or_insert(0) += 1;
        }
        data.stores.ngrams.len()
    });

    ok(vec![
        ("observed", Value::from(sequence.len())),
        ("n_grams_count", Value::from(distinct)),
    ])
}

/// Patterns ordered by count (descending), frequency relative to all observations.
fn gram_analyze(state: &RuntimeState) -> Value {
    let mut patterns: Vec<(String, u64)> = state.read(|data| {
        data.stores
            .ngrams
            .iter()
            .map(|(gram, count)| (gram.clone(), *count))
            .collect()
    });
    patterns.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let observations: u64 = patterns.iter().map(|(_, count)| count).sum();
    let total = patterns.len();
    let top = patterns
        .into_iter()
        .map(|(gram, count)| {
            Value::Dict(dict([
                ("gram", Value::Text(gram)),
                ("count", Value::Number(count as f64)),
                ("frequency", Value::Number(count as f64 / observations as f64)),
            ]))
        })
        .collect();

    ok(vec![
        ("mode", Value::from("analyze")),
        ("top_patterns", Value::List(top)),
        ("total_patterns", Value::from(total)),
    ])
}

/// Next-item candidates for `body.prefix`, most frequent first.
fn gram_suggest(ctx: &RequestContext<'_>) -> Value {
    let Some(prefix) = ctx.body.get("prefix").and_then(Value::as_list) else {
        return failure("No prefix provided");
    };
    let prefix_parts: Vec<String> = prefix.iter().map(Value::to_text).collect();

    let mut candidates: Vec<(String, u64)> = ctx.state.read(|data| {
        data.stores
            .ngrams
            .iter()
            .filter_map(|(gram, count)| {
                let parts: Vec<&str> = gram.split(NGRAM_SEPARATOR).collect();
                let matches = parts.len() > prefix_parts.len()
                    && parts.iter().zip(&prefix_parts).all(|(a, b)| *a == b.as_str());
                matches.then(|| (parts[prefix_parts.len()].to_string(), *count))
            })
            .collect()
    });
    candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let matched: u64 = candidates.iter().map(|(_, count)| count).sum();
    let suggestions = candidates
        .into_iter()
        .map(|(next, count)| {
            Value::Dict(dict([
                ("next", Value::Text(next)),
                ("count", Value::Number(count as f64)),
                ("confidence", Value::Number(count as f64 / matched as f64)),
            ]))
        })
        .collect();

    ok(vec![
        ("mode", Value::from("suggest")),
        ("prefix", Value::List(prefix.clone())),
        ("suggestions", Value::List(suggestions)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::engine::Interpreter;
    use crate::memory::value::{dict as body, Dict};

    fn interpreter_with(handlers: &[&str]) -> Interpreter {
        let source: String = handlers
            .iter()
            .map(|name| format!("C@@L BLOCK {name}\n"))
            .collect();
        let mut interp = Interpreter::new();
        interp.load(&source).expect("load");
        interp
    }

    #[test]
    fn test_kernel_boot_without_manifest() {
        let interp = interpreter_with(&["kernel_boot"]);
        let result = interp.dispatch("kernel_boot", Dict::new()).unwrap();

        assert_eq!(result.get("ok"), Some(&Value::Bool(true)));
        assert_eq!(
            interp.state().boot_steps(),
            vec![BOOT_START, BOOT_COMPLETE]
        );
        assert!(interp.state().is_booted());
        assert_eq!(interp.state().memory_get("os.state"), Some(Value::from("active")));
        assert_eq!(interp.state().memory_get("os.boot.count"), None);
        assert_eq!(interp.state().memory_get("os.kernel"), None);
        assert_eq!(result.get("boot_count"), Some(&Value::Number(0.0)));
    }

    #[test]
    fn test_basher_commands() {
        let interp = interpreter_with(&["basher_run"]);
        let run = |command: &str| {
            interp
                .dispatch("basher_run", body([("command", command)]))
                .unwrap()
        };

        assert_eq!(run("ram.set greeting hello world").get("ok"), Some(&Value::Bool(true)));
        assert_eq!(
            run("ram.get greeting").get("value"),
            Some(&Value::from("hello world"))
        );
        assert_eq!(run("ram.list").get("count"), Some(&Value::Number(1.0)));
        assert_eq!(run("ram.set lonely").get("ok"), Some(&Value::Bool(false)));
        assert_eq!(run("health").get("booted"), Some(&Value::Bool(false)));
        assert_eq!(
            run("reboot").get("error"),
            Some(&Value::from("Unknown command: reboot"))
        );
        assert_eq!(run("tapes.boot t9").get("error"), Some(&Value::from("Tape not found")));
    }

    #[test]
    fn test_trace_records() {
        let interp = interpreter_with(&["cms_rlhf_post", "cms_rlhf_get", "cms_rlhf_list"]);
        let posted = interp
            .dispatch("cms_rlhf_post", body([("title", "first"), ("label", "good")]))
            .unwrap();
        assert_eq!(posted.get("case_id"), Some(&Value::from("rlhf_1")));
        interp
            .dispatch("cms_rlhf_post", body([("title", "second")]))
            .unwrap();

        let fetched = interp
            .dispatch("cms_rlhf_get", body([("id", "rlhf_2")]))
            .unwrap();
        assert_eq!(
            fetched.get("item").and_then(|item| item.get("title")),
            Some(&Value::from("second"))
        );

        let listed = interp.dispatch("cms_rlhf_list", Dict::new()).unwrap();
        assert_eq!(listed.get("total"), Some(&Value::Number(2.0)));

        let missing = interp
            .dispatch("cms_rlhf_get", body([("id", "rlhf_9")]))
            .unwrap();
        assert_eq!(missing.get("ok"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_ngram_pipeline() {
        let interp = interpreter_with(&["gram_observe", "gram_analyze_patterns", "gram_suggest_next"]);
        let sequence = Value::List(["a", "b", "c", "a", "b", "d"].map(Value::from).to_vec());
        let observed = interp
            .dispatch(
                "gram_observe",
                body([("sequence", sequence), ("window_size", Value::Number(2.0))]),
            )
            .unwrap();
        assert_eq!(observed.get("n_grams_count"), Some(&Value::Number(4.0)));

        let analysis = interp.dispatch("gram_analyze_patterns", Dict::new()).unwrap();
        let top = analysis.get("top_patterns").and_then(Value::as_list).unwrap();
        assert_eq!(top[0].get("gram"), Some(&Value::from("a|b")));
        assert_eq!(top[0].get("frequency"), Some(&Value::Number(0.4)));

        let suggestion = interp
            .dispatch(
                "gram_suggest_next",
                body([("prefix", Value::List(vec![Value::from("b")]))]),
            )
            .unwrap();
        let suggestions = suggestion.get("suggestions").and_then(Value::as_list).unwrap();
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].get("confidence"), Some(&Value::Number(0.5)));
    }

    #[test]
    fn test_echo_fallback() {
        let mut interp = Interpreter::new();
        interp.load("C@@L BLOCK custom\n@level: 2").unwrap();
        let result = interp.dispatch("custom", Dict::new()).unwrap();

        assert_eq!(result.get("handler"), Some(&Value::from("custom")));
        assert_eq!(
            result.get("params").and_then(|p| p.get("level")),
            Some(&Value::Number(2.0))
        );
    }
}
