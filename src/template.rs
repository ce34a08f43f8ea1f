//! Renders a worker's config file from a template before it is spawned.
//!
//! `src` is read, rendered with the helper functions `replace`, `lower`,
//! `upper` (native Tera filters), `env`, `k8s`, and `sha1` (registered
//! here), executed against the command's `data` map, and written to `dst`.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use sha1::{Digest, Sha1};
use tera::{Context, Tera};

use crate::config::Template;
use crate::error::Error;

const SECRETS_DIR: &str = "/etc/secrets";

/// Renders `template` if it is [`Template::enabled`]; idempotent, so it is
/// safe to call twice for the same worker, since templates may reference env set by pre_start.
pub fn process(cmd_label: &str, template: &Template) -> Result<(), Error> {
    if template.src.is_empty() && template.dst.is_empty() {
        return Ok(());
    }
    if !template.enabled() {
        let reason = if template.src.is_empty() {
            "src is empty but dst is set"
        } else {
            "dst is empty"
        };
        return Err(template_error(template, reason));
    }

    let contents = std::fs::read_to_string(&template.src)
        .map_err(|e| template_error(template, &format!("reading {}: {e}", template.src)))?;

    let rendered = render(&contents, &template.data)
        .map_err(|e| template_error(template, &format!("rendering {}: {e}", template.src)))?;

    log::info!(cmd = cmd_label, src = template.src.as_str(), dst = template.dst.as_str(); "rendering template");

    std::fs::write(&template.dst, rendered)
        .map_err(|e| template_error(template, &format!("writing {}: {e}", template.dst)))?;

    Ok(())
}

fn template_error(template: &Template, reason: &str) -> Error {
    Error::Template {
        src: template.src.clone(),
        dst: template.dst.clone(),
        reason: reason.to_string(),
    }
}

fn render(contents: &str, data: &HashMap<String, String>) -> tera::Result<String> {
    let mut tera = Tera::default();
    tera.add_raw_template("worker.tmpl", contents)?;
    tera.register_function("env", env_fn);
    tera.register_function("k8s", k8s_fn);
    tera.register_function("sha1", sha1_fn);

    let mut ctx = Context::new();
    for (k, v) in data {
        ctx.insert(k, v);
    }
    tera.render("worker.tmpl", &ctx)
}

fn string_arg(args: &HashMap<String, Value>, name: &str) -> tera::Result<String> {
    args.get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| tera::Error::msg(format!("missing string argument `{name}`")))
}

fn env_fn(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let key = string_arg(args, "name")?;
    Ok(Value::String(std::env::var(&key).unwrap_or_default()))
}

fn k8s_fn(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let name = string_arg(args, "name")?;
    let path = Path::new(SECRETS_DIR).join(&name);
    let data = std::fs::read_to_string(&path)
        .map_err(|e| tera::Error::msg(format!("unable to read secret {}: {e}", path.display())))?;
    Ok(Value::String(data))
}

fn sha1_fn(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let value = string_arg(args, "value")?;
    let mut hasher = Sha1::new();
    hasher.update(value.as_bytes());
    Ok(Value::String(format!("{:x}", hasher.finalize())))
}
