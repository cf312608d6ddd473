//! Per-evaluation script environment.
//!
//! A [`ScriptContext`] is one fresh rhai engine plus scope, seeded with the
//! capability bindings and its own copy of the `event` map. One is built for
//! each guard evaluation and another for each action, then dropped. Nothing is
//! registered globally, so contexts never observe one another.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use rhai::module_resolvers::DummyModuleResolver;
use rhai::{Dynamic, Engine, Map, Scope, INT};
use tracing::{debug, info};

use crate::capability::{self, CallLog, Capability};
use crate::error::ScriptError;
use crate::event::{Event, Trigger};
use crate::rule::Rule;

/// Upper bound on interpreter steps per evaluation. Guards and actions are
/// meant to be tiny; a runaway loop becomes a runtime error.
pub const MAX_OPERATIONS: u64 = 100_000;

const MAX_EXPR_DEPTH: usize = 64;
const MAX_FN_EXPR_DEPTH: usize = 32;
const MAX_CALL_LEVELS: usize = 32;
const MAX_STRING_SIZE: usize = 64 * 1024;
const MAX_COLLECTION_SIZE: usize = 10_000;

pub struct ScriptContext {
    engine: Engine,
    scope: Scope<'static>,
    calls: CallLog,
}

impl ScriptContext {
    pub fn new(trigger: Trigger<'_>) -> Self {
        let calls = CallLog::default();

        let mut engine = Engine::new();
        engine
            .set_max_operations(MAX_OPERATIONS)
            .set_max_expr_depths(MAX_EXPR_DEPTH, MAX_FN_EXPR_DEPTH)
            .set_max_call_levels(MAX_CALL_LEVELS)
            .set_max_string_size(MAX_STRING_SIZE)
            .set_max_array_size(MAX_COLLECTION_SIZE)
            .set_max_map_size(MAX_COLLECTION_SIZE);
        // No file imports and no eval: the capability bindings are the whole
        // host surface.
        engine.set_module_resolver(DummyModuleResolver::new());
        engine.disable_symbol("eval");
        engine.on_print(|text| info!(target: "zbot::script", "{text}"));
        engine.on_debug(|text, _source, pos| debug!(target: "zbot::script", %pos, "{text}"));
        capability::register(&mut engine, &calls);

        // Not a constant: the optimizer folds constants into literals and
        // rhai faults on property assignment to a literal.
        let mut scope = Scope::new();
        scope.push("event", event_record(trigger));

        Self {
            engine,
            scope,
            calls,
        }
    }

    /// Evaluate a guard expression. `false` and `()` are false; every other
    /// value is true.
    pub fn eval_guard(&mut self, source: &str) -> Result<bool, ScriptError> {
        let (engine, scope) = (&self.engine, &mut self.scope);
        let value: Dynamic =
            contained(|| Ok(engine.eval_expression_with_scope(scope, source)?))?;
        Ok(truthy(&value))
    }

    /// Run an action script to completion.
    pub fn run_action(&mut self, source: &str) -> Result<(), ScriptError> {
        let (engine, scope) = (&self.engine, &mut self.scope);
        contained(|| Ok(engine.run_with_scope(scope, source)?))
    }

    /// Capability calls made so far, draining the log.
    pub fn take_calls(&mut self) -> Vec<Capability> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }
}

/// Syntax-check a rule's guard and action without running either.
pub fn check_rule(rule: &Rule) -> Result<(), ScriptError> {
    let ctx = ScriptContext::new(Trigger::Schedule);
    if let Some(guard) = rule.guard() {
        ctx.engine.compile_expression(guard)?;
    }
    ctx.engine.compile(&rule.action)?;
    Ok(())
}

/// Run one interpreter call, turning a panic inside rhai into
/// [`ScriptError::Fault`].
fn contained<T>(eval: impl FnOnce() -> Result<T, ScriptError>) -> Result<T, ScriptError> {
    panic::catch_unwind(AssertUnwindSafe(eval))
        .unwrap_or_else(|payload| Err(ScriptError::Fault(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn truthy(value: &Dynamic) -> bool {
    if value.is_unit() {
        return false;
    }
    value.as_bool().unwrap_or(true)
}

// ---------------------------------------------------------------------------
// Event record
// ---------------------------------------------------------------------------

fn string(value: &str) -> Dynamic {
    Dynamic::from(value.to_string())
}

fn strings(values: &[String]) -> Dynamic {
    Dynamic::from_array(values.iter().map(|v| string(v)).collect())
}

/// The `event` map scripts see. Schedule ticks get an empty map.
fn event_record(trigger: Trigger<'_>) -> Map {
    let mut record = Map::new();
    let Trigger::Event(event) = trigger else {
        return record;
    };

    record.insert("type".into(), string(event.event_type()));
    if let Some(repo) = event.target_repo() {
        record.insert("repository".into(), string(&repo.to_string()));
    }

    match event {
        Event::IssueComment(e) => {
            record.insert("action".into(), string(&e.action));
            record.insert("issue".into(), Dynamic::from(e.issue as INT));
            record.insert("comment".into(), string(&e.comment));
            record.insert("author".into(), string(&e.author));
            record.insert("labels".into(), strings(&e.labels));
        }
        Event::Issues(e) => {
            record.insert("action".into(), string(&e.action));
            record.insert("issue".into(), Dynamic::from(e.issue as INT));
            record.insert("title".into(), string(&e.title));
            record.insert("labels".into(), strings(&e.labels));
        }
        Event::ProjectCardMoved(e) => {
            record.insert("new_column".into(), string(&e.new_column));
            if let Some(url) = &e.content_url {
                record.insert("content_url".into(), string(url));
            }
        }
        Event::Unknown => {}
    }

    record
}
