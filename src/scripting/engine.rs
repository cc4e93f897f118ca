//! Rhai-backed command evaluator
//!
//! Each evaluation runs against a fresh [`Scope`] seeded with the workspace
//! entries. Afterwards every storable value left in the scope is written
//! back, so `c = a + b` creates or updates `c`.
//!
//! ## Data items in expressions
//!
//! - `a + b`, `a - 1`, `2.0 * a`, `a / b`, `-a`: element-wise, see
//!   [`analysis::binary`]
//! - `abs(a)`, `sqrt(a)`, `exp(a)`, `ln(a)`, `log10(a)`, `sin(a)`,
//!   `cos(a)`, `tan(a)`
//! - `a.name`, `a.label`, `a.units`, `a.source`, `a.description`,
//!   `a.comment` (writable), `a.data`, `a.time`, `a.len`, `a[i]`

use super::bindings::{Binding, BindingContext, BindingError, Bindings, Value, MAX_ARITY};
use super::ScriptCache;
use crate::analysis::{self, shape_text, BinaryOp, Operand, UnaryOp};
use crate::config::EvaluatorConfig;
use crate::error::{EvaluationError, EvaluationErrorKind};
use crate::types::{DataItem, DataValue};
use crate::workspace::{is_reserved, is_valid_name, Workspace};
use regex::Regex;
use rhai::module_resolvers::DummyModuleResolver;
use rhai::{Array, Dynamic, Engine, EvalAltResult, ParseError, Position, Scope, FLOAT, INT};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, OnceLock};

/// Captured `print`/`debug` and binding output of the current evaluation
type OutputBuffer = Arc<Mutex<String>>;

type NativeCall = Arc<dyn Fn(Vec<Dynamic>) -> Result<Dynamic, Box<EvalAltResult>> + Send + Sync>;

/// Lifecycle of the evaluator.
///
/// `evaluate` moves Idle → Running → Succeeded/Failed and back to Idle
/// before returning; the outcome stays available through the report and
/// [`CommandEvaluator::last_error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluatorState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Result of one `evaluate` call
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub outcome: Result<(), EvaluationError>,
    /// Everything printed during the evaluation, in order
    pub output: String,
    /// Workspace keys created or updated, in scope order
    pub written: Vec<String>,
}

impl EvaluationReport {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn error(&self) -> Option<&EvaluationError> {
        self.outcome.as_ref().err()
    }
}

/// Classified failure carried through the engine as a runtime error payload
#[derive(Debug, Clone)]
struct Failure {
    kind: EvaluationErrorKind,
    message: String,
}

fn failure(kind: EvaluationErrorKind, message: impl Into<String>) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(
        Dynamic::from(Failure {
            kind,
            message: message.into(),
        }),
        Position::NONE,
    )
    .into()
}

/// Sandboxed evaluator of workspace expressions
pub struct CommandEvaluator {
    engine: Engine,
    config: EvaluatorConfig,
    bindings: Bindings,
    output: OutputBuffer,
    cache: ScriptCache,
    state: EvaluatorState,
    last_error: Option<EvaluationError>,
}

impl CommandEvaluator {
    /// An evaluator with no bindings
    pub fn new(config: EvaluatorConfig) -> Self {
        Self::with_bindings(config, Bindings::new())
    }

    pub fn with_bindings(config: EvaluatorConfig, bindings: Bindings) -> Self {
        let output = OutputBuffer::default();
        let engine = build_engine(&config, &bindings, &output);
        Self {
            engine,
            config,
            bindings,
            output,
            cache: ScriptCache::new(),
            state: EvaluatorState::Idle,
            last_error: None,
        }
    }

    /// Replace the whole binding set
    pub fn configure_bindings(&mut self, bindings: Bindings) {
        tracing::info!(
            "Configuring {} binding(s): {}",
            bindings.len(),
            bindings.names().collect::<Vec<_>>().join(", ")
        );
        self.engine = build_engine(&self.config, &bindings, &self.output);
        self.bindings = bindings;
        self.cache.clear();
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn state(&self) -> EvaluatorState {
        self.state
    }

    /// Error of the most recent evaluation, `None` if it succeeded
    pub fn last_error(&self) -> Option<&EvaluationError> {
        self.last_error.as_ref()
    }

    /// Check that `text` parses, without running it
    pub fn validate(&self, text: &str) -> Result<(), EvaluationError> {
        self.engine.compile(text).map(|_| ()).map_err(parse_error)
    }

    /// Run `text` with the workspace as its namespace.
    ///
    /// Failures are reported in the returned [`EvaluationReport`], never
    /// propagated. Values assigned before a failure are still written back:
    /// there is no rollback.
    pub fn evaluate(&mut self, workspace: &mut Workspace, text: &str) -> EvaluationReport {
        self.state = EvaluatorState::Running;
        self.take_output();

        let mut scope = Scope::new();
        for (name, item) in workspace.iter() {
            scope.push(name.to_string(), item.clone());
        }
        predeclare_assignments(&mut scope, text);

        let outcome = match self.cache.get_or_compile(&self.engine, text) {
            Ok(ast) => self
                .engine
                .run_ast_with_scope(&mut scope, &ast)
                .map_err(|e| runtime_error(*e, &self.bindings)),
            Err(e) => Err(parse_error(e)),
        };

        let written = write_back(workspace, &scope);
        let output = self.take_output();

        match &outcome {
            Ok(()) => {
                self.state = EvaluatorState::Succeeded;
                tracing::debug!("Evaluated {:?}: wrote {:?}", text, written);
            }
            Err(e) => {
                self.state = EvaluatorState::Failed;
                tracing::warn!("Evaluation of {:?} failed: {}", text, e);
            }
        }
        self.last_error = outcome.as_ref().err().cloned();
        self.state = EvaluatorState::Idle;

        EvaluationReport {
            outcome,
            output,
            written,
        }
    }

    fn take_output(&self) -> String {
        self.output
            .lock()
            .map(|mut out| std::mem::take(&mut *out))
            .unwrap_or_default()
    }
}

impl Default for CommandEvaluator {
    fn default() -> Self {
        Self::new(EvaluatorConfig::default())
    }
}

impl std::fmt::Debug for CommandEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandEvaluator")
            .field("bindings", &self.bindings.names().collect::<Vec<_>>())
            .field("state", &self.state)
            .field("cached", &self.cache.len())
            .finish()
    }
}

/// Configure the Rhai engine with sandbox limits, data item support and
/// the bindings
fn build_engine(config: &EvaluatorConfig, bindings: &Bindings, output: &OutputBuffer) -> Engine {
    let mut engine = Engine::new();

    engine.set_max_expr_depths(config.max_expr_depth, config.max_expr_depth);
    engine.set_max_call_levels(config.max_call_levels);
    engine.set_max_operations(config.max_operations);
    engine.set_max_string_size(config.max_string_size);
    engine.set_max_array_size(config.max_array_size);
    engine.set_max_map_size(config.max_map_size);

    // Nothing outside the workspace and the bindings is reachable
    engine.disable_symbol("eval");
    engine.set_module_resolver(DummyModuleResolver::new());

    {
        let output = output.clone();
        engine.on_print(move |text| append_line(&output, text));
    }
    {
        let output = output.clone();
        engine.on_debug(move |text, _, _| append_line(&output, text));
    }

    register_data_item(&mut engine);
    for (name, binding) in bindings.iter() {
        register_binding(&mut engine, name, binding, output);
    }

    engine
}

fn append_line(output: &OutputBuffer, text: &str) {
    if let Ok(mut out) = output.lock() {
        out.push_str(text);
        out.push('\n');
    }
}

fn append_raw(output: &OutputBuffer, text: &str) {
    if let Ok(mut out) = output.lock() {
        out.push_str(text);
    }
}

macro_rules! register_arities {
    ($engine:ident, $name:ident, $count:expr, $call:ident; $($n:literal => ($($arg:ident),*)),* $(,)?) => {
        match $count {
            $($n => {
                let call = $call.clone();
                $engine.register_fn(
                    $name,
                    move |$($arg: Dynamic),*| -> Result<Dynamic, Box<EvalAltResult>> {
                        call(vec![$($arg),*])
                    },
                );
            })*
            n => tracing::warn!("Binding {} cannot be registered with {} arguments", $name, n),
        }
    };
}

fn register_binding(engine: &mut Engine, name: &str, binding: &Binding, output: &OutputBuffer) {
    let call: NativeCall = {
        let binding = binding.clone();
        let name = name.to_string();
        let output = output.clone();
        Arc::new(move |args: Vec<Dynamic>| {
            let args = args
                .into_iter()
                .map(to_value)
                .collect::<Result<Vec<_>, _>>()?;
            let mut ctx = BindingContext::new();
            let result = binding.call(&name, &mut ctx, args);
            append_raw(&output, ctx.output());
            result.map(from_value).map_err(|e| binding_failure(&e))
        })
    };

    for count in binding.arity.min()..=binding.arity.max().min(MAX_ARITY) {
        register_arities!(engine, name, count, call;
            0 => (),
            1 => (a0),
            2 => (a0, a1),
            3 => (a0, a1, a2),
            4 => (a0, a1, a2, a3),
            5 => (a0, a1, a2, a3, a4),
            6 => (a0, a1, a2, a3, a4, a5),
            7 => (a0, a1, a2, a3, a4, a5, a6),
            8 => (a0, a1, a2, a3, a4, a5, a6, a7),
        );
    }
}

fn binding_failure(err: &BindingError) -> Box<EvalAltResult> {
    let kind = if err.is_usage_error() {
        EvaluationErrorKind::Type
    } else {
        EvaluationErrorKind::Runtime
    };
    failure(kind, err.to_string())
}

fn register_data_item(engine: &mut Engine) {
    engine.register_type_with_name::<DataItem>("DataItem");

    for (symbol, op) in [
        ("+", BinaryOp::Add),
        ("-", BinaryOp::Sub),
        ("*", BinaryOp::Mul),
        ("/", BinaryOp::Div),
    ] {
        engine.register_fn(symbol, move |a: DataItem, b: DataItem| {
            arith(op, Operand::Item(&a), Operand::Item(&b))
        });
        engine.register_fn(symbol, move |a: DataItem, b: FLOAT| {
            arith(op, Operand::Item(&a), Operand::Number(b))
        });
        engine.register_fn(symbol, move |a: FLOAT, b: DataItem| {
            arith(op, Operand::Number(a), Operand::Item(&b))
        });
        engine.register_fn(symbol, move |a: DataItem, b: INT| {
            arith(op, Operand::Item(&a), Operand::Number(b as FLOAT))
        });
        engine.register_fn(symbol, move |a: INT, b: DataItem| {
            arith(op, Operand::Number(a as FLOAT), Operand::Item(&b))
        });
    }

    engine.register_fn("-", |a: DataItem| map(UnaryOp::Neg, &a));
    for op in [
        UnaryOp::Abs,
        UnaryOp::Sqrt,
        UnaryOp::Exp,
        UnaryOp::Ln,
        UnaryOp::Log10,
        UnaryOp::Sin,
        UnaryOp::Cos,
        UnaryOp::Tan,
    ] {
        engine.register_fn(op.name(), move |a: DataItem| map(op, &a));
    }

    engine.register_get("name", |x: &mut DataItem| x.name.clone());
    engine.register_get("label", |x: &mut DataItem| x.label.clone());
    engine.register_get("units", |x: &mut DataItem| x.units.clone());
    engine.register_get("source", |x: &mut DataItem| x.source.clone());
    engine.register_get("description", |x: &mut DataItem| x.description.clone());
    engine.register_get_set(
        "comment",
        |x: &mut DataItem| x.comment.clone(),
        |x: &mut DataItem, comment: String| x.comment = comment,
    );
    engine.register_get("len", |x: &mut DataItem| x.value.len() as INT);
    engine.register_get("data", |x: &mut DataItem| -> Array {
        match &x.value {
            DataValue::Tuple(items) => items.iter().cloned().map(Dynamic::from).collect(),
            value => value
                .as_slice()
                .unwrap_or_default()
                .iter()
                .map(|&v| Dynamic::from_float(v))
                .collect(),
        }
    });
    engine.register_get("time", |x: &mut DataItem| -> Dynamic {
        match (x.time_dim(), x.time()) {
            (Some(dim), Some(time)) => Dynamic::from(
                DataItem::series(dim.name.clone(), time.to_vec())
                    .with_label(dim.display_label())
                    .with_units(dim.units.clone())
                    .with_source(x.source.clone()),
            ),
            _ => Dynamic::UNIT,
        }
    });
    engine.register_indexer_get(
        |x: &mut DataItem, index: INT| -> Result<Dynamic, Box<EvalAltResult>> {
            let len = x.value.len();
            let position = if index < 0 {
                len.checked_sub(index.unsigned_abs() as usize)
            } else {
                Some(index as usize).filter(|&i| i < len)
            };
            let Some(i) = position else {
                return Err(EvalAltResult::ErrorArrayBounds(len, index, Position::NONE).into());
            };
            Ok(match &x.value {
                DataValue::Tuple(items) => Dynamic::from(items[i].clone()),
                value => Dynamic::from_float(value.as_slice().map(|s| s[i]).unwrap_or(FLOAT::NAN)),
            })
        },
    );

    engine.register_fn("to_string", |x: &mut DataItem| summary(x));
    engine.register_fn("to_debug", |x: &mut DataItem| summary(x));
}

fn arith(op: BinaryOp, lhs: Operand<'_>, rhs: Operand<'_>) -> Result<DataItem, Box<EvalAltResult>> {
    analysis::binary(op, lhs, rhs).map_err(|e| failure(EvaluationErrorKind::Type, e.to_string()))
}

fn map(op: UnaryOp, item: &DataItem) -> Result<DataItem, Box<EvalAltResult>> {
    analysis::unary(op, item).map_err(|e| failure(EvaluationErrorKind::Type, e.to_string()))
}

fn summary(item: &DataItem) -> String {
    let mut text = format!(
        "DataItem({} {})",
        item.display_label(),
        shape_text(&item.value.shape())
    );
    if !item.units.is_empty() {
        text.push_str(&format!(" [{}]", item.units));
    }
    text
}

/// Convert an engine value for a binding
fn to_value(value: Dynamic) -> Result<Value, Box<EvalAltResult>> {
    if value.is_unit() {
        return Ok(Value::Unit);
    }
    if let Ok(n) = value.as_float() {
        return Ok(Value::Number(n));
    }
    if let Ok(n) = value.as_int() {
        return Ok(Value::Number(n as f64));
    }
    if let Ok(b) = value.as_bool() {
        return Ok(Value::Number(if b { 1.0 } else { 0.0 }));
    }
    let type_name = value.type_name().to_string();
    if value.is::<DataItem>() {
        if let Some(item) = value.try_cast::<DataItem>() {
            return Ok(Value::Item(item));
        }
    } else if value.is_string() {
        if let Ok(text) = value.into_string() {
            return Ok(Value::Text(text));
        }
    } else if value.is_array() {
        if let Ok(array) = value.into_array() {
            return array
                .into_iter()
                .map(to_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List);
        }
    }
    Err(failure(
        EvaluationErrorKind::Type,
        format!("unsupported argument type {type_name}"),
    ))
}

/// Convert a binding result for the engine
fn from_value(value: Value) -> Dynamic {
    match value {
        Value::Unit => Dynamic::UNIT,
        Value::Number(n) => Dynamic::from_float(n),
        Value::Text(text) => Dynamic::from(text),
        Value::Item(item) => Dynamic::from(item),
        Value::List(values) => Dynamic::from_array(values.into_iter().map(from_value).collect()),
    }
}

fn number(value: &Dynamic) -> Option<f64> {
    value
        .as_float()
        .ok()
        .or_else(|| value.as_int().ok().map(|n| n as f64))
}

/// The workspace form of a scope value, `None` for values that are not stored
fn storable(name: &str, value: &Dynamic) -> Option<DataItem> {
    if let Some(item) = value.clone().try_cast::<DataItem>() {
        return Some(item);
    }
    if let Some(n) = number(value) {
        return Some(DataItem::scalar(name, n));
    }
    if value.is_array() {
        let array = value.clone().into_array().ok()?;
        if let Some(values) = array.iter().map(number).collect::<Option<Vec<_>>>() {
            return Some(DataItem::series(name, values));
        }
        return array
            .into_iter()
            .map(|v| v.try_cast::<DataItem>())
            .collect::<Option<Vec<_>>>()
            .map(|items| DataItem::tuple(name, items));
    }
    None
}

/// Reflect new or changed scope values into the workspace
fn write_back(workspace: &mut Workspace, scope: &Scope) -> Vec<String> {
    // Later entries shadow earlier ones with the same name
    let mut seen = HashSet::new();
    let mut latest: Vec<(&str, &Dynamic)> = scope
        .iter_raw()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .filter(|(name, _, _)| seen.insert(*name))
        .map(|(name, _, value)| (name, value))
        .collect();
    latest.reverse();

    let mut written = Vec::new();
    for (name, value) in latest {
        let Some(mut item) = storable(name, value) else {
            continue;
        };
        if item.name.is_empty() {
            item.name = name.to_string();
        }
        if workspace.get(name).is_some_and(|current| current.is_identical(&item)) {
            continue;
        }
        if !is_valid_name(name) {
            tracing::debug!("Not storing {:?}: not a valid workspace name", name);
            continue;
        }
        if workspace.insert(name, item).is_ok() {
            written.push(name.to_string());
        }
    }
    written
}

fn assignment_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?m)(?:^|[;{}])\s*([A-Za-z_][A-Za-z0-9_]*)\s*=(?:[^=]|$)").ok())
        .as_ref()
}

/// Declare the targets of bare `name = expr` statements that are not in
/// scope yet, so assignment can create workspace entries
fn predeclare_assignments(scope: &mut Scope, text: &str) {
    let Some(pattern) = assignment_pattern() else {
        return;
    };
    for captures in pattern.captures_iter(text) {
        let Some(name) = captures.get(1).map(|m| m.as_str()) else {
            continue;
        };
        if !is_reserved(name) && !scope.contains(name) {
            scope.push_dynamic(name.to_string(), Dynamic::UNIT);
        }
    }
}

fn parse_error(err: ParseError) -> EvaluationError {
    let ParseError(kind, position) = err;
    EvaluationError::new(EvaluationErrorKind::Syntax, kind.to_string())
        .at(position.line(), position.position())
}

fn runtime_error(mut err: EvalAltResult, bindings: &Bindings) -> EvaluationError {
    let position = err.take_position();
    let (kind, message) = classify(&err, bindings);
    EvaluationError::new(kind, message).at(position.line(), position.position())
}

fn classify(err: &EvalAltResult, bindings: &Bindings) -> (EvaluationErrorKind, String) {
    use EvaluationErrorKind::*;

    match err {
        EvalAltResult::ErrorVariableNotFound(name, _) => {
            (Name, format!("name '{name}' is not defined"))
        }
        EvalAltResult::ErrorFunctionNotFound(signature, _) => {
            let name = signature
                .split(|c: char| c == '(' || c.is_whitespace())
                .next()
                .unwrap_or_default();
            if let Some(binding) = bindings.get(name) {
                (
                    Type,
                    format!("{name}() takes {} argument(s): {signature}", binding.arity),
                )
            } else if name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
                (Name, format!("function '{name}' is not defined: {signature}"))
            } else {
                (Type, format!("unsupported operand types: {signature}"))
            }
        }
        EvalAltResult::ErrorRuntime(value, _) => match value.clone().try_cast::<Failure>() {
            Some(f) => (f.kind, f.message),
            None => (Runtime, value.to_string()),
        },
        EvalAltResult::ErrorParsing(kind, _) => (Syntax, kind.to_string()),
        EvalAltResult::ErrorArithmetic(message, _) => (Arithmetic, message.clone()),
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => classify(inner, bindings),
        EvalAltResult::ErrorMismatchDataType(..)
        | EvalAltResult::ErrorMismatchOutputType(..)
        | EvalAltResult::ErrorIndexingType(..)
        | EvalAltResult::ErrorPropertyNotFound(..)
        | EvalAltResult::ErrorFor(..) => (Type, err.to_string()),
        EvalAltResult::ErrorTooManyOperations(..)
        | EvalAltResult::ErrorStackOverflow(..)
        | EvalAltResult::ErrorDataTooLarge(..)
        | EvalAltResult::ErrorTooManyModules(..) => (Limit, err.to_string()),
        _ => (Runtime, err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripting::bindings::Arity;

    fn workspace() -> Workspace {
        let mut ws = Workspace::new();
        ws.insert("a", DataItem::series("a", vec![1.0, 2.0, 3.0])).unwrap();
        ws.insert("b", DataItem::series("b", vec![10.0, 20.0, 30.0])).unwrap();
        ws
    }

    #[test]
    fn test_bare_assignment_creates_entry() {
        let mut ws = workspace();
        let mut evaluator = CommandEvaluator::default();
        let report = evaluator.evaluate(&mut ws, "c = a + b");
        assert!(report.is_ok(), "{:?}", report.outcome);
        assert_eq!(report.written, vec!["c".to_string()]);
        let c = ws.get("c").unwrap();
        assert_eq!(c.values(), Some(&[11.0, 22.0, 33.0][..]));
        assert_eq!(c.name, "c");
        assert_eq!(evaluator.state(), EvaluatorState::Idle);
    }

    #[test]
    fn test_unknown_name_is_name_error() {
        let mut ws = workspace();
        let mut evaluator = CommandEvaluator::default();
        let report = evaluator.evaluate(&mut ws, "d = unknown_name");
        let err = report.error().unwrap();
        assert_eq!(err.kind, EvaluationErrorKind::Name);
        assert!(err.message.contains("unknown_name"));
        assert!(!ws.contains("d"));
        assert_eq!(evaluator.last_error(), Some(err));
    }

    #[test]
    fn test_syntax_error_has_position() {
        let mut ws = workspace();
        let mut evaluator = CommandEvaluator::default();
        let report = evaluator.evaluate(&mut ws, "c = (a + ");
        let err = report.error().unwrap();
        assert_eq!(err.kind, EvaluationErrorKind::Syntax);
        assert_eq!(err.line, Some(1));
    }

    #[test]
    fn test_partial_write_back_on_failure() {
        let mut ws = workspace();
        let mut evaluator = CommandEvaluator::default();
        let report = evaluator.evaluate(&mut ws, "x = a * 2; y = missing; z = b");
        assert!(!report.is_ok());
        assert_eq!(ws.get("x").unwrap().values(), Some(&[2.0, 4.0, 6.0][..]));
        assert!(!ws.contains("y"));
        assert!(!ws.contains("z"));
    }

    #[test]
    fn test_unchanged_entries_not_rewritten() {
        let mut ws = workspace();
        let mut evaluator = CommandEvaluator::default();
        let rev = ws.revision();
        let report = evaluator.evaluate(&mut ws, "print(a.len)");
        assert!(report.is_ok());
        assert!(report.written.is_empty());
        assert_eq!(ws.revision(), rev);
        assert_eq!(report.output, "3\n");
    }

    #[test]
    fn test_unchanged_nan_entries_not_rewritten() {
        let mut ws = Workspace::new();
        ws.insert("gap", DataItem::series("gap", vec![1.0, f64::NAN, 3.0]))
            .unwrap();
        let mut evaluator = CommandEvaluator::default();
        let rev = ws.revision();
        let report = evaluator.evaluate(&mut ws, "print(gap.len)");
        assert!(report.is_ok(), "{:?}", report.outcome);
        assert!(report.written.is_empty());
        assert_eq!(ws.revision(), rev);
    }

    #[test]
    fn test_numbers_and_arrays_stored() {
        let mut ws = Workspace::new();
        let mut evaluator = CommandEvaluator::default();
        let report = evaluator.evaluate(&mut ws, "n = 2 + 3; s = [1, 2.5]; t = \"text\"");
        assert!(report.is_ok(), "{:?}", report.outcome);
        assert_eq!(ws.get("n").unwrap().value, DataValue::Scalar(5.0));
        assert_eq!(ws.get("s").unwrap().values(), Some(&[1.0, 2.5][..]));
        assert!(!ws.contains("t"));
    }

    #[test]
    fn test_item_properties() {
        let mut ws = Workspace::new();
        ws.insert(
            "ip",
            DataItem::series("ip", vec![1.0, -2.0])
                .with_units("kA")
                .with_time("s", vec![0.0, 0.1]),
        )
        .unwrap();
        let mut evaluator = CommandEvaluator::default();
        let report = evaluator.evaluate(
            &mut ws,
            "print(ip.units); print(ip[1]); ip.comment = \"checked\"; t = ip.time; m = abs(-ip)",
        );
        assert!(report.is_ok(), "{:?}", report.outcome);
        assert_eq!(report.output, "kA\n-2.0\n");
        assert_eq!(ws.get("ip").unwrap().comment, "checked");
        assert_eq!(ws.get("t").unwrap().values(), Some(&[0.0, 0.1][..]));
        assert_eq!(ws.get("m").unwrap().values(), Some(&[1.0, 2.0][..]));
    }

    #[test]
    fn test_shape_mismatch_is_type_error() {
        let mut ws = workspace();
        ws.insert("short", DataItem::series("s", vec![1.0])).unwrap();
        let mut evaluator = CommandEvaluator::default();
        let report = evaluator.evaluate(&mut ws, "c = a + short");
        let err = report.error().unwrap();
        assert_eq!(err.kind, EvaluationErrorKind::Type);
        assert!(err.message.contains("(3,) (1,)"));
    }

    #[test]
    fn test_eval_is_disabled() {
        let mut ws = workspace();
        let mut evaluator = CommandEvaluator::default();
        let report = evaluator.evaluate(&mut ws, "eval(\"c = 1\")");
        assert!(!report.is_ok());
        assert!(!ws.contains("c"));
    }

    #[test]
    fn test_operation_limit() {
        let mut ws = Workspace::new();
        let mut evaluator = CommandEvaluator::new(EvaluatorConfig {
            max_operations: 1_000,
            ..Default::default()
        });
        let report = evaluator.evaluate(&mut ws, "let i = 0; loop { i += 1; }");
        assert_eq!(report.error().unwrap().kind, EvaluationErrorKind::Limit);
    }

    #[test]
    fn test_bindings_replace_whole_set() {
        let mut ws = workspace();
        let mut evaluator = CommandEvaluator::default();

        let twice = Bindings::new().with(
            "twice",
            Binding::new(Arity::Exact(1), |ctx, args| {
                ctx.println("doubling");
                let item = args[0].expect_item("twice", 0)?;
                Ok(analysis::binary(BinaryOp::Mul, Operand::Item(item), Operand::Number(2.0))?.into())
            }),
        );
        evaluator.configure_bindings(twice);
        let report = evaluator.evaluate(&mut ws, "c = twice(a)");
        assert!(report.is_ok(), "{:?}", report.outcome);
        assert_eq!(report.output, "doubling\n");
        assert_eq!(ws.get("c").unwrap().values(), Some(&[2.0, 4.0, 6.0][..]));

        evaluator.configure_bindings(Bindings::new());
        let report = evaluator.evaluate(&mut ws, "d = twice(a)");
        assert_eq!(report.error().unwrap().kind, EvaluationErrorKind::Name);
    }

    #[test]
    fn test_binding_failure_is_runtime_error() {
        let mut ws = workspace();
        let failing = Bindings::new().with(
            "boom",
            Binding::new(Arity::Exact(0), |_, _| Err(BindingError::Failed("no data".into()))),
        );
        let mut evaluator = CommandEvaluator::with_bindings(EvaluatorConfig::default(), failing);
        let report = evaluator.evaluate(&mut ws, "boom()");
        let err = report.error().unwrap();
        assert_eq!(err.kind, EvaluationErrorKind::Runtime);
        assert_eq!(err.message, "no data");

        let report = evaluator.evaluate(&mut ws, "boom(1)");
        assert_eq!(report.error().unwrap().kind, EvaluationErrorKind::Type);
    }

    #[test]
    fn test_throw_is_runtime_error() {
        let mut ws = Workspace::new();
        let mut evaluator = CommandEvaluator::default();
        let report = evaluator.evaluate(&mut ws, "throw \"stop\"");
        let err = report.error().unwrap();
        assert_eq!(err.kind, EvaluationErrorKind::Runtime);
        assert_eq!(err.message, "stop");
    }
}
