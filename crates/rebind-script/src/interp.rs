//! Executes a parsed [`Script`] against a [`Lookup`].
//!
//! Each `sig` opens a composition. Transform statements extend its
//! [`SmartBinder`], one endpoint statement finishes it into a
//! [`SmartHandle`], and every following `call` invokes that handle.

use std::fmt;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use rebind_core::convert::convert_value;
use rebind_core::{
    ArrayValue, Callable, Capabilities, ConversionKind, Invocation, Lookup, Registry, Signature, SmartBinder,
    SmartHandle, Type, Value,
};
use serde::Serialize;
use tracing::debug;

use crate::ast::{Endpoint, Lit, MemberRef, Script, SigExpr, Stmt, StmtKind, TypeExpr};
use crate::library::{Library, Notes};

/// The signature after one statement.
#[derive(Debug, Clone, Serialize)]
pub struct Step {
    pub statement: String,
    pub signature: String,
}

/// One invocation of a finished handle.
#[derive(Debug, Clone)]
pub struct Call {
    pub args: Vec<Value>,
    pub result: Invocation,
    /// `Log` lines recorded while the call ran.
    pub notes: Vec<String>,
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(Value::to_string).collect();
        match &self.result {
            Ok(v) => write!(f, "call({}) = {}", args.join(", "), v),
            Err(t) => write!(f, "call({}) threw {}", args.join(", "), t),
        }
    }
}

/// Everything one `sig` block produced.
#[derive(Debug, Clone, Serialize)]
pub struct Composition {
    pub start: String,
    pub steps: Vec<Step>,
    pub endpoint: Option<String>,
    /// Primitive operations, oldest first.
    pub trace: Vec<String>,
    #[serde(skip)]
    pub calls: Vec<Call>,
    #[serde(skip)]
    pub handle: Option<SmartHandle>,
}

enum Stage {
    Binding(SmartBinder),
    Finished(SmartHandle),
}

struct Open {
    report: Composition,
    stage: Stage,
}

pub struct Interpreter {
    lookup: Lookup,
    caps: Capabilities,
    notes: Notes,
}

impl Interpreter {
    /// An interpreter over the builtin library.
    pub fn new(caps: Capabilities) -> Self {
        let library = Library::new();
        let mut registry = Registry::new();
        library.install(&mut registry);
        Interpreter {
            lookup: Lookup::public(Arc::new(registry)),
            caps,
            notes: library.notes().clone(),
        }
    }

    /// An interpreter over a caller-built registry. `notes` collects
    /// whatever the registry's members record.
    pub fn with_lookup(lookup: Lookup, caps: Capabilities, notes: Notes) -> Self {
        Interpreter { lookup, caps, notes }
    }

    pub fn lookup(&self) -> &Lookup {
        &self.lookup
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    /// Build every composition and perform its calls.
    pub fn run(&self, script: &Script) -> Result<Vec<Composition>> {
        self.exec(script, true)
    }

    /// Build every composition without calling anything.
    pub fn explain(&self, script: &Script) -> Result<Vec<Composition>> {
        self.exec(script, false)
    }

    fn exec(&self, script: &Script, perform: bool) -> Result<Vec<Composition>> {
        let mut done = Vec::new();
        let mut open: Option<Open> = None;
        for stmt in &script.stmts {
            debug!(statement = %stmt, span = %stmt.span, "exec");
            if let StmtKind::Sig(sig) = &stmt.kind {
                done.extend(open.take().map(close));
                let start = self
                    .signature(sig)
                    .with_context(|| format!("at {}: {}", stmt.span, stmt))?;
                open = Some(Open {
                    report: Composition {
                        start: start.to_string(),
                        steps: Vec::new(),
                        endpoint: None,
                        trace: Vec::new(),
                        calls: Vec::new(),
                        handle: None,
                    },
                    stage: Stage::Binding(SmartBinder::from(start).with_capabilities(self.caps)),
                });
                continue;
            }
            let Some(current) = open.as_mut() else {
                bail!("at {}: `{}` before any sig", stmt.span, stmt);
            };
            self.step(current, stmt, perform)
                .with_context(|| format!("at {}: {}", stmt.span, stmt))?;
        }
        done.extend(open.map(close));
        Ok(done)
    }

    fn step(&self, open: &mut Open, stmt: &Stmt, perform: bool) -> Result<()> {
        let next = match (&open.stage, &stmt.kind) {
            (Stage::Finished(handle), StmtKind::Call(lits)) => {
                if perform {
                    let call = self.call(handle, lits);
                    debug!(%call, "called");
                    open.report.calls.push(call);
                }
                None
            }
            (Stage::Binding(_), StmtKind::Call(_)) => bail!("call before an endpoint"),
            (Stage::Finished(_), _) => bail!("the composition already has an endpoint"),
            (Stage::Binding(binder), StmtKind::Endpoint(endpoint)) => {
                let handle = self.finish(binder, endpoint)?;
                open.report.endpoint = Some(endpoint.to_string());
                open.report.trace = binder.trace();
                open.report.handle = Some(handle.clone());
                Some(Stage::Finished(handle))
            }
            (Stage::Binding(binder), kind) => {
                let next = self.transform(binder, kind)?;
                open.report.steps.push(Step {
                    statement: stmt.to_string(),
                    signature: next.signature().to_string(),
                });
                Some(Stage::Binding(next))
            }
        };
        if let Some(stage) = next {
            open.stage = stage;
        }
        Ok(())
    }

    fn transform(&self, b: &SmartBinder, kind: &StmtKind) -> Result<SmartBinder> {
        Ok(match kind {
            StmtKind::Drop(name) => b.drop(&name.text)?,
            StmtKind::Insert { index, binding } => {
                let (ty, value) = self.bound_value(binding.ty.as_ref(), &binding.value)?;
                b.insert_typed(*index as usize, &binding.name.text, ty, value)?
            }
            StmtKind::Append(binding) => {
                let (ty, value) = self.bound_value(binding.ty.as_ref(), &binding.value)?;
                b.append_typed(&binding.name.text, ty, value)?
            }
            StmtKind::Prepend(binding) => {
                let (ty, value) = self.bound_value(binding.ty.as_ref(), &binding.value)?;
                b.prepend_typed(&binding.name.text, ty, value)?
            }
            StmtKind::Permute(patterns) => {
                let ps: Vec<&str> = patterns.iter().map(|p| p.text.as_str()).collect();
                b.permute_names(&ps)?
            }
            StmtKind::Exclude(patterns) => {
                let ps: Vec<&str> = patterns.iter().map(|p| p.text.as_str()).collect();
                b.exclude(&ps)?
            }
            StmtKind::Spread(params) => {
                let names: Vec<&str> = params.iter().map(|p| p.name.text.as_str()).collect();
                let types = params
                    .iter()
                    .map(|p| self.resolve_type(&p.ty))
                    .collect::<Result<Vec<_>>>()?;
                b.spread(&names, &types)?
            }
            StmtKind::Collect { name, pattern } => b.collect(&name.text, &pattern.text)?,
            StmtKind::Convert(sig) => b.convert(&self.signature(sig)?)?,
            StmtKind::Cast(sig) => b.cast(&self.signature(sig)?)?,
            StmtKind::Fold { name, function } => b.fold(&name.text, self.function(function)?)?,
            StmtKind::FoldVoid(function) => b.fold_void(self.function(function)?)?,
            StmtKind::Filter { pattern, function } => {
                b.filter(&pattern.text, self.function(function)?)?
            }
            StmtKind::FilterReturn(function) => b.filter_return(self.function(function)?)?,
            StmtKind::Catch { throwable, function } => {
                b.catch_exception(self.resolve_type(throwable)?, self.function(function)?)?
            }
            StmtKind::Finally(function) => b.try_finally(self.function(function)?)?,
            StmtKind::Sig(_) | StmtKind::Endpoint(_) | StmtKind::Call(_) => {
                bail!("not a transform statement")
            }
        })
    }

    fn finish(&self, b: &SmartBinder, endpoint: &Endpoint) -> Result<SmartHandle> {
        let lookup = &self.lookup;
        Ok(match endpoint {
            Endpoint::InvokeStatic(m) => b.invoke_static(lookup, &self.class(&m.class.text)?, &m.member.text)?,
            Endpoint::InvokeVirtual(name) => b.invoke_virtual(lookup, &name.text)?,
            Endpoint::InvokeSpecial(m) => {
                // the receiver's declared class is the calling context
                let receiver = b
                    .signature()
                    .arg_type(0)
                    .cloned()
                    .ok_or_else(|| anyhow!("invoke special needs a receiver argument"))?;
                let inside = lookup.in_class(&receiver);
                b.invoke_special(&inside, &self.class(&m.class.text)?, &m.member.text)?
            }
            Endpoint::InvokeConstructor(class) => {
                b.invoke_constructor(lookup, &self.class(&class.text)?)?
            }
            Endpoint::GetStatic(m) => b.get_static(lookup, &self.class(&m.class.text)?, &m.member.text)?,
            Endpoint::SetStatic(m) => b.set_static(lookup, &self.class(&m.class.text)?, &m.member.text)?,
            Endpoint::GetField(name) => b.get_field(lookup, &name.text)?,
            Endpoint::SetField(name) => b.set_field(lookup, &name.text)?,
            Endpoint::Identity => b.identity()?,
            Endpoint::Constant(lit) => {
                let ret = b.signature().ret().clone();
                b.constant(typed(lit, &ret)?)?
            }
            Endpoint::Nop => b.nop()?,
            Endpoint::Throw => b.throw_exception()?,
        })
    }

    fn call(&self, handle: &SmartHandle, lits: &[Lit]) -> Call {
        let params = handle.signature().ty().params();
        let mut args = Vec::with_capacity(lits.len());
        let mut failed = None;
        for (i, lit) in lits.iter().enumerate() {
            let raw = value_of(lit);
            match params.get(i) {
                Some(ty) => match coerce(lit, ty) {
                    Ok(v) => args.push(v),
                    Err(t) => {
                        args.push(raw);
                        if failed.is_none() {
                            failed = Some(t);
                        }
                    }
                },
                None => args.push(raw),
            }
        }
        self.notes.take();
        let result = match failed {
            Some(t) => Err(t),
            None => handle.invoke(args.clone()),
        };
        Call {
            args,
            result,
            notes: self.notes.take(),
        }
    }

    // ---------------------------------------------------------------------
    // Names to engine values
    // ---------------------------------------------------------------------

    /// A registered class, or failing that a built-in one.
    fn class(&self, name: &str) -> Result<Type> {
        match self.lookup.resolve_class(name) {
            Ok(ty) => Ok(ty),
            Err(_) => match Type::parse(name) {
                Some(ty @ Type::Ref(_)) => Ok(ty),
                _ => bail!("`{}` is not a class", name),
            },
        }
    }

    fn resolve_type(&self, t: &TypeExpr) -> Result<Type> {
        let name = &t.name.text;
        let mut ty = match self.lookup.resolve_class(name) {
            Ok(ty) => ty,
            Err(_) => Type::parse(name).ok_or_else(|| anyhow!("unknown type `{}` at {}", name, t.span))?,
        };
        for _ in 0..t.dims {
            if ty.is_void() {
                bail!("void cannot be an array element at {}", t.span);
            }
            ty = ty.array();
        }
        Ok(ty)
    }

    fn signature(&self, sig: &SigExpr) -> Result<Signature> {
        let mut s = Signature::returning(self.resolve_type(&sig.ret)?);
        for p in &sig.params {
            s = s.append_arg(p.name.text.as_str(), self.resolve_type(&p.ty)?);
        }
        Ok(s)
    }

    /// The single accessible static method `C::m`.
    fn function(&self, m: &MemberRef) -> Result<Callable> {
        let class = self.class(&m.class.text)?;
        let mut found = self.lookup.find_static_overloads(&class, &m.member.text)?;
        match found.len() {
            1 => Ok(found.remove(0)),
            0 => bail!("no static method {} at {}", m, m.span),
            n => bail!("{} is ambiguous ({} overloads) at {}", m, n, m.span),
        }
    }

    fn bound_value(&self, ty: Option<&TypeExpr>, lit: &Lit) -> Result<(Type, Value)> {
        match ty {
            Some(t) => {
                let ty = self.resolve_type(t)?;
                let value = typed(lit, &ty)?;
                Ok((ty, value))
            }
            None => {
                let value = value_of(lit);
                Ok((value.natural_type(), value))
            }
        }
    }
}

fn close(open: Open) -> Composition {
    let mut report = open.report;
    if let Stage::Binding(binder) = open.stage {
        report.trace = binder.trace();
    }
    report
}

fn value_of(lit: &Lit) -> Value {
    match lit {
        Lit::Int(v) => i32::try_from(*v).map_or(Value::Long(*v), Value::Int),
        Lit::Long(v) => Value::Long(*v),
        Lit::Float(v) => Value::Double(*v),
        Lit::Str(s) => Value::Str(s.clone()),
        Lit::Bool(b) => Value::Bool(*b),
        Lit::Null => Value::Null,
        Lit::Array(items) => {
            let values: Vec<Value> = items.iter().map(value_of).collect();
            let mut types = values.iter().map(Value::natural_type);
            let elem = match types.next() {
                Some(first) if types.all(|t| t == first) => first,
                _ => Type::object(),
            };
            Value::Array(ArrayValue::new(elem, values))
        }
    }
}

/// `lit` as a value of type `ty`; array literals are built element-wise.
fn coerce(lit: &Lit, ty: &Type) -> Invocation {
    match (lit, ty.component()) {
        (Lit::Array(items), Some(elem)) => {
            let values = items
                .iter()
                .map(|item| coerce(item, elem))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(ArrayValue::new(elem.clone(), values)))
        }
        _ => convert_value(value_of(lit), ty, ConversionKind::Explicit),
    }
}

fn typed(lit: &Lit, ty: &Type) -> Result<Value> {
    coerce(lit, ty).map_err(|t| anyhow!("{} is not a {}: {}", lit, ty, t))
}
