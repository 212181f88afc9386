//! Syntax tree of a binding script. Every node carries the byte span it
//! was parsed from; `Display` renders statements back to source form.

use std::fmt;

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[derive(Debug, Serialize)]
pub struct Script {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub struct Ident {
    pub text: String,
    pub span: Span,
}

/// A type name with zero or more `[]` suffixes.
#[derive(Debug, Clone, Serialize)]
pub struct TypeExpr {
    pub name: Ident,
    pub dims: u32,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub struct Param {
    pub name: Ident,
    pub ty: TypeExpr,
    pub span: Span,
}

/// `(a: T, ...) -> R`
#[derive(Debug, Clone, Serialize)]
pub struct SigExpr {
    pub params: Vec<Param>,
    pub ret: TypeExpr,
    pub span: Span,
}

/// `Class::member`
#[derive(Debug, Clone, Serialize)]
pub struct MemberRef {
    pub class: Ident,
    pub member: Ident,
    pub span: Span,
}

/// An argument name or a quoted name pattern.
#[derive(Debug, Clone, Serialize)]
pub struct Pattern {
    pub text: String,
    pub quoted: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Lit {
    Int(i64),
    Long(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
    Array(Vec<Lit>),
}

/// A named literal: `name[: T] = lit`.
#[derive(Debug, Clone, Serialize)]
pub struct Binding {
    pub name: Ident,
    pub ty: Option<TypeExpr>,
    pub value: Lit,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize)]
pub enum Endpoint {
    InvokeStatic(MemberRef),
    InvokeVirtual(Ident),
    InvokeSpecial(MemberRef),
    InvokeConstructor(Ident),
    GetStatic(MemberRef),
    SetStatic(MemberRef),
    GetField(Ident),
    SetField(Ident),
    Identity,
    Constant(Lit),
    Nop,
    Throw,
}

#[derive(Debug, Clone, Serialize)]
pub enum StmtKind {
    Sig(SigExpr),
    Drop(Ident),
    Insert { index: u32, binding: Binding },
    Append(Binding),
    Prepend(Binding),
    Permute(Vec<Pattern>),
    Exclude(Vec<Pattern>),
    Spread(Vec<Param>),
    Collect { name: Ident, pattern: Pattern },
    Convert(SigExpr),
    Cast(SigExpr),
    Fold { name: Ident, function: MemberRef },
    FoldVoid(MemberRef),
    Filter { pattern: Pattern, function: MemberRef },
    FilterReturn(MemberRef),
    Catch { throwable: TypeExpr, function: MemberRef },
    Finally(MemberRef),
    Endpoint(Endpoint),
    Call(Vec<Lit>),
}

#[derive(Debug, Clone, Serialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn comma<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for _ in 0..self.dims {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)
    }
}

impl fmt::Display for SigExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        comma(f, &self.params)?;
        write!(f, ") -> {}", self.ret)
    }
}

impl fmt::Display for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.class, self.member)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted {
            write!(f, "{:?}", self.text)
        } else {
            f.write_str(&self.text)
        }
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lit::Int(v) => write!(f, "{v}"),
            Lit::Long(v) => write!(f, "{v}L"),
            Lit::Float(v) => write!(f, "{v:?}"),
            Lit::Str(s) => write!(f, "{s:?}"),
            Lit::Bool(b) => write!(f, "{b}"),
            Lit::Null => write!(f, "null"),
            Lit::Array(items) => {
                write!(f, "[")?;
                comma(f, items)?;
                write!(f, "]")
            }
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(ty) = &self.ty {
            write!(f, ": {ty}")?;
        }
        write!(f, " = {}", self.value)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::InvokeStatic(m) => write!(f, "invoke static {m}"),
            Endpoint::InvokeVirtual(n) => write!(f, "invoke virtual {n}"),
            Endpoint::InvokeSpecial(m) => write!(f, "invoke special {m}"),
            Endpoint::InvokeConstructor(c) => write!(f, "invoke constructor {c}"),
            Endpoint::GetStatic(m) => write!(f, "get_static {m}"),
            Endpoint::SetStatic(m) => write!(f, "set_static {m}"),
            Endpoint::GetField(n) => write!(f, "get_field {n}"),
            Endpoint::SetField(n) => write!(f, "set_field {n}"),
            Endpoint::Identity => write!(f, "identity"),
            Endpoint::Constant(lit) => write!(f, "constant {lit}"),
            Endpoint::Nop => write!(f, "nop"),
            Endpoint::Throw => write!(f, "throw"),
        }
    }
}

impl fmt::Display for StmtKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StmtKind::Sig(sig) => write!(f, "sig {sig}"),
            StmtKind::Drop(name) => write!(f, "drop {name}"),
            StmtKind::Insert { index, binding } => write!(f, "insert {index} {binding}"),
            StmtKind::Append(b) => write!(f, "append {b}"),
            StmtKind::Prepend(b) => write!(f, "prepend {b}"),
            StmtKind::Permute(ps) => {
                write!(f, "permute ")?;
                comma(f, ps)
            }
            StmtKind::Exclude(ps) => {
                write!(f, "exclude ")?;
                comma(f, ps)
            }
            StmtKind::Spread(params) => {
                write!(f, "spread ")?;
                comma(f, params)
            }
            StmtKind::Collect { name, pattern } => write!(f, "collect {name} = {pattern}"),
            StmtKind::Convert(sig) => write!(f, "convert {sig}"),
            StmtKind::Cast(sig) => write!(f, "cast {sig}"),
            StmtKind::Fold { name, function } => write!(f, "fold {name} = {function}"),
            StmtKind::FoldVoid(m) => write!(f, "fold_void {m}"),
            StmtKind::Filter { pattern, function } => write!(f, "filter {pattern} = {function}"),
            StmtKind::FilterReturn(m) => write!(f, "filter_return {m}"),
            StmtKind::Catch { throwable, function } => write!(f, "catch {throwable} = {function}"),
            StmtKind::Finally(m) => write!(f, "finally {m}"),
            StmtKind::Endpoint(e) => write!(f, "{e}"),
            StmtKind::Call(args) => {
                write!(f, "call (")?;
                comma(f, args)?;
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};", self.kind)
    }
}
