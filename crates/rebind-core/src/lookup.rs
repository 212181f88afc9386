//! Named linkage: resolving methods, constructors and fields of registered
//! classes into [`Callable`]s.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use rebind_types::{Class, FnType, Type};
use tracing::debug;

use crate::callable::Callable;
use crate::convert::default_value;
use crate::error::LookupError;
use crate::value::{Object, Thrown, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatch {
    Static,
    /// First parameter is the receiver.
    Virtual,
}

#[derive(Debug, Clone)]
struct Method {
    name: String,
    dispatch: Dispatch,
    visibility: Visibility,
    body: Callable,
}

type Init = dyn Fn(&Object, &[Value]) -> Result<(), Thrown> + Send + Sync;

#[derive(Clone)]
struct Constructor {
    params: Vec<Type>,
    visibility: Visibility,
    init: Arc<Init>,
}

#[derive(Debug, Clone)]
struct Field {
    name: String,
    ty: Type,
    visibility: Visibility,
}

#[derive(Debug, Clone)]
struct StaticField {
    name: String,
    ty: Type,
    visibility: Visibility,
    cell: Arc<RwLock<Value>>,
}

/// Members of one class.
pub struct ClassEntry {
    class: Arc<Class>,
    methods: Vec<Method>,
    constructors: Vec<Constructor>,
    fields: Vec<Field>,
    statics: Vec<StaticField>,
}

impl ClassEntry {
    pub fn ty(&self) -> Type {
        Type::Ref(self.class.clone())
    }

    /// Register a static method; `body`'s type is the method's type.
    pub fn static_method(&mut self, name: &str, body: Callable) -> &mut Self {
        self.methods.push(Method {
            name: name.to_string(),
            dispatch: Dispatch::Static,
            visibility: Visibility::Public,
            body,
        });
        self
    }

    /// Register a virtual method; `body` takes the receiver first.
    pub fn virtual_method(&mut self, name: &str, body: Callable) -> &mut Self {
        self.methods.push(Method {
            name: name.to_string(),
            dispatch: Dispatch::Virtual,
            visibility: Visibility::Public,
            body,
        });
        self
    }

    /// Register a constructor taking `params`; `init` fills in the fresh
    /// object.
    pub fn constructor<F>(&mut self, params: Vec<Type>, init: F) -> &mut Self
    where
        F: Fn(&Object, &[Value]) -> Result<(), Thrown> + Send + Sync + 'static,
    {
        self.constructors.push(Constructor {
            params,
            visibility: Visibility::Public,
            init: Arc::new(init),
        });
        self
    }

    pub fn field(&mut self, name: &str, ty: Type) -> &mut Self {
        self.fields.push(Field {
            name: name.to_string(),
            ty,
            visibility: Visibility::Public,
        });
        self
    }

    pub fn static_field(&mut self, name: &str, ty: Type, initial: Value) -> &mut Self {
        self.statics.push(StaticField {
            name: name.to_string(),
            ty,
            visibility: Visibility::Public,
            cell: Arc::new(RwLock::new(initial)),
        });
        self
    }

    /// Restrict every member called `name` (methods, fields) to the
    /// declaring class. `"<init>"` names the constructors.
    pub fn make_private(&mut self, name: &str) -> &mut Self {
        for m in self.methods.iter_mut().filter(|m| m.name == name) {
            m.visibility = Visibility::Private;
        }
        for f in self.fields.iter_mut().filter(|f| f.name == name) {
            f.visibility = Visibility::Private;
        }
        for f in self.statics.iter_mut().filter(|f| f.name == name) {
            f.visibility = Visibility::Private;
        }
        if name == "<init>" {
            for c in &mut self.constructors {
                c.visibility = Visibility::Private;
            }
        }
        self
    }
}

/// Every class a [`Lookup`] can resolve.
#[derive(Default)]
pub struct Registry {
    classes: HashMap<String, ClassEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the entry for a class type.
    ///
    /// Non-class types are registered under their built-in class of the
    /// same name.
    pub fn class(&mut self, ty: &Type) -> &mut ClassEntry {
        let class = match ty {
            Type::Ref(c) => c.clone(),
            other => Class::builtin(&other.to_string()),
        };
        self.classes
            .entry(class.name().to_string())
            .or_insert_with(|| ClassEntry {
                class,
                methods: Vec::new(),
                constructors: Vec::new(),
                fields: Vec::new(),
                statics: Vec::new(),
            })
    }

    pub fn get(&self, name: &str) -> Option<&ClassEntry> {
        self.classes.get(name)
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }
}

/// A registry handle with an access context.
#[derive(Clone)]
pub struct Lookup {
    registry: Arc<Registry>,
    context: Option<Arc<Class>>,
}

impl Lookup {
    /// Sees public members only.
    pub fn public(registry: Arc<Registry>) -> Self {
        Lookup {
            registry,
            context: None,
        }
    }

    /// Sees public members plus the private members of `class`, and may
    /// make special calls to `class`'s superclasses.
    pub fn in_class(&self, class: &Type) -> Self {
        Lookup {
            registry: self.registry.clone(),
            context: class.class().cloned(),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn context(&self) -> Option<&Arc<Class>> {
        self.context.as_ref()
    }

    /// A registered class by name.
    pub fn resolve_class(&self, name: &str) -> Result<Type, LookupError> {
        self.registry
            .get(name)
            .map(ClassEntry::ty)
            .ok_or_else(|| LookupError::NoSuchClass {
                class: name.to_string(),
            })
    }

    fn entry(&self, class: &Type) -> Result<&ClassEntry, LookupError> {
        self.registry
            .get(&class.to_string())
            .ok_or_else(|| LookupError::NoSuchClass {
                class: class.to_string(),
            })
    }

    fn check_access(&self, entry: &ClassEntry, member: &str, visibility: Visibility) -> Result<(), LookupError> {
        let allowed = match visibility {
            Visibility::Public => true,
            Visibility::Private => self.context.as_deref() == Some(entry.class.as_ref()),
        };
        if allowed {
            return Ok(());
        }
        Err(LookupError::IllegalAccess {
            class: entry.class.name().to_string(),
            member: member.to_string(),
            context: self.context.as_ref().map(|c| c.name().to_string()),
        })
    }

    fn no_such_method(class: &Type, name: &str, ty: &FnType) -> LookupError {
        LookupError::NoSuchMethod {
            class: class.to_string(),
            name: name.to_string(),
            ty: ty.clone(),
        }
    }

    /// Static method `class.name` of exactly type `ty`.
    pub fn find_static(&self, class: &Type, name: &str, ty: &FnType) -> Result<Callable, LookupError> {
        let entry = self.entry(class)?;
        let method = entry
            .methods
            .iter()
            .find(|m| m.dispatch == Dispatch::Static && m.name == name && m.body.ty() == ty)
            .ok_or_else(|| Self::no_such_method(class, name, ty))?;
        self.check_access(entry, name, method.visibility)?;
        debug!(%class, name, %ty, "resolved static method");
        Ok(method.body.clone())
    }

    /// Every accessible static method `class.name`, in registration order.
    pub fn find_static_overloads(&self, class: &Type, name: &str) -> Result<Vec<Callable>, LookupError> {
        let entry = self.entry(class)?;
        Ok(entry
            .methods
            .iter()
            .filter(|m| m.dispatch == Dispatch::Static && m.name == name)
            .filter(|m| self.check_access(entry, name, m.visibility).is_ok())
            .map(|m| m.body.clone())
            .collect())
    }

    /// Find a virtual method declared on `class` or one of its registered
    /// superclasses, whose type without the receiver is `ty`.
    fn declared_virtual(&self, class: &Class, name: &str, ty: &FnType) -> Option<(&ClassEntry, &Method)> {
        class.ancestry().find_map(|c| {
            let entry = self.registry.get(c.name())?;
            entry
                .methods
                .iter()
                .find(|m| {
                    m.dispatch == Dispatch::Virtual
                        && m.name == name
                        && m.body.ty().param_count() == ty.param_count() + 1
                        && &m.body.ty().params()[1..] == ty.params()
                        && m.body.ty().ret() == ty.ret()
                })
                .map(|m| (entry, m))
        })
    }

    /// Virtual method `name` with receiver type `class`, dispatched per
    /// call on the receiver's runtime class. The result takes the receiver
    /// first.
    pub fn find_virtual(&self, class: &Type, name: &str, ty: &FnType) -> Result<Callable, LookupError> {
        let static_class = class
            .class()
            .ok_or_else(|| Self::no_such_method(class, name, ty))?;
        let (entry, method) = self
            .declared_virtual(static_class, name, ty)
            .ok_or_else(|| Self::no_such_method(class, name, ty))?;
        self.check_access(entry, name, method.visibility)?;
        debug!(%class, name, %ty, "resolved virtual method");

        let lookup = self.clone();
        let method_name = name.to_string();
        let want = ty.clone();
        let fallback = method.body.clone();
        let call_type = ty.prepend_params(&[class.clone()]);
        Ok(Callable::new(name, call_type, move |args| {
            let runtime = match args.first() {
                Some(Value::Null) | None => {
                    return Err(Thrown::null_pointer(format!(
                        "cannot invoke {} on null",
                        method_name
                    )))
                }
                Some(receiver) => receiver.runtime_class(),
            };
            let body = runtime
                .and_then(|c| {
                    lookup
                        .declared_virtual(&c, &method_name, &want)
                        .map(|(_, m)| m.body.clone())
                })
                .unwrap_or_else(|| fallback.clone());
            body.invoke(args)
        }))
    }

    /// The implementation of `name` visible in `class`, called without
    /// dynamic dispatch. The lookup context must be `class` or a subclass,
    /// and the receiver is typed as the context class.
    pub fn find_special(&self, class: &Type, name: &str, ty: &FnType) -> Result<Callable, LookupError> {
        let target = class
            .class()
            .ok_or_else(|| Self::no_such_method(class, name, ty))?;
        let context = match &self.context {
            Some(c) if c.is_subclass_of(target) => c.clone(),
            _ => {
                return Err(LookupError::IllegalAccess {
                    class: class.to_string(),
                    member: name.to_string(),
                    context: self.context.as_ref().map(|c| c.name().to_string()),
                })
            }
        };
        let (entry, method) = self
            .declared_virtual(target, name, ty)
            .ok_or_else(|| Self::no_such_method(class, name, ty))?;
        self.check_access(entry, name, method.visibility)?;
        debug!(%class, name, %ty, "resolved special method");

        let body = method.body.clone();
        let call_type = ty.prepend_params(&[Type::Ref(context)]);
        Ok(Callable::new(name, call_type, move |args| {
            if matches!(args.first(), Some(Value::Null)) {
                return Err(Thrown::null_pointer("special call on null"));
            }
            body.invoke(args)
        }))
    }

    /// Constructor of `class` taking exactly `params`; the result returns
    /// the new object.
    pub fn find_constructor(&self, class: &Type, params: &[Type]) -> Result<Callable, LookupError> {
        let entry = self.entry(class)?;
        let ty = FnType::new(entry.ty(), params.to_vec());
        let ctor = entry
            .constructors
            .iter()
            .find(|c| c.params == params)
            .ok_or_else(|| Self::no_such_method(class, "<init>", &ty.change_return(Type::Void)))?;
        self.check_access(entry, "<init>", ctor.visibility)?;
        debug!(%class, %ty, "resolved constructor");

        let init = ctor.init.clone();
        let class = entry.class.clone();
        Ok(Callable::new("<init>", ty, move |args| {
            let object = Arc::new(Object::new(class.clone()));
            init(&object, &args)?;
            Ok(Value::Object(object))
        }))
    }

    fn field(&self, class: &Type, name: &str, ty: &Type) -> Result<(&ClassEntry, &Field), LookupError> {
        let no_such = || LookupError::NoSuchField {
            class: class.to_string(),
            name: name.to_string(),
            ty: ty.clone(),
        };
        let start = class.class().ok_or_else(no_such)?;
        let (entry, field) = start
            .ancestry()
            .find_map(|c| {
                let entry = self.registry.get(c.name())?;
                let field = entry.fields.iter().find(|f| f.name == name && &f.ty == ty)?;
                Some((entry, field))
            })
            .ok_or_else(no_such)?;
        self.check_access(entry, name, field.visibility)?;
        Ok((entry, field))
    }

    /// `(class) -> ty` reading instance field `name`. Unset fields read as
    /// the type's default.
    pub fn find_getter(&self, class: &Type, name: &str, ty: &Type) -> Result<Callable, LookupError> {
        let (_, field) = self.field(class, name, ty)?;
        let field_name = field.name.clone();
        let field_ty = field.ty.clone();
        Ok(Callable::new(
            format!("get {name}"),
            FnType::new(ty.clone(), vec![class.clone()]),
            move |args| match args.first() {
                Some(Value::Object(o)) => Ok(o
                    .get_field(&field_name)
                    .unwrap_or_else(|| default_value(&field_ty))),
                _ => Err(Thrown::null_pointer(format!("cannot read {} of null", field_name))),
            },
        ))
    }

    /// `(class, ty) -> void` writing instance field `name`.
    pub fn find_setter(&self, class: &Type, name: &str, ty: &Type) -> Result<Callable, LookupError> {
        let (_, field) = self.field(class, name, ty)?;
        let field_name = field.name.clone();
        Ok(Callable::new(
            format!("set {name}"),
            FnType::new(Type::Void, vec![class.clone(), ty.clone()]),
            move |mut args| {
                let value = args.pop().unwrap_or(Value::Null);
                match args.first() {
                    Some(Value::Object(o)) => {
                        o.set_field(&field_name, value);
                        Ok(Value::Unit)
                    }
                    _ => Err(Thrown::null_pointer(format!("cannot write {} of null", field_name))),
                }
            },
        ))
    }

    fn static_field(&self, class: &Type, name: &str, ty: &Type) -> Result<Arc<RwLock<Value>>, LookupError> {
        let entry = self.entry(class)?;
        let field = entry
            .statics
            .iter()
            .find(|f| f.name == name && &f.ty == ty)
            .ok_or_else(|| LookupError::NoSuchField {
                class: class.to_string(),
                name: name.to_string(),
                ty: ty.clone(),
            })?;
        self.check_access(entry, name, field.visibility)?;
        Ok(field.cell.clone())
    }

    /// `() -> ty` reading static field `class.name`.
    pub fn find_static_getter(&self, class: &Type, name: &str, ty: &Type) -> Result<Callable, LookupError> {
        let cell = self.static_field(class, name, ty)?;
        Ok(Callable::new(
            format!("get {class}.{name}"),
            FnType::returning(ty.clone()),
            move |_| Ok(cell.read().clone()),
        ))
    }

    /// `(ty) -> void` writing static field `class.name`.
    pub fn find_static_setter(&self, class: &Type, name: &str, ty: &Type) -> Result<Callable, LookupError> {
        let cell = self.static_field(class, name, ty)?;
        Ok(Callable::new(
            format!("set {class}.{name}"),
            FnType::new(Type::Void, vec![ty.clone()]),
            move |mut args| {
                *cell.write() = args.pop().unwrap_or(Value::Null);
                Ok(Value::Unit)
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shapes() -> (Lookup, Type, Type) {
        let shape = Type::subclass("Shape", &Type::object());
        let square = Type::subclass("Square", &shape);
        let mut registry = Registry::new();
        registry
            .class(&shape)
            .virtual_method(
                "describe",
                Callable::new("describe", FnType::new(Type::string(), vec![shape.clone()]), |_| {
                    Ok(Value::from("shape"))
                }),
            )
            .field("sides", Type::int())
            .static_field("count", Type::int(), Value::Int(0))
            .static_method(
                "secret",
                Callable::new("secret", FnType::returning(Type::int()), |_| Ok(Value::Int(42))),
            )
            .make_private("secret");
        registry
            .class(&square)
            .virtual_method(
                "describe",
                Callable::new("describe", FnType::new(Type::string(), vec![square.clone()]), |_| {
                    Ok(Value::from("square"))
                }),
            )
            .constructor(vec![], |object, _| {
                object.set_field("sides", Value::Int(4));
                Ok(())
            });
        (Lookup::public(Arc::new(registry)), shape, square)
    }

    #[test]
    fn virtual_dispatch_uses_runtime_class() {
        let (lookup, shape, square) = shapes();
        let make = lookup.find_constructor(&square, &[]).unwrap();
        let sq = make.invoke(vec![]).unwrap();

        let describe = lookup
            .find_virtual(&shape, "describe", &FnType::returning(Type::string()))
            .unwrap();
        assert_eq!(describe.invoke(vec![sq.clone()]), Ok(Value::from("square")));

        let sides = lookup.find_getter(&shape, "sides", &Type::int()).unwrap();
        assert_eq!(sides.invoke(vec![sq]), Ok(Value::Int(4)));
    }

    #[test]
    fn special_calls_skip_overrides() {
        let (lookup, shape, square) = shapes();
        let sq = lookup.find_constructor(&square, &[]).unwrap().invoke(vec![]).unwrap();
        let ty = FnType::returning(Type::string());

        assert!(matches!(
            lookup.find_special(&shape, "describe", &ty),
            Err(LookupError::IllegalAccess { .. })
        ));
        let special = lookup.in_class(&square).find_special(&shape, "describe", &ty).unwrap();
        assert_eq!(special.invoke(vec![sq]), Ok(Value::from("shape")));
    }

    #[test]
    fn private_members_need_the_declaring_context() {
        let (lookup, shape, _) = shapes();
        let ty = FnType::returning(Type::int());
        assert!(matches!(
            lookup.find_static(&shape, "secret", &ty),
            Err(LookupError::IllegalAccess { .. })
        ));
        let f = lookup.in_class(&shape).find_static(&shape, "secret", &ty).unwrap();
        assert_eq!(f.invoke(vec![]), Ok(Value::Int(42)));
    }

    #[test]
    fn static_fields_are_shared_cells() {
        let (lookup, shape, _) = shapes();
        let set = lookup.find_static_setter(&shape, "count", &Type::int()).unwrap();
        let get = lookup.find_static_getter(&shape, "count", &Type::int()).unwrap();
        set.invoke(vec![Value::Int(9)]).unwrap();
        assert_eq!(get.invoke(vec![]), Ok(Value::Int(9)));
        assert!(matches!(
            lookup.find_static_getter(&shape, "count", &Type::long()),
            Err(LookupError::NoSuchField { .. })
        ));
    }

    #[test]
    fn overloads_hide_private_members() {
        let (lookup, shape, _) = shapes();
        assert!(lookup.find_static_overloads(&shape, "secret").unwrap().is_empty());
        assert_eq!(lookup.in_class(&shape).find_static_overloads(&shape, "secret").unwrap().len(), 1);
    }
}
