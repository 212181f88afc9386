//! Builtin classes scripts can link against.
//!
//! | class | members |
//! |---|---|
//! | `Strings` | `concat`, `upper`, `length`, `repeat`, `of_int`, `is_empty` |
//! | `Ints` | `add`, `negate`, `max`, `parse`, `positive` |
//! | `Errors` | `fail`, `fail_void`, `message`, `recover` |
//! | `Arrays` | `length`, `first`, `join`, `sum` |
//! | `Log` | `note`, `mark` (recorded in [`Notes`]) |
//! | `Greeter`, `LoudGreeter` | constructor `(String)`, field `name`, virtual `greet`, static field `count` |
//! | `Greeter` | static factories `make`, `make_loud` |

use std::sync::Arc;

use parking_lot::Mutex;
use rebind_core::{Callable, FnType, Invocation, Registry, Thrown, Type, Value};

/// Lines recorded by `Log::note` and `Log::mark`, shared with whoever
/// wants to report them.
#[derive(Debug, Clone, Default)]
pub struct Notes(Arc<Mutex<Vec<String>>>);

impl Notes {
    pub fn push(&self, line: impl Into<String>) {
        self.0.lock().push(line.into());
    }

    /// Everything recorded since the last call.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock())
    }
}

fn method<F>(name: &str, ret: Type, params: Vec<Type>, body: F) -> Callable
where
    F: Fn(Vec<Value>) -> Invocation + Send + Sync + 'static,
{
    Callable::new(name, FnType::new(ret, params), body)
}

fn text(v: &Value) -> Result<&str, Thrown> {
    v.as_str().ok_or_else(|| Thrown::null_pointer("string argument is null"))
}

fn int(v: &Value) -> Result<i32, Thrown> {
    v.as_int().ok_or_else(|| Thrown::null_pointer("int argument is null"))
}

fn items(v: &Value) -> Result<&[Value], Thrown> {
    v.as_array()
        .map(|a| a.items())
        .ok_or_else(|| Thrown::null_pointer("array argument is null"))
}

pub struct Library {
    notes: Notes,
}

impl Default for Library {
    fn default() -> Self {
        Self::new()
    }
}

impl Library {
    pub fn new() -> Self {
        Library {
            notes: Notes::default(),
        }
    }

    pub fn notes(&self) -> &Notes {
        &self.notes
    }

    /// Register every builtin class in `registry`.
    pub fn install(&self, registry: &mut Registry) {
        strings(registry);
        ints(registry);
        errors(registry);
        arrays(registry);
        self.log(registry);
        greeters(registry);
    }

    fn log(&self, registry: &mut Registry) {
        let note = self.notes.clone();
        let mark = self.notes.clone();
        registry
            .class(&Type::named("Log"))
            .static_method(
                "note",
                method("note", Type::void(), vec![Type::string()], move |args| {
                    note.push(text(&args[0])?);
                    Ok(Value::Unit)
                }),
            )
            .static_method(
                "mark",
                method("mark", Type::void(), vec![], move |_| {
                    mark.push("mark");
                    Ok(Value::Unit)
                }),
            );
    }
}

fn strings(registry: &mut Registry) {
    let s = Type::string;
    registry
        .class(&Type::named("Strings"))
        .static_method(
            "concat",
            method("concat", s(), vec![s(), s()], |args| {
                Ok(Value::Str(format!("{}{}", text(&args[0])?, text(&args[1])?)))
            }),
        )
        .static_method(
            "upper",
            method("upper", s(), vec![s()], |args| {
                Ok(Value::Str(text(&args[0])?.to_uppercase()))
            }),
        )
        .static_method(
            "length",
            method("length", Type::int(), vec![s()], |args| {
                Ok(Value::Int(text(&args[0])?.chars().count() as i32))
            }),
        )
        .static_method(
            "repeat",
            method("repeat", s(), vec![s(), Type::int()], |args| {
                let n = int(&args[1])?;
                if n < 0 {
                    return Err(Thrown::illegal_argument(format!("negative count {n}")));
                }
                Ok(Value::Str(text(&args[0])?.repeat(n as usize)))
            }),
        )
        .static_method(
            "of_int",
            method("of_int", s(), vec![Type::int()], |args| {
                Ok(Value::Str(int(&args[0])?.to_string()))
            }),
        )
        .static_method(
            "is_empty",
            method("is_empty", Type::boolean(), vec![s()], |args| {
                Ok(Value::Bool(text(&args[0])?.is_empty()))
            }),
        );
}

fn ints(registry: &mut Registry) {
    let i = Type::int;
    registry
        .class(&Type::named("Ints"))
        .static_method(
            "add",
            method("add", i(), vec![i(), i()], |args| {
                Ok(Value::Int(int(&args[0])?.wrapping_add(int(&args[1])?)))
            }),
        )
        .static_method(
            "negate",
            method("negate", i(), vec![i()], |args| Ok(Value::Int(int(&args[0])?.wrapping_neg()))),
        )
        .static_method(
            "max",
            method("max", i(), vec![i(), i()], |args| {
                Ok(Value::Int(int(&args[0])?.max(int(&args[1])?)))
            }),
        )
        .static_method(
            "parse",
            method("parse", i(), vec![Type::string()], |args| {
                let s = text(&args[0])?;
                s.trim()
                    .parse()
                    .map(Value::Int)
                    .map_err(|_| Thrown::illegal_argument(format!("not an int: {s:?}")))
            }),
        )
        .static_method(
            "positive",
            method("positive", Type::boolean(), vec![i()], |args| {
                Ok(Value::Bool(int(&args[0])? > 0))
            }),
        );
}

fn errors(registry: &mut Registry) {
    registry
        .class(&Type::named("Errors"))
        .static_method(
            "fail",
            method("fail", Type::string(), vec![Type::string()], |args| {
                Err(Thrown::new(&Type::illegal_state_exception(), text(&args[0])?))
            }),
        )
        .static_method(
            "fail_void",
            method("fail_void", Type::void(), vec![Type::string()], |args| {
                Err(Thrown::new(&Type::illegal_state_exception(), text(&args[0])?))
            }),
        )
        .static_method(
            "message",
            method("message", Type::string(), vec![Type::throwable()], |args| {
                let message = args[0]
                    .as_object()
                    .and_then(|o| o.message().map(str::to_string))
                    .unwrap_or_default();
                Ok(Value::Str(message))
            }),
        )
        .static_method(
            "recover",
            method(
                "recover",
                Type::string(),
                vec![Type::throwable(), Type::string()],
                |args| {
                    let class = args[0]
                        .runtime_class()
                        .map(|c| c.name().to_string())
                        .unwrap_or_default();
                    Ok(Value::Str(format!("recovered {} from {}", text(&args[1])?, class)))
                },
            ),
        );
}

fn arrays(registry: &mut Registry) {
    let objects = Type::object().array();
    registry
        .class(&Type::named("Arrays"))
        .static_method(
            "length",
            method("length", Type::int(), vec![objects.clone()], |args| {
                Ok(Value::Int(items(&args[0])?.len() as i32))
            }),
        )
        .static_method(
            "first",
            method("first", Type::object(), vec![objects], |args| {
                items(&args[0])?
                    .first()
                    .cloned()
                    .ok_or_else(|| Thrown::illegal_argument("empty array"))
            }),
        )
        .static_method(
            "join",
            method("join", Type::string(), vec![Type::string().array()], |args| {
                let parts = items(&args[0])?
                    .iter()
                    .map(|v| v.as_str().unwrap_or("null"))
                    .collect::<Vec<_>>();
                Ok(Value::Str(parts.join(", ")))
            }),
        )
        .static_method(
            "sum",
            method("sum", Type::int(), vec![Type::int().array()], |args| {
                let total = items(&args[0])?
                    .iter()
                    .filter_map(Value::as_int)
                    .fold(0i32, i32::wrapping_add);
                Ok(Value::Int(total))
            }),
        );
}

fn greeters(registry: &mut Registry) {
    let greeter = Type::subclass("Greeter", &Type::object());
    let loud = Type::subclass("LoudGreeter", &greeter);

    fn name_of(receiver: &Value) -> Result<String, Thrown> {
        receiver
            .as_object()
            .and_then(|o| o.get_field("name"))
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| Thrown::null_pointer("greeter has no name"))
    }

    let init = |object: &rebind_core::Object, args: &[Value]| -> Result<(), Thrown> {
        object.set_field("name", args[0].clone());
        Ok(())
    };

    // static factories, usable where only a function fits (fold, filter)
    fn factory(ty: &Type, name: &str) -> Callable {
        let class = ty.class().cloned();
        method(name, ty.clone(), vec![Type::string()], move |args| {
            let Some(class) = &class else {
                return Err(Thrown::illegal_argument("factory has no class"));
            };
            let object = rebind_core::Object::new(class.clone());
            object.set_field("name", args[0].clone());
            Ok(Value::Object(Arc::new(object)))
        })
    }

    registry
        .class(&greeter)
        .field("name", Type::string())
        .static_method("make", factory(&greeter, "make"))
        .static_method("make_loud", factory(&loud, "make_loud"))
        .static_field("count", Type::int(), Value::Int(0))
        .constructor(vec![Type::string()], init)
        .virtual_method(
            "greet",
            method("greet", Type::string(), vec![greeter.clone(), Type::string()], |args| {
                Ok(Value::Str(format!("{} greets {}", name_of(&args[0])?, text(&args[1])?)))
            }),
        );
    registry
        .class(&loud)
        .constructor(vec![Type::string()], init)
        .virtual_method(
            "greet",
            method("greet", Type::string(), vec![loud.clone(), Type::string()], |args| {
                Ok(Value::Str(
                    format!("{} greets {}", name_of(&args[0])?, text(&args[1])?).to_uppercase(),
                ))
            }),
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use rebind_core::Lookup;

    fn lookup() -> (Lookup, Notes) {
        let library = Library::new();
        let mut registry = Registry::new();
        library.install(&mut registry);
        (Lookup::public(Arc::new(registry)), library.notes().clone())
    }

    #[test]
    fn notes_are_drained() {
        let (lookup, notes) = lookup();
        let note = lookup
            .find_static(&Type::named("Log"), "note", &FnType::new(Type::void(), vec![Type::string()]))
            .unwrap();
        note.invoke(vec![Value::from("one")]).unwrap();
        assert_eq!(notes.take(), vec!["one".to_string()]);
        assert!(notes.take().is_empty());
    }

    #[test]
    fn loud_greeter_overrides() {
        let (lookup, _) = lookup();
        let loud = lookup.resolve_class("LoudGreeter").unwrap();
        let greeter = lookup.resolve_class("Greeter").unwrap();
        let make = lookup.find_constructor(&loud, &[Type::string()]).unwrap();
        let ann = make.invoke(vec![Value::from("ann")]).unwrap();
        let greet = lookup
            .find_virtual(&greeter, "greet", &FnType::new(Type::string(), vec![Type::string()]))
            .unwrap();
        assert_eq!(
            greet.invoke(vec![ann, Value::from("bob")]),
            Ok(Value::from("ANN GREETS BOB"))
        );
    }

    #[test]
    fn factories_build_the_named_class() {
        let (lookup, _) = lookup();
        let greeter = lookup.resolve_class("Greeter").unwrap();
        let make_loud = lookup.find_static_overloads(&greeter, "make_loud").unwrap();
        let made = make_loud[0].invoke(vec![Value::from("ann")]).unwrap();
        assert_eq!(made.runtime_class().unwrap().name(), "LoudGreeter");
        assert_eq!(made.as_object().unwrap().get_field("name"), Some(Value::from("ann")));
    }
}
